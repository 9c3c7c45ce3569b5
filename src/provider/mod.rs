// Flight-offer providers
// Every provider turns a SearchRequest into canonical FlightOffers or a typed SearchError.
// No retries: a failed call surfaces immediately to the caller.

pub mod amadeus;
pub mod google_flights;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::AppConfig;
use crate::domain::{FlightOffer, SearchRequest};
use crate::normalize::ParseError;

pub use amadeus::AmadeusProvider;
pub use google_flights::GoogleFlightsProvider;

const REQUEST_TIMEOUT_SECS: u64 = 30;

// Error types for a single search call
#[derive(Error, Debug)]
pub enum SearchError {
    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Provider error: {status_code} - {message}")]
    ProviderError { status_code: u16, message: String },

    #[error("Decode error: {0}")]
    DecodeError(String),

    #[error("Parse error in offer {offer_id} ({context}): {source}")]
    ParseError {
        offer_id: String,
        context: String,
        #[source]
        source: ParseError,
    },

    #[error("Invalid search: {0}")]
    InvalidRequest(String),
}

impl From<reqwest::Error> for SearchError {
    fn from(err: reqwest::Error) -> Self {
        SearchError::NetworkError(err.to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
#[value(rename_all = "snake_case")]
pub enum ProviderKind {
    Amadeus,
    #[default]
    GoogleFlights,
}

#[async_trait]
pub trait FlightProvider: Send + Sync + 'static {
    fn name(&self) -> &'static str;

    async fn search(&self, request: &SearchRequest) -> Result<Vec<FlightOffer>, SearchError>;
}

/// Builds the configured provider behind a shared handle so search tasks can hold it.
pub fn build_provider(config: &AppConfig) -> Result<Arc<dyn FlightProvider>, SearchError> {
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
        .build()?;

    let provider: Arc<dyn FlightProvider> = match config.provider {
        ProviderKind::Amadeus => Arc::new(AmadeusProvider::new(client, config)),
        ProviderKind::GoogleFlights => Arc::new(GoogleFlightsProvider::new(client, config)),
    };
    Ok(provider)
}

// Body is read as text first so decode failures can name the payload problem
pub(crate) async fn read_body(
    response: reqwest::Response,
) -> Result<(StatusCode, String), SearchError> {
    let status = response.status();
    let body = response.text().await?;
    Ok((status, body))
}

pub(crate) fn decode<T: DeserializeOwned>(body: &str) -> Result<T, SearchError> {
    serde_json::from_str(body).map_err(|e| SearchError::DecodeError(e.to_string()))
}

pub(crate) fn parse_failure(offer_id: &str, context: String, source: ParseError) -> SearchError {
    SearchError::ParseError {
        offer_id: offer_id.to_string(),
        context,
        source,
    }
}
