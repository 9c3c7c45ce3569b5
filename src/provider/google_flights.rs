// Google Flights through RapidAPI
// Static key header auth. The payload reports failures in-band with `status: false`,
// prices as bare JSON numbers and leg times as zone-less "YYYY-M-D HH:MM".

use std::collections::BTreeMap;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};

use super::{decode, parse_failure, read_body, FlightProvider, SearchError};
use crate::config::AppConfig;
use crate::domain::{FlightOffer, SearchRequest, Segment};
use crate::normalize::{
    flatten_messages, order_segments, parse_money, parse_timestamp, DEFAULT_PRICE_DECIMALS,
};

pub const PROVIDER_NAME: &str = "google_flights";
const SEARCH_PATH: &str = "/api/v1/searchFlights";
const FALLBACK_CURRENCY: &str = "CAD";

// Data structures for the searchFlights response
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct SearchFlightsResponse {
    #[serde(default)]
    pub status: bool,
    #[serde(default)]
    pub message: Option<ProviderMessage>,
    #[serde(default)]
    pub timestamp: i64,
    // Shape varies on failures, only decoded once status is true
    #[serde(default)]
    pub data: Value,
}

#[derive(Debug, Deserialize, Serialize)]
#[serde(untagged)]
pub enum ProviderMessage {
    Text(String),
    Fragments(Vec<BTreeMap<String, Value>>),
}

impl ProviderMessage {
    pub fn flatten(&self) -> String {
        let pairs: Vec<(String, String)> = match self {
            ProviderMessage::Text(text) => vec![(String::new(), text.clone())],
            ProviderMessage::Fragments(fragments) => fragments
                .iter()
                .flat_map(|fragment| fragment.iter())
                .map(|(key, value)| (key.clone(), value_text(value)))
                .collect(),
        };
        flatten_messages(pairs.iter().map(|(k, v)| (k.as_str(), v.as_str())))
    }
}

fn value_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct SearchData {
    #[serde(default)]
    pub itineraries: Itineraries,
}

#[derive(Debug, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Itineraries {
    #[serde(default)]
    pub top_flights: Vec<FlightOption>,
    #[serde(default)]
    pub other_flights: Vec<FlightOption>,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct FlightOption {
    #[serde(default)]
    pub departure_time: String,
    #[serde(default)]
    pub arrival_time: String,
    #[serde(default)]
    pub flights: Vec<FlightLeg>,
    #[serde(default)]
    pub layovers: Vec<Layover>,
    #[serde(default)]
    pub price: Option<serde_json::Number>,
    #[serde(default)]
    pub stops: u32,
    #[serde(default)]
    pub next_token: Option<String>,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct FlightLeg {
    pub departure_airport: AirportTime,
    pub arrival_airport: AirportTime,
    #[serde(default)]
    pub duration: i64,
    #[serde(default)]
    pub airline: String,
    #[serde(default)]
    pub flight_number: String,
    #[serde(default)]
    pub aircraft: String,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct AirportTime {
    #[serde(default)]
    pub airport_name: String,
    pub airport_code: String,
    pub time: String,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct Layover {
    #[serde(default)]
    pub airport_code: String,
    #[serde(default)]
    pub duration: i64,
}

pub struct GoogleFlightsProvider {
    client: Client,
    base_url: String,
    host: String,
    api_key: String,
    travel_class: String,
    language_code: String,
    country_code: String,
    default_currency: String,
    default_max_results: Option<u32>,
}

impl GoogleFlightsProvider {
    pub fn new(client: Client, config: &AppConfig) -> Self {
        Self {
            client,
            base_url: config.rapid_google_base_url.trim_end_matches('/').to_string(),
            host: config.rapid_google_host.clone(),
            api_key: config.rapid_google_api_key.clone(),
            travel_class: config.cabin_class.trim().to_uppercase(),
            language_code: config.language_code.clone(),
            country_code: config.country_code.clone(),
            default_currency: config.currency.trim().to_uppercase(),
            default_max_results: (config.max_results > 0).then_some(config.max_results),
        }
    }

    fn currency_for(&self, request: &SearchRequest) -> String {
        request
            .currency
            .clone()
            .or_else(|| (!self.default_currency.is_empty()).then(|| self.default_currency.clone()))
            .unwrap_or_else(|| FALLBACK_CURRENCY.to_string())
    }

    // Zero on either side means uncapped
    fn result_cap(&self, request: &SearchRequest) -> Option<u32> {
        request
            .max_results
            .filter(|max| *max > 0)
            .or(self.default_max_results)
    }

    fn query(&self, request: &SearchRequest) -> Vec<(&'static str, String)> {
        vec![
            ("departure_id", request.origin.clone()),
            ("arrival_id", request.destination.clone()),
            ("outbound_date", request.depart_date_string()),
            ("adults", request.adults.to_string()),
            ("currency", self.currency_for(request)),
            ("travel_class", self.travel_class.clone()),
            ("show_hidden", "1".to_string()),
            ("language_code", self.language_code.clone()),
            ("country_code", self.country_code.clone()),
            ("search_type", "best".to_string()),
        ]
    }
}

#[async_trait]
impl FlightProvider for GoogleFlightsProvider {
    fn name(&self) -> &'static str {
        PROVIDER_NAME
    }

    async fn search(&self, request: &SearchRequest) -> Result<Vec<FlightOffer>, SearchError> {
        let query = self.query(request);
        debug!(?query, "google flights query");

        let response = self
            .client
            .get(format!("{}{}", self.base_url, SEARCH_PATH))
            .header("x-rapidapi-key", &self.api_key)
            .header("x-rapidapi-host", &self.host)
            .query(&query)
            .send()
            .await?;

        let (status, body) = read_body(response).await?;
        let decoded: Result<SearchFlightsResponse, _> = decode(&body);
        if !status.is_success() {
            let message = decoded
                .ok()
                .and_then(|r| r.message.map(|m| m.flatten()))
                .unwrap_or_else(|| flatten_messages([("", body.as_str())]));
            return Err(SearchError::ProviderError {
                status_code: status.as_u16(),
                message,
            });
        }

        let mut offers = adapt_search_response(decoded?, &self.currency_for(request))?;
        if let Some(max) = self.result_cap(request) {
            offers.truncate(max as usize);
        }
        info!(count = offers.len(), "google flights search finished");
        Ok(offers)
    }
}

/// Maps a decoded response onto canonical offers, top flights first.
///
/// Fails with `ProviderError` when the payload reports `status: false`.
pub fn adapt_search_response(
    response: SearchFlightsResponse,
    currency: &str,
) -> Result<Vec<FlightOffer>, SearchError> {
    if !response.status {
        return Err(SearchError::ProviderError {
            status_code: 200,
            message: response
                .message
                .map(|m| m.flatten())
                .unwrap_or_else(|| flatten_messages(Vec::<(&str, &str)>::new())),
        });
    }

    let data: SearchData = if response.data.is_null() {
        SearchData::default()
    } else {
        serde_json::from_value(response.data)
            .map_err(|e| SearchError::DecodeError(e.to_string()))?
    };

    let Itineraries {
        top_flights,
        other_flights,
    } = data.itineraries;

    let mut offers = Vec::with_capacity(top_flights.len() + other_flights.len());
    for (index, option) in top_flights.into_iter().chain(other_flights).enumerate() {
        let offer_id = option
            .next_token
            .as_deref()
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| format!("offer-{}-{}", response.timestamp, index));

        let amount = option
            .price
            .as_ref()
            .map(|n| n.to_string())
            .unwrap_or_default();
        let total_price = parse_money(&amount, currency, DEFAULT_PRICE_DECIMALS)
            .map_err(|e| parse_failure(&offer_id, "price".to_string(), e))?;

        let mut segments = Vec::with_capacity(option.flights.len());
        for (leg_index, leg) in option.flights.iter().enumerate() {
            let context = || {
                format!(
                    "leg {} {}->{}",
                    leg_index + 1,
                    leg.departure_airport.airport_code,
                    leg.arrival_airport.airport_code
                )
            };
            let depart_at = parse_timestamp(&leg.departure_airport.time)
                .map_err(|e| parse_failure(&offer_id, context(), e))?;
            let arrive_at = parse_timestamp(&leg.arrival_airport.time)
                .map_err(|e| parse_failure(&offer_id, context(), e))?;

            // Airline names and already-qualified numbers, nothing to prefix
            segments.push(Segment {
                from: leg.departure_airport.airport_code.trim().to_string(),
                to: leg.arrival_airport.airport_code.trim().to_string(),
                depart_at,
                arrive_at,
                carrier: leg.airline.trim().to_string(),
                flight_no: leg.flight_number.trim().to_string(),
                cabin: String::new(),
            });
        }

        if segments.is_empty() {
            warn!(%offer_id, "dropping google flights option without legs");
            continue;
        }
        order_segments(&mut segments);

        offers.push(FlightOffer {
            provider: PROVIDER_NAME.to_string(),
            offer_id,
            total_price,
            segments,
        });
    }

    Ok(offers)
}
