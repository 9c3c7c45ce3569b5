// Canonical flight model shared by every provider adapter, the UI and the store

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::provider::SearchError;

pub const DATE_FORMAT: &str = "%Y-%m-%d";

// One user submission, consumed by a single provider call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchRequest {
    pub origin: String,
    pub destination: String,
    pub depart_date: NaiveDate,
    pub adults: u32,
    pub max_results: Option<u32>,
    pub currency: Option<String>,
}

impl SearchRequest {
    /// Builds a request from raw user input.
    ///
    /// Airport codes are trimmed and upper-cased before validation, the date
    /// must be `YYYY-MM-DD` and at least one adult must travel.
    pub fn new(
        origin: &str,
        destination: &str,
        depart_date: &str,
        adults: u32,
    ) -> Result<Self, SearchError> {
        let origin = normalize_iata(origin, "origin")?;
        let destination = normalize_iata(destination, "destination")?;

        let depart_date = NaiveDate::parse_from_str(depart_date.trim(), DATE_FORMAT)
            .map_err(|_| {
                SearchError::InvalidRequest(format!(
                    "departure date {:?} is not YYYY-MM-DD",
                    depart_date.trim()
                ))
            })?;

        if adults == 0 {
            return Err(SearchError::InvalidRequest(
                "at least one adult is required".to_string(),
            ));
        }

        Ok(Self {
            origin,
            destination,
            depart_date,
            adults,
            max_results: None,
            currency: None,
        })
    }

    /// Caps the number of offers; zero leaves the request uncapped.
    pub fn with_max_results(mut self, max_results: u32) -> Self {
        self.max_results = (max_results > 0).then_some(max_results);
        self
    }

    pub fn with_currency(mut self, currency: &str) -> Self {
        let currency = currency.trim().to_uppercase();
        self.currency = (!currency.is_empty()).then_some(currency);
        self
    }

    pub fn depart_date_string(&self) -> String {
        self.depart_date.format(DATE_FORMAT).to_string()
    }
}

fn normalize_iata(code: &str, field: &str) -> Result<String, SearchError> {
    let code = code.trim().to_uppercase();
    if code.len() == 3 && code.chars().all(|c| c.is_ascii_uppercase()) {
        Ok(code)
    } else {
        Err(SearchError::InvalidRequest(format!(
            "{} must be a 3-letter IATA code, got {:?}",
            field, code
        )))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlightOffer {
    pub provider: String,
    pub offer_id: String,
    pub total_price: Money,
    // Ordered by departure, never empty once a search succeeded
    pub segments: Vec<Segment>,
}

impl FlightOffer {
    pub fn first_departure(&self) -> Option<DateTime<Utc>> {
        self.segments.first().map(|s| s.depart_at)
    }

    pub fn last_arrival(&self) -> Option<DateTime<Utc>> {
        self.segments.last().map(|s| s.arrive_at)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Segment {
    pub from: String,
    pub to: String,
    pub depart_at: DateTime<Utc>,
    pub arrive_at: DateTime<Utc>,
    pub carrier: String,
    pub flight_no: String,
    pub cabin: String,
}

impl Segment {
    // May be negative for inconsistent provider data, clamped when rendered
    pub fn duration(&self) -> chrono::Duration {
        self.arrive_at - self.depart_at
    }
}

// Amount is always in minor units (cents for CAD/USD)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Money {
    pub amount: i64,
    pub currency: String,
}
