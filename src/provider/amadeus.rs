// Amadeus Self-Service flight offers
// Auth is OAuth2 client-credentials: one token exchange per search, then a bearer GET.

use std::collections::HashMap;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::{decode, parse_failure, read_body, FlightProvider, SearchError};
use crate::config::AppConfig;
use crate::domain::{FlightOffer, SearchRequest, Segment};
use crate::normalize::{
    flatten_messages, order_segments, parse_money, parse_timestamp, qualify_flight_number,
    resolve_carrier, DEFAULT_PRICE_DECIMALS,
};

pub const PROVIDER_NAME: &str = "amadeus";
const TOKEN_PATH: &str = "/v1/security/oauth2/token";
const OFFERS_PATH: &str = "/v2/shopping/flight-offers";
const DEFAULT_MAX_RESULTS: u32 = 5;

// Data structures for the token endpoint
#[derive(Debug, Deserialize, Serialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub token_type: String,
    #[serde(default)]
    pub expires_in: u64,
}

// Data structures for the flight-offers response
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct FlightOffersResponse {
    #[serde(default)]
    pub meta: Option<Meta>,
    #[serde(default)]
    pub data: Vec<AmadeusOffer>,
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct Meta {
    #[serde(default)]
    pub count: u32,
}

#[derive(Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AmadeusOffer {
    pub id: String,
    #[serde(default)]
    pub itineraries: Vec<Itinerary>,
    pub price: AmadeusPrice,
    #[serde(default)]
    pub traveler_pricings: Vec<TravelerPricing>,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct Itinerary {
    #[serde(default)]
    pub duration: String,
    #[serde(default)]
    pub segments: Vec<AmadeusSegment>,
}

#[derive(Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AmadeusSegment {
    #[serde(default)]
    pub id: String,
    pub departure: Endpoint,
    pub arrival: Endpoint,
    #[serde(default)]
    pub carrier_code: String,
    #[serde(default)]
    pub number: String,
    #[serde(default)]
    pub operating: Option<Operating>,
}

#[derive(Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Endpoint {
    pub iata_code: String,
    #[serde(default)]
    pub terminal: Option<String>,
    pub at: String,
}

#[derive(Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Operating {
    #[serde(default)]
    pub carrier_code: String,
}

#[derive(Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AmadeusPrice {
    #[serde(default)]
    pub currency: String,
    pub total: String,
    #[serde(default)]
    pub base: String,
    #[serde(default)]
    pub grand_total: String,
}

#[derive(Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TravelerPricing {
    #[serde(default)]
    pub fare_details_by_segment: Vec<FareDetails>,
}

#[derive(Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FareDetails {
    pub segment_id: String,
    #[serde(default)]
    pub cabin: String,
}

// Error body shared by both endpoints
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct ErrorResponse {
    #[serde(default)]
    pub errors: Vec<Issue>,
    // Token endpoint reports OAuth-style errors instead
    #[serde(default)]
    pub error: String,
    #[serde(default)]
    pub error_description: String,
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct Issue {
    #[serde(default)]
    pub status: Option<u16>,
    #[serde(default)]
    pub code: Option<i64>,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub detail: String,
}

pub struct AmadeusProvider {
    client: Client,
    base_url: String,
    api_key: String,
    api_secret: String,
    cabin_class: String,
    default_currency: String,
    default_max_results: u32,
}

impl AmadeusProvider {
    pub fn new(client: Client, config: &AppConfig) -> Self {
        Self {
            client,
            base_url: config.amadeus_base_url.trim_end_matches('/').to_string(),
            api_key: config.amadeus_api_key.clone(),
            api_secret: config.amadeus_api_secret.clone(),
            cabin_class: config.cabin_class.trim().to_uppercase(),
            default_currency: config.currency.clone(),
            default_max_results: if config.max_results == 0 {
                DEFAULT_MAX_RESULTS
            } else {
                config.max_results
            },
        }
    }

    async fn fetch_token(&self) -> Result<TokenResponse, SearchError> {
        let response = self
            .client
            .post(format!("{}{}", self.base_url, TOKEN_PATH))
            .form(&[
                ("grant_type", "client_credentials"),
                ("client_id", self.api_key.as_str()),
                ("client_secret", self.api_secret.as_str()),
            ])
            .send()
            .await?;

        let (status, body) = read_body(response).await?;
        if !status.is_success() {
            return Err(provider_error(status, &body));
        }

        let token: TokenResponse = decode(&body)?;
        if token.access_token.trim().is_empty() {
            return Err(SearchError::DecodeError(
                "token response has an empty access_token".to_string(),
            ));
        }
        debug!(expires_in = token.expires_in, "obtained amadeus token");
        Ok(token)
    }

    fn query(&self, request: &SearchRequest) -> Vec<(&'static str, String)> {
        let mut query = vec![
            ("originLocationCode", request.origin.clone()),
            ("destinationLocationCode", request.destination.clone()),
            ("departureDate", request.depart_date_string()),
            ("adults", request.adults.to_string()),
            (
                "max",
                request
                    .max_results
                    .filter(|max| *max > 0)
                    .unwrap_or(self.default_max_results)
                    .to_string(),
            ),
            ("currencyCode", self.currency_for(request)),
        ];
        if !self.cabin_class.is_empty() {
            query.push(("travelClass", self.cabin_class.clone()));
        }
        query
    }

    fn currency_for(&self, request: &SearchRequest) -> String {
        request
            .currency
            .clone()
            .unwrap_or_else(|| self.default_currency.trim().to_uppercase())
    }
}

#[async_trait]
impl FlightProvider for AmadeusProvider {
    fn name(&self) -> &'static str {
        PROVIDER_NAME
    }

    async fn search(&self, request: &SearchRequest) -> Result<Vec<FlightOffer>, SearchError> {
        let token = self.fetch_token().await?;
        let query = self.query(request);
        debug!(?query, "amadeus flight-offers query");

        let response = self
            .client
            .get(format!("{}{}", self.base_url, OFFERS_PATH))
            .bearer_auth(&token.access_token)
            .query(&query)
            .send()
            .await?;

        let (status, body) = read_body(response).await?;
        if !status.is_success() {
            return Err(provider_error(status, &body));
        }

        let decoded: FlightOffersResponse = decode(&body)?;
        let offers = adapt_search_response(decoded, &self.currency_for(request))?;
        info!(count = offers.len(), "amadeus search finished");
        Ok(offers)
    }
}

fn provider_error(status: StatusCode, body: &str) -> SearchError {
    let message = match serde_json::from_str::<ErrorResponse>(body) {
        Ok(parsed) if !parsed.errors.is_empty() => flatten_messages(
            parsed
                .errors
                .iter()
                .map(|issue| (issue.title.as_str(), issue.detail.as_str())),
        ),
        Ok(parsed) => flatten_messages([(
            parsed.error.as_str(),
            parsed.error_description.as_str(),
        )]),
        Err(_) => flatten_messages([("", body)]),
    };
    SearchError::ProviderError {
        status_code: status.as_u16(),
        message,
    }
}

/// Maps a decoded Amadeus response onto canonical offers.
///
/// Offers carry a decimal `price.total` in 2dp; cabins come from the first
/// traveler's per-segment fare details.
pub fn adapt_search_response(
    response: FlightOffersResponse,
    fallback_currency: &str,
) -> Result<Vec<FlightOffer>, SearchError> {
    let mut offers = Vec::with_capacity(response.data.len());

    for offer in response.data {
        let currency = if offer.price.currency.trim().is_empty() {
            fallback_currency
        } else {
            offer.price.currency.as_str()
        };
        let total_price = parse_money(&offer.price.total, currency, DEFAULT_PRICE_DECIMALS)
            .map_err(|e| parse_failure(&offer.id, "price".to_string(), e))?;

        let cabins: HashMap<&str, &str> = offer
            .traveler_pricings
            .first()
            .map(|pricing| {
                pricing
                    .fare_details_by_segment
                    .iter()
                    .map(|fare| (fare.segment_id.as_str(), fare.cabin.as_str()))
                    .collect()
            })
            .unwrap_or_default();

        let mut segments = Vec::new();
        let legs = offer.itineraries.iter().flat_map(|i| i.segments.iter());
        for (index, leg) in legs.enumerate() {
            let context = || {
                format!(
                    "leg {} {}->{}",
                    index + 1,
                    leg.departure.iata_code,
                    leg.arrival.iata_code
                )
            };
            let depart_at = parse_timestamp(&leg.departure.at)
                .map_err(|e| parse_failure(&offer.id, context(), e))?;
            let arrive_at = parse_timestamp(&leg.arrival.at)
                .map_err(|e| parse_failure(&offer.id, context(), e))?;

            let carrier = resolve_carrier(
                &leg.carrier_code,
                leg.operating.as_ref().map(|op| op.carrier_code.as_str()),
            );
            let flight_no = qualify_flight_number(&carrier, &leg.number);

            segments.push(Segment {
                from: leg.departure.iata_code.trim().to_string(),
                to: leg.arrival.iata_code.trim().to_string(),
                depart_at,
                arrive_at,
                carrier,
                flight_no,
                cabin: cabins
                    .get(leg.id.as_str())
                    .map(|c| c.trim().to_string())
                    .unwrap_or_default(),
            });
        }

        if segments.is_empty() {
            warn!(offer_id = %offer.id, "dropping amadeus offer without segments");
            continue;
        }
        order_segments(&mut segments);

        offers.push(FlightOffer {
            provider: PROVIDER_NAME.to_string(),
            offer_id: offer.id,
            total_price,
            segments,
        });
    }

    Ok(offers)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::ParseError;
    use crate::provider::mock_server::{self, MockServer};
    use chrono::{TimeZone, Utc};

    const SAMPLE_RESPONSE: &str = r#"{
        "meta": {"count": 1},
        "data": [
            {
                "type": "flight-offer",
                "id": "1",
                "source": "GDS",
                "itineraries": [
                    {
                        "duration": "PT13H5M",
                        "segments": [
                            {
                                "id": "2",
                                "departure": {"iataCode": "LHR", "terminal": "2", "at": "2025-06-01T12:00:00"},
                                "arrival": {"iataCode": "YYZ", "terminal": "1", "at": "2025-06-01T19:05:00"},
                                "carrierCode": "AC",
                                "number": "857",
                                "operating": {"carrierCode": "AC"}
                            },
                            {
                                "id": "1",
                                "departure": {"iataCode": "CPH", "at": "2025-06-01T08:00:00"},
                                "arrival": {"iataCode": "LHR", "at": "2025-06-01T10:10:00"},
                                "carrierCode": "LH",
                                "number": "SK501",
                                "operating": {"carrierCode": "SK"}
                            }
                        ]
                    }
                ],
                "price": {"currency": "CAD", "total": "199.99", "base": "120.00", "grandTotal": "199.99"},
                "travelerPricings": [
                    {
                        "travelerId": "1",
                        "fareDetailsBySegment": [
                            {"segmentId": "1", "cabin": "ECONOMY"},
                            {"segmentId": "2", "cabin": "PREMIUM_ECONOMY"}
                        ]
                    }
                ]
            }
        ]
    }"#;

    fn decode_sample(json: &str) -> FlightOffersResponse {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_adapt_sample_response() {
        let offers = adapt_search_response(decode_sample(SAMPLE_RESPONSE), "CAD").unwrap();
        assert_eq!(offers.len(), 1);

        let offer = &offers[0];
        assert_eq!(offer.provider, "amadeus");
        assert_eq!(offer.offer_id, "1");
        assert_eq!(offer.total_price.amount, 19999);
        assert_eq!(offer.total_price.currency, "CAD");

        // Reordered by departure time
        assert_eq!(offer.segments.len(), 2);
        assert_eq!(offer.segments[0].from, "CPH");
        assert_eq!(offer.segments[1].from, "LHR");
        assert_eq!(
            offer.segments[0].depart_at,
            Utc.with_ymd_and_hms(2025, 6, 1, 8, 0, 0).unwrap()
        );

        // Operating carrier wins and prefixes the number unless already prefixed
        assert_eq!(offer.segments[0].carrier, "SK");
        assert_eq!(offer.segments[0].flight_no, "SK501");
        assert_eq!(offer.segments[1].carrier, "AC");
        assert_eq!(offer.segments[1].flight_no, "AC857");

        assert_eq!(offer.segments[0].cabin, "ECONOMY");
        assert_eq!(offer.segments[1].cabin, "PREMIUM_ECONOMY");
    }

    #[test]
    fn test_blank_currency_falls_back() {
        let json = SAMPLE_RESPONSE.replace("\"currency\": \"CAD\"", "\"currency\": \" \"");
        let offers = adapt_search_response(decode_sample(&json), "eur").unwrap();
        assert_eq!(offers[0].total_price.currency, "EUR");
    }

    #[test]
    fn test_bad_timestamp_names_offer_and_leg() {
        let json = SAMPLE_RESPONSE.replace("2025-06-01T19:05:00", "19:05 tomorrow");
        let err = adapt_search_response(decode_sample(&json), "CAD").unwrap_err();

        match err {
            SearchError::ParseError {
                offer_id,
                context,
                source,
            } => {
                assert_eq!(offer_id, "1");
                assert_eq!(context, "leg 1 LHR->YYZ");
                assert!(matches!(source, ParseError::Timestamp { .. }));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_bad_price_is_parse_error() {
        let json = SAMPLE_RESPONSE.replace("\"total\": \"199.99\"", "\"total\": \"n/a\"");
        let err = adapt_search_response(decode_sample(&json), "CAD").unwrap_err();
        assert!(matches!(
            err,
            SearchError::ParseError {
                source: ParseError::Price { .. },
                ..
            }
        ));
    }

    #[test]
    fn test_offer_without_segments_is_dropped() {
        let json = r#"{"data": [{"id": "9", "itineraries": [], "price": {"currency": "CAD", "total": "10.00"}}]}"#;
        let offers = adapt_search_response(decode_sample(json), "CAD").unwrap();
        assert!(offers.is_empty());
    }

    #[test]
    fn test_empty_response() {
        let offers = adapt_search_response(decode_sample(r#"{"meta": {"count": 0}, "data": []}"#), "CAD")
            .unwrap();
        assert!(offers.is_empty());
    }

    #[test]
    fn test_token_response_requires_access_token() {
        let result: Result<TokenResponse, _> =
            decode(r#"{"type": "amadeusOAuth2Token", "expires_in": 1799}"#);
        assert!(matches!(result, Err(SearchError::DecodeError(_))));

        let token: TokenResponse =
            decode(r#"{"access_token": "abc", "token_type": "Bearer", "expires_in": 1799}"#).unwrap();
        assert_eq!(token.access_token, "abc");
    }

    #[test]
    fn test_error_body_is_flattened() {
        let body = r#"{"errors": [
            {"status": 400, "code": 477, "title": "INVALID FORMAT", "detail": "departureDate must be in the future"},
            {"status": 400, "code": 32171, "title": "", "detail": "adults is required"}
        ]}"#;
        let err = provider_error(StatusCode::BAD_REQUEST, body);
        match err {
            SearchError::ProviderError {
                status_code,
                message,
            } => {
                assert_eq!(status_code, 400);
                assert_eq!(
                    message,
                    "INVALID FORMAT: departureDate must be in the future; adults is required"
                );
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_oauth_error_body() {
        let body = r#"{"error": "invalid_client", "error_description": "Client credentials are invalid", "code": 38187}"#;
        let err = provider_error(StatusCode::UNAUTHORIZED, body);
        assert_eq!(
            err.to_string(),
            "Provider error: 401 - invalid_client: Client credentials are invalid"
        );
    }

    #[test]
    fn test_non_json_error_body() {
        let err = provider_error(StatusCode::BAD_GATEWAY, "upstream down");
        assert_eq!(err.to_string(), "Provider error: 502 - upstream down");
    }

    #[test]
    fn test_query_uses_request_and_defaults() {
        let mut config = AppConfig::default();
        config.max_results = 7;
        let provider = AmadeusProvider::new(Client::new(), &config);

        let request = SearchRequest::new("CPH", "YYZ", "2025-06-01", 2).unwrap();
        let query = provider.query(&request);

        let value = |key: &str| {
            query
                .iter()
                .find(|(k, _)| *k == key)
                .map(|(_, v)| v.clone())
        };
        assert_eq!(value("originLocationCode").as_deref(), Some("CPH"));
        assert_eq!(value("departureDate").as_deref(), Some("2025-06-01"));
        assert_eq!(value("adults").as_deref(), Some("2"));
        assert_eq!(value("max").as_deref(), Some("7"));
        assert_eq!(value("currencyCode").as_deref(), Some("CAD"));
        assert_eq!(value("travelClass").as_deref(), Some("ECONOMY"));
    }

    #[test]
    fn test_zero_cap_falls_back_to_default_max() {
        let provider = AmadeusProvider::new(Client::new(), &AppConfig::default());
        let mut request = SearchRequest::new("CPH", "YYZ", "2025-06-01", 1)
            .unwrap()
            .with_max_results(0);

        let max = |query: Vec<(&'static str, String)>| {
            query.into_iter().find(|(k, _)| *k == "max").map(|(_, v)| v)
        };
        assert_eq!(max(provider.query(&request)).as_deref(), Some("5"));

        // Set directly, bypassing the builder
        request.max_results = Some(0);
        assert_eq!(max(provider.query(&request)).as_deref(), Some("5"));
    }

    fn mock_config(base_url: String) -> AppConfig {
        let mut config = AppConfig::default();
        config.amadeus_base_url = base_url;
        config.amadeus_api_key = "test-key".to_string();
        config.amadeus_api_secret = "test-secret".to_string();
        config
    }

    #[tokio::test]
    async fn test_search_exchanges_token_then_sends_bearer() {
        let server = MockServer::start(vec![
            (
                200,
                r#"{"access_token": "tok-123", "token_type": "Bearer", "expires_in": 1799}"#
                    .to_string(),
            ),
            (200, SAMPLE_RESPONSE.to_string()),
        ])
        .await;
        let provider = AmadeusProvider::new(mock_server::client(), &mock_config(server.url()));

        let request = SearchRequest::new("CPH", "YYZ", "2025-06-01", 1).unwrap();
        let offers = provider.search(&request).await.unwrap();
        assert_eq!(offers.len(), 1);
        assert_eq!(offers[0].offer_id, "1");

        let requests = server.requests().await;
        assert_eq!(requests.len(), 2);

        let token = &requests[0];
        assert_eq!(token.method, "POST");
        assert_eq!(token.target, TOKEN_PATH);
        assert!(token.body.contains("grant_type=client_credentials"));
        assert!(token.body.contains("client_id=test-key"));
        assert!(token.body.contains("client_secret=test-secret"));

        let search = &requests[1];
        assert_eq!(search.method, "GET");
        assert!(search.target.starts_with(OFFERS_PATH));
        assert!(search.target.contains("originLocationCode=CPH"));
        assert!(search.target.contains("max=5"));
        assert_eq!(
            search.headers.get("authorization").map(String::as_str),
            Some("Bearer tok-123")
        );
    }

    #[tokio::test]
    async fn test_rejected_credentials_stop_before_search() {
        let server = MockServer::start(vec![(
            401,
            r#"{"error": "invalid_client", "error_description": "Client credentials are invalid"}"#
                .to_string(),
        )])
        .await;
        let provider = AmadeusProvider::new(mock_server::client(), &mock_config(server.url()));

        let request = SearchRequest::new("CPH", "YYZ", "2025-06-01", 1).unwrap();
        let err = provider.search(&request).await.unwrap_err();
        assert_eq!(
            err.to_string(),
            "Provider error: 401 - invalid_client: Client credentials are invalid"
        );
        assert_eq!(server.requests().await.len(), 1);
    }

    #[tokio::test]
    async fn test_unreachable_host_is_network_error() {
        let provider = AmadeusProvider::new(
            mock_server::client(),
            &mock_config(mock_server::closed_url().await),
        );

        let request = SearchRequest::new("CPH", "YYZ", "2025-06-01", 1).unwrap();
        let err = provider.search(&request).await.unwrap_err();
        assert!(matches!(err, SearchError::NetworkError(_)), "{:?}", err);
    }
}
