// Main library file for the terminal flight search tool

pub mod app;
pub mod config;
pub mod domain;
pub mod normalize;
pub mod provider;
pub mod render;
pub mod store;
pub mod tui;

// Re-export key types for convenience
pub use app::{Action, App, Screen};
pub use config::{AppConfig, ConfigError};
pub use domain::{FlightOffer, Money, SearchRequest, Segment};
pub use normalize::ParseError;
pub use provider::{build_provider, FlightProvider, ProviderKind, SearchError};
pub use store::{JsonStore, StoreError};
