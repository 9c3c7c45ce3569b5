// Application configuration
// Read once at startup from a TOML file, then passed by reference to whoever needs it.
// A first run materializes the defaults so the user has a file to fill in.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use crate::provider::ProviderKind;

pub const APP_DIR_NAME: &str = "flight_finder";
pub const CONFIG_FILE_NAME: &str = "config.toml";
pub const ENV_PREFIX: &str = "FLIGHT_FINDER_";
pub const PLACEHOLDER_SECRET: &str = "please fill in";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Could not determine the user config directory")]
    NoConfigDir,

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Could not serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Invalid value {value:?} for {key}")]
    InvalidValue { key: String, value: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub provider: ProviderKind,
    pub adults: u32,
    pub currency: String,
    pub max_results: u32,
    pub cabin_class: String,
    pub language_code: String,
    pub country_code: String,
    pub amadeus_api_key: String,
    pub amadeus_api_secret: String,
    pub amadeus_base_url: String,
    pub rapid_google_api_key: String,
    pub rapid_google_host: String,
    pub rapid_google_base_url: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            provider: ProviderKind::GoogleFlights,
            adults: 1,
            currency: "CAD".to_string(),
            max_results: 5,
            cabin_class: "ECONOMY".to_string(),
            language_code: "en-US".to_string(),
            country_code: "CA".to_string(),
            amadeus_api_key: PLACEHOLDER_SECRET.to_string(),
            amadeus_api_secret: PLACEHOLDER_SECRET.to_string(),
            amadeus_base_url: "https://test.api.amadeus.com".to_string(),
            rapid_google_api_key: PLACEHOLDER_SECRET.to_string(),
            rapid_google_host: "google-flights2.p.rapidapi.com".to_string(),
            rapid_google_base_url: "https://google-flights2.p.rapidapi.com".to_string(),
        }
    }
}

/// `<config dir>/flight_finder`, home of the config file, the store and the log.
pub fn app_dir() -> Result<PathBuf, ConfigError> {
    dirs::config_dir()
        .map(|dir| dir.join(APP_DIR_NAME))
        .ok_or(ConfigError::NoConfigDir)
}

impl AppConfig {
    /// Loads the config file at `path`, writing the defaults there first if it does not exist.
    pub fn load_or_init(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            let config = Self::default();
            config.write(path)?;
            info!(path = %path.display(), "wrote default config");
            return Ok(config);
        }

        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = toml::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        debug!(path = %path.display(), "loaded config");
        Ok(config)
    }

    /// Startup entry point: file (or defaults) plus `FLIGHT_FINDER_*` environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let path = match path {
            Some(path) => path.to_path_buf(),
            None => app_dir()?.join(CONFIG_FILE_NAME),
        };

        let mut config = Self::load_or_init(&path)?;
        config.apply_overrides(|key| std::env::var(format!("{}{}", ENV_PREFIX, key)).ok())?;
        Ok(config)
    }

    pub fn write(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|source| ConfigError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        let text = toml::to_string_pretty(self)?;
        fs::write(path, text).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Overrides settings from a key lookup; `lookup` receives upper-cased setting names.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = lookup("PROVIDER") {
            self.provider = match value.trim() {
                "amadeus" => ProviderKind::Amadeus,
                "google_flights" => ProviderKind::GoogleFlights,
                _ => return Err(invalid("provider", &value)),
            };
        }
        if let Some(value) = lookup("ADULTS") {
            self.adults = value.trim().parse().map_err(|_| invalid("adults", &value))?;
        }
        if let Some(value) = lookup("MAX_RESULTS") {
            self.max_results = value
                .trim()
                .parse()
                .map_err(|_| invalid("max_results", &value))?;
        }

        let strings: [(&str, &mut String); 10] = [
            ("CURRENCY", &mut self.currency),
            ("CABIN_CLASS", &mut self.cabin_class),
            ("LANGUAGE_CODE", &mut self.language_code),
            ("COUNTRY_CODE", &mut self.country_code),
            ("AMADEUS_API_KEY", &mut self.amadeus_api_key),
            ("AMADEUS_API_SECRET", &mut self.amadeus_api_secret),
            ("AMADEUS_BASE_URL", &mut self.amadeus_base_url),
            ("RAPID_GOOGLE_API_KEY", &mut self.rapid_google_api_key),
            ("RAPID_GOOGLE_HOST", &mut self.rapid_google_host),
            ("RAPID_GOOGLE_BASE_URL", &mut self.rapid_google_base_url),
        ];
        for (key, slot) in strings {
            if let Some(value) = lookup(key) {
                *slot = value;
            }
        }
        Ok(())
    }

    /// Credentials of the selected provider that are blank or still the placeholder.
    pub fn missing_secrets(&self) -> Vec<&'static str> {
        let secrets: Vec<(&'static str, &str)> = match self.provider {
            ProviderKind::Amadeus => vec![
                ("amadeus_api_key", self.amadeus_api_key.as_str()),
                ("amadeus_api_secret", self.amadeus_api_secret.as_str()),
            ],
            ProviderKind::GoogleFlights => {
                vec![("rapid_google_api_key", self.rapid_google_api_key.as_str())]
            }
        };
        secrets
            .into_iter()
            .filter(|(_, value)| value.trim().is_empty() || value.trim() == PLACEHOLDER_SECRET)
            .map(|(name, _)| name)
            .collect()
    }
}

fn invalid(key: &str, value: &str) -> ConfigError {
    ConfigError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
    }
}
