use std::fs;
use std::time::Duration;

use reqwest::blocking::Client;
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

use crate::domain::station::{ParsedStations, StationParseError, parse_station_directory};

/// Seam for the charging-station directory so the map can run from a dump file.
pub trait StationSource: Send + Sync + 'static {
    fn fetch_directory(&self) -> Result<Value, StationSourceError>;
}

#[derive(Debug, Error)]
pub enum StationSourceError {
    #[error("station directory request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("station directory responded with status {0}")]
    Status(u16),
    #[error("failed to read station dump {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("failed to parse station directory JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Payload(#[from] StationParseError),
}

pub fn fetch_stations(source: &dyn StationSource) -> Result<ParsedStations, StationSourceError> {
    let payload = source.fetch_directory()?;
    let parsed = parse_station_directory(&payload)?;
    debug!(
        markers = parsed.markers.len(),
        excluded = parsed.excluded_without_coordinates,
        "parsed station directory"
    );
    Ok(parsed)
}

#[derive(Debug, Clone, PartialEq)]
pub struct OpenChargeMapSettings {
    pub base_url: String,
    pub api_key: Option<String>,
    pub country_code: String,
    pub max_results: u32,
    pub timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct OpenChargeMapClient {
    settings: OpenChargeMapSettings,
}

impl OpenChargeMapClient {
    pub fn new(settings: OpenChargeMapSettings) -> Self {
        Self { settings }
    }

    fn query(&self) -> Vec<(&'static str, String)> {
        let mut query = vec![
            ("output", "json".to_string()),
            ("countrycode", self.settings.country_code.clone()),
            ("maxresults", self.settings.max_results.to_string()),
            ("compact", "true".to_string()),
            ("verbose", "false".to_string()),
        ];
        if let Some(key) = &self.settings.api_key {
            query.push(("key", key.clone()));
        }
        query
    }
}

impl StationSource for OpenChargeMapClient {
    // The blocking client owns its own runtime, so it is built on the calling
    // thread and never outlives the request.
    fn fetch_directory(&self) -> Result<Value, StationSourceError> {
        let client = Client::builder().timeout(self.settings.timeout).build()?;
        let response = client
            .get(&self.settings.base_url)
            .query(&self.query())
            .send()?;

        let status = response.status();
        if !status.is_success() {
            return Err(StationSourceError::Status(status.as_u16()));
        }

        Ok(response.json::<Value>()?)
    }
}

/// Reads a previously saved directory response from disk on every fetch.
#[derive(Debug, Clone)]
pub struct StationFileSource {
    path: String,
}

impl StationFileSource {
    pub fn new(path: impl Into<String>) -> Self {
        Self { path: path.into() }
    }
}

impl StationSource for StationFileSource {
    fn fetch_directory(&self) -> Result<Value, StationSourceError> {
        let content = fs::read_to_string(&self.path).map_err(|source| StationSourceError::Io {
            path: self.path.clone(),
            source,
        })?;
        Ok(serde_json::from_str(&content)?)
    }
}
