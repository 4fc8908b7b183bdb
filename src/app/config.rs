use std::time::Duration;

use crate::adapters::station_source::OpenChargeMapSettings;
use crate::app::AppError;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub sessions_csv_path: String,
    pub registry_db_path: String,
    pub http_bind: String,
    pub stations_file: Option<String>,
    pub ocm_base_url: String,
    pub ocm_api_key: Option<String>,
    pub ocm_country_code: String,
    pub ocm_max_results: u32,
    pub http_timeout_secs: u64,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> Result<Self, AppError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let sessions_csv_path = non_empty(&lookup, "SESSIONS_CSV_PATH")
            .ok_or_else(|| AppError::config("SESSIONS_CSV_PATH is required"))?;

        let http_timeout_secs = parse_or_default(&lookup, "HTTP_TIMEOUT_SECS", 10_u64)?;
        if http_timeout_secs == 0 {
            return Err(AppError::config("HTTP_TIMEOUT_SECS must be greater than zero"));
        }

        Ok(Self {
            sessions_csv_path,
            registry_db_path: non_empty(&lookup, "REGISTRY_DB_PATH")
                .unwrap_or_else(|| "./data/registry.db".to_string()),
            http_bind: non_empty(&lookup, "HTTP_BIND")
                .unwrap_or_else(|| "0.0.0.0:8080".to_string()),
            stations_file: non_empty(&lookup, "STATIONS_FILE"),
            ocm_base_url: non_empty(&lookup, "OCM_BASE_URL")
                .unwrap_or_else(|| "https://api.openchargemap.io/v3/poi/".to_string()),
            ocm_api_key: non_empty(&lookup, "OCM_API_KEY"),
            ocm_country_code: non_empty(&lookup, "OCM_COUNTRY_CODE")
                .unwrap_or_else(|| "NL".to_string()),
            ocm_max_results: parse_or_default(&lookup, "OCM_MAX_RESULTS", 10_000_u32)?,
            http_timeout_secs,
        })
    }

    pub fn station_directory(&self) -> OpenChargeMapSettings {
        OpenChargeMapSettings {
            base_url: self.ocm_base_url.clone(),
            api_key: self.ocm_api_key.clone(),
            country_code: self.ocm_country_code.clone(),
            max_results: self.ocm_max_results,
            timeout: Duration::from_secs(self.http_timeout_secs),
        }
    }
}

fn non_empty<F>(lookup: &F, key: &str) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_or_default<T, F>(lookup: &F, key: &str, default: T) -> Result<T, AppError>
where
    T: std::str::FromStr + Copy,
    F: Fn(&str) -> Option<String>,
{
    match non_empty(lookup, key) {
        Some(raw) => raw
            .parse::<T>()
            .map_err(|_| AppError::config(format!("{key} must be a valid number"))),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::AppConfig;

    #[test]
    fn rejects_missing_sessions_path() {
        let result = AppConfig::from_lookup(|_| None);
        assert!(result.is_err());
        assert_eq!(
            result.unwrap_err().to_string(),
            "invalid configuration: SESSIONS_CSV_PATH is required"
        );
    }

    #[test]
    fn applies_defaults_for_optional_fields() {
        let result = AppConfig::from_lookup(|key| match key {
            "SESSIONS_CSV_PATH" => Some("./data/laadpaaldata.csv".to_string()),
            "OCM_API_KEY" => Some("   ".to_string()),
            _ => None,
        })
        .expect("config should be valid");

        assert_eq!(result.sessions_csv_path, "./data/laadpaaldata.csv");
        assert_eq!(result.registry_db_path, "./data/registry.db");
        assert_eq!(result.http_bind, "0.0.0.0:8080");
        assert_eq!(result.stations_file, None);
        assert_eq!(result.ocm_base_url, "https://api.openchargemap.io/v3/poi/");
        assert_eq!(result.ocm_api_key, None);
        assert_eq!(result.ocm_country_code, "NL");
        assert_eq!(result.ocm_max_results, 10_000);
        assert_eq!(result.http_timeout_secs, 10);
    }

    #[test]
    fn rejects_invalid_numeric_values() {
        let result = AppConfig::from_lookup(|key| match key {
            "SESSIONS_CSV_PATH" => Some("./data/laadpaaldata.csv".to_string()),
            "OCM_MAX_RESULTS" => Some("lots".to_string()),
            _ => None,
        });

        assert!(result.is_err());
        assert_eq!(
            result.unwrap_err().to_string(),
            "invalid configuration: OCM_MAX_RESULTS must be a valid number"
        );
    }

    #[test]
    fn rejects_zero_timeout() {
        let result = AppConfig::from_lookup(|key| match key {
            "SESSIONS_CSV_PATH" => Some("./data/laadpaaldata.csv".to_string()),
            "HTTP_TIMEOUT_SECS" => Some("0".to_string()),
            _ => None,
        });

        assert_eq!(
            result.unwrap_err().to_string(),
            "invalid configuration: HTTP_TIMEOUT_SECS must be greater than zero"
        );
    }

    #[test]
    fn builds_station_directory_settings() {
        let config = AppConfig::from_lookup(|key| match key {
            "SESSIONS_CSV_PATH" => Some("sessions.csv".to_string()),
            "OCM_API_KEY" => Some("abc123".to_string()),
            "OCM_COUNTRY_CODE" => Some("BE".to_string()),
            "HTTP_TIMEOUT_SECS" => Some("3".to_string()),
            _ => None,
        })
        .expect("config should be valid");

        let settings = config.station_directory();

        assert_eq!(settings.api_key.as_deref(), Some("abc123"));
        assert_eq!(settings.country_code, "BE");
        assert_eq!(settings.timeout, Duration::from_secs(3));
    }
}
