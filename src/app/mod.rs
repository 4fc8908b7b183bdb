mod config;
mod error;
mod logging;
mod report;
mod runtime;
pub mod services;

pub use error::AppError;
pub use report::run_occupancy_report;

pub fn run() -> Result<(), AppError> {
    dotenvy::dotenv().ok();
    logging::init()?;

    let config = config::AppConfig::from_env()?;

    tracing::info!(
        sessions_csv_path = %config.sessions_csv_path,
        registry_db_path = %config.registry_db_path,
        http_bind = %config.http_bind,
        stations_file = config.stations_file.as_deref().unwrap_or("-"),
        ocm_country_code = %config.ocm_country_code,
        ocm_max_results = config.ocm_max_results,
        http_timeout_secs = config.http_timeout_secs,
        "application bootstrap initialized"
    );

    runtime::run(config)
}
