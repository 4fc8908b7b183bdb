use std::sync::Arc;

use actix_cors::Cors;
use actix_web::{App, HttpServer, web};

use crate::adapters::api::{ApiState, configure_routes};
use crate::adapters::station_source::{OpenChargeMapClient, StationFileSource, StationSource};
use crate::app::config::AppConfig;
use crate::app::error::AppError;
use crate::app::services::{DatasetService, DatasetSources};

pub fn station_source(config: &AppConfig) -> Arc<dyn StationSource> {
    match &config.stations_file {
        Some(path) => {
            tracing::info!(path = %path, "serving stations from dump file");
            Arc::new(StationFileSource::new(path.clone()))
        }
        None => {
            tracing::info!(base_url = %config.ocm_base_url, "serving stations from directory api");
            Arc::new(OpenChargeMapClient::new(config.station_directory()))
        }
    }
}

pub fn run(config: AppConfig) -> Result<(), AppError> {
    let datasets = DatasetService::load(DatasetSources {
        sessions_csv_path: config.sessions_csv_path.clone(),
        registry_db_path: config.registry_db_path.clone(),
    })
    .map_err(AppError::dataset_load)?;

    let api_state = ApiState {
        datasets,
        stations: station_source(&config),
    };

    tracing::info!(bind = %config.http_bind, "http server starting");

    let server_result = actix_web::rt::System::new().block_on(async move {
        HttpServer::new(move || {
            App::new()
                .wrap(Cors::permissive())
                .app_data(web::Data::new(api_state.clone()))
                .configure(configure_routes)
        })
        .bind(&config.http_bind)?
        .run()
        .await
    });

    server_result.map_err(AppError::runtime)
}
