use std::sync::Arc;

use actix_web::{HttpResponse, Responder, error, get, post, web};
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::adapters::station_source::{StationSource, StationSourceError, fetch_stations};
use crate::app::services::{DatasetService, ServiceError, resolve_day};
use crate::domain::charging_charts::{
    BoxplotOptions, DEFAULT_HISTOGRAM_BINS, EnergyScatterOptions, HistogramOptions,
    MAX_HISTOGRAM_BINS, boxplots, charge_vs_connected, correlation_matrix, energy_scatter,
    time_histogram,
};
use crate::domain::charging_session::{LoadReport, PowerType};
use crate::domain::occupancy::{occupancy_timeline, occupancy_timeline_by_power_type};
use crate::domain::registry_analytics::{
    BodyTypeOptions, BrandTotal, MonthlyCount, PriceModelError, body_type_histogram,
    brand_has_vehicles, brand_options, brand_totals, dimension_comparison, model_trends,
    price_model, top_brands_per_month,
};
use crate::domain::station::{PROVINCES, station_map};

const MINUTE_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";
const TOP_BRAND_CHOICES: [usize; 2] = [5, 10];

#[derive(Clone)]
pub struct ApiState {
    pub datasets: DatasetService,
    pub stations: Arc<dyn StationSource>,
}

#[derive(Debug, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ChargingSummaryResponse {
    pub sessions: usize,
    pub first_day: Option<NaiveDate>,
    pub last_day: Option<NaiveDate>,
    pub load_report: LoadReport,
}

#[derive(Debug, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct OccupancyMinute {
    pub minute: String,
    pub active_sessions: usize,
}

#[derive(Debug, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct OccupancyResponse {
    pub date: NaiveDate,
    pub points: Vec<OccupancyMinute>,
}

#[derive(Debug, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PowerTypeOccupancyMinute {
    pub minute: String,
    pub power_type: PowerType,
    pub active_sessions: usize,
}

#[derive(Debug, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PowerTypeOccupancyResponse {
    pub date: NaiveDate,
    pub power_types: Vec<PowerType>,
    pub points: Vec<PowerTypeOccupancyMinute>,
}

#[derive(Debug, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TopBrandsResponse {
    pub brands: Vec<BrandTotal>,
    pub counts: Vec<MonthlyCount>,
}

#[derive(Debug, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ModelTrendsResponse {
    pub brand: String,
    pub counts: Vec<MonthlyCount>,
}

#[derive(Debug, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MarkerResponse {
    pub latitude: f64,
    pub longitude: f64,
    pub address: Option<String>,
    pub power_kw: Option<f64>,
    pub popup: String,
}

#[derive(Debug, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StationMapResponse {
    pub province: &'static str,
    pub center: [f64; 2],
    pub zoom: u8,
    pub markers: Vec<MarkerResponse>,
    pub excluded_without_coordinates: usize,
}

#[derive(Debug, Deserialize)]
pub struct DayQuery {
    pub date: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistogramQuery {
    pub log_scale: Option<bool>,
    pub bins: Option<usize>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnergyScatterQuery {
    pub show_trendline: Option<bool>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoxplotQuery {
    pub charge_time_log_scale: Option<bool>,
    pub total_energy_log_scale: Option<bool>,
    pub max_power_log_scale: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct TopBrandsQuery {
    pub n: Option<usize>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BodyTypeQuery {
    pub log_scale: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct StationMapQuery {
    pub province: Option<String>,
}

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.app_data(web::QueryConfig::default().error_handler(|err, _req| {
        let response = bad_request(err.to_string());
        error::InternalError::from_response(err, response).into()
    }))
    .service(health)
    .service(charging_summary)
    .service(occupancy)
    .service(occupancy_by_power_type)
    .service(charge_vs_connected_endpoint)
    .service(time_histogram_endpoint)
    .service(energy_scatter_endpoint)
    .service(boxplots_endpoint)
    .service(correlation_endpoint)
    .service(brands)
    .service(top_brands)
    .service(brand_models)
    .service(body_types)
    .service(dimensions)
    .service(price_model_endpoint)
    .service(provinces)
    .service(station_map_endpoint)
    .service(reload_datasets);
}

#[get("/health")]
async fn health() -> impl Responder {
    HttpResponse::Ok().json(serde_json::json!({ "status": "ok" }))
}

#[get("/charging/summary")]
async fn charging_summary(state: web::Data<ApiState>) -> impl Responder {
    let dataset = match state.datasets.charging() {
        Ok(dataset) => dataset,
        Err(error) => return service_error_response(error),
    };
    let range = dataset.date_range();

    HttpResponse::Ok().json(ChargingSummaryResponse {
        sessions: dataset.sessions().len(),
        first_day: range.map(|(first, _)| first),
        last_day: range.map(|(_, last)| last),
        load_report: dataset.report().clone(),
    })
}

#[get("/charging/occupancy")]
async fn occupancy(state: web::Data<ApiState>, query: web::Query<DayQuery>) -> impl Responder {
    let requested = match parse_day(query.date.as_deref()) {
        Ok(day) => day,
        Err(response) => return response,
    };
    let dataset = match state.datasets.charging() {
        Ok(dataset) => dataset,
        Err(error) => return service_error_response(error),
    };
    let day = match resolve_day(&dataset, requested) {
        Ok(day) => day,
        Err(error) => return service_error_response(error),
    };

    let points = occupancy_timeline(dataset.sessions(), day)
        .into_iter()
        .map(|point| OccupancyMinute {
            minute: format_minute(point.minute),
            active_sessions: point.active_sessions,
        })
        .collect();

    HttpResponse::Ok().json(OccupancyResponse { date: day, points })
}

#[get("/charging/occupancy/power-type")]
async fn occupancy_by_power_type(
    state: web::Data<ApiState>,
    query: web::Query<DayQuery>,
) -> impl Responder {
    let requested = match parse_day(query.date.as_deref()) {
        Ok(day) => day,
        Err(response) => return response,
    };
    let dataset = match state.datasets.charging() {
        Ok(dataset) => dataset,
        Err(error) => return service_error_response(error),
    };
    let day = match resolve_day(&dataset, requested) {
        Ok(day) => day,
        Err(error) => return service_error_response(error),
    };

    let timeline = occupancy_timeline_by_power_type(dataset.sessions(), day);
    let mut power_types: Vec<PowerType> = timeline.iter().map(|point| point.category).collect();
    power_types.sort();
    power_types.dedup();

    let points = timeline
        .into_iter()
        .map(|point| PowerTypeOccupancyMinute {
            minute: format_minute(point.minute),
            power_type: point.category,
            active_sessions: point.active_sessions,
        })
        .collect();

    HttpResponse::Ok().json(PowerTypeOccupancyResponse {
        date: day,
        power_types,
        points,
    })
}

#[get("/charging/charge-vs-connected")]
async fn charge_vs_connected_endpoint(state: web::Data<ApiState>) -> impl Responder {
    match state.datasets.charging() {
        Ok(dataset) => HttpResponse::Ok().json(charge_vs_connected(dataset.sessions())),
        Err(error) => service_error_response(error),
    }
}

#[get("/charging/time-histogram")]
async fn time_histogram_endpoint(
    state: web::Data<ApiState>,
    query: web::Query<HistogramQuery>,
) -> impl Responder {
    let bins = query.bins.unwrap_or(DEFAULT_HISTOGRAM_BINS);
    if !(1..=MAX_HISTOGRAM_BINS).contains(&bins) {
        return bad_request(format!("bins must be between 1 and {MAX_HISTOGRAM_BINS}"));
    }
    let options = HistogramOptions {
        log_scale: query.log_scale.unwrap_or(true),
        bins,
    };

    match state.datasets.charging() {
        Ok(dataset) => HttpResponse::Ok().json(time_histogram(dataset.sessions(), options)),
        Err(error) => service_error_response(error),
    }
}

#[get("/charging/energy-scatter")]
async fn energy_scatter_endpoint(
    state: web::Data<ApiState>,
    query: web::Query<EnergyScatterQuery>,
) -> impl Responder {
    let options = EnergyScatterOptions {
        show_trendline: query.show_trendline.unwrap_or(true),
    };

    match state.datasets.charging() {
        Ok(dataset) => HttpResponse::Ok().json(energy_scatter(dataset.sessions(), options)),
        Err(error) => service_error_response(error),
    }
}

#[get("/charging/boxplots")]
async fn boxplots_endpoint(
    state: web::Data<ApiState>,
    query: web::Query<BoxplotQuery>,
) -> impl Responder {
    let options = BoxplotOptions {
        charge_time_log_scale: query.charge_time_log_scale.unwrap_or(true),
        total_energy_log_scale: query.total_energy_log_scale.unwrap_or(true),
        max_power_log_scale: query.max_power_log_scale.unwrap_or(true),
    };

    match state.datasets.charging() {
        Ok(dataset) => HttpResponse::Ok().json(boxplots(dataset.sessions(), options)),
        Err(error) => service_error_response(error),
    }
}

#[get("/charging/correlation")]
async fn correlation_endpoint(state: web::Data<ApiState>) -> impl Responder {
    match state.datasets.charging() {
        Ok(dataset) => HttpResponse::Ok().json(correlation_matrix(dataset.sessions())),
        Err(error) => service_error_response(error),
    }
}

#[get("/vehicles/brands")]
async fn brands(state: web::Data<ApiState>) -> impl Responder {
    match state.datasets.registry() {
        Ok(registry) => HttpResponse::Ok().json(brand_options(&registry)),
        Err(error) => service_error_response(error),
    }
}

#[get("/vehicles/brands/top")]
async fn top_brands(
    state: web::Data<ApiState>,
    query: web::Query<TopBrandsQuery>,
) -> impl Responder {
    let top = query.n.unwrap_or(TOP_BRAND_CHOICES[0]);
    if !TOP_BRAND_CHOICES.contains(&top) {
        return bad_request("n must be 5 or 10");
    }

    match state.datasets.registry() {
        Ok(registry) => {
            let mut ranked = brand_totals(&registry);
            ranked.truncate(top);
            HttpResponse::Ok().json(TopBrandsResponse {
                brands: ranked,
                counts: top_brands_per_month(&registry, top),
            })
        }
        Err(error) => service_error_response(error),
    }
}

#[get("/vehicles/brands/{brand}/models")]
async fn brand_models(state: web::Data<ApiState>, path: web::Path<String>) -> impl Responder {
    let brand = path.into_inner();
    let registry = match state.datasets.registry() {
        Ok(registry) => registry,
        Err(error) => return service_error_response(error),
    };

    if !brand_has_vehicles(&registry, &brand) {
        return HttpResponse::NotFound().json(serde_json::json!({
            "error": format!("no results for brand {brand}")
        }));
    }

    let counts = model_trends(&registry, &brand);
    HttpResponse::Ok().json(ModelTrendsResponse { brand, counts })
}

#[get("/vehicles/body-types")]
async fn body_types(
    state: web::Data<ApiState>,
    query: web::Query<BodyTypeQuery>,
) -> impl Responder {
    let options = BodyTypeOptions {
        log_scale: query.log_scale.unwrap_or(true),
    };

    match state.datasets.registry() {
        Ok(registry) => HttpResponse::Ok().json(body_type_histogram(&registry, options)),
        Err(error) => service_error_response(error),
    }
}

#[get("/vehicles/dimensions")]
async fn dimensions(state: web::Data<ApiState>) -> impl Responder {
    match state.datasets.registry() {
        Ok(registry) => HttpResponse::Ok().json(dimension_comparison(&registry)),
        Err(error) => service_error_response(error),
    }
}

#[get("/vehicles/price-model")]
async fn price_model_endpoint(state: web::Data<ApiState>) -> impl Responder {
    let registry = match state.datasets.registry() {
        Ok(registry) => registry,
        Err(error) => return service_error_response(error),
    };

    match price_model(&registry) {
        Ok(report) => HttpResponse::Ok().json(report),
        Err(error) => price_model_error_response(error),
    }
}

#[get("/stations/provinces")]
async fn provinces() -> impl Responder {
    HttpResponse::Ok().json(PROVINCES)
}

#[get("/stations/map")]
async fn station_map_endpoint(
    state: web::Data<ApiState>,
    query: web::Query<StationMapQuery>,
) -> impl Responder {
    let source = Arc::clone(&state.stations);
    let fetched = web::block(move || fetch_stations(source.as_ref())).await;

    let parsed = match fetched {
        Ok(Ok(parsed)) => parsed,
        Ok(Err(error)) => return station_error_response(error),
        Err(error) => return blocking_error_response(error),
    };

    let map = station_map(query.province.as_deref(), parsed);
    HttpResponse::Ok().json(StationMapResponse {
        province: map.view.name,
        center: map.view.center,
        zoom: map.view.zoom,
        markers: map
            .markers
            .into_iter()
            .map(|marker| MarkerResponse {
                popup: marker.popup(),
                latitude: marker.latitude,
                longitude: marker.longitude,
                address: marker.address,
                power_kw: marker.power_kw,
            })
            .collect(),
        excluded_without_coordinates: map.excluded_without_coordinates,
    })
}

#[post("/admin/reload")]
async fn reload_datasets(state: web::Data<ApiState>) -> impl Responder {
    let datasets = state.datasets.clone();

    match web::block(move || datasets.reload()).await {
        Ok(Ok(summary)) => HttpResponse::Ok().json(summary),
        Ok(Err(error)) => service_error_response(error),
        Err(error) => blocking_error_response(error),
    }
}

fn parse_day(raw: Option<&str>) -> Result<Option<NaiveDate>, HttpResponse> {
    match raw.map(str::trim).filter(|value| !value.is_empty()) {
        None => Ok(None),
        Some(value) => NaiveDate::parse_from_str(value, "%Y-%m-%d")
            .map(Some)
            .map_err(|_| bad_request(format!("date must be formatted as YYYY-MM-DD, got {value}"))),
    }
}

fn format_minute(minute: NaiveDateTime) -> String {
    minute.format(MINUTE_FORMAT).to_string()
}

fn bad_request(message: impl Into<String>) -> HttpResponse {
    HttpResponse::BadRequest().json(serde_json::json!({ "error": message.into() }))
}

fn service_error_response(error: ServiceError) -> HttpResponse {
    match error {
        ServiceError::NoSessions => HttpResponse::NotFound().json(serde_json::json!({
            "error": "no charging sessions available"
        })),
        ServiceError::DateOutOfRange { .. } => bad_request(error.to_string()),
        ServiceError::LockPoisoned => {
            HttpResponse::InternalServerError().json(serde_json::json!({
                "error": "dataset lock poisoned"
            }))
        }
        ServiceError::SessionCsv(_) | ServiceError::RegistryDb(_) => {
            tracing::error!(error = %error, "dataset load failed");
            HttpResponse::InternalServerError().json(serde_json::json!({
                "error": error.to_string()
            }))
        }
    }
}

fn station_error_response(error: StationSourceError) -> HttpResponse {
    tracing::warn!(error = %error, "station directory unavailable");
    HttpResponse::BadGateway().json(serde_json::json!({
        "error": format!("station directory unavailable: {error}")
    }))
}

fn price_model_error_response(error: PriceModelError) -> HttpResponse {
    HttpResponse::UnprocessableEntity().json(serde_json::json!({
        "error": error.to_string()
    }))
}

fn blocking_error_response(error: error::BlockingError) -> HttpResponse {
    HttpResponse::InternalServerError().json(serde_json::json!({
        "error": format!("background task failed: {error}")
    }))
}
