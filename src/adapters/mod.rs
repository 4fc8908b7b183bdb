pub mod api;
pub mod registry_csv;
pub mod registry_db;
pub mod session_csv;
pub mod station_source;
