pub mod charging_charts;
pub mod charging_session;
pub mod model_name;
pub mod occupancy;
pub mod registry_analytics;
pub mod regression;
pub mod station;
pub mod statistics;
pub mod vehicle_registry;
