use std::sync::{Arc, RwLock};

use chrono::NaiveDate;
use serde::Serialize;
use thiserror::Error;
use tracing::info;

use crate::adapters::registry_db::{self, RegistryDbError};
use crate::adapters::session_csv::{self, SessionCsvError};
use crate::domain::charging_session::ChargingDataset;
use crate::domain::vehicle_registry::VehicleRegistry;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("dataset lock poisoned")]
    LockPoisoned,
    #[error("failed to load charging sessions: {0}")]
    SessionCsv(#[from] SessionCsvError),
    #[error("failed to load vehicle registry: {0}")]
    RegistryDb(#[from] RegistryDbError),
    #[error("no charging sessions available")]
    NoSessions,
    #[error("date {requested} is outside the available range {first}..={last}")]
    DateOutOfRange {
        requested: NaiveDate,
        first: NaiveDate,
        last: NaiveDate,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatasetSources {
    pub sessions_csv_path: String,
    pub registry_db_path: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReloadSummary {
    pub sessions: usize,
    pub vehicles: usize,
}

/// Charging data and registry loaded together. Both always come from the
/// same load.
#[derive(Debug, Clone)]
pub struct DatasetSnapshot {
    pub charging: Arc<ChargingDataset>,
    pub registry: Arc<VehicleRegistry>,
}

/// Owns the loaded datasets. Readers get an `Arc` snapshot and never hold the
/// lock while computing; `reload` swaps the whole snapshot under one write lock.
#[derive(Clone)]
pub struct DatasetService {
    sources: Arc<DatasetSources>,
    snapshot: Arc<RwLock<DatasetSnapshot>>,
}

impl DatasetService {
    pub fn load(sources: DatasetSources) -> Result<Self, ServiceError> {
        let (charging, registry) = load_datasets(&sources)?;
        Ok(Self::from_datasets(sources, charging, registry))
    }

    pub fn from_datasets(
        sources: DatasetSources,
        charging: ChargingDataset,
        registry: VehicleRegistry,
    ) -> Self {
        Self {
            sources: Arc::new(sources),
            snapshot: Arc::new(RwLock::new(DatasetSnapshot {
                charging: Arc::new(charging),
                registry: Arc::new(registry),
            })),
        }
    }

    pub fn snapshot(&self) -> Result<DatasetSnapshot, ServiceError> {
        let guard = self.snapshot.read().map_err(|_| ServiceError::LockPoisoned)?;
        Ok(guard.clone())
    }

    pub fn charging(&self) -> Result<Arc<ChargingDataset>, ServiceError> {
        Ok(self.snapshot()?.charging)
    }

    pub fn registry(&self) -> Result<Arc<VehicleRegistry>, ServiceError> {
        Ok(self.snapshot()?.registry)
    }

    /// Rebuilds both datasets from their sources. On failure the current
    /// snapshot stays in place.
    pub fn reload(&self) -> Result<ReloadSummary, ServiceError> {
        let (charging, registry) = load_datasets(&self.sources)?;
        let summary = ReloadSummary {
            sessions: charging.sessions().len(),
            vehicles: registry.len(),
        };

        *self.snapshot.write().map_err(|_| ServiceError::LockPoisoned)? = DatasetSnapshot {
            charging: Arc::new(charging),
            registry: Arc::new(registry),
        };

        info!(
            sessions = summary.sessions,
            vehicles = summary.vehicles,
            "datasets reloaded"
        );

        Ok(summary)
    }
}

fn load_datasets(
    sources: &DatasetSources,
) -> Result<(ChargingDataset, VehicleRegistry), ServiceError> {
    let charging = session_csv::load_sessions(&sources.sessions_csv_path)?;
    let registry = registry_db::load_registry(&sources.registry_db_path)?;
    Ok((charging, registry))
}

/// Picks the day for an occupancy timeline: the requested one when it lies in
/// the dataset's start-date range, else the earliest day.
pub fn resolve_day(
    dataset: &ChargingDataset,
    requested: Option<NaiveDate>,
) -> Result<NaiveDate, ServiceError> {
    let (first, last) = dataset.date_range().ok_or(ServiceError::NoSessions)?;

    match requested {
        None => Ok(first),
        Some(day) if (first..=last).contains(&day) => Ok(day),
        Some(day) => Err(ServiceError::DateOutOfRange {
            requested: day,
            first,
            last,
        }),
    }
}
