use chrono::NaiveDate;
use rusqlite::{Connection, Row, params};
use thiserror::Error;
use tracing::info;

use crate::domain::vehicle_registry::{VehicleRecord, VehicleRegistry};

pub const LATEST_SCHEMA_VERSION: u32 = 1;

const DATE_FORMAT: &str = "%Y-%m-%d";

const MIGRATIONS: &[(u32, &str)] = &[(
    1,
    r#"
CREATE TABLE IF NOT EXISTS vehicles (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    merk TEXT,
    handelsbenaming TEXT,
    datum_eerste_toelating TEXT,
    catalogusprijs REAL,
    massa_ledig_voertuig REAL,
    vermogen_massarijklaar REAL,
    lengte REAL,
    breedte REAL,
    hoogte_voertuig REAL,
    inrichting TEXT
);

CREATE INDEX IF NOT EXISTS idx_vehicles_merk
ON vehicles (merk);
"#,
)];

#[derive(Debug, Error)]
pub enum RegistryDbError {
    #[error("registry database operation failed: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("unsupported schema version {current}; latest supported is {latest}")]
    UnsupportedSchemaVersion { current: u32, latest: u32 },
}

pub fn open_connection(path: &str) -> Result<Connection, RegistryDbError> {
    Connection::open(path).map_err(RegistryDbError::from)
}

pub fn run_migrations(connection: &mut Connection) -> Result<(), RegistryDbError> {
    let current_version = schema_version(connection)?;

    if current_version > LATEST_SCHEMA_VERSION {
        return Err(RegistryDbError::UnsupportedSchemaVersion {
            current: current_version,
            latest: LATEST_SCHEMA_VERSION,
        });
    }

    let transaction = connection.transaction()?;

    for (version, sql) in MIGRATIONS {
        if *version > current_version {
            transaction.execute_batch(sql)?;
            transaction.pragma_update(None, "user_version", version)?;
        }
    }

    transaction.commit()?;

    Ok(())
}

pub fn schema_version(connection: &Connection) -> Result<u32, RegistryDbError> {
    let version = connection.pragma_query_value(None, "user_version", |row| row.get(0))?;
    Ok(version)
}

/// Inserts all records in one transaction and returns how many were written.
pub fn insert_vehicles(
    connection: &mut Connection,
    records: &[VehicleRecord],
) -> Result<usize, RegistryDbError> {
    let transaction = connection.transaction()?;
    {
        let mut statement = transaction.prepare(
            "INSERT INTO vehicles (
                merk, handelsbenaming, datum_eerste_toelating, catalogusprijs,
                massa_ledig_voertuig, vermogen_massarijklaar, lengte, breedte,
                hoogte_voertuig, inrichting
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
        )?;

        for record in records {
            statement.execute(params![
                record.brand,
                record.trade_name,
                record
                    .first_registration
                    .map(|date| date.format(DATE_FORMAT).to_string()),
                record.list_price,
                record.empty_mass,
                record.power_mass_ratio,
                record.length,
                record.width,
                record.height,
                record.body_type,
            ])?;
        }
    }
    transaction.commit()?;

    Ok(records.len())
}

pub fn count_vehicles(connection: &Connection) -> Result<i64, RegistryDbError> {
    let count = connection.query_row("SELECT COUNT(*) FROM vehicles", [], |row| row.get(0))?;
    Ok(count)
}

pub fn clear_vehicles(connection: &Connection) -> Result<usize, RegistryDbError> {
    Ok(connection.execute("DELETE FROM vehicles", [])?)
}

pub fn load_vehicles(connection: &Connection) -> Result<Vec<VehicleRecord>, RegistryDbError> {
    let mut statement = connection.prepare(
        "SELECT merk, handelsbenaming, datum_eerste_toelating, catalogusprijs,
                massa_ledig_voertuig, vermogen_massarijklaar, lengte, breedte,
                hoogte_voertuig, inrichting
         FROM vehicles
         ORDER BY id ASC",
    )?;

    let rows = statement.query_map([], map_vehicle_row)?;

    let mut records = Vec::new();
    for row in rows {
        records.push(row?);
    }

    Ok(records)
}

fn map_vehicle_row(row: &Row<'_>) -> rusqlite::Result<VehicleRecord> {
    let first_registration: Option<String> = row.get(2)?;

    Ok(VehicleRecord {
        brand: row.get(0)?,
        trade_name: row.get(1)?,
        first_registration: first_registration
            .and_then(|raw| NaiveDate::parse_from_str(&raw, DATE_FORMAT).ok()),
        list_price: row.get(3)?,
        empty_mass: row.get(4)?,
        power_mass_ratio: row.get(5)?,
        length: row.get(6)?,
        width: row.get(7)?,
        height: row.get(8)?,
        body_type: row.get(9)?,
    })
}

/// Opens the store, applies pending migrations and reads every vehicle.
pub fn load_registry(path: &str) -> Result<VehicleRegistry, RegistryDbError> {
    let mut connection = open_connection(path)?;
    run_migrations(&mut connection)?;
    let registry = VehicleRegistry::new(load_vehicles(&connection)?);

    info!(path, vehicles = registry.len(), "loaded vehicle registry");

    Ok(registry)
}
