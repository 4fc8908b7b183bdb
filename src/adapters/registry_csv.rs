use std::fs::File;
use std::io::Read;

use csv::{ReaderBuilder, Trim};
use serde::Deserialize;
use thiserror::Error;

use crate::domain::vehicle_registry::{
    VehicleRecord, non_blank, parse_measurement, parse_registration_date,
};

#[derive(Debug, Error)]
pub enum RegistryCsvError {
    #[error("failed to open registry export {path}: {source}")]
    Open {
        path: String,
        source: std::io::Error,
    },
    #[error("failed to read registry export: {0}")]
    Csv(#[from] csv::Error),
}

/// Registry export row as published; columns outside this set are ignored.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RegistryRow {
    merk: Option<String>,
    handelsbenaming: Option<String>,
    datum_eerste_toelating: Option<String>,
    catalogusprijs: Option<String>,
    massa_ledig_voertuig: Option<String>,
    vermogen_massarijklaar: Option<String>,
    lengte: Option<String>,
    breedte: Option<String>,
    hoogte_voertuig: Option<String>,
    inrichting: Option<String>,
}

impl From<RegistryRow> for VehicleRecord {
    fn from(row: RegistryRow) -> Self {
        let text = |value: Option<String>| value.as_deref().and_then(non_blank);
        let number = |value: Option<String>| value.as_deref().and_then(parse_measurement);

        VehicleRecord {
            brand: text(row.merk),
            trade_name: text(row.handelsbenaming),
            first_registration: row
                .datum_eerste_toelating
                .as_deref()
                .and_then(parse_registration_date),
            list_price: number(row.catalogusprijs),
            empty_mass: number(row.massa_ledig_voertuig),
            power_mass_ratio: number(row.vermogen_massarijklaar),
            length: number(row.lengte),
            width: number(row.breedte),
            height: number(row.hoogte_voertuig),
            body_type: text(row.inrichting),
        }
    }
}

pub fn read_registry_file(path: &str) -> Result<Vec<VehicleRecord>, RegistryCsvError> {
    let file = File::open(path).map_err(|source| RegistryCsvError::Open {
        path: path.to_string(),
        source,
    })?;
    read_registry(file)
}

pub fn read_registry<R: Read>(reader: R) -> Result<Vec<VehicleRecord>, RegistryCsvError> {
    let mut reader = ReaderBuilder::new()
        .trim(Trim::All)
        .flexible(true)
        .from_reader(reader);

    let mut records = Vec::new();
    for row in reader.deserialize::<RegistryRow>() {
        records.push(VehicleRecord::from(row?));
    }

    Ok(records)
}
