use chrono::{NaiveDate, NaiveDateTime};

use crate::domain::model_name::normalize_model;

/// One row of the vehicle registry. Every column may be missing.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VehicleRecord {
    pub brand: Option<String>,
    pub trade_name: Option<String>,
    pub first_registration: Option<NaiveDate>,
    pub list_price: Option<f64>,
    pub empty_mass: Option<f64>,
    pub power_mass_ratio: Option<f64>,
    pub length: Option<f64>,
    pub width: Option<f64>,
    pub height: Option<f64>,
    pub body_type: Option<String>,
}

impl VehicleRecord {
    /// `"YYYY-MM"` of the first registration.
    pub fn year_month(&self) -> Option<String> {
        self.first_registration
            .map(|date| date.format("%Y-%m").to_string())
    }

    pub fn model_base(&self) -> Option<String> {
        normalize_model(self.trade_name.as_deref())
    }
}

/// Explicitly owned, read-only registry snapshot.
#[derive(Debug, Clone, Default)]
pub struct VehicleRegistry {
    records: Vec<VehicleRecord>,
}

impl VehicleRegistry {
    pub fn new(records: Vec<VehicleRecord>) -> Self {
        Self { records }
    }

    pub fn records(&self) -> &[VehicleRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

const DATE_FORMATS: &[&str] = &["%Y%m%d", "%Y-%m-%d", "%d/%m/%Y", "%m/%d/%Y"];
const DATETIME_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%m/%d/%Y %I:%M:%S %p"];

/// Accepts the registry's compact `YYYYMMDD` form and a few common exports.
pub fn parse_registration_date(raw: &str) -> Option<NaiveDate> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }

    DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(trimmed, format).ok())
        .or_else(|| {
            DATETIME_FORMATS
                .iter()
                .find_map(|format| NaiveDateTime::parse_from_str(trimmed, format).ok())
                .map(|datetime| datetime.date())
        })
}

/// Lenient numeric parse; accepts a decimal comma.
pub fn parse_measurement(raw: &str) -> Option<f64> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }

    trimmed
        .parse::<f64>()
        .ok()
        .or_else(|| trimmed.replace(',', ".").parse::<f64>().ok())
        .filter(|value| value.is_finite())
}

pub fn non_blank(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}
