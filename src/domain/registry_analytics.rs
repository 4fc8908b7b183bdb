use std::collections::{BTreeMap, BTreeSet, HashMap};

use serde::Serialize;
use thiserror::Error;

use crate::domain::charging_charts::AxisScale;
use crate::domain::regression::{
    LinearModel, RegressionError, mean_absolute_error, r_squared, train_test_split,
};
use crate::domain::statistics::{LinearFit, linear_fit};
use crate::domain::vehicle_registry::{VehicleRecord, VehicleRegistry};

pub const PRICE_MODEL_SEED: u64 = 42;
pub const PRICE_MODEL_TEST_FRACTION: f64 = 0.2;
pub const PRICE_MODEL_FEATURES: [&str; 5] = [
    "massa_ledig_voertuig",
    "vermogen_massarijklaar",
    "lengte",
    "breedte",
    "hoogte_voertuig",
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BrandTotal {
    pub brand: String,
    pub vehicles: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthlyCount {
    pub year_month: String,
    pub series: String,
    pub vehicles: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryCount {
    pub category: String,
    pub vehicles: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BodyTypeOptions {
    pub log_scale: bool,
}

impl Default for BodyTypeOptions {
    fn default() -> Self {
        Self { log_scale: true }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BodyTypeHistogram {
    pub y_axis: AxisScale,
    pub y_axis_title: &'static str,
    pub counts: Vec<CategoryCount>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DimensionPoint {
    pub width: f64,
    pub length: f64,
    pub trend_length: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DimensionComparison {
    pub points: Vec<DimensionPoint>,
    pub trendline: Option<LinearFit>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeatureCoefficient {
    pub feature: &'static str,
    pub coefficient: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PricePrediction {
    pub actual_price: f64,
    pub predicted_price: f64,
    pub error_value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceModelReport {
    pub train_rows: usize,
    pub test_rows: usize,
    pub intercept: f64,
    pub coefficients: Vec<FeatureCoefficient>,
    pub predictions: Vec<PricePrediction>,
    /// Identity line from the lowest to the highest actual test price.
    pub reference_line: [f64; 2],
    pub r_squared: Option<f64>,
    pub mean_absolute_error: Option<f64>,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PriceModelError {
    #[error("no complete rows to evaluate the price model")]
    EmptyTestSet,
    #[error("price model could not be fitted: {0}")]
    Fit(#[from] RegressionError),
}

/// Vehicles per brand, largest first, ties by brand name.
pub fn brand_totals(registry: &VehicleRegistry) -> Vec<BrandTotal> {
    let mut totals: HashMap<&str, usize> = HashMap::new();
    for brand in registry.records().iter().filter_map(|r| r.brand.as_deref()) {
        *totals.entry(brand).or_default() += 1;
    }

    let mut ranked: Vec<BrandTotal> = totals
        .into_iter()
        .map(|(brand, vehicles)| BrandTotal {
            brand: brand.to_string(),
            vehicles,
        })
        .collect();
    ranked.sort_by(|a, b| b.vehicles.cmp(&a.vehicles).then_with(|| a.brand.cmp(&b.brand)));
    ranked
}

pub fn brand_options(registry: &VehicleRegistry) -> Vec<String> {
    registry
        .records()
        .iter()
        .filter_map(|record| record.brand.clone())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Monthly registrations of the `top` largest brands.
pub fn top_brands_per_month(registry: &VehicleRegistry, top: usize) -> Vec<MonthlyCount> {
    let selected: BTreeSet<String> = brand_totals(registry)
        .into_iter()
        .take(top)
        .map(|total| total.brand)
        .collect();

    monthly_counts(registry.records().iter(), |record| {
        record.brand.clone().filter(|brand| selected.contains(brand))
    })
}

/// Monthly registrations per model family of one brand, matched case-insensitively.
/// Empty when the brand has no vehicles.
pub fn model_trends(registry: &VehicleRegistry, brand: &str) -> Vec<MonthlyCount> {
    let wanted = brand.trim().to_uppercase();
    let matching = registry.records().iter().filter(|record| {
        record
            .brand
            .as_deref()
            .is_some_and(|value| value.to_uppercase() == wanted)
    });

    monthly_counts(matching, VehicleRecord::model_base)
}

pub fn brand_has_vehicles(registry: &VehicleRegistry, brand: &str) -> bool {
    let wanted = brand.trim().to_uppercase();
    registry.records().iter().any(|record| {
        record
            .brand
            .as_deref()
            .is_some_and(|value| value.to_uppercase() == wanted)
    })
}

fn monthly_counts<'a, I, F>(records: I, series_of: F) -> Vec<MonthlyCount>
where
    I: Iterator<Item = &'a VehicleRecord>,
    F: Fn(&VehicleRecord) -> Option<String>,
{
    let mut counts: BTreeMap<(String, String), usize> = BTreeMap::new();
    for record in records {
        let (Some(year_month), Some(series)) = (record.year_month(), series_of(record)) else {
            continue;
        };
        *counts.entry((year_month, series)).or_default() += 1;
    }

    counts
        .into_iter()
        .map(|((year_month, series), vehicles)| MonthlyCount {
            year_month,
            series,
            vehicles,
        })
        .collect()
}

/// Vehicles per body type, ordered by body type.
pub fn body_type_counts(registry: &VehicleRegistry) -> Vec<CategoryCount> {
    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for body_type in registry.records().iter().filter_map(|r| r.body_type.as_deref()) {
        *counts.entry(body_type).or_default() += 1;
    }

    counts
        .into_iter()
        .map(|(category, vehicles)| CategoryCount {
            category: category.to_string(),
            vehicles,
        })
        .collect()
}

pub fn body_type_histogram(
    registry: &VehicleRegistry,
    options: BodyTypeOptions,
) -> BodyTypeHistogram {
    BodyTypeHistogram {
        y_axis: AxisScale::from_log_flag(options.log_scale),
        y_axis_title: if options.log_scale {
            "Aantal auto's (log)"
        } else {
            "Aantal auto's"
        },
        counts: body_type_counts(registry),
    }
}

pub fn dimension_comparison(registry: &VehicleRegistry) -> DimensionComparison {
    let mut pairs: Vec<(f64, f64)> = registry
        .records()
        .iter()
        .filter_map(|record| match (record.width, record.length) {
            (Some(width), Some(length)) if width > 0.0 && length > 0.0 => Some((width, length)),
            _ => None,
        })
        .collect();
    pairs.sort_by(|a, b| a.0.total_cmp(&b.0).then_with(|| a.1.total_cmp(&b.1)));

    let widths: Vec<f64> = pairs.iter().map(|pair| pair.0).collect();
    let lengths: Vec<f64> = pairs.iter().map(|pair| pair.1).collect();
    let trendline = linear_fit(&widths, &lengths);

    DimensionComparison {
        points: pairs
            .into_iter()
            .map(|(width, length)| DimensionPoint {
                width,
                length,
                trend_length: trendline.map(|fit| fit.predict(width)),
            })
            .collect(),
        trendline,
    }
}

fn price_model_row(record: &VehicleRecord) -> Option<(Vec<f64>, f64)> {
    let features = vec![
        record.empty_mass?,
        record.power_mass_ratio?,
        record.length?,
        record.width?,
        record.height?,
    ];
    Some((features, record.list_price?))
}

/// Fits list price on mass, power ratio and dimensions over an 80/20 split.
pub fn price_model(registry: &VehicleRegistry) -> Result<PriceModelReport, PriceModelError> {
    let rows: Vec<(Vec<f64>, f64)> = registry.records().iter().filter_map(price_model_row).collect();
    let (train, test) = train_test_split(&rows, PRICE_MODEL_TEST_FRACTION, PRICE_MODEL_SEED);

    let train_features: Vec<Vec<f64>> = train.iter().map(|row| row.0.clone()).collect();
    let train_targets: Vec<f64> = train.iter().map(|row| row.1).collect();
    let model = LinearModel::fit(&train_features, &train_targets)?;

    if test.is_empty() {
        return Err(PriceModelError::EmptyTestSet);
    }

    let actual: Vec<f64> = test.iter().map(|row| row.1).collect();
    let predicted: Vec<f64> = test.iter().map(|row| model.predict(&row.0)).collect();
    let lowest = actual.iter().copied().fold(f64::INFINITY, f64::min);
    let highest = actual.iter().copied().fold(f64::NEG_INFINITY, f64::max);

    Ok(PriceModelReport {
        train_rows: train.len(),
        test_rows: test.len(),
        intercept: model.intercept,
        coefficients: PRICE_MODEL_FEATURES
            .iter()
            .zip(&model.coefficients)
            .map(|(feature, coefficient)| FeatureCoefficient {
                feature: *feature,
                coefficient: *coefficient,
            })
            .collect(),
        predictions: actual
            .iter()
            .zip(&predicted)
            .map(|(&actual_price, &predicted_price)| PricePrediction {
                actual_price,
                predicted_price,
                error_value: (predicted_price - actual_price).abs(),
            })
            .collect(),
        reference_line: [lowest, highest],
        r_squared: r_squared(&actual, &predicted),
        mean_absolute_error: mean_absolute_error(&actual, &predicted),
    })
}
