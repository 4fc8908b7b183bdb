use std::collections::BTreeMap;

use serde::Serialize;

use crate::domain::charging_session::{ChargingSession, PowerType};
use crate::domain::statistics::{
    FiveNumberSummary, HistogramBin, LinearFit, five_number_summary, histogram, linear_fit,
    pearson, shared_bin_edges,
};

pub const DEFAULT_HISTOGRAM_BINS: usize = 40;
pub const MAX_HISTOGRAM_BINS: usize = 500;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AxisScale {
    Linear,
    Log,
}

impl AxisScale {
    pub fn from_log_flag(log_scale: bool) -> Self {
        if log_scale { Self::Log } else { Self::Linear }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HistogramOptions {
    pub log_scale: bool,
    pub bins: usize,
}

impl Default for HistogramOptions {
    fn default() -> Self {
        Self {
            log_scale: true,
            bins: DEFAULT_HISTOGRAM_BINS,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EnergyScatterOptions {
    pub show_trendline: bool,
}

impl Default for EnergyScatterOptions {
    fn default() -> Self {
        Self {
            show_trendline: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoxplotOptions {
    pub charge_time_log_scale: bool,
    pub total_energy_log_scale: bool,
    pub max_power_log_scale: bool,
}

impl Default for BoxplotOptions {
    fn default() -> Self {
        Self {
            charge_time_log_scale: true,
            total_energy_log_scale: true,
            max_power_log_scale: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChargeConnectedPoint {
    pub charge_time: f64,
    pub connected_time: f64,
    pub fully_charged: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HistogramSeries {
    pub name: &'static str,
    pub bins: Vec<HistogramBin>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeHistogram {
    pub y_axis: AxisScale,
    pub series: Vec<HistogramSeries>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EnergyPoint {
    pub charge_time: f64,
    pub total_energy: f64,
    pub power_type: PowerType,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PowerTypeTrendline {
    pub power_type: PowerType,
    pub fit: LinearFit,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EnergyScatter {
    pub points: Vec<EnergyPoint>,
    pub trendlines: Vec<PowerTypeTrendline>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Boxplot {
    pub metric: &'static str,
    pub y_axis: AxisScale,
    pub summary: Option<FiveNumberSummary>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CorrelationMatrix {
    pub columns: Vec<&'static str>,
    pub values: Vec<Vec<Option<f64>>>,
}

pub fn charge_vs_connected(sessions: &[ChargingSession]) -> Vec<ChargeConnectedPoint> {
    sessions
        .iter()
        .map(|session| ChargeConnectedPoint {
            charge_time: session.charge_time_hours,
            connected_time: session.connected_time_hours,
            fully_charged: session.fully_charged(),
        })
        .collect()
}

/// Overlaid histograms of connected and charge time on shared bins.
pub fn time_histogram(sessions: &[ChargingSession], options: HistogramOptions) -> TimeHistogram {
    let connected: Vec<f64> = sessions.iter().map(|s| s.connected_time_hours).collect();
    let charge: Vec<f64> = sessions.iter().map(|s| s.charge_time_hours).collect();
    let edges = shared_bin_edges(
        &[connected.as_slice(), charge.as_slice()],
        options.bins.min(MAX_HISTOGRAM_BINS),
    );

    TimeHistogram {
        y_axis: AxisScale::from_log_flag(options.log_scale),
        series: vec![
            HistogramSeries {
                name: "ConnectedTime",
                bins: histogram(&connected, &edges),
            },
            HistogramSeries {
                name: "ChargeTime",
                bins: histogram(&charge, &edges),
            },
        ],
    }
}

/// Energy against charge time per power type. Sessions without a power type are left out.
pub fn energy_scatter(sessions: &[ChargingSession], options: EnergyScatterOptions) -> EnergyScatter {
    let points: Vec<EnergyPoint> = sessions
        .iter()
        .filter_map(|session| {
            Some(EnergyPoint {
                charge_time: session.charge_time_hours,
                total_energy: session.total_energy_wh,
                power_type: session.power_type()?,
            })
        })
        .collect();

    let trendlines = if options.show_trendline {
        let mut grouped: BTreeMap<PowerType, (Vec<f64>, Vec<f64>)> = BTreeMap::new();
        for point in &points {
            let entry = grouped.entry(point.power_type).or_default();
            entry.0.push(point.charge_time);
            entry.1.push(point.total_energy);
        }
        grouped
            .into_iter()
            .filter_map(|(power_type, (xs, ys))| {
                linear_fit(&xs, &ys).map(|fit| PowerTypeTrendline { power_type, fit })
            })
            .collect()
    } else {
        Vec::new()
    };

    EnergyScatter { points, trendlines }
}

pub fn boxplots(sessions: &[ChargingSession], options: BoxplotOptions) -> Vec<Boxplot> {
    let column = |f: fn(&ChargingSession) -> f64| -> Vec<f64> { sessions.iter().map(f).collect() };

    vec![
        Boxplot {
            metric: "TotalEnergy",
            y_axis: AxisScale::from_log_flag(options.total_energy_log_scale),
            summary: five_number_summary(&column(|s| s.total_energy_wh)),
        },
        Boxplot {
            metric: "ChargeTime",
            y_axis: AxisScale::from_log_flag(options.charge_time_log_scale),
            summary: five_number_summary(&column(|s| s.charge_time_hours)),
        },
        Boxplot {
            metric: "MaxPower",
            y_axis: AxisScale::from_log_flag(options.max_power_log_scale),
            summary: five_number_summary(&column(|s| s.max_power_w)),
        },
    ]
}

/// Pearson correlation between every pair of numeric session columns.
pub fn correlation_matrix(sessions: &[ChargingSession]) -> CorrelationMatrix {
    let columns: Vec<(&'static str, Vec<f64>)> = vec![
        (
            "TotalEnergy",
            sessions.iter().map(|s| s.total_energy_wh).collect(),
        ),
        (
            "ConnectedTime",
            sessions.iter().map(|s| s.connected_time_hours).collect(),
        ),
        (
            "ChargeTime",
            sessions.iter().map(|s| s.charge_time_hours).collect(),
        ),
        ("MaxPower", sessions.iter().map(|s| s.max_power_w).collect()),
        (
            "FullyCharged",
            sessions
                .iter()
                .map(|s| if s.fully_charged() { 1.0 } else { 0.0 })
                .collect(),
        ),
    ];

    let values: Vec<Vec<Option<f64>>> = columns
        .iter()
        .map(|(_, row)| {
            columns
                .iter()
                .map(|(_, other)| pearson(row, other))
                .collect::<Vec<_>>()
        })
        .collect();

    CorrelationMatrix {
        columns: columns.iter().map(|(name, _)| *name).collect(),
        values,
    }
}
