use chrono::{NaiveDate, NaiveDateTime};
use serde::Serialize;

/// Average power (kW) below which a session is labelled AC.
pub const AC_AVERAGE_POWER_THRESHOLD_KW: f64 = 4.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum PowerType {
    #[serde(rename = "AC")]
    Ac,
    #[serde(rename = "DC")]
    Dc,
}

impl PowerType {
    pub fn as_str(self) -> &'static str {
        match self {
            PowerType::Ac => "AC",
            PowerType::Dc => "DC",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChargingSession {
    pub id: usize,
    pub started: NaiveDateTime,
    pub ended: NaiveDateTime,
    pub charge_time_hours: f64,
    pub connected_time_hours: f64,
    pub total_energy_wh: f64,
    pub max_power_w: f64,
}

impl ChargingSession {
    pub fn fully_charged(&self) -> bool {
        self.charge_time_hours != self.connected_time_hours
    }

    /// `None` when no charging time was recorded.
    pub fn average_power_kw(&self) -> Option<f64> {
        if self.charge_time_hours == 0.0 {
            return None;
        }

        Some(self.total_energy_wh / 1000.0 / self.charge_time_hours)
    }

    pub fn power_type(&self) -> Option<PowerType> {
        self.average_power_kw().map(classify_average_power)
    }
}

pub fn classify_average_power(average_power_kw: f64) -> PowerType {
    if average_power_kw < AC_AVERAGE_POWER_THRESHOLD_KW {
        PowerType::Ac
    } else {
        PowerType::Dc
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadReport {
    pub rows_read: usize,
    pub dropped_unparseable_timestamp: usize,
    pub dropped_negative_charge_time: usize,
    pub dropped_missing_measurement: usize,
    pub dropped_undecodable: usize,
}

impl LoadReport {
    pub fn rows_dropped(&self) -> usize {
        self.dropped_unparseable_timestamp
            + self.dropped_negative_charge_time
            + self.dropped_missing_measurement
            + self.dropped_undecodable
    }

    pub fn rows_kept(&self) -> usize {
        self.rows_read.saturating_sub(self.rows_dropped())
    }
}

/// Read-only set of sessions loaded from one source file.
#[derive(Debug, Clone, Default)]
pub struct ChargingDataset {
    sessions: Vec<ChargingSession>,
    report: LoadReport,
}

impl ChargingDataset {
    pub fn new(sessions: Vec<ChargingSession>, report: LoadReport) -> Self {
        Self { sessions, report }
    }

    pub fn sessions(&self) -> &[ChargingSession] {
        &self.sessions
    }

    pub fn report(&self) -> &LoadReport {
        &self.report
    }

    /// Earliest and latest start date, used as the selectable day range.
    pub fn date_range(&self) -> Option<(NaiveDate, NaiveDate)> {
        let first = self.sessions.iter().map(|s| s.started.date()).min()?;
        let last = self.sessions.iter().map(|s| s.started.date()).max()?;
        Some((first, last))
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::{ChargingDataset, ChargingSession, LoadReport, PowerType, classify_average_power};

    fn session(total_energy_wh: f64, charge_time_hours: f64) -> ChargingSession {
        let day = NaiveDate::from_ymd_opt(2018, 1, 1).expect("valid date");
        ChargingSession {
            id: 0,
            started: day.and_hms_opt(10, 0, 0).expect("valid time"),
            ended: day.and_hms_opt(12, 0, 0).expect("valid time"),
            charge_time_hours,
            connected_time_hours: 2.0,
            total_energy_wh,
            max_power_w: 3700.0,
        }
    }

    #[test]
    fn threshold_average_power_is_dc() {
        assert_eq!(session(8000.0, 2.0).power_type(), Some(PowerType::Dc));
    }

    #[test]
    fn below_threshold_average_power_is_ac() {
        assert_eq!(session(6000.0, 2.0).power_type(), Some(PowerType::Ac));
    }

    #[test]
    fn zero_charge_time_has_no_power_type() {
        let zero = session(5000.0, 0.0);
        assert_eq!(zero.average_power_kw(), None);
        assert_eq!(zero.power_type(), None);
    }

    #[test]
    fn classifies_raw_average_power() {
        assert_eq!(classify_average_power(3.999), PowerType::Ac);
        assert_eq!(classify_average_power(22.0), PowerType::Dc);
    }

    #[test]
    fn fully_charged_when_charge_and_connected_time_differ() {
        assert!(session(6000.0, 1.5).fully_charged());
        assert!(!session(6000.0, 2.0).fully_charged());
    }

    #[test]
    fn date_range_spans_start_dates() {
        let mut later = session(6000.0, 2.0);
        later.started = NaiveDate::from_ymd_opt(2018, 3, 5)
            .and_then(|d| d.and_hms_opt(8, 0, 0))
            .expect("valid datetime");
        let dataset = ChargingDataset::new(vec![later, session(1.0, 1.0)], LoadReport::default());

        assert_eq!(
            dataset.date_range(),
            Some((
                NaiveDate::from_ymd_opt(2018, 1, 1).expect("valid date"),
                NaiveDate::from_ymd_opt(2018, 3, 5).expect("valid date"),
            ))
        );
        assert_eq!(ChargingDataset::default().date_range(), None);
    }

    #[test]
    fn load_report_counts_kept_rows() {
        let report = LoadReport {
            rows_read: 10,
            dropped_unparseable_timestamp: 2,
            dropped_negative_charge_time: 1,
            dropped_missing_measurement: 1,
            dropped_undecodable: 1,
        };
        assert_eq!(report.rows_dropped(), 5);
        assert_eq!(report.rows_kept(), 5);
    }
}
