use std::fs::File;
use std::io::Read;
use std::path::Path;

use chrono::NaiveDateTime;
use csv::{ErrorKind, ReaderBuilder, StringRecord, Trim};
use thiserror::Error;
use tracing::{debug, info};

use crate::domain::charging_session::{ChargingDataset, ChargingSession, LoadReport};

pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

const COLUMNS: [&str; 6] = [
    "Started",
    "Ended",
    "ChargeTime",
    "ConnectedTime",
    "TotalEnergy",
    "MaxPower",
];

#[derive(Debug, Error)]
pub enum SessionCsvError {
    #[error("failed to open sessions file {path}: {source}")]
    Open {
        path: String,
        source: std::io::Error,
    },
    #[error("failed to read sessions csv: {0}")]
    Csv(#[from] csv::Error),
    #[error("sessions csv is missing column {0}")]
    MissingColumn(&'static str),
}

struct ColumnIndex([usize; 6]);

impl ColumnIndex {
    fn from_headers(headers: &StringRecord) -> Result<Self, SessionCsvError> {
        let mut indices = [0; 6];
        for (slot, column) in indices.iter_mut().zip(COLUMNS) {
            *slot = headers
                .iter()
                .position(|header| header == column)
                .ok_or(SessionCsvError::MissingColumn(column))?;
        }
        Ok(Self(indices))
    }

    fn field<'r>(&self, record: &'r StringRecord, column: usize) -> Option<&'r str> {
        record
            .get(self.0[column])
            .map(str::trim)
            .filter(|value| !value.is_empty())
    }
}

enum RowOutcome {
    Kept(ChargingSession),
    UnparseableTimestamp,
    MissingMeasurement,
    NegativeChargeTime,
}

pub fn load_sessions(path: &str) -> Result<ChargingDataset, SessionCsvError> {
    let file = File::open(Path::new(path)).map_err(|source| SessionCsvError::Open {
        path: path.to_string(),
        source,
    })?;
    let dataset = read_sessions(file)?;

    let report = dataset.report();
    info!(
        path,
        rows_read = report.rows_read,
        rows_kept = report.rows_kept(),
        dropped_unparseable_timestamp = report.dropped_unparseable_timestamp,
        dropped_negative_charge_time = report.dropped_negative_charge_time,
        dropped_missing_measurement = report.dropped_missing_measurement,
        dropped_undecodable = report.dropped_undecodable,
        "loaded charging sessions"
    );

    Ok(dataset)
}

/// Reads every row, dropping the ones that cannot be used and counting why.
pub fn read_sessions<R: Read>(reader: R) -> Result<ChargingDataset, SessionCsvError> {
    let mut reader = ReaderBuilder::new()
        .trim(Trim::All)
        .flexible(true)
        .from_reader(reader);
    let columns = ColumnIndex::from_headers(reader.headers()?)?;

    let mut sessions = Vec::new();
    let mut report = LoadReport::default();

    for (id, record) in reader.records().enumerate() {
        let record = match record {
            Ok(record) => record,
            Err(error) if matches!(error.kind(), ErrorKind::Utf8 { .. }) => {
                debug!(row = id, %error, "dropping undecodable session row");
                report.rows_read += 1;
                report.dropped_undecodable += 1;
                continue;
            }
            Err(error) => return Err(error.into()),
        };
        report.rows_read += 1;

        match parse_row(id, &record, &columns) {
            RowOutcome::Kept(session) => sessions.push(session),
            RowOutcome::UnparseableTimestamp => {
                debug!(row = id, "dropping session with unparseable timestamp");
                report.dropped_unparseable_timestamp += 1;
            }
            RowOutcome::MissingMeasurement => {
                debug!(row = id, "dropping session with missing measurement");
                report.dropped_missing_measurement += 1;
            }
            RowOutcome::NegativeChargeTime => {
                debug!(row = id, "dropping session with negative charge time");
                report.dropped_negative_charge_time += 1;
            }
        }
    }

    Ok(ChargingDataset::new(sessions, report))
}

fn parse_row(id: usize, record: &StringRecord, columns: &ColumnIndex) -> RowOutcome {
    let timestamp = |column| {
        columns
            .field(record, column)
            .and_then(|raw| NaiveDateTime::parse_from_str(raw, TIMESTAMP_FORMAT).ok())
    };
    let measurement = |column| {
        columns
            .field(record, column)
            .and_then(|raw| raw.parse::<f64>().ok())
            .filter(|value| value.is_finite())
    };

    let (Some(started), Some(ended)) = (timestamp(0), timestamp(1)) else {
        return RowOutcome::UnparseableTimestamp;
    };
    let measurements: Option<Vec<f64>> = (2..COLUMNS.len()).map(measurement).collect();
    let Some(&[charge_time_hours, connected_time_hours, total_energy_wh, max_power_w]) =
        measurements.as_deref()
    else {
        return RowOutcome::MissingMeasurement;
    };
    if charge_time_hours < 0.0 {
        return RowOutcome::NegativeChargeTime;
    }

    RowOutcome::Kept(ChargingSession {
        id,
        started,
        ended,
        charge_time_hours,
        connected_time_hours,
        total_energy_wh,
        max_power_w,
    })
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::{SessionCsvError, load_sessions, read_sessions};

    fn fixture_path(name: &str) -> String {
        format!("{}/testdata/sessions/{name}", env!("CARGO_MANIFEST_DIR"))
    }

    #[test]
    fn loads_fixture_and_reports_dropped_rows() {
        let dataset = load_sessions(&fixture_path("sample.csv")).expect("fixture should load");
        let report = dataset.report();

        assert_eq!(report.rows_read, 8);
        assert_eq!(report.dropped_unparseable_timestamp, 1);
        assert_eq!(report.dropped_negative_charge_time, 1);
        assert_eq!(report.dropped_missing_measurement, 1);
        assert_eq!(report.rows_kept(), 5);
        assert_eq!(dataset.sessions().len(), 5);

        let first_day = NaiveDate::from_ymd_opt(2018, 1, 1).expect("valid date");
        let last_day = NaiveDate::from_ymd_opt(2018, 1, 2).expect("valid date");
        assert_eq!(dataset.date_range(), Some((first_day, last_day)));
    }

    #[test]
    fn keeps_source_row_positions_as_ids() {
        let csv = "\
Started,Ended,ChargeTime,ConnectedTime,TotalEnergy,MaxPower
2018-02-30 10:00:00,2018-02-30 11:00:00,1,1,1000,1000
2018-03-01 10:00:00,2018-03-01 11:00:00,0.5,1,2000,3700
";
        let dataset = read_sessions(csv.as_bytes()).expect("csv should parse");

        assert_eq!(dataset.sessions().len(), 1);
        assert_eq!(dataset.sessions()[0].id, 1);
        assert_eq!(dataset.sessions()[0].charge_time_hours, 0.5);
        assert!(dataset.sessions()[0].fully_charged());
    }

    #[test]
    fn drops_undecodable_rows_and_keeps_reading() {
        let mut csv = b"Started,Ended,ChargeTime,ConnectedTime,TotalEnergy,MaxPower\n".to_vec();
        csv.extend_from_slice(b"2018-01-01 10:00:00,2018-01-01 11:00:00,1,1,5000,\xff\xfe\n");
        csv.extend_from_slice(b"2018-01-01 12:00:00,2018-01-01 13:00:00,1,1,5000,3700\n");

        let dataset = read_sessions(csv.as_slice()).expect("bad row should not abort the load");
        let report = dataset.report();

        assert_eq!(report.rows_read, 2);
        assert_eq!(report.dropped_undecodable, 1);
        assert_eq!(report.rows_kept(), 1);
        assert_eq!(dataset.sessions()[0].id, 1);
    }

    #[test]
    fn rejects_missing_column() {
        let csv = "Started,Ended,ChargeTime\n2018-01-01 10:00:00,2018-01-01 11:00:00,1\n";

        let error = read_sessions(csv.as_bytes()).expect_err("missing columns should fail");

        assert!(matches!(error, SessionCsvError::MissingColumn("ConnectedTime")));
    }

    #[test]
    fn reports_missing_file() {
        let error = load_sessions(&fixture_path("missing.csv")).expect_err("file should be missing");
        assert!(error.to_string().starts_with("failed to open sessions file"));
    }
}
