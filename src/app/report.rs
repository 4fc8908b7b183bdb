use std::io::Write;

use chrono::NaiveDate;

use crate::adapters::session_csv::load_sessions;
use crate::app::error::AppError;
use crate::app::logging;
use crate::app::services::resolve_day;
use crate::domain::occupancy::{occupancy_timeline, occupancy_timeline_by_power_type};

const MINUTE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportOptions {
    pub sessions_path: String,
    pub date: Option<NaiveDate>,
    pub by_power_type: bool,
}

#[derive(Debug, PartialEq, Eq)]
enum ParsedArgs {
    Run(ReportOptions),
    Help,
}

pub fn run_occupancy_report(args: Vec<String>) -> Result<(), AppError> {
    let options = match parse_args(&args)? {
        ParsedArgs::Run(options) => options,
        ParsedArgs::Help => {
            print_help();
            return Ok(());
        }
    };

    logging::init_for_cli()?;

    let stdout = std::io::stdout();
    write_report(&options, stdout.lock())
}

fn parse_args(args: &[String]) -> Result<ParsedArgs, AppError> {
    let mut sessions_path = None;
    let mut date = None;
    let mut by_power_type = false;

    let mut index = 0;
    while index < args.len() {
        match args[index].as_str() {
            "--sessions" => {
                let Some(value) = args.get(index + 1) else {
                    return Err(AppError::config("--sessions requires a value"));
                };
                sessions_path = Some(value.clone());
                index += 2;
            }
            "--date" => {
                let Some(value) = args.get(index + 1) else {
                    return Err(AppError::config("--date requires a value"));
                };
                let parsed = NaiveDate::parse_from_str(value, "%Y-%m-%d").map_err(|_| {
                    AppError::config(format!("--date must be YYYY-MM-DD, got {value}"))
                })?;
                date = Some(parsed);
                index += 2;
            }
            "--by-power-type" => {
                by_power_type = true;
                index += 1;
            }
            "--help" | "-h" => return Ok(ParsedArgs::Help),
            other => return Err(AppError::config(format!("unknown argument: {other}"))),
        }
    }

    let sessions_path = sessions_path.ok_or_else(|| AppError::config("--sessions is required"))?;

    Ok(ParsedArgs::Run(ReportOptions {
        sessions_path,
        date,
        by_power_type,
    }))
}

/// Writes the normalized timeline of one day as CSV.
pub fn write_report<W: Write>(options: &ReportOptions, writer: W) -> Result<(), AppError> {
    let dataset = load_sessions(&options.sessions_path).map_err(AppError::dataset_load)?;
    let day = resolve_day(&dataset, options.date).map_err(AppError::config)?;

    let mut output = csv::Writer::from_writer(writer);

    if options.by_power_type {
        output
            .write_record(["minute", "power_type", "active_sessions"])
            .map_err(AppError::runtime)?;
        for point in occupancy_timeline_by_power_type(dataset.sessions(), day) {
            output
                .write_record([
                    point.minute.format(MINUTE_FORMAT).to_string(),
                    point.category.as_str().to_string(),
                    point.active_sessions.to_string(),
                ])
                .map_err(AppError::runtime)?;
        }
    } else {
        output
            .write_record(["minute", "active_sessions"])
            .map_err(AppError::runtime)?;
        for point in occupancy_timeline(dataset.sessions(), day) {
            output
                .write_record([
                    point.minute.format(MINUTE_FORMAT).to_string(),
                    point.active_sessions.to_string(),
                ])
                .map_err(AppError::runtime)?;
        }
    }

    output.flush().map_err(AppError::runtime)?;
    tracing::info!(%day, by_power_type = options.by_power_type, "occupancy report written");

    Ok(())
}

fn print_help() {
    println!("occupancy_report");
    println!();
    println!("Usage:");
    println!("  occupancy_report --sessions <csv> [--date YYYY-MM-DD] [--by-power-type]");
    println!();
    println!("Options:");
    println!("  --sessions <csv>   charging sessions export");
    println!("  --date <day>       day to report (default: first day in the file)");
    println!("  --by-power-type    split occupancy into AC and DC");
}
