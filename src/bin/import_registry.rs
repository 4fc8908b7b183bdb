use std::path::Path;

use ev_dashboard::adapters::registry_csv::read_registry_file;
use ev_dashboard::adapters::registry_db::{
    clear_vehicles, count_vehicles, insert_vehicles, open_connection, run_migrations,
    schema_version,
};

fn main() {
    if let Err(error) = run() {
        eprintln!("failed to import registry: {error}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), String> {
    let mut csv_path = None;
    let mut db_path = "./data/registry.db".to_string();
    let mut replace = false;

    let args: Vec<String> = std::env::args().skip(1).collect();
    let mut index = 0;
    while index < args.len() {
        match args[index].as_str() {
            "--csv" => {
                let Some(value) = args.get(index + 1) else {
                    return Err("--csv requires a value".to_string());
                };
                csv_path = Some(value.clone());
                index += 2;
            }
            "--db" => {
                let Some(value) = args.get(index + 1) else {
                    return Err("--db requires a value".to_string());
                };
                db_path = value.clone();
                index += 2;
            }
            "--replace" => {
                replace = true;
                index += 1;
            }
            "--help" | "-h" => {
                print_help();
                return Ok(());
            }
            other => {
                return Err(format!("unknown argument: {other}"));
            }
        }
    }

    let Some(csv_path) = csv_path else {
        return Err("--csv is required".to_string());
    };

    let records = read_registry_file(&csv_path).map_err(|error| error.to_string())?;

    if let Some(parent) = Path::new(&db_path).parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)
            .map_err(|error| format!("failed to create parent directory: {error}"))?;
    }

    let mut connection = open_connection(&db_path).map_err(|error| error.to_string())?;
    run_migrations(&mut connection).map_err(|error| error.to_string())?;

    if replace {
        let removed = clear_vehicles(&connection).map_err(|error| error.to_string())?;
        println!("removed {removed} existing vehicles");
    }

    let written = insert_vehicles(&mut connection, &records).map_err(|error| error.to_string())?;
    let total = count_vehicles(&connection).map_err(|error| error.to_string())?;
    let version = schema_version(&connection).map_err(|error| error.to_string())?;

    println!("imported {written} vehicles from {csv_path} into {db_path}");
    println!("vehicles stored: {total}");
    println!("schema version: {version}");
    Ok(())
}

fn print_help() {
    println!("import_registry");
    println!();
    println!("Usage:");
    println!("  cargo run --bin import_registry -- --csv <file> [--db <file>] [--replace]");
    println!();
    println!("Options:");
    println!("  --csv <file>   registry CSV export");
    println!("  --db <file>    target sqlite file (default: ./data/registry.db)");
    println!("  --replace      delete stored vehicles before importing");
}
