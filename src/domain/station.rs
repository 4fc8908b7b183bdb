use serde::Serialize;
use serde_json::{Map, Value};
use thiserror::Error;

pub const ALL_PROVINCES: &str = "Alle provincies";

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StationMarker {
    pub latitude: f64,
    pub longitude: f64,
    pub address: Option<String>,
    pub power_kw: Option<f64>,
}

impl StationMarker {
    pub fn popup(&self) -> String {
        let address = self.address.as_deref().unwrap_or("-");
        match self.power_kw {
            Some(power) => format!("{address}<br>Vermogen: {power} kW"),
            None => format!("{address}<br>Vermogen: onbekend"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProvinceView {
    pub name: &'static str,
    pub center: [f64; 2],
    pub zoom: u8,
}

pub const PROVINCES: &[ProvinceView] = &[
    ProvinceView {
        name: ALL_PROVINCES,
        center: [52.2129919, 5.2793703],
        zoom: 7,
    },
    ProvinceView {
        name: "Groningen",
        center: [53.2194, 6.5665],
        zoom: 10,
    },
    ProvinceView {
        name: "Friesland",
        center: [53.1642, 5.7818],
        zoom: 10,
    },
    ProvinceView {
        name: "Drenthe",
        center: [52.9480, 6.6231],
        zoom: 10,
    },
    ProvinceView {
        name: "Overijssel",
        center: [52.4380, 6.5010],
        zoom: 10,
    },
    ProvinceView {
        name: "Flevoland",
        center: [52.5279, 5.5953],
        zoom: 10,
    },
    ProvinceView {
        name: "Gelderland",
        center: [52.0452, 5.8718],
        zoom: 10,
    },
    ProvinceView {
        name: "Utrecht",
        center: [52.0907, 5.1214],
        zoom: 11,
    },
    ProvinceView {
        name: "Noord-Holland",
        center: [52.5200, 4.7885],
        zoom: 9,
    },
    ProvinceView {
        name: "Zuid-Holland",
        center: [51.9961, 4.5597],
        zoom: 10,
    },
    ProvinceView {
        name: "Zeeland",
        center: [51.4940, 3.8490],
        zoom: 10,
    },
    ProvinceView {
        name: "Noord-Brabant",
        center: [51.4827, 5.2322],
        zoom: 10,
    },
    ProvinceView {
        name: "Limburg",
        center: [51.4427, 6.0600],
        zoom: 9,
    },
];

/// Unknown or missing names fall back to the whole-country view.
pub fn province_view(name: Option<&str>) -> ProvinceView {
    let all = PROVINCES[0];
    let Some(name) = name.map(str::trim).filter(|name| !name.is_empty()) else {
        return all;
    };

    PROVINCES
        .iter()
        .find(|view| view.name.eq_ignore_ascii_case(name))
        .copied()
        .unwrap_or(all)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StationMap {
    pub view: ProvinceView,
    pub markers: Vec<StationMarker>,
    pub excluded_without_coordinates: usize,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ParsedStations {
    pub markers: Vec<StationMarker>,
    pub excluded_without_coordinates: usize,
}

#[derive(Debug, Error, PartialEq)]
pub enum StationParseError {
    #[error("station directory payload must be a JSON array")]
    InvalidPayloadType,
}

/// Reads markers from a directory listing. Records without coordinates are
/// counted and skipped.
pub fn parse_station_directory(payload: &Value) -> Result<ParsedStations, StationParseError> {
    let records = payload
        .as_array()
        .ok_or(StationParseError::InvalidPayloadType)?;

    let mut parsed = ParsedStations::default();
    for record in records {
        match record.as_object().and_then(parse_station) {
            Some(marker) => parsed.markers.push(marker),
            None => parsed.excluded_without_coordinates += 1,
        }
    }

    Ok(parsed)
}

fn parse_station(record: &Map<String, Value>) -> Option<StationMarker> {
    let address_info = record.get("AddressInfo")?.as_object()?;
    let latitude = address_info.get("Latitude").and_then(number)?;
    let longitude = address_info.get("Longitude").and_then(number)?;

    let address = address_info
        .get("AddressLine1")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string);
    let power_kw = record
        .get("Connections")
        .and_then(Value::as_array)
        .and_then(|connections| connections.first())
        .and_then(|connection| connection.get("PowerKW"))
        .and_then(number);

    Some(StationMarker {
        latitude,
        longitude,
        address,
        power_kw,
    })
}

fn number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(number) => number.as_f64(),
        Value::String(text) => text.trim().parse::<f64>().ok(),
        _ => None,
    }
    .filter(|value| value.is_finite())
}

pub fn station_map(province: Option<&str>, parsed: ParsedStations) -> StationMap {
    StationMap {
        view: province_view(province),
        markers: parsed.markers,
        excluded_without_coordinates: parsed.excluded_without_coordinates,
    }
}
