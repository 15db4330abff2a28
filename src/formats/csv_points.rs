//! Point tables stored as CSV with longitude/latitude columns

use std::io::Read;

use serde_json::{Map, Number, Value};

use crate::error::{Error, Result};
use crate::projection::Coordinate;

use super::PointRecord;

const LON_COLUMNS: [&str; 3] = ["longitude", "lon", "lng"];
const LAT_COLUMNS: [&str; 2] = ["latitude", "lat"];

fn find_column(headers: &csv::StringRecord, names: &[&str]) -> Option<usize> {
    headers
        .iter()
        .position(|h| names.iter().any(|name| h.trim().eq_ignore_ascii_case(name)))
}

/// Interprets a CSV cell: empty is null, anything that parses as a number is numeric
fn cell_value(cell: &str) -> Value {
    let cell = cell.trim();
    if cell.is_empty() {
        return Value::Null;
    }
    if let Ok(int) = cell.parse::<i64>() {
        return Value::Number(int.into());
    }
    match cell.parse::<f64>().ok().and_then(Number::from_f64) {
        Some(number) => Value::Number(number),
        None => Value::String(cell.to_string()),
    }
}

fn parse_coordinate(cell: &str, column: &str, row: usize) -> Result<f64> {
    cell.trim().parse().map_err(|_| {
        Error::data(format!("Row {}: invalid {} value \"{}\"", row, column, cell))
    })
}

/// Reads WGS84 point records from CSV. Every other column becomes a property.
pub fn read_points<R: Read>(reader: R) -> Result<Vec<PointRecord>> {
    let mut csv_reader = csv::Reader::from_reader(reader);
    let headers = csv_reader.headers()?.clone();

    let lon_index = find_column(&headers, &LON_COLUMNS)
        .ok_or_else(|| Error::data("CSV file has no longitude column"))?;
    let lat_index = find_column(&headers, &LAT_COLUMNS)
        .ok_or_else(|| Error::data("CSV file has no latitude column"))?;

    let mut records = Vec::new();
    for (row, result) in csv_reader.records().enumerate() {
        let record = result?;

        let lon = parse_coordinate(record.get(lon_index).unwrap_or(""), "longitude", row + 1)?;
        let lat = parse_coordinate(record.get(lat_index).unwrap_or(""), "latitude", row + 1)?;

        let mut properties = Map::new();
        for (index, (header, cell)) in headers.iter().zip(record.iter()).enumerate() {
            if index != lon_index && index != lat_index {
                properties.insert(header.trim().to_string(), cell_value(cell));
            }
        }

        records.push(PointRecord {
            position: Coordinate::from_lonlat(lon, lat),
            properties,
        });
    }

    Ok(records)
}
