//! Parsing raw feed rows into [`ScheduleRecord`]s and [`RegulationRecord`]s.
//!
//! Rows are flat JSON objects as served by the city's open-data portal. Numeric fields may
//! arrive as numbers or numeric strings; malformed optional fields become `None`. A row
//! missing a required field or a usable geometry is rejected with a [`RecordError`] and
//! skipped by the batch helpers, which never abort.

use crate::error::RecordError;
use crate::types::{
    EnforcementDays, Location, Polyline, RegulationKind, RegulationRecord, ScheduleRecord, Side,
    SweepDay,
};
use serde::Deserialize;
use serde_json::{Map, Value};

#[derive(Deserialize)]
#[serde(tag = "type")]
enum RawGeometry {
    LineString { coordinates: Vec<Vec<f64>> },
    MultiLineString { coordinates: Vec<Vec<Vec<f64>>> },
}

/// Parses a GeoJSON `LineString` or `MultiLineString` (parts concatenated in order).
///
/// Accepts the geometry either as an object or as a JSON-encoded string. Positions with
/// fewer than two numbers are dropped; fewer than two remaining points is an error.
pub fn parse_geometry(value: &Value) -> Result<Polyline, RecordError> {
    let raw: RawGeometry = match value {
        Value::String(text) => serde_json::from_str(text),
        other => serde_json::from_value(other.clone()),
    }
    .map_err(|_| RecordError::InvalidGeometry)?;

    let positions = match raw {
        RawGeometry::LineString { coordinates } => coordinates,
        RawGeometry::MultiLineString { coordinates } => coordinates.into_iter().flatten().collect(),
    };

    let polyline = Polyline::new(
        positions
            .iter()
            .filter(|position| position.len() >= 2)
            .map(|position| Location::new(position[1], position[0]))
            .collect(),
    );

    if polyline.usable_points().len() < 2 {
        return Err(RecordError::InvalidGeometry);
    }
    Ok(polyline)
}

/// Parses one sweeping-schedule row.
pub fn parse_schedule_row(row: &Value) -> Result<ScheduleRecord, RecordError> {
    let fields = row.as_object().ok_or(RecordError::NotAnObject)?;

    let street_id = text(fields, "cnn").ok_or(RecordError::MissingField("cnn"))?;
    let side = required(fields, "cnnrightleft", Side::parse)?;
    let day = required(fields, "weekday", SweepDay::parse)?;
    let start_hour = hour(fields, "fromhour", 23)?;
    let end_hour = hour(fields, "tohour", 24)?;
    let geometry = parse_geometry(fields.get("line").ok_or(RecordError::InvalidGeometry)?)?;

    Ok(ScheduleRecord {
        street_id,
        side,
        day,
        start_hour,
        end_hour,
        weeks: [
            flag(fields, "week1"),
            flag(fields, "week2"),
            flag(fields, "week3"),
            flag(fields, "week4"),
            flag(fields, "week5"),
        ],
        holidays: flag(fields, "holidays"),
        street_name: text(fields, "corridor"),
        limits: text(fields, "limits"),
        geometry,
    })
}

/// Parses one parking-regulation row.
pub fn parse_regulation_row(row: &Value) -> Result<RegulationRecord, RecordError> {
    let fields = row.as_object().ok_or(RecordError::NotAnObject)?;

    let regulation_id = text(fields, "objectid").ok_or(RecordError::MissingField("objectid"))?;
    let geometry = parse_geometry(fields.get("shape").ok_or(RecordError::InvalidGeometry)?)?;

    Ok(RegulationRecord {
        regulation_id,
        kind: text(fields, "regulation")
            .map(|label| RegulationKind::parse(&label))
            .unwrap_or(RegulationKind::Unknown),
        permit_zone: text(fields, "rpparea1"),
        hour_limit: number(fields, "hrlimit"),
        days: text(fields, "days").and_then(|label| EnforcementDays::parse(&label)),
        enforcement_start: fields.get("hrs_begin").and_then(parse_clock),
        enforcement_end: fields.get("hrs_end").and_then(parse_clock),
        geometry,
    })
}

/// Parses every schedule row, logging and counting the ones skipped.
pub fn parse_schedules(rows: &[Value]) -> (Vec<ScheduleRecord>, usize) {
    parse_all(rows, "schedule", "cnn", parse_schedule_row)
}

/// Parses every regulation row, logging and counting the ones skipped.
pub fn parse_regulations(rows: &[Value]) -> (Vec<RegulationRecord>, usize) {
    parse_all(rows, "regulation", "objectid", parse_regulation_row)
}

fn parse_all<T>(
    rows: &[Value],
    feed: &str,
    id_field: &str,
    parse: impl Fn(&Value) -> Result<T, RecordError>,
) -> (Vec<T>, usize) {
    let mut records = Vec::with_capacity(rows.len());
    let mut skipped = 0;
    for (idx, row) in rows.iter().enumerate() {
        match parse(row) {
            Ok(record) => records.push(record),
            Err(err) => {
                skipped += 1;
                let id = row
                    .get(id_field)
                    .map(|v| v.to_string())
                    .unwrap_or_else(|| format!("#{}", idx));
                log::warn!("skipping {} row {}: {}", feed, id, err);
            }
        }
    }
    (records, skipped)
}

/// Parses a clock value such as `800`, `"0800"`, `"18:30"` or `2400` into minutes after
/// midnight. Returns `None` for anything malformed.
pub fn parse_clock(value: &Value) -> Option<u16> {
    let raw = match value {
        Value::Number(n) => n.as_f64()?.to_string(),
        Value::String(s) => s.trim().to_string(),
        _ => return None,
    };

    let (hours, minutes) = match raw.split_once(':') {
        Some((h, m)) => (h.trim().parse::<u16>().ok()?, m.trim().parse::<u16>().ok()?),
        None => {
            let hhmm = raw.parse::<f64>().ok().filter(|v| v.fract() == 0.0 && *v >= 0.0)? as u16;
            (hhmm / 100, hhmm % 100)
        }
    };

    if minutes >= 60 || hours > 24 || (hours == 24 && minutes > 0) {
        return None;
    }
    Some(hours * 60 + minutes)
}

fn text(fields: &Map<String, Value>, key: &str) -> Option<String> {
    let value = match fields.get(key)? {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        _ => return None,
    };
    (!value.is_empty()).then_some(value)
}

fn number(fields: &Map<String, Value>, key: &str) -> Option<f64> {
    match fields.get(key)? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
    .filter(|v| v.is_finite())
}

fn flag(fields: &Map<String, Value>, key: &str) -> bool {
    match fields.get(key) {
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_f64().is_some_and(|v| v != 0.0),
        Some(Value::String(s)) => matches!(
            s.trim().to_ascii_lowercase().as_str(),
            "1" | "y" | "yes" | "true" | "t"
        ),
        _ => false,
    }
}

fn hour(fields: &Map<String, Value>, key: &'static str, max: u8) -> Result<u8, RecordError> {
    let value = number(fields, key).ok_or(RecordError::MissingField(key))?;
    if value.fract() != 0.0 || value < 0.0 || value > f64::from(max) {
        return Err(RecordError::InvalidField {
            field: key,
            value: value.to_string(),
        });
    }
    Ok(value as u8)
}

fn required<T>(
    fields: &Map<String, Value>,
    key: &'static str,
    parse: impl Fn(&str) -> Option<T>,
) -> Result<T, RecordError> {
    let raw = text(fields, key).ok_or(RecordError::MissingField(key))?;
    parse(&raw).ok_or(RecordError::InvalidField {
        field: key,
        value: raw,
    })
}
