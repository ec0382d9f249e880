//! Map marker layer data
//!
//! Produces what a map view needs (one colored point per placed record, a
//! popup, a legend and a center) as plain data and GeoJSON. Drawing the map
//! is left to whatever consumes the output.

use groupstore::Record;
use serde::Serialize;
use serde_json::{Value, json};
use tracing::debug;

use crate::engine::{Severity, classify};

/// Marker radius in pixels, as drawn by the web dashboard
pub const MARKER_RADIUS: u32 = 7;

/// Initial zoom for the map view
pub const DEFAULT_ZOOM: u32 = 12;

/// One point on the map
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Marker {
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
    pub progress_percent: f64,
    pub severity: Severity,
    pub color: &'static str,
    pub popup: Vec<(String, String)>,
}

/// Legend row
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LegendEntry {
    pub severity: Severity,
    pub color: &'static str,
    pub label: &'static str,
}

/// Labelled fields shown when a record is inspected
pub fn popup_fields(record: &Record) -> Vec<(String, String)> {
    let mut fields = vec![
        ("Group".to_string(), record.name.clone()),
        ("Proposed length (m)".to_string(), format_amount(record.proposed_length)),
        ("Budget required".to_string(), format_amount(record.budget_required)),
        ("Actual length (m)".to_string(), format_amount(record.actual_length)),
        ("Absorbed funds".to_string(), format_amount(record.absorbed_funds)),
        ("Progress".to_string(), format!("{:.2}%", record.progress_percent)),
    ];
    if let Some((lat, lon)) = record.position() {
        fields.push(("Position".to_string(), format!("{:.6}, {:.6}", lat, lon)));
    }
    for (key, value) in &record.extra {
        fields.push((key.clone(), value.clone()));
    }
    fields
}

/// Format a quantity without a trailing `.0` for whole numbers
pub fn format_amount(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{:.2}", value)
    }
}

/// Markers for every record with a usable position
pub fn markers(records: &[Record]) -> Vec<Marker> {
    let out: Vec<Marker> = records
        .iter()
        .filter_map(|record| {
            let (latitude, longitude) = record.position()?;
            let severity = classify(record.progress_percent);
            Some(Marker {
                name: record.name.clone(),
                latitude,
                longitude,
                progress_percent: record.progress_percent,
                severity,
                color: severity.color(),
                popup: popup_fields(record),
            })
        })
        .collect();
    debug!(total = records.len(), placed = out.len(), "markers: built");
    out
}

/// Mean position of placed records
pub fn map_center(records: &[Record]) -> Option<(f64, f64)> {
    let placed: Vec<(f64, f64)> = records.iter().filter_map(Record::position).collect();
    if placed.is_empty() {
        return None;
    }
    let n = placed.len() as f64;
    let lat = placed.iter().map(|(lat, _)| lat).sum::<f64>() / n;
    let lon = placed.iter().map(|(_, lon)| lon).sum::<f64>() / n;
    Some((lat, lon))
}

/// The five buckets, lowest first
pub fn legend() -> Vec<LegendEntry> {
    Severity::ALL
        .into_iter()
        .map(|severity| LegendEntry {
            severity,
            color: severity.color(),
            label: severity.range_label(),
        })
        .collect()
}

/// GeoJSON FeatureCollection for the marker layer
///
/// Map settings (center, zoom, radius) and the legend ride along as foreign
/// members of the collection.
pub fn to_geojson(records: &[Record]) -> Value {
    let features: Vec<Value> = markers(records)
        .into_iter()
        .map(|m| {
            let popup: serde_json::Map<String, Value> =
                m.popup.into_iter().map(|(k, v)| (k, Value::String(v))).collect();
            json!({
                "type": "Feature",
                "geometry": {
                    "type": "Point",
                    "coordinates": [m.longitude, m.latitude],
                },
                "properties": {
                    "name": m.name,
                    "progress_percent": m.progress_percent,
                    "severity": m.severity,
                    "color": m.color,
                    "popup": popup,
                },
            })
        })
        .collect();

    json!({
        "type": "FeatureCollection",
        "features": features,
        "map": {
            "center": map_center(records).map(|(lat, lon)| vec![lat, lon]),
            "zoom": DEFAULT_ZOOM,
            "marker_radius": MARKER_RADIUS,
        },
        "legend": legend(),
    })
}
