//! Waipa District flood zones from the Waikato Regional Hazards Portal.
//!
//! The portal exports a CSV of zone attributes and a GeoJSON file of the zone
//! polygons, joined on `FID`.

use serde::Deserialize;
use serde_json::Value as Json;
use tracing::{info, warn};

use crate::{
    error::EtlError,
    output::{Audit, OutputTable, Value},
    reading::{coerce::parse_measure, grid::Cell, RawGrid},
    report::Report,
};

pub const DATA_SOURCE: &str = "Waikato Regional Hazards Portal";
pub const SOURCE_URL: &str = "https://www.waikatoregion.govt.nz/services/regional-hazards-and-emergency-management/regional-hazards-portal/";
pub const ZONES_PATTERN: &str = "WaipaDistrictPlan_SpecialFeature_Area_Flood_*.csv";
pub const BOUNDARIES_PATTERN: &str = "WaipaDistrictPlan_SpecialFeature_Area_Flood_*.geojson";

const RENAMES: [(&str, &str); 2] = [
    ("Shape__Area", "shape_area_sqm"),
    ("Shape__Length", "shape_length_m"),
];

/// Zone attributes passed through with the shape columns renamed.
pub fn zones_table(bytes: &[u8], audit: &Audit, report: &mut Report) -> Result<OutputTable, EtlError> {
    let grid = RawGrid::from_csv_bytes(bytes);
    if grid.is_empty() {
        return Err(EtlError::EmptyInput(ZONES_PATTERN.to_string()));
    }

    let columns = grid
        .row(0)
        .iter()
        .map(|cell| {
            let name = cell.as_str();
            RENAMES
                .iter()
                .find(|(from, _)| *from == name)
                .map(|(_, to)| to.to_string())
                .unwrap_or_else(|| name.into_owned())
        })
        .collect();

    let mut table = OutputTable::from_columns("waipa_flood_zones", columns);
    for row in grid.rows().skip(1) {
        if row.iter().all(Cell::is_blank) {
            continue;
        }
        report.rows_read += 1;
        table.push(row.iter().map(attribute).collect());
    }
    report.records_emitted += table.len();

    info!(zones = table.len(), "processed flood zones");
    Ok(table.with_audit(audit))
}

fn attribute(cell: &Cell) -> Value {
    match cell {
        Cell::Empty => Value::Null,
        Cell::Number(n) => Value::Float(*n),
        Cell::DateTime(dt) => Value::DateTime(*dt),
        Cell::Text(s) => parse_measure(s)
            .map(Value::Float)
            .unwrap_or_else(|| Value::from(s.as_str())),
    }
}

#[derive(Debug, Deserialize)]
struct FeatureCollection {
    features: Vec<Feature>,
}

#[derive(Debug, Deserialize)]
struct Feature {
    #[serde(default)]
    properties: serde_json::Map<String, Json>,
    geometry: Option<Json>,
}

/// Points in the outer ring of a polygon, or the sum of outer rings across a
/// multipolygon. `None` for any other geometry.
fn coordinate_count(geometry: &Json) -> Option<(&str, usize)> {
    let kind = geometry.get("type")?.as_str()?;
    let coordinates = geometry.get("coordinates")?.as_array()?;
    let outer_ring = |polygon: &Json| {
        polygon
            .as_array()
            .and_then(|rings| rings.first())
            .and_then(Json::as_array)
            .map_or(0, Vec::len)
    };

    match kind {
        "Polygon" => coordinates.first().and_then(Json::as_array).map(|ring| (kind, ring.len())),
        "MultiPolygon" => Some((kind, coordinates.iter().map(outer_ring).sum())),
        _ => None,
    }
}

fn property(properties: &serde_json::Map<String, Json>, key: &str) -> Value {
    match properties.get(key) {
        Some(Json::Number(n)) => n
            .as_i64()
            .map(Value::Int)
            .or_else(|| n.as_f64().map(Value::Float))
            .unwrap_or(Value::Null),
        Some(Json::String(s)) => Value::from(s.as_str()),
        _ => Value::Null,
    }
}

/// One row per polygon feature with its geometry re-serialised as JSON.
pub fn boundaries_table(bytes: &[u8], audit: &Audit, report: &mut Report) -> Result<OutputTable, EtlError> {
    let collection: FeatureCollection =
        serde_json::from_slice(bytes).map_err(|e| EtlError::Geometry(e.to_string()))?;

    let mut table = OutputTable::new(
        "waipa_flood_boundaries",
        &["fid", "flood_zone_id", "geometry_type", "coordinate_count", "geometry_json"],
    );

    for feature in &collection.features {
        report.rows_read += 1;
        let fid = property(&feature.properties, "FID");

        let Some(geometry) = &feature.geometry else {
            warn!(fid = %fid.render(), "feature has no geometry");
            report.drop_silently("missing geometry");
            continue;
        };
        let Some((kind, count)) = coordinate_count(geometry) else {
            warn!(fid = %fid.render(), "skipping non-polygon geometry");
            report.drop_silently("non-polygon geometry");
            continue;
        };

        table.push(vec![
            fid,
            property(&feature.properties, "id"),
            Value::from(kind),
            Value::from(count),
            Value::from(geometry.to_string()),
        ]);
    }
    report.records_emitted += table.len();

    info!(polygons = table.len(), "processed flood boundaries");
    Ok(table.with_audit(audit))
}

// -- Tests -------------------------------------------------------------------
