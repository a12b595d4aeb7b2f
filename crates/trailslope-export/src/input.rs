//! Read trail geometry from GeoJSON text.
//!
//! Accepts a `FeatureCollection`, a single `Feature`, a bare geometry or a
//! `GeometryCollection`. Only `LineString` and `MultiLineString` geometry
//! is kept; everything else is counted and skipped. A third position
//! component, when present, is recorded as that coordinate's elevation.

use geo::{Coord, LineString, MultiLineString};
use serde_json::Value;
use trailslope_pipeline::{SampledElevation, TrailGeometry};

use crate::ExportError;

/// Geometry and elevation samples read from one GeoJSON document.
#[derive(Debug, Clone, Default)]
pub struct TrailInput {
    /// Line geometries, in document order.
    pub geometries: Vec<TrailGeometry>,
    /// Elevations from 3D positions, keyed by exact coordinate.
    pub elevations: SampledElevation,
    /// Features or geometries that were not lines.
    pub ignored: usize,
}

/// Parse GeoJSON text into trail geometry.
///
/// # Errors
///
/// Returns [`ExportError::Json`] for malformed JSON and
/// [`ExportError::InvalidGeoJson`] for structurally invalid GeoJSON.
pub fn parse_trails(text: &str) -> Result<TrailInput, ExportError> {
    let document: Value = serde_json::from_str(text)?;
    let mut input = TrailInput::default();
    read_object(&document, &mut input)?;
    Ok(input)
}

fn type_of(object: &Value) -> Result<&str, ExportError> {
    object
        .get("type")
        .and_then(Value::as_str)
        .ok_or_else(|| ExportError::InvalidGeoJson("object has no \"type\"".to_owned()))
}

fn read_object(object: &Value, input: &mut TrailInput) -> Result<(), ExportError> {
    match type_of(object)? {
        "FeatureCollection" => {
            let features = object
                .get("features")
                .and_then(Value::as_array)
                .ok_or_else(|| {
                    ExportError::InvalidGeoJson("FeatureCollection without \"features\"".to_owned())
                })?;
            for feature in features {
                read_object(feature, input)?;
            }
        }
        "Feature" => match object.get("geometry") {
            Some(geometry) if !geometry.is_null() => read_object(geometry, input)?,
            _ => input.ignored += 1,
        },
        "GeometryCollection" => {
            let geometries = object
                .get("geometries")
                .and_then(Value::as_array)
                .ok_or_else(|| {
                    ExportError::InvalidGeoJson(
                        "GeometryCollection without \"geometries\"".to_owned(),
                    )
                })?;
            for geometry in geometries {
                read_object(geometry, input)?;
            }
        }
        "LineString" => {
            let line = read_line(coordinates(object)?, input)?;
            input.geometries.push(TrailGeometry::from(line));
        }
        "MultiLineString" => {
            let lines = array(coordinates(object)?, "MultiLineString coordinates")?
                .iter()
                .map(|line| read_line(line, input))
                .collect::<Result<Vec<_>, _>>()?;
            input
                .geometries
                .push(TrailGeometry::from(MultiLineString::new(lines)));
        }
        "Point" | "MultiPoint" | "Polygon" | "MultiPolygon" => input.ignored += 1,
        other => {
            return Err(ExportError::InvalidGeoJson(format!(
                "unknown type \"{other}\""
            )));
        }
    }
    Ok(())
}

fn coordinates(geometry: &Value) -> Result<&Value, ExportError> {
    geometry
        .get("coordinates")
        .ok_or_else(|| ExportError::InvalidGeoJson("geometry has no \"coordinates\"".to_owned()))
}

fn array<'v>(value: &'v Value, what: &str) -> Result<&'v Vec<Value>, ExportError> {
    value
        .as_array()
        .ok_or_else(|| ExportError::InvalidGeoJson(format!("{what} must be an array")))
}

fn read_line(value: &Value, input: &mut TrailInput) -> Result<LineString<f64>, ExportError> {
    let coords = array(value, "line coordinates")?
        .iter()
        .map(|position| read_position(position, input))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(LineString::new(coords))
}

fn read_position(value: &Value, input: &mut TrailInput) -> Result<Coord<f64>, ExportError> {
    let components = array(value, "position")?;
    let number = |index: usize| components.get(index).and_then(Value::as_f64);
    let (Some(x), Some(y)) = (number(0), number(1)) else {
        return Err(ExportError::InvalidGeoJson(format!(
            "position needs two numbers, got {value}"
        )));
    };
    let coord = Coord { x, y };
    if let Some(z) = number(2) {
        input.elevations.insert(coord, z);
    }
    Ok(coord)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use trailslope_pipeline::ElevationSource;

    use super::*;

    #[test]
    fn reads_lines_and_skips_other_geometry() {
        let text = r#"{
            "type": "FeatureCollection",
            "features": [
                {"type": "Feature", "properties": {},
                 "geometry": {"type": "LineString", "coordinates": [[8.0, 47.0], [8.0, 47.1]]}},
                {"type": "Feature", "properties": {},
                 "geometry": {"type": "MultiLineString",
                              "coordinates": [[[8.0, 47.1], [8.1, 47.1]], [[9.0, 46.0], [9.0, 46.1]]]}},
                {"type": "Feature", "properties": {},
                 "geometry": {"type": "Point", "coordinates": [8.0, 47.0]}},
                {"type": "Feature", "properties": {}, "geometry": null}
            ]
        }"#;
        let input = parse_trails(text).unwrap();
        assert_eq!(input.geometries.len(), 2);
        assert_eq!(input.ignored, 2);
        assert_eq!(input.geometries[1].line_strings().count(), 2);
        assert!(input.elevations.is_empty());
    }

    #[test]
    fn third_component_becomes_elevation() {
        let text = r#"{"type": "LineString", "coordinates": [[8.0, 47.0, 512.5], [8.0, 47.1, 530.0]]}"#;
        let input = parse_trails(text).unwrap();
        assert_eq!(input.elevations.len(), 2);
        let z = input.elevations.elevation(Coord { x: 8.0, y: 47.1 });
        assert!((z - 530.0).abs() < f64::EPSILON);
    }

    #[test]
    fn rejects_malformed_documents() {
        assert!(matches!(parse_trails("{"), Err(ExportError::Json(_))));
        assert!(matches!(
            parse_trails(r#"{"type": "LineString", "coordinates": [[8.0]]}"#),
            Err(ExportError::InvalidGeoJson(_))
        ));
        assert!(matches!(
            parse_trails(r#"{"type": "Banana"}"#),
            Err(ExportError::InvalidGeoJson(_))
        ));
    }
}
