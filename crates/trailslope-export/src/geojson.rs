//! GeoJSON serializers for the line and label collections.

use geojson::{Feature, FeatureCollection, Geometry, JsonObject, Value as GeoJsonValue};
use trailslope_pipeline::{LabelFeature, LineFeature, SegmentProperties};

use crate::ExportError;

fn properties_object(properties: &SegmentProperties) -> Result<JsonObject, ExportError> {
    match serde_json::to_value(properties)? {
        serde_json::Value::Object(map) => Ok(map),
        _ => Err(ExportError::PropertiesNotObject),
    }
}

fn feature(geometry: GeoJsonValue, properties: &SegmentProperties) -> Result<Feature, ExportError> {
    Ok(Feature {
        bbox: None,
        geometry: Some(Geometry::new(geometry)),
        id: None,
        properties: Some(properties_object(properties)?),
        foreign_members: None,
    })
}

/// One `MultiLineString` feature per arrow line.
///
/// # Errors
///
/// Returns [`ExportError`] if properties fail to serialize.
pub fn lines_to_geojson(lines: &[LineFeature]) -> Result<FeatureCollection, ExportError> {
    let features = lines
        .iter()
        .map(|line| feature(GeoJsonValue::from(&line.geometry), &line.properties))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(FeatureCollection {
        features,
        bbox: None,
        foreign_members: None,
    })
}

/// One `Point` feature per label, in the given (priority) order.
///
/// # Errors
///
/// Returns [`ExportError`] if properties fail to serialize.
pub fn labels_to_geojson(labels: &[LabelFeature]) -> Result<FeatureCollection, ExportError> {
    let features = labels
        .iter()
        .map(|label| feature(GeoJsonValue::from(&label.geometry), &label.properties))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(FeatureCollection {
        features,
        bbox: None,
        foreign_members: None,
    })
}

/// Serialize a feature collection to compact JSON.
///
/// # Errors
///
/// Returns [`ExportError::Json`] if serialization fails.
pub fn collection_to_string(collection: &FeatureCollection) -> Result<String, ExportError> {
    Ok(serde_json::to_string(collection)?)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use geo::{MultiLineString, Point, line_string};

    use super::*;

    fn properties() -> SegmentProperties {
        SegmentProperties {
            length: 180.0,
            elevation_delta: 12.0,
            neg_elevation_delta: -12.0,
            slope: 6.7,
            slope_label: "7%".to_owned(),
            elevation_delta_label: "▲12/180m".to_owned(),
            opacity: 0.8,
        }
    }

    #[test]
    fn line_features_are_multi_line_strings() {
        let lines = vec![LineFeature {
            geometry: MultiLineString::new(vec![
                line_string![(x: 8.0, y: 47.0), (x: 8.0, y: 47.1)],
                line_string![(x: 7.9, y: 47.0), (x: 8.0, y: 47.1), (x: 8.1, y: 47.0)],
            ]),
            properties: properties(),
        }];
        let collection = lines_to_geojson(&lines).unwrap();
        assert_eq!(collection.features.len(), 1);
        let value = serde_json::to_value(&collection).unwrap();
        let geometry = &value["features"][0]["geometry"];
        assert_eq!(geometry["type"], "MultiLineString");
        assert_eq!(geometry["coordinates"].as_array().unwrap().len(), 2);
        assert_eq!(geometry["coordinates"][1][1], serde_json::json!([8.0, 47.1]));
    }

    #[test]
    fn label_properties_use_style_names() {
        let labels = vec![LabelFeature {
            geometry: Point::new(8.0, 47.05),
            properties: properties(),
        }];
        let json = collection_to_string(&labels_to_geojson(&labels).unwrap()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        let props = &value["features"][0]["properties"];
        assert_eq!(props["slopeLabel"], "7%");
        assert_eq!(props["elevationDeltaLabel"], "▲12/180m");
        assert_eq!(props["negElevationDelta"], -12.0);
        assert_eq!(value["features"][0]["geometry"]["type"], "Point");
        assert_eq!(value["type"], "FeatureCollection");
    }
}
