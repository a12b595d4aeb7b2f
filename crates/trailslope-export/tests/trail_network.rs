//! Integration test: read a small trail network from GeoJSON, run the
//! analyzer and export lines, labels and an SVG preview.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use trailslope_pipeline::{AnalyzerConfig, Exaggerated, LoopPolicy};

/// A valley trail forking at (8.0, 47.002): one branch climbs north, one
/// heads east on the level. Elevations ride along as the third component.
const NETWORK: &str = r#"{
  "type": "FeatureCollection",
  "features": [
    {"type": "Feature", "properties": {"highway": "path"},
     "geometry": {"type": "LineString", "coordinates": [
       [8.0, 47.000, 500.0], [8.0, 47.001, 505.0], [8.0, 47.002, 510.0]]}},
    {"type": "Feature", "properties": {"highway": "path"},
     "geometry": {"type": "LineString", "coordinates": [
       [8.0, 47.002, 510.0], [8.0, 47.003, 525.0], [8.0, 47.004, 540.0]]}},
    {"type": "Feature", "properties": {"highway": "track"},
     "geometry": {"type": "LineString", "coordinates": [
       [8.0, 47.002, 510.0], [8.001, 47.002, 510.0], [8.002, 47.002, 510.0]]}},
    {"type": "Feature", "properties": {"name": "summit"},
     "geometry": {"type": "Point", "coordinates": [8.0, 47.004, 540.0]}}
  ]
}"#;

#[test]
fn network_to_geojson_and_svg() {
    let input = trailslope_export::parse_trails(NETWORK).expect("network should parse");
    assert_eq!(input.geometries.len(), 3);
    assert_eq!(input.ignored, 1);

    let output = trailslope_pipeline::process(
        &input.geometries,
        &input.elevations,
        &AnalyzerConfig::default(),
    )
    .expect("analysis should succeed");
    assert_eq!(output.lines.len(), 3);

    let labels = trailslope_export::labels_to_geojson(&output.labels).unwrap();
    let labels: serde_json::Value =
        serde_json::from_str(&trailslope_export::collection_to_string(&labels).unwrap()).unwrap();
    let first = &labels["features"][0]["properties"];
    // The steep northern branch climbs 30 m and is labeled first.
    assert_eq!(first["elevationDeltaLabel"], "▲30/222m");
    assert_eq!(first["slopeLabel"], "13%");

    let lines = trailslope_export::lines_to_geojson(&output.lines).unwrap();
    let lines = serde_json::to_value(&lines).unwrap();
    for feature in lines["features"].as_array().unwrap() {
        assert_eq!(feature["geometry"]["type"], "MultiLineString");
        let opacity = feature["properties"]["opacity"].as_f64().unwrap();
        assert!((0.0..=1.0).contains(&opacity));
    }

    let svg = trailslope_export::to_svg(
        &output,
        &trailslope_export::SvgMetadata {
            title: Some("network"),
            ..Default::default()
        },
    );
    assert!(svg.contains("<svg"));
    assert_eq!(svg.matches("<path").count(), 6);
    assert!(svg.contains(&trailslope_export::slope_color(100.0)));
}

#[test]
fn exaggerated_elevations_are_corrected() {
    let input = trailslope_export::parse_trails(NETWORK).unwrap();
    let plain = trailslope_pipeline::process(
        &input.geometries,
        &input.elevations,
        &AnalyzerConfig::default(),
    )
    .unwrap();

    // Scale the samples as a renderer with 1.5x exaggeration would.
    let scaled = |c: geo::Coord<f64>| {
        1.5 * trailslope_pipeline::ElevationSource::elevation(&input.elevations, c)
    };
    let corrected = trailslope_pipeline::process(
        &input.geometries,
        &Exaggerated::new(scaled, 1.5),
        &AnalyzerConfig::default(),
    )
    .unwrap();

    for (a, b) in plain.labels.iter().zip(&corrected.labels) {
        assert_eq!(a.properties.slope_label, b.properties.slope_label);
        assert_eq!(
            a.properties.elevation_delta_label,
            b.properties.elevation_delta_label
        );
    }
}

#[test]
fn isolated_loop_is_only_rendered_when_requested() {
    let ring = r#"{"type": "LineString", "coordinates": [
        [8.0, 47.0, 500.0], [8.002, 47.0, 510.0], [8.002, 47.002, 520.0],
        [8.0, 47.002, 510.0], [8.0, 47.0, 500.0]]}"#;
    let input = trailslope_export::parse_trails(ring).unwrap();

    let ignored = trailslope_pipeline::process(
        &input.geometries,
        &input.elevations,
        &AnalyzerConfig::default(),
    )
    .unwrap();
    assert!(ignored.is_empty());

    let config = AnalyzerConfig {
        loop_policy: LoopPolicy::Emit,
        ..AnalyzerConfig::default()
    };
    let emitted =
        trailslope_pipeline::process(&input.geometries, &input.elevations, &config).unwrap();
    assert_eq!(emitted.lines.len(), 1);
}
