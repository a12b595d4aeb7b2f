//! trailslope-pipeline: Pure trail network slope analyzer (sans-IO).
//!
//! Turns the path geometries visible on a map into slope-annotated trail
//! segments through:
//! connectivity graph -> junction classification -> path coalescing ->
//! slope analysis -> arrow and label geometry.
//!
//! This crate has **no I/O dependencies**. It operates on in-memory
//! geometry and an [`ElevationSource`], and returns render-ready feature
//! collections. Serialization lives in `trailslope-export`.

pub mod analyze;
pub mod classify;
pub mod coalesce;
pub mod diagnostics;
pub mod geometry;
pub mod graph;
pub mod key;
pub mod measure;
pub mod pipeline;
pub mod schedule;
pub mod sink;
pub mod terrain;
pub mod types;

pub use analyze::{Analysis, Rejection, TrailSegment};
pub use classify::{JunctionCensus, NodeKind, is_junction};
pub use coalesce::{Coalesced, CoalescedPath, PathCoalescer};
pub use geometry::SegmentGeometry;
pub use graph::{BuildStats, ConnectivityGraph};
pub use key::{NodeKey, ParseNodeKeyError};
pub use pipeline::Pipeline;
pub use schedule::{Generation, RecomputeScheduler};
pub use sink::{LabelFeature, LineFeature, RenderCollections, SegmentProperties};
pub use terrain::{
    ElevationSource, Exaggerated, GeoBounds, RasterProjection, SampledElevation, TerrainEncoding,
    TerrainError, TerrainRaster,
};
pub use types::{AnalyzerConfig, AnalyzerError, ChainPolicy, LoopPolicy, TrailGeometry};

/// Run the full analyzer over one snapshot of rendered paths.
///
/// # Pipeline steps
///
/// 1. Build the connectivity graph, resolving each node's elevation once
/// 2. Classify nodes as dead ends, pass-throughs or forks
/// 3. Coalesce junction-to-junction runs into paths
/// 4. Orient paths uphill, measure slope, drop short and steep ones
/// 5. Trim, add an arrowhead and place a label for each survivor
///
/// Labels in the result are sorted by ascending `negElevationDelta`.
///
/// # Errors
///
/// Returns [`AnalyzerError::InvalidConfig`] for an invalid config,
/// [`AnalyzerError::MalformedChain`] when a chain cannot be walked under
/// [`ChainPolicy::Abort`], and [`AnalyzerError::DegenerateInterpolation`]
/// when a label or arrow point cannot be placed.
pub fn process<E>(
    geometries: &[TrailGeometry],
    elevation: &E,
    config: &AnalyzerConfig,
) -> Result<RenderCollections, AnalyzerError>
where
    E: ElevationSource + ?Sized,
{
    Ok(Pipeline::new(geometries, elevation, config.clone())
        .build_graph()?
        .classify()
        .coalesce()?
        .analyze()
        .synthesize()?
        .into_output())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use geo::{Coord, LineString, line_string};

    use super::*;

    /// Rises 10 m per 0.001 degrees of latitude, i.e. about 9 %.
    fn hill(c: Coord<f64>) -> f64 {
        (c.y - 47.0) * 10_000.0
    }

    fn line(coords: &[(f64, f64)]) -> TrailGeometry {
        TrailGeometry::from(LineString::from(coords.to_vec()))
    }

    #[test]
    fn empty_input_produces_empty_collections() {
        let output = process(&[], &hill, &AnalyzerConfig::default()).unwrap();
        assert!(output.is_empty());
        assert!(output.labels.is_empty());
    }

    #[test]
    fn chain_of_pass_through_vertices_is_one_segment() {
        let trails = vec![line(&[
            (8.0, 47.0),
            (8.0, 47.001),
            (8.0, 47.002),
            (8.0, 47.003),
        ])];
        let output = process(&trails, &hill, &AnalyzerConfig::default()).unwrap();
        assert_eq!(output.lines.len(), 1);
        assert_eq!(output.labels.len(), 1);
        let props = &output.lines[0].properties;
        assert!((props.elevation_delta - 30.0).abs() < 1e-6);
        assert_eq!(props.slope_label, "9%");
    }

    #[test]
    fn three_way_junction_yields_three_segments() {
        let trails = vec![
            line(&[(8.0, 47.0), (8.0, 47.001), (8.0, 47.002)]),
            line(&[(8.0, 47.002), (8.0, 47.003), (8.0, 47.004)]),
            line(&[(8.0, 47.002), (8.001, 47.002), (8.002, 47.002)]),
        ];
        let output = process(&trails, &hill, &AnalyzerConfig::default()).unwrap();
        assert_eq!(output.lines.len(), 3);
    }

    #[test]
    fn overlapping_features_do_not_duplicate_segments() {
        let trail = line(&[(8.0, 47.0), (8.0, 47.001), (8.0, 47.002)]);
        let reversed = line(&[(8.0, 47.002), (8.0, 47.001), (8.0, 47.0)]);
        let once = process(&[trail.clone()], &hill, &AnalyzerConfig::default()).unwrap();
        let twice = process(&[trail, reversed], &hill, &AnalyzerConfig::default()).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn arrow_tip_is_the_uphill_end() {
        // Digitized top to bottom; the arrow still points north.
        let trails = vec![TrailGeometry::from(
            line_string![(x: 8.0, y: 47.002), (x: 8.0, y: 47.0)],
        )];
        let output = process(&trails, &hill, &AnalyzerConfig::default()).unwrap();
        let arrow = &output.lines[0].geometry.0;
        let body = &arrow[0].0;
        let tip = arrow[1].0[1];
        assert!(body[0].y < body[body.len() - 1].y);
        assert_eq!(tip, body[body.len() - 1]);
    }

    #[test]
    fn exaggerated_terrain_is_divided_back() {
        let trails = vec![line(&[(8.0, 47.0), (8.0, 47.002)])];
        let raw = process(&trails, &hill, &AnalyzerConfig::default()).unwrap();
        let exaggerated = |c: Coord<f64>| hill(c) * 3.0;
        let corrected = process(
            &trails,
            &Exaggerated::new(exaggerated, 3.0),
            &AnalyzerConfig::default(),
        )
        .unwrap();
        assert!(
            (raw.lines[0].properties.slope - corrected.lines[0].properties.slope).abs() < 1e-9
        );
    }
}
