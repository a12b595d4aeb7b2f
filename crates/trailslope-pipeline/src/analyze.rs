//! Elevation and slope analytics for coalesced paths.
//!
//! Each path is oriented to run uphill (low endpoint first), measured,
//! and scored. Paths that are too short or too steep are filtered out
//! here; filtering is not an error.

use geo::LineString;

use crate::coalesce::CoalescedPath;
use crate::graph::ConnectivityGraph;
use crate::measure::geodesic_length;
use crate::types::AnalyzerConfig;

/// A coalesced path that survived the length and slope filters.
#[derive(Debug, Clone, PartialEq)]
pub struct TrailSegment {
    /// Path coordinates ordered from the low endpoint to the high one.
    pub path: LineString<f64>,
    /// Geodesic length in meters.
    pub length_m: f64,
    /// Elevation of the low endpoint in meters.
    pub elevation_low: f64,
    /// Elevation of the high endpoint in meters.
    pub elevation_high: f64,
    /// `|elevation_high - elevation_low|` in meters.
    pub elevation_delta: f64,
    /// Elevation delta over length, in percent.
    pub slope_percent: f64,
    /// Visual weight in `0.0..=1.0`.
    pub opacity: f64,
}

/// Why a path was dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    /// Shorter than `min_length_m`.
    TooShort,
    /// Slope at or above `max_slope_percent`.
    TooSteep,
    /// An endpoint has no usable elevation: none is cached, or the source
    /// answered NaN or infinity.
    MissingElevation,
}

/// Segments kept and counts of those dropped.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Analysis {
    /// Surviving segments, in input order.
    pub segments: Vec<TrailSegment>,
    /// Dropped for length.
    pub too_short: usize,
    /// Dropped for slope.
    pub too_steep: usize,
    /// Dropped for a missing or non-finite endpoint elevation.
    pub missing_elevation: usize,
}

impl Analysis {
    /// Total number of paths examined.
    #[must_use]
    pub fn examined(&self) -> usize {
        self.segments.len() + self.too_short + self.too_steep + self.missing_elevation
    }
}

fn clamp_unit(value: f64) -> f64 {
    value.clamp(0.0, 1.0)
}

/// Multiplicative visual weight: short, flat or low-drop segments are
/// faded even when one of the other factors saturates.
#[must_use]
pub fn opacity(slope_percent: f64, elevation_delta: f64, length_m: f64, config: &AnalyzerConfig) -> f64 {
    clamp_unit(slope_percent / config.slope_scale)
        * clamp_unit(elevation_delta / config.delta_scale_m)
        * clamp_unit(length_m / config.length_scale_m)
}

/// Measure and filter one path.
///
/// # Errors
///
/// Returns the [`Rejection`] reason if the path is filtered out.
pub fn analyze_path(
    path: &CoalescedPath,
    graph: &ConnectivityGraph,
    config: &AnalyzerConfig,
) -> Result<TrailSegment, Rejection> {
    let (Some(start), Some(end)) = (path.start(), path.end()) else {
        return Err(Rejection::TooShort);
    };
    let (Some(start_elevation), Some(end_elevation)) = (graph.elevation(start), graph.elevation(end))
    else {
        return Err(Rejection::MissingElevation);
    };
    if !start_elevation.is_finite() || !end_elevation.is_finite() {
        return Err(Rejection::MissingElevation);
    }

    let mut line = path.to_line_string();
    let length_m = geodesic_length(&line);
    if length_m < config.min_length_m {
        return Err(Rejection::TooShort);
    }

    // Ties reverse, so a level path runs end-to-start.
    let (elevation_low, elevation_high) = if start_elevation < end_elevation {
        (start_elevation, end_elevation)
    } else {
        line.0.reverse();
        (end_elevation, start_elevation)
    };

    let elevation_delta = (elevation_high - elevation_low).abs();
    let slope_percent = elevation_delta / length_m * 100.0;
    if slope_percent >= config.max_slope_percent {
        return Err(Rejection::TooSteep);
    }

    Ok(TrailSegment {
        path: line,
        length_m,
        elevation_low,
        elevation_high,
        elevation_delta,
        slope_percent,
        opacity: opacity(slope_percent, elevation_delta, length_m, config),
    })
}

/// Measure and filter every path.
#[must_use]
pub fn analyze_paths(
    paths: &[CoalescedPath],
    graph: &ConnectivityGraph,
    config: &AnalyzerConfig,
) -> Analysis {
    let mut analysis = Analysis::default();
    for path in paths {
        match analyze_path(path, graph, config) {
            Ok(segment) => analysis.segments.push(segment),
            Err(Rejection::TooShort) => analysis.too_short += 1,
            Err(Rejection::TooSteep) => analysis.too_steep += 1,
            Err(Rejection::MissingElevation) => {
                tracing::warn!(start = ?path.start(), "path endpoint has no usable elevation");
                analysis.missing_elevation += 1;
            }
        }
    }
    tracing::debug!(
        kept = analysis.segments.len(),
        too_short = analysis.too_short,
        too_steep = analysis.too_steep,
        "analyzed trail paths"
    );
    analysis
}
