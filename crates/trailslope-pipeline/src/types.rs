//! Shared types for the trailslope analyzer pipeline.

use geo::{LineString, MultiLineString};
use serde::{Deserialize, Serialize};

use crate::key::NodeKey;

/// One rendered path feature as handed over by the map.
///
/// Only line geometry participates in the trail network; callers drop
/// points and polygons before building the input list.
#[derive(Debug, Clone, PartialEq)]
pub enum TrailGeometry {
    /// A single line string.
    Line(LineString<f64>),
    /// Several line strings belonging to one feature.
    MultiLine(MultiLineString<f64>),
}

impl TrailGeometry {
    /// Iterate over every line string in this geometry.
    pub fn line_strings(&self) -> impl Iterator<Item = &LineString<f64>> {
        let lines: &[LineString<f64>] = match self {
            Self::Line(line) => std::slice::from_ref(line),
            Self::MultiLine(multi) => &multi.0,
        };
        lines.iter()
    }
}

impl From<LineString<f64>> for TrailGeometry {
    fn from(line: LineString<f64>) -> Self {
        Self::Line(line)
    }
}

impl From<MultiLineString<f64>> for TrailGeometry {
    fn from(multi: MultiLineString<f64>) -> Self {
        Self::MultiLine(multi)
    }
}

/// What the coalescer does when a pass-through node does not have
/// exactly one way forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ChainPolicy {
    /// Fail the whole pass with [`AnalyzerError::MalformedChain`].
    #[default]
    Abort,
    /// Drop the offending chain, log a warning and keep going.
    Skip,
}

/// How closed loops with no junction anywhere on them are handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum LoopPolicy {
    /// Loops made only of degree-2 nodes are never visited.
    #[default]
    Ignore,
    /// Sweep for unvisited loops after junction-seeded traversal and emit
    /// each as one closed path.
    Emit,
}

/// Configuration for the trail analyzer.
///
/// Distances used for trimming and arrowheads are expressed in input
/// coordinate units and scaled by `2^-zoom`, so they stay a constant size
/// on screen. Length and elevation thresholds are in meters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyzerConfig {
    /// Current map zoom level.
    pub zoom: f64,

    /// Paths with a geodesic length below this are dropped (meters).
    pub min_length_m: f64,

    /// Paths whose slope reaches this percentage are dropped.
    pub max_slope_percent: f64,

    /// Total amount trimmed off a segment, before zoom scaling. Half is
    /// removed from each end.
    pub trim_factor: f64,

    /// Arrowhead wing length and tail offset, before zoom scaling.
    pub arrow_factor: f64,

    /// Slope (percent) at which the slope opacity factor saturates.
    pub slope_scale: f64,

    /// Elevation delta (meters) at which the delta opacity factor saturates.
    pub delta_scale_m: f64,

    /// Length (meters) at which the length opacity factor saturates.
    pub length_scale_m: f64,

    /// Behavior on malformed pass-through chains.
    pub chain_policy: ChainPolicy,

    /// Behavior for junction-free loops.
    pub loop_policy: LoopPolicy,
}

impl AnalyzerConfig {
    /// Default zoom level.
    pub const DEFAULT_ZOOM: f64 = 15.0;
    /// Default minimum segment length in meters.
    pub const DEFAULT_MIN_LENGTH_M: f64 = 10.0;
    /// Default slope cutoff in percent.
    pub const DEFAULT_MAX_SLOPE_PERCENT: f64 = 100.0;
    /// Default trim factor.
    pub const DEFAULT_TRIM_FACTOR: f64 = 20.0;
    /// Default arrow factor.
    pub const DEFAULT_ARROW_FACTOR: f64 = 10.0;
    /// Default slope saturation for opacity.
    pub const DEFAULT_SLOPE_SCALE: f64 = 10.0;
    /// Default elevation delta saturation for opacity.
    pub const DEFAULT_DELTA_SCALE_M: f64 = 10.0;
    /// Default length saturation for opacity.
    pub const DEFAULT_LENGTH_SCALE_M: f64 = 100.0;

    /// The zoom-dependent scale `2^-zoom` applied to trim and arrow sizes.
    #[must_use]
    pub fn distance_scale(&self) -> f64 {
        (-self.zoom).exp2()
    }

    /// Total trim distance in coordinate units at the current zoom.
    #[must_use]
    pub fn trim_distance(&self) -> f64 {
        self.distance_scale() * self.trim_factor
    }

    /// Arrowhead size in coordinate units at the current zoom.
    #[must_use]
    pub fn arrow_size(&self) -> f64 {
        self.distance_scale() * self.arrow_factor
    }

    /// Check that every numeric field is finite and in range.
    ///
    /// # Errors
    ///
    /// Returns [`AnalyzerError::InvalidConfig`] naming the first bad field.
    pub fn validate(&self) -> Result<(), AnalyzerError> {
        let non_negative = [
            ("min_length_m", self.min_length_m),
            ("max_slope_percent", self.max_slope_percent),
            ("trim_factor", self.trim_factor),
            ("arrow_factor", self.arrow_factor),
        ];
        let positive = [
            ("slope_scale", self.slope_scale),
            ("delta_scale_m", self.delta_scale_m),
            ("length_scale_m", self.length_scale_m),
        ];

        if !self.zoom.is_finite() {
            return Err(AnalyzerError::InvalidConfig(format!(
                "zoom must be finite, got {}",
                self.zoom
            )));
        }
        for (name, value) in non_negative {
            if !value.is_finite() || value < 0.0 {
                return Err(AnalyzerError::InvalidConfig(format!(
                    "{name} must be finite and non-negative, got {value}"
                )));
            }
        }
        for (name, value) in positive {
            if !value.is_finite() || value <= 0.0 {
                return Err(AnalyzerError::InvalidConfig(format!(
                    "{name} must be finite and positive, got {value}"
                )));
            }
        }
        Ok(())
    }
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            zoom: Self::DEFAULT_ZOOM,
            min_length_m: Self::DEFAULT_MIN_LENGTH_M,
            max_slope_percent: Self::DEFAULT_MAX_SLOPE_PERCENT,
            trim_factor: Self::DEFAULT_TRIM_FACTOR,
            arrow_factor: Self::DEFAULT_ARROW_FACTOR,
            slope_scale: Self::DEFAULT_SLOPE_SCALE,
            delta_scale_m: Self::DEFAULT_DELTA_SCALE_M,
            length_scale_m: Self::DEFAULT_LENGTH_SCALE_M,
            chain_policy: ChainPolicy::default(),
            loop_policy: LoopPolicy::default(),
        }
    }
}

/// Errors that abort an analyzer pass.
///
/// Filtered-out segments (too short, too steep, trimmed away) are not
/// errors; they are counted in diagnostics instead.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum AnalyzerError {
    /// A pass-through node did not have exactly one continuation.
    #[error("malformed chain at node {node}: expected one continuation, found {candidates}")]
    MalformedChain {
        /// The node where the walk got stuck.
        node: NodeKey,
        /// How many continuations were found.
        candidates: usize,
    },

    /// Interpolation could not place a point within the line.
    #[error("cannot interpolate at distance {distance} along a line of length {total}")]
    DegenerateInterpolation {
        /// Requested distance along the line.
        distance: f64,
        /// Total planar length of the line.
        total: f64,
    },

    /// Analyzer configuration is invalid.
    #[error("invalid analyzer configuration: {0}")]
    InvalidConfig(String),
}
