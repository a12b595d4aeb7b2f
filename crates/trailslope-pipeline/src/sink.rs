//! Render-ready feature collections.
//!
//! Each surviving segment becomes one line feature (the arrow line) and one
//! label feature (the midpoint), both carrying the same properties.

use geo::{MultiLineString, Point};
use serde::{Deserialize, Serialize};

use crate::analyze::TrailSegment;
use crate::geometry::SegmentGeometry;

/// Properties shared by the line and label feature of a segment.
///
/// Field names serialize in camelCase to match the map style expressions
/// that consume them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SegmentProperties {
    /// Geodesic length in meters.
    pub length: f64,
    /// Elevation gain from low to high end, in meters.
    pub elevation_delta: f64,
    /// Negated elevation gain; labels are prioritized by ascending value.
    pub neg_elevation_delta: f64,
    /// Slope in percent.
    pub slope: f64,
    /// e.g. `"7%"`.
    pub slope_label: String,
    /// e.g. `"▲12/180m"`.
    pub elevation_delta_label: String,
    /// Visual weight in `0.0..=1.0`.
    pub opacity: f64,
}

impl SegmentProperties {
    /// Derive properties and label texts from an analyzed segment.
    #[must_use]
    pub fn from_segment(segment: &TrailSegment) -> Self {
        Self {
            length: segment.length_m,
            elevation_delta: segment.elevation_delta,
            neg_elevation_delta: -segment.elevation_delta,
            slope: segment.slope_percent,
            slope_label: format!("{:.0}%", segment.slope_percent),
            elevation_delta_label: format!(
                "▲{:.0}/{:.0}m",
                segment.elevation_delta, segment.length_m
            ),
            opacity: segment.opacity,
        }
    }
}

/// Arrow line feature.
#[derive(Debug, Clone, PartialEq)]
pub struct LineFeature {
    /// `[trimmed line, arrowhead]`.
    pub geometry: MultiLineString<f64>,
    /// Segment properties.
    pub properties: SegmentProperties,
}

/// Label anchor feature.
#[derive(Debug, Clone, PartialEq)]
pub struct LabelFeature {
    /// Midpoint of the untrimmed segment.
    pub geometry: Point<f64>,
    /// Segment properties.
    pub properties: SegmentProperties,
}

impl LabelFeature {
    /// Label priority: lower sorts first.
    #[must_use]
    pub const fn sort_key(&self) -> f64 {
        self.properties.neg_elevation_delta
    }
}

/// The two output collections of one analyzer pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RenderCollections {
    /// One arrow line per segment, in analysis order.
    pub lines: Vec<LineFeature>,
    /// One label per segment, by ascending `negElevationDelta` once
    /// [`finish`](Self::finish) has run.
    pub labels: Vec<LabelFeature>,
}

impl RenderCollections {
    /// Add the features for one segment.
    pub fn push(&mut self, segment: &TrailSegment, geometry: SegmentGeometry) {
        let properties = SegmentProperties::from_segment(segment);
        self.labels.push(LabelFeature {
            geometry: geometry.label_point,
            properties: properties.clone(),
        });
        self.lines.push(LineFeature {
            geometry: geometry.arrow_line,
            properties,
        });
    }

    /// Sort labels so the biggest climbs come first. The sort is stable,
    /// so equal climbs keep analysis order.
    #[must_use]
    pub fn finish(mut self) -> Self {
        self.labels
            .sort_by(|a, b| a.sort_key().total_cmp(&b.sort_key()));
        self
    }

    /// Number of segments rendered.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.lines.len()
    }

    /// Returns `true` if nothing was rendered.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}
