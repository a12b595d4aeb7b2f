//! Renderable geometry for analyzed segments: a trimmed line with an
//! arrowhead at its uphill end, and a label anchor at the midpoint.
//!
//! All distances here are planar, in input coordinate units. Callers scale
//! them by `2^-zoom` so trims and arrowheads keep a constant screen size.

use std::f64::consts::FRAC_PI_4;

use geo::{Coord, LineString, MultiLineString, Point};

use crate::analyze::TrailSegment;
use crate::measure::{interpolate, interpolate_fraction, lerp, planar_distance, planar_length};
use crate::types::{AnalyzerConfig, AnalyzerError};

/// Geometry derived from one [`TrailSegment`].
#[derive(Debug, Clone, PartialEq)]
pub struct SegmentGeometry {
    /// `[trimmed line, [wing, tip, wing]]`.
    pub arrow_line: MultiLineString<f64>,
    /// Label anchor at half the untrimmed length.
    pub label_point: Point<f64>,
}

/// Remove `total / 2` from each end of `coords`.
///
/// Returns an empty vector when the trims meet or cross, i.e. the line is
/// not longer than `total`.
#[must_use]
pub fn trim(coords: &[Coord<f64>], total: f64) -> Vec<Coord<f64>> {
    let length = planar_length(coords);
    let from = total / 2.0;
    let to = length - total / 2.0;
    if to <= from {
        return Vec::new();
    }

    let mut out = Vec::with_capacity(coords.len());
    let mut walked = 0.0;
    for pair in coords.windows(2) {
        let (a, b) = (pair[0], pair[1]);
        let step = planar_distance(a, b);
        let next = walked + step;
        if step > 0.0 {
            if out.is_empty() && next > from {
                out.push(lerp(a, b, (from - walked) / step));
            }
            if !out.is_empty() {
                if next >= to {
                    out.push(lerp(a, b, (to - walked) / step));
                    break;
                }
                out.push(b);
            }
        }
        walked = next;
    }
    out
}

/// Label anchor halfway along `coords`.
///
/// # Errors
///
/// Returns [`AnalyzerError::DegenerateInterpolation`] for a zero-length
/// line.
pub fn midpoint(coords: &[Coord<f64>]) -> Result<Coord<f64>, AnalyzerError> {
    interpolate_fraction(coords, 0.5)
}

/// Arrowhead at the last point of `coords`: `[wing, tip, wing]`.
///
/// The tail point sits `size` back along the line from the tip; the wings
/// are `size` from the tip, 45 degrees either side of the tip-to-tail
/// direction. A non-positive `size` collapses all three points onto the
/// tip.
///
/// # Errors
///
/// Returns [`AnalyzerError::DegenerateInterpolation`] if `coords` has no
/// length to walk back along.
pub fn arrowhead(coords: &[Coord<f64>], size: f64) -> Result<[Coord<f64>; 3], AnalyzerError> {
    let Some(&tip) = coords.last() else {
        return Err(AnalyzerError::DegenerateInterpolation {
            distance: size,
            total: 0.0,
        });
    };
    if size <= 0.0 {
        return Ok([tip; 3]);
    }
    let total = planar_length(coords);
    let target = total - size;
    let tail = if target < total {
        interpolate(coords, target)?
    } else {
        // `size` is below the resolution of `total`; only the direction of
        // the last step matters.
        coords
            .iter()
            .rev()
            .copied()
            .find(|&c| c != tip)
            .ok_or(AnalyzerError::DegenerateInterpolation {
                distance: size,
                total,
            })?
    };

    // Bearing measured from +y toward +x, like a compass.
    let angle = (tail.x - tip.x).atan2(tail.y - tip.y);
    let wing = |offset: f64| Coord {
        x: (angle + offset).sin().mul_add(size, tip.x),
        y: (angle + offset).cos().mul_add(size, tip.y),
    };
    Ok([wing(-FRAC_PI_4), tip, wing(FRAC_PI_4)])
}

/// Build the arrow line and label point for a segment.
///
/// Returns `Ok(None)` when trimming leaves fewer than two points.
///
/// # Errors
///
/// Returns [`AnalyzerError::DegenerateInterpolation`] if the midpoint or
/// arrow tail cannot be placed.
pub fn synthesize(
    segment: &TrailSegment,
    config: &AnalyzerConfig,
) -> Result<Option<SegmentGeometry>, AnalyzerError> {
    let coords = &segment.path.0;
    let label = midpoint(coords)?;

    let trimmed = trim(coords, config.trim_distance());
    if trimmed.len() < 2 {
        return Ok(None);
    }
    let head = arrowhead(&trimmed, config.arrow_size())?;

    Ok(Some(SegmentGeometry {
        arrow_line: MultiLineString::new(vec![
            LineString::new(trimmed),
            LineString::new(head.to_vec()),
        ]),
        label_point: Point::from(label),
    }))
}
