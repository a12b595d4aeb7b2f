//! Distance and interpolation helpers.
//!
//! Two metrics are in play. Segment lengths used for slope and filtering
//! are geodesic meters ([`geodesic_length`]). Trimming, label placement
//! and arrowheads work in planar input-coordinate space, where distances
//! are scaled by zoom rather than converted to meters.

use geo::{Coord, Distance, Haversine, LineString, Point};

use crate::types::AnalyzerError;

/// Great-circle length of a line string in meters.
#[must_use]
pub fn geodesic_length(line: &LineString<f64>) -> f64 {
    line.lines()
        .map(|segment| Haversine.distance(Point::from(segment.start), Point::from(segment.end)))
        .sum()
}

/// Straight-line distance in coordinate units.
#[must_use]
pub fn planar_distance(a: Coord<f64>, b: Coord<f64>) -> f64 {
    (b.x - a.x).hypot(b.y - a.y)
}

/// Sum of planar segment distances.
#[must_use]
pub fn planar_length(coords: &[Coord<f64>]) -> f64 {
    coords
        .windows(2)
        .map(|pair| planar_distance(pair[0], pair[1]))
        .sum()
}

/// Linear interpolation from `a` toward `b` by fraction `t`.
#[must_use]
pub fn lerp(a: Coord<f64>, b: Coord<f64>, t: f64) -> Coord<f64> {
    Coord {
        x: (b.x - a.x).mul_add(t, a.x),
        y: (b.y - a.y).mul_add(t, a.y),
    }
}

/// The point `distance` units along `coords` from its first point.
///
/// Negative distances clamp to the start. The point must fall strictly
/// before the end of the line.
///
/// # Errors
///
/// Returns [`AnalyzerError::DegenerateInterpolation`] if `distance` is at
/// or beyond the total length, which includes every zero-length line.
pub fn interpolate(coords: &[Coord<f64>], distance: f64) -> Result<Coord<f64>, AnalyzerError> {
    let target = distance.max(0.0);
    let mut walked = 0.0;
    for pair in coords.windows(2) {
        let step = planar_distance(pair[0], pair[1]);
        let next = walked + step;
        if next > target {
            return Ok(lerp(pair[0], pair[1], (target - walked) / step));
        }
        walked = next;
    }
    Err(AnalyzerError::DegenerateInterpolation {
        distance,
        total: walked,
    })
}

/// The point at `fraction` (0..1) of the planar length of `coords`.
///
/// # Errors
///
/// See [`interpolate`].
pub fn interpolate_fraction(
    coords: &[Coord<f64>],
    fraction: f64,
) -> Result<Coord<f64>, AnalyzerError> {
    interpolate(coords, planar_length(coords) * fraction)
}
