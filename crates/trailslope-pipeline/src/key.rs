//! Canonical node identity for trail network vertices.
//!
//! Two coordinates are the same node only when both components compare
//! exactly equal. There is no distance tolerance: independently digitized
//! trails whose vertices differ in the last bit stay disconnected.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use geo::Coord;

/// Hashable, totally ordered identity of a coordinate.
///
/// Stores the IEEE-754 bit patterns of longitude and latitude, so equality
/// and hashing are exact. Construction rejects non-finite components and
/// folds `-0.0` into `0.0` so that values comparing equal share one key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeKey {
    lng: u64,
    lat: u64,
}

impl NodeKey {
    /// Build the key for a coordinate.
    ///
    /// Returns `None` if either component is NaN or infinite.
    #[must_use]
    pub fn new(coord: Coord<f64>) -> Option<Self> {
        if !(coord.x.is_finite() && coord.y.is_finite()) {
            return None;
        }
        Some(Self {
            lng: normalize_zero(coord.x).to_bits(),
            lat: normalize_zero(coord.y).to_bits(),
        })
    }

    /// Longitude component.
    #[must_use]
    pub const fn lng(self) -> f64 {
        f64::from_bits(self.lng)
    }

    /// Latitude component.
    #[must_use]
    pub const fn lat(self) -> f64 {
        f64::from_bits(self.lat)
    }

    /// The coordinate this key was built from.
    #[must_use]
    pub const fn coord(self) -> Coord<f64> {
        Coord {
            x: self.lng(),
            y: self.lat(),
        }
    }
}

const fn normalize_zero(value: f64) -> f64 {
    if value == 0.0 { 0.0 } else { value }
}

impl Ord for NodeKey {
    /// Longitude first, then latitude. Keys are always finite, so this
    /// agrees with numeric ordering.
    fn cmp(&self, other: &Self) -> Ordering {
        self.lng()
            .total_cmp(&other.lng())
            .then_with(|| self.lat().total_cmp(&other.lat()))
    }
}

impl PartialOrd for NodeKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl From<NodeKey> for Coord<f64> {
    fn from(key: NodeKey) -> Self {
        key.coord()
    }
}

impl fmt::Display for NodeKey {
    /// `lng,lat` using the shortest representation that parses back to
    /// the identical `f64`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.lng(), self.lat())
    }
}

/// Error returned when parsing a [`NodeKey`] from text fails.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseNodeKeyError {
    /// The text has no `,` separating the two components.
    #[error("node key must be `lng,lat`, got {0:?}")]
    MissingSeparator(String),

    /// A component is not a valid floating-point number.
    #[error("invalid node key component {0:?}")]
    InvalidComponent(String),

    /// A component parsed to NaN or infinity.
    #[error("node key components must be finite, got {0:?}")]
    NonFinite(String),
}

impl FromStr for NodeKey {
    type Err = ParseNodeKeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (lng, lat) = s
            .split_once(',')
            .ok_or_else(|| ParseNodeKeyError::MissingSeparator(s.to_owned()))?;
        let parse = |part: &str| {
            part.trim()
                .parse::<f64>()
                .map_err(|_| ParseNodeKeyError::InvalidComponent(part.to_owned()))
        };
        let coord = Coord {
            x: parse(lng)?,
            y: parse(lat)?,
        };
        Self::new(coord).ok_or_else(|| ParseNodeKeyError::NonFinite(s.to_owned()))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    fn key(x: f64, y: f64) -> NodeKey {
        NodeKey::new(Coord { x, y }).unwrap()
    }

    #[test]
    fn round_trips_through_text() {
        let samples = [
            (-78.919_268_846_511_84, 35.985_897_934_057_29),
            (0.1 + 0.2, -0.3),
            (179.999_999_999_999_97, -89.999_999_999_999_99),
            (1e-300, 5e-324),
            (0.0, 0.0),
        ];
        for (x, y) in samples {
            let original = key(x, y);
            let parsed: NodeKey = original.to_string().parse().unwrap();
            assert_eq!(parsed, original);
            assert_eq!(parsed.coord(), Coord { x, y });
        }
    }

    #[test]
    fn identity_is_exact() {
        let a = key(10.0, 20.0);
        let b = key(10.0 + 1e-12, 20.0);
        assert_ne!(a, b);
        assert_eq!(a, key(10.0, 20.0));
    }

    #[test]
    fn negative_zero_folds_into_zero() {
        let a = key(-0.0, 1.0);
        let b = key(0.0, 1.0);
        assert_eq!(a, b);
        let set: HashSet<_> = [a, b].into_iter().collect();
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn rejects_non_finite() {
        assert!(NodeKey::new(Coord { x: f64::NAN, y: 0.0 }).is_none());
        assert!(
            NodeKey::new(Coord {
                x: 0.0,
                y: f64::INFINITY
            })
            .is_none()
        );
    }

    #[test]
    fn orders_by_longitude_then_latitude() {
        let mut keys = vec![key(2.0, 0.0), key(1.0, 5.0), key(1.0, -5.0)];
        keys.sort();
        assert_eq!(keys, vec![key(1.0, -5.0), key(1.0, 5.0), key(2.0, 0.0)]);
    }

    #[test]
    fn parse_errors() {
        assert!(matches!(
            "1.0".parse::<NodeKey>(),
            Err(ParseNodeKeyError::MissingSeparator(_))
        ));
        assert!(matches!(
            "a,1".parse::<NodeKey>(),
            Err(ParseNodeKeyError::InvalidComponent(_))
        ));
        assert!(matches!(
            "NaN,1".parse::<NodeKey>(),
            Err(ParseNodeKeyError::NonFinite(_))
        ));
    }
}
