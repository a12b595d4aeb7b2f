//! Connectivity graph built from raw line segments.
//!
//! Two adjacency structures are maintained side by side:
//!
//! - **canonical** adjacency records each undirected edge exactly once,
//!   from the lower to the upper [`NodeKey`]. It is only used to enumerate
//!   traversal seeds without duplicates.
//! - **full** adjacency (a [`petgraph`] undirected graph map) records every
//!   connection in both directions and answers degree and neighbor queries.
//!
//! Only membership is stored, never multiplicity: a connection digitized
//! by several overlapping features is one edge.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use geo::{Coord, LineString};
use petgraph::graphmap::UnGraphMap;

use crate::key::NodeKey;
use crate::terrain::ElevationSource;
use crate::types::TrailGeometry;

/// Counters describing what went into a [`ConnectivityGraph`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BuildStats {
    /// Consecutive coordinate pairs examined.
    pub segments_seen: usize,
    /// Pairs whose two coordinates are identical.
    pub zero_length_skipped: usize,
    /// Pairs with a NaN or infinite component.
    pub non_finite_skipped: usize,
}

/// Trail network adjacency plus the per-node elevation cache.
#[derive(Debug, Clone, Default)]
pub struct ConnectivityGraph {
    canonical: BTreeMap<NodeKey, BTreeSet<NodeKey>>,
    full: UnGraphMap<NodeKey, ()>,
    elevations: HashMap<NodeKey, f64>,
    stats: BuildStats,
}

impl ConnectivityGraph {
    /// Create an empty graph.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the graph for a set of rendered path geometries, resolving
    /// node elevations from `elevation` as nodes are first seen.
    pub fn build<E>(geometries: &[TrailGeometry], elevation: &E) -> Self
    where
        E: ElevationSource + ?Sized,
    {
        let mut graph = Self::new();
        for geometry in geometries {
            for line in geometry.line_strings() {
                graph.add_line_string(line, elevation);
            }
        }
        graph
    }

    /// Add every consecutive coordinate pair of `line` as a segment.
    pub fn add_line_string<E>(&mut self, line: &LineString<f64>, elevation: &E)
    where
        E: ElevationSource + ?Sized,
    {
        for pair in line.0.windows(2) {
            self.add_segment(pair[0], pair[1], elevation);
        }
    }

    /// Connect two coordinates.
    ///
    /// Identical coordinates and non-finite coordinates are counted and
    /// skipped; a self-connection would make a trail vertex look like a
    /// junction.
    pub fn add_segment<E>(&mut self, a: Coord<f64>, b: Coord<f64>, elevation: &E)
    where
        E: ElevationSource + ?Sized,
    {
        self.stats.segments_seen += 1;
        let (Some(key_a), Some(key_b)) = (NodeKey::new(a), NodeKey::new(b)) else {
            self.stats.non_finite_skipped += 1;
            return;
        };
        if key_a == key_b {
            self.stats.zero_length_skipped += 1;
            return;
        }

        self.resolve_elevation(key_a, elevation);
        self.resolve_elevation(key_b, elevation);

        let (lower, upper) = if key_a < key_b {
            (key_a, key_b)
        } else {
            (key_b, key_a)
        };
        self.canonical.entry(lower).or_default().insert(upper);
        self.full.add_edge(key_a, key_b, ());
    }

    fn resolve_elevation<E>(&mut self, key: NodeKey, elevation: &E)
    where
        E: ElevationSource + ?Sized,
    {
        self.elevations
            .entry(key)
            .or_insert_with(|| elevation.elevation(key.coord()));
    }

    /// Number of distinct neighbors of `key`; zero for unknown nodes.
    #[must_use]
    pub fn degree(&self, key: NodeKey) -> usize {
        self.full.neighbors(key).count()
    }

    /// Distinct neighbors of `key` in full adjacency.
    pub fn neighbors(&self, key: NodeKey) -> impl Iterator<Item = NodeKey> + '_ {
        self.full.neighbors(key)
    }

    /// Whether `a` and `b` are directly connected.
    #[must_use]
    pub fn contains_edge(&self, a: NodeKey, b: NodeKey) -> bool {
        self.full.contains_edge(a, b)
    }

    /// Every undirected edge once, as `(lower, upper)`, in key order.
    pub fn canonical_edges(&self) -> impl Iterator<Item = (NodeKey, NodeKey)> + '_ {
        self.canonical
            .iter()
            .flat_map(|(&lower, uppers)| uppers.iter().map(move |&upper| (lower, upper)))
    }

    /// All nodes, in insertion order.
    pub fn nodes(&self) -> impl Iterator<Item = NodeKey> + '_ {
        self.full.nodes()
    }

    /// Number of distinct nodes.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.full.node_count()
    }

    /// Number of distinct undirected edges.
    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.full.edge_count()
    }

    /// Returns `true` if no segment has been added.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.full.node_count() == 0
    }

    /// Cached elevation of a node in meters.
    #[must_use]
    pub fn elevation(&self, key: NodeKey) -> Option<f64> {
        self.elevations.get(&key).copied()
    }

    /// Build counters.
    #[must_use]
    pub const fn stats(&self) -> BuildStats {
        self.stats
    }
}
