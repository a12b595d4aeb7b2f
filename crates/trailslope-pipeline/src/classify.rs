//! Junction classification by node degree.

use serde::{Deserialize, Serialize};

use crate::graph::ConnectivityGraph;
use crate::key::NodeKey;

/// Role of a node in the trail network.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    /// Degree 1: a trail ends here.
    DeadEnd,
    /// Degree 2: an interior vertex of a single trail.
    PassThrough,
    /// Degree 3 or more: trails meet or split.
    Fork,
}

impl NodeKind {
    /// Classify a degree. Degree 0 is not a node of any trail.
    #[must_use]
    pub const fn from_degree(degree: usize) -> Option<Self> {
        match degree {
            0 => None,
            1 => Some(Self::DeadEnd),
            2 => Some(Self::PassThrough),
            _ => Some(Self::Fork),
        }
    }

    /// Junctions are the endpoints of coalesced paths.
    #[must_use]
    pub const fn is_junction(self) -> bool {
        matches!(self, Self::DeadEnd | Self::Fork)
    }
}

/// Whether `key` is a junction: degree 1 or degree greater than 2.
#[must_use]
pub fn is_junction(graph: &ConnectivityGraph, key: NodeKey) -> bool {
    classify(graph, key).is_some_and(NodeKind::is_junction)
}

/// The [`NodeKind`] of `key`, or `None` if it is not in the graph.
#[must_use]
pub fn classify(graph: &ConnectivityGraph, key: NodeKey) -> Option<NodeKind> {
    NodeKind::from_degree(graph.degree(key))
}

/// Node counts per [`NodeKind`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JunctionCensus {
    /// Degree-1 nodes.
    pub dead_ends: usize,
    /// Degree-2 nodes.
    pub pass_through: usize,
    /// Degree-3+ nodes.
    pub forks: usize,
}

impl JunctionCensus {
    /// Count every node of `graph`.
    #[must_use]
    pub fn of(graph: &ConnectivityGraph) -> Self {
        let mut census = Self::default();
        for key in graph.nodes() {
            match classify(graph, key) {
                Some(NodeKind::DeadEnd) => census.dead_ends += 1,
                Some(NodeKind::PassThrough) => census.pass_through += 1,
                Some(NodeKind::Fork) => census.forks += 1,
                None => {}
            }
        }
        census
    }

    /// Dead ends plus forks.
    #[must_use]
    pub const fn junctions(&self) -> usize {
        self.dead_ends + self.forks
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use geo::{Coord, line_string};

    use super::*;
    use crate::types::TrailGeometry;

    fn k(x: f64, y: f64) -> NodeKey {
        NodeKey::new(Coord { x, y }).unwrap()
    }

    #[test]
    fn degree_mapping() {
        assert_eq!(NodeKind::from_degree(0), None);
        assert_eq!(NodeKind::from_degree(1), Some(NodeKind::DeadEnd));
        assert_eq!(NodeKind::from_degree(2), Some(NodeKind::PassThrough));
        assert_eq!(NodeKind::from_degree(3), Some(NodeKind::Fork));
        assert_eq!(NodeKind::from_degree(7), Some(NodeKind::Fork));
        assert!(!NodeKind::PassThrough.is_junction());
        assert!(NodeKind::DeadEnd.is_junction());
        assert!(NodeKind::Fork.is_junction());
    }

    #[test]
    fn classifies_star_network() {
        // D at the origin with three spokes, one of them bent at B.
        let geometries = vec![
            TrailGeometry::from(line_string![(x: 0.0, y: 0.0), (x: 1.0, y: 0.0)]),
            TrailGeometry::from(line_string![(x: 0.0, y: 0.0), (x: 0.0, y: 1.0), (x: 1.0, y: 2.0)]),
            TrailGeometry::from(line_string![(x: 0.0, y: 0.0), (x: -1.0, y: 0.0)]),
        ];
        let graph = ConnectivityGraph::build(&geometries, &|_: Coord<f64>| 0.0);

        assert_eq!(classify(&graph, k(0.0, 0.0)), Some(NodeKind::Fork));
        assert_eq!(classify(&graph, k(0.0, 1.0)), Some(NodeKind::PassThrough));
        assert_eq!(classify(&graph, k(1.0, 2.0)), Some(NodeKind::DeadEnd));
        assert_eq!(classify(&graph, k(9.0, 9.0)), None);
        assert!(is_junction(&graph, k(0.0, 0.0)));
        assert!(!is_junction(&graph, k(0.0, 1.0)));
        assert!(!is_junction(&graph, k(9.0, 9.0)));

        let census = JunctionCensus::of(&graph);
        assert_eq!(
            census,
            JunctionCensus {
                dead_ends: 3,
                pass_through: 1,
                forks: 1,
            }
        );
        assert_eq!(census.junctions(), 4);
    }
}
