//! Path coalescing: collapse every junction-to-junction run of
//! pass-through nodes into one logical trail segment.
//!
//! Traversal is seeded from junctions only. Each seed is a
//! `(junction, first step)` pair taken from canonical adjacency; the walk
//! follows the single onward neighbor of each pass-through node until it
//! reaches another junction. Both directions of a finished path are
//! marked as walked, so the same physical trail is never walked again
//! from its far end.
//!
//! A closed loop with no junction on it is unreachable from any seed.
//! [`LoopPolicy::Emit`] adds a sweep that picks those loops up afterwards.

use std::collections::HashSet;

use geo::{Coord, LineString};

use crate::classify::is_junction;
use crate::graph::ConnectivityGraph;
use crate::key::NodeKey;
use crate::types::{AnalyzerError, ChainPolicy, LoopPolicy};

/// An ordered run of nodes from one junction to another (inclusive).
///
/// Every interior node has degree 2. For loops the first and last node
/// are the same.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoalescedPath {
    nodes: Vec<NodeKey>,
}

impl CoalescedPath {
    /// The nodes of the path in walk order.
    #[must_use]
    pub fn nodes(&self) -> &[NodeKey] {
        &self.nodes
    }

    /// Number of nodes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Always `false`; paths hold at least two nodes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// First node.
    #[must_use]
    pub fn start(&self) -> Option<NodeKey> {
        self.nodes.first().copied()
    }

    /// Last node.
    #[must_use]
    pub fn end(&self) -> Option<NodeKey> {
        self.nodes.last().copied()
    }

    /// Whether the path returns to its starting node.
    #[must_use]
    pub fn is_loop(&self) -> bool {
        self.nodes.len() > 2 && self.start() == self.end()
    }

    /// The path as coordinates.
    #[must_use]
    pub fn coords(&self) -> Vec<Coord<f64>> {
        self.nodes.iter().map(|key| key.coord()).collect()
    }

    /// The path as a line string.
    #[must_use]
    pub fn to_line_string(&self) -> LineString<f64> {
        LineString::new(self.coords())
    }
}

/// Everything the coalescer produced for one graph.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Coalesced {
    /// One entry per physical junction-to-junction trail, plus loops when
    /// [`LoopPolicy::Emit`] is set.
    pub paths: Vec<CoalescedPath>,
    /// How many of `paths` are junction-free loops.
    pub loops: usize,
    /// Chains dropped under [`ChainPolicy::Skip`].
    pub skipped_chains: usize,
}

/// Walks a [`ConnectivityGraph`] and records each path once.
#[derive(Debug)]
pub struct PathCoalescer<'g> {
    graph: &'g ConnectivityGraph,
    chain_policy: ChainPolicy,
    loop_policy: LoopPolicy,
    walked: HashSet<(NodeKey, NodeKey)>,
    output: Coalesced,
}

impl<'g> PathCoalescer<'g> {
    /// Prepare to coalesce `graph`.
    #[must_use]
    pub fn new(graph: &'g ConnectivityGraph, chain_policy: ChainPolicy, loop_policy: LoopPolicy) -> Self {
        Self {
            graph,
            chain_policy,
            loop_policy,
            walked: HashSet::new(),
            output: Coalesced::default(),
        }
    }

    /// Walk every junction-seeded chain (and loops, if enabled).
    ///
    /// # Errors
    ///
    /// Returns [`AnalyzerError::MalformedChain`] under
    /// [`ChainPolicy::Abort`] when a pass-through node has zero or several
    /// ways forward.
    pub fn coalesce(mut self) -> Result<Coalesced, AnalyzerError> {
        let graph = self.graph;
        for (lower, upper) in graph.canonical_edges() {
            if is_junction(graph, lower) {
                self.seed(lower, upper)?;
            }
            if is_junction(graph, upper) {
                self.seed(upper, lower)?;
            }
        }

        if self.loop_policy == LoopPolicy::Emit {
            self.sweep_loops()?;
        }

        tracing::debug!(
            paths = self.output.paths.len(),
            loops = self.output.loops,
            skipped = self.output.skipped_chains,
            "coalesced trail paths"
        );
        Ok(self.output)
    }

    fn seed(&mut self, start: NodeKey, first: NodeKey) -> Result<(), AnalyzerError> {
        if self.walked.contains(&(start, first)) {
            return Ok(());
        }
        let graph = self.graph;
        if let Some(nodes) = self.follow(start, first, |node| is_junction(graph, node))? {
            self.record(nodes);
        }
        Ok(())
    }

    /// Walk a chain and apply the chain policy to a failed walk. `None`
    /// means the chain was skipped.
    fn follow(
        &mut self,
        start: NodeKey,
        first: NodeKey,
        stop: impl Fn(NodeKey) -> bool,
    ) -> Result<Option<Vec<NodeKey>>, AnalyzerError> {
        match walk_chain(self.graph, start, first, stop) {
            Ok(nodes) => Ok(Some(nodes)),
            Err(err) => self.reject(err).map(|()| None),
        }
    }

    /// Find loops that no junction-seeded walk touched. A node not yet on
    /// any path that has degree 2 can only sit on such a loop.
    fn sweep_loops(&mut self) -> Result<(), AnalyzerError> {
        let graph = self.graph;
        let mut covered: HashSet<NodeKey> = self
            .output
            .paths
            .iter()
            .flat_map(|p| p.nodes().iter().copied())
            .collect();

        let mut candidates: Vec<NodeKey> = graph
            .nodes()
            .filter(|&key| graph.degree(key) == 2 && !covered.contains(&key))
            .collect();
        candidates.sort_unstable();

        for start in candidates {
            if covered.contains(&start) {
                continue;
            }
            let Some(first) = graph.neighbors(start).min() else {
                continue;
            };
            match self.follow(start, first, |node| node == start)? {
                Some(nodes) => {
                    covered.extend(nodes.iter().copied());
                    self.output.loops += 1;
                    self.record(nodes);
                }
                None => {
                    covered.insert(start);
                }
            }
        }
        Ok(())
    }

    fn record(&mut self, nodes: Vec<NodeKey>) {
        let n = nodes.len();
        if n < 2 {
            return;
        }
        self.walked.insert((nodes[0], nodes[1]));
        self.walked.insert((nodes[n - 1], nodes[n - 2]));
        self.output.paths.push(CoalescedPath { nodes });
    }

    fn reject(&mut self, err: AnalyzerError) -> Result<(), AnalyzerError> {
        match self.chain_policy {
            ChainPolicy::Abort => Err(err),
            ChainPolicy::Skip => {
                tracing::warn!(%err, "skipping malformed chain");
                self.output.skipped_chains += 1;
                Ok(())
            }
        }
    }
}

/// Walk from `start` through `first` until `stop` accepts the current
/// node. The walk is bounded by the node count so an inconsistent graph
/// cannot spin forever.
fn walk_chain(
    graph: &ConnectivityGraph,
    start: NodeKey,
    first: NodeKey,
    stop: impl Fn(NodeKey) -> bool,
) -> Result<Vec<NodeKey>, AnalyzerError> {
    let mut nodes = vec![start, first];
    let mut previous = start;
    let mut current = first;
    let limit = graph.node_count() + 1;

    while !stop(current) {
        if nodes.len() > limit {
            return Err(AnalyzerError::MalformedChain {
                node: current,
                candidates: graph.degree(current).saturating_sub(1),
            });
        }
        let next = continuation(graph, previous, current)?;
        previous = current;
        current = next;
        nodes.push(current);
    }
    Ok(nodes)
}

/// The single neighbor of `current` other than `previous`.
///
/// # Errors
///
/// Returns [`AnalyzerError::MalformedChain`] when there is not exactly
/// one such neighbor.
pub fn continuation(
    graph: &ConnectivityGraph,
    previous: NodeKey,
    current: NodeKey,
) -> Result<NodeKey, AnalyzerError> {
    let mut onward = graph.neighbors(current).filter(|&n| n != previous);
    match (onward.next(), onward.next()) {
        (Some(next), None) => Ok(next),
        (None, _) => Err(AnalyzerError::MalformedChain {
            node: current,
            candidates: 0,
        }),
        (Some(_), Some(_)) => Err(AnalyzerError::MalformedChain {
            node: current,
            candidates: 2 + onward.count(),
        }),
    }
}

/// Coalesce `graph` with the given policies.
///
/// # Errors
///
/// See [`PathCoalescer::coalesce`].
pub fn coalesce(
    graph: &ConnectivityGraph,
    chain_policy: ChainPolicy,
    loop_policy: LoopPolicy,
) -> Result<Coalesced, AnalyzerError> {
    PathCoalescer::new(graph, chain_policy, loop_policy).coalesce()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::HashMap;

    use geo::line_string;

    use super::*;
    use crate::types::TrailGeometry;

    fn k(x: f64, y: f64) -> NodeKey {
        NodeKey::new(Coord { x, y }).unwrap()
    }

    fn graph_of(lines: Vec<LineString<f64>>) -> ConnectivityGraph {
        let geometries: Vec<TrailGeometry> = lines.into_iter().map(TrailGeometry::from).collect();
        ConnectivityGraph::build(&geometries, &|_: Coord<f64>| 0.0)
    }

    fn run(graph: &ConnectivityGraph) -> Coalesced {
        coalesce(graph, ChainPolicy::Abort, LoopPolicy::Ignore).unwrap()
    }

    /// Count how often each undirected edge appears across all paths.
    fn edge_usage(paths: &[CoalescedPath]) -> HashMap<(NodeKey, NodeKey), usize> {
        let mut usage = HashMap::new();
        for path in paths {
            for pair in path.nodes().windows(2) {
                let edge = if pair[0] < pair[1] {
                    (pair[0], pair[1])
                } else {
                    (pair[1], pair[0])
                };
                *usage.entry(edge).or_default() += 1;
            }
        }
        usage
    }

    #[test]
    fn straight_chain_coalesces_into_one_path() {
        let graph = graph_of(vec![line_string![
            (x: 0.0, y: 0.0),
            (x: 1.0, y: 0.0),
            (x: 2.0, y: 0.0),
        ]]);
        let out = run(&graph);
        assert_eq!(out.paths.len(), 1);
        let path = &out.paths[0];
        assert_eq!(path.len(), 3);
        let ends = [path.start().unwrap(), path.end().unwrap()];
        assert!(ends.contains(&k(0.0, 0.0)));
        assert!(ends.contains(&k(2.0, 0.0)));
        assert!(!ends.contains(&k(1.0, 0.0)));
    }

    #[test]
    fn three_way_junction_yields_three_paths() {
        let graph = graph_of(vec![
            line_string![(x: 0.0, y: 0.0), (x: 1.0, y: 0.0)],
            line_string![(x: 0.0, y: 0.0), (x: 0.0, y: 1.0)],
            line_string![(x: 0.0, y: 0.0), (x: -1.0, y: -1.0)],
        ]);
        let out = run(&graph);
        assert_eq!(out.paths.len(), 3);
        let hub = k(0.0, 0.0);
        for path in &out.paths {
            assert!(path.start() == Some(hub) || path.end() == Some(hub));
        }
    }

    #[test]
    fn chain_whose_ends_sort_inward_is_still_found() {
        // P(1) - x1(0) - x2(3) - Q(4): both junctions only have canonical
        // edges pointing at them, never away from them.
        let graph = graph_of(vec![line_string![
            (x: 1.0, y: 0.0),
            (x: 0.0, y: 0.0),
            (x: 3.0, y: 0.0),
            (x: 4.0, y: 0.0),
        ]]);
        let out = run(&graph);
        assert_eq!(out.paths.len(), 1);
        assert_eq!(out.paths[0].len(), 4);
    }

    #[test]
    fn every_edge_is_coalesced_exactly_once() {
        // Two forks joined by a bent trail, with spurs on each.
        let graph = graph_of(vec![
            line_string![
                (x: 0.0, y: 0.0),
                (x: 1.0, y: 0.5),
                (x: 2.0, y: 0.2),
                (x: 3.0, y: 0.0),
            ],
            line_string![(x: 0.0, y: 0.0), (x: -1.0, y: 1.0), (x: -2.0, y: 1.5)],
            line_string![(x: 0.0, y: 0.0), (x: -1.0, y: -1.0)],
            line_string![(x: 3.0, y: 0.0), (x: 4.0, y: 1.0)],
            line_string![(x: 3.0, y: 0.0), (x: 4.0, y: -1.0), (x: 5.0, y: -1.0)],
        ]);
        let out = run(&graph);
        assert_eq!(out.paths.len(), 5);

        let usage = edge_usage(&out.paths);
        assert_eq!(usage.len(), graph.edge_count());
        assert!(usage.values().all(|&n| n == 1));

        for path in &out.paths {
            for interior in &path.nodes()[1..path.len() - 1] {
                assert_eq!(graph.degree(*interior), 2);
            }
        }
    }

    #[test]
    fn overlapping_features_produce_one_path() {
        let graph = graph_of(vec![
            line_string![(x: 0.0, y: 0.0), (x: 1.0, y: 1.0)],
            line_string![(x: 0.0, y: 0.0), (x: 1.0, y: 1.0)],
        ]);
        assert_eq!(run(&graph).paths.len(), 1);
    }

    #[test]
    fn lollipop_loop_is_walked_once() {
        // A spur from (-1,0) into a fork at the origin, whose other two
        // edges form a loop back to it.
        let graph = graph_of(vec![
            line_string![(x: -1.0, y: 0.0), (x: 0.0, y: 0.0)],
            line_string![
                (x: 0.0, y: 0.0),
                (x: 1.0, y: 1.0),
                (x: 2.0, y: 0.0),
                (x: 1.0, y: -1.0),
                (x: 0.0, y: 0.0),
            ],
        ]);
        let out = run(&graph);
        assert_eq!(out.paths.len(), 2);
        let loops: Vec<_> = out.paths.iter().filter(|p| p.is_loop()).collect();
        assert_eq!(loops.len(), 1);
        assert_eq!(loops[0].start(), Some(k(0.0, 0.0)));
        assert_eq!(loops[0].len(), 5);
        assert_eq!(out.loops, 0);
    }

    fn square_loop() -> ConnectivityGraph {
        graph_of(vec![line_string![
            (x: 0.0, y: 0.0),
            (x: 1.0, y: 0.0),
            (x: 1.0, y: 1.0),
            (x: 0.0, y: 1.0),
            (x: 0.0, y: 0.0),
        ]])
    }

    #[test]
    fn junction_free_loop_is_ignored_by_default() {
        let out = run(&square_loop());
        assert!(out.paths.is_empty());
    }

    #[test]
    fn junction_free_loop_is_emitted_on_request() {
        let graph = square_loop();
        let out = coalesce(&graph, ChainPolicy::Abort, LoopPolicy::Emit).unwrap();
        assert_eq!(out.paths.len(), 1);
        assert_eq!(out.loops, 1);
        let path = &out.paths[0];
        assert!(path.is_loop());
        assert_eq!(path.start(), Some(k(0.0, 0.0)));
        assert_eq!(path.len(), 5);
        assert_eq!(edge_usage(&out.paths).len(), 4);
    }

    #[test]
    fn loop_sweep_leaves_junction_paths_alone() {
        let mut lines = vec![line_string![(x: 10.0, y: 0.0), (x: 11.0, y: 0.0)]];
        lines.push(line_string![
            (x: 0.0, y: 0.0),
            (x: 1.0, y: 0.0),
            (x: 1.0, y: 1.0),
            (x: 0.0, y: 0.0),
        ]);
        let graph = graph_of(lines);
        let out = coalesce(&graph, ChainPolicy::Abort, LoopPolicy::Emit).unwrap();
        assert_eq!(out.paths.len(), 2);
        assert_eq!(out.loops, 1);
    }

    #[test]
    fn continuation_requires_exactly_one_way_forward() {
        let graph = graph_of(vec![line_string![
            (x: 0.0, y: 0.0),
            (x: 1.0, y: 0.0),
            (x: 2.0, y: 0.0),
        ]]);
        let mid = k(1.0, 0.0);
        assert_eq!(continuation(&graph, k(0.0, 0.0), mid).unwrap(), k(2.0, 0.0));

        // Arriving from a node that is not a neighbor leaves two choices.
        let err = continuation(&graph, k(9.0, 9.0), mid).unwrap_err();
        assert_eq!(
            err,
            AnalyzerError::MalformedChain {
                node: mid,
                candidates: 2,
            }
        );

        // A dead end has nowhere to go once its only neighbor is excluded.
        let err = continuation(&graph, mid, k(2.0, 0.0)).unwrap_err();
        assert!(matches!(
            err,
            AnalyzerError::MalformedChain { candidates: 0, .. }
        ));
    }

    fn tee() -> ConnectivityGraph {
        graph_of(vec![
            line_string![(x: 0.0, y: 0.0), (x: 1.0, y: 0.0)],
            line_string![(x: 0.0, y: 0.0), (x: 0.0, y: 1.0)],
            line_string![(x: 0.0, y: 0.0), (x: -1.0, y: -1.0)],
        ])
    }

    #[test]
    fn abort_policy_fails_on_a_broken_walk() {
        let graph = tee();
        let mut coalescer = PathCoalescer::new(&graph, ChainPolicy::Abort, LoopPolicy::Ignore);
        // Never stopping runs the walk into the fork, which has two ways on.
        let err = coalescer
            .follow(k(1.0, 0.0), k(0.0, 0.0), |_| false)
            .unwrap_err();
        assert_eq!(
            err,
            AnalyzerError::MalformedChain {
                node: k(0.0, 0.0),
                candidates: 2,
            }
        );
    }

    #[test]
    fn skip_policy_counts_the_chain_and_keeps_going() {
        let graph = tee();
        let mut coalescer = PathCoalescer::new(&graph, ChainPolicy::Skip, LoopPolicy::Ignore);
        let skipped = coalescer
            .follow(k(1.0, 0.0), k(0.0, 0.0), |_| false)
            .unwrap();
        assert!(skipped.is_none());

        let out = coalescer.coalesce().unwrap();
        assert_eq!(out.skipped_chains, 1);
        assert_eq!(out.paths.len(), 3);
    }

    #[test]
    fn empty_graph_has_no_paths() {
        let out = run(&ConnectivityGraph::new());
        assert_eq!(out, Coalesced::default());
    }
}
