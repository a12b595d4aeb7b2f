//! Incremental pipeline: advance stage-by-stage, inspecting each
//! intermediate result before continuing.
//!
//! Unlike [`crate::process`] which runs the whole analysis in one call,
//! [`Pipeline`] lets the caller drive execution one step at a time:
//!
//! ```rust
//! # use geo::{Coord, line_string};
//! # use trailslope_pipeline::{AnalyzerConfig, AnalyzerError, Pipeline, TrailGeometry};
//! # fn run() -> Result<(), AnalyzerError> {
//! let trails = vec![TrailGeometry::from(line_string![
//!     (x: 8.000, y: 47.000),
//!     (x: 8.000, y: 47.002),
//! ])];
//! let elevation = |c: Coord<f64>| (c.y - 47.0) * 10_000.0;
//!
//! let graph = Pipeline::new(&trails, &elevation, AnalyzerConfig::default())
//!     .build_graph()?
//!     .classify();
//! println!("{} junctions", graph.census().junctions());
//!
//! let output = graph.coalesce()?.analyze().synthesize()?.into_output();
//! assert_eq!(output.lines.len(), 1);
//! # Ok(())
//! # }
//! ```
//!
//! Each stage method consumes `self` and returns the next state (or a
//! `Result` for fallible stages). The graph is carried through every
//! stage so it stays available for inspection.

use crate::analyze::{Analysis, analyze_paths};
use crate::classify::JunctionCensus;
use crate::coalesce::{Coalesced, CoalescedPath, PathCoalescer};
use crate::diagnostics::StageMetrics;
use crate::geometry::synthesize;
use crate::graph::ConnectivityGraph;
use crate::sink::RenderCollections;
use crate::terrain::ElevationSource;
use crate::types::{AnalyzerConfig, AnalyzerError, TrailGeometry};

/// Entry point for the staged pipeline.
pub struct Pipeline;

impl Pipeline {
    /// Create a pipeline over `geometries`, reading node elevations from
    /// `elevation`.
    #[allow(clippy::new_ret_no_self)]
    pub const fn new<'a, E>(
        geometries: &'a [TrailGeometry],
        elevation: &'a E,
        config: AnalyzerConfig,
    ) -> Pending<'a, E>
    where
        E: ElevationSource + ?Sized,
    {
        Pending {
            config,
            geometries,
            elevation,
        }
    }
}

// ───────────────────────── Stage 0: Pending ──────────────────────────

/// Nothing computed yet.
#[must_use = "pipeline stages are consumed by advancing; call .build_graph() to continue"]
pub struct Pending<'a, E: ?Sized> {
    config: AnalyzerConfig,
    geometries: &'a [TrailGeometry],
    elevation: &'a E,
}

impl<E> Pending<'_, E>
where
    E: ElevationSource + ?Sized,
{
    /// The input geometries.
    #[must_use]
    pub const fn geometries(&self) -> &[TrailGeometry] {
        self.geometries
    }

    /// Validate the config and build the connectivity graph.
    ///
    /// # Errors
    ///
    /// Returns [`AnalyzerError::InvalidConfig`] if the config is invalid.
    pub fn build_graph(self) -> Result<GraphBuilt, AnalyzerError> {
        self.config.validate()?;
        let graph = ConnectivityGraph::build(self.geometries, self.elevation);
        tracing::debug!(
            nodes = graph.node_count(),
            edges = graph.edge_count(),
            "built connectivity graph"
        );
        Ok(GraphBuilt {
            config: self.config,
            input_geometries: self.geometries.len(),
            graph,
        })
    }
}

// ─────────────────────── Stage 1: GraphBuilt ─────────────────────────

/// Connectivity graph and elevation cache are ready.
#[must_use = "pipeline stages are consumed by advancing; call .classify() to continue"]
pub struct GraphBuilt {
    config: AnalyzerConfig,
    input_geometries: usize,
    graph: ConnectivityGraph,
}

impl GraphBuilt {
    /// The connectivity graph.
    #[must_use]
    pub const fn graph(&self) -> &ConnectivityGraph {
        &self.graph
    }

    /// Count nodes by kind.
    pub fn classify(self) -> Classified {
        let census = JunctionCensus::of(&self.graph);
        Classified {
            config: self.config,
            graph: self.graph,
            census,
        }
    }
}

// ─────────────────────── Stage 2: Classified ─────────────────────────

/// Junctions have been identified.
#[must_use = "pipeline stages are consumed by advancing; call .coalesce() to continue"]
pub struct Classified {
    config: AnalyzerConfig,
    graph: ConnectivityGraph,
    census: JunctionCensus,
}

impl Classified {
    /// The connectivity graph.
    #[must_use]
    pub const fn graph(&self) -> &ConnectivityGraph {
        &self.graph
    }

    /// Node counts by kind.
    #[must_use]
    pub const fn census(&self) -> JunctionCensus {
        self.census
    }

    /// Walk junction-to-junction paths.
    ///
    /// # Errors
    ///
    /// Returns [`AnalyzerError::MalformedChain`] under
    /// [`ChainPolicy::Abort`](crate::ChainPolicy::Abort) when a chain has
    /// no unique continuation.
    pub fn coalesce(self) -> Result<PathsCoalesced, AnalyzerError> {
        let coalesced = PathCoalescer::new(
            &self.graph,
            self.config.chain_policy,
            self.config.loop_policy,
        )
        .coalesce()?;
        Ok(PathsCoalesced {
            config: self.config,
            graph: self.graph,
            census: self.census,
            coalesced,
        })
    }
}

// ───────────────────── Stage 3: PathsCoalesced ───────────────────────

/// Candidate trail segments are known.
#[must_use = "pipeline stages are consumed by advancing; call .analyze() to continue"]
pub struct PathsCoalesced {
    config: AnalyzerConfig,
    graph: ConnectivityGraph,
    census: JunctionCensus,
    coalesced: Coalesced,
}

impl PathsCoalesced {
    /// The connectivity graph.
    #[must_use]
    pub const fn graph(&self) -> &ConnectivityGraph {
        &self.graph
    }

    /// The coalesced paths.
    #[must_use]
    pub const fn coalesced(&self) -> &Coalesced {
        &self.coalesced
    }

    /// Measure, orient and filter every path.
    pub fn analyze(self) -> Analyzed {
        let analysis = analyze_paths(&self.coalesced.paths, &self.graph, &self.config);
        Analyzed {
            config: self.config,
            graph: self.graph,
            census: self.census,
            analysis,
        }
    }
}

// ──────────────────────── Stage 4: Analyzed ──────────────────────────

/// Segments are oriented uphill and scored.
#[must_use = "pipeline stages are consumed by advancing; call .synthesize() to continue"]
pub struct Analyzed {
    config: AnalyzerConfig,
    graph: ConnectivityGraph,
    census: JunctionCensus,
    analysis: Analysis,
}

impl Analyzed {
    /// The connectivity graph.
    #[must_use]
    pub const fn graph(&self) -> &ConnectivityGraph {
        &self.graph
    }

    /// Surviving segments and filter counts.
    #[must_use]
    pub const fn analysis(&self) -> &Analysis {
        &self.analysis
    }

    /// Build arrow lines and labels for every surviving segment.
    ///
    /// # Errors
    ///
    /// Returns [`AnalyzerError::DegenerateInterpolation`] if a label or
    /// arrow point cannot be placed.
    pub fn synthesize(self) -> Result<Synthesized, AnalyzerError> {
        let mut collections = RenderCollections::default();
        let mut trimmed_away = 0;
        for segment in &self.analysis.segments {
            match synthesize(segment, &self.config)? {
                Some(geometry) => collections.push(segment, geometry),
                None => trimmed_away += 1,
            }
        }
        tracing::debug!(
            rendered = collections.len(),
            trimmed_away,
            "synthesized trail geometry"
        );
        Ok(Synthesized {
            graph: self.graph,
            census: self.census,
            segments_in: self.analysis.segments.len(),
            trimmed_away,
            collections: collections.finish(),
        })
    }
}

// ─────────────────────── Stage 5: Synthesized ────────────────────────

/// Render collections are complete.
#[must_use = "call .into_output() to take the render collections"]
pub struct Synthesized {
    graph: ConnectivityGraph,
    census: JunctionCensus,
    segments_in: usize,
    trimmed_away: usize,
    collections: RenderCollections,
}

impl Synthesized {
    /// The connectivity graph.
    #[must_use]
    pub const fn graph(&self) -> &ConnectivityGraph {
        &self.graph
    }

    /// Node counts by kind.
    #[must_use]
    pub const fn census(&self) -> JunctionCensus {
        self.census
    }

    /// The finished render collections.
    #[must_use]
    pub const fn output(&self) -> &RenderCollections {
        &self.collections
    }

    /// Take the render collections.
    #[must_use]
    pub fn into_output(self) -> RenderCollections {
        self.collections
    }
}

// ─────────────────────────── Stage trait ─────────────────────────────

/// Number of stages after [`Pending`].
pub const STAGE_COUNT: usize = 5;

/// Common interface over the completed stages.
pub trait PipelineStage {
    /// Human-readable stage name.
    const NAME: &str;

    /// One-based index of the stage.
    const INDEX: usize;

    /// Counts describing the work done to reach this stage.
    fn metrics(&self) -> StageMetrics;
}

impl PipelineStage for GraphBuilt {
    const NAME: &str = "build_graph";
    const INDEX: usize = 1;

    fn metrics(&self) -> StageMetrics {
        let stats = self.graph.stats();
        StageMetrics::BuildGraph {
            input_geometries: self.input_geometries,
            segments_seen: stats.segments_seen,
            zero_length_skipped: stats.zero_length_skipped,
            non_finite_skipped: stats.non_finite_skipped,
            node_count: self.graph.node_count(),
            edge_count: self.graph.edge_count(),
        }
    }
}

impl PipelineStage for Classified {
    const NAME: &str = "classify";
    const INDEX: usize = 2;

    fn metrics(&self) -> StageMetrics {
        StageMetrics::Classify {
            dead_ends: self.census.dead_ends,
            pass_through: self.census.pass_through,
            forks: self.census.forks,
        }
    }
}

impl PipelineStage for PathsCoalesced {
    const NAME: &str = "coalesce";
    const INDEX: usize = 3;

    fn metrics(&self) -> StageMetrics {
        StageMetrics::Coalesce {
            path_count: self.coalesced.paths.len(),
            loop_count: self.coalesced.loops,
            skipped_chains: self.coalesced.skipped_chains,
            total_node_count: self.coalesced.paths.iter().map(CoalescedPath::len).sum(),
        }
    }
}

impl PipelineStage for Analyzed {
    const NAME: &str = "analyze";
    const INDEX: usize = 4;

    fn metrics(&self) -> StageMetrics {
        StageMetrics::Analyze {
            examined: self.analysis.examined(),
            kept: self.analysis.segments.len(),
            too_short: self.analysis.too_short,
            too_steep: self.analysis.too_steep,
            missing_elevation: self.analysis.missing_elevation,
        }
    }
}

impl PipelineStage for Synthesized {
    const NAME: &str = "synthesize";
    const INDEX: usize = 5;

    fn metrics(&self) -> StageMetrics {
        StageMetrics::Synthesize {
            segments_in: self.segments_in,
            rendered: self.collections.len(),
            trimmed_away: self.trimmed_away,
        }
    }
}
