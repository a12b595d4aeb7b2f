//! Pipeline diagnostics: timing and counts for each stage.
//!
//! [`process_with_diagnostics`] runs the staged pipeline and records how
//! long each stage took and what it produced. Time is read through a
//! [`Clock`] so callers can supply their own source; [`WebClock`] uses the
//! `web-time` crate, which maps to `performance.now()` on WASM and
//! `std::time::Instant` on native.
//!
//! Durations are serialized as fractional seconds (`f64`) for JSON
//! compatibility, since `std::time::Duration` does not implement serde
//! traits.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::pipeline::{Pipeline, PipelineStage};
use crate::sink::RenderCollections;
use crate::terrain::ElevationSource;
use crate::types::{AnalyzerConfig, AnalyzerError, TrailGeometry};

/// Serde support for `std::time::Duration` as fractional seconds.
mod duration_serde {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    /// Serialize a `Duration` as fractional seconds (`f64`).
    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        duration.as_secs_f64().serialize(serializer)
    }

    /// Deserialize a `Duration` from fractional seconds (`f64`).
    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(deserializer)?;
        Duration::try_from_secs_f64(secs).map_err(|_| {
            serde::de::Error::custom(
                "duration seconds must be finite, non-negative, and representable as a Duration",
            )
        })
    }
}

/// Monotonic time source.
pub trait Clock {
    /// A point in time.
    type Instant;

    /// The current instant.
    fn now(&self) -> Self::Instant;

    /// Time elapsed since `since`.
    fn elapsed(&self, since: &Self::Instant) -> Duration;
}

/// [`Clock`] backed by [`web_time::Instant`].
#[derive(Debug, Clone, Copy, Default)]
pub struct WebClock;

impl Clock for WebClock {
    type Instant = web_time::Instant;

    fn now(&self) -> web_time::Instant {
        web_time::Instant::now()
    }

    fn elapsed(&self, since: &web_time::Instant) -> Duration {
        since.elapsed()
    }
}

/// Diagnostics collected from a single pipeline run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineDiagnostics {
    /// Stage 1: graph construction and elevation lookup.
    pub build_graph: StageDiagnostics,
    /// Stage 2: junction classification.
    pub classify: StageDiagnostics,
    /// Stage 3: path coalescing.
    pub coalesce: StageDiagnostics,
    /// Stage 4: slope analysis and filtering.
    pub analyze: StageDiagnostics,
    /// Stage 5: arrow and label geometry.
    pub synthesize: StageDiagnostics,
    /// Total wall-clock duration of the entire pipeline (seconds).
    #[serde(with = "duration_serde")]
    pub total_duration: Duration,
    /// Summary counts across all stages.
    pub summary: PipelineSummary,
}

/// Diagnostics for a single pipeline stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageDiagnostics {
    /// Wall-clock duration of this stage (seconds).
    #[serde(with = "duration_serde")]
    pub duration: Duration,
    /// Stage-specific metrics.
    pub metrics: StageMetrics,
}

/// Stage-specific metrics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum StageMetrics {
    /// Graph construction.
    BuildGraph {
        /// Input features.
        input_geometries: usize,
        /// Coordinate pairs examined.
        segments_seen: usize,
        /// Pairs skipped because both ends coincide.
        zero_length_skipped: usize,
        /// Pairs skipped for a non-finite coordinate.
        non_finite_skipped: usize,
        /// Distinct nodes.
        node_count: usize,
        /// Distinct undirected edges.
        edge_count: usize,
    },
    /// Junction classification.
    Classify {
        /// Degree-1 nodes.
        dead_ends: usize,
        /// Degree-2 nodes.
        pass_through: usize,
        /// Degree-3+ nodes.
        forks: usize,
    },
    /// Path coalescing.
    Coalesce {
        /// Paths emitted, loops included.
        path_count: usize,
        /// Closed loops among them.
        loop_count: usize,
        /// Chains dropped under the skip policy.
        skipped_chains: usize,
        /// Nodes across all paths.
        total_node_count: usize,
    },
    /// Slope analysis.
    Analyze {
        /// Paths examined.
        examined: usize,
        /// Paths that passed the filters.
        kept: usize,
        /// Dropped for length.
        too_short: usize,
        /// Dropped for slope.
        too_steep: usize,
        /// Dropped for a missing endpoint elevation.
        missing_elevation: usize,
    },
    /// Geometry synthesis.
    Synthesize {
        /// Segments received.
        segments_in: usize,
        /// Segments with an arrow line and label.
        rendered: usize,
        /// Segments dropped because trimming consumed them.
        trimmed_away: usize,
    },
}

/// High-level summary counts for the entire pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineSummary {
    /// Input features.
    pub input_geometries: usize,
    /// Distinct nodes.
    pub node_count: usize,
    /// Dead ends plus forks.
    pub junction_count: usize,
    /// Coalesced paths.
    pub path_count: usize,
    /// Rendered segments.
    pub rendered_count: usize,
}

impl PipelineDiagnostics {
    /// Format diagnostics as a human-readable report.
    #[must_use]
    pub fn report(&self) -> String {
        let mut lines = Vec::new();

        lines.push(format!("Pipeline Diagnostics Report\n{}", "=".repeat(60)));
        lines.push(format!(
            "Input: {} features, {} nodes, {} junctions",
            self.summary.input_geometries, self.summary.node_count, self.summary.junction_count,
        ));
        lines.push(format!(
            "Total duration: {:.3}ms",
            duration_ms(self.total_duration),
        ));
        lines.push(String::new());

        lines.push(format!(
            "{:<24} {:>10} {:>10}  {}",
            "Stage", "Duration", "% Total", "Details"
        ));
        lines.push("-".repeat(80));

        let total_ms = duration_ms(self.total_duration);
        for (name, diag) in self.stages() {
            let ms = duration_ms(diag.duration);
            let pct = if total_ms > 0.0 {
                ms / total_ms * 100.0
            } else {
                0.0
            };
            let details = format_metrics(&diag.metrics);
            lines.push(format!("{name:<24} {ms:>8.3}ms {pct:>9.1}%  {details}"));
        }

        lines.push(String::new());
        lines.push(format!(
            "Paths: {}  |  Rendered segments: {}",
            self.summary.path_count, self.summary.rendered_count,
        ));

        lines.join("\n")
    }

    /// Every stage with its display name, in execution order.
    #[must_use]
    pub fn stages(&self) -> [(&'static str, &StageDiagnostics); 5] {
        [
            ("Build Graph", &self.build_graph),
            ("Classify", &self.classify),
            ("Coalesce", &self.coalesce),
            ("Analyze", &self.analyze),
            ("Synthesize", &self.synthesize),
        ]
    }
}

/// Convert a `Duration` to milliseconds as `f64`.
fn duration_ms(d: Duration) -> f64 {
    d.as_secs_f64() * 1000.0
}

/// Format stage metrics into a compact detail string.
fn format_metrics(metrics: &StageMetrics) -> String {
    match metrics {
        StageMetrics::BuildGraph {
            input_geometries,
            segments_seen,
            zero_length_skipped,
            non_finite_skipped,
            node_count,
            edge_count,
        } => format!(
            "{input_geometries} features, {segments_seen} segs -> {node_count} nodes {edge_count} edges (skipped {zero_length_skipped} zero-length, {non_finite_skipped} non-finite)",
        ),
        StageMetrics::Classify {
            dead_ends,
            pass_through,
            forks,
        } => format!("dead-end={dead_ends} pass-through={pass_through} fork={forks}"),
        StageMetrics::Coalesce {
            path_count,
            loop_count,
            skipped_chains,
            total_node_count,
        } => format!(
            "{path_count} paths ({loop_count} loops, {skipped_chains} skipped), {total_node_count} nodes",
        ),
        StageMetrics::Analyze {
            examined,
            kept,
            too_short,
            too_steep,
            missing_elevation,
        } => format!(
            "{examined} -> {kept} kept (short={too_short} steep={too_steep} no-elevation={missing_elevation})",
        ),
        StageMetrics::Synthesize {
            segments_in,
            rendered,
            trimmed_away,
        } => format!("{segments_in} -> {rendered} rendered (trimmed away={trimmed_away})"),
    }
}

/// Time `f` and pair its stage with the stage's metrics.
fn timed<C, S, T>(
    clock: &C,
    f: impl FnOnce() -> Result<S, T>,
) -> Result<(S, StageDiagnostics), T>
where
    C: Clock,
    S: PipelineStage,
{
    let start = clock.now();
    let stage = f()?;
    let duration = clock.elapsed(&start);
    let metrics = stage.metrics();
    Ok((stage, StageDiagnostics { duration, metrics }))
}

/// Run the full pipeline, collecting per-stage diagnostics.
///
/// # Errors
///
/// Returns any [`AnalyzerError`] the pipeline produces.
pub fn process_with_diagnostics<E, C>(
    geometries: &[TrailGeometry],
    elevation: &E,
    config: &AnalyzerConfig,
    clock: &C,
) -> Result<(RenderCollections, PipelineDiagnostics), AnalyzerError>
where
    E: ElevationSource + ?Sized,
    C: Clock,
{
    let start = clock.now();

    let pending = Pipeline::new(geometries, elevation, config.clone());
    let (built, build_graph) = timed(clock, || pending.build_graph())?;
    let (classified, classify) = timed(clock, || Ok::<_, AnalyzerError>(built.classify()))?;
    let census = classified.census();
    let (coalesced, coalesce) = timed(clock, || classified.coalesce())?;
    let path_count = coalesced.coalesced().paths.len();
    let (analyzed, analyze) = timed(clock, || Ok::<_, AnalyzerError>(coalesced.analyze()))?;
    let (synthesized, synthesize) = timed(clock, || analyzed.synthesize())?;

    let total_duration = clock.elapsed(&start);
    let summary = PipelineSummary {
        input_geometries: geometries.len(),
        node_count: synthesized.graph().node_count(),
        junction_count: census.junctions(),
        path_count,
        rendered_count: synthesized.output().len(),
    };

    Ok((
        synthesized.into_output(),
        PipelineDiagnostics {
            build_graph,
            classify,
            coalesce,
            analyze,
            synthesize,
            total_duration,
            summary,
        },
    ))
}
