//! trailslope-bench: CLI tool for running the trail analyzer on GeoJSON
//! files and collecting diagnostics.
//!
//! Reads rendered path geometry, resolves elevations from a terrain-RGB
//! tile or from the positions' third component, and prints per-stage
//! diagnostics. Useful for:
//!
//! - Checking how a trail network is split into segments
//! - Tuning the length and slope filters and the zoom-dependent trim
//! - Measuring per-stage durations on large networks
//! - Re-running on every save of the input with `--watch`
//!
//! # Usage
//!
//! ```text
//! cargo run --release --bin trailslope-bench -- [OPTIONS] <PATHS_GEOJSON>
//! ```

#![allow(clippy::print_stdout, clippy::print_stderr)]

use std::io;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::{Duration, Instant, SystemTime};

use clap::{Parser, ValueEnum};
use tracing_subscriber::EnvFilter;
use trailslope_export::TrailInput;
use trailslope_pipeline::diagnostics::{Clock, PipelineDiagnostics};
use trailslope_pipeline::{
    AnalyzerConfig, ChainPolicy, ElevationSource, Exaggerated, GeoBounds, Generation, LoopPolicy,
    RasterProjection, RecomputeScheduler, RenderCollections, SampledElevation, TerrainEncoding,
    TerrainRaster,
};

/// How often `--watch` checks the input file.
const WATCH_INTERVAL: Duration = Duration::from_millis(25);

/// Trail network slope analysis and diagnostics for trailslope.
///
/// Runs the analyzer over the line features of a GeoJSON file and prints
/// per-stage timing and count diagnostics.
#[derive(Parser)]
#[command(name = "trailslope-bench", version)]
struct Cli {
    /// Path to a GeoJSON file with LineString/MultiLineString features.
    paths: PathBuf,

    /// Map zoom level; trims and arrowheads scale by 2^-zoom.
    #[arg(long, default_value_t = AnalyzerConfig::DEFAULT_ZOOM)]
    zoom: f64,

    /// Minimum segment length in meters.
    #[arg(long, default_value_t = AnalyzerConfig::DEFAULT_MIN_LENGTH_M)]
    min_length: f64,

    /// Segments at or above this slope (percent) are dropped.
    #[arg(long, default_value_t = AnalyzerConfig::DEFAULT_MAX_SLOPE_PERCENT)]
    max_slope: f64,

    /// What to do with closed loops that have no junction.
    #[arg(long, value_enum, default_value_t = Loops::Ignore)]
    loop_policy: Loops,

    /// What to do when a chain has no unique continuation.
    #[arg(long, value_enum, default_value_t = Chains::Abort)]
    chain_policy: Chains,

    /// Terrain-RGB tile (PNG or WebP) to read elevations from.
    ///
    /// Without it, elevations come from the third component of each input
    /// position (0 where missing).
    #[arg(long, requires = "bounds")]
    dem: Option<PathBuf>,

    /// Extent of the terrain tile as `west,south,east,north` in degrees.
    #[arg(long, value_parser = parse_bounds, allow_hyphen_values = true)]
    bounds: Option<GeoBounds>,

    /// Pixel encoding of the terrain tile.
    #[arg(long, value_enum, default_value_t = Encoding::Mapbox)]
    encoding: Encoding,

    /// Row spacing of the terrain tile.
    #[arg(long, value_enum, default_value_t = Projection::WebMercator)]
    projection: Projection,

    /// Vertical exaggeration baked into the elevations; they are divided
    /// by this.
    #[arg(long, default_value_t = 1.0)]
    exaggeration: f64,

    /// Write the arrow line collection as GeoJSON.
    #[arg(long)]
    lines_out: Option<PathBuf>,

    /// Write the label collection as GeoJSON.
    #[arg(long)]
    labels_out: Option<PathBuf>,

    /// Write an SVG preview.
    #[arg(long)]
    svg: Option<PathBuf>,

    /// Number of runs for averaging.
    #[arg(long, default_value_t = 1, value_parser = clap::builder::RangedU64ValueParser::<usize>::new().range(1..))]
    runs: usize,

    /// Output diagnostics as JSON instead of human-readable report.
    #[arg(long)]
    json: bool,

    /// After the runs, keep watching the input file and re-run (writing
    /// outputs again) once saves have settled.
    #[arg(long)]
    watch: bool,

    /// Full analyzer config as a JSON string.
    ///
    /// When provided, all other analyzer parameter flags are ignored.
    /// Missing fields take their defaults.
    #[arg(long)]
    config_json: Option<String>,
}

/// Loop policy selection.
#[derive(Clone, Copy, ValueEnum)]
enum Loops {
    /// Junction-free loops are not rendered.
    Ignore,
    /// Junction-free loops are rendered as one closed segment each.
    Emit,
}

/// Chain policy selection.
#[derive(Clone, Copy, ValueEnum)]
enum Chains {
    /// Fail the run.
    Abort,
    /// Drop the chain and continue.
    Skip,
}

/// Terrain tile encoding selection.
#[derive(Clone, Copy, ValueEnum)]
enum Encoding {
    /// Mapbox Terrain-RGB.
    Mapbox,
    /// Terrarium.
    Terrarium,
}

/// Terrain tile row spacing selection.
#[derive(Clone, Copy, ValueEnum)]
enum Projection {
    /// Slippy-map tile rows.
    WebMercator,
    /// Rows evenly spaced in latitude.
    Equirectangular,
}

fn parse_bounds(text: &str) -> Result<GeoBounds, String> {
    let values = text
        .split(',')
        .map(|part| part.trim().parse::<f64>())
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| format!("bounds must be numbers: {e}"))?;
    let [west, south, east, north] = values[..] else {
        return Err(format!(
            "bounds need four values west,south,east,north, got {}",
            values.len()
        ));
    };
    Ok(GeoBounds {
        west,
        south,
        east,
        north,
    })
}

/// Build an [`AnalyzerConfig`] from CLI arguments.
///
/// If `--config-json` is provided, the JSON is parsed directly and all
/// individual parameter flags are ignored.
fn config_from_cli(cli: &Cli) -> Result<AnalyzerConfig, String> {
    if let Some(ref json) = cli.config_json {
        return serde_json::from_str(json).map_err(|e| format!("Error parsing --config-json: {e}"));
    }

    Ok(AnalyzerConfig {
        zoom: cli.zoom,
        min_length_m: cli.min_length,
        max_slope_percent: cli.max_slope,
        loop_policy: match cli.loop_policy {
            Loops::Ignore => LoopPolicy::Ignore,
            Loops::Emit => LoopPolicy::Emit,
        },
        chain_policy: match cli.chain_policy {
            Chains::Abort => ChainPolicy::Abort,
            Chains::Skip => ChainPolicy::Skip,
        },
        ..AnalyzerConfig::default()
    })
}

/// Where node elevations come from.
enum Terrain {
    Sampled(SampledElevation),
    Raster(TerrainRaster),
}

impl ElevationSource for Terrain {
    fn elevation(&self, coord: geo::Coord<f64>) -> f64 {
        match self {
            Self::Sampled(samples) => samples.elevation(coord),
            Self::Raster(raster) => raster.elevation(coord),
        }
    }
}

fn load_terrain(cli: &Cli, samples: SampledElevation) -> Result<Terrain, String> {
    let (Some(dem), Some(bounds)) = (&cli.dem, cli.bounds) else {
        return Ok(Terrain::Sampled(samples));
    };
    let bytes =
        std::fs::read(dem).map_err(|e| format!("Error reading {}: {e}", dem.display()))?;
    let encoding = match cli.encoding {
        Encoding::Mapbox => TerrainEncoding::Mapbox,
        Encoding::Terrarium => TerrainEncoding::Terrarium,
    };
    let projection = match cli.projection {
        Projection::WebMercator => RasterProjection::WebMercator,
        Projection::Equirectangular => RasterProjection::Equirectangular,
    };
    let raster = TerrainRaster::from_encoded(&bytes, bounds, encoding, projection)
        .map_err(|e| format!("Error loading {}: {e}", dem.display()))?;
    eprintln!(
        "Terrain: {} ({}x{} px)",
        dem.display(),
        raster.width(),
        raster.height()
    );
    Ok(Terrain::Raster(raster))
}

fn load_input(path: &Path) -> Result<TrailInput, String> {
    let text =
        std::fs::read_to_string(path).map_err(|e| format!("Error reading {}: {e}", path.display()))?;
    trailslope_export::parse_trails(&text)
        .map_err(|e| format!("Error parsing {}: {e}", path.display()))
}

fn write_output(path: &Path, what: &str, contents: &str) {
    match std::fs::write(path, contents) {
        Ok(()) => eprintln!(
            "{what} written to {} ({} bytes)",
            path.display(),
            contents.len()
        ),
        Err(e) => eprintln!("Error writing {what} to {}: {e}", path.display()),
    }
}

/// Write every requested output for one run's collections.
fn write_outputs(cli: &Cli, config: &AnalyzerConfig, output: &RenderCollections) {
    if let Some(ref path) = cli.lines_out {
        match trailslope_export::lines_to_geojson(&output.lines)
            .and_then(|c| trailslope_export::collection_to_string(&c))
        {
            Ok(json) => write_output(path, "Lines", &json),
            Err(e) => eprintln!("Error serializing lines: {e}"),
        }
    }

    if let Some(ref path) = cli.labels_out {
        match trailslope_export::labels_to_geojson(&output.labels)
            .and_then(|c| trailslope_export::collection_to_string(&c))
        {
            Ok(json) => write_output(path, "Labels", &json),
            Err(e) => eprintln!("Error serializing labels: {e}"),
        }
    }

    if let Some(ref path) = cli.svg {
        let title = cli
            .paths
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("bench");
        let desc = format!("{config:#?}");
        let config_json = serde_json::to_string(config).ok();
        let metadata = trailslope_export::SvgMetadata {
            title: Some(title),
            description: Some(&desc),
            config_json: config_json.as_deref(),
        };
        let svg = trailslope_export::to_svg(output, &metadata);
        write_output(path, "SVG", &svg);
    }
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging();

    let config = match config_from_cli(&cli) {
        Ok(c) => c,
        Err(msg) => {
            eprintln!("{msg}");
            return ExitCode::FAILURE;
        }
    };

    let input = match load_input(&cli.paths) {
        Ok(input) => input,
        Err(msg) => {
            eprintln!("{msg}");
            return ExitCode::FAILURE;
        }
    };

    eprintln!(
        "Paths: {} ({} line features, {} other features ignored, {} elevation samples)",
        cli.paths.display(),
        input.geometries.len(),
        input.ignored,
        input.elevations.len(),
    );

    let terrain = match load_terrain(&cli, input.elevations) {
        Ok(terrain) => terrain,
        Err(msg) => {
            eprintln!("{msg}");
            return ExitCode::FAILURE;
        }
    };
    let elevation = Exaggerated::new(terrain, cli.exaggeration);

    eprintln!("Config: {config:#?}");
    eprintln!("Runs: {}", cli.runs);
    eprintln!();

    let mut all_diagnostics = Vec::with_capacity(cli.runs);

    for run in 0..cli.runs {
        if cli.runs > 1 {
            eprintln!("--- Run {}/{} ---", run + 1, cli.runs);
        }

        match trailslope_pipeline::diagnostics::process_with_diagnostics(
            &input.geometries,
            &elevation,
            &config,
            &StdClock,
        ) {
            Ok((output, diagnostics)) => {
                if cli.json {
                    match serde_json::to_string_pretty(&diagnostics) {
                        Ok(json) => println!("{json}"),
                        Err(e) => {
                            eprintln!("Error serializing diagnostics: {e}");
                            return ExitCode::FAILURE;
                        }
                    }
                } else {
                    println!("{}", diagnostics.report());
                }

                // Write outputs on the first run only.
                if run == 0 {
                    write_outputs(&cli, &config, &output);
                }

                all_diagnostics.push(diagnostics);
            }
            Err(e) => {
                tracing::error!(error = %e, "analyzer run failed");
                eprintln!("Pipeline error: {e}");
                return ExitCode::FAILURE;
            }
        }

        if cli.runs > 1 {
            eprintln!();
        }
    }

    if cli.runs > 1 {
        print_multi_run_summary(&all_diagnostics);
    }

    if cli.watch {
        watch(&cli, &config);
    }

    ExitCode::SUCCESS
}

fn modified(path: &Path) -> Option<SystemTime> {
    std::fs::metadata(path).and_then(|m| m.modified()).ok()
}

/// Feed one observation of the input file to the scheduler. Every change
/// restarts the quiet period, so a burst of saves yields one recompute.
fn observe(
    scheduler: &mut RecomputeScheduler,
    changed: bool,
    now: web_time::Instant,
) -> Option<Generation> {
    if changed {
        scheduler.mark_dirty(now);
    }
    scheduler.poll(now)
}

fn rerun(cli: &Cli, config: &AnalyzerConfig) -> Result<RenderCollections, String> {
    let input = load_input(&cli.paths)?;
    let terrain = load_terrain(cli, input.elevations)?;
    let elevation = Exaggerated::new(terrain, cli.exaggeration);
    trailslope_pipeline::process(&input.geometries, &elevation, config)
        .map_err(|e| format!("Pipeline error: {e}"))
}

/// Re-run whenever the input file changes. Runs until interrupted.
fn watch(cli: &Cli, config: &AnalyzerConfig) -> ! {
    let mut scheduler = RecomputeScheduler::default();
    let mut seen = modified(&cli.paths);
    eprintln!("Watching {} (Ctrl-C to stop)", cli.paths.display());

    loop {
        std::thread::sleep(WATCH_INTERVAL);
        let current = modified(&cli.paths);
        let changed = current != seen;
        seen = current;

        let Some(generation) = observe(&mut scheduler, changed, web_time::Instant::now()) else {
            continue;
        };
        match rerun(cli, config) {
            Ok(output) => {
                eprintln!(
                    "Generation {}: {} segments",
                    generation.get(),
                    output.len()
                );
                write_outputs(cli, config, &output);
            }
            Err(msg) => eprintln!("{msg}"),
        }
    }
}

/// [`Clock`] implementation backed by [`std::time::Instant`].
struct StdClock;

impl Clock for StdClock {
    type Instant = Instant;

    fn now(&self) -> Instant {
        Instant::now()
    }

    fn elapsed(&self, since: &Instant) -> Duration {
        since.elapsed()
    }
}

/// Print aggregated statistics across multiple runs.
#[allow(clippy::cast_precision_loss)]
fn print_multi_run_summary(all_diagnostics: &[PipelineDiagnostics]) {
    println!();
    println!(
        "Summary ({} runs)\n{}",
        all_diagnostics.len(),
        "=".repeat(60),
    );

    if all_diagnostics.is_empty() {
        println!("Warning: no diagnostics to summarize");
        return;
    }

    let durations: Vec<f64> = all_diagnostics
        .iter()
        .map(|d| d.total_duration.as_secs_f64() * 1000.0)
        .collect();

    let min = durations.iter().copied().reduce(f64::min).unwrap_or(0.0);
    let max = durations.iter().copied().reduce(f64::max).unwrap_or(0.0);
    let mean = durations.iter().sum::<f64>() / durations.len() as f64;

    println!("Total duration: min={min:.3}ms  mean={mean:.3}ms  max={max:.3}ms");

    println!();
    println!("{:<24} {:>12}", "Stage", "Mean (ms)");
    println!("{}", "-".repeat(40));

    let stage_count = all_diagnostics[0].stages().len();
    for index in 0..stage_count {
        let name = all_diagnostics[0].stages()[index].0;
        let stage_mean = all_diagnostics
            .iter()
            .map(|d| d.stages()[index].1.duration.as_secs_f64() * 1000.0)
            .sum::<f64>()
            / all_diagnostics.len() as f64;
        println!("{name:<24} {stage_mean:>10.3}ms");
    }
}
