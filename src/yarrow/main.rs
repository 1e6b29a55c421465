// Copyright: Kyler Chin <kyler@catenarymaps.org>
// Catenary Transit Initiatives
// Removal of the attribution is not allowed, as covered under the AGPL license

//cargo run --bin yarrow --release -- clean --input roads.geojson --output roads_clean.geojson

use anyhow::{Context, Result};
use clap::Parser;
use linework::cleanup::traversal::ProcessedPairs;
use linework::cleanup::{NearParallelFinder, dedup_points};
use linework::conflation::{Conflator, MatchKind};
use linework::diagnostics::{Category, Collector, Subject};
use linework::{
    AttributeMatcher, CleanupConfig, CleanupPipeline, Diagnostic, DiagnosticSink, Graph, Payload, PipelineReport, Record,
    Severity,
};
use log::{debug, info};
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

mod geojson_io;

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

#[derive(Parser, Debug)]
#[command(author, version, about = "Clean and reconcile line network geometry", long_about = None)]
struct Args {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(clap::Args, Debug)]
struct Common {
    /// RON cleanup config. Defaults apply for anything it leaves out.
    #[arg(long, env = "LINEWORK_CONFIG")]
    config: Option<PathBuf>,

    /// Property holding the feature type
    #[arg(long, default_value = "type")]
    kind_field: String,

    /// Grid scale for x/y snapping, overriding the config (1000 keeps 3 decimals)
    #[arg(long)]
    scale: Option<f64>,
}

#[derive(clap::Subcommand, Debug)]
enum Command {
    /// Run the cleanup passes over a GeoJSON file
    Clean {
        #[arg(short, long)]
        input: PathBuf,
        #[arg(short, long)]
        output: PathBuf,
        /// Write diagnostics here as a JSON array
        #[arg(long)]
        diagnostics: Option<PathBuf>,
        #[command(flatten)]
        common: Common,
    },
    /// Match the features of two GeoJSON files
    Conflate {
        #[arg(long)]
        left: PathBuf,
        #[arg(long)]
        right: PathBuf,
        /// Write the report here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
        #[command(flatten)]
        common: Common,
    },
    /// List edge pairs running close and nearly parallel
    NearParallel {
        #[arg(short, long)]
        input: PathBuf,
        #[arg(long)]
        distance: Option<f64>,
        #[command(flatten)]
        common: Common,
    },
}

fn load_config(common: &Common) -> Result<CleanupConfig> {
    let mut config = match &common.config {
        Some(path) => CleanupConfig::from_ron_file(path)?,
        None => CleanupConfig::default(),
    };
    if let Some(scale) = common.scale {
        config.precision.xy = scale;
    }
    debug!("using config {:?}", config);
    Ok(config)
}

fn matcher(config: &CleanupConfig) -> AttributeMatcher<Record> {
    AttributeMatcher::for_records().excluding(config.field_set())
}

fn build_graph(records: Vec<Record>, config: &CleanupConfig, sink: &mut dyn DiagnosticSink) -> Graph<Record> {
    let (graph, rejected) = Graph::from_payloads(config.precision, records);
    for (label, err) in rejected {
        sink.emit(Diagnostic::error(
            Category::InvalidOperation,
            Subject::Feature { label },
            err.to_string(),
        ));
    }
    info!("built graph with {} nodes and {} edges", graph.node_count(), graph.edge_count());
    graph
}

fn write_json<T: serde::Serialize>(path: Option<&Path>, value: &T) -> Result<()> {
    match path {
        Some(path) => {
            let file = File::create(path).with_context(|| format!("creating {}", path.display()))?;
            serde_json::to_writer_pretty(BufWriter::new(file), value)?;
        }
        None => println!("{}", serde_json::to_string_pretty(value)?),
    }
    Ok(())
}

/// Build and clean the line graph, then deduplicate the points beside it.
fn clean_features(
    features: geojson_io::Features,
    config: &CleanupConfig,
    sink: &mut Collector,
) -> (Graph<Record>, Vec<Record>, PipelineReport) {
    let matcher = matcher(config);
    let mut graph = build_graph(features.lines, config, sink);
    let pipeline = CleanupPipeline::from_config(config);
    let report = pipeline.run(&mut graph, &matcher, sink);
    debug!("{} graph events", graph.take_events().len());

    // Points get their own graph so the line graph keeps no edgeless nodes
    let mut point_graph: Graph<Record> = Graph::new(config.precision);
    let points = dedup_points(&mut point_graph, features.points, &matcher, sink);
    let point_records = points.kept.into_iter().map(|(_, p)| p).collect();
    (graph, point_records, report)
}

fn clean(input: &Path, output: &Path, diagnostics: Option<&Path>, common: &Common) -> Result<()> {
    let config = load_config(common)?;
    let features = geojson_io::read_features(input, &common.kind_field)?;
    let skipped = features.skipped;
    let mut sink = Collector::default();

    let (graph, point_records, report) = clean_features(features, &config, &mut sink);
    let lines = graph.into_payloads();
    geojson_io::write_features(output, lines.iter().chain(point_records.iter()))?;

    if let Some(path) = diagnostics {
        write_json(Some(path), &sink.diagnostics)?;
    }

    for stats in &report.passes {
        println!(
            "{:>20}: {} merged, {} removed, {} changed, {} split, {} diagnostics",
            stats.pass, stats.merged, stats.removed, stats.changed, stats.split, stats.reported
        );
    }
    println!(
        "Wrote {} lines and {} points to {:?} ({} errors, {} for review, {} features skipped)",
        lines.len(),
        point_records.len(),
        output,
        sink.count(Severity::Error),
        sink.count(Severity::Review),
        skipped
    );
    Ok(())
}

fn conflate(left: &Path, right: &Path, output: Option<&Path>, common: &Common) -> Result<()> {
    let config = load_config(common)?;
    let mut sink = Collector::default();
    let left_graph = build_graph(geojson_io::read_features(left, &common.kind_field)?.lines, &config, &mut sink);
    let right_graph = build_graph(geojson_io::read_features(right, &common.kind_field)?.lines, &config, &mut sink);

    let report = Conflator::new(matcher(&config)).match_graphs(&left_graph, &right_graph)?;
    write_json(output, &report)?;
    eprintln!(
        "{} identical, {} attributes changed, {} geometry changed, {} removed, {} added",
        report.count(MatchKind::Identical),
        report.count(MatchKind::AttributesChanged),
        report.count(MatchKind::GeometryChanged),
        report.count(MatchKind::Removed),
        report.count(MatchKind::Added)
    );
    Ok(())
}

fn near_parallel(input: &Path, distance: Option<f64>, common: &Common) -> Result<()> {
    let config = load_config(common)?;
    let mut sink = Collector::default();
    let graph = build_graph(geojson_io::read_features(input, &common.kind_field)?.lines, &config, &mut sink);
    let finder = NearParallelFinder::new(distance.unwrap_or(config.near_parallel_distance))
        .with_max_angle(config.near_parallel_max_angle());

    let mut seen = ProcessedPairs::new();
    let mut found = 0;
    for edge in graph.edges() {
        for m in finder.find_for_edge(&graph, edge.id()) {
            if !seen.mark(edge.id(), m.edge) {
                continue;
            }
            found += 1;
            let other = graph.edge(m.edge).map(|e| e.payload().label()).unwrap_or_default();
            println!(
                "{}\t{}\t{:.3}\t{:.1}",
                edge.payload().label(),
                other,
                m.distance,
                m.angle.to_degrees()
            );
        }
    }
    eprintln!("{} near-parallel pairs", found);
    Ok(())
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    env_logger::init();

    let args = Args::parse();

    match args.cmd {
        Command::Clean {
            input,
            output,
            diagnostics,
            common,
        } => clean(&input, &output, diagnostics.as_deref(), &common),
        Command::Conflate {
            left,
            right,
            output,
            common,
        } => conflate(&left, &right, output.as_deref(), &common),
        Command::NearParallel {
            input,
            distance,
            common,
        } => near_parallel(&input, distance, &common),
    }
}
