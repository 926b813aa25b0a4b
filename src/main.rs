//! # Streetgauge CLI
//!
//! Command-line interface for the streetgauge library.
//! Fetches the street network around a place and prints the analysis
//! record as JSON.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use log::error;
use streetgauge::{AcquireConfig, AnalysisOptions, Coordinator, Error, Mode};

mod cli;

/// Command-line interface for streetgauge
#[derive(Parser)]
#[command(name = "streetgauge")]
#[command(about = "Street network accessibility analyzer")]
#[command(long_about = "Computes accessibility indicators for the street network around a place:
  streetgauge \"Lyon, France\"                   # walk network, 1 km radius
  streetgauge \"Lyon, France\" --mode bike --radius-m 2000
  streetgauge \"45.764, 4.8357\" --closeness     # coordinates skip geocoding
  streetgauge Monaco --allow-synthetic          # lattice fallback if Overpass is down

Results are printed as JSON on stdout; diagnostics go to stderr.")]
#[command(version)]
struct Cli {
    /// Place to analyze: a free-text name or a "lat,lon" pair
    place: String,

    /// Travel mode selecting the network filter
    #[arg(long, value_enum, default_value_t = Mode::Walk)]
    mode: Mode,

    /// Search radius around the place, in meters
    #[arg(long, default_value_t = 1000)]
    radius_m: u32,

    /// Skip edge betweenness centrality (on by default)
    #[arg(long)]
    no_betweenness: bool,

    /// Compute closeness centrality
    #[arg(long)]
    closeness: bool,

    /// Compute degree centrality
    #[arg(long)]
    degree: bool,

    /// Compute straightness centrality
    #[arg(long)]
    straightness: bool,

    /// Compute eigenvector centrality
    #[arg(long)]
    eigenvector: bool,

    /// Skip the hexagonal aggregation (on by default)
    #[arg(long)]
    no_hex: bool,

    /// H3 resolution for the hexagonal aggregation
    #[arg(long, default_value_t = 7, value_parser = clap::value_parser!(u8).range(1..=15))]
    hex_res: u8,

    /// Fall back to a synthetic lattice when every endpoint fails
    #[arg(long)]
    allow_synthetic: bool,

    /// Overpass endpoint tried before everything else
    #[arg(long, env = "STREETGAUGE_ENDPOINT")]
    endpoint: Option<String>,

    /// Comma-separated endpoints tried after the primary
    #[arg(long, env = "STREETGAUGE_EXTRA_ENDPOINTS")]
    extra_endpoints: Option<String>,

    /// Per-request timeout in seconds
    #[arg(long, env = "STREETGAUGE_TIMEOUT_SECS", default_value_t = streetgauge::DEFAULT_TIMEOUT_SECS)]
    timeout_secs: u64,

    /// Directory for on-disk Overpass response caching
    #[arg(long, env = "STREETGAUGE_CACHE_DIR")]
    cache_dir: Option<PathBuf>,

    /// Graph snapshot path; bypasses the network when the file exists
    #[arg(long, env = "STREETGAUGE_GRAPH_SNAPSHOT")]
    graph_snapshot: Option<PathBuf>,

    /// Write the JSON result here instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    fn acquire_config(&self) -> AcquireConfig {
        AcquireConfig {
            primary_endpoint: self.endpoint.clone(),
            extra_endpoints: self
                .extra_endpoints
                .as_deref()
                .map(AcquireConfig::parse_extra_endpoints)
                .unwrap_or_default(),
            timeout: std::time::Duration::from_secs(self.timeout_secs),
            cache_dir: self.cache_dir.clone(),
            local_graph_path: self.graph_snapshot.clone(),
            allow_synthetic: self.allow_synthetic,
            include_default_endpoints: true,
        }
    }

    fn analysis_options(&self) -> AnalysisOptions {
        AnalysisOptions {
            mode: self.mode,
            radius_m: self.radius_m,
            betweenness: !self.no_betweenness,
            closeness: self.closeness,
            degree: self.degree,
            straightness: self.straightness,
            eigenvector: self.eigenvector,
            hex: !self.no_hex,
            hex_resolution: self.hex_res,
            allow_synthetic: if self.allow_synthetic { Some(true) } else { None },
        }
    }
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("❌ Error: {e}");
        eprintln!("❌ Error: {e:#}");
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging to stderr
    let mut builder = env_logger::Builder::from_default_env();
    builder.target(env_logger::Target::Stderr);
    if cli.verbose {
        builder.filter_level(log::LevelFilter::Info);
    }
    builder.init();

    if cli.verbose {
        eprintln!("📏 Streetgauge v{} starting...", env!("CARGO_PKG_VERSION"));
    }

    let coordinator =
        Coordinator::new(cli.acquire_config()).context("could not build the coordinator")?;
    let options = cli.analysis_options();

    let progress = cli::ProgressManager::new(&format!(
        "🌐 Fetching {} network around '{}'",
        options.mode, cli.place
    ));

    let result = match streetgauge::analyze(&coordinator, &cli.place, &options).await {
        Ok(result) => result,
        Err(e) => {
            progress.finish();
            report_acquisition_failure(&e);
            return Err(e).context("analysis failed");
        }
    };
    progress.phase("🧮 Serializing result");

    let json =
        serde_json::to_string_pretty(&result).context("could not serialize the result")?;
    progress.finish();

    match &cli.output {
        Some(path) => {
            std::fs::write(path, json)
                .with_context(|| format!("could not write {}", path.display()))?;
            eprintln!("📁 Result written to {}", path.display());
        }
        None => println!("{json}"),
    }

    eprintln!(
        "✅ {}: {} nodes, {} edges, {:.2} km",
        cli.place, result.metrics.nodes, result.metrics.edges, result.metrics.total_km
    );
    Ok(())
}

/// Print the per-endpoint detail a caller needs to decide between a retry,
/// a different mode, or the synthetic fallback
fn report_acquisition_failure(e: &Error) {
    if let Error::SourceUnavailable { attempts, .. } = e {
        eprintln!("❌ Every endpoint failed:");
        for attempt in attempts {
            eprintln!("   ↳ {attempt}");
        }
        eprintln!("   Retry later, or pass --allow-synthetic for a deterministic lattice.");
    }
}
