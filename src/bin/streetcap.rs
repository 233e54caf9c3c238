//! CLI binary for streetcap.
//!
//! A thin shim over the library crate that maps CLI flags to
//! `CaptureConfig` and wires up either the single-shot or the batch driver.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use streetcap::store::{AnnotationStore, AssetStore};
use streetcap::{
    shoot, CaptureConfig, CaptureSession, DirAssetStore, HttpAssetStore, JsonPoiStore,
};
use tracing_subscriber::EnvFilter;

const AFTER_HELP: &str = r#"EXAMPLES:
  # Capture one address from a GeoJSON feature file
  streetcap shoot --feature poi.geojson

  # Capture a viewer URL directly
  streetcap shoot --url "https://www.google.nl/maps/@52.07,4.30,1.6a,75y,194h,90t"

  # Larger viewport, longer settle, custom output directory
  streetcap shoot --url "$URL" --width 1920 --height 1080 --settle-ms 6000 -o shots/

  # Process one unprocessed store item for a city
  streetcap batch --city den-haag --store pois.json

  # Process up to 25 items, uploading screenshots over HTTP
  streetcap batch --city den-haag --limit 25 --upload-url https://assets.example/upload

  # Watch the browser work
  streetcap shoot --feature poi.geojson --headed -v

ENVIRONMENT VARIABLES:
  STREETCAP_SETTLE_MS   Override the per-step settle wait (milliseconds)
  STREETCAP_OUT_DIR     Override the output directory
  RUST_LOG              Full tracing filter (overrides -v / -q)
"#;

/// Capture street-level panorama screenshots from the map viewer.
#[derive(Parser, Debug)]
#[command(
    name = "streetcap",
    version,
    about = "Capture street-level panorama screenshots with camera metadata",
    long_about = "Drives a headless Chrome through the map viewer's interface — search, \
panorama mode, overlay dismissal — then screenshots the scene and records the camera \
parameters (position, altitude, field of view, heading, pitch) the viewer encodes into \
its own URL.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, global = true)]
    quiet: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Capture one feature or URL to <id>.jpg + <id>.json.
    Shoot(ShootArgs),
    /// Capture every unprocessed store item for a city.
    Batch(BatchArgs),
}

/// Flags shared by both drivers; they all feed `CaptureConfig`.
#[derive(Args, Debug)]
struct CaptureOpts {
    /// Viewport width in pixels.
    #[arg(long, default_value_t = 2880)]
    width: u32,

    /// Viewport height in pixels.
    #[arg(long, default_value_t = 1800)]
    height: u32,

    /// Wait after navigation and after each interaction step (milliseconds).
    #[arg(long, env = "STREETCAP_SETTLE_MS", default_value_t = 4000)]
    settle_ms: u64,

    /// Run Chrome with a visible window instead of headless.
    #[arg(long)]
    headed: bool,

    /// Directory for captured images and metadata.
    #[arg(short, long, env = "STREETCAP_OUT_DIR", default_value = "screenshots")]
    out_dir: PathBuf,
}

impl CaptureOpts {
    fn build(&self) -> Result<CaptureConfig> {
        CaptureConfig::builder()
            .dimensions(self.width, self.height)
            .settle_ms(self.settle_ms)
            .headless(!self.headed)
            .out_dir(&self.out_dir)
            .build()
            .context("Invalid capture settings")
    }
}

#[derive(Args, Debug)]
struct ShootArgs {
    /// Path to a GeoJSON feature file with a properties.address string.
    #[arg(long, conflicts_with = "url")]
    feature: Option<PathBuf>,

    /// Viewer or search URL to capture as-is.
    #[arg(long)]
    url: Option<String>,

    #[command(flatten)]
    capture: CaptureOpts,
}

#[derive(Args, Debug)]
struct BatchArgs {
    /// City whose unprocessed items to capture.
    #[arg(long)]
    city: String,

    /// Maximum number of items to process this run.
    #[arg(long, default_value_t = 1)]
    limit: usize,

    /// Path to the JSON document store.
    #[arg(long, default_value = "pois.json")]
    store: PathBuf,

    /// Directory to store uploaded screenshots in.
    #[arg(long, default_value = "assets", conflicts_with = "upload_url")]
    assets: PathBuf,

    /// Upload screenshots to this HTTP endpoint instead of a directory.
    #[arg(long)]
    upload_url: Option<String>,

    #[command(flatten)]
    capture: CaptureOpts,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    let level = if cli.quiet {
        "error"
    } else if cli.verbose {
        "debug"
    } else {
        "info"
    };
    // The CDP client logs every websocket frame at levels that drown ours.
    let default_filter = format!("{level},chromiumoxide=warn,tungstenite=warn");

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .with_writer(io::stderr)
        .init();

    match cli.command {
        Command::Shoot(args) => run_shoot(args).await,
        Command::Batch(args) => run_batch(args).await,
    }
}

async fn run_shoot(args: ShootArgs) -> Result<()> {
    let config = args.capture.build()?;
    let session = CaptureSession::with_chrome(config);

    let feature = match &args.feature {
        Some(path) => {
            let raw = tokio::fs::read_to_string(path)
                .await
                .with_context(|| format!("Failed to read feature file {}", path.display()))?;
            let value = serde_json::from_str(&raw)
                .with_context(|| format!("{} is not valid JSON", path.display()))?;
            Some(value)
        }
        None => None,
    };

    let out = shoot(&session, feature, args.url).await?;

    println!("{}", out.image_path.display());
    println!("{}", out.metadata_path.display());
    Ok(())
}

async fn run_batch(args: BatchArgs) -> Result<()> {
    let config = args.capture.build()?;
    let session = CaptureSession::with_chrome(config);

    let annotations: Arc<dyn AnnotationStore> = Arc::new(JsonPoiStore::new(&args.store));
    let assets: Arc<dyn AssetStore> = match &args.upload_url {
        Some(endpoint) => Arc::new(HttpAssetStore::new(endpoint.clone())),
        None => Arc::new(DirAssetStore::new(&args.assets)),
    };

    let runner = streetcap::BatchRunner::new(session, annotations, assets);
    let stats = runner.run(&args.city, args.limit).await?;

    if stats.failed > 0 {
        eprintln!(
            "{}/{} item(s) captured, {} failed",
            stats.succeeded, stats.selected, stats.failed
        );
        std::process::exit(1);
    }
    eprintln!("{}/{} item(s) captured", stats.succeeded, stats.selected);
    Ok(())
}
