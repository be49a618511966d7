//! Wind overlay CLI.
//!
//! Resolves a derived viewport from a `zoom/lat/lon` view descriptor,
//! runs one refresh cycle against the live forecast API, and writes
//! the rendered overlay to a PNG file.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use wind_fetch::ReqwestTransport;
use wind_geo::{GeoResolver, PixelRect, ViewportSnapshot};
use wind_session::{FixedViewport, OverlayConfig, RefreshOptions, Session, SettingsPatch};

#[derive(Parser, Debug)]
#[command(name = "overlay-cli")]
#[command(about = "Render a wind arrow overlay for a map viewport")]
struct Args {
    /// View descriptor, `zoom/lat/lon` (a leading '#' is accepted)
    #[arg(long)]
    view: String,

    /// Viewport width in pixels
    #[arg(long, default_value = "1024")]
    width: u32,

    /// Viewport height in pixels
    #[arg(long, default_value = "768")]
    height: u32,

    /// Forecast offset in hours (0-24, rounded to 2-hour steps)
    #[arg(long, default_value = "0")]
    offset_hours: f64,

    /// Arrow density level (1-10)
    #[arg(long, default_value = "5")]
    density: f64,

    /// Output PNG path
    #[arg(short, long, default_value = "wind-overlay.png")]
    output: PathBuf,

    /// Optional YAML config overriding the built-in defaults
    #[arg(long, env = "OVERLAY_CONFIG")]
    config: Option<PathBuf>,

    /// Print the final UI state as JSON
    #[arg(long)]
    json: bool,

    /// Log level
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let args = Args::parse();

    let level = match args.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };
    let subscriber = FmtSubscriber::builder().with_max_level(level).finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let config = match &args.config {
        Some(path) => OverlayConfig::from_yaml_file(path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => OverlayConfig::default(),
    };

    let resolver = GeoResolver::new();
    let snapshot = ViewportSnapshot {
        location_fragment: Some(&args.view),
        container: Some(PixelRect::new(
            0.0,
            0.0,
            args.width as f64,
            args.height as f64,
        )),
        request_3d: false,
    };
    let context = resolver
        .resolve(&snapshot)
        .ok_or_else(|| anyhow!("could not resolve a viewport from {:?}", args.view))?;
    info!(bounds = ?context.bounds, "resolved derived viewport");

    let timeout = Duration::from_millis(config.fetch.request_timeout_ms);
    let transport = Arc::new(ReqwestTransport::new(timeout).map_err(|err| anyhow!("{err}"))?);
    let session = Session::new(config, Arc::new(FixedViewport(context)), transport);

    session
        .apply_settings(SettingsPatch {
            enabled: Some(true),
            offset_hours: Some(args.offset_hours),
            density_level: Some(args.density),
        })
        .await;
    session.refresh(RefreshOptions::manual_refresh()).await;

    let state = session.ui_state().await;
    if args.json {
        println!("{}", serde_json::to_string_pretty(&state)?);
    } else {
        println!("{} ({})", state.status_text, state.forecast_text);
    }

    match session.frame_png().await {
        Some(png) => {
            tokio::fs::write(&args.output, &png)
                .await
                .with_context(|| format!("writing {}", args.output.display()))?;
            info!(path = %args.output.display(), bytes = png.len(), "wrote overlay");
            Ok(())
        }
        None => Err(anyhow!("no overlay was rendered: {}", state.status_text)),
    }
}
