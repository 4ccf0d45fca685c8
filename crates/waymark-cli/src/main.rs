//! Waymark CLI - drives the offline shell cache and the POI scene.
//!
//! One-shot commands for installing and inspecting the shell cache, running
//! single requests through the strategy engine, and previewing the visible
//! point set around a fix.

use std::io;
use std::path::Path;
use std::sync::Arc;

use anyhow::Result;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use waymark_core::cache::{
    CacheManager, CacheStore, ControlMessage, ControlReply, ShellManifest, Strategy, SyncQueue,
};
use waymark_core::fetch::{url_origin, url_path, Destination, FetchMode, HttpFetcher, ResourceRequest};
use waymark_core::geo::{GeoPosition, PoiScene, PointOfInterest, SensorEvent};
use waymark_core::Config;

/// Initialize the tracing subscriber for logging
fn init_tracing() {
    // Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug)
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(filter)
        .init();
}

fn print_usage() {
    eprintln!("Usage: waymark <command>");
    eprintln!();
    eprintln!("Commands:");
    eprintln!("  install [manifest.json]   Populate and activate the shell cache");
    eprintln!("  fetch <url>               Run one request through the strategy engine");
    eprintln!("  version                   Print the active cache generation");
    eprintln!("  nearby <lat> <lng>        Preview visible demo points around a fix");
    eprintln!("  sync                      Replay deferred requests");
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();
    init_tracing();

    let args: Vec<String> = std::env::args().collect();
    match args.get(1).map(String::as_str) {
        Some("install") => install(args.get(2).map(String::as_str)).await,
        Some("fetch") => match args.get(2) {
            Some(url) => fetch(url).await,
            None => {
                print_usage();
                Ok(())
            }
        },
        Some("version") => version(),
        Some("nearby") => match (args.get(2), args.get(3)) {
            (Some(lat), Some(lng)) => nearby(lat, lng),
            _ => {
                print_usage();
                Ok(())
            }
        },
        Some("sync") => sync_flush().await,
        _ => {
            print_usage();
            Ok(())
        }
    }
}

fn open_manager(config: &Config) -> Result<CacheManager> {
    let store = CacheStore::new(config.cache_dir()?)?;
    let fetcher = Arc::new(HttpFetcher::new()?);
    CacheManager::new(store, fetcher, config.scope())
}

async fn install(manifest_path: Option<&str>) -> Result<()> {
    let config = Config::load()?;
    let mut manager = open_manager(&config)?;

    let manifest = match manifest_path {
        Some(path) => ShellManifest::load(Path::new(path))?,
        None => ShellManifest::default_shell(),
    };

    info!(version = %manifest.version, "Installing shell cache");
    let stored = manager.install(&manifest).await?;
    // One-shot runs have no long-lived clients to wait for: skip straight
    // to activation.
    let _ = manager.on_message(ControlMessage::SkipWaiting)?;

    println!(
        "Installed generation {} ({} of {} resources cached)",
        manifest.version,
        stored,
        manifest.resources.len()
    );
    Ok(())
}

async fn fetch(url: &str) -> Result<()> {
    let config = Config::load()?;
    let manager = open_manager(&config)?;

    let mode = if url_origin(url) == config.origin {
        FetchMode::Cors
    } else {
        FetchMode::NoCors
    };
    let request =
        ResourceRequest::get(url, Destination::guess(url_path(url))).with_mode(mode);

    let strategy = Strategy::select(&request);
    let outcome = manager.handle(&request).await?;

    println!("strategy: {}", strategy.name());
    println!("source:   {:?}", outcome.source);
    println!("status:   {}", outcome.response.status);
    println!("bytes:    {}", outcome.response.body.len());
    Ok(())
}

fn version() -> Result<()> {
    let config = Config::load()?;
    let mut manager = open_manager(&config)?;

    match manager.on_message(ControlMessage::GetVersion)? {
        Some(ControlReply::Version(Some(version))) => println!("{}", version),
        _ => println!("no generation active"),
    }
    Ok(())
}

fn nearby(lat: &str, lng: &str) -> Result<()> {
    let config = Config::load()?;
    let latitude: f64 = lat.parse()?;
    let longitude: f64 = lng.parse()?;
    let fix = GeoPosition::new(latitude, longitude);

    let mut scene = PoiScene::new(PointOfInterest::demo_set(&fix), config.range());
    scene.on_event(SensorEvent::Position(fix));

    println!("{} points visible from {:.4}, {:.4}:", scene.visible().len(), latitude, longitude);
    for projected in scene.visible() {
        println!(
            "  {} {:<12} {:>6.0} m  scale {:.2}",
            projected.point.icon, projected.point.name, projected.distance, projected.scale
        );
    }
    Ok(())
}

async fn sync_flush() -> Result<()> {
    let config = Config::load()?;
    let mut queue = SyncQueue::open(config.sync_queue_path()?)?;
    if queue.is_empty() {
        println!("sync queue empty");
        return Ok(());
    }

    let fetcher = HttpFetcher::new()?;
    let report = queue.flush(&fetcher).await?;
    println!("replayed {} request(s), {} still queued", report.replayed, report.remaining);
    Ok(())
}
