//! Route Kernel Driver
//!
//! Builds a network from a JSON description, reduces it, generates k-path
//! route sets and runs one shortest-path round, then writes the network
//! dump and the k-path listing.
//!
//! ## Configuration
//!
//! Arguments:
//! - `<network.json>`: network description (required)
//! - `[config.json]`: generation parameters (defaults otherwise)
//!
//! Environment variables:
//! - `OUTPUT_DIR`: where `netdump.txt` and `kpaths.xml` go (default: `.`)
//! - `DEMAND`: uniform demand per OD pair (default: 1.0)
//! - `RUST_LOG`: Log level filter (default: info)
//! - `LOG_FORMAT`: "json" for structured logs, "pretty" for development (default: json)
//!
//! ## Usage
//!
//! ```bash
//! LOG_FORMAT=pretty cargo run --bin route_kernel --features driver -- net.json config.json
//! ```

use std::fs::{self, File};
use std::io::BufWriter;
use std::path::PathBuf;
use std::time::Instant;

use tracing::{info, warn};
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
};

use route_kernel::{
    write_kpath_listing, write_network_dump, GraphReducer, NetworkDescription, OdMatrix,
    RouteGenConfig, RouteGenerator,
};

/// Initialize the tracing subscriber with JSON or pretty format
fn init_tracing() {
    let log_format = std::env::var("LOG_FORMAT").unwrap_or_else(|_| "json".to_string());

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "route_kernel=info".into());

    if log_format == "pretty" {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(true).with_span_events(FmtSpan::CLOSE))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .json()
                    .with_target(true)
                    .with_current_span(true)
                    .flatten_event(true),
            )
            .init();
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    let version = env!("CARGO_PKG_VERSION");
    info!(version = version, "Starting route kernel");

    let mut args = std::env::args().skip(1);
    let network_path = args
        .next()
        .ok_or("usage: route_kernel <network.json> [config.json]")?;
    let config = match args.next() {
        Some(path) => RouteGenConfig::from_json_str(&fs::read_to_string(path)?)?,
        None => RouteGenConfig {
            emit_listing: true,
            ..RouteGenConfig::default()
        },
    };
    info!(params_hash = %config.params_hash()?, k = config.k_paths, "Configuration loaded");

    let output_dir = PathBuf::from(std::env::var("OUTPUT_DIR").unwrap_or_else(|_| ".".to_string()));
    let demand_value: f64 = std::env::var("DEMAND")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(1.0);

    let started = Instant::now();
    let description = NetworkDescription::from_json(&fs::read_to_string(&network_path)?)?;
    let mut network = description.build()?;
    info!(
        vertices = network.vertex_count(),
        edges = network.edge_count(),
        zones = network.origins().len(),
        "Network loaded"
    );

    let stats = GraphReducer::new().run(&mut network)?;
    info!(
        removed_vertices = stats.removed_vertices,
        removed_edges = stats.removed_edges,
        merged_clusters = stats.merged_clusters,
        "Network reduced"
    );

    let generator = RouteGenerator::new(config)?;
    let demand = OdMatrix::uniform(network.origins().len(), network.destinations().len(), demand_value);
    let mut repository = generator.new_repository(&network);

    let kpaths = generator.calc_k_paths(&network, &mut repository, &demand);
    let round = generator.find_new_paths(&network, &mut repository, &demand);
    if kpaths.skipped_pairs + round.skipped_pairs > 0 {
        warn!(
            skipped = kpaths.skipped_pairs + round.skipped_pairs,
            "Some OD pairs were skipped"
        );
    }

    fs::create_dir_all(&output_dir)?;
    write_network_dump(&network, BufWriter::new(File::create(output_dir.join("netdump.txt"))?))?;
    if generator.config().emit_listing {
        write_kpath_listing(
            &kpaths.records,
            chrono::Utc::now(),
            BufWriter::new(File::create(output_dir.join("kpaths.xml"))?),
        )?;
    }

    info!(
        paths = repository.total_paths(),
        fingerprint = %repository.fingerprint()?,
        latency_ms = started.elapsed().as_millis() as u64,
        "Route generation complete"
    );
    Ok(())
}
