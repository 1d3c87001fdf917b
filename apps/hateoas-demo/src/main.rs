mod resources;

use std::net::{Ipv4Addr, SocketAddr};
use std::path::PathBuf;

use anyhow::{Context, Result};
use axum::Extension;
use clap::Parser;
use modkit_hateoas::{Hypermedia, HypermediaConfig};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

/// Hypermedia demo server - orders and customers with HATEOAS links
#[derive(Parser)]
#[command(name = "hateoas-demo")]
#[command(about = "Hypermedia demo server - orders and customers with HATEOAS links")]
#[command(version)]
struct Cli {
    /// Path to configuration file (YAML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Port for the HTTP server
    #[arg(short, long, default_value_t = 8087)]
    port: u16,

    /// Validate and print the effective configuration (JSON), then exit
    #[arg(long)]
    print_config: bool,

    /// Log verbosity level (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Emit logs as JSON lines
    #[arg(long)]
    json_logs: bool,
}

fn init_logging(verbose: u8, json: bool) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if json {
        builder.json().with_target(true).init();
    } else {
        builder.with_target(false).init();
    }
}

async fn shutdown_signal(token: CancellationToken) {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
        return;
    }
    tracing::info!("shutdown requested");
    token.cancel();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.json_logs);

    // Layered config: defaults -> YAML (if provided) -> env (HATEOAS__*)
    let config = HypermediaConfig::load(cli.config.as_deref()).context("loading configuration")?;

    let hypermedia = Hypermedia::from_config(&config, resources::registrations()?)?;
    hypermedia
        .registry()
        .validate(&resources::resource_types())?;

    if cli.print_config {
        println!("{}", serde_json::to_string_pretty(&config)?);
        return Ok(());
    }

    // Request extensions carry the shutdown token so in-flight link
    // generation stops writing to the cache once shutdown begins.
    let shutdown = CancellationToken::new();
    let app = resources::router(&hypermedia, resources::Store::seeded())?
        .layer(Extension(shutdown.clone()));

    let addr = SocketAddr::from((Ipv4Addr::UNSPECIFIED, cli.port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    tracing::info!(%addr, "hateoas demo listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(shutdown))
        .await?;

    tracing::info!("server stopped");
    Ok(())
}
