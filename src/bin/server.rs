//! kvgate Server Binary
//!
//! Opens the storage engine and serves the line protocol over TCP.

use std::path::PathBuf;

use clap::Parser;
use kvgate::config::{ConfigBuilder, EngineKind};
use kvgate::network::Server;
use kvgate::{storage, CommandProcessor, Config};
use tracing_subscriber::{fmt, EnvFilter};

/// kvgate Server
#[derive(Parser, Debug)]
#[command(name = "kvgate-server")]
#[command(about = "Permission-gated key-value command server")]
#[command(version)]
struct Args {
    /// TOML config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Database directory
    #[arg(short, long)]
    data_dir: Option<PathBuf>,

    /// Listen address (host:port)
    #[arg(short, long)]
    listen: Option<String>,

    /// Storage engine: sled or memory
    #[arg(short, long)]
    engine: Option<EngineKind>,

    /// Maximum concurrent connections
    #[arg(short, long)]
    max_connections: Option<usize>,

    /// User bound to every connection
    #[arg(short = 'u', long)]
    default_user: Option<String>,
}

fn main() {
    // Initialize tracing/logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,kvgate=debug"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .init();

    let args = Args::parse();

    let config = match load_config(&args) {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("Invalid configuration: {}", e);
            std::process::exit(1);
        }
    };

    tracing::info!("kvgate Server v{}", kvgate::VERSION);
    tracing::info!("Data directory: {}", config.data_dir.display());
    tracing::info!("Listen address: {}", config.listen_addr);
    match &config.default_user {
        Some(name) => tracing::info!("Connections act as user '{}'", name),
        None => tracing::info!("Connections are anonymous"),
    }

    // Open engine
    let storage = match storage::open(&config) {
        Ok(storage) => storage,
        Err(e) => {
            tracing::error!("Failed to open engine: {}", e);
            std::process::exit(1);
        }
    };

    let processor = CommandProcessor::new(storage.clone());
    let mut server = match Server::new(config, processor) {
        Ok(server) => server,
        Err(e) => {
            tracing::error!("Failed to create server: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = server.bind() {
        tracing::error!("Failed to bind: {}", e);
        std::process::exit(1);
    }

    // Set up Ctrl+C handler
    let shutdown = server.shutdown_handle();
    if let Err(e) = ctrlc::set_handler(move || {
        tracing::info!("Received Ctrl+C, initiating shutdown...");
        shutdown.shutdown();
    }) {
        tracing::warn!("Could not install Ctrl+C handler: {}", e);
    }

    let result = server.run();

    if let Err(e) = storage.close() {
        tracing::error!("Failed to flush engine: {}", e);
    }

    if let Err(e) = result {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }

    tracing::info!("Server stopped");
}

/// Defaults, then the config file, then command-line overrides
fn load_config(args: &Args) -> kvgate::Result<Config> {
    let base = match &args.config {
        Some(path) => Config::from_toml_file(path)?,
        None => Config::default(),
    };

    let mut builder = ConfigBuilder::from_config(base);
    if let Some(dir) = &args.data_dir {
        builder = builder.data_dir(dir);
    }
    if let Some(addr) = &args.listen {
        builder = builder.listen_addr(addr);
    }
    if let Some(engine) = args.engine {
        builder = builder.engine(engine);
    }
    if let Some(count) = args.max_connections {
        builder = builder.max_connections(count);
    }
    if let Some(user) = &args.default_user {
        builder = builder.default_user(Some(user.as_str()));
    }

    let config = builder.build();
    config.validate()?;
    Ok(config)
}
