use std::path::PathBuf;

use clap::Parser;
use libris_server::ServerBuilder;
use libris_server::config::loader::{DEFAULT_CONFIG_PATH, load_config};

/// Libris OAuth 2.0 authorization server.
#[derive(Debug, Parser)]
#[command(name = "libris-server", version, about)]
struct Cli {
    /// Configuration file (TOML). Defaults to libris.toml when present.
    #[arg(long, env = "LIBRIS_CONFIG")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() {
    // Load .env file if present (before anything else)
    if let Err(e) = dotenvy::dotenv() {
        if !matches!(e, dotenvy::Error::Io(ref io_err) if io_err.kind() == std::io::ErrorKind::NotFound) {
            eprintln!("Warning: Failed to load .env file: {e}");
        }
    }

    // Initialize tracing early with the default level
    libris_server::observability::init_tracing();

    let cli = Cli::parse();

    let cfg = match load_config(cli.config.as_deref()) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Configuration error: {e}");
            std::process::exit(2);
        }
    };

    let path = cli
        .config
        .as_deref()
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string());
    tracing::info!(path = %path, "Configuration loaded");

    libris_server::observability::apply_logging_level(&cfg.logging.level);

    let server = match ServerBuilder::new().with_config(cfg).build().await {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Server initialization failed: {e}");
            std::process::exit(2);
        }
    };

    if let Err(err) = server.run().await {
        eprintln!("Server error: {err}");
        std::process::exit(1);
    }
}
