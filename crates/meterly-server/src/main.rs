//! Meterly server binary
//!
//! Usage:
//!   meterly-server --db meterly.db --port 3000

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use meterly_core::Database;
use meterly_server::{serve, ServerConfig};

#[derive(Parser)]
#[command(name = "meterly-server", about = "Usage analytics and alerting server")]
struct Cli {
    /// Path to the SQLite database file
    #[arg(long, default_value = "meterly.db")]
    db: String,

    /// Host to bind
    #[arg(long, default_value = "127.0.0.1")]
    host: String,

    /// Port to listen on
    #[arg(long, default_value_t = 3000)]
    port: u16,

    /// Allowed CORS origin (repeatable)
    #[arg(long = "allow-origin")]
    allowed_origins: Vec<String>,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging
    // Priority: RUST_LOG env var > --verbose flag > default (info)
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).compact())
        .init();

    let db = Database::new(&cli.db)?;

    let config = ServerConfig {
        allowed_origins: cli.allowed_origins,
    };

    serve(db, &cli.host, cli.port, config).await
}
