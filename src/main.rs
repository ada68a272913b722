//! tablerest CLI entry point
//!
//! Sets up logging, then hands off to `cli::run`. Errors are printed to
//! stderr and the process exits non-zero.

use tablerest::cli;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("tablerest=info,tower_http=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = cli::run().await {
        eprintln!("{}: {}", e.code(), e);
        std::process::exit(1);
    }
}
