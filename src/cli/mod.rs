//! CLI module for tablerest
//!
//! Provides command-line interface for:
//! - serve: Start the HTTP server
//! - compile: Print the statement one request compiles to

mod args;
mod commands;
mod errors;

pub use args::{Cli, Command, Method};
pub use commands::{compile, load_config, run_command, serve, CompileRequest, ServeOverrides};
pub use errors::{CliError, CliResult};

/// Parse arguments and run the selected command
pub async fn run() -> CliResult<()> {
    let cli = Cli::parse_args();
    run_command(cli.command).await
}
