//! CLI argument definitions using clap
//!
//! Commands:
//! - tablerest serve [--config <path>] [--host] [--port] [--database-url]
//!   [--catalog <path>] [--dry-run]
//! - tablerest compile --catalog <path> --database <db> --schema <schema>
//!   --table <table> [--method GET] [--query <qs>] [--body <json>]

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// tablerest - PostgreSQL tables over HTTP
#[derive(Parser, Debug)]
#[command(name = "tablerest")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Start the HTTP server
    Serve {
        /// Path to configuration file
        #[arg(long)]
        config: Option<PathBuf>,

        /// Host to bind to
        #[arg(long)]
        host: Option<String>,

        /// Port to bind to
        #[arg(long)]
        port: Option<u16>,

        /// PostgreSQL connection string
        #[arg(long, env = "DATABASE_URL", hide_env_values = true)]
        database_url: Option<String>,

        /// JSON catalog file used instead of querying the database
        #[arg(long)]
        catalog: Option<PathBuf>,

        /// Return compiled statements instead of executing them
        #[arg(long)]
        dry_run: bool,
    },

    /// Compile one request against a catalog file and print the statement
    Compile {
        /// JSON catalog file
        #[arg(long)]
        catalog: PathBuf,

        #[arg(long)]
        database: String,

        #[arg(long)]
        schema: String,

        #[arg(long)]
        table: String,

        /// Request method
        #[arg(long, value_enum, default_value_t = Method::Get)]
        method: Method,

        /// Query string, e.g. `name=$eq.nuveo&_order=-id`
        #[arg(long, default_value = "")]
        query: String,

        /// JSON body for POST, PUT and PATCH
        #[arg(long)]
        body: Option<String>,
    },
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
#[value(rename_all = "UPPER")]
pub enum Method {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}
