//! # HTTP Server Module
//!
//! Configuration and bootstrap for the table API.
//!
//! # Endpoints
//!
//! - `/health` - Health check
//! - `/tables` - Relations of the connected database
//! - `/:database/:schema` - Tables of one schema
//! - `/:database/:schema/:table` - Select, insert, update and delete

pub mod config;
pub mod server;

pub use config::{ConfigError, ServerConfig};
pub use server::{build_router, HttpServer, ServerError};
