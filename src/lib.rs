//! tablerest - PostgreSQL tables and views as HTTP resources
//!
//! Query strings are compiled into parameterized SQL after every identifier
//! has been checked against a per-request catalog snapshot.

pub mod cli;
pub mod executor;
pub mod http_server;
pub mod rest_api;
pub mod schema;
