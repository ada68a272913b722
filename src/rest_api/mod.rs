//! # REST API Module
//!
//! Translates HTTP requests on `/{database}/{schema}/{table}` into
//! parameterized PostgreSQL statements. Every identifier that reaches SQL
//! text is checked lexically and against a catalog snapshot first; every
//! user value travels as a bound argument.

pub mod deadline;
pub mod errors;
pub mod filter;
pub mod handler;
pub mod identifier;
pub mod join;
pub mod parser;
pub mod response;
pub mod server;
pub mod statement;

pub use deadline::RequestDeadline;
pub use errors::{ErrorResponse, RestError, RestResult};
pub use filter::{FilterOperator, FilterPredicate};
pub use handler::{HandlerConfig, Operation, RelationPath, TableHandler};
pub use identifier::{ColumnRef, Identifier, IdentifierKind};
pub use join::{JoinDescriptor, JoinKind};
pub use parser::{PaginationPolicy, QueryParams};
pub use server::RestServer;
pub use statement::{CompiledStatement, SqlValue, StatementAssembler, StatementKind};
