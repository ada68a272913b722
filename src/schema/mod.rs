//! Schema catalog subsystem
//!
//! The catalog is the live list of relations (tables and views) and their
//! columns for one database+schema pair. It is fetched once per request and
//! treated as an immutable snapshot for the rest of that request.
//!
//! # Providers
//!
//! - `PgCatalog` - introspects PostgreSQL through `information_schema`
//! - `StaticCatalog` - snapshots loaded from a JSON file (offline / dry-run)

mod catalog;
mod postgres;
mod static_catalog;
pub mod system;

pub use catalog::{
    BoundColumn, CatalogProvider, CatalogSnapshot, ColumnInfo, RelationInfo, RelationKind,
    SchemaContext,
};
pub use postgres::PgCatalog;
pub use static_catalog::StaticCatalog;
