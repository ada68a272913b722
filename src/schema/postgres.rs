//! PostgreSQL catalog introspection

use sqlx::postgres::PgPool;
use sqlx::Row;
use tracing::debug;

use crate::rest_api::identifier::{Identifier, IdentifierKind};
use crate::rest_api::{RestError, RestResult};

use super::catalog::{CatalogProvider, CatalogSnapshot, ColumnInfo, RelationInfo, RelationKind};

const RELATIONS_SQL: &str = "SELECT c.table_name::text AS relation, t.table_type::text AS table_type, \
     c.column_name::text AS column_name, c.udt_name::text AS udt_name \
     FROM information_schema.columns c \
     INNER JOIN information_schema.tables t \
       ON t.table_schema = c.table_schema AND t.table_name = c.table_name \
     WHERE c.table_catalog = $1 AND c.table_schema = $2 \
     ORDER BY c.table_name, c.ordinal_position";

const SCHEMA_EXISTS_SQL: &str =
    "SELECT EXISTS (SELECT 1 FROM information_schema.schemata WHERE catalog_name = $1 AND schema_name = $2)";

/// Catalog backed by a live PostgreSQL connection pool.
///
/// A pool is bound to one database, so a request naming any other database
/// is rejected as unknown.
#[derive(Debug, Clone)]
pub struct PgCatalog {
    pool: PgPool,
}

impl PgCatalog {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn current_database(&self) -> RestResult<String> {
        sqlx::query_scalar::<_, String>("SELECT current_database()::text")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| RestError::Catalog(e.to_string()))
    }
}

impl CatalogProvider for PgCatalog {
    async fn snapshot(
        &self,
        database: &Identifier,
        schema: &Identifier,
    ) -> RestResult<CatalogSnapshot> {
        let current = self.current_database().await?;
        if current != database.as_str() {
            return Err(RestError::unknown_identifier(
                IdentifierKind::Database,
                database.as_str(),
                "server",
            ));
        }

        let exists: bool = sqlx::query_scalar(SCHEMA_EXISTS_SQL)
            .bind(database.as_str())
            .bind(schema.as_str())
            .fetch_one(&self.pool)
            .await
            .map_err(|e| RestError::Catalog(e.to_string()))?;
        if !exists {
            return Err(RestError::unknown_identifier(
                IdentifierKind::Schema,
                schema.as_str(),
                format!("database {}", database),
            ));
        }

        let rows = sqlx::query(RELATIONS_SQL)
            .bind(database.as_str())
            .bind(schema.as_str())
            .fetch_all(&self.pool)
            .await
            .map_err(|e| RestError::Catalog(e.to_string()))?;

        let mut snapshot = CatalogSnapshot::new(database.as_str(), schema.as_str());
        for row in rows {
            let relation: String = row.try_get("relation").map_err(catalog_err)?;
            let table_type: String = row.try_get("table_type").map_err(catalog_err)?;
            let column: String = row.try_get("column_name").map_err(catalog_err)?;
            let udt: Option<String> = row.try_get("udt_name").map_err(catalog_err)?;

            let kind = if table_type == "VIEW" {
                RelationKind::View
            } else {
                RelationKind::Table
            };
            snapshot
                .relations
                .entry(relation.clone())
                .or_insert_with(|| RelationInfo {
                    name: relation,
                    kind,
                    columns: Vec::new(),
                })
                .columns
                .push(ColumnInfo {
                    name: column,
                    data_type: udt,
                });
        }

        debug!(
            database = %database,
            schema = %schema,
            relations = snapshot.relations.len(),
            "catalog snapshot loaded"
        );
        Ok(snapshot)
    }
}

fn catalog_err(e: sqlx::Error) -> RestError {
    RestError::Catalog(e.to_string())
}
