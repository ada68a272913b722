//! Catalog snapshot types and the provider seam

use std::collections::BTreeMap;
use std::future::Future;

use serde::{Deserialize, Serialize};

use crate::rest_api::identifier::{is_valid_identifier, ColumnRef, Identifier, IdentifierKind};
use crate::rest_api::{RestError, RestResult};

/// Source of catalog snapshots.
///
/// Implementations must return `UnknownIdentifier` errors for a database or
/// schema that does not exist, and `Catalog` errors when introspection
/// itself fails.
pub trait CatalogProvider: Send + Sync + 'static {
    /// Fetch every relation of `database`.`schema` with its columns
    fn snapshot(
        &self,
        database: &Identifier,
        schema: &Identifier,
    ) -> impl Future<Output = RestResult<CatalogSnapshot>> + Send;
}

/// Kind of relation addressed by a request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RelationKind {
    Table,
    View,
    /// Fixed listing over `pg_catalog`; columns are qualified names
    System,
}

/// Column entry in the catalog
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnInfo {
    pub name: String,

    /// PostgreSQL type name (`udt_name`), used to cast bound values
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_type: Option<String>,
}

impl ColumnInfo {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data_type: None,
        }
    }

    pub fn typed(name: impl Into<String>, data_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data_type: Some(data_type.into()),
        }
    }

    /// Whether the column holds a PostgreSQL array
    pub fn is_array(&self) -> bool {
        self.data_type.as_deref().is_some_and(|t| t.starts_with('_'))
    }
}

/// A table, view or system listing with its columns
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationInfo {
    pub name: String,
    pub kind: RelationKind,
    pub columns: Vec<ColumnInfo>,
}

impl RelationInfo {
    pub fn table(name: impl Into<String>, columns: Vec<ColumnInfo>) -> Self {
        Self {
            name: name.into(),
            kind: RelationKind::Table,
            columns,
        }
    }

    pub fn view(name: impl Into<String>, columns: Vec<ColumnInfo>) -> Self {
        Self {
            name: name.into(),
            kind: RelationKind::View,
            columns,
        }
    }

    pub fn column(&self, name: &str) -> Option<&ColumnInfo> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn is_system(&self) -> bool {
        self.kind == RelationKind::System
    }
}

/// Relations of one database+schema at one point in time
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogSnapshot {
    pub database: String,
    pub schema: String,
    #[serde(default)]
    pub relations: BTreeMap<String, RelationInfo>,
}

impl CatalogSnapshot {
    pub fn new(database: impl Into<String>, schema: impl Into<String>) -> Self {
        Self {
            database: database.into(),
            schema: schema.into(),
            relations: BTreeMap::new(),
        }
    }

    pub fn with_relation(mut self, relation: RelationInfo) -> Self {
        self.relations.insert(relation.name.clone(), relation);
        self
    }

    pub fn relation(&self, name: &str) -> Option<&RelationInfo> {
        self.relations.get(name)
    }
}

/// A column reference resolved against the catalog
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoundColumn {
    /// Quoted SQL rendering
    pub sql: String,
    pub info: ColumnInfo,
}

impl BoundColumn {
    /// Placeholder text for a value compared against this column
    pub fn placeholder(&self, index: usize) -> String {
        match self.info.data_type.as_deref() {
            Some(t) if is_valid_identifier(t) => format!("${}::{}", index, t),
            _ => format!("${}", index),
        }
    }
}

/// The resolved target of one request
#[derive(Debug, Clone)]
pub struct SchemaContext {
    database: Option<Identifier>,
    schema: Option<Identifier>,
    target: RelationInfo,
    snapshot: CatalogSnapshot,
}

impl SchemaContext {
    /// Resolve `table` inside a snapshot
    pub fn for_relation(snapshot: CatalogSnapshot, table: &Identifier) -> RestResult<Self> {
        let target = snapshot.relation(table.as_str()).cloned().ok_or_else(|| {
            RestError::unknown_identifier(
                IdentifierKind::Table,
                table.as_str(),
                format!("schema {}.{}", snapshot.database, snapshot.schema),
            )
        })?;

        Ok(Self {
            database: Some(Identifier::parse(&snapshot.database, IdentifierKind::Database)?),
            schema: Some(Identifier::parse(&snapshot.schema, IdentifierKind::Schema)?),
            target,
            snapshot,
        })
    }

    /// Context for a system listing, optionally scoped to a database+schema
    pub fn listing(target: RelationInfo, scope: Option<CatalogSnapshot>) -> RestResult<Self> {
        let snapshot = scope.unwrap_or_default();
        let (database, schema) = if snapshot.database.is_empty() {
            (None, None)
        } else {
            (
                Some(Identifier::parse(&snapshot.database, IdentifierKind::Database)?),
                Some(Identifier::parse(&snapshot.schema, IdentifierKind::Schema)?),
            )
        };
        Ok(Self {
            database,
            schema,
            target,
            snapshot,
        })
    }

    pub fn database(&self) -> Option<&Identifier> {
        self.database.as_ref()
    }

    pub fn schema(&self) -> Option<&Identifier> {
        self.schema.as_ref()
    }

    pub fn target(&self) -> &RelationInfo {
        &self.target
    }

    /// Look up any relation of the snapshot
    pub fn relation(&self, name: &str) -> Option<&RelationInfo> {
        self.snapshot.relation(name)
    }

    /// Human readable scope used in error details
    pub fn scope_label(&self) -> String {
        match (&self.database, &self.schema) {
            (Some(db), Some(schema)) => format!("{}.{}.{}", db, schema, self.target.name),
            _ => self.target.name.clone(),
        }
    }

    /// `"schema"."table"` for catalog relations
    pub fn qualified_target(&self) -> String {
        match &self.schema {
            Some(schema) => format!("{}.\"{}\"", schema.quoted(), self.target.name),
            None => format!("\"{}\"", self.target.name),
        }
    }

    /// Resolve a column reference against the target and the joined table.
    ///
    /// When a join is present unqualified columns are rendered qualified by
    /// the target name so they stay unambiguous.
    pub fn resolve_column(
        &self,
        col: &ColumnRef,
        joined: Option<&RelationInfo>,
    ) -> RestResult<BoundColumn> {
        if self.target.is_system() {
            let key = col.to_string();
            return match self.target.column(&key) {
                Some(info) => Ok(BoundColumn {
                    sql: col.render(),
                    info: info.clone(),
                }),
                None => Err(self.unknown_column(&key)),
            };
        }

        let (relation, name) = match &col.qualifier {
            None => (&self.target, col.column.as_str()),
            Some(q) if q.as_str() == self.target.name => (&self.target, col.column.as_str()),
            Some(q) => match joined.filter(|j| j.name == q.as_str()) {
                Some(j) => (j, col.column.as_str()),
                None => {
                    return Err(RestError::unknown_identifier(
                        IdentifierKind::Table,
                        q.as_str(),
                        self.scope_label(),
                    ))
                }
            },
        };

        let info = relation
            .column(name)
            .ok_or_else(|| self.unknown_column(&col.to_string()))?;

        let sql = if col.is_qualified() || joined.is_some() {
            format!("\"{}\".{}", relation.name, col.column.quoted())
        } else {
            col.column.quoted()
        };

        Ok(BoundColumn {
            sql,
            info: info.clone(),
        })
    }

    fn unknown_column(&self, name: &str) -> RestError {
        RestError::unknown_identifier(IdentifierKind::Column, name, self.scope_label())
    }
}
