//! Catalog snapshots loaded from a JSON file
//!
//! The file holds an array of snapshots:
//!
//! ```json
//! [{"database": "prest", "schema": "public",
//!   "relations": {"test": {"name": "test", "kind": "table",
//!                          "columns": [{"name": "name", "data_type": "text"}]}}}]
//! ```

use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use crate::rest_api::identifier::{is_valid_identifier, Identifier, IdentifierKind};
use crate::rest_api::{RestError, RestResult};

use super::catalog::{CatalogProvider, CatalogSnapshot};

/// In-memory catalog keyed by (database, schema)
#[derive(Debug, Clone, Default)]
pub struct StaticCatalog {
    snapshots: Arc<HashMap<(String, String), CatalogSnapshot>>,
}

impl StaticCatalog {
    pub fn new(snapshots: Vec<CatalogSnapshot>) -> Self {
        let snapshots = snapshots
            .into_iter()
            .map(|s| ((s.database.clone(), s.schema.clone()), s))
            .collect();
        Self {
            snapshots: Arc::new(snapshots),
        }
    }

    /// Load snapshots from a JSON file
    pub fn from_file(path: &Path) -> RestResult<Self> {
        let raw = fs::read_to_string(path).map_err(|e| {
            RestError::Catalog(format!("failed to read {}: {}", path.display(), e))
        })?;
        let snapshots: Vec<CatalogSnapshot> = serde_json::from_str(&raw).map_err(|e| {
            RestError::Catalog(format!("failed to parse {}: {}", path.display(), e))
        })?;
        for snapshot in &snapshots {
            check_snapshot(snapshot)
                .map_err(|e| RestError::Catalog(format!("invalid {}: {}", path.display(), e)))?;
        }
        Ok(Self::new(snapshots))
    }

    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    fn lookup(&self, database: &Identifier, schema: &Identifier) -> RestResult<CatalogSnapshot> {
        let key = (database.to_string(), schema.to_string());
        if let Some(snapshot) = self.snapshots.get(&key) {
            return Ok(snapshot.clone());
        }

        let database_known = self.snapshots.keys().any(|(db, _)| db == database.as_str());
        if database_known {
            Err(RestError::unknown_identifier(
                IdentifierKind::Schema,
                schema.as_str(),
                format!("database {}", database),
            ))
        } else {
            Err(RestError::unknown_identifier(
                IdentifierKind::Database,
                database.as_str(),
                "catalog",
            ))
        }
    }
}

/// Relation names reach SQL text as written, so they must match their key
/// and the identifier grammar
fn check_snapshot(snapshot: &CatalogSnapshot) -> Result<(), String> {
    for name in [&snapshot.database, &snapshot.schema] {
        if !is_valid_identifier(name) {
            return Err(format!("{:?} is not a valid identifier", name));
        }
    }
    for (key, relation) in &snapshot.relations {
        if key != &relation.name {
            return Err(format!(
                "relation {:?} is stored under key {:?}",
                relation.name, key
            ));
        }
        if !is_valid_identifier(&relation.name) {
            return Err(format!("{:?} is not a valid identifier", relation.name));
        }
    }
    Ok(())
}

impl CatalogProvider for StaticCatalog {
    async fn snapshot(
        &self,
        database: &Identifier,
        schema: &Identifier,
    ) -> RestResult<CatalogSnapshot> {
        self.lookup(database, schema)
    }
}
