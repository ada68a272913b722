//! System listings over `pg_catalog`
//!
//! The two listing routes do not address a user relation. They select from
//! fixed catalog joins whose filterable columns are enumerated here as
//! qualified names (`c.relname`, `t.tablename`, ...).

use super::catalog::{ColumnInfo, RelationInfo, RelationKind};

/// A fixed catalog query shape
#[derive(Debug, Clone, Copy)]
pub struct SystemRelation {
    pub name: &'static str,
    /// FROM clause body, including joins
    pub from: &'static str,
    /// Projection used when no `_select` is given
    pub projection: &'static str,
    /// Parameterless condition always applied
    pub condition: Option<&'static str>,
    /// Filterable columns with their type names
    pub columns: &'static [(&'static str, Option<&'static str>)],
}

impl SystemRelation {
    /// Catalog view of this listing, used for identifier validation
    pub fn relation_info(&self) -> RelationInfo {
        RelationInfo {
            name: self.name.to_string(),
            kind: RelationKind::System,
            columns: self
                .columns
                .iter()
                .map(|(name, data_type)| ColumnInfo {
                    name: name.to_string(),
                    data_type: data_type.map(str::to_string),
                })
                .collect(),
        }
    }
}

/// Every user-visible relation of the connected database
pub const TABLES: SystemRelation = SystemRelation {
    name: "tables",
    from: "pg_catalog.pg_class c LEFT JOIN pg_catalog.pg_namespace n ON n.oid = c.relnamespace",
    projection: "n.nspname AS \"schema\", c.relname AS \"name\", \
        CASE c.relkind WHEN 'r' THEN 'table' WHEN 'v' THEN 'view' \
        WHEN 'm' THEN 'materialized_view' WHEN 'S' THEN 'sequence' \
        WHEN 'f' THEN 'foreign_table' END AS \"type\", \
        pg_catalog.pg_get_userbyid(c.relowner) AS \"owner\"",
    condition: Some(
        "c.relkind IN ('r', 'v', 'm', 'S', 'f') AND n.nspname !~ '^pg_toast' \
        AND n.nspname NOT IN ('information_schema', 'pg_catalog')",
    ),
    columns: &[
        ("c.relname", Some("name")),
        ("c.relkind", None),
        ("c.reltuples", Some("float4")),
        ("n.nspname", Some("name")),
    ],
};

/// Tables of one database+schema; the handler binds both as predicates
pub const SCHEMA_TABLES: SystemRelation = SystemRelation {
    name: "schema_tables",
    from: "pg_catalog.pg_tables t \
        INNER JOIN information_schema.schemata sc ON sc.schema_name = t.schemaname",
    projection: "t.tablename AS \"name\", t.schemaname AS \"schema\", \
        sc.catalog_name AS \"database\", t.tableowner AS \"owner\"",
    condition: None,
    columns: &[
        ("t.tablename", Some("name")),
        ("t.schemaname", Some("name")),
        ("t.tableowner", Some("name")),
        ("t.hasindexes", Some("bool")),
        ("t.hasrules", Some("bool")),
        ("t.hastriggers", Some("bool")),
        ("sc.catalog_name", Some("name")),
    ],
};
