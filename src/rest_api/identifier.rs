//! # Identifier Validation
//!
//! Every database, schema, table and column name that reaches SQL text goes
//! through this module. Names must match `^[A-Za-z_][A-Za-z0-9_]*$` and are
//! only ever emitted double-quoted.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

use crate::schema::SchemaContext;

use super::errors::{RestError, RestResult};

static IDENTIFIER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("identifier pattern"));

/// What an identifier names
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum IdentifierKind {
    Database,
    Schema,
    Table,
    Column,
    Alias,
}

impl IdentifierKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            IdentifierKind::Database => "database",
            IdentifierKind::Schema => "schema",
            IdentifierKind::Table => "table",
            IdentifierKind::Column => "column",
            IdentifierKind::Alias => "alias",
        }
    }
}

impl fmt::Display for IdentifierKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Check the lexical rule only
pub fn is_valid_identifier(name: &str) -> bool {
    IDENTIFIER_RE.is_match(name)
}

/// A lexically valid name
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Identifier {
    name: String,
    kind: IdentifierKind,
}

impl Identifier {
    /// Parse a name, rejecting anything outside the identifier grammar
    pub fn parse(name: &str, kind: IdentifierKind) -> RestResult<Self> {
        if !is_valid_identifier(name) {
            return Err(RestError::invalid_identifier(kind, name));
        }
        Ok(Self {
            name: name.to_string(),
            kind,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> IdentifierKind {
        self.kind
    }

    /// Render as a quoted SQL identifier
    pub fn quoted(&self) -> String {
        // the grammar excludes `"`, so no escaping is needed
        format!("\"{}\"", self.name)
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// Validate a name lexically and against the request's catalog snapshot.
///
/// Database and schema names must equal the ones the context was resolved
/// for, tables must exist in the snapshot, and columns must exist on the
/// target relation. Aliases are checked lexically only.
pub fn validate(name: &str, kind: IdentifierKind, ctx: &SchemaContext) -> RestResult<Identifier> {
    let ident = Identifier::parse(name, kind)?;
    let name = ident.as_str();

    let known = match ident.kind() {
        IdentifierKind::Database => ctx.database().is_some_and(|db| db.as_str() == name),
        IdentifierKind::Schema => ctx.schema().is_some_and(|s| s.as_str() == name),
        IdentifierKind::Table => ctx.relation(name).is_some(),
        IdentifierKind::Column => ctx.target().column(name).is_some(),
        IdentifierKind::Alias => true,
    };

    if !known {
        return Err(RestError::unknown_identifier(ident.kind(), name, ctx.scope_label()));
    }
    Ok(ident)
}

/// A possibly qualified column reference such as `name` or `test.name`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnRef {
    pub qualifier: Option<Identifier>,
    pub column: Identifier,
}

impl ColumnRef {
    /// Parse `column` or `qualifier.column`
    pub fn parse(raw: &str) -> RestResult<Self> {
        let mut parts = raw.split('.');
        let first = parts.next().unwrap_or_default();
        match (parts.next(), parts.next()) {
            (None, _) => Ok(Self {
                qualifier: None,
                column: Identifier::parse(first, IdentifierKind::Column)?,
            }),
            (Some(second), None) => Ok(Self {
                qualifier: Some(Identifier::parse(first, IdentifierKind::Alias)?),
                column: Identifier::parse(second, IdentifierKind::Column)?,
            }),
            _ => Err(RestError::invalid_identifier(IdentifierKind::Column, raw)),
        }
    }

    pub fn is_qualified(&self) -> bool {
        self.qualifier.is_some()
    }

    /// Render as quoted SQL
    pub fn render(&self) -> String {
        match &self.qualifier {
            Some(q) => format!("{}.{}", q.quoted(), self.column.quoted()),
            None => self.column.quoted(),
        }
    }
}

impl fmt::Display for ColumnRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.qualifier {
            Some(q) => write!(f, "{}.{}", q, self.column),
            None => write!(f, "{}", self.column),
        }
    }
}
