//! # Statement Assembler
//!
//! Merges resolved clause descriptors into one parameterized statement.
//! Literal values never appear in SQL text; each becomes a `$n` placeholder
//! with the value pushed onto the argument list.
//!
//! Clause order: SELECT/COUNT, FROM, JOIN, WHERE, ORDER BY, LIMIT/OFFSET.

use serde::Serialize;
use serde_json::{Map, Value};

use crate::schema::system::SystemRelation;
use crate::schema::{BoundColumn, ColumnInfo, SchemaContext};

use super::errors::{RestError, RestResult};
use super::filter::{Arity, FilterOperator};
use super::identifier::{validate, IdentifierKind};
use super::parser::{CountTarget, ResolvedPredicate, ResolvedQuery};

/// A bound statement argument
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum SqlValue {
    Null,
    Text(String),
    Int(i64),
}

/// How the executor should run a statement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StatementKind {
    /// Rows returned as a JSON array
    Select,
    /// `INSERT ... RETURNING *`, returned as one JSON object
    Insert,
    /// UPDATE or DELETE, returns the affected row count
    Mutation,
}

/// Final SQL text plus its bound arguments
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompiledStatement {
    pub sql: String,
    pub args: Vec<SqlValue>,
    pub kind: StatementKind,
}

/// What a SELECT reads from
#[derive(Debug, Clone, Copy)]
pub enum SelectSource<'a> {
    /// The context's target table or view
    Relation,
    /// A fixed catalog listing
    System(&'a SystemRelation),
}

/// Accumulates arguments and hands out placeholder numbers
#[derive(Debug, Default)]
struct Arguments {
    values: Vec<SqlValue>,
}

impl Arguments {
    fn push(&mut self, value: SqlValue) -> usize {
        self.values.push(value);
        self.values.len()
    }

    fn bind(&mut self, column: &BoundColumn, value: SqlValue, cast: bool) -> String {
        let index = self.push(value);
        if cast {
            column.placeholder(index)
        } else {
            format!("${}", index)
        }
    }
}

/// A JSON object request body mapped to columns
#[derive(Debug, Clone)]
pub struct RowBody(Map<String, Value>);

impl RowBody {
    /// Parse a request body; it must be a non-empty JSON object
    pub fn from_bytes(bytes: &[u8]) -> RestResult<Self> {
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Err(RestError::InvalidBody("body is empty".to_string()));
        }
        let value: Value = serde_json::from_slice(bytes)
            .map_err(|e| RestError::InvalidBody(format!("malformed JSON: {}", e)))?;
        match value {
            Value::Object(map) if !map.is_empty() => Ok(Self(map)),
            Value::Object(_) => Err(RestError::InvalidBody("object has no fields".to_string())),
            _ => Err(RestError::InvalidBody("expected a JSON object".to_string())),
        }
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Builds statements for one request context
pub struct StatementAssembler<'a> {
    ctx: &'a SchemaContext,
}

impl<'a> StatementAssembler<'a> {
    pub fn new(ctx: &'a SchemaContext) -> Self {
        Self { ctx }
    }

    /// Assemble a SELECT (or COUNT) over the given source.
    ///
    /// A count replaces any projection, and ORDER BY / LIMIT / OFFSET are
    /// left out since the result is a single aggregate row.
    pub fn select(
        &self,
        source: SelectSource<'_>,
        query: &ResolvedQuery,
    ) -> RestResult<CompiledStatement> {
        let mut args = Arguments::default();
        let mut sql = String::from("SELECT ");

        match &query.count {
            Some(CountTarget::All) => sql.push_str("COUNT(*)"),
            Some(CountTarget::Column(col)) => sql.push_str(&format!("COUNT({})", col.sql)),
            None => {
                if query.distinct {
                    sql.push_str("DISTINCT ");
                }
                match (&query.projection, source) {
                    (Some(cols), _) => sql.push_str(&join_sql(cols.iter().map(|c| c.sql.as_str()))),
                    (None, SelectSource::Relation) => sql.push('*'),
                    (None, SelectSource::System(system)) => sql.push_str(system.projection),
                }
            }
        }

        sql.push_str(" FROM ");
        match source {
            SelectSource::Relation => sql.push_str(&self.ctx.qualified_target()),
            SelectSource::System(system) => sql.push_str(system.from),
        }

        if let Some(join) = &query.join {
            sql.push_str(&format!(
                " {} {} ON {}",
                join.kind.sql(),
                join.table_sql,
                join.condition
            ));
        }

        let mut conditions = Vec::new();
        if let SelectSource::System(SystemRelation {
            condition: Some(condition),
            ..
        }) = source
        {
            conditions.push(format!("({})", condition));
        }
        for predicate in &query.filters {
            conditions.push(render_predicate(predicate, &mut args)?);
        }
        push_where(&mut sql, &conditions);

        if query.count.is_none() {
            if !query.order.is_empty() {
                let items = query.order.iter().map(|o| {
                    if o.descending {
                        format!("{} DESC", o.column.sql)
                    } else {
                        o.column.sql.clone()
                    }
                });
                sql.push_str(" ORDER BY ");
                sql.push_str(&items.collect::<Vec<_>>().join(", "));
            }

            if let Some(page) = query.page {
                let limit = args.push(SqlValue::Int(to_i64("_page_size", page.limit())?));
                let offset = args.push(SqlValue::Int(to_i64("_page", page.offset())?));
                sql.push_str(&format!(" LIMIT ${} OFFSET ${}", limit, offset));
            }
        }

        Ok(CompiledStatement {
            sql,
            args: args.values,
            kind: StatementKind::Select,
        })
    }

    /// `INSERT INTO ... RETURNING *` from a JSON object body
    pub fn insert(&self, body: &RowBody) -> RestResult<CompiledStatement> {
        let mut args = Arguments::default();
        let mut columns = Vec::with_capacity(body.len());
        let mut values = Vec::with_capacity(body.len());

        for (key, value) in &body.0 {
            let column = self.body_column(key)?;
            values.push(args.bind(&column, json_to_sql(value, &column.info), true));
            columns.push(column.sql);
        }

        Ok(CompiledStatement {
            sql: format!(
                "INSERT INTO {} ({}) VALUES ({}) RETURNING *",
                self.ctx.qualified_target(),
                columns.join(", "),
                values.join(", ")
            ),
            args: args.values,
            kind: StatementKind::Insert,
        })
    }

    /// `UPDATE ... SET ... WHERE ...`
    pub fn update(
        &self,
        body: &RowBody,
        filters: &[ResolvedPredicate],
    ) -> RestResult<CompiledStatement> {
        let mut args = Arguments::default();
        let mut assignments = Vec::with_capacity(body.len());

        for (key, value) in &body.0 {
            let column = self.body_column(key)?;
            let placeholder = args.bind(&column, json_to_sql(value, &column.info), true);
            assignments.push(format!("{} = {}", column.sql, placeholder));
        }

        let mut sql = format!(
            "UPDATE {} SET {}",
            self.ctx.qualified_target(),
            assignments.join(", ")
        );
        let conditions = filters
            .iter()
            .map(|p| render_predicate(p, &mut args))
            .collect::<RestResult<Vec<_>>>()?;
        push_where(&mut sql, &conditions);

        Ok(CompiledStatement {
            sql,
            args: args.values,
            kind: StatementKind::Mutation,
        })
    }

    /// `DELETE FROM ... WHERE ...`
    pub fn delete(&self, filters: &[ResolvedPredicate]) -> RestResult<CompiledStatement> {
        let mut args = Arguments::default();
        let mut sql = format!("DELETE FROM {}", self.ctx.qualified_target());
        let conditions = filters
            .iter()
            .map(|p| render_predicate(p, &mut args))
            .collect::<RestResult<Vec<_>>>()?;
        push_where(&mut sql, &conditions);

        Ok(CompiledStatement {
            sql,
            args: args.values,
            kind: StatementKind::Mutation,
        })
    }

    fn body_column(&self, key: &str) -> RestResult<BoundColumn> {
        let ident = validate(key, IdentifierKind::Column, self.ctx)?;
        let info = self
            .ctx
            .target()
            .column(key)
            .cloned()
            .ok_or_else(|| RestError::unknown_identifier(IdentifierKind::Column, key, self.ctx.scope_label()))?;
        Ok(BoundColumn {
            sql: ident.quoted(),
            info,
        })
    }
}

fn join_sql<'s>(parts: impl Iterator<Item = &'s str>) -> String {
    parts.collect::<Vec<_>>().join(", ")
}

fn push_where(sql: &mut String, conditions: &[String]) {
    if !conditions.is_empty() {
        sql.push_str(" WHERE ");
        sql.push_str(&conditions.join(" AND "));
    }
}

/// Render one predicate, binding its values
fn render_predicate(predicate: &ResolvedPredicate, args: &mut Arguments) -> RestResult<String> {
    let op = predicate.operator;
    let col = &predicate.column;
    let values = &predicate.values;
    // pattern operators compare against text, not the column type
    let cast = !matches!(
        op,
        FilterOperator::Like
            | FilterOperator::ILike
            | FilterOperator::NotLike
            | FilterOperator::NotILike
            | FilterOperator::Regex
            | FilterOperator::IRegex
            | FilterOperator::NotRegex
    );

    let arity_ok = match op.arity() {
        Arity::None => values.is_empty(),
        Arity::One => values.len() == 1,
        Arity::Two => values.len() == 2,
        Arity::AtLeastOne => !values.is_empty(),
    };
    if !arity_ok {
        return Err(RestError::syntax(
            col.info.name.as_str(),
            format!("operator {} received {} values", op, values.len()),
        ));
    }

    let mut bind = |v: &String| args.bind(col, SqlValue::Text(v.clone()), cast);

    Ok(match op.arity() {
        Arity::None => format!("{} {}", col.sql, op.sql()),
        Arity::One => format!("{} {} {}", col.sql, op.sql(), bind(&values[0])),
        Arity::Two => {
            let low = bind(&values[0]);
            let high = bind(&values[1]);
            format!("{} BETWEEN {} AND {}", col.sql, low, high)
        }
        Arity::AtLeastOne => {
            let list: Vec<String> = values.iter().map(&mut bind).collect();
            format!("{} {} ({})", col.sql, op.sql(), list.join(", "))
        }
    })
}

fn to_i64(param: &str, n: u64) -> RestResult<i64> {
    i64::try_from(n).map_err(|_| RestError::InvalidType {
        param: param.to_string(),
        value: n.to_string(),
        expected: "a 64-bit integer",
    })
}

/// Convert a JSON body value into a bound argument
fn json_to_sql(value: &Value, column: &ColumnInfo) -> SqlValue {
    match value {
        Value::Null => SqlValue::Null,
        Value::String(s) => SqlValue::Text(s.clone()),
        Value::Array(items) if column.is_array() => SqlValue::Text(pg_array_literal(items)),
        other => SqlValue::Text(other.to_string()),
    }
}

/// Render a JSON array as a PostgreSQL array literal: `{"a","b"}`
fn pg_array_literal(items: &[Value]) -> String {
    let elements: Vec<String> = items
        .iter()
        .map(|item| match item {
            Value::Null => "NULL".to_string(),
            Value::Bool(b) => b.to_string(),
            Value::Number(n) => n.to_string(),
            Value::Array(nested) => pg_array_literal(nested),
            Value::String(s) => quote_array_element(s),
            Value::Object(_) => quote_array_element(&item.to_string()),
        })
        .collect();
    format!("{{{}}}", elements.join(","))
}

fn quote_array_element(s: &str) -> String {
    let escaped = s.replace('\\', "\\\\").replace('"', "\\\"");
    format!("\"{}\"", escaped)
}
