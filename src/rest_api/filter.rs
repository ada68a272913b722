//! # Filter Clause Parser
//!
//! Turns `column=$operator.value` query parameters into predicates. A value
//! without a `$` token is an implicit equality.

use std::fmt;

use super::errors::{RestError, RestResult};
use super::identifier::ColumnRef;

/// Separator for list-valued operators
pub const LIST_DELIMITER: char = ',';

/// Filter operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOperator {
    Eq,
    Ne,
    Gt,
    Gte,
    Lt,
    Lte,
    In,
    NotIn,
    IsNull,
    IsNotNull,
    IsTrue,
    IsNotTrue,
    IsFalse,
    IsNotFalse,
    Like,
    ILike,
    NotLike,
    NotILike,
    Regex,
    IRegex,
    NotRegex,
    Between,
}

/// How many literal values an operator takes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    None,
    One,
    Two,
    AtLeastOne,
}

impl FilterOperator {
    pub const ALL: [FilterOperator; 22] = [
        FilterOperator::Eq,
        FilterOperator::Ne,
        FilterOperator::Gt,
        FilterOperator::Gte,
        FilterOperator::Lt,
        FilterOperator::Lte,
        FilterOperator::In,
        FilterOperator::NotIn,
        FilterOperator::IsNull,
        FilterOperator::IsNotNull,
        FilterOperator::IsTrue,
        FilterOperator::IsNotTrue,
        FilterOperator::IsFalse,
        FilterOperator::IsNotFalse,
        FilterOperator::Like,
        FilterOperator::ILike,
        FilterOperator::NotLike,
        FilterOperator::NotILike,
        FilterOperator::Regex,
        FilterOperator::IRegex,
        FilterOperator::NotRegex,
        FilterOperator::Between,
    ];

    /// Token without the leading `$`
    pub fn as_str(&self) -> &'static str {
        match self {
            FilterOperator::Eq => "eq",
            FilterOperator::Ne => "ne",
            FilterOperator::Gt => "gt",
            FilterOperator::Gte => "gte",
            FilterOperator::Lt => "lt",
            FilterOperator::Lte => "lte",
            FilterOperator::In => "in",
            FilterOperator::NotIn => "nin",
            FilterOperator::IsNull => "null",
            FilterOperator::IsNotNull => "notnull",
            FilterOperator::IsTrue => "true",
            FilterOperator::IsNotTrue => "nottrue",
            FilterOperator::IsFalse => "false",
            FilterOperator::IsNotFalse => "notfalse",
            FilterOperator::Like => "like",
            FilterOperator::ILike => "ilike",
            FilterOperator::NotLike => "nlike",
            FilterOperator::NotILike => "nilike",
            FilterOperator::Regex => "regex",
            FilterOperator::IRegex => "iregex",
            FilterOperator::NotRegex => "nregex",
            FilterOperator::Between => "between",
        }
    }

    pub fn from_token(token: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|op| op.as_str() == token)
    }

    /// SQL operator text
    pub fn sql(&self) -> &'static str {
        match self {
            FilterOperator::Eq => "=",
            FilterOperator::Ne => "<>",
            FilterOperator::Gt => ">",
            FilterOperator::Gte => ">=",
            FilterOperator::Lt => "<",
            FilterOperator::Lte => "<=",
            FilterOperator::In => "IN",
            FilterOperator::NotIn => "NOT IN",
            FilterOperator::IsNull => "IS NULL",
            FilterOperator::IsNotNull => "IS NOT NULL",
            FilterOperator::IsTrue => "IS TRUE",
            FilterOperator::IsNotTrue => "IS NOT TRUE",
            FilterOperator::IsFalse => "IS FALSE",
            FilterOperator::IsNotFalse => "IS NOT FALSE",
            FilterOperator::Like => "LIKE",
            FilterOperator::ILike => "ILIKE",
            FilterOperator::NotLike => "NOT LIKE",
            FilterOperator::NotILike => "NOT ILIKE",
            FilterOperator::Regex => "~",
            FilterOperator::IRegex => "~*",
            FilterOperator::NotRegex => "!~",
            FilterOperator::Between => "BETWEEN",
        }
    }

    pub fn arity(&self) -> Arity {
        match self {
            FilterOperator::IsNull
            | FilterOperator::IsNotNull
            | FilterOperator::IsTrue
            | FilterOperator::IsNotTrue
            | FilterOperator::IsFalse
            | FilterOperator::IsNotFalse => Arity::None,
            FilterOperator::In | FilterOperator::NotIn => Arity::AtLeastOne,
            FilterOperator::Between => Arity::Two,
            _ => Arity::One,
        }
    }

    /// Operators usable in a join condition
    pub fn is_comparison(&self) -> bool {
        matches!(
            self,
            FilterOperator::Eq
                | FilterOperator::Ne
                | FilterOperator::Gt
                | FilterOperator::Gte
                | FilterOperator::Lt
                | FilterOperator::Lte
        )
    }
}

impl fmt::Display for FilterOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "${}", self.as_str())
    }
}

/// A parsed, not yet catalog-checked, filter
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterPredicate {
    pub column: ColumnRef,
    pub operator: FilterOperator,
    pub values: Vec<String>,
}

impl FilterPredicate {
    pub fn new(column: ColumnRef, operator: FilterOperator, values: Vec<String>) -> Self {
        Self {
            column,
            operator,
            values,
        }
    }

    /// Equality predicate
    pub fn eq(column: ColumnRef, value: impl Into<String>) -> Self {
        Self::new(column, FilterOperator::Eq, vec![value.into()])
    }
}

/// Parse one `key=value` filter parameter
pub fn parse_filter(key: &str, value: &str) -> RestResult<FilterPredicate> {
    let column = ColumnRef::parse(key)?;

    let Some(expr) = value.strip_prefix('$') else {
        return Ok(FilterPredicate::eq(column, value));
    };

    let (token, literal) = match expr.split_once('.') {
        Some((token, literal)) => (token, Some(literal)),
        None => (expr, None),
    };

    let operator =
        FilterOperator::from_token(token).ok_or_else(|| RestError::UnsupportedOperator {
            param: key.to_string(),
            operator: format!("${}", token),
        })?;

    let values = split_values(key, operator, literal)?;
    Ok(FilterPredicate::new(column, operator, values))
}

fn split_values(key: &str, operator: FilterOperator, literal: Option<&str>) -> RestResult<Vec<String>> {
    match (operator.arity(), literal) {
        (Arity::None, None) | (Arity::None, Some("")) => Ok(Vec::new()),
        (Arity::None, Some(_)) => Err(RestError::syntax(
            key,
            format!("operator {} takes no value", operator),
        )),
        (_, None) => Err(RestError::syntax(
            key,
            format!("operator {} requires a value", operator),
        )),
        (Arity::One, Some(v)) => Ok(vec![v.to_string()]),
        (Arity::AtLeastOne, Some(v)) => {
            let values: Vec<String> = v.split(LIST_DELIMITER).map(str::to_string).collect();
            if values.iter().any(String::is_empty) {
                return Err(RestError::syntax(
                    key,
                    format!("operator {} received an empty list element", operator),
                ));
            }
            Ok(values)
        }
        (Arity::Two, Some(v)) => {
            let values: Vec<String> = v.split(LIST_DELIMITER).map(str::to_string).collect();
            if values.len() != 2 {
                return Err(RestError::syntax(
                    key,
                    format!("operator {} requires exactly two values", operator),
                ));
            }
            Ok(values)
        }
    }
}
