//! # Join Clause Parser
//!
//! `_join=kind:table:table.column:operator:base.column`, exactly five
//! `:`-separated segments.

use super::errors::{RestError, RestResult};
use super::filter::FilterOperator;
use super::identifier::{ColumnRef, Identifier, IdentifierKind};

pub const JOIN_PARAM: &str = "_join";

const SEGMENTS: usize = 5;

/// Join kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinKind {
    Inner,
    Left,
    Right,
    Outer,
}

impl JoinKind {
    pub fn parse(token: &str) -> Option<Self> {
        match token {
            "inner" => Some(JoinKind::Inner),
            "left" => Some(JoinKind::Left),
            "right" => Some(JoinKind::Right),
            "outer" => Some(JoinKind::Outer),
            _ => None,
        }
    }

    pub fn sql(&self) -> &'static str {
        match self {
            JoinKind::Inner => "INNER JOIN",
            JoinKind::Left => "LEFT JOIN",
            JoinKind::Right => "RIGHT JOIN",
            JoinKind::Outer => "FULL OUTER JOIN",
        }
    }
}

/// Parsed `_join` value, prior to catalog checks
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinDescriptor {
    pub kind: JoinKind,
    pub table: Identifier,
    pub table_column: ColumnRef,
    pub operator: FilterOperator,
    pub base_column: ColumnRef,
}

/// Parse the `_join` parameter value
pub fn parse_join(value: &str) -> RestResult<JoinDescriptor> {
    let segments: Vec<&str> = value.split(':').collect();
    if segments.len() != SEGMENTS {
        return Err(RestError::syntax(
            JOIN_PARAM,
            format!(
                "expected {} ':'-separated segments, found {}",
                SEGMENTS,
                segments.len()
            ),
        ));
    }

    let kind = JoinKind::parse(segments[0]).ok_or_else(|| {
        RestError::syntax(JOIN_PARAM, format!("unknown join kind {:?}", segments[0]))
    })?;
    let table = Identifier::parse(segments[1], IdentifierKind::Table)?;
    let table_column = ColumnRef::parse(segments[2])?;

    let token = segments[3].strip_prefix('$').unwrap_or(segments[3]);
    let operator = FilterOperator::from_token(token)
        .filter(FilterOperator::is_comparison)
        .ok_or_else(|| RestError::UnsupportedOperator {
            param: JOIN_PARAM.to_string(),
            operator: segments[3].to_string(),
        })?;

    let base_column = ColumnRef::parse(segments[4])?;

    Ok(JoinDescriptor {
        kind,
        table,
        table_column,
        operator,
        base_column,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_join() {
        let join = parse_join("inner:test8:test8.nameforjoin:$eq:test.name").unwrap();
        assert_eq!(join.kind, JoinKind::Inner);
        assert_eq!(join.table.as_str(), "test8");
        assert_eq!(join.table_column.to_string(), "test8.nameforjoin");
        assert_eq!(join.operator, FilterOperator::Eq);
        assert_eq!(join.base_column.to_string(), "test.name");
    }

    #[test]
    fn test_operator_without_dollar() {
        let join = parse_join("left:test2:test2.name:eq:view_test.player").unwrap();
        assert_eq!(join.kind, JoinKind::Left);
        assert_eq!(join.operator, FilterOperator::Eq);
    }

    #[test]
    fn test_segment_count() {
        for value in [
            "inner:test2:test2.name",
            "inner:test2.name:eq:view_test.player",
            "inner:test2:test2.name:eq:test.name:extra",
            "",
        ] {
            let err = parse_join(value).unwrap_err();
            assert!(matches!(err, RestError::Syntax { .. }), "{}", value);
        }
    }

    #[test]
    fn test_rejects_bad_parts() {
        assert!(matches!(
            parse_join("cross:t:t.a:eq:b.a").unwrap_err(),
            RestError::Syntax { .. }
        ));
        assert!(matches!(
            parse_join("inner:0t:t.a:eq:b.a").unwrap_err(),
            RestError::InvalidIdentifier { .. }
        ));
        assert!(matches!(
            parse_join("inner:t:t.a:in:b.a").unwrap_err(),
            RestError::UnsupportedOperator { .. }
        ));
    }

    #[test]
    fn test_outer_is_full_outer() {
        assert_eq!(JoinKind::Outer.sql(), "FULL OUTER JOIN");
    }
}
