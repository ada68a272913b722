//! # Query Parameter Parser
//!
//! Parses the query string into typed clause descriptors, then resolves
//! every identifier against the request's catalog snapshot.
//!
//! Parsing is fail-fast: parameters are visited in request order and the
//! first invalid one aborts the request.

use super::errors::{RestError, RestResult};
use super::filter::{parse_filter, FilterOperator, FilterPredicate};
use super::identifier::{ColumnRef, Identifier, IdentifierKind};
use super::join::{parse_join, JoinDescriptor, JoinKind, JOIN_PARAM};
use crate::schema::{BoundColumn, RelationInfo, SchemaContext};

/// Page size used when `_page` is given without `_page_size`
pub const DEFAULT_PAGE_SIZE: u64 = 10;

/// Reserved `_`-prefixed parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlParam {
    Join,
    Order,
    Page,
    PageSize,
    Count,
    Select,
    Distinct,
}

impl ControlParam {
    pub const ALL: [ControlParam; 7] = [
        ControlParam::Join,
        ControlParam::Order,
        ControlParam::Page,
        ControlParam::PageSize,
        ControlParam::Count,
        ControlParam::Select,
        ControlParam::Distinct,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ControlParam::Join => JOIN_PARAM,
            ControlParam::Order => "_order",
            ControlParam::Page => "_page",
            ControlParam::PageSize => "_page_size",
            ControlParam::Count => "_count",
            ControlParam::Select => "_select",
            ControlParam::Distinct => "_distinct",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|p| p.as_str() == key)
    }

    /// Whether a key is reserved (not a filter)
    pub fn is_reserved(key: &str) -> bool {
        key.starts_with('_')
    }
}

/// Pagination defaults and limits
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaginationPolicy {
    pub default_page_size: u64,
    pub max_page_size: Option<u64>,
}

impl Default for PaginationPolicy {
    fn default() -> Self {
        Self {
            default_page_size: DEFAULT_PAGE_SIZE,
            max_page_size: None,
        }
    }
}

/// One ORDER BY item
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderItem {
    pub column: ColumnRef,
    pub descending: bool,
}

/// Page number (1-based) and size
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageSpec {
    pub page: u64,
    pub size: u64,
}

impl PageSpec {
    pub fn limit(&self) -> u64 {
        self.size
    }

    pub fn offset(&self) -> u64 {
        (self.page - 1).saturating_mul(self.size)
    }
}

/// Requested projection
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Projection {
    #[default]
    All,
    Columns(Vec<ColumnRef>),
}

/// Requested count aggregate
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CountSpec {
    All,
    Column(ColumnRef),
}

/// Parsed query parameters
#[derive(Debug, Clone, Default)]
pub struct QueryParams {
    /// Filter expressions, AND-combined
    pub filters: Vec<FilterPredicate>,

    pub join: Option<JoinDescriptor>,

    /// Order by clauses
    pub order: Vec<OrderItem>,

    pub page: Option<PageSpec>,

    pub select: Projection,

    pub count: Option<CountSpec>,

    pub distinct: bool,
}

impl QueryParams {
    /// Parse query parameters in request order.
    ///
    /// Every control parameter may appear at most once; filters may repeat.
    pub fn parse(params: &[(String, String)], policy: &PaginationPolicy) -> RestResult<Self> {
        let mut result = QueryParams::default();
        let mut seen: Vec<ControlParam> = Vec::new();
        let mut page: Option<u64> = None;
        let mut page_size: Option<u64> = None;

        for (key, value) in params {
            if !ControlParam::is_reserved(key) {
                result.filters.push(parse_filter(key, value)?);
                continue;
            }

            let param = ControlParam::from_key(key)
                .ok_or_else(|| RestError::syntax(key.as_str(), "unknown control parameter"))?;
            if seen.contains(&param) {
                return Err(RestError::syntax(key.as_str(), "may appear at most once"));
            }
            seen.push(param);

            match param {
                ControlParam::Join => result.join = Some(parse_join(value)?),
                ControlParam::Order => result.order = parse_order(value)?,
                ControlParam::Page => page = Some(parse_positive(param, value)?),
                ControlParam::PageSize => {
                    let size = parse_positive(param, value)?;
                    if policy.max_page_size.is_some_and(|max| size > max) {
                        return Err(RestError::InvalidType {
                            param: key.clone(),
                            value: value.clone(),
                            expected: "within the maximum page size",
                        });
                    }
                    page_size = Some(size);
                }
                ControlParam::Count => result.count = Some(parse_count(value)?),
                ControlParam::Select => result.select = parse_select(value)?,
                ControlParam::Distinct => result.distinct = parse_bool(param, value)?,
            }
        }

        result.page = match (page, page_size) {
            (None, None) => None,
            (Some(page), None) => Some(PageSpec {
                page,
                size: policy.default_page_size,
            }),
            (page, Some(size)) => Some(PageSpec {
                page: page.unwrap_or(1),
                size,
            }),
        };

        Ok(result)
    }

    /// Whether any clause other than filters was given
    pub fn has_read_clauses(&self) -> bool {
        self.join.is_some()
            || !self.order.is_empty()
            || self.page.is_some()
            || self.count.is_some()
            || self.select != Projection::All
            || self.distinct
    }

    /// Check every identifier against the catalog
    pub fn resolve(self, ctx: &SchemaContext) -> RestResult<ResolvedQuery> {
        let join = match &self.join {
            Some(join) => Some(resolve_join(join, ctx)?),
            None => None,
        };
        let joined = join.as_ref().map(|j| &j.relation);

        let filters = self
            .filters
            .iter()
            .map(|f| {
                Ok(ResolvedPredicate {
                    column: ctx.resolve_column(&f.column, joined)?,
                    operator: f.operator,
                    values: f.values.clone(),
                })
            })
            .collect::<RestResult<Vec<_>>>()?;

        let order = self
            .order
            .iter()
            .map(|o| {
                Ok(ResolvedOrder {
                    column: ctx.resolve_column(&o.column, joined)?,
                    descending: o.descending,
                })
            })
            .collect::<RestResult<Vec<_>>>()?;

        let projection = match &self.select {
            Projection::All => None,
            Projection::Columns(cols) => Some(
                cols.iter()
                    .map(|c| ctx.resolve_column(c, joined))
                    .collect::<RestResult<Vec<_>>>()?,
            ),
        };

        let count = match &self.count {
            None => None,
            Some(CountSpec::All) => Some(CountTarget::All),
            Some(CountSpec::Column(c)) => Some(CountTarget::Column(ctx.resolve_column(c, joined)?)),
        };

        Ok(ResolvedQuery {
            filters,
            join,
            order,
            page: self.page,
            projection,
            count,
            distinct: self.distinct,
        })
    }
}

/// Filter bound to a catalog column
#[derive(Debug, Clone)]
pub struct ResolvedPredicate {
    pub column: BoundColumn,
    pub operator: FilterOperator,
    pub values: Vec<String>,
}

/// Join bound to catalog relations
#[derive(Debug, Clone)]
pub struct ResolvedJoin {
    pub kind: JoinKind,
    pub relation: RelationInfo,
    /// `"schema"."table"`
    pub table_sql: String,
    /// Rendered ON condition
    pub condition: String,
}

#[derive(Debug, Clone)]
pub struct ResolvedOrder {
    pub column: BoundColumn,
    pub descending: bool,
}

#[derive(Debug, Clone)]
pub enum CountTarget {
    All,
    Column(BoundColumn),
}

/// Query whose identifiers all exist in the catalog
#[derive(Debug, Clone, Default)]
pub struct ResolvedQuery {
    pub filters: Vec<ResolvedPredicate>,
    pub join: Option<ResolvedJoin>,
    pub order: Vec<ResolvedOrder>,
    pub page: Option<PageSpec>,
    /// `None` selects every column
    pub projection: Option<Vec<BoundColumn>>,
    pub count: Option<CountTarget>,
    pub distinct: bool,
}

fn resolve_join(join: &JoinDescriptor, ctx: &SchemaContext) -> RestResult<ResolvedJoin> {
    if ctx.target().is_system() {
        return Err(RestError::syntax(
            JOIN_PARAM,
            "joins are not supported on catalog listings",
        ));
    }

    // an unaliased self-join names the same relation twice
    if join.table.as_str() == ctx.target().name {
        return Err(RestError::syntax(
            JOIN_PARAM,
            format!("cannot join {} to itself", join.table),
        ));
    }

    let relation = ctx.relation(join.table.as_str()).cloned().ok_or_else(|| {
        RestError::unknown_identifier(IdentifierKind::Table, join.table.as_str(), ctx.scope_label())
    })?;

    let table_column = qualify(&join.table_column, &join.table, ctx)?;
    let target = Identifier::parse(&ctx.target().name, IdentifierKind::Table)?;
    let base_column = qualify(&join.base_column, &target, ctx)?;

    let joined_col = ctx.resolve_column(&table_column, Some(&relation))?;
    let base_col = ctx.resolve_column(&base_column, Some(&relation))?;

    let table_sql = match ctx.schema() {
        Some(schema) => format!("{}.{}", schema.quoted(), join.table.quoted()),
        None => join.table.quoted(),
    };

    Ok(ResolvedJoin {
        kind: join.kind,
        condition: format!("{} {} {}", joined_col.sql, join.operator.sql(), base_col.sql),
        relation,
        table_sql,
    })
}

/// Qualify a join column by its owning table, rejecting foreign qualifiers
fn qualify(col: &ColumnRef, owner: &Identifier, ctx: &SchemaContext) -> RestResult<ColumnRef> {
    match &col.qualifier {
        None => Ok(ColumnRef {
            qualifier: Some(Identifier::parse(owner.as_str(), IdentifierKind::Alias)?),
            column: col.column.clone(),
        }),
        Some(q) if q.as_str() == owner.as_str() => Ok(col.clone()),
        Some(q) => Err(RestError::unknown_identifier(
            IdentifierKind::Table,
            q.as_str(),
            format!("{} for join column {}", ctx.scope_label(), col),
        )),
    }
}

/// Parse `_order`; empty means no ordering
fn parse_order(value: &str) -> RestResult<Vec<OrderItem>> {
    if value.is_empty() {
        return Ok(Vec::new());
    }

    value
        .split(',')
        .map(|token| {
            let (name, descending) = match token.strip_prefix('-') {
                Some(name) => (name, true),
                None => (token, false),
            };
            if name.is_empty() {
                return Err(RestError::syntax("_order", "empty column in order list"));
            }
            Ok(OrderItem {
                column: ColumnRef::parse(name)?,
                descending,
            })
        })
        .collect()
}

/// Parse `_select` (`*` or a column list)
fn parse_select(value: &str) -> RestResult<Projection> {
    if value == "*" {
        return Ok(Projection::All);
    }
    if value.is_empty() {
        return Err(RestError::syntax("_select", "select cannot be empty"));
    }

    let columns = value
        .split(',')
        .map(ColumnRef::parse)
        .collect::<RestResult<Vec<_>>>()?;
    Ok(Projection::Columns(columns))
}

/// Parse `_count` (`*` or a single column)
fn parse_count(value: &str) -> RestResult<CountSpec> {
    match value {
        "*" => Ok(CountSpec::All),
        "" => Err(RestError::syntax("_count", "count target cannot be empty")),
        column => Ok(CountSpec::Column(ColumnRef::parse(column)?)),
    }
}

fn parse_positive(param: ControlParam, value: &str) -> RestResult<u64> {
    match value.parse::<u64>() {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(RestError::InvalidType {
            param: param.as_str().to_string(),
            value: value.to_string(),
            expected: "a positive integer",
        }),
    }
}

fn parse_bool(param: ControlParam, value: &str) -> RestResult<bool> {
    value.parse::<bool>().map_err(|_| RestError::InvalidType {
        param: param.as_str().to_string(),
        value: value.to_string(),
        expected: "true or false",
    })
}
