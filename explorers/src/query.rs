//! Metric queries: what a caller asks of an explore.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ExploreError;
use crate::explore::{CompiledMetric, FieldRef};
use crate::models::MetricType;

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricQuery {
    /// Selected dimension field ids, in output order.
    #[serde(default)]
    pub dimensions: Vec<String>,
    /// Selected metric field ids (declared or additional), in output order.
    #[serde(default)]
    pub metrics: Vec<String>,
    #[serde(default)]
    pub filters: Filters,
    #[serde(default)]
    pub sorts: Vec<SortField>,
    #[serde(default)]
    pub limit: QueryLimit,
    #[serde(default)]
    pub table_calculations: Vec<TableCalculation>,
    #[serde(default)]
    pub additional_metrics: Vec<AdditionalMetric>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Filters {
    /// Applied to source rows before aggregation.
    #[serde(default)]
    pub dimensions: Option<FilterGroup>,
    /// Applied to aggregated output columns.
    #[serde(default)]
    pub metrics: Option<FilterGroup>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SortField {
    pub field_id: String,
    #[serde(default)]
    pub descending: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(from = "Option<u64>", into = "Option<u64>")]
pub enum QueryLimit {
    Rows(u64),
    #[default]
    All,
}

impl From<Option<u64>> for QueryLimit {
    fn from(value: Option<u64>) -> Self {
        value.map_or(QueryLimit::All, QueryLimit::Rows)
    }
}

impl From<QueryLimit> for Option<u64> {
    fn from(value: QueryLimit) -> Self {
        match value {
            QueryLimit::Rows(n) => Some(n),
            QueryLimit::All => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TableCalculation {
    pub name: String,
    #[serde(default)]
    pub display_name: String,
    /// Expression over selected fields written as `${table.field}`.
    pub sql: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompiledTableCalculation {
    pub name: String,
    pub display_name: String,
    pub sql: String,
    /// `sql` with every reference replaced by its output column alias.
    pub compiled_sql: String,
}

/// Metric defined in the query itself rather than in the explore.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdditionalMetric {
    pub table: String,
    pub name: String,
    #[serde(rename = "type")]
    pub metric_type: MetricType,
    pub sql: String,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub percentile: Option<f64>,
    #[serde(default)]
    pub hidden: bool,
}

/// A metric query with its ad hoc metrics and table calculations compiled.
#[derive(Debug, Clone)]
pub struct CompiledMetricQuery {
    pub query: MetricQuery,
    pub compiled_table_calculations: Vec<CompiledTableCalculation>,
    pub compiled_additional_metrics: Vec<CompiledMetric>,
}

impl CompiledMetricQuery {
    pub fn additional_metric(&self, field_id: &str) -> Option<FieldRef<'_>> {
        self.compiled_additional_metrics
            .iter()
            .find(|m| crate::explore::field_id(&m.table, &m.name) == field_id)
            .map(FieldRef::Metric)
    }
}

// ============================================================================
// Filter trees
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterCombinator {
    And,
    Or,
}

impl FilterCombinator {
    pub fn sql(&self) -> &'static str {
        match self {
            FilterCombinator::And => " AND ",
            FilterCombinator::Or => " OR ",
        }
    }
}

/// A node combining its children with a single combinator.
///
/// Serialised as `{"id": .., "and": [..]}` or `{"id": .., "or": [..]}`.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(try_from = "RawFilterGroup", into = "RawFilterGroup")]
pub struct FilterGroup {
    pub id: String,
    pub combinator: FilterCombinator,
    pub items: Vec<FilterNode>,
}

impl FilterGroup {
    pub fn and(items: Vec<FilterNode>) -> Self {
        Self {
            id: String::new(),
            combinator: FilterCombinator::And,
            items,
        }
    }

    pub fn or(items: Vec<FilterNode>) -> Self {
        Self {
            id: String::new(),
            combinator: FilterCombinator::Or,
            items,
        }
    }

    /// Every rule in the tree, depth first, disabled ones included.
    pub fn rules(&self) -> Vec<&FilterRule> {
        let mut out = Vec::new();
        collect_rules(self, &mut out);
        out
    }
}

fn collect_rules<'a>(group: &'a FilterGroup, out: &mut Vec<&'a FilterRule>) {
    for item in &group.items {
        match item {
            FilterNode::Rule(rule) => out.push(rule),
            FilterNode::Group(inner) => collect_rules(inner, out),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
struct RawFilterGroup {
    #[serde(default)]
    id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    and: Option<Vec<FilterNode>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    or: Option<Vec<FilterNode>>,
}

impl TryFrom<RawFilterGroup> for FilterGroup {
    type Error = String;

    fn try_from(raw: RawFilterGroup) -> Result<Self, Self::Error> {
        let (combinator, items) = match (raw.and, raw.or) {
            (Some(items), None) => (FilterCombinator::And, items),
            (None, Some(items)) => (FilterCombinator::Or, items),
            _ => {
                return Err(format!(
                    "filter group {} must have exactly one of 'and' or 'or'",
                    raw.id
                ))
            }
        };
        Ok(FilterGroup {
            id: raw.id,
            combinator,
            items,
        })
    }
}

impl From<FilterGroup> for RawFilterGroup {
    fn from(group: FilterGroup) -> Self {
        let mut raw = RawFilterGroup {
            id: group.id,
            ..Default::default()
        };
        match group.combinator {
            FilterCombinator::And => raw.and = Some(group.items),
            FilterCombinator::Or => raw.or = Some(group.items),
        }
        raw
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum FilterNode {
    Rule(FilterRule),
    Group(FilterGroup),
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterRule {
    #[serde(default)]
    pub id: String,
    pub target: FilterTarget,
    /// Operator name as sent by the caller; parsed when the rule is rendered.
    pub operator: String,
    #[serde(default)]
    pub values: Vec<Value>,
    #[serde(default)]
    pub disabled: bool,
}

impl FilterRule {
    pub fn new(field_id: impl Into<String>, operator: FilterOperator, values: Vec<Value>) -> Self {
        Self {
            id: String::new(),
            target: FilterTarget {
                field_id: field_id.into(),
            },
            operator: operator.to_string(),
            values,
            disabled: false,
        }
    }

    pub fn operator(&self) -> Result<FilterOperator, ExploreError> {
        self.operator.parse()
    }

    pub fn disabled(mut self) -> Self {
        self.disabled = true;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterTarget {
    pub field_id: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FilterOperator {
    IsNull,
    NotNull,
    Equals,
    NotEquals,
    StartsWith,
    EndsWith,
    Include,
    DoesNotInclude,
    LessThan,
    LessThanOrEqual,
    GreaterThan,
    GreaterThanOrEqual,
    InBetween,
}

const ALL_OPERATORS: [FilterOperator; 13] = [
    FilterOperator::IsNull,
    FilterOperator::NotNull,
    FilterOperator::Equals,
    FilterOperator::NotEquals,
    FilterOperator::StartsWith,
    FilterOperator::EndsWith,
    FilterOperator::Include,
    FilterOperator::DoesNotInclude,
    FilterOperator::LessThan,
    FilterOperator::LessThanOrEqual,
    FilterOperator::GreaterThan,
    FilterOperator::GreaterThanOrEqual,
    FilterOperator::InBetween,
];

impl FilterOperator {
    pub fn as_str(&self) -> &'static str {
        match self {
            FilterOperator::IsNull => "isNull",
            FilterOperator::NotNull => "notNull",
            FilterOperator::Equals => "equals",
            FilterOperator::NotEquals => "notEquals",
            FilterOperator::StartsWith => "startsWith",
            FilterOperator::EndsWith => "endsWith",
            FilterOperator::Include => "include",
            FilterOperator::DoesNotInclude => "doesNotInclude",
            FilterOperator::LessThan => "lessThan",
            FilterOperator::LessThanOrEqual => "lessThanOrEqual",
            FilterOperator::GreaterThan => "greaterThan",
            FilterOperator::GreaterThanOrEqual => "greaterThanOrEqual",
            FilterOperator::InBetween => "inBetween",
        }
    }
}

impl fmt::Display for FilterOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FilterOperator {
    type Err = ExploreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ALL_OPERATORS
            .into_iter()
            .find(|op| op.as_str() == s)
            .ok_or_else(|| ExploreError::UnsupportedOperator {
                operator: s.to_string(),
                reason: "no SQL rendering exists for this operator".to_string(),
            })
    }
}
