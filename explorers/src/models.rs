//! Explore definitions as authored in the semantic model.
//!
//! These are the uncompiled inputs: templates are kept as written and no
//! quoting has been applied. [`crate::compiler::compile_explore`] turns a
//! definition into an immutable [`crate::explore::Explore`].

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ExploreDefinition {
    pub name: String,
    pub base_table: String,
    /// Joins in the order they are written to the FROM clause.
    #[serde(default)]
    pub joins: Vec<JoinDefinition>,
    pub tables: BTreeMap<String, TableDefinition>,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct JoinDefinition {
    pub table: String,
    pub sql_on: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct TableDefinition {
    pub name: String,
    pub database: String,
    pub schema: String,
    /// Verbatim table reference. When absent the reference is built by
    /// quoting `database`, `schema` and `name`.
    #[serde(default)]
    pub sql_table: Option<String>,
    /// Row-level filter applied whenever the table takes part in a query.
    #[serde(default)]
    pub sql_where: Option<String>,
    #[serde(default)]
    pub dimensions: BTreeMap<String, DimensionDefinition>,
    #[serde(default)]
    pub metrics: BTreeMap<String, MetricDefinition>,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct DimensionDefinition {
    #[serde(rename = "type")]
    pub dimension_type: DimensionType,
    pub sql: String,
    #[serde(default)]
    pub hidden: bool,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

impl DimensionDefinition {
    pub fn new(dimension_type: DimensionType, sql: impl Into<String>) -> Self {
        Self {
            dimension_type,
            sql: sql.into(),
            hidden: false,
            label: None,
            description: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct MetricDefinition {
    #[serde(rename = "type")]
    pub metric_type: MetricType,
    pub sql: String,
    #[serde(default)]
    pub hidden: bool,
    #[serde(default)]
    pub is_auto_generated: bool,
    /// Only meaningful for [`MetricType::Percentile`]; 0-100.
    #[serde(default)]
    pub percentile: Option<f64>,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

impl MetricDefinition {
    pub fn new(metric_type: MetricType, sql: impl Into<String>) -> Self {
        Self {
            metric_type,
            sql: sql.into(),
            hidden: false,
            is_auto_generated: false,
            percentile: None,
            label: None,
            description: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DimensionType {
    String,
    Number,
    Timestamp,
    Date,
    Boolean,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricType {
    Percentile,
    Average,
    Count,
    CountDistinct,
    Sum,
    Min,
    Max,
    Median,
    // Non-aggregating types: the resolved expression is used as-is.
    Number,
    String,
    Date,
    Boolean,
}

impl MetricType {
    pub fn is_aggregate(&self) -> bool {
        !matches!(
            self,
            MetricType::Number | MetricType::String | MetricType::Date | MetricType::Boolean
        )
    }
}

impl fmt::Display for MetricType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MetricType::Percentile => "percentile",
            MetricType::Average => "average",
            MetricType::Count => "count",
            MetricType::CountDistinct => "count_distinct",
            MetricType::Sum => "sum",
            MetricType::Min => "min",
            MetricType::Max => "max",
            MetricType::Median => "median",
            MetricType::Number => "number",
            MetricType::String => "string",
            MetricType::Date => "date",
            MetricType::Boolean => "boolean",
        };
        f.write_str(name)
    }
}
