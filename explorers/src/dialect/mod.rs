//! SQL dialect abstractions for different warehouses.
//!
//! A dialect only knows how to quote and how to aggregate. Template
//! resolution, join selection and filter trees live in the compiler and the
//! query builder; adding a warehouse means adding an implementation here.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ExploreError;
use crate::models::MetricType;
use crate::query::FilterOperator;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DialectKind {
    Postgres,
    DuckDb,
    BigQuery,
}

impl fmt::Display for DialectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DialectKind::Postgres => "postgres",
            DialectKind::DuckDb => "duckdb",
            DialectKind::BigQuery => "bigquery",
        };
        f.write_str(name)
    }
}

impl FromStr for DialectKind {
    type Err = ExploreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "postgres" | "postgresql" => Ok(DialectKind::Postgres),
            "duckdb" => Ok(DialectKind::DuckDb),
            "bigquery" => Ok(DialectKind::BigQuery),
            other => Err(ExploreError::Config(format!("unknown dialect {other}"))),
        }
    }
}

pub trait Dialect: Send + Sync {
    fn kind(&self) -> DialectKind;
    fn field_quote_char(&self) -> char;
    fn string_quote_char(&self) -> char {
        '\''
    }
    /// Character placed before a string quote inside a literal.
    fn escape_string_quote_char(&self) -> char;

    fn quote_ident(&self, ident: &str) -> String {
        let q = self.field_quote_char();
        let doubled: String = [q, q].iter().collect();
        format!("{q}{}{q}", ident.replace(q, &doubled))
    }

    fn quote_string(&self, value: &str) -> String {
        let quote = self.string_quote_char();
        let escape = self.escape_string_quote_char();
        let mut out = String::with_capacity(value.len() + 2);
        out.push(quote);
        for c in value.chars() {
            if c == quote || (c == escape && escape != quote) {
                out.push(escape);
            }
            out.push(c);
        }
        out.push(quote);
        out
    }

    /// Wrap a resolved metric expression in the aggregate for its type.
    /// Non-aggregating types return the expression unchanged.
    fn metric_sql(&self, sql: &str, metric_type: MetricType, percentile: Option<f64>) -> String {
        ansi_metric_sql(sql, metric_type, percentile)
    }

    fn supports_operator(&self, _operator: FilterOperator) -> bool {
        true
    }
}

/// Standard aggregate rendering shared by the dialects.
pub(crate) fn ansi_metric_sql(sql: &str, metric_type: MetricType, percentile: Option<f64>) -> String {
    match metric_type {
        MetricType::Count => format!("COUNT({sql})"),
        MetricType::CountDistinct => format!("COUNT(DISTINCT {sql})"),
        MetricType::Sum => format!("SUM({sql})"),
        MetricType::Min => format!("MIN({sql})"),
        MetricType::Max => format!("MAX({sql})"),
        MetricType::Average => format!("AVG({sql})"),
        MetricType::Median => format!("PERCENTILE_CONT(0.5) WITHIN GROUP (ORDER BY {sql})"),
        MetricType::Percentile => {
            let fraction = percentile.unwrap_or(50.0) / 100.0;
            format!("PERCENTILE_CONT({fraction}) WITHIN GROUP (ORDER BY {sql})")
        }
        MetricType::Number | MetricType::String | MetricType::Date | MetricType::Boolean => {
            sql.to_string()
        }
    }
}

/// Shared adapter for a dialect tag, e.g. the one an explore was compiled for.
pub fn dialect_for(kind: DialectKind) -> &'static dyn Dialect {
    match kind {
        DialectKind::Postgres => &PostgresDialect,
        DialectKind::DuckDb => &DuckDbDialect,
        DialectKind::BigQuery => &BigQueryDialect,
    }
}

mod bigquery;
mod duckdb;
mod postgres;

pub use bigquery::BigQueryDialect;
pub use duckdb::DuckDbDialect;
pub use postgres::PostgresDialect;
