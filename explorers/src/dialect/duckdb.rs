//! DuckDB dialect implementation.

use crate::models::MetricType;

use super::{ansi_metric_sql, Dialect, DialectKind};

#[derive(Debug, Default, Clone, Copy)]
pub struct DuckDbDialect;

impl Dialect for DuckDbDialect {
    fn kind(&self) -> DialectKind {
        DialectKind::DuckDb
    }

    fn field_quote_char(&self) -> char {
        '"'
    }

    fn escape_string_quote_char(&self) -> char {
        '\''
    }

    fn metric_sql(&self, sql: &str, metric_type: MetricType, percentile: Option<f64>) -> String {
        match metric_type {
            MetricType::Median => format!("MEDIAN({sql})"),
            MetricType::Percentile => {
                let fraction = percentile.unwrap_or(50.0) / 100.0;
                format!("QUANTILE_CONT({sql}, {fraction})")
            }
            _ => ansi_metric_sql(sql, metric_type, percentile),
        }
    }
}
