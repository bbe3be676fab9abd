//! BigQuery dialect implementation.

use crate::models::MetricType;

use super::{ansi_metric_sql, Dialect, DialectKind};

#[derive(Debug, Default, Clone, Copy)]
pub struct BigQueryDialect;

impl Dialect for BigQueryDialect {
    fn kind(&self) -> DialectKind {
        DialectKind::BigQuery
    }

    fn field_quote_char(&self) -> char {
        '`'
    }

    fn escape_string_quote_char(&self) -> char {
        '\\'
    }

    fn metric_sql(&self, sql: &str, metric_type: MetricType, percentile: Option<f64>) -> String {
        match metric_type {
            // BigQuery has no ordered-set aggregates; use approximate quantiles.
            MetricType::Median => format!("APPROX_QUANTILES({sql}, 100)[OFFSET(50)]"),
            MetricType::Percentile => {
                let offset = percentile.unwrap_or(50.0).round().clamp(0.0, 100.0) as u32;
                format!("APPROX_QUANTILES({sql}, 100)[OFFSET({offset})]")
            }
            _ => ansi_metric_sql(sql, metric_type, percentile),
        }
    }
}
