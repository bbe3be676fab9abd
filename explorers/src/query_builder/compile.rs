//! Per-query compilation: additional metrics and table calculations.

use std::collections::HashSet;

use crate::compiler::{aggregate_metric, reject_user_attributes, resolve_tokens, ResolvedSql};
use crate::dialect::Dialect;
use crate::error::{ExploreError, Result};
use crate::explore::{field_id, CompiledMetric, Explore};
use crate::query::{
    AdditionalMetric, CompiledMetricQuery, CompiledTableCalculation, MetricQuery,
    TableCalculation,
};
use crate::template::{tokenize, Token};

/// Compile the parts of `query` that are defined in the query itself.
pub fn compile_metric_query(
    explore: &Explore,
    query: &MetricQuery,
    dialect: &dyn Dialect,
) -> Result<CompiledMetricQuery> {
    let mut compiled_additional_metrics = Vec::with_capacity(query.additional_metrics.len());
    let mut additional_ids = HashSet::new();
    for metric in &query.additional_metrics {
        let compiled = compile_additional_metric(explore, metric, dialect)?;
        let id = field_id(&compiled.table, &compiled.name);
        if explore.field(&id).is_some() || !additional_ids.insert(id.clone()) {
            return Err(ExploreError::Validation(format!(
                "additional metric {id} duplicates an existing field"
            )));
        }
        compiled_additional_metrics.push(compiled);
    }

    let selected: HashSet<&str> = query
        .dimensions
        .iter()
        .chain(query.metrics.iter())
        .map(String::as_str)
        .collect();
    let mut calc_names = HashSet::new();
    let mut compiled_table_calculations = Vec::with_capacity(query.table_calculations.len());
    for calc in &query.table_calculations {
        if calc.name.is_empty() {
            return Err(ExploreError::Validation(
                "table calculation name must not be empty".to_string(),
            ));
        }
        if selected.contains(calc.name.as_str()) || !calc_names.insert(calc.name.as_str()) {
            return Err(ExploreError::Validation(format!(
                "table calculation {} collides with another output column",
                calc.name
            )));
        }
        let known = |id: &str| {
            explore.field(id).is_some() || additional_ids.contains(id)
        };
        compiled_table_calculations.push(compile_table_calculation(calc, &selected, known)?);
    }

    Ok(CompiledMetricQuery {
        query: query.clone(),
        compiled_table_calculations,
        compiled_additional_metrics,
    })
}

/// Additional metrics resolve against the already-compiled explore: field
/// references splice in compiled SQL and carry their table sets along.
fn compile_additional_metric(
    explore: &Explore,
    metric: &AdditionalMetric,
    dialect: &dyn Dialect,
) -> Result<CompiledMetric> {
    if explore.table(&metric.table).is_none() {
        return Err(ExploreError::unknown_field(field_id(&metric.table, &metric.name)));
    }
    reject_user_attributes(&metric.sql, &field_id(&metric.table, &metric.name))?;
    let body = resolve_tokens(&metric.sql, &metric.table, dialect, |table, name| {
        let field = explore
            .dimension(table, name)
            .map(|d| (&d.compiled_sql, &d.tables_references))
            .or_else(|| {
                explore
                    .metric(table, name)
                    .map(|m| (&m.compiled_sql, &m.tables_references))
            })
            .ok_or_else(|| ExploreError::unknown_field(field_id(table, name)))?;
        Ok(ResolvedSql {
            sql: field.0.clone(),
            tables: field.1.clone(),
        })
    })?;
    let resolved = aggregate_metric(body, metric.metric_type, metric.percentile, dialect);
    Ok(CompiledMetric {
        name: metric.name.clone(),
        table: metric.table.clone(),
        metric_type: metric.metric_type,
        sql: metric.sql.clone(),
        compiled_sql: resolved.sql,
        tables_references: resolved.tables,
        hidden: metric.hidden,
        is_auto_generated: true,
        percentile: metric.percentile,
        label: metric.label.clone(),
        description: metric.description.clone(),
    })
}

/// Rewrite `${table.field}` to the bare output alias of a selected field.
fn compile_table_calculation(
    calc: &TableCalculation,
    selected: &HashSet<&str>,
    known: impl Fn(&str) -> bool,
) -> Result<CompiledTableCalculation> {
    let mut sql = String::with_capacity(calc.sql.len());
    for token in tokenize(&calc.sql)? {
        match token {
            Token::Text(text) => sql.push_str(text),
            Token::FieldRef {
                table: Some(table),
                field,
            } => {
                let id = field_id(table, field);
                if !selected.contains(id.as_str()) {
                    if known(&id) {
                        return Err(ExploreError::Validation(format!(
                            "table calculation {} references {id}, which is not selected",
                            calc.name
                        )));
                    }
                    return Err(ExploreError::unknown_field(id));
                }
                sql.push_str(&id);
            }
            other => {
                return Err(ExploreError::Validation(format!(
                    "table calculation {} must reference fields as ${{table.field}}, found {other}",
                    calc.name
                )))
            }
        }
    }
    Ok(CompiledTableCalculation {
        name: calc.name.clone(),
        display_name: calc.display_name.clone(),
        sql: calc.sql.clone(),
        compiled_sql: sql,
    })
}
