//! Resolve a compiled metric query against an explore.
//!
//! Everything that can fail does so here, before any SQL text is laid out:
//! unknown ids, kind mismatches, unselected sort keys, the join closure and
//! both filter trees.

use std::collections::{BTreeSet, HashSet};

use crate::config::QueryConfig;
use crate::dialect::Dialect;
use crate::error::{ExploreError, Result};
use crate::explore::{CompiledJoin, CompiledTable, Explore, FieldRef};
use crate::query::{CompiledMetricQuery, FilterGroup};
use crate::sql_ast::{OrderItem, SortDirection};
use crate::template::{replace_user_attributes, UserAttributes};

use super::filters::render_filter_group;
use super::joins::select_required_joins;

#[derive(Debug)]
pub(crate) struct QueryComponents<'a> {
    pub(crate) base_table: &'a CompiledTable,
    pub(crate) dimensions: Vec<FieldRef<'a>>,
    pub(crate) metrics: Vec<FieldRef<'a>>,
    pub(crate) joins: Vec<(&'a CompiledJoin, &'a CompiledTable)>,
    /// AND-combined WHERE parts of the aggregating query.
    pub(crate) filters: Vec<String>,
    /// Post-aggregation filter over output aliases.
    pub(crate) metric_filter: Option<String>,
    pub(crate) two_stage: bool,
    pub(crate) order: Vec<OrderItem>,
    pub(crate) limit: Option<u64>,
}

pub(crate) fn resolve_components<'a>(
    explore: &'a Explore,
    compiled: &'a CompiledMetricQuery,
    dialect: &dyn Dialect,
    attributes: &UserAttributes,
    config: &QueryConfig,
) -> Result<QueryComponents<'a>> {
    let query = &compiled.query;
    let lookup = |id: &str| -> Result<FieldRef<'a>> {
        explore
            .field(id)
            .or_else(|| compiled.additional_metric(id))
            .ok_or_else(|| ExploreError::unknown_field(id))
    };

    if query.dimensions.is_empty() && query.metrics.is_empty() {
        return Err(ExploreError::Validation(
            "query must select at least one dimension or metric".to_string(),
        ));
    }
    let mut selected = HashSet::new();
    for id in query.dimensions.iter().chain(query.metrics.iter()) {
        if !selected.insert(id.as_str()) {
            return Err(ExploreError::Validation(format!(
                "field {id} is selected more than once"
            )));
        }
    }

    let mut required = BTreeSet::new();
    let mut dimensions = Vec::with_capacity(query.dimensions.len());
    for id in &query.dimensions {
        let field = lookup(id)?;
        if field.is_metric() {
            return Err(ExploreError::Validation(format!(
                "{id} is a metric and cannot be selected as a dimension"
            )));
        }
        required.extend(field.tables_references().iter().cloned());
        dimensions.push(field);
    }
    let mut metrics = Vec::with_capacity(query.metrics.len());
    for id in &query.metrics {
        let field = lookup(id)?;
        if !field.is_metric() {
            return Err(ExploreError::Validation(format!(
                "{id} is a dimension and cannot be selected as a metric"
            )));
        }
        required.extend(field.tables_references().iter().cloned());
        metrics.push(field);
    }

    // Disabled rules still pull in their target's tables.
    let dimension_filter = match &query.filters.dimensions {
        Some(group) => {
            for rule in group.rules() {
                let field = lookup(&rule.target.field_id)?;
                if field.is_metric() {
                    return Err(ExploreError::Validation(format!(
                        "dimension filter targets metric {}",
                        rule.target.field_id
                    )));
                }
                required.extend(field.tables_references().iter().cloned());
            }
            render_filter_group(group, dialect, &mut |rule| {
                lookup(&rule.target.field_id).map(|f| f.compiled_sql().to_string())
            })?
        }
        None => None,
    };

    let metric_rules = query
        .filters
        .metrics
        .as_ref()
        .map_or(0, |group| group.rules().len());
    let two_stage = metric_rules > 0 || !query.table_calculations.is_empty();
    let metric_filter = match &query.filters.metrics {
        Some(group) => render_metric_filter(group, &selected, dialect, &lookup)?,
        None => None,
    };

    let calc_names: HashSet<&str> = compiled
        .compiled_table_calculations
        .iter()
        .map(|c| c.name.as_str())
        .collect();
    let mut order = Vec::with_capacity(query.sorts.len());
    for sort in &query.sorts {
        let id = sort.field_id.as_str();
        if !selected.contains(id) && !calc_names.contains(id) {
            lookup(id)?;
            return Err(ExploreError::Validation(format!(
                "cannot sort by {id} because it is not selected"
            )));
        }
        order.push(OrderItem {
            alias: sort.field_id.clone(),
            direction: if sort.descending {
                SortDirection::Desc
            } else {
                SortDirection::Asc
            },
        });
    }

    let base_table = explore.table(explore.base_table()).ok_or_else(|| {
        ExploreError::Validation(format!(
            "explore {} base table {} not found",
            explore.name(),
            explore.base_table()
        ))
    })?;
    let joins = select_required_joins(explore, required)?
        .into_iter()
        .map(|join| {
            explore
                .table(&join.table)
                .map(|table| (join, table))
                .ok_or_else(|| ExploreError::MissingJoin {
                    explore: explore.name().to_string(),
                    table: join.table.clone(),
                })
        })
        .collect::<Result<Vec<_>>>()?;

    let mut row_filters = Vec::new();
    let tables = std::iter::once(base_table).chain(joins.iter().map(|(_, table)| *table));
    for table in tables {
        if let Some(sql_where) = &table.compiled_sql_where {
            row_filters.push(replace_user_attributes(sql_where, attributes, dialect)?);
        }
    }
    let part_count = row_filters.len() + usize::from(dimension_filter.is_some());
    let mut filters: Vec<String> = if part_count > 1 {
        row_filters.into_iter().map(|sql| format!("({sql})")).collect()
    } else {
        row_filters
    };
    filters.extend(dimension_filter);

    Ok(QueryComponents {
        base_table,
        dimensions,
        metrics,
        joins,
        filters,
        metric_filter: if two_stage { metric_filter } else { None },
        two_stage,
        order,
        limit: config.effective_limit(query.limit),
    })
}

/// Metric filters run after aggregation, so rule targets become quoted
/// output aliases. Enabled rules may only target selected fields.
fn render_metric_filter<'a>(
    group: &FilterGroup,
    selected: &HashSet<&str>,
    dialect: &dyn Dialect,
    lookup: &impl Fn(&str) -> Result<FieldRef<'a>>,
) -> Result<Option<String>> {
    for rule in group.rules() {
        let id = rule.target.field_id.as_str();
        lookup(id)?;
        if !rule.disabled && !selected.contains(id) {
            return Err(ExploreError::Validation(format!(
                "metric filter on {id} requires it to be selected"
            )));
        }
    }
    render_filter_group(group, dialect, &mut |rule| {
        Ok(dialect.quote_ident(&rule.target.field_id))
    })
}
