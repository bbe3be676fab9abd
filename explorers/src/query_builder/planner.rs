//! Query planner orchestration.
//!
//! Turns resolved components into a single-stage or two-stage plan.

use crate::explore::FieldRef;
use crate::query::CompiledMetricQuery;
use crate::sql_ast::{CteQuery, Join, SelectItem, SelectQuery, TableRef};

use super::components::QueryComponents;
use super::plan::{QueryPlan, METRICS_CTE};

pub(crate) fn build_query(
    components: QueryComponents<'_>,
    compiled: &CompiledMetricQuery,
) -> QueryPlan {
    let mut select: Vec<SelectItem> = components
        .dimensions
        .iter()
        .map(field_select)
        .collect();
    select.extend(components.metrics.iter().map(field_select));

    let aggregate = SelectQuery {
        select,
        from: TableRef {
            sql: components.base_table.sql_table.clone(),
            alias: components.base_table.name.clone(),
        },
        joins: components
            .joins
            .iter()
            .map(|(join, table)| Join {
                table: TableRef {
                    sql: table.sql_table.clone(),
                    alias: table.name.clone(),
                },
                on: join.compiled_sql_on.clone(),
            })
            .collect(),
        filters: components.filters,
        group_by: components.dimensions.len(),
        order_by: Vec::new(),
        limit: None,
    };

    if !components.two_stage {
        return QueryPlan::SingleStage(SelectQuery {
            order_by: components.order,
            limit: components.limit,
            ..aggregate
        });
    }

    QueryPlan::TwoStage(CteQuery {
        name: METRICS_CTE.to_string(),
        inner: aggregate,
        select: compiled
            .compiled_table_calculations
            .iter()
            .map(|calc| SelectItem {
                expr: calc.compiled_sql.clone(),
                alias: Some(calc.name.clone()),
            })
            .collect(),
        filter: components.metric_filter,
        order_by: components.order,
        limit: components.limit,
    })
}

fn field_select(field: &FieldRef<'_>) -> SelectItem {
    SelectItem {
        expr: field.compiled_sql().to_string(),
        alias: Some(field.field_id()),
    }
}
