//! Shared explore fixtures for integration tests.

#![allow(dead_code)]

use std::collections::BTreeMap;

use explore::{
    compile_explore, Dialect, DimensionDefinition, DimensionType, Explore, ExploreDefinition,
    JoinDefinition, MetricDefinition, MetricType, MetricQuery, TableDefinition,
};

pub fn table(
    name: &str,
    dimensions: &[(&str, DimensionType, &str)],
    metrics: &[(&str, MetricType, &str)],
) -> TableDefinition {
    TableDefinition {
        name: name.to_string(),
        database: "db".to_string(),
        schema: "schema".to_string(),
        sql_table: None,
        sql_where: None,
        dimensions: dimensions
            .iter()
            .map(|(n, t, sql)| (n.to_string(), DimensionDefinition::new(*t, *sql)))
            .collect(),
        metrics: metrics
            .iter()
            .map(|(n, t, sql)| (n.to_string(), MetricDefinition::new(*t, *sql)))
            .collect(),
        description: None,
    }
}

pub fn join(table: &str, sql_on: &str) -> JoinDefinition {
    JoinDefinition {
        table: table.to_string(),
        sql_on: sql_on.to_string(),
    }
}

pub fn definition(
    name: &str,
    base_table: &str,
    joins: Vec<JoinDefinition>,
    tables: Vec<TableDefinition>,
) -> ExploreDefinition {
    ExploreDefinition {
        name: name.to_string(),
        base_table: base_table.to_string(),
        joins,
        tables: tables
            .into_iter()
            .map(|t| (t.name.clone(), t))
            .collect::<BTreeMap<_, _>>(),
        description: None,
    }
}

/// Two tables joined on a shared column. `table1` carries a dimension and
/// a metric that reach into `table2`.
pub fn two_table_definition() -> ExploreDefinition {
    definition(
        "table1",
        "table1",
        vec![join("table2", "${table1.shared} = ${table2.shared}")],
        vec![
            table(
                "table1",
                &[
                    ("dim1", DimensionType::Number, "${TABLE}.dim1"),
                    ("shared", DimensionType::String, "${TABLE}.shared"),
                    (
                        "with_reference",
                        DimensionType::Number,
                        "${TABLE}.dim1 + ${table2.dim2}",
                    ),
                ],
                &[
                    ("metric1", MetricType::Max, "${TABLE}.number_column"),
                    (
                        "metric_that_references_dim_from_table2",
                        MetricType::Max,
                        "${table2.dim2}",
                    ),
                ],
            ),
            table(
                "table2",
                &[
                    ("dim2", DimensionType::Number, "${TABLE}.dim2"),
                    ("shared", DimensionType::String, "${TABLE}.shared"),
                ],
                &[("metric2", MetricType::Max, "${TABLE}.number_column")],
            ),
        ],
    )
}

/// table1 <- table2 <- table3 <- table4 <- table5, fields only on table5.
pub fn join_chain_definition() -> ExploreDefinition {
    let mut tables: Vec<TableDefinition> = (1..=4)
        .map(|i| table(&format!("table{i}"), &[], &[]))
        .collect();
    tables.push(table(
        "table5",
        &[("dim1", DimensionType::Number, "${TABLE}.dim1")],
        &[("metric1", MetricType::Max, "${TABLE}.number_column")],
    ));
    let joins = (2..=5)
        .map(|i| {
            join(
                &format!("table{i}"),
                &format!("${{table{i}.col}} = ${{table{}.col}}", i - 1),
            )
        })
        .collect();
    definition("myexplore", "table1", joins, tables)
}

pub fn compile(definition: &ExploreDefinition, dialect: &dyn Dialect) -> Explore {
    compile_explore(definition, dialect).expect("fixture explore compiles")
}

pub fn query(value: serde_json::Value) -> MetricQuery {
    serde_json::from_value(value).expect("fixture query parses")
}
