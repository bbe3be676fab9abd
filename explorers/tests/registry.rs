//! Integration tests for loading explores from YAML and the compiled explore API.

mod common;

use std::fs;

use explore::{DialectKind, ExploreConfig, ExploreError, ExploreRegistry, MetricQuery, SqlBuilder};
use tempfile::tempdir;

use common::{join_chain_definition, two_table_definition};

const ORDERS_YAML: &str = r#"
name: orders
base_table: orders
joins:
  - table: customers
    sql_on: ${orders.customer_id} = ${customers.customer_id}
  - table: regions
    sql_on: ${customers.region_id} = ${regions.region_id}
tables:
  orders:
    name: orders
    database: analytics
    schema: public
    dimensions:
      customer_id:
        type: number
        sql: ${TABLE}.customer_id
      status:
        type: string
        sql: ${TABLE}.status
    metrics:
      revenue:
        type: sum
        sql: ${TABLE}.amount
      order_count:
        type: count
        sql: ${TABLE}.order_id
      average_order_value:
        type: number
        sql: ${revenue} / NULLIF(${order_count}, 0)
  customers:
    name: customers
    database: analytics
    schema: public
    dimensions:
      customer_id:
        type: number
        sql: ${TABLE}.customer_id
      region_id:
        type: number
        sql: ${TABLE}.region_id
  regions:
    name: regions
    database: analytics
    schema: public
    dimensions:
      region_id:
        type: number
        sql: ${TABLE}.region_id
      name:
        type: string
        sql: ${TABLE}.name
"#;

const EVENTS_YAML: &str = r#"
name: events
base_table: events
tables:
  events:
    name: events
    database: warehouse
    schema: raw
    dimensions:
      kind:
        type: string
        sql: ${TABLE}.kind
    metrics:
      p90_latency:
        type: percentile
        percentile: 90
        sql: ${TABLE}.latency_ms
"#;

fn write_explores() -> tempfile::TempDir {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("orders.yml"), ORDERS_YAML).unwrap();
    fs::write(dir.path().join("events.yaml"), EVENTS_YAML).unwrap();
    fs::write(dir.path().join("notes.txt"), "not an explore").unwrap();
    dir
}

#[test]
fn loads_yml_and_yaml_files() {
    let dir = write_explores();
    let registry = ExploreRegistry::load_from_dir(dir.path(), &ExploreConfig::default()).unwrap();
    assert_eq!(registry.names(), vec!["events", "orders"]);
    assert!(registry.get("missing").is_none());
}

#[test]
fn compiled_explore_exposes_fields_and_joins() {
    let dir = write_explores();
    let registry = ExploreRegistry::load_from_dir(dir.path(), &ExploreConfig::default()).unwrap();
    let orders = registry.get("orders").unwrap();

    assert_eq!(orders.dialect(), DialectKind::Postgres);
    assert_eq!(
        orders.table("orders").unwrap().sql_table,
        r#""analytics"."public"."orders""#
    );

    let aov = orders.field("orders_average_order_value").unwrap();
    assert!(aov.is_metric());
    assert_eq!(
        aov.compiled_sql(),
        r#"SUM("orders".amount) / NULLIF(COUNT("orders".order_id), 0)"#
    );

    let regions_join = orders.join_for("regions").unwrap();
    assert_eq!(
        regions_join.compiled_sql_on,
        r#"("customers".region_id) = ("regions".region_id)"#
    );
    let touched: Vec<&str> = regions_join
        .tables_references
        .iter()
        .map(String::as_str)
        .collect();
    assert_eq!(touched, vec!["customers", "regions"]);
}

#[test]
fn per_explore_dialect_from_config() {
    let dir = write_explores();
    let config = ExploreConfig::from_toml(
        r#"
[explores.events]
dialect = "bigquery"
"#,
    )
    .unwrap();
    let registry = ExploreRegistry::load_from_dir(dir.path(), &config).unwrap();
    let events = registry.get("events").unwrap();
    assert_eq!(events.dialect(), DialectKind::BigQuery);

    let query: MetricQuery = serde_json::from_value(serde_json::json!({
        "dimensions": ["events_kind"],
        "metrics": ["events_p90_latency"]
    }))
    .unwrap();
    let sql = SqlBuilder::default().build(&events, &query).unwrap();
    assert_eq!(
        sql,
        "SELECT\n  `events`.kind AS `events_kind`,\n  APPROX_QUANTILES(`events`.latency_ms, 100)[OFFSET(90)] AS `events_p90_latency`\nFROM `warehouse`.`raw`.`events` AS `events`\n\n\nGROUP BY 1"
    );
}

#[test]
fn transitive_join_is_included_in_declared_order() {
    let dir = write_explores();
    let registry = ExploreRegistry::load_from_dir(dir.path(), &ExploreConfig::default()).unwrap();
    let orders = registry.get("orders").unwrap();
    let query: MetricQuery = serde_json::from_value(serde_json::json!({
        "dimensions": ["regions_name"],
        "metrics": ["orders_revenue"]
    }))
    .unwrap();
    let sql = SqlBuilder::default().build(&orders, &query).unwrap();
    let customers = sql.find(r#"LEFT JOIN "analytics"."public"."customers""#).unwrap();
    let regions = sql.find(r#"LEFT JOIN "analytics"."public"."regions""#).unwrap();
    assert!(customers < regions);
}

#[test]
fn missing_directory_is_an_error() {
    let dir = tempdir().unwrap();
    let err = ExploreRegistry::load_from_dir(dir.path().join("nope"), &ExploreConfig::default())
        .unwrap_err();
    assert!(matches!(err, ExploreError::Validation(_)));
}

#[test]
fn malformed_yaml_is_an_error() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("bad.yml"), "name: [unclosed").unwrap();
    let err =
        ExploreRegistry::load_from_dir(dir.path(), &ExploreConfig::default()).unwrap_err();
    assert!(matches!(err, ExploreError::Yaml(_)));
}

#[test]
fn duplicate_explore_names_are_rejected() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("a.yml"), EVENTS_YAML).unwrap();
    fs::write(dir.path().join("b.yaml"), EVENTS_YAML).unwrap();
    let err =
        ExploreRegistry::load_from_dir(dir.path(), &ExploreConfig::default()).unwrap_err();
    assert!(matches!(err, ExploreError::Validation(_)));
}

#[test]
fn builds_from_in_memory_definitions() {
    let config = ExploreConfig::from_toml(
        r#"
[defaults]
dialect = "duckdb"

[explores.myexplore]
dialect = "bigquery"
"#,
    )
    .unwrap();
    let registry = ExploreRegistry::from_definitions(
        vec![two_table_definition(), join_chain_definition()],
        &config,
    )
    .unwrap();
    assert_eq!(registry.len(), 2);
    assert_eq!(registry.names(), vec!["myexplore", "table1"]);
    assert_eq!(registry.get("table1").unwrap().dialect(), DialectKind::DuckDb);

    let chain = registry.get("myexplore").unwrap();
    assert_eq!(chain.dialect(), DialectKind::BigQuery);
    assert_eq!(chain.table("table5").unwrap().sql_table, "`db`.`schema`.`table5`");

    let duplicate =
        ExploreRegistry::from_definitions(vec![two_table_definition(), two_table_definition()], &config)
            .unwrap_err();
    assert!(matches!(duplicate, ExploreError::Validation(_)));
}
