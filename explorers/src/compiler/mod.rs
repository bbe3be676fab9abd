//! Explore compilation: definitions in, immutable [`Explore`] out.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use crate::dialect::Dialect;
use crate::error::{ExploreError, Result};
use crate::explore::{field_id, CompiledJoin, CompiledTable, Explore, FieldKey, FieldKind};
use crate::models::{ExploreDefinition, JoinDefinition, TableDefinition};
use crate::template::{tokenize, Token};

mod fields;

pub(crate) use fields::{aggregate_metric, reject_user_attributes, resolve_tokens, ResolvedSql};
use fields::FieldResolver;

/// Compile every field, join and row filter of `definition` for `dialect`.
pub fn compile_explore(definition: &ExploreDefinition, dialect: &dyn Dialect) -> Result<Explore> {
    validate_structure(definition)?;
    let field_index = build_field_index(definition)?;

    let mut resolver = FieldResolver::new(definition, dialect);
    for (table_name, table) in &definition.tables {
        for name in table.dimensions.keys() {
            resolver.dimension(table_name, name)?;
        }
        for name in table.metrics.keys() {
            resolver.metric(table_name, name)?;
        }
    }

    let mut row_filters = HashMap::new();
    for (table_name, table) in &definition.tables {
        if let Some(sql_where) = &table.sql_where {
            let resolved =
                resolve_tokens(sql_where, table_name, dialect, |t, f| resolver.dimension(t, f))?;
            row_filters.insert(table_name.clone(), resolved);
        }
    }

    let joins = definition
        .joins
        .iter()
        .map(|join| compile_join(join, definition, dialect, &mut resolver))
        .collect::<Result<Vec<_>>>()?;

    let (mut dimensions, mut metrics) = resolver.into_parts();
    let mut tables = BTreeMap::new();
    for (table_name, table) in &definition.tables {
        let row_filter = row_filters.remove(table_name);
        let compiled = CompiledTable {
            name: table_name.clone(),
            database: table.database.clone(),
            schema: table.schema.clone(),
            sql_table: sql_table(table, dialect),
            sql_where: table.sql_where.clone(),
            sql_where_references: row_filter
                .as_ref()
                .map(|r| r.tables.clone())
                .unwrap_or_default(),
            compiled_sql_where: row_filter.map(|r| r.sql),
            dimensions: table
                .dimensions
                .keys()
                .filter_map(|name| {
                    dimensions
                        .remove(&(table_name.clone(), name.clone()))
                        .map(|d| (name.clone(), d))
                })
                .collect(),
            metrics: table
                .metrics
                .keys()
                .filter_map(|name| {
                    metrics
                        .remove(&(table_name.clone(), name.clone()))
                        .map(|m| (name.clone(), m))
                })
                .collect(),
        };
        tables.insert(table_name.clone(), compiled);
    }

    tracing::debug!(
        explore = definition.name.as_str(),
        dialect = %dialect.kind(),
        tables = tables.len(),
        joins = joins.len(),
        fields = field_index.len(),
        "compiled explore"
    );

    Ok(Explore {
        name: definition.name.clone(),
        base_table: definition.base_table.clone(),
        dialect: dialect.kind(),
        joins,
        tables,
        field_index,
    })
}

fn validate_structure(definition: &ExploreDefinition) -> Result<()> {
    for (key, table) in &definition.tables {
        if *key != table.name {
            return Err(ExploreError::Validation(format!(
                "table key {key} does not match table name {}",
                table.name
            )));
        }
    }
    if !definition.tables.contains_key(&definition.base_table) {
        return Err(ExploreError::Validation(format!(
            "explore {} base table {} not found",
            definition.name, definition.base_table
        )));
    }
    let mut joined = HashSet::new();
    for join in &definition.joins {
        if !definition.tables.contains_key(&join.table) {
            return Err(ExploreError::Validation(format!(
                "explore {} joins unknown table {}",
                definition.name, join.table
            )));
        }
        if join.table == definition.base_table || !joined.insert(join.table.as_str()) {
            return Err(ExploreError::Validation(format!(
                "explore {} joins table {} more than once",
                definition.name, join.table
            )));
        }
    }
    Ok(())
}

fn build_field_index(definition: &ExploreDefinition) -> Result<HashMap<String, FieldKey>> {
    let mut index = HashMap::new();
    for (table_name, table) in &definition.tables {
        let fields = table
            .dimensions
            .keys()
            .map(|n| (n, FieldKind::Dimension))
            .chain(table.metrics.keys().map(|n| (n, FieldKind::Metric)));
        for (name, kind) in fields {
            let id = field_id(table_name, name);
            let key = FieldKey {
                table: table_name.clone(),
                name: name.clone(),
                kind,
            };
            if let Some(existing) = index.insert(id.clone(), key) {
                return Err(ExploreError::Validation(format!(
                    "field id {id} is ambiguous: {}.{} and {table_name}.{name}",
                    existing.table, existing.name
                )));
            }
        }
    }
    Ok(index)
}

fn compile_join(
    join: &JoinDefinition,
    definition: &ExploreDefinition,
    dialect: &dyn Dialect,
    resolver: &mut FieldResolver<'_>,
) -> Result<CompiledJoin> {
    let mut sql = String::new();
    let mut tables = BTreeSet::new();
    tables.insert(join.table.clone());
    for token in tokenize(&join.sql_on)? {
        match token {
            Token::Text(text) => sql.push_str(text),
            Token::FieldRef {
                table: Some(table),
                field,
            } => {
                let owner = definition.tables.get(table).ok_or_else(|| {
                    ExploreError::Validation(format!(
                        "join to {} references unknown table {table}",
                        join.table
                    ))
                })?;
                if owner.dimensions.contains_key(field) {
                    let resolved = resolver.dimension(table, field)?;
                    sql.push_str(&format!("({})", resolved.sql));
                    tables.extend(resolved.tables);
                } else {
                    sql.push_str(&format!("({}.{field})", dialect.quote_ident(table)));
                    tables.insert(table.to_string());
                }
            }
            other => {
                return Err(ExploreError::Validation(format!(
                    "join to {} must reference fields as ${{table.field}}, found {other}",
                    join.table
                )))
            }
        }
    }
    Ok(CompiledJoin {
        table: join.table.clone(),
        sql_on: join.sql_on.clone(),
        compiled_sql_on: sql,
        tables_references: tables,
    })
}

fn sql_table(table: &TableDefinition, dialect: &dyn Dialect) -> String {
    match &table.sql_table {
        Some(sql) => sql.clone(),
        None => [&table.database, &table.schema, &table.name]
            .iter()
            .map(|part| dialect.quote_ident(part))
            .collect::<Vec<_>>()
            .join("."),
    }
}
