//! Field template resolution.
//!
//! Every dimension and metric of an explore is resolved exactly once. A
//! reference to another field splices in that field's *compiled* SQL, so
//! the referenced field's table set propagates to the referencing field.

use std::collections::{BTreeSet, HashMap};

use crate::dialect::Dialect;
use crate::error::{ExploreError, Result};
use crate::explore::{field_id, CompiledDimension, CompiledMetric};
use crate::models::{ExploreDefinition, MetricType};
use crate::template::{tokenize, Token};

#[derive(Debug, Clone, Default)]
pub(crate) struct ResolvedSql {
    pub(crate) sql: String,
    pub(crate) tables: BTreeSet<String>,
}

/// Walk a template owned by `owner`, delegating field references to
/// `resolve_ref(table, field)`. User attribute references are kept verbatim.
pub(crate) fn resolve_tokens(
    template: &str,
    owner: &str,
    dialect: &dyn Dialect,
    mut resolve_ref: impl FnMut(&str, &str) -> Result<ResolvedSql>,
) -> Result<ResolvedSql> {
    let mut resolved = ResolvedSql::default();
    resolved.tables.insert(owner.to_string());
    for token in tokenize(template)? {
        match token {
            Token::Text(text) => resolved.sql.push_str(text),
            Token::TableSelf => resolved.sql.push_str(&dialect.quote_ident(owner)),
            Token::FieldRef { table, field } => {
                let reference = resolve_ref(table.unwrap_or(owner), field)?;
                resolved.sql.push_str(&reference.sql);
                resolved.tables.extend(reference.tables);
            }
            Token::UserAttribute(_) => resolved.sql.push_str(&token.to_string()),
        }
    }
    Ok(resolved)
}

/// User attributes are only substituted in table row filters.
pub(crate) fn reject_user_attributes(template: &str, field: &str) -> Result<()> {
    let tokens = tokenize(template)?;
    match tokens.iter().find(|t| matches!(t, Token::UserAttribute(_))) {
        Some(token) => Err(ExploreError::Validation(format!(
            "{field} references user attribute {token}; attributes are only allowed in sql_where"
        ))),
        None => Ok(()),
    }
}

/// Wrap a resolved metric body in its aggregate.
pub(crate) fn aggregate_metric(
    body: ResolvedSql,
    metric_type: MetricType,
    percentile: Option<f64>,
    dialect: &dyn Dialect,
) -> ResolvedSql {
    if !metric_type.is_aggregate() {
        return body;
    }
    ResolvedSql {
        sql: dialect.metric_sql(&body.sql, metric_type, percentile),
        tables: body.tables,
    }
}

type FieldKey = (String, String);

/// Memoizing resolver over an explore definition.
pub(crate) struct FieldResolver<'a> {
    definition: &'a ExploreDefinition,
    dialect: &'a dyn Dialect,
    dimensions: HashMap<FieldKey, CompiledDimension>,
    metrics: HashMap<FieldKey, CompiledMetric>,
    in_progress: Vec<String>,
}

impl<'a> FieldResolver<'a> {
    pub(crate) fn new(definition: &'a ExploreDefinition, dialect: &'a dyn Dialect) -> Self {
        Self {
            definition,
            dialect,
            dimensions: HashMap::new(),
            metrics: HashMap::new(),
            in_progress: Vec::new(),
        }
    }

    pub(crate) fn dimension(&mut self, table: &str, name: &str) -> Result<ResolvedSql> {
        let key = (table.to_string(), name.to_string());
        if let Some(done) = self.dimensions.get(&key) {
            return Ok(ResolvedSql {
                sql: done.compiled_sql.clone(),
                tables: done.tables_references.clone(),
            });
        }
        let definition = self.definition;
        let dimension = definition
            .tables
            .get(table)
            .and_then(|t| t.dimensions.get(name))
            .ok_or_else(|| ExploreError::unknown_field(field_id(table, name)))?;
        reject_user_attributes(&dimension.sql, &field_id(table, name))?;

        self.enter(table, name)?;
        let dialect = self.dialect;
        let resolved = resolve_tokens(&dimension.sql, table, dialect, |t, f| self.dimension(t, f));
        self.in_progress.pop();
        let resolved = resolved?;

        self.dimensions.insert(
            key,
            CompiledDimension {
                name: name.to_string(),
                table: table.to_string(),
                dimension_type: dimension.dimension_type,
                sql: dimension.sql.clone(),
                compiled_sql: resolved.sql.clone(),
                tables_references: resolved.tables.clone(),
                hidden: dimension.hidden,
                label: dimension.label.clone(),
                description: dimension.description.clone(),
            },
        );
        Ok(resolved)
    }

    pub(crate) fn metric(&mut self, table: &str, name: &str) -> Result<ResolvedSql> {
        let key = (table.to_string(), name.to_string());
        if let Some(done) = self.metrics.get(&key) {
            return Ok(ResolvedSql {
                sql: done.compiled_sql.clone(),
                tables: done.tables_references.clone(),
            });
        }
        let definition = self.definition;
        let metric = definition
            .tables
            .get(table)
            .and_then(|t| t.metrics.get(name))
            .ok_or_else(|| ExploreError::unknown_field(field_id(table, name)))?;
        reject_user_attributes(&metric.sql, &field_id(table, name))?;

        self.enter(table, name)?;
        let dialect = self.dialect;
        let body = resolve_tokens(&metric.sql, table, dialect, |t, f| self.metric_reference(t, f));
        self.in_progress.pop();
        let resolved = aggregate_metric(body?, metric.metric_type, metric.percentile, dialect);

        self.metrics.insert(
            key,
            CompiledMetric {
                name: name.to_string(),
                table: table.to_string(),
                metric_type: metric.metric_type,
                sql: metric.sql.clone(),
                compiled_sql: resolved.sql.clone(),
                tables_references: resolved.tables.clone(),
                hidden: metric.hidden,
                is_auto_generated: metric.is_auto_generated,
                percentile: metric.percentile,
                label: metric.label.clone(),
                description: metric.description.clone(),
            },
        );
        Ok(resolved)
    }

    /// Metric templates see dimensions first, then metrics of the same table.
    fn metric_reference(&mut self, table: &str, name: &str) -> Result<ResolvedSql> {
        let owner = self.definition.tables.get(table);
        if owner.is_some_and(|t| t.dimensions.contains_key(name)) {
            return self.dimension(table, name);
        }
        self.metric(table, name)
    }

    fn enter(&mut self, table: &str, name: &str) -> Result<()> {
        let key = format!("{table}.{name}");
        if let Some(pos) = self.in_progress.iter().position(|k| *k == key) {
            let mut chain = self.in_progress[pos..].to_vec();
            chain.push(key.clone());
            return Err(ExploreError::CircularReference { field: key, chain });
        }
        self.in_progress.push(key);
        Ok(())
    }

    pub(crate) fn into_parts(
        self,
    ) -> (
        HashMap<FieldKey, CompiledDimension>,
        HashMap<FieldKey, CompiledMetric>,
    ) {
        (self.dimensions, self.metrics)
    }
}
