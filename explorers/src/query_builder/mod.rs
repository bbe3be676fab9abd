use crate::config::QueryConfig;
use crate::dialect::{dialect_for, Dialect};
use crate::error::{ExploreError, Result};
use crate::explore::Explore;
use crate::query::MetricQuery;
use crate::sql_ast::SqlRenderer;
use crate::template::UserAttributes;

mod compile;
mod components;
mod filters;
mod joins;
mod plan;
mod planner;

pub use compile::compile_metric_query;

/// Assembles dialect SQL for metric queries against compiled explores.
///
/// A builder holds no per-query state and can be shared across threads.
#[derive(Debug, Clone, Default)]
pub struct SqlBuilder {
    config: QueryConfig,
}

impl SqlBuilder {
    pub fn new(config: QueryConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &QueryConfig {
        &self.config
    }

    /// Build SQL using the dialect the explore was compiled for.
    pub fn build(&self, explore: &Explore, query: &MetricQuery) -> Result<String> {
        self.build_with_dialect(explore, query, dialect_for(explore.dialect()))
    }

    /// Build SQL using a provided dialect (useful for tests).
    pub fn build_with_dialect(
        &self,
        explore: &Explore,
        query: &MetricQuery,
        dialect: &dyn Dialect,
    ) -> Result<String> {
        self.assemble(explore, query, dialect, &UserAttributes::new())
    }

    /// Build SQL substituting user attributes referenced by table row filters.
    pub fn build_with_attributes(
        &self,
        explore: &Explore,
        query: &MetricQuery,
        attributes: &UserAttributes,
    ) -> Result<String> {
        self.assemble(explore, query, dialect_for(explore.dialect()), attributes)
    }

    fn assemble(
        &self,
        explore: &Explore,
        query: &MetricQuery,
        dialect: &dyn Dialect,
        attributes: &UserAttributes,
    ) -> Result<String> {
        if dialect.kind() != explore.dialect() {
            return Err(ExploreError::Validation(format!(
                "explore {} was compiled for {}, not {}",
                explore.name(),
                explore.dialect(),
                dialect.kind()
            )));
        }
        let compiled = compile_metric_query(explore, query, dialect)?;
        let components =
            components::resolve_components(explore, &compiled, dialect, attributes, &self.config)?;
        let joins = components.joins.len();
        let plan = planner::build_query(components, &compiled);
        let sql = plan.render(&SqlRenderer::new(dialect));

        tracing::debug!(
            explore = explore.name(),
            dialect = %dialect.kind(),
            shape = plan.shape(),
            joins,
            "assembled metric query"
        );
        tracing::trace!(sql = %sql, "generated sql");
        Ok(sql)
    }
}
