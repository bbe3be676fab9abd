//! Query plan intermediate representation.
//!
//! The plan records which shape was chosen; the SQL text is produced by
//! [`SqlRenderer`] afterwards.

use crate::sql_ast::{CteQuery, SelectQuery, SqlRenderer};

/// Name of the common table expression holding aggregated metrics.
pub(crate) const METRICS_CTE: &str = "metrics";

#[derive(Debug, Clone)]
pub(crate) enum QueryPlan {
    /// One aggregating SELECT with ORDER BY and LIMIT.
    SingleStage(SelectQuery),
    /// Aggregating SELECT wrapped in a CTE, filtered and extended by an
    /// outer SELECT over its output aliases.
    TwoStage(CteQuery),
}

impl QueryPlan {
    pub(crate) fn shape(&self) -> &'static str {
        match self {
            QueryPlan::SingleStage(_) => "single_stage",
            QueryPlan::TwoStage(_) => "two_stage",
        }
    }

    pub(crate) fn render(&self, renderer: &SqlRenderer<'_>) -> String {
        match self {
            QueryPlan::SingleStage(query) => renderer.render_select(query),
            QueryPlan::TwoStage(query) => renderer.render_cte(query),
        }
    }
}
