pub mod compiler;
pub mod config;
pub mod dialect;
pub mod error;
pub mod explore;
pub mod models;
pub mod query;
pub mod query_builder;
pub mod registry;
pub mod sql_ast;
pub mod template;

pub use compiler::compile_explore;
pub use config::{ExploreConfig, QueryConfig, ResolvedExploreConfig};
pub use dialect::{dialect_for, Dialect, DialectKind};
pub use error::{ExploreError, Result};
pub use explore::{
    field_id, CompiledDimension, CompiledJoin, CompiledMetric, CompiledTable, Explore, FieldRef,
};
pub use models::{
    DimensionDefinition, DimensionType, ExploreDefinition, JoinDefinition, MetricDefinition,
    MetricType, TableDefinition,
};
pub use query::{
    AdditionalMetric, CompiledMetricQuery, FilterCombinator, FilterGroup, FilterNode,
    FilterOperator, FilterRule, MetricQuery, QueryLimit, SortField, TableCalculation,
};
pub use query_builder::{compile_metric_query, SqlBuilder};
pub use registry::ExploreRegistry;
pub use template::UserAttributes;
