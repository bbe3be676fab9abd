//! Compiled, read-only explores.
//!
//! An [`Explore`] is built once by [`crate::compiler::compile_explore`] and
//! then shared (typically behind an `Arc`) by every query compiled against
//! it. All templates have already been resolved to dialect-quoted SQL.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use serde::Serialize;

use crate::dialect::DialectKind;
use crate::models::{DimensionType, MetricType};

/// Composite `table_field` key used by queries to address a field.
pub fn field_id(table: &str, name: &str) -> String {
    format!("{table}_{name}")
}

#[derive(Debug, Clone, Serialize)]
pub struct CompiledDimension {
    pub name: String,
    pub table: String,
    pub dimension_type: DimensionType,
    pub sql: String,
    pub compiled_sql: String,
    /// Every table the compiled SQL touches, including through nested references.
    pub tables_references: BTreeSet<String>,
    pub hidden: bool,
    pub label: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CompiledMetric {
    pub name: String,
    pub table: String,
    pub metric_type: MetricType,
    pub sql: String,
    pub compiled_sql: String,
    pub tables_references: BTreeSet<String>,
    pub hidden: bool,
    pub is_auto_generated: bool,
    pub percentile: Option<f64>,
    pub label: Option<String>,
    pub description: Option<String>,
}

/// Borrowed view over either kind of compiled field.
#[derive(Debug, Clone, Copy)]
pub enum FieldRef<'a> {
    Dimension(&'a CompiledDimension),
    Metric(&'a CompiledMetric),
}

impl<'a> FieldRef<'a> {
    pub fn table(&self) -> &'a str {
        match self {
            FieldRef::Dimension(d) => &d.table,
            FieldRef::Metric(m) => &m.table,
        }
    }

    pub fn name(&self) -> &'a str {
        match self {
            FieldRef::Dimension(d) => &d.name,
            FieldRef::Metric(m) => &m.name,
        }
    }

    pub fn field_id(&self) -> String {
        field_id(self.table(), self.name())
    }

    pub fn compiled_sql(&self) -> &'a str {
        match self {
            FieldRef::Dimension(d) => &d.compiled_sql,
            FieldRef::Metric(m) => &m.compiled_sql,
        }
    }

    pub fn tables_references(&self) -> &'a BTreeSet<String> {
        match self {
            FieldRef::Dimension(d) => &d.tables_references,
            FieldRef::Metric(m) => &m.tables_references,
        }
    }

    pub fn is_metric(&self) -> bool {
        matches!(self, FieldRef::Metric(_))
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CompiledTable {
    pub name: String,
    pub database: String,
    pub schema: String,
    /// Fully-qualified, quoted table reference used in FROM / JOIN.
    pub sql_table: String,
    pub sql_where: Option<String>,
    pub compiled_sql_where: Option<String>,
    /// Tables touched by the row filter (always includes this table).
    pub sql_where_references: BTreeSet<String>,
    pub dimensions: BTreeMap<String, CompiledDimension>,
    pub metrics: BTreeMap<String, CompiledMetric>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CompiledJoin {
    pub table: String,
    pub sql_on: String,
    pub compiled_sql_on: String,
    pub tables_references: BTreeSet<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum FieldKind {
    Dimension,
    Metric,
}

#[derive(Debug, Clone)]
pub(crate) struct FieldKey {
    pub(crate) table: String,
    pub(crate) name: String,
    pub(crate) kind: FieldKind,
}

#[derive(Debug, Clone)]
pub struct Explore {
    pub(crate) name: String,
    pub(crate) base_table: String,
    pub(crate) dialect: DialectKind,
    pub(crate) joins: Vec<CompiledJoin>,
    pub(crate) tables: BTreeMap<String, CompiledTable>,
    pub(crate) field_index: HashMap<String, FieldKey>,
}

impl Explore {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn base_table(&self) -> &str {
        &self.base_table
    }

    /// Dialect the explore's SQL was quoted for.
    pub fn dialect(&self) -> DialectKind {
        self.dialect
    }

    pub fn joins(&self) -> &[CompiledJoin] {
        &self.joins
    }

    pub fn tables(&self) -> &BTreeMap<String, CompiledTable> {
        &self.tables
    }

    pub fn table(&self, name: &str) -> Option<&CompiledTable> {
        self.tables.get(name)
    }

    pub fn join_for(&self, table: &str) -> Option<&CompiledJoin> {
        self.joins.iter().find(|j| j.table == table)
    }

    /// Look up a dimension or metric by its composite field id.
    pub fn field(&self, field_id: &str) -> Option<FieldRef<'_>> {
        let key = self.field_index.get(field_id)?;
        let table = self.tables.get(&key.table)?;
        match key.kind {
            FieldKind::Dimension => table.dimensions.get(&key.name).map(FieldRef::Dimension),
            FieldKind::Metric => table.metrics.get(&key.name).map(FieldRef::Metric),
        }
    }

    pub fn dimension(&self, table: &str, name: &str) -> Option<&CompiledDimension> {
        self.tables.get(table)?.dimensions.get(name)
    }

    pub fn metric(&self, table: &str, name: &str) -> Option<&CompiledMetric> {
        self.tables.get(table)?.metrics.get(name)
    }
}
