//! Minimal SELECT statement model and its text rendering.
//!
//! Expressions are already SQL text by the time they get here (field SQL is
//! compiled with the explore). This layer only owns clause layout: each
//! clause starts on its own line, absent clauses leave an empty line, and
//! the LIMIT clause is always last.

use crate::dialect::Dialect;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    Desc,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectItem {
    pub expr: String,
    pub alias: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TableRef {
    /// Table reference as written after FROM / JOIN.
    pub sql: String,
    pub alias: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Join {
    pub table: TableRef,
    pub on: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderItem {
    /// Output column alias (unquoted).
    pub alias: String,
    pub direction: SortDirection,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectQuery {
    pub select: Vec<SelectItem>,
    pub from: TableRef,
    pub joins: Vec<Join>,
    /// AND-combined into the WHERE clause.
    pub filters: Vec<String>,
    /// Number of leading select items grouped by position.
    pub group_by: usize,
    pub order_by: Vec<OrderItem>,
    pub limit: Option<u64>,
}

/// Outer SELECT over a named common table expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CteQuery {
    pub name: String,
    pub inner: SelectQuery,
    /// Extra items after `*`.
    pub select: Vec<SelectItem>,
    pub filter: Option<String>,
    pub order_by: Vec<OrderItem>,
    pub limit: Option<u64>,
}

pub struct SqlRenderer<'d> {
    dialect: &'d dyn Dialect,
}

impl<'d> SqlRenderer<'d> {
    pub fn new(dialect: &'d dyn Dialect) -> Self {
        Self { dialect }
    }

    pub fn render_select(&self, query: &SelectQuery) -> String {
        let mut lines = self.body_lines(query);
        lines.push(self.render_order_by(&query.order_by));
        lines.push(render_limit(query.limit));
        lines.join("\n").trim_end().to_string()
    }

    /// `WITH <name> AS (<inner>) SELECT *, ... FROM <name> ...`. The inner
    /// query never carries ORDER BY or LIMIT.
    pub fn render_cte(&self, query: &CteQuery) -> String {
        let inner = self.body_lines(&query.inner).join("\n");

        let mut items = vec!["*".to_string()];
        items.extend(query.select.iter().map(|item| self.render_select_item(item)));
        let outer = [
            format!("SELECT\n  {}", items.join(",\n  ")),
            format!("FROM {}", query.name),
            query
                .filter
                .as_ref()
                .map(|f| format!("WHERE {f}"))
                .unwrap_or_default(),
            self.render_order_by(&query.order_by),
            render_limit(query.limit),
        ];
        format!("WITH {} AS (\n{inner}\n)\n{}", query.name, outer.join("\n"))
            .trim_end()
            .to_string()
    }

    fn body_lines(&self, query: &SelectQuery) -> Vec<String> {
        let items: Vec<String> = query
            .select
            .iter()
            .map(|item| self.render_select_item(item))
            .collect();
        let joins: Vec<String> = query
            .joins
            .iter()
            .map(|join| {
                format!(
                    "LEFT JOIN {}\n  ON {}",
                    self.render_table_ref(&join.table),
                    join.on
                )
            })
            .collect();
        let where_sql = if query.filters.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", query.filters.join(" AND "))
        };
        let group_by = if query.group_by == 0 {
            String::new()
        } else {
            let positions: Vec<String> = (1..=query.group_by).map(|i| i.to_string()).collect();
            format!("GROUP BY {}", positions.join(","))
        };
        vec![
            format!("SELECT\n  {}", items.join(",\n  ")),
            format!("FROM {}", self.render_table_ref(&query.from)),
            joins.join("\n"),
            where_sql,
            group_by,
        ]
    }

    fn render_select_item(&self, item: &SelectItem) -> String {
        match &item.alias {
            Some(alias) => format!("{} AS {}", item.expr, self.dialect.quote_ident(alias)),
            None => item.expr.clone(),
        }
    }

    fn render_table_ref(&self, table: &TableRef) -> String {
        format!("{} AS {}", table.sql, self.dialect.quote_ident(&table.alias))
    }

    fn render_order_by(&self, order_by: &[OrderItem]) -> String {
        if order_by.is_empty() {
            return String::new();
        }
        let items: Vec<String> = order_by
            .iter()
            .map(|o| {
                let dir = match o.direction {
                    SortDirection::Asc => "ASC",
                    SortDirection::Desc => "DESC",
                };
                format!("{} {dir}", self.dialect.quote_ident(&o.alias))
            })
            .collect();
        format!("ORDER BY {}", items.join(", "))
    }
}

fn render_limit(limit: Option<u64>) -> String {
    limit.map(|n| format!("LIMIT {n}")).unwrap_or_default()
}
