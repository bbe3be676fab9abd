use serde_json::Value;

use crate::dialect::Dialect;
use crate::error::{ExploreError, Result};
use crate::query::{FilterGroup, FilterNode, FilterOperator, FilterRule};

/// Placeholder emitted for disabled rules so the group keeps its shape.
pub(crate) const DISABLED_RULE_SQL: &str = "1=1";

/// Render a filter tree. Empty groups (at any depth) render to `None` and
/// are dropped by their parent; a group whose children all drop is empty.
pub(crate) fn render_filter_group(
    group: &FilterGroup,
    dialect: &dyn Dialect,
    target_sql: &mut impl FnMut(&FilterRule) -> Result<String>,
) -> Result<Option<String>> {
    let mut parts = Vec::with_capacity(group.items.len());
    for item in &group.items {
        let rendered = match item {
            FilterNode::Group(inner) => render_filter_group(inner, dialect, target_sql)?,
            FilterNode::Rule(rule) => Some(render_filter_rule(rule, dialect, target_sql)?),
        };
        parts.extend(rendered);
    }
    if parts.is_empty() {
        return Ok(None);
    }
    Ok(Some(format!("({})", parts.join(group.combinator.sql()))))
}

fn render_filter_rule(
    rule: &FilterRule,
    dialect: &dyn Dialect,
    target_sql: &mut impl FnMut(&FilterRule) -> Result<String>,
) -> Result<String> {
    if rule.disabled {
        return Ok(format!("(\n  {DISABLED_RULE_SQL}\n)"));
    }
    let operator = rule.operator()?;
    if !dialect.supports_operator(operator) {
        return Err(ExploreError::UnsupportedOperator {
            operator: rule.operator.clone(),
            reason: format!("not supported by the {} dialect", dialect.kind()),
        });
    }
    let target = target_sql(rule)?;
    let sql = render_condition(&target, operator, &rule.values, dialect)?;
    Ok(format!("(\n  {sql}\n)"))
}

fn render_condition(
    target: &str,
    operator: FilterOperator,
    values: &[Value],
    dialect: &dyn Dialect,
) -> Result<String> {
    let sql = match operator {
        FilterOperator::IsNull => format!("({target}) IS NULL"),
        FilterOperator::NotNull => format!("({target}) IS NOT NULL"),
        FilterOperator::Equals | FilterOperator::NotEquals => {
            if values.is_empty() {
                return Ok("true".to_string());
            }
            let list = render_value_list(values, dialect)?;
            let keyword = if operator == FilterOperator::Equals {
                "IN"
            } else {
                "NOT IN"
            };
            format!("({target}) {keyword} ({list})")
        }
        FilterOperator::StartsWith => render_patterns(values, " OR ", |v| {
            format!("({target}) LIKE {}", dialect.quote_string(&format!("{v}%")))
        })?,
        FilterOperator::EndsWith => render_patterns(values, " OR ", |v| {
            format!("({target}) LIKE {}", dialect.quote_string(&format!("%{v}")))
        })?,
        FilterOperator::Include => render_patterns(values, " OR ", |v| {
            format!(
                "LOWER({target}) LIKE LOWER({})",
                dialect.quote_string(&format!("%{v}%"))
            )
        })?,
        FilterOperator::DoesNotInclude => render_patterns(values, " AND ", |v| {
            format!(
                "LOWER({target}) NOT LIKE LOWER({})",
                dialect.quote_string(&format!("%{v}%"))
            )
        })?,
        FilterOperator::LessThan
        | FilterOperator::LessThanOrEqual
        | FilterOperator::GreaterThan
        | FilterOperator::GreaterThanOrEqual => {
            let [value] = values else {
                return Err(arity_error(operator, "exactly one value", values.len()));
            };
            let symbol = match operator {
                FilterOperator::LessThan => "<",
                FilterOperator::LessThanOrEqual => "<=",
                FilterOperator::GreaterThan => ">",
                _ => ">=",
            };
            format!("({target}) {symbol} ({})", render_value(value, dialect)?)
        }
        FilterOperator::InBetween => {
            let [low, high] = values else {
                return Err(arity_error(operator, "exactly two values", values.len()));
            };
            format!(
                "({target}) BETWEEN ({}) AND ({})",
                render_value(low, dialect)?,
                render_value(high, dialect)?
            )
        }
    };
    Ok(sql)
}

fn render_patterns(
    values: &[Value],
    separator: &str,
    render: impl Fn(&str) -> String,
) -> Result<String> {
    if values.is_empty() {
        return Ok("true".to_string());
    }
    let mut conditions = values
        .iter()
        .map(|v| pattern_text(v).map(|text| render(&text)))
        .collect::<Result<Vec<_>>>()?;
    if conditions.len() == 1 {
        return Ok(conditions.remove(0));
    }
    Ok(format!("({})", conditions.join(separator)))
}

fn pattern_text(value: &Value) -> Result<String> {
    match value {
        Value::String(s) => Ok(s.clone()),
        Value::Number(n) => Ok(n.to_string()),
        Value::Bool(b) => Ok(b.to_string()),
        other => Err(ExploreError::Validation(format!(
            "pattern filters need string values, got {other}"
        ))),
    }
}

fn render_value_list(values: &[Value], dialect: &dyn Dialect) -> Result<String> {
    let rendered = values
        .iter()
        .map(|v| render_value(v, dialect))
        .collect::<Result<Vec<_>>>()?;
    Ok(rendered.join(", "))
}

/// Literal for a filter value. Strings always go through the dialect's
/// quoting and escaping.
fn render_value(value: &Value, dialect: &dyn Dialect) -> Result<String> {
    match value {
        Value::Null => Ok("NULL".to_string()),
        Value::Bool(true) => Ok("TRUE".to_string()),
        Value::Bool(false) => Ok("FALSE".to_string()),
        Value::Number(n) => Ok(n.to_string()),
        Value::String(s) => Ok(dialect.quote_string(s)),
        other => Err(ExploreError::Validation(format!(
            "filter values must be scalars, got {other}"
        ))),
    }
}

fn arity_error(operator: FilterOperator, expected: &str, got: usize) -> ExploreError {
    ExploreError::UnsupportedOperator {
        operator: operator.to_string(),
        reason: format!("needs {expected}, got {got}"),
    }
}
