//! Tokenizer for the `${...}` reference syntax used in field, join, row
//! filter and table calculation templates.
//!
//! - `${TABLE}` refers to the table that owns the template
//! - `${table.field}` refers to a field on another (or the same) table
//! - `${field}` refers to a field on the owning table
//! - `${lightdash.attribute.name}` / `${ld.attr.name}` is a user attribute
//!   that is only substituted when a query is built

use std::collections::BTreeMap;
use std::fmt;

use crate::dialect::Dialect;
use crate::error::{ExploreError, Result};

/// Values substituted for user attribute references in row filters.
pub type UserAttributes = BTreeMap<String, String>;

const SELF_REFERENCE: &str = "TABLE";
const ATTRIBUTE_PREFIXES: [&str; 2] = ["lightdash.attribute.", "ld.attr."];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Token<'a> {
    Text(&'a str),
    TableSelf,
    FieldRef {
        table: Option<&'a str>,
        field: &'a str,
    },
    UserAttribute(&'a str),
}

impl fmt::Display for Token<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Text(text) => f.write_str(text),
            Token::TableSelf => write!(f, "${{{SELF_REFERENCE}}}"),
            Token::FieldRef {
                table: Some(table),
                field,
            } => write!(f, "${{{table}.{field}}}"),
            Token::FieldRef { table: None, field } => write!(f, "${{{field}}}"),
            Token::UserAttribute(name) => write!(f, "${{{}{name}}}", ATTRIBUTE_PREFIXES[0]),
        }
    }
}

pub fn tokenize(template: &str) -> Result<Vec<Token<'_>>> {
    let mut tokens = Vec::new();
    let mut rest = template;
    while let Some(start) = rest.find("${") {
        if start > 0 {
            tokens.push(Token::Text(&rest[..start]));
        }
        let after = &rest[start + 2..];
        let end = after.find('}').ok_or_else(|| {
            ExploreError::Validation(format!("unterminated reference in template '{template}'"))
        })?;
        tokens.push(parse_reference(after[..end].trim(), template)?);
        rest = &after[end + 1..];
    }
    if !rest.is_empty() {
        tokens.push(Token::Text(rest));
    }
    Ok(tokens)
}

fn parse_reference<'a>(inner: &'a str, template: &str) -> Result<Token<'a>> {
    if inner == SELF_REFERENCE {
        return Ok(Token::TableSelf);
    }
    for prefix in ATTRIBUTE_PREFIXES {
        if let Some(name) = inner.strip_prefix(prefix) {
            if name.is_empty() {
                break;
            }
            return Ok(Token::UserAttribute(name));
        }
    }
    let invalid = || {
        ExploreError::Validation(format!(
            "invalid reference '${{{inner}}}' in template '{template}'"
        ))
    };
    match inner.split_once('.') {
        Some((table, field)) => {
            if table.is_empty() || field.is_empty() || field.contains('.') {
                return Err(invalid());
            }
            Ok(Token::FieldRef {
                table: Some(table),
                field,
            })
        }
        None if !inner.is_empty() => Ok(Token::FieldRef {
            table: None,
            field: inner,
        }),
        None => Err(invalid()),
    }
}

/// Substitute user attribute references with quoted literals. Every other
/// token is written back unchanged.
pub fn replace_user_attributes(
    sql: &str,
    attributes: &UserAttributes,
    dialect: &dyn Dialect,
) -> Result<String> {
    let mut out = String::with_capacity(sql.len());
    for token in tokenize(sql)? {
        match token {
            Token::UserAttribute(name) => {
                let value = attributes
                    .get(name)
                    .ok_or_else(|| ExploreError::MissingUserAttribute(name.to_string()))?;
                out.push_str(&dialect.quote_string(value));
            }
            other => out.push_str(&other.to_string()),
        }
    }
    Ok(out)
}
