//! PostgreSQL dialect implementation.

use super::{Dialect, DialectKind};

#[derive(Debug, Default, Clone, Copy)]
pub struct PostgresDialect;

impl Dialect for PostgresDialect {
    fn kind(&self) -> DialectKind {
        DialectKind::Postgres
    }

    fn field_quote_char(&self) -> char {
        '"'
    }

    fn escape_string_quote_char(&self) -> char {
        '\''
    }
}
