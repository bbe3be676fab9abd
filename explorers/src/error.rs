use thiserror::Error;

pub type Result<T> = std::result::Result<T, ExploreError>;

#[derive(Debug, Error)]
pub enum ExploreError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("yaml parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("config error: {0}")]
    Config(String),
    #[error("validation error: {0}")]
    Validation(String),
    #[error("unknown field {field_id}")]
    UnknownField { field_id: String },
    #[error("table {table} has no join definition in explore {explore}")]
    MissingJoin { explore: String, table: String },
    #[error("circular reference in {field}: {}", chain.join(" -> "))]
    CircularReference { field: String, chain: Vec<String> },
    #[error("unsupported filter operator {operator}: {reason}")]
    UnsupportedOperator { operator: String, reason: String },
    #[error("missing user attribute {0}")]
    MissingUserAttribute(String),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ExploreError {
    pub(crate) fn unknown_field(field_id: impl Into<String>) -> Self {
        ExploreError::UnknownField {
            field_id: field_id.into(),
        }
    }
}
