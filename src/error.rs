use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("IO Error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Json Error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Http Error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Watch Error: {0}")]
    Watch(#[from] notify::Error),

    #[error("expected 11 or 12 fields, found {0}")]
    FieldCount(usize),

    #[error("invalid {field}: `{value}`")]
    Field { field: &'static str, value: String },

    #[error("boundary line {line}: {reason}")]
    Parse { line: usize, reason: String },

    #[error("boundary `{label}` is vertical")]
    VerticalBoundary { label: String },

    #[error("color component {0} is out of 0..255")]
    ColorOutOfRange(i64),

    #[error("boundary config rejected: {}", .0.iter().map(ToString::to_string).collect::<Vec<_>>().join("; "))]
    Rejected(Vec<Error>),
}
