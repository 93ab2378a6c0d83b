use thiserror::Error;

/// Failures raised while constructing or narrowing a corpus.
///
/// Missing field values are not errors: they normalize to empty strings or unknown
/// dates during cleaning. Only structurally broken input fails here.
#[derive(Debug, Error)]
pub enum CorpusError {
    #[error("row {row} is not a record")]
    NotARecord { row: usize },

    #[error("row {row} is missing required column `{column}`")]
    MissingColumn { row: usize, column: &'static str },

    #[error("row {row} could not be read: {source}")]
    InvalidRow {
        row: usize,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid pattern: {0}")]
    InvalidPattern(#[from] regex::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("walk error: {0}")]
    Walk(#[from] walkdir::Error),
}

pub type Result<T> = std::result::Result<T, CorpusError>;
