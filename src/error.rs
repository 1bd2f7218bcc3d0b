use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Convenient result type for extractor operations.
pub type ExtractorResult<T> = Result<T, ExtractorError>;

/// Every failure the extractor can surface. Transient transport errors are
/// retried inside the fetch layer and only become `Fetch` once retries are
/// exhausted; everything else propagates unretried.
#[derive(Debug, Error)]
pub enum ExtractorError {
    #[error("failed to fetch `{url}`: {detail}")]
    Fetch { url: String, detail: String },

    #[error("resource not found (HTTP 404) at `{url}`; check the configured export URL")]
    ResourceNotFound { url: String },

    #[error("failed to decode `{table}` with charset `{charset}`; use a different src_charset")]
    Encoding { table: String, charset: String },

    #[error("malformed row {row} in `{table}`: {detail}")]
    RowParse {
        table: String,
        row: u64,
        detail: String,
    },

    #[error(
        "no usable primary key for `{table}`: neither {declared:?} nor {fallback:?} \
         is contained in the observed columns {observed:?}"
    )]
    SchemaMismatch {
        table: String,
        declared: Vec<String>,
        fallback: Vec<String>,
        observed: Vec<String>,
    },

    #[error("writer for `{table}` is already finalized")]
    WriterClosed { table: String },

    #[error("storage failure at `{path}`: {source}")]
    Storage { path: PathBuf, source: io::Error },

    #[error("invalid configuration: {0}")]
    Config(String),
}

impl ExtractorError {
    pub fn storage(path: impl Into<PathBuf>, source: io::Error) -> Self {
        ExtractorError::Storage {
            path: path.into(),
            source,
        }
    }

    /// User-actionable failures exit with a different signal than internal
    /// defects, so operators can tell a bad URL from a bug.
    pub fn is_user_error(&self) -> bool {
        !matches!(
            self,
            ExtractorError::WriterClosed { .. } | ExtractorError::Storage { .. }
        )
    }
}
