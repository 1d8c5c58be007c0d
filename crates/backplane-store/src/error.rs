//! Store error taxonomy.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    /// The interpolation guard rejected a statement before execution.
    #[error("unsafe query rejected: {reason}")]
    UnsafeQuery { reason: String },

    #[error("unknown table: {0}")]
    UnknownTable(String),

    #[error("unknown field {field} on table {table}")]
    UnknownField { table: String, field: String },

    #[error("record is missing a string id")]
    MissingId,

    #[error("multipart upload {0} not found")]
    UnknownUpload(String),

    #[error(transparent)]
    Serialization(#[from] serde_json::Error),

    #[error("backend error: {0}")]
    Backend(String),
}
