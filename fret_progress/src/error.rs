use thiserror::Error;

/// A rejected mutation or import. The operation did not apply, not even
/// partially.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("{field}: {message}")]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    pub fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

/// Durable-storage failure. The store downgrades these to warnings; in-memory
/// state stays authoritative for the running session.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("failed to read progress data: {0}")]
    Read(#[source] std::io::Error),

    #[error("failed to write progress data: {0}")]
    Write(#[source] std::io::Error),

    #[error("failed to encode progress data: {0}")]
    Encode(#[source] serde_json::Error),

    #[error("failed to decode progress data: {0}")]
    Decode(#[source] serde_json::Error),
}
