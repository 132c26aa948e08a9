use thiserror::Error;

/// Result type local to emjoin-mem.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("page budget exceeded for tag '{tag}': requested {requested} pages, capacity {capacity}, used {used}")]
    BudgetExceeded {
        tag: &'static str,
        requested: usize,
        capacity: usize,
        used: usize,
    },

    #[error("storage error: {0}")]
    Storage(String),

    #[error("unknown table '{0}'")]
    TableNotFound(String),

    #[error("table '{0}' already exists")]
    TableExists(String),

    #[error("record arity mismatch for table '{table}': expected {expected} values, got {got}")]
    Arity {
        table: String,
        expected: usize,
        got: usize,
    },

    #[error("unsupported codec: {0}")]
    CodecUnsupported(String),

    #[error("codec error: {0}")]
    Codec(String),

    #[error("checksum mismatch in {0}")]
    ChecksumMismatch(String),
}
