use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("io: {0}")]
    Io(#[from] std::io::Error),

    #[error("csv: {0}")]
    Csv(#[from] csv::Error),

    #[error("json: {0}")]
    Json(#[from] serde_json::Error),

    #[error("config: {0}")]
    Config(String),

    #[error("input: {0}")]
    Input(String),

    #[error(transparent)]
    Core(#[from] emjoin_core::Error),

    #[error(transparent)]
    Storage(#[from] emjoin_mem::error::Error),
}
