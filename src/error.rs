use thiserror::Error;

#[derive(Error, Debug)]
pub enum TallyError {
    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    #[error("Render error: {0}")]
    Render(String),

    #[error("Invalid transaction: {0}")]
    InvalidTransaction(String),

    #[error("Transaction not found: {0}")]
    NotFound(i64),

    #[error("Database error: {0}")]
    Db(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("PDF error: {0}")]
    #[cfg_attr(not(feature = "pdf"), allow(dead_code))]
    Pdf(String),

    #[error("Settings error: {0}")]
    Settings(String),
}

pub type Result<T> = std::result::Result<T, TallyError>;
