use thiserror::Error;

#[derive(Error, Debug)]
pub enum BotError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Ledger error: {0}")]
    Ledger(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Notification error: {0}")]
    Notify(String),
}

impl BotError {
    /// Transient failures are retried on the next scheduled cycle
    pub fn is_recoverable(&self) -> bool {
        match self {
            BotError::Ledger(_) => true,
            BotError::Http(_) => true,
            BotError::Notify(_) => true,
            _ => false,
        }
    }
}

pub type BotResult<T> = Result<T, BotError>;
