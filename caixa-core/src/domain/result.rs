//! Result and error types for the core library

use thiserror::Error;

/// Core library error type
///
/// Services return `anyhow::Result`; these variants travel inside it so
/// callers can downcast to tell a business rule refusal from an I/O failure.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Period {0} is closed")]
    PeriodClosed(String),

    #[error("Not allowed: {0}")]
    Forbidden(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    pub fn database(msg: impl Into<String>) -> Self {
        Self::Database(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn period_closed(period_key: impl Into<String>) -> Self {
        Self::PeriodClosed(period_key.into())
    }

    pub fn forbidden(msg: impl Into<String>) -> Self {
        Self::Forbidden(msg.into())
    }
}

/// Core library result type
pub type Result<T> = std::result::Result<T, Error>;
