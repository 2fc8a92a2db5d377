//! Error types for maker-bot.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("missing required environment variable {0}")]
    MissingEnv(&'static str),

    #[error("bad environment variable {name}: {detail}")]
    BadEnv { name: &'static str, detail: String },
}

pub type AppResult<T> = std::result::Result<T, AppError>;
