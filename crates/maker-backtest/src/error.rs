//! Error types for maker-backtest.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum BacktestError {
    #[error("io error reading {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("bad data file {path}: {detail}")]
    BadData { path: String, detail: String },

    #[error("no bars to replay")]
    NoBars,
}
