//! Error taxonomy.
//!
//! Configuration errors are the only fatal class: they surface before any
//! job starts. Per-job failures (non-zero remote exit, spawn failure) are
//! data, folded into the aggregate status, never errors.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("max concurrency must be at least 1, got {0}")]
    InvalidConcurrency(i64),

    #[error("--silent cannot be combined with --join; join exists to show output")]
    SilentJoin,

    #[error("no command given to run on the remote hosts")]
    EmptyCommand,
}

#[derive(Debug, Error)]
pub enum HostListError {
    #[error("failed to read host list from {path}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to read host list from stdin")]
    Stdin(#[source] std::io::Error),
}
