//! Error types for the certificate gate

use std::io;

use thiserror::Error;

/// Result type alias for the certificate gate
pub type Result<T> = std::result::Result<T, Error>;

/// Certificate gate errors
///
/// These cover startup and tooling failures. Per-request certificate
/// failures never surface here: the gate collapses them into a 403.
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Certificate file or generation error (CLI tooling)
    #[error("Certificate error: {0}")]
    Certificate(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}
