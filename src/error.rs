// src/error.rs

//! Crate-wide error type for the mirror core
//!
//! The upstream feed distinguishes "resource not found" from transport
//! failures; that split is load-bearing for the mirror state machine, so it
//! is modelled as two variants rather than a status code buried in a string.

use thiserror::Error;

/// Result alias used throughout the crate
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// Upstream has no such resource (package id or exact id+version)
    #[error("not found upstream: {0}")]
    NotFound(String),

    /// Upstream transport or protocol failure (network, bad status, bad body)
    #[error("upstream error: {0}")]
    UpstreamError(String),

    /// Local catalog failure
    #[error("catalog error: {0}")]
    DatabaseError(String),

    /// Filesystem failure while staging an archive
    #[error("I/O error: {0}")]
    IoError(String),

    /// Malformed version string, document, or configuration value
    #[error("parse error: {0}")]
    ParseError(String),

    /// Component could not be constructed (bad config, client build failure)
    #[error("initialization error: {0}")]
    InitError(String),

    /// Package indexing pipeline failure
    #[error("indexing error: {0}")]
    IndexError(String),
}

impl Error {
    /// True when this error means the upstream resource does not exist,
    /// as opposed to the upstream being unreachable or misbehaving.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound(_))
    }
}

impl From<rusqlite::Error> for Error {
    fn from(e: rusqlite::Error) -> Self {
        Error::DatabaseError(e.to_string())
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::IoError(e.to_string())
    }
}
