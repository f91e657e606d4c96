//! Materialize Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction.

use derive_more::{Display, Error};
use resbuf_config::error::Error as ConfigError;

/// A materialization error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for materialization operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// Resource names must be a single path segment. Fix the call site.
    #[display("invalid resource name: {_0:?}")]
    InvalidName(#[error(not(source))] String),
    /// The resolver has no resource with this name.
    #[display("resource not found: {_0}")]
    NotFound(#[error(not(source))] String),
    /// Preparing the buffer directory or copying a resource into it failed.
    #[display("I/O error")]
    Io,
    /// The buffer directory location could not be configured.
    #[display("buffer configuration error")]
    Config,
}

impl ErrorKind {
    /// Convert a configuration error, keeping the config crate's `Exn`
    /// frame as a child in this error tree.
    #[track_caller]
    pub fn config(err: ConfigError) -> Error {
        err.raise(ErrorKind::Config)
    }

    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Io)
    }
}
