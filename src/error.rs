//! Error types for the Sibyl library.
//!
//! All fallible operations in Sibyl return [`Result`], whose error type is the
//! [`SibylError`] enum. Argument validation failures and use of the engine
//! before a model has been installed are distinct, typed conditions; an empty
//! suggestion list is never an error.
//!
//! # Examples
//!
//! ```
//! use sibyl::error::{Result, SibylError};
//!
//! fn example_operation() -> Result<()> {
//!     Err(SibylError::invalid_argument("top_k must be greater than zero"))
//! }
//!
//! match example_operation() {
//!     Ok(_) => println!("Success"),
//!     Err(e) => eprintln!("Error: {}", e),
//! }
//! ```

use std::io;

use anyhow;
use thiserror::Error;

/// The main error type for Sibyl operations.
///
/// Uses the `thiserror` crate for automatic `Error` trait implementation and
/// provides constructor methods for the common error categories.
#[derive(Error, Debug)]
pub enum SibylError {
    /// I/O errors (snapshot files, table files, etc.)
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Malformed input from the caller. Surfaced immediately, never retried.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// The engine was used before a model snapshot was installed.
    #[error("Not initialized: {0}")]
    NotInitialized(String),

    /// Model construction or validation errors
    #[error("Model error: {0}")]
    Model(String),

    /// Snapshot encoding/decoding errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic error for other cases
    #[error("Error: {0}")]
    Other(String),

    /// Generic anyhow error
    #[error("Anyhow error: {0}")]
    Anyhow(#[from] anyhow::Error),
}

/// Result type alias for operations that may fail with SibylError.
pub type Result<T> = std::result::Result<T, SibylError>;

impl SibylError {
    /// Create a new invalid argument error.
    pub fn invalid_argument<S: Into<String>>(msg: S) -> Self {
        SibylError::InvalidArgument(msg.into())
    }

    /// Create a new not-initialized error.
    pub fn not_initialized<S: Into<String>>(msg: S) -> Self {
        SibylError::NotInitialized(msg.into())
    }

    /// Create a new model error.
    pub fn model<S: Into<String>>(msg: S) -> Self {
        SibylError::Model(msg.into())
    }

    /// Create a new serialization error.
    pub fn serialization<S: Into<String>>(msg: S) -> Self {
        SibylError::Serialization(msg.into())
    }

    /// Create a new generic error.
    pub fn other<S: Into<String>>(msg: S) -> Self {
        SibylError::Other(msg.into())
    }
}
