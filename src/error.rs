// SPDX-License-Identifier: Apache-2.0

//! Normalized error types for the SQL-to-FQL driver
//!
//! Every failure surfaced by the translator or the transport is mapped to one
//! of these variants so callers can dispatch on the kind of failure rather
//! than on message text.

use thiserror::Error;

/// Unified error type for all driver operations
#[derive(Debug, Error)]
pub enum DriverError {
    /// The SQL construct is outside the supported subset.
    #[error("Not supported: {message}")]
    NotSupported { message: String },

    /// Syntactically recognizable but malformed input.
    #[error("Programming error: {message}")]
    Programming { message: String },

    /// The database endpoint could not be reached.
    #[error("Connection failed: {message}")]
    ConnectionFailed { message: String },

    /// Unexpected database error, re-raised after logging the formatted SQL.
    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl DriverError {
    pub fn not_supported(msg: impl Into<String>) -> Self {
        Self::NotSupported { message: msg.into() }
    }

    pub fn programming(msg: impl Into<String>) -> Self {
        Self::Programming { message: msg.into() }
    }

    pub fn connection_failed(msg: impl Into<String>) -> Self {
        Self::ConnectionFailed { message: msg.into() }
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal { message: msg.into() }
    }

    /// The raw message carried by the error, used for matching on database
    /// error descriptions (e.g. unique-constraint violations).
    pub fn message(&self) -> &str {
        match self {
            Self::NotSupported { message }
            | Self::Programming { message }
            | Self::ConnectionFailed { message }
            | Self::Internal { message } => message,
        }
    }
}

/// Result type alias for driver operations
pub type DriverResult<T> = Result<T, DriverError>;
