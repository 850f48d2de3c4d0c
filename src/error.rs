//! # Error Types
//!
//! Core error and result types for the register database.
//!
//! Errors fall into two families:
//! - **Synchronous validation errors** (bad key components, unknown keys,
//!   writes to read-only scopes) abort the calling operation immediately.
//! - **Transaction errors** (driver failures, timeouts, backoff shortcuts,
//!   aborts) ride on the finished [`Transaction`](crate::Transaction) and
//!   never reject the outer call.
//!
//! Errors are `Clone` because a finished transaction carries its error and
//! transactions are cloned into the event stream.

use thiserror::Error;

/// Result type alias used throughout the crate.
pub type DbResult<T> = Result<T, DbError>;

/// Error type for all database operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DbError {
    /// Input validation failed (bad ranges, empty key sets, read-only scope
    /// asked to write, mismatched lengths).
    #[error("Validation error: {message}")]
    Validation {
        /// Human readable description
        message: String,
    },

    /// A key was requested that is not declared in the datamap.
    #[error("Unknown key: {key}")]
    UnknownKey {
        /// The offending packed key
        key: u32,
    },

    /// The datamap schema is inconsistent (duplicate keys, illegal
    /// type/scope combinations).
    #[error("Schema error: {message}")]
    Schema {
        /// Human readable description
        message: String,
    },

    /// The driver reported a failure. The underlying cause is opaque to the
    /// core and preserved as text.
    #[error("Driver error: {message}")]
    Driver {
        /// Driver-supplied failure description
        message: String,
    },

    /// The per-transaction deadline elapsed before the driver answered.
    #[error("Request timed out after {millis} ms")]
    Timeout {
        /// Deadline that elapsed, in milliseconds
        millis: u64,
    },

    /// A low-priority request was skipped because the unit is in timeout
    /// cooldown.
    #[error("Too many timeouts for this unit")]
    TooManyTimeouts {
        /// Unit in cooldown
        unit: u8,
    },

    /// The task was dequeued after the instance was destroyed.
    #[error("Aborted")]
    Aborted,

    /// The instance has been destroyed; no further operations are possible.
    #[error("Instance is destroyed")]
    Destroyed,

    /// A wire response did not contain a value for a requested address.
    #[error("No value for address {address} in response")]
    MissingAddress {
        /// Address missing from the response
        address: u16,
    },

    /// The driver returned a different number of values than requested.
    #[error("Response length mismatch: expected {expected}, got {actual}")]
    ResponseMismatch {
        /// Requested count
        expected: usize,
        /// Count actually returned
        actual: usize,
    },
}

impl DbError {
    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        DbError::Validation {
            message: message.into(),
        }
    }

    /// Create a schema error.
    pub fn schema(message: impl Into<String>) -> Self {
        DbError::Schema {
            message: message.into(),
        }
    }

    /// Create a driver error from any displayable cause.
    pub fn driver(message: impl Into<String>) -> Self {
        DbError::Driver {
            message: message.into(),
        }
    }

    /// Check whether this error was caused by a deadline expiry.
    ///
    /// Backoff shortcuts ([`DbError::TooManyTimeouts`]) are intentionally
    /// not counted: they never consumed a wire slot.
    #[inline]
    pub fn is_timeout(&self) -> bool {
        matches!(self, DbError::Timeout { .. })
    }
}

// ============================================================================
// Tests
// ============================================================================
