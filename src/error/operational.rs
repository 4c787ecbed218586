//! Operational error context propagation with `anyhow`.
//!
//! This module provides an extension trait for adding context to errors and
//! a reporter that logs errors with consistent structured fields.

use std::{error::Error as StdError, fmt::Display};

use {
    anyhow::{Context, Result as AnyhowResult},
    tracing::{debug, error, warn},
};

/// Extension trait for enhanced error context.
pub trait ResultExt<T, E> {
    /// Adds context to an error with a static string.
    fn add_context(self, context: &'static str) -> AnyhowResult<T>
    where
        E: StdError + Send + Sync + 'static;

    /// Adds context to an error with a formatted string.
    fn add_contextf(self, format: impl Display) -> AnyhowResult<T>
    where
        E: StdError + Send + Sync + 'static;
}

impl<T, E> ResultExt<T, E> for Result<T, E> {
    fn add_context(self, context: &'static str) -> AnyhowResult<T>
    where
        E: StdError + Send + Sync + 'static,
    {
        self.context(context)
    }

    fn add_contextf(self, format: impl Display) -> AnyhowResult<T>
    where
        E: StdError + Send + Sync + 'static,
    {
        self.context(format.to_string())
    }
}

/// Centralized error logging.
///
/// Engine and startup failures never propagate into observer callbacks; they
/// are logged here and converted to empty or absent values by the caller.
pub struct ErrorReporter;

impl ErrorReporter {
    /// Reports a debug-level error (expected, per-item failures).
    pub fn debug(error: &dyn StdError, context: &str) {
        debug!(context = context, error = %Self::describe(error), "Ignored error");
    }

    /// Reports a warning-level error (degraded but recoverable).
    pub fn warn(error: &dyn StdError, context: &str) {
        warn!(context = context, error = %Self::describe(error), "Recoverable error");
    }

    /// Reports an error-level error (fatal to the current operation).
    pub fn error(error: &dyn StdError, context: &str) {
        error!(context = context, error = %Self::describe(error), "Fatal error");
    }

    /// Joins an error and its sources into one line.
    ///
    /// # Returns
    ///
    /// The messages of the error chain separated by `": "`, deduplicating
    /// sources already embedded in their parent's message.
    pub fn describe(error: &dyn StdError) -> String {
        let mut message = error.to_string();
        let mut source = error.source();
        while let Some(cause) = source {
            let cause_message = cause.to_string();
            if !message.contains(&cause_message) {
                message.push_str(": ");
                message.push_str(&cause_message);
            }
            source = cause.source();
        }
        message
    }
}
