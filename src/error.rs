//! Error types for the harness.
//!
//! Every failure the harness can produce is a variant of [`HarnessError`].
//! Timeouts and premature stream closure are deliberately separate variants
//! so a failing test can tell "the process hung" apart from "the process
//! crashed".

use std::time::Duration;

use thiserror::Error;

/// Errors raised while driving a process through a scenario.
#[derive(Debug, Error)]
pub enum HarnessError {
    /// The child process or its pseudo-terminal could not be created.
    /// Fatal to the scenario; never retried.
    #[error("failed to spawn '{command}'")]
    Spawn {
        command: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// A read or write against the child failed, typically because the
    /// master side is closed or the process is gone.
    #[error("i/o failure during {operation}")]
    Io {
        operation: &'static str,
        #[source]
        source: std::io::Error,
    },

    /// An expect step did not observe its pattern within the time budget.
    #[error("timed out after {elapsed:?} waiting for {expected}{}", sent_context(.sent))]
    Timeout {
        /// The last line sent before the expectation, if any.
        sent: Option<String>,
        /// Human-readable description of the awaited patterns.
        expected: String,
        /// The budget that elapsed.
        elapsed: Duration,
    },

    /// The child closed its output stream before any pattern matched.
    #[error("process closed its output before {expected} appeared{}", sent_context(.sent))]
    Closed {
        sent: Option<String>,
        expected: String,
    },

    /// An expectation resolved, but not the way the step asserted.
    #[error("assertion failed: {message}")]
    Assertion { message: String },

    /// The caller supplied an invalid regular expression.
    #[error("invalid pattern")]
    Pattern(#[from] regex::Error),
}

fn sent_context(sent: &Option<String>) -> String {
    match sent {
        Some(line) => format!(" (after sending {line:?})"),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timeout_message_names_sent_line_and_pattern() {
        let err = HarnessError::Timeout {
            sent: Some("addDigits".to_string()),
            expected: "literal \"0\"".to_string(),
            elapsed: Duration::from_secs(1),
        };
        let message = err.to_string();
        assert!(message.contains("addDigits"));
        assert!(message.contains("literal \"0\""));
    }

    #[test]
    fn closed_is_distinguishable_from_timeout() {
        let closed = HarnessError::Closed {
            sent: None,
            expected: "literal \"ok\"".to_string(),
        };
        assert!(closed.to_string().contains("closed its output"));
        assert!(!closed.to_string().contains("timed out"));
    }
}
