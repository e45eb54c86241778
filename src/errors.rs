// Error Handling
//
// *La Gestion des Erreurs* - the closed set of failures an operation can produce.
// Errors stay typed until the dispatcher renders them as text.

use std::time::Duration;
use thiserror::Error;

/// Result type for workflow operations
pub type Result<T> = std::result::Result<T, WorkflowError>;

/// Context prefix used when a commit-and-push sequence fails
pub const COMMIT_PUSH_FAILED: &str = "Failed to commit and push changes";

/// Context prefix used when the read-only preview fails
pub const PREVIEW_FAILED: &str = "Failed to preview changes";

/// Workflow error types
#[derive(Debug, Error)]
pub enum WorkflowError {
    /// Missing or invalid workflow configuration
    #[error("Configuration error: {message}")]
    Configuration {
        /// What is wrong with the configuration
        message: String,
        /// How to fix it, when known
        suggestion: Option<String>,
    },

    /// The requested operation is not registered
    #[error("Unknown tool: {name}")]
    UnknownOperation {
        /// Name the caller asked for
        name: String,
    },

    /// Arguments did not satisfy the operation schema
    #[error("Validation error: {message}")]
    Validation {
        /// Operation whose schema rejected the arguments
        operation: String,
        /// Which argument was rejected and why
        message: String,
    },

    /// A git command failed part-way through an operation
    #[error("{context}: {source}")]
    BackendExecution {
        /// Stable, operation-specific prefix
        context: &'static str,
        /// The failing command
        #[source]
        source: BackendError,
    },

    /// The notification sink rejected the message or was unreachable
    #[error("Failed to send Discord notification: {status}")]
    NotificationDelivery {
        /// HTTP status line or transport failure description
        status: String,
    },
}

impl WorkflowError {
    /// Create a configuration error
    pub fn config_error(message: impl Into<String>, suggestion: Option<String>) -> Self {
        WorkflowError::Configuration {
            message: message.into(),
            suggestion,
        }
    }

    /// Create a validation error for an operation
    pub fn validation_error(operation: impl Into<String>, message: impl Into<String>) -> Self {
        WorkflowError::Validation {
            operation: operation.into(),
            message: message.into(),
        }
    }

    /// Create a notification delivery error
    pub fn delivery_error(status: impl Into<String>) -> Self {
        WorkflowError::NotificationDelivery {
            status: status.into(),
        }
    }

    /// Wrap a backend failure with the operation's failure prefix
    pub fn backend(context: &'static str, source: BackendError) -> Self {
        WorkflowError::BackendExecution { context, source }
    }

    /// Get user-friendly suggestion for recovery
    pub fn suggestion(&self) -> Option<String> {
        match self {
            WorkflowError::Configuration { suggestion, .. } => suggestion.clone(),
            WorkflowError::UnknownOperation { .. } => {
                Some("Call tools/list to see the available tools.".to_string())
            }
            WorkflowError::BackendExecution {
                source: BackendError::Spawn { .. },
                ..
            } => Some("Make sure git is installed and on PATH.".to_string()),
            _ => None,
        }
    }
}

/// Failure of a single git invocation
#[derive(Debug, Error)]
pub enum BackendError {
    /// The process could not be started
    #[error("failed to run `git {command}`: {source}")]
    Spawn {
        /// git subcommand and arguments
        command: String,
        /// Spawn failure from the OS
        #[source]
        source: std::io::Error,
    },

    /// The process ran and exited unsuccessfully
    #[error("`git {command}` exited with {}: {stderr}", exit_label(.code))]
    Exit {
        /// git subcommand and arguments
        command: String,
        /// Exit code, absent when killed by a signal
        code: Option<i32>,
        /// Trimmed standard error
        stderr: String,
    },

    /// The process did not finish within the configured timeout
    #[error("`git {command}` timed out after {}s", .after.as_secs())]
    Timeout {
        /// git subcommand and arguments
        command: String,
        /// The timeout that elapsed
        after: Duration,
    },
}

fn exit_label(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("status {}", code),
        None => "a signal".to_string(),
    }
}

/// Format error for user display
pub fn format_error(error: &WorkflowError) -> String {
    let mut message = format!("Error: {}", error);

    if let Some(suggestion) = error.suggestion() {
        message.push_str(&format!("\n\nSuggestion: {}", suggestion));
    }

    message
}
