//! Error types for the conversation crate.
//!
//! - `StoreError`: session store failures (fatal to a turn)
//! - `ToolError`: capability failures, contained at the registry
//!   boundary and converted into textual outcomes

use std::fmt;

/// Errors from session store operations.
///
/// A failed save is fatal to the turn: the engine must not return a
/// response whose state was not durably written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// State serialization failed.
    Serialization { reason: String },
    /// The backing store rejected the operation.
    Backend { reason: String },
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Serialization { reason } => {
                write!(f, "state serialization failed: {reason}")
            }
            Self::Backend { reason } => {
                write!(f, "session store operation failed: {reason}")
            }
        }
    }
}

impl std::error::Error for StoreError {}

/// Errors from tool execution.
///
/// These never escape the registry's dispatch boundary; they are folded
/// into error-prefixed tool outcomes the completion service can react
/// to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolError {
    /// Tool execution failed.
    ExecutionFailed { name: String, reason: String },
    /// Invalid tool input.
    InvalidInput { name: String, reason: String },
    /// Downstream capability timed out.
    Timeout { name: String },
}

impl fmt::Display for ToolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ExecutionFailed { name, reason } => {
                write!(f, "tool '{name}' execution failed: {reason}")
            }
            Self::InvalidInput { name, reason } => {
                write!(f, "invalid input for tool '{name}': {reason}")
            }
            Self::Timeout { name } => write!(f, "tool '{name}' timed out"),
        }
    }
}

impl std::error::Error for ToolError {}
