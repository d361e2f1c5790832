//! Completion-service interface for the garnet-porter services desk.
//!
//! The natural-language completion service is an external collaborator;
//! this crate defines the request/response types and the backend trait
//! the engine consumes. Backends must support tool-calling and a forced
//! structured-output mode (used by the router's classification step).

pub mod backend;
pub mod error;

pub use backend::{
    ChatMessage, ChatRequest, ChatResponse, ChatRole, CompletionBackend, TokenUsage,
    ToolInvocation, ToolSchema,
};
pub use error::CompletionError;
