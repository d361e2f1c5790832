//! Conversation state for the garnet-porter services desk.
//!
//! This crate provides:
//!
//! - **Message model**: append-only conversation messages with tool
//!   requests and tool outcomes
//! - **Session state**: per-session slots, terminal flags, and history
//! - **Session Store**: durable checkpointing keyed by session id
//! - **Tool Registry**: named capabilities behind a crash-contained
//!   dispatch boundary

pub mod error;
pub mod message;
pub mod state;
pub mod store;
pub mod tool;

pub use error::{StoreError, ToolError};
pub use message::{Message, MessageRole, ToolOutcome, ToolRequest, TOOL_ERROR_PREFIX};
pub use state::{ConversationState, HandlerKind, SlotPatch, Slots, TerminalFlags};
pub use store::{MemorySessionStore, SessionStore};
pub use tool::{SlotHook, Tool, ToolDefinition, ToolRegistry};
