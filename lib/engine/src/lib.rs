//! Conversation engine for the garnet-porter services desk.
//!
//! The engine turns one incoming student message into one reply:
//!
//! - **Router**: terminal short-circuit, sticky override, then
//!   classification against the closed handler set
//! - **Handlers**: per-procedure instruction templates and tool subsets
//! - **Turn loop**: bounded tool-calling with crash containment and a
//!   single completion retry
//! - **Engine**: load state, route, run the handler, checkpoint
//!
//! Tool implementations and the completion backend are supplied by the
//! embedder; [`catalog`] names the standard tool surface and [`hooks`]
//! wires its slot updates.

pub mod catalog;
pub mod config;
pub mod engine;
pub mod error;
pub mod handler;
pub mod hooks;
pub mod router;
mod turn;

pub use config::EngineConfig;
pub use engine::{AttachmentKind, AttachmentRef, Engine, TurnOutput};
pub use error::TurnError;
pub use handler::HandlerConfig;
pub use router::{RouteDecision, Router};
