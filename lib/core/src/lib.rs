//! Core domain types for the garnet-porter services desk.
//!
//! This crate provides the strongly-typed identifiers shared by the
//! conversation, ai, and engine crates.

pub mod id;

pub use id::{MessageId, ParseIdError, SessionId};
