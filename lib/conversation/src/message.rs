//! Message types for conversations.

use chrono::{DateTime, Utc};
use garnet_porter_core::MessageId;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// Marker prefixed onto every failed tool payload so the completion
/// service can distinguish failures from ordinary results.
pub const TOOL_ERROR_PREFIX: &str = "Tool error:";

/// The role of a message sender.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    /// User/student message.
    User,
    /// Assistant message, possibly carrying tool requests.
    Assistant,
    /// Tool outcome message.
    Tool,
}

/// A message in a conversation.
///
/// Messages are append-only: once added to a session's history they are
/// never mutated or removed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Unique message identifier.
    pub id: MessageId,
    /// Message role.
    pub role: MessageRole,
    /// Message content.
    pub content: String,
    /// When the message was created.
    pub timestamp: DateTime<Utc>,
    /// Tool requests (for assistant messages).
    pub tool_requests: Vec<ToolRequest>,
    /// Tool outcome (for tool messages).
    pub tool_outcome: Option<ToolOutcome>,
}

impl Message {
    /// Creates a new message.
    #[must_use]
    pub fn new(role: MessageRole, content: impl Into<String>) -> Self {
        Self {
            id: MessageId::new(),
            role,
            content: content.into(),
            timestamp: Utc::now(),
            tool_requests: Vec::new(),
            tool_outcome: None,
        }
    }

    /// Creates a user message.
    #[must_use]
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(MessageRole::User, content)
    }

    /// Creates an assistant message.
    #[must_use]
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(MessageRole::Assistant, content)
    }

    /// Creates a tool outcome message.
    #[must_use]
    pub fn tool(outcome: ToolOutcome) -> Self {
        let mut msg = Self::new(MessageRole::Tool, outcome.payload.clone());
        msg.tool_outcome = Some(outcome);
        msg
    }

    /// Adds a tool request.
    #[must_use]
    pub fn with_tool_request(mut self, request: ToolRequest) -> Self {
        self.tool_requests.push(request);
        self
    }

    /// Returns true if this message carries tool requests.
    #[must_use]
    pub fn has_tool_requests(&self) -> bool {
        !self.tool_requests.is_empty()
    }
}

/// A tool invocation requested by the assistant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolRequest {
    /// Correlation id tying the request to its outcome.
    pub id: String,
    /// The tool name.
    pub name: String,
    /// Arguments for the tool.
    pub arguments: JsonValue,
}

impl ToolRequest {
    /// Creates a new tool request.
    #[must_use]
    pub fn new(id: impl Into<String>, name: impl Into<String>, arguments: JsonValue) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            arguments,
        }
    }
}

/// Outcome of a tool invocation.
///
/// The payload is always textual, even on failure: capability errors
/// are folded into an error-prefixed string rather than crossing the
/// loop boundary as exceptions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolOutcome {
    /// The tool request id this outcome is for.
    pub request_id: String,
    /// The tool name.
    pub tool_name: String,
    /// Textual result payload.
    pub payload: String,
    /// Whether the payload describes a failure.
    pub is_error: bool,
}

impl ToolOutcome {
    /// Creates a successful tool outcome.
    #[must_use]
    pub fn success(
        request_id: impl Into<String>,
        tool_name: impl Into<String>,
        payload: impl Into<String>,
    ) -> Self {
        Self {
            request_id: request_id.into(),
            tool_name: tool_name.into(),
            payload: payload.into(),
            is_error: false,
        }
    }

    /// Creates a failed tool outcome with an error-prefixed payload.
    #[must_use]
    pub fn failure(
        request_id: impl Into<String>,
        tool_name: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            request_id: request_id.into(),
            tool_name: tool_name.into(),
            payload: format!("{TOOL_ERROR_PREFIX} {}", reason.into()),
            is_error: true,
        }
    }
}
