//! Tool registry with crash containment.
//!
//! Tools are named capabilities (payment provider, calendar, identity
//! registry, OCR, search) resolved dynamically by name. Dispatch never
//! lets a capability failure escape: execution errors, malformed
//! arguments, and unknown names are all converted into error-prefixed
//! textual outcomes that flow back to the completion service as normal
//! tool results.

use crate::error::ToolError;
use crate::message::{ToolOutcome, ToolRequest};
use crate::state::SlotPatch;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::collections::HashMap;
use std::sync::Arc;

/// Definition of a tool, advertised to the completion service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    /// Unique tool name.
    pub name: String,
    /// Human-readable description.
    pub description: String,
    /// JSON schema for input parameters.
    pub input_schema: JsonValue,
}

impl ToolDefinition {
    /// Creates a new tool definition.
    #[must_use]
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            input_schema: serde_json::json!({"type": "object", "properties": {}}),
        }
    }

    /// Sets the input schema.
    #[must_use]
    pub fn with_input_schema(mut self, schema: JsonValue) -> Self {
        self.input_schema = schema;
        self
    }
}

/// An executable capability.
///
/// Implementations live outside this workspace (payment provider,
/// calendar, identity store, comparators, web search); tests use stubs.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Returns the tool definition.
    fn definition(&self) -> ToolDefinition;

    /// Executes the tool, returning a textual payload.
    async fn invoke(&self, arguments: JsonValue) -> Result<String, ToolError>;
}

/// Post-processing hook deriving slot updates from a tool outcome.
///
/// Hooks keep the handler loop tool-agnostic: the loop merges whatever
/// patch the registered hook produces instead of special-casing tool
/// names.
pub type SlotHook = fn(arguments: &JsonValue, payload: &str) -> SlotPatch;

struct ToolEntry {
    tool: Arc<dyn Tool>,
    hook: Option<SlotHook>,
}

/// Registry of available tools.
#[derive(Default)]
pub struct ToolRegistry {
    entries: HashMap<String, ToolEntry>,
}

impl ToolRegistry {
    /// Creates a new empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    /// Registers a tool.
    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        self.register_with_hook_opt(tool, None);
    }

    /// Registers a tool with a slot-update hook.
    pub fn register_with_hook(&mut self, tool: Arc<dyn Tool>, hook: SlotHook) {
        self.register_with_hook_opt(tool, Some(hook));
    }

    fn register_with_hook_opt(&mut self, tool: Arc<dyn Tool>, hook: Option<SlotHook>) {
        let name = tool.definition().name;
        self.entries.insert(name, ToolEntry { tool, hook });
    }

    /// Attaches or replaces the hook for an already-registered tool.
    /// Returns false if the tool is not registered.
    pub fn attach_hook(&mut self, name: &str, hook: SlotHook) -> bool {
        match self.entries.get_mut(name) {
            Some(entry) => {
                entry.hook = Some(hook);
                true
            }
            None => false,
        }
    }

    /// Returns a tool definition by name.
    #[must_use]
    pub fn definition(&self, name: &str) -> Option<ToolDefinition> {
        self.entries.get(name).map(|e| e.tool.definition())
    }

    /// Returns the definitions for a named subset, in the given order.
    /// Names without a registered tool are skipped.
    #[must_use]
    pub fn definitions_for(&self, names: &[&str]) -> Vec<ToolDefinition> {
        names.iter().filter_map(|n| self.definition(n)).collect()
    }

    /// Returns the number of registered tools.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns whether the registry is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Dispatches a tool request, containing any failure.
    ///
    /// Unknown names and execution errors both come back as error
    /// outcomes; nothing dispatched through here can fail the turn.
    pub async fn dispatch(&self, request: &ToolRequest) -> ToolOutcome {
        let Some(entry) = self.entries.get(&request.name) else {
            tracing::warn!(tool = %request.name, "unknown tool requested");
            return ToolOutcome::failure(
                &request.id,
                &request.name,
                format!("unknown tool '{}'", request.name),
            );
        };

        match entry.tool.invoke(request.arguments.clone()).await {
            Ok(payload) => {
                tracing::debug!(tool = %request.name, "tool invocation succeeded");
                ToolOutcome::success(&request.id, &request.name, payload)
            }
            Err(err) => {
                tracing::warn!(tool = %request.name, error = %err, "tool invocation failed");
                ToolOutcome::failure(&request.id, &request.name, err.to_string())
            }
        }
    }

    /// Runs the registered hook for a tool outcome, if any.
    #[must_use]
    pub fn slot_updates(&self, name: &str, arguments: &JsonValue, payload: &str) -> SlotPatch {
        self.entries
            .get(name)
            .and_then(|e| e.hook)
            .map(|hook| hook(arguments, payload))
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::TOOL_ERROR_PREFIX;

    struct EchoTool;

    #[async_trait]
    impl Tool for EchoTool {
        fn definition(&self) -> ToolDefinition {
            ToolDefinition::new("echo", "Echoes its input back")
        }

        async fn invoke(&self, arguments: JsonValue) -> Result<String, ToolError> {
            Ok(arguments.to_string())
        }
    }

    struct FailingTool;

    #[async_trait]
    impl Tool for FailingTool {
        fn definition(&self) -> ToolDefinition {
            ToolDefinition::new("flaky", "Always fails")
        }

        async fn invoke(&self, _arguments: JsonValue) -> Result<String, ToolError> {
            Err(ToolError::ExecutionFailed {
                name: "flaky".to_string(),
                reason: "downstream exploded".to_string(),
            })
        }
    }

    fn registry() -> ToolRegistry {
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(EchoTool));
        registry.register(Arc::new(FailingTool));
        registry
    }

    #[tokio::test]
    async fn dispatch_success() {
        let registry = registry();
        let request = ToolRequest::new("call_1", "echo", serde_json::json!({"x": 1}));

        let outcome = registry.dispatch(&request).await;
        assert!(!outcome.is_error);
        assert_eq!(outcome.request_id, "call_1");
        assert!(outcome.payload.contains("\"x\":1"));
    }

    #[tokio::test]
    async fn dispatch_contains_failures() {
        let registry = registry();
        let request = ToolRequest::new("call_2", "flaky", serde_json::json!({}));

        let outcome = registry.dispatch(&request).await;
        assert!(outcome.is_error);
        assert!(outcome.payload.starts_with(TOOL_ERROR_PREFIX));
        assert!(outcome.payload.contains("downstream exploded"));
    }

    #[tokio::test]
    async fn dispatch_unknown_tool_is_a_data_condition() {
        let registry = registry();
        let request = ToolRequest::new("call_3", "does_not_exist", serde_json::json!({}));

        let outcome = registry.dispatch(&request).await;
        assert!(outcome.is_error);
        assert!(outcome.payload.contains("unknown tool 'does_not_exist'"));
    }

    #[test]
    fn definitions_for_preserves_order_and_skips_unknown() {
        let registry = registry();
        let defs = registry.definitions_for(&["flaky", "missing", "echo"]);
        let names: Vec<_> = defs.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["flaky", "echo"]);
    }

    #[test]
    fn hooks_produce_slot_updates() {
        fn hook(_args: &JsonValue, payload: &str) -> SlotPatch {
            SlotPatch {
                student_name: Some(payload.to_string()),
                ..Default::default()
            }
        }

        let mut registry = registry();
        assert!(registry.attach_hook("echo", hook));
        assert!(!registry.attach_hook("missing", hook));

        let patch = registry.slot_updates("echo", &serde_json::json!({}), "Alice");
        assert_eq!(patch.student_name.as_deref(), Some("Alice"));

        // No hook registered: empty patch.
        let patch = registry.slot_updates("flaky", &serde_json::json!({}), "whatever");
        assert!(patch.is_empty());
    }
}
