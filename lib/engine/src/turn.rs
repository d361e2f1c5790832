//! The bounded tool-calling loop.
//!
//! One handler run: render instructions, then alternate completion
//! calls and tool dispatch until the model answers without requesting
//! tools, the round cap is hit, or the completion service fails twice
//! in a row. The loop never returns an error; whatever happens, it
//! leaves a final assistant message in the state.

use crate::handler::HandlerConfig;
use garnet_porter_ai::{
    ChatMessage, ChatRequest, ChatResponse, CompletionBackend, CompletionError, ToolInvocation,
    ToolSchema,
};
use garnet_porter_conversation::{
    ConversationState, Message, MessageRole, ToolOutcome, ToolRegistry, ToolRequest,
};
use std::time::Duration;

pub(crate) const UPSTREAM_FAILURE_APOLOGY: &str =
    "I'm sorry, I'm having trouble reaching our systems right now. \
     Please try again in a moment.";

pub(crate) const ROUNDS_EXHAUSTED_APOLOGY: &str =
    "I'm sorry, I wasn't able to complete that request just now. \
     Could you try again, or rephrase what you need?";

/// Operational limits for one handler run.
#[derive(Debug, Clone, Copy)]
pub(crate) struct TurnLimits {
    pub max_tool_rounds: u32,
    pub completion_timeout: Duration,
    pub tool_timeout: Duration,
}

/// Runs a handler to completion, mutating `state` in place.
///
/// On return the last message in `state` is always an assistant
/// message: the model's answer, or a persisted apology.
pub(crate) async fn run_handler(
    state: &mut ConversationState,
    handler: &HandlerConfig,
    backend: &dyn CompletionBackend,
    registry: &ToolRegistry,
    limits: &TurnLimits,
) {
    let instructions = handler.instructions(&state.slots, chrono::Utc::now());
    let tools: Vec<ToolSchema> = registry
        .definitions_for(handler.tool_names())
        .into_iter()
        .map(|d| ToolSchema {
            name: d.name,
            description: d.description,
            parameters: d.input_schema,
        })
        .collect();

    let mut context: Vec<ChatMessage> = Vec::with_capacity(state.message_count() + 1);
    context.push(ChatMessage::system(instructions));
    context.extend(state.messages.iter().map(to_chat_message));

    // max_tool_rounds tool round-trips, plus one final completion that
    // must answer in text.
    for round in 0..=limits.max_tool_rounds {
        let request = ChatRequest::new(context.clone()).with_tools(tools.clone());
        let response = match complete_with_retry(backend, &request, limits.completion_timeout).await
        {
            Ok(response) => response,
            Err(err) => {
                tracing::warn!(
                    session = %state.session_id,
                    handler = handler.kind().label(),
                    error = %err,
                    "completion failed after retry, apologizing"
                );
                state.append(Message::assistant(UPSTREAM_FAILURE_APOLOGY));
                return;
            }
        };

        if !response.has_tool_invocations() {
            state.append(Message::assistant(response.content));
            return;
        }

        // A tool request on the last allowed round is dropped rather
        // than executed: persisting requests without results would
        // leave the history dangling.
        if round == limits.max_tool_rounds {
            break;
        }

        let requests: Vec<ToolRequest> = response
            .tool_invocations
            .iter()
            .map(|inv| ToolRequest::new(&inv.id, &inv.name, inv.arguments.clone()))
            .collect();

        let mut assistant = Message::assistant(&response.content);
        for request in &requests {
            assistant = assistant.with_tool_request(request.clone());
        }
        state.append(assistant);
        context.push(ChatMessage::assistant_with_invocations(
            response.content,
            response.tool_invocations,
        ));

        let outcomes = futures::future::join_all(requests.iter().map(|request| async {
            // Only the handler's advertised subset is callable; any
            // other name gets the same outcome as an unregistered tool.
            if !handler.tool_names().contains(&request.name.as_str()) {
                tracing::warn!(
                    tool = %request.name,
                    handler = handler.kind().label(),
                    "tool requested outside handler subset"
                );
                return ToolOutcome::failure(
                    &request.id,
                    &request.name,
                    format!("unknown tool '{}'", request.name),
                );
            }
            dispatch_with_timeout(registry, request, limits.tool_timeout).await
        }))
        .await;

        for (request, outcome) in requests.iter().zip(outcomes) {
            if !outcome.is_error {
                let patch = registry.slot_updates(&request.name, &request.arguments, &outcome.payload);
                state.merge(patch);
            }
            context.push(ChatMessage::tool(
                &outcome.request_id,
                &outcome.tool_name,
                &outcome.payload,
            ));
            state.append(Message::tool(outcome));
        }
    }

    tracing::warn!(
        session = %state.session_id,
        handler = handler.kind().label(),
        max_tool_rounds = limits.max_tool_rounds,
        "tool round cap exhausted, apologizing"
    );
    state.append(Message::assistant(ROUNDS_EXHAUSTED_APOLOGY));
}

async fn complete_with_retry(
    backend: &dyn CompletionBackend,
    request: &ChatRequest,
    deadline: Duration,
) -> Result<ChatResponse, CompletionError> {
    match complete_once(backend, request, deadline).await {
        Ok(response) => Ok(response),
        Err(first) => {
            tracing::warn!(error = %first, "completion failed, retrying once");
            complete_once(backend, request, deadline).await
        }
    }
}

async fn complete_once(
    backend: &dyn CompletionBackend,
    request: &ChatRequest,
    deadline: Duration,
) -> Result<ChatResponse, CompletionError> {
    match tokio::time::timeout(deadline, backend.complete(request)).await {
        Ok(result) => result,
        Err(_) => Err(CompletionError::Timeout),
    }
}

async fn dispatch_with_timeout(
    registry: &ToolRegistry,
    request: &ToolRequest,
    deadline: Duration,
) -> ToolOutcome {
    match tokio::time::timeout(deadline, registry.dispatch(request)).await {
        Ok(outcome) => outcome,
        Err(_) => {
            tracing::warn!(tool = %request.name, "tool invocation timed out");
            ToolOutcome::failure(
                &request.id,
                &request.name,
                format!("tool '{}' timed out", request.name),
            )
        }
    }
}

fn to_chat_message(message: &Message) -> ChatMessage {
    match message.role {
        MessageRole::User => ChatMessage::user(&message.content),
        MessageRole::Assistant => {
            if message.has_tool_requests() {
                let invocations = message
                    .tool_requests
                    .iter()
                    .map(|r| ToolInvocation::new(&r.id, &r.name, r.arguments.clone()))
                    .collect();
                ChatMessage::assistant_with_invocations(&message.content, invocations)
            } else {
                ChatMessage::assistant(&message.content)
            }
        }
        MessageRole::Tool => match &message.tool_outcome {
            Some(outcome) => {
                ChatMessage::tool(&outcome.request_id, &outcome.tool_name, &message.content)
            }
            None => ChatMessage::tool("", "", &message.content),
        },
    }
}
