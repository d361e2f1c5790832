//! Turn orchestration.
//!
//! [`Engine`] composes the session store, the tool registry, the
//! completion backend, and the router into the single `handle_turn`
//! entry point. Turns for different sessions are independent; callers
//! are responsible for not running two turns of the same session
//! concurrently.

use crate::config::EngineConfig;
use crate::error::TurnError;
use crate::handler::HandlerConfig;
use crate::router::{RouteDecision, Router};
use crate::turn::{run_handler, TurnLimits, UPSTREAM_FAILURE_APOLOGY};
use garnet_porter_ai::CompletionBackend;
use garnet_porter_conversation::{
    ConversationState, Message, SessionStore, SlotPatch, ToolRegistry,
};
use garnet_porter_core::SessionId;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// The kind of file a student attached to a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttachmentKind {
    /// A photo of the student ID card.
    IdCard,
    /// A live webcam capture.
    LiveImage,
}

/// A file attached to the incoming turn, already stored by the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttachmentRef {
    /// What the file is.
    pub kind: AttachmentKind,
    /// Where the tool layer can fetch it.
    pub url: String,
}

/// The result of a completed turn.
#[derive(Debug, Clone, PartialEq)]
pub struct TurnOutput {
    /// The assistant reply to show the student.
    pub response: String,
    /// The session state as checkpointed at the end of the turn.
    pub state: ConversationState,
}

/// The conversation engine.
pub struct Engine {
    backend: Arc<dyn CompletionBackend>,
    registry: Arc<ToolRegistry>,
    store: Arc<dyn SessionStore>,
    router: Router,
    config: EngineConfig,
}

impl Engine {
    /// Creates an engine with default configuration.
    #[must_use]
    pub fn new(
        backend: Arc<dyn CompletionBackend>,
        registry: Arc<ToolRegistry>,
        store: Arc<dyn SessionStore>,
    ) -> Self {
        Self::with_config(backend, registry, store, EngineConfig::default())
    }

    /// Creates an engine with explicit configuration.
    #[must_use]
    pub fn with_config(
        backend: Arc<dyn CompletionBackend>,
        registry: Arc<ToolRegistry>,
        store: Arc<dyn SessionStore>,
        config: EngineConfig,
    ) -> Self {
        let router = Router::new(config.completion_timeout());
        Self {
            backend,
            registry,
            store,
            router,
            config,
        }
    }

    /// Runs one turn: load, route, run the selected handler, checkpoint.
    ///
    /// # Errors
    ///
    /// Returns an error only if session state cannot be loaded or
    /// checkpointed. Completion and tool failures are absorbed into the
    /// reply.
    pub async fn handle_turn(
        &self,
        session_id: &SessionId,
        user_text: &str,
        attachments: &[AttachmentRef],
    ) -> Result<TurnOutput, TurnError> {
        let mut state = self.store.load(session_id).await?;

        if !attachments.is_empty() {
            state.merge(attachment_patch(attachments));
        }
        state.append(Message::user(user_text));

        let decision = self.router.route(&state, self.backend.as_ref()).await;
        match decision {
            RouteDecision::Done => {
                // Settled procedure: repeat the standing answer, run
                // nothing.
                let response = state
                    .last_assistant_message()
                    .map(|m| m.content.clone())
                    .unwrap_or_else(|| UPSTREAM_FAILURE_APOLOGY.to_string());
                self.store.save(session_id, &state).await?;
                tracing::info!(session = %session_id, "turn ended by terminal short-circuit");
                Ok(TurnOutput { response, state })
            }
            RouteDecision::Dispatch { kind, rationale } => {
                tracing::info!(
                    session = %session_id,
                    handler = kind.label(),
                    rationale,
                    "turn dispatched"
                );
                let handler = HandlerConfig::for_kind(kind);
                let limits = TurnLimits {
                    max_tool_rounds: self.config.max_tool_rounds,
                    completion_timeout: self.config.completion_timeout(),
                    tool_timeout: self.config.tool_timeout(),
                };
                run_handler(
                    &mut state,
                    &handler,
                    self.backend.as_ref(),
                    &self.registry,
                    &limits,
                )
                .await;
                state.last_route = Some(kind);

                self.store.save(session_id, &state).await?;
                let response = state
                    .last_assistant_message()
                    .map(|m| m.content.clone())
                    .unwrap_or_else(|| UPSTREAM_FAILURE_APOLOGY.to_string());
                Ok(TurnOutput { response, state })
            }
        }
    }
}

fn attachment_patch(attachments: &[AttachmentRef]) -> SlotPatch {
    let mut patch = SlotPatch::default();
    for attachment in attachments {
        match attachment.kind {
            AttachmentKind::IdCard => patch.id_card_url = Some(attachment.url.clone()),
            AttachmentKind::LiveImage => patch.live_image_url = Some(attachment.url.clone()),
        }
    }
    patch
}
