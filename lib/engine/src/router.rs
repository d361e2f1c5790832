//! Context-aware turn routing.
//!
//! Routing runs three checks in a fixed order:
//!
//! 1. Terminal short-circuit: a settled payment ends the procedure, no
//!    handler runs.
//! 2. Sticky override: if the previous assistant message asked a
//!    question belonging to a procedure, the reply goes back to that
//!    procedure's handler regardless of what the reply looks like on
//!    its own ("ok", a bare date, an email address).
//! 3. Classification: the completion service labels the latest user
//!    message against the closed handler set; anything missing or
//!    unparseable falls back to the info handler.

use garnet_porter_ai::{ChatMessage, ChatRequest, CompletionBackend};
use garnet_porter_conversation::{ConversationState, HandlerKind};
use serde_json::{json, Value as JsonValue};
use std::time::Duration;

/// The routing outcome for one turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteDecision {
    /// The session's procedure is settled; do not run a handler.
    Done,
    /// Dispatch the turn to a handler.
    Dispatch {
        kind: HandlerKind,
        rationale: String,
    },
}

/// Keyword tables for the sticky override, checked in order. The first
/// handler whose keyword appears in the previous assistant message
/// wins, so payment phrasing outranks appointment phrasing.
const STICKY_ROUTES: &[(HandlerKind, &[&str])] = &[
    (
        HandlerKind::Payment,
        &[
            "payment link",
            "id card",
            "student id",
            "identity",
            "biometric",
            "webcam",
            "upload",
            "tuition",
            "amount",
        ],
    ),
    (
        HandlerKind::Appointment,
        &[
            "appointment",
            "booking",
            "book a",
            "meeting",
            "slot",
            "roster",
            "finance team",
            "what day",
            "university email",
        ],
    ),
    (
        HandlerKind::Reconciliation,
        &["reference", "receipt", "already paid", "reconcil"],
    ),
];

const CLASSIFIER_PROMPT: &str =
    "You are the routing classifier for a university student services desk. \
     Classify the student's latest message into exactly one handler:\n\
     \n\
     - payment: wants to make a NEW payment, needs a payment link, asks about \
     paying fees, or is providing ID for verification before paying\n\
     - reconciliation: has ALREADY paid but something is wrong - portal still \
     blocked, balance not updated, missing payment reference\n\
     - appointment: wants to schedule a meeting or talk to someone in person\n\
     - info: general questions about the university - library, locations, gym, \
     student union, courses, events\n\
     \n\
     Answer with the handler label and a one-sentence reasoning.";

fn classification_schema() -> JsonValue {
    json!({
        "type": "object",
        "properties": {
            "handler": {
                "type": "string",
                "enum": ["payment", "reconciliation", "appointment", "info"]
            },
            "reasoning": {"type": "string"}
        },
        "required": ["handler", "reasoning"]
    })
}

/// Routes turns for the engine.
#[derive(Debug, Clone)]
pub struct Router {
    classify_timeout: Duration,
}

impl Router {
    /// Creates a router with the given classification deadline.
    #[must_use]
    pub fn new(classify_timeout: Duration) -> Self {
        Self { classify_timeout }
    }

    /// Decides where the current turn goes.
    pub async fn route(
        &self,
        state: &ConversationState,
        backend: &dyn CompletionBackend,
    ) -> RouteDecision {
        if state.payment_settled() {
            tracing::info!(session = %state.session_id, "payment settled, short-circuiting");
            return RouteDecision::Done;
        }

        if let Some(assistant) = state.last_assistant_message() {
            if let Some((kind, keyword)) = sticky_match(&assistant.content) {
                tracing::debug!(
                    session = %state.session_id,
                    handler = kind.label(),
                    keyword,
                    "sticky override"
                );
                return RouteDecision::Dispatch {
                    kind,
                    rationale: format!(
                        "replying to a pending {} question (matched \"{keyword}\")",
                        kind.label()
                    ),
                };
            }
        }

        self.classify(state, backend).await
    }

    async fn classify(
        &self,
        state: &ConversationState,
        backend: &dyn CompletionBackend,
    ) -> RouteDecision {
        let mut messages = vec![ChatMessage::system(CLASSIFIER_PROMPT)];
        if let Some(assistant) = state.last_assistant_message() {
            messages.push(ChatMessage::assistant(&assistant.content));
        }
        let user_text = state
            .last_user_message()
            .map(|m| m.content.as_str())
            .unwrap_or_default();
        messages.push(ChatMessage::user(user_text));

        let request = ChatRequest::new(messages)
            .with_output_schema(classification_schema())
            .with_temperature(0.0);

        let response =
            match tokio::time::timeout(self.classify_timeout, backend.complete(&request)).await {
                Ok(Ok(response)) => response,
                Ok(Err(err)) => {
                    tracing::warn!(session = %state.session_id, error = %err, "classification failed");
                    return fallback("classification unavailable");
                }
                Err(_) => {
                    tracing::warn!(session = %state.session_id, "classification timed out");
                    return fallback("classification timed out");
                }
            };

        let parsed = response
            .structured_output
            .clone()
            .or_else(|| serde_json::from_str(&response.content).ok());
        let Some(value) = parsed else {
            return fallback("classification output unparseable");
        };
        let Some(kind) = value
            .get("handler")
            .and_then(JsonValue::as_str)
            .and_then(HandlerKind::from_label)
        else {
            return fallback("classification label missing or unknown");
        };

        RouteDecision::Dispatch {
            kind,
            rationale: value
                .get("reasoning")
                .and_then(JsonValue::as_str)
                .unwrap_or("classified")
                .to_string(),
        }
    }
}

fn fallback(rationale: &str) -> RouteDecision {
    RouteDecision::Dispatch {
        kind: HandlerKind::Info,
        rationale: format!("{rationale}, defaulting to info"),
    }
}

fn sticky_match(assistant_text: &str) -> Option<(HandlerKind, &'static str)> {
    let lowered = assistant_text.to_lowercase();
    for (kind, keywords) in STICKY_ROUTES {
        for keyword in *keywords {
            if lowered.contains(keyword) {
                return Some((*kind, keyword));
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use garnet_porter_ai::{ChatResponse, CompletionError, TokenUsage};
    use garnet_porter_conversation::{Message, SlotPatch};
    use garnet_porter_core::SessionId;
    use std::sync::Mutex;

    struct ScriptedBackend {
        responses: Mutex<Vec<Result<ChatResponse, CompletionError>>>,
        calls: Mutex<usize>,
    }

    impl ScriptedBackend {
        fn new(responses: Vec<Result<ChatResponse, CompletionError>>) -> Self {
            Self {
                responses: Mutex::new(responses),
                calls: Mutex::new(0),
            }
        }

        fn call_count(&self) -> usize {
            *self.calls.lock().unwrap()
        }
    }

    #[async_trait::async_trait]
    impl CompletionBackend for ScriptedBackend {
        async fn complete(
            &self,
            _request: &ChatRequest,
        ) -> Result<ChatResponse, CompletionError> {
            *self.calls.lock().unwrap() += 1;
            let mut responses = self.responses.lock().unwrap();
            if responses.is_empty() {
                return Err(CompletionError::RequestFailed {
                    reason: "script exhausted".to_string(),
                });
            }
            responses.remove(0)
        }

        fn model(&self) -> &str {
            "scripted"
        }
    }

    fn structured(handler: &str, reasoning: &str) -> ChatResponse {
        ChatResponse {
            content: String::new(),
            tool_invocations: Vec::new(),
            structured_output: Some(json!({"handler": handler, "reasoning": reasoning})),
            usage: TokenUsage::default(),
            model: "scripted".to_string(),
        }
    }

    fn state() -> ConversationState {
        ConversationState::new(SessionId::new("sess-route"))
    }

    fn router() -> Router {
        Router::new(Duration::from_secs(5))
    }

    #[tokio::test]
    async fn settled_payment_short_circuits_without_backend_call() {
        let mut s = state();
        s.merge(SlotPatch {
            payment_link: Some("https://pay.example/cs_1".into()),
            payment_matched: Some(true),
            ..Default::default()
        });
        let backend = ScriptedBackend::new(vec![]);

        let decision = router().route(&s, &backend).await;
        assert_eq!(decision, RouteDecision::Done);
        assert_eq!(backend.call_count(), 0);
    }

    #[tokio::test]
    async fn sticky_override_beats_classification() {
        let mut s = state();
        s.append(Message::assistant(
            "What day works for your appointment with the finance team?",
        ));
        s.append(Message::user("Monday"));
        // Classifier would say info for a bare "Monday", but it must
        // never even be consulted.
        let backend = ScriptedBackend::new(vec![Ok(structured("info", "ambiguous"))]);

        let decision = router().route(&s, &backend).await;
        match decision {
            RouteDecision::Dispatch { kind, .. } => assert_eq!(kind, HandlerKind::Appointment),
            RouteDecision::Done => panic!("expected dispatch"),
        }
        assert_eq!(backend.call_count(), 0);
    }

    #[tokio::test]
    async fn sticky_table_prefers_payment_over_appointment() {
        let mut s = state();
        s.append(Message::assistant(
            "Before the payment link I need your ID card. Would you rather book a meeting?",
        ));
        s.append(Message::user("sure"));
        let backend = ScriptedBackend::new(vec![]);

        match router().route(&s, &backend).await {
            RouteDecision::Dispatch { kind, .. } => assert_eq!(kind, HandlerKind::Payment),
            RouteDecision::Done => panic!("expected dispatch"),
        }
    }

    #[tokio::test]
    async fn classification_routes_fresh_topics() {
        let mut s = state();
        s.append(Message::user("Where is the library?"));
        let backend =
            ScriptedBackend::new(vec![Ok(structured("info", "campus location question"))]);

        match router().route(&s, &backend).await {
            RouteDecision::Dispatch { kind, rationale } => {
                assert_eq!(kind, HandlerKind::Info);
                assert!(rationale.contains("campus"));
            }
            RouteDecision::Done => panic!("expected dispatch"),
        }
        assert_eq!(backend.call_count(), 1);
    }

    #[tokio::test]
    async fn classification_failure_defaults_to_info_without_retry() {
        let mut s = state();
        s.append(Message::user("I want to pay my fees"));
        let backend = ScriptedBackend::new(vec![Err(CompletionError::RequestFailed {
            reason: "boom".to_string(),
        })]);

        match router().route(&s, &backend).await {
            RouteDecision::Dispatch { kind, rationale } => {
                assert_eq!(kind, HandlerKind::Info);
                assert!(rationale.contains("defaulting to info"));
            }
            RouteDecision::Done => panic!("expected dispatch"),
        }
        assert_eq!(backend.call_count(), 1);
    }

    #[tokio::test]
    async fn unknown_label_defaults_to_info() {
        let mut s = state();
        s.append(Message::user("help"));
        let backend = ScriptedBackend::new(vec![Ok(structured("support", "generic"))]);

        match router().route(&s, &backend).await {
            RouteDecision::Dispatch { kind, .. } => assert_eq!(kind, HandlerKind::Info),
            RouteDecision::Done => panic!("expected dispatch"),
        }
    }

    #[tokio::test]
    async fn classification_parses_content_json_when_no_structured_output() {
        let mut s = state();
        s.append(Message::user("I paid yesterday but the portal is still locked"));
        let response = ChatResponse {
            content: r#"{"handler": "reconciliation", "reasoning": "already paid"}"#.to_string(),
            tool_invocations: Vec::new(),
            structured_output: None,
            usage: TokenUsage::default(),
            model: "scripted".to_string(),
        };
        let backend = ScriptedBackend::new(vec![Ok(response)]);

        match router().route(&s, &backend).await {
            RouteDecision::Dispatch { kind, .. } => {
                assert_eq!(kind, HandlerKind::Reconciliation);
            }
            RouteDecision::Done => panic!("expected dispatch"),
        }
    }
}
