//! Per-session conversation state.
//!
//! State is created on a session's first turn, loaded and mutated on
//! every subsequent turn, and checkpointed wholesale at the end of each
//! turn. History is strictly append-only; slots accumulate and are
//! never retracted by the engine.

use crate::message::{Message, MessageRole};
use garnet_porter_core::SessionId;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// The closed set of procedure handlers a turn can be routed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HandlerKind {
    /// Identity verification and tuition payment.
    Payment,
    /// Already-paid flows: payment status, balance, missing references.
    Reconciliation,
    /// Meeting booking with the finance team.
    Appointment,
    /// General information lookup.
    Info,
}

impl HandlerKind {
    /// Returns the wire label used in classification output.
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Self::Payment => "payment",
            Self::Reconciliation => "reconciliation",
            Self::Appointment => "appointment",
            Self::Info => "info",
        }
    }

    /// Parses a classification label.
    #[must_use]
    pub fn from_label(label: &str) -> Option<Self> {
        match label {
            "payment" => Some(Self::Payment),
            "reconciliation" => Some(Self::Reconciliation),
            "appointment" => Some(Self::Appointment),
            "info" => Some(Self::Info),
            _ => None,
        }
    }
}

/// Named slot values accumulated across turns.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Slots {
    /// Student registration number, extracted or stated.
    pub student_id: Option<String>,
    /// Student full name.
    pub student_name: Option<String>,
    /// Student university email.
    pub student_email: Option<String>,
    /// Payment amount in GBP.
    pub amount: Option<f64>,
    /// Generated payment link.
    pub payment_link: Option<String>,
    /// Whether the student's identity has been verified.
    pub identity_verified: bool,
    /// Uploaded ID card image reference.
    pub id_card_url: Option<String>,
    /// Uploaded live webcam image reference.
    pub live_image_url: Option<String>,
    /// Preferred appointment date (YYYY-MM-DD).
    pub preferred_date: Option<String>,
    /// Selected appointment slot.
    pub selected_slot: Option<JsonValue>,
    /// Reason given for the appointment.
    pub appointment_reason: Option<String>,
    /// Confirmed meeting identifier.
    pub meeting_id: Option<String>,
    /// Support ticket issued for a booking.
    pub support_ticket_id: Option<String>,
}

/// Terminal flags: once set, routing short-circuits.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TerminalFlags {
    /// A payment has been matched against the session's payment link.
    pub payment_matched: bool,
    /// A meeting has been booked and confirmed.
    pub meeting_confirmed: bool,
}

/// A set of slot updates derived from a tool outcome.
///
/// Present fields overwrite the current value (explicit corrections are
/// allowed); absent fields never clear anything.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SlotPatch {
    pub student_id: Option<String>,
    pub student_name: Option<String>,
    pub student_email: Option<String>,
    pub amount: Option<f64>,
    pub payment_link: Option<String>,
    pub identity_verified: Option<bool>,
    pub id_card_url: Option<String>,
    pub live_image_url: Option<String>,
    pub preferred_date: Option<String>,
    pub selected_slot: Option<JsonValue>,
    pub appointment_reason: Option<String>,
    pub meeting_id: Option<String>,
    pub support_ticket_id: Option<String>,
    pub payment_matched: Option<bool>,
    pub meeting_confirmed: Option<bool>,
}

impl SlotPatch {
    /// Returns true if the patch carries no updates.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Folds another patch into this one; later fields win.
    pub fn absorb(&mut self, other: SlotPatch) {
        macro_rules! take {
            ($($field:ident),*) => {
                $(if other.$field.is_some() {
                    self.$field = other.$field;
                })*
            };
        }
        take!(
            student_id,
            student_name,
            student_email,
            amount,
            payment_link,
            identity_verified,
            id_card_url,
            live_image_url,
            preferred_date,
            selected_slot,
            appointment_reason,
            meeting_id,
            support_ticket_id,
            payment_matched,
            meeting_confirmed
        );
    }
}

/// Durable per-session conversation state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationState {
    /// The session this state belongs to.
    pub session_id: SessionId,
    /// Append-only, totally ordered message history.
    pub messages: Vec<Message>,
    /// Accumulated slot values.
    pub slots: Slots,
    /// Terminal flags.
    pub flags: TerminalFlags,
    /// The handler selected on the previous turn, if any.
    pub last_route: Option<HandlerKind>,
}

impl ConversationState {
    /// Creates fresh state for a session's first turn.
    #[must_use]
    pub fn new(session_id: SessionId) -> Self {
        Self {
            session_id,
            messages: Vec::new(),
            slots: Slots::default(),
            flags: TerminalFlags::default(),
            last_route: None,
        }
    }

    /// Appends a message to the history.
    pub fn append(&mut self, message: Message) {
        self.messages.push(message);
    }

    /// Merges a slot patch into the accumulated slots and flags.
    pub fn merge(&mut self, patch: SlotPatch) {
        macro_rules! apply_slot {
            ($($field:ident),*) => {
                $(if let Some(value) = patch.$field {
                    self.slots.$field = Some(value);
                })*
            };
        }
        apply_slot!(
            student_id,
            student_name,
            student_email,
            amount,
            payment_link,
            id_card_url,
            live_image_url,
            preferred_date,
            selected_slot,
            appointment_reason,
            meeting_id,
            support_ticket_id
        );
        if let Some(verified) = patch.identity_verified {
            self.slots.identity_verified = verified;
        }
        if let Some(matched) = patch.payment_matched {
            self.flags.payment_matched = matched;
        }
        if let Some(confirmed) = patch.meeting_confirmed {
            self.flags.meeting_confirmed = confirmed;
        }
    }

    /// Returns true if the payment procedure has reached its terminal
    /// outcome: a link was issued and the payment against it matched.
    #[must_use]
    pub fn payment_settled(&self) -> bool {
        self.flags.payment_matched && self.slots.payment_link.is_some()
    }

    /// Returns the most recent assistant message, if any.
    #[must_use]
    pub fn last_assistant_message(&self) -> Option<&Message> {
        self.messages
            .iter()
            .rev()
            .find(|m| m.role == MessageRole::Assistant)
    }

    /// Returns the most recent user message, if any.
    #[must_use]
    pub fn last_user_message(&self) -> Option<&Message> {
        self.messages
            .iter()
            .rev()
            .find(|m| m.role == MessageRole::User)
    }

    /// Returns the number of messages.
    #[must_use]
    pub fn message_count(&self) -> usize {
        self.messages.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::Message;

    fn state() -> ConversationState {
        ConversationState::new(SessionId::new("sess-test"))
    }

    #[test]
    fn fresh_state_is_empty() {
        let s = state();
        assert_eq!(s.message_count(), 0);
        assert!(s.last_route.is_none());
        assert!(!s.payment_settled());
    }

    #[test]
    fn merge_sets_and_overwrites_but_never_clears() {
        let mut s = state();
        s.merge(SlotPatch {
            student_id: Some("W1234".into()),
            ..Default::default()
        });
        assert_eq!(s.slots.student_id.as_deref(), Some("W1234"));

        // A later correction overwrites.
        s.merge(SlotPatch {
            student_id: Some("W5678".into()),
            student_name: Some("Alice".into()),
            ..Default::default()
        });
        assert_eq!(s.slots.student_id.as_deref(), Some("W5678"));

        // An empty patch leaves everything in place.
        s.merge(SlotPatch::default());
        assert_eq!(s.slots.student_id.as_deref(), Some("W5678"));
        assert_eq!(s.slots.student_name.as_deref(), Some("Alice"));
    }

    #[test]
    fn payment_settled_requires_both_link_and_match() {
        let mut s = state();
        s.merge(SlotPatch {
            payment_matched: Some(true),
            ..Default::default()
        });
        assert!(!s.payment_settled());

        s.merge(SlotPatch {
            payment_link: Some("https://pay.example/cs_123".into()),
            ..Default::default()
        });
        assert!(s.payment_settled());
    }

    #[test]
    fn last_assistant_message_skips_tool_and_user_messages() {
        let mut s = state();
        s.append(Message::user("hello"));
        s.append(Message::assistant("What is your email?"));
        s.append(Message::tool(crate::message::ToolOutcome::success(
            "call_1",
            "lookup_student",
            "NOT_FOUND",
        )));
        s.append(Message::user("a@uni.ac.uk"));

        assert_eq!(
            s.last_assistant_message().map(|m| m.content.as_str()),
            Some("What is your email?")
        );
    }

    #[test]
    fn patch_absorb_later_fields_win() {
        let mut first = SlotPatch {
            student_id: Some("W1".into()),
            ..Default::default()
        };
        first.absorb(SlotPatch {
            student_id: Some("W2".into()),
            payment_matched: Some(true),
            ..Default::default()
        });
        assert_eq!(first.student_id.as_deref(), Some("W2"));
        assert_eq!(first.payment_matched, Some(true));
        assert!(!first.is_empty());
    }

    #[test]
    fn handler_kind_labels_roundtrip() {
        for kind in [
            HandlerKind::Payment,
            HandlerKind::Reconciliation,
            HandlerKind::Appointment,
            HandlerKind::Info,
        ] {
            assert_eq!(HandlerKind::from_label(kind.label()), Some(kind));
        }
        assert_eq!(HandlerKind::from_label("support"), None);
    }

    #[test]
    fn state_serde_roundtrip() {
        let mut s = state();
        s.append(Message::user("hi"));
        s.merge(SlotPatch {
            student_name: Some("Alice".into()),
            meeting_confirmed: Some(true),
            ..Default::default()
        });
        s.last_route = Some(HandlerKind::Appointment);

        let json = serde_json::to_string(&s).expect("serialize");
        let parsed: ConversationState = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(s, parsed);
    }
}
