//! Slot hooks for the standard tool surface.
//!
//! Each hook inspects a successful tool payload (and the arguments the
//! model passed) and derives the slot updates the outcome implies. The
//! payload markers here are the contract with the tool implementations;
//! a payload without its marker yields an empty patch.

use crate::handler::tool_names;
use garnet_porter_conversation::{SlotHook, SlotPatch, ToolRegistry};
use serde_json::Value as JsonValue;

/// Marker in a successful registry verification payload.
pub const IDENTITY_VERIFIED_MARKER: &str = "Identity Verified";
/// Marker in a successful biometric comparison payload.
pub const BIOMETRIC_VERIFIED_MARKER: &str = "BIOMETRIC VERIFIED";
/// Marker in a payment-link creation payload; the URL follows it.
pub const PAYMENT_LINK_MARKER: &str = "Payment Link Created:";
/// Marker in a settled payment-status payload.
pub const PAYMENT_SUCCESSFUL_MARKER: &str = "Payment Successful";
/// Prefix of a successful roster lookup payload.
pub const ROSTER_FOUND_PREFIX: &str = "FOUND:";
/// Marker preceding the ticket number in a booking payload.
pub const TICKET_NUMBER_MARKER: &str = "Ticket Number is #";

const STANDARD_HOOKS: &[(&str, SlotHook)] = &[
    (tool_names::EXTRACT_STUDENT_INFO, extract_student_info_hook),
    (tool_names::VERIFY_STUDENT_IDENTITY, verify_identity_hook),
    (tool_names::VERIFY_BIOMETRIC_MATCH, biometric_match_hook),
    (tool_names::CREATE_PAYMENT_LINK, payment_link_hook),
    (tool_names::VERIFY_PAYMENT_STATUS, payment_status_hook),
    (tool_names::LOOKUP_STUDENT, roster_lookup_hook),
    (
        tool_names::CHECK_FINANCE_AVAILABILITY,
        availability_check_hook,
    ),
    (tool_names::BOOK_APPOINTMENT_TICKET, booking_hook),
];

/// Attaches the standard hooks to every matching registered tool.
pub fn attach_standard_hooks(registry: &mut ToolRegistry) {
    for (name, hook) in STANDARD_HOOKS {
        if !registry.attach_hook(name, *hook) {
            tracing::debug!(tool = name, "standard hook skipped, tool not registered");
        }
    }
}

fn arg_str(arguments: &JsonValue, key: &str) -> Option<String> {
    arguments.get(key).and_then(JsonValue::as_str).map(str::to_string)
}

/// OCR payloads are JSON: `{"success": true, "full_name": ..., "student_id": ...}`.
fn extract_student_info_hook(_arguments: &JsonValue, payload: &str) -> SlotPatch {
    let Ok(value) = serde_json::from_str::<JsonValue>(payload) else {
        return SlotPatch::default();
    };
    if value.get("success").and_then(JsonValue::as_bool) != Some(true) {
        return SlotPatch::default();
    }
    SlotPatch {
        student_id: arg_str(&value, "student_id"),
        student_name: arg_str(&value, "full_name"),
        ..Default::default()
    }
}

fn verify_identity_hook(arguments: &JsonValue, payload: &str) -> SlotPatch {
    if !payload.contains(IDENTITY_VERIFIED_MARKER) {
        return SlotPatch::default();
    }
    SlotPatch {
        identity_verified: Some(true),
        student_id: arg_str(arguments, "student_id"),
        ..Default::default()
    }
}

fn biometric_match_hook(_arguments: &JsonValue, payload: &str) -> SlotPatch {
    if !payload.contains(BIOMETRIC_VERIFIED_MARKER) {
        return SlotPatch::default();
    }
    SlotPatch {
        identity_verified: Some(true),
        ..Default::default()
    }
}

/// The link payload is prose with the URL embedded; take everything
/// from the first `http` onward.
fn payment_link_hook(arguments: &JsonValue, payload: &str) -> SlotPatch {
    let Some(idx) = payload.find("http") else {
        return SlotPatch::default();
    };
    SlotPatch {
        payment_link: Some(payload[idx..].trim().to_string()),
        amount: arguments.get("amount").and_then(JsonValue::as_f64),
        ..Default::default()
    }
}

fn payment_status_hook(_arguments: &JsonValue, payload: &str) -> SlotPatch {
    if !payload.contains(PAYMENT_SUCCESSFUL_MARKER) {
        return SlotPatch::default();
    }
    SlotPatch {
        payment_matched: Some(true),
        ..Default::default()
    }
}

/// Roster payloads look like `FOUND: Name: Alice Chen, Course: ...`.
fn roster_lookup_hook(arguments: &JsonValue, payload: &str) -> SlotPatch {
    if !payload.starts_with(ROSTER_FOUND_PREFIX) {
        return SlotPatch::default();
    }
    let name = payload
        .split_once("Name:")
        .map(|(_, rest)| rest)
        .and_then(|rest| rest.split(',').next())
        .map(|n| n.trim().to_string())
        .filter(|n| !n.is_empty());
    SlotPatch {
        student_email: arg_str(arguments, "email"),
        student_name: name,
        ..Default::default()
    }
}

fn availability_check_hook(arguments: &JsonValue, _payload: &str) -> SlotPatch {
    SlotPatch {
        preferred_date: arg_str(arguments, "date"),
        ..Default::default()
    }
}

fn booking_hook(arguments: &JsonValue, payload: &str) -> SlotPatch {
    let Some((_, rest)) = payload.split_once(TICKET_NUMBER_MARKER) else {
        return SlotPatch::default();
    };
    let ticket: String = rest
        .chars()
        .take_while(char::is_ascii_alphanumeric)
        .collect();
    let selected_slot = match (arg_str(arguments, "start_iso"), arg_str(arguments, "end_iso")) {
        (Some(start), Some(end)) => Some(serde_json::json!({"start": start, "end": end})),
        _ => None,
    };
    SlotPatch {
        meeting_confirmed: Some(true),
        support_ticket_id: (!ticket.is_empty()).then_some(ticket),
        student_email: arg_str(arguments, "email"),
        appointment_reason: arg_str(arguments, "reason"),
        selected_slot,
        ..Default::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn ocr_hook_reads_successful_json_payload() {
        let payload = r#"{"success": true, "full_name": "Alice Chen", "student_id": "W19283"}"#;
        let patch = extract_student_info_hook(&json!({}), payload);
        assert_eq!(patch.student_id.as_deref(), Some("W19283"));
        assert_eq!(patch.student_name.as_deref(), Some("Alice Chen"));

        let failed = extract_student_info_hook(&json!({}), r#"{"success": false}"#);
        assert!(failed.is_empty());
        let garbage = extract_student_info_hook(&json!({}), "not json at all");
        assert!(garbage.is_empty());
    }

    #[test]
    fn identity_hook_requires_marker() {
        let patch = verify_identity_hook(
            &json!({"student_id": "W19283"}),
            "Identity Verified: Matches enrollment record for Alice Chen.",
        );
        assert_eq!(patch.identity_verified, Some(true));
        assert_eq!(patch.student_id.as_deref(), Some("W19283"));

        let miss = verify_identity_hook(&json!({"student_id": "W0"}), "No matching record.");
        assert!(miss.is_empty());
    }

    #[test]
    fn payment_link_hook_extracts_url_and_amount() {
        let patch = payment_link_hook(
            &json!({"amount": 4500.0, "student_id": "W19283"}),
            "Payment Link Created: https://pay.example/cs_a1b2c3",
        );
        assert_eq!(
            patch.payment_link.as_deref(),
            Some("https://pay.example/cs_a1b2c3")
        );
        assert_eq!(patch.amount, Some(4500.0));

        assert!(payment_link_hook(&json!({}), "link creation declined").is_empty());
    }

    #[test]
    fn payment_status_hook_sets_terminal_flag() {
        let patch = payment_status_hook(&json!({}), "\u{2705} **Payment Successful!**");
        assert_eq!(patch.payment_matched, Some(true));
        assert!(payment_status_hook(&json!({}), "Status: unpaid").is_empty());
    }

    #[test]
    fn roster_hook_parses_found_line() {
        let patch = roster_lookup_hook(
            &json!({"email": "a.chen@uni.ac.uk"}),
            "FOUND: Name: Alice Chen, Course: Computer Science, Year: 2",
        );
        assert_eq!(patch.student_email.as_deref(), Some("a.chen@uni.ac.uk"));
        assert_eq!(patch.student_name.as_deref(), Some("Alice Chen"));

        assert!(roster_lookup_hook(&json!({"email": "x@y"}), "NOT_FOUND").is_empty());
    }

    #[test]
    fn booking_hook_reads_ticket_number_and_slot() {
        let args = json!({
            "email": "a.chen@uni.ac.uk",
            "start_iso": "2026-09-07T13:00:00Z",
            "end_iso": "2026-09-07T13:30:00Z",
            "reason": "tuition plan"
        });
        let patch = booking_hook(&args, "SUCCESS. Calendar invite sent. Your Ticket Number is #405.");
        assert_eq!(patch.meeting_confirmed, Some(true));
        assert_eq!(patch.support_ticket_id.as_deref(), Some("405"));
        assert_eq!(patch.appointment_reason.as_deref(), Some("tuition plan"));
        assert_eq!(
            patch.selected_slot,
            Some(json!({"start": "2026-09-07T13:00:00Z", "end": "2026-09-07T13:30:00Z"}))
        );
    }

    #[test]
    fn availability_hook_remembers_date() {
        let patch = availability_check_hook(&json!({"date": "2026-09-07"}), "13:00, 13:30, 14:00");
        assert_eq!(patch.preferred_date.as_deref(), Some("2026-09-07"));
    }
}
