//! Definitions for the standard tool surface.
//!
//! Concrete implementations (payment provider, calendar, identity
//! registry, OCR, web search) live outside this workspace; embedders
//! register them under these names so the handler tool subsets and the
//! slot hooks line up.

use crate::handler::tool_names;
use garnet_porter_conversation::ToolDefinition;
use serde_json::json;

/// Returns the definition for a standard tool name, if it is one.
#[must_use]
pub fn definition(name: &str) -> Option<ToolDefinition> {
    standard_definitions().into_iter().find(|d| d.name == name)
}

/// Returns definitions for the full standard tool surface.
#[must_use]
pub fn standard_definitions() -> Vec<ToolDefinition> {
    vec![
        ToolDefinition::new(
            tool_names::EXTRACT_STUDENT_INFO,
            "Reads the student's full name and student id from an uploaded ID card image.",
        )
        .with_input_schema(json!({
            "type": "object",
            "properties": {
                "image_url": {"type": "string", "description": "URL of the uploaded ID card image"}
            },
            "required": ["image_url"]
        })),
        ToolDefinition::new(
            tool_names::VERIFY_STUDENT_IDENTITY,
            "Checks a student id against the enrollment registry.",
        )
        .with_input_schema(json!({
            "type": "object",
            "properties": {
                "student_id": {"type": "string", "description": "Student id extracted from the ID card"}
            },
            "required": ["student_id"]
        })),
        ToolDefinition::new(
            tool_names::VERIFY_BIOMETRIC_MATCH,
            "Compares the ID card photo against a live webcam image of the student.",
        )
        .with_input_schema(json!({
            "type": "object",
            "properties": {
                "id_card_url": {"type": "string"},
                "live_image_url": {"type": "string"}
            },
            "required": ["id_card_url", "live_image_url"]
        })),
        ToolDefinition::new(
            tool_names::CREATE_PAYMENT_LINK,
            "Creates a tuition payment link for a verified student. The link expires in 30 minutes.",
        )
        .with_input_schema(json!({
            "type": "object",
            "properties": {
                "amount": {"type": "number", "description": "Amount in GBP"},
                "student_id": {"type": "string"}
            },
            "required": ["amount", "student_id"]
        })),
        ToolDefinition::new(
            tool_names::VERIFY_PAYMENT_STATUS,
            "Looks up the status of a previous payment by its session or reference id.",
        )
        .with_input_schema(json!({
            "type": "object",
            "properties": {
                "reference": {"type": "string", "description": "Payment session or reference id"}
            },
            "required": ["reference"]
        })),
        ToolDefinition::new(
            tool_names::LOOKUP_STUDENT,
            "Looks a student up on the enrollment roster by university email.",
        )
        .with_input_schema(json!({
            "type": "object",
            "properties": {
                "email": {"type": "string", "description": "University email address"}
            },
            "required": ["email"]
        })),
        ToolDefinition::new(
            tool_names::CHECK_FINANCE_AVAILABILITY,
            "Lists free finance-team meeting slots for a date (weekdays 13:00-16:00).",
        )
        .with_input_schema(json!({
            "type": "object",
            "properties": {
                "date": {"type": "string", "description": "Date to check, YYYY-MM-DD"}
            },
            "required": ["date"]
        })),
        ToolDefinition::new(
            tool_names::BOOK_APPOINTMENT_TICKET,
            "Books a confirmed slot, sends the calendar invite, and raises a support ticket.",
        )
        .with_input_schema(json!({
            "type": "object",
            "properties": {
                "email": {"type": "string"},
                "start_iso": {"type": "string", "description": "Slot start, ISO 8601"},
                "end_iso": {"type": "string", "description": "Slot end, ISO 8601"},
                "reason": {"type": "string", "description": "Why the student wants the meeting"}
            },
            "required": ["email", "start_iso", "end_iso"]
        })),
        ToolDefinition::new(
            tool_names::SEARCH_UNIVERSITY_INFO,
            "Searches university pages and documents for campus information.",
        )
        .with_input_schema(json!({
            "type": "object",
            "properties": {
                "query": {"type": "string"}
            },
            "required": ["query"]
        })),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn surface_has_nine_tools_with_unique_names() {
        let defs = standard_definitions();
        assert_eq!(defs.len(), 9);
        let mut names: Vec<_> = defs.iter().map(|d| d.name.clone()).collect();
        names.sort();
        names.dedup();
        assert_eq!(names.len(), 9);
    }

    #[test]
    fn definition_lookup_by_name() {
        let def = definition(tool_names::LOOKUP_STUDENT).expect("known tool");
        assert!(def.input_schema["required"]
            .as_array()
            .expect("required list")
            .contains(&serde_json::json!("email")));
        assert!(definition("does_not_exist").is_none());
    }
}
