//! Procedure handler configurations.
//!
//! Each handler is a pairing of an instruction template and the subset
//! of tools it is allowed to call. Instructions are rendered fresh at
//! the start of every turn so they can reflect the current slot values
//! (uploaded files, verified identity) and the current date.

use chrono::{DateTime, Days, Utc};
use garnet_porter_conversation::{HandlerKind, Slots};
use std::fmt::Write as _;

/// Names of the standard tool surface.
pub mod tool_names {
    pub const EXTRACT_STUDENT_INFO: &str = "extract_student_info_from_image";
    pub const VERIFY_STUDENT_IDENTITY: &str = "verify_student_identity";
    pub const VERIFY_BIOMETRIC_MATCH: &str = "verify_biometric_match";
    pub const CREATE_PAYMENT_LINK: &str = "create_payment_link";
    pub const VERIFY_PAYMENT_STATUS: &str = "verify_payment_status";
    pub const LOOKUP_STUDENT: &str = "lookup_student";
    pub const CHECK_FINANCE_AVAILABILITY: &str = "check_finance_availability";
    pub const BOOK_APPOINTMENT_TICKET: &str = "book_appointment_ticket";
    pub const SEARCH_UNIVERSITY_INFO: &str = "search_university_info";
}

const PAYMENT_TOOLS: &[&str] = &[
    tool_names::EXTRACT_STUDENT_INFO,
    tool_names::VERIFY_STUDENT_IDENTITY,
    tool_names::VERIFY_BIOMETRIC_MATCH,
    tool_names::CREATE_PAYMENT_LINK,
];

const RECONCILIATION_TOOLS: &[&str] = &[tool_names::VERIFY_PAYMENT_STATUS];

const APPOINTMENT_TOOLS: &[&str] = &[
    tool_names::LOOKUP_STUDENT,
    tool_names::CHECK_FINANCE_AVAILABILITY,
    tool_names::BOOK_APPOINTMENT_TICKET,
];

const INFO_TOOLS: &[&str] = &[tool_names::SEARCH_UNIVERSITY_INFO];

/// A handler's instruction template and permitted tool subset.
#[derive(Debug, Clone, Copy)]
pub struct HandlerConfig {
    kind: HandlerKind,
    tool_names: &'static [&'static str],
}

impl HandlerConfig {
    /// Returns the configuration for a handler kind.
    #[must_use]
    pub fn for_kind(kind: HandlerKind) -> Self {
        let tool_names = match kind {
            HandlerKind::Payment => PAYMENT_TOOLS,
            HandlerKind::Reconciliation => RECONCILIATION_TOOLS,
            HandlerKind::Appointment => APPOINTMENT_TOOLS,
            HandlerKind::Info => INFO_TOOLS,
        };
        Self { kind, tool_names }
    }

    /// Returns the handler kind.
    #[must_use]
    pub fn kind(&self) -> HandlerKind {
        self.kind
    }

    /// Returns the tool names this handler may call.
    #[must_use]
    pub fn tool_names(&self) -> &'static [&'static str] {
        self.tool_names
    }

    /// Renders the instruction message for the current turn.
    #[must_use]
    pub fn instructions(&self, slots: &Slots, now: DateTime<Utc>) -> String {
        match self.kind {
            HandlerKind::Payment => payment_instructions(slots),
            HandlerKind::Reconciliation => reconciliation_instructions(slots),
            HandlerKind::Appointment => appointment_instructions(slots, now),
            HandlerKind::Info => INFO_INSTRUCTIONS.to_string(),
        }
    }
}

fn payment_instructions(slots: &Slots) -> String {
    let mut out = String::from(
        "You are the payments assistant for the university student services desk. \
         You help students pay tuition fees, but only after their identity is verified.\n\
         \n\
         WORKFLOW (strict order):\n\
         1. If identity is not yet verified, ask the student to upload a photo of \
         their student ID card. When an ID card image is available, call \
         extract_student_info_from_image on its URL to read the name and student id.\n\
         2. Call verify_student_identity with the extracted student id to check it \
         against the enrollment registry.\n\
         3. If registry verification passes and a live webcam image is available, \
         call verify_biometric_match with both image URLs to confirm the person \
         holding the card is its owner. If no live image is available yet, ask for one.\n\
         4. Only once identity is fully verified, ask for the amount (if unknown) and \
         call create_payment_link. Present the link clearly and tell the student it \
         expires in 30 minutes.\n\
         \n\
         RULES:\n\
         - Never create a payment link for an unverified student.\n\
         - Never ask for information you already have.\n\
         - If a tool reports an error, explain the problem plainly and suggest the \
         next step; do not expose internal error text.\n\
         - Keep replies short and professional.",
    );

    if let Some(url) = &slots.id_card_url {
        let _ = write!(
            out,
            "\n\n[SYSTEM INFO] The student has uploaded an ID card image: {url}\n\
             Use extract_student_info_from_image on this URL now instead of asking for it."
        );
    }
    if let Some(url) = &slots.live_image_url {
        let _ = write!(
            out,
            "\n\n[SYSTEM INFO] The student has uploaded a live webcam image: {url}\n\
             Use it for the biometric check instead of asking again."
        );
    }
    if slots.identity_verified {
        let _ = write!(
            out,
            "\n\n[SYSTEM INFO] Identity already verified for this session\
             {}{}. Skip straight to payment.",
            slots
                .student_name
                .as_deref()
                .map(|n| format!(" (name: {n}"))
                .unwrap_or_default(),
            match (&slots.student_name, &slots.student_id) {
                (Some(_), Some(id)) => format!(", id: {id})"),
                (Some(_), None) => ")".to_string(),
                (None, Some(id)) => format!(" (id: {id})"),
                (None, None) => String::new(),
            }
        );
    }

    out
}

fn reconciliation_instructions(slots: &Slots) -> String {
    let mut out = String::from(
        "You are the payment reconciliation assistant for the university student \
         services desk. Students come to you when they have ALREADY paid but \
         something is off: portal still blocked, balance not updated, missing \
         payment reference.\n\
         \n\
         WORKFLOW:\n\
         1. Ask for the payment session or reference id from their receipt if you \
         do not have one.\n\
         2. Call verify_payment_status with that id.\n\
         3. If the provider confirms the payment, reassure the student and tell \
         them their record is now matched; access is typically restored within \
         one hour.\n\
         4. If the provider reports the payment as unpaid or unknown, say so \
         plainly and offer to book them a meeting with the finance team.\n\
         \n\
         Keep replies short and factual. Never invent a payment status.",
    );

    if let Some(link) = &slots.payment_link {
        let _ = write!(
            out,
            "\n\n[SYSTEM INFO] A payment link was issued earlier in this session: {link}"
        );
    }

    out
}

fn appointment_instructions(slots: &Slots, now: DateTime<Utc>) -> String {
    let mut out = format!(
        "You are Alex, the student liaison officer for the university finance \
         team. You book in-person meetings between students and the finance team.\n\
         \n\
         Current date and time: {} ({})\n\
         \n\
         {}\n\
         PROTOCOL (three phases, in order):\n\
         \n\
         Phase 1 - Identify. Ask for the student's university email and call \
         lookup_student with it. If the roster says NOT_FOUND, ask them to \
         double-check the address; after a second failure, suggest they contact \
         the registry office directly.\n\
         \n\
         Phase 2 - Find a slot. Ask what day works for them, resolve relative \
         dates (\"next Monday\") with the calendar reference above, and call \
         check_finance_availability for that date. The finance team only sees \
         students Monday to Friday, 13:00 to 16:00; if they ask for a weekend \
         or a morning, say so and offer the nearest valid option.\n\
         \n\
         Phase 3 - Book, with permission. Present the available slots and ask \
         the student to pick one. NEVER call book_appointment_ticket until the \
         student has explicitly confirmed a specific slot. After booking, read \
         the ticket number back to them.\n\
         \n\
         Stay warm but efficient. One question at a time.",
        now.format("%Y-%m-%d %H:%M UTC"),
        now.format("%A"),
        date_reference(now),
    );

    if let Some(email) = &slots.student_email {
        let _ = write!(
            out,
            "\n\n[SYSTEM INFO] Student email already on file: {email}"
        );
    }
    if let Some(date) = &slots.preferred_date {
        let _ = write!(
            out,
            "\n[SYSTEM INFO] Preferred date already discussed: {date}"
        );
    }

    out
}

const INFO_INSTRUCTIONS: &str =
    "You are the general information assistant for the university student \
     services desk. Answer questions about the campus: library, buildings and \
     locations, the gym, the student union, courses, and events.\n\
     \n\
     Use search_university_info to ground every factual answer; do not answer \
     campus questions from memory. If the search returns nothing useful, say \
     you could not find it and point the student to the main reception desk.\n\
     \n\
     Keep answers short. Use a list only when listing several items.";

/// Renders a two-week calendar block so the model can resolve relative
/// dates ("next Monday", "the day after tomorrow") deterministically.
#[must_use]
pub fn date_reference(now: DateTime<Utc>) -> String {
    let today = now.date_naive();
    let mut out = String::from("CALENDAR REFERENCE (for resolving relative dates):\n");
    for offset in 0..14u64 {
        // Unwrap-free: adding up to 14 days never overflows NaiveDate.
        if let Some(day) = today.checked_add_days(Days::new(offset)) {
            let label = match offset {
                0 => " (today)",
                1 => " (tomorrow)",
                _ => "",
            };
            let week = if offset < 7 { "this week" } else { "next week" };
            let _ = writeln!(out, "- {} is {week}{label}", day.format("%A %Y-%m-%d"));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn wednesday() -> DateTime<Utc> {
        // 2026-09-02 is a Wednesday.
        Utc.with_ymd_and_hms(2026, 9, 2, 10, 30, 0).single().unwrap()
    }

    #[test]
    fn payment_handler_gets_payment_tools_only() {
        let cfg = HandlerConfig::for_kind(HandlerKind::Payment);
        assert_eq!(cfg.tool_names().len(), 4);
        assert!(cfg.tool_names().contains(&tool_names::CREATE_PAYMENT_LINK));
        assert!(!cfg.tool_names().contains(&tool_names::LOOKUP_STUDENT));
    }

    #[test]
    fn payment_instructions_inject_uploaded_files() {
        let cfg = HandlerConfig::for_kind(HandlerKind::Payment);
        let slots = Slots {
            id_card_url: Some("https://cdn.example/id_77.jpg".into()),
            ..Default::default()
        };
        let text = cfg.instructions(&slots, wednesday());
        assert!(text.contains("[SYSTEM INFO]"));
        assert!(text.contains("https://cdn.example/id_77.jpg"));
    }

    #[test]
    fn payment_instructions_note_verified_identity() {
        let cfg = HandlerConfig::for_kind(HandlerKind::Payment);
        let slots = Slots {
            identity_verified: true,
            student_name: Some("Alice Chen".into()),
            student_id: Some("W19283".into()),
            ..Default::default()
        };
        let text = cfg.instructions(&slots, wednesday());
        assert!(text.contains("already verified"));
        assert!(text.contains("Alice Chen"));
        assert!(text.contains("W19283"));
    }

    #[test]
    fn appointment_instructions_carry_calendar_and_hours() {
        let cfg = HandlerConfig::for_kind(HandlerKind::Appointment);
        let text = cfg.instructions(&Slots::default(), wednesday());
        assert!(text.contains("2026-09-02"));
        assert!(text.contains("Wednesday"));
        assert!(text.contains("13:00 to 16:00"));
        assert!(text.contains("CALENDAR REFERENCE"));
        assert!(text.contains("NEVER call book_appointment_ticket"));
    }

    #[test]
    fn date_reference_covers_two_weeks() {
        let block = date_reference(wednesday());
        assert!(block.contains("(today)"));
        assert!(block.contains("(tomorrow)"));
        // Last listed day: 13 days out.
        assert!(block.contains("2026-09-15"));
        assert_eq!(block.lines().count(), 15);
    }

    #[test]
    fn info_instructions_require_search_grounding() {
        let cfg = HandlerConfig::for_kind(HandlerKind::Info);
        let text = cfg.instructions(&Slots::default(), wednesday());
        assert!(text.contains("search_university_info"));
        assert_eq!(cfg.tool_names(), INFO_TOOLS);
    }
}
