//! Friendly "why this plan?" rendering.
//!
//! Turns internal session-mode decision fields into one supportive sentence.
//! Structured fields are matched first; free-text matching exists only as a
//! compatibility shim for older records. Internal tokens like `TOO_EASY`
//! must never reach the rendered output.

use serde::{Deserialize, Serialize};

use crate::core::safety::SafetyStatus;

/// Coarse session mode for a day's plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SessionMode {
    Rest,
    Easier,
    Main,
}

impl SessionMode {
    /// Stored identifier for this mode.
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionMode::Rest => "REST",
            SessionMode::Easier => "EASIER",
            SessionMode::Main => "MAIN",
        }
    }

    /// The mode a day's safety status maps to.
    pub fn from_safety_status(status: SafetyStatus) -> SessionMode {
        match status {
            SafetyStatus::Red => SessionMode::Rest,
            SafetyStatus::Yellow => SessionMode::Easier,
            SafetyStatus::Green => SessionMode::Main,
        }
    }
}

/// Raw decision record behind a day's session mode.
///
/// Fields are kept as loose strings: older records carry free text and
/// partial fields, and the renderer is the only consumer.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct ModeDecision {
    /// Mode the check-in alone would pick.
    pub checkin_mode: Option<String>,
    /// Cap carried over from the last session's feedback.
    pub cap_from_last_session: Option<String>,
    /// Mode actually applied.
    pub final_mode: Option<String>,
    /// Free-text explanation written by older versions.
    pub explanation: Option<String>,
}

/// Render one friendly sentence for the day's mode.
///
/// Resolution order: structured field patterns, then substring rules over
/// the legacy free text, then a per-mode fallback when no record exists.
pub fn render(decision: Option<&ModeDecision>, mode: Option<SessionMode>) -> String {
    let final_mode = decision.and_then(|d| d.final_mode.as_deref());
    let checkin_mode = decision.and_then(|d| d.checkin_mode.as_deref());
    let cap = decision.and_then(|d| d.cap_from_last_session.as_deref());
    let raw = decision
        .and_then(|d| d.explanation.as_deref())
        .filter(|s| !s.is_empty());

    // Structured: the check-in itself required rest.
    if final_mode == Some("REST") && checkin_mode == Some("REST") {
        return "Your check-in says rest is the safest option today.".to_string();
    }

    // Structured: the last-session cap won over the check-in.
    if let (Some(fm), Some(cap)) = (final_mode, cap) {
        if fm == cap && checkin_mode != Some(cap) {
            return "We're keeping it gentler today based on your last session.".to_string();
        }
    }

    // Structured: usual plan sustained after a "felt easy" session.
    if final_mode == Some("MAIN")
        && cap == Some("MAIN")
        && checkin_mode == Some("MAIN")
        && raw.is_some_and(|r| r.contains("TOO_EASY"))
    {
        return "You were feeling good last time, so we'll stick with your usual plan."
            .to_string();
    }

    // Legacy free text, first match wins.
    if let Some(raw) = raw {
        if raw.contains("capped") {
            return "We're keeping it gentler today based on your last session.".to_string();
        }
        if raw.contains("check-in required REST") {
            return "Your check-in says rest is the safest option today.".to_string();
        }
        if raw.contains("TOO_EASY") {
            return "You were feeling good last time, so we'll stick with your usual plan."
                .to_string();
        }
        return "No extra limits today — we'll keep it steady.".to_string();
    }

    // No record at all: fall back on the coarse mode.
    match mode.unwrap_or(SessionMode::Main) {
        SessionMode::Rest => "Today is a recovery day.".to_string(),
        SessionMode::Easier => "Keeping it gentler today.".to_string(),
        SessionMode::Main => "You're good for your usual plan today.".to_string(),
    }
}
