//! Session command for Amble.
//!
//! Records session lifecycle updates from the app: completions, how the
//! session felt, and the seen-markers for phase changes and progress
//! reflections.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::adaptive::{SessionFeedback, TomorrowAdjustment, UserStateAggregator};
use crate::config::Config;
use crate::storage::{AdaptiveStore, CheckinStore, RecoveryStore};

/// Options for the session command.
#[derive(Debug, Clone, Default)]
pub struct SessionOptions {
    /// Output as JSON.
    pub json: bool,
    /// Suppress output.
    pub quiet: bool,
}

/// Output format for the session command.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionOutput {
    /// Whether the update was recorded.
    pub success: bool,
    /// Which session action ran.
    pub action: String,
    /// Sessions completed in the rolling week, after the update.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub week_session_count: Option<u32>,
    /// LIGHTER, SAME, or GENTLE_BUILD, after a feedback update.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tomorrow_adjustment: Option<String>,
    /// Error message if the update failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SessionOutput {
    /// Create a successful output for a completion.
    pub fn complete(week_session_count: u32) -> Self {
        Self {
            success: true,
            action: "complete".to_string(),
            week_session_count: Some(week_session_count),
            tomorrow_adjustment: None,
            error: None,
        }
    }

    /// Create a successful output for a feedback update.
    pub fn feedback(week_session_count: u32, adjustment: Option<TomorrowAdjustment>) -> Self {
        Self {
            success: true,
            action: "feedback".to_string(),
            week_session_count: Some(week_session_count),
            tomorrow_adjustment: adjustment.map(|a| a.as_str().to_string()),
            error: None,
        }
    }

    /// Create a successful output for a seen-marker update.
    pub fn seen(action: &str) -> Self {
        Self {
            success: true,
            action: action.to_string(),
            week_session_count: None,
            tomorrow_adjustment: None,
            error: None,
        }
    }

    /// Create a failed output.
    pub fn failure(action: &str, error: impl Into<String>) -> Self {
        Self {
            success: false,
            action: action.to_string(),
            week_session_count: None,
            tomorrow_adjustment: None,
            error: Some(error.into()),
        }
    }
}

/// The session command implementation.
pub struct SessionCommand<S> {
    store: S,
    #[allow(dead_code)]
    config: Config,
}

impl<S: AdaptiveStore + CheckinStore + RecoveryStore> SessionCommand<S> {
    /// Create a new session command.
    pub fn new(store: S, config: Config) -> Self {
        Self { store, config }
    }

    /// Record a completed session.
    pub fn complete(
        &self,
        user_id: &str,
        completed_at: DateTime<Utc>,
        _options: &SessionOptions,
    ) -> SessionOutput {
        if user_id.trim().is_empty() {
            return SessionOutput::failure("complete", "User id cannot be empty");
        }

        let aggregator = UserStateAggregator::new(&self.store);
        match aggregator.mark_session_complete(user_id, completed_at) {
            Ok(state) => SessionOutput::complete(state.week_session_count),
            Err(e) => SessionOutput::failure("complete", e.to_string()),
        }
    }

    /// Record how the last session felt.
    pub fn feedback(
        &self,
        user_id: &str,
        rating: &str,
        today: NaiveDate,
        at: DateTime<Utc>,
        _options: &SessionOptions,
    ) -> SessionOutput {
        if user_id.trim().is_empty() {
            return SessionOutput::failure("feedback", "User id cannot be empty");
        }
        let Some(feedback) = SessionFeedback::parse(rating) else {
            return SessionOutput::failure(
                "feedback",
                format!(
                    "Unknown rating: {} (use comfortable, a_bit_tiring, or too_much)",
                    rating
                ),
            );
        };

        let aggregator = UserStateAggregator::new(&self.store);
        match aggregator.record_session_feedback(user_id, feedback, at, today) {
            Ok(state) => SessionOutput::feedback(state.week_session_count, state.tomorrow_adjustment),
            Err(e) => SessionOutput::failure("feedback", e.to_string()),
        }
    }

    /// Mark the latest phase change as seen in the app.
    pub fn seen_phase(
        &self,
        user_id: &str,
        seen_at: DateTime<Utc>,
        _options: &SessionOptions,
    ) -> SessionOutput {
        if user_id.trim().is_empty() {
            return SessionOutput::failure("seen_phase", "User id cannot be empty");
        }

        let aggregator = UserStateAggregator::new(&self.store);
        match aggregator.mark_phase_transition_seen(user_id, seen_at) {
            Ok(()) => SessionOutput::seen("seen_phase"),
            Err(e) => SessionOutput::failure("seen_phase", e.to_string()),
        }
    }

    /// Mark the progress reflection as seen in the app.
    pub fn seen_reflection(
        &self,
        user_id: &str,
        seen_at: DateTime<Utc>,
        _options: &SessionOptions,
    ) -> SessionOutput {
        if user_id.trim().is_empty() {
            return SessionOutput::failure("seen_reflection", "User id cannot be empty");
        }

        let aggregator = UserStateAggregator::new(&self.store);
        match aggregator.mark_progress_reflection_seen(user_id, seen_at) {
            Ok(()) => SessionOutput::seen("seen_reflection"),
            Err(e) => SessionOutput::failure("seen_reflection", e.to_string()),
        }
    }

    /// Format output based on options.
    pub fn format_output(&self, output: &SessionOutput, options: &SessionOptions) -> String {
        if options.quiet {
            return String::new();
        }

        if options.json {
            serde_json::to_string_pretty(output).unwrap_or_else(|_| "{}".to_string())
        } else {
            self.format_human_readable(output)
        }
    }

    /// Format output as human-readable text.
    fn format_human_readable(&self, output: &SessionOutput) -> String {
        if !output.success {
            return format!(
                "Session update failed: {}\n",
                output.error.as_deref().unwrap_or("unknown error")
            );
        }

        match output.action.as_str() {
            "complete" => format!(
                "Session recorded. {} session(s) in the last week.",
                output.week_session_count.unwrap_or(0)
            ),
            "feedback" => {
                let next = match output.tomorrow_adjustment.as_deref() {
                    Some("LIGHTER") => "We'll keep tomorrow lighter.",
                    Some("GENTLE_BUILD") => "We'll build gently tomorrow.",
                    _ => "We'll keep tomorrow steady.",
                };
                format!("Thanks for the feedback. {}", next)
            }
            "seen_phase" => "Phase update marked as seen.".to_string(),
            "seen_reflection" => "Progress reflection marked as seen.".to_string(),
            _ => "Done.".to_string(),
        }
    }
}
