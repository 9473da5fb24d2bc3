//! Checkin command for Amble.
//!
//! Submits the daily check-in and reports the resulting safety guidance
//! for the day.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::core::CheckinInput;
use crate::intake::{CheckinIntake, CheckinOutcome};
use crate::notify::LogNotifier;
use crate::storage::{CheckinStore, SafetyStore};

/// Options for the checkin command.
#[derive(Debug, Clone, Default)]
pub struct CheckinOptions {
    /// Output as JSON.
    pub json: bool,
    /// Suppress output.
    pub quiet: bool,
}

/// Output format for the checkin command.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckinOutput {
    /// Whether the check-in was recorded.
    pub success: bool,
    /// Day the stored check-in covers.
    pub date: String,
    /// GREEN, YELLOW, or RED.
    pub safety_status: String,
    /// Readiness score, 0-100.
    pub readiness_score: u8,
    /// VERY_LOW, LOW, or MEDIUM.
    pub session_level: String,
    /// DOWN2, DOWN1, SAME, or UP1.
    pub intensity_modifier: String,
    /// Supportive headline for the day.
    pub title: String,
    /// Message body shown under the headline.
    pub body: String,
    /// Plain-language reason for the status.
    pub explain_why: String,
    /// True when the day already had a check-in and the stored one is shown.
    pub already_checked_in: bool,
    /// Error message if the check-in failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl CheckinOutput {
    /// Create a successful output from a submission outcome.
    pub fn success(outcome: &CheckinOutcome) -> Self {
        Self {
            success: true,
            date: outcome.checkin.date.to_string(),
            safety_status: outcome.state.safety_status.as_str().to_string(),
            readiness_score: outcome.state.readiness_score,
            session_level: outcome.state.session_level.as_str().to_string(),
            intensity_modifier: outcome.state.intensity_modifier.as_str().to_string(),
            title: outcome.safety_message.title.clone(),
            body: outcome.safety_message.body.clone(),
            explain_why: outcome.state.explain_why.clone(),
            already_checked_in: outcome.already_checked_in,
            error: None,
        }
    }

    /// Create a failed output.
    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            date: String::new(),
            safety_status: String::new(),
            readiness_score: 0,
            session_level: String::new(),
            intensity_modifier: String::new(),
            title: String::new(),
            body: String::new(),
            explain_why: String::new(),
            already_checked_in: false,
            error: Some(error.into()),
        }
    }
}

/// The checkin command implementation.
pub struct CheckinCommand<S: CheckinStore + SafetyStore> {
    store: S,
    notifier: LogNotifier,
    config: Config,
}

impl<S: CheckinStore + SafetyStore> CheckinCommand<S> {
    /// Create a new checkin command.
    pub fn new(store: S, config: Config) -> Self {
        let notifier = LogNotifier::new(config.alerts.coach_email.clone());
        Self {
            store,
            notifier,
            config,
        }
    }

    /// Run the checkin command for one user and day.
    ///
    /// A second submission for the same day does not overwrite; the stored
    /// check-in is reported with `already_checked_in` set.
    pub fn run(
        &self,
        user_id: &str,
        date: NaiveDate,
        input: &CheckinInput,
        now: DateTime<Utc>,
        _options: &CheckinOptions,
    ) -> CheckinOutput {
        if user_id.trim().is_empty() {
            return CheckinOutput::failure("User id cannot be empty");
        }

        let intake = CheckinIntake::new(&self.store, &self.notifier, self.config.alerts.dispatch);
        match intake.submit(user_id, date, input, now) {
            Ok(outcome) => CheckinOutput::success(&outcome),
            Err(e) => CheckinOutput::failure(e.to_string()),
        }
    }

    /// Format output based on options.
    pub fn format_output(&self, output: &CheckinOutput, options: &CheckinOptions) -> String {
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
    fn format_human_readable(&self, output: &CheckinOutput) -> String {
        if !output.success {
            return format!(
                "Check-in failed: {}\n",
                output.error.as_deref().unwrap_or("unknown error")
            );
        }

        let mut lines = Vec::new();
        if output.already_checked_in {
            lines.push(format!(
                "Already checked in for {}; showing the recorded check-in.",
                output.date
            ));
        }
        lines.push(output.title.clone());
        lines.push(output.body.clone());
        lines.push(String::new());
        lines.push(format!(
            "Status: {} | Readiness: {}/100 | Session: {} ({})",
            output.safety_status,
            output.readiness_score,
            output.session_level,
            output.intensity_modifier
        ));
        lines.push(format!("Why: {}", output.explain_why));
        lines.join("\n")
    }
}
