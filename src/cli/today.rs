//! Today command for Amble.
//!
//! Shows the day at a glance: check-in status, the safety decision, the
//! friendly reason for today's session mode, and whether a plan exists.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::adaptive::UserStateAggregator;
use crate::config::Config;
use crate::core::explain;
use crate::core::{evaluate, ModeDecision, SafetyStatus, SessionMode, TodayState};
use crate::error::BestEffort;
use crate::intake::CheckinIntake;
use crate::notify::LogNotifier;
use crate::plan::TodayPlanBuilder;
use crate::storage::{
    AdaptiveStore, CheckinStore, PlanStore, ProgramSource, RecoveryStore, SafetyStore,
};

/// Options for the today command.
#[derive(Debug, Clone, Default)]
pub struct TodayOptions {
    /// Output as JSON.
    pub json: bool,
    /// Suppress output.
    pub quiet: bool,
}

/// Output format for the today command.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TodayOutput {
    /// Whether the day could be read.
    pub success: bool,
    /// Day being described.
    pub date: String,
    /// Whether a check-in exists for the day.
    pub has_checked_in: bool,
    /// GREEN, YELLOW, or RED, once the day has a check-in.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub safety_status: Option<String>,
    /// Readiness score, 0-100.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub readiness_score: Option<u8>,
    /// VERY_LOW, LOW, or MEDIUM.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_level: Option<String>,
    /// REST, EASIER, or MAIN.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_mode: Option<String>,
    /// Friendly one-line reason for today's mode.
    pub message: String,
    /// Plain-language explanation recorded with the day's state.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub explain_why: Option<String>,
    /// True when exercise is paused for the day.
    pub paused: bool,
    /// Items on today's plan, when one has been generated.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plan_items: Option<usize>,
    /// Error message if the read failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl TodayOutput {
    /// Create an output for a day with no check-in yet.
    pub fn not_checked_in(date: NaiveDate) -> Self {
        Self {
            success: true,
            date: date.to_string(),
            has_checked_in: false,
            safety_status: None,
            readiness_score: None,
            session_level: None,
            session_mode: None,
            message: "No check-in yet today. Check in to get your plan.".to_string(),
            explain_why: None,
            paused: false,
            plan_items: None,
            error: None,
        }
    }

    /// Create an output for an evaluated day.
    pub fn from_state(
        date: NaiveDate,
        state: &TodayState,
        mode: SessionMode,
        message: String,
        plan_items: Option<usize>,
    ) -> Self {
        Self {
            success: true,
            date: date.to_string(),
            has_checked_in: true,
            safety_status: Some(state.safety_status.as_str().to_string()),
            readiness_score: Some(state.readiness_score),
            session_level: Some(state.session_level.as_str().to_string()),
            session_mode: Some(mode.as_str().to_string()),
            message,
            explain_why: Some(state.explain_why.clone()),
            paused: state.safety_status == SafetyStatus::Red,
            plan_items,
            error: None,
        }
    }

    /// Create a failed output.
    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            date: String::new(),
            has_checked_in: false,
            safety_status: None,
            readiness_score: None,
            session_level: None,
            session_mode: None,
            message: String::new(),
            explain_why: None,
            paused: false,
            plan_items: None,
            error: Some(error.into()),
        }
    }
}

/// The today command implementation.
pub struct TodayCommand<S> {
    store: S,
    notifier: LogNotifier,
    config: Config,
}

impl<S> TodayCommand<S>
where
    S: CheckinStore + SafetyStore + AdaptiveStore + RecoveryStore + PlanStore + ProgramSource,
{
    /// Create a new today command.
    pub fn new(store: S, config: Config) -> Self {
        let notifier = LogNotifier::new(config.alerts.coach_email.clone());
        Self {
            store,
            notifier,
            config,
        }
    }

    /// Run the today command for one user and day.
    pub fn run(
        &self,
        user_id: &str,
        date: NaiveDate,
        now: DateTime<Utc>,
        _options: &TodayOptions,
    ) -> TodayOutput {
        if user_id.trim().is_empty() {
            return TodayOutput::failure("User id cannot be empty");
        }

        let intake = CheckinIntake::new(&self.store, &self.notifier, self.config.alerts.dispatch);
        let status = match intake.today_status(user_id, date) {
            Ok(status) => status,
            Err(e) => return TodayOutput::failure(e.to_string()),
        };
        let Some(checkin) = status.checkin else {
            return TodayOutput::not_checked_in(date);
        };

        let state = match intake.today_state(user_id, date) {
            Ok(Some(state)) => state,
            // The state row is derived, so a missing one can be rebuilt
            // from the check-in without writing anything.
            Ok(None) => TodayState::from_evaluation(user_id, date, &evaluate(&checkin)),
            Err(e) => return TodayOutput::failure(e.to_string()),
        };

        // The lighter-session cap never upgrades a day; it only pulls a
        // MAIN day down to EASIER.
        let aggregator = UserStateAggregator::new(&self.store);
        let lighter = aggregator
            .needs_lighter_session(user_id, date, now)
            .best_effort_with("failed to read adaptive state for today view", false);

        let checkin_mode = SessionMode::from_safety_status(state.safety_status);
        let cap = (lighter && checkin_mode == SessionMode::Main).then_some(SessionMode::Easier);
        let final_mode = cap.unwrap_or(checkin_mode);
        let decision = ModeDecision {
            checkin_mode: Some(checkin_mode.as_str().to_string()),
            cap_from_last_session: cap.map(|c| c.as_str().to_string()),
            final_mode: Some(final_mode.as_str().to_string()),
            explanation: None,
        };
        let message = explain::render(Some(&decision), Some(final_mode));

        let builder = TodayPlanBuilder::new(&self.store, self.config.plan.baseline_minutes);
        let plan_items = builder
            .today_plan(user_id, date)
            .best_effort_with("failed to read today plan", None)
            .map(|plan| plan.items.len());

        TodayOutput::from_state(date, &state, final_mode, message, plan_items)
    }

    /// Format output based on options.
    pub fn format_output(&self, output: &TodayOutput, options: &TodayOptions) -> String {
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
    fn format_human_readable(&self, output: &TodayOutput) -> String {
        if !output.success {
            return format!(
                "Today view failed: {}\n",
                output.error.as_deref().unwrap_or("unknown error")
            );
        }

        let mut lines = vec![format!("Today ({}):", output.date)];
        if !output.has_checked_in {
            lines.push(format!("  {}", output.message));
            return lines.join("\n");
        }

        lines.push(format!(
            "  Status: {} | Readiness: {}/100 | Session: {}",
            output.safety_status.as_deref().unwrap_or("-"),
            output.readiness_score.unwrap_or(0),
            output.session_level.as_deref().unwrap_or("-"),
        ));
        lines.push(format!("  {}", output.message));
        if output.paused {
            lines.push("  Exercise is paused for today.".to_string());
        }
        if let Some(why) = &output.explain_why {
            lines.push(format!("  Why: {}", why));
        }
        match output.plan_items {
            Some(count) => lines.push(format!("  Plan: {} item(s) ready.", count)),
            None => lines.push("  Plan: not generated yet.".to_string()),
        }
        lines.join("\n")
    }
}
