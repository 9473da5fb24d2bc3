//! Patterns command for Amble.
//!
//! Runs the multi-day pattern scan over a user's recent check-ins and
//! reports any coach alerts it raised. Safe to run repeatedly; a pattern
//! already recorded for the day raises nothing new.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::monitor::{CoachAlert, SafetyMonitor};
use crate::notify::LogNotifier;
use crate::storage::{CheckinStore, SafetyStore};

/// Options for the patterns command.
#[derive(Debug, Clone, Default)]
pub struct PatternsOptions {
    /// Output as JSON.
    pub json: bool,
    /// Suppress output.
    pub quiet: bool,
}

/// One raised alert in command output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatternAlertInfo {
    /// Storage id of the alert.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,
    /// RED_IMMEDIATE or PATTERN_WARNING.
    pub alert_type: String,
    /// PENDING, SENT, or ACKNOWLEDGED.
    pub status: String,
}

impl PatternAlertInfo {
    /// Create alert info from a raised alert.
    pub fn from_alert(alert: &CoachAlert) -> Self {
        Self {
            id: alert.id,
            alert_type: alert.alert_type.as_str().to_string(),
            status: alert.status.as_str().to_string(),
        }
    }
}

/// Output format for the patterns command.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatternsOutput {
    /// Whether the scan completed.
    pub success: bool,
    /// Number of alerts raised by this scan.
    pub count: usize,
    /// The raised alerts.
    pub alerts: Vec<PatternAlertInfo>,
    /// Error message if the scan failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl PatternsOutput {
    /// Create a successful output from the raised alerts.
    pub fn success(alerts: &[CoachAlert]) -> Self {
        Self {
            success: true,
            count: alerts.len(),
            alerts: alerts.iter().map(PatternAlertInfo::from_alert).collect(),
            error: None,
        }
    }

    /// Create a failed output.
    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            count: 0,
            alerts: Vec::new(),
            error: Some(error.into()),
        }
    }
}

/// The patterns command implementation.
pub struct PatternsCommand<S> {
    store: S,
    notifier: LogNotifier,
    config: Config,
}

impl<S: SafetyStore + CheckinStore> PatternsCommand<S> {
    /// Create a new patterns command.
    pub fn new(store: S, config: Config) -> Self {
        let notifier = LogNotifier::new(config.alerts.coach_email.clone());
        Self {
            store,
            notifier,
            config,
        }
    }

    /// Run the pattern scan for one user as of the given day.
    pub fn run(
        &self,
        user_id: &str,
        today: NaiveDate,
        now: DateTime<Utc>,
        _options: &PatternsOptions,
    ) -> PatternsOutput {
        if user_id.trim().is_empty() {
            return PatternsOutput::failure("User id cannot be empty");
        }

        let monitor = SafetyMonitor::new(&self.store, &self.notifier, self.config.alerts.dispatch);
        match monitor.run_pattern_analysis(user_id, today, now) {
            Ok(alerts) => PatternsOutput::success(&alerts),
            Err(e) => PatternsOutput::failure(e.to_string()),
        }
    }

    /// Format output based on options.
    pub fn format_output(&self, output: &PatternsOutput, options: &PatternsOptions) -> String {
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
    fn format_human_readable(&self, output: &PatternsOutput) -> String {
        if !output.success {
            return format!(
                "Pattern scan failed: {}\n",
                output.error.as_deref().unwrap_or("unknown error")
            );
        }

        if output.alerts.is_empty() {
            return "No new pattern alerts.".to_string();
        }

        let mut lines = vec![format!("Raised {} pattern alert(s):", output.count)];
        for alert in &output.alerts {
            let id = alert.id.map_or("-".to_string(), |id| id.to_string());
            lines.push(format!("  #{} {} ({})", id, alert.alert_type, alert.status));
        }
        lines.join("\n")
    }
}
