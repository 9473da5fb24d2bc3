//! Alerts command for Amble.
//!
//! The coach's view of raised alerts across all users, with an optional
//! status filter, plus acknowledgement of a handled alert.

use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::error::BestEffort;
use crate::monitor::{AlertStatus, CoachAlert, SafetyEvent, SafetyMonitor};
use crate::notify::LogNotifier;
use crate::storage::{CheckinStore, SafetyStore};

/// Options for the alerts command.
#[derive(Debug, Clone, Default)]
pub struct AlertsOptions {
    /// Output as JSON.
    pub json: bool,
    /// Suppress output.
    pub quiet: bool,
    /// Only list alerts with this status.
    pub status: Option<String>,
    /// Acknowledge this alert instead of listing.
    pub ack: Option<u64>,
}

/// One alert in command output, joined with its event when available.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertInfo {
    /// Storage id of the alert.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,
    /// User the alert is about.
    pub user_id: String,
    /// RED_IMMEDIATE or PATTERN_WARNING.
    pub alert_type: String,
    /// PENDING, SENT, or ACKNOWLEDGED.
    pub status: String,
    /// When the alert was raised.
    pub created_at: String,
    /// Day of the event behind the alert.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    /// Type of the event behind the alert.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event_type: Option<String>,
}

impl AlertInfo {
    /// Create alert info from an alert and, when on hand, its event.
    pub fn new(alert: &CoachAlert, event: Option<&SafetyEvent>) -> Self {
        Self {
            id: alert.id,
            user_id: alert.user_id.clone(),
            alert_type: alert.alert_type.as_str().to_string(),
            status: alert.status.as_str().to_string(),
            created_at: alert.created_at.format("%Y-%m-%d %H:%M UTC").to_string(),
            date: event.map(|e| e.date.to_string()),
            event_type: event.map(|e| e.event_type.as_str().to_string()),
        }
    }
}

/// Output format for the alerts command.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertsOutput {
    /// Whether the request succeeded.
    pub success: bool,
    /// Number of alerts returned.
    pub count: usize,
    /// The alerts, newest first.
    pub alerts: Vec<AlertInfo>,
    /// Id of the alert just acknowledged, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub acknowledged: Option<u64>,
    /// Error message if the request failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl AlertsOutput {
    /// Create a successful listing output.
    pub fn listed(alerts: Vec<AlertInfo>) -> Self {
        Self {
            success: true,
            count: alerts.len(),
            alerts,
            acknowledged: None,
            error: None,
        }
    }

    /// Create a successful acknowledgement output.
    pub fn acknowledged(info: AlertInfo) -> Self {
        let id = info.id;
        Self {
            success: true,
            count: 1,
            alerts: vec![info],
            acknowledged: id,
            error: None,
        }
    }

    /// Create a failed output.
    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            count: 0,
            alerts: Vec::new(),
            acknowledged: None,
            error: Some(error.into()),
        }
    }
}

/// The alerts command implementation.
pub struct AlertsCommand<S> {
    store: S,
    notifier: LogNotifier,
    config: Config,
}

impl<S: SafetyStore + CheckinStore> AlertsCommand<S> {
    /// Create a new alerts command.
    pub fn new(store: S, config: Config) -> Self {
        let notifier = LogNotifier::new(config.alerts.coach_email.clone());
        Self {
            store,
            notifier,
            config,
        }
    }

    /// Run the alerts command.
    ///
    /// With `ack` set, acknowledges that alert; otherwise lists alerts,
    /// optionally filtered by status.
    pub fn run(&self, options: &AlertsOptions) -> AlertsOutput {
        if let Some(id) = options.ack {
            return self.acknowledge(id);
        }

        let status = match &options.status {
            Some(raw) => match AlertStatus::parse(raw) {
                Some(status) => Some(status),
                None => return AlertsOutput::failure(format!("Unknown alert status: {}", raw)),
            },
            None => None,
        };

        match self.monitor().alerts(status) {
            Ok(views) => AlertsOutput::listed(
                views
                    .iter()
                    .map(|view| AlertInfo::new(&view.alert, Some(&view.event)))
                    .collect(),
            ),
            Err(e) => AlertsOutput::failure(e.to_string()),
        }
    }

    fn acknowledge(&self, alert_id: u64) -> AlertsOutput {
        match self.monitor().acknowledge(alert_id) {
            Ok(alert) => {
                let event = self
                    .store
                    .event(alert.event_id)
                    .best_effort_with("failed to read event for acknowledged alert", None);
                AlertsOutput::acknowledged(AlertInfo::new(&alert, event.as_ref()))
            }
            Err(e) => AlertsOutput::failure(e.to_string()),
        }
    }

    fn monitor(&self) -> SafetyMonitor<'_, S> {
        SafetyMonitor::new(&self.store, &self.notifier, self.config.alerts.dispatch)
    }

    /// Format output based on options.
    pub fn format_output(&self, output: &AlertsOutput, options: &AlertsOptions) -> String {
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
    fn format_human_readable(&self, output: &AlertsOutput) -> String {
        if !output.success {
            return format!(
                "Alerts failed: {}\n",
                output.error.as_deref().unwrap_or("unknown error")
            );
        }

        if let Some(id) = output.acknowledged {
            return format!("Alert #{} acknowledged.", id);
        }

        if output.alerts.is_empty() {
            return "No alerts.".to_string();
        }

        let mut lines = vec![format!("Found {} alert(s):", output.count)];
        for alert in &output.alerts {
            let id = alert.id.map_or("-".to_string(), |id| id.to_string());
            lines.push(format!(
                "  #{} [{}] {} for {} ({} on {})",
                id,
                alert.status,
                alert.alert_type,
                alert.user_id,
                alert.event_type.as_deref().unwrap_or("-"),
                alert.date.as_deref().unwrap_or("-"),
            ));
        }
        lines.join("\n")
    }
}
