//! Phase command for Amble.
//!
//! Reports the user's recovery phase, optionally running a fresh
//! evaluation over the check-in window first, and can include the
//! recorded history of phase changes.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::core::PhaseHistoryEntry;
use crate::progression::{PhaseEngine, PhaseStatus};
use crate::storage::{CheckinStore, RecoveryStore};

/// Options for the phase command.
#[derive(Debug, Clone, Default)]
pub struct PhaseOptions {
    /// Output as JSON.
    pub json: bool,
    /// Suppress output.
    pub quiet: bool,
    /// Run a fresh evaluation before reporting.
    pub evaluate: bool,
    /// Include recorded phase changes.
    pub history: bool,
}

/// One phase change in command output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhaseHistoryInfo {
    /// Day the change was recorded.
    pub date: String,
    /// Phase before the change.
    pub from_phase: String,
    /// Phase after the change.
    pub to_phase: String,
    /// Stability score that drove the change.
    pub stability_score: u8,
    /// Recorded reason.
    pub reason: String,
}

impl PhaseHistoryInfo {
    /// Create history info from a recorded entry.
    pub fn from_entry(entry: &PhaseHistoryEntry) -> Self {
        Self {
            date: entry.date.to_string(),
            from_phase: entry.from_phase.as_str().to_string(),
            to_phase: entry.to_phase.as_str().to_string(),
            stability_score: entry.stability_score,
            reason: entry.reason.clone(),
        }
    }
}

/// Output format for the phase command.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhaseOutput {
    /// Whether the phase could be read.
    pub success: bool,
    /// PROTECT, REBUILD, or EXPAND.
    pub phase: String,
    /// Stability score from the last evaluation, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stability_score: Option<u8>,
    /// Why the user is in this phase.
    pub reason: String,
    /// When the phase last changed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phase_updated_at: Option<String>,
    /// Whether the evaluation just run changed the phase.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phase_changed: Option<bool>,
    /// Phase before the evaluation just run, when it changed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub previous_phase: Option<String>,
    /// Recorded phase changes, oldest first.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub history: Option<Vec<PhaseHistoryInfo>>,
    /// Error message if the read failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl PhaseOutput {
    /// Create an output from the stored phase status.
    pub fn from_status(status: &PhaseStatus) -> Self {
        Self {
            success: true,
            phase: status.recovery_phase.as_str().to_string(),
            stability_score: status.stability_score,
            reason: status.phase_reason.clone(),
            phase_updated_at: status
                .phase_updated_at
                .map(|at| at.format("%Y-%m-%d %H:%M UTC").to_string()),
            phase_changed: None,
            previous_phase: None,
            history: None,
            error: None,
        }
    }

    /// Create a failed output.
    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            phase: String::new(),
            stability_score: None,
            reason: String::new(),
            phase_updated_at: None,
            phase_changed: None,
            previous_phase: None,
            history: None,
            error: Some(error.into()),
        }
    }
}

/// The phase command implementation.
pub struct PhaseCommand<S> {
    store: S,
    #[allow(dead_code)]
    config: Config,
}

impl<S: CheckinStore + RecoveryStore> PhaseCommand<S> {
    /// Create a new phase command.
    pub fn new(store: S, config: Config) -> Self {
        Self { store, config }
    }

    /// Run the phase command for one user.
    ///
    /// With `evaluate` set, the check-in window is scored and the phase
    /// updated before reporting; otherwise the stored status is returned
    /// as-is.
    pub fn run(
        &self,
        user_id: &str,
        date: NaiveDate,
        now: DateTime<Utc>,
        options: &PhaseOptions,
    ) -> PhaseOutput {
        if user_id.trim().is_empty() {
            return PhaseOutput::failure("User id cannot be empty");
        }

        let engine = PhaseEngine::new(&self.store);
        let evaluation = if options.evaluate {
            match engine.evaluate_phase(user_id, date, now) {
                Ok(evaluation) => Some(evaluation),
                Err(e) => return PhaseOutput::failure(e.to_string()),
            }
        } else {
            None
        };

        let status = match engine.phase_status(user_id) {
            Ok(status) => status,
            Err(e) => return PhaseOutput::failure(e.to_string()),
        };
        let mut output = PhaseOutput::from_status(&status);
        if let Some(evaluation) = evaluation {
            output.phase_changed = Some(evaluation.phase_changed);
            output.previous_phase = evaluation
                .previous_phase
                .map(|phase| phase.as_str().to_string());
        }

        if options.history {
            match engine.history(user_id) {
                Ok(entries) => {
                    output.history =
                        Some(entries.iter().map(PhaseHistoryInfo::from_entry).collect());
                }
                Err(e) => return PhaseOutput::failure(e.to_string()),
            }
        }

        output
    }

    /// Format output based on options.
    pub fn format_output(&self, output: &PhaseOutput, options: &PhaseOptions) -> String {
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
    fn format_human_readable(&self, output: &PhaseOutput) -> String {
        if !output.success {
            return format!(
                "Phase lookup failed: {}\n",
                output.error.as_deref().unwrap_or("unknown error")
            );
        }

        let mut lines = Vec::new();
        match output.stability_score {
            Some(score) => lines.push(format!(
                "Recovery phase: {} (stability {})",
                output.phase, score
            )),
            None => lines.push(format!("Recovery phase: {}", output.phase)),
        }
        lines.push(format!("  {}", output.reason));
        if let Some(since) = &output.phase_updated_at {
            lines.push(format!("  Since: {}", since));
        }
        if output.phase_changed == Some(true) {
            lines.push(format!(
                "Phase changed: {} -> {}",
                output.previous_phase.as_deref().unwrap_or("-"),
                output.phase,
            ));
        }
        if let Some(history) = &output.history {
            if history.is_empty() {
                lines.push("No phase changes recorded.".to_string());
            } else {
                lines.push("History:".to_string());
                for entry in history {
                    lines.push(format!(
                        "  {}  {} -> {}  (score {})",
                        entry.date, entry.from_phase, entry.to_phase, entry.stability_score,
                    ));
                }
            }
        }
        lines.join("\n")
    }
}
