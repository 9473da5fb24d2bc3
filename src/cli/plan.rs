//! Plan command for Amble.
//!
//! Returns the day's activity plan, generating it on the first request
//! and serving the stored plan afterwards.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::plan::{PlanItem, PlanReason, TodayPlan, TodayPlanBuilder};
use crate::storage::{PlanStore, ProgramSource};

/// Options for the plan command.
#[derive(Debug, Clone, Default)]
pub struct PlanOptions {
    /// Output as JSON.
    pub json: bool,
    /// Suppress output.
    pub quiet: bool,
}

/// One plan item in command output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanItemInfo {
    /// Program the item came from; absent for the built-in baseline.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub program_id: Option<u64>,
    /// Display label.
    pub label: String,
    /// Suggested duration in minutes.
    pub duration_min: u32,
    /// must, should, or could.
    pub priority: String,
    /// Why the item is on the plan.
    pub reason: String,
}

impl PlanItemInfo {
    /// Create item info from a plan item.
    pub fn from_item(item: &PlanItem) -> Self {
        let reason = match item.reason {
            PlanReason::AlwaysInclude => "always_include",
            PlanReason::UserSelected => "user_selected",
        };
        Self {
            program_id: item.program_id,
            label: item.label.clone(),
            duration_min: item.duration_min,
            priority: item.priority.as_str().to_string(),
            reason: reason.to_string(),
        }
    }
}

/// Output format for the plan command.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanOutput {
    /// Whether the plan was returned.
    pub success: bool,
    /// Day the plan covers.
    pub date: String,
    /// When the plan was first generated.
    pub generated_at: String,
    /// Number of items on the plan.
    pub count: usize,
    /// The plan items, in presentation order.
    pub items: Vec<PlanItemInfo>,
    /// Error message if the request failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl PlanOutput {
    /// Create a successful output from a plan.
    pub fn success(plan: &TodayPlan) -> Self {
        Self {
            success: true,
            date: plan.date.to_string(),
            generated_at: plan.generated_at.format("%Y-%m-%d %H:%M UTC").to_string(),
            count: plan.items.len(),
            items: plan.items.iter().map(PlanItemInfo::from_item).collect(),
            error: None,
        }
    }

    /// Create a failed output.
    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            date: String::new(),
            generated_at: String::new(),
            count: 0,
            items: Vec::new(),
            error: Some(error.into()),
        }
    }
}

/// The plan command implementation.
pub struct PlanCommand<S> {
    store: S,
    config: Config,
}

impl<S: PlanStore + ProgramSource> PlanCommand<S> {
    /// Create a new plan command.
    pub fn new(store: S, config: Config) -> Self {
        Self { store, config }
    }

    /// Run the plan command for one user and day.
    pub fn run(
        &self,
        user_id: &str,
        date: NaiveDate,
        now: DateTime<Utc>,
        _options: &PlanOptions,
    ) -> PlanOutput {
        if user_id.trim().is_empty() {
            return PlanOutput::failure("User id cannot be empty");
        }

        let builder = TodayPlanBuilder::new(&self.store, self.config.plan.baseline_minutes);
        match builder.get_or_create(user_id, date, now) {
            Ok(plan) => PlanOutput::success(&plan),
            Err(e) => PlanOutput::failure(e.to_string()),
        }
    }

    /// Format output based on options.
    pub fn format_output(&self, output: &PlanOutput, options: &PlanOptions) -> String {
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
    fn format_human_readable(&self, output: &PlanOutput) -> String {
        if !output.success {
            return format!(
                "Plan failed: {}\n",
                output.error.as_deref().unwrap_or("unknown error")
            );
        }

        let mut lines = vec![format!(
            "Plan for {} ({} item(s)):",
            output.date, output.count
        )];
        for (i, item) in output.items.iter().enumerate() {
            lines.push(format!(
                "  {}. [{}] {} ({} min)",
                i + 1,
                item.priority.to_uppercase(),
                item.label,
                item.duration_min,
            ));
        }
        lines.join("\n")
    }
}
