//! Daily plan generation.
//!
//! A plan is a short prioritized list built from the user's active
//! program enrollments, shaped by where they are in treatment. Plans are
//! generated once per (user, day) and then read back verbatim; a
//! concurrent double-generate resolves to whichever insert won.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::storage::{PlanStore, ProgramSource};

/// Plan shaping limits.
pub mod limits {
    /// The baseline movement item never exceeds this many minutes.
    pub const BASELINE_CAP_MIN: u32 = 5;
    /// During active treatment every optional item is clamped to this.
    pub const TREATMENT_CAP_MIN: u32 = 10;
    /// "Should" items kept outside active treatment.
    pub const MAX_SHOULD: usize = 2;
    /// "Should" items kept during active treatment.
    pub const TREATMENT_MAX_SHOULD: usize = 1;
    /// "Could" items kept regardless of phase.
    pub const MAX_COULD: usize = 3;
}

/// Treatments that put a user in the "in treatment" journey phase.
const ACTIVE_TREATMENTS: [&str; 2] = ["chemotherapy", "radiotherapy"];

/// Where the user is relative to their treatment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JourneyPhase {
    Pre,
    In,
    Post,
}

impl JourneyPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            JourneyPhase::Pre => "pre",
            JourneyPhase::In => "in",
            JourneyPhase::Post => "post",
        }
    }
}

/// Priority band for a plan item or enrollment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlanPriority {
    Must,
    Should,
    Could,
}

impl PlanPriority {
    pub fn as_str(&self) -> &'static str {
        match self {
            PlanPriority::Must => "must",
            PlanPriority::Should => "should",
            PlanPriority::Could => "could",
        }
    }
}

/// Why an item is on the plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanReason {
    /// The baseline movement slot, present on every plan.
    AlwaysInclude,
    /// Carried over from a program the user enrolled in.
    UserSelected,
}

/// One entry on a daily plan. Display fields are snapshotted at build
/// time so the plan stays stable even if the program catalog changes.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PlanItem {
    pub program_id: Option<u64>,
    pub label: String,
    pub duration_min: u32,
    pub priority: PlanPriority,
    pub reason: PlanReason,
}

/// The generated plan for one (user, day).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TodayPlan {
    pub user_id: String,
    pub date: NaiveDate,
    pub generated_at: DateTime<Utc>,
    pub items: Vec<PlanItem>,
}

/// An active program enrollment, as provided by the program catalog.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Enrollment {
    pub program_id: u64,
    pub name: String,
    /// Catalog category, e.g. "movement", "mobility", "recovery".
    pub category: String,
    pub default_duration_min: Option<u32>,
    pub priority: PlanPriority,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cadence: Option<String>,
}

/// The user's treatment pathway, as provided by the care plan.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PathwayAssignment {
    pub user_id: String,
    /// 0 means treatment has not started yet.
    pub stage: u32,
    #[serde(default)]
    pub current_treatments: Vec<String>,
}

/// Derive the journey phase from the pathway assignment.
///
/// No assignment reads as post-treatment, which is the least restrictive
/// phase for plan shaping.
pub fn journey_phase(assignment: Option<&PathwayAssignment>) -> JourneyPhase {
    let Some(assignment) = assignment else {
        return JourneyPhase::Post;
    };
    if assignment.stage == 0 {
        return JourneyPhase::Pre;
    }
    if assignment
        .current_treatments
        .iter()
        .any(|t| ACTIVE_TREATMENTS.contains(&t.as_str()))
    {
        return JourneyPhase::In;
    }
    JourneyPhase::Post
}

fn is_movement_category(category: &str) -> bool {
    matches!(category, "movement" | "mobility")
}

fn is_restorative_category(category: &str) -> bool {
    matches!(category, "recovery" | "mobility")
}

/// Assemble plan items from active enrollments.
///
/// The first movement/mobility enrollment anchors the mandatory baseline
/// slot; remaining enrollments fill the should/could bands. The must band
/// is reserved for the baseline, so must-priority enrollments without a
/// movement category never place an item of their own.
pub fn build_items(
    enrollments: &[Enrollment],
    phase: JourneyPhase,
    baseline_minutes: u32,
) -> Vec<PlanItem> {
    let movement = enrollments
        .iter()
        .find(|e| is_movement_category(&e.category));

    let baseline = PlanItem {
        program_id: movement.map(|e| e.program_id),
        label: "Gentle reset".to_string(),
        duration_min: movement
            .and_then(|e| e.default_duration_min)
            .unwrap_or(baseline_minutes)
            .min(limits::BASELINE_CAP_MIN),
        priority: PlanPriority::Must,
        reason: PlanReason::AlwaysInclude,
    };

    let mut should = Vec::new();
    let mut could = Vec::new();
    for enrollment in enrollments {
        if Some(enrollment.program_id) == movement.map(|e| e.program_id) {
            continue;
        }
        let item = PlanItem {
            program_id: Some(enrollment.program_id),
            label: enrollment.name.clone(),
            duration_min: enrollment.default_duration_min.unwrap_or(baseline_minutes),
            priority: enrollment.priority,
            reason: PlanReason::UserSelected,
        };
        match enrollment.priority {
            PlanPriority::Should => should.push(item),
            PlanPriority::Could => could.push(item),
            PlanPriority::Must => {}
        }
    }

    let category_of = |item: &PlanItem| -> Option<&str> {
        let id = item.program_id?;
        enrollments
            .iter()
            .find(|e| e.program_id == id)
            .map(|e| e.category.as_str())
    };

    let mut final_should: Vec<PlanItem> = match phase {
        JourneyPhase::In => should.iter().take(limits::TREATMENT_MAX_SHOULD).cloned().collect(),
        JourneyPhase::Pre | JourneyPhase::Post => {
            should.iter().take(limits::MAX_SHOULD).cloned().collect()
        }
    };

    if phase == JourneyPhase::In {
        let has_restorative = std::iter::once(&baseline)
            .chain(final_should.iter())
            .any(|item| category_of(item).is_some_and(is_restorative_category));
        if !has_restorative && !should.is_empty() {
            if let Some(recovery) = should
                .iter()
                .find(|item| category_of(item) == Some("recovery"))
            {
                final_should = vec![recovery.clone()];
            }
        }
        for item in &mut final_should {
            item.duration_min = item.duration_min.min(limits::TREATMENT_CAP_MIN);
        }
    }

    let mut items = vec![baseline];
    items.extend(final_should);
    items.extend(could.into_iter().take(limits::MAX_COULD));
    items
}

/// Builds and serves daily plans.
pub struct TodayPlanBuilder<'a, S> {
    store: &'a S,
    /// Fallback minutes for the baseline slot when the movement program
    /// has no default duration.
    baseline_minutes: u32,
}

impl<'a, S: PlanStore + ProgramSource> TodayPlanBuilder<'a, S> {
    pub fn new(store: &'a S, baseline_minutes: u32) -> Self {
        Self {
            store,
            baseline_minutes,
        }
    }

    /// The stored plan for the day, if one was already generated.
    pub fn today_plan(&self, user_id: &str, date: NaiveDate) -> Result<Option<TodayPlan>> {
        self.store.plan(user_id, date)
    }

    /// Return the day's plan, generating it on first request.
    ///
    /// Generation is keyed by (user, date); if another caller generated a
    /// plan between our read and insert, theirs is returned.
    pub fn get_or_create(
        &self,
        user_id: &str,
        date: NaiveDate,
        now: DateTime<Utc>,
    ) -> Result<TodayPlan> {
        if let Some(existing) = self.store.plan(user_id, date)? {
            return Ok(existing);
        }

        let enrollments = self.store.active_enrollments(user_id)?;
        let assignment = self.store.pathway(user_id)?;
        let phase = journey_phase(assignment.as_ref());
        let items = build_items(&enrollments, phase, self.baseline_minutes);
        tracing::debug!(
            user = user_id,
            phase = phase.as_str(),
            items = items.len(),
            "generated daily plan"
        );

        let plan = TodayPlan {
            user_id: user_id.to_string(),
            date,
            generated_at: now,
            items,
        };
        self.store.insert_plan(&plan)
    }
}
