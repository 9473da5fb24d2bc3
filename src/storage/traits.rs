//! Store traits, one per aggregate family.
//!
//! Uniqueness lives in the store: insert-or-get writes return the stored
//! winner so concurrent duplicates resolve to one row instead of erroring
//! or overwriting. Backends must implement that contract; the shared
//! conformance tests at the bottom pin it down.

use std::sync::Arc;

use chrono::NaiveDate;

use crate::adaptive::UserAdaptiveState;
use crate::core::{CheckIn, PhaseHistoryEntry, RecoveryStatus, TodayState};
use crate::error::Result;
use crate::monitor::{AlertStatus, CoachAlert, SafetyEvent};
use crate::plan::{Enrollment, PathwayAssignment, TodayPlan};

/// Check-ins and their derived daily states.
pub trait CheckinStore: Send + Sync {
    /// Insert-or-get by (user, date). Returns the stored row and whether
    /// this call inserted it; when a row already exists it wins unchanged.
    fn insert_checkin(&self, checkin: &CheckIn) -> Result<(CheckIn, bool)>;

    /// The check-in for one day, if any.
    fn checkin(&self, user_id: &str, date: NaiveDate) -> Result<Option<CheckIn>>;

    /// Up to `limit` most recent check-ins, newest first.
    fn recent_checkins(&self, user_id: &str, limit: usize) -> Result<Vec<CheckIn>>;

    /// Check-ins dated `since` or later, newest first.
    fn checkins_since(&self, user_id: &str, since: NaiveDate) -> Result<Vec<CheckIn>>;

    /// Write the derived state for a day. Derived data, so plain upsert.
    fn put_today_state(&self, state: &TodayState) -> Result<()>;

    /// The derived state for one day, if any.
    fn today_state(&self, user_id: &str, date: NaiveDate) -> Result<Option<TodayState>>;

    /// Derived states dated `since` or later, newest first.
    fn today_states_since(&self, user_id: &str, since: NaiveDate) -> Result<Vec<TodayState>>;
}

/// Safety events and the coach alerts raised from them.
pub trait SafetyStore: Send + Sync {
    /// Insert an event unless one already exists for its
    /// (user, date, event type) key. Returns the stored event with its
    /// assigned id, or `None` when the key was already taken.
    fn insert_event(&self, event: &SafetyEvent) -> Result<Option<SafetyEvent>>;

    /// Fetch one event by id.
    fn event(&self, event_id: u64) -> Result<Option<SafetyEvent>>;

    /// A user's events, newest first.
    fn events(&self, user_id: &str) -> Result<Vec<SafetyEvent>>;

    /// Insert an alert, assigning its id.
    fn insert_alert(&self, alert: &CoachAlert) -> Result<CoachAlert>;

    /// Alerts across all users, newest first, optionally filtered by
    /// status. No limit is applied here.
    fn alerts(&self, status: Option<AlertStatus>) -> Result<Vec<CoachAlert>>;

    /// Move an alert's status forward and return the updated row.
    ///
    /// # Errors
    ///
    /// `AlertNotFound` for an unknown id; `InvalidState` for a backwards
    /// transition.
    fn advance_alert(&self, alert_id: u64, status: AlertStatus) -> Result<CoachAlert>;
}

/// Recovery phase status and its change history.
pub trait RecoveryStore: Send + Sync {
    fn upsert_status(&self, status: &RecoveryStatus) -> Result<()>;

    fn status(&self, user_id: &str) -> Result<Option<RecoveryStatus>>;

    /// Append one phase change to the history log.
    fn append_history(&self, entry: &PhaseHistoryEntry) -> Result<()>;

    /// Phase changes in append order (oldest first).
    fn history(&self, user_id: &str) -> Result<Vec<PhaseHistoryEntry>>;
}

/// The per-user adaptive state row.
pub trait AdaptiveStore: Send + Sync {
    fn adaptive_state(&self, user_id: &str) -> Result<Option<UserAdaptiveState>>;

    fn upsert_adaptive_state(&self, state: &UserAdaptiveState) -> Result<()>;
}

/// Generated daily plans.
pub trait PlanStore: Send + Sync {
    /// Insert-or-get by (user, date). The stored winner is returned; a
    /// plan, once generated, is never replaced.
    fn insert_plan(&self, plan: &TodayPlan) -> Result<TodayPlan>;

    fn plan(&self, user_id: &str, date: NaiveDate) -> Result<Option<TodayPlan>>;
}

/// Read-only view of the program catalog and care pathway.
///
/// These rows are owned by the enrollment system; this crate only
/// consumes them when shaping plans.
pub trait ProgramSource: Send + Sync {
    /// The user's active enrollments, in enrollment order.
    fn active_enrollments(&self, user_id: &str) -> Result<Vec<Enrollment>>;

    /// The user's pathway assignment, if one exists.
    fn pathway(&self, user_id: &str) -> Result<Option<PathwayAssignment>>;
}

// Arc forwarding, so shared stores satisfy the same bounds.

impl<T: CheckinStore + ?Sized> CheckinStore for Arc<T> {
    fn insert_checkin(&self, checkin: &CheckIn) -> Result<(CheckIn, bool)> {
        (**self).insert_checkin(checkin)
    }

    fn checkin(&self, user_id: &str, date: NaiveDate) -> Result<Option<CheckIn>> {
        (**self).checkin(user_id, date)
    }

    fn recent_checkins(&self, user_id: &str, limit: usize) -> Result<Vec<CheckIn>> {
        (**self).recent_checkins(user_id, limit)
    }

    fn checkins_since(&self, user_id: &str, since: NaiveDate) -> Result<Vec<CheckIn>> {
        (**self).checkins_since(user_id, since)
    }

    fn put_today_state(&self, state: &TodayState) -> Result<()> {
        (**self).put_today_state(state)
    }

    fn today_state(&self, user_id: &str, date: NaiveDate) -> Result<Option<TodayState>> {
        (**self).today_state(user_id, date)
    }

    fn today_states_since(&self, user_id: &str, since: NaiveDate) -> Result<Vec<TodayState>> {
        (**self).today_states_since(user_id, since)
    }
}

impl<T: SafetyStore + ?Sized> SafetyStore for Arc<T> {
    fn insert_event(&self, event: &SafetyEvent) -> Result<Option<SafetyEvent>> {
        (**self).insert_event(event)
    }

    fn event(&self, event_id: u64) -> Result<Option<SafetyEvent>> {
        (**self).event(event_id)
    }

    fn events(&self, user_id: &str) -> Result<Vec<SafetyEvent>> {
        (**self).events(user_id)
    }

    fn insert_alert(&self, alert: &CoachAlert) -> Result<CoachAlert> {
        (**self).insert_alert(alert)
    }

    fn alerts(&self, status: Option<AlertStatus>) -> Result<Vec<CoachAlert>> {
        (**self).alerts(status)
    }

    fn advance_alert(&self, alert_id: u64, status: AlertStatus) -> Result<CoachAlert> {
        (**self).advance_alert(alert_id, status)
    }
}

impl<T: RecoveryStore + ?Sized> RecoveryStore for Arc<T> {
    fn upsert_status(&self, status: &RecoveryStatus) -> Result<()> {
        (**self).upsert_status(status)
    }

    fn status(&self, user_id: &str) -> Result<Option<RecoveryStatus>> {
        (**self).status(user_id)
    }

    fn append_history(&self, entry: &PhaseHistoryEntry) -> Result<()> {
        (**self).append_history(entry)
    }

    fn history(&self, user_id: &str) -> Result<Vec<PhaseHistoryEntry>> {
        (**self).history(user_id)
    }
}

impl<T: AdaptiveStore + ?Sized> AdaptiveStore for Arc<T> {
    fn adaptive_state(&self, user_id: &str) -> Result<Option<UserAdaptiveState>> {
        (**self).adaptive_state(user_id)
    }

    fn upsert_adaptive_state(&self, state: &UserAdaptiveState) -> Result<()> {
        (**self).upsert_adaptive_state(state)
    }
}

impl<T: PlanStore + ?Sized> PlanStore for Arc<T> {
    fn insert_plan(&self, plan: &TodayPlan) -> Result<TodayPlan> {
        (**self).insert_plan(plan)
    }

    fn plan(&self, user_id: &str, date: NaiveDate) -> Result<Option<TodayPlan>> {
        (**self).plan(user_id, date)
    }
}

impl<T: ProgramSource + ?Sized> ProgramSource for Arc<T> {
    fn active_enrollments(&self, user_id: &str) -> Result<Vec<Enrollment>> {
        (**self).active_enrollments(user_id)
    }

    fn pathway(&self, user_id: &str) -> Result<Option<PathwayAssignment>> {
        (**self).pathway(user_id)
    }
}
