//! Check-in intake: the single entry point for submitting a daily
//! check-in.
//!
//! One call validates the input, evaluates it, persists the check-in and
//! its derived state, and kicks off safety monitoring. The first
//! submission for a (user, day) wins; any later submission reads the
//! stored day back instead of overwriting it.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::core::{evaluate, CheckIn, CheckinInput, SafetyMessage, SafetyStatus, TodayState};
use crate::error::{BestEffort, Result};
use crate::monitor::SafetyMonitor;
use crate::notify::CoachNotifier;
use crate::storage::{CheckinStore, SafetyStore};

/// What a submission returns to the caller.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CheckinOutcome {
    /// The stored check-in for the day (the winner, not necessarily the
    /// submitted values).
    pub checkin: CheckIn,
    /// Derived state the session engine reads.
    pub state: TodayState,
    /// User-facing message for the day's status.
    pub safety_message: SafetyMessage,
    /// True when the day already had a check-in and this submission was
    /// answered from the stored one.
    pub already_checked_in: bool,
}

/// Today's check-in status for a user.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TodayCheckinStatus {
    pub date: NaiveDate,
    pub checkin: Option<CheckIn>,
    pub has_checked_in: bool,
}

/// A past check-in joined with its derived state, for history views.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CheckinHistoryEntry {
    pub checkin: CheckIn,
    pub state: Option<TodayState>,
}

/// Accepts and serves daily check-ins.
pub struct CheckinIntake<'a, S> {
    store: &'a S,
    notifier: &'a dyn CoachNotifier,
    dispatch: bool,
}

impl<'a, S: CheckinStore + SafetyStore> CheckinIntake<'a, S> {
    pub fn new(store: &'a S, notifier: &'a dyn CoachNotifier, dispatch: bool) -> Self {
        Self {
            store,
            notifier,
            dispatch,
        }
    }

    /// Submit a check-in for the given day.
    ///
    /// Validation and the check-in/state writes are primary: their errors
    /// propagate and nothing downstream runs. Safety monitoring is
    /// auxiliary: its failures are logged and the submission still
    /// succeeds.
    ///
    /// # Errors
    ///
    /// `InvalidCheckin` for bad input; `Storage`/`Store` when the primary
    /// writes fail.
    pub fn submit(
        &self,
        user_id: &str,
        date: NaiveDate,
        input: &CheckinInput,
        now: DateTime<Utc>,
    ) -> Result<CheckinOutcome> {
        let checkin = CheckIn::from_input(user_id, date, input, now)?;
        let (stored, inserted) = self.store.insert_checkin(&checkin)?;

        if !inserted {
            tracing::debug!(user = user_id, %date, "day already has a check-in, returning it");
            return self.stored_outcome(stored);
        }

        let evaluation = evaluate(&stored);
        let state = TodayState::from_evaluation(user_id, date, &evaluation);
        self.store.put_today_state(&state)?;
        tracing::info!(
            user = user_id,
            %date,
            status = state.safety_status.as_str(),
            readiness = state.readiness_score,
            "check-in recorded"
        );

        let monitor = self.monitor();
        monitor
            .record_immediate(&stored, &state, now)
            .best_effort_default("safety monitoring failed");
        monitor
            .run_pattern_analysis(user_id, date, now)
            .best_effort_default("pattern analysis failed");

        Ok(CheckinOutcome {
            checkin: stored,
            state,
            safety_message: evaluation.safety_message,
            already_checked_in: false,
        })
    }

    /// Whether the user already has a check-in for the day.
    pub fn has_checked_in(&self, user_id: &str, date: NaiveDate) -> Result<bool> {
        Ok(self.store.checkin(user_id, date)?.is_some())
    }

    /// Today's check-in record plus derived flags.
    pub fn today_status(&self, user_id: &str, date: NaiveDate) -> Result<TodayCheckinStatus> {
        let checkin = self.store.checkin(user_id, date)?;
        Ok(TodayCheckinStatus {
            date,
            has_checked_in: checkin.is_some(),
            checkin,
        })
    }

    /// Derived state for the day, if a check-in was evaluated.
    pub fn today_state(&self, user_id: &str, date: NaiveDate) -> Result<Option<TodayState>> {
        self.store.today_state(user_id, date)
    }

    /// Whether exercise is paused today (a RED day).
    pub fn is_paused(&self, user_id: &str, date: NaiveDate) -> Result<bool> {
        let state = self.store.today_state(user_id, date)?;
        Ok(matches!(state, Some(s) if s.safety_status == SafetyStatus::Red))
    }

    /// Most recent check-ins joined with their states, newest first.
    pub fn recent(&self, user_id: &str, limit: usize) -> Result<Vec<CheckinHistoryEntry>> {
        let checkins = self.store.recent_checkins(user_id, limit)?;
        let mut entries = Vec::with_capacity(checkins.len());
        for checkin in checkins {
            let state = self.store.today_state(user_id, checkin.date)?;
            entries.push(CheckinHistoryEntry { checkin, state });
        }
        Ok(entries)
    }

    /// Build the outcome for a day that was already checked in.
    ///
    /// The stored state is authoritative; if it went missing (an earlier
    /// submission died between writes) it is recomputed and put back.
    fn stored_outcome(&self, stored: CheckIn) -> Result<CheckinOutcome> {
        let evaluation = evaluate(&stored);
        let state = match self.store.today_state(&stored.user_id, stored.date)? {
            Some(state) => state,
            None => {
                let state = TodayState::from_evaluation(&stored.user_id, stored.date, &evaluation);
                self.store.put_today_state(&state)?;
                state
            }
        };
        Ok(CheckinOutcome {
            checkin: stored,
            state,
            safety_message: evaluation.safety_message,
            already_checked_in: true,
        })
    }

    fn monitor(&self) -> SafetyMonitor<'a, S> {
        SafetyMonitor::new(self.store, self.notifier, self.dispatch)
    }
}
