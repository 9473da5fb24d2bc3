//! Adaptive per-user state: session history, feedback, and the derived
//! signals the app uses to soften or skip flows.
//!
//! The aggregated [`UserState`] is a read model; the only persisted row
//! is [`UserAdaptiveState`], mutated through the small set of mark/record
//! operations. A user with no stored rows reads as a fresh PROTECT user.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::core::RecoveryPhase;
use crate::error::Result;
use crate::storage::{AdaptiveStore, CheckinStore, RecoveryStore};

/// Bucketing and timing thresholds for adaptive signals.
pub mod thresholds {
    /// Energy at or below this buckets as LOW.
    pub const LOW_ENERGY_MAX: u8 = 3;
    /// Energy at or below this (and above LOW) buckets as OKAY.
    pub const OKAY_ENERGY_MAX: u8 = 6;
    /// Pain at or above this buckets as UNCOMFORTABLE.
    pub const UNCOMFORTABLE_PAIN_MIN: u8 = 7;
    /// Pain at or above this (and below UNCOMFORTABLE) buckets as MANAGEABLE.
    pub const MANAGEABLE_PAIN_MIN: u8 = 4;
    /// Confidence at or below this buckets as LOW.
    pub const LOW_CONFIDENCE_MAX: u8 = 3;
    /// Confidence at or below this (and above LOW) buckets as SOME.
    pub const SOME_CONFIDENCE_MAX: u8 = 6;
    /// Days without a session before the return-after-break flow.
    pub const BREAK_DAYS: i64 = 7;
    /// Sentinel for "never had a session".
    pub const NO_SESSION_DAYS: i64 = 999;
    /// A TOO_MUCH rating keeps sessions lighter for this many hours.
    pub const LIGHTER_FEEDBACK_HOURS: i64 = 48;
    /// Length of the rolling weekly session window.
    pub const WEEK_WINDOW_DAYS: i64 = 7;
}

// ===== Buckets and feedback =====

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EnergyBucket {
    Low,
    Okay,
    Good,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ComfortBucket {
    Uncomfortable,
    Manageable,
    Comfortable,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConfidenceBucket {
    Low,
    Some,
    Ready,
}

/// Bucket a 0-10 energy score for the adaptive UI.
pub fn energy_bucket(energy: u8) -> EnergyBucket {
    if energy <= thresholds::LOW_ENERGY_MAX {
        EnergyBucket::Low
    } else if energy <= thresholds::OKAY_ENERGY_MAX {
        EnergyBucket::Okay
    } else {
        EnergyBucket::Good
    }
}

/// Bucket a 0-10 pain score for the adaptive UI.
pub fn comfort_bucket(pain: u8) -> ComfortBucket {
    if pain >= thresholds::UNCOMFORTABLE_PAIN_MIN {
        ComfortBucket::Uncomfortable
    } else if pain >= thresholds::MANAGEABLE_PAIN_MIN {
        ComfortBucket::Manageable
    } else {
        ComfortBucket::Comfortable
    }
}

/// Bucket a 0-10 confidence score for the adaptive UI.
pub fn confidence_bucket(confidence: u8) -> ConfidenceBucket {
    if confidence <= thresholds::LOW_CONFIDENCE_MAX {
        ConfidenceBucket::Low
    } else if confidence <= thresholds::SOME_CONFIDENCE_MAX {
        ConfidenceBucket::Some
    } else {
        ConfidenceBucket::Ready
    }
}

/// How the last session felt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SessionFeedback {
    Comfortable,
    ABitTiring,
    TooMuch,
}

impl SessionFeedback {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionFeedback::Comfortable => "COMFORTABLE",
            SessionFeedback::ABitTiring => "A_BIT_TIRING",
            SessionFeedback::TooMuch => "TOO_MUCH",
        }
    }

    /// Parse a feedback name, case-insensitively.
    pub fn parse(s: &str) -> Option<SessionFeedback> {
        match s.to_ascii_uppercase().as_str() {
            "COMFORTABLE" => Some(SessionFeedback::Comfortable),
            "A_BIT_TIRING" => Some(SessionFeedback::ABitTiring),
            "TOO_MUCH" => Some(SessionFeedback::TooMuch),
            _ => None,
        }
    }

    /// How tomorrow's session should shift in response.
    pub fn adjustment(&self) -> TomorrowAdjustment {
        match self {
            SessionFeedback::TooMuch => TomorrowAdjustment::Lighter,
            SessionFeedback::ABitTiring => TomorrowAdjustment::Same,
            SessionFeedback::Comfortable => TomorrowAdjustment::GentleBuild,
        }
    }
}

/// Standing adjustment applied to the next session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TomorrowAdjustment {
    Lighter,
    Same,
    GentleBuild,
}

impl TomorrowAdjustment {
    pub fn as_str(&self) -> &'static str {
        match self {
            TomorrowAdjustment::Lighter => "LIGHTER",
            TomorrowAdjustment::Same => "SAME",
            TomorrowAdjustment::GentleBuild => "GENTLE_BUILD",
        }
    }
}

// ===== Persisted state =====

/// The per-user adaptive row, mutated incrementally.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UserAdaptiveState {
    pub user_id: String,
    #[serde(default)]
    pub phase_transition_seen_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub last_session_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub last_session_feedback: Option<SessionFeedback>,
    #[serde(default)]
    pub last_session_feedback_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub week_session_count: u32,
    #[serde(default)]
    pub week_window_start: Option<NaiveDate>,
    #[serde(default)]
    pub tomorrow_adjustment: Option<TomorrowAdjustment>,
    #[serde(default)]
    pub progress_reflection_seen_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

impl UserAdaptiveState {
    pub fn new(user_id: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            user_id: user_id.into(),
            phase_transition_seen_at: None,
            last_session_at: None,
            last_session_feedback: None,
            last_session_feedback_at: None,
            week_session_count: 0,
            week_window_start: None,
            tomorrow_adjustment: None,
            progress_reflection_seen_at: None,
            updated_at: now,
        }
    }
}

/// Consolidated view handed to the app: recovery phase, session history,
/// today's buckets, and the derived needs_* flags.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UserState {
    pub user_id: String,
    pub phase: RecoveryPhase,
    pub phase_changed_at: Option<DateTime<Utc>>,
    pub phase_transition_seen_at: Option<DateTime<Utc>>,
    pub last_session_at: Option<DateTime<Utc>>,
    pub last_session_feedback: Option<SessionFeedback>,
    pub last_session_feedback_at: Option<DateTime<Utc>>,
    pub week_session_count: u32,
    pub week_window_start: Option<NaiveDate>,
    pub today_energy: Option<EnergyBucket>,
    pub today_comfort: Option<ComfortBucket>,
    pub today_confidence: Option<ConfidenceBucket>,
    pub tomorrow_adjustment: Option<TomorrowAdjustment>,
    pub progress_reflection_seen_at: Option<DateTime<Utc>>,
    /// Whole days since the last completed session, or 999 if none.
    pub days_since_session: i64,
    pub needs_no_energy_flow: bool,
    pub needs_return_after_break: bool,
    pub needs_phase_transition: bool,
}

// ===== Aggregator =====

/// Builds [`UserState`] and applies the four mutations the app may make.
pub struct UserStateAggregator<'a, S> {
    store: &'a S,
}

impl<'a, S: AdaptiveStore + CheckinStore + RecoveryStore> UserStateAggregator<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    /// Assemble the consolidated state for `user_id` as of `now`.
    ///
    /// Missing rows read as defaults: PROTECT phase, zero sessions, no
    /// buckets. Nothing is written.
    pub fn user_state(
        &self,
        user_id: &str,
        today: NaiveDate,
        now: DateTime<Utc>,
    ) -> Result<UserState> {
        let adaptive = self
            .store
            .adaptive_state(user_id)?
            .unwrap_or_else(|| UserAdaptiveState::new(user_id, now));
        let recovery = self.store.status(user_id)?;
        let checkin = self.store.checkin(user_id, today)?;

        let phase = recovery
            .as_ref()
            .map(|r| r.recovery_phase)
            .unwrap_or_default();
        let phase_changed_at = recovery.as_ref().map(|r| r.phase_updated_at);

        let days_since_session = adaptive
            .last_session_at
            .map(|at| now.signed_duration_since(at).num_days())
            .unwrap_or(thresholds::NO_SESSION_DAYS);

        let today_energy = checkin.as_ref().map(|c| energy_bucket(c.energy));
        let needs_no_energy_flow = today_energy == Some(EnergyBucket::Low);
        let needs_return_after_break = days_since_session >= thresholds::BREAK_DAYS;
        let needs_phase_transition = match (phase_changed_at, adaptive.phase_transition_seen_at) {
            (Some(_), None) => true,
            (Some(changed), Some(seen)) => changed > seen,
            (None, _) => false,
        };

        Ok(UserState {
            user_id: user_id.to_string(),
            phase,
            phase_changed_at,
            phase_transition_seen_at: adaptive.phase_transition_seen_at,
            last_session_at: adaptive.last_session_at,
            last_session_feedback: adaptive.last_session_feedback,
            last_session_feedback_at: adaptive.last_session_feedback_at,
            week_session_count: adaptive.week_session_count,
            week_window_start: adaptive.week_window_start,
            today_energy,
            today_comfort: checkin.as_ref().map(|c| comfort_bucket(c.pain)),
            today_confidence: checkin.as_ref().map(|c| confidence_bucket(c.confidence)),
            tomorrow_adjustment: adaptive.tomorrow_adjustment,
            progress_reflection_seen_at: adaptive.progress_reflection_seen_at,
            days_since_session,
            needs_no_energy_flow,
            needs_return_after_break,
            needs_phase_transition,
        })
    }

    /// Record a completed session and maintain the rolling weekly count.
    ///
    /// The window is anchored at the first session in it. Once the anchor
    /// is more than seven days old the next completion starts a new window
    /// with a count of one.
    pub fn mark_session_complete(
        &self,
        user_id: &str,
        completed_at: DateTime<Utc>,
    ) -> Result<UserAdaptiveState> {
        let mut state = self.load_or_init(user_id, completed_at)?;
        let completed_date = completed_at.date_naive();
        let stale_before = completed_date - Duration::days(thresholds::WEEK_WINDOW_DAYS);

        match state.week_window_start {
            Some(start) if start < stale_before => {
                state.week_session_count = 1;
                state.week_window_start = Some(completed_date);
            }
            Some(_) => {
                state.week_session_count += 1;
            }
            None => {
                state.week_session_count += 1;
                state.week_window_start = Some(completed_date);
            }
        }

        state.last_session_at = Some(completed_at);
        state.updated_at = completed_at;
        self.store.upsert_adaptive_state(&state)?;
        Ok(state)
    }

    /// Store session feedback and derive tomorrow's adjustment from it.
    pub fn record_session_feedback(
        &self,
        user_id: &str,
        feedback: SessionFeedback,
        at: DateTime<Utc>,
        today: NaiveDate,
    ) -> Result<UserState> {
        let mut state = self.load_or_init(user_id, at)?;
        state.last_session_feedback = Some(feedback);
        state.last_session_feedback_at = Some(at);
        state.tomorrow_adjustment = Some(feedback.adjustment());
        state.updated_at = at;
        self.store.upsert_adaptive_state(&state)?;
        self.user_state(user_id, today, at)
    }

    /// The user has seen the phase-change banner.
    pub fn mark_phase_transition_seen(
        &self,
        user_id: &str,
        seen_at: DateTime<Utc>,
    ) -> Result<()> {
        let mut state = self.load_or_init(user_id, seen_at)?;
        state.phase_transition_seen_at = Some(seen_at);
        state.updated_at = seen_at;
        self.store.upsert_adaptive_state(&state)
    }

    /// The user has seen the progress reflection screen.
    pub fn mark_progress_reflection_seen(
        &self,
        user_id: &str,
        seen_at: DateTime<Utc>,
    ) -> Result<()> {
        let mut state = self.load_or_init(user_id, seen_at)?;
        state.progress_reflection_seen_at = Some(seen_at);
        state.updated_at = seen_at;
        self.store.upsert_adaptive_state(&state)
    }

    /// Whether the next session should be softened: today's energy is LOW,
    /// a TOO_MUCH rating landed within the last 48 hours, or the standing
    /// adjustment says LIGHTER.
    pub fn needs_lighter_session(
        &self,
        user_id: &str,
        today: NaiveDate,
        now: DateTime<Utc>,
    ) -> Result<bool> {
        let state = self.user_state(user_id, today, now)?;
        if state.needs_no_energy_flow {
            return Ok(true);
        }
        if state.last_session_feedback == Some(SessionFeedback::TooMuch) {
            if let Some(at) = state.last_session_feedback_at {
                let hours = now.signed_duration_since(at).num_hours();
                if hours <= thresholds::LIGHTER_FEEDBACK_HOURS {
                    return Ok(true);
                }
            }
        }
        Ok(state.tomorrow_adjustment == Some(TomorrowAdjustment::Lighter))
    }

    fn load_or_init(&self, user_id: &str, now: DateTime<Utc>) -> Result<UserAdaptiveState> {
        Ok(self
            .store
            .adaptive_state(user_id)?
            .unwrap_or_else(|| UserAdaptiveState::new(user_id, now)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{CheckIn, CheckinInput, RecoveryStatus};
    use crate::storage::MemoryStore;
    use chrono::TimeZone;

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, 10).unwrap()
    }

    fn at(day: u32, hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, day, hour, 0, 0).unwrap()
    }

    fn seed_checkin(store: &MemoryStore, energy: i64, pain: i64, confidence: i64) {
        let input = CheckinInput {
            energy,
            pain,
            confidence,
            ..CheckinInput::default()
        };
        let checkin = CheckIn::from_input("user-1", day(), &input, Utc::now()).unwrap();
        crate::storage::CheckinStore::insert_checkin(store, &checkin).unwrap();
    }

    fn seed_phase(store: &MemoryStore, changed_at: DateTime<Utc>) {
        let status = RecoveryStatus {
            user_id: "user-1".to_string(),
            recovery_phase: RecoveryPhase::Rebuild,
            stability_score: 70,
            phase_reason: "Moved to REBUILD: stability score 70 with consistent energy/confidence and minimal yellow days.".to_string(),
            phase_updated_at: changed_at,
            updated_at: changed_at,
        };
        store.upsert_status(&status).unwrap();
    }

    // Bucketing

    #[test]
    fn test_energy_buckets() {
        assert_eq!(energy_bucket(0), EnergyBucket::Low);
        assert_eq!(energy_bucket(3), EnergyBucket::Low);
        assert_eq!(energy_bucket(4), EnergyBucket::Okay);
        assert_eq!(energy_bucket(6), EnergyBucket::Okay);
        assert_eq!(energy_bucket(7), EnergyBucket::Good);
        assert_eq!(energy_bucket(10), EnergyBucket::Good);
    }

    #[test]
    fn test_comfort_buckets() {
        assert_eq!(comfort_bucket(10), ComfortBucket::Uncomfortable);
        assert_eq!(comfort_bucket(7), ComfortBucket::Uncomfortable);
        assert_eq!(comfort_bucket(6), ComfortBucket::Manageable);
        assert_eq!(comfort_bucket(4), ComfortBucket::Manageable);
        assert_eq!(comfort_bucket(3), ComfortBucket::Comfortable);
        assert_eq!(comfort_bucket(0), ComfortBucket::Comfortable);
    }

    #[test]
    fn test_confidence_buckets() {
        assert_eq!(confidence_bucket(3), ConfidenceBucket::Low);
        assert_eq!(confidence_bucket(4), ConfidenceBucket::Some);
        assert_eq!(confidence_bucket(6), ConfidenceBucket::Some);
        assert_eq!(confidence_bucket(7), ConfidenceBucket::Ready);
    }

    #[test]
    fn test_feedback_adjustment_mapping() {
        assert_eq!(
            SessionFeedback::TooMuch.adjustment(),
            TomorrowAdjustment::Lighter
        );
        assert_eq!(
            SessionFeedback::ABitTiring.adjustment(),
            TomorrowAdjustment::Same
        );
        assert_eq!(
            SessionFeedback::Comfortable.adjustment(),
            TomorrowAdjustment::GentleBuild
        );
    }

    #[test]
    fn test_feedback_parse() {
        assert_eq!(
            SessionFeedback::parse("too_much"),
            Some(SessionFeedback::TooMuch)
        );
        assert_eq!(
            SessionFeedback::parse("A_BIT_TIRING"),
            Some(SessionFeedback::ABitTiring)
        );
        assert_eq!(SessionFeedback::parse("meh"), None);
    }

    // Aggregated state

    #[test]
    fn test_fresh_user_reads_as_defaults() {
        let store = MemoryStore::new();
        let agg = UserStateAggregator::new(&store);
        let state = agg.user_state("user-1", day(), at(10, 12)).unwrap();

        assert_eq!(state.phase, RecoveryPhase::Protect);
        assert_eq!(state.week_session_count, 0);
        assert_eq!(state.days_since_session, 999);
        assert!(state.needs_return_after_break);
        assert!(!state.needs_no_energy_flow);
        assert!(!state.needs_phase_transition);
        assert_eq!(state.today_energy, None);
    }

    #[test]
    fn test_today_checkin_populates_buckets() {
        let store = MemoryStore::new();
        seed_checkin(&store, 2, 5, 8);
        let agg = UserStateAggregator::new(&store);
        let state = agg.user_state("user-1", day(), at(10, 12)).unwrap();

        assert_eq!(state.today_energy, Some(EnergyBucket::Low));
        assert_eq!(state.today_comfort, Some(ComfortBucket::Manageable));
        assert_eq!(state.today_confidence, Some(ConfidenceBucket::Ready));
        assert!(state.needs_no_energy_flow);
    }

    #[test]
    fn test_needs_phase_transition_until_seen() {
        let store = MemoryStore::new();
        seed_phase(&store, at(8, 9));
        let agg = UserStateAggregator::new(&store);

        let state = agg.user_state("user-1", day(), at(10, 12)).unwrap();
        assert!(state.needs_phase_transition);

        agg.mark_phase_transition_seen("user-1", at(9, 9)).unwrap();
        let state = agg.user_state("user-1", day(), at(10, 12)).unwrap();
        assert!(!state.needs_phase_transition);
    }

    #[test]
    fn test_phase_change_after_seen_flags_again() {
        let store = MemoryStore::new();
        let agg = UserStateAggregator::new(&store);
        agg.mark_phase_transition_seen("user-1", at(9, 9)).unwrap();
        seed_phase(&store, at(10, 9));

        let state = agg.user_state("user-1", day(), at(10, 12)).unwrap();
        assert!(state.needs_phase_transition);
    }

    #[test]
    fn test_return_after_break_at_seven_days() {
        let store = MemoryStore::new();
        let agg = UserStateAggregator::new(&store);
        agg.mark_session_complete("user-1", at(3, 12)).unwrap();

        let state = agg.user_state("user-1", day(), at(9, 12)).unwrap();
        assert_eq!(state.days_since_session, 6);
        assert!(!state.needs_return_after_break);

        let state = agg.user_state("user-1", day(), at(10, 12)).unwrap();
        assert_eq!(state.days_since_session, 7);
        assert!(state.needs_return_after_break);
    }

    // Weekly window

    #[test]
    fn test_first_session_starts_window() {
        let store = MemoryStore::new();
        let agg = UserStateAggregator::new(&store);
        let state = agg.mark_session_complete("user-1", at(3, 12)).unwrap();

        assert_eq!(state.week_session_count, 1);
        assert_eq!(
            state.week_window_start,
            Some(NaiveDate::from_ymd_opt(2025, 3, 3).unwrap())
        );
        assert_eq!(state.last_session_at, Some(at(3, 12)));
    }

    #[test]
    fn test_sessions_within_window_increment() {
        let store = MemoryStore::new();
        let agg = UserStateAggregator::new(&store);
        agg.mark_session_complete("user-1", at(3, 12)).unwrap();
        agg.mark_session_complete("user-1", at(5, 12)).unwrap();
        let state = agg.mark_session_complete("user-1", at(10, 12)).unwrap();

        // Day 10 is exactly seven days after the anchor, still inside.
        assert_eq!(state.week_session_count, 3);
        assert_eq!(
            state.week_window_start,
            Some(NaiveDate::from_ymd_opt(2025, 3, 3).unwrap())
        );
    }

    #[test]
    fn test_stale_window_resets_and_reanchors() {
        let store = MemoryStore::new();
        let agg = UserStateAggregator::new(&store);
        agg.mark_session_complete("user-1", at(1, 12)).unwrap();
        agg.mark_session_complete("user-1", at(2, 12)).unwrap();
        let state = agg.mark_session_complete("user-1", at(11, 12)).unwrap();

        assert_eq!(state.week_session_count, 1);
        assert_eq!(
            state.week_window_start,
            Some(NaiveDate::from_ymd_opt(2025, 3, 11).unwrap())
        );
    }

    // Feedback and lighter-session rule

    #[test]
    fn test_record_feedback_sets_adjustment() {
        let store = MemoryStore::new();
        let agg = UserStateAggregator::new(&store);
        let state = agg
            .record_session_feedback("user-1", SessionFeedback::Comfortable, at(10, 18), day())
            .unwrap();

        assert_eq!(state.last_session_feedback, Some(SessionFeedback::Comfortable));
        assert_eq!(
            state.tomorrow_adjustment,
            Some(TomorrowAdjustment::GentleBuild)
        );
    }

    #[test]
    fn test_lighter_after_too_much_within_48_hours() {
        let store = MemoryStore::new();
        let agg = UserStateAggregator::new(&store);
        agg.record_session_feedback("user-1", SessionFeedback::TooMuch, at(10, 18), day())
            .unwrap();

        assert!(agg.needs_lighter_session("user-1", day(), at(12, 17)).unwrap());
    }

    #[test]
    fn test_lighter_persists_through_standing_adjustment() {
        // Past 48 hours the TOO_MUCH timestamp no longer applies, but the
        // standing LIGHTER adjustment still does.
        let store = MemoryStore::new();
        let agg = UserStateAggregator::new(&store);
        agg.record_session_feedback("user-1", SessionFeedback::TooMuch, at(10, 18), day())
            .unwrap();

        assert!(agg.needs_lighter_session("user-1", day(), at(14, 12)).unwrap());
    }

    #[test]
    fn test_lighter_from_low_energy_checkin() {
        let store = MemoryStore::new();
        seed_checkin(&store, 2, 2, 8);
        let agg = UserStateAggregator::new(&store);

        assert!(agg.needs_lighter_session("user-1", day(), at(10, 12)).unwrap());
    }

    #[test]
    fn test_no_lighter_session_by_default() {
        let store = MemoryStore::new();
        seed_checkin(&store, 7, 2, 8);
        let agg = UserStateAggregator::new(&store);

        assert!(!agg.needs_lighter_session("user-1", day(), at(10, 12)).unwrap());
    }

    #[test]
    fn test_progress_reflection_seen_persists() {
        let store = MemoryStore::new();
        let agg = UserStateAggregator::new(&store);
        agg.mark_progress_reflection_seen("user-1", at(10, 9)).unwrap();

        let state = agg.user_state("user-1", day(), at(10, 12)).unwrap();
        assert_eq!(state.progress_reflection_seen_at, Some(at(10, 9)));
    }
}
