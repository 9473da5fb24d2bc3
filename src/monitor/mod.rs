//! Safety monitoring: audit events, coach alerts, and dispatch.
//!
//! Every concerning signal becomes a [`SafetyEvent`] row keyed by
//! (user, date, event type), so re-running a check never duplicates the
//! audit trail. Events that warrant a human escalate to a [`CoachAlert`],
//! which walks PENDING -> SENT -> ACKNOWLEDGED and never backwards.

pub mod patterns;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::core::{CheckIn, SafetyStatus, TodayState};
use crate::error::{AmbleError, BestEffort, Result};
use crate::notify::{AlertNotice, CheckinDigest, CoachNotifier};
use crate::storage::{CheckinStore, SafetyStore};

/// Unfiltered alert listings stop here; filtered listings return everything.
pub const ALERT_LIST_LIMIT: usize = 50;

// ===== Entities =====

/// What kind of signal a safety event records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventType {
    RedFlag,
    YellowFlag,
    RepeatedLowEnergy,
    RepeatedHighPain,
}

impl EventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::RedFlag => "RED_FLAG",
            EventType::YellowFlag => "YELLOW_FLAG",
            EventType::RepeatedLowEnergy => "REPEATED_LOW_ENERGY",
            EventType::RepeatedHighPain => "REPEATED_HIGH_PAIN",
        }
    }
}

/// Where a safety event came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventSource {
    /// Derived directly from a submitted check-in.
    Checkin,
    /// Produced by a background rule over recent history.
    SystemRule,
}

impl EventSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventSource::Checkin => "CHECKIN",
            EventSource::SystemRule => "SYSTEM_RULE",
        }
    }
}

/// Audit record for one concerning signal on one day.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SafetyEvent {
    /// Assigned by the store on first insert.
    pub id: Option<u64>,
    pub user_id: String,
    pub date: NaiveDate,
    pub event_type: EventType,
    pub source: EventSource,
    /// Rule-specific context, kept free-form for the coach view.
    pub details: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

impl SafetyEvent {
    pub fn new(
        user_id: impl Into<String>,
        date: NaiveDate,
        event_type: EventType,
        source: EventSource,
        details: serde_json::Value,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: None,
            user_id: user_id.into(),
            date,
            event_type,
            source,
            details,
            created_at: now,
        }
    }
}

/// How urgent an alert is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AlertType {
    /// Red flag on today's check-in; the coach should look now.
    RedImmediate,
    /// A multi-day pattern crossed a threshold.
    PatternWarning,
}

impl AlertType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertType::RedImmediate => "RED_IMMEDIATE",
            AlertType::PatternWarning => "PATTERN_WARNING",
        }
    }
}

/// Delivery state of a coach alert. Transitions are forward-only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AlertStatus {
    Pending,
    Sent,
    Acknowledged,
}

impl AlertStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertStatus::Pending => "PENDING",
            AlertStatus::Sent => "SENT",
            AlertStatus::Acknowledged => "ACKNOWLEDGED",
        }
    }

    /// Parse a status name, case-insensitively.
    pub fn parse(s: &str) -> Option<AlertStatus> {
        match s.to_ascii_uppercase().as_str() {
            "PENDING" => Some(AlertStatus::Pending),
            "SENT" => Some(AlertStatus::Sent),
            "ACKNOWLEDGED" => Some(AlertStatus::Acknowledged),
            _ => None,
        }
    }

    /// Position in the forward-only lifecycle.
    fn rank(&self) -> u8 {
        match self {
            AlertStatus::Pending => 0,
            AlertStatus::Sent => 1,
            AlertStatus::Acknowledged => 2,
        }
    }
}

/// A request for coach attention, linked to the event that raised it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CoachAlert {
    /// Assigned by the store on insert.
    pub id: Option<u64>,
    pub user_id: String,
    /// The safety event this alert escalates.
    pub event_id: u64,
    pub alert_type: AlertType,
    pub status: AlertStatus,
    pub created_at: DateTime<Utc>,
}

impl CoachAlert {
    pub fn new(
        user_id: impl Into<String>,
        event_id: u64,
        alert_type: AlertType,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: None,
            user_id: user_id.into(),
            event_id,
            alert_type,
            status: AlertStatus::Pending,
            created_at: now,
        }
    }

    /// Move to `next`, enforcing the forward-only lifecycle.
    ///
    /// Re-applying the current status is a no-op; moving backwards is an
    /// `InvalidState` error.
    pub fn advance(&mut self, next: AlertStatus) -> Result<()> {
        if next.rank() < self.status.rank() {
            return Err(AmbleError::invalid_state(format!(
                "alert cannot move from {} back to {}",
                self.status.as_str(),
                next.as_str()
            )));
        }
        self.status = next;
        Ok(())
    }
}

/// An alert joined with the event behind it, for the coach view.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AlertView {
    pub alert: CoachAlert,
    pub event: SafetyEvent,
}

// ===== Monitor service =====

/// Watches check-ins for signals that need a human and manages the
/// resulting alerts.
pub struct SafetyMonitor<'a, S> {
    store: &'a S,
    notifier: &'a dyn CoachNotifier,
    /// When false, alerts are recorded but never dispatched (they stay
    /// PENDING until a coach picks them up in the alert list).
    dispatch: bool,
}

impl<'a, S: SafetyStore + CheckinStore> SafetyMonitor<'a, S> {
    pub fn new(store: &'a S, notifier: &'a dyn CoachNotifier, dispatch: bool) -> Self {
        Self {
            store,
            notifier,
            dispatch,
        }
    }

    /// Record a red-flag event for today's check-in and raise an immediate
    /// alert for it.
    ///
    /// Idempotent per (user, date): if the event already exists, nothing new
    /// is recorded and `None` is returned. The event write is the primary
    /// write here; alert creation and dispatch are best-effort on top of it.
    pub fn record_immediate(
        &self,
        checkin: &CheckIn,
        state: &TodayState,
        now: DateTime<Utc>,
    ) -> Result<Option<CoachAlert>> {
        if state.safety_status != SafetyStatus::Red && !checkin.has_red_flags() {
            return Ok(None);
        }

        let reason = if state.safety_status == SafetyStatus::Red {
            "Safety status RED".to_string()
        } else {
            format!("Red flags: {}", joined_flag_ids(checkin))
        };
        let details = json!({
            "safety_status": state.safety_status,
            "red_flags": checkin.red_flags,
            "reason": reason,
        });
        let event = SafetyEvent::new(
            &checkin.user_id,
            checkin.date,
            EventType::RedFlag,
            EventSource::Checkin,
            details,
            now,
        );

        let Some(stored) = self.store.insert_event(&event)? else {
            // Already recorded for this day; the first alert stands.
            return Ok(None);
        };

        let alert = self.raise_alert(
            &stored,
            AlertType::RedImmediate,
            reason,
            Some(CheckinDigest::from(checkin)),
            now,
        );
        Ok(alert)
    }

    /// Scan recent history for multi-day warning patterns and raise a
    /// PATTERN_WARNING alert for each new finding.
    ///
    /// Pattern events are dated `today` and keyed by type, so a pattern
    /// that persists across days produces at most one event per day.
    pub fn run_pattern_analysis(
        &self,
        user_id: &str,
        today: NaiveDate,
        now: DateTime<Utc>,
    ) -> Result<Vec<CoachAlert>> {
        let recent = self
            .store
            .recent_checkins(user_id, patterns::thresholds::ANALYSIS_CHECKINS)?;
        let statuses = self.recent_statuses(user_id, &recent)?;
        let findings = patterns::analyze(&recent, &statuses);

        let mut raised = Vec::new();
        for finding in findings {
            let event = SafetyEvent::new(
                user_id,
                today,
                finding.event_type,
                EventSource::SystemRule,
                finding.details,
                now,
            );
            if let Some(stored) = self.store.insert_event(&event)? {
                if let Some(alert) =
                    self.raise_alert(&stored, AlertType::PatternWarning, finding.summary, None, now)
                {
                    raised.push(alert);
                }
            }
        }
        Ok(raised)
    }

    /// List alerts for the coach view, newest first, joined with their
    /// events. Unfiltered listings are capped at [`ALERT_LIST_LIMIT`].
    pub fn alerts(&self, status: Option<AlertStatus>) -> Result<Vec<AlertView>> {
        let mut alerts = self.store.alerts(status)?;
        if status.is_none() {
            alerts.truncate(ALERT_LIST_LIMIT);
        }

        let mut views = Vec::with_capacity(alerts.len());
        for alert in alerts {
            match self.store.event(alert.event_id)? {
                Some(event) => views.push(AlertView { alert, event }),
                None => {
                    tracing::warn!(
                        event_id = alert.event_id,
                        "alert references a missing safety event, skipping"
                    );
                }
            }
        }
        Ok(views)
    }

    /// Mark an alert handled by the coach.
    ///
    /// Acknowledging twice is a no-op; an unknown id is an error.
    pub fn acknowledge(&self, alert_id: u64) -> Result<CoachAlert> {
        self.store.advance_alert(alert_id, AlertStatus::Acknowledged)
    }

    /// Safety status per check-in date, in the same order as `recent`.
    fn recent_statuses(
        &self,
        user_id: &str,
        recent: &[CheckIn],
    ) -> Result<Vec<Option<SafetyStatus>>> {
        let mut statuses = Vec::with_capacity(recent.len());
        for checkin in recent {
            let status = self
                .store
                .today_state(user_id, checkin.date)?
                .map(|s| s.safety_status);
            statuses.push(status);
        }
        Ok(statuses)
    }

    /// Persist a PENDING alert for `event` and try to dispatch it.
    ///
    /// Alert persistence failures are swallowed (the event itself is already
    /// on record); dispatch failures leave the alert PENDING.
    fn raise_alert(
        &self,
        event: &SafetyEvent,
        alert_type: AlertType,
        summary: String,
        checkin: Option<CheckinDigest>,
        now: DateTime<Utc>,
    ) -> Option<CoachAlert> {
        let event_id = event.id?;
        let alert = CoachAlert::new(&event.user_id, event_id, alert_type, now);
        let stored = self
            .store
            .insert_alert(&alert)
            .map(Some)
            .best_effort_default("failed to create coach alert")?;

        tracing::info!(
            user = %event.user_id,
            event_id,
            alert = alert_type.as_str(),
            "coach alert raised"
        );

        if !self.dispatch {
            tracing::debug!(event_id, "alert dispatch disabled, leaving alert pending");
            return Some(stored);
        }

        let notice = AlertNotice {
            user_id: event.user_id.clone(),
            date: event.date,
            created_at: now,
            alert_type,
            event_type: event.event_type,
            summary,
            checkin,
        };
        match self.notifier.notify(&notice) {
            Ok(()) => {
                let id = stored.id?;
                let sent = self
                    .store
                    .advance_alert(id, AlertStatus::Sent)
                    .best_effort_with("failed to mark alert sent", stored);
                Some(sent)
            }
            Err(err) => {
                tracing::warn!(error = %err, "coach alert dispatch failed, alert stays pending");
                Some(stored)
            }
        }
    }
}

fn joined_flag_ids(checkin: &CheckIn) -> String {
    checkin
        .red_flags
        .iter()
        .map(|f| f.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}
