//! Coach notification boundary.
//!
//! Alert delivery (email, SMS, whatever the deployment wires up) sits
//! behind [`CoachNotifier`] so the monitoring pipeline never touches a
//! vendor SDK. The built-in implementations cover local use: one logs
//! the notice, one swallows it.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::core::{CheckIn, RedFlag, SideEffect};
use crate::error::Result;
use crate::monitor::{AlertType, EventType};

/// Follow-up guidance included with every red-flag notice.
pub const RED_ALERT_FOLLOW_UP: &str = "User selected a red-flag symptom. The app advised pausing \
     exercise and checking with their healthcare team. Please follow up to ensure they're safe.";

/// Condensed check-in fields attached to immediate alerts.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CheckinDigest {
    pub energy: u8,
    pub pain: u8,
    pub confidence: u8,
    pub red_flags: Vec<RedFlag>,
    pub side_effects: Vec<SideEffect>,
    pub notes: Option<String>,
}

impl From<&CheckIn> for CheckinDigest {
    fn from(checkin: &CheckIn) -> Self {
        Self {
            energy: checkin.energy,
            pain: checkin.pain,
            confidence: checkin.confidence,
            red_flags: checkin.red_flags.clone(),
            side_effects: checkin.side_effects.clone(),
            notes: checkin.notes.clone(),
        }
    }
}

/// Everything a delivery channel needs to compose a coach notification.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AlertNotice {
    pub user_id: String,
    /// Day the triggering event belongs to.
    pub date: NaiveDate,
    pub created_at: DateTime<Utc>,
    pub alert_type: AlertType,
    pub event_type: EventType,
    /// One-line description of why the alert fired.
    pub summary: String,
    /// Present for immediate alerts; pattern alerts have no single check-in.
    pub checkin: Option<CheckinDigest>,
}

/// Delivery channel for coach alerts.
///
/// Implementations must not panic on delivery failure; return an error
/// and let the caller decide whether the alert stays pending.
pub trait CoachNotifier: Send + Sync {
    fn notify(&self, notice: &AlertNotice) -> Result<()>;
}

/// Logs each notice instead of delivering it. Default channel for the CLI.
#[derive(Debug, Clone, Default)]
pub struct LogNotifier {
    coach_email: Option<String>,
}

impl LogNotifier {
    pub fn new(coach_email: Option<String>) -> Self {
        Self { coach_email }
    }
}

impl CoachNotifier for LogNotifier {
    fn notify(&self, notice: &AlertNotice) -> Result<()> {
        let recipient = self.coach_email.as_deref().unwrap_or("(no coach email configured)");
        tracing::info!(
            user = %notice.user_id,
            date = %notice.date,
            alert = notice.alert_type.as_str(),
            event = notice.event_type.as_str(),
            to = recipient,
            "{}",
            notice.summary
        );
        if notice.alert_type == AlertType::RedImmediate {
            tracing::info!(user = %notice.user_id, "{}", RED_ALERT_FOLLOW_UP);
        }
        Ok(())
    }
}

/// Accepts every notice without doing anything. Used when dispatch is on
/// but no channel is configured, and by tests that only care about status
/// transitions.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullNotifier;

impl CoachNotifier for NullNotifier {
    fn notify(&self, _notice: &AlertNotice) -> Result<()> {
        Ok(())
    }
}
