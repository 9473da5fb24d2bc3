//! Multi-day warning patterns over recent check-in history.
//!
//! Detection is pure: callers load the recent window and the matching
//! safety statuses, and get back findings ready to record as events.

use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::core::{CheckIn, SafetyStatus};
use crate::monitor::EventType;

/// Window sizes and trigger levels for pattern detection.
pub mod thresholds {
    /// How many recent check-ins the analysis looks at.
    pub const ANALYSIS_CHECKINS: usize = 7;
    /// Below this many check-ins there is not enough signal to scan.
    pub const MIN_CHECKINS: usize = 3;
    /// Energy/pain rules sample the most recent check-ins only.
    pub const SAMPLE_CHECKINS: usize = 5;
    /// Energy at or below this counts as a low-energy day.
    pub const LOW_ENERGY_MAX: u8 = 3;
    /// Low-energy days in the sample needed to trigger.
    pub const LOW_ENERGY_DAYS: usize = 3;
    /// Pain at or above this counts as a high-pain day.
    pub const HIGH_PAIN_MIN: u8 = 7;
    /// High-pain days in the sample needed to trigger.
    pub const HIGH_PAIN_DAYS: usize = 3;
    /// Consecutive YELLOW days (counting back from the newest) to trigger.
    pub const YELLOW_STREAK_MIN: usize = 4;
}

/// One triggered pattern, ready to become a safety event.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PatternFinding {
    pub event_type: EventType,
    /// One-line description for logs and notices.
    pub summary: String,
    /// Rule-specific context stored on the event.
    pub details: serde_json::Value,
}

/// Scan a recent window for warning patterns.
///
/// `recent` is newest-first; `statuses` holds the safety status for the
/// check-in at the same index (`None` when no state was stored for that
/// day). A missing status breaks a yellow streak.
pub fn analyze(recent: &[CheckIn], statuses: &[Option<SafetyStatus>]) -> Vec<PatternFinding> {
    debug_assert_eq!(recent.len(), statuses.len());
    if recent.len() < thresholds::MIN_CHECKINS {
        return Vec::new();
    }

    let mut findings = Vec::new();
    let sample = &recent[..recent.len().min(thresholds::SAMPLE_CHECKINS)];

    let low_energy_days = sample
        .iter()
        .filter(|c| c.energy <= thresholds::LOW_ENERGY_MAX)
        .count();
    if low_energy_days >= thresholds::LOW_ENERGY_DAYS {
        findings.push(PatternFinding {
            event_type: EventType::RepeatedLowEnergy,
            summary: format!(
                "{} low-energy days in the last {} check-ins",
                low_energy_days,
                sample.len()
            ),
            details: json!({
                "low_energy_days": low_energy_days,
                "period": "last 5 days",
                "energy_values": sample
                    .iter()
                    .map(|c| json!({ "date": c.date, "energy": c.energy }))
                    .collect::<Vec<_>>(),
            }),
        });
    }

    let high_pain_days = sample
        .iter()
        .filter(|c| c.pain >= thresholds::HIGH_PAIN_MIN)
        .count();
    if high_pain_days >= thresholds::HIGH_PAIN_DAYS {
        findings.push(PatternFinding {
            event_type: EventType::RepeatedHighPain,
            summary: format!(
                "{} high-pain days in the last {} check-ins",
                high_pain_days,
                sample.len()
            ),
            details: json!({
                "high_pain_days": high_pain_days,
                "period": "last 5 days",
                "pain_values": sample
                    .iter()
                    .map(|c| json!({ "date": c.date, "pain": c.pain }))
                    .collect::<Vec<_>>(),
            }),
        });
    }

    let streak = statuses
        .iter()
        .take_while(|s| **s == Some(SafetyStatus::Yellow))
        .count();
    if streak >= thresholds::YELLOW_STREAK_MIN {
        let reason = "4+ consecutive YELLOW safety status days";
        findings.push(PatternFinding {
            event_type: EventType::YellowFlag,
            summary: reason.to_string(),
            details: json!({
                "consecutive_yellow_days": streak,
                "reason": reason,
            }),
        });
    }

    findings
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::CheckinInput;
    use chrono::{NaiveDate, Utc};

    fn checkin(day: u32, energy: i64, pain: i64) -> CheckIn {
        let input = CheckinInput {
            energy,
            pain,
            confidence: 5,
            ..CheckinInput::default()
        };
        let date = NaiveDate::from_ymd_opt(2025, 3, day).unwrap();
        CheckIn::from_input("user-1", date, &input, Utc::now()).unwrap()
    }

    fn all_green(n: usize) -> Vec<Option<SafetyStatus>> {
        vec![Some(SafetyStatus::Green); n]
    }

    #[test]
    fn test_too_few_checkins_is_quiet() {
        let recent = vec![checkin(10, 1, 9), checkin(9, 1, 9)];
        let findings = analyze(&recent, &all_green(2));
        assert!(findings.is_empty());
    }

    #[test]
    fn test_repeated_low_energy_triggers_at_three() {
        let recent = vec![
            checkin(10, 2, 1),
            checkin(9, 3, 1),
            checkin(8, 6, 1),
            checkin(7, 3, 1),
        ];
        let findings = analyze(&recent, &all_green(4));
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].event_type, EventType::RepeatedLowEnergy);
        assert_eq!(findings[0].details["low_energy_days"], 3);
        assert_eq!(findings[0].details["period"], "last 5 days");
        assert_eq!(
            findings[0].details["energy_values"]
                .as_array()
                .unwrap()
                .len(),
            4
        );
    }

    #[test]
    fn test_energy_four_does_not_count_as_low() {
        let recent = vec![
            checkin(10, 4, 1),
            checkin(9, 4, 1),
            checkin(8, 4, 1),
            checkin(7, 2, 1),
        ];
        let findings = analyze(&recent, &all_green(4));
        assert!(findings.is_empty());
    }

    #[test]
    fn test_low_energy_outside_sample_ignored() {
        // Six check-ins: the three low-energy days are the three oldest,
        // so only two fall inside the five-checkin sample.
        let recent = vec![
            checkin(12, 8, 1),
            checkin(11, 8, 1),
            checkin(10, 8, 1),
            checkin(9, 2, 1),
            checkin(8, 2, 1),
            checkin(7, 2, 1),
        ];
        let findings = analyze(&recent, &all_green(6));
        assert!(findings.is_empty());
    }

    #[test]
    fn test_repeated_high_pain_triggers_at_three() {
        let recent = vec![
            checkin(10, 6, 8),
            checkin(9, 6, 7),
            checkin(8, 6, 2),
            checkin(7, 6, 9),
        ];
        let findings = analyze(&recent, &all_green(4));
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].event_type, EventType::RepeatedHighPain);
        assert_eq!(findings[0].details["high_pain_days"], 3);
    }

    #[test]
    fn test_yellow_streak_counts_from_newest() {
        let recent: Vec<_> = (0..7).map(|i| checkin(10 - i, 6, 2)).collect();
        let statuses = vec![
            Some(SafetyStatus::Yellow),
            Some(SafetyStatus::Yellow),
            Some(SafetyStatus::Green),
            Some(SafetyStatus::Yellow),
            Some(SafetyStatus::Yellow),
            Some(SafetyStatus::Yellow),
            Some(SafetyStatus::Yellow),
        ];
        // Streak is broken at index 2, so only 2 consecutive.
        let findings = analyze(&recent, &statuses);
        assert!(findings.is_empty());
    }

    #[test]
    fn test_yellow_streak_triggers_at_four() {
        let recent: Vec<_> = (0..5).map(|i| checkin(10 - i, 6, 2)).collect();
        let statuses = vec![Some(SafetyStatus::Yellow); 4]
            .into_iter()
            .chain([Some(SafetyStatus::Green)])
            .collect::<Vec<_>>();
        let findings = analyze(&recent, &statuses);
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].event_type, EventType::YellowFlag);
        assert_eq!(findings[0].details["consecutive_yellow_days"], 4);
        assert_eq!(
            findings[0].details["reason"],
            "4+ consecutive YELLOW safety status days"
        );
    }

    #[test]
    fn test_missing_status_breaks_streak() {
        let recent: Vec<_> = (0..5).map(|i| checkin(10 - i, 6, 2)).collect();
        let statuses = vec![
            Some(SafetyStatus::Yellow),
            Some(SafetyStatus::Yellow),
            None,
            Some(SafetyStatus::Yellow),
            Some(SafetyStatus::Yellow),
        ];
        let findings = analyze(&recent, &statuses);
        assert!(findings.is_empty());
    }

    #[test]
    fn test_multiple_findings_in_order() {
        let recent: Vec<_> = (0..5).map(|i| checkin(10 - i, 2, 8)).collect();
        let statuses = vec![Some(SafetyStatus::Yellow); 5];
        let findings = analyze(&recent, &statuses);
        let types: Vec<_> = findings.iter().map(|f| f.event_type).collect();
        assert_eq!(
            types,
            vec![
                EventType::RepeatedLowEnergy,
                EventType::RepeatedHighPain,
                EventType::YellowFlag
            ]
        );
    }
}
