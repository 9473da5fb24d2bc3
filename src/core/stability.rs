//! Multi-day stability scoring.
//!
//! Aggregates up to 14 days of check-ins and their safety statuses into a
//! single 0-100 stability score. The score is the sole numeric input to
//! recovery-phase transitions.
//!
//! Component weights:
//! - Energy: 35
//! - Confidence: 35
//! - Pain relief: 20
//!
//! Safety adjustment: -30 for any RED day, else -15 for 4+ YELLOW days,
//! else -8 for 2+ YELLOW days.

use std::collections::HashMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::core::checkin::CheckIn;
use crate::core::safety::{SafetyStatus, TodayState};
use crate::util::round1;

/// Stability component weights. The three contributions sum to at most 90.
pub mod weights {
    /// Weight of the average energy score.
    pub const ENERGY: f64 = 35.0;
    /// Weight of the average confidence score.
    pub const CONFIDENCE: f64 = 35.0;
    /// Weight of the inverted average pain score.
    pub const PAIN_RELIEF: f64 = 20.0;
}

/// Safety adjustment tiers applied after the components.
pub mod adjustments {
    /// Adjustment when the window contains any RED day.
    pub const RED: f64 = -30.0;
    /// Adjustment when the window contains this many YELLOW days or more.
    pub const YELLOW_HIGH_DAYS: u32 = 4;
    pub const YELLOW_HIGH: f64 = -15.0;
    /// Adjustment at the lower YELLOW tier.
    pub const YELLOW_MODERATE_DAYS: u32 = 2;
    pub const YELLOW_MODERATE: f64 = -8.0;
}

/// Score and component detail for one scoring window.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StabilityResult {
    /// Clamped, rounded 0-100 stability score.
    pub score: u8,
    pub breakdown: StabilityBreakdown,
}

/// How the stability score was assembled. Component and average values are
/// rounded to one decimal for reporting; the score itself is computed from
/// the unrounded values.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StabilityBreakdown {
    pub energy_component: f64,
    pub confidence_component: f64,
    pub pain_component: f64,
    pub safety_adjustment: f64,
    pub red_days: u32,
    pub yellow_days: u32,
    pub green_days: u32,
    pub total_checkins: u32,
    pub avg_energy: f64,
    pub avg_pain: f64,
    pub avg_confidence: f64,
    /// Check-in dates with no recorded safety status. Counted as GREEN
    /// above, surfaced here so callers can see the gap.
    pub missing_status_days: u32,
}

/// Score a window of check-ins and their recorded safety statuses.
///
/// An empty window scores a neutral 50 with midpoint averages. A check-in
/// date missing from `states` counts as GREEN; the breakdown reports how
/// many dates that happened for.
pub fn compute_stability(checkins: &[CheckIn], states: &[TodayState]) -> StabilityResult {
    if checkins.is_empty() {
        return StabilityResult {
            score: 50,
            breakdown: StabilityBreakdown {
                energy_component: 17.5,
                confidence_component: 17.5,
                pain_component: 10.0,
                safety_adjustment: 0.0,
                red_days: 0,
                yellow_days: 0,
                green_days: 0,
                total_checkins: 0,
                avg_energy: 5.0,
                avg_pain: 5.0,
                avg_confidence: 5.0,
                missing_status_days: 0,
            },
        };
    }

    let status_by_date: HashMap<NaiveDate, SafetyStatus> = states
        .iter()
        .map(|state| (state.date, state.safety_status))
        .collect();

    let mut total_energy = 0u32;
    let mut total_pain = 0u32;
    let mut total_confidence = 0u32;
    let mut red_days = 0u32;
    let mut yellow_days = 0u32;
    let mut green_days = 0u32;
    let mut missing_status_days = 0u32;

    for checkin in checkins {
        total_energy += u32::from(checkin.energy);
        total_pain += u32::from(checkin.pain);
        total_confidence += u32::from(checkin.confidence);

        match status_by_date.get(&checkin.date) {
            Some(SafetyStatus::Red) => red_days += 1,
            Some(SafetyStatus::Yellow) => yellow_days += 1,
            Some(SafetyStatus::Green) => green_days += 1,
            None => {
                missing_status_days += 1;
                green_days += 1;
            }
        }
    }

    if missing_status_days > 0 {
        tracing::debug!(
            missing = missing_status_days,
            "check-in dates without a safety status counted as GREEN"
        );
    }

    let count = checkins.len() as f64;
    let avg_energy = f64::from(total_energy) / count;
    let avg_pain = f64::from(total_pain) / count;
    let avg_confidence = f64::from(total_confidence) / count;

    let energy_component = (avg_energy / 10.0) * weights::ENERGY;
    let confidence_component = (avg_confidence / 10.0) * weights::CONFIDENCE;
    let pain_component = ((10.0 - avg_pain) / 10.0) * weights::PAIN_RELIEF;

    let safety_adjustment = if red_days >= 1 {
        adjustments::RED
    } else if yellow_days >= adjustments::YELLOW_HIGH_DAYS {
        adjustments::YELLOW_HIGH
    } else if yellow_days >= adjustments::YELLOW_MODERATE_DAYS {
        adjustments::YELLOW_MODERATE
    } else {
        0.0
    };

    let raw = energy_component + confidence_component + pain_component + safety_adjustment;
    let score = raw.round().clamp(0.0, 100.0) as u8;

    StabilityResult {
        score,
        breakdown: StabilityBreakdown {
            energy_component: round1(energy_component),
            confidence_component: round1(confidence_component),
            pain_component: round1(pain_component),
            safety_adjustment,
            red_days,
            yellow_days,
            green_days,
            total_checkins: checkins.len() as u32,
            avg_energy: round1(avg_energy),
            avg_pain: round1(avg_pain),
            avg_confidence: round1(avg_confidence),
            missing_status_days,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::checkin::CheckinInput;
    use crate::core::safety::{IntensityModifier, SessionLevel};
    use chrono::Utc;

    fn date(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, day).unwrap()
    }

    fn checkin(day: u32, energy: i64, pain: i64, confidence: i64) -> CheckIn {
        let input = CheckinInput {
            energy,
            pain,
            confidence,
            ..CheckinInput::default()
        };
        CheckIn::from_input("user-1", date(day), &input, Utc::now()).unwrap()
    }

    fn state(day: u32, status: SafetyStatus) -> TodayState {
        TodayState {
            user_id: "user-1".to_string(),
            date: date(day),
            safety_status: status,
            readiness_score: 50,
            intensity_modifier: IntensityModifier::Same,
            session_level: SessionLevel::Low,
            explain_why: String::new(),
        }
    }

    fn midline_window(days: u32) -> (Vec<CheckIn>, Vec<TodayState>) {
        let checkins: Vec<CheckIn> = (1..=days).map(|d| checkin(d, 5, 5, 5)).collect();
        let states: Vec<TodayState> = (1..=days)
            .map(|d| state(d, SafetyStatus::Green))
            .collect();
        (checkins, states)
    }

    #[test]
    fn test_empty_window_exact_defaults() {
        let result = compute_stability(&[], &[]);
        assert_eq!(result.score, 50);
        assert_eq!(result.breakdown.energy_component, 17.5);
        assert_eq!(result.breakdown.confidence_component, 17.5);
        assert_eq!(result.breakdown.pain_component, 10.0);
        assert_eq!(result.breakdown.safety_adjustment, 0.0);
        assert_eq!(result.breakdown.total_checkins, 0);
        assert_eq!(result.breakdown.red_days, 0);
        assert_eq!(result.breakdown.yellow_days, 0);
        assert_eq!(result.breakdown.green_days, 0);
        assert_eq!(result.breakdown.avg_energy, 5.0);
        assert_eq!(result.breakdown.avg_pain, 5.0);
        assert_eq!(result.breakdown.avg_confidence, 5.0);
    }

    #[test]
    fn test_single_red_day_drops_score_to_15() {
        // 14 midline days: components 17.5 + 17.5 + 10 = 45, then -30.
        let (checkins, mut states) = midline_window(14);
        states[0] = state(1, SafetyStatus::Red);

        let result = compute_stability(&checkins, &states);
        assert_eq!(result.breakdown.energy_component, 17.5);
        assert_eq!(result.breakdown.confidence_component, 17.5);
        assert_eq!(result.breakdown.pain_component, 10.0);
        assert_eq!(result.breakdown.safety_adjustment, -30.0);
        assert_eq!(result.breakdown.red_days, 1);
        assert_eq!(result.score, 15);
    }

    #[test]
    fn test_all_green_midline_scores_45() {
        let (checkins, states) = midline_window(14);
        let result = compute_stability(&checkins, &states);
        assert_eq!(result.score, 45);
        assert_eq!(result.breakdown.green_days, 14);
        assert_eq!(result.breakdown.safety_adjustment, 0.0);
    }

    #[test]
    fn test_yellow_tiers() {
        // Two yellow days hit the moderate tier.
        let (checkins, mut states) = midline_window(14);
        states[0] = state(1, SafetyStatus::Yellow);
        states[1] = state(2, SafetyStatus::Yellow);
        let result = compute_stability(&checkins, &states);
        assert_eq!(result.breakdown.safety_adjustment, -8.0);
        assert_eq!(result.score, 37);

        // Four yellow days hit the high tier.
        let (checkins, mut states) = midline_window(14);
        for d in 0..4 {
            states[d] = state(d as u32 + 1, SafetyStatus::Yellow);
        }
        let result = compute_stability(&checkins, &states);
        assert_eq!(result.breakdown.safety_adjustment, -15.0);
        assert_eq!(result.score, 30);
    }

    #[test]
    fn test_red_takes_precedence_over_yellow_tiers() {
        let (checkins, mut states) = midline_window(14);
        for d in 0..5 {
            states[d] = state(d as u32 + 1, SafetyStatus::Yellow);
        }
        states[5] = state(6, SafetyStatus::Red);

        let result = compute_stability(&checkins, &states);
        assert_eq!(result.breakdown.safety_adjustment, -30.0);
        assert_eq!(result.breakdown.red_days, 1);
        assert_eq!(result.breakdown.yellow_days, 5);
    }

    #[test]
    fn test_missing_status_counts_as_green_and_is_reported() {
        let (checkins, mut states) = midline_window(14);
        states.truncate(11);

        let result = compute_stability(&checkins, &states);
        assert_eq!(result.breakdown.green_days, 14);
        assert_eq!(result.breakdown.missing_status_days, 3);
        assert_eq!(result.breakdown.safety_adjustment, 0.0);
    }

    #[test]
    fn test_all_red_window_clamps_at_zero() {
        let checkins: Vec<CheckIn> = (1..=14).map(|d| checkin(d, 0, 10, 0)).collect();
        let states: Vec<TodayState> = (1..=14).map(|d| state(d, SafetyStatus::Red)).collect();

        let result = compute_stability(&checkins, &states);
        // Components are all zero, adjustment -30, clamped to 0.
        assert_eq!(result.score, 0);
        assert_eq!(result.breakdown.red_days, 14);
    }

    #[test]
    fn test_best_window_caps_at_90() {
        let checkins: Vec<CheckIn> = (1..=14).map(|d| checkin(d, 10, 0, 10)).collect();
        let states: Vec<TodayState> = (1..=14).map(|d| state(d, SafetyStatus::Green)).collect();

        let result = compute_stability(&checkins, &states);
        assert_eq!(result.score, 90);
    }

    #[test]
    fn test_breakdown_rounds_to_one_decimal() {
        // Averages of 13/3: energy 4.333..., component 15.1666...
        let checkins = vec![checkin(1, 5, 4, 4), checkin(2, 4, 5, 4), checkin(3, 4, 4, 5)];
        let states: Vec<TodayState> = (1..=3).map(|d| state(d, SafetyStatus::Green)).collect();

        let result = compute_stability(&checkins, &states);
        assert_eq!(result.breakdown.avg_energy, 4.3);
        assert_eq!(result.breakdown.energy_component, 15.2);
        assert_eq!(result.breakdown.avg_pain, 4.3);
    }

    #[test]
    fn test_score_uses_unrounded_components() {
        // Raw sum 15.1666*2 + 11.3333 = 41.666... rounds to 42; summing the
        // rounded one-decimal components would give 41.7 -> 42 here, but the
        // implementation must round the raw sum, matching stored history.
        let checkins = vec![checkin(1, 5, 4, 4), checkin(2, 4, 5, 4), checkin(3, 4, 4, 5)];
        let states: Vec<TodayState> = (1..=3).map(|d| state(d, SafetyStatus::Green)).collect();

        let result = compute_stability(&checkins, &states);
        assert_eq!(result.score, 42);
    }

    // Property-based tests

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        fn arb_status() -> impl Strategy<Value = SafetyStatus> {
            prop_oneof![
                Just(SafetyStatus::Green),
                Just(SafetyStatus::Yellow),
                Just(SafetyStatus::Red),
            ]
        }

        proptest! {
            // Property: score stays in 0-100 for any window
            #[test]
            fn prop_score_in_range(
                days in proptest::collection::vec((0i64..=10, 0i64..=10, 0i64..=10, arb_status()), 0..14),
            ) {
                let checkins: Vec<CheckIn> = days
                    .iter()
                    .enumerate()
                    .map(|(i, (e, p, c, _))| checkin(i as u32 + 1, *e, *p, *c))
                    .collect();
                let states: Vec<TodayState> = days
                    .iter()
                    .enumerate()
                    .map(|(i, (_, _, _, s))| state(i as u32 + 1, *s))
                    .collect();

                let result = compute_stability(&checkins, &states);
                prop_assert!(result.score <= 100);
            }

            // Property: day counts partition the window
            #[test]
            fn prop_day_counts_partition(
                days in proptest::collection::vec((0i64..=10, 0i64..=10, 0i64..=10, arb_status()), 1..14),
            ) {
                let checkins: Vec<CheckIn> = days
                    .iter()
                    .enumerate()
                    .map(|(i, (e, p, c, _))| checkin(i as u32 + 1, *e, *p, *c))
                    .collect();
                let states: Vec<TodayState> = days
                    .iter()
                    .enumerate()
                    .map(|(i, (_, _, _, s))| state(i as u32 + 1, *s))
                    .collect();

                let b = compute_stability(&checkins, &states).breakdown;
                prop_assert_eq!(b.red_days + b.yellow_days + b.green_days, b.total_checkins);
            }
        }
    }
}
