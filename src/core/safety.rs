//! Daily safety evaluation.
//!
//! Pure classification of a single check-in into a safety status, a
//! readiness score and the paced session level for the day. Deterministic:
//! the same check-in always produces the same output, and the stored
//! `TodayState` is re-derivable from the check-in alone.
//!
//! Readiness weights:
//! - Energy: 40
//! - Confidence: 40
//! - Pain relief: 20

use serde::{Deserialize, Serialize};

use crate::core::checkin::{CheckIn, SideEffect};

/// Readiness score weights. The three contributions sum to at most 100.
pub mod weights {
    /// Weight of the energy score.
    pub const ENERGY: f64 = 40.0;
    /// Weight of the confidence score.
    pub const CONFIDENCE: f64 = 40.0;
    /// Weight of the inverted pain score.
    pub const PAIN_RELIEF: f64 = 20.0;
}

/// Classification thresholds on the 0-10 scales.
pub mod thresholds {
    /// Energy at or below this forces a YELLOW day.
    pub const LOW_ENERGY: u8 = 3;
    /// Pain at or above this forces a YELLOW day.
    pub const HIGH_PAIN: u8 = 7;
    /// Minimum energy for a MEDIUM session on a GREEN day.
    pub const MEDIUM_ENERGY: u8 = 7;
    /// Maximum pain for a MEDIUM session on a GREEN day.
    pub const MEDIUM_PAIN: u8 = 3;
    /// Minimum confidence for a MEDIUM session on a GREEN day.
    pub const MEDIUM_CONFIDENCE: u8 = 6;
}

/// Safety status of one day's check-in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SafetyStatus {
    Green,
    Yellow,
    Red,
}

impl SafetyStatus {
    /// Stored identifier for this status.
    pub fn as_str(&self) -> &'static str {
        match self {
            SafetyStatus::Green => "GREEN",
            SafetyStatus::Yellow => "YELLOW",
            SafetyStatus::Red => "RED",
        }
    }

    /// Parse a stored identifier.
    pub fn parse(s: &str) -> Option<SafetyStatus> {
        match s {
            "GREEN" => Some(SafetyStatus::Green),
            "YELLOW" => Some(SafetyStatus::Yellow),
            "RED" => Some(SafetyStatus::Red),
            _ => None,
        }
    }
}

/// Intensity change relative to the user's usual plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IntensityModifier {
    Down2,
    Down1,
    Same,
    Up1,
}

impl IntensityModifier {
    /// Stored identifier for this modifier.
    pub fn as_str(&self) -> &'static str {
        match self {
            IntensityModifier::Down2 => "DOWN2",
            IntensityModifier::Down1 => "DOWN1",
            IntensityModifier::Same => "SAME",
            IntensityModifier::Up1 => "UP1",
        }
    }
}

/// Session intensity level.
///
/// Ordered: `VeryLow < Low < Medium`, so the effective level for a day can
/// be taken as the minimum of the daily level and the phase cap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SessionLevel {
    VeryLow,
    Low,
    Medium,
}

impl SessionLevel {
    /// Stored identifier for this level.
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionLevel::VeryLow => "VERY_LOW",
            SessionLevel::Low => "LOW",
            SessionLevel::Medium => "MEDIUM",
        }
    }
}

/// Patient-facing message for the day, shown with the plan.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SafetyMessage {
    pub title: String,
    pub body: String,
}

/// Full output of evaluating one check-in.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DailyEvaluation {
    pub safety_status: SafetyStatus,
    pub readiness_score: u8,
    pub intensity_modifier: IntensityModifier,
    pub session_level: SessionLevel,
    pub explain_why: String,
    pub safety_message: SafetyMessage,
}

/// The persisted per-day state derived from a check-in.
///
/// Never edited independently: recomputing from the matching check-in must
/// reproduce these fields exactly.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TodayState {
    pub user_id: String,
    pub date: chrono::NaiveDate,
    pub safety_status: SafetyStatus,
    pub readiness_score: u8,
    pub intensity_modifier: IntensityModifier,
    pub session_level: SessionLevel,
    pub explain_why: String,
}

impl TodayState {
    /// Build the persisted state for a user and day from an evaluation.
    pub fn from_evaluation(
        user_id: impl Into<String>,
        date: chrono::NaiveDate,
        eval: &DailyEvaluation,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            date,
            safety_status: eval.safety_status,
            readiness_score: eval.readiness_score,
            intensity_modifier: eval.intensity_modifier,
            session_level: eval.session_level,
            explain_why: eval.explain_why.clone(),
        }
    }
}

/// Evaluate a validated check-in into the day's safety decision.
///
/// Decision order: any red flag wins, then yellow conditions (yellow-listed
/// side effect, low energy, high pain), then green. Readiness is computed
/// the same way on every branch.
pub fn evaluate(checkin: &CheckIn) -> DailyEvaluation {
    let readiness_score = readiness_score(checkin.energy, checkin.confidence, checkin.pain);

    if checkin.has_red_flags() {
        return DailyEvaluation {
            safety_status: SafetyStatus::Red,
            readiness_score,
            intensity_modifier: IntensityModifier::Down2,
            session_level: SessionLevel::VeryLow,
            explain_why: explain_why(SafetyStatus::Red, checkin),
            safety_message: safety_message(SafetyStatus::Red),
        };
    }

    let has_yellow_effects = !checkin.yellow_side_effects().is_empty();
    let low_energy = checkin.energy <= thresholds::LOW_ENERGY;
    let high_pain = checkin.pain >= thresholds::HIGH_PAIN;

    if has_yellow_effects || low_energy || high_pain {
        let session_level = if low_energy || high_pain {
            SessionLevel::VeryLow
        } else {
            SessionLevel::Low
        };
        return DailyEvaluation {
            safety_status: SafetyStatus::Yellow,
            readiness_score,
            intensity_modifier: IntensityModifier::Down1,
            session_level,
            explain_why: explain_why(SafetyStatus::Yellow, checkin),
            safety_message: safety_message(SafetyStatus::Yellow),
        };
    }

    let high_readiness = checkin.energy >= thresholds::MEDIUM_ENERGY
        && checkin.pain <= thresholds::MEDIUM_PAIN
        && checkin.confidence >= thresholds::MEDIUM_CONFIDENCE;
    let session_level = if high_readiness {
        SessionLevel::Medium
    } else {
        SessionLevel::Low
    };

    DailyEvaluation {
        safety_status: SafetyStatus::Green,
        readiness_score,
        intensity_modifier: IntensityModifier::Same,
        session_level,
        explain_why: explain_why(SafetyStatus::Green, checkin),
        safety_message: safety_message(SafetyStatus::Green),
    }
}

/// Compute the 0-100 readiness score from the three check-in scores.
pub fn readiness_score(energy: u8, confidence: u8, pain: u8) -> u8 {
    let energy_contrib = (f64::from(energy) / 10.0) * weights::ENERGY;
    let confidence_contrib = (f64::from(confidence) / 10.0) * weights::CONFIDENCE;
    let pain_relief = ((10.0 - f64::from(pain)) / 10.0) * weights::PAIN_RELIEF;
    let raw = energy_contrib + confidence_contrib + pain_relief;
    raw.clamp(0.0, 100.0).round() as u8
}

fn explain_why(status: SafetyStatus, checkin: &CheckIn) -> String {
    match status {
        SafetyStatus::Red => "Please pause exercise for now and check with your medical team. \
             Safety comes first, and we want to make sure you're okay before continuing."
            .to_string(),
        SafetyStatus::Yellow => {
            let mut reasons: Vec<String> = Vec::new();

            if checkin.energy <= thresholds::LOW_ENERGY {
                reasons.push("your energy is lower than usual".to_string());
            }
            if checkin.pain >= thresholds::HIGH_PAIN {
                reasons.push("you're experiencing more discomfort today".to_string());
            }

            let yellow_effects = checkin.yellow_side_effects();
            if !yellow_effects.is_empty() {
                // Cite at most two, as lowercase phrases.
                let formatted: Vec<String> = yellow_effects
                    .iter()
                    .take(2)
                    .map(SideEffect::phrase)
                    .collect();
                reasons.push(format!("you've reported {}", formatted.join(" and ")));
            }

            if reasons.is_empty() {
                reasons.push("some symptoms need monitoring".to_string());
            }

            format!(
                "We're keeping things gentle today because {}. \
                 The goal is to support your body, not push it.",
                reasons.join(" and ")
            )
        }
        SafetyStatus::Green => "Based on how you're feeling today, your body is ready for gentle, \
             steady movement. This helps maintain strength and energy without \
             overloading your system."
            .to_string(),
    }
}

fn safety_message(status: SafetyStatus) -> SafetyMessage {
    match status {
        SafetyStatus::Red => SafetyMessage {
            title: "Please pause exercise today.".to_string(),
            body: "Based on what you've shared, it's best to rest and contact your \
                   medical team. Your safety is our priority."
                .to_string(),
        },
        SafetyStatus::Yellow => SafetyMessage {
            title: "Let's take this gently today.".to_string(),
            body: "Reduce intensity and monitor how you feel. If symptoms continue \
                   or you're unsure, check with your clinician."
                .to_string(),
        },
        SafetyStatus::Green => SafetyMessage {
            title: "You're in a good place to move today.".to_string(),
            body: "Today is about comfortable, steady movement. You don't need to \
                   push — just show up for your body."
                .to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::checkin::{CheckinInput, RedFlag};
    use chrono::{NaiveDate, Utc};

    fn make_checkin(energy: i64, pain: i64, confidence: i64) -> CheckIn {
        let input = CheckinInput {
            energy,
            pain,
            confidence,
            ..CheckinInput::default()
        };
        CheckIn::from_input(
            "user-1",
            NaiveDate::from_ymd_opt(2025, 3, 10).unwrap(),
            &input,
            Utc::now(),
        )
        .unwrap()
    }

    fn with_side_effects(mut checkin: CheckIn, effects: &[SideEffect]) -> CheckIn {
        checkin.side_effects = effects.to_vec();
        checkin
    }

    fn with_red_flags(mut checkin: CheckIn, flags: &[RedFlag]) -> CheckIn {
        checkin.red_flags = flags.to_vec();
        checkin
    }

    // Readiness score tests

    #[test]
    fn test_readiness_good_day() {
        // 8/10*40 + 7/10*40 + (10-2)/10*20 = 32 + 28 + 16
        assert_eq!(readiness_score(8, 7, 2), 76);
    }

    #[test]
    fn test_readiness_bounds() {
        assert_eq!(readiness_score(0, 0, 10), 0);
        assert_eq!(readiness_score(10, 10, 0), 100);
        // Zero scores still leave the pain-relief contribution.
        assert_eq!(readiness_score(0, 0, 0), 20);
    }

    #[test]
    fn test_readiness_rounds_to_nearest() {
        // 3/10*40 + 3/10*40 + 7/10*20 = 12 + 12 + 14 = 38
        assert_eq!(readiness_score(3, 3, 3), 38);
        // 1/10*40 + 2/10*40 + 1/10*20 = 4 + 8 + 2 = 14
        assert_eq!(readiness_score(1, 2, 9), 14);
    }

    // Status classification tests

    #[test]
    fn test_green_medium_day() {
        let eval = evaluate(&make_checkin(8, 2, 7));
        assert_eq!(eval.safety_status, SafetyStatus::Green);
        assert_eq!(eval.session_level, SessionLevel::Medium);
        assert_eq!(eval.intensity_modifier, IntensityModifier::Same);
        assert_eq!(eval.readiness_score, 76);
    }

    #[test]
    fn test_green_low_when_not_high_readiness() {
        // Energy below the MEDIUM gate keeps the session LOW.
        let eval = evaluate(&make_checkin(6, 2, 7));
        assert_eq!(eval.safety_status, SafetyStatus::Green);
        assert_eq!(eval.session_level, SessionLevel::Low);

        // Confidence below the MEDIUM gate too.
        let eval = evaluate(&make_checkin(8, 2, 5));
        assert_eq!(eval.session_level, SessionLevel::Low);
    }

    #[test]
    fn test_green_medium_boundary() {
        let eval = evaluate(&make_checkin(7, 3, 6));
        assert_eq!(eval.safety_status, SafetyStatus::Green);
        assert_eq!(eval.session_level, SessionLevel::Medium);
    }

    #[test]
    fn test_red_flag_forces_red() {
        let checkin = with_red_flags(make_checkin(2, 8, 3), &[RedFlag::ChestPain]);
        let eval = evaluate(&checkin);
        assert_eq!(eval.safety_status, SafetyStatus::Red);
        assert_eq!(eval.session_level, SessionLevel::VeryLow);
        assert_eq!(eval.intensity_modifier, IntensityModifier::Down2);
    }

    #[test]
    fn test_red_flag_wins_over_perfect_scores() {
        let checkin = with_red_flags(make_checkin(10, 0, 10), &[RedFlag::Fever]);
        let eval = evaluate(&checkin);
        assert_eq!(eval.safety_status, SafetyStatus::Red);
        assert_eq!(eval.session_level, SessionLevel::VeryLow);
        // Readiness is still computed from the scores.
        assert_eq!(eval.readiness_score, 100);
    }

    #[test]
    fn test_low_energy_forces_yellow_very_low() {
        let eval = evaluate(&make_checkin(3, 2, 8));
        assert_eq!(eval.safety_status, SafetyStatus::Yellow);
        assert_eq!(eval.session_level, SessionLevel::VeryLow);
        assert_eq!(eval.intensity_modifier, IntensityModifier::Down1);
    }

    #[test]
    fn test_high_pain_forces_yellow_very_low() {
        let eval = evaluate(&make_checkin(8, 7, 8));
        assert_eq!(eval.safety_status, SafetyStatus::Yellow);
        assert_eq!(eval.session_level, SessionLevel::VeryLow);
    }

    #[test]
    fn test_yellow_side_effect_alone_keeps_low() {
        let checkin = with_side_effects(make_checkin(6, 4, 6), &[SideEffect::DizzinessMild]);
        let eval = evaluate(&checkin);
        assert_eq!(eval.safety_status, SafetyStatus::Yellow);
        assert_eq!(eval.session_level, SessionLevel::Low);
        assert_eq!(eval.intensity_modifier, IntensityModifier::Down1);
    }

    #[test]
    fn test_non_yellow_side_effect_stays_green() {
        let checkin = with_side_effects(make_checkin(8, 2, 7), &[SideEffect::Nausea]);
        let eval = evaluate(&checkin);
        assert_eq!(eval.safety_status, SafetyStatus::Green);
    }

    // Explanation tests

    #[test]
    fn test_explain_red() {
        let checkin = with_red_flags(make_checkin(5, 5, 5), &[RedFlag::Fainting]);
        let eval = evaluate(&checkin);
        assert!(eval.explain_why.starts_with("Please pause exercise for now"));
        assert_eq!(eval.safety_message.title, "Please pause exercise today.");
    }

    #[test]
    fn test_explain_yellow_low_energy() {
        let eval = evaluate(&make_checkin(2, 2, 8));
        assert_eq!(
            eval.explain_why,
            "We're keeping things gentle today because your energy is lower than usual. \
             The goal is to support your body, not push it."
        );
    }

    #[test]
    fn test_explain_yellow_energy_and_pain() {
        let eval = evaluate(&make_checkin(2, 8, 8));
        assert!(eval
            .explain_why
            .contains("your energy is lower than usual and you're experiencing more discomfort"));
    }

    #[test]
    fn test_explain_yellow_side_effects_cites_at_most_two() {
        let checkin = with_side_effects(
            make_checkin(6, 4, 6),
            &[
                SideEffect::DizzinessMild,
                SideEffect::NewSwelling,
                SideEffect::NeuropathyFlare,
            ],
        );
        let eval = evaluate(&checkin);
        assert!(eval
            .explain_why
            .contains("you've reported dizziness mild and new swelling"));
        assert!(!eval.explain_why.contains("neuropathy flare"));
    }

    #[test]
    fn test_explain_green() {
        let eval = evaluate(&make_checkin(8, 2, 7));
        assert!(eval.explain_why.starts_with("Based on how you're feeling today"));
        assert_eq!(
            eval.safety_message.title,
            "You're in a good place to move today."
        );
    }

    // Determinism and serialization

    #[test]
    fn test_evaluate_is_deterministic() {
        let checkin = with_side_effects(make_checkin(4, 6, 5), &[SideEffect::NewSwelling]);
        assert_eq!(evaluate(&checkin), evaluate(&checkin));
    }

    #[test]
    fn test_status_serialization() {
        for (status, expected) in [
            (SafetyStatus::Green, "\"GREEN\""),
            (SafetyStatus::Yellow, "\"YELLOW\""),
            (SafetyStatus::Red, "\"RED\""),
        ] {
            assert_eq!(serde_json::to_string(&status).unwrap(), expected);
        }
        assert_eq!(
            serde_json::to_string(&IntensityModifier::Down2).unwrap(),
            "\"DOWN2\""
        );
        assert_eq!(
            serde_json::to_string(&SessionLevel::VeryLow).unwrap(),
            "\"VERY_LOW\""
        );
    }

    #[test]
    fn test_session_level_ordering() {
        assert!(SessionLevel::VeryLow < SessionLevel::Low);
        assert!(SessionLevel::Low < SessionLevel::Medium);
        assert_eq!(
            SessionLevel::Medium.min(SessionLevel::Low),
            SessionLevel::Low
        );
    }

    #[test]
    fn test_today_state_from_evaluation() {
        let checkin = make_checkin(8, 2, 7);
        let eval = evaluate(&checkin);
        let state = TodayState::from_evaluation("user-1", checkin.date, &eval);
        assert_eq!(state.safety_status, eval.safety_status);
        assert_eq!(state.readiness_score, eval.readiness_score);
        assert_eq!(state.explain_why, eval.explain_why);
        assert_eq!(state.date, checkin.date);
    }

    // Property-based tests

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            // Property: readiness is monotone non-decreasing in energy
            #[test]
            fn prop_readiness_monotone_in_energy(
                energy in 0u8..10,
                confidence in 0u8..=10,
                pain in 0u8..=10,
            ) {
                let lower = readiness_score(energy, confidence, pain);
                let higher = readiness_score(energy + 1, confidence, pain);
                prop_assert!(higher >= lower);
            }

            // Property: readiness is monotone non-decreasing in confidence
            #[test]
            fn prop_readiness_monotone_in_confidence(
                energy in 0u8..=10,
                confidence in 0u8..10,
                pain in 0u8..=10,
            ) {
                let lower = readiness_score(energy, confidence, pain);
                let higher = readiness_score(energy, confidence + 1, pain);
                prop_assert!(higher >= lower);
            }

            // Property: readiness is monotone non-increasing in pain
            #[test]
            fn prop_readiness_monotone_in_pain(
                energy in 0u8..=10,
                confidence in 0u8..=10,
                pain in 0u8..10,
            ) {
                let at_pain = readiness_score(energy, confidence, pain);
                let at_more_pain = readiness_score(energy, confidence, pain + 1);
                prop_assert!(at_more_pain <= at_pain);
            }

            // Property: readiness stays within 0-100
            #[test]
            fn prop_readiness_in_range(
                energy in 0u8..=10,
                confidence in 0u8..=10,
                pain in 0u8..=10,
            ) {
                let score = readiness_score(energy, confidence, pain);
                prop_assert!(score <= 100);
            }

            // Property: any red flag forces RED regardless of scores
            #[test]
            fn prop_red_flag_forces_red(
                energy in 0i64..=10,
                pain in 0i64..=10,
                confidence in 0i64..=10,
                flag_idx in 0usize..6,
            ) {
                let mut checkin = make_checkin(energy, pain, confidence);
                checkin.red_flags = vec![crate::core::checkin::RED_FLAGS[flag_idx]];
                let eval = evaluate(&checkin);
                prop_assert_eq!(eval.safety_status, SafetyStatus::Red);
                prop_assert_eq!(eval.session_level, SessionLevel::VeryLow);
                prop_assert_eq!(eval.intensity_modifier, IntensityModifier::Down2);
            }
        }
    }
}
