//! Recovery phase state machine.
//!
//! The recovery phase is a slow-moving trust level for exercise capacity:
//! PROTECT (initial), REBUILD, EXPAND. Transitions are driven by the 14-day
//! stability score with hysteresis: the score needed to move up is strictly
//! higher than the score that moves back down, so a user hovering near a
//! boundary does not flip phase every evaluation.

use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::core::safety::SessionLevel;

/// Transition thresholds on the 0-100 stability score and day counts.
///
/// Up-thresholds strictly exceed the adjacent down-thresholds (62 vs 55,
/// 74 vs 65). Keep it that way.
pub mod thresholds {
    /// Any RED day in the window forces PROTECT from any phase.
    pub const RED_OVERRIDE_DAYS: u32 = 1;
    /// This many YELLOW days forces PROTECT from any phase.
    pub const YELLOW_OVERRIDE_DAYS: u32 = 6;
    /// Minimum check-ins in the window before the phase may move.
    pub const MIN_CHECKINS: u32 = 10;

    /// Score needed to move PROTECT -> REBUILD.
    pub const PROTECT_UP_SCORE: u8 = 62;
    /// Maximum yellow days allowed for PROTECT -> REBUILD.
    pub const PROTECT_UP_MAX_YELLOW: u32 = 2;

    /// Score at or below which REBUILD falls back to PROTECT.
    pub const REBUILD_DOWN_SCORE: u8 = 55;
    /// Yellow days at or above which REBUILD falls back to PROTECT.
    pub const REBUILD_DOWN_YELLOW: u32 = 4;
    /// Score needed to move REBUILD -> EXPAND.
    pub const REBUILD_UP_SCORE: u8 = 74;
    /// Maximum yellow days allowed for REBUILD -> EXPAND.
    pub const REBUILD_UP_MAX_YELLOW: u32 = 1;

    /// Score at or below which EXPAND falls back to REBUILD.
    pub const EXPAND_DOWN_SCORE: u8 = 65;
    /// Yellow days at or above which EXPAND falls back to REBUILD.
    pub const EXPAND_DOWN_YELLOW: u32 = 3;
}

/// Reason reported before any evaluation has been stored for a user.
pub const DEFAULT_PHASE_REASON: &str = "Default starting phase - no evaluation yet.";

/// Recovery phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RecoveryPhase {
    /// Conservative starting phase: protect capacity, keep sessions small.
    #[default]
    Protect,
    /// Steady rebuilding of capacity.
    Rebuild,
    /// Trusted capacity, fuller sessions.
    Expand,
}

impl RecoveryPhase {
    /// Stored identifier for this phase.
    pub fn as_str(&self) -> &'static str {
        match self {
            RecoveryPhase::Protect => "PROTECT",
            RecoveryPhase::Rebuild => "REBUILD",
            RecoveryPhase::Expand => "EXPAND",
        }
    }

    /// Parse a stored identifier.
    pub fn parse(s: &str) -> Option<RecoveryPhase> {
        match s {
            "PROTECT" => Some(RecoveryPhase::Protect),
            "REBUILD" => Some(RecoveryPhase::Rebuild),
            "EXPAND" => Some(RecoveryPhase::Expand),
            _ => None,
        }
    }
}

impl fmt::Display for RecoveryPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of one transition evaluation.
#[derive(Debug, Clone, PartialEq)]
pub struct PhaseDecision {
    pub phase: RecoveryPhase,
    pub reason: String,
}

/// Session levels a phase allows, and the cap applied to daily levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionCaps {
    pub allowed: &'static [SessionLevel],
    pub max: SessionLevel,
}

/// Per-user recovery status row, upserted on every evaluation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RecoveryStatus {
    pub user_id: String,
    pub recovery_phase: RecoveryPhase,
    pub stability_score: u8,
    pub phase_reason: String,
    /// When the phase last actually changed. Holds do not bump this, so
    /// "seen" comparisons track real transitions.
    pub phase_updated_at: DateTime<Utc>,
    /// When the row was last written, changed or not.
    pub updated_at: DateTime<Utc>,
}

/// Append-only record of an actual phase change.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PhaseHistoryEntry {
    pub user_id: String,
    pub date: NaiveDate,
    pub from_phase: RecoveryPhase,
    pub to_phase: RecoveryPhase,
    pub stability_score: u8,
    pub reason: String,
}

// ===== Transitions =====

/// Decide the next phase from the current phase and window statistics.
///
/// Global overrides run first: any RED day or 6+ YELLOW days force PROTECT
/// from any phase. With fewer than 10 check-ins the phase holds. Otherwise
/// the per-phase hysteresis rules apply.
pub fn transition(
    current: RecoveryPhase,
    score: u8,
    red_days: u32,
    yellow_days: u32,
    total_checkins: u32,
) -> PhaseDecision {
    if red_days >= thresholds::RED_OVERRIDE_DAYS {
        return PhaseDecision {
            phase: RecoveryPhase::Protect,
            reason: "RED flag detected in the past 14 days - safety first.".to_string(),
        };
    }

    if yellow_days >= thresholds::YELLOW_OVERRIDE_DAYS {
        return PhaseDecision {
            phase: RecoveryPhase::Protect,
            reason: "High frequency of YELLOW days (6+) - focusing on stability.".to_string(),
        };
    }

    if total_checkins < thresholds::MIN_CHECKINS {
        return PhaseDecision {
            phase: current,
            reason: format!(
                "Maintaining {} phase - need at least 10 check-ins for reliable evaluation.",
                current
            ),
        };
    }

    match current {
        RecoveryPhase::Protect => {
            if score >= thresholds::PROTECT_UP_SCORE
                && red_days == 0
                && yellow_days <= thresholds::PROTECT_UP_MAX_YELLOW
            {
                return PhaseDecision {
                    phase: RecoveryPhase::Rebuild,
                    reason: format!(
                        "Moved to REBUILD: stability score {} with consistent \
                         energy/confidence and minimal yellow days.",
                        score
                    ),
                };
            }
            PhaseDecision {
                phase: RecoveryPhase::Protect,
                reason: format!(
                    "Maintaining PROTECT: stability score {} - continue building foundation.",
                    score
                ),
            }
        }
        RecoveryPhase::Rebuild => {
            if score <= thresholds::REBUILD_DOWN_SCORE
                || yellow_days >= thresholds::REBUILD_DOWN_YELLOW
            {
                let cause = if score <= thresholds::REBUILD_DOWN_SCORE {
                    format!("stability score dropped to {}", score)
                } else {
                    "repeated yellow days".to_string()
                };
                return PhaseDecision {
                    phase: RecoveryPhase::Protect,
                    reason: format!("Moved to PROTECT: {} - refocusing on stability.", cause),
                };
            }
            if score >= thresholds::REBUILD_UP_SCORE
                && red_days == 0
                && yellow_days <= thresholds::REBUILD_UP_MAX_YELLOW
            {
                return PhaseDecision {
                    phase: RecoveryPhase::Expand,
                    reason: format!(
                        "Moved to EXPAND: stability score {} with excellent consistency.",
                        score
                    ),
                };
            }
            PhaseDecision {
                phase: RecoveryPhase::Rebuild,
                reason: format!(
                    "Maintaining REBUILD: stability score {} - continue building capacity.",
                    score
                ),
            }
        }
        RecoveryPhase::Expand => {
            // Unreachable after the global override, kept as a backstop.
            if red_days >= thresholds::RED_OVERRIDE_DAYS {
                return PhaseDecision {
                    phase: RecoveryPhase::Protect,
                    reason: "Moved to PROTECT: RED flag detected - prioritizing safety."
                        .to_string(),
                };
            }
            if score <= thresholds::EXPAND_DOWN_SCORE
                || yellow_days >= thresholds::EXPAND_DOWN_YELLOW
            {
                let cause = if score <= thresholds::EXPAND_DOWN_SCORE {
                    format!("stability score {}", score)
                } else {
                    "increased yellow days".to_string()
                };
                return PhaseDecision {
                    phase: RecoveryPhase::Rebuild,
                    reason: format!("Moved to REBUILD: {} - consolidating gains.", cause),
                };
            }
            PhaseDecision {
                phase: RecoveryPhase::Expand,
                reason: format!(
                    "Maintaining EXPAND: stability score {} - continuing progression.",
                    score
                ),
            }
        }
    }
}

// ===== Session caps =====

/// Session levels each phase allows.
pub fn session_caps(phase: RecoveryPhase) -> SessionCaps {
    match phase {
        RecoveryPhase::Protect => SessionCaps {
            allowed: &[SessionLevel::VeryLow, SessionLevel::Low],
            max: SessionLevel::Low,
        },
        RecoveryPhase::Rebuild => SessionCaps {
            allowed: &[SessionLevel::VeryLow, SessionLevel::Low, SessionLevel::Medium],
            max: SessionLevel::Medium,
        },
        RecoveryPhase::Expand => SessionCaps {
            allowed: &[SessionLevel::Low, SessionLevel::Medium],
            max: SessionLevel::Medium,
        },
    }
}

/// Cap a day's session level by the phase.
///
/// The daily level is clamped to the phase maximum, then raised to the
/// lowest level the phase allows (EXPAND never goes below LOW).
pub fn effective_session_level(phase: RecoveryPhase, daily: SessionLevel) -> SessionLevel {
    let caps = session_caps(phase);
    let floor = *caps.allowed.first().unwrap_or(&SessionLevel::VeryLow);
    daily.min(caps.max).max(floor)
}

#[cfg(test)]
mod tests {
    use super::*;

    // Global override tests

    #[test]
    fn test_red_day_forces_protect_from_any_phase() {
        for phase in [
            RecoveryPhase::Protect,
            RecoveryPhase::Rebuild,
            RecoveryPhase::Expand,
        ] {
            let decision = transition(phase, 90, 1, 0, 14);
            assert_eq!(decision.phase, RecoveryPhase::Protect);
            assert_eq!(
                decision.reason,
                "RED flag detected in the past 14 days - safety first."
            );
        }
    }

    #[test]
    fn test_six_yellow_days_force_protect() {
        let decision = transition(RecoveryPhase::Expand, 90, 0, 6, 14);
        assert_eq!(decision.phase, RecoveryPhase::Protect);
        assert!(decision.reason.contains("High frequency of YELLOW days"));
    }

    #[test]
    fn test_insufficient_checkins_holds_phase() {
        for phase in [
            RecoveryPhase::Protect,
            RecoveryPhase::Rebuild,
            RecoveryPhase::Expand,
        ] {
            let decision = transition(phase, 90, 0, 0, 9);
            assert_eq!(decision.phase, phase);
            assert!(decision.reason.contains(phase.as_str()));
            assert!(decision.reason.contains("at least 10 check-ins"));
        }
    }

    // PROTECT transitions

    #[test]
    fn test_protect_moves_up_at_62() {
        let decision = transition(RecoveryPhase::Protect, 62, 0, 2, 10);
        assert_eq!(decision.phase, RecoveryPhase::Rebuild);
        assert!(decision.reason.contains("stability score 62"));
    }

    #[test]
    fn test_protect_promotion_scenario() {
        let decision = transition(RecoveryPhase::Protect, 65, 0, 1, 12);
        assert_eq!(decision.phase, RecoveryPhase::Rebuild);
    }

    #[test]
    fn test_protect_holds_below_62() {
        let decision = transition(RecoveryPhase::Protect, 61, 0, 0, 14);
        assert_eq!(decision.phase, RecoveryPhase::Protect);
        assert!(decision.reason.contains("continue building foundation"));
    }

    #[test]
    fn test_protect_blocked_by_yellow_days() {
        let decision = transition(RecoveryPhase::Protect, 80, 0, 3, 14);
        assert_eq!(decision.phase, RecoveryPhase::Protect);
    }

    // REBUILD transitions

    #[test]
    fn test_rebuild_drops_at_55_regardless_of_yellow() {
        for yellow in [0, 1, 3] {
            let decision = transition(RecoveryPhase::Rebuild, 50, 0, yellow, 14);
            assert_eq!(decision.phase, RecoveryPhase::Protect);
            assert!(decision.reason.contains("stability score dropped to 50"));
        }
    }

    #[test]
    fn test_rebuild_drops_on_yellow_days_with_good_score() {
        let decision = transition(RecoveryPhase::Rebuild, 70, 0, 4, 14);
        assert_eq!(decision.phase, RecoveryPhase::Protect);
        assert!(decision.reason.contains("repeated yellow days"));
    }

    #[test]
    fn test_rebuild_moves_up_at_74() {
        let decision = transition(RecoveryPhase::Rebuild, 74, 0, 1, 14);
        assert_eq!(decision.phase, RecoveryPhase::Expand);
        assert!(decision.reason.contains("excellent consistency"));
    }

    #[test]
    fn test_rebuild_blocked_from_expand_by_yellow() {
        let decision = transition(RecoveryPhase::Rebuild, 80, 0, 2, 14);
        assert_eq!(decision.phase, RecoveryPhase::Rebuild);
        assert!(decision.reason.contains("continue building capacity"));
    }

    #[test]
    fn test_rebuild_holds_in_band() {
        // Between the down (55) and up (74) thresholds.
        let decision = transition(RecoveryPhase::Rebuild, 60, 0, 0, 14);
        assert_eq!(decision.phase, RecoveryPhase::Rebuild);
    }

    // EXPAND transitions

    #[test]
    fn test_expand_drops_at_65() {
        let decision = transition(RecoveryPhase::Expand, 65, 0, 0, 14);
        assert_eq!(decision.phase, RecoveryPhase::Rebuild);
        assert!(decision.reason.contains("stability score 65"));
    }

    #[test]
    fn test_expand_drops_on_yellow_days() {
        let decision = transition(RecoveryPhase::Expand, 80, 0, 3, 14);
        assert_eq!(decision.phase, RecoveryPhase::Rebuild);
        assert!(decision.reason.contains("increased yellow days"));
    }

    #[test]
    fn test_expand_holds_above_65() {
        let decision = transition(RecoveryPhase::Expand, 66, 0, 2, 14);
        assert_eq!(decision.phase, RecoveryPhase::Expand);
        assert!(decision.reason.contains("continuing progression"));
    }

    // Hysteresis

    #[test]
    fn test_hysteresis_no_flip_near_62() {
        // Up at 62, then oscillating just below does not drop back.
        let up = transition(RecoveryPhase::Protect, 62, 0, 0, 14);
        assert_eq!(up.phase, RecoveryPhase::Rebuild);

        let hold = transition(up.phase, 58, 0, 0, 14);
        assert_eq!(hold.phase, RecoveryPhase::Rebuild);

        let hold_again = transition(hold.phase, 61, 0, 0, 14);
        assert_eq!(hold_again.phase, RecoveryPhase::Rebuild);

        // Only at the lower threshold does it fall back.
        let down = transition(hold_again.phase, 55, 0, 0, 14);
        assert_eq!(down.phase, RecoveryPhase::Protect);
    }

    #[test]
    fn test_hysteresis_no_flip_near_74() {
        let up = transition(RecoveryPhase::Rebuild, 74, 0, 0, 14);
        assert_eq!(up.phase, RecoveryPhase::Expand);

        let hold = transition(up.phase, 70, 0, 0, 14);
        assert_eq!(hold.phase, RecoveryPhase::Expand);

        let down = transition(hold.phase, 65, 0, 0, 14);
        assert_eq!(down.phase, RecoveryPhase::Rebuild);
    }

    // Session caps

    #[test]
    fn test_session_caps_per_phase() {
        let protect = session_caps(RecoveryPhase::Protect);
        assert_eq!(protect.max, SessionLevel::Low);
        assert_eq!(
            protect.allowed,
            &[SessionLevel::VeryLow, SessionLevel::Low]
        );

        let rebuild = session_caps(RecoveryPhase::Rebuild);
        assert_eq!(rebuild.max, SessionLevel::Medium);
        assert_eq!(rebuild.allowed.len(), 3);

        let expand = session_caps(RecoveryPhase::Expand);
        assert_eq!(expand.max, SessionLevel::Medium);
        assert!(!expand.allowed.contains(&SessionLevel::VeryLow));
    }

    #[test]
    fn test_effective_level_caps_daily() {
        assert_eq!(
            effective_session_level(RecoveryPhase::Protect, SessionLevel::Medium),
            SessionLevel::Low
        );
        assert_eq!(
            effective_session_level(RecoveryPhase::Rebuild, SessionLevel::Medium),
            SessionLevel::Medium
        );
        assert_eq!(
            effective_session_level(RecoveryPhase::Protect, SessionLevel::VeryLow),
            SessionLevel::VeryLow
        );
    }

    #[test]
    fn test_effective_level_expand_floors_at_low() {
        assert_eq!(
            effective_session_level(RecoveryPhase::Expand, SessionLevel::VeryLow),
            SessionLevel::Low
        );
    }

    #[test]
    fn test_phase_serialization() {
        assert_eq!(
            serde_json::to_string(&RecoveryPhase::Protect).unwrap(),
            "\"PROTECT\""
        );
        let parsed: RecoveryPhase = serde_json::from_str("\"EXPAND\"").unwrap();
        assert_eq!(parsed, RecoveryPhase::Expand);
        assert_eq!(RecoveryPhase::parse("REBUILD"), Some(RecoveryPhase::Rebuild));
        assert_eq!(RecoveryPhase::parse("SPRINT"), None);
    }

    // Property-based tests

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        fn arb_phase() -> impl Strategy<Value = RecoveryPhase> {
            prop_oneof![
                Just(RecoveryPhase::Protect),
                Just(RecoveryPhase::Rebuild),
                Just(RecoveryPhase::Expand),
            ]
        }

        proptest! {
            // Property: without overrides, fewer than 10 check-ins never moves the phase
            #[test]
            fn prop_small_window_holds_phase(
                phase in arb_phase(),
                score in 0u8..=100,
                yellow in 0u32..6,
                total in 0u32..10,
            ) {
                let decision = transition(phase, score, 0, yellow, total);
                prop_assert_eq!(decision.phase, phase);
            }

            // Property: scores in the 56-61 band move nobody (hysteresis gap)
            #[test]
            fn prop_hysteresis_band_is_stable(
                score in 56u8..=61,
                total in 10u32..=14,
            ) {
                let protect = transition(RecoveryPhase::Protect, score, 0, 0, total);
                prop_assert_eq!(protect.phase, RecoveryPhase::Protect);

                let rebuild = transition(RecoveryPhase::Rebuild, score, 0, 0, total);
                prop_assert_eq!(rebuild.phase, RecoveryPhase::Rebuild);
            }

            // Property: any RED day lands in PROTECT no matter what else
            #[test]
            fn prop_red_day_always_protect(
                phase in arb_phase(),
                score in 0u8..=100,
                red in 1u32..=14,
                yellow in 0u32..=14,
                total in 0u32..=14,
            ) {
                let decision = transition(phase, score, red, yellow, total);
                prop_assert_eq!(decision.phase, RecoveryPhase::Protect);
            }

            // Property: the effective level never exceeds the phase cap
            #[test]
            fn prop_effective_level_within_caps(phase in arb_phase()) {
                for daily in [SessionLevel::VeryLow, SessionLevel::Low, SessionLevel::Medium] {
                    let effective = effective_session_level(phase, daily);
                    let caps = session_caps(phase);
                    prop_assert!(caps.allowed.contains(&effective));
                    prop_assert!(effective <= caps.max);
                }
            }
        }
    }
}
