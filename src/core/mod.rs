//! Core types and pure decision logic for Amble.
//!
//! This module contains the check-in entities and the pure evaluation
//! functions: daily safety classification, multi-day stability scoring,
//! the recovery phase state machine, and explanation rendering. Nothing
//! here touches storage or the clock.

pub mod checkin;
pub mod explain;
pub mod phase;
pub mod safety;
pub mod stability;

pub use checkin::{CheckIn, CheckinInput, RedFlag, SideEffect, RED_FLAGS, SIDE_EFFECTS};
pub use explain::{ModeDecision, SessionMode};
pub use phase::{
    effective_session_level, session_caps, transition, PhaseDecision, PhaseHistoryEntry,
    RecoveryPhase, RecoveryStatus, SessionCaps, DEFAULT_PHASE_REASON,
};
pub use safety::{
    evaluate, readiness_score, DailyEvaluation, IntensityModifier, SafetyMessage, SafetyStatus,
    SessionLevel, TodayState,
};
pub use stability::{compute_stability, StabilityBreakdown, StabilityResult};
