//! Amble - daily exercise readiness for cancer recovery
//!
//! Amble turns a short daily check-in into a clear movement decision: a
//! safety status with plain-language guidance, a small daily plan, and a
//! recovery phase that adapts over weeks. Concerning patterns raise coach
//! alerts instead of pushing judgement calls onto the patient.

pub mod adaptive;
pub mod cli;
pub mod config;
pub mod core;
pub mod error;
pub mod intake;
pub mod monitor;
pub mod notify;
pub mod plan;
pub mod progression;
pub mod storage;
pub mod util;

pub use adaptive::{UserState, UserStateAggregator};
pub use config::Config;
pub use core::{
    CheckIn, CheckinInput, DailyEvaluation, RecoveryPhase, SafetyStatus, TodayState,
};
pub use error::{AmbleError, BestEffort, Result};
pub use intake::CheckinIntake;
pub use monitor::SafetyMonitor;
pub use notify::{CoachNotifier, LogNotifier, NullNotifier};
pub use plan::TodayPlanBuilder;
pub use progression::PhaseEngine;
pub use storage::{FileStore, MemoryStore};

// CLI commands
pub use cli::{
    AlertsCommand, CheckinCommand, PatternsCommand, PhaseCommand, PlanCommand, SessionCommand,
    TodayCommand,
};
