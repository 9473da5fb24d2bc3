//! CLI commands for Amble.
//!
//! Commands are organized by who runs them:
//! - **Patient commands**: checkin, today, plan, session (the daily loop)
//! - **Coach commands**: alerts (triage and acknowledgement)
//! - **System commands**: patterns, phase (scheduled evaluation runs)
//!
//! Every command follows the same shape: an `Options` struct from the
//! argument parser, a `run` method returning an `Output` struct, and a
//! `format_output` that renders it as JSON or human-readable text.

// Patient commands
pub mod checkin;
pub mod plan;
pub mod session;
pub mod today;

// Coach commands
pub mod alerts;

// System commands
pub mod patterns;
pub mod phase;

pub use alerts::AlertsCommand;
pub use checkin::CheckinCommand;
pub use patterns::PatternsCommand;
pub use phase::PhaseCommand;
pub use plan::PlanCommand;
pub use session::SessionCommand;
pub use today::TodayCommand;
