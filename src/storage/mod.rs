//! Persistence for Amble.
//!
//! Store traits per aggregate family, with a file-backed store for the
//! CLI and an in-memory store for tests. Uniqueness keys ((user, date)
//! for check-ins and plans, (user, date, type) for safety events) are
//! enforced here, not in the services.

pub mod file;
pub mod memory;
pub mod traits;

pub use file::FileStore;
pub use memory::MemoryStore;
pub use traits::{
    AdaptiveStore, CheckinStore, PlanStore, ProgramSource, RecoveryStore, SafetyStore,
};
