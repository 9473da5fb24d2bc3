//! In-memory store for testing.
//!
//! Thread-safe implementation of every store trait over `RwLock<HashMap>`
//! maps. Data is lost when the store is dropped. Service tests build on
//! this backend; the file backend is for the CLI.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;

use chrono::NaiveDate;

use crate::adaptive::UserAdaptiveState;
use crate::core::{CheckIn, PhaseHistoryEntry, RecoveryStatus, TodayState};
use crate::error::{AmbleError, Result};
use crate::monitor::{AlertStatus, CoachAlert, SafetyEvent};
use crate::plan::{Enrollment, PathwayAssignment, TodayPlan};
use crate::storage::{
    AdaptiveStore, CheckinStore, PlanStore, ProgramSource, RecoveryStore, SafetyStore,
};

/// In-memory backend implementing all store traits.
#[derive(Debug, Default)]
pub struct MemoryStore {
    checkins: RwLock<HashMap<(String, NaiveDate), CheckIn>>,
    states: RwLock<HashMap<(String, NaiveDate), TodayState>>,
    events: RwLock<Vec<SafetyEvent>>,
    alerts: RwLock<Vec<CoachAlert>>,
    statuses: RwLock<HashMap<String, RecoveryStatus>>,
    history: RwLock<HashMap<String, Vec<PhaseHistoryEntry>>>,
    adaptive: RwLock<HashMap<String, UserAdaptiveState>>,
    plans: RwLock<HashMap<(String, NaiveDate), TodayPlan>>,
    enrollments: RwLock<HashMap<String, Vec<Enrollment>>>,
    pathways: RwLock<HashMap<String, PathwayAssignment>>,
    next_event_id: AtomicU64,
    next_alert_id: AtomicU64,
}

impl MemoryStore {
    /// Create a new empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a user's program enrollments. Test setup only; the catalog is
    /// read-only through the store traits.
    pub fn set_enrollments(&self, user_id: &str, enrollments: Vec<Enrollment>) {
        self.enrollments
            .write()
            .unwrap()
            .insert(user_id.to_string(), enrollments);
    }

    /// Seed a user's pathway assignment. Test setup only.
    pub fn set_pathway(&self, pathway: PathwayAssignment) {
        self.pathways
            .write()
            .unwrap()
            .insert(pathway.user_id.clone(), pathway);
    }
}

impl CheckinStore for MemoryStore {
    fn insert_checkin(&self, checkin: &CheckIn) -> Result<(CheckIn, bool)> {
        let mut checkins = self.checkins.write().unwrap();
        match checkins.entry((checkin.user_id.clone(), checkin.date)) {
            Entry::Occupied(existing) => Ok((existing.get().clone(), false)),
            Entry::Vacant(slot) => {
                slot.insert(checkin.clone());
                Ok((checkin.clone(), true))
            }
        }
    }

    fn checkin(&self, user_id: &str, date: NaiveDate) -> Result<Option<CheckIn>> {
        let checkins = self.checkins.read().unwrap();
        Ok(checkins.get(&(user_id.to_string(), date)).cloned())
    }

    fn recent_checkins(&self, user_id: &str, limit: usize) -> Result<Vec<CheckIn>> {
        let checkins = self.checkins.read().unwrap();
        let mut result: Vec<CheckIn> = checkins
            .values()
            .filter(|c| c.user_id == user_id)
            .cloned()
            .collect();
        result.sort_by(|a, b| b.date.cmp(&a.date));
        result.truncate(limit);
        Ok(result)
    }

    fn checkins_since(&self, user_id: &str, since: NaiveDate) -> Result<Vec<CheckIn>> {
        let checkins = self.checkins.read().unwrap();
        let mut result: Vec<CheckIn> = checkins
            .values()
            .filter(|c| c.user_id == user_id && c.date >= since)
            .cloned()
            .collect();
        result.sort_by(|a, b| b.date.cmp(&a.date));
        Ok(result)
    }

    fn put_today_state(&self, state: &TodayState) -> Result<()> {
        let mut states = self.states.write().unwrap();
        states.insert((state.user_id.clone(), state.date), state.clone());
        Ok(())
    }

    fn today_state(&self, user_id: &str, date: NaiveDate) -> Result<Option<TodayState>> {
        let states = self.states.read().unwrap();
        Ok(states.get(&(user_id.to_string(), date)).cloned())
    }

    fn today_states_since(&self, user_id: &str, since: NaiveDate) -> Result<Vec<TodayState>> {
        let states = self.states.read().unwrap();
        let mut result: Vec<TodayState> = states
            .values()
            .filter(|s| s.user_id == user_id && s.date >= since)
            .cloned()
            .collect();
        result.sort_by(|a, b| b.date.cmp(&a.date));
        Ok(result)
    }
}

impl SafetyStore for MemoryStore {
    fn insert_event(&self, event: &SafetyEvent) -> Result<Option<SafetyEvent>> {
        let mut events = self.events.write().unwrap();
        let taken = events.iter().any(|e| {
            e.user_id == event.user_id && e.date == event.date && e.event_type == event.event_type
        });
        if taken {
            return Ok(None);
        }
        let mut stored = event.clone();
        stored.id = Some(self.next_event_id.fetch_add(1, Ordering::Relaxed) + 1);
        events.push(stored.clone());
        Ok(Some(stored))
    }

    fn event(&self, event_id: u64) -> Result<Option<SafetyEvent>> {
        let events = self.events.read().unwrap();
        Ok(events.iter().find(|e| e.id == Some(event_id)).cloned())
    }

    fn events(&self, user_id: &str) -> Result<Vec<SafetyEvent>> {
        let events = self.events.read().unwrap();
        let mut result: Vec<SafetyEvent> = events
            .iter()
            .filter(|e| e.user_id == user_id)
            .cloned()
            .collect();
        result.sort_by(|a, b| b.date.cmp(&a.date).then(b.id.cmp(&a.id)));
        Ok(result)
    }

    fn insert_alert(&self, alert: &CoachAlert) -> Result<CoachAlert> {
        let mut alerts = self.alerts.write().unwrap();
        let mut stored = alert.clone();
        stored.id = Some(self.next_alert_id.fetch_add(1, Ordering::Relaxed) + 1);
        alerts.push(stored.clone());
        Ok(stored)
    }

    fn alerts(&self, status: Option<AlertStatus>) -> Result<Vec<CoachAlert>> {
        let alerts = self.alerts.read().unwrap();
        let mut result: Vec<CoachAlert> = alerts
            .iter()
            .filter(|a| status.map_or(true, |s| a.status == s))
            .cloned()
            .collect();
        result.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(result)
    }

    fn advance_alert(&self, alert_id: u64, status: AlertStatus) -> Result<CoachAlert> {
        let mut alerts = self.alerts.write().unwrap();
        let alert = alerts
            .iter_mut()
            .find(|a| a.id == Some(alert_id))
            .ok_or_else(|| AmbleError::alert_not_found(alert_id))?;
        alert.advance(status)?;
        Ok(alert.clone())
    }
}

impl RecoveryStore for MemoryStore {
    fn upsert_status(&self, status: &RecoveryStatus) -> Result<()> {
        let mut statuses = self.statuses.write().unwrap();
        statuses.insert(status.user_id.clone(), status.clone());
        Ok(())
    }

    fn status(&self, user_id: &str) -> Result<Option<RecoveryStatus>> {
        let statuses = self.statuses.read().unwrap();
        Ok(statuses.get(user_id).cloned())
    }

    fn append_history(&self, entry: &PhaseHistoryEntry) -> Result<()> {
        let mut history = self.history.write().unwrap();
        history
            .entry(entry.user_id.clone())
            .or_default()
            .push(entry.clone());
        Ok(())
    }

    fn history(&self, user_id: &str) -> Result<Vec<PhaseHistoryEntry>> {
        let history = self.history.read().unwrap();
        Ok(history.get(user_id).cloned().unwrap_or_default())
    }
}

impl AdaptiveStore for MemoryStore {
    fn adaptive_state(&self, user_id: &str) -> Result<Option<UserAdaptiveState>> {
        let adaptive = self.adaptive.read().unwrap();
        Ok(adaptive.get(user_id).cloned())
    }

    fn upsert_adaptive_state(&self, state: &UserAdaptiveState) -> Result<()> {
        let mut adaptive = self.adaptive.write().unwrap();
        adaptive.insert(state.user_id.clone(), state.clone());
        Ok(())
    }
}

impl PlanStore for MemoryStore {
    fn insert_plan(&self, plan: &TodayPlan) -> Result<TodayPlan> {
        let mut plans = self.plans.write().unwrap();
        match plans.entry((plan.user_id.clone(), plan.date)) {
            Entry::Occupied(existing) => Ok(existing.get().clone()),
            Entry::Vacant(slot) => {
                slot.insert(plan.clone());
                Ok(plan.clone())
            }
        }
    }

    fn plan(&self, user_id: &str, date: NaiveDate) -> Result<Option<TodayPlan>> {
        let plans = self.plans.read().unwrap();
        Ok(plans.get(&(user_id.to_string(), date)).cloned())
    }
}

impl ProgramSource for MemoryStore {
    fn active_enrollments(&self, user_id: &str) -> Result<Vec<Enrollment>> {
        let enrollments = self.enrollments.read().unwrap();
        Ok(enrollments.get(user_id).cloned().unwrap_or_default())
    }

    fn pathway(&self, user_id: &str) -> Result<Option<PathwayAssignment>> {
        let pathways = self.pathways.read().unwrap();
        Ok(pathways.get(user_id).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::CheckinInput;
    use crate::plan::PlanPriority;
    use crate::storage::traits::tests::{
        test_adaptive_store_crud, test_checkin_store_crud, test_plan_store_crud,
        test_recovery_store_crud, test_safety_store_crud,
    };
    use chrono::Utc;

    #[test]
    fn test_memory_checkin_store_crud() {
        let store = MemoryStore::new();
        test_checkin_store_crud(&store);
    }

    #[test]
    fn test_memory_safety_store_crud() {
        let store = MemoryStore::new();
        test_safety_store_crud(&store);
    }

    #[test]
    fn test_memory_recovery_store_crud() {
        let store = MemoryStore::new();
        test_recovery_store_crud(&store);
    }

    #[test]
    fn test_memory_adaptive_store_crud() {
        let store = MemoryStore::new();
        test_adaptive_store_crud(&store);
    }

    #[test]
    fn test_memory_plan_store_crud() {
        let store = MemoryStore::new();
        test_plan_store_crud(&store);
    }

    #[test]
    fn test_program_source_seeding() {
        let store = MemoryStore::new();
        assert!(store.active_enrollments("u1").unwrap().is_empty());
        assert!(store.pathway("u1").unwrap().is_none());

        store.set_enrollments(
            "u1",
            vec![Enrollment {
                program_id: 7,
                name: "Morning walk".to_string(),
                category: "movement".to_string(),
                default_duration_min: Some(10),
                priority: PlanPriority::Should,
                cadence: None,
            }],
        );
        store.set_pathway(PathwayAssignment {
            user_id: "u1".to_string(),
            stage: 2,
            current_treatments: vec!["chemotherapy".to_string()],
        });

        assert_eq!(store.active_enrollments("u1").unwrap().len(), 1);
        assert_eq!(store.pathway("u1").unwrap().unwrap().stage, 2);
    }

    #[test]
    fn test_concurrent_checkins_single_winner() {
        use std::sync::Arc;
        use std::thread;

        let store = Arc::new(MemoryStore::new());
        let date = NaiveDate::from_ymd_opt(2025, 3, 10).unwrap();

        // Race ten submissions for the same (user, day).
        let mut handles = vec![];
        for i in 0..10 {
            let store = Arc::clone(&store);
            handles.push(thread::spawn(move || {
                let input = CheckinInput {
                    energy: i,
                    pain: 2,
                    confidence: 6,
                    ..CheckinInput::default()
                };
                let checkin = CheckIn::from_input("u1", date, &input, Utc::now()).unwrap();
                let (stored, inserted) = store.insert_checkin(&checkin).unwrap();
                (stored.energy, inserted)
            }));
        }

        let results: Vec<(u8, bool)> = handles.into_iter().map(|h| h.join().unwrap()).collect();

        // Exactly one submission inserted; everyone saw the same winner.
        assert_eq!(results.iter().filter(|(_, inserted)| *inserted).count(), 1);
        let winner = store.checkin("u1", date).unwrap().unwrap();
        assert!(results.iter().all(|(energy, _)| *energy == winner.energy));
    }

    #[test]
    fn test_ids_are_unique_across_aggregates() {
        use crate::monitor::{AlertType, EventSource, EventType, SafetyEvent};
        use serde_json::json;

        let store = MemoryStore::new();
        let date = NaiveDate::from_ymd_opt(2025, 3, 10).unwrap();

        let e1 = store
            .insert_event(&SafetyEvent::new(
                "u1",
                date,
                EventType::RedFlag,
                EventSource::Checkin,
                json!({}),
                Utc::now(),
            ))
            .unwrap()
            .unwrap();
        let e2 = store
            .insert_event(&SafetyEvent::new(
                "u2",
                date,
                EventType::RedFlag,
                EventSource::Checkin,
                json!({}),
                Utc::now(),
            ))
            .unwrap()
            .unwrap();
        assert_eq!(e1.id, Some(1));
        assert_eq!(e2.id, Some(2));

        // Alert ids count independently of event ids.
        let a1 = store
            .insert_alert(&CoachAlert::new(
                "u1",
                e1.id.unwrap(),
                AlertType::RedImmediate,
                Utc::now(),
            ))
            .unwrap();
        assert_eq!(a1.id, Some(1));
    }
}
