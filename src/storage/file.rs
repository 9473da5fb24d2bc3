//! File-backed storage for Amble.
//!
//! Each user's rows live in one JSON document under `<data_dir>/users/`;
//! store-assigned ids are tracked in `<data_dir>/counters.json`. Atomic
//! writes are achieved via temp file + rename pattern.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::adaptive::UserAdaptiveState;
use crate::config::data_dir;
use crate::core::{CheckIn, PhaseHistoryEntry, RecoveryStatus, TodayState};
use crate::error::{AmbleError, Result};
use crate::monitor::{AlertStatus, CoachAlert, SafetyEvent};
use crate::plan::{Enrollment, PathwayAssignment, TodayPlan};
use crate::storage::{
    AdaptiveStore, CheckinStore, PlanStore, ProgramSource, RecoveryStore, SafetyStore,
};
use crate::util::read_to_string_limited;

/// Everything stored for one user, serialized as a single document.
///
/// Every field defaults so records written by older versions keep loading.
#[derive(Debug, Default, Serialize, Deserialize)]
struct UserRecord {
    #[serde(default)]
    checkins: Vec<CheckIn>,
    #[serde(default)]
    today_states: Vec<TodayState>,
    #[serde(default)]
    events: Vec<SafetyEvent>,
    #[serde(default)]
    alerts: Vec<CoachAlert>,
    #[serde(default)]
    recovery_status: Option<RecoveryStatus>,
    #[serde(default)]
    phase_history: Vec<PhaseHistoryEntry>,
    #[serde(default)]
    adaptive_state: Option<UserAdaptiveState>,
    #[serde(default)]
    plans: Vec<TodayPlan>,
    #[serde(default)]
    enrollments: Vec<Enrollment>,
    #[serde(default)]
    pathway: Option<PathwayAssignment>,
}

/// Last ids handed out for store-assigned rows.
#[derive(Debug, Default, Serialize, Deserialize)]
struct Counters {
    #[serde(default)]
    last_event_id: u64,
    #[serde(default)]
    last_alert_id: u64,
}

/// File-backed store implementing all store traits.
///
/// Stores one JSON record per user plus a counters file. Uses atomic
/// writes via temp file + rename pattern.
#[derive(Debug)]
pub struct FileStore {
    /// Root data directory.
    data_dir: PathBuf,
    /// Directory where per-user record files are stored.
    users_dir: PathBuf,
    /// Serializes read-modify-write cycles within this process. On-disk
    /// writes stay atomic via rename; cross-process coordination is out
    /// of scope.
    write_lock: Mutex<()>,
}

impl FileStore {
    /// Create a file store rooted at the default data directory.
    ///
    /// Uses `<amble_home>/data/`.
    pub fn new() -> Result<Self> {
        let dir = data_dir().ok_or_else(|| {
            AmbleError::config("Could not determine data directory (no home directory)")
        })?;
        Self::with_dir(dir)
    }

    /// Create a file store with a custom data directory.
    pub fn with_dir(data_dir: impl Into<PathBuf>) -> Result<Self> {
        let data_dir = data_dir.into();
        let users_dir = data_dir.join("users");

        // Create the directories if they don't exist
        if !users_dir.exists() {
            fs::create_dir_all(&users_dir).map_err(|e| AmbleError::storage(&users_dir, e))?;
        }

        Ok(Self {
            data_dir,
            users_dir,
            write_lock: Mutex::new(()),
        })
    }

    /// Get the path for a user's record file.
    fn user_path(&self, user_id: &str) -> PathBuf {
        self.users_dir
            .join(format!("{}.json", sanitize_user_id(user_id)))
    }

    /// Get the path for the counters file.
    fn counters_path(&self) -> PathBuf {
        self.data_dir.join("counters.json")
    }

    /// Load a user's record, or an empty one when no file exists yet.
    ///
    /// Parse failures propagate: a user-keyed read must not quietly treat
    /// a damaged record as missing data.
    fn load_record(&self, user_id: &str) -> Result<UserRecord> {
        let path = self.user_path(user_id);

        if !path.exists() {
            return Ok(UserRecord::default());
        }

        let content = read_to_string_limited(&path)?;
        let record: UserRecord = serde_json::from_str(&content)?;

        Ok(record)
    }

    /// Write a user's record atomically.
    fn store_record(&self, user_id: &str, record: &UserRecord) -> Result<()> {
        self.write_json(&self.user_path(user_id), record)
    }

    /// Load every user record, for reads that cut across users.
    ///
    /// Unreadable or invalid record files are skipped.
    fn scan_records(&self) -> Result<Vec<(PathBuf, UserRecord)>> {
        if !self.users_dir.exists() {
            return Ok(Vec::new());
        }

        let mut records = Vec::new();

        let entries =
            fs::read_dir(&self.users_dir).map_err(|e| AmbleError::storage(&self.users_dir, e))?;

        for entry in entries {
            let entry = entry.map_err(|e| AmbleError::storage(&self.users_dir, e))?;
            let path = entry.path();

            // Skip non-JSON files and temp files
            if path.extension().map(|e| e != "json").unwrap_or(true) {
                continue;
            }
            if path
                .file_name()
                .map(|n| n.to_string_lossy().starts_with('.'))
                .unwrap_or(true)
            {
                continue;
            }

            if let Ok(content) = fs::read_to_string(&path) {
                if let Ok(record) = serde_json::from_str::<UserRecord>(&content) {
                    records.push((path, record));
                }
            }
        }

        Ok(records)
    }

    /// Load the id counters, starting from zero when no file exists.
    fn load_counters(&self) -> Result<Counters> {
        let path = self.counters_path();

        if !path.exists() {
            return Ok(Counters::default());
        }

        let content = read_to_string_limited(&path)?;
        let counters: Counters = serde_json::from_str(&content)?;

        Ok(counters)
    }

    /// Hand out the next safety event id.
    ///
    /// The counter is persisted before the row that uses it, so a crash
    /// between the two writes burns an id rather than reusing one.
    fn next_event_id(&self) -> Result<u64> {
        let mut counters = self.load_counters()?;
        counters.last_event_id += 1;
        self.write_json(&self.counters_path(), &counters)?;
        Ok(counters.last_event_id)
    }

    /// Hand out the next coach alert id.
    fn next_alert_id(&self) -> Result<u64> {
        let mut counters = self.load_counters()?;
        counters.last_alert_id += 1;
        self.write_json(&self.counters_path(), &counters)?;
        Ok(counters.last_alert_id)
    }

    /// Write a value as JSON atomically using temp file + rename.
    fn write_json<T: Serialize>(&self, path: &Path, value: &T) -> Result<()> {
        let temp_path = temp_path(path);

        // Serialize to JSON
        let json = serde_json::to_string_pretty(value)?;

        // Write to temp file
        {
            let mut file =
                fs::File::create(&temp_path).map_err(|e| AmbleError::storage(&temp_path, e))?;
            file.write_all(json.as_bytes())
                .map_err(|e| AmbleError::storage(&temp_path, e))?;
            file.sync_all()
                .map_err(|e| AmbleError::storage(&temp_path, e))?;
        }

        // Rename temp file to final path (atomic on POSIX)
        fs::rename(&temp_path, path).map_err(|e| AmbleError::storage(path, e))?;

        Ok(())
    }
}

/// Make a user id safe to use as a file name.
///
/// Anything outside `[A-Za-z0-9._-]` becomes `_`. A leading dot gets a
/// `_` prefix so record files never land in the dotfile namespace that
/// scans skip.
fn sanitize_user_id(user_id: &str) -> String {
    let mut name: String = user_id
        .chars()
        .map(|c| match c {
            'a'..='z' | 'A'..='Z' | '0'..='9' | '.' | '_' | '-' => c,
            _ => '_',
        })
        .collect();
    if name.is_empty() || name.starts_with('.') {
        name.insert(0, '_');
    }
    name
}

/// Get the sibling temp path used during atomic writes.
fn temp_path(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    path.with_file_name(format!(".{}.tmp", name))
}

impl CheckinStore for FileStore {
    fn insert_checkin(&self, checkin: &CheckIn) -> Result<(CheckIn, bool)> {
        let _guard = self.write_lock.lock().unwrap();
        let mut record = self.load_record(&checkin.user_id)?;
        if let Some(existing) = record
            .checkins
            .iter()
            .find(|c| c.user_id == checkin.user_id && c.date == checkin.date)
        {
            return Ok((existing.clone(), false));
        }
        record.checkins.push(checkin.clone());
        self.store_record(&checkin.user_id, &record)?;
        Ok((checkin.clone(), true))
    }

    fn checkin(&self, user_id: &str, date: NaiveDate) -> Result<Option<CheckIn>> {
        let record = self.load_record(user_id)?;
        Ok(record
            .checkins
            .into_iter()
            .find(|c| c.user_id == user_id && c.date == date))
    }

    fn recent_checkins(&self, user_id: &str, limit: usize) -> Result<Vec<CheckIn>> {
        let record = self.load_record(user_id)?;
        let mut result: Vec<CheckIn> = record
            .checkins
            .into_iter()
            .filter(|c| c.user_id == user_id)
            .collect();
        result.sort_by(|a, b| b.date.cmp(&a.date));
        result.truncate(limit);
        Ok(result)
    }

    fn checkins_since(&self, user_id: &str, since: NaiveDate) -> Result<Vec<CheckIn>> {
        let record = self.load_record(user_id)?;
        let mut result: Vec<CheckIn> = record
            .checkins
            .into_iter()
            .filter(|c| c.user_id == user_id && c.date >= since)
            .collect();
        result.sort_by(|a, b| b.date.cmp(&a.date));
        Ok(result)
    }

    fn put_today_state(&self, state: &TodayState) -> Result<()> {
        let _guard = self.write_lock.lock().unwrap();
        let mut record = self.load_record(&state.user_id)?;
        record
            .today_states
            .retain(|s| !(s.user_id == state.user_id && s.date == state.date));
        record.today_states.push(state.clone());
        self.store_record(&state.user_id, &record)
    }

    fn today_state(&self, user_id: &str, date: NaiveDate) -> Result<Option<TodayState>> {
        let record = self.load_record(user_id)?;
        Ok(record
            .today_states
            .into_iter()
            .find(|s| s.user_id == user_id && s.date == date))
    }

    fn today_states_since(&self, user_id: &str, since: NaiveDate) -> Result<Vec<TodayState>> {
        let record = self.load_record(user_id)?;
        let mut result: Vec<TodayState> = record
            .today_states
            .into_iter()
            .filter(|s| s.user_id == user_id && s.date >= since)
            .collect();
        result.sort_by(|a, b| b.date.cmp(&a.date));
        Ok(result)
    }
}

impl SafetyStore for FileStore {
    fn insert_event(&self, event: &SafetyEvent) -> Result<Option<SafetyEvent>> {
        let _guard = self.write_lock.lock().unwrap();
        let mut record = self.load_record(&event.user_id)?;
        let taken = record.events.iter().any(|e| {
            e.user_id == event.user_id && e.date == event.date && e.event_type == event.event_type
        });
        if taken {
            return Ok(None);
        }
        let mut stored = event.clone();
        stored.id = Some(self.next_event_id()?);
        record.events.push(stored.clone());
        self.store_record(&event.user_id, &record)?;
        Ok(Some(stored))
    }

    fn event(&self, event_id: u64) -> Result<Option<SafetyEvent>> {
        for (_, record) in self.scan_records()? {
            if let Some(event) = record.events.into_iter().find(|e| e.id == Some(event_id)) {
                return Ok(Some(event));
            }
        }
        Ok(None)
    }

    fn events(&self, user_id: &str) -> Result<Vec<SafetyEvent>> {
        let record = self.load_record(user_id)?;
        let mut result: Vec<SafetyEvent> = record
            .events
            .into_iter()
            .filter(|e| e.user_id == user_id)
            .collect();
        result.sort_by(|a, b| b.date.cmp(&a.date).then(b.id.cmp(&a.id)));
        Ok(result)
    }

    fn insert_alert(&self, alert: &CoachAlert) -> Result<CoachAlert> {
        let _guard = self.write_lock.lock().unwrap();
        let mut record = self.load_record(&alert.user_id)?;
        let mut stored = alert.clone();
        stored.id = Some(self.next_alert_id()?);
        record.alerts.push(stored.clone());
        self.store_record(&alert.user_id, &record)?;
        Ok(stored)
    }

    fn alerts(&self, status: Option<AlertStatus>) -> Result<Vec<CoachAlert>> {
        let mut result = Vec::new();
        for (_, record) in self.scan_records()? {
            result.extend(
                record
                    .alerts
                    .into_iter()
                    .filter(|a| status.map_or(true, |s| a.status == s)),
            );
        }
        result.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(result)
    }

    fn advance_alert(&self, alert_id: u64, status: AlertStatus) -> Result<CoachAlert> {
        let _guard = self.write_lock.lock().unwrap();
        for (path, mut record) in self.scan_records()? {
            if let Some(alert) = record.alerts.iter_mut().find(|a| a.id == Some(alert_id)) {
                alert.advance(status)?;
                let updated = alert.clone();
                self.write_json(&path, &record)?;
                return Ok(updated);
            }
        }
        Err(AmbleError::alert_not_found(alert_id))
    }
}

impl RecoveryStore for FileStore {
    fn upsert_status(&self, status: &RecoveryStatus) -> Result<()> {
        let _guard = self.write_lock.lock().unwrap();
        let mut record = self.load_record(&status.user_id)?;
        record.recovery_status = Some(status.clone());
        self.store_record(&status.user_id, &record)
    }

    fn status(&self, user_id: &str) -> Result<Option<RecoveryStatus>> {
        let record = self.load_record(user_id)?;
        Ok(record.recovery_status.filter(|s| s.user_id == user_id))
    }

    fn append_history(&self, entry: &PhaseHistoryEntry) -> Result<()> {
        let _guard = self.write_lock.lock().unwrap();
        let mut record = self.load_record(&entry.user_id)?;
        record.phase_history.push(entry.clone());
        self.store_record(&entry.user_id, &record)
    }

    fn history(&self, user_id: &str) -> Result<Vec<PhaseHistoryEntry>> {
        let record = self.load_record(user_id)?;
        Ok(record
            .phase_history
            .into_iter()
            .filter(|h| h.user_id == user_id)
            .collect())
    }
}

impl AdaptiveStore for FileStore {
    fn adaptive_state(&self, user_id: &str) -> Result<Option<UserAdaptiveState>> {
        let record = self.load_record(user_id)?;
        Ok(record.adaptive_state.filter(|s| s.user_id == user_id))
    }

    fn upsert_adaptive_state(&self, state: &UserAdaptiveState) -> Result<()> {
        let _guard = self.write_lock.lock().unwrap();
        let mut record = self.load_record(&state.user_id)?;
        record.adaptive_state = Some(state.clone());
        self.store_record(&state.user_id, &record)
    }
}

impl PlanStore for FileStore {
    fn insert_plan(&self, plan: &TodayPlan) -> Result<TodayPlan> {
        let _guard = self.write_lock.lock().unwrap();
        let mut record = self.load_record(&plan.user_id)?;
        if let Some(existing) = record
            .plans
            .iter()
            .find(|p| p.user_id == plan.user_id && p.date == plan.date)
        {
            return Ok(existing.clone());
        }
        record.plans.push(plan.clone());
        self.store_record(&plan.user_id, &record)?;
        Ok(plan.clone())
    }

    fn plan(&self, user_id: &str, date: NaiveDate) -> Result<Option<TodayPlan>> {
        let record = self.load_record(user_id)?;
        Ok(record
            .plans
            .into_iter()
            .find(|p| p.user_id == user_id && p.date == date))
    }
}

impl ProgramSource for FileStore {
    fn active_enrollments(&self, user_id: &str) -> Result<Vec<Enrollment>> {
        let record = self.load_record(user_id)?;
        Ok(record.enrollments)
    }

    fn pathway(&self, user_id: &str) -> Result<Option<PathwayAssignment>> {
        let record = self.load_record(user_id)?;
        Ok(record.pathway.filter(|p| p.user_id == user_id))
    }
}
