use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, NaiveDate, Utc};
use fret_schema::{FretboardLayout, Milliseconds, Position, ProgressSnapshot, SessionRecord};
use tracing::{debug, warn};

use crate::achievements::{self, EvalContext};
use crate::aggregate::{self, TrendBucket, TrendWindow, WeakSpot};
use crate::error::StorageError;
use crate::ledger::Ledger;
use crate::sessions::SessionLog;
use crate::streak::{StreakTracker, StreakUpdate};

/// Durable home for the progress snapshot. Implementations are simple
/// save/load pairs; the store decides when to call them.
pub trait StorageBackend {
    fn save(&mut self, snapshot: &ProgressSnapshot) -> Result<(), StorageError>;
    fn load(&mut self) -> Result<Option<ProgressSnapshot>, StorageError>;
}

/// JSON file on disk, one record per install.
#[derive(Debug, Clone)]
pub struct FileBackend {
    path: PathBuf,
}

impl FileBackend {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self { path: path.as_ref().to_path_buf() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl StorageBackend for FileBackend {
    fn save(&mut self, snapshot: &ProgressSnapshot) -> Result<(), StorageError> {
        let json = serde_json::to_vec_pretty(snapshot).map_err(StorageError::Encode)?;
        fs::write(&self.path, json).map_err(StorageError::Write)
    }

    fn load(&mut self) -> Result<Option<ProgressSnapshot>, StorageError> {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(StorageError::Read(e)),
        };
        let snapshot = serde_json::from_slice(&bytes).map_err(StorageError::Decode)?;
        Ok(Some(snapshot))
    }
}

/// In-memory backend for tests and ephemeral use.
#[derive(Debug, Clone, Default)]
pub struct MemoryBackend {
    snapshot: Option<ProgressSnapshot>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_snapshot(snapshot: ProgressSnapshot) -> Self {
        Self { snapshot: Some(snapshot) }
    }
}

impl StorageBackend for MemoryBackend {
    fn save(&mut self, snapshot: &ProgressSnapshot) -> Result<(), StorageError> {
        self.snapshot = Some(snapshot.clone());
        Ok(())
    }

    fn load(&mut self) -> Result<Option<ProgressSnapshot>, StorageError> {
        Ok(self.snapshot.clone())
    }
}

/// One-way signals from the store to the presentation layer. The store never
/// renders anything itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreEvent {
    /// Some observable state changed; re-read whatever you display.
    StateChanged,
    AchievementUnlocked { id: String },
    /// Persistence is degraded; progress may not survive a reload.
    StorageWarning { message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Listener = Box<dyn FnMut(&StoreEvent)>;

/// Grant one streak freeze each time the streak reaches a multiple of this.
const FREEZE_GRANT_STREAK_INTERVAL: u32 = 7;

/// The single writer over all practice progress: ledger, session history,
/// streak, achievements, heat-map flag. Constructed once at startup and
/// passed by reference to consumers; every mutation persists the full
/// snapshot before returning.
pub struct ProgressStore {
    ledger: Ledger,
    sessions: SessionLog,
    streak: StreakTracker,
    achievements: Vec<fret_schema::Achievement>,
    total_practice_time: Milliseconds,
    heat_map_enabled: bool,
    backend: Box<dyn StorageBackend>,
    listeners: Vec<(SubscriptionId, Listener)>,
    next_subscription: u64,
    load_warning: Option<String>,
}

impl ProgressStore {
    /// Load the last persisted snapshot, or start fresh. Never fails: an
    /// unreadable or malformed snapshot falls back to defaults and is
    /// reported through [`ProgressStore::load_warning`].
    pub fn open(backend: impl StorageBackend + 'static) -> Self {
        let mut backend: Box<dyn StorageBackend> = Box::new(backend);
        let mut load_warning = None;

        let snapshot = match backend.load() {
            Ok(Some(snapshot)) => Some(snapshot),
            Ok(None) => None,
            Err(e) => {
                warn!("progress snapshot unreadable, starting fresh: {e}");
                load_warning = Some(format!("stored progress could not be read: {e}"));
                None
            }
        };

        let mut store = match snapshot {
            Some(snapshot) => Self::from_snapshot_parts(snapshot, backend),
            None => Self {
                ledger: Ledger::new(),
                sessions: SessionLog::new(),
                streak: StreakTracker::new(),
                achievements: achievements::catalog_locked(),
                total_practice_time: 0,
                heat_map_enabled: false,
                backend,
                listeners: Vec::new(),
                next_subscription: 0,
                load_warning: None,
            },
        };
        store.load_warning = load_warning;
        store
    }

    fn from_snapshot_parts(snapshot: ProgressSnapshot, backend: Box<dyn StorageBackend>) -> Self {
        Self {
            ledger: Ledger::from_snapshot(
                &snapshot.position_stats,
                snapshot.total_correct,
                snapshot.total_incorrect,
            ),
            sessions: SessionLog::from_records(snapshot.session_history),
            streak: StreakTracker::from_parts(
                snapshot.streak_days,
                snapshot.streak_freezes,
                snapshot.last_freeze_date,
                snapshot.last_practice_date,
            ),
            achievements: achievements::reconcile(&snapshot.achievements),
            total_practice_time: snapshot.total_practice_time,
            heat_map_enabled: snapshot.heat_map_enabled,
            backend,
            listeners: Vec::new(),
            next_subscription: 0,
            load_warning: None,
        }
    }

    /// Set when `open` had to discard a corrupt snapshot. Non-blocking notice
    /// for the presentation layer.
    pub fn load_warning(&self) -> Option<&str> {
        self.load_warning.as_deref()
    }

    // --- mutations ---------------------------------------------------------

    /// Record one answered prompt and return any achievements it unlocked.
    pub fn record_answer(&mut self, position: Position, is_correct: bool) -> Vec<String> {
        self.record_answer_at(position, is_correct, Utc::now())
    }

    pub fn record_answer_at(
        &mut self,
        position: Position,
        is_correct: bool,
        now: DateTime<Utc>,
    ) -> Vec<String> {
        self.ledger.record(position, is_correct);
        let unlocked = self.evaluate_achievements(now);
        self.persist();
        self.announce(&unlocked);
        unlocked
    }

    /// Append a completed session, advance the streak for its practice day,
    /// and return any achievements it unlocked.
    pub fn end_session(&mut self, record: SessionRecord) -> Vec<String> {
        self.end_session_at(record, Utc::now())
    }

    pub fn end_session_at(&mut self, record: SessionRecord, now: DateTime<Utc>) -> Vec<String> {
        self.total_practice_time += record.duration_ms();
        let update = self.streak.record_practice(record.practice_day());
        self.sessions.push(record);

        // Milestone reward: one freeze per full week of streak, applied on
        // the day the streak reaches it.
        if update != StreakUpdate::SameDay
            && self.streak.streak_days() > 0
            && self.streak.streak_days() % FREEZE_GRANT_STREAK_INTERVAL == 0
            && self.streak.grant_freeze()
        {
            debug!(streak = self.streak.streak_days(), "streak milestone freeze granted");
        }

        let unlocked = self.evaluate_achievements(now);
        self.persist();
        self.announce(&unlocked);
        unlocked
    }

    /// Flip the heat-map display flag; returns the new value.
    pub fn toggle_heat_map(&mut self) -> bool {
        self.heat_map_enabled = !self.heat_map_enabled;
        self.persist();
        self.emit(&StoreEvent::StateChanged);
        self.heat_map_enabled
    }

    /// Clear the entire ledger and both global counters. The caller confirms
    /// with the user first; this does not.
    pub fn reset_heat_map(&mut self) {
        self.ledger.reset();
        self.persist();
        self.emit(&StoreEvent::StateChanged);
    }

    /// Replace all state with an imported snapshot (already validated by the
    /// transfer codec) and persist it.
    pub fn import_snapshot(&mut self, snapshot: ProgressSnapshot) {
        self.ledger = Ledger::from_snapshot(
            &snapshot.position_stats,
            snapshot.total_correct,
            snapshot.total_incorrect,
        );
        self.sessions = SessionLog::from_records(snapshot.session_history);
        self.streak = StreakTracker::from_parts(
            snapshot.streak_days,
            snapshot.streak_freezes,
            snapshot.last_freeze_date,
            snapshot.last_practice_date,
        );
        self.achievements = achievements::reconcile(&snapshot.achievements);
        self.total_practice_time = snapshot.total_practice_time;
        self.heat_map_enabled = snapshot.heat_map_enabled;
        self.persist();
        self.emit(&StoreEvent::StateChanged);
    }

    // --- selectors ---------------------------------------------------------

    pub fn snapshot(&self) -> ProgressSnapshot {
        ProgressSnapshot {
            position_stats: self.ledger.to_snapshot_map(),
            session_history: self.sessions.records().to_vec(),
            achievements: self.achievements.clone(),
            streak_days: self.streak.streak_days(),
            streak_freezes: self.streak.streak_freezes(),
            last_freeze_date: self.streak.last_freeze_date(),
            last_practice_date: self.streak.last_practice_date(),
            total_correct: self.ledger.total_correct(),
            total_incorrect: self.ledger.total_incorrect(),
            total_practice_time: self.total_practice_time,
            heat_map_enabled: self.heat_map_enabled,
        }
    }

    pub fn accuracy_for(&self, position: Position) -> Option<f64> {
        self.ledger.accuracy_for(position)
    }

    pub fn overall_accuracy(&self) -> Option<f64> {
        self.ledger.overall_accuracy()
    }

    pub fn coverage(&self, layout: FretboardLayout) -> u32 {
        aggregate::coverage(&self.ledger, layout)
    }

    pub fn weakest_positions(&self, min_attempts: u32, limit: usize) -> Vec<WeakSpot> {
        aggregate::weakest_positions(&self.ledger, min_attempts, limit)
    }

    pub fn heat_map_opacity(&self, position: Position) -> Option<f64> {
        aggregate::heat_map_opacity(&self.ledger, position)
    }

    pub fn accuracy_trend(&self, window: TrendWindow) -> Vec<TrendBucket> {
        self.accuracy_trend_at(window, Utc::now().date_naive())
    }

    pub fn accuracy_trend_at(&self, window: TrendWindow, today: NaiveDate) -> Vec<TrendBucket> {
        aggregate::accuracy_trend(&self.sessions, window, today)
    }

    pub fn achievements(&self) -> &[fret_schema::Achievement] {
        &self.achievements
    }

    pub fn sessions(&self) -> &[SessionRecord] {
        self.sessions.records()
    }

    pub fn streak_days(&self) -> u32 {
        self.streak.streak_days()
    }

    pub fn streak_freezes(&self) -> u32 {
        self.streak.streak_freezes()
    }

    pub fn total_correct(&self) -> u64 {
        self.ledger.total_correct()
    }

    pub fn total_incorrect(&self) -> u64 {
        self.ledger.total_incorrect()
    }

    pub fn total_practice_time(&self) -> Milliseconds {
        self.total_practice_time
    }

    pub fn heat_map_enabled(&self) -> bool {
        self.heat_map_enabled
    }

    // --- observers ---------------------------------------------------------

    /// Register a listener for store events. The core only announces; the
    /// presentation layer decides when and how to re-render.
    pub fn subscribe(&mut self, listener: impl FnMut(&StoreEvent) + 'static) -> SubscriptionId {
        let id = SubscriptionId(self.next_subscription);
        self.next_subscription += 1;
        self.listeners.push((id, Box::new(listener)));
        id
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) {
        self.listeners.retain(|(listener_id, _)| *listener_id != id);
    }

    // --- internals ---------------------------------------------------------

    fn evaluate_achievements(&mut self, now: DateTime<Utc>) -> Vec<String> {
        let ctx = EvalContext {
            ledger: &self.ledger,
            sessions: &self.sessions,
            streak: &self.streak,
        };
        achievements::evaluate(&ctx, &mut self.achievements, now)
    }

    /// Save the full snapshot. A failure is downgraded to a warning event;
    /// in-memory state stays authoritative for this run.
    fn persist(&mut self) {
        let snapshot = self.snapshot();
        if let Err(e) = self.backend.save(&snapshot) {
            warn!("failed to persist progress: {e}");
            self.emit(&StoreEvent::StorageWarning { message: e.to_string() });
        }
    }

    fn announce(&mut self, unlocked: &[String]) {
        for id in unlocked {
            debug!(id = %id, "achievement unlocked");
            self.emit(&StoreEvent::AchievementUnlocked { id: id.clone() });
        }
        self.emit(&StoreEvent::StateChanged);
    }

    fn emit(&mut self, event: &StoreEvent) {
        for (_, listener) in self.listeners.iter_mut() {
            listener(event);
        }
    }
}
