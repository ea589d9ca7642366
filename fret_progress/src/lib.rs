//! Practice-progress engine for the FretMemo fretboard trainer: per-position
//! accuracy ledger, session history, streaks with freezes, achievements,
//! derived aggregates, and a persisting progress store.

pub mod achievements;
pub mod aggregate;
pub mod error;
pub mod ledger;
pub mod sessions;
pub mod store;
pub mod streak;
pub mod transfer;

pub use error::{StorageError, ValidationError};
pub use ledger::Ledger;
pub use sessions::{SessionLog, MAX_SESSIONS};
pub use store::{
    FileBackend, MemoryBackend, ProgressStore, StorageBackend, StoreEvent, SubscriptionId,
};
pub use streak::{StreakTracker, StreakUpdate, MAX_HELD_FREEZES};
pub use transfer::{export_file_name, export_snapshot, import_json, ExportEnvelope, SCHEMA_VERSION};
