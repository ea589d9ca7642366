use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub type Milliseconds = u64;

/// One cell on the fretboard. Open strings are fret 0.
///
/// Serialized as its canonical key `"<string_index>-<fret>"` so that JSON maps
/// keyed by position validate their keys while deserializing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct Position {
    pub string_index: u8,
    pub fret: u8,
}

impl Position {
    pub fn new(string_index: u8, fret: u8) -> Self {
        Self { string_index, fret }
    }

    /// Canonical mapping key, e.g. `"2-5"` for string 2, fret 5.
    pub fn key(&self) -> String {
        format!("{}-{}", self.string_index, self.fret)
    }

    pub fn from_key(key: &str) -> Result<Self, ParsePositionError> {
        key.parse()
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.string_index, self.fret)
    }
}

impl FromStr for Position {
    type Err = ParsePositionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (string_part, fret_part) = s
            .split_once('-')
            .ok_or_else(|| ParsePositionError::new(s))?;
        let string_index: u8 = string_part
            .parse()
            .map_err(|_| ParsePositionError::new(s))?;
        let fret: u8 = fret_part.parse().map_err(|_| ParsePositionError::new(s))?;
        Ok(Self { string_index, fret })
    }
}

impl From<Position> for String {
    fn from(p: Position) -> String {
        p.key()
    }
}

impl TryFrom<String> for Position {
    type Error = ParsePositionError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("invalid position key: {key:?} (expected \"<string>-<fret>\")")]
pub struct ParsePositionError {
    pub key: String,
}

impl ParsePositionError {
    fn new(key: &str) -> Self {
        Self { key: key.to_string() }
    }
}

/// Cumulative answer counters for one position. Increment-only; only a full
/// ledger reset clears them.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PositionStats {
    pub correct: u32,
    pub incorrect: u32,
}

impl PositionStats {
    pub fn total(&self) -> u32 {
        self.correct + self.incorrect
    }

    /// `None` when nothing has been attempted yet.
    pub fn accuracy(&self) -> Option<f64> {
        let total = self.total();
        if total == 0 {
            None
        } else {
            Some(f64::from(self.correct) / f64::from(total))
        }
    }
}

/// One completed practice run. Immutable once appended to the history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionRecord {
    pub started_at: DateTime<Utc>,
    #[serde(default)]
    pub ended_at: Option<DateTime<Utc>>,
    pub correct: u32,
    pub incorrect: u32,
    pub score: u32,
    pub max_streak: u32,
}

impl SessionRecord {
    pub fn attempts(&self) -> u32 {
        self.correct + self.incorrect
    }

    /// Calendar day this session counts toward: end time, falling back to
    /// start time for records missing `ended_at`.
    pub fn practice_day(&self) -> NaiveDate {
        self.ended_at.unwrap_or(self.started_at).date_naive()
    }

    pub fn duration_ms(&self) -> Milliseconds {
        match self.ended_at {
            Some(ended) => (ended - self.started_at).num_milliseconds().max(0) as Milliseconds,
            None => 0,
        }
    }
}

/// Catalog entry state. `unlocked_at` transitions from `None` to `Some` exactly
/// once and is never cleared.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Achievement {
    pub id: String,
    pub name: String,
    pub description: String,
    pub unlocked_at: Option<DateTime<Utc>>,
}

/// Instrument configuration consumed for coverage math. The engine does not
/// validate tuning data itself; the settings layer owns that.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FretboardLayout {
    pub strings: u8,
    pub frets: u8,
}

impl FretboardLayout {
    pub fn position_count(&self) -> u32 {
        u32::from(self.strings) * u32::from(self.frets)
    }
}

impl Default for FretboardLayout {
    fn default() -> Self {
        // Standard six-string guitar, first twelve frets.
        Self { strings: 6, frets: 12 }
    }
}

/// The full persisted aggregate. Single writer: the progress store.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressSnapshot {
    pub position_stats: BTreeMap<Position, PositionStats>,
    pub session_history: Vec<SessionRecord>,
    pub achievements: Vec<Achievement>,
    pub streak_days: u32,
    pub streak_freezes: u32,
    pub last_freeze_date: Option<NaiveDate>,
    pub last_practice_date: Option<NaiveDate>,
    pub total_correct: u64,
    pub total_incorrect: u64,
    pub total_practice_time: Milliseconds,
    pub heat_map_enabled: bool,
}
