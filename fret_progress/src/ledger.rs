use std::collections::{BTreeMap, HashMap};

use fret_schema::{Position, PositionStats};

/// Per-position answer counters plus the global totals. The authoritative
/// record of what the learner knows.
///
/// Counters only grow; `reset` is the single decrementing operation and clears
/// everything at once.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Ledger {
    entries: HashMap<Position, PositionStats>,
    total_correct: u64,
    total_incorrect: u64,
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one answered prompt, creating the entry on first contact.
    pub fn record(&mut self, position: Position, is_correct: bool) {
        let entry = self.entries.entry(position).or_default();
        if is_correct {
            entry.correct += 1;
            self.total_correct += 1;
        } else {
            entry.incorrect += 1;
            self.total_incorrect += 1;
        }
    }

    /// Clear every entry and both global counters. Irreversible; callers
    /// confirm before invoking.
    pub fn reset(&mut self) {
        self.entries.clear();
        self.total_correct = 0;
        self.total_incorrect = 0;
    }

    pub fn stats_for(&self, position: Position) -> Option<PositionStats> {
        self.entries.get(&position).copied()
    }

    pub fn accuracy_for(&self, position: Position) -> Option<f64> {
        self.entries.get(&position).and_then(PositionStats::accuracy)
    }

    /// Number of distinct positions with at least one recorded answer.
    pub fn attempted_positions(&self) -> usize {
        self.entries.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Position, PositionStats)> + '_ {
        self.entries.iter().map(|(p, s)| (*p, *s))
    }

    pub fn total_correct(&self) -> u64 {
        self.total_correct
    }

    pub fn total_incorrect(&self) -> u64 {
        self.total_incorrect
    }

    pub fn total_attempts(&self) -> u64 {
        self.total_correct + self.total_incorrect
    }

    pub fn overall_accuracy(&self) -> Option<f64> {
        let total = self.total_attempts();
        if total == 0 {
            None
        } else {
            Some(self.total_correct as f64 / total as f64)
        }
    }

    /// Ordered view for the persisted snapshot.
    pub fn to_snapshot_map(&self) -> BTreeMap<Position, PositionStats> {
        self.entries.iter().map(|(p, s)| (*p, *s)).collect()
    }

    /// Rebuild from a persisted snapshot. Global counters are taken from the
    /// snapshot, not recomputed: resets happen mid-history, so the per-position
    /// map alone does not determine them.
    pub fn from_snapshot(
        map: &BTreeMap<Position, PositionStats>,
        total_correct: u64,
        total_incorrect: u64,
    ) -> Self {
        Self {
            entries: map.iter().map(|(p, s)| (*p, *s)).collect(),
            total_correct,
            total_incorrect,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_creates_entry_and_tracks_totals() {
        let mut ledger = Ledger::new();
        let p = Position::new(1, 4);

        ledger.record(p, true);
        ledger.record(p, true);
        ledger.record(p, false);

        let stats = ledger.stats_for(p).unwrap();
        assert_eq!(stats.correct, 2);
        assert_eq!(stats.incorrect, 1);
        assert_eq!(ledger.total_correct(), 2);
        assert_eq!(ledger.total_incorrect(), 1);
        assert_eq!(ledger.attempted_positions(), 1);
    }

    #[test]
    fn accuracy_matches_counters_and_is_none_untouched() {
        let mut ledger = Ledger::new();
        let p = Position::new(3, 7);
        assert_eq!(ledger.accuracy_for(p), None);

        ledger.record(p, true);
        ledger.record(p, false);
        ledger.record(p, false);
        ledger.record(p, false);
        assert_eq!(ledger.accuracy_for(p), Some(0.25));
    }

    #[test]
    fn reset_clears_everything() {
        let mut ledger = Ledger::new();
        ledger.record(Position::new(0, 0), true);
        ledger.record(Position::new(5, 9), false);

        ledger.reset();

        assert_eq!(ledger.attempted_positions(), 0);
        assert_eq!(ledger.total_attempts(), 0);
        assert_eq!(ledger.accuracy_for(Position::new(0, 0)), None);
        assert_eq!(ledger.overall_accuracy(), None);
    }

    #[test]
    fn snapshot_round_trip_preserves_counters() {
        let mut ledger = Ledger::new();
        ledger.record(Position::new(2, 2), true);
        ledger.record(Position::new(4, 0), false);

        let map = ledger.to_snapshot_map();
        let back = Ledger::from_snapshot(&map, ledger.total_correct(), ledger.total_incorrect());
        assert_eq!(back, ledger);
    }
}
