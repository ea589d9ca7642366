use fret_schema::SessionRecord;

/// Retention cap for the session history. Oldest records are dropped beyond
/// this so a long-lived install stays bounded.
pub const MAX_SESSIONS: usize = 500;

/// Append-only log of completed practice sessions, ordered by append time.
/// Records are never mutated after insertion.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionLog {
    records: Vec<SessionRecord>,
}

impl SessionLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, record: SessionRecord) {
        self.records.push(record);
        if self.records.len() > MAX_SESSIONS {
            let excess = self.records.len() - MAX_SESSIONS;
            self.records.drain(..excess);
        }
    }

    pub fn records(&self) -> &[SessionRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn from_records(records: Vec<SessionRecord>) -> Self {
        let mut log = Self { records };
        if log.records.len() > MAX_SESSIONS {
            let excess = log.records.len() - MAX_SESSIONS;
            log.records.drain(..excess);
        }
        log
    }

    pub fn into_records(self) -> Vec<SessionRecord> {
        self.records
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Duration, Utc};

    fn record(offset_minutes: i64) -> SessionRecord {
        let started: DateTime<Utc> = "2026-01-01T12:00:00Z".parse().unwrap();
        let started = started + Duration::minutes(offset_minutes);
        SessionRecord {
            started_at: started,
            ended_at: Some(started + Duration::minutes(5)),
            correct: 10,
            incorrect: 2,
            score: 100,
            max_streak: 4,
        }
    }

    #[test]
    fn push_keeps_append_order() {
        let mut log = SessionLog::new();
        log.push(record(0));
        log.push(record(10));
        assert_eq!(log.len(), 2);
        assert!(log.records()[0].started_at < log.records()[1].started_at);
    }

    #[test]
    fn retention_drops_oldest_first() {
        let mut log = SessionLog::new();
        for i in 0..(MAX_SESSIONS as i64 + 3) {
            log.push(record(i));
        }
        assert_eq!(log.len(), MAX_SESSIONS);
        // The first three records were evicted.
        assert_eq!(log.records()[0].started_at, record(3).started_at);
    }

    #[test]
    fn from_records_applies_the_cap() {
        let records: Vec<_> = (0..(MAX_SESSIONS as i64 + 1)).map(record).collect();
        let log = SessionLog::from_records(records);
        assert_eq!(log.len(), MAX_SESSIONS);
        assert_eq!(log.records()[0].started_at, record(1).started_at);
    }
}
