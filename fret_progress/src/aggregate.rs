use std::collections::BTreeMap;

use chrono::{Duration, NaiveDate};
use fret_schema::{FretboardLayout, Position};

use crate::ledger::Ledger;
use crate::sessions::SessionLog;

/// Heat-map opacity for a position with 0% accuracy. Accuracy remaps linearly
/// onto `[OPACITY_FLOOR, OPACITY_FLOOR + OPACITY_SPAN]` so every attempted
/// cell stays visible.
pub const OPACITY_FLOOR: f64 = 0.3;
pub const OPACITY_SPAN: f64 = 0.7;

/// Percentage of the fretboard with at least one recorded attempt, rounded to
/// the nearest integer. The ledger may hold positions outside the current
/// layout (the instrument changed), so the result is clamped at 100.
pub fn coverage(ledger: &Ledger, layout: FretboardLayout) -> u32 {
    let total = layout.position_count();
    if total == 0 {
        return 0;
    }
    let attempted = ledger.attempted_positions() as f64;
    let percent = (attempted / f64::from(total) * 100.0).round() as u32;
    percent.min(100)
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WeakSpot {
    pub position: Position,
    pub accuracy: f64,
    pub total: u32,
}

/// The `limit` least-accurate positions with at least `min_attempts` answers.
///
/// Ordering is deterministic: accuracy ascending, then total attempts
/// descending (a heavily-drilled 50% cell ranks as weaker evidence than a
/// barely-touched one), then (string, fret) ascending.
pub fn weakest_positions(ledger: &Ledger, min_attempts: u32, limit: usize) -> Vec<WeakSpot> {
    let mut spots: Vec<WeakSpot> = ledger
        .iter()
        .filter(|(_, stats)| stats.total() >= min_attempts.max(1))
        .map(|(position, stats)| WeakSpot {
            position,
            // total() > 0 here, so accuracy() is always Some.
            accuracy: stats.accuracy().unwrap_or(0.0),
            total: stats.total(),
        })
        .collect();

    spots.sort_by(|a, b| {
        a.accuracy
            .total_cmp(&b.accuracy)
            .then_with(|| b.total.cmp(&a.total))
            .then_with(|| a.position.cmp(&b.position))
    });
    spots.truncate(limit);
    spots
}

/// Opacity for one heat-map cell; `None` when the cell has no attempts and
/// should not be painted at all.
pub fn heat_map_opacity(ledger: &Ledger, position: Position) -> Option<f64> {
    ledger
        .accuracy_for(position)
        .map(|accuracy| OPACITY_FLOOR + accuracy * OPACITY_SPAN)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrendWindow {
    LastWeek,
    LastMonth,
    AllTime,
}

impl TrendWindow {
    fn trailing_days(self) -> Option<i64> {
        match self {
            TrendWindow::LastWeek => Some(7),
            TrendWindow::LastMonth => Some(30),
            TrendWindow::AllTime => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrendBucket {
    pub day: NaiveDate,
    pub accuracy_percent: u32,
    pub total_attempts: u32,
}

/// Day-bucketed accuracy over the session history, chronologically ascending.
///
/// Only days containing at least one session appear; a day whose sessions
/// carry zero attempts emits 0 rather than a gap, so the chart line stays
/// continuous. A trailing window of N days covers `today - (N - 1)` through
/// today, inclusive.
pub fn accuracy_trend(log: &SessionLog, window: TrendWindow, today: NaiveDate) -> Vec<TrendBucket> {
    let cutoff = window
        .trailing_days()
        .map(|days| today - Duration::days(days - 1));

    let mut days: BTreeMap<NaiveDate, (u64, u64)> = BTreeMap::new();
    for record in log.records() {
        let day = record.practice_day();
        if let Some(cutoff) = cutoff {
            if day < cutoff {
                continue;
            }
        }
        let entry = days.entry(day).or_insert((0, 0));
        entry.0 += u64::from(record.correct);
        entry.1 += u64::from(record.incorrect);
    }

    days.into_iter()
        .map(|(day, (correct, incorrect))| {
            let total = correct + incorrect;
            let accuracy_percent = if total == 0 {
                0
            } else {
                (correct as f64 / total as f64 * 100.0).round() as u32
            };
            TrendBucket {
                day,
                accuracy_percent,
                total_attempts: total as u32,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Utc};
    use fret_schema::SessionRecord;

    fn drill(ledger: &mut Ledger, position: Position, correct: u32, incorrect: u32) {
        for _ in 0..correct {
            ledger.record(position, true);
        }
        for _ in 0..incorrect {
            ledger.record(position, false);
        }
    }

    fn session_on(day: NaiveDate, correct: u32, incorrect: u32) -> SessionRecord {
        let started: DateTime<Utc> = day
            .and_hms_opt(18, 0, 0)
            .unwrap()
            .and_utc();
        SessionRecord {
            started_at: started,
            ended_at: Some(started + Duration::minutes(10)),
            correct,
            incorrect,
            score: correct * 10,
            max_streak: correct,
        }
    }

    #[test]
    fn coverage_rounds_against_the_layout() {
        let mut ledger = Ledger::new();
        let layout = FretboardLayout { strings: 6, frets: 12 };
        assert_eq!(coverage(&ledger, layout), 0);

        // 7 of 72 cells = 9.72% -> 10.
        for fret in 0..7 {
            ledger.record(Position::new(0, fret), true);
        }
        assert_eq!(coverage(&ledger, layout), 10);
    }

    #[test]
    fn coverage_is_parameterized_by_layout() {
        let mut ledger = Ledger::new();
        for fret in 0..5 {
            ledger.record(Position::new(0, fret), true);
        }
        // 5 of 20 cells on a 4x5 board.
        assert_eq!(coverage(&ledger, FretboardLayout { strings: 4, frets: 5 }), 25);
    }

    #[test]
    fn weakest_ranking_filters_and_orders() {
        let mut ledger = Ledger::new();
        let a = Position::new(0, 1);
        let b = Position::new(1, 2);
        let c = Position::new(2, 3);
        drill(&mut ledger, a, 2, 6); // 25% over 8
        drill(&mut ledger, b, 5, 5); // 50% over 10
        drill(&mut ledger, c, 1, 2); // 33% over 3, excluded below min

        let spots = weakest_positions(&ledger, 4, 2);
        assert_eq!(spots.len(), 2);
        assert_eq!(spots[0].position, a);
        assert_eq!(spots[1].position, b);
    }

    #[test]
    fn weakest_ties_prefer_more_attempts_then_position() {
        let mut ledger = Ledger::new();
        let small = Position::new(0, 0);
        let big = Position::new(5, 9);
        let peer = Position::new(1, 1);
        drill(&mut ledger, small, 1, 1); // 50% over 2
        drill(&mut ledger, big, 5, 5); // 50% over 10
        drill(&mut ledger, peer, 1, 1); // 50% over 2

        let spots = weakest_positions(&ledger, 1, 3);
        assert_eq!(spots[0].position, big);
        assert_eq!(spots[1].position, small);
        assert_eq!(spots[2].position, peer);
    }

    #[test]
    fn heat_map_opacity_remaps_accuracy() {
        let mut ledger = Ledger::new();
        let p = Position::new(2, 7);
        assert_eq!(heat_map_opacity(&ledger, p), None);

        drill(&mut ledger, p, 1, 1);
        let opacity = heat_map_opacity(&ledger, p).unwrap();
        assert!((opacity - 0.65).abs() < 1e-9);

        drill(&mut ledger, p, 2, 0); // now 3/4
        let opacity = heat_map_opacity(&ledger, p).unwrap();
        assert!((opacity - (0.3 + 0.75 * 0.7)).abs() < 1e-9);
    }

    #[test]
    fn empty_log_yields_empty_trend() {
        let log = SessionLog::new();
        let today = NaiveDate::from_ymd_opt(2026, 6, 1).unwrap();
        for window in [TrendWindow::LastWeek, TrendWindow::LastMonth, TrendWindow::AllTime] {
            assert!(accuracy_trend(&log, window, today).is_empty());
        }
    }

    #[test]
    fn single_session_today_is_one_bucket() {
        let today = NaiveDate::from_ymd_opt(2026, 6, 1).unwrap();
        let mut log = SessionLog::new();
        log.push(session_on(today, 8, 2));

        let trend = accuracy_trend(&log, TrendWindow::LastWeek, today);
        assert_eq!(trend.len(), 1);
        assert_eq!(trend[0].day, today);
        assert_eq!(trend[0].accuracy_percent, 80);
        assert_eq!(trend[0].total_attempts, 10);
    }

    #[test]
    fn window_cutoff_is_inclusive_of_the_oldest_day() {
        let today = NaiveDate::from_ymd_opt(2026, 6, 10).unwrap();
        let oldest_in = today - Duration::days(6);
        let just_out = today - Duration::days(7);

        let mut log = SessionLog::new();
        log.push(session_on(just_out, 5, 5));
        log.push(session_on(oldest_in, 3, 1));
        log.push(session_on(today, 9, 1));

        let trend = accuracy_trend(&log, TrendWindow::LastWeek, today);
        assert_eq!(trend.len(), 2);
        assert_eq!(trend[0].day, oldest_in);
        assert_eq!(trend[1].day, today);

        let all = accuracy_trend(&log, TrendWindow::AllTime, today);
        assert_eq!(all.len(), 3);
        assert_eq!(all[0].day, just_out);
    }

    #[test]
    fn zero_attempt_day_emits_zero_not_a_gap() {
        let today = NaiveDate::from_ymd_opt(2026, 6, 10).unwrap();
        let mut log = SessionLog::new();
        log.push(session_on(today, 0, 0));

        let trend = accuracy_trend(&log, TrendWindow::LastWeek, today);
        assert_eq!(trend.len(), 1);
        assert_eq!(trend[0].accuracy_percent, 0);
        assert_eq!(trend[0].total_attempts, 0);
    }

    #[test]
    fn same_day_sessions_sum_into_one_bucket() {
        let today = NaiveDate::from_ymd_opt(2026, 6, 10).unwrap();
        let mut log = SessionLog::new();
        log.push(session_on(today, 6, 4));
        log.push(session_on(today, 4, 0));

        let trend = accuracy_trend(&log, TrendWindow::AllTime, today);
        assert_eq!(trend.len(), 1);
        assert_eq!(trend[0].total_attempts, 14);
        // 10 of 14 correct -> 71.4% -> 71.
        assert_eq!(trend[0].accuracy_percent, 71);
    }
}
