use chrono::{DateTime, Utc};
use fret_schema::Achievement;

use crate::ledger::Ledger;
use crate::sessions::SessionLog;
use crate::streak::StreakTracker;

/// Read-only view the predicates evaluate against.
#[derive(Clone, Copy)]
pub struct EvalContext<'a> {
    pub ledger: &'a Ledger,
    pub sessions: &'a SessionLog,
    pub streak: &'a StreakTracker,
}

pub struct AchievementDef {
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    predicate: fn(&EvalContext<'_>) -> bool,
}

/// The fixed build-time catalog. Ids are part of the wire format; never reuse
/// or rename one.
pub const CATALOG: &[AchievementDef] = &[
    AchievementDef {
        id: "first_note",
        name: "First Note",
        description: "Answer your first fretboard prompt",
        predicate: |ctx| ctx.ledger.total_attempts() >= 1,
    },
    AchievementDef {
        id: "notes_100",
        name: "Warmed Up",
        description: "Answer 100 prompts",
        predicate: |ctx| ctx.ledger.total_attempts() >= 100,
    },
    AchievementDef {
        id: "notes_1000",
        name: "Woodshedder",
        description: "Answer 1,000 prompts",
        predicate: |ctx| ctx.ledger.total_attempts() >= 1000,
    },
    AchievementDef {
        id: "sharp_ear",
        name: "Sharp Ear",
        description: "Reach 90% overall accuracy over at least 50 answers",
        predicate: |ctx| {
            ctx.ledger.total_attempts() >= 50
                && ctx.ledger.overall_accuracy().is_some_and(|a| a >= 0.9)
        },
    },
    AchievementDef {
        id: "perfect_session",
        name: "Flawless",
        description: "Finish a session of 10+ answers with zero mistakes",
        predicate: |ctx| {
            ctx.sessions
                .records()
                .iter()
                .any(|r| r.incorrect == 0 && r.correct >= 10)
        },
    },
    AchievementDef {
        id: "marathon",
        name: "Marathon",
        description: "Complete 10 practice sessions",
        predicate: |ctx| ctx.sessions.len() >= 10,
    },
    AchievementDef {
        id: "dedicated",
        name: "Dedicated",
        description: "Complete 50 practice sessions",
        predicate: |ctx| ctx.sessions.len() >= 50,
    },
    AchievementDef {
        id: "streak_3",
        name: "Three In A Row",
        description: "Practice on 3 consecutive days",
        predicate: |ctx| ctx.streak.streak_days() >= 3,
    },
    AchievementDef {
        id: "streak_7",
        name: "Full Week",
        description: "Practice on 7 consecutive days",
        predicate: |ctx| ctx.streak.streak_days() >= 7,
    },
    AchievementDef {
        id: "streak_30",
        name: "Iron Month",
        description: "Practice on 30 consecutive days",
        predicate: |ctx| ctx.streak.streak_days() >= 30,
    },
    AchievementDef {
        id: "explorer",
        name: "Explorer",
        description: "Attempt 36 distinct fretboard positions",
        predicate: |ctx| ctx.ledger.attempted_positions() >= 36,
    },
];

pub fn is_known_id(id: &str) -> bool {
    CATALOG.iter().any(|def| def.id == id)
}

/// The full catalog with every entry locked.
pub fn catalog_locked() -> Vec<Achievement> {
    CATALOG
        .iter()
        .map(|def| Achievement {
            id: def.id.to_string(),
            name: def.name.to_string(),
            description: def.description.to_string(),
            unlocked_at: None,
        })
        .collect()
}

/// Reconcile a persisted achievement list against the catalog: unknown ids
/// are dropped, missing ids come back locked, and existing unlock timestamps
/// survive. Output is in catalog order.
pub fn reconcile(persisted: &[Achievement]) -> Vec<Achievement> {
    CATALOG
        .iter()
        .map(|def| {
            let unlocked_at = persisted
                .iter()
                .find(|a| a.id == def.id)
                .and_then(|a| a.unlocked_at);
            Achievement {
                id: def.id.to_string(),
                name: def.name.to_string(),
                description: def.description.to_string(),
                unlocked_at,
            }
        })
        .collect()
}

/// Evaluate every still-locked achievement against the current state and
/// stamp the ones whose predicate now holds. Returns newly unlocked ids.
///
/// Idempotent: an already-unlocked entry is skipped outright, so its
/// timestamp is never overwritten and it is never re-reported.
pub fn evaluate(
    ctx: &EvalContext<'_>,
    achievements: &mut [Achievement],
    now: DateTime<Utc>,
) -> Vec<String> {
    let mut newly_unlocked = Vec::new();
    for achievement in achievements.iter_mut() {
        if achievement.unlocked_at.is_some() {
            continue;
        }
        let Some(def) = CATALOG.iter().find(|d| d.id == achievement.id) else {
            continue;
        };
        if (def.predicate)(ctx) {
            achievement.unlocked_at = Some(now);
            newly_unlocked.push(achievement.id.clone());
        }
    }
    newly_unlocked
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use fret_schema::{Position, SessionRecord};

    fn now() -> DateTime<Utc> {
        "2026-05-10T09:00:00Z".parse().unwrap()
    }

    fn perfect_session(correct: u32) -> SessionRecord {
        let started = now() - Duration::minutes(10);
        SessionRecord {
            started_at: started,
            ended_at: Some(now()),
            correct,
            incorrect: 0,
            score: correct * 10,
            max_streak: correct,
        }
    }

    #[test]
    fn first_note_unlocks_after_one_answer() {
        let mut ledger = Ledger::new();
        let sessions = SessionLog::new();
        let streak = StreakTracker::new();
        let mut achievements = catalog_locked();

        let ctx = EvalContext { ledger: &ledger, sessions: &sessions, streak: &streak };
        assert!(evaluate(&ctx, &mut achievements, now()).is_empty());

        ledger.record(Position::new(0, 5), true);
        let ctx = EvalContext { ledger: &ledger, sessions: &sessions, streak: &streak };
        let unlocked = evaluate(&ctx, &mut achievements, now());
        assert_eq!(unlocked, vec!["first_note".to_string()]);
    }

    #[test]
    fn evaluation_is_idempotent_and_timestamps_are_immutable() {
        let mut ledger = Ledger::new();
        ledger.record(Position::new(1, 1), false);
        let sessions = SessionLog::new();
        let streak = StreakTracker::new();
        let mut achievements = catalog_locked();

        let ctx = EvalContext { ledger: &ledger, sessions: &sessions, streak: &streak };
        let first = evaluate(&ctx, &mut achievements, now());
        assert_eq!(first, vec!["first_note".to_string()]);
        let stamped = achievements[0].unlocked_at;

        let later = now() + Duration::hours(2);
        let again = evaluate(&ctx, &mut achievements, later);
        assert!(again.is_empty());
        assert_eq!(achievements[0].unlocked_at, stamped);
    }

    #[test]
    fn perfect_session_requires_ten_correct() {
        let ledger = Ledger::new();
        let streak = StreakTracker::new();
        let mut achievements = catalog_locked();

        let mut sessions = SessionLog::new();
        sessions.push(perfect_session(9));
        let ctx = EvalContext { ledger: &ledger, sessions: &sessions, streak: &streak };
        let unlocked = evaluate(&ctx, &mut achievements, now());
        assert!(!unlocked.contains(&"perfect_session".to_string()));

        sessions.push(perfect_session(10));
        let ctx = EvalContext { ledger: &ledger, sessions: &sessions, streak: &streak };
        let unlocked = evaluate(&ctx, &mut achievements, now());
        assert!(unlocked.contains(&"perfect_session".to_string()));
    }

    #[test]
    fn streak_milestones_unlock_in_order() {
        let ledger = Ledger::new();
        let sessions = SessionLog::new();
        let mut achievements = catalog_locked();

        let streak = StreakTracker::from_parts(7, 0, None, None);
        let ctx = EvalContext { ledger: &ledger, sessions: &sessions, streak: &streak };
        let unlocked = evaluate(&ctx, &mut achievements, now());
        assert!(unlocked.contains(&"streak_3".to_string()));
        assert!(unlocked.contains(&"streak_7".to_string()));
        assert!(!unlocked.contains(&"streak_30".to_string()));
    }

    #[test]
    fn reconcile_drops_unknown_and_restores_missing() {
        let mut persisted = vec![Achievement {
            id: "first_note".to_string(),
            name: "First Note".to_string(),
            description: String::new(),
            unlocked_at: Some(now()),
        }];
        persisted.push(Achievement {
            id: "from_the_future".to_string(),
            name: "???".to_string(),
            description: String::new(),
            unlocked_at: Some(now()),
        });

        let reconciled = reconcile(&persisted);
        assert_eq!(reconciled.len(), CATALOG.len());
        assert!(reconciled.iter().all(|a| is_known_id(&a.id)));
        let first = reconciled.iter().find(|a| a.id == "first_note").unwrap();
        assert_eq!(first.unlocked_at, Some(now()));
        let marathon = reconciled.iter().find(|a| a.id == "marathon").unwrap();
        assert_eq!(marathon.unlocked_at, None);
    }
}
