use chrono::NaiveDate;

/// Maximum number of freeze tokens held at once. `grant_freeze` clamps here.
pub const MAX_HELD_FREEZES: u32 = 2;

/// What a practice event did to the streak.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreakUpdate {
    /// First recorded practice ever, or a restart after a broken streak.
    Started,
    /// Already practiced today; nothing changed.
    SameDay,
    /// Practiced on the day right after the previous one.
    Extended,
    /// A single missed day was bridged by consuming a freeze.
    FrozenBridge,
}

/// Daily practice-streak counter with freeze grace tokens.
///
/// Works at calendar-day granularity. The tracker only ever consumes freezes;
/// granting is an external policy (the store grants on streak milestones).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StreakTracker {
    streak_days: u32,
    streak_freezes: u32,
    last_freeze_date: Option<NaiveDate>,
    last_practice_date: Option<NaiveDate>,
}

impl StreakTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_parts(
        streak_days: u32,
        streak_freezes: u32,
        last_freeze_date: Option<NaiveDate>,
        last_practice_date: Option<NaiveDate>,
    ) -> Self {
        Self {
            streak_days,
            streak_freezes: streak_freezes.min(MAX_HELD_FREEZES),
            last_freeze_date,
            last_practice_date,
        }
    }

    /// Apply one practice event dated `today`.
    ///
    /// A gap of exactly one missed day is bridged by consuming a freeze when
    /// one is available; any larger gap, or a gap with no freeze left, resets
    /// the streak to 1. Days earlier than the last recorded practice (a clock
    /// stepping backwards) are treated as a same-day repeat.
    pub fn record_practice(&mut self, today: NaiveDate) -> StreakUpdate {
        let update = match self.last_practice_date {
            None => {
                self.streak_days = 1;
                StreakUpdate::Started
            }
            Some(last) => match (today - last).num_days() {
                d if d <= 0 => return StreakUpdate::SameDay,
                1 => {
                    self.streak_days += 1;
                    StreakUpdate::Extended
                }
                2 if self.streak_freezes > 0 && self.last_freeze_date != Some(today) => {
                    self.streak_freezes -= 1;
                    self.last_freeze_date = Some(today);
                    self.streak_days += 1;
                    StreakUpdate::FrozenBridge
                }
                _ => {
                    self.streak_days = 1;
                    StreakUpdate::Started
                }
            },
        };
        self.last_practice_date = Some(today);
        update
    }

    /// Add one freeze token, clamped at [`MAX_HELD_FREEZES`]. Returns whether
    /// a token was actually granted.
    pub fn grant_freeze(&mut self) -> bool {
        if self.streak_freezes < MAX_HELD_FREEZES {
            self.streak_freezes += 1;
            true
        } else {
            false
        }
    }

    pub fn streak_days(&self) -> u32 {
        self.streak_days
    }

    pub fn streak_freezes(&self) -> u32 {
        self.streak_freezes
    }

    pub fn last_freeze_date(&self) -> Option<NaiveDate> {
        self.last_freeze_date
    }

    pub fn last_practice_date(&self) -> Option<NaiveDate> {
        self.last_practice_date
    }
}
