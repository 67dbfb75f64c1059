//! Reminder model: rows, repeat rules and the inputs/outputs of store operations.

use chrono::{Datelike, Duration, NaiveDateTime, Weekday};

/// Storage format for all timestamps (naive local time).
pub const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// How a reminder repeats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RepeatKind {
    #[default]
    Once,
    /// Every `interval` days.
    Daily,
    /// Every 7 days, on the weekday of the first occurrence.
    Weekly,
    /// On each weekday in the day set.
    Custom,
}

impl RepeatKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Once => "once",
            Self::Daily => "daily",
            Self::Weekly => "weekly",
            Self::Custom => "custom",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "once" => Some(Self::Once),
            "daily" => Some(Self::Daily),
            "weekly" => Some(Self::Weekly),
            "custom" => Some(Self::Custom),
            _ => None,
        }
    }
}

/// A set of weekdays, Monday = bit 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DaySet(u8);

impl DaySet {
    pub fn empty() -> Self {
        Self(0)
    }

    pub fn single(day: Weekday) -> Self {
        let mut set = Self::empty();
        set.insert(day);
        set
    }

    pub fn insert(&mut self, day: Weekday) {
        self.0 |= 1 << day.num_days_from_monday();
    }

    /// Flip membership of `day`.
    pub fn toggle(&mut self, day: Weekday) {
        self.0 ^= 1 << day.num_days_from_monday();
    }

    pub fn contains(&self, day: Weekday) -> bool {
        self.0 & (1 << day.num_days_from_monday()) != 0
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    pub fn len(&self) -> usize {
        self.0.count_ones() as usize
    }

    /// Members in Monday-first order.
    pub fn iter(&self) -> impl Iterator<Item = Weekday> + '_ {
        (0u8..7)
            .filter(move |i| self.0 & (1 << i) != 0)
            .filter_map(weekday_from_index)
    }

    /// Sorted comma-separated weekday indices, e.g. `"0,2,4"`.
    pub fn encode(&self) -> String {
        self.iter()
            .map(|d| d.num_days_from_monday().to_string())
            .collect::<Vec<_>>()
            .join(",")
    }

    /// Parse the stored form. Unknown entries are skipped.
    pub fn decode(s: &str) -> Self {
        let mut set = Self::empty();
        for day in s
            .split(',')
            .filter_map(|part| part.trim().parse::<u8>().ok())
            .filter_map(weekday_from_index)
        {
            set.insert(day);
        }
        set
    }
}

/// Weekday for an index where 0 = Monday.
pub fn weekday_from_index(i: u8) -> Option<Weekday> {
    match i {
        0 => Some(Weekday::Mon),
        1 => Some(Weekday::Tue),
        2 => Some(Weekday::Wed),
        3 => Some(Weekday::Thu),
        4 => Some(Weekday::Fri),
        5 => Some(Weekday::Sat),
        6 => Some(Weekday::Sun),
        _ => None,
    }
}

/// Full repeat rule of a reminder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RepeatSpec {
    pub kind: RepeatKind,
    /// Meaningful for `Weekly` and `Custom`.
    pub days: DaySet,
    /// Days between occurrences, meaningful for `Daily`. Always >= 1.
    pub interval: u32,
}

impl Default for RepeatSpec {
    fn default() -> Self {
        Self::once()
    }
}

impl RepeatSpec {
    pub fn once() -> Self {
        Self {
            kind: RepeatKind::Once,
            days: DaySet::empty(),
            interval: 1,
        }
    }

    pub fn daily(interval: u32) -> Self {
        Self {
            kind: RepeatKind::Daily,
            days: DaySet::empty(),
            interval: interval.max(1),
        }
    }

    /// Weekly on the weekday of `first`.
    pub fn weekly(first: NaiveDateTime) -> Self {
        Self {
            kind: RepeatKind::Weekly,
            days: DaySet::single(first.weekday()),
            interval: 1,
        }
    }

    pub fn custom(days: DaySet) -> Self {
        Self {
            kind: RepeatKind::Custom,
            days,
            interval: 1,
        }
    }

    pub fn is_recurring(&self) -> bool {
        self.kind != RepeatKind::Once
    }

    /// The occurrence that follows one at `time`, advanced until strictly after `now`.
    ///
    /// Returns `None` for one-off reminders and for custom rules with no days.
    pub fn next_after(&self, time: NaiveDateTime, now: NaiveDateTime) -> Option<NaiveDateTime> {
        match self.kind {
            RepeatKind::Once => None,
            RepeatKind::Daily => Some(step_past(
                time,
                Duration::days(i64::from(self.interval.max(1))),
                now,
            )),
            RepeatKind::Weekly => Some(step_past(time, Duration::days(7), now)),
            RepeatKind::Custom => {
                if self.days.is_empty() {
                    return None;
                }
                // Never earlier than the day after `time`; skip whole days already behind `now`.
                let mut date = (time.date() + Duration::days(1)).max(now.date());
                loop {
                    let candidate = date.and_time(time.time());
                    if self.days.contains(date.weekday()) && candidate > now {
                        return Some(candidate);
                    }
                    date += Duration::days(1);
                }
            }
        }
    }
}

/// `time + step`, then whole further steps until the result is after `now`.
fn step_past(time: NaiveDateTime, step: Duration, now: NaiveDateTime) -> NaiveDateTime {
    let mut next = time + step;
    if next <= now {
        let behind = (now - next).num_seconds() / step.num_seconds();
        next += step * behind as i32;
        while next <= now {
            next += step;
        }
    }
    next
}

/// A stored reminder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reminder {
    pub id: i64,
    pub user_id: i64,
    pub user_name: String,
    pub text: String,
    pub time: NaiveDateTime,
    pub created_at: NaiveDateTime,
    pub is_active: bool,
    /// Delivered and not yet acted upon.
    pub sent: bool,
    pub postponed_count: i64,
    pub repeat: RepeatSpec,
    /// Series root this row is an occurrence of.
    pub original_id: Option<i64>,
}

impl Reminder {
    /// Recurring row with no parent: owns the repeat definition.
    pub fn is_series_root(&self) -> bool {
        self.repeat.is_recurring() && self.original_id.is_none()
    }

    /// Id of the series this row belongs to (its own id for roots).
    pub fn series_id(&self) -> i64 {
        self.original_id.unwrap_or(self.id)
    }

    /// Active, unsent and already past its time.
    pub fn is_overdue(&self, now: NaiveDateTime) -> bool {
        self.is_active && !self.sent && self.time < now
    }
}

/// Input for [`crate::Store::create`].
#[derive(Debug, Clone)]
pub struct NewReminder {
    pub user_id: i64,
    pub user_name: String,
    pub text: String,
    pub time: NaiveDateTime,
    pub repeat: RepeatSpec,
    pub original_id: Option<i64>,
}

/// Partial update; `None` fields are left untouched.
#[derive(Debug, Clone, Default)]
pub struct ReminderUpdate {
    pub text: Option<String>,
    pub time: Option<NaiveDateTime>,
    pub repeat: Option<RepeatSpec>,
    pub is_active: Option<bool>,
    pub sent: Option<bool>,
}

impl ReminderUpdate {
    pub fn is_empty(&self) -> bool {
        self.text.is_none()
            && self.time.is_none()
            && self.repeat.is_none()
            && self.is_active.is_none()
            && self.sent.is_none()
    }
}

/// What happened to each reminder handled by one scheduler tick.
#[derive(Debug, Clone, Default)]
pub struct DeliveryReport {
    /// Reminders whose notification went out.
    pub delivered: Vec<i64>,
    /// Reminders whose owner can no longer be reached.
    pub unreachable: Vec<i64>,
}

impl DeliveryReport {
    pub fn is_empty(&self) -> bool {
        self.delivered.is_empty() && self.unreachable.is_empty()
    }
}

/// Row counts from [`crate::Store::apply_delivery`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeliveryOutcome {
    pub marked_sent: u64,
    pub spawned: u64,
    /// Delivered occurrences left unacknowledged when their successor was spawned.
    pub retired: u64,
    pub deactivated: u64,
    pub purged: u64,
}
