//! Inline button payloads.
//!
//! Every button carries an [`Action`] encoded as `verb[:id][:arg]`. Button
//! presses are decoded once, at the gateway boundary.

use chrono::Weekday;
use nudge_store::reminder::weekday_from_index;
use nudge_store::RepeatKind;

/// How far a snooze moves a reminder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnoozeBy {
    Minutes(u32),
    /// Same time on the next day.
    Tomorrow,
}

impl SnoozeBy {
    pub fn minutes(&self) -> i64 {
        match self {
            Self::Minutes(m) => i64::from(*m),
            Self::Tomorrow => 24 * 60,
        }
    }
}

/// A decoded inline button press.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Main menu.
    Start,
    /// Start the creation wizard.
    Create,
    /// Reminder list page (zero-based).
    ListPage(usize),
    /// The page counter button; does nothing.
    Noop,
    View(i64),
    DeleteConfirm(i64),
    DeleteYes(i64),
    /// Complete from the control panel.
    DoneNow(i64),
    /// Acknowledge from a notification.
    Done(i64),
    SnoozeMenu(i64),
    Snooze(i64, SnoozeBy),

    /// Creation wizard: repeat type picked.
    Repeat(RepeatKind),
    /// Creation wizard: daily interval picked.
    Interval(u32),
    /// Creation wizard: back from the interval picker to the repeat menu.
    IntervalBack,
    /// Creation wizard: weekday toggled.
    Day(Weekday),
    DaysDone,
    /// Creation wizard: back from the weekday picker to the repeat menu.
    DaysCancel,

    EditText(i64),
    EditTime(i64),
    /// Open the repeat-type menu for a reminder.
    EditRepeat(i64),
    EditRepeatKind(i64, RepeatKind),
    EditInterval(i64, u32),
    EditDay(i64, Weekday),
    EditDaysDone(i64),
    EditDaysCancel(i64),
}

/// Longest daily interval accepted from a button.
const MAX_INTERVAL_DAYS: u32 = 365;

impl Action {
    pub fn encode(&self) -> String {
        match self {
            Self::Start => "start".to_string(),
            Self::Create => "create".to_string(),
            Self::ListPage(page) => format!("list:{page}"),
            Self::Noop => "noop".to_string(),
            Self::View(id) => format!("view:{id}"),
            Self::DeleteConfirm(id) => format!("del:{id}"),
            Self::DeleteYes(id) => format!("del_yes:{id}"),
            Self::DoneNow(id) => format!("done_now:{id}"),
            Self::Done(id) => format!("done:{id}"),
            Self::SnoozeMenu(id) => format!("snooze_menu:{id}"),
            Self::Snooze(id, SnoozeBy::Minutes(m)) => format!("snooze:{id}:{m}"),
            Self::Snooze(id, SnoozeBy::Tomorrow) => format!("snooze:{id}:tomorrow"),
            Self::Repeat(kind) => format!("repeat:{}", kind.as_str()),
            Self::Interval(days) => format!("interval:{days}"),
            Self::IntervalBack => "interval_back".to_string(),
            Self::Day(day) => format!("day:{}", day.num_days_from_monday()),
            Self::DaysDone => "days_done".to_string(),
            Self::DaysCancel => "days_cancel".to_string(),
            Self::EditText(id) => format!("edit_text:{id}"),
            Self::EditTime(id) => format!("edit_time:{id}"),
            Self::EditRepeat(id) => format!("edit_repeat:{id}"),
            Self::EditRepeatKind(id, kind) => format!("edit_kind:{id}:{}", kind.as_str()),
            Self::EditInterval(id, days) => format!("edit_interval:{id}:{days}"),
            Self::EditDay(id, day) => format!("edit_day:{id}:{}", day.num_days_from_monday()),
            Self::EditDaysDone(id) => format!("edit_days_done:{id}"),
            Self::EditDaysCancel(id) => format!("edit_days_cancel:{id}"),
        }
    }

    /// Decode button data. Returns `None` for anything this version does not emit.
    pub fn decode(data: &str) -> Option<Self> {
        let mut parts = data.split(':');
        let verb = parts.next()?;
        let a = parts.next();
        let b = parts.next();
        if parts.next().is_some() {
            return None;
        }

        let action = match (verb, a, b) {
            ("start", None, None) => Self::Start,
            ("create", None, None) => Self::Create,
            ("list", Some(p), None) => Self::ListPage(p.parse().ok()?),
            ("noop", None, None) => Self::Noop,
            ("view", Some(id), None) => Self::View(id.parse().ok()?),
            ("del", Some(id), None) => Self::DeleteConfirm(id.parse().ok()?),
            ("del_yes", Some(id), None) => Self::DeleteYes(id.parse().ok()?),
            ("done_now", Some(id), None) => Self::DoneNow(id.parse().ok()?),
            ("done", Some(id), None) => Self::Done(id.parse().ok()?),
            ("snooze_menu", Some(id), None) => Self::SnoozeMenu(id.parse().ok()?),
            ("snooze", Some(id), Some(by)) => Self::Snooze(id.parse().ok()?, snooze_by(by)?),
            ("repeat", Some(kind), None) => Self::Repeat(RepeatKind::parse(kind)?),
            ("interval", Some(days), None) => Self::Interval(interval(days)?),
            ("interval_back", None, None) => Self::IntervalBack,
            ("day", Some(d), None) => Self::Day(weekday(d)?),
            ("days_done", None, None) => Self::DaysDone,
            ("days_cancel", None, None) => Self::DaysCancel,
            ("edit_text", Some(id), None) => Self::EditText(id.parse().ok()?),
            ("edit_time", Some(id), None) => Self::EditTime(id.parse().ok()?),
            ("edit_repeat", Some(id), None) => Self::EditRepeat(id.parse().ok()?),
            ("edit_kind", Some(id), Some(kind)) => {
                Self::EditRepeatKind(id.parse().ok()?, RepeatKind::parse(kind)?)
            }
            ("edit_interval", Some(id), Some(days)) => {
                Self::EditInterval(id.parse().ok()?, interval(days)?)
            }
            ("edit_day", Some(id), Some(d)) => Self::EditDay(id.parse().ok()?, weekday(d)?),
            ("edit_days_done", Some(id), None) => Self::EditDaysDone(id.parse().ok()?),
            ("edit_days_cancel", Some(id), None) => Self::EditDaysCancel(id.parse().ok()?),
            _ => return None,
        };
        Some(action)
    }
}

fn snooze_by(s: &str) -> Option<SnoozeBy> {
    if s == "tomorrow" {
        return Some(SnoozeBy::Tomorrow);
    }
    let minutes: u32 = s.parse().ok()?;
    (1..=24 * 60).contains(&minutes).then_some(SnoozeBy::Minutes(minutes))
}

fn interval(s: &str) -> Option<u32> {
    let days: u32 = s.parse().ok()?;
    (1..=MAX_INTERVAL_DAYS).contains(&days).then_some(days)
}

fn weekday(s: &str) -> Option<Weekday> {
    weekday_from_index(s.parse().ok()?)
}
