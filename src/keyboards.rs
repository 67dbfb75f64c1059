//! Keyboards attached to bot messages.

use crate::callback::{Action, SnoozeBy};
use crate::render::{fmt_short, interval_label, preview, short_day_name, status_emoji};
use chrono::{NaiveDateTime, Weekday};
use nudge_core::message::{InlineButton, Markup};
use nudge_store::{DaySet, Reminder, RepeatKind};

pub const BTN_CREATE: &str = "Create reminder";
pub const BTN_LIST: &str = "My reminders";
pub const BTN_UPCOMING: &str = "Upcoming";
pub const BTN_RECURRING: &str = "🔄 Recurring";
pub const BTN_HELP: &str = "Help";

/// Intervals offered by the daily picker, in days.
pub const INTERVALS: [u32; 6] = [1, 2, 3, 7, 14, 30];

const WEEK: [Weekday; 7] = [
    Weekday::Mon,
    Weekday::Tue,
    Weekday::Wed,
    Weekday::Thu,
    Weekday::Fri,
    Weekday::Sat,
    Weekday::Sun,
];

fn button(text: impl Into<String>, action: Action) -> InlineButton {
    InlineButton::new(text, action.encode())
}

fn back() -> InlineButton {
    button("🔙", Action::Start)
}

/// Persistent menu under the input field.
pub fn main_menu() -> Markup {
    Markup::Reply {
        rows: vec![
            vec![BTN_CREATE.to_string(), BTN_LIST.to_string()],
            vec![
                BTN_UPCOMING.to_string(),
                BTN_RECURRING.to_string(),
                BTN_HELP.to_string(),
            ],
        ],
        placeholder: Some("Choose an action...".to_string()),
    }
}

/// Number of pages needed for `total` items (at least one).
pub fn page_count(total: usize, page_size: usize) -> usize {
    total.div_ceil(page_size.max(1)).max(1)
}

/// One button per reminder on `page`, then navigation, then back.
///
/// `page` must already be clamped to the page range.
pub fn reminder_list(
    reminders: &[Reminder],
    page: usize,
    page_size: usize,
    now: NaiveDateTime,
) -> Markup {
    let page_size = page_size.max(1);
    let pages = page_count(reminders.len(), page_size);

    let mut rows: Vec<Vec<InlineButton>> = reminders
        .iter()
        .skip(page * page_size)
        .take(page_size)
        .map(|r| {
            let mut label = format!(
                "{} {} {}",
                status_emoji(r, now),
                fmt_short(r.time),
                preview(&r.text)
            );
            if r.repeat.is_recurring() {
                label.push_str(" 🔄");
            }
            vec![button(label, Action::View(r.id))]
        })
        .collect();

    let mut nav = Vec::new();
    if page > 0 {
        nav.push(button("◀️ Back", Action::ListPage(page - 1)));
    }
    nav.push(button(format!("{}/{pages}", page + 1), Action::Noop));
    if page + 1 < pages {
        nav.push(button("Next ▶️", Action::ListPage(page + 1)));
    }
    rows.push(nav);
    rows.push(vec![back()]);
    Markup::Inline(rows)
}

pub fn empty_list() -> Markup {
    Markup::Inline(vec![
        vec![button("Create reminder", Action::Create)],
        vec![back()],
    ])
}

/// "To list" and back.
pub fn to_list() -> Markup {
    Markup::Inline(vec![vec![
        button("📋 To list", Action::ListPage(0)),
        back(),
    ]])
}

/// Recurring series with a button to open each.
pub fn series_list(roots: &[Reminder]) -> Markup {
    let mut rows: Vec<Vec<InlineButton>> = roots
        .iter()
        .map(|r| vec![button(format!("🔄 {}", preview(&r.text)), Action::View(r.id))])
        .collect();
    rows.push(vec![button("📋 All reminders", Action::ListPage(0))]);
    rows.push(vec![back()]);
    Markup::Inline(rows)
}

/// Buttons under the upcoming view.
pub fn upcoming() -> Markup {
    Markup::Inline(vec![
        vec![button("📋 All reminders", Action::ListPage(0))],
        vec![back()],
    ])
}

pub fn control_panel(id: i64) -> Markup {
    Markup::Inline(vec![
        vec![
            button("📝 Edit text", Action::EditText(id)),
            button("⏰ Edit time", Action::EditTime(id)),
        ],
        vec![
            button("🔄 Edit repeat", Action::EditRepeat(id)),
            button("❌ Delete", Action::DeleteConfirm(id)),
        ],
        vec![
            button("✅ Complete now", Action::DoneNow(id)),
            button("⏰ Snooze", Action::SnoozeMenu(id)),
        ],
        vec![button("📋 To list", Action::ListPage(0)), back()],
    ])
}

pub fn delete_confirm(id: i64) -> Markup {
    Markup::Inline(vec![vec![
        button("✅ Yes, delete", Action::DeleteYes(id)),
        button("❌ No, cancel", Action::View(id)),
    ]])
}

/// Repeat-type menu. `target` is the reminder being edited, `None` while creating.
pub fn repeat_picker(target: Option<i64>) -> Markup {
    let pick = |label: &str, kind: RepeatKind| match target {
        Some(id) => button(label, Action::EditRepeatKind(id, kind)),
        None => button(label, Action::Repeat(kind)),
    };
    let mut rows = vec![
        vec![
            pick("📌 Once", RepeatKind::Once),
            pick("📅 Daily", RepeatKind::Daily),
        ],
        vec![
            pick("🗓️ Weekly", RepeatKind::Weekly),
            pick("📆 Pick days", RepeatKind::Custom),
        ],
    ];
    rows.push(match target {
        Some(id) => vec![button("🔙", Action::View(id))],
        None => vec![button("⏭️ Skip", Action::Repeat(RepeatKind::Once))],
    });
    Markup::Inline(rows)
}

/// Daily interval picker, two per row.
pub fn interval_picker(target: Option<i64>) -> Markup {
    let mut rows: Vec<Vec<InlineButton>> = INTERVALS
        .chunks(2)
        .map(|pair| {
            pair.iter()
                .map(|&days| {
                    let action = match target {
                        Some(id) => Action::EditInterval(id, days),
                        None => Action::Interval(days),
                    };
                    button(interval_label(days), action)
                })
                .collect()
        })
        .collect();
    rows.push(vec![match target {
        Some(id) => button("🔙", Action::EditRepeat(id)),
        None => button("🔙", Action::IntervalBack),
    }]);
    Markup::Inline(rows)
}

/// Weekday toggles (✅ selected, ◻️ not), then Done and Cancel.
pub fn day_picker(selected: DaySet, target: Option<i64>) -> Markup {
    let mut rows: Vec<Vec<InlineButton>> = WEEK
        .chunks(2)
        .map(|pair| {
            pair.iter()
                .map(|&day| {
                    let mark = if selected.contains(day) { "✅" } else { "◻️" };
                    let action = match target {
                        Some(id) => Action::EditDay(id, day),
                        None => Action::Day(day),
                    };
                    button(format!("{mark} {}", short_day_name(day)), action)
                })
                .collect()
        })
        .collect();
    let (done, cancel) = match target {
        Some(id) => (Action::EditDaysDone(id), Action::EditDaysCancel(id)),
        None => (Action::DaysDone, Action::DaysCancel),
    };
    rows.push(vec![button("✅ Done", done), button("❌ Cancel", cancel)]);
    Markup::Inline(rows)
}

/// Buttons under a delivered notification.
pub fn notification(id: i64) -> Markup {
    Markup::Inline(vec![vec![
        button("✅ Done", Action::Done(id)),
        button("⏰ Snooze", Action::SnoozeMenu(id)),
    ]])
}

pub fn snooze_options(id: i64) -> Markup {
    let by = |label: &str, by: SnoozeBy| button(label, Action::Snooze(id, by));
    Markup::Inline(vec![
        vec![
            by("5 min", SnoozeBy::Minutes(5)),
            by("15 min", SnoozeBy::Minutes(15)),
            by("30 min", SnoozeBy::Minutes(30)),
        ],
        vec![
            by("1 hour", SnoozeBy::Minutes(60)),
            by("2 hours", SnoozeBy::Minutes(120)),
            by("Tomorrow", SnoozeBy::Tomorrow),
        ],
        vec![button("🔙", Action::View(id))],
    ])
}
