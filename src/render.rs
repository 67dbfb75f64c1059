//! Message texts. Pure functions of the reminders and the current time.

use crate::timeparse::FORMAT_HINT;
use chrono::{Datelike, NaiveDateTime, Weekday};
use nudge_store::{Reminder, RepeatKind, RepeatSpec};

/// How many reminders the upcoming view lists.
pub const UPCOMING_LIMIT: usize = 3;

/// Characters of reminder text shown on a list button.
const PREVIEW_CHARS: usize = 15;

pub fn day_name(day: Weekday) -> &'static str {
    match day {
        Weekday::Mon => "Monday",
        Weekday::Tue => "Tuesday",
        Weekday::Wed => "Wednesday",
        Weekday::Thu => "Thursday",
        Weekday::Fri => "Friday",
        Weekday::Sat => "Saturday",
        Weekday::Sun => "Sunday",
    }
}

pub fn short_day_name(day: Weekday) -> &'static str {
    &day_name(day)[..3]
}

/// Escape user text for Telegram's legacy Markdown.
pub fn escape_md(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(c, '_' | '*' | '`' | '[') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// `25.12.2026 15:45`
pub fn fmt_time(t: NaiveDateTime) -> String {
    t.format("%d.%m.%Y %H:%M").to_string()
}

/// `25.12 15:45`
pub fn fmt_short(t: NaiveDateTime) -> String {
    t.format("%d.%m %H:%M").to_string()
}

/// First characters of the text, with an ellipsis when cut.
pub fn preview(text: &str) -> String {
    if text.chars().count() > PREVIEW_CHARS {
        let head: String = text.chars().take(PREVIEW_CHARS).collect();
        format!("{head}...")
    } else {
        text.to_string()
    }
}

/// `1d 2h 5m`, or "less than a minute".
pub fn time_left(target: NaiveDateTime, now: NaiveDateTime) -> String {
    let mins = (target - now).num_minutes().max(0);
    let (days, hours, minutes) = (mins / 1440, (mins % 1440) / 60, mins % 60);
    let mut parts = Vec::new();
    if days > 0 {
        parts.push(format!("{days}d"));
    }
    if hours > 0 {
        parts.push(format!("{hours}h"));
    }
    if minutes > 0 {
        parts.push(format!("{minutes}m"));
    }
    if parts.is_empty() {
        "less than a minute".to_string()
    } else {
        parts.join(" ")
    }
}

pub fn status_emoji(r: &Reminder, now: NaiveDateTime) -> &'static str {
    if r.sent {
        "✅"
    } else if r.is_overdue(now) {
        "⚠️"
    } else if !r.is_active {
        "❌"
    } else {
        "⏳"
    }
}

pub fn interval_label(days: u32) -> String {
    match days {
        1 => "Every day".to_string(),
        7 => "Once a week".to_string(),
        14 => "Every 2 weeks".to_string(),
        30 => "Once a month".to_string(),
        n => format!("Every {n} days"),
    }
}

pub fn repeat_description(spec: &RepeatSpec) -> String {
    match spec.kind {
        RepeatKind::Once => "Once".to_string(),
        RepeatKind::Daily => interval_label(spec.interval),
        RepeatKind::Weekly => match spec.days.iter().next() {
            Some(day) => format!("Every {}", day_name(day)),
            None => "Every week".to_string(),
        },
        RepeatKind::Custom => {
            let days: Vec<&str> = spec.days.iter().map(short_day_name).collect();
            format!("On {}", days.join(", "))
        }
    }
}

fn urgency(target: NaiveDateTime, now: NaiveDateTime) -> &'static str {
    let mins = (target - now).num_minutes();
    if mins < 60 {
        "🔴"
    } else if mins < 180 {
        "🟠"
    } else {
        "🟢"
    }
}

pub fn welcome(name: &str) -> String {
    let greeting = if name.is_empty() {
        "👋 Hi!".to_string()
    } else {
        format!("👋 Hi, {}!", escape_md(name))
    };
    format!(
        "{greeting}\n\n\
         I keep track of your reminders.\n\n\
         🌟 *What I can do:*\n\
         • one-off and recurring reminders\n\
         • list, edit and delete reminders\n\
         • show the three nearest reminders\n\
         • notify you on time, with snooze\n\n\
         Start with «Create reminder» or «My reminders»."
    )
}

pub fn help() -> String {
    format!(
        "💭 *Help*\n\n\
         *Menu buttons:*\n\
         • Create reminder - add a new reminder\n\
         • My reminders - all reminders, tap one to manage it\n\
         • Upcoming - the three nearest reminders\n\
         • 🔄 Recurring - recurring reminders\n\n\
         *Managing a reminder:*\n\
         📝 Edit text, ⏰ Edit time, 🔄 Edit repeat\n\
         ❌ Delete, ✅ Complete now, ⏰ Snooze\n\n\
         *Time formats:*\n{FORMAT_HINT}\n\n\
         Clock times that already passed today are set for tomorrow.\n\n\
         *Commands:* /start /list /upcoming /repeating /help"
    )
}

pub fn main_menu() -> String {
    "🏠 Main menu. Use the buttons below.".to_string()
}

pub fn didnt_understand() -> String {
    "🤔 I didn't understand that. Use the menu buttons below or /help.".to_string()
}

pub fn empty_list() -> String {
    "💭 You have no active reminders yet.".to_string()
}

pub fn list_header(reminders: &[Reminder], now: NaiveDateTime) -> String {
    let overdue = reminders.iter().filter(|r| r.is_overdue(now)).count();
    let pending = reminders
        .iter()
        .filter(|r| !r.sent && !r.is_overdue(now))
        .count();

    let mut status = String::new();
    if overdue > 0 {
        status.push_str(&format!("⚠️ Overdue: {overdue}\n"));
    }
    if pending > 0 {
        status.push_str(&format!("⏳ Pending: {pending}\n"));
    }
    format!(
        "💭 *Your reminders*\n\n{status}Total: {}\n\n✨ Pick a reminder to manage it:",
        reminders.len()
    )
}

pub fn details(r: &Reminder, now: NaiveDateTime) -> String {
    let mut status = if r.sent {
        "✅ *Delivered*".to_string()
    } else if !r.is_active {
        "❌ *Inactive*".to_string()
    } else if r.time < now {
        "⚠️ *Overdue*".to_string()
    } else {
        format!("⏳ *Pending*\n⏱️ *In:* {}", time_left(r.time, now))
    };
    if r.repeat.is_recurring() {
        status.push_str(&format!(
            "\n🔄 *Repeat:* {}",
            repeat_description(&r.repeat)
        ));
    }
    if r.postponed_count > 0 {
        status.push_str(&format!("\n⏰ *Snoozed:* {} times", r.postponed_count));
    }
    format!(
        "💭 *Reminder details*\n\n{status}\n\n📝 *Text:* {}\n⏰ *Time:* {}\n\n🌟 *Choose an action:*",
        escape_md(&r.text),
        fmt_time(r.time)
    )
}

/// The nearest reminders that are still ahead, with urgency markers.
///
/// `reminders` must be sorted by time. Returns `None` when nothing is ahead.
pub fn upcoming(reminders: &[Reminder], now: NaiveDateTime) -> Option<String> {
    let ahead: Vec<&Reminder> = reminders.iter().filter(|r| r.time >= now).collect();
    if ahead.is_empty() {
        return None;
    }

    let mut out = "✨ *Next reminders:*\n\n".to_string();
    for (i, r) in ahead.iter().take(UPCOMING_LIMIT).enumerate() {
        let snoozed = if r.postponed_count > 0 {
            format!(" (snoozed {} times)", r.postponed_count)
        } else {
            String::new()
        };
        out.push_str(&format!(
            "{} *{}.* {}{snoozed}\n   🕐 {}\n   ⏱️ In: {}\n\n",
            urgency(r.time, now),
            i + 1,
            escape_md(&r.text),
            fmt_time(r.time),
            time_left(r.time, now)
        ));
    }
    if ahead.len() > UPCOMING_LIMIT {
        out.push_str(&format!(
            "💭 And {} more...",
            ahead.len() - UPCOMING_LIMIT
        ));
    }
    Some(out.trim_end().to_string())
}

pub fn series(roots: &[Reminder]) -> String {
    let mut out = "🔄 *Recurring reminders:*\n\n".to_string();
    for (i, r) in roots.iter().enumerate() {
        out.push_str(&format!(
            "*{}.* {}\n   🕐 {}\n   🔄 {}\n\n",
            i + 1,
            escape_md(&r.text),
            r.time.format("%H:%M"),
            repeat_description(&r.repeat)
        ));
    }
    out.push_str(&format!("📊 *Total recurring:* {}", roots.len()));
    out
}

pub fn notification(r: &Reminder) -> String {
    let mut out = "💭 *Reminder*".to_string();
    if r.repeat.is_recurring() {
        out.push_str("\n🔄 *Recurring*");
    }
    out.push_str(&format!(
        "\n\n📝 {}\n⏰ {}",
        escape_md(&r.text),
        fmt_time(r.time)
    ));
    if r.postponed_count > 0 {
        out.push_str(&format!("\n⏰ Snoozed: {} times", r.postponed_count));
    }
    out
}

pub fn ask_text(max_len: usize) -> String {
    format!("💭 *New reminder*\n\nEnter the reminder text (up to {max_len} characters):")
}

pub fn ask_time(text: &str) -> String {
    format!(
        "💭 Text: {}\n\nNow enter the date and time.\n\n🌟 *Formats:*\n{FORMAT_HINT}",
        escape_md(text)
    )
}

pub fn ask_repeat(text: &str, time: NaiveDateTime) -> String {
    format!(
        "💭 Text: {}\n🌟 Time: *{}*\n\n\
         Should it repeat?\n\n\
         📌 *Once* - a single notification\n\
         📅 *Daily* - every day or every few days\n\
         🗓️ *Weekly* - every {}\n\
         📆 *Pick days* - chosen weekdays",
        escape_md(text),
        fmt_time(time),
        day_name(time.weekday())
    )
}

pub fn ask_interval() -> String {
    "📅 How often should it repeat?".to_string()
}

pub fn ask_days(selected: usize) -> String {
    format!("📆 Pick the weekdays (selected: {selected}), then press Done.")
}

pub fn created(text: &str, time: NaiveDateTime, repeat: &RepeatSpec) -> String {
    format!(
        "✅ *Reminder created!*\n\n📝 {}\n⏰ {}\n🔄 {}",
        escape_md(text),
        fmt_time(time),
        repeat_description(repeat)
    )
}

pub fn ask_new_text(r: &Reminder, max_len: usize) -> String {
    format!(
        "📝 Current text: {}\n\nEnter the new text (up to {max_len} characters):",
        escape_md(&r.text)
    )
}

pub fn ask_new_time(r: &Reminder) -> String {
    format!(
        "⏰ Current time: {}\n\nEnter the new date and time:\n{FORMAT_HINT}",
        fmt_time(r.time)
    )
}

pub fn ask_edit_repeat(r: &Reminder) -> String {
    format!(
        "🔄 Current repeat: {}\n\nChoose the new repeat type:",
        repeat_description(&r.repeat)
    )
}

pub fn confirm_delete(r: &Reminder) -> String {
    let series = if r.is_series_root() {
        "\n\n⚠️ All upcoming occurrences of this series will be deleted too."
    } else {
        ""
    };
    format!(
        "🗑 Delete this reminder?\n\n📝 {}\n⏰ {}{series}",
        escape_md(&r.text),
        fmt_time(r.time)
    )
}

pub fn deleted(count: u64) -> String {
    if count > 1 {
        format!("🗑 Reminder deleted together with {} occurrences.", count - 1)
    } else {
        "🗑 Reminder deleted.".to_string()
    }
}

pub fn completed(r: &Reminder) -> String {
    format!("✅ *Done!*\n\n📝 {}", escape_md(&r.text))
}

pub fn ask_snooze(r: &Reminder) -> String {
    format!("⏰ Snooze for how long?\n\n📝 {}", escape_md(&r.text))
}

pub fn snoozed(r: &Reminder, until: NaiveDateTime) -> String {
    format!(
        "⏰ Snoozed until *{}*\n\n📝 {}",
        fmt_time(until),
        escape_md(&r.text)
    )
}

pub fn use_buttons() -> String {
    "👆 Please choose one of the buttons above.".to_string()
}

pub fn updated(r: &Reminder, now: NaiveDateTime) -> String {
    format!("✅ Saved.\n\n{}", details(r, now))
}

pub fn no_upcoming() -> String {
    "💭 Nothing is coming up.".to_string()
}

pub fn no_series() -> String {
    "🔄 You have no recurring reminders.".to_string()
}

pub fn text_empty(max_len: usize) -> String {
    format!("❌ The text is empty. Enter the reminder text (up to {max_len} characters):")
}

pub fn text_too_long(len: usize, max_len: usize) -> String {
    format!("❌ The text has {len} characters, the limit is {max_len}. Please shorten it:")
}

pub fn bad_time(input: &str) -> String {
    format!(
        "❌ I couldn't read «{}» as a time.\n\nTry one of these:\n{FORMAT_HINT}",
        escape_md(input)
    )
}

pub fn not_in_future() -> String {
    format!("❌ That time has already passed. Enter a time in the future:\n{FORMAT_HINT}")
}

pub fn not_found() -> String {
    "❌ This reminder no longer exists.".to_string()
}

pub fn access_denied() -> String {
    "⛔ This reminder belongs to someone else.".to_string()
}

pub fn internal_error() -> String {
    "😕 Something went wrong. Please try again.".to_string()
}

/// Alert shown when the weekday picker is confirmed with nothing selected.
pub fn no_days_alert() -> String {
    "Select at least one day".to_string()
}

/// Alert shown for a button of a wizard step that is no longer active.
pub fn stale_alert() -> String {
    "This menu has expired. Start again from the main menu.".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, NaiveDate};
    use nudge_store::DaySet;

    fn at(y: i32, m: u32, d: u32, h: u32, min: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, min, 0)
            .unwrap()
    }

    fn reminder(id: i64, text: &str, time: NaiveDateTime) -> Reminder {
        Reminder {
            id,
            user_id: 1,
            user_name: "Ann".into(),
            text: text.into(),
            time,
            created_at: time,
            is_active: true,
            sent: false,
            postponed_count: 0,
            repeat: RepeatSpec::once(),
            original_id: None,
        }
    }

    #[test]
    fn test_time_left() {
        let now = at(2026, 10, 16, 12, 0);
        assert_eq!(
            time_left(now + Duration::minutes(1440 + 2 * 60 + 5), now),
            "1d 2h 5m"
        );
        assert_eq!(time_left(now + Duration::hours(3), now), "3h");
        assert_eq!(time_left(now + Duration::seconds(30), now), "less than a minute");
        assert_eq!(time_left(now - Duration::hours(1), now), "less than a minute");
    }

    #[test]
    fn test_preview() {
        assert_eq!(preview("short"), "short");
        assert_eq!(preview("exactly15chars!"), "exactly15chars!");
        assert_eq!(preview("Buy milk and bread tonight"), "Buy milk and br...");
        assert_eq!(preview("Привет привет привет"), "Привет привет п...");
    }

    #[test]
    fn test_status_emoji() {
        let now = at(2026, 10, 16, 12, 0);
        let mut r = reminder(1, "x", now + Duration::hours(1));
        assert_eq!(status_emoji(&r, now), "⏳");
        r.time = now - Duration::hours(1);
        assert_eq!(status_emoji(&r, now), "⚠️");
        r.sent = true;
        assert_eq!(status_emoji(&r, now), "✅");
        r.sent = false;
        r.is_active = false;
        assert_eq!(status_emoji(&r, now), "❌");
    }

    #[test]
    fn test_repeat_description() {
        assert_eq!(repeat_description(&RepeatSpec::once()), "Once");
        assert_eq!(repeat_description(&RepeatSpec::daily(1)), "Every day");
        assert_eq!(repeat_description(&RepeatSpec::daily(3)), "Every 3 days");
        assert_eq!(
            repeat_description(&RepeatSpec::weekly(at(2026, 10, 20, 9, 0))),
            "Every Tuesday"
        );
        let mut days = DaySet::empty();
        days.insert(Weekday::Fri);
        days.insert(Weekday::Mon);
        assert_eq!(
            repeat_description(&RepeatSpec::custom(days)),
            "On Mon, Fri"
        );
    }

    #[test]
    fn test_upcoming_top_three_with_urgency() {
        let now = at(2026, 10, 16, 12, 0);
        let list = vec![
            reminder(1, "past", now - Duration::minutes(5)),
            reminder(2, "soon", now + Duration::minutes(30)),
            reminder(3, "later", now + Duration::hours(2)),
            reminder(4, "tomorrow", now + Duration::days(1)),
            reminder(5, "next week", now + Duration::days(7)),
            reminder(6, "next month", now + Duration::days(30)),
        ];
        let text = upcoming(&list, now).unwrap();
        assert!(text.contains("🔴 *1.* soon"));
        assert!(text.contains("🟠 *2.* later"));
        assert!(text.contains("🟢 *3.* tomorrow"));
        assert!(!text.contains("past"));
        assert!(!text.contains("next week"));
        assert!(text.ends_with("And 2 more..."));
    }

    #[test]
    fn test_upcoming_none_ahead() {
        let now = at(2026, 10, 16, 12, 0);
        let list = vec![reminder(1, "past", now - Duration::minutes(5))];
        assert!(upcoming(&list, now).is_none());
        assert!(upcoming(&[], now).is_none());
    }

    #[test]
    fn test_list_header_counts() {
        let now = at(2026, 10, 16, 12, 0);
        let mut sent = reminder(3, "c", now - Duration::hours(2));
        sent.sent = true;
        let list = vec![
            reminder(1, "a", now - Duration::hours(1)),
            reminder(2, "b", now + Duration::hours(1)),
            sent,
        ];
        let text = list_header(&list, now);
        assert!(text.contains("Overdue: 1"));
        assert!(text.contains("Pending: 1"));
        assert!(text.contains("Total: 3"));
    }

    #[test]
    fn test_user_text_stays_outside_bold_spans() {
        let now = at(2026, 10, 16, 12, 0);
        let mut r = reminder(1, "pay *rent* and_tax", now + Duration::hours(1));
        let escaped = r"pay \*rent\* and\_tax";

        let text = upcoming(std::slice::from_ref(&r), now).unwrap();
        assert!(text.contains(&format!("*1.* {escaped}\n")));

        r.repeat = RepeatSpec::daily(1);
        let text = series(std::slice::from_ref(&r));
        assert!(text.contains(&format!("*1.* {escaped}\n")));

        assert!(ask_time(&r.text).contains(&format!("Text: {escaped}\n")));
        assert!(ask_repeat(&r.text, r.time).contains(&format!("Text: {escaped}\n")));
    }

    #[test]
    fn test_details_escapes_user_text() {
        let now = at(2026, 10, 16, 12, 0);
        let r = reminder(1, "call *mom* re_plan", now + Duration::minutes(90));
        let text = details(&r, now);
        assert!(text.contains(r"call \*mom\* re\_plan"));
        assert!(text.contains("In:* 1h 30m"));
        assert!(text.contains("16.10.2026 13:30"));
    }
}
