use super::*;
use crate::callback::SnoozeBy;
use chrono::{Duration, NaiveDate, Weekday};
use nudge_core::message::Markup;
use nudge_store::{NewReminder, ReminderUpdate, RepeatKind, RepeatSpec};

/// Tuesday 2026-03-10 12:00.
fn now() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2026, 3, 10)
        .unwrap()
        .and_hms_opt(12, 0, 0)
        .unwrap()
}

async fn setup() -> (Dialogue, Store) {
    let store = Store::in_memory().await.unwrap();
    let dialogue = Dialogue::new(store.clone(), DialogueConfig::default());
    (dialogue, store)
}

fn text_ctx(user_id: i64) -> Ctx {
    Ctx {
        user_id,
        user_name: "Ann".to_string(),
        chat_id: user_id,
        message_id: None,
        callback: false,
        now: now(),
    }
}

fn button_ctx(user_id: i64) -> Ctx {
    Ctx {
        message_id: Some(77),
        callback: true,
        ..text_ctx(user_id)
    }
}

async fn add(store: &Store, user_id: i64, text: &str, repeat: RepeatSpec) -> i64 {
    store
        .create(&NewReminder {
            user_id,
            user_name: "Ann".to_string(),
            text: text.to_string(),
            time: now() + Duration::hours(3),
            repeat,
            original_id: None,
        })
        .await
        .unwrap()
}

fn first_text(response: &Response) -> &str {
    &response.messages[0].text
}

fn has_button(response: &Response, label: &str) -> bool {
    response.messages[0]
        .markup
        .as_ref()
        .is_some_and(|m| m.inline_buttons().any(|b| b.text == label))
}

/// Walk the wizard up to the repeat step with the given time expression.
async fn to_repeat_step(dialogue: &Dialogue, when: &str) {
    let ctx = text_ctx(1);
    dialogue.handle_text(&ctx, "Create reminder").await;
    dialogue.handle_text(&ctx, "Water plants").await;
    dialogue.handle_text(&ctx, when).await;
}

#[tokio::test]
async fn test_create_one_off_reminder() {
    let (dialogue, store) = setup().await;
    let ctx = text_ctx(1);

    dialogue.handle_text(&ctx, "Create reminder").await;
    assert_eq!(
        dialogue.sessions.get(1).await,
        Some(Session::Creating(Creation::WaitingText))
    );

    let r = dialogue.handle_text(&ctx, "  Buy milk  ").await;
    assert!(first_text(&r).contains("Buy milk"));
    assert_eq!(
        dialogue.sessions.get(1).await,
        Some(Session::Creating(Creation::WaitingDate {
            text: "Buy milk".to_string()
        }))
    );

    let r = dialogue.handle_text(&ctx, "tomorrow 10:00").await;
    assert!(has_button(&r, "📌 Once"));
    let tomorrow_ten = NaiveDate::from_ymd_opt(2026, 3, 11)
        .unwrap()
        .and_hms_opt(10, 0, 0)
        .unwrap();
    assert_eq!(
        dialogue.sessions.get(1).await,
        Some(Session::Creating(Creation::WaitingRepeat {
            text: "Buy milk".to_string(),
            time: tomorrow_ten,
        }))
    );

    let r = dialogue
        .handle_action(&button_ctx(1), Action::Repeat(RepeatKind::Once))
        .await;
    assert!(first_text(&r).contains("Reminder created"));
    assert_eq!(r.messages[0].edit_message_id, Some(77));
    assert!(dialogue.sessions.get(1).await.is_none());

    let stored = store.list_active(1).await.unwrap();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].text, "Buy milk");
    assert_eq!(stored[0].time, tomorrow_ten);
    assert_eq!(stored[0].repeat, RepeatSpec::once());
    assert_eq!(stored[0].user_name, "Ann");
}

#[tokio::test]
async fn test_text_validation_keeps_step() {
    let store = Store::in_memory().await.unwrap();
    let config = DialogueConfig {
        max_text_len: 5,
        ..Default::default()
    };
    let dialogue = Dialogue::new(store, config);
    let ctx = text_ctx(1);

    dialogue.handle_text(&ctx, "Create reminder").await;
    let r = dialogue.handle_text(&ctx, "far too long").await;
    assert!(first_text(&r).contains("limit is 5"));
    assert_eq!(
        dialogue.sessions.get(1).await,
        Some(Session::Creating(Creation::WaitingText))
    );

    let r = dialogue.handle_text(&ctx, "    ").await;
    assert!(first_text(&r).contains("empty"));

    dialogue.handle_text(&ctx, "short").await;
    assert!(matches!(
        dialogue.sessions.get(1).await,
        Some(Session::Creating(Creation::WaitingDate { .. }))
    ));
}

#[tokio::test]
async fn test_unreadable_time_is_echoed() {
    let (dialogue, _store) = setup().await;
    let ctx = text_ctx(1);
    dialogue.handle_text(&ctx, "Create reminder").await;
    dialogue.handle_text(&ctx, "Call mom").await;

    let r = dialogue.handle_text(&ctx, "whenever").await;
    assert!(first_text(&r).contains("whenever"));
    assert!(matches!(
        dialogue.sessions.get(1).await,
        Some(Session::Creating(Creation::WaitingDate { .. }))
    ));
}

#[tokio::test]
async fn test_past_time_is_rejected() {
    let (dialogue, _store) = setup().await;
    let ctx = text_ctx(1);
    dialogue.handle_text(&ctx, "Create reminder").await;
    dialogue.handle_text(&ctx, "Call mom").await;

    let r = dialogue.handle_text(&ctx, "01.01.2020 10:00").await;
    assert!(first_text(&r).contains("already passed"));
    assert!(matches!(
        dialogue.sessions.get(1).await,
        Some(Session::Creating(Creation::WaitingDate { .. }))
    ));
}

#[tokio::test]
async fn test_weekly_takes_weekday_of_time() {
    let (dialogue, store) = setup().await;
    to_repeat_step(&dialogue, "tomorrow 09:00").await;

    dialogue
        .handle_action(&button_ctx(1), Action::Repeat(RepeatKind::Weekly))
        .await;

    let stored = store.list_active(1).await.unwrap();
    assert_eq!(stored[0].repeat.kind, RepeatKind::Weekly);
    assert_eq!(stored[0].repeat.days.iter().collect::<Vec<_>>(), vec![Weekday::Wed]);
}

#[tokio::test]
async fn test_daily_interval_with_back() {
    let (dialogue, store) = setup().await;
    to_repeat_step(&dialogue, "in 2 hours").await;
    let ctx = button_ctx(1);

    let r = dialogue
        .handle_action(&ctx, Action::Repeat(RepeatKind::Daily))
        .await;
    assert!(has_button(&r, "Every 2 days"));

    dialogue.handle_action(&ctx, Action::IntervalBack).await;
    assert!(matches!(
        dialogue.sessions.get(1).await,
        Some(Session::Creating(Creation::WaitingRepeat { .. }))
    ));

    dialogue
        .handle_action(&ctx, Action::Repeat(RepeatKind::Daily))
        .await;
    dialogue.handle_action(&ctx, Action::Interval(3)).await;

    let stored = store.list_active(1).await.unwrap();
    assert_eq!(stored[0].repeat, RepeatSpec::daily(3));
    assert!(dialogue.sessions.get(1).await.is_none());
}

#[tokio::test]
async fn test_custom_days_need_a_selection() {
    let (dialogue, store) = setup().await;
    to_repeat_step(&dialogue, "in 2 hours").await;
    let ctx = button_ctx(1);

    dialogue
        .handle_action(&ctx, Action::Repeat(RepeatKind::Custom))
        .await;
    let r = dialogue.handle_action(&ctx, Action::DaysDone).await;
    assert!(r.alert.is_some());
    assert!(r.messages.is_empty());

    dialogue.handle_action(&ctx, Action::Day(Weekday::Mon)).await;
    dialogue.handle_action(&ctx, Action::Day(Weekday::Fri)).await;
    let r = dialogue.handle_action(&ctx, Action::Day(Weekday::Mon)).await;
    assert!(has_button(&r, "✅ Fri"));
    assert!(has_button(&r, "◻️ Mon"));

    dialogue.handle_action(&ctx, Action::DaysDone).await;
    let stored = store.list_active(1).await.unwrap();
    assert_eq!(stored[0].repeat.kind, RepeatKind::Custom);
    assert_eq!(stored[0].repeat.days.iter().collect::<Vec<_>>(), vec![Weekday::Fri]);
}

#[tokio::test]
async fn test_wizard_button_without_session_is_stale() {
    let (dialogue, store) = setup().await;
    let r = dialogue
        .handle_action(&button_ctx(1), Action::Repeat(RepeatKind::Once))
        .await;
    assert!(r.alert.is_some());
    assert!(store.list_active(1).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_menu_button_cancels_wizard() {
    let (dialogue, _store) = setup().await;
    let ctx = text_ctx(1);
    dialogue.handle_text(&ctx, "Create reminder").await;
    dialogue.handle_text(&ctx, "Stretch").await;

    let r = dialogue.handle_text(&ctx, "My reminders").await;
    assert!(dialogue.sessions.get(1).await.is_none());
    assert!(first_text(&r).contains("no active reminders"));
}

#[tokio::test]
async fn test_free_text_outside_wizard() {
    let (dialogue, _store) = setup().await;
    let r = dialogue.handle_text(&text_ctx(1), "hello there").await;
    assert!(first_text(&r).contains("didn't understand"));
    assert!(matches!(r.messages[0].markup, Some(Markup::Reply { .. })));
}

#[tokio::test]
async fn test_foreign_reminder_is_not_touched() {
    let (dialogue, store) = setup().await;
    let id = add(&store, 2, "Secret", RepeatSpec::once()).await;

    let r = dialogue.handle_action(&button_ctx(1), Action::View(id)).await;
    assert!(first_text(&r).contains("someone else"));

    dialogue
        .handle_action(&button_ctx(1), Action::DeleteYes(id))
        .await;
    dialogue
        .handle_action(&button_ctx(1), Action::Snooze(id, SnoozeBy::Minutes(5)))
        .await;
    let after = store.get(id).await.unwrap().unwrap();
    assert_eq!(after.time, now() + Duration::hours(3));
    assert_eq!(after.postponed_count, 0);
}

#[tokio::test]
async fn test_missing_reminder_links_back_to_list() {
    let (dialogue, _store) = setup().await;
    let r = dialogue.handle_action(&button_ctx(1), Action::View(999)).await;
    assert!(first_text(&r).contains("no longer exists"));
    assert!(has_button(&r, "📋 To list"));
}

#[tokio::test]
async fn test_delete_from_panel() {
    let (dialogue, store) = setup().await;
    let id = add(&store, 1, "Old", RepeatSpec::once()).await;
    let ctx = button_ctx(1);

    let r = dialogue.handle_action(&ctx, Action::DeleteConfirm(id)).await;
    assert!(has_button(&r, "✅ Yes, delete"));
    assert!(store.get(id).await.unwrap().is_some());

    dialogue.handle_action(&ctx, Action::DeleteYes(id)).await;
    assert!(store.get(id).await.unwrap().is_none());
}

#[tokio::test]
async fn test_edit_text() {
    let (dialogue, store) = setup().await;
    let id = add(&store, 1, "Old text", RepeatSpec::once()).await;

    dialogue
        .handle_action(&button_ctx(1), Action::EditText(id))
        .await;
    let r = dialogue.handle_text(&text_ctx(1), "New text").await;
    assert!(first_text(&r).contains("Saved"));
    assert!(dialogue.sessions.get(1).await.is_none());
    assert_eq!(store.get(id).await.unwrap().unwrap().text, "New text");
}

#[tokio::test]
async fn test_edit_time_rearms_delivered_reminder() {
    let (dialogue, store) = setup().await;
    let id = add(&store, 1, "Stand up", RepeatSpec::once()).await;
    store
        .update(
            id,
            &ReminderUpdate {
                sent: Some(true),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    dialogue
        .handle_action(&button_ctx(1), Action::EditTime(id))
        .await;
    dialogue.handle_text(&text_ctx(1), "in 2 hours").await;

    let after = store.get(id).await.unwrap().unwrap();
    assert_eq!(after.time, now() + Duration::hours(2));
    assert!(!after.sent);
}

#[tokio::test]
async fn test_edit_of_deleted_reminder_ends_session() {
    let (dialogue, store) = setup().await;
    let id = add(&store, 1, "Gone soon", RepeatSpec::once()).await;
    dialogue
        .handle_action(&button_ctx(1), Action::EditText(id))
        .await;
    store.delete(id).await.unwrap();

    let r = dialogue.handle_text(&text_ctx(1), "New text").await;
    assert!(first_text(&r).contains("no longer exists"));
    assert!(dialogue.sessions.get(1).await.is_none());
}

#[tokio::test]
async fn test_edit_repeat_of_occurrence_updates_root() {
    let (dialogue, store) = setup().await;
    let root = add(&store, 1, "Gym", RepeatSpec::daily(1)).await;
    let child = store
        .create(&NewReminder {
            user_id: 1,
            user_name: "Ann".to_string(),
            text: "Gym".to_string(),
            time: now() + Duration::days(1),
            repeat: RepeatSpec::daily(1),
            original_id: Some(root),
        })
        .await
        .unwrap();

    dialogue
        .handle_action(&button_ctx(1), Action::EditRepeatKind(child, RepeatKind::Once))
        .await;

    assert_eq!(store.get(child).await.unwrap().unwrap().repeat, RepeatSpec::once());
    assert_eq!(store.get(root).await.unwrap().unwrap().repeat, RepeatSpec::once());
}

#[tokio::test]
async fn test_edit_custom_days() {
    let (dialogue, store) = setup().await;
    let id = add(&store, 1, "Yoga", RepeatSpec::once()).await;
    let other = add(&store, 1, "Run", RepeatSpec::once()).await;
    let ctx = button_ctx(1);

    dialogue
        .handle_action(&ctx, Action::EditRepeatKind(id, RepeatKind::Custom))
        .await;
    let r = dialogue
        .handle_action(&ctx, Action::EditDaysDone(id))
        .await;
    assert!(r.alert.is_some());

    dialogue
        .handle_action(&ctx, Action::EditDay(id, Weekday::Mon))
        .await;
    dialogue
        .handle_action(&ctx, Action::EditDay(id, Weekday::Thu))
        .await;

    // A toggle aimed at a different reminder belongs to no open picker.
    let r = dialogue
        .handle_action(&ctx, Action::EditDay(other, Weekday::Sun))
        .await;
    assert!(r.alert.is_some());

    dialogue.handle_action(&ctx, Action::EditDaysDone(id)).await;
    let after = store.get(id).await.unwrap().unwrap();
    assert_eq!(after.repeat.kind, RepeatKind::Custom);
    assert_eq!(
        after.repeat.days.iter().collect::<Vec<_>>(),
        vec![Weekday::Mon, Weekday::Thu]
    );
    assert!(dialogue.sessions.get(1).await.is_none());
}

#[tokio::test]
async fn test_edit_days_cancel_returns_to_repeat_menu() {
    let (dialogue, store) = setup().await;
    let id = add(&store, 1, "Yoga", RepeatSpec::once()).await;
    let ctx = button_ctx(1);

    dialogue
        .handle_action(&ctx, Action::EditRepeatKind(id, RepeatKind::Custom))
        .await;
    let r = dialogue
        .handle_action(&ctx, Action::EditDaysCancel(id))
        .await;
    assert!(has_button(&r, "📌 Once"));
    assert!(dialogue.sessions.get(1).await.is_none());
    assert_eq!(store.get(id).await.unwrap().unwrap().repeat, RepeatSpec::once());
}

#[tokio::test]
async fn test_snooze_and_complete() {
    let (dialogue, store) = setup().await;
    let id = add(&store, 1, "Tea", RepeatSpec::once()).await;
    let ctx = button_ctx(1);

    let r = dialogue.handle_action(&ctx, Action::SnoozeMenu(id)).await;
    assert!(has_button(&r, "Tomorrow"));

    dialogue
        .handle_action(&ctx, Action::Snooze(id, SnoozeBy::Minutes(15)))
        .await;
    let after = store.get(id).await.unwrap().unwrap();
    assert_eq!(after.time, now() + Duration::hours(3) + Duration::minutes(15));
    assert_eq!(after.postponed_count, 1);

    let r = dialogue.handle_action(&ctx, Action::Done(id)).await;
    assert!(first_text(&r).contains("Done"));
    assert!(r.messages[0].markup.is_none());
    let after = store.get(id).await.unwrap().unwrap();
    assert!(!after.is_active);
    assert!(after.sent);
}

#[tokio::test]
async fn test_list_page_is_clamped() {
    let (dialogue, store) = setup().await;
    add(&store, 1, "One", RepeatSpec::once()).await;

    let r = dialogue
        .handle_action(&button_ctx(1), Action::ListPage(99))
        .await;
    assert!(has_button(&r, "1/1"));
    assert!(!has_button(&r, "Next ▶️"));
}

#[tokio::test]
async fn test_list_pages_through_reminders() {
    let (dialogue, store) = setup().await;
    for i in 0..10 {
        add(&store, 1, &format!("Item {i}"), RepeatSpec::once()).await;
    }

    let r = dialogue.handle_text(&text_ctx(1), "/list").await;
    assert!(first_text(&r).contains("Total: 10"));
    assert!(has_button(&r, "1/2"));
    assert!(has_button(&r, "Next ▶️"));

    let r = dialogue
        .handle_action(&button_ctx(1), Action::ListPage(1))
        .await;
    assert!(has_button(&r, "2/2"));
    assert!(has_button(&r, "◀️ Back"));
}

#[tokio::test]
async fn test_upcoming_and_series_views() {
    let (dialogue, store) = setup().await;
    let ctx = text_ctx(1);

    let r = dialogue.handle_text(&ctx, "Upcoming").await;
    assert!(first_text(&r).contains("Nothing is coming up"));
    let r = dialogue.handle_text(&ctx, "🔄 Recurring").await;
    assert!(first_text(&r).contains("no recurring"));

    add(&store, 1, "Daily walk", RepeatSpec::daily(1)).await;
    let r = dialogue.handle_text(&ctx, "/upcoming").await;
    assert!(first_text(&r).contains("Daily walk"));
    let r = dialogue.handle_text(&ctx, "/repeating").await;
    assert!(first_text(&r).contains("Total recurring:* 1"));
}

#[tokio::test]
async fn test_start_greets_by_name() {
    let (dialogue, _store) = setup().await;
    let r = dialogue.handle_text(&text_ctx(1), "/start").await;
    assert!(first_text(&r).contains("Hi, Ann!"));
    assert!(matches!(r.messages[0].markup, Some(Markup::Reply { .. })));
}
