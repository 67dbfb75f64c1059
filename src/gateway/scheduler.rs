//! Reminder delivery: send what is due, then record the outcome in one transaction.

use crate::{keyboards, render};
use chrono::{Duration, Local, NaiveDateTime};
use nudge_core::{
    config::SchedulerConfig, error::NudgeError, message::OutgoingMessage, traits::Channel,
};
use nudge_store::{DeliveryOutcome, DeliveryReport, Reminder, Store};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Transient send failure of one reminder, waiting for its next attempt.
#[derive(Debug, Clone, Copy)]
struct Retry {
    next_at: NaiveDateTime,
    delay_secs: u64,
}

/// Delivers due reminders through a channel.
pub struct Scheduler {
    store: Store,
    channel: Arc<dyn Channel>,
    config: SchedulerConfig,
    retention_days: i64,
    retries: HashMap<i64, Retry>,
}

impl Scheduler {
    pub fn new(
        store: Store,
        channel: Arc<dyn Channel>,
        config: SchedulerConfig,
        retention_days: i64,
    ) -> Self {
        Self {
            store,
            channel,
            config,
            retention_days,
            retries: HashMap::new(),
        }
    }

    /// Background task: one tick per poll interval, slower after a failed tick.
    pub async fn run(mut self) {
        info!(
            "scheduler running every {}s",
            self.config.poll_interval_secs
        );
        loop {
            let now = Local::now().naive_local();
            let pause = match self.tick(now).await {
                Ok(_) => self.config.poll_interval_secs,
                Err(e) => {
                    error!("scheduler tick failed: {e}");
                    self.config.error_backoff_secs
                }
            };
            tokio::time::sleep(std::time::Duration::from_secs(pause.max(1))).await;
        }
    }

    /// Send every due reminder that is not waiting out a retry delay, then
    /// apply the results to the store.
    pub async fn tick(&mut self, now: NaiveDateTime) -> Result<DeliveryOutcome, NudgeError> {
        let due = self.store.list_due(now).await?;
        let mut report = DeliveryReport::default();

        for reminder in &due {
            if self
                .retries
                .get(&reminder.id)
                .is_some_and(|retry| retry.next_at > now)
            {
                continue;
            }

            match self.channel.send(notification(reminder)).await {
                Ok(()) => {
                    self.retries.remove(&reminder.id);
                    report.delivered.push(reminder.id);
                }
                Err(e) if e.is_permanent() => {
                    warn!(
                        "reminder {}: user {} unreachable, deactivating: {e}",
                        reminder.id, reminder.user_id
                    );
                    self.retries.remove(&reminder.id);
                    report.unreachable.push(reminder.id);
                }
                Err(e) => {
                    let delay = self.schedule_retry(reminder.id, now);
                    warn!(
                        "reminder {}: delivery failed, retrying in {delay}s: {e}",
                        reminder.id
                    );
                }
            }
        }

        // Snoozed, edited, completed or deleted reminders start over.
        self.retries
            .retain(|id, _| due.iter().any(|reminder| reminder.id == *id));

        if !report.is_empty() {
            debug!(
                "scheduler: {} delivered, {} unreachable of {} due",
                report.delivered.len(),
                report.unreachable.len(),
                due.len()
            );
        }

        let purge_before = now - Duration::days(self.retention_days.max(0));
        let outcome = self
            .store
            .apply_delivery(&report, now, purge_before)
            .await?;

        if outcome == DeliveryOutcome::default() {
            debug!("scheduler: nothing to do");
        } else {
            info!(
                "scheduler: sent {}, next occurrences {}, retired {}, deactivated {}, purged {}",
                outcome.marked_sent,
                outcome.spawned,
                outcome.retired,
                outcome.deactivated,
                outcome.purged
            );
        }
        Ok(outcome)
    }

    /// Record a transient failure. Returns the delay before the next attempt:
    /// one poll interval, doubling, capped at `max_retry_backoff_secs`.
    fn schedule_retry(&mut self, id: i64, now: NaiveDateTime) -> u64 {
        let first = self.config.poll_interval_secs.max(1);
        let cap = self.config.max_retry_backoff_secs.max(first);
        let retry = self.retries.entry(id).or_insert(Retry {
            next_at: now,
            delay_secs: 0,
        });
        retry.delay_secs = if retry.delay_secs == 0 {
            first
        } else {
            retry.delay_secs.saturating_mul(2).min(cap)
        };
        retry.next_at = now + Duration::seconds(retry.delay_secs as i64);
        retry.delay_secs
    }
}

/// Notification for a due reminder, sent to the owner's private chat.
fn notification(reminder: &Reminder) -> OutgoingMessage {
    OutgoingMessage::markdown(reminder.user_id, render::notification(reminder))
        .with_markup(keyboards::notification(reminder.id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::mock::{MockChannel, Mode};
    use chrono::NaiveDate;
    use nudge_store::{NewReminder, RepeatSpec};

    fn now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 3, 10)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap()
    }

    async fn add(store: &Store, user_id: i64, time: NaiveDateTime, repeat: RepeatSpec) -> i64 {
        store
            .create(&NewReminder {
                user_id,
                user_name: "Ann".to_string(),
                text: "Take a break".to_string(),
                time,
                repeat,
                original_id: None,
            })
            .await
            .unwrap()
    }

    async fn setup(mode: Mode) -> (Scheduler, Store, Arc<MockChannel>) {
        let store = Store::in_memory().await.unwrap();
        let channel = MockChannel::new(mode);
        let scheduler = Scheduler::new(
            store.clone(),
            channel.clone(),
            SchedulerConfig::default(),
            30,
        );
        (scheduler, store, channel)
    }

    #[tokio::test]
    async fn test_two_due_reminders_delivered_in_one_tick() {
        let (mut scheduler, store, channel) = setup(Mode::Deliver).await;
        let a = add(&store, 1, now() - Duration::minutes(1), RepeatSpec::once()).await;
        let b = add(&store, 2, now(), RepeatSpec::once()).await;
        let later = add(&store, 1, now() + Duration::hours(1), RepeatSpec::once()).await;

        let outcome = scheduler.tick(now()).await.unwrap();
        assert_eq!(outcome.marked_sent, 2);
        assert_eq!(outcome.spawned, 0);

        assert!(store.get(a).await.unwrap().unwrap().sent);
        assert!(store.get(b).await.unwrap().unwrap().sent);
        let later = store.get(later).await.unwrap().unwrap();
        assert!(!later.sent);
        assert!(later.is_active);

        let attempts = channel.attempts.lock().unwrap();
        assert_eq!(attempts.len(), 2);
        assert_eq!(attempts[0].chat_id, 1);
        assert_eq!(attempts[1].chat_id, 2);
        assert!(attempts[0].markdown);
        let buttons: Vec<&str> = attempts[0]
            .markup
            .as_ref()
            .unwrap()
            .inline_buttons()
            .map(|b| b.data.as_str())
            .collect();
        assert_eq!(buttons, vec![format!("done:{a}"), format!("snooze_menu:{a}")]);
    }

    #[tokio::test]
    async fn test_delivered_reminder_is_not_sent_twice() {
        let (mut scheduler, store, channel) = setup(Mode::Deliver).await;
        add(&store, 1, now(), RepeatSpec::once()).await;

        scheduler.tick(now()).await.unwrap();
        scheduler.tick(now() + Duration::seconds(10)).await.unwrap();
        assert_eq!(channel.attempts(), 1);
    }

    #[tokio::test]
    async fn test_unreachable_user_is_deactivated() {
        let (mut scheduler, store, _channel) = setup(Mode::Blocked).await;
        let id = add(&store, 1, now(), RepeatSpec::daily(1)).await;

        let outcome = scheduler.tick(now()).await.unwrap();
        assert_eq!(outcome.deactivated, 1);
        assert_eq!(outcome.spawned, 0);

        let reminder = store.get(id).await.unwrap().unwrap();
        assert!(!reminder.is_active);
        assert!(!reminder.sent);
        assert!(store.list_due(now()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_transient_failure_retries_with_backoff() {
        let (mut scheduler, store, channel) = setup(Mode::Flaky).await;
        let id = add(&store, 1, now(), RepeatSpec::once()).await;

        let outcome = scheduler.tick(now()).await.unwrap();
        assert_eq!(outcome, DeliveryOutcome::default());
        assert_eq!(channel.attempts(), 1);
        assert_eq!(store.list_due(now()).await.unwrap().len(), 1);

        // Inside the first delay (one poll interval): skipped.
        scheduler.tick(now() + Duration::seconds(5)).await.unwrap();
        assert_eq!(channel.attempts(), 1);

        // After it: retried, fails again, delay doubles to 20s.
        let t1 = now() + Duration::seconds(10);
        scheduler.tick(t1).await.unwrap();
        assert_eq!(channel.attempts(), 2);
        scheduler.tick(t1 + Duration::seconds(15)).await.unwrap();
        assert_eq!(channel.attempts(), 2);

        channel.set_mode(Mode::Deliver);
        scheduler.tick(t1 + Duration::seconds(20)).await.unwrap();
        assert_eq!(channel.attempts(), 3);
        assert!(store.get(id).await.unwrap().unwrap().sent);
        assert!(scheduler.retries.is_empty());
    }

    #[tokio::test]
    async fn test_retry_delay_is_capped() {
        let store = Store::in_memory().await.unwrap();
        let mut scheduler = Scheduler::new(
            store,
            MockChannel::new(Mode::Flaky),
            SchedulerConfig {
                poll_interval_secs: 10,
                max_retry_backoff_secs: 60,
                ..Default::default()
            },
            30,
        );
        let delays: Vec<u64> = (0..6).map(|_| scheduler.schedule_retry(7, now())).collect();
        assert_eq!(delays, vec![10, 20, 40, 60, 60, 60]);
    }

    #[tokio::test]
    async fn test_recurring_delivery_spawns_next_occurrence() {
        let (mut scheduler, store, channel) = setup(Mode::Deliver).await;
        let root = add(&store, 1, now() - Duration::minutes(1), RepeatSpec::daily(1)).await;

        let outcome = scheduler.tick(now()).await.unwrap();
        assert_eq!(outcome.spawned, 1);

        let pending = store.list_upcoming(1).await.unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].original_id, Some(root));
        assert_eq!(pending[0].time, now() - Duration::minutes(1) + Duration::days(1));

        // Nothing else is due, so no second child.
        let outcome = scheduler.tick(now() + Duration::seconds(10)).await.unwrap();
        assert_eq!(outcome.spawned, 0);
        assert_eq!(channel.attempts(), 1);
    }
}
