//! Reminder CRUD, listings, snooze/complete and delivery bookkeeping.

use super::Store;
use crate::reminder::{
    DaySet, DeliveryOutcome, DeliveryReport, NewReminder, Reminder, ReminderUpdate, RepeatKind,
    RepeatSpec, TIME_FORMAT,
};
use chrono::{Duration, NaiveDateTime};
use nudge_core::error::NudgeError;
use sqlx::{Sqlite, SqliteConnection, Transaction};
use tracing::{debug, warn};

const COLUMNS: &str = "id, user_id, user_name, text, reminder_time, created_at, is_active, sent, \
     postponed_count, repeat_type, repeat_days, repeat_interval, original_reminder_id";

#[derive(sqlx::FromRow)]
struct ReminderRow {
    id: i64,
    user_id: i64,
    user_name: Option<String>,
    text: String,
    reminder_time: String,
    created_at: String,
    is_active: bool,
    sent: bool,
    postponed_count: i64,
    repeat_type: String,
    repeat_days: Option<String>,
    repeat_interval: i64,
    original_reminder_id: Option<i64>,
}

impl TryFrom<ReminderRow> for Reminder {
    type Error = NudgeError;

    fn try_from(row: ReminderRow) -> Result<Self, Self::Error> {
        let kind = RepeatKind::parse(&row.repeat_type).unwrap_or_else(|| {
            warn!(
                "reminder {}: unknown repeat_type {:?}, treating as once",
                row.id, row.repeat_type
            );
            RepeatKind::Once
        });
        Ok(Reminder {
            id: row.id,
            user_id: row.user_id,
            user_name: row.user_name.unwrap_or_default(),
            text: row.text,
            time: parse_time(&row.reminder_time)?,
            created_at: parse_time(&row.created_at)?,
            is_active: row.is_active,
            sent: row.sent,
            postponed_count: row.postponed_count,
            repeat: RepeatSpec {
                kind,
                days: DaySet::decode(row.repeat_days.as_deref().unwrap_or("")),
                interval: u32::try_from(row.repeat_interval.max(1)).unwrap_or(1),
            },
            original_id: row.original_reminder_id,
        })
    }
}

fn parse_time(s: &str) -> Result<NaiveDateTime, NudgeError> {
    NaiveDateTime::parse_from_str(s, TIME_FORMAT)
        .map_err(|e| NudgeError::Store(format!("bad timestamp {s:?}: {e}")))
}

fn fmt_time(t: NaiveDateTime) -> String {
    t.format(TIME_FORMAT).to_string()
}

fn now_local() -> NaiveDateTime {
    chrono::Local::now().naive_local()
}

fn into_reminders(rows: Vec<ReminderRow>) -> Result<Vec<Reminder>, NudgeError> {
    rows.into_iter().map(Reminder::try_from).collect()
}

async fn fetch_one(conn: &mut SqliteConnection, id: i64) -> Result<Option<Reminder>, NudgeError> {
    let row: Option<ReminderRow> =
        sqlx::query_as(&format!("SELECT {COLUMNS} FROM reminders WHERE id = ?"))
            .bind(id)
            .fetch_optional(conn)
            .await
            .map_err(|e| NudgeError::Store(format!("get reminder failed: {e}")))?;
    row.map(Reminder::try_from).transpose()
}

async fn insert(
    conn: &mut SqliteConnection,
    new: &NewReminder,
    created_at: NaiveDateTime,
) -> Result<i64, NudgeError> {
    let result = sqlx::query(
        "INSERT INTO reminders \
         (user_id, user_name, text, reminder_time, created_at, repeat_type, repeat_days, \
          repeat_interval, original_reminder_id) \
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(new.user_id)
    .bind(&new.user_name)
    .bind(&new.text)
    .bind(fmt_time(new.time))
    .bind(fmt_time(created_at))
    .bind(new.repeat.kind.as_str())
    .bind(new.repeat.days.encode())
    .bind(i64::from(new.repeat.interval.max(1)))
    .bind(new.original_id)
    .execute(conn)
    .await
    .map_err(|e| NudgeError::Store(format!("create reminder failed: {e}")))?;
    Ok(result.last_insert_rowid())
}

impl Store {
    /// Insert a reminder and return its id.
    pub async fn create(&self, new: &NewReminder) -> Result<i64, NudgeError> {
        let mut conn = self.acquire().await?;
        let id = insert(&mut conn, new, now_local()).await?;
        debug!("created reminder {id} for user {}", new.user_id);
        Ok(id)
    }

    /// Fetch a reminder by id.
    pub async fn get(&self, id: i64) -> Result<Option<Reminder>, NudgeError> {
        let mut conn = self.acquire().await?;
        fetch_one(&mut conn, id).await
    }

    /// Apply a partial update. Returns whether a row changed.
    pub async fn update(&self, id: i64, update: &ReminderUpdate) -> Result<bool, NudgeError> {
        if update.is_empty() {
            return Ok(false);
        }

        let mut qb = sqlx::QueryBuilder::<Sqlite>::new("UPDATE reminders SET ");
        {
            let mut set = qb.separated(", ");
            if let Some(text) = &update.text {
                set.push("text = ").push_bind_unseparated(text.clone());
            }
            if let Some(time) = update.time {
                set.push("reminder_time = ")
                    .push_bind_unseparated(fmt_time(time));
            }
            if let Some(repeat) = &update.repeat {
                set.push("repeat_type = ")
                    .push_bind_unseparated(repeat.kind.as_str());
                set.push("repeat_days = ")
                    .push_bind_unseparated(repeat.days.encode());
                set.push("repeat_interval = ")
                    .push_bind_unseparated(i64::from(repeat.interval.max(1)));
            }
            if let Some(active) = update.is_active {
                set.push("is_active = ").push_bind_unseparated(active);
            }
            if let Some(sent) = update.sent {
                set.push("sent = ").push_bind_unseparated(sent);
            }
        }
        qb.push(" WHERE id = ").push_bind(id);

        let result = qb
            .build()
            .execute(&self.pool)
            .await
            .map_err(|e| NudgeError::Store(format!("update reminder {id} failed: {e}")))?;
        Ok(result.rows_affected() > 0)
    }

    /// Delete a reminder. Deleting a series root also deletes every occurrence
    /// spawned from it. Returns the number of rows removed.
    pub async fn delete(&self, id: i64) -> Result<u64, NudgeError> {
        let mut tx = self.begin_immediate().await?;

        let Some(reminder) = fetch_one(&mut tx, id).await? else {
            return Ok(0);
        };

        let mut removed = 0;
        if reminder.is_series_root() {
            removed += sqlx::query("DELETE FROM reminders WHERE original_reminder_id = ?")
                .bind(id)
                .execute(&mut *tx)
                .await
                .map_err(|e| NudgeError::Store(format!("delete series {id} failed: {e}")))?
                .rows_affected();
        }
        removed += sqlx::query("DELETE FROM reminders WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(|e| NudgeError::Store(format!("delete reminder {id} failed: {e}")))?
            .rows_affected();

        tx.commit()
            .await
            .map_err(|e| NudgeError::Store(format!("commit failed: {e}")))?;
        Ok(removed)
    }

    /// Active reminders of a user, soonest first.
    pub async fn list_active(&self, user_id: i64) -> Result<Vec<Reminder>, NudgeError> {
        let rows: Vec<ReminderRow> = sqlx::query_as(&format!(
            "SELECT {COLUMNS} FROM reminders \
             WHERE user_id = ? AND is_active = 1 \
             ORDER BY reminder_time, id"
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| NudgeError::Store(format!("list reminders failed: {e}")))?;
        into_reminders(rows)
    }

    /// Active reminders of a user that have not been delivered yet, soonest first.
    pub async fn list_upcoming(&self, user_id: i64) -> Result<Vec<Reminder>, NudgeError> {
        let rows: Vec<ReminderRow> = sqlx::query_as(&format!(
            "SELECT {COLUMNS} FROM reminders \
             WHERE user_id = ? AND is_active = 1 AND sent = 0 \
             ORDER BY reminder_time, id"
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| NudgeError::Store(format!("list upcoming failed: {e}")))?;
        into_reminders(rows)
    }

    /// Series roots of a user whose series is still running, newest first.
    ///
    /// A root that was itself acknowledged still counts while any of its
    /// occurrences is active.
    pub async fn list_series(&self, user_id: i64) -> Result<Vec<Reminder>, NudgeError> {
        let rows: Vec<ReminderRow> = sqlx::query_as(&format!(
            "SELECT {COLUMNS} FROM reminders r \
             WHERE r.user_id = ? AND r.repeat_type != 'once' AND r.original_reminder_id IS NULL \
             AND (r.is_active = 1 OR EXISTS ( \
                 SELECT 1 FROM reminders c WHERE c.original_reminder_id = r.id AND c.is_active = 1)) \
             ORDER BY r.created_at DESC, r.id DESC"
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| NudgeError::Store(format!("list series failed: {e}")))?;
        into_reminders(rows)
    }

    /// Reminders due for delivery at `now`: active, unsent, time reached.
    pub async fn list_due(&self, now: NaiveDateTime) -> Result<Vec<Reminder>, NudgeError> {
        let rows: Vec<ReminderRow> = sqlx::query_as(&format!(
            "SELECT {COLUMNS} FROM reminders \
             WHERE reminder_time <= ? AND is_active = 1 AND sent = 0 \
             ORDER BY reminder_time, id"
        ))
        .bind(fmt_time(now))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| NudgeError::Store(format!("list due failed: {e}")))?;
        into_reminders(rows)
    }

    /// Postpone a reminder by `minutes`, re-arming it for delivery. A retired
    /// series occurrence becomes active again.
    ///
    /// Returns the new time, or `None` when the reminder does not exist.
    pub async fn snooze(
        &self,
        id: i64,
        minutes: i64,
    ) -> Result<Option<NaiveDateTime>, NudgeError> {
        let mut tx = self.begin_immediate().await?;

        let Some(reminder) = fetch_one(&mut tx, id).await? else {
            return Ok(None);
        };
        let new_time = reminder.time + Duration::minutes(minutes);

        sqlx::query(
            "UPDATE reminders \
             SET reminder_time = ?, sent = 0, is_active = 1, \
                 postponed_count = postponed_count + 1 \
             WHERE id = ?",
        )
        .bind(fmt_time(new_time))
        .bind(id)
        .execute(&mut *tx)
        .await
        .map_err(|e| NudgeError::Store(format!("snooze reminder {id} failed: {e}")))?;

        tx.commit()
            .await
            .map_err(|e| NudgeError::Store(format!("commit failed: {e}")))?;
        Ok(Some(new_time))
    }

    /// Acknowledge a reminder: delivered and no longer active.
    pub async fn complete(&self, id: i64) -> Result<bool, NudgeError> {
        let result = sqlx::query("UPDATE reminders SET sent = 1, is_active = 0 WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| NudgeError::Store(format!("complete reminder {id} failed: {e}")))?;
        Ok(result.rows_affected() > 0)
    }

    /// Record the outcome of a delivery round in one transaction.
    ///
    /// Delivered reminders are marked sent and recurring ones get their next
    /// occurrence inserted (using the series root's current text and repeat
    /// rule) unless the series already has one pending. Spawning retires the
    /// series' earlier delivered occurrences, so an ignored series keeps a
    /// single active row. Unreachable reminders are deactivated. Finally
    /// acknowledged reminders older than `purge_before` are purged.
    pub async fn apply_delivery(
        &self,
        report: &DeliveryReport,
        now: NaiveDateTime,
        purge_before: NaiveDateTime,
    ) -> Result<DeliveryOutcome, NudgeError> {
        let mut outcome = DeliveryOutcome::default();
        let mut tx = self.begin_immediate().await?;

        for &id in &report.delivered {
            let Some(reminder) = fetch_one(&mut tx, id).await? else {
                continue;
            };

            outcome.marked_sent += sqlx::query("UPDATE reminders SET sent = 1 WHERE id = ?")
                .bind(id)
                .execute(&mut *tx)
                .await
                .map_err(|e| NudgeError::Store(format!("mark sent {id} failed: {e}")))?
                .rows_affected();

            if !reminder.repeat.is_recurring() {
                continue;
            }
            let series_id = reminder.series_id();
            let root = if series_id == id {
                Some(reminder.clone())
            } else {
                fetch_one(&mut tx, series_id).await?
            };
            // Root gone or switched to one-off: the series has ended.
            let Some(root) = root.filter(|r| r.repeat.is_recurring()) else {
                continue;
            };
            // A snoozed occurrence delivered again already has its successor.
            let (pending,): (i64,) = sqlx::query_as(
                "SELECT COUNT(*) FROM reminders \
                 WHERE (id = ? OR original_reminder_id = ?) AND id != ? \
                 AND is_active = 1 AND sent = 0",
            )
            .bind(series_id)
            .bind(series_id)
            .bind(id)
            .fetch_one(&mut *tx)
            .await
            .map_err(|e| NudgeError::Store(format!("series lookup {series_id} failed: {e}")))?;
            if pending > 0 {
                continue;
            }
            let Some(next) = root.repeat.next_after(reminder.time, now) else {
                continue;
            };
            let child = NewReminder {
                user_id: reminder.user_id,
                user_name: reminder.user_name.clone(),
                text: root.text.clone(),
                time: next,
                repeat: root.repeat,
                original_id: Some(series_id),
            };
            let child_id = insert(&mut tx, &child, now).await?;
            debug!("series {series_id}: next occurrence {child_id} at {next}");
            outcome.spawned += 1;

            // Only the newest occurrence stays listed.
            outcome.retired += sqlx::query(
                "UPDATE reminders SET is_active = 0 \
                 WHERE (id = ? OR original_reminder_id = ?) AND id != ? \
                 AND sent = 1 AND is_active = 1",
            )
            .bind(series_id)
            .bind(series_id)
            .bind(child_id)
            .execute(&mut *tx)
            .await
            .map_err(|e| NudgeError::Store(format!("retire series {series_id} failed: {e}")))?
            .rows_affected();
        }

        for &id in &report.unreachable {
            outcome.deactivated += sqlx::query("UPDATE reminders SET is_active = 0 WHERE id = ?")
                .bind(id)
                .execute(&mut *tx)
                .await
                .map_err(|e| NudgeError::Store(format!("deactivate {id} failed: {e}")))?
                .rows_affected();
        }

        outcome.purged = purge(&mut tx, purge_before).await?;

        tx.commit()
            .await
            .map_err(|e| NudgeError::Store(format!("commit failed: {e}")))?;
        Ok(outcome)
    }

    /// Delete acknowledged reminders older than `threshold`. Returns the count.
    pub async fn purge_old(&self, threshold: NaiveDateTime) -> Result<u64, NudgeError> {
        let mut conn = self.acquire().await?;
        purge(&mut conn, threshold).await
    }

    /// Number of reminders per state, for status output: (active, pending, total).
    pub async fn counts(&self) -> Result<(i64, i64, i64), NudgeError> {
        sqlx::query_as(
            "SELECT \
               COALESCE(SUM(is_active), 0), \
               COALESCE(SUM(CASE WHEN is_active = 1 AND sent = 0 THEN 1 ELSE 0 END), 0), \
               COUNT(*) \
             FROM reminders",
        )
        .fetch_one(&self.pool)
        .await
        .map_err(|e| NudgeError::Store(format!("count reminders failed: {e}")))
    }

    /// Start a transaction holding the write lock, so read-then-write steps
    /// wait for other writers instead of failing with SQLITE_BUSY.
    async fn begin_immediate(&self) -> Result<Transaction<'static, Sqlite>, NudgeError> {
        self.pool
            .begin_with("BEGIN IMMEDIATE")
            .await
            .map_err(|e| NudgeError::Store(format!("begin failed: {e}")))
    }

    async fn acquire(&self) -> Result<sqlx::pool::PoolConnection<Sqlite>, NudgeError> {
        self.pool
            .acquire()
            .await
            .map_err(|e| NudgeError::Store(format!("failed to acquire connection: {e}")))
    }
}

/// Series roots are kept while any of their occurrences is still active.
async fn purge(conn: &mut SqliteConnection, threshold: NaiveDateTime) -> Result<u64, NudgeError> {
    let result = sqlx::query(
        "DELETE FROM reminders \
         WHERE sent = 1 AND is_active = 0 AND reminder_time < ? \
         AND NOT EXISTS ( \
             SELECT 1 FROM reminders c \
             WHERE c.original_reminder_id = reminders.id AND c.is_active = 1)",
    )
    .bind(fmt_time(threshold))
    .execute(conn)
    .await
    .map_err(|e| NudgeError::Store(format!("purge failed: {e}")))?;
    Ok(result.rows_affected())
}
