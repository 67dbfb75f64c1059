//! Per-user wizard state.

use chrono::NaiveDateTime;
use nudge_store::DaySet;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

/// Where a user is in a multi-step conversation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Session {
    Creating(Creation),
    Editing(Edit),
}

/// Creation wizard steps.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Creation {
    WaitingText,
    WaitingDate {
        text: String,
    },
    WaitingRepeat {
        text: String,
        time: NaiveDateTime,
    },
    WaitingInterval {
        text: String,
        time: NaiveDateTime,
    },
    WaitingDays {
        text: String,
        time: NaiveDateTime,
        days: DaySet,
    },
}

/// Edit steps that wait for typed input or accumulate a selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Edit {
    WaitingNewText { id: i64 },
    WaitingNewTime { id: i64 },
    SelectingDays { id: i64, days: DaySet },
}

struct Entry {
    session: Session,
    touched: Instant,
}

/// Sessions keyed by user id, dropped after `ttl` without activity.
pub struct SessionMap {
    inner: Mutex<HashMap<i64, Entry>>,
    ttl: Duration,
}

impl SessionMap {
    pub fn new(ttl: Duration) -> Self {
        Self {
            inner: Mutex::new(HashMap::new()),
            ttl,
        }
    }

    /// Current session of a user. An expired session is removed and not returned.
    pub async fn get(&self, user_id: i64) -> Option<Session> {
        let mut map = self.inner.lock().await;
        match map.get(&user_id) {
            Some(entry) if entry.touched.elapsed() <= self.ttl => Some(entry.session.clone()),
            Some(_) => {
                map.remove(&user_id);
                None
            }
            None => None,
        }
    }

    /// Store a session, replacing any previous one.
    pub async fn set(&self, user_id: i64, session: Session) {
        self.inner.lock().await.insert(
            user_id,
            Entry {
                session,
                touched: Instant::now(),
            },
        );
    }

    pub async fn clear(&self, user_id: i64) -> Option<Session> {
        self.inner
            .lock()
            .await
            .remove(&user_id)
            .map(|entry| entry.session)
    }

    /// Drop every expired session. Returns how many were removed.
    pub async fn sweep(&self) -> usize {
        let mut map = self.inner.lock().await;
        let before = map.len();
        map.retain(|_, entry| entry.touched.elapsed() <= self.ttl);
        before - map.len()
    }

    pub async fn len(&self) -> usize {
        self.inner.lock().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_set_get_clear() {
        let map = SessionMap::new(Duration::from_secs(60));
        assert!(map.get(1).await.is_none());

        map.set(1, Session::Creating(Creation::WaitingText)).await;
        assert_eq!(
            map.get(1).await,
            Some(Session::Creating(Creation::WaitingText))
        );
        assert!(map.get(2).await.is_none());

        map.set(1, Session::Editing(Edit::WaitingNewText { id: 5 })).await;
        assert_eq!(
            map.get(1).await,
            Some(Session::Editing(Edit::WaitingNewText { id: 5 }))
        );

        assert!(map.clear(1).await.is_some());
        assert!(map.get(1).await.is_none());
        assert!(map.clear(1).await.is_none());
    }

    #[tokio::test]
    async fn test_idle_sessions_expire() {
        let map = SessionMap::new(Duration::from_millis(20));
        map.set(1, Session::Creating(Creation::WaitingText)).await;
        map.set(2, Session::Creating(Creation::WaitingText)).await;
        tokio::time::sleep(Duration::from_millis(50)).await;
        map.set(3, Session::Creating(Creation::WaitingText)).await;

        // Lazy eviction on access.
        assert!(map.get(1).await.is_none());
        assert_eq!(map.len().await, 2);

        // Sweep removes the rest of the expired ones.
        assert_eq!(map.sweep().await, 1);
        assert_eq!(map.len().await, 1);
        assert!(map.get(3).await.is_some());
    }
}
