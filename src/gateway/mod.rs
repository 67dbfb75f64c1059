//! Gateway: the main event loop connecting the channel, the dialogue and the scheduler.
//!
//! Events from one user are handled in arrival order; different users run
//! concurrently. Shutdown on Ctrl-C stops the background tasks, then the channel.

#[cfg(test)]
mod mock;
mod scheduler;

pub use scheduler::Scheduler;

use crate::callback::Action;
use crate::dialogue::{Ctx, Dialogue, Response};
use chrono::Local;
use nudge_core::{
    config::{Config, HealthConfig, SchedulerConfig},
    message::{IncomingMessage, OutgoingMessage},
    traits::Channel,
};
use nudge_store::Store;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// How often idle wizard sessions are swept.
const SESSION_SWEEP_SECS: u64 = 300;

/// The central gateway that routes user events to the dialogue.
pub struct Gateway {
    channel: Arc<dyn Channel>,
    store: Store,
    dialogue: Dialogue,
    scheduler_config: SchedulerConfig,
    health_config: HealthConfig,
    retention_days: i64,
    /// Users with an event in progress. Further events from them queue here.
    active_senders: Mutex<HashMap<i64, Vec<IncomingMessage>>>,
}

impl Gateway {
    pub fn new(channel: Arc<dyn Channel>, store: Store, config: &Config) -> Self {
        Self {
            channel,
            dialogue: Dialogue::new(store.clone(), config.dialogue.clone()),
            store,
            scheduler_config: config.scheduler.clone(),
            health_config: config.health.clone(),
            retention_days: config.store.retention_days,
            active_senders: Mutex::new(HashMap::new()),
        }
    }

    /// Run the main event loop.
    pub async fn run(self: Arc<Self>) -> anyhow::Result<()> {
        let name = self.channel.name().to_string();
        let mut rx = self
            .channel
            .start()
            .await
            .map_err(|e| anyhow::anyhow!("failed to start channel {name}: {e}"))?;
        info!("Channel started: {name}");

        let mut handles: Vec<JoinHandle<()>> = Vec::new();

        if self.scheduler_config.enabled {
            let scheduler = Scheduler::new(
                self.store.clone(),
                self.channel.clone(),
                self.scheduler_config.clone(),
                self.retention_days,
            );
            handles.push(tokio::spawn(scheduler.run()));
        }

        if self.health_config.enabled {
            handles.push(tokio::spawn(crate::api::serve(self.health_config.clone())));
        }

        let sweeper = self.clone();
        handles.push(tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(SESSION_SWEEP_SECS));
            loop {
                interval.tick().await;
                let sessions = sweeper.dialogue.sessions();
                let removed = sessions.sweep().await;
                if removed > 0 {
                    debug!("dropped {removed} idle sessions, {} open", sessions.len().await);
                }
            }
        }));

        info!("nudge gateway running on {name}");

        loop {
            tokio::select! {
                Some(incoming) = rx.recv() => {
                    let gw = self.clone();
                    tokio::spawn(async move {
                        gw.dispatch_message(incoming).await;
                    });
                }
                _ = tokio::signal::ctrl_c() => {
                    info!("Received shutdown signal");
                    break;
                }
            }
        }

        self.shutdown(&handles).await;
        Ok(())
    }

    /// Queue the event if the sender is busy, otherwise handle it and drain the queue.
    async fn dispatch_message(self: Arc<Self>, incoming: IncomingMessage) {
        let sender = incoming.sender_id;

        {
            let mut active = self.active_senders.lock().await;
            if let Some(queue) = active.get_mut(&sender) {
                debug!("queued event from {sender} behind one in progress");
                queue.push(incoming);
                return;
            }
            active.insert(sender, Vec::new());
        }

        self.handle_message(incoming).await;

        loop {
            let next = {
                let mut active = self.active_senders.lock().await;
                match active.get_mut(&sender) {
                    Some(queue) if !queue.is_empty() => Some(queue.remove(0)),
                    _ => {
                        active.remove(&sender);
                        None
                    }
                }
            };

            match next {
                Some(queued) => self.handle_message(queued).await,
                None => break,
            }
        }
    }

    /// Handle one event and send the replies.
    async fn handle_message(&self, incoming: IncomingMessage) {
        let ctx = Ctx::from_incoming(&incoming, Local::now().naive_local());

        let response = match &incoming.callback {
            Some(callback) => {
                let response = match Action::decode(&callback.data) {
                    Some(action) => self.dialogue.handle_action(&ctx, action).await,
                    None => {
                        debug!("ignoring unknown callback data {:?}", callback.data);
                        Response::default()
                    }
                };
                if let Err(e) = self
                    .channel
                    .answer_callback(&callback.id, response.alert.as_deref())
                    .await
                {
                    warn!("failed to answer callback: {e}");
                }
                response
            }
            None => self.dialogue.handle_text(&ctx, &incoming.text).await,
        };

        self.deliver(response.messages).await;
    }

    async fn deliver(&self, messages: Vec<OutgoingMessage>) {
        for message in messages {
            if let Err(e) = self.channel.send(message).await {
                error!("failed to send reply: {e}");
            }
        }
    }

    /// Graceful shutdown: abort background tasks, stop the channel.
    async fn shutdown(&self, handles: &[JoinHandle<()>]) {
        info!("Shutting down...");

        for handle in handles {
            handle.abort();
        }

        if let Err(e) = self.channel.stop().await {
            warn!("failed to stop channel {}: {e}", self.channel.name());
        }

        info!("Shutdown complete.");
    }
}
