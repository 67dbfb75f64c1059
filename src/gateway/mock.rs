//! In-process channel for tests.

use async_trait::async_trait;
use nudge_core::{
    error::NudgeError,
    message::{IncomingMessage, OutgoingMessage},
    traits::Channel,
};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;

#[derive(Debug, Clone, Copy)]
pub enum Mode {
    Deliver,
    Blocked,
    Flaky,
}

/// Records every send attempt and callback answer, and fails sends according to `mode`.
pub struct MockChannel {
    mode: Mutex<Mode>,
    pub attempts: Mutex<Vec<OutgoingMessage>>,
    pub answers: Mutex<Vec<(String, Option<String>)>>,
}

impl MockChannel {
    pub fn new(mode: Mode) -> Arc<Self> {
        Arc::new(Self {
            mode: Mutex::new(mode),
            attempts: Mutex::new(Vec::new()),
            answers: Mutex::new(Vec::new()),
        })
    }

    pub fn set_mode(&self, mode: Mode) {
        *self.mode.lock().unwrap() = mode;
    }

    pub fn attempts(&self) -> usize {
        self.attempts.lock().unwrap().len()
    }
}

#[async_trait]
impl Channel for MockChannel {
    fn name(&self) -> &str {
        "mock"
    }

    async fn start(&self) -> Result<mpsc::Receiver<IncomingMessage>, NudgeError> {
        let (_tx, rx) = mpsc::channel(1);
        Ok(rx)
    }

    async fn send(&self, message: OutgoingMessage) -> Result<(), NudgeError> {
        self.attempts.lock().unwrap().push(message);
        let mode = *self.mode.lock().unwrap();
        match mode {
            Mode::Deliver => Ok(()),
            Mode::Blocked => Err(NudgeError::RecipientUnreachable(
                "Forbidden: bot was blocked by the user".to_string(),
            )),
            Mode::Flaky => Err(NudgeError::Channel("connection reset".to_string())),
        }
    }

    async fn answer_callback(
        &self,
        callback_id: &str,
        alert: Option<&str>,
    ) -> Result<(), NudgeError> {
        self.answers
            .lock()
            .unwrap()
            .push((callback_id.to_string(), alert.map(str::to_string)));
        Ok(())
    }

    async fn stop(&self) -> Result<(), NudgeError> {
        Ok(())
    }
}
