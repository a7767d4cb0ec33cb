//! Run status notifications
//!
//! Delivery is fire-and-forget: a notifier logs its own failures and never
//! fails the run.

use std::cell::RefCell;
use std::time::Duration;

use serde_json::json;
use tracing::{info, warn};

/// Sink for the final status message of a run
pub trait Notifier {
    fn notify(&self, message: &str);
}

impl<N: Notifier + ?Sized> Notifier for Box<N> {
    fn notify(&self, message: &str) {
        (**self).notify(message)
    }
}

/// Posts messages to a Slack incoming webhook
pub struct SlackNotifier {
    agent: ureq::Agent,
    webhook_url: String,
}

impl SlackNotifier {
    pub fn new(webhook_url: impl Into<String>) -> Self {
        SlackNotifier {
            agent: ureq::AgentBuilder::new()
                .timeout(Duration::from_secs(30))
                .build(),
            webhook_url: webhook_url.into(),
        }
    }
}

impl Notifier for SlackNotifier {
    fn notify(&self, message: &str) {
        if let Err(e) = self
            .agent
            .post(&self.webhook_url)
            .send_json(json!({ "text": message }))
        {
            warn!(error = %e, "failed to deliver slack notification");
        }
    }
}

/// Writes messages to the log, used when no webhook is configured
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, message: &str) {
        info!(notification = message);
    }
}

/// Keeps every message in memory
#[derive(Default)]
pub struct RecordingNotifier {
    messages: RefCell<Vec<String>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> Vec<String> {
        self.messages.borrow().clone()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, message: &str) {
        self.messages.borrow_mut().push(message.to_string());
    }
}
