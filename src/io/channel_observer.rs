//! Observer that fans notifications out over a bounded channel
//!
//! Broadcasting stays synchronous, but the real work happens on whatever task
//! drains the receiver, so a slow consumer can never stall the publisher.
//! When the channel is full or closed the event is dropped and reported as an
//! observer failure for that broadcast.

use crate::domain::event::NotificationEvent;
use crate::domain::publisher::{Observer, SubjectId};
use crate::infra::metrics::Metrics;
use anyhow::anyhow;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

/// A delivered event together with the subject that broadcast it
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
    pub subject: String,
    pub event: NotificationEvent,
}

pub struct ChannelObserver {
    name: String,
    tx: mpsc::Sender<Notification>,
    metrics: Option<Arc<Metrics>>,
}

impl ChannelObserver {
    pub fn new(name: impl Into<String>, tx: mpsc::Sender<Notification>) -> Self {
        Self { name: name.into(), tx, metrics: None }
    }

    pub fn with_metrics(mut self, metrics: Arc<Metrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    fn record_drop(&self) {
        if let Some(ref metrics) = self.metrics {
            metrics.record_channel_drop();
        }
    }
}

impl Observer for ChannelObserver {
    fn name(&self) -> &str {
        &self.name
    }

    fn on_event(&self, subject: &SubjectId, event: &NotificationEvent) -> anyhow::Result<()> {
        let notification = Notification { subject: subject.to_string(), event: event.clone() };
        match self.tx.try_send(notification) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(_)) => {
                self.record_drop();
                Err(anyhow!("notification channel full, event dropped"))
            }
            Err(TrySendError::Closed(_)) => {
                self.record_drop();
                Err(anyhow!("notification channel closed"))
            }
        }
    }
}

/// Create a channel observer and the receiver that drains it
pub fn create_notification_channel(
    name: impl Into<String>,
    buffer_size: usize,
) -> (Arc<ChannelObserver>, mpsc::Receiver<Notification>) {
    let (tx, rx) = mpsc::channel(buffer_size);
    (Arc::new(ChannelObserver::new(name, tx)), rx)
}
