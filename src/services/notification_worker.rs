//! Notification worker - drains a channel observer off the broadcasting thread
//!
//! Pairs with [`ChannelObserver`](crate::io::ChannelObserver): the publisher
//! enqueues with `try_send`, this worker does the slow part (push delivery,
//! e-mail, UI refresh) through a handler.

use crate::io::channel_observer::Notification;
use std::time::Instant;
use tokio::sync::mpsc;
use tracing::{info, warn};

/// Handler invoked once per notification, in channel order
pub type NotificationHandler = Box<dyn FnMut(Notification) -> anyhow::Result<()> + Send>;

pub struct NotificationWorker {
    name: String,
    rx: mpsc::Receiver<Notification>,
    handler: NotificationHandler,
}

/// Counts reported when a worker stops
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WorkerStats {
    pub handled: u64,
    pub failed: u64,
}

impl NotificationWorker {
    pub fn new(name: impl Into<String>, rx: mpsc::Receiver<Notification>, handler: NotificationHandler) -> Self {
        Self { name: name.into(), rx, handler }
    }

    /// Run until every sender is dropped
    pub async fn run(mut self) -> WorkerStats {
        info!(worker = %self.name, "notification_worker_started");
        let mut stats = WorkerStats::default();

        while let Some(notification) = self.rx.recv().await {
            let started = Instant::now();
            let subject = notification.subject.clone();
            let kind = notification.event.kind();

            match (self.handler)(notification) {
                Ok(()) => stats.handled += 1,
                Err(e) => {
                    stats.failed += 1;
                    warn!(
                        worker = %self.name,
                        subject = %subject,
                        kind = %kind,
                        error = %e,
                        "notification_handler_failed"
                    );
                }
            }

            let elapsed_us = started.elapsed().as_micros() as u64;
            if elapsed_us > 10_000 {
                warn!(worker = %self.name, subject = %subject, elapsed_us = %elapsed_us, "notification_handler_slow");
            }
        }

        info!(worker = %self.name, handled = stats.handled, failed = stats.failed, "notification_worker_stopped");
        stats
    }
}
