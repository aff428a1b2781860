//! Observer that writes every notification to the structured log

use crate::domain::event::NotificationEvent;
use crate::domain::publisher::{Observer, SubjectId};
use tracing::info;

#[derive(Debug, Default)]
pub struct LogObserver;

impl Observer for LogObserver {
    fn name(&self) -> &str {
        "log"
    }

    fn on_event(&self, subject: &SubjectId, event: &NotificationEvent) -> anyhow::Result<()> {
        info!(subject = %subject, kind = %event.kind(), message = %event.message(), "notification");
        Ok(())
    }
}
