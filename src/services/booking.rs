//! Booking desk - reserve and pay a ticket, streaming its notifications
//!
//! Each booking gets its own bounded channel observer (sized from
//! `[notifications] channel_buffer`) drained by a [`NotificationWorker`] task.
//! The ticket is the only sender, so the worker stops once the ticket is
//! dropped and the receipt carries the worker's final counts.

use crate::domain::error::Result;
use crate::domain::promotion::Promotion;
use crate::domain::ticket::Ticket;
use crate::domain::trip::Trip;
use crate::infra::{Config, Metrics};
use crate::io::{ChannelObserver, LogObserver};
use crate::services::notification_worker::{NotificationHandler, NotificationWorker, WorkerStats};
use anyhow::Context;
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::info;

/// How long a seat is held before payment
pub const DEFAULT_HOLD_MINUTES: i64 = 15;

/// Outcome of a paid booking
#[derive(Debug, Clone, Serialize)]
pub struct BookingReceipt {
    pub ticket_id: String,
    pub trip_code: String,
    pub passenger: String,
    /// Amount paid, after any promotion
    pub price: f64,
    /// Id of the applied promotion
    pub promotion: Option<String>,
    /// Counts from the worker that drained this booking's notifications
    #[serde(skip)]
    pub notifications: WorkerStats,
}

pub struct BookingDesk {
    /// Capacity of each booking's notification channel
    channel_buffer: usize,
    /// Reservation hold before payment is due
    hold: Duration,
    metrics: Arc<Metrics>,
}

impl BookingDesk {
    pub fn new(config: &Config, metrics: Arc<Metrics>) -> Self {
        Self {
            channel_buffer: config.channel_buffer(),
            hold: Duration::minutes(DEFAULT_HOLD_MINUTES),
            metrics,
        }
    }

    pub fn with_hold(mut self, hold: Duration) -> Self {
        self.hold = hold;
        self
    }

    /// Reserve a seat on `trip`, apply `promotion` if any, and pay in full
    ///
    /// `handler` runs on a worker task for every notification the ticket
    /// broadcasts. Must be called inside a tokio runtime.
    pub async fn book(
        &self,
        trip: &Trip,
        passenger: &str,
        promotion: Option<&Promotion>,
        now: DateTime<Utc>,
        handler: NotificationHandler,
    ) -> anyhow::Result<BookingReceipt> {
        let (tx, rx) = mpsc::channel(self.channel_buffer);
        let channel = Arc::new(ChannelObserver::new("booking", tx).with_metrics(self.metrics.clone()));
        let worker = tokio::spawn(NotificationWorker::new("booking", rx, handler).run());

        // The ticket owns the only sender; it is gone once this returns
        let outcome = self.reserve_and_pay(trip, passenger, promotion, now, channel);
        let stats = worker.await.context("booking notification worker failed")?;

        let mut receipt = outcome?;
        receipt.notifications = stats;
        Ok(receipt)
    }

    fn reserve_and_pay(
        &self,
        trip: &Trip,
        passenger: &str,
        promotion: Option<&Promotion>,
        now: DateTime<Utc>,
        channel: Arc<ChannelObserver>,
    ) -> Result<BookingReceipt> {
        let mut ticket = Ticket::reserve(trip, passenger, self.hold, now)?.with_metrics(self.metrics.clone());
        ticket.attach(Arc::new(LogObserver));
        ticket.attach(channel);

        if let Some(promotion) = promotion {
            ticket.apply_promotion(promotion)?;
        }
        ticket.confirm_payment(ticket.price(), now)?.into_result()?;

        info!(
            ticket = %ticket.id(),
            trip = %trip.code(),
            price = ticket.price(),
            promotion = ?ticket.promotion().map(Promotion::id),
            "ticket_booked"
        );
        Ok(BookingReceipt {
            ticket_id: ticket.id().to_string(),
            trip_code: trip.code().to_string(),
            passenger: ticket.passenger().to_string(),
            price: ticket.price(),
            promotion: ticket.promotion().map(|p| p.id().to_string()),
            notifications: WorkerStats::default(),
        })
    }
}
