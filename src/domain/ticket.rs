//! Ticket lifecycle: reservation, payment, expiry and modification

use crate::domain::error::{DomainError, Result};
use crate::domain::event::{EventKind, NotificationEvent};
use crate::domain::promotion::{Promotion, PromotionKind};
use crate::domain::publisher::{BroadcastReport, Observer, Publisher, SubjectId};
use crate::domain::trip::Trip;
use crate::domain::types::round_cents;
use crate::infra::metrics::Metrics;
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use std::sync::Arc;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum TicketStatus {
    Reserved { expires_at: DateTime<Utc> },
    Paid { paid_at: DateTime<Utc> },
    Expired,
}

impl TicketStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TicketStatus::Reserved { .. } => "reserved",
            TicketStatus::Paid { .. } => "paid",
            TicketStatus::Expired => "expired",
        }
    }
}

/// A passenger's seat on one trip, from reservation to payment
#[derive(Debug)]
pub struct Ticket {
    /// uuid v7, also the tail of the subject id `ticket:<id>`
    id: String,
    /// Code of the trip currently booked
    trip_code: String,
    passenger: String,
    /// Undiscounted fare of the booked trip
    base_price: f64,
    /// Amount due after the applied promotion
    price: f64,
    status: TicketStatus,
    /// At most one price promotion per ticket
    promotion: Option<Promotion>,
    /// Loyalty promotions granted to the holder, without duplicates
    loyalty_rewards: Vec<Promotion>,
    publisher: Publisher,
}

impl Ticket {
    /// Hold a seat on `trip` until `now + hold`
    pub fn reserve(trip: &Trip, passenger: &str, hold: Duration, now: DateTime<Utc>) -> Result<Self> {
        if trip.is_cancelled() {
            return Err(DomainError::state(format!("trip {}", trip.code()), "trip is cancelled"));
        }
        let passenger = passenger.trim();
        if passenger.is_empty() {
            return Err(DomainError::invalid("ticket.passenger", "must not be blank"));
        }
        if hold <= Duration::zero() {
            return Err(DomainError::invalid("ticket.hold", "reservation hold must be positive"));
        }

        let id = Uuid::now_v7().to_string();
        let price = trip.fare().price;
        Ok(Self {
            publisher: Publisher::new(SubjectId::new(format!("ticket:{}", id))),
            id,
            trip_code: trip.code().to_string(),
            passenger: passenger.to_string(),
            base_price: price,
            price,
            status: TicketStatus::Reserved { expires_at: now + hold },
            promotion: None,
            loyalty_rewards: Vec::new(),
        })
    }

    /// Record this ticket's broadcasts into `metrics`
    pub fn with_metrics(mut self, metrics: Arc<Metrics>) -> Self {
        self.publisher.set_metrics(metrics);
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn trip_code(&self) -> &str {
        &self.trip_code
    }

    pub fn passenger(&self) -> &str {
        &self.passenger
    }

    /// Amount due, after any promotion
    pub fn price(&self) -> f64 {
        self.price
    }

    pub fn status(&self) -> TicketStatus {
        self.status
    }

    pub fn promotion(&self) -> Option<&Promotion> {
        self.promotion.as_ref()
    }

    pub fn loyalty_rewards(&self) -> &[Promotion] {
        &self.loyalty_rewards
    }

    pub fn publisher(&self) -> &Publisher {
        &self.publisher
    }

    pub fn attach(&mut self, observer: Arc<dyn Observer>) -> bool {
        self.publisher.attach(observer)
    }

    pub fn detach<O: Observer + ?Sized>(&mut self, observer: &Arc<O>) -> bool {
        self.publisher.detach(observer)
    }

    /// Discount a reserved ticket; returns the new price
    pub fn apply_promotion(&mut self, promotion: &Promotion) -> Result<f64> {
        self.ensure_reserved("apply a promotion")?;
        if let Some(ref current) = self.promotion {
            return Err(self.invalid_state(format!("promotion {} already applied", current.id())));
        }
        self.price = round_cents(promotion.apply_discount(self.base_price));
        self.promotion = Some(promotion.clone());
        Ok(self.price)
    }

    pub fn confirm_payment(&mut self, amount: f64, now: DateTime<Utc>) -> Result<BroadcastReport> {
        let TicketStatus::Reserved { expires_at } = self.status else {
            return Err(self.invalid_state(format!("cannot pay a {} ticket", self.status.as_str())));
        };
        if now > expires_at {
            return Err(self.invalid_state("reservation has expired"));
        }
        if !amount.is_finite() || round_cents(amount) < self.price {
            return Err(DomainError::invalid(
                "payment.amount",
                format!("{:.2} does not cover {:.2}", amount, self.price),
            ));
        }

        self.status = TicketStatus::Paid { paid_at: now };
        let message = format!(
            "Payment of {:.2} received for {} on trip {}",
            self.price, self.passenger, self.trip_code
        );
        Ok(self.notify(EventKind::PaymentConfirmed, message))
    }

    /// Expire an unpaid reservation whose hold has run out
    ///
    /// Returns `None` when nothing changed: the hold is still running, or the
    /// ticket is already paid or expired.
    pub fn expire_reservation(&mut self, now: DateTime<Utc>) -> Option<BroadcastReport> {
        match self.status {
            TicketStatus::Reserved { expires_at } if now > expires_at => {
                self.status = TicketStatus::Expired;
                let message = format!(
                    "Reservation for {} on trip {} expired at {}",
                    self.passenger,
                    self.trip_code,
                    expires_at.format("%H:%M")
                );
                Some(self.notify(EventKind::ReservationExpired, message))
            }
            _ => None,
        }
    }

    /// Move a paid ticket onto another trip, re-pricing it
    pub fn modify(&mut self, trip: &Trip) -> Result<BroadcastReport> {
        if !matches!(self.status, TicketStatus::Paid { .. }) {
            return Err(self.invalid_state(format!("cannot modify a {} ticket", self.status.as_str())));
        }
        if trip.is_cancelled() {
            return Err(DomainError::state(format!("trip {}", trip.code()), "trip is cancelled"));
        }

        let previous_trip = std::mem::replace(&mut self.trip_code, trip.code().to_string());
        let previous_price = self.price;
        self.base_price = trip.fare().price;
        self.price = match self.promotion {
            Some(ref promotion) => round_cents(promotion.apply_discount(self.base_price)),
            None => self.base_price,
        };

        let message = format!(
            "Ticket moved from trip {} to trip {} (price {:.2} -> {:.2})",
            previous_trip, self.trip_code, previous_price, self.price
        );
        Ok(self.notify(EventKind::TicketModified, message))
    }

    /// Grant a loyalty promotion to the ticket holder
    ///
    /// Granting the same promotion twice is a no-op.
    pub fn grant_loyalty_promotion(&mut self, promotion: Promotion) -> Result<Option<BroadcastReport>> {
        if promotion.kind() != PromotionKind::Loyalty {
            return Err(DomainError::invalid(
                "promotion.kind",
                format!("{} is not a loyalty promotion", promotion.id()),
            ));
        }
        if self.loyalty_rewards.contains(&promotion) {
            return Ok(None);
        }

        let message = format!(
            "{} earned loyalty promotion '{}' (-{}%)",
            self.passenger,
            promotion.name(),
            promotion.discount_percent()
        );
        self.loyalty_rewards.push(promotion);
        Ok(Some(self.notify(EventKind::LoyaltyPromotion, message)))
    }

    fn ensure_reserved(&self, action: &str) -> Result<()> {
        match self.status {
            TicketStatus::Reserved { .. } => Ok(()),
            other => Err(self.invalid_state(format!("cannot {} on a {} ticket", action, other.as_str()))),
        }
    }

    fn invalid_state(&self, reason: impl Into<String>) -> DomainError {
        DomainError::state(format!("ticket {}", self.id), reason)
    }

    fn notify(&self, kind: EventKind, message: String) -> BroadcastReport {
        self.publisher.broadcast(&NotificationEvent::new(kind, message))
    }
}
