//! Notification events broadcast by trips, tickets and promotions

use serde::Serialize;
use std::fmt;

/// Closed set of domain changes an observer can be told about
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    DepartureTimeChanged,
    PlatformChanged,
    Delay,
    TripCancelled,
    ReservationExpired,
    PaymentConfirmed,
    TicketModified,
    LoyaltyPromotion,
}

impl EventKind {
    pub const ALL: [EventKind; 8] = [
        EventKind::DepartureTimeChanged,
        EventKind::PlatformChanged,
        EventKind::Delay,
        EventKind::TripCancelled,
        EventKind::ReservationExpired,
        EventKind::PaymentConfirmed,
        EventKind::TicketModified,
        EventKind::LoyaltyPromotion,
    ];

    #[inline]
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::DepartureTimeChanged => "departure_time_changed",
            EventKind::PlatformChanged => "platform_changed",
            EventKind::Delay => "delay",
            EventKind::TripCancelled => "trip_cancelled",
            EventKind::ReservationExpired => "reservation_expired",
            EventKind::PaymentConfirmed => "payment_confirmed",
            EventKind::TicketModified => "ticket_modified",
            EventKind::LoyaltyPromotion => "loyalty_promotion",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Immutable (kind, message) pair describing a state change
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct NotificationEvent {
    kind: EventKind,
    message: String,
}

impl NotificationEvent {
    pub fn new(kind: EventKind, message: impl Into<String>) -> Self {
        Self { kind, message: message.into() }
    }

    pub fn kind(&self) -> EventKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// Short-key JSON rendering (`{"t": kind, "msg": message}`)
    pub fn to_json(&self) -> String {
        serde_json::json!({ "t": self.kind.as_str(), "msg": self.message }).to_string()
    }
}

impl fmt::Display for NotificationEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.kind, self.message)
    }
}
