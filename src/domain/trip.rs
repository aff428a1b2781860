//! Scheduled trip: a route served at a tier, with live operational state
//!
//! Every operational change (departure moved, platform assigned, delay,
//! cancellation) is broadcast through the trip's own publisher. A change that
//! leaves the state as it was broadcasts nothing.

use crate::domain::error::{DomainError, Result};
use crate::domain::event::{EventKind, NotificationEvent};
use crate::domain::publisher::{BroadcastReport, Observer, Publisher, SubjectId};
use crate::domain::types::{Fare, Route, Tier};
use crate::infra::metrics::Metrics;
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use std::sync::Arc;

const TIME_FORMAT: &str = "%d/%m %H:%M";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TripStatus {
    Scheduled,
    Cancelled,
}

/// One departure of a route at a given tier
#[derive(Debug)]
pub struct Trip {
    /// Service code, e.g. "FR9612"; the subject id is `trip:<code>`
    code: String,
    route: Route,
    tier: Tier,
    /// Scheduled departure, not including delay
    departure: DateTime<Utc>,
    /// Assigned platform, unknown until announced
    platform: Option<String>,
    /// Current total delay
    delay_minutes: u32,
    status: TripStatus,
    /// Fare quoted when the trip was scheduled
    fare: Fare,
    /// Notifies observers of every operational change
    publisher: Publisher,
}

impl Trip {
    pub fn new(code: &str, route: Route, tier: Tier, departure: DateTime<Utc>, fare: Fare) -> Result<Self> {
        let code = code.trim();
        if code.is_empty() {
            return Err(DomainError::invalid("trip.code", "must not be blank"));
        }
        Ok(Self {
            code: code.to_string(),
            route,
            tier,
            departure,
            platform: None,
            delay_minutes: 0,
            status: TripStatus::Scheduled,
            fare,
            publisher: Publisher::new(SubjectId::new(format!("trip:{}", code))),
        })
    }

    /// Record this trip's broadcasts into `metrics`
    pub fn with_metrics(mut self, metrics: Arc<Metrics>) -> Self {
        self.publisher.set_metrics(metrics);
        self
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn route(&self) -> &Route {
        &self.route
    }

    pub fn tier(&self) -> Tier {
        self.tier
    }

    pub fn departure(&self) -> DateTime<Utc> {
        self.departure
    }

    /// Scheduled departure plus the recorded delay
    pub fn expected_departure(&self) -> DateTime<Utc> {
        self.departure + Duration::minutes(i64::from(self.delay_minutes))
    }

    pub fn platform(&self) -> Option<&str> {
        self.platform.as_deref()
    }

    pub fn delay_minutes(&self) -> u32 {
        self.delay_minutes
    }

    pub fn status(&self) -> TripStatus {
        self.status
    }

    pub fn is_cancelled(&self) -> bool {
        self.status == TripStatus::Cancelled
    }

    pub fn fare(&self) -> Fare {
        self.fare
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

    pub fn change_departure(&mut self, departure: DateTime<Utc>) -> Result<Option<BroadcastReport>> {
        self.ensure_scheduled()?;
        if departure == self.departure {
            return Ok(None);
        }
        self.departure = departure;
        let message = format!(
            "Trip {} ({}) now departs at {}",
            self.code,
            self.route,
            departure.format(TIME_FORMAT)
        );
        Ok(Some(self.notify(EventKind::DepartureTimeChanged, message)))
    }

    pub fn assign_platform(&mut self, platform: &str) -> Result<Option<BroadcastReport>> {
        self.ensure_scheduled()?;
        let platform = platform.trim();
        if platform.is_empty() {
            return Err(DomainError::invalid("trip.platform", "must not be blank"));
        }
        if self.platform.as_deref() == Some(platform) {
            return Ok(None);
        }
        let message = match self.platform.replace(platform.to_string()) {
            Some(previous) => format!(
                "Trip {} moved from platform {} to platform {}",
                self.code, previous, platform
            ),
            None => format!("Trip {} departs from platform {}", self.code, platform),
        };
        Ok(Some(self.notify(EventKind::PlatformChanged, message)))
    }

    /// Record the current total delay in minutes
    pub fn record_delay(&mut self, minutes: u32) -> Result<Option<BroadcastReport>> {
        self.ensure_scheduled()?;
        if minutes == self.delay_minutes {
            return Ok(None);
        }
        self.delay_minutes = minutes;
        let message = format!(
            "Trip {} delayed by {} min, expected departure {}",
            self.code,
            minutes,
            self.expected_departure().format(TIME_FORMAT)
        );
        Ok(Some(self.notify(EventKind::Delay, message)))
    }

    pub fn cancel(&mut self) -> Result<BroadcastReport> {
        self.ensure_scheduled()?;
        self.status = TripStatus::Cancelled;
        let message = format!("Trip {} ({}) has been cancelled", self.code, self.route);
        Ok(self.notify(EventKind::TripCancelled, message))
    }

    fn ensure_scheduled(&self) -> Result<()> {
        if self.is_cancelled() {
            return Err(DomainError::state(format!("trip {}", self.code), "trip is cancelled"));
        }
        Ok(())
    }

    fn notify(&self, kind: EventKind, message: String) -> BroadcastReport {
        self.publisher.broadcast(&NotificationEvent::new(kind, message))
    }
}
