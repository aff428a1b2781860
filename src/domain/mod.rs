//! Domain models - ticketing value types and stateful entities
//!
//! - `types` - stations, routes, tiers and fares
//! - `geo` - coordinates and distance
//! - `promotion` - discount promotions
//! - `event` - notification events
//! - `publisher` - observer registry owned by entities
//! - `trip`, `ticket` - entities that broadcast their state changes
//! - `error` - error taxonomy

pub mod error;
pub mod event;
pub mod geo;
pub mod promotion;
pub mod publisher;
pub mod ticket;
pub mod trip;
pub mod types;

pub use error::{DomainError, ErrorCategory, ObserverFailure};
pub use event::{EventKind, NotificationEvent};
pub use publisher::{BroadcastReport, Observer, Publisher, SharedPublisher, SubjectId};
