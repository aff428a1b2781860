//! Services - fare computation, trip search and notification delivery
//!
//! - `fare` - tier fare strategies and the seeded fare engine
//! - `search` - quotes every tier for a station pair
//! - `notification_worker` - async consumer for channel observers
//! - `booking` - reserve and pay a ticket, draining its notifications

pub mod booking;
pub mod fare;
pub mod notification_worker;
pub mod search;

pub use booking::{BookingDesk, BookingReceipt};
pub use fare::{compute_fare, FareEngine, FareStrategy, VariationSource};
pub use notification_worker::{NotificationHandler, NotificationWorker, WorkerStats};
pub use search::{TripQuote, TripSearch};
