//! IO modules - observer adapters towards the outside world
//!
//! - `channel_observer` - bounded channel fan-out for async consumers
//! - `log_observer` - writes notifications to the structured log

pub mod channel_observer;
pub mod log_observer;

pub use channel_observer::{create_notification_channel, ChannelObserver, Notification};
pub use log_observer::LogObserver;
