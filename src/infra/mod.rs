//! Infrastructure - configuration, metrics and logging
//!
//! - `config` - Application configuration (TOML loading, defaults)
//! - `metrics` - Lock-free counters for fares and notifications
//! - `logging` - tracing subscriber setup for binaries

pub mod config;
pub mod logging;
pub mod metrics;

pub use config::Config;
pub use metrics::Metrics;
