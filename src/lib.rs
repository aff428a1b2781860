//! Rail ticketing core
//!
//! Fare/duration computation per service tier and change notifications for
//! trips and tickets.

pub mod domain;
pub mod infra;
pub mod io;
pub mod services;
