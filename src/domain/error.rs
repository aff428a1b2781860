//! Error taxonomy for the ticketing core
//!
//! Construction-time invariant violations are rejected immediately; nothing in
//! the core hands out a partially-valid value. Observer failures are the one
//! exception: they are collected during a broadcast and surfaced afterwards.

use crate::domain::event::EventKind;
use thiserror::Error;

/// Coarse classification of a [`DomainError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    InvalidArgument,
    UnsupportedTier,
    InvalidDistance,
    ObserverFailure,
}

/// A single observer whose reaction failed during a broadcast
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("observer '{observer}' failed on {kind} for {subject}: {message}")]
pub struct ObserverFailure {
    /// Subject id of the broadcasting publisher
    pub subject: String,
    /// Name reported by the observer
    pub observer: String,
    /// Kind of the event being delivered
    pub kind: EventKind,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum DomainError {
    #[error("invalid {field}: {reason}")]
    InvalidArgument { field: &'static str, reason: String },

    #[error("unknown promotion kind '{0}' (expected 'standard' or 'loyalty')")]
    InvalidPromotionKind(String),

    #[error("promotion name must not be empty")]
    InvalidName,

    #[error("discount {0} is outside (0, 100]")]
    InvalidDiscount(f64),

    #[error("unsupported tier '{0}'")]
    UnsupportedTier(String),

    #[error("distance must be positive, got {0} km")]
    InvalidDistance(i64),

    #[error("{entity}: {reason}")]
    InvalidState { entity: String, reason: String },

    #[error(transparent)]
    ObserverFailure(#[from] ObserverFailure),
}

impl DomainError {
    pub(crate) fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        DomainError::InvalidArgument { field, reason: reason.into() }
    }

    pub(crate) fn state(entity: impl Into<String>, reason: impl Into<String>) -> Self {
        DomainError::InvalidState { entity: entity.into(), reason: reason.into() }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            DomainError::InvalidArgument { .. }
            | DomainError::InvalidPromotionKind(_)
            | DomainError::InvalidName
            | DomainError::InvalidDiscount(_)
            | DomainError::InvalidState { .. } => ErrorCategory::InvalidArgument,
            DomainError::UnsupportedTier(_) => ErrorCategory::UnsupportedTier,
            DomainError::InvalidDistance(_) => ErrorCategory::InvalidDistance,
            DomainError::ObserverFailure(_) => ErrorCategory::ObserverFailure,
        }
    }
}

pub type Result<T> = std::result::Result<T, DomainError>;
