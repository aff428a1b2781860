//! Percentage-discount promotions
//!
//! A promotion's id is derived from its name and discount, so two promotions
//! built from the same pair are the same promotion.

use crate::domain::error::{DomainError, Result};
use serde::Serialize;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;
use xxhash_rust::xxh32::xxh32;

const ID_MODULUS: u32 = 100_000_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PromotionKind {
    Standard,
    Loyalty,
}

impl PromotionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PromotionKind::Standard => "standard",
            PromotionKind::Loyalty => "loyalty",
        }
    }
}

impl FromStr for PromotionKind {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "standard" => Ok(PromotionKind::Standard),
            "loyalty" => Ok(PromotionKind::Loyalty),
            _ => Err(DomainError::InvalidPromotionKind(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Promotion {
    id: String,
    kind: PromotionKind,
    name: String,
    discount_percent: f64,
}

/// Build a promotion from a kind string as it arrives from config or admin input
pub fn create_promotion(kind: &str, name: &str, discount_percent: f64) -> Result<Promotion> {
    let kind: PromotionKind = kind.parse()?;
    Promotion::new(kind, name, discount_percent)
}

impl Promotion {
    pub fn new(kind: PromotionKind, name: &str, discount_percent: f64) -> Result<Self> {
        if name.trim().is_empty() {
            return Err(DomainError::InvalidName);
        }
        if !(discount_percent > 0.0 && discount_percent <= 100.0) {
            return Err(DomainError::InvalidDiscount(discount_percent));
        }
        Ok(Self {
            id: promotion_id(name, discount_percent),
            kind,
            name: name.to_string(),
            discount_percent,
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn kind(&self) -> PromotionKind {
        self.kind
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn discount_percent(&self) -> f64 {
        self.discount_percent
    }

    /// Price after the discount; always in `[0, price)` for a positive price
    pub fn apply_discount(&self, price: f64) -> f64 {
        price * (1.0 - self.discount_percent / 100.0)
    }
}

/// `PROMO_` followed by an 8-digit token hashed from `name_discount`
fn promotion_id(name: &str, discount_percent: f64) -> String {
    let key = format!("{}_{}", name, discount_percent);
    let token = xxh32(key.as_bytes(), 0) % ID_MODULUS;
    format!("PROMO_{:08}", token)
}

impl PartialEq for Promotion {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Promotion {}

impl Hash for Promotion {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Display for Promotion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}, -{}%)", self.name, self.id, self.discount_percent)
    }
}
