//! Fare and duration strategies per service tier
//!
//! Economy is the baseline model: duration at 70 km/h and 0.07 per km, each
//! perturbed by an independent uniform variation. Standard and Business are
//! not separate models; they take a freshly sampled Economy fare for the same
//! distance and scale it, so for a given sample they are always faster and
//! more expensive than Economy.
//!
//! Randomness comes from a caller-supplied [`VariationSource`]. Any
//! `rand::Rng` is one; tests can plug in a fixed source to get exact values.

use crate::domain::error::{DomainError, Result};
use crate::domain::types::{round_cents, Route, Tier};
use crate::infra::metrics::Metrics;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::sync::Arc;
use tracing::debug;

pub use crate::domain::types::Fare;

const BASE_SPEED_KMH: f64 = 70.0;
const BASE_PRICE_PER_KM: f64 = 0.07;
const DURATION_VARIATION: (f64, f64) = (-0.10, 0.10);
const PRICE_VARIATION: (f64, f64) = (-0.15, 0.15);

// (duration reduction, price increase) drawn as fractions of the Economy sample
const STANDARD_SCALING: ((f64, f64), (f64, f64)) = ((0.45, 0.60), (1.00, 1.20));
const BUSINESS_SCALING: ((f64, f64), (f64, f64)) = ((0.70, 0.80), (2.00, 3.00));

/// Source of uniformly distributed variation
pub trait VariationSource {
    /// A value in `[lo, hi)`
    fn draw(&mut self, lo: f64, hi: f64) -> f64;
}

impl<R: Rng> VariationSource for R {
    fn draw(&mut self, lo: f64, hi: f64) -> f64 {
        self.gen_range(lo..hi)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FareStrategy {
    Economy,
    Standard,
    Business,
}

impl FareStrategy {
    pub fn for_tier(tier: Tier) -> Self {
        match tier {
            Tier::Economy => FareStrategy::Economy,
            Tier::Standard => FareStrategy::Standard,
            Tier::Business => FareStrategy::Business,
        }
    }

    /// Strategy for a tier name from configuration or user input
    pub fn for_tier_name(name: &str) -> Result<Self> {
        name.parse::<Tier>().map(Self::for_tier)
    }

    pub fn tier(&self) -> Tier {
        match self {
            FareStrategy::Economy => Tier::Economy,
            FareStrategy::Standard => Tier::Standard,
            FareStrategy::Business => Tier::Business,
        }
    }

    fn scaling(&self) -> Option<((f64, f64), (f64, f64))> {
        match self {
            FareStrategy::Economy => None,
            FareStrategy::Standard => Some(STANDARD_SCALING),
            FareStrategy::Business => Some(BUSINESS_SCALING),
        }
    }

    /// Travel time in whole minutes. Distance is not validated here.
    pub fn duration<V: VariationSource>(&self, distance_km: u32, source: &mut V) -> u32 {
        let variation = 1.0 + source.draw(DURATION_VARIATION.0, DURATION_VARIATION.1);
        let economy = (f64::from(distance_km) / BASE_SPEED_KMH * variation * 60.0).round();

        match self.scaling() {
            None => economy as u32,
            Some(((lo, hi), _)) => {
                let reduction = source.draw(lo, hi);
                (economy * (1.0 - reduction)).round() as u32
            }
        }
    }

    /// Price rounded to cents. Distance is not validated here.
    pub fn price<V: VariationSource>(&self, distance_km: u32, source: &mut V) -> f64 {
        let variation = 1.0 + source.draw(PRICE_VARIATION.0, PRICE_VARIATION.1);
        let economy = round_cents(f64::from(distance_km) * BASE_PRICE_PER_KM * variation);

        match self.scaling() {
            None => economy,
            Some((_, (lo, hi))) => {
                let increase = source.draw(lo, hi);
                round_cents(economy * (1.0 + increase))
            }
        }
    }

    /// Duration then price, each from its own draws
    pub fn compute<V: VariationSource>(&self, distance_km: u32, source: &mut V) -> Fare {
        let duration_minutes = self.duration(distance_km, source);
        let price = self.price(distance_km, source);
        Fare { duration_minutes, price }
    }
}

/// Fare for `distance_km` at `tier`; the distance must be positive
pub fn compute_fare<V: VariationSource>(
    distance_km: i64,
    tier: Tier,
    source: &mut V,
) -> Result<Fare> {
    if distance_km <= 0 {
        return Err(DomainError::InvalidDistance(distance_km));
    }
    let km = u32::try_from(distance_km).map_err(|_| DomainError::InvalidDistance(distance_km))?;
    Ok(FareStrategy::for_tier(tier).compute(km, source))
}

/// Fare computation with an owned generator and metrics
pub struct FareEngine {
    rng: ChaCha8Rng,
    metrics: Arc<Metrics>,
}

impl FareEngine {
    /// Deterministic when `seed` is set, entropy-seeded otherwise
    pub fn new(seed: Option<u64>, metrics: Arc<Metrics>) -> Self {
        let rng = match seed {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::from_entropy(),
        };
        Self { rng, metrics }
    }

    pub fn compute(&mut self, distance_km: i64, tier: Tier) -> Result<Fare> {
        match compute_fare(distance_km, tier, &mut self.rng) {
            Ok(fare) => {
                self.metrics.record_fare();
                debug!(
                    distance_km = distance_km,
                    tier = %tier,
                    duration_minutes = fare.duration_minutes,
                    price = fare.price,
                    "fare_computed"
                );
                Ok(fare)
            }
            Err(e) => {
                self.metrics.record_fare_rejected();
                Err(e)
            }
        }
    }

    pub fn quote(&mut self, route: &Route, tier: Tier) -> Result<Fare> {
        self.compute(route.fare_distance_km(), tier)
    }
}
