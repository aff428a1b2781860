//! Trip search: resolve stations, build the route, quote every tier

use crate::domain::error::Result;
use crate::domain::types::{Route, StationCatalog, Tier};
use crate::services::fare::{Fare, FareEngine};
use serde::Serialize;
use tracing::info;

/// One candidate trip as shown to a customer
#[derive(Debug, Clone, Serialize)]
pub struct TripQuote {
    pub origin: String,
    pub destination: String,
    pub tier: Tier,
    /// Route distance in km (unrounded)
    pub distance_km: f64,
    pub fare: Fare,
}

pub struct TripSearch<'a> {
    catalog: &'a StationCatalog,
    engine: FareEngine,
}

impl<'a> TripSearch<'a> {
    pub fn new(catalog: &'a StationCatalog, engine: FareEngine) -> Self {
        Self { catalog, engine }
    }

    pub fn route(&self, origin: &str, destination: &str) -> Result<Route> {
        let from = self.catalog.require(origin)?;
        let to = self.catalog.require(destination)?;
        Route::new(from, to)
    }

    /// Quote a single tier
    pub fn quote(&mut self, origin: &str, destination: &str, tier: Tier) -> Result<TripQuote> {
        let route = self.route(origin, destination)?;
        self.quote_route(&route, tier)
    }

    /// Quote every tier, Economy first
    pub fn quote_all(&mut self, origin: &str, destination: &str) -> Result<Vec<TripQuote>> {
        let route = self.route(origin, destination)?;
        let quotes = Tier::ALL
            .iter()
            .map(|&tier| self.quote_route(&route, tier))
            .collect::<Result<Vec<_>>>()?;

        info!(route = %route, distance_km = format!("{:.1}", route.distance_km()), quotes = quotes.len(), "trip_search");
        Ok(quotes)
    }

    fn quote_route(&mut self, route: &Route, tier: Tier) -> Result<TripQuote> {
        let fare = self.engine.quote(route, tier)?;
        Ok(TripQuote {
            origin: route.origin().name().to_string(),
            destination: route.destination().name().to_string(),
            tier,
            distance_km: route.distance_km(),
            fare,
        })
    }
}
