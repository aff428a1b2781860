//! Stations, routes and service tiers

use crate::domain::error::{DomainError, Result};
use crate::domain::geo::{distance, Coordinate};
use rustc_hash::FxHashMap;
use serde::Serialize;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;
use std::sync::LazyLock;

/// A named station with a fixed position
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Station {
    name: String,
    coordinate: Coordinate,
}

impl Station {
    pub fn new(name: impl Into<String>, coordinate: Coordinate) -> Result<Self> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(DomainError::invalid("station.name", "must not be blank"));
        }
        if !coordinate.is_valid() {
            return Err(DomainError::invalid(
                "station.coordinate",
                format!("({}, {}) is not a valid lat/lon", coordinate.lat, coordinate.lon),
            ));
        }
        Ok(Self { name, coordinate })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn coordinate(&self) -> Coordinate {
        self.coordinate
    }
}

impl fmt::Display for Station {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

// (name, lat, lon)
const STATION_TABLE: &[(&str, f64, f64)] = &[
    ("Roma Termini", 41.9010, 12.5018),
    ("Milano Centrale", 45.4860, 9.2040),
    ("Napoli Centrale", 40.8530, 14.2720),
    ("Torino Porta Nuova", 45.0620, 7.6780),
    ("Firenze Santa Maria Novella", 43.7765, 11.2480),
    ("Bologna Centrale", 44.5058, 11.3431),
    ("Venezia Santa Lucia", 45.4410, 12.3210),
    ("Genova Piazza Principe", 44.4175, 8.9210),
    ("Bari Centrale", 41.1177, 16.8700),
    ("Reggio Calabria Centrale", 38.1030, 15.6390),
    ("Palermo Centrale", 38.1100, 13.3670),
    ("Verona Porta Nuova", 45.4290, 10.9820),
];

/// Read-only catalog of known stations, looked up case-insensitively by name
pub struct StationCatalog {
    stations: Vec<Station>,
    by_name: FxHashMap<String, usize>,
}

static BUILTIN: LazyLock<StationCatalog> = LazyLock::new(|| {
    let stations = STATION_TABLE
        .iter()
        .map(|&(name, lat, lon)| Station { name: name.to_string(), coordinate: Coordinate::new(lat, lon) })
        .collect();
    StationCatalog::from_stations(stations).expect("built-in station names are unique")
});

impl StationCatalog {
    /// The process-wide built-in catalog
    pub fn builtin() -> &'static StationCatalog {
        &BUILTIN
    }

    /// Build a catalog; names must be unique ignoring case
    pub fn from_stations(stations: Vec<Station>) -> Result<Self> {
        let mut by_name = FxHashMap::default();
        for (i, station) in stations.iter().enumerate() {
            let key = station.name.trim().to_lowercase();
            if by_name.insert(key, i).is_some() {
                return Err(DomainError::invalid(
                    "station.name",
                    format!("duplicate station '{}'", station.name),
                ));
            }
        }
        Ok(Self { stations, by_name })
    }

    pub fn get(&self, name: &str) -> Option<&Station> {
        self.by_name.get(&name.trim().to_lowercase()).map(|&i| &self.stations[i])
    }

    /// Like [`get`](Self::get) but reports unknown names as `InvalidArgument`
    pub fn require(&self, name: &str) -> Result<&Station> {
        self.get(name)
            .ok_or_else(|| DomainError::invalid("station", format!("unknown station '{}'", name)))
    }

    pub fn stations(&self) -> &[Station] {
        &self.stations
    }

    pub fn len(&self) -> usize {
        self.stations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stations.is_empty()
    }
}

/// Service class of a trip
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    Economy,
    Standard,
    Business,
}

impl Tier {
    pub const ALL: [Tier; 3] = [Tier::Economy, Tier::Standard, Tier::Business];

    /// Nominal seat count (descriptive only)
    pub fn seats(&self) -> u32 {
        match self {
            Tier::Economy => 400,
            Tier::Standard => 300,
            Tier::Business => 150,
        }
    }

    /// Nominal average speed in km/h (descriptive only, not a fare input)
    pub fn average_speed_kmh(&self) -> u32 {
        match self {
            Tier::Economy => 70,
            Tier::Standard => 140,
            Tier::Business => 280,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Tier::Economy => "economy",
            Tier::Standard => "standard",
            Tier::Business => "business",
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Tier {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "economy" => Ok(Tier::Economy),
            "standard" => Ok(Tier::Standard),
            "business" => Ok(Tier::Business),
            _ => Err(DomainError::UnsupportedTier(s.to_string())),
        }
    }
}

/// Price and travel time for one trip, as produced by the fare engine
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Fare {
    pub duration_minutes: u32,
    /// Currency units, rounded to cents
    pub price: f64,
}

/// Round a currency amount to cents
#[inline]
pub fn round_cents(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Shortest distance a route may span; anything less rounds to 0 km and
/// cannot be priced
pub const MIN_ROUTE_KM: f64 = 0.5;

/// Ordered origin/destination pair with its distance computed once
#[derive(Debug, Clone, Serialize)]
pub struct Route {
    origin: Station,
    destination: Station,
    distance_km: f64,
}

impl Route {
    pub fn new(origin: &Station, destination: &Station) -> Result<Self> {
        if origin.name == destination.name {
            return Err(DomainError::invalid(
                "route",
                format!("origin and destination are both '{}'", origin.name),
            ));
        }
        let distance_km = distance(origin.coordinate, destination.coordinate);
        if distance_km < MIN_ROUTE_KM {
            return Err(DomainError::invalid(
                "route",
                format!("{} and {} are only {:.3} km apart", origin.name, destination.name, distance_km),
            ));
        }
        Ok(Self { origin: origin.clone(), destination: destination.clone(), distance_km })
    }

    pub fn origin(&self) -> &Station {
        &self.origin
    }

    pub fn destination(&self) -> &Station {
        &self.destination
    }

    pub fn distance_km(&self) -> f64 {
        self.distance_km
    }

    /// Distance rounded to whole km, as the fare engine takes it
    pub fn fare_distance_km(&self) -> i64 {
        self.distance_km.round() as i64
    }
}

impl PartialEq for Route {
    fn eq(&self, other: &Self) -> bool {
        self.origin.name == other.origin.name && self.destination.name == other.destination.name
    }
}

impl Eq for Route {}

impl Hash for Route {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.origin.name.hash(state);
        self.destination.name.hash(state);
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", self.origin, self.destination)
    }
}
