//! Properties of distance and fare computation over the station catalog

use rail_tickets::domain::geo::distance;
use rail_tickets::domain::types::{Route, StationCatalog, Tier};
use rail_tickets::domain::{DomainError, ErrorCategory};
use rail_tickets::services::compute_fare;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

const SAMPLES: usize = 2_000;

fn mean_price(distance_km: i64, tier: Tier, rng: &mut ChaCha8Rng) -> f64 {
    let total: f64 = (0..SAMPLES).map(|_| compute_fare(distance_km, tier, rng).unwrap().price).sum();
    total / SAMPLES as f64
}

fn mean_duration(distance_km: i64, tier: Tier, rng: &mut ChaCha8Rng) -> f64 {
    let total: f64 = (0..SAMPLES)
        .map(|_| f64::from(compute_fare(distance_km, tier, rng).unwrap().duration_minutes))
        .sum();
    total / SAMPLES as f64
}

#[test]
fn test_distance_non_negative_for_all_pairs() {
    let stations = StationCatalog::builtin().stations();
    for a in stations {
        assert_eq!(distance(a.coordinate(), a.coordinate()), 0.0);
        for b in stations {
            assert!(distance(a.coordinate(), b.coordinate()) >= 0.0);
        }
    }
}

#[test]
fn test_every_route_quotes_positive_fares() {
    let stations = StationCatalog::builtin().stations();
    let mut rng = ChaCha8Rng::seed_from_u64(2024);

    for a in stations {
        for b in stations.iter().filter(|b| b.name() != a.name()) {
            let route = Route::new(a, b).unwrap();
            for tier in Tier::ALL {
                let fare = compute_fare(route.fare_distance_km(), tier, &mut rng).unwrap();
                assert!(fare.price > 0.0, "{} {}", route, tier);
                let cents = fare.price * 100.0;
                assert!((cents - cents.round()).abs() < 1e-6, "{} not in cents", fare.price);
            }
        }
    }
}

#[test]
fn test_premium_tiers_cost_more_on_average() {
    let mut rng = ChaCha8Rng::seed_from_u64(99);

    for distance_km in [50, 300, 900] {
        let economy = mean_price(distance_km, Tier::Economy, &mut rng);
        let standard = mean_price(distance_km, Tier::Standard, &mut rng);
        let business = mean_price(distance_km, Tier::Business, &mut rng);

        assert!(standard > economy, "{} km: {} <= {}", distance_km, standard, economy);
        assert!(business > standard, "{} km: {} <= {}", distance_km, business, standard);
    }
}

#[test]
fn test_premium_tiers_are_faster_on_average() {
    let mut rng = ChaCha8Rng::seed_from_u64(5);

    let economy = mean_duration(600, Tier::Economy, &mut rng);
    let standard = mean_duration(600, Tier::Standard, &mut rng);
    let business = mean_duration(600, Tier::Business, &mut rng);

    assert!(standard < economy);
    assert!(business < standard);
    // Economy centres on 600 km / 70 km/h
    assert!((economy - 514.3).abs() < 10.0, "economy mean {}", economy);
}

#[test]
fn test_single_sample_bounds() {
    let mut rng = ChaCha8Rng::seed_from_u64(17);

    for _ in 0..SAMPLES {
        let economy = compute_fare(1000, Tier::Economy, &mut rng).unwrap();
        // 1000 km at 70 km/h is 857.1 min, varied by +-10%
        assert!((771..=943).contains(&economy.duration_minutes), "{}", economy.duration_minutes);
        assert!((59.5..=80.5).contains(&economy.price));

        let business = compute_fare(1000, Tier::Business, &mut rng).unwrap();
        // Economy sample in [59.50, 80.50] scaled by [3.0, 4.0]
        assert!((178.0..=322.5).contains(&business.price), "{}", business.price);
    }
}

#[test]
fn test_invalid_distance() {
    let mut rng = ChaCha8Rng::seed_from_u64(0);
    for bad in [0, -1, -500] {
        let err = compute_fare(bad, Tier::Standard, &mut rng).unwrap_err();
        assert_eq!(err, DomainError::InvalidDistance(bad));
        assert_eq!(err.category(), ErrorCategory::InvalidDistance);
    }
}
