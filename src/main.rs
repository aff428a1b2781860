//! rail-quote - price and duration quotes between two stations
//!
//! Module structure:
//! - `domain/` - Stations, routes, tiers, promotions, trips, tickets, notifications
//! - `services/` - Fare engine, trip search, notification worker
//! - `io/` - Observer adapters (channel fan-out, log)
//! - `infra/` - Config, metrics, logging

use anyhow::Context;
use chrono::{Duration, Utc};
use clap::Parser;
use rail_tickets::domain::promotion::create_promotion;
use rail_tickets::domain::trip::Trip;
use rail_tickets::domain::types::{StationCatalog, Tier};
use rail_tickets::infra::logging::init_logging;
use rail_tickets::infra::{Config, Metrics};
use rail_tickets::io::Notification;
use rail_tickets::services::{BookingDesk, FareEngine, NotificationHandler, TripSearch};
use std::sync::Arc;
use tracing::info;

/// Quote fares between two stations for one or every service tier
#[derive(Parser, Debug)]
#[command(
    name = "rail-quote",
    version = concat!(env!("CARGO_PKG_VERSION"), " (", env!("RAIL_REVISION"), ")"),
    about
)]
struct Args {
    /// Path to TOML configuration file (falls back to RAIL_CONFIG, then config/dev.toml)
    #[arg(short, long)]
    config: Option<String>,

    /// Origin station name
    #[arg(long, required_unless_present = "list_stations")]
    from: Option<String>,

    /// Destination station name
    #[arg(long, required_unless_present = "list_stations")]
    to: Option<String>,

    /// Quote only this tier (economy, standard, business)
    #[arg(long)]
    tier: Option<String>,

    /// Seed for reproducible fares (overrides the config file)
    #[arg(long)]
    seed: Option<u64>,

    /// Emit logs and quotes as JSON
    #[arg(long)]
    json: bool,

    /// Print the station catalog and exit
    #[arg(long)]
    list_stations: bool,

    /// Book and pay a ticket for this passenger on the quoted tier
    #[arg(long, requires = "tier")]
    book: Option<String>,

    /// Standard promotion discount in percent applied to the booking
    #[arg(long, requires = "book")]
    discount: Option<f64>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_logging(args.json);

    let catalog = StationCatalog::builtin();
    if args.list_stations {
        for station in catalog.stations() {
            let c = station.coordinate();
            println!("{:<30} {:>8.4} {:>8.4}", station.name(), c.lat, c.lon);
        }
        return Ok(());
    }

    let config_path = args.config.clone().unwrap_or_else(|| Config::resolve_config_path(&[]));
    let mut config = Config::load_from_path(&config_path);
    if let Some(seed) = args.seed {
        config = config.with_fare_seed(seed);
    }
    info!(
        service = %config.service_name(),
        config_file = %config.config_file(),
        fare_seed = ?config.fare_seed(),
        revision = env!("RAIL_REVISION"),
        "config_loaded"
    );

    let metrics = Arc::new(Metrics::new());
    let engine = FareEngine::new(config.fare_seed(), metrics.clone());
    let mut search = TripSearch::new(catalog, engine);

    // clap guarantees both are present unless --list-stations
    let from = args.from.as_deref().context("--from is required")?;
    let to = args.to.as_deref().context("--to is required")?;

    let quotes = match args.tier.as_deref() {
        Some(tier) => {
            let tier: Tier = tier.parse()?;
            vec![search.quote(from, to, tier)?]
        }
        None => search.quote_all(from, to)?,
    };

    for quote in &quotes {
        if args.json {
            println!("{}", serde_json::to_string(quote)?);
        } else {
            println!(
                "{} -> {} [{}] {:.0} km  {}h{:02}m  {:.2}",
                quote.origin,
                quote.destination,
                quote.tier,
                quote.distance_km,
                quote.fare.duration_minutes / 60,
                quote.fare.duration_minutes % 60,
                quote.fare.price
            );
        }
    }

    if let Some(passenger) = args.book.as_deref() {
        let quote = quotes.first().context("no quote to book")?;
        let route = search.route(from, to)?;
        let now = Utc::now();
        let code = format!("RQ{}", now.format("%H%M"));
        let trip = Trip::new(&code, route, quote.tier, now + Duration::hours(2), quote.fare)?
            .with_metrics(metrics.clone());
        let promotion = args
            .discount
            .map(|percent| create_promotion("standard", "rail-quote", percent))
            .transpose()?;

        let json = args.json;
        let handler: NotificationHandler = Box::new(move |n: Notification| {
            if json {
                println!("{}", n.event.to_json());
            } else {
                println!("{} {}", n.subject, n.event);
            }
            Ok(())
        });
        let desk = BookingDesk::new(&config, metrics.clone());
        let receipt = desk.book(&trip, passenger, promotion.as_ref(), now, handler).await?;

        if args.json {
            println!("{}", serde_json::to_string(&receipt)?);
        } else {
            println!("ticket {} for {} on {}: paid {:.2}", receipt.ticket_id, receipt.passenger, receipt.trip_code, receipt.price);
        }
    }

    if config.log_metrics_summary() {
        metrics.summary().log();
    }
    Ok(())
}
