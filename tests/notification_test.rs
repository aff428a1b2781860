//! End-to-end notification delivery from trips and tickets to observers

use chrono::{Duration, TimeZone, Utc};
use parking_lot::Mutex;
use rail_tickets::domain::promotion::create_promotion;
use rail_tickets::domain::ticket::Ticket;
use rail_tickets::domain::trip::Trip;
use rail_tickets::domain::types::{Route, StationCatalog, Tier};
use rail_tickets::domain::{
    EventKind, NotificationEvent, Observer, Publisher, SharedPublisher, SubjectId,
};
use rail_tickets::infra::Metrics;
use rail_tickets::io::{create_notification_channel, ChannelObserver, LogObserver, Notification};
use rail_tickets::services::{FareEngine, NotificationWorker};
use std::sync::Arc;
use tokio::sync::mpsc;

/// Counts calls and remembers the order observers were invoked in
struct Counter {
    label: &'static str,
    order: Arc<Mutex<Vec<&'static str>>>,
}

impl Observer for Counter {
    fn name(&self) -> &str {
        self.label
    }

    fn on_event(&self, _subject: &SubjectId, _event: &NotificationEvent) -> anyhow::Result<()> {
        self.order.lock().push(self.label);
        Ok(())
    }
}

struct Broken;

impl Observer for Broken {
    fn name(&self) -> &str {
        "broken"
    }

    fn on_event(&self, _subject: &SubjectId, _event: &NotificationEvent) -> anyhow::Result<()> {
        anyhow::bail!("push gateway rejected the message")
    }
}

fn counter(label: &'static str, order: &Arc<Mutex<Vec<&'static str>>>) -> Arc<Counter> {
    Arc::new(Counter { label, order: order.clone() })
}

fn create_trip(metrics: Arc<Metrics>) -> Trip {
    let catalog = StationCatalog::builtin();
    let route = Route::new(
        catalog.require("Torino Porta Nuova").unwrap(),
        catalog.require("Napoli Centrale").unwrap(),
    )
    .unwrap();
    let mut engine = FareEngine::new(Some(8), metrics.clone());
    let fare = engine.quote(&route, Tier::Business).unwrap();
    let departure = Utc.with_ymd_and_hms(2025, 6, 1, 6, 0, 0).unwrap();

    Trip::new("FR9501", route, Tier::Business, departure, fare)
        .unwrap()
        .with_metrics(metrics)
}

#[test]
fn test_three_observers_then_detach_one() {
    let order = Arc::new(Mutex::new(Vec::new()));
    let mut trip = create_trip(Arc::new(Metrics::new()));
    let a = counter("a", &order);
    let b = counter("b", &order);
    let c = counter("c", &order);
    trip.attach(a.clone());
    trip.attach(b.clone());
    trip.attach(c.clone());

    trip.assign_platform("12").unwrap();
    assert_eq!(*order.lock(), vec!["a", "b", "c"]);

    trip.detach(&b);
    order.lock().clear();
    trip.record_delay(20).unwrap();
    assert_eq!(*order.lock(), vec!["a", "c"]);
}

#[test]
fn test_failing_observer_is_isolated_and_reported() {
    let order = Arc::new(Mutex::new(Vec::new()));
    let metrics = Arc::new(Metrics::new());
    let mut trip = create_trip(metrics.clone());
    trip.attach(counter("first", &order));
    trip.attach(Arc::new(Broken));
    trip.attach(counter("last", &order));

    let report = trip.cancel().unwrap();

    assert_eq!(*order.lock(), vec!["first", "last"]);
    assert_eq!(report.delivered(), 2);
    assert_eq!(report.failures().len(), 1);
    let failure = &report.failures()[0];
    assert_eq!(failure.observer, "broken");
    assert_eq!(failure.subject, "trip:FR9501");
    assert_eq!(failure.kind, EventKind::TripCancelled);

    let summary = metrics.summary();
    assert_eq!(summary.broadcasts_total, 1);
    assert_eq!(summary.observer_failures_total, 1);
    assert_eq!(summary.fares_computed, 1);
}

#[test]
fn test_repeated_attach_counts_once() {
    let order = Arc::new(Mutex::new(Vec::new()));
    let mut trip = create_trip(Arc::new(Metrics::new()));
    let a = counter("a", &order);

    trip.attach(a.clone());
    trip.attach(a.clone());
    trip.attach(Arc::new(LogObserver));
    assert_eq!(trip.publisher().observer_count(), 2);

    trip.detach(&a);
    trip.detach(&a);
    assert_eq!(trip.publisher().observer_count(), 1);
}

#[tokio::test]
async fn test_channel_fan_out_to_worker() {
    let metrics = Arc::new(Metrics::new());
    let mut trip = create_trip(metrics.clone());
    let (observer, rx) = create_notification_channel("mobile-push", 16);
    trip.attach(observer.clone());

    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();
    let worker = NotificationWorker::new(
        "mobile-push",
        rx,
        Box::new(move |n: Notification| {
            sink.lock().push((n.subject, n.event.kind()));
            Ok(())
        }),
    );
    let handle = tokio::spawn(worker.run());

    trip.assign_platform("4").unwrap();
    trip.record_delay(10).unwrap();
    trip.cancel().unwrap();

    // Dropping the trip drops the publisher's handle on the observer; the
    // local handle must go too before the worker sees the channel close.
    drop(trip);
    drop(observer);

    let stats = handle.await.unwrap();
    assert_eq!(stats.handled, 3);
    assert_eq!(
        *seen.lock(),
        vec![
            ("trip:FR9501".to_string(), EventKind::PlatformChanged),
            ("trip:FR9501".to_string(), EventKind::Delay),
            ("trip:FR9501".to_string(), EventKind::TripCancelled),
        ]
    );
}

#[test]
fn test_full_channel_does_not_block_broadcast() {
    let metrics = Arc::new(Metrics::new());
    let (tx, mut rx) = mpsc::channel(1);
    let observer = Arc::new(ChannelObserver::new("tiny", tx).with_metrics(metrics.clone()));
    let order = Arc::new(Mutex::new(Vec::new()));

    let shared = SharedPublisher::new(Publisher::new(SubjectId::new("trip:IC600")));
    shared.attach(observer.clone());
    shared.attach(counter("after", &order));

    let first = shared.broadcast(&NotificationEvent::new(EventKind::Delay, "5 min"));
    let second = shared.broadcast(&NotificationEvent::new(EventKind::Delay, "10 min"));

    assert!(first.is_clean());
    assert_eq!(second.failures().len(), 1);
    assert_eq!(*order.lock(), vec!["after", "after"]);
    assert_eq!(metrics.summary().channel_dropped_total, 1);
    assert_eq!(rx.try_recv().unwrap().event.message(), "5 min");
}

#[test]
fn test_ticket_lifecycle_notifications() {
    let order = Arc::new(Mutex::new(Vec::new()));
    let trip = create_trip(Arc::new(Metrics::new()));
    let now = Utc.with_ymd_and_hms(2025, 6, 1, 5, 0, 0).unwrap();

    let mut ticket = Ticket::reserve(&trip, "Luca Bianchi", Duration::minutes(10), now).unwrap();
    ticket.attach(counter("wallet", &order));

    let promo = create_promotion("standard", "Early bird", 25.0).unwrap();
    let price = ticket.apply_promotion(&promo).unwrap();
    assert!(price < trip.fare().price);

    ticket.confirm_payment(price, now + Duration::minutes(2)).unwrap();
    let loyalty = create_promotion("loyalty", "Gold member", 10.0).unwrap();
    ticket.grant_loyalty_promotion(loyalty).unwrap();

    assert_eq!(*order.lock(), vec!["wallet", "wallet"]);
    assert!(ticket.expire_reservation(now + Duration::hours(1)).is_none());
}
