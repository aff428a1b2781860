//! Publisher/observer registry for domain change notifications
//!
//! Every stateful entity (trip, ticket) owns one [`Publisher`]. Observers are
//! attached and detached explicitly; the publisher holds an `Arc` but never
//! decides when an observer goes away.
//!
//! Delivery is synchronous and in attachment order. A failing or panicking
//! observer is recorded in the returned [`BroadcastReport`] and delivery
//! continues with the next one.

use crate::domain::error::{DomainError, ObserverFailure, Result};
use crate::domain::event::{EventKind, NotificationEvent};
use crate::infra::metrics::Metrics;
use parking_lot::ReentrantMutex;
use smallvec::SmallVec;
use std::any::Any;
use std::cell::RefCell;
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use tracing::{debug, warn};
use uuid::Uuid;

/// Stable identifier of the entity that owns a publisher
///
/// Used for logging and addressing; it plays no part in equality of the
/// owning entity.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SubjectId(String);

impl SubjectId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Fresh time-sortable id for a publisher with no natural key
    pub fn generate() -> Self {
        Self(Uuid::now_v7().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SubjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Anything that wants to react to notification events
pub trait Observer: Send + Sync {
    /// Name used when reporting failures
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }

    fn on_event(&self, subject: &SubjectId, event: &NotificationEvent) -> anyhow::Result<()>;
}

/// Outcome of one broadcast
#[derive(Debug, Clone)]
pub struct BroadcastReport {
    kind: EventKind,
    delivered: usize,
    failures: SmallVec<[ObserverFailure; 2]>,
}

impl BroadcastReport {
    pub fn kind(&self) -> EventKind {
        self.kind
    }

    /// Observers whose reaction returned successfully
    pub fn delivered(&self) -> usize {
        self.delivered
    }

    pub fn failures(&self) -> &[ObserverFailure] {
        &self.failures
    }

    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    /// Delivered count, or the first failure as an error
    pub fn into_result(self) -> Result<usize> {
        match self.failures.into_iter().next() {
            Some(failure) => Err(DomainError::ObserverFailure(failure)),
            None => Ok(self.delivered),
        }
    }
}

/// Observer registry owned by one entity
pub struct Publisher {
    /// Id stamped on every delivery and failure report
    subject: SubjectId,
    /// Attached observers, in attachment order
    observers: Vec<Arc<dyn Observer>>,
    /// Broadcast and failure counters, when the owner records them
    metrics: Option<Arc<Metrics>>,
}

impl Publisher {
    pub fn new(subject: SubjectId) -> Self {
        Self { subject, observers: Vec::new(), metrics: None }
    }

    pub fn with_metrics(subject: SubjectId, metrics: Arc<Metrics>) -> Self {
        Self { subject, observers: Vec::new(), metrics: Some(metrics) }
    }

    pub fn subject_id(&self) -> &SubjectId {
        &self.subject
    }

    /// Start recording broadcasts into `metrics`, keeping attached observers
    pub fn set_metrics(&mut self, metrics: Arc<Metrics>) {
        self.metrics = Some(metrics);
    }

    pub fn observer_count(&self) -> usize {
        self.observers.len()
    }

    pub fn contains<O: Observer + ?Sized>(&self, observer: &Arc<O>) -> bool {
        self.position(observer).is_some()
    }

    /// Add an observer; returns false if it was already attached
    pub fn attach(&mut self, observer: Arc<dyn Observer>) -> bool {
        if self.contains(&observer) {
            debug!(subject = %self.subject, observer = %observer.name(), "observer_already_attached");
            return false;
        }
        debug!(subject = %self.subject, observer = %observer.name(), "observer_attached");
        self.observers.push(observer);
        true
    }

    /// Remove an observer; unknown observers are ignored
    pub fn detach<O: Observer + ?Sized>(&mut self, observer: &Arc<O>) -> bool {
        match self.position(observer) {
            Some(idx) => {
                let removed = self.observers.remove(idx);
                debug!(subject = %self.subject, observer = %removed.name(), "observer_detached");
                true
            }
            None => false,
        }
    }

    /// Deliver `event` to every attached observer, in attachment order
    pub fn broadcast(&self, event: &NotificationEvent) -> BroadcastReport {
        deliver(&self.subject, &self.observers, self.metrics.as_deref(), event)
    }

    fn position<O: Observer + ?Sized>(&self, observer: &Arc<O>) -> Option<usize> {
        let target = Arc::as_ptr(observer);
        self.observers.iter().position(|o| std::ptr::addr_eq(Arc::as_ptr(o), target))
    }
}

impl fmt::Debug for Publisher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Publisher")
            .field("subject", &self.subject)
            .field("observers", &self.observers.len())
            .finish()
    }
}

fn deliver(
    subject: &SubjectId,
    observers: &[Arc<dyn Observer>],
    metrics: Option<&Metrics>,
    event: &NotificationEvent,
) -> BroadcastReport {
    let mut report = BroadcastReport { kind: event.kind(), delivered: 0, failures: SmallVec::new() };

    for observer in observers {
        let outcome = catch_unwind(AssertUnwindSafe(|| observer.on_event(subject, event)));
        let message = match outcome {
            Ok(Ok(())) => {
                report.delivered += 1;
                continue;
            }
            Ok(Err(e)) => format!("{:#}", e),
            Err(payload) => format!("panicked: {}", panic_message(payload.as_ref())),
        };

        warn!(
            subject = %subject,
            observer = %observer.name(),
            kind = %event.kind(),
            error = %message,
            "observer_failed"
        );
        report.failures.push(ObserverFailure {
            subject: subject.to_string(),
            observer: observer.name().to_string(),
            kind: event.kind(),
            message,
        });
    }

    if let Some(metrics) = metrics {
        metrics.record_broadcast(report.delivered as u64, report.failures.len() as u64);
    }

    debug!(
        subject = %subject,
        kind = %event.kind(),
        delivered = report.delivered,
        failed = report.failures.len(),
        "broadcast_complete"
    );
    report
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// A publisher shared across threads
///
/// Broadcasts are serialized: observers see events in the order `broadcast`
/// was called. Each broadcast delivers to the observers attached when it
/// started, so an observer may call back into the same publisher (read the
/// count, attach, detach itself) and the change applies from the next
/// broadcast on. A broadcast issued from inside an observer is delivered in
/// full before the outer one continues.
#[derive(Clone)]
pub struct SharedPublisher {
    inner: Arc<ReentrantMutex<RefCell<Publisher>>>,
}

impl SharedPublisher {
    pub fn new(publisher: Publisher) -> Self {
        Self { inner: Arc::new(ReentrantMutex::new(RefCell::new(publisher))) }
    }

    pub fn subject_id(&self) -> SubjectId {
        self.inner.lock().borrow().subject_id().clone()
    }

    pub fn observer_count(&self) -> usize {
        self.inner.lock().borrow().observer_count()
    }

    pub fn attach(&self, observer: Arc<dyn Observer>) -> bool {
        self.inner.lock().borrow_mut().attach(observer)
    }

    pub fn detach<O: Observer + ?Sized>(&self, observer: &Arc<O>) -> bool {
        self.inner.lock().borrow_mut().detach(observer)
    }

    pub fn broadcast(&self, event: &NotificationEvent) -> BroadcastReport {
        let guard = self.inner.lock();
        // Release the borrow before delivery so observers can re-enter
        let (subject, observers, metrics) = {
            let publisher = guard.borrow();
            (publisher.subject.clone(), publisher.observers.clone(), publisher.metrics.clone())
        };
        deliver(&subject, &observers, metrics.as_deref(), event)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::bail;
    use parking_lot::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Weak;

    /// Records every delivery into a shared log tagged with its label
    struct Recorder {
        label: &'static str,
        log: Arc<Mutex<Vec<(&'static str, NotificationEvent)>>>,
    }

    impl Observer for Recorder {
        fn name(&self) -> &str {
            self.label
        }

        fn on_event(&self, _subject: &SubjectId, event: &NotificationEvent) -> anyhow::Result<()> {
            self.log.lock().push((self.label, event.clone()));
            Ok(())
        }
    }

    struct Failing;

    impl Observer for Failing {
        fn name(&self) -> &str {
            "failing"
        }

        fn on_event(&self, _subject: &SubjectId, _event: &NotificationEvent) -> anyhow::Result<()> {
            bail!("mailbox unavailable")
        }
    }

    struct Panicking;

    impl Observer for Panicking {
        fn on_event(&self, _subject: &SubjectId, _event: &NotificationEvent) -> anyhow::Result<()> {
            panic!("observer blew up")
        }
    }

    type Log = Arc<Mutex<Vec<(&'static str, NotificationEvent)>>>;

    fn recorder(label: &'static str, log: &Log) -> Arc<Recorder> {
        Arc::new(Recorder { label, log: log.clone() })
    }

    fn delay_event() -> NotificationEvent {
        NotificationEvent::new(EventKind::Delay, "delayed 5 min")
    }

    #[test]
    fn test_broadcast_in_attachment_order() {
        let log: Log = Arc::default();
        let mut publisher = Publisher::new(SubjectId::new("trip:FR1"));
        publisher.attach(recorder("a", &log));
        publisher.attach(recorder("b", &log));
        publisher.attach(recorder("c", &log));

        let report = publisher.broadcast(&delay_event());

        assert!(report.is_clean());
        assert_eq!(report.delivered(), 3);
        let labels: Vec<&str> = log.lock().iter().map(|(l, _)| *l).collect();
        assert_eq!(labels, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_detach_then_broadcast() {
        let log: Log = Arc::default();
        let mut publisher = Publisher::new(SubjectId::new("trip:FR1"));
        let a = recorder("a", &log);
        let b = recorder("b", &log);
        let c = recorder("c", &log);
        publisher.attach(a.clone());
        publisher.attach(b.clone());
        publisher.attach(c.clone());

        assert!(publisher.detach(&b));
        publisher.broadcast(&delay_event());

        let labels: Vec<&str> = log.lock().iter().map(|(l, _)| *l).collect();
        assert_eq!(labels, vec!["a", "c"]);
        assert_eq!(publisher.observer_count(), 2);
    }

    #[test]
    fn test_attach_is_idempotent() {
        let log: Log = Arc::default();
        let mut publisher = Publisher::new(SubjectId::new("trip:FR1"));
        let a = recorder("a", &log);

        assert!(publisher.attach(a.clone()));
        assert!(!publisher.attach(a.clone()));
        assert_eq!(publisher.observer_count(), 1);

        publisher.broadcast(&delay_event());
        assert_eq!(log.lock().len(), 1);
    }

    #[test]
    fn test_detach_unknown_is_noop() {
        let log: Log = Arc::default();
        let mut publisher = Publisher::new(SubjectId::new("trip:FR1"));
        publisher.attach(recorder("a", &log));

        let stranger = recorder("stranger", &log);
        assert!(!publisher.detach(&stranger));
        assert_eq!(publisher.observer_count(), 1);
    }

    #[test]
    fn test_failure_does_not_stop_delivery() {
        let log: Log = Arc::default();
        let mut publisher = Publisher::new(SubjectId::new("ticket:42"));
        publisher.attach(recorder("a", &log));
        publisher.attach(Arc::new(Failing));
        publisher.attach(Arc::new(Panicking));
        publisher.attach(recorder("d", &log));

        let report = publisher.broadcast(&delay_event());

        assert_eq!(report.delivered(), 2);
        assert_eq!(report.failures().len(), 2);
        assert_eq!(report.failures()[0].observer, "failing");
        assert!(report.failures()[0].message.contains("mailbox unavailable"));
        assert!(report.failures()[1].message.contains("observer blew up"));
        assert_eq!(report.failures()[1].subject, "ticket:42");

        let labels: Vec<&str> = log.lock().iter().map(|(l, _)| *l).collect();
        assert_eq!(labels, vec!["a", "d"]);

        let err = report.into_result().unwrap_err();
        assert!(matches!(err, DomainError::ObserverFailure(ref f) if f.observer == "failing"));
    }

    #[test]
    fn test_broadcast_without_observers() {
        let publisher = Publisher::new(SubjectId::generate());
        let report = publisher.broadcast(&delay_event());
        assert_eq!(report.delivered(), 0);
        assert_eq!(report.kind(), EventKind::Delay);
        assert_eq!(report.into_result().unwrap(), 0);
    }

    #[test]
    fn test_metrics_recorded() {
        let metrics = Arc::new(Metrics::new());
        let log: Log = Arc::default();
        let mut publisher = Publisher::with_metrics(SubjectId::new("trip:FR1"), metrics.clone());
        publisher.attach(recorder("a", &log));
        publisher.attach(Arc::new(Failing));

        publisher.broadcast(&delay_event());

        let summary = metrics.summary();
        assert_eq!(summary.broadcasts_total, 1);
        assert_eq!(summary.deliveries_total, 1);
        assert_eq!(summary.observer_failures_total, 1);
    }

    #[test]
    fn test_shared_publisher_across_threads() {
        let log: Log = Arc::default();
        let shared = SharedPublisher::new(Publisher::new(SubjectId::new("trip:FR1")));
        shared.attach(recorder("a", &log));

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let shared = shared.clone();
                std::thread::spawn(move || {
                    for _ in 0..25 {
                        shared.broadcast(&delay_event());
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(log.lock().len(), 100);
        assert_eq!(shared.observer_count(), 1);
        assert_eq!(shared.subject_id().as_str(), "trip:FR1");
    }

    /// Reads the publisher it is attached to while being notified
    struct CountingBack {
        shared: SharedPublisher,
        seen_count: AtomicUsize,
    }

    impl Observer for CountingBack {
        fn on_event(&self, _subject: &SubjectId, _event: &NotificationEvent) -> anyhow::Result<()> {
            self.seen_count.store(self.shared.observer_count(), Ordering::Relaxed);
            Ok(())
        }
    }

    /// Detaches itself on the first event it receives
    struct OneShot {
        me: Weak<OneShot>,
        shared: SharedPublisher,
        calls: AtomicUsize,
    }

    impl Observer for OneShot {
        fn on_event(&self, _subject: &SubjectId, _event: &NotificationEvent) -> anyhow::Result<()> {
            self.calls.fetch_add(1, Ordering::Relaxed);
            if let Some(me) = self.me.upgrade() {
                self.shared.detach(&me);
            }
            Ok(())
        }
    }

    #[test]
    fn test_shared_observer_can_read_publisher() {
        let shared = SharedPublisher::new(Publisher::new(SubjectId::new("trip:FR1")));
        let observer =
            Arc::new(CountingBack { shared: shared.clone(), seen_count: AtomicUsize::new(0) });
        shared.attach(observer.clone());

        let report = shared.broadcast(&delay_event());

        assert!(report.is_clean());
        assert_eq!(observer.seen_count.load(Ordering::Relaxed), 1);
        shared.detach(&observer);
    }

    #[test]
    fn test_shared_observer_detaches_itself() {
        let log: Log = Arc::default();
        let shared = SharedPublisher::new(Publisher::new(SubjectId::new("trip:FR1")));
        let one_shot = Arc::new_cyclic(|me| OneShot {
            me: me.clone(),
            shared: shared.clone(),
            calls: AtomicUsize::new(0),
        });
        shared.attach(one_shot.clone());
        shared.attach(recorder("after", &log));

        let first = shared.broadcast(&delay_event());
        let second = shared.broadcast(&delay_event());

        assert_eq!(first.delivered(), 2);
        assert_eq!(second.delivered(), 1);
        assert_eq!(one_shot.calls.load(Ordering::Relaxed), 1);
        assert_eq!(shared.observer_count(), 1);
        assert_eq!(log.lock().len(), 2);
    }

    #[test]
    fn test_set_metrics_keeps_observers() {
        let log: Log = Arc::default();
        let metrics = Arc::new(Metrics::new());
        let mut publisher = Publisher::new(SubjectId::new("trip:FR1"));
        publisher.attach(recorder("a", &log));

        publisher.set_metrics(metrics.clone());
        publisher.broadcast(&delay_event());

        assert_eq!(publisher.observer_count(), 1);
        assert_eq!(metrics.summary().deliveries_total, 1);
    }
}
