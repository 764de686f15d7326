//! Shared, replay-one, reference-counted value stream.
//!
//! A [`SharedStream`] owns at most one background producer. The producer is
//! started by the first subscriber, publishes values into a single `watch`
//! slot that every subscriber reads (so late subscribers immediately see the
//! latest value), and is torn down as soon as the last subscriber goes away.
//! A subscriber arriving after teardown starts a fresh producer.
//!
//! ```text
//!                    ┌──────────────┐   watch slot    ┌──────────────┐
//!  first subscribe ─►│   producer   │──── Ready(T) ──►│ subscriber 1 │
//!                    │    task      │        │        └──────────────┘
//!  last drop ───────►│ (cancelled)  │        └───────►┌──────────────┐
//!                    └──────────────┘                 │ subscriber N │
//!                                                     └──────────────┘
//! ```

use futures::future::BoxFuture;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::error::CheckError;

/// Error delivered to every subscriber when the producer fails.
pub type SharedError = Arc<CheckError>;

#[derive(Debug, Clone)]
enum Slot<T> {
    Pending,
    Ready(T),
    Failed(SharedError),
}

type Producer<T> = dyn Fn(Publisher<T>) -> BoxFuture<'static, ()> + Send + Sync;

/// Write side handed to the producer.
pub struct Publisher<T> {
    tx: Arc<watch::Sender<Slot<T>>>,
    cancel: CancellationToken,
}

impl<T> Publisher<T> {
    /// Replaces the current value. Ignored once the stream was torn down.
    pub fn publish(&self, value: T) {
        if self.cancel.is_cancelled() {
            return;
        }
        self.tx.send_replace(Slot::Ready(value));
    }

    /// Delivers `error` to every current subscriber. The producer should
    /// return afterwards.
    pub fn fail(&self, error: CheckError) {
        if self.cancel.is_cancelled() {
            return;
        }
        self.tx.send_replace(Slot::Failed(Arc::new(error)));
    }

    pub async fn cancelled(&self) {
        self.cancel.cancelled().await;
    }
}

struct Active<T> {
    tx: Arc<watch::Sender<Slot<T>>>,
    subscribers: usize,
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

struct Shared<T> {
    producer: Box<Producer<T>>,
    active: Mutex<Option<Active<T>>>,
}

impl<T> Shared<T> {
    fn lock(&self) -> MutexGuard<'_, Option<Active<T>>> {
        self.active.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Multicast stream with replay of the latest value and reference-counted
/// producer lifetime.
pub struct SharedStream<T> {
    shared: Arc<Shared<T>>,
}

impl<T> Clone for SharedStream<T> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<T: Clone + Send + Sync + 'static> SharedStream<T> {
    /// Creates a stream whose values come from `producer`.
    ///
    /// `producer` is invoked once per activation and should run until
    /// [`Publisher::cancelled`] resolves.
    pub fn new<F>(producer: F) -> Self
    where
        F: Fn(Publisher<T>) -> BoxFuture<'static, ()> + Send + Sync + 'static,
    {
        Self {
            shared: Arc::new(Shared {
                producer: Box::new(producer),
                active: Mutex::new(None),
            }),
        }
    }

    /// Attaches a new subscriber, starting the producer if none is running.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn subscribe(&self) -> Subscription<T> {
        let mut guard = self.shared.lock();
        let active = guard.get_or_insert_with(|| {
            tracing::debug!("starting shared stream producer");
            let (tx, _rx) = watch::channel(Slot::Pending);
            let tx = Arc::new(tx);
            let cancel = CancellationToken::new();
            let publisher = Publisher {
                tx: Arc::clone(&tx),
                cancel: cancel.clone(),
            };
            let task = tokio::spawn((self.shared.producer)(publisher));
            Active {
                tx,
                subscribers: 0,
                cancel,
                task,
            }
        });
        active.subscribers += 1;

        Subscription {
            rx: active.tx.subscribe(),
            shared: Arc::clone(&self.shared),
            primed: false,
            finished: false,
        }
    }

    /// Number of attached subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.shared.lock().as_ref().map_or(0, |a| a.subscribers)
    }

    /// Whether a producer is currently running or holding a value.
    pub fn is_active(&self) -> bool {
        self.shared.lock().is_some()
    }
}

/// One consumer's view of a [`SharedStream`].
///
/// Dropping the last subscription tears the producer down.
pub struct Subscription<T> {
    rx: watch::Receiver<Slot<T>>,
    shared: Arc<Shared<T>>,
    primed: bool,
    finished: bool,
}

impl<T: Clone> Subscription<T> {
    /// Waits for the next value.
    ///
    /// The first call returns the latest already-published value, if any.
    /// Returns `Some(Err)` once if the producer failed and `None` after that
    /// or when the stream is gone.
    pub async fn next(&mut self) -> Option<Result<T, SharedError>> {
        if self.finished {
            return None;
        }

        if !self.primed {
            self.primed = true;
            let slot = self.rx.borrow_and_update().clone();
            if let Some(item) = self.take(slot) {
                return Some(item);
            }
        }

        loop {
            if self.rx.changed().await.is_err() {
                self.finished = true;
                return None;
            }
            let slot = self.rx.borrow_and_update().clone();
            if let Some(item) = self.take(slot) {
                return Some(item);
            }
        }
    }

    /// Latest published value without waiting.
    pub fn latest(&self) -> Option<T> {
        match &*self.rx.borrow() {
            Slot::Ready(value) => Some(value.clone()),
            _ => None,
        }
    }

    fn take(&mut self, slot: Slot<T>) -> Option<Result<T, SharedError>> {
        match slot {
            Slot::Pending => None,
            Slot::Ready(value) => Some(Ok(value)),
            Slot::Failed(error) => {
                self.finished = true;
                Some(Err(error))
            }
        }
    }
}

impl<T> Drop for Subscription<T> {
    fn drop(&mut self) {
        let mut guard = self.shared.lock();
        let Some(active) = guard.as_mut() else {
            return;
        };
        active.subscribers = active.subscribers.saturating_sub(1);
        if active.subscribers == 0
            && let Some(active) = guard.take()
        {
            tracing::debug!("last subscriber left, tearing down shared stream producer");
            active.cancel.cancel();
            active.task.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::FutureExt;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    /// Publishes 1, 2, 3 ... every time `step` gains a permit.
    fn counting_stream(
        starts: Arc<AtomicUsize>,
        step: Arc<tokio::sync::Semaphore>,
    ) -> SharedStream<usize> {
        SharedStream::new(move |publisher| {
            let starts = Arc::clone(&starts);
            let step = Arc::clone(&step);
            async move {
                starts.fetch_add(1, Ordering::SeqCst);
                let mut n = 0;
                loop {
                    tokio::select! {
                        () = publisher.cancelled() => return,
                        permit = step.acquire() => {
                            let Ok(permit) = permit else { return };
                            permit.forget();
                            n += 1;
                            publisher.publish(n);
                        }
                    }
                }
            }
            .boxed()
        })
    }

    #[tokio::test]
    async fn test_first_subscriber_starts_producer() {
        let starts = Arc::new(AtomicUsize::new(0));
        let step = Arc::new(tokio::sync::Semaphore::new(0));
        let stream = counting_stream(Arc::clone(&starts), Arc::clone(&step));
        assert!(!stream.is_active());

        let mut sub = stream.subscribe();
        assert!(stream.is_active());
        step.add_permits(1);
        assert_eq!(sub.next().await.unwrap().unwrap(), 1);
        assert_eq!(starts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_late_subscriber_replays_latest() {
        let starts = Arc::new(AtomicUsize::new(0));
        let step = Arc::new(tokio::sync::Semaphore::new(0));
        let stream = counting_stream(Arc::clone(&starts), Arc::clone(&step));

        let mut first = stream.subscribe();
        step.add_permits(1);
        assert_eq!(first.next().await.unwrap().unwrap(), 1);

        let mut late = stream.subscribe();
        assert_eq!(late.latest(), Some(1));
        assert_eq!(late.next().await.unwrap().unwrap(), 1);
        assert_eq!(stream.subscriber_count(), 2);
        assert_eq!(starts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_all_subscribers_observe_new_values() {
        let starts = Arc::new(AtomicUsize::new(0));
        let step = Arc::new(tokio::sync::Semaphore::new(0));
        let stream = counting_stream(starts, Arc::clone(&step));

        let mut a = stream.subscribe();
        let mut b = stream.subscribe();
        step.add_permits(1);
        assert_eq!(a.next().await.unwrap().unwrap(), 1);
        assert_eq!(b.next().await.unwrap().unwrap(), 1);
    }

    #[tokio::test]
    async fn test_last_drop_tears_down_and_restarts() {
        let starts = Arc::new(AtomicUsize::new(0));
        let step = Arc::new(tokio::sync::Semaphore::new(0));
        let stream = counting_stream(Arc::clone(&starts), Arc::clone(&step));

        let mut sub = stream.subscribe();
        step.add_permits(2);
        assert!(sub.next().await.unwrap().is_ok());
        drop(sub);
        assert!(!stream.is_active());
        assert_eq!(stream.subscriber_count(), 0);

        let mut again = stream.subscribe();
        assert_eq!(again.latest(), None);
        step.add_permits(1);
        let value = again.next().await.unwrap().unwrap();
        assert!(value >= 1);
        assert_eq!(starts.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_dropping_one_of_two_keeps_producer() {
        let starts = Arc::new(AtomicUsize::new(0));
        let step = Arc::new(tokio::sync::Semaphore::new(0));
        let stream = counting_stream(starts, Arc::clone(&step));

        let a = stream.subscribe();
        let mut b = stream.subscribe();
        drop(a);
        assert!(stream.is_active());
        step.add_permits(1);
        assert_eq!(b.next().await.unwrap().unwrap(), 1);
    }

    #[tokio::test]
    async fn test_failure_reaches_every_subscriber_once() {
        let stream: SharedStream<usize> = SharedStream::new(|publisher| {
            async move {
                tokio::time::sleep(Duration::from_millis(10)).await;
                publisher.fail(CheckError::search_failed("x", "down"));
            }
            .boxed()
        });

        let mut a = stream.subscribe();
        let mut b = stream.subscribe();
        assert!(a.next().await.unwrap().is_err());
        assert!(b.next().await.unwrap().is_err());
        assert!(a.next().await.is_none());
    }

    #[tokio::test]
    async fn test_publish_after_cancel_is_ignored() {
        let (tx, rx) = watch::channel(Slot::Pending);
        let cancel = CancellationToken::new();
        let publisher = Publisher {
            tx: Arc::new(tx),
            cancel: cancel.clone(),
        };
        cancel.cancel();
        publisher.publish(5usize);
        assert!(matches!(&*rx.borrow(), Slot::Pending));
    }
}
