//! Shared live values that only do work while somebody is watching.
//!
//! # Responsibility
//! - Run one producer task per shared value, fanned out through a
//!   `tokio::sync::watch` channel.
//! - Start the producer on the first subscription and stop it once the last
//!   subscriber has been gone for the grace period.
//!
//! # Invariants
//! - At most one producer task runs per [`Shared`] value.
//! - A stopped value is reset to its initial value, so a later subscriber
//!   never observes a stale cache; the restarted producer re-reads the
//!   source.

use crate::store::StoreError;
use log::debug;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::watch;

/// Failure shared between every subscriber of one live value.
pub type LiveResult<T> = Result<T, Arc<StoreError>>;

/// State of a store-backed live value.
#[derive(Debug, Clone)]
pub enum LiveValue<T> {
    /// The producer has not delivered a value since it (re)started.
    Pending,
    Ready(T),
    /// The latest read hit a storage fault.
    Failed(Arc<StoreError>),
}

impl<T> LiveValue<T> {
    pub fn is_pending(&self) -> bool {
        matches!(self, Self::Pending)
    }

    pub fn ready(&self) -> Option<&T> {
        match self {
            Self::Ready(value) => Some(value),
            _ => None,
        }
    }

    pub fn fault(&self) -> Option<&Arc<StoreError>> {
        match self {
            Self::Failed(err) => Some(err),
            _ => None,
        }
    }
}

impl<T> From<LiveResult<T>> for LiveValue<T> {
    fn from(value: LiveResult<T>) -> Self {
        match value {
            Ok(value) => Self::Ready(value),
            Err(err) => Self::Failed(err),
        }
    }
}

/// Waits until `rx` holds a settled (non-pending) value and returns it.
///
/// Returns `None` once the producing side is gone for good.
pub async fn settled<T: Clone>(rx: &mut watch::Receiver<LiveValue<T>>) -> Option<LiveResult<T>> {
    let value = rx.wait_for(|value| !value.is_pending()).await.ok()?;
    match &*value {
        LiveValue::Ready(value) => Some(Ok(value.clone())),
        LiveValue::Failed(err) => Some(Err(Arc::clone(err))),
        LiveValue::Pending => None,
    }
}

type ProducerFuture = Pin<Box<dyn Future<Output = ()> + Send>>;
type Producer<T> = Box<dyn Fn(Arc<watch::Sender<T>>) -> ProducerFuture + Send + Sync>;

/// A live value shared between any number of subscribers.
///
/// Cloning the handle shares the same producer and channel.
pub struct Shared<T> {
    inner: Arc<SharedInner<T>>,
}

impl<T> Clone for Shared<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

struct SharedInner<T> {
    name: &'static str,
    tx: Arc<watch::Sender<T>>,
    initial: T,
    grace: Duration,
    running: Mutex<bool>,
    producer: Producer<T>,
}

impl<T> Shared<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Creates a shared value whose producer is started lazily.
    ///
    /// `producer` publishes into the sender it receives and is expected to
    /// run until cancelled; it is dropped when the value goes idle.
    pub fn new<F, Fut>(name: &'static str, initial: T, grace: Duration, producer: F) -> Self
    where
        F: Fn(Arc<watch::Sender<T>>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let (tx, _rx) = watch::channel(initial.clone());
        Self {
            inner: Arc::new(SharedInner {
                name,
                tx: Arc::new(tx),
                initial,
                grace,
                running: Mutex::new(false),
                producer: Box::new(move |tx| Box::pin(producer(tx))),
            }),
        }
    }

    /// Subscribes to the value, starting the producer if it is idle.
    ///
    /// Must be called from within a tokio runtime.
    pub fn subscribe(&self) -> watch::Receiver<T> {
        let mut running = lock_flag(&self.inner.running);
        let rx = self.inner.tx.subscribe();
        if !*running {
            *running = true;
            tokio::spawn(supervise(Arc::clone(&self.inner)));
        }
        rx
    }

    /// Whether a producer task is currently alive.
    pub fn is_active(&self) -> bool {
        *lock_flag(&self.inner.running)
    }

    pub fn subscriber_count(&self) -> usize {
        self.inner.tx.receiver_count()
    }
}

async fn supervise<T>(inner: Arc<SharedInner<T>>)
where
    T: Clone + Send + Sync + 'static,
{
    debug!("event=live_start module=live name={}", inner.name);
    loop {
        let producer_finished = tokio::select! {
            () = (inner.producer)(Arc::clone(&inner.tx)) => true,
            () = wait_idle(&inner.tx, inner.grace) => false,
        };

        let stopped = {
            let mut running = lock_flag(&inner.running);
            // Checked under the flag lock so a concurrent subscribe() either
            // sees the producer running or starts a new one.
            if producer_finished || inner.tx.receiver_count() == 0 {
                *running = false;
                inner.tx.send_replace(inner.initial.clone());
                true
            } else {
                false
            }
        };
        if stopped {
            break;
        }
    }
    debug!("event=live_stop module=live name={}", inner.name);
}

async fn wait_idle<T>(tx: &watch::Sender<T>, grace: Duration) {
    loop {
        tx.closed().await;
        tokio::time::sleep(grace).await;
        if tx.receiver_count() == 0 {
            return;
        }
    }
}

fn lock_flag(flag: &Mutex<bool>) -> MutexGuard<'_, bool> {
    flag.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::{settled, LiveValue, Shared};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    const GRACE: Duration = Duration::from_millis(30);

    fn counting_value(starts: Arc<AtomicUsize>) -> Shared<LiveValue<usize>> {
        Shared::new("test", LiveValue::Pending, GRACE, move |tx| {
            let starts = Arc::clone(&starts);
            async move {
                let generation = starts.fetch_add(1, Ordering::SeqCst) + 1;
                tx.send_replace(LiveValue::Ready(generation));
                std::future::pending::<()>().await;
            }
        })
    }

    #[tokio::test]
    async fn producer_starts_once_for_many_subscribers() {
        let starts = Arc::new(AtomicUsize::new(0));
        let shared = counting_value(Arc::clone(&starts));

        let mut first = shared.subscribe();
        let mut second = shared.subscribe();
        assert_eq!(settled(&mut first).await.unwrap().unwrap(), 1);
        assert_eq!(settled(&mut second).await.unwrap().unwrap(), 1);
        assert_eq!(starts.load(Ordering::SeqCst), 1);
        assert_eq!(shared.subscriber_count(), 2);
    }

    #[tokio::test]
    async fn idle_value_stops_and_restarts_fresh() {
        let starts = Arc::new(AtomicUsize::new(0));
        let shared = counting_value(Arc::clone(&starts));

        let mut rx = shared.subscribe();
        assert_eq!(settled(&mut rx).await.unwrap().unwrap(), 1);
        drop(rx);

        tokio::time::sleep(GRACE * 5).await;
        assert!(!shared.is_active());

        let mut rx = shared.subscribe();
        assert_eq!(settled(&mut rx).await.unwrap().unwrap(), 2);
    }

    #[tokio::test]
    async fn resubscribing_within_grace_keeps_producer() {
        let starts = Arc::new(AtomicUsize::new(0));
        let shared = counting_value(Arc::clone(&starts));

        let mut rx = shared.subscribe();
        assert_eq!(settled(&mut rx).await.unwrap().unwrap(), 1);
        drop(rx);

        let mut rx = shared.subscribe();
        assert_eq!(settled(&mut rx).await.unwrap().unwrap(), 1);
        tokio::time::sleep(GRACE * 3).await;
        assert!(shared.is_active());
        assert_eq!(starts.load(Ordering::SeqCst), 1);
    }
}
