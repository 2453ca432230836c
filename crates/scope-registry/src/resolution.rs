//! # Async Resolution
//!
//! [`Resolution`] is the future returned by `Container::resolve_async`. It
//! completes immediately when the key already resolves; otherwise it
//! subscribes to the container (hearing registrations anywhere up the chain)
//! and completes on the first registration of exactly that key.
//!
//! ## State machine
//!
//! ```text
//!              registration of key
//!   PENDING ──────────────────────────► RESOLVED
//!      │
//!      │ cancel signal completes
//!      └──────────────────────────────► CANCELLED
//! ```
//!
//! Both end states are terminal. A matching registration settles the
//! resolution at registration time: a cancel signal firing afterwards is
//! ignored. The cancel signal only wins while nothing has been delivered.
//! There is no timeout; wrap the future in `tokio::time::timeout` when one
//! is needed.

use crate::container::Container;
use crate::domain::descriptor::Dependency;
use crate::domain::key::Key;
use crate::error::ResolveError;
use crate::metrics::Metrics;
use crate::subscriber::Subscription;
use parking_lot::Mutex;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};
use tokio::sync::oneshot;
use tracing::debug;

/// Boxed cancellation signal.
pub type CancelSignal<E> = Pin<Box<dyn Future<Output = E> + Send>>;

/// Lifecycle of a [`Resolution`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolutionState {
    /// Waiting for the key to be registered.
    Pending,
    /// Completed with a value.
    Resolved,
    /// Failed by the cancel signal.
    Cancelled,
}

/// Shared slot letting the subscriber callback detach itself.
type SubscriptionSlot = Arc<Mutex<Option<Subscription>>>;

/// Future resolving a dependency once it is registered.
#[must_use = "futures do nothing unless polled"]
pub struct Resolution<E> {
    key: Key,
    state: ResolutionState,
    ready: Option<Dependency>,
    receiver: Option<oneshot::Receiver<Dependency>>,
    delivered: Arc<AtomicBool>,
    subscription: Option<SubscriptionSlot>,
    cancel: Option<CancelSignal<E>>,
    metrics: Arc<Metrics>,
}

impl<E> Resolution<E> {
    pub(crate) fn start(container: &Container, key: Key, cancel: Option<CancelSignal<E>>) -> Self {
        let metrics = Arc::clone(container.metrics());
        let scope = container.scope();

        if let Some(value) = container.resolve_in(&key, &scope) {
            debug!(container = %container.id(), key = %key, "Async resolution satisfied immediately");
            return Self::settled(key, value, metrics);
        }

        let (sender, receiver) = oneshot::channel();
        let sender = Mutex::new(Some(sender));
        let slot: SubscriptionSlot = Arc::new(Mutex::new(None));
        let delivered = Arc::new(AtomicBool::new(false));

        let wanted = key.clone();
        let own_slot = Arc::clone(&slot);
        let own_delivered = Arc::clone(&delivered);
        let subscription = container.subscribe(move |registration| {
            if registration.key != wanted {
                return;
            }
            let Some(value) = registration.value(&scope) else {
                return;
            };
            if let Some(sender) = sender.lock().take() {
                // The receiver is gone only if the resolution was dropped.
                if sender.send(value).is_ok() {
                    own_delivered.store(true, Ordering::Release);
                }
            }
            let detached = own_slot.lock().take();
            drop(detached);
        });
        *slot.lock() = Some(subscription);

        // A registration may have slipped in between the lookup and the
        // subscription when the container is shared across threads.
        if let Some(value) = container.resolve_in(&key, &container.scope()) {
            let detached = slot.lock().take();
            drop(detached);
            return Self::settled(key, value, metrics);
        }

        metrics.record_async_wait();
        debug!(container = %container.id(), key = %key, "Waiting for dependency");

        Self {
            key,
            state: ResolutionState::Pending,
            ready: None,
            receiver: Some(receiver),
            delivered,
            subscription: Some(slot),
            cancel,
            metrics,
        }
    }

    fn settled(key: Key, value: Dependency, metrics: Arc<Metrics>) -> Self {
        Self {
            key,
            state: ResolutionState::Pending,
            ready: Some(value),
            receiver: None,
            delivered: Arc::new(AtomicBool::new(true)),
            subscription: None,
            cancel: None,
            metrics,
        }
    }

    /// Key being resolved.
    #[must_use]
    pub fn key(&self) -> &Key {
        &self.key
    }

    /// Current lifecycle state.
    ///
    /// `Resolved` as soon as a value is available, even before the future
    /// is polled again.
    #[must_use]
    pub fn state(&self) -> ResolutionState {
        if self.state == ResolutionState::Pending && self.delivered.load(Ordering::Acquire) {
            return ResolutionState::Resolved;
        }
        self.state
    }

    /// Whether the future is still waiting on a registration.
    #[must_use]
    pub fn is_waiting(&self) -> bool {
        self.state() == ResolutionState::Pending
    }

    fn release(&mut self) {
        if let Some(slot) = self.subscription.take() {
            let detached = slot.lock().take();
            drop(detached);
        }
        self.receiver = None;
        self.cancel = None;
    }
}

impl<E> Future for Resolution<E> {
    type Output = Result<Dependency, ResolveError<E>>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();

        if this.state != ResolutionState::Pending {
            return Poll::Ready(Err(ResolveError::AlreadyCompleted));
        }

        if let Some(value) = this.ready.take() {
            this.state = ResolutionState::Resolved;
            return Poll::Ready(Ok(value));
        }

        // A delivered value settled the resolution before any later signal.
        if let Some(receiver) = this.receiver.as_mut() {
            match Pin::new(receiver).poll(cx) {
                Poll::Ready(Ok(value)) => {
                    this.release();
                    this.state = ResolutionState::Resolved;
                    this.metrics.record_async_resolved();
                    debug!(key = %this.key, "Async resolution completed");
                    return Poll::Ready(Ok(value));
                }
                Poll::Ready(Err(_)) => {
                    // The sender only disappears together with the
                    // subscription, which this future owns; stay pending.
                    this.receiver = None;
                }
                Poll::Pending => {}
            }
        }

        if let Some(cancel) = this.cancel.as_mut() {
            if let Poll::Ready(reason) = cancel.as_mut().poll(cx) {
                this.release();
                this.state = ResolutionState::Cancelled;
                this.metrics.record_async_cancelled();
                debug!(key = %this.key, "Async resolution cancelled");
                return Poll::Ready(Err(ResolveError::Cancelled(reason)));
            }
        }

        Poll::Pending
    }
}

impl<E> Drop for Resolution<E> {
    fn drop(&mut self) {
        if self.state == ResolutionState::Pending && self.subscription.is_some() {
            debug!(key = %self.key, "Pending resolution dropped");
        }
        self.release();
    }
}

impl<E> fmt::Debug for Resolution<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Resolution")
            .field("key", &self.key)
            .field("state", &self.state)
            .field("cancellable", &self.cancel.is_some())
            .finish()
    }
}
