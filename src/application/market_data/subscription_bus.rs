//! Replay-latest publish/subscribe.
//!
//! A `SubscriptionBus<T>` keeps the most recent value. New subscribers get that
//! value synchronously inside `subscribe`, then every later `publish` in
//! subscription order. A failing listener (error or panic) is logged and the
//! remaining listeners still receive the update.
//!
//! Listeners may call `Subscription::unsubscribe` from inside a callback, but
//! must not publish on or subscribe to the bus that is delivering to them.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock, Weak};
use tracing::{debug, error};

/// Receiver of bus updates
pub trait UpdateListener<T>: Send + Sync {
    fn on_update(&self, value: &T) -> anyhow::Result<()>;
}

impl<T, F> UpdateListener<T> for F
where
    F: Fn(&T) -> anyhow::Result<()> + Send + Sync,
{
    fn on_update(&self, value: &T) -> anyhow::Result<()> {
        self(value)
    }
}

struct ListenerEntry<T> {
    id: u64,
    active: Arc<AtomicBool>,
    listener: Arc<dyn UpdateListener<T>>,
}

impl<T> Clone for ListenerEntry<T> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            active: Arc::clone(&self.active),
            listener: Arc::clone(&self.listener),
        }
    }
}

trait ListenerRegistry: Send + Sync {
    fn remove(&self, id: u64);
}

struct BusInner<T> {
    name: &'static str,
    latest: RwLock<T>,
    listeners: RwLock<Vec<ListenerEntry<T>>>,
    // Serializes replay and publish so a subscriber never sees updates out of order
    delivery: Mutex<()>,
    next_id: AtomicU64,
}

impl<T: Send + Sync> ListenerRegistry for BusInner<T> {
    fn remove(&self, id: u64) {
        let mut listeners = match self.listeners.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        listeners.retain(|entry| entry.id != id);
    }
}

impl<T> BusInner<T> {
    fn deliver(&self, entry: &ListenerEntry<T>, value: &T) {
        if !entry.active.load(Ordering::SeqCst) {
            return;
        }

        let result = catch_unwind(AssertUnwindSafe(|| entry.listener.on_update(value)));
        match result {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                error!(
                    "SubscriptionBus[{}]: Listener {} failed: {}",
                    self.name, entry.id, e
                );
            }
            Err(_) => {
                error!(
                    "SubscriptionBus[{}]: Listener {} panicked during delivery",
                    self.name, entry.id
                );
            }
        }
    }
}

/// Handle returned by `subscribe`. Unsubscribing is idempotent.
pub struct Subscription {
    id: u64,
    active: Arc<AtomicBool>,
    registry: Weak<dyn ListenerRegistry>,
}

impl Subscription {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    /// Stops delivery immediately. Calling it again does nothing.
    pub fn unsubscribe(&self) {
        if !self.active.swap(false, Ordering::SeqCst) {
            return;
        }
        if let Some(registry) = self.registry.upgrade() {
            registry.remove(self.id);
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("active", &self.is_active())
            .finish()
    }
}

/// Replay-latest bus shared by cloning
pub struct SubscriptionBus<T> {
    inner: Arc<BusInner<T>>,
}

impl<T> Clone for SubscriptionBus<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> SubscriptionBus<T>
where
    T: Clone + Send + Sync + 'static,
{
    pub fn new(name: &'static str, initial: T) -> Self {
        Self {
            inner: Arc::new(BusInner {
                name,
                latest: RwLock::new(initial),
                listeners: RwLock::new(Vec::new()),
                delivery: Mutex::new(()),
                next_id: AtomicU64::new(1),
            }),
        }
    }

    /// Register a listener and replay the current value to it before returning
    pub fn subscribe(&self, listener: impl UpdateListener<T> + 'static) -> Subscription {
        let _delivery = self.lock_delivery();

        let entry = ListenerEntry {
            id: self.inner.next_id.fetch_add(1, Ordering::SeqCst),
            active: Arc::new(AtomicBool::new(true)),
            listener: Arc::new(listener),
        };

        match self.inner.listeners.write() {
            Ok(mut guard) => guard.push(entry.clone()),
            Err(poisoned) => poisoned.into_inner().push(entry.clone()),
        }

        debug!(
            "SubscriptionBus[{}]: Listener {} subscribed",
            self.inner.name, entry.id
        );

        let current = self.latest();
        self.inner.deliver(&entry, &current);

        let registry = Arc::downgrade(&self.inner) as Weak<dyn ListenerRegistry>;

        Subscription {
            id: entry.id,
            active: entry.active,
            registry,
        }
    }

    /// Replace the cached value and deliver it to every active listener in order
    pub fn publish(&self, value: T) {
        let _delivery = self.lock_delivery();

        match self.inner.latest.write() {
            Ok(mut guard) => *guard = value.clone(),
            Err(poisoned) => *poisoned.into_inner() = value.clone(),
        }

        let listeners: Vec<ListenerEntry<T>> = match self.inner.listeners.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        };

        for entry in &listeners {
            self.inner.deliver(entry, &value);
        }
    }

    pub fn latest(&self) -> T {
        match self.inner.latest.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn subscriber_count(&self) -> usize {
        match self.inner.listeners.read() {
            Ok(guard) => guard.len(),
            Err(poisoned) => poisoned.into_inner().len(),
        }
    }

    fn lock_delivery(&self) -> std::sync::MutexGuard<'_, ()> {
        match self.inner.delivery.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}
