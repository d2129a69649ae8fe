//! Dirty notification bus shared by a node tree and its runner.
//!
//! Nodes publish to the bus whenever they change; runners subscribe and
//! receive a level-triggered wake. Each subscriber owns a one-slot channel,
//! so any number of publications made while a wake is still pending collapse
//! into that single wake. The bus also owns the tree-wide reentrant lock
//! that serialises plot rebuilds against structural arrangement swaps.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};

use crossbeam_channel::{Receiver, Sender, TrySendError, bounded};
use parking_lot::{Mutex, ReentrantMutex, ReentrantMutexGuard};

static GLOBAL_BUS: OnceLock<DirtyBus> = OnceLock::new();

/// Cloneable handle to a dirty bus.
#[derive(Clone)]
pub struct DirtyBus {
    inner: Arc<BusInner>,
}

struct BusInner {
    tree: ReentrantMutex<()>,
    subscribers: Mutex<Vec<Subscriber>>,
    next_id: AtomicU64,
    published: AtomicU64,
    coalesced: AtomicU64,
}

struct Subscriber {
    id: u64,
    wake: Sender<()>,
}

/// Publication counters for a bus.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BusStats {
    pub published: u64,
    /// Deliveries that found a wake already pending.
    pub coalesced: u64,
}

impl Default for DirtyBus {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for DirtyBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DirtyBus")
            .field("subscribers", &self.inner.subscribers.lock().len())
            .field("stats", &self.stats())
            .finish()
    }
}

impl DirtyBus {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(BusInner {
                tree: ReentrantMutex::new(()),
                subscribers: Mutex::new(Vec::new()),
                next_id: AtomicU64::new(0),
                published: AtomicU64::new(0),
                coalesced: AtomicU64::new(0),
            }),
        }
    }

    /// Process-wide bus used by nodes that were not given one explicitly.
    pub fn global() -> Self {
        GLOBAL_BUS.get_or_init(Self::new).clone()
    }

    /// Acquire the tree-wide lock. Reentrant on the same thread.
    pub fn lock_tree(&self) -> ReentrantMutexGuard<'_, ()> {
        self.inner.tree.lock()
    }

    /// Notify every subscriber that the tree changed.
    pub fn publish(&self) {
        self.inner.published.fetch_add(1, Ordering::Relaxed);
        let mut subscribers = self.inner.subscribers.lock();
        subscribers.retain(|subscriber| match subscriber.wake.try_send(()) {
            Ok(()) => true,
            Err(TrySendError::Full(())) => {
                self.inner.coalesced.fetch_add(1, Ordering::Relaxed);
                true
            }
            Err(TrySendError::Disconnected(())) => false,
        });
    }

    pub fn subscribe(&self) -> Subscription {
        let (wake_tx, wake_rx) = bounded(1);
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        self.inner.subscribers.lock().push(Subscriber {
            id,
            wake: wake_tx.clone(),
        });
        Subscription {
            id,
            bus: self.clone(),
            waker: Waker { wake: wake_tx },
            receiver: wake_rx,
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.inner.subscribers.lock().len()
    }

    pub fn stats(&self) -> BusStats {
        BusStats {
            published: self.inner.published.load(Ordering::Relaxed),
            coalesced: self.inner.coalesced.load(Ordering::Relaxed),
        }
    }

    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    fn unsubscribe(&self, id: u64) {
        self.inner
            .subscribers
            .lock()
            .retain(|subscriber| subscriber.id != id);
    }
}

/// A runner's registration on a bus. Dropping it unsubscribes.
pub struct Subscription {
    id: u64,
    bus: DirtyBus,
    waker: Waker,
    receiver: Receiver<()>,
}

impl Subscription {
    pub fn receiver(&self) -> &Receiver<()> {
        &self.receiver
    }

    /// A handle that wakes this subscriber directly, bypassing the bus.
    pub fn waker(&self) -> Waker {
        self.waker.clone()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.bus.unsubscribe(self.id);
    }
}

/// Non-blocking wake for a single subscriber.
#[derive(Clone, Debug)]
pub struct Waker {
    wake: Sender<()>,
}

impl Waker {
    /// Never blocks; a wake that is already pending absorbs this one.
    pub fn wake(&self) {
        let _ = self.wake.try_send(());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn publications_coalesce_into_one_wake() {
        let bus = DirtyBus::new();
        let sub = bus.subscribe();
        for _ in 0..5 {
            bus.publish();
        }
        assert!(sub.receiver().try_recv().is_ok());
        assert!(sub.receiver().try_recv().is_err());
        assert_eq!(
            bus.stats(),
            BusStats {
                published: 5,
                coalesced: 4
            }
        );
    }

    #[test]
    fn dropping_subscription_unsubscribes() {
        let bus = DirtyBus::new();
        let sub = bus.subscribe();
        assert_eq!(bus.subscriber_count(), 1);
        drop(sub);
        assert_eq!(bus.subscriber_count(), 0);
        bus.publish();
    }

    #[test]
    fn waker_reaches_subscriber_across_threads() {
        let bus = DirtyBus::new();
        let sub = bus.subscribe();
        let waker = sub.waker();
        let handle = std::thread::spawn(move || waker.wake());
        handle.join().unwrap();
        assert!(
            sub.receiver()
                .recv_timeout(Duration::from_millis(200))
                .is_ok()
        );
    }

    #[test]
    fn tree_lock_is_reentrant() {
        let bus = DirtyBus::new();
        let _outer = bus.lock_tree();
        let _inner = bus.lock_tree();
    }

    #[test]
    fn global_bus_is_shared() {
        assert!(DirtyBus::global().ptr_eq(&DirtyBus::global()));
        assert!(!DirtyBus::new().ptr_eq(&DirtyBus::global()));
    }
}
