//! Subscription lists for push notifications
//!
//! A [`Subscribers`] list holds callback handles for one event type. Publishing
//! invokes every callback synchronously, in the order they subscribed. Each owner
//! keeps its own list; there is no global bus.
//!
//! # Example
//!
//! ```rust
//! use chatterbox_commands::events::Subscribers;
//!
//! let levels: Subscribers<u32> = Subscribers::new();
//! let id = levels.subscribe(|level| println!("reached level {}", level));
//! levels.publish(&5);
//! levels.unsubscribe(id);
//! assert!(levels.is_empty());
//! ```

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::error;
use uuid::Uuid;

/// Handle returned by [`Subscribers::subscribe`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Callback<E> = Arc<dyn Fn(&E) + Send + Sync>;

/// Ordered list of callbacks for events of type `E`
pub struct Subscribers<E> {
    next_id: AtomicU64,
    callbacks: RwLock<Vec<(SubscriptionId, Callback<E>)>>,
}

impl<E> Subscribers<E> {
    pub fn new() -> Self {
        Self {
            next_id: AtomicU64::new(1),
            callbacks: RwLock::new(Vec::new()),
        }
    }

    /// Append a callback to the list
    pub fn subscribe<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(&E) + Send + Sync + 'static,
    {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.callbacks.write().push((id, Arc::new(callback)));
        id
    }

    /// Remove a callback, returning whether it was subscribed
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut callbacks = self.callbacks.write();
        let before = callbacks.len();
        callbacks.retain(|(existing, _)| *existing != id);
        callbacks.len() != before
    }

    /// Invoke every callback in subscription order
    ///
    /// The list is snapshotted first, so callbacks may subscribe or unsubscribe
    /// without deadlocking; such changes apply from the next publish. A panicking
    /// callback is logged and does not stop the ones after it. Returns the number
    /// of callbacks that panicked.
    pub fn publish(&self, event: &E) -> usize {
        let callbacks: Vec<(SubscriptionId, Callback<E>)> = self
            .callbacks
            .read()
            .iter()
            .map(|(id, callback)| (*id, Arc::clone(callback)))
            .collect();

        let mut panicked = 0;
        for (id, callback) in callbacks {
            if let Err(panic) = std::panic::catch_unwind(AssertUnwindSafe(|| callback(event))) {
                error!(subscription = id.0, error = %panic_message(panic), "Subscriber panicked");
                panicked += 1;
            }
        }
        panicked
    }

    pub fn len(&self) -> usize {
        self.callbacks.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<E> Default for Subscribers<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> std::fmt::Debug for Subscribers<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscribers")
            .field("len", &self.len())
            .finish()
    }
}

pub(crate) fn panic_message(panic: Box<dyn Any + Send>) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        format!("panicked: {}", message)
    } else if let Some(message) = panic.downcast_ref::<String>() {
        format!("panicked: {}", message)
    } else {
        "panicked".to_string()
    }
}

/// Published by the dispatcher after each executed invocation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DispatchEvent {
    pub invocation_id: Uuid,
    pub identifier: String,
    pub caller_id: String,
    pub compact: bool,
    /// False when the operation returned an error or panicked
    pub succeeded: bool,
    pub elapsed_ms: u64,
    pub at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn test_publish_in_subscription_order() {
        let subscribers: Subscribers<i32> = Subscribers::new();
        let seen = Arc::new(Mutex::new(Vec::new()));

        for tag in ["first", "second", "third"] {
            let seen = Arc::clone(&seen);
            subscribers.subscribe(move |value: &i32| {
                seen.lock().unwrap().push(format!("{}:{}", tag, value))
            });
        }
        subscribers.publish(&7);

        assert_eq!(
            *seen.lock().unwrap(),
            vec!["first:7", "second:7", "third:7"]
        );
    }

    #[test]
    fn test_unsubscribe() {
        let subscribers: Subscribers<()> = Subscribers::new();
        let count = Arc::new(AtomicU64::new(0));

        let counter = Arc::clone(&count);
        let id = subscribers.subscribe(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        subscribers.publish(&());
        assert!(subscribers.unsubscribe(id));
        assert!(!subscribers.unsubscribe(id));
        subscribers.publish(&());

        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert!(subscribers.is_empty());
    }

    #[test]
    fn test_panicking_callback_does_not_stop_later_ones() {
        let subscribers: Subscribers<&str> = Subscribers::new();
        let seen = Arc::new(Mutex::new(Vec::new()));

        subscribers.subscribe(|_| panic!("subscriber exploded"));
        let after = Arc::clone(&seen);
        subscribers.subscribe(move |value| after.lock().unwrap().push(value.to_string()));

        assert_eq!(subscribers.publish(&"bite"), 1);
        assert_eq!(subscribers.publish(&"nibble"), 1);
        assert_eq!(*seen.lock().unwrap(), vec!["bite", "nibble"]);
    }

    #[test]
    fn test_callback_may_subscribe_during_publish() {
        let subscribers: Arc<Subscribers<()>> = Arc::new(Subscribers::new());
        let inner = Arc::clone(&subscribers);
        subscribers.subscribe(move |_| {
            inner.subscribe(|_| {});
        });

        subscribers.publish(&());
        assert_eq!(subscribers.len(), 2);
    }
}
