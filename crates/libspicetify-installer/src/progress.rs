// SPDX-License-Identifier: MIT OR Apache-2.0

use std::sync::Arc;

use parking_lot::Mutex;

pub type ProgressListener = Box<dyn Fn(u8) + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

#[derive(Default)]
struct Registry {
    next_id: u64,
    listeners: Vec<(SubscriptionId, Arc<dyn Fn(u8) + Send + Sync>)>,
}

/// fan-out for percentage updates of the running operation.
///
/// publishing may happen from a worker thread while the ui thread subscribes.
#[derive(Clone, Default)]
pub struct ProgressHub {
    registry: Arc<Mutex<Registry>>,
}

impl ProgressHub {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self, listener: ProgressListener) -> SubscriptionId {
        let mut registry = self.registry.lock();
        let id = SubscriptionId(registry.next_id);
        registry.next_id += 1;
        registry.listeners.push((id, Arc::from(listener)));
        id
    }

    /// removes a listener; unknown ids are ignored.
    pub fn unsubscribe(&self, id: SubscriptionId) {
        self.registry.lock().listeners.retain(|(i, _)| *i != id);
    }

    /// notifies listeners in subscription order with the value clamped to 0-100.
    pub fn publish(&self, value: u32) {
        let value = value.min(100) as u8;

        // listeners run outside the lock so they may unsubscribe themselves
        let listeners: Vec<_> = self
            .registry
            .lock()
            .listeners
            .iter()
            .map(|(_, l)| Arc::clone(l))
            .collect();

        for listener in listeners {
            listener(value);
        }
    }

    pub fn listener_count(&self) -> usize {
        self.registry.lock().listeners.len()
    }
}

impl std::fmt::Debug for ProgressHub {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProgressHub")
            .field("listeners", &self.listener_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_publish_clamps_and_orders() {
        let hub = ProgressHub::new();
        let seen = Arc::new(Mutex::new(Vec::new()));

        let first = Arc::clone(&seen);
        hub.subscribe(Box::new(move |v: u8| first.lock().push(("a", v))));
        let second = Arc::clone(&seen);
        hub.subscribe(Box::new(move |v: u8| second.lock().push(("b", v))));

        hub.publish(40);
        hub.publish(250);

        assert_eq!(
            *seen.lock(),
            vec![("a", 40), ("b", 40), ("a", 100), ("b", 100)]
        );
    }

    #[test]
    fn test_unsubscribe_stops_delivery() {
        let hub = ProgressHub::new();
        let seen = Arc::new(Mutex::new(Vec::new()));

        let sink = Arc::clone(&seen);
        let id = hub.subscribe(Box::new(move |v: u8| sink.lock().push(v)));
        hub.publish(10);
        hub.unsubscribe(id);
        hub.publish(20);
        hub.unsubscribe(id);

        assert_eq!(*seen.lock(), vec![10]);
        assert_eq!(hub.listener_count(), 0);
    }
}
