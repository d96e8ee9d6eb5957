//! Typed publish/subscribe fan-out for server-pushed notifications.

use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, Mutex, Weak};

use clearline_wire::method;
use serde_json::Value;
use tracing::error;

/// Kinds of unsolicited server pushes, keyed by broadcast method name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EventKind {
    Assets,
    BalanceUpdate,
    ChannelUpdate,
    SessionUpdate,
    Payment,
    Other(String),
}

impl EventKind {
    pub fn from_method(name: &str) -> Self {
        match name {
            method::ASSETS => Self::Assets,
            method::BALANCE_UPDATE => Self::BalanceUpdate,
            method::CHANNEL_UPDATE => Self::ChannelUpdate,
            method::SESSION_UPDATE => Self::SessionUpdate,
            method::PAYMENT => Self::Payment,
            other => Self::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Assets => method::ASSETS,
            Self::BalanceUpdate => method::BALANCE_UPDATE,
            Self::ChannelUpdate => method::CHANNEL_UPDATE,
            Self::SessionUpdate => method::SESSION_UPDATE,
            Self::Payment => method::PAYMENT,
            Self::Other(name) => name,
        }
    }
}

type Handler = Arc<dyn Fn(&Value) + Send + Sync>;

#[derive(Default)]
struct BusInner {
    next_id: u64,
    handlers: HashMap<EventKind, Vec<(u64, Handler)>>,
}

/// Event dispatcher. Cloning shares the subscriber table.
#[derive(Clone, Default)]
pub struct EventBus {
    inner: Arc<Mutex<BusInner>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler for one event kind. The returned subscription
    /// removes the handler on `unsubscribe()` or drop.
    pub fn subscribe(
        &self,
        kind: EventKind,
        handler: impl Fn(&Value) + Send + Sync + 'static,
    ) -> Subscription {
        let mut inner = self.inner.lock().unwrap();
        inner.next_id += 1;
        let id = inner.next_id;
        inner
            .handlers
            .entry(kind.clone())
            .or_default()
            .push((id, Arc::new(handler)));
        Subscription {
            bus: Arc::downgrade(&self.inner),
            kind,
            id,
        }
    }

    /// Invoke all current subscribers for `kind`. A panicking handler is
    /// isolated and logged; the remaining handlers still run.
    pub fn publish(&self, kind: &EventKind, payload: &Value) {
        let handlers: Vec<Handler> = {
            let inner = self.inner.lock().unwrap();
            inner
                .handlers
                .get(kind)
                .map(|list| list.iter().map(|(_, handler)| handler.clone()).collect())
                .unwrap_or_default()
        };
        for handler in handlers {
            if catch_unwind(AssertUnwindSafe(|| handler(payload))).is_err() {
                error!(kind = kind.as_str(), "event handler panicked");
            }
        }
    }

    pub fn subscriber_count(&self, kind: &EventKind) -> usize {
        self.inner
            .lock()
            .unwrap()
            .handlers
            .get(kind)
            .map(Vec::len)
            .unwrap_or(0)
    }
}

/// Handle to one registered handler.
pub struct Subscription {
    bus: Weak<Mutex<BusInner>>,
    kind: EventKind,
    id: u64,
}

impl Subscription {
    pub fn unsubscribe(self) {}
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(bus) = self.bus.upgrade() {
            let mut inner = bus.lock().unwrap();
            if let Some(list) = inner.handlers.get_mut(&self.kind) {
                list.retain(|(id, _)| *id != self.id);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    use serde_json::json;

    use super::{EventBus, EventKind};

    #[test]
    fn publish_reaches_all_subscribers_of_the_kind() {
        let bus = EventBus::new();
        let hits = Arc::new(AtomicU32::new(0));

        let first = {
            let hits = hits.clone();
            bus.subscribe(EventKind::BalanceUpdate, move |_| {
                hits.fetch_add(1, Ordering::SeqCst);
            })
        };
        let second = {
            let hits = hits.clone();
            bus.subscribe(EventKind::BalanceUpdate, move |_| {
                hits.fetch_add(1, Ordering::SeqCst);
            })
        };
        let unrelated = {
            let hits = hits.clone();
            bus.subscribe(EventKind::Payment, move |_| {
                hits.fetch_add(100, Ordering::SeqCst);
            })
        };

        bus.publish(&EventKind::BalanceUpdate, &json!({}));
        assert_eq!(hits.load(Ordering::SeqCst), 2);

        drop(first);
        drop(second);
        drop(unrelated);
    }

    #[test]
    fn unsubscribe_removes_the_handler() {
        let bus = EventBus::new();
        let hits = Arc::new(AtomicU32::new(0));
        let subscription = {
            let hits = hits.clone();
            bus.subscribe(EventKind::Assets, move |_| {
                hits.fetch_add(1, Ordering::SeqCst);
            })
        };
        assert_eq!(bus.subscriber_count(&EventKind::Assets), 1);

        subscription.unsubscribe();
        assert_eq!(bus.subscriber_count(&EventKind::Assets), 0);
        bus.publish(&EventKind::Assets, &json!({}));
        assert_eq!(hits.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn panicking_handler_does_not_stop_the_rest() {
        let bus = EventBus::new();
        let hits = Arc::new(AtomicU32::new(0));

        let _poison = bus.subscribe(EventKind::SessionUpdate, |_| panic!("boom"));
        let _ok = {
            let hits = hits.clone();
            bus.subscribe(EventKind::SessionUpdate, move |_| {
                hits.fetch_add(1, Ordering::SeqCst);
            })
        };

        bus.publish(&EventKind::SessionUpdate, &json!({}));
        bus.publish(&EventKind::SessionUpdate, &json!({}));
        assert_eq!(hits.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn unknown_broadcast_methods_map_to_other() {
        assert_eq!(EventKind::from_method("assets"), EventKind::Assets);
        assert_eq!(
            EventKind::from_method("fee_schedule"),
            EventKind::Other("fee_schedule".to_string())
        );
        assert_eq!(EventKind::Other("x".into()).as_str(), "x");
    }
}
