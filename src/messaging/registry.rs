use serde_json::Value;
use std::collections::HashMap;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::{Arc, Mutex, MutexGuard};

type Handler = Arc<dyn Fn(&Value) + Send + Sync>;

/// Opaque token identifying one registration; returned by [`EventRegistry::on`]
/// and consumed by [`EventRegistry::off`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HandlerId(u64);

struct Inner {
    next_id: u64,
    handlers: HashMap<String, Vec<(HandlerId, Handler)>>,
}

/// Fan-out dispatch registry mapping event names to subscriber callbacks.
///
/// Handlers for one event run synchronously in registration order. Duplicate
/// registrations are legal and each invocation fires once per registration.
/// A panicking handler is isolated and logged so it can never abort dispatch
/// to the handlers registered after it.
pub struct EventRegistry {
    inner: Mutex<Inner>,
}

impl EventRegistry {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner {
                next_id: 0,
                handlers: HashMap::new(),
            }),
        }
    }

    /// Registers a handler for `event` and returns its removal token.
    pub fn on(&self, event: &str, handler: impl Fn(&Value) + Send + Sync + 'static) -> HandlerId {
        let mut inner = self.lock();
        inner.next_id += 1;
        let id = HandlerId(inner.next_id);
        inner
            .handlers
            .entry(event.to_owned())
            .or_default()
            .push((id, Arc::new(handler)));
        id
    }

    /// Removes the registration identified by `id`; no-op if unknown.
    pub fn off(&self, event: &str, id: HandlerId) -> bool {
        let mut inner = self.lock();
        let Some(registered) = inner.handlers.get_mut(event) else {
            return false;
        };
        let Some(position) = registered.iter().position(|(hid, _)| *hid == id) else {
            return false;
        };
        registered.remove(position);
        true
    }

    /// Invokes every handler registered for `event`, in registration order.
    pub fn dispatch(&self, event: &str, data: &Value) {
        // Snapshot outside the lock so handlers may register or remove
        // subscriptions during dispatch without deadlocking.
        let targets: Vec<Handler> = {
            let inner = self.lock();
            inner
                .handlers
                .get(event)
                .map(|registered| registered.iter().map(|(_, h)| Arc::clone(h)).collect())
                .unwrap_or_default()
        };

        for handler in targets {
            if let Err(panic) = catch_unwind(AssertUnwindSafe(|| handler(data))) {
                tracing::error!(
                    event,
                    "event handler panicked: {}",
                    panic_message(&panic)
                );
            }
        }
    }

    /// Number of handlers currently registered for `event`.
    pub fn handler_count(&self, event: &str) -> usize {
        self.lock().handlers.get(event).map_or(0, Vec::len)
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Default for EventRegistry {
    fn default() -> Self {
        Self::new()
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> &str {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s
    } else {
        "<non-string panic payload>"
    }
}
