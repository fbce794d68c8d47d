use super::Event;
use crate::errors::ObserverError;
use crate::fields;
use crate::logging::Logger;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

/// A consumer of lifecycle events.
pub trait Observer: Send + Sync {
    fn name(&self) -> &str {
        "observer"
    }

    fn on_event(&self, event: &Event) -> Result<(), ObserverError>;
}

/// Opaque handle returned by [`ObserverBus::register_observer`], used to
/// unregister later without requiring the caller to keep the original `Arc`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ObserverHandle(u64);

struct Registration {
    id: u64,
    observer: Arc<dyn Observer>,
    event_types: Option<Vec<String>>,
}

/// Fans lifecycle events out to registered observers. Observer errors are
/// captured per observer and logged; one observer's failure never prevents
/// delivery to others, and `notify_observers` never itself fails
/// (`spec.md` §4.6).
pub struct ObserverBus {
    logger: Arc<dyn Logger>,
    registrations: RwLock<Vec<Registration>>,
    next_id: AtomicU64,
}

impl ObserverBus {
    pub fn new(logger: Arc<dyn Logger>) -> Self {
        Self {
            logger,
            registrations: RwLock::new(Vec::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Register `observer`. An empty `event_types` means the observer
    /// receives every event; otherwise only matching types.
    pub fn register_observer(
        &self,
        observer: Arc<dyn Observer>,
        event_types: Vec<String>,
    ) -> ObserverHandle {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let filter = if event_types.is_empty() {
            None
        } else {
            Some(event_types)
        };
        self.registrations.write().unwrap().push(Registration {
            id,
            observer,
            event_types: filter,
        });
        ObserverHandle(id)
    }

    /// Idempotent: unregistering an unknown or already-removed handle is a
    /// no-op.
    pub fn unregister_observer(&self, handle: ObserverHandle) {
        self.registrations
            .write()
            .unwrap()
            .retain(|r| r.id != handle.0);
    }

    pub fn observer_count(&self) -> usize {
        self.registrations.read().unwrap().len()
    }

    /// Fan `event` out to every matching observer, in registration order.
    /// Per-observer errors are logged and never interrupt delivery to the
    /// rest, matching the producer-order guarantee from `spec.md` §5.
    pub fn notify_observers(&self, event: &Event) {
        let regs = self.registrations.read().unwrap();
        for reg in regs.iter() {
            if let Some(types) = &reg.event_types {
                if !types.iter().any(|t| t == &event.event_type) {
                    continue;
                }
            }
            if let Err(err) = reg.observer.on_event(event) {
                self.logger.error(
                    "observer failed to handle event",
                    fields!(
                        "observer" => reg.observer.name().to_string(),
                        "event_type" => event.event_type.clone(),
                        "error" => err.to_string()
                    ),
                );
            }
        }
    }
}
