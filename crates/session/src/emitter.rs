//! Per-session listener registry

use crate::event::{WatcherEventData, WatcherEventName};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::trace;

pub type Listener = Arc<dyn Fn(&WatcherEventData) + Send + Sync>;

/// A listener plus the lock serializing its deliveries
struct Registration {
    listener: Listener,
    delivery: Mutex<()>,
}

impl Registration {
    fn deliver(&self, data: &WatcherEventData) {
        let _delivery = self.delivery.lock().unwrap_or_else(PoisonError::into_inner);
        (self.listener)(data);
    }
}

#[derive(Default)]
struct Registry {
    listeners: HashMap<WatcherEventName, Vec<Arc<Registration>>>,
    /// Everything emitted so far, kept until [`WatcherEmitter::end_replay`]
    replay: Option<Vec<WatcherEventData>>,
}

/// Ordered listeners keyed by event name
///
/// Listeners run synchronously on the emitting task, in registration order.
/// With replay enabled, a listener registered late first receives the earlier
/// events of its name, then live ones, so nothing emitted between session
/// start and registration is lost.
#[derive(Default)]
pub struct WatcherEmitter {
    registry: Mutex<Registry>,
}

impl WatcherEmitter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Emitter that records events for late listeners until `end_replay`
    pub fn with_replay() -> Self {
        Self {
            registry: Mutex::new(Registry {
                listeners: HashMap::new(),
                replay: Some(Vec::new()),
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Registry> {
        self.registry.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn on<F>(&self, name: WatcherEventName, listener: F)
    where
        F: Fn(&WatcherEventData) + Send + Sync + 'static,
    {
        let registration = Arc::new(Registration {
            listener: Arc::new(listener),
            delivery: Mutex::new(()),
        });

        let mut registry = self.lock();
        registry
            .listeners
            .entry(name)
            .or_default()
            .push(Arc::clone(&registration));
        let backlog: Vec<WatcherEventData> = registry
            .replay
            .iter()
            .flatten()
            .filter(|data| data.name() == name)
            .cloned()
            .collect();
        if backlog.is_empty() {
            return;
        }

        // Held before the registry is released so live events queue behind the backlog
        let _delivery = registration
            .delivery
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        drop(registry);
        trace!("Replaying {} {} events", backlog.len(), name);
        for data in &backlog {
            (registration.listener)(data);
        }
    }

    /// Deliver `data` to every listener registered under its name
    pub fn emit(&self, data: &WatcherEventData) {
        let name = data.name();
        // Snapshot so listeners may register further listeners
        let registrations = {
            let mut registry = self.lock();
            if let Some(replay) = registry.replay.as_mut() {
                replay.push(data.clone());
            }
            registry.listeners.get(&name).cloned().unwrap_or_default()
        };
        trace!("Emitting {} to {} listeners", name, registrations.len());
        for registration in &registrations {
            registration.deliver(data);
        }
    }

    /// Stop recording; later listeners only see live events
    pub fn end_replay(&self) {
        if self.lock().replay.take().is_some() {
            trace!("Event replay ended");
        }
    }

    /// Drop every listener and any recorded events
    pub fn clear(&self) {
        let mut registry = self.lock();
        registry.listeners.clear();
        registry.replay = None;
    }

    pub fn listener_count(&self, name: WatcherEventName) -> usize {
        self.lock().listeners.get(&name).map_or(0, Vec::len)
    }
}
