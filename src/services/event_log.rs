//! Append-only session log of simulation events
//!
//! Insertion order = arrival order = display order. Entries are never
//! reordered or deleted individually; only a whole-log clear is supported.
//! Observers are an explicit callback list, notified after each mutation.

use crate::domain::SimulationEvent;
use tracing::debug;

/// Mutation notification delivered to observers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogChange {
    Appended,
    Cleared,
}

type Observer = Box<dyn FnMut(LogChange)>;

/// Session-scoped ordered sequence of received events
#[derive(Default)]
pub struct EventLog {
    events: Vec<SimulationEvent>,
    observers: Vec<Observer>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an observer called after every append and clear
    pub fn subscribe(&mut self, observer: Observer) {
        self.observers.push(observer);
    }

    /// Add an event to the tail and notify observers
    pub fn append(&mut self, event: SimulationEvent) {
        self.events.push(event);
        self.notify(LogChange::Appended);
    }

    /// Empty the log and notify observers
    pub fn clear(&mut self) {
        let dropped = self.events.len();
        self.events.clear();
        debug!(dropped, "event_log_cleared");
        self.notify(LogChange::Cleared);
    }

    pub fn events(&self) -> &[SimulationEvent] {
        &self.events
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    fn notify(&mut self, change: LogChange) {
        for observer in &mut self.observers {
            observer(change);
        }
    }
}
