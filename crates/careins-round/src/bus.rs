//! # Event Publishing
//!
//! The service hands drained round events to an [`EventPublisher`] after
//! the round has been saved. [`EventBus`] fans each event out to its
//! registered [`RoundEventHandler`]s synchronously, in registration order.
//! Handlers must tolerate redelivery: the service may publish the same
//! logical change again after a retry, and relays to other processes give
//! at-least-once delivery at best.

use std::sync::Arc;

use parking_lot::RwLock;
use tracing::trace;

use crate::events::RoundEvent;

/// A downstream consumer of round events.
pub trait RoundEventHandler: Send + Sync {
    /// Name used in logs.
    fn name(&self) -> &'static str;

    fn handle(&self, event: &RoundEvent);
}

/// Sink for events drained from saved rounds.
pub trait EventPublisher: Send + Sync {
    fn publish(&self, event: &RoundEvent);

    fn publish_all(&self, events: &[RoundEvent]) {
        for event in events {
            self.publish(event);
        }
    }
}

/// Synchronous in-process fan-out.
#[derive(Clone, Default)]
pub struct EventBus {
    handlers: Arc<RwLock<Vec<Arc<dyn RoundEventHandler>>>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self, handler: Arc<dyn RoundEventHandler>) {
        self.handlers.write().push(handler);
    }

    pub fn handler_count(&self) -> usize {
        self.handlers.read().len()
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<_> = self.handlers.read().iter().map(|h| h.name()).collect();
        f.debug_struct("EventBus").field("handlers", &names).finish()
    }
}

impl EventPublisher for EventBus {
    fn publish(&self, event: &RoundEvent) {
        // Snapshot so a handler may subscribe others without deadlocking.
        let handlers: Vec<_> = self.handlers.read().clone();
        for handler in handlers {
            trace!(handler = handler.name(), event = event.name(), "dispatching round event");
            handler.handle(event);
        }
    }
}

/// Keeps every published event.
#[derive(Debug, Clone, Default)]
pub struct RecordingPublisher {
    events: Arc<RwLock<Vec<RoundEvent>>>,
}

impl RecordingPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<RoundEvent> {
        self.events.read().clone()
    }

    pub fn event_names(&self) -> Vec<&'static str> {
        self.events.read().iter().map(RoundEvent::name).collect()
    }

    pub fn clear(&self) {
        self.events.write().clear();
    }
}

impl EventPublisher for RecordingPublisher {
    fn publish(&self, event: &RoundEvent) {
        self.events.write().push(event.clone());
    }
}

impl RoundEventHandler for RecordingPublisher {
    fn name(&self) -> &'static str {
        "recording"
    }

    fn handle(&self, event: &RoundEvent) {
        self.publish(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::LastCaregivingRoundFinished;
    use careins_core::{CaregivingRoundId, ReceptionId, Timestamp};

    fn event() -> RoundEvent {
        RoundEvent::LastCaregivingRoundFinished(LastCaregivingRoundFinished {
            reception_id: ReceptionId::new(),
            last_caregiving_round_id: CaregivingRoundId::new(),
            end_date_time: Timestamp::from_ymd_hms(2026, 5, 1, 0, 0, 0).unwrap(),
        })
    }

    #[test]
    fn bus_fans_out_to_every_handler() {
        let bus = EventBus::new();
        let first = Arc::new(RecordingPublisher::new());
        let second = Arc::new(RecordingPublisher::new());
        bus.subscribe(first.clone());
        bus.subscribe(second.clone());

        bus.publish_all(&[event(), event()]);
        assert_eq!(bus.handler_count(), 2);
        assert_eq!(first.events().len(), 2);
        assert_eq!(second.event_names(), vec!["LastCaregivingRoundFinished"; 2]);
    }

    #[test]
    fn recording_publisher_clears() {
        let recorder = RecordingPublisher::new();
        recorder.publish(&event());
        recorder.clear();
        assert!(recorder.events().is_empty());
    }
}
