use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::domain::events::DomainEvent;

pub type Handler = Arc<dyn Fn(&DomainEvent) -> anyhow::Result<()> + Send + Sync>;

/// In-process publish/subscribe. Handlers run synchronously in registration
/// order; a failing handler is logged and does not stop the rest. Delivery is
/// at-least-once within the process; cross-process fan-out belongs to the
/// messaging context.
///
/// The bus is an explicit dependency carried in `AppState`; tests swap in a
/// fresh instance with a recording subscriber.
#[derive(Clone, Default)]
pub struct EventBus {
    subscribers: Arc<RwLock<HashMap<String, Vec<Handler>>>>,
    wildcard: Arc<RwLock<Vec<Handler>>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe<F>(&self, event_type: &str, handler: F)
    where
        F: Fn(&DomainEvent) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        let mut subscribers = self.subscribers.write().expect("bus registry poisoned");
        subscribers
            .entry(event_type.to_string())
            .or_default()
            .push(Arc::new(handler));
    }

    /// Receive every event regardless of type. Used by recording subscribers
    /// in tests and by catch-all forwarders.
    pub fn subscribe_all<F>(&self, handler: F)
    where
        F: Fn(&DomainEvent) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        let mut wildcard = self.wildcard.write().expect("bus registry poisoned");
        wildcard.push(Arc::new(handler));
    }

    pub fn publish(&self, event: &DomainEvent) {
        let typed: Vec<Handler> = {
            let subscribers = self.subscribers.read().expect("bus registry poisoned");
            subscribers
                .get(&event.event_type)
                .map(|handlers| handlers.to_vec())
                .unwrap_or_default()
        };
        let wildcard: Vec<Handler> = {
            let wildcard = self.wildcard.read().expect("bus registry poisoned");
            wildcard.to_vec()
        };

        for handler in typed.iter().chain(wildcard.iter()) {
            if let Err(err) = handler(event) {
                tracing::warn!(
                    event_type = %event.event_type,
                    event_id = %event.event_id,
                    error = %err,
                    "event handler failed"
                );
            }
        }
    }

    pub fn publish_all(&self, events: &[DomainEvent]) {
        for event in events {
            self.publish(event);
        }
    }

    pub fn clear(&self) {
        self.subscribers
            .write()
            .expect("bus registry poisoned")
            .clear();
        self.wildcard.write().expect("bus registry poisoned").clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::events::{self, DomainEvent};
    use std::sync::Mutex;
    use uuid::Uuid;

    fn event(event_type: &str) -> DomainEvent {
        DomainEvent::for_booking(event_type, Uuid::new_v4(), serde_json::json!({}))
    }

    #[test]
    fn dispatches_by_event_type() {
        let bus = EventBus::new();
        let seen = Arc::new(Mutex::new(Vec::new()));

        let sink = seen.clone();
        bus.subscribe(events::BOOKING_CONFIRMED, move |e| {
            sink.lock().unwrap().push(e.event_id);
            Ok(())
        });

        let confirmed = event(events::BOOKING_CONFIRMED);
        bus.publish(&confirmed);
        bus.publish(&event(events::BOOKING_CANCELLED));

        let seen = seen.lock().unwrap();
        assert_eq!(seen.as_slice(), &[confirmed.event_id]);
    }

    #[test]
    fn failing_handler_does_not_block_later_handlers() {
        let bus = EventBus::new();
        let seen = Arc::new(Mutex::new(0));

        bus.subscribe(events::BOOKING_CONFIRMED, |_| {
            anyhow::bail!("notification channel down")
        });
        let sink = seen.clone();
        bus.subscribe(events::BOOKING_CONFIRMED, move |_| {
            *sink.lock().unwrap() += 1;
            Ok(())
        });

        bus.publish(&event(events::BOOKING_CONFIRMED));
        assert_eq!(*seen.lock().unwrap(), 1);
    }

    #[test]
    fn wildcard_sees_everything_and_clear_resets() {
        let bus = EventBus::new();
        let seen = Arc::new(Mutex::new(0));

        let sink = seen.clone();
        bus.subscribe_all(move |_| {
            *sink.lock().unwrap() += 1;
            Ok(())
        });

        bus.publish(&event(events::BOOKING_CONFIRMED));
        bus.publish(&event(events::BOOKING_COMPLETED));
        assert_eq!(*seen.lock().unwrap(), 2);

        bus.clear();
        bus.publish(&event(events::BOOKING_CONFIRMED));
        assert_eq!(*seen.lock().unwrap(), 2);
    }
}
