//! Progress events emitted while a batch runs.
//!
//! The batch and the throttler emit via [`EventBus::emit`]; the terminal
//! front end subscribes via [`EventBus::subscribe`]. Built on
//! [`tokio::sync::broadcast`] so multiple listeners can react independently.

use tokio::sync::broadcast;

/// Events that flow through the system.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    /// A question is about to be sent (1-based index).
    QuestionStarted { index: usize, question: String },
    /// The upstream answered.
    Answered { index: usize, answer: String },
    /// The upstream failed; a placeholder was recorded instead.
    AnswerFailed { index: usize, error: String },
    /// The throttler is waiting; emitted once per second of the wait.
    Throttled { remaining_secs: u64 },
    /// The throttler finished waiting.
    ThrottleCleared,
}

/// A broadcast channel that any component can emit to or subscribe from.
#[derive(Debug)]
pub struct EventBus {
    tx: broadcast::Sender<Event>,
}

impl EventBus {
    /// Create a new event bus with the given channel capacity.
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Emit an event to all current subscribers.
    /// Returns the number of receivers that will see it.
    pub fn emit(&self, event: Event) -> usize {
        self.tx.send(event).unwrap_or(0)
    }

    /// Subscribe to events. Returns a receiver that yields all
    /// future events (does not replay past ones).
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.tx.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn emit_reaches_subscriber() {
        let bus = EventBus::default();
        let mut rx = bus.subscribe();

        bus.emit(Event::Throttled { remaining_secs: 7 });

        assert_eq!(rx.recv().await.unwrap(), Event::Throttled { remaining_secs: 7 });
    }

    #[tokio::test]
    async fn multiple_subscribers_receive_event() {
        let bus = EventBus::default();
        let mut rx1 = bus.subscribe();
        let mut rx2 = bus.subscribe();

        bus.emit(Event::ThrottleCleared);

        assert_eq!(rx1.recv().await.unwrap(), Event::ThrottleCleared);
        assert_eq!(rx2.recv().await.unwrap(), Event::ThrottleCleared);
    }

    #[test]
    fn emit_without_subscribers_returns_zero() {
        let bus = EventBus::default();
        assert_eq!(bus.emit(Event::ThrottleCleared), 0);
    }

    #[test]
    fn emit_with_subscriber_returns_count() {
        let bus = EventBus::default();
        let _rx1 = bus.subscribe();
        let _rx2 = bus.subscribe();

        let count = bus.emit(Event::QuestionStarted {
            index: 1,
            question: "why?".to_string(),
        });
        assert_eq!(count, 2);
    }
}
