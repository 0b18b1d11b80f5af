//! Publish/subscribe channel for overlay lifecycle and output events.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

/// Event names exposed to subscribers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EventKind {
    OverlayStarted,
    OverlayStopped,
    StdoutLine,
    StderrLine,
}

impl EventKind {
    pub const ALL: [EventKind; 4] = [
        EventKind::OverlayStarted,
        EventKind::OverlayStopped,
        EventKind::StdoutLine,
        EventKind::StderrLine,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            EventKind::OverlayStarted => "overlay-started",
            EventKind::OverlayStopped => "overlay-stopped",
            EventKind::StdoutLine => "stdout-line",
            EventKind::StderrLine => "stderr-line",
        }
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Typed event payloads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "kebab-case")]
pub enum OverlayEvent {
    /// The overlay printed its ready marker.
    #[serde(rename_all = "camelCase")]
    OverlayStarted {
        pid: Option<u32>,
        generation: u64,
        time: DateTime<Utc>,
    },
    /// The overlay process is gone.
    #[serde(rename_all = "camelCase")]
    OverlayStopped {
        exit_error: bool,
        exit_code: Option<i32>,
        message: Option<String>,
        pid: Option<u32>,
        time: DateTime<Utc>,
    },
    StdoutLine { content: String, time: DateTime<Utc> },
    StderrLine { content: String, time: DateTime<Utc> },
}

impl OverlayEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            OverlayEvent::OverlayStarted { .. } => EventKind::OverlayStarted,
            OverlayEvent::OverlayStopped { .. } => EventKind::OverlayStopped,
            OverlayEvent::StdoutLine { .. } => EventKind::StdoutLine,
            OverlayEvent::StderrLine { .. } => EventKind::StderrLine,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

/// Receiving end of a subscription.
///
/// Dropping it has the same effect as [`EventHub::unsubscribe`].
#[derive(Debug)]
pub struct Subscription {
    id: SubscriptionId,
    receiver: mpsc::UnboundedReceiver<OverlayEvent>,
}

impl Subscription {
    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    /// Waits for the next event. Returns `None` once unsubscribed.
    pub async fn recv(&mut self) -> Option<OverlayEvent> {
        self.receiver.recv().await
    }

    pub fn try_recv(&mut self) -> Option<OverlayEvent> {
        self.receiver.try_recv().ok()
    }
}

struct Subscriber {
    id: SubscriptionId,
    kinds: Vec<EventKind>,
    sender: mpsc::UnboundedSender<OverlayEvent>,
}

/// Fan-out of events to every current subscriber, in publish order.
///
/// Events are not retained: late subscribers only see what is published
/// after they subscribe.
#[derive(Default)]
pub struct EventHub {
    next_id: AtomicU64,
    subscribers: Mutex<Vec<Subscriber>>,
}

impl EventHub {
    pub fn new() -> Self {
        Self::default()
    }

    fn subscribers(&self) -> MutexGuard<'_, Vec<Subscriber>> {
        self.subscribers.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Subscribes to the given event kinds.
    pub fn subscribe(&self, kinds: &[EventKind]) -> Subscription {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let (sender, receiver) = mpsc::unbounded_channel();

        self.subscribers().push(Subscriber {
            id,
            kinds: kinds.to_vec(),
            sender,
        });

        Subscription { id, receiver }
    }

    /// Removes a subscription. Returns `false` if it was already gone.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut subscribers = self.subscribers();
        let before = subscribers.len();
        subscribers.retain(|s| s.id != id);
        subscribers.len() != before
    }

    /// Delivers `event` to every subscriber of its kind.
    pub fn publish(&self, event: OverlayEvent) {
        let kind = event.kind();
        let mut subscribers = self.subscribers();
        subscribers.retain(|s| {
            if !s.kinds.contains(&kind) {
                return !s.sender.is_closed();
            }
            s.sender.send(event.clone()).is_ok()
        });
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers().len()
    }
}

impl std::fmt::Debug for EventHub {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventHub")
            .field("subscribers", &self.subscriber_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(content: &str) -> OverlayEvent {
        OverlayEvent::StdoutLine {
            content: content.to_string(),
            time: Utc::now(),
        }
    }

    #[test]
    fn test_fifo_delivery() {
        let hub = EventHub::new();
        let mut first = hub.subscribe(&[EventKind::StdoutLine]);
        let mut second = hub.subscribe(&EventKind::ALL);

        for i in 0..5 {
            hub.publish(line(&i.to_string()));
        }

        for subscription in [&mut first, &mut second] {
            let received: Vec<String> = std::iter::from_fn(|| subscription.try_recv())
                .map(|event| match event {
                    OverlayEvent::StdoutLine { content, .. } => content,
                    other => panic!("unexpected event {other:?}"),
                })
                .collect();
            assert_eq!(received, vec!["0", "1", "2", "3", "4"]);
        }
    }

    #[test]
    fn test_filters_by_kind() {
        let hub = EventHub::new();
        let mut stopped_only = hub.subscribe(&[EventKind::OverlayStopped]);

        hub.publish(line("ignored"));
        assert!(stopped_only.try_recv().is_none());
    }

    #[test]
    fn test_unsubscribe_is_idempotent() {
        let hub = EventHub::new();
        let subscription = hub.subscribe(&EventKind::ALL);
        let id = subscription.id();

        assert!(hub.unsubscribe(id));
        assert!(!hub.unsubscribe(id));
        assert_eq!(hub.subscriber_count(), 0);
    }

    #[test]
    fn test_dropped_subscription_is_pruned() {
        let hub = EventHub::new();
        drop(hub.subscribe(&EventKind::ALL));
        hub.publish(line("x"));
        assert_eq!(hub.subscriber_count(), 0);
    }

    #[test]
    fn test_event_wire_format() {
        let event = OverlayEvent::OverlayStopped {
            exit_error: true,
            exit_code: Some(1),
            message: None,
            pid: Some(42),
            time: Utc::now(),
        };
        let json = serde_json::to_value(&event).unwrap();

        assert_eq!(json["event"], "overlay-stopped");
        assert_eq!(json["exitError"], true);
        assert_eq!(json["exitCode"], 1);
        assert_eq!(event.kind().as_str(), "overlay-stopped");
    }
}
