// Broadcaster - fan-out of "queue changed" events
//
// Two scopes: a channel per queue for subscribers watching one line, and a
// global channel for subscribers watching the list of open queues. Payloads
// carry only the queue id; subscribers re-fetch current state, which avoids
// pushing stale snapshots. Delivery is at-most-once best-effort: a publish
// with no listeners is not an error and never touches the originating
// mutation.

use crate::domain::QueueId;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Mutex as StdMutex;
use tokio::sync::broadcast;

const DEFAULT_CHANNEL_CAPACITY: usize = 64;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QueueChanged {
    pub queue_id: QueueId,
}

pub struct Broadcaster {
    capacity: usize,
    global: broadcast::Sender<QueueChanged>,
    per_queue: StdMutex<HashMap<QueueId, broadcast::Sender<QueueChanged>>>,
}

impl Broadcaster {
    pub fn new(capacity: usize) -> Self {
        let (global, _) = broadcast::channel(capacity);
        Self {
            capacity,
            global,
            per_queue: StdMutex::new(HashMap::new()),
        }
    }

    /// Subscribe to every queue change (home-page style listeners)
    pub fn subscribe_global(&self) -> broadcast::Receiver<QueueChanged> {
        self.global.subscribe()
    }

    /// Subscribe to one queue's changes
    pub fn subscribe_queue(&self, queue_id: &QueueId) -> broadcast::Receiver<QueueChanged> {
        let mut channels = self.per_queue.lock().expect("broadcaster lock poisoned");
        channels
            .entry(queue_id.clone())
            .or_insert_with(|| broadcast::channel(self.capacity).0)
            .subscribe()
    }

    /// Publish to both scopes. Never fails; a send error just means nobody
    /// is listening right now.
    pub fn publish(&self, queue_id: &QueueId) {
        let event = QueueChanged {
            queue_id: queue_id.clone(),
        };

        let _ = self.global.send(event.clone());

        let mut channels = self.per_queue.lock().expect("broadcaster lock poisoned");
        // Sweep channels whose last subscriber disconnected
        channels.retain(|_, tx| tx.receiver_count() > 0);
        if let Some(tx) = channels.get(queue_id) {
            let _ = tx.send(event);
        }
    }
}

impl Default for Broadcaster {
    fn default() -> Self {
        Self::new(DEFAULT_CHANNEL_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn both_scopes_receive_the_event() {
        let b = Broadcaster::default();
        let mut global = b.subscribe_global();
        let mut scoped = b.subscribe_queue(&"q1".to_string());

        b.publish(&"q1".to_string());

        assert_eq!(global.recv().await.unwrap().queue_id, "q1");
        assert_eq!(scoped.recv().await.unwrap().queue_id, "q1");
    }

    #[tokio::test]
    async fn queue_scope_only_sees_its_own_queue() {
        let b = Broadcaster::default();
        let mut scoped = b.subscribe_queue(&"q1".to_string());

        b.publish(&"q2".to_string());
        b.publish(&"q1".to_string());

        assert_eq!(scoped.recv().await.unwrap().queue_id, "q1");
    }

    #[tokio::test]
    async fn publish_without_subscribers_is_fine() {
        let b = Broadcaster::default();
        // No panic, no error surface
        b.publish(&"q1".to_string());
    }

    #[tokio::test]
    async fn disconnected_channels_are_swept() {
        let b = Broadcaster::default();
        {
            let _rx = b.subscribe_queue(&"q1".to_string());
        }
        b.publish(&"q2".to_string());

        let channels = b.per_queue.lock().unwrap();
        assert!(!channels.contains_key("q1"));
    }
}
