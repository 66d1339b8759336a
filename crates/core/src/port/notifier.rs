// Notifier Port - external collaborator for outbound messages
// The core decides when and to whom; delivery is someone else's problem.

use crate::domain::{NotificationChannel, Person};
use async_trait::async_trait;

/// Outbound message delivery interface.
///
/// Implementations talk to an SMS gateway, an SMTP relay, or just the log.
/// Returns whether the channel accepted the message; the caller records the
/// outcome and never propagates a failure to the originating operation.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, person: &Person, channel: NotificationChannel, message: &str) -> bool;
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;
    use std::sync::{Arc, Mutex};

    /// One delivery attempt observed by the mock
    #[derive(Debug, Clone)]
    pub struct SentMessage {
        pub person_id: String,
        pub channel: NotificationChannel,
        pub message: String,
    }

    /// Mock notifier recording every send; configurable to refuse delivery
    pub struct MockNotifier {
        accept: bool,
        sent: Arc<Mutex<Vec<SentMessage>>>,
    }

    impl MockNotifier {
        pub fn accepting() -> Self {
            Self {
                accept: true,
                sent: Arc::new(Mutex::new(Vec::new())),
            }
        }

        pub fn refusing() -> Self {
            Self {
                accept: false,
                sent: Arc::new(Mutex::new(Vec::new())),
            }
        }

        pub fn sent(&self) -> Vec<SentMessage> {
            self.sent.lock().unwrap().clone()
        }

        pub fn sent_count(&self) -> usize {
            self.sent.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl Notifier for MockNotifier {
        async fn send(
            &self,
            person: &Person,
            channel: NotificationChannel,
            message: &str,
        ) -> bool {
            self.sent.lock().unwrap().push(SentMessage {
                person_id: person.id.clone(),
                channel,
                message: message.to_string(),
            });
            self.accept
        }
    }
}
