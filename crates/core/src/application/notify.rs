// Notification Service - decides when and to whom outbound messages go
//
// Every attempt is persisted as a notification row (Pending -> Sent, Failed
// or Skipped) regardless of what the channel does. Failures here are logged
// and swallowed; they never surface as the triggering operation's error.

use crate::domain::{
    NotificationChannel, NotificationKind, NotificationPreference, NotificationRecord,
    NotificationStatus, Person, QueueEntry, QueueId,
};
use crate::port::{IdProvider, Notifier, QueueStore, TimeProvider};
use std::sync::Arc;
use tracing::{info, warn};

/// How many Waiting entries get a position update when the line moves
const TOP_OF_LINE_COUNT: usize = 3;

pub struct NotificationService {
    store: Arc<dyn QueueStore>,
    notifier: Arc<dyn Notifier>,
    id_provider: Arc<dyn IdProvider>,
    time_provider: Arc<dyn TimeProvider>,
}

impl NotificationService {
    pub fn new(
        store: Arc<dyn QueueStore>,
        notifier: Arc<dyn Notifier>,
        id_provider: Arc<dyn IdProvider>,
        time_provider: Arc<dyn TimeProvider>,
    ) -> Self {
        Self {
            store,
            notifier,
            id_provider,
            time_provider,
        }
    }

    /// "It's your turn" message to the entry just called to the front
    pub async fn notify_called(&self, entry: &QueueEntry) {
        let message = "It's your turn! Please come to the front now.".to_string();
        self.dispatch(entry, NotificationKind::Called, message).await;
    }

    /// Position updates to the nearest Waiting entries. Ranks are derived
    /// from the current waiting list, so calling this after the triggering
    /// departure committed yields content that already reflects it.
    pub async fn notify_top_of_line(&self, queue_id: &QueueId) {
        let waiting = match self.store.waiting_entries(queue_id).await {
            Ok(entries) => entries,
            Err(e) => {
                warn!(queue_id = %queue_id, error = %e, "Top-of-line pass could not load entries");
                return;
            }
        };

        for (idx, entry) in waiting.iter().take(TOP_OF_LINE_COUNT).enumerate() {
            let message = position_message(idx + 1);
            self.dispatch(entry, NotificationKind::PositionUpdate, message)
                .await;
        }
    }

    /// Persist a record, pick a channel, attempt delivery, record outcome.
    async fn dispatch(&self, entry: &QueueEntry, kind: NotificationKind, message: String) {
        let person = match self.store.find_person(&entry.person_id).await {
            Ok(Some(p)) => p,
            Ok(None) => {
                warn!(person_id = %entry.person_id, "Notification target no longer exists");
                return;
            }
            Err(e) => {
                warn!(person_id = %entry.person_id, error = %e, "Notification target lookup failed");
                return;
            }
        };

        let channel = select_channel(&person, entry.notification_preference);
        let now = self.time_provider.now_millis();
        let record = NotificationRecord::pending(
            self.id_provider.generate_id(),
            entry.id.clone(),
            person.id.clone(),
            kind,
            channel,
            message.clone(),
            now,
        );

        if let Err(e) = self.store.insert_notification(&record).await {
            warn!(entry_id = %entry.id, error = %e, "Could not persist notification record");
            return;
        }

        let (status, sent_at) = match channel {
            None => {
                info!(
                    person_id = %person.id,
                    kind = %kind,
                    "No usable contact info, notification skipped"
                );
                (NotificationStatus::Skipped, None)
            }
            Some(channel) => {
                let accepted = self.notifier.send(&person, channel, &message).await;
                let sent_at = self.time_provider.now_millis();
                if accepted {
                    (NotificationStatus::Sent, Some(sent_at))
                } else {
                    warn!(
                        person_id = %person.id,
                        channel = %channel,
                        "Notification channel refused delivery"
                    );
                    (NotificationStatus::Failed, Some(sent_at))
                }
            }
        };

        if let Err(e) = self
            .store
            .update_notification_status(&record.id, status, sent_at)
            .await
        {
            warn!(notification_id = %record.id, error = %e, "Could not record notification outcome");
        }
    }
}

/// SMS when the preference allows it and a phone exists; otherwise email
/// when the preference allows it and the address is real (not the synthetic
/// guest placeholder); otherwise nothing.
fn select_channel(
    person: &Person,
    preference: NotificationPreference,
) -> Option<NotificationChannel> {
    let sms_ok = matches!(
        preference,
        NotificationPreference::Sms | NotificationPreference::Both
    ) && person.phone.is_some();
    if sms_ok {
        return Some(NotificationChannel::Sms);
    }

    let email_ok = matches!(
        preference,
        NotificationPreference::Email | NotificationPreference::Both
    ) && !person.has_synthetic_email();
    if email_ok {
        return Some(NotificationChannel::Email);
    }

    None
}

fn position_message(rank: usize) -> String {
    match rank {
        1 => "You're next in line! Please make your way over.".to_string(),
        2 => "You're 2nd in line. Please be ready.".to_string(),
        _ => format!("You're {}rd in line. You'll be called soon.", rank),
    }
}
