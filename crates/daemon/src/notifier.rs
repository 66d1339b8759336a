// Log-backed Notifier adapter
//
// Stands in for an SMS gateway / SMTP relay. The core records every
// attempt in the notifications table either way, so swapping in a real
// provider is a drop-in replacement of this adapter.

use async_trait::async_trait;
use tracing::info;
use waitline_core::domain::{NotificationChannel, Person};
use waitline_core::port::Notifier;

pub struct TracingNotifier;

#[async_trait]
impl Notifier for TracingNotifier {
    async fn send(&self, person: &Person, channel: NotificationChannel, message: &str) -> bool {
        let destination = match channel {
            NotificationChannel::Sms => person.phone.clone().unwrap_or_default(),
            NotificationChannel::Email => person.email.clone(),
        };
        info!(
            person_id = %person.id,
            channel = %channel,
            destination = %destination,
            message = %message,
            "Outbound notification"
        );
        true
    }
}
