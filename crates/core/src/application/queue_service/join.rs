// Join Use Case
//
// Position assignment and the capacity check run under the per-queue guard
// in the same transaction as the insert, so concurrent joins can neither
// overshoot capacity nor receive the same position number.

use super::QueueService;
use crate::domain::{
    DomainError, NotificationPreference, Person, PersonId, QueueEntry, QueueId,
};
use crate::error::Result;
use crate::port::QueueUnit;
use serde::Deserialize;
use tracing::info;

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum Joiner {
    Registered {
        person_id: PersonId,
    },
    Guest {
        first_name: String,
        last_name: String,
        #[serde(default)]
        email: Option<String>,
        #[serde(default)]
        phone: Option<String>,
    },
}

#[derive(Debug, Clone, Deserialize)]
pub struct JoinRequest {
    pub queue_id: QueueId,
    pub party_size: i64,
    pub notification_preference: NotificationPreference,
    pub joiner: Joiner,
}

/// Field validation that needs no store access. Contact requirements for
/// registered joiners are checked against their stored record instead.
fn validate_request(req: &JoinRequest) -> Result<()> {
    if let Joiner::Guest {
        first_name,
        last_name,
        email,
        phone,
    } = &req.joiner
    {
        if first_name.trim().is_empty() || last_name.trim().is_empty() {
            return Err(DomainError::ValidationError(
                "First name and last name are required".to_string(),
            )
            .into());
        }
        check_contact(req.notification_preference, email.as_deref(), phone.as_deref())?;
    }
    Ok(())
}

fn check_contact(
    preference: NotificationPreference,
    email: Option<&str>,
    phone: Option<&str>,
) -> Result<()> {
    let missing = |what: &str| {
        DomainError::ValidationError(format!("{} is required for this notification preference", what))
    };
    match preference {
        NotificationPreference::Email if blank(email) => Err(missing("An email address").into()),
        NotificationPreference::Sms | NotificationPreference::Both if blank(phone) => {
            Err(missing("A phone number").into())
        }
        _ => Ok(()),
    }
}

fn blank(value: Option<&str>) -> bool {
    value.map(|s| s.trim().is_empty()).unwrap_or(true)
}

impl QueueService {
    /// Join a queue. Returns the created entry, position assigned.
    pub async fn join(&self, req: JoinRequest) -> Result<QueueEntry> {
        validate_request(&req)?;

        let _guard = self.router.guard(&req.queue_id).await?;
        let mut unit = self.begin().await?;

        let mut queue = unit
            .load_queue(&req.queue_id)
            .await?
            .ok_or_else(|| DomainError::QueueNotFound(req.queue_id.clone()))?;

        // Atomic with the insert below; the guard keeps the reading fresh
        queue.check_join(req.party_size)?;

        let person = self.resolve_joiner(&mut unit, &req).await?;
        if person.id == queue.owner_id {
            return Err(DomainError::OwnerCannotJoinOwnQueue.into());
        }

        let active = unit.active_entries(&req.queue_id).await?;
        let position = queue.next_position(&active);
        let rank_ahead = active.len() as i64;

        let estimated_wait = self
            .estimator
            .predict(&req.queue_id, rank_ahead)
            .await
            .unwrap_or(rank_ahead * queue.est_service_minutes);

        let now = self.time_provider.now_millis();
        let entry = QueueEntry::new(
            self.id_provider.generate_id(),
            req.queue_id.clone(),
            person.id.clone(),
            position,
            req.party_size,
            now,
            estimated_wait,
            req.notification_preference,
        );

        unit.insert_entry(&entry).await?;
        queue.entry_joined(now);
        unit.update_queue(&queue).await?;
        unit.commit().await?;

        info!(
            queue_id = %req.queue_id,
            entry_id = %entry.id,
            position = position,
            party_size = req.party_size,
            "Joined queue"
        );
        self.broadcaster.publish(&req.queue_id);
        Ok(entry)
    }

    /// Find or create the joining person. Guests reuse an existing record
    /// matched by normalized email, or get a fresh one with a synthetic
    /// address when no email was given.
    async fn resolve_joiner(
        &self,
        unit: &mut Box<dyn QueueUnit>,
        req: &JoinRequest,
    ) -> Result<Person> {
        match &req.joiner {
            Joiner::Registered { person_id } => {
                let person = unit
                    .find_person(person_id)
                    .await?
                    .ok_or_else(|| DomainError::PersonNotFound(person_id.clone()))?;
                check_contact(
                    req.notification_preference,
                    if person.has_synthetic_email() {
                        None
                    } else {
                        Some(person.email.as_str())
                    },
                    person.phone.as_deref(),
                )?;
                Ok(person)
            }
            Joiner::Guest {
                first_name,
                last_name,
                email,
                phone,
            } => {
                let email = match email.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
                    Some(given) => given.to_lowercase(),
                    None => Person::synthetic_email(&self.id_provider.generate_id()),
                };

                if let Some(existing) = unit.find_person_by_email(&email).await? {
                    return Ok(existing);
                }

                let person = Person::new(
                    self.id_provider.generate_id(),
                    email,
                    phone.as_deref().map(str::trim).filter(|s| !s.is_empty()).map(String::from),
                    first_name.trim(),
                    last_name.trim(),
                    true,
                    self.time_provider.now_millis(),
                );
                unit.insert_person(&person).await?;
                Ok(person)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn guest_request(
        preference: NotificationPreference,
        email: Option<&str>,
        phone: Option<&str>,
    ) -> JoinRequest {
        JoinRequest {
            queue_id: "q1".to_string(),
            party_size: 1,
            notification_preference: preference,
            joiner: Joiner::Guest {
                first_name: "Ada".to_string(),
                last_name: "Lovelace".to_string(),
                email: email.map(String::from),
                phone: phone.map(String::from),
            },
        }
    }

    #[test]
    fn guest_names_are_required() {
        let req = JoinRequest {
            queue_id: "q1".to_string(),
            party_size: 1,
            notification_preference: NotificationPreference::Sms,
            joiner: Joiner::Guest {
                first_name: " ".to_string(),
                last_name: "Lovelace".to_string(),
                email: None,
                phone: Some("+15550100".to_string()),
            },
        };
        assert!(validate_request(&req).is_err());
    }

    #[test]
    fn email_preference_requires_email() {
        let req = guest_request(NotificationPreference::Email, None, Some("+15550100"));
        assert!(validate_request(&req).is_err());

        let ok = guest_request(NotificationPreference::Email, Some("a@b.com"), None);
        assert!(validate_request(&ok).is_ok());
    }

    #[test]
    fn sms_and_both_require_phone() {
        let req = guest_request(NotificationPreference::Sms, Some("a@b.com"), None);
        assert!(validate_request(&req).is_err());

        let req = guest_request(NotificationPreference::Both, Some("a@b.com"), None);
        assert!(validate_request(&req).is_err());

        let ok = guest_request(NotificationPreference::Both, Some("a@b.com"), Some("+1555"));
        assert!(validate_request(&ok).is_ok());
    }
}
