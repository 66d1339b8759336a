// Queue Entry Domain Model - one person's place in line

use serde::{Deserialize, Serialize};

/// Entry ID (UUID v4)
pub type EntryId = String;

/// Entry lifecycle state
///
/// Waiting -> Notified -> Served | NoShow
/// Waiting | Notified -> Cancelled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EntryStatus {
    Waiting,
    Notified,
    Served,
    Cancelled,
    NoShow,
}

impl EntryStatus {
    /// Active entries count toward the queue's current size
    pub fn is_active(&self) -> bool {
        matches!(self, EntryStatus::Waiting | EntryStatus::Notified)
    }

    pub fn is_terminal(&self) -> bool {
        !self.is_active()
    }
}

impl std::fmt::Display for EntryStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EntryStatus::Waiting => write!(f, "WAITING"),
            EntryStatus::Notified => write!(f, "NOTIFIED"),
            EntryStatus::Served => write!(f, "SERVED"),
            EntryStatus::Cancelled => write!(f, "CANCELLED"),
            EntryStatus::NoShow => write!(f, "NO_SHOW"),
        }
    }
}

impl std::str::FromStr for EntryStatus {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "WAITING" => Ok(EntryStatus::Waiting),
            "NOTIFIED" => Ok(EntryStatus::Notified),
            "SERVED" => Ok(EntryStatus::Served),
            "CANCELLED" => Ok(EntryStatus::Cancelled),
            "NO_SHOW" => Ok(EntryStatus::NoShow),
            other => Err(format!("Unknown entry status: {}", other)),
        }
    }
}

/// How the person wants to be reached when called
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NotificationPreference {
    Sms,
    Email,
    Both,
}

impl std::fmt::Display for NotificationPreference {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NotificationPreference::Sms => write!(f, "SMS"),
            NotificationPreference::Email => write!(f, "EMAIL"),
            NotificationPreference::Both => write!(f, "BOTH"),
        }
    }
}

impl std::str::FromStr for NotificationPreference {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "SMS" => Ok(NotificationPreference::Sms),
            "EMAIL" => Ok(NotificationPreference::Email),
            "BOTH" => Ok(NotificationPreference::Both),
            other => Err(format!("Unknown notification preference: {}", other)),
        }
    }
}

/// Queue Entry Entity
///
/// `position_number` is assigned once at join time and never reassigned.
/// The displayed rank is derived on read by counting active entries at or
/// ahead of this position, so gaps left by cancellations are harmless.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueEntry {
    pub id: EntryId,
    pub queue_id: String,
    pub person_id: String,

    pub position_number: i64,
    pub party_size: i64,
    pub status: EntryStatus,

    pub joined_at: i64, // epoch ms
    pub notified_at: Option<i64>,
    pub served_at: Option<i64>,
    pub arrived_at: Option<i64>,

    pub estimated_wait_minutes: i64,
    pub notification_preference: NotificationPreference,
    pub notes: Option<String>,
}

impl QueueEntry {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: impl Into<String>,
        queue_id: impl Into<String>,
        person_id: impl Into<String>,
        position_number: i64,
        party_size: i64,
        joined_at: i64,
        estimated_wait_minutes: i64,
        notification_preference: NotificationPreference,
    ) -> Self {
        Self {
            id: id.into(),
            queue_id: queue_id.into(),
            person_id: person_id.into(),
            position_number,
            party_size,
            status: EntryStatus::Waiting,
            joined_at,
            notified_at: None,
            served_at: None,
            arrived_at: None,
            estimated_wait_minutes,
            notification_preference,
            notes: None,
        }
    }

    fn invalid(&self, to: EntryStatus) -> crate::domain::error::DomainError {
        crate::domain::error::DomainError::InvalidTransition {
            from: self.status.to_string(),
            to: to.to_string(),
        }
    }

    /// Transition to Notified (called to the front) with explicit timestamp
    pub fn notify(&mut self, now_millis: i64) -> crate::domain::error::Result<()> {
        if self.status != EntryStatus::Waiting {
            return Err(self.invalid(EntryStatus::Notified));
        }
        self.status = EntryStatus::Notified;
        self.notified_at = Some(now_millis);
        Ok(())
    }

    /// Transition to Served. Waiting is also accepted so an operator can
    /// serve a walk-up directly without calling first.
    pub fn serve(&mut self, now_millis: i64) -> crate::domain::error::Result<()> {
        if !matches!(self.status, EntryStatus::Waiting | EntryStatus::Notified) {
            return Err(self.invalid(EntryStatus::Served));
        }
        self.status = EntryStatus::Served;
        self.served_at = Some(now_millis);
        Ok(())
    }

    /// Transition to Cancelled (person leaves the line)
    pub fn cancel(&mut self) -> crate::domain::error::Result<()> {
        if !matches!(self.status, EntryStatus::Waiting | EntryStatus::Notified) {
            return Err(crate::domain::error::DomainError::AlreadyTerminal {
                entry_id: self.id.clone(),
                status: self.status.to_string(),
            });
        }
        self.status = EntryStatus::Cancelled;
        Ok(())
    }

    /// Transition to NoShow (called but never showed up)
    pub fn no_show(&mut self) -> crate::domain::error::Result<()> {
        if self.status != EntryStatus::Notified {
            return Err(self.invalid(EntryStatus::NoShow));
        }
        self.status = EntryStatus::NoShow;
        Ok(())
    }

    /// Annotation only: the person confirmed presence after being called.
    /// Does not change status.
    pub fn mark_arrived(&mut self, now_millis: i64) -> crate::domain::error::Result<()> {
        if self.status != EntryStatus::Notified {
            return Err(crate::domain::error::DomainError::InvalidTransition {
                from: self.status.to_string(),
                to: "ARRIVED".to_string(),
            });
        }
        self.arrived_at = Some(now_millis);
        Ok(())
    }

    /// Minutes spent in line, from join until conclusion
    pub fn wait_minutes(&self, concluded_at: i64) -> i64 {
        ((concluded_at - self.joined_at).max(0)) / 60_000
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry() -> QueueEntry {
        QueueEntry::new(
            "e1",
            "q1",
            "p1",
            1,
            1,
            1_000,
            0,
            NotificationPreference::Sms,
        )
    }

    #[test]
    fn waiting_to_notified_to_served() {
        let mut e = entry();
        e.notify(2_000).unwrap();
        assert_eq!(e.status, EntryStatus::Notified);
        assert_eq!(e.notified_at, Some(2_000));

        e.serve(3_000).unwrap();
        assert_eq!(e.status, EntryStatus::Served);
        assert_eq!(e.served_at, Some(3_000));
    }

    #[test]
    fn serve_directly_from_waiting_is_allowed() {
        let mut e = entry();
        e.serve(2_000).unwrap();
        assert_eq!(e.status, EntryStatus::Served);
    }

    #[test]
    fn no_show_requires_notified() {
        let mut e = entry();
        assert!(e.no_show().is_err());

        e.notify(2_000).unwrap();
        e.no_show().unwrap();
        assert_eq!(e.status, EntryStatus::NoShow);
    }

    #[test]
    fn cancel_from_waiting_and_notified() {
        let mut e = entry();
        e.cancel().unwrap();
        assert_eq!(e.status, EntryStatus::Cancelled);

        let mut e2 = entry();
        e2.notify(2_000).unwrap();
        e2.cancel().unwrap();
        assert_eq!(e2.status, EntryStatus::Cancelled);
    }

    #[test]
    fn terminal_states_reject_further_transitions() {
        let mut e = entry();
        e.serve(2_000).unwrap();

        assert!(e.notify(3_000).is_err());
        assert!(e.serve(3_000).is_err());
        assert!(e.cancel().is_err());
        assert!(e.no_show().is_err());
    }

    #[test]
    fn arrived_is_an_annotation_not_a_transition() {
        let mut e = entry();
        assert!(e.mark_arrived(2_000).is_err());

        e.notify(2_000).unwrap();
        e.mark_arrived(2_500).unwrap();
        assert_eq!(e.status, EntryStatus::Notified);
        assert_eq!(e.arrived_at, Some(2_500));
    }

    #[test]
    fn wait_minutes_floors_at_zero() {
        let e = entry();
        assert_eq!(e.wait_minutes(500), 0);
        assert_eq!(e.wait_minutes(1_000 + 5 * 60_000), 5);
    }
}
