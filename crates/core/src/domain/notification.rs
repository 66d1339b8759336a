// Notification Record - persisted outcome of every outbound notification
// attempt, independent of whether the underlying channel succeeded.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NotificationKind {
    /// It's your turn
    Called,
    /// You moved up in line
    PositionUpdate,
}

impl std::fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NotificationKind::Called => write!(f, "CALLED"),
            NotificationKind::PositionUpdate => write!(f, "POSITION_UPDATE"),
        }
    }
}

impl std::str::FromStr for NotificationKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "CALLED" => Ok(NotificationKind::Called),
            "POSITION_UPDATE" => Ok(NotificationKind::PositionUpdate),
            other => Err(format!("Unknown notification kind: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NotificationChannel {
    Sms,
    Email,
}

impl std::fmt::Display for NotificationChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NotificationChannel::Sms => write!(f, "SMS"),
            NotificationChannel::Email => write!(f, "EMAIL"),
        }
    }
}

impl std::str::FromStr for NotificationChannel {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "SMS" => Ok(NotificationChannel::Sms),
            "EMAIL" => Ok(NotificationChannel::Email),
            other => Err(format!("Unknown notification channel: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NotificationStatus {
    Pending,
    Sent,
    Failed,
    /// No usable contact info for the person
    Skipped,
}

impl std::fmt::Display for NotificationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NotificationStatus::Pending => write!(f, "PENDING"),
            NotificationStatus::Sent => write!(f, "SENT"),
            NotificationStatus::Failed => write!(f, "FAILED"),
            NotificationStatus::Skipped => write!(f, "SKIPPED"),
        }
    }
}

impl std::str::FromStr for NotificationStatus {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(NotificationStatus::Pending),
            "SENT" => Ok(NotificationStatus::Sent),
            "FAILED" => Ok(NotificationStatus::Failed),
            "SKIPPED" => Ok(NotificationStatus::Skipped),
            other => Err(format!("Unknown notification status: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationRecord {
    pub id: String,
    pub entry_id: String,
    pub person_id: String,
    pub kind: NotificationKind,
    pub channel: Option<NotificationChannel>,
    pub message: String,
    pub status: NotificationStatus,
    pub created_at: i64, // epoch ms
    pub sent_at: Option<i64>,
}

impl NotificationRecord {
    pub fn pending(
        id: impl Into<String>,
        entry_id: impl Into<String>,
        person_id: impl Into<String>,
        kind: NotificationKind,
        channel: Option<NotificationChannel>,
        message: impl Into<String>,
        now_millis: i64,
    ) -> Self {
        Self {
            id: id.into(),
            entry_id: entry_id.into(),
            person_id: person_id.into(),
            kind,
            channel,
            message: message.into(),
            status: NotificationStatus::Pending,
            created_at: now_millis,
            sent_at: None,
        }
    }
}
