// Person Domain Model

use serde::{Deserialize, Serialize};

/// Person ID (UUID v4)
pub type PersonId = String;

/// A queue owner, a registered customer, or an ephemeral guest.
///
/// Guest records are created on first guest join with a synthetic email and
/// become eligible for removal once they hold no Waiting/Notified entries.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Person {
    pub id: PersonId,
    pub email: String,
    pub phone: Option<String>,
    pub first_name: String,
    pub last_name: String,
    pub is_guest: bool,
    pub created_at: i64, // epoch ms
}

impl Person {
    pub fn new(
        id: impl Into<String>,
        email: impl Into<String>,
        phone: Option<String>,
        first_name: impl Into<String>,
        last_name: impl Into<String>,
        is_guest: bool,
        created_at: i64,
    ) -> Self {
        Self {
            id: id.into(),
            email: email.into(),
            phone,
            first_name: first_name.into(),
            last_name: last_name.into(),
            is_guest,
            created_at,
        }
    }

    /// Synthetic address for guests who gave no email
    pub fn synthetic_email(token: &str) -> String {
        format!("guest_{}@waitline.local", token)
    }

    pub fn has_synthetic_email(&self) -> bool {
        self.email.starts_with("guest_") && self.email.ends_with("@waitline.local")
    }

    pub fn display_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn synthetic_email_round_trip() {
        let p = Person::new(
            "p1",
            Person::synthetic_email("abc123"),
            None,
            "Ada",
            "Lovelace",
            true,
            1_000,
        );
        assert!(p.has_synthetic_email());

        let q = Person::new("p2", "ada@example.com", None, "Ada", "L", false, 1_000);
        assert!(!q.has_synthetic_email());
    }
}
