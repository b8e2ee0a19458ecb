//! Referring doctor models.

use serde::{Deserialize, Serialize};

/// A referring practice contact.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Doctor {
    /// Local UUID
    pub id: String,
    /// Doctor name
    pub name: String,
    /// Practice name
    pub practice: String,
    /// Contact email; the portal claim matches on this
    pub email: Option<String>,
    /// Contact phone
    pub phone: Option<String>,
    /// Linked portal identity - null until the doctor claims the record
    pub auth_user_id: Option<String>,
    /// Creation timestamp
    pub created_at: String,
}

impl Doctor {
    /// Create a new doctor with required fields.
    pub fn new(name: String, practice: String) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            name,
            practice,
            email: None,
            phone: None,
            auth_user_id: None,
            created_at: chrono::Utc::now().to_rfc3339(),
        }
    }

    /// Builder-style email setter.
    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    /// Whether a portal account is linked.
    pub fn is_linked(&self) -> bool {
        self.auth_user_id.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_doctor() {
        let doctor = Doctor::new("Dr. Patel".into(), "Smile Dental".into());
        assert_eq!(doctor.name, "Dr. Patel");
        assert!(!doctor.is_linked());
        assert_eq!(doctor.id.len(), 36);
    }

    #[test]
    fn test_with_email() {
        let doctor = Doctor::new("Dr. Patel".into(), "Smile Dental".into())
            .with_email("patel@smile.example");
        assert_eq!(doctor.email.as_deref(), Some("patel@smile.example"));
    }
}
