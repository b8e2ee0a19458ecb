//! Activity log models.

use serde::{Deserialize, Serialize};

use super::Viewer;

/// An append-only audit record.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ActivityLogEntry {
    /// Local UUID
    pub id: String,
    /// Related case, if any
    pub case_id: Option<String>,
    /// Acting user
    pub user_id: String,
    /// Acting user's display name at the time of the action
    pub user_name: String,
    /// Human-readable action (e.g. "moved case from ready to shipped")
    pub action: String,
    /// Structured extras
    pub details: serde_json::Value,
    /// Timestamp
    pub created_at: String,
}

impl ActivityLogEntry {
    /// Create an entry for an action taken by `actor`.
    pub fn new(case_id: Option<&str>, actor: &Viewer, action: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            case_id: case_id.map(str::to_string),
            user_id: actor.user_id.clone(),
            user_name: actor.display_name.clone(),
            action: action.into(),
            details: serde_json::Value::Object(Default::default()),
            created_at: chrono::Utc::now().to_rfc3339(),
        }
    }

    /// Attach structured details.
    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = details;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_entry() {
        let actor = Viewer::admin("user-1", "Alex");
        let entry = ActivityLogEntry::new(Some("case-1"), &actor, "marked as invoiced");
        assert_eq!(entry.case_id.as_deref(), Some("case-1"));
        assert_eq!(entry.user_name, "Alex");
        assert_eq!(entry.details, serde_json::json!({}));
    }
}
