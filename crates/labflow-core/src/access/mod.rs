//! Access control: who the caller is, what they may do, and what they see.
//!
//! ```text
//! user_id ──resolve_viewer──▶ Viewer ──┬─ require_* guards (mutations)
//!                                      └─ get_case_for / list_cases_for
//!                                             │  row scope in SQL
//!                                             ▼
//!                                        project_case (field cut)
//! ```

mod listing;
mod projection;
mod registration;
mod viewer;

pub use listing::*;
pub use projection::*;
pub use registration::*;
pub use viewer::*;

use crate::error::{LabError, LabResult};
use crate::models::{Role, Viewer};

/// Fail unless the viewer is lab staff (admin or tech).
pub fn require_lab_staff(viewer: &Viewer, action: &str) -> LabResult<()> {
    if viewer.role.is_lab_staff() {
        Ok(())
    } else {
        Err(denied(viewer, action))
    }
}

/// Fail unless the viewer is a lab admin.
pub fn require_admin(viewer: &Viewer, action: &str) -> LabResult<()> {
    if viewer.role == Role::Admin {
        Ok(())
    } else {
        Err(denied(viewer, action))
    }
}

fn denied(viewer: &Viewer, action: &str) -> LabError {
    tracing::warn!(user_id = %viewer.user_id, role = %viewer.role, action, "Authorization denied");
    LabError::InsufficientAuthorization(format!("{} may not {}", viewer.role, action))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_guards() {
        let admin = Viewer::admin("u1", "Alex");
        let tech = Viewer::tech("u2", "Sam");
        let doctor = Viewer::doctor("u3", "Dr. Patel", "doc-1");

        assert!(require_lab_staff(&admin, "edit cases").is_ok());
        assert!(require_lab_staff(&tech, "edit cases").is_ok());
        assert!(matches!(
            require_lab_staff(&doctor, "edit cases"),
            Err(LabError::InsufficientAuthorization(_))
        ));

        assert!(require_admin(&admin, "invoice cases").is_ok());
        assert!(require_admin(&tech, "invoice cases").is_err());
        assert!(require_admin(&doctor, "invoice cases").is_err());
    }
}
