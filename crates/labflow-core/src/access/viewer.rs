//! Authoritative viewer resolution.

use crate::db::Database;
use crate::error::{LabError, LabResult};
use crate::models::Viewer;

/// Resolve the identity behind a request from the store.
///
/// Lab staff take precedence over a linked doctor record. An identity that
/// is neither is refused.
pub fn resolve_viewer(db: &Database, user_id: &str) -> LabResult<Viewer> {
    if let Some(staff) = db.get_staff(user_id)? {
        return Ok(Viewer {
            user_id: staff.user_id,
            display_name: staff.display_name,
            role: staff.role,
            doctor_id: None,
        });
    }

    if let Some(doctor) = db.get_doctor_by_auth_user(user_id)? {
        return Ok(Viewer::doctor(user_id, doctor.name, doctor.id));
    }

    tracing::warn!(user_id, "Unknown identity");
    Err(LabError::InsufficientAuthorization(format!(
        "identity {} has no lab or portal access",
        user_id
    )))
}
