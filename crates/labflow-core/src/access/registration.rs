//! Doctor portal registration.
//!
//! A portal identity may bind to a doctor record only when its email matches
//! exactly and the record is not yet linked. The claim is one-time.

use crate::audit::{record_best_effort, AuditSink};
use crate::db::Database;
use crate::error::{LabError, LabResult};
use crate::models::{ActivityLogEntry, Doctor, Viewer};

/// Whether `email` can be used to register a portal account.
pub fn can_register(db: &Database, email: &str) -> LabResult<bool> {
    let email = email.trim();
    if email.is_empty() {
        return Ok(false);
    }
    Ok(db.doctor_email_claimable(email)?)
}

/// Link `auth_user_id` to the unlinked doctor with this email.
pub fn claim_doctor_account(
    db: &Database,
    audit: &dyn AuditSink,
    email: &str,
    auth_user_id: &str,
) -> LabResult<Doctor> {
    let email = email.trim();
    if email.is_empty() || auth_user_id.trim().is_empty() {
        return Err(LabError::Validation("email and identity are required".into()));
    }

    let doctor = db.claim_doctor_account(email, auth_user_id)?;
    tracing::info!(doctor_id = %doctor.id, auth_user_id, "Doctor portal account linked");

    let actor = Viewer::doctor(auth_user_id, doctor.name.clone(), doctor.id.clone());
    record_best_effort(audit, &ActivityLogEntry::new(None, &actor, "registered for the portal"));

    Ok(doctor)
}
