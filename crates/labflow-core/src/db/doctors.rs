//! Doctor database operations.

use rusqlite::{params, OptionalExtension, Row};

use super::{Database, DbError, DbResult};
use crate::models::Doctor;

const DOCTOR_SELECT: &str = r#"
    SELECT id, name, practice, email, phone, auth_user_id, created_at
    FROM doctors
"#;

impl Database {
    /// Insert a new doctor.
    pub fn insert_doctor(&self, doctor: &Doctor) -> DbResult<()> {
        self.conn.execute(
            r#"
            INSERT INTO doctors (id, name, practice, email, phone, auth_user_id, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
            params![
                doctor.id,
                doctor.name,
                doctor.practice,
                doctor.email,
                doctor.phone,
                doctor.auth_user_id,
                doctor.created_at,
            ],
        )?;
        Ok(())
    }

    /// Update contact details. The portal link is only set by
    /// [`Database::claim_doctor_account`].
    pub fn update_doctor(&self, doctor: &Doctor) -> DbResult<bool> {
        let rows_affected = self.conn.execute(
            r#"
            UPDATE doctors SET
                name = ?2,
                practice = ?3,
                email = ?4,
                phone = ?5
            WHERE id = ?1
            "#,
            params![doctor.id, doctor.name, doctor.practice, doctor.email, doctor.phone],
        )?;
        Ok(rows_affected > 0)
    }

    /// Get a doctor by ID.
    pub fn get_doctor(&self, id: &str) -> DbResult<Option<Doctor>> {
        let sql = format!("{} WHERE id = ?", DOCTOR_SELECT);
        self.conn
            .query_row(&sql, [id], doctor_row)
            .optional()
            .map_err(Into::into)
    }

    /// Get the doctor linked to a portal identity.
    pub fn get_doctor_by_auth_user(&self, auth_user_id: &str) -> DbResult<Option<Doctor>> {
        let sql = format!("{} WHERE auth_user_id = ?", DOCTOR_SELECT);
        self.conn
            .query_row(&sql, [auth_user_id], doctor_row)
            .optional()
            .map_err(Into::into)
    }

    /// List all doctors by name.
    pub fn list_doctors(&self) -> DbResult<Vec<Doctor>> {
        let sql = format!("{} ORDER BY name", DOCTOR_SELECT);
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map([], doctor_row)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    /// Delete a doctor with no cases.
    pub fn delete_doctor(&self, id: &str) -> DbResult<bool> {
        let case_count = self.count_cases_for_doctor(id)?;
        if case_count > 0 {
            return Err(DbError::Constraint(format!(
                "doctor {} has {} linked case(s); reassign or remove them first",
                id, case_count
            )));
        }

        let rows_affected = self.conn.execute("DELETE FROM doctors WHERE id = ?", [id])?;
        Ok(rows_affected > 0)
    }

    /// Whether an unlinked doctor record exists for this exact email.
    pub fn doctor_email_claimable(&self, email: &str) -> DbResult<bool> {
        Ok(self
            .conn
            .query_row(
                "SELECT 1 FROM doctors WHERE email = ? AND auth_user_id IS NULL",
                [email],
                |_| Ok(()),
            )
            .optional()?
            .is_some())
    }

    /// Link a portal identity to the oldest unlinked doctor record with this
    /// exact email.
    ///
    /// One-time claim: when every record with the email is already linked, or
    /// the identity already owns a doctor record, the claim is rejected.
    pub fn claim_doctor_account(&self, email: &str, auth_user_id: &str) -> DbResult<Doctor> {
        let tx = self.immediate()?;

        let sql = format!(
            "{} WHERE email = ? AND auth_user_id IS NULL ORDER BY created_at, rowid LIMIT 1",
            DOCTOR_SELECT
        );
        let unlinked = tx.query_row(&sql, [email], doctor_row).optional()?;
        let doctor = match unlinked {
            Some(doctor) => doctor,
            None => {
                let linked: i64 = tx.query_row(
                    "SELECT COUNT(*) FROM doctors WHERE email = ?",
                    [email],
                    |row| row.get(0),
                )?;
                return Err(if linked > 0 {
                    DbError::Constraint(format!(
                        "every doctor with email {} is already linked to a portal account",
                        email
                    ))
                } else {
                    DbError::NotFound(format!("doctor with email {}", email))
                });
            }
        };

        let owner: Option<String> = tx
            .query_row(
                "SELECT id FROM doctors WHERE auth_user_id = ?",
                [auth_user_id],
                |row| row.get(0),
            )
            .optional()?;
        if let Some(owner) = owner {
            return Err(DbError::Constraint(format!(
                "identity {} is already linked to doctor {}",
                auth_user_id, owner
            )));
        }

        tx.execute(
            "UPDATE doctors SET auth_user_id = ?2 WHERE id = ?1 AND auth_user_id IS NULL",
            params![doctor.id, auth_user_id],
        )?;
        tx.commit()?;

        Ok(Doctor {
            auth_user_id: Some(auth_user_id.to_string()),
            ..doctor
        })
    }
}

fn doctor_row(row: &Row<'_>) -> rusqlite::Result<Doctor> {
    Ok(Doctor {
        id: row.get(0)?,
        name: row.get(1)?,
        practice: row.get(2)?,
        email: row.get(3)?,
        phone: row.get(4)?,
        auth_user_id: row.get(5)?,
        created_at: row.get(6)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NewCase;

    fn setup_db() -> Database {
        Database::open_in_memory().unwrap()
    }

    #[test]
    fn test_insert_and_get() {
        let db = setup_db();
        let mut doctor = Doctor::new("Dr. Patel".into(), "Smile Dental".into());
        doctor.phone = Some("555-0100".into());
        db.insert_doctor(&doctor).unwrap();

        let retrieved = db.get_doctor(&doctor.id).unwrap().unwrap();
        assert_eq!(retrieved, doctor);
    }

    #[test]
    fn test_update_doctor() {
        let db = setup_db();
        let mut doctor = Doctor::new("Dr. Patel".into(), "Smile Dental".into());
        db.insert_doctor(&doctor).unwrap();

        doctor.practice = "Bright Smile Dental".into();
        assert!(db.update_doctor(&doctor).unwrap());
        assert_eq!(
            db.get_doctor(&doctor.id).unwrap().unwrap().practice,
            "Bright Smile Dental"
        );
    }

    #[test]
    fn test_list_doctors_sorted() {
        let db = setup_db();
        db.insert_doctor(&Doctor::new("Dr. Young".into(), "Y".into())).unwrap();
        db.insert_doctor(&Doctor::new("Dr. Adams".into(), "A".into())).unwrap();

        let names: Vec<String> = db.list_doctors().unwrap().into_iter().map(|d| d.name).collect();
        assert_eq!(names, vec!["Dr. Adams", "Dr. Young"]);
    }

    #[test]
    fn test_delete_doctor_with_cases_fails() {
        let db = setup_db();
        let doctor = Doctor::new("Dr. Patel".into(), "Smile Dental".into());
        db.insert_doctor(&doctor).unwrap();
        db.insert_case(
            &NewCase::new("Jane".into(), doctor.id.clone(), "Night Guard".into(), "2025-03-01".into()),
            "A2",
        )
        .unwrap();

        assert!(matches!(db.delete_doctor(&doctor.id), Err(DbError::Constraint(_))));
        assert!(db.get_doctor(&doctor.id).unwrap().is_some());
    }

    #[test]
    fn test_delete_doctor_without_cases() {
        let db = setup_db();
        let doctor = Doctor::new("Dr. Patel".into(), "Smile Dental".into());
        db.insert_doctor(&doctor).unwrap();
        assert!(db.delete_doctor(&doctor.id).unwrap());
        assert!(db.get_doctor(&doctor.id).unwrap().is_none());
    }

    #[test]
    fn test_claim_doctor_account_once() {
        let db = setup_db();
        let doctor = Doctor::new("Dr. Patel".into(), "Smile Dental".into())
            .with_email("patel@smile.example");
        db.insert_doctor(&doctor).unwrap();

        assert!(db.doctor_email_claimable("patel@smile.example").unwrap());
        let linked = db.claim_doctor_account("patel@smile.example", "auth-1").unwrap();
        assert_eq!(linked.auth_user_id.as_deref(), Some("auth-1"));
        assert!(!db.doctor_email_claimable("patel@smile.example").unwrap());

        let by_auth = db.get_doctor_by_auth_user("auth-1").unwrap().unwrap();
        assert_eq!(by_auth.id, doctor.id);

        let second = db.claim_doctor_account("patel@smile.example", "auth-2");
        assert!(matches!(second, Err(DbError::Constraint(_))));
    }

    #[test]
    fn test_claim_skips_linked_doctor_sharing_email() {
        let db = setup_db();
        let first = Doctor::new("Dr. A".into(), "Front Street".into())
            .with_email("front@practice.test");
        let second = Doctor::new("Dr. B".into(), "Front Street".into())
            .with_email("front@practice.test");
        db.insert_doctor(&first).unwrap();
        db.insert_doctor(&second).unwrap();

        let a = db.claim_doctor_account("front@practice.test", "auth-a").unwrap();
        assert!(db.doctor_email_claimable("front@practice.test").unwrap());

        let b = db.claim_doctor_account("front@practice.test", "auth-b").unwrap();
        assert_ne!(a.id, b.id);
        assert_eq!(b.auth_user_id.as_deref(), Some("auth-b"));

        assert!(!db.doctor_email_claimable("front@practice.test").unwrap());
        let third = db.claim_doctor_account("front@practice.test", "auth-c");
        assert!(matches!(third, Err(DbError::Constraint(_))));
    }

    #[test]
    fn test_claim_requires_exact_email() {
        let db = setup_db();
        let doctor = Doctor::new("Dr. Patel".into(), "Smile Dental".into())
            .with_email("patel@smile.example");
        db.insert_doctor(&doctor).unwrap();

        let result = db.claim_doctor_account("PATEL@smile.example", "auth-1");
        assert!(matches!(result, Err(DbError::NotFound(_))));
    }

    #[test]
    fn test_identity_cannot_claim_two_doctors() {
        let db = setup_db();
        db.insert_doctor(&Doctor::new("Dr. A".into(), "A".into()).with_email("a@example.com"))
            .unwrap();
        db.insert_doctor(&Doctor::new("Dr. B".into(), "B".into()).with_email("b@example.com"))
            .unwrap();

        db.claim_doctor_account("a@example.com", "auth-1").unwrap();
        let result = db.claim_doctor_account("b@example.com", "auth-1");
        assert!(matches!(result, Err(DbError::Constraint(_))));
    }
}
