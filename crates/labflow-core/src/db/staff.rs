//! Lab staff directory operations.

use rusqlite::{params, OptionalExtension};

use super::{Database, DbError, DbResult};
use crate::models::{Role, StaffMember};

impl Database {
    /// Add or update a lab staff member.
    pub fn insert_staff(&self, user_id: &str, display_name: &str, role: Role) -> DbResult<()> {
        if !role.is_lab_staff() {
            return Err(DbError::Constraint(format!(
                "{} is not a lab staff role",
                role
            )));
        }

        self.conn.execute(
            r#"
            INSERT INTO lab_staff (user_id, display_name, role)
            VALUES (?1, ?2, ?3)
            ON CONFLICT(user_id) DO UPDATE SET
                display_name = excluded.display_name,
                role = excluded.role
            "#,
            params![user_id, display_name, role.as_str()],
        )?;
        Ok(())
    }

    /// Add the first lab admin. Does nothing and returns `false` once any
    /// staff member exists.
    pub fn bootstrap_admin(&self, user_id: &str, display_name: &str) -> DbResult<bool> {
        let tx = self.immediate()?;
        let staff_count: i64 = tx.query_row("SELECT COUNT(*) FROM lab_staff", [], |row| row.get(0))?;
        if staff_count > 0 {
            return Ok(false);
        }

        tx.execute(
            "INSERT INTO lab_staff (user_id, display_name, role) VALUES (?1, ?2, ?3)",
            params![user_id, display_name, Role::Admin.as_str()],
        )?;
        tx.commit()?;
        Ok(true)
    }

    /// Get a staff member by identity.
    pub fn get_staff(&self, user_id: &str) -> DbResult<Option<StaffMember>> {
        let row: Option<(String, String, String)> = self
            .conn
            .query_row(
                "SELECT user_id, display_name, role FROM lab_staff WHERE user_id = ?",
                [user_id],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )
            .optional()?;

        row.map(|(user_id, display_name, role)| {
            let role = Role::from_str(&role)
                .ok_or_else(|| DbError::Corrupt(format!("unknown staff role: {}", role)))?;
            Ok(StaffMember {
                user_id,
                display_name,
                role,
            })
        })
        .transpose()
    }
}
