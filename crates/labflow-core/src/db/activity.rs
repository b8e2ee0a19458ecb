//! Activity log database operations (append-only).

use rusqlite::{params, Row};

use super::{Database, DbError, DbResult};
use crate::models::ActivityLogEntry;

impl Database {
    /// Append an activity entry.
    pub fn insert_activity(&self, entry: &ActivityLogEntry) -> DbResult<()> {
        let details_json = serde_json::to_string(&entry.details)?;
        self.conn.execute(
            r#"
            INSERT INTO activity_log (id, case_id, user_id, user_name, action, details, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
            params![
                entry.id,
                entry.case_id,
                entry.user_id,
                entry.user_name,
                entry.action,
                details_json,
                entry.created_at,
            ],
        )?;
        Ok(())
    }

    /// List activity newest first, optionally for one case.
    pub fn list_activity(&self, case_id: Option<&str>, limit: usize) -> DbResult<Vec<ActivityLogEntry>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT id, case_id, user_id, user_name, action, details, created_at
            FROM activity_log
            WHERE ?1 IS NULL OR case_id = ?1
            ORDER BY created_at DESC, rowid DESC
            LIMIT ?2
            "#,
        )?;

        let rows = stmt.query_map(params![case_id, limit as i64], activity_row)?;

        let mut entries = Vec::new();
        for row in rows {
            entries.push(row?.try_into()?);
        }
        Ok(entries)
    }
}

/// Intermediate row struct for database mapping.
struct ActivityRow {
    id: String,
    case_id: Option<String>,
    user_id: String,
    user_name: String,
    action: String,
    details: String,
    created_at: String,
}

fn activity_row(row: &Row<'_>) -> rusqlite::Result<ActivityRow> {
    Ok(ActivityRow {
        id: row.get(0)?,
        case_id: row.get(1)?,
        user_id: row.get(2)?,
        user_name: row.get(3)?,
        action: row.get(4)?,
        details: row.get(5)?,
        created_at: row.get(6)?,
    })
}

impl TryFrom<ActivityRow> for ActivityLogEntry {
    type Error = DbError;

    fn try_from(row: ActivityRow) -> Result<Self, Self::Error> {
        Ok(ActivityLogEntry {
            id: row.id,
            case_id: row.case_id,
            user_id: row.user_id,
            user_name: row.user_name,
            action: row.action,
            details: serde_json::from_str(&row.details)?,
            created_at: row.created_at,
        })
    }
}
