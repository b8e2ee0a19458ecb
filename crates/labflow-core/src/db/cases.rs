//! Case database operations.

use rusqlite::{params, Connection, OptionalExtension, Row};

use super::{decimal_from_sql, decimal_to_sql, now_timestamp, Database, DbError, DbResult};
use crate::models::{format_case_number, Case, CaseEdit, CaseMaterial, CaseStatus, NewCase};

const CASE_SELECT: &str = r#"
    SELECT c.id, c.case_number, c.patient, c.doctor_id, d.name,
           c.restoration_type, c.shade, c.due, c.rush, c.notes,
           c.price, c.invoiced, c.status, c.shipping_carrier,
           c.tracking_number, c.shipped_at, c.created_at, c.updated_at
    FROM cases c
    LEFT JOIN doctors d ON d.id = c.doctor_id
"#;

impl Database {
    /// Insert a new case with status `received` and the next case number.
    ///
    /// Numbering and insert share one transaction, so concurrent creates
    /// never receive the same number.
    pub fn insert_case(&self, new_case: &NewCase, shade: &str) -> DbResult<Case> {
        let tx = self.immediate()?;

        if !doctor_exists(&tx, &new_case.doctor_id)? {
            return Err(DbError::NotFound(format!("doctor {}", new_case.doctor_id)));
        }

        tx.execute(
            "UPDATE case_sequence SET last_value = last_value + 1 WHERE id = 1",
            [],
        )?;
        let sequence: i64 =
            tx.query_row("SELECT last_value FROM case_sequence WHERE id = 1", [], |row| {
                row.get(0)
            })?;

        let id = uuid::Uuid::new_v4().to_string();
        let now = now_timestamp();
        tx.execute(
            r#"
            INSERT INTO cases (
                id, case_number, patient, doctor_id, restoration_type, shade,
                due, rush, notes, price, invoiced, status, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, 0, ?11, ?12, ?12)
            "#,
            params![
                id,
                format_case_number(sequence),
                new_case.patient,
                new_case.doctor_id,
                new_case.restoration_type,
                shade,
                new_case.due,
                new_case.rush,
                new_case.notes,
                decimal_to_sql(new_case.price),
                CaseStatus::Received.as_str(),
                now,
            ],
        )?;

        let case = read_case(&tx, &id)?
            .ok_or_else(|| DbError::NotFound(format!("case {}", id)))?;
        tx.commit()?;
        Ok(case)
    }

    /// Get a case by ID.
    pub fn get_case(&self, id: &str) -> DbResult<Option<Case>> {
        read_case(&self.conn, id)
    }

    /// Get a case by its human-facing number.
    pub fn get_case_by_number(&self, case_number: &str) -> DbResult<Option<Case>> {
        let sql = format!("{} WHERE c.case_number = ?", CASE_SELECT);
        self.conn
            .query_row(&sql, [case_number], case_row)
            .optional()?
            .map(Case::try_from)
            .transpose()
    }

    /// List all cases, earliest due first.
    pub fn list_cases(&self) -> DbResult<Vec<Case>> {
        let sql = format!("{} ORDER BY c.due ASC, c.case_number ASC", CASE_SELECT);
        self.query_cases(&sql, [])
    }

    /// List the cases referred by one doctor, earliest due first.
    pub fn list_cases_for_doctor(&self, doctor_id: &str) -> DbResult<Vec<Case>> {
        let sql = format!(
            "{} WHERE c.doctor_id = ? ORDER BY c.due ASC, c.case_number ASC",
            CASE_SELECT
        );
        self.query_cases(&sql, [doctor_id])
    }

    /// List shipped cases, most recent shipment first.
    ///
    /// `since` is an RFC 3339 lower bound on `shipped_at`; `doctor_id`
    /// restricts the rows to one doctor.
    pub fn list_shipped_cases(&self, since: Option<&str>, doctor_id: Option<&str>) -> DbResult<Vec<Case>> {
        let sql = format!(
            r#"{} WHERE c.status = 'shipped'
                AND (?1 IS NULL OR c.shipped_at >= ?1)
                AND (?2 IS NULL OR c.doctor_id = ?2)
                ORDER BY c.shipped_at DESC"#,
            CASE_SELECT
        );
        self.query_cases(&sql, params![since, doctor_id])
    }

    /// Number of cases referencing a doctor.
    pub fn count_cases_for_doctor(&self, doctor_id: &str) -> DbResult<i64> {
        Ok(self.conn.query_row(
            "SELECT COUNT(*) FROM cases WHERE doctor_id = ?",
            [doctor_id],
            |row| row.get(0),
        )?)
    }

    /// Apply direct field edits. Status and shipment fields are untouched.
    pub fn update_case_fields(&self, id: &str, edit: &CaseEdit) -> DbResult<bool> {
        let tx = self.immediate()?;

        if !doctor_exists(&tx, &edit.doctor_id)? {
            return Err(DbError::NotFound(format!("doctor {}", edit.doctor_id)));
        }

        let rows_affected = tx.execute(
            r#"
            UPDATE cases SET
                patient = ?2,
                doctor_id = ?3,
                restoration_type = ?4,
                shade = ?5,
                due = ?6,
                rush = ?7,
                notes = ?8,
                price = COALESCE(?9, price),
                updated_at = ?10
            WHERE id = ?1
            "#,
            params![
                id,
                edit.patient,
                edit.doctor_id,
                edit.restoration_type,
                edit.shade,
                edit.due,
                edit.rush,
                edit.notes,
                edit.price.map(decimal_to_sql),
                now_timestamp(),
            ],
        )?;
        tx.commit()?;
        Ok(rows_affected > 0)
    }

    /// Delete a case, returning each linked material to stock first.
    ///
    /// Returns the links that were released, or `None` if no such case.
    pub fn delete_case(&self, id: &str) -> DbResult<Option<Vec<CaseMaterial>>> {
        let tx = self.immediate()?;

        let links = super::materials::links_for_case(&tx, id)?;
        for link in &links {
            super::materials::adjust_stock(&tx, &link.material_id, link.quantity_used)?;
        }
        tx.execute("DELETE FROM case_materials WHERE case_id = ?", [id])?;
        let rows_affected = tx.execute("DELETE FROM cases WHERE id = ?", [id])?;

        tx.commit()?;
        Ok((rows_affected > 0).then_some(links))
    }

    fn query_cases<P: rusqlite::Params>(&self, sql: &str, params: P) -> DbResult<Vec<Case>> {
        let mut stmt = self.conn.prepare(sql)?;
        let rows = stmt.query_map(params, case_row)?;

        let mut cases = Vec::new();
        for row in rows {
            cases.push(row?.try_into()?);
        }
        Ok(cases)
    }
}

/// Read one case on any connection or transaction.
pub(crate) fn read_case(conn: &Connection, id: &str) -> DbResult<Option<Case>> {
    let sql = format!("{} WHERE c.id = ?", CASE_SELECT);
    conn.query_row(&sql, [id], case_row)
        .optional()?
        .map(Case::try_from)
        .transpose()
}

/// Persist the workflow-owned columns of a case: status, shipment fields
/// and the invoiced flag.
pub(crate) fn write_case_state(conn: &Connection, case: &Case) -> DbResult<()> {
    let rows_affected = conn.execute(
        r#"
        UPDATE cases SET
            status = ?2,
            shipping_carrier = ?3,
            tracking_number = ?4,
            shipped_at = ?5,
            invoiced = ?6,
            updated_at = ?7
        WHERE id = ?1
        "#,
        params![
            case.id,
            case.status.as_str(),
            case.shipping_carrier,
            case.tracking_number,
            case.shipped_at,
            case.invoiced,
            case.updated_at,
        ],
    )?;
    if rows_affected == 0 {
        return Err(DbError::NotFound(format!("case {}", case.id)));
    }
    Ok(())
}

fn doctor_exists(conn: &Connection, doctor_id: &str) -> DbResult<bool> {
    Ok(conn
        .query_row("SELECT 1 FROM doctors WHERE id = ?", [doctor_id], |_| Ok(()))
        .optional()?
        .is_some())
}

/// Intermediate row struct for database mapping.
struct CaseRow {
    id: String,
    case_number: String,
    patient: String,
    doctor_id: String,
    doctor_name: Option<String>,
    restoration_type: String,
    shade: String,
    due: String,
    rush: bool,
    notes: Option<String>,
    price: String,
    invoiced: bool,
    status: String,
    shipping_carrier: Option<String>,
    tracking_number: Option<String>,
    shipped_at: Option<String>,
    created_at: String,
    updated_at: String,
}

fn case_row(row: &Row<'_>) -> rusqlite::Result<CaseRow> {
    Ok(CaseRow {
        id: row.get(0)?,
        case_number: row.get(1)?,
        patient: row.get(2)?,
        doctor_id: row.get(3)?,
        doctor_name: row.get(4)?,
        restoration_type: row.get(5)?,
        shade: row.get(6)?,
        due: row.get(7)?,
        rush: row.get(8)?,
        notes: row.get(9)?,
        price: row.get(10)?,
        invoiced: row.get(11)?,
        status: row.get(12)?,
        shipping_carrier: row.get(13)?,
        tracking_number: row.get(14)?,
        shipped_at: row.get(15)?,
        created_at: row.get(16)?,
        updated_at: row.get(17)?,
    })
}

impl TryFrom<CaseRow> for Case {
    type Error = DbError;

    fn try_from(row: CaseRow) -> Result<Self, Self::Error> {
        let status = CaseStatus::from_str(&row.status)
            .ok_or_else(|| DbError::Constraint(format!("Unknown case status: {}", row.status)))?;
        let price = decimal_from_sql("cases.price", &row.price)?;

        Ok(Case {
            id: row.id,
            case_number: row.case_number,
            patient: row.patient,
            doctor_id: row.doctor_id,
            doctor_name: row.doctor_name,
            restoration_type: row.restoration_type,
            shade: row.shade,
            due: row.due,
            rush: row.rush,
            notes: row.notes,
            price,
            invoiced: row.invoiced,
            status,
            shipping_carrier: row.shipping_carrier,
            tracking_number: row.tracking_number,
            shipped_at: row.shipped_at,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}
