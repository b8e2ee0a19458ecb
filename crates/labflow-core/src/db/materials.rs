//! Material inventory and case-material ledger operations.
//!
//! `attach_material` and `detach_material` are the two atomic stock
//! procedures: the link row and the stock quantity change commit together
//! or not at all.

use rusqlite::{params, Connection, OptionalExtension, Row};
use rust_decimal::Decimal;

use super::{decimal_from_sql, decimal_to_sql, now_timestamp, Database, DbError, DbResult};
use crate::models::{CaseMaterial, CaseStatus, Material};

const MATERIAL_SELECT: &str = r#"
    SELECT id, name, sku, category, unit, quantity, reorder_level,
           unit_cost, supplier, created_at, updated_at
    FROM materials
"#;

const LINK_SELECT: &str = r#"
    SELECT cm.id, cm.case_id, cm.material_id, cm.quantity_used,
           m.name, m.unit, cm.created_at
    FROM case_materials cm
    LEFT JOIN materials m ON m.id = cm.material_id
"#;

/// Outcome of a stock movement.
#[derive(Debug, Clone, PartialEq)]
pub struct StockMovement {
    /// The link that was created or removed
    pub link: CaseMaterial,
    /// Material quantity after the movement
    pub remaining: Decimal,
}

impl Database {
    /// Insert a new material.
    pub fn insert_material(&self, material: &Material) -> DbResult<()> {
        self.conn.execute(
            r#"
            INSERT INTO materials (
                id, name, sku, category, unit, quantity, reorder_level,
                unit_cost, supplier, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
            "#,
            params![
                material.id,
                material.name,
                material.sku,
                material.category,
                material.unit,
                decimal_to_sql(material.quantity),
                decimal_to_sql(material.reorder_level),
                decimal_to_sql(material.unit_cost),
                material.supplier,
                material.created_at,
                material.updated_at,
            ],
        )?;
        Ok(())
    }

    /// Update a material's catalog fields and stock count.
    pub fn update_material(&self, material: &Material) -> DbResult<bool> {
        let rows_affected = self.conn.execute(
            r#"
            UPDATE materials SET
                name = ?2,
                sku = ?3,
                category = ?4,
                unit = ?5,
                quantity = ?6,
                reorder_level = ?7,
                unit_cost = ?8,
                supplier = ?9,
                updated_at = ?10
            WHERE id = ?1
            "#,
            params![
                material.id,
                material.name,
                material.sku,
                material.category,
                material.unit,
                decimal_to_sql(material.quantity),
                decimal_to_sql(material.reorder_level),
                decimal_to_sql(material.unit_cost),
                material.supplier,
                now_timestamp(),
            ],
        )?;
        Ok(rows_affected > 0)
    }

    /// Get a material by ID.
    pub fn get_material(&self, id: &str) -> DbResult<Option<Material>> {
        read_material(&self.conn, id)
    }

    /// List all materials by name.
    pub fn list_materials(&self) -> DbResult<Vec<Material>> {
        let sql = format!("{} ORDER BY name", MATERIAL_SELECT);
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map([], material_row)?;

        let mut materials = Vec::new();
        for row in rows {
            materials.push(row?.try_into()?);
        }
        Ok(materials)
    }

    /// Delete a material that no case has consumed.
    pub fn delete_material(&self, id: &str) -> DbResult<bool> {
        let links: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM case_materials WHERE material_id = ?",
            [id],
            |row| row.get(0),
        )?;
        if links > 0 {
            return Err(DbError::Constraint(format!(
                "material {} is linked to {} case(s)",
                id, links
            )));
        }

        let rows_affected = self
            .conn
            .execute("DELETE FROM materials WHERE id = ?", [id])?;
        Ok(rows_affected > 0)
    }

    /// List the materials consumed by a case, oldest first.
    pub fn list_case_materials(&self, case_id: &str) -> DbResult<Vec<CaseMaterial>> {
        links_for_case(&self.conn, case_id)
    }

    /// Get a single case-material link.
    pub fn get_case_material(&self, id: &str) -> DbResult<Option<CaseMaterial>> {
        read_link(&self.conn, id)
    }

    /// Record consumption and take it out of stock in one transaction.
    ///
    /// Shipped cases accept no new consumption. With `allow_negative == false`
    /// the transaction is rolled back when stock would drop below zero.
    pub fn attach_material(
        &self,
        case_id: &str,
        material_id: &str,
        quantity: Decimal,
        allow_negative: bool,
    ) -> DbResult<StockMovement> {
        let tx = self.immediate()?;

        let status: String = tx
            .query_row("SELECT status FROM cases WHERE id = ?", [case_id], |row| row.get(0))
            .optional()?
            .ok_or_else(|| DbError::NotFound(format!("case {}", case_id)))?;
        if status == CaseStatus::Shipped.as_str() {
            return Err(DbError::Constraint(format!(
                "case {} has shipped; its materials are closed",
                case_id
            )));
        }

        let material = read_material(&tx, material_id)?
            .ok_or_else(|| DbError::NotFound(format!("material {}", material_id)))?;
        let remaining = material.quantity - quantity;
        if !allow_negative && remaining.is_sign_negative() && !remaining.is_zero() {
            return Err(DbError::Constraint(format!(
                "insufficient stock for {}: {} on hand, {} requested",
                material.name, material.quantity, quantity
            )));
        }

        let id = uuid::Uuid::new_v4().to_string();
        tx.execute(
            r#"
            INSERT INTO case_materials (id, case_id, material_id, quantity_used, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
            params![id, case_id, material_id, decimal_to_sql(quantity), now_timestamp()],
        )?;
        write_quantity(&tx, material_id, remaining)?;

        let link = read_link(&tx, &id)?
            .ok_or_else(|| DbError::NotFound(format!("case material {}", id)))?;
        tx.commit()?;

        Ok(StockMovement { link, remaining })
    }

    /// Remove a link and return its exact quantity to stock in one
    /// transaction. A missing link yields `None` and changes nothing.
    pub fn detach_material(&self, case_material_id: &str) -> DbResult<Option<StockMovement>> {
        let tx = self.immediate()?;

        let Some(link) = read_link(&tx, case_material_id)? else {
            return Ok(None);
        };

        let remaining = adjust_stock(&tx, &link.material_id, link.quantity_used)?;
        tx.execute("DELETE FROM case_materials WHERE id = ?", [case_material_id])?;
        tx.commit()?;

        Ok(Some(StockMovement { link, remaining }))
    }
}

/// Add `delta` to a material's stock; returns the new quantity.
pub(crate) fn adjust_stock(conn: &Connection, material_id: &str, delta: Decimal) -> DbResult<Decimal> {
    let material = read_material(conn, material_id)?
        .ok_or_else(|| DbError::NotFound(format!("material {}", material_id)))?;
    let quantity = material.quantity + delta;
    write_quantity(conn, material_id, quantity)?;
    Ok(quantity)
}

pub(crate) fn links_for_case(conn: &Connection, case_id: &str) -> DbResult<Vec<CaseMaterial>> {
    let sql = format!("{} WHERE cm.case_id = ? ORDER BY cm.created_at ASC", LINK_SELECT);
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map([case_id], link_row)?;

    let mut links = Vec::new();
    for row in rows {
        links.push(row?.try_into()?);
    }
    Ok(links)
}

fn write_quantity(conn: &Connection, material_id: &str, quantity: Decimal) -> DbResult<()> {
    conn.execute(
        "UPDATE materials SET quantity = ?2, updated_at = ?3 WHERE id = ?1",
        params![material_id, decimal_to_sql(quantity), now_timestamp()],
    )?;
    Ok(())
}

fn read_material(conn: &Connection, id: &str) -> DbResult<Option<Material>> {
    let sql = format!("{} WHERE id = ?", MATERIAL_SELECT);
    conn.query_row(&sql, [id], material_row)
        .optional()?
        .map(Material::try_from)
        .transpose()
}

fn read_link(conn: &Connection, id: &str) -> DbResult<Option<CaseMaterial>> {
    let sql = format!("{} WHERE cm.id = ?", LINK_SELECT);
    conn.query_row(&sql, [id], link_row)
        .optional()?
        .map(CaseMaterial::try_from)
        .transpose()
}

/// Intermediate row struct for database mapping.
struct MaterialRow {
    id: String,
    name: String,
    sku: String,
    category: String,
    unit: String,
    quantity: String,
    reorder_level: String,
    unit_cost: String,
    supplier: String,
    created_at: String,
    updated_at: String,
}

fn material_row(row: &Row<'_>) -> rusqlite::Result<MaterialRow> {
    Ok(MaterialRow {
        id: row.get(0)?,
        name: row.get(1)?,
        sku: row.get(2)?,
        category: row.get(3)?,
        unit: row.get(4)?,
        quantity: row.get(5)?,
        reorder_level: row.get(6)?,
        unit_cost: row.get(7)?,
        supplier: row.get(8)?,
        created_at: row.get(9)?,
        updated_at: row.get(10)?,
    })
}

impl TryFrom<MaterialRow> for Material {
    type Error = DbError;

    fn try_from(row: MaterialRow) -> Result<Self, Self::Error> {
        Ok(Material {
            quantity: decimal_from_sql("materials.quantity", &row.quantity)?,
            reorder_level: decimal_from_sql("materials.reorder_level", &row.reorder_level)?,
            unit_cost: decimal_from_sql("materials.unit_cost", &row.unit_cost)?,
            id: row.id,
            name: row.name,
            sku: row.sku,
            category: row.category,
            unit: row.unit,
            supplier: row.supplier,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

struct LinkRow {
    id: String,
    case_id: String,
    material_id: String,
    quantity_used: String,
    material_name: Option<String>,
    material_unit: Option<String>,
    created_at: String,
}

fn link_row(row: &Row<'_>) -> rusqlite::Result<LinkRow> {
    Ok(LinkRow {
        id: row.get(0)?,
        case_id: row.get(1)?,
        material_id: row.get(2)?,
        quantity_used: row.get(3)?,
        material_name: row.get(4)?,
        material_unit: row.get(5)?,
        created_at: row.get(6)?,
    })
}

impl TryFrom<LinkRow> for CaseMaterial {
    type Error = DbError;

    fn try_from(row: LinkRow) -> Result<Self, Self::Error> {
        Ok(CaseMaterial {
            quantity_used: decimal_from_sql("case_materials.quantity_used", &row.quantity_used)?,
            id: row.id,
            case_id: row.case_id,
            material_id: row.material_id,
            material_name: row.material_name,
            material_unit: row.material_unit,
            created_at: row.created_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Doctor, NewCase};

    fn setup_db() -> (Database, String, Material) {
        let db = Database::open_in_memory().unwrap();
        let doctor = Doctor::new("Dr. Patel".into(), "Smile Dental".into());
        db.insert_doctor(&doctor).unwrap();
        let case = db
            .insert_case(
                &NewCase::new(
                    "Jane Roe".into(),
                    doctor.id.clone(),
                    "E.max Crown".into(),
                    "2025-03-01".into(),
                ),
                "A2",
            )
            .unwrap();

        let mut material = Material::new("E.max Ingot".into(), "pcs".into());
        material.sku = "EMX-LT-A2".into();
        material.quantity = Decimal::new(10, 0);
        db.insert_material(&material).unwrap();

        (db, case.id, material)
    }

    #[test]
    fn test_insert_and_get_material() {
        let (db, _, material) = setup_db();
        let retrieved = db.get_material(&material.id).unwrap().unwrap();
        assert_eq!(retrieved.sku, "EMX-LT-A2");
        assert_eq!(retrieved.quantity, Decimal::new(10, 0));
        assert_eq!(db.list_materials().unwrap().len(), 1);
    }

    #[test]
    fn test_attach_decrements_stock() {
        let (db, case_id, material) = setup_db();

        let movement = db
            .attach_material(&case_id, &material.id, Decimal::new(25, 1), true)
            .unwrap();
        assert_eq!(movement.remaining, Decimal::new(75, 1));
        assert_eq!(movement.link.material_name.as_deref(), Some("E.max Ingot"));

        let stored = db.get_material(&material.id).unwrap().unwrap();
        assert_eq!(stored.quantity, Decimal::new(75, 1));
        assert_eq!(db.list_case_materials(&case_id).unwrap().len(), 1);
    }

    #[test]
    fn test_detach_restores_exact_quantity() {
        let (db, case_id, material) = setup_db();

        let movement = db
            .attach_material(&case_id, &material.id, Decimal::new(333, 2), true)
            .unwrap();
        let restored = db.detach_material(&movement.link.id).unwrap().unwrap();
        assert_eq!(restored.remaining, Decimal::new(10, 0));
        assert!(db.list_case_materials(&case_id).unwrap().is_empty());
    }

    #[test]
    fn test_detach_missing_is_noop() {
        let (db, _, material) = setup_db();
        assert!(db.detach_material("missing").unwrap().is_none());
        assert_eq!(
            db.get_material(&material.id).unwrap().unwrap().quantity,
            Decimal::new(10, 0)
        );
    }

    #[test]
    fn test_attach_rejects_overdraw_when_strict() {
        let (db, case_id, material) = setup_db();

        let result = db.attach_material(&case_id, &material.id, Decimal::new(11, 0), false);
        assert!(matches!(result, Err(DbError::Constraint(_))));

        // Rolled back: no link, stock untouched
        assert!(db.list_case_materials(&case_id).unwrap().is_empty());
        assert_eq!(
            db.get_material(&material.id).unwrap().unwrap().quantity,
            Decimal::new(10, 0)
        );

        // Exactly draining stock is fine
        let movement = db
            .attach_material(&case_id, &material.id, Decimal::new(10, 0), false)
            .unwrap();
        assert!(movement.remaining.is_zero());
    }

    #[test]
    fn test_attach_allows_overdraw_when_permissive() {
        let (db, case_id, material) = setup_db();
        let movement = db
            .attach_material(&case_id, &material.id, Decimal::new(12, 0), true)
            .unwrap();
        assert_eq!(movement.remaining, Decimal::new(-2, 0));
    }

    #[test]
    fn test_attach_unknown_ids() {
        let (db, case_id, material) = setup_db();
        assert!(matches!(
            db.attach_material("missing", &material.id, Decimal::ONE, true),
            Err(DbError::NotFound(_))
        ));
        assert!(matches!(
            db.attach_material(&case_id, "missing", Decimal::ONE, true),
            Err(DbError::NotFound(_))
        ));
    }

    #[test]
    fn test_delete_linked_material_fails() {
        let (db, case_id, material) = setup_db();
        db.attach_material(&case_id, &material.id, Decimal::ONE, true)
            .unwrap();
        assert!(matches!(
            db.delete_material(&material.id),
            Err(DbError::Constraint(_))
        ));
    }
}
