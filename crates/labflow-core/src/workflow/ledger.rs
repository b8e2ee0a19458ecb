//! Material ledger and inventory.
//!
//! Consumption is recorded as case-material links. Attaching a link takes its
//! quantity out of stock and detaching returns exactly that quantity; there
//! is no in-place edit, so every stock change is a pair of ledger events.

use rust_decimal::Decimal;
use serde_json::json;

use crate::access::require_lab_staff;
use crate::audit::{record_best_effort, AuditSink};
use crate::config::StockPolicy;
use crate::db::Database;
use crate::error::{LabError, LabResult};
use crate::models::{inventory_value, ActivityLogEntry, CaseMaterial, Material, Viewer};

/// Stock ledger over case-material links.
pub struct MaterialLedger<'a> {
    db: &'a Database,
    audit: &'a dyn AuditSink,
    policy: StockPolicy,
}

impl<'a> MaterialLedger<'a> {
    pub fn new(db: &'a Database, policy: StockPolicy) -> Self {
        Self { db, audit: db, policy }
    }

    pub fn with_audit(db: &'a Database, audit: &'a dyn AuditSink, policy: StockPolicy) -> Self {
        Self { db, audit, policy }
    }

    /// Consume `quantity` of a material for a case.
    pub fn attach(
        &self,
        actor: &Viewer,
        case_id: &str,
        material_id: &str,
        quantity: Decimal,
    ) -> LabResult<CaseMaterial> {
        require_lab_staff(actor, "record material usage")?;

        if quantity <= Decimal::ZERO {
            return Err(LabError::Validation(format!(
                "quantity must be greater than zero, got {}",
                quantity
            )));
        }

        let movement = self
            .db
            .attach_material(case_id, material_id, quantity, self.policy.allows_negative())?;
        let link = movement.link;

        if movement.remaining < Decimal::ZERO {
            tracing::warn!(
                material_id,
                remaining = %movement.remaining,
                "Material stock is negative"
            );
        }
        tracing::info!(
            case_id,
            material_id,
            quantity = %quantity,
            remaining = %movement.remaining,
            "Material attached"
        );

        record_best_effort(
            self.audit,
            &ActivityLogEntry::new(Some(case_id), actor, format!("added material {}", material_label(&link)))
                .with_details(json!({
                    "material_id": link.material_id,
                    "quantity": quantity.to_string(),
                })),
        );

        Ok(link)
    }

    /// Remove a link and return its quantity to stock.
    ///
    /// A link that no longer exists is a successful no-op.
    pub fn detach(&self, actor: &Viewer, case_material_id: &str) -> LabResult<()> {
        require_lab_staff(actor, "record material usage")?;

        let Some(movement) = self.db.detach_material(case_material_id)? else {
            tracing::debug!(case_material_id, "Detach of missing link ignored");
            return Ok(());
        };
        let link = movement.link;

        tracing::info!(
            case_id = %link.case_id,
            material_id = %link.material_id,
            quantity = %link.quantity_used,
            remaining = %movement.remaining,
            "Material detached"
        );

        record_best_effort(
            self.audit,
            &ActivityLogEntry::new(Some(&link.case_id), actor, format!("removed material {}", material_label(&link)))
                .with_details(json!({
                    "material_id": link.material_id,
                    "quantity": link.quantity_used.to_string(),
                })),
        );

        Ok(())
    }

    /// Materials consumed by a case.
    pub fn case_materials(&self, actor: &Viewer, case_id: &str) -> LabResult<Vec<CaseMaterial>> {
        require_lab_staff(actor, "view material usage")?;
        Ok(self.db.list_case_materials(case_id)?)
    }

    pub fn create_material(&self, actor: &Viewer, material: &Material) -> LabResult<()> {
        require_lab_staff(actor, "manage inventory")?;
        validate_material(material)?;
        self.db.insert_material(material)?;
        tracing::info!(material_id = %material.id, name = %material.name, "Material created");
        Ok(())
    }

    pub fn update_material(&self, actor: &Viewer, material: &Material) -> LabResult<Material> {
        require_lab_staff(actor, "manage inventory")?;
        validate_material(material)?;
        if !self.db.update_material(material)? {
            return Err(LabError::NotFound(format!("material {}", material.id)));
        }
        self.get_material(actor, &material.id)
    }

    pub fn get_material(&self, actor: &Viewer, id: &str) -> LabResult<Material> {
        require_lab_staff(actor, "view inventory")?;
        self.db
            .get_material(id)?
            .ok_or_else(|| LabError::NotFound(format!("material {}", id)))
    }

    pub fn list_materials(&self, actor: &Viewer) -> LabResult<Vec<Material>> {
        require_lab_staff(actor, "view inventory")?;
        Ok(self.db.list_materials()?)
    }

    /// Delete a material no case has consumed.
    pub fn delete_material(&self, actor: &Viewer, id: &str) -> LabResult<()> {
        require_lab_staff(actor, "manage inventory")?;
        if !self.db.delete_material(id)? {
            return Err(LabError::NotFound(format!("material {}", id)));
        }
        tracing::info!(material_id = id, "Material deleted");
        Ok(())
    }

    /// Materials at or below their reorder level.
    pub fn low_stock(&self, actor: &Viewer) -> LabResult<Vec<Material>> {
        Ok(self
            .list_materials(actor)?
            .into_iter()
            .filter(Material::is_low_stock)
            .collect())
    }

    /// Total value of stock on hand.
    pub fn inventory_value(&self, actor: &Viewer) -> LabResult<Decimal> {
        Ok(inventory_value(&self.list_materials(actor)?))
    }
}

pub(super) fn material_label(link: &CaseMaterial) -> String {
    match (&link.material_name, &link.material_unit) {
        (Some(name), Some(unit)) => format!("{} ({} {})", name, link.quantity_used, unit),
        (Some(name), None) => name.clone(),
        _ => link.material_id.clone(),
    }
}

fn validate_material(material: &Material) -> LabResult<()> {
    if material.name.trim().is_empty() {
        return Err(LabError::Validation("material name is required".into()));
    }
    if material.unit_cost < Decimal::ZERO || material.reorder_level < Decimal::ZERO {
        return Err(LabError::Validation(
            "unit cost and reorder level must not be negative".into(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::testing::MemorySink;
    use crate::models::{Case, CaseStatus, Doctor, NewCase, ShippingInfo};
    use crate::workflow::StatusEngine;

    struct Fixture {
        db: Database,
        case: Case,
        material: Material,
        tech: Viewer,
    }

    fn setup(stock: i64) -> Fixture {
        let db = Database::open_in_memory().unwrap();
        let doctor = Doctor::new("Dr. Patel".into(), "Smile Dental".into());
        db.insert_doctor(&doctor).unwrap();
        let case = db
            .insert_case(
                &NewCase::new("Jane Roe".into(), doctor.id, "E.max Crown".into(), "2025-03-01".into()),
                "A2",
            )
            .unwrap();
        let mut material = Material::new("E.max Ingot".into(), "pcs".into());
        material.quantity = Decimal::new(stock, 0);
        db.insert_material(&material).unwrap();
        Fixture {
            db,
            case,
            material,
            tech: Viewer::tech("u2", "Sam"),
        }
    }

    fn stock(f: &Fixture) -> Decimal {
        f.db.get_material(&f.material.id).unwrap().unwrap().quantity
    }

    #[test]
    fn test_attach_then_detach_restores_stock() {
        let f = setup(10);
        let ledger = MaterialLedger::new(&f.db, StockPolicy::AllowNegative);

        let link = ledger
            .attach(&f.tech, &f.case.id, &f.material.id, Decimal::new(25, 1))
            .unwrap();
        assert_eq!(link.quantity_used, Decimal::new(25, 1));
        assert_eq!(stock(&f), Decimal::new(75, 1));

        ledger.detach(&f.tech, &link.id).unwrap();
        assert_eq!(stock(&f), Decimal::new(10, 0));
        assert!(ledger.case_materials(&f.tech, &f.case.id).unwrap().is_empty());
    }

    #[test]
    fn test_detach_twice_is_noop() {
        let f = setup(10);
        let ledger = MaterialLedger::new(&f.db, StockPolicy::AllowNegative);
        let link = ledger.attach(&f.tech, &f.case.id, &f.material.id, Decimal::ONE).unwrap();

        ledger.detach(&f.tech, &link.id).unwrap();
        ledger.detach(&f.tech, &link.id).unwrap();
        assert_eq!(stock(&f), Decimal::new(10, 0));
    }

    #[test]
    fn test_quantity_must_be_positive() {
        let f = setup(10);
        let ledger = MaterialLedger::new(&f.db, StockPolicy::AllowNegative);

        for quantity in [Decimal::ZERO, Decimal::NEGATIVE_ONE] {
            assert!(matches!(
                ledger.attach(&f.tech, &f.case.id, &f.material.id, quantity),
                Err(LabError::Validation(_))
            ));
        }
        assert_eq!(stock(&f), Decimal::new(10, 0));
    }

    #[test]
    fn test_stock_policy() {
        let f = setup(1);

        let strict = MaterialLedger::new(&f.db, StockPolicy::RejectNegative);
        assert!(matches!(
            strict.attach(&f.tech, &f.case.id, &f.material.id, Decimal::new(2, 0)),
            Err(LabError::ConstraintViolation(_))
        ));
        assert_eq!(stock(&f), Decimal::ONE);

        let permissive = MaterialLedger::new(&f.db, StockPolicy::AllowNegative);
        permissive
            .attach(&f.tech, &f.case.id, &f.material.id, Decimal::new(2, 0))
            .unwrap();
        assert_eq!(stock(&f), Decimal::NEGATIVE_ONE);
    }

    #[test]
    fn test_unknown_ids() {
        let f = setup(10);
        let ledger = MaterialLedger::new(&f.db, StockPolicy::AllowNegative);
        assert!(matches!(
            ledger.attach(&f.tech, "missing", &f.material.id, Decimal::ONE),
            Err(LabError::NotFound(_))
        ));
        assert!(matches!(
            ledger.attach(&f.tech, &f.case.id, "missing", Decimal::ONE),
            Err(LabError::NotFound(_))
        ));
    }

    #[test]
    fn test_shipped_case_accepts_no_consumption() {
        let f = setup(10);
        let engine = StatusEngine::new(&f.db);
        let admin = Viewer::admin("u1", "Alex");
        let shipped = engine
            .set_status(&admin, &f.case, CaseStatus::Shipped, Some(ShippingInfo::new("UPS", "1Z1")))
            .unwrap();

        let ledger = MaterialLedger::new(&f.db, StockPolicy::AllowNegative);
        assert!(matches!(
            ledger.attach(&f.tech, &shipped.id, &f.material.id, Decimal::ONE),
            Err(LabError::ConstraintViolation(_))
        ));
    }

    #[test]
    fn test_doctor_cannot_attach() {
        let f = setup(10);
        let ledger = MaterialLedger::new(&f.db, StockPolicy::AllowNegative);
        let doctor = Viewer::doctor("auth-1", "Dr. Patel", f.case.doctor_id.clone());
        assert!(matches!(
            ledger.attach(&doctor, &f.case.id, &f.material.id, Decimal::ONE),
            Err(LabError::InsufficientAuthorization(_))
        ));
    }

    #[test]
    fn test_ledger_events_are_audited() {
        let f = setup(10);
        let sink = MemorySink::default();
        let ledger = MaterialLedger::with_audit(&f.db, &sink, StockPolicy::AllowNegative);

        let link = ledger.attach(&f.tech, &f.case.id, &f.material.id, Decimal::new(2, 0)).unwrap();
        ledger.detach(&f.tech, &link.id).unwrap();

        let entries = sink.entries.borrow();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].action, "added material E.max Ingot (2 pcs)");
        assert_eq!(entries[1].action, "removed material E.max Ingot (2 pcs)");
        assert_eq!(entries[1].details["quantity"], "2");
    }

    #[test]
    fn test_inventory_views() {
        let f = setup(3);
        let ledger = MaterialLedger::new(&f.db, StockPolicy::AllowNegative);

        let mut material = f.material.clone();
        material.reorder_level = Decimal::new(5, 0);
        material.unit_cost = Decimal::new(1250, 2);
        ledger.update_material(&f.tech, &material).unwrap();

        assert_eq!(ledger.low_stock(&f.tech).unwrap().len(), 1);
        assert_eq!(ledger.inventory_value(&f.tech).unwrap(), Decimal::new(3750, 2));
    }

    #[test]
    fn test_material_crud() {
        let f = setup(0);
        let ledger = MaterialLedger::new(&f.db, StockPolicy::AllowNegative);

        let blank = Material::new(" ".into(), "g".into());
        assert!(matches!(
            ledger.create_material(&f.tech, &blank),
            Err(LabError::Validation(_))
        ));

        let alloy = Material::new("Gold Alloy".into(), "g".into());
        ledger.create_material(&f.tech, &alloy).unwrap();
        assert_eq!(ledger.list_materials(&f.tech).unwrap().len(), 2);

        let link = ledger.attach(&f.tech, &f.case.id, &alloy.id, Decimal::ONE).unwrap();
        assert!(matches!(
            ledger.delete_material(&f.tech, &alloy.id),
            Err(LabError::ConstraintViolation(_))
        ));
        ledger.detach(&f.tech, &link.id).unwrap();
        ledger.delete_material(&f.tech, &alloy.id).unwrap();
        assert!(matches!(
            ledger.get_material(&f.tech, &alloy.id),
            Err(LabError::NotFound(_))
        ));
    }
}
