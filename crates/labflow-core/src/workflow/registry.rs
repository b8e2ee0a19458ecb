//! Case and doctor records: intake, direct edits and removal.

use rust_decimal::Decimal;
use serde_json::json;

use crate::access::{require_admin, require_lab_staff};
use crate::audit::{record_best_effort, AuditSink};
use crate::catalog::RestorationCatalog;
use crate::db::Database;
use crate::error::{LabError, LabResult};
use crate::models::{
    is_valid_due_date, normalize_price, ActivityLogEntry, Case, CaseEdit, Doctor, NewCase, Viewer,
    DEFAULT_SHADE,
};

use super::ledger::material_label;

/// Lab-side maintenance of cases and the doctors they reference.
pub struct CaseRegistry<'a> {
    db: &'a Database,
    audit: &'a dyn AuditSink,
    catalog: RestorationCatalog,
}

impl<'a> CaseRegistry<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self {
            db,
            audit: db,
            catalog: RestorationCatalog::default(),
        }
    }

    pub fn with_audit(db: &'a Database, audit: &'a dyn AuditSink) -> Self {
        Self {
            db,
            audit,
            catalog: RestorationCatalog::default(),
        }
    }

    /// Create a case in `received`. The store assigns the case number.
    pub fn create_case(&self, actor: &Viewer, new_case: &NewCase) -> LabResult<Case> {
        require_lab_staff(actor, "create cases")?;
        if !new_case.price.is_zero() {
            require_admin(actor, "set case prices")?;
        }

        require_text("patient", &new_case.patient)?;
        require_text("restoration type", &new_case.restoration_type)?;
        validate_due(&new_case.due)?;
        let price = validate_price(new_case.price)?;

        let shade = match new_case.shade.as_deref().map(str::trim) {
            Some(shade) if !shade.is_empty() => shade.to_string(),
            _ => DEFAULT_SHADE.to_string(),
        };
        let intake = NewCase {
            patient: new_case.patient.trim().to_string(),
            restoration_type: self.catalog.canonicalize(&new_case.restoration_type),
            price,
            ..new_case.clone()
        };

        let case = self.db.insert_case(&intake, &shade)?;
        tracing::info!(
            case_id = %case.id,
            case_number = %case.case_number,
            doctor_id = %case.doctor_id,
            rush = case.rush,
            "Case created"
        );

        record_best_effort(
            self.audit,
            &ActivityLogEntry::new(Some(&case.id), actor, format!("created case {}", case.case_number)),
        );
        Ok(case)
    }

    /// Apply direct field edits. Status moves go through the status engine.
    ///
    /// Only admins may supply a price; a tech edit leaves `price` as `None`.
    pub fn update_case(&self, actor: &Viewer, case_id: &str, edit: &CaseEdit) -> LabResult<Case> {
        require_lab_staff(actor, "edit cases")?;
        if edit.price.is_some() {
            require_admin(actor, "set case prices")?;
        }

        require_text("patient", &edit.patient)?;
        require_text("restoration type", &edit.restoration_type)?;
        validate_due(&edit.due)?;
        let price = edit.price.map(validate_price).transpose()?;

        let shade = edit.shade.trim();
        let edit = CaseEdit {
            patient: edit.patient.trim().to_string(),
            restoration_type: self.catalog.canonicalize(&edit.restoration_type),
            shade: if shade.is_empty() { DEFAULT_SHADE.to_string() } else { shade.to_string() },
            price,
            ..edit.clone()
        };

        if !self.db.update_case_fields(case_id, &edit)? {
            return Err(LabError::NotFound(format!("case {}", case_id)));
        }
        let case = self
            .db
            .get_case(case_id)?
            .ok_or_else(|| LabError::NotFound(format!("case {}", case_id)))?;

        tracing::info!(case_id = %case.id, case_number = %case.case_number, "Case updated");
        record_best_effort(
            self.audit,
            &ActivityLogEntry::new(Some(&case.id), actor, "updated case details"),
        );
        Ok(case)
    }

    /// Delete a case. Consumed materials go back to stock, each recorded as a
    /// removal; activity entries stay with their case link cleared.
    pub fn delete_case(&self, actor: &Viewer, case_id: &str) -> LabResult<()> {
        require_lab_staff(actor, "delete cases")?;

        let case = self
            .db
            .get_case(case_id)?
            .ok_or_else(|| LabError::NotFound(format!("case {}", case_id)))?;
        let released = self
            .db
            .delete_case(case_id)?
            .ok_or_else(|| LabError::NotFound(format!("case {}", case_id)))?;

        tracing::info!(
            case_id,
            case_number = %case.case_number,
            released = released.len(),
            "Case deleted"
        );
        for link in &released {
            record_best_effort(
                self.audit,
                &ActivityLogEntry::new(None, actor, format!("removed material {}", material_label(link)))
                    .with_details(json!({
                        "case_id": case.id,
                        "material_id": link.material_id,
                        "quantity": link.quantity_used.to_string(),
                    })),
            );
        }
        record_best_effort(
            self.audit,
            &ActivityLogEntry::new(None, actor, format!("deleted case {}", case.case_number))
                .with_details(json!({ "case_id": case.id, "patient": case.patient })),
        );
        Ok(())
    }

    pub fn create_doctor(&self, actor: &Viewer, doctor: &Doctor) -> LabResult<()> {
        require_lab_staff(actor, "manage doctors")?;
        require_text("doctor name", &doctor.name)?;
        self.db.insert_doctor(doctor)?;
        tracing::info!(doctor_id = %doctor.id, "Doctor created");
        record_best_effort(
            self.audit,
            &ActivityLogEntry::new(None, actor, format!("added doctor {}", doctor.name)),
        );
        Ok(())
    }

    pub fn update_doctor(&self, actor: &Viewer, doctor: &Doctor) -> LabResult<Doctor> {
        require_lab_staff(actor, "manage doctors")?;
        require_text("doctor name", &doctor.name)?;
        if !self.db.update_doctor(doctor)? {
            return Err(LabError::NotFound(format!("doctor {}", doctor.id)));
        }
        self.get_doctor(actor, &doctor.id)
    }

    pub fn get_doctor(&self, actor: &Viewer, id: &str) -> LabResult<Doctor> {
        require_lab_staff(actor, "view doctors")?;
        self.db
            .get_doctor(id)?
            .ok_or_else(|| LabError::NotFound(format!("doctor {}", id)))
    }

    pub fn list_doctors(&self, actor: &Viewer) -> LabResult<Vec<Doctor>> {
        require_lab_staff(actor, "view doctors")?;
        Ok(self.db.list_doctors()?)
    }

    /// Delete a doctor. Refused while any case references them.
    pub fn delete_doctor(&self, actor: &Viewer, id: &str) -> LabResult<()> {
        require_lab_staff(actor, "manage doctors")?;
        let doctor = self.get_doctor(actor, id)?;
        self.db.delete_doctor(id)?;
        tracing::info!(doctor_id = id, "Doctor deleted");
        record_best_effort(
            self.audit,
            &ActivityLogEntry::new(None, actor, format!("removed doctor {}", doctor.name)),
        );
        Ok(())
    }
}

fn require_text(field: &str, value: &str) -> LabResult<()> {
    if value.trim().is_empty() {
        Err(LabError::Validation(format!("{} is required", field)))
    } else {
        Ok(())
    }
}

fn validate_due(due: &str) -> LabResult<()> {
    if is_valid_due_date(due) {
        Ok(())
    } else {
        Err(LabError::Validation(format!("due date must be YYYY-MM-DD, got {:?}", due)))
    }
}

fn validate_price(price: Decimal) -> LabResult<Decimal> {
    normalize_price(price)
        .ok_or_else(|| LabError::Validation(format!("price must not be negative, got {}", price)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StockPolicy;
    use crate::models::{CaseStatus, Material};
    use crate::workflow::MaterialLedger;

    fn setup() -> (Database, Doctor) {
        let db = Database::open_in_memory().unwrap();
        let doctor = Doctor::new("Dr. Patel".into(), "Smile Dental".into());
        db.insert_doctor(&doctor).unwrap();
        (db, doctor)
    }

    fn intake(doctor: &Doctor) -> NewCase {
        NewCase::new(
            "Jane Roe".into(),
            doctor.id.clone(),
            "zirconia crown".into(),
            "2025-03-01".into(),
        )
    }

    #[test]
    fn test_create_defaults() {
        let (db, doctor) = setup();
        let registry = CaseRegistry::new(&db);
        let admin = Viewer::admin("u1", "Alex");

        let mut new_case = intake(&doctor);
        new_case.price = Decimal::new(15000, 2);
        let case = registry.create_case(&admin, &new_case).unwrap();

        assert_eq!(case.status, CaseStatus::Received);
        assert_eq!(case.case_number, "C-1");
        assert_eq!(case.shade, "A2");
        assert_eq!(case.restoration_type, "Zirconia Crown");
        assert_eq!(case.price, Decimal::new(15000, 2));
        assert!(!case.invoiced);

        let activity = db.list_activity(Some(&case.id), 10).unwrap();
        assert_eq!(activity[0].action, "created case C-1");
    }

    #[test]
    fn test_free_text_type_stored_as_entered() {
        let (db, doctor) = setup();
        let registry = CaseRegistry::new(&db);
        let tech = Viewer::tech("u2", "Sam");

        let mut new_case = intake(&doctor);
        new_case.restoration_type = "Full Denture Upper".into();
        let case = registry.create_case(&tech, &new_case).unwrap();
        assert_eq!(
            db.get_case(&case.id).unwrap().unwrap().restoration_type,
            "Full Denture Upper"
        );
    }

    #[test]
    fn test_create_validation() {
        let (db, doctor) = setup();
        let registry = CaseRegistry::new(&db);
        let admin = Viewer::admin("u1", "Alex");

        let mut bad_due = intake(&doctor);
        bad_due.due = "03/01/2025".into();
        assert!(matches!(registry.create_case(&admin, &bad_due), Err(LabError::Validation(_))));

        let mut negative = intake(&doctor);
        negative.price = Decimal::new(-1, 0);
        assert!(matches!(registry.create_case(&admin, &negative), Err(LabError::Validation(_))));

        let mut orphan = intake(&doctor);
        orphan.doctor_id = "missing".into();
        assert!(matches!(registry.create_case(&admin, &orphan), Err(LabError::NotFound(_))));
    }

    #[test]
    fn test_tech_cannot_price() {
        let (db, doctor) = setup();
        let registry = CaseRegistry::new(&db);
        let tech = Viewer::tech("u2", "Sam");

        let mut priced = intake(&doctor);
        priced.price = Decimal::new(100, 0);
        assert!(matches!(
            registry.create_case(&tech, &priced),
            Err(LabError::InsufficientAuthorization(_))
        ));

        let case = registry.create_case(&tech, &intake(&doctor)).unwrap();
        let mut edit = CaseEdit::from_case(&case);
        assert!(matches!(
            registry.update_case(&tech, &case.id, &edit),
            Err(LabError::InsufficientAuthorization(_))
        ));

        edit.price = None;
        edit.rush = true;
        let updated = registry.update_case(&tech, &case.id, &edit).unwrap();
        assert!(updated.rush);
        assert_eq!(updated.price, Decimal::ZERO);
    }

    #[test]
    fn test_admin_edit_rounds_price() {
        let (db, doctor) = setup();
        let registry = CaseRegistry::new(&db);
        let admin = Viewer::admin("u1", "Alex");
        let case = registry.create_case(&admin, &intake(&doctor)).unwrap();

        let mut edit = CaseEdit::from_case(&case);
        edit.price = Some(Decimal::new(12345, 3));
        edit.shade = " ".into();
        let updated = registry.update_case(&admin, &case.id, &edit).unwrap();
        assert_eq!(updated.price, Decimal::new(1235, 2));
        assert_eq!(updated.shade, "A2");
    }

    #[test]
    fn test_update_missing_case() {
        let (db, doctor) = setup();
        let registry = CaseRegistry::new(&db);
        let admin = Viewer::admin("u1", "Alex");
        let case = registry.create_case(&admin, &intake(&doctor)).unwrap();

        let edit = CaseEdit::from_case(&case);
        assert!(matches!(
            registry.update_case(&admin, "missing", &edit),
            Err(LabError::NotFound(_))
        ));
    }

    #[test]
    fn test_delete_case_restores_stock_and_keeps_activity() {
        let (db, doctor) = setup();
        let registry = CaseRegistry::new(&db);
        let admin = Viewer::admin("u1", "Alex");
        let case = registry.create_case(&admin, &intake(&doctor)).unwrap();

        let mut material = Material::new("Zirconia Disc".into(), "pcs".into());
        material.quantity = Decimal::new(4, 0);
        db.insert_material(&material).unwrap();
        MaterialLedger::new(&db, StockPolicy::AllowNegative)
            .attach(&admin, &case.id, &material.id, Decimal::ONE)
            .unwrap();

        registry.delete_case(&admin, &case.id).unwrap();

        assert!(db.get_case(&case.id).unwrap().is_none());
        assert_eq!(db.get_material(&material.id).unwrap().unwrap().quantity, Decimal::new(4, 0));

        let activity = db.list_activity(None, 10).unwrap();
        assert_eq!(activity.len(), 4);
        assert_eq!(activity[0].action, "deleted case C-1");
        assert_eq!(activity[1].action, "removed material Zirconia Disc (1 pcs)");
        assert_eq!(activity[1].details["case_id"], json!(case.id));
        assert!(activity.iter().all(|entry| entry.case_id.is_none()));
    }

    #[test]
    fn test_doctor_with_cases_cannot_be_deleted() {
        let (db, doctor) = setup();
        let registry = CaseRegistry::new(&db);
        let admin = Viewer::admin("u1", "Alex");
        let case = registry.create_case(&admin, &intake(&doctor)).unwrap();

        assert!(matches!(
            registry.delete_doctor(&admin, &doctor.id),
            Err(LabError::ConstraintViolation(_))
        ));

        registry.delete_case(&admin, &case.id).unwrap();
        registry.delete_doctor(&admin, &doctor.id).unwrap();
        assert!(registry.list_doctors(&admin).unwrap().is_empty());
    }

    #[test]
    fn test_doctor_crud() {
        let (db, _) = setup();
        let registry = CaseRegistry::new(&db);
        let tech = Viewer::tech("u2", "Sam");

        let mut doctor = Doctor::new("Dr. Chen".into(), "Bright Teeth".into());
        registry.create_doctor(&tech, &doctor).unwrap();

        doctor.phone = Some("555-0100".into());
        let updated = registry.update_doctor(&tech, &doctor).unwrap();
        assert_eq!(updated.phone.as_deref(), Some("555-0100"));

        let names: Vec<_> = registry.list_doctors(&tech).unwrap().into_iter().map(|d| d.name).collect();
        assert_eq!(names, vec!["Dr. Chen", "Dr. Patel"]);

        let doctor_viewer = Viewer::doctor("auth-1", "Dr. Chen", doctor.id.clone());
        assert!(matches!(
            registry.list_doctors(&doctor_viewer),
            Err(LabError::InsufficientAuthorization(_))
        ));
    }
}
