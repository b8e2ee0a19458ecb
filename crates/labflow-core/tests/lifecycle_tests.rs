//! Case lifecycle integration tests.

use labflow_core::access::{get_case_for, list_cases_for, project_case, project_case_list, CaseQuery};
use labflow_core::billing::InvoiceReconciler;
use labflow_core::db::Database;
use labflow_core::error::LabError;
use labflow_core::models::{CaseStatus, Doctor, NewCase, Role, ShippingInfo, Viewer};
use labflow_core::workflow::{CaseRegistry, StatusEngine};
use rust_decimal::Decimal;

fn admin() -> Viewer {
    Viewer::admin("admin-1", "Alex")
}

fn make_doctor(db: &Database, name: &str) -> Doctor {
    let doctor = Doctor::new(name.to_string(), format!("{} Dental", name));
    db.insert_doctor(&doctor).unwrap();
    doctor
}

fn make_case(db: &Database, doctor: &Doctor, patient: &str) -> labflow_core::models::Case {
    let mut new_case = NewCase::new(
        patient.to_string(),
        doctor.id.clone(),
        "Zirconia Crown".to_string(),
        "2025-03-01".to_string(),
    );
    new_case.price = Decimal::new(15000, 2);
    CaseRegistry::new(db).create_case(&admin(), &new_case).unwrap()
}

#[test]
fn test_advance_to_shipped_scenario() {
    let db = Database::open_in_memory().unwrap();
    let doctor = make_doctor(&db, "Patel");
    let engine = StatusEngine::new(&db);
    let actor = admin();

    let case = make_case(&db, &doctor, "Jane Roe");
    assert_eq!(case.status, CaseStatus::Received);
    assert_eq!(case.due, "2025-03-01");
    assert_eq!(case.price, Decimal::new(15000, 2));

    let case = engine.advance(&actor, &case, None).unwrap();
    assert_eq!(case.status, CaseStatus::InProgress);
    let case = engine.advance(&actor, &case, None).unwrap();
    assert_eq!(case.status, CaseStatus::QualityCheck);
    let case = engine.advance(&actor, &case, None).unwrap();
    assert_eq!(case.status, CaseStatus::Ready);

    // Shipping needs shipment data
    let missing = engine.advance(&actor, &case, None);
    assert!(matches!(missing, Err(LabError::Validation(_))));
    assert_eq!(db.get_case(&case.id).unwrap().unwrap().status, CaseStatus::Ready);

    let shipped = engine
        .advance(&actor, &case, Some(ShippingInfo::new("UPS", "1Z1")))
        .unwrap();
    assert_eq!(shipped.status, CaseStatus::Shipped);
    assert!(shipped.shipped_at.is_some());
    assert_eq!(shipped.shipping_carrier.as_deref(), Some("UPS"));

    assert!(matches!(
        engine.advance(&actor, &shipped, Some(ShippingInfo::new("UPS", "1Z1"))),
        Err(LabError::InvalidTransition(_))
    ));

    // One entry for creation, four for the moves
    assert_eq!(db.list_activity(Some(&case.id), 50).unwrap().len(), 5);
}

#[test]
fn test_toggle_invoiced_twice_scenario() {
    let db = Database::open_in_memory().unwrap();
    let doctor = make_doctor(&db, "Patel");
    let case = make_case(&db, &doctor, "Jane Roe");
    let billing = InvoiceReconciler::new(&db);

    let first = billing.toggle_invoiced(&admin(), &case.id).unwrap();
    let second = billing.toggle_invoiced(&admin(), &case.id).unwrap();
    assert!(first.invoiced);
    assert!(!second.invoiced);

    let toggles = db
        .list_activity(Some(&case.id), 50)
        .unwrap()
        .into_iter()
        .filter(|entry| entry.action.contains("invoiced"))
        .count();
    assert_eq!(toggles, 2);
}

#[test]
fn test_doctor_projection_scenario() {
    let db = Database::open_in_memory().unwrap();
    let d1 = make_doctor(&db, "D1");
    let d2 = make_doctor(&db, "D2");
    make_case(&db, &d1, "A");
    make_case(&db, &d1, "B");
    make_case(&db, &d2, "C");

    let all = db.list_cases().unwrap();
    let projected = project_case_list(&all, Role::Doctor, Some(&d1.id));
    assert_eq!(projected.len(), 2);
    for case in &projected {
        assert_eq!(case.doctor_id, d1.id);
        let value = serde_json::to_value(case).unwrap();
        assert!(value.get("price").is_none());
        assert!(value.get("invoiced").is_none());
    }

    // The same cut through the store-backed read path
    let viewer = Viewer::doctor("auth-d1", "D1", d1.id.clone());
    let listed = list_cases_for(&db, &viewer, &CaseQuery::default()).unwrap();
    assert_eq!(listed.len(), 2);

    let foreign = db.list_cases_for_doctor(&d2.id).unwrap().remove(0);
    assert!(matches!(
        get_case_for(&db, &viewer, &foreign.id),
        Err(LabError::InsufficientAuthorization(_))
    ));
}

#[test]
fn test_shipped_at_tracks_status() {
    let db = Database::open_in_memory().unwrap();
    let doctor = make_doctor(&db, "Patel");
    let engine = StatusEngine::new(&db);
    let actor = Viewer::tech("tech-1", "Sam");
    let mut case = make_case(&db, &doctor, "Jane Roe");

    let path = [
        CaseStatus::Shipped,
        CaseStatus::Received,
        CaseStatus::Ready,
        CaseStatus::Shipped,
        CaseStatus::QualityCheck,
    ];
    for status in path {
        case = engine
            .set_status(&actor, &case, status, Some(ShippingInfo::new("FedEx", "7788")))
            .unwrap();
        let stored = db.get_case(&case.id).unwrap().unwrap();
        assert_eq!(stored.shipped_at.is_some(), stored.status == CaseStatus::Shipped);
        assert!(stored.shipment_consistent());
    }
}

#[test]
fn test_tech_sees_no_prices() {
    let db = Database::open_in_memory().unwrap();
    let doctor = make_doctor(&db, "Patel");
    let case = make_case(&db, &doctor, "Jane Roe");

    let tech = project_case(&case, Role::Tech);
    assert!(tech.price.is_none());
    assert!(tech.invoiced.is_none());
    assert_eq!(tech.patient, "Jane Roe");

    let admin = project_case(&case, Role::Admin);
    assert_eq!(admin.price, Some(Decimal::new(15000, 2)));
}
