//! Role projection: the field and row cut applied before a case leaves the
//! core.

use rust_decimal::Decimal;
use serde::Serialize;

use crate::models::{Case, CaseStatus, Role};

/// A case as one role is allowed to see it.
///
/// Financial fields are `None` and omitted from serialized output for
/// every role but admin.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProjectedCase {
    pub id: String,
    pub case_number: String,
    pub patient: String,
    pub doctor_id: String,
    pub doctor_name: Option<String>,
    pub restoration_type: String,
    pub shade: String,
    pub due: String,
    pub rush: bool,
    pub notes: Option<String>,
    pub status: CaseStatus,
    pub shipping_carrier: Option<String>,
    pub tracking_number: Option<String>,
    pub shipped_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub invoiced: Option<bool>,
    pub created_at: String,
    pub updated_at: String,
}

/// Cut a case down to the fields `role` may see.
pub fn project_case(case: &Case, role: Role) -> ProjectedCase {
    let financials = role.sees_financials();
    ProjectedCase {
        id: case.id.clone(),
        case_number: case.case_number.clone(),
        patient: case.patient.clone(),
        doctor_id: case.doctor_id.clone(),
        doctor_name: case.doctor_name.clone(),
        restoration_type: case.restoration_type.clone(),
        shade: case.shade.clone(),
        due: case.due.clone(),
        rush: case.rush,
        notes: case.notes.clone(),
        status: case.status,
        shipping_carrier: case.shipping_carrier.clone(),
        tracking_number: case.tracking_number.clone(),
        shipped_at: case.shipped_at.clone(),
        price: financials.then_some(case.price),
        invoiced: financials.then_some(case.invoiced),
        created_at: case.created_at.clone(),
        updated_at: case.updated_at.clone(),
    }
}

/// Project a list, dropping rows outside the viewer's scope.
///
/// Lab roles keep every row. A doctor keeps only cases referred by
/// `viewer_doctor_id`; without one, nothing.
pub fn project_case_list(
    cases: &[Case],
    role: Role,
    viewer_doctor_id: Option<&str>,
) -> Vec<ProjectedCase> {
    cases
        .iter()
        .filter(|case| match role {
            Role::Admin | Role::Tech => true,
            Role::Doctor => viewer_doctor_id == Some(case.doctor_id.as_str()),
        })
        .map(|case| project_case(case, role))
        .collect()
}
