//! Scoped case reads and list-view filtering.

use std::cmp::Ordering;

use chrono::{Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::{project_case, project_case_list, require_lab_staff, ProjectedCase};
use crate::db::Database;
use crate::error::{LabError, LabResult};
use crate::models::{ActivityLogEntry, Case, CaseStatus, Role, Viewer};

/// Column a case list is ordered by after rush and status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortColumn {
    CaseNumber,
    Patient,
    Doctor,
    RestorationType,
    Status,
    #[default]
    Due,
    Price,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

/// Filter, search and sort options of a case list view.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaseQuery {
    /// Only cases in this status
    pub status: Option<CaseStatus>,
    /// Case-insensitive substring over number, patient, type and doctor
    pub search: Option<String>,
    pub sort: SortColumn,
    pub direction: SortDirection,
    /// Only cases that are not shipped and past due on this date
    pub overdue_on: Option<NaiveDate>,
}

impl CaseQuery {
    pub fn matches(&self, case: &Case) -> bool {
        if self.status.is_some_and(|s| s != case.status) {
            return false;
        }
        if self.overdue_on.is_some_and(|today| !case.is_overdue(today)) {
            return false;
        }
        match self.search.as_deref().map(str::trim) {
            None | Some("") => true,
            Some(term) => {
                let term = term.to_lowercase();
                [
                    Some(case.case_number.as_str()),
                    Some(case.patient.as_str()),
                    Some(case.restoration_type.as_str()),
                    case.doctor_name.as_deref(),
                ]
                .into_iter()
                .flatten()
                .any(|field| field.to_lowercase().contains(&term))
            }
        }
    }

    /// Filter and sort in place: rush first, then workflow order, then the
    /// chosen column.
    ///
    /// Sorting by price falls back to due date for viewers who cannot see
    /// prices.
    pub fn apply(&self, mut cases: Vec<Case>, role: Role) -> Vec<Case> {
        cases.retain(|case| self.matches(case));

        let column = match self.sort {
            SortColumn::Price if !role.sees_financials() => SortColumn::Due,
            other => other,
        };

        cases.sort_by(|a, b| {
            b.rush
                .cmp(&a.rush)
                .then_with(|| a.status.cmp(&b.status))
                .then_with(|| {
                    let ordering = compare_column(a, b, column);
                    match self.direction {
                        SortDirection::Asc => ordering,
                        SortDirection::Desc => ordering.reverse(),
                    }
                })
        });
        cases
    }
}

fn compare_column(a: &Case, b: &Case, column: SortColumn) -> Ordering {
    match column {
        SortColumn::CaseNumber => a.sequence().cmp(&b.sequence()),
        SortColumn::Patient => a.patient.to_lowercase().cmp(&b.patient.to_lowercase()),
        SortColumn::Doctor => a.doctor_name.cmp(&b.doctor_name),
        SortColumn::RestorationType => a.restoration_type.cmp(&b.restoration_type),
        SortColumn::Status => a.status.cmp(&b.status),
        SortColumn::Due => a.due.cmp(&b.due),
        SortColumn::Price => a.price.cmp(&b.price),
    }
}

/// Read one case through the viewer's row and field scope.
///
/// A doctor asking for another doctor's case is refused, not filtered.
pub fn get_case_for(db: &Database, viewer: &Viewer, case_id: &str) -> LabResult<ProjectedCase> {
    let case = db
        .get_case(case_id)?
        .ok_or_else(|| LabError::NotFound(format!("case {}", case_id)))?;

    if viewer.role == Role::Doctor && viewer.doctor_id.as_deref() != Some(case.doctor_id.as_str()) {
        tracing::warn!(user_id = %viewer.user_id, case_id, "Doctor read outside own cases");
        return Err(LabError::InsufficientAuthorization(format!(
            "case {} belongs to another practice",
            case.case_number
        )));
    }

    Ok(project_case(&case, viewer.role))
}

/// List cases visible to the viewer, filtered and sorted by `query`.
pub fn list_cases_for(db: &Database, viewer: &Viewer, query: &CaseQuery) -> LabResult<Vec<ProjectedCase>> {
    let cases = scoped_cases(db, viewer)?;
    let cases = query.apply(cases, viewer.role);
    Ok(project_case_list(&cases, viewer.role, viewer.doctor_id.as_deref()))
}

/// Shipped cases visible to the viewer, most recent first, optionally only
/// those shipped in the last `within_days` days.
pub fn shipping_log_for(
    db: &Database,
    viewer: &Viewer,
    within_days: Option<u32>,
) -> LabResult<Vec<ProjectedCase>> {
    let since = within_days.map(|days| (Utc::now() - Duration::days(i64::from(days))).to_rfc3339());
    let shipped = db.list_shipped_cases(since.as_deref(), doctor_scope(viewer)?)?;
    Ok(project_case_list(&shipped, viewer.role, viewer.doctor_id.as_deref()))
}

/// Recent activity, newest first. Lab staff only.
pub fn activity_feed(
    db: &Database,
    viewer: &Viewer,
    case_id: Option<&str>,
    limit: usize,
) -> LabResult<Vec<ActivityLogEntry>> {
    require_lab_staff(viewer, "read the activity log")?;
    Ok(db.list_activity(case_id, limit)?)
}

fn scoped_cases(db: &Database, viewer: &Viewer) -> LabResult<Vec<Case>> {
    match doctor_scope(viewer)? {
        None => Ok(db.list_cases()?),
        Some(doctor_id) => Ok(db.list_cases_for_doctor(doctor_id)?),
    }
}

/// Doctor whose rows the viewer is limited to; `None` for lab staff.
fn doctor_scope(viewer: &Viewer) -> LabResult<Option<&str>> {
    match viewer.role {
        Role::Admin | Role::Tech => Ok(None),
        Role::Doctor => viewer.doctor_id.as_deref().map(Some).ok_or_else(|| {
            LabError::InsufficientAuthorization("portal account is not linked to a doctor".into())
        }),
    }
}
