//! Status engine.
//!
//! ```text
//! received → in_progress → quality_check → ready → shipped
//!                               ↑  ↓          ↑ ↓      ↓
//!                          (retreat only from quality_check, ready, shipped)
//! ```
//!
//! Moving to `shipped` requires shipment metadata and stamps `shipped_at`;
//! leaving `shipped` clears all shipment fields.

use serde_json::json;

use crate::access::require_lab_staff;
use crate::audit::{record_best_effort, AuditSink};
use crate::db::{now_timestamp, read_case, write_case_state, Database};
use crate::error::{LabError, LabResult};
use crate::models::{ActivityLogEntry, Case, CaseStatus, ShippingInfo, Viewer};

/// Drives cases through the status workflow.
pub struct StatusEngine<'a> {
    db: &'a Database,
    audit: &'a dyn AuditSink,
}

impl<'a> StatusEngine<'a> {
    /// Create an engine that records activity in the same database.
    pub fn new(db: &'a Database) -> Self {
        Self { db, audit: db }
    }

    /// Create an engine with a separate audit sink.
    pub fn with_audit(db: &'a Database, audit: &'a dyn AuditSink) -> Self {
        Self { db, audit }
    }

    /// Move a case exactly one step forward.
    ///
    /// `shipping` is required when the next status is `shipped` and ignored
    /// otherwise.
    pub fn advance(
        &self,
        actor: &Viewer,
        case: &Case,
        shipping: Option<ShippingInfo>,
    ) -> LabResult<Case> {
        require_lab_staff(actor, "change case status")?;

        let to = case.status.next().ok_or_else(|| {
            LabError::InvalidTransition(format!(
                "case {} is already {}; it cannot advance",
                case.case_number, case.status
            ))
        })?;

        if to == CaseStatus::Shipped {
            require_shipping(shipping.as_ref())?;
        }

        let shipping = if to == CaseStatus::Shipped { shipping } else { None };
        self.commit(actor, case, to, shipping, format!("moved to {}", to.label()))
    }

    /// Move a case exactly one step backward.
    pub fn retreat(&self, actor: &Viewer, case: &Case) -> LabResult<Case> {
        require_lab_staff(actor, "change case status")?;

        let to = case.status.previous().ok_or_else(|| {
            LabError::InvalidTransition(format!(
                "case {} cannot move back from {}",
                case.case_number, case.status
            ))
        })?;

        self.commit(actor, case, to, None, format!("moved back to {}", to.label()))
    }

    /// Jump directly to any status (manual correction from the edit form).
    ///
    /// Shipment fields are normalized for the destination: moving to
    /// `shipped` needs shipment info unless the case already carries it,
    /// and any other destination clears them.
    pub fn set_status(
        &self,
        actor: &Viewer,
        case: &Case,
        status: CaseStatus,
        shipping: Option<ShippingInfo>,
    ) -> LabResult<Case> {
        require_lab_staff(actor, "change case status")?;

        if status == case.status && shipping.is_none() {
            let current = self
                .db
                .get_case(&case.id)?
                .ok_or_else(|| LabError::NotFound(format!("case {}", case.id)))?;
            ensure_unchanged(&current, case)?;
            return Ok(current);
        }

        let action = if status == case.status {
            "updated shipping details".to_string()
        } else {
            format!("changed status to {}", status.label())
        };
        self.commit(actor, case, status, shipping, action)
    }

    fn commit(
        &self,
        actor: &Viewer,
        expected: &Case,
        to: CaseStatus,
        shipping: Option<ShippingInfo>,
        action: String,
    ) -> LabResult<Case> {
        let tx = self.db.immediate()?;

        let mut current = read_case(&tx, &expected.id)?
            .ok_or_else(|| LabError::NotFound(format!("case {}", expected.id)))?;
        ensure_unchanged(&current, expected)?;

        let from = current.status;
        let now = now_timestamp();
        normalize_shipment(&mut current, to, shipping, &now)?;
        current.status = to;
        current.updated_at = now;

        write_case_state(&tx, &current)?;
        tx.commit()?;

        tracing::info!(
            case_id = %current.id,
            case_number = %current.case_number,
            from = %from,
            to = %to,
            actor = %actor.user_id,
            "Case status changed"
        );

        record_best_effort(
            self.audit,
            &ActivityLogEntry::new(Some(&current.id), actor, action)
                .with_details(json!({ "from": from, "to": to })),
        );

        Ok(current)
    }
}

fn ensure_unchanged(current: &Case, expected: &Case) -> LabResult<()> {
    if current.status == expected.status {
        return Ok(());
    }
    Err(LabError::ConcurrencyConflict(format!(
        "case {} is now {}, not {}",
        current.case_number, current.status, expected.status
    )))
}

fn require_shipping(shipping: Option<&ShippingInfo>) -> LabResult<()> {
    match shipping {
        Some(info) if info.is_complete() => Ok(()),
        Some(_) => Err(LabError::Validation(
            "shipping carrier and tracking number must not be blank".into(),
        )),
        None => Err(LabError::Validation(
            "shipping carrier and tracking number are required to ship a case".into(),
        )),
    }
}

/// Make the shipment fields agree with the destination status.
fn normalize_shipment(
    case: &mut Case,
    to: CaseStatus,
    shipping: Option<ShippingInfo>,
    now: &str,
) -> LabResult<()> {
    if to != CaseStatus::Shipped {
        case.shipping_carrier = None;
        case.tracking_number = None;
        case.shipped_at = None;
        return Ok(());
    }

    match shipping {
        Some(info) => {
            require_shipping(Some(&info))?;
            case.shipping_carrier = Some(info.carrier.trim().to_string());
            case.tracking_number = Some(info.tracking_number.trim().to_string());
            if case.status != CaseStatus::Shipped || case.shipped_at.is_none() {
                case.shipped_at = Some(now.to_string());
            }
            Ok(())
        }
        None if case.status == CaseStatus::Shipped && case.shipping_carrier.is_some() => Ok(()),
        None => require_shipping(None),
    }
}
