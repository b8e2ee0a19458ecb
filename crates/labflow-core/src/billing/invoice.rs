//! Invoiced-flag toggling and invoice worklists.

use rust_decimal::Decimal;
use serde::Serialize;
use serde_json::json;

use super::{summarize_invoices, InvoiceSummary};
use crate::access::require_admin;
use crate::audit::{record_best_effort, AuditSink};
use crate::db::{now_timestamp, read_case, write_case_state, Database};
use crate::error::{LabError, LabResult};
use crate::models::{ActivityLogEntry, Case, Viewer};

/// A doctor with cases not yet invoiced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PendingInvoice {
    pub doctor_id: String,
    pub doctor_name: String,
    pub case_count: usize,
    pub amount: Decimal,
}

/// Admin-only billing operations.
pub struct InvoiceReconciler<'a> {
    db: &'a Database,
    audit: &'a dyn AuditSink,
}

impl<'a> InvoiceReconciler<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self { db, audit: db }
    }

    pub fn with_audit(db: &'a Database, audit: &'a dyn AuditSink) -> Self {
        Self { db, audit }
    }

    /// Flip a case's invoiced flag.
    pub fn toggle_invoiced(&self, actor: &Viewer, case_id: &str) -> LabResult<Case> {
        require_admin(actor, "change invoice status")?;

        let tx = self.db.immediate()?;
        let mut case = read_case(&tx, case_id)?
            .ok_or_else(|| LabError::NotFound(format!("case {}", case_id)))?;
        case.invoiced = !case.invoiced;
        case.updated_at = now_timestamp();
        write_case_state(&tx, &case)?;
        tx.commit()?;

        tracing::info!(
            case_id,
            case_number = %case.case_number,
            invoiced = case.invoiced,
            "Invoice flag toggled"
        );

        let action = if case.invoiced {
            "marked as invoiced"
        } else {
            "unmarked as invoiced"
        };
        record_best_effort(
            self.audit,
            &ActivityLogEntry::new(Some(case_id), actor, action)
                .with_details(json!({ "invoiced": case.invoiced })),
        );

        Ok(case)
    }

    /// Cases of one doctor not yet invoiced, earliest due first.
    pub fn pending_cases(&self, actor: &Viewer, doctor_id: &str) -> LabResult<Vec<Case>> {
        require_admin(actor, "view invoices")?;
        if self.db.get_doctor(doctor_id)?.is_none() {
            return Err(LabError::NotFound(format!("doctor {}", doctor_id)));
        }
        Ok(self
            .db
            .list_cases_for_doctor(doctor_id)?
            .into_iter()
            .filter(|case| !case.invoiced)
            .collect())
    }

    /// Doctors with at least one case not yet invoiced, by name.
    pub fn doctors_with_pending(&self, actor: &Viewer) -> LabResult<Vec<PendingInvoice>> {
        require_admin(actor, "view invoices")?;
        let mut pending = Vec::new();

        for doctor in self.db.list_doctors()? {
            let uninvoiced: Vec<Case> = self
                .db
                .list_cases_for_doctor(&doctor.id)?
                .into_iter()
                .filter(|case| !case.invoiced)
                .collect();
            if uninvoiced.is_empty() {
                continue;
            }
            pending.push(PendingInvoice {
                doctor_id: doctor.id,
                doctor_name: doctor.name,
                case_count: uninvoiced.len(),
                amount: uninvoiced.iter().map(|case| case.price).sum(),
            });
        }

        Ok(pending)
    }

    /// Pending and invoiced sums over every case.
    pub fn summary(&self, actor: &Viewer) -> LabResult<InvoiceSummary> {
        require_admin(actor, "view invoice totals")?;
        Ok(summarize_invoices(&self.db.list_cases()?))
    }
}
