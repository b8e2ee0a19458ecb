//! Invoice aggregation.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::Serialize;

use crate::models::Case;

/// Bucket for cases whose creation timestamp cannot be parsed.
pub const UNKNOWN_MONTH: &str = "unknown";

/// Pending and invoiced price sums.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct InvoiceTotals {
    /// Sum of prices where `invoiced = false`
    pub pending: Decimal,
    /// Sum of prices where `invoiced = true`
    pub invoiced: Decimal,
    pub case_count: usize,
}

impl InvoiceTotals {
    fn add(&mut self, case: &Case) {
        if case.invoiced {
            self.invoiced += case.price;
        } else {
            self.pending += case.price;
        }
        self.case_count += 1;
    }

    pub fn total(&self) -> Decimal {
        self.pending + self.invoiced
    }
}

/// Totals for one referring doctor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DoctorInvoiceTotals {
    pub doctor_id: String,
    pub doctor_name: Option<String>,
    pub totals: InvoiceTotals,
}

/// Pending/invoiced sums overall, by creation month and by doctor.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct InvoiceSummary {
    pub overall: InvoiceTotals,
    /// Keyed by `YYYY-MM` of creation, ascending
    pub by_month: BTreeMap<String, InvoiceTotals>,
    /// Keyed by doctor id
    pub by_doctor: BTreeMap<String, DoctorInvoiceTotals>,
}

/// Aggregate prices over `cases`.
pub fn summarize_invoices(cases: &[Case]) -> InvoiceSummary {
    let mut summary = InvoiceSummary::default();

    for case in cases {
        summary.overall.add(case);

        let month = case.created_month().unwrap_or_else(|| UNKNOWN_MONTH.to_string());
        summary.by_month.entry(month).or_default().add(case);

        summary
            .by_doctor
            .entry(case.doctor_id.clone())
            .or_insert_with(|| DoctorInvoiceTotals {
                doctor_id: case.doctor_id.clone(),
                doctor_name: case.doctor_name.clone(),
                totals: InvoiceTotals::default(),
            })
            .totals
            .add(case);
    }

    summary
}
