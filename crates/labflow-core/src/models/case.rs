//! Case models: the production record a lab tracks from intake to shipment.

use std::fmt;

use chrono::NaiveDate;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

/// Prefix of every human-facing case number (`C-<n>`).
pub const CASE_NUMBER_PREFIX: &str = "C-";

/// Shade used when the intake form leaves it blank.
pub const DEFAULT_SHADE: &str = "A2";

/// Production status of a case.
///
/// Declaration order is the workflow order and the precedence list views
/// use after the rush flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaseStatus {
    /// Case has arrived at the lab
    Received,
    /// A technician is working on it
    InProgress,
    /// Awaiting quality check
    QualityCheck,
    /// Finished, waiting for pickup
    Ready,
    /// Left the lab
    Shipped,
}

impl CaseStatus {
    /// All statuses in workflow order.
    pub const ALL: [CaseStatus; 5] = [
        CaseStatus::Received,
        CaseStatus::InProgress,
        CaseStatus::QualityCheck,
        CaseStatus::Ready,
        CaseStatus::Shipped,
    ];

    /// Database string representation.
    pub fn as_str(self) -> &'static str {
        match self {
            CaseStatus::Received => "received",
            CaseStatus::InProgress => "in_progress",
            CaseStatus::QualityCheck => "quality_check",
            CaseStatus::Ready => "ready",
            CaseStatus::Shipped => "shipped",
        }
    }

    /// Parse from database string representation.
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "received" => Some(CaseStatus::Received),
            "in_progress" => Some(CaseStatus::InProgress),
            "quality_check" => Some(CaseStatus::QualityCheck),
            "ready" => Some(CaseStatus::Ready),
            "shipped" => Some(CaseStatus::Shipped),
            _ => None,
        }
    }

    /// Human-facing label.
    pub fn label(self) -> &'static str {
        match self {
            CaseStatus::Received => "Received",
            CaseStatus::InProgress => "In Progress",
            CaseStatus::QualityCheck => "QC Check",
            CaseStatus::Ready => "Ready",
            CaseStatus::Shipped => "Shipped",
        }
    }

    /// Position in the workflow, starting at 0.
    pub fn rank(self) -> usize {
        self as usize
    }

    /// The status one step forward, if any.
    pub fn next(self) -> Option<Self> {
        Self::ALL.get(self.rank() + 1).copied()
    }

    /// The status one step backward, if moving back from here is allowed.
    ///
    /// Only `quality_check`, `ready` and `shipped` can move back; a case that
    /// has been started is never returned to `received`.
    pub fn previous(self) -> Option<Self> {
        match self {
            CaseStatus::QualityCheck => Some(CaseStatus::InProgress),
            CaseStatus::Ready => Some(CaseStatus::QualityCheck),
            CaseStatus::Shipped => Some(CaseStatus::Ready),
            CaseStatus::Received | CaseStatus::InProgress => None,
        }
    }
}

impl fmt::Display for CaseStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Shipment metadata required when a case moves to `shipped`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ShippingInfo {
    /// Carrier name (e.g. "UPS", "FedEx")
    pub carrier: String,
    /// Carrier tracking number
    pub tracking_number: String,
}

impl ShippingInfo {
    pub fn new(carrier: impl Into<String>, tracking_number: impl Into<String>) -> Self {
        Self {
            carrier: carrier.into(),
            tracking_number: tracking_number.into(),
        }
    }

    /// Both fields present after trimming.
    pub fn is_complete(&self) -> bool {
        !self.carrier.trim().is_empty() && !self.tracking_number.trim().is_empty()
    }
}

/// A production case.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Case {
    /// Surrogate ID (UUID)
    pub id: String,
    /// Human-facing number, `C-<n>`, assigned by the store on insert
    pub case_number: String,
    /// Patient name
    pub patient: String,
    /// Referring doctor
    pub doctor_id: String,
    /// Referring doctor's name (joined on read)
    pub doctor_name: Option<String>,
    /// Restoration type, normally drawn from the restoration catalog
    pub restoration_type: String,
    /// Tooth shade (e.g. "A2")
    pub shade: String,
    /// Due date, `YYYY-MM-DD`
    pub due: String,
    /// Rush flag
    pub rush: bool,
    /// Free-text notes
    pub notes: Option<String>,
    /// Price charged to the practice
    pub price: Decimal,
    /// Whether the case has been billed
    pub invoiced: bool,
    /// Workflow status
    pub status: CaseStatus,
    /// Set iff status is `shipped`
    pub shipping_carrier: Option<String>,
    /// Set only while status is `shipped`
    pub tracking_number: Option<String>,
    /// Set iff status is `shipped`
    pub shipped_at: Option<String>,
    /// Creation timestamp
    pub created_at: String,
    /// Last update timestamp
    pub updated_at: String,
}

impl Case {
    /// Whether the shipment fields agree with the status.
    pub fn shipment_consistent(&self) -> bool {
        let shipped = self.status == CaseStatus::Shipped;
        shipped == self.shipped_at.is_some()
            && shipped == self.shipping_carrier.is_some()
            && (shipped || self.tracking_number.is_none())
    }

    /// Numeric part of the case number, if well-formed.
    pub fn sequence(&self) -> Option<i64> {
        parse_case_number(&self.case_number)
    }

    /// Due date as a calendar date.
    pub fn due_date(&self) -> Option<NaiveDate> {
        NaiveDate::parse_from_str(&self.due, "%Y-%m-%d").ok()
    }

    /// Not shipped and past its due date.
    pub fn is_overdue(&self, today: NaiveDate) -> bool {
        self.status != CaseStatus::Shipped && self.due_date().is_some_and(|due| due < today)
    }

    /// `YYYY-MM` bucket of the creation timestamp.
    pub fn created_month(&self) -> Option<String> {
        chrono::DateTime::parse_from_rfc3339(&self.created_at)
            .ok()
            .map(|ts| ts.format("%Y-%m").to_string())
    }
}

/// Fields supplied by lab staff when creating a case.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NewCase {
    pub patient: String,
    pub doctor_id: String,
    pub restoration_type: String,
    /// Blank falls back to [`DEFAULT_SHADE`]
    pub shade: Option<String>,
    pub due: String,
    pub rush: bool,
    pub notes: Option<String>,
    pub price: Decimal,
}

impl NewCase {
    /// Create intake data with required fields; zero price, no notes.
    pub fn new(patient: String, doctor_id: String, restoration_type: String, due: String) -> Self {
        Self {
            patient,
            doctor_id,
            restoration_type,
            shade: None,
            due,
            rush: false,
            notes: None,
            price: Decimal::ZERO,
        }
    }
}

/// Direct field edits from the case edit form.
///
/// `price` is `None` when the editor cannot see financials.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CaseEdit {
    pub patient: String,
    pub doctor_id: String,
    pub restoration_type: String,
    pub shade: String,
    pub due: String,
    pub rush: bool,
    pub notes: Option<String>,
    pub price: Option<Decimal>,
}

impl CaseEdit {
    /// Start an edit from the current values of a case.
    pub fn from_case(case: &Case) -> Self {
        Self {
            patient: case.patient.clone(),
            doctor_id: case.doctor_id.clone(),
            restoration_type: case.restoration_type.clone(),
            shade: case.shade.clone(),
            due: case.due.clone(),
            rush: case.rush,
            notes: case.notes.clone(),
            price: Some(case.price),
        }
    }
}

/// Format a sequence number as a case number.
pub fn format_case_number(sequence: i64) -> String {
    format!("{}{}", CASE_NUMBER_PREFIX, sequence)
}

/// Parse the numeric part of a `C-<n>` case number.
pub fn parse_case_number(case_number: &str) -> Option<i64> {
    case_number
        .strip_prefix(CASE_NUMBER_PREFIX)
        .and_then(|n| n.parse().ok())
}

/// Round a price to cents; `None` if negative.
pub fn normalize_price(price: Decimal) -> Option<Decimal> {
    if price.is_sign_negative() && !price.is_zero() {
        None
    } else {
        Some(price.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero))
    }
}

/// Check a `YYYY-MM-DD` date string.
pub fn is_valid_due_date(due: &str) -> bool {
    NaiveDate::parse_from_str(due, "%Y-%m-%d").is_ok()
}
