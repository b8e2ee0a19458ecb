//! LabFlow Core Library
//!
//! Case lifecycle and role-scoped ledger for a dental laboratory.
//!
//! # Architecture
//!
//! ```text
//!   UI / API layer ──user_id──▶ resolve_viewer ──▶ Viewer (admin | tech | doctor)
//!                                                     │
//!              ┌──────────────────┬───────────────────┼───────────────────┐
//!              ▼                  ▼                   ▼                   ▼
//!        StatusEngine       MaterialLedger      Role Projection   InvoiceReconciler
//!   received → … → shipped   attach / detach    row + field cut    toggle / totals
//!              │                  │                   │                   │
//!              └────────── BEGIN IMMEDIATE ───────────┴───────────────────┘
//!                                 │
//!                          SQLite (Database)
//!                                 │
//!                     audit sink (best effort) ──▶ activity_log
//! ```
//!
//! # Core Principle
//!
//! **The viewer is resolved from the store on every call.** Row scope and
//! field cuts are applied before data leaves the core, never in rendering.
//!
//! # Modules
//!
//! - [`db`]: SQLite store, schema and the atomic ledger procedures
//! - [`models`]: Domain types (Case, Doctor, Material, Viewer, etc.)
//! - [`workflow`]: Status engine, material ledger, case registry
//! - [`access`]: Viewer resolution, projection, scoped reads, registration
//! - [`billing`]: Invoice flag and aggregation
//! - [`catalog`]: Restoration type catalog

pub mod access;
pub mod audit;
pub mod billing;
pub mod catalog;
pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod workflow;

// Re-export commonly used types
pub use access::{
    get_case_for, list_cases_for, project_case, project_case_list, resolve_viewer, CaseQuery,
    ProjectedCase, SortColumn, SortDirection,
};
pub use audit::{AuditSink, AuditError};
pub use billing::{InvoiceReconciler, InvoiceSummary, InvoiceTotals};
pub use catalog::RestorationCatalog;
pub use config::{LabConfig, StockPolicy};
pub use db::Database;
pub use error::{LabError, LabResult};
pub use models::{
    ActivityLogEntry, Case, CaseEdit, CaseMaterial, CaseStatus, Doctor, Material, NewCase, Role,
    ShippingInfo, Viewer,
};
pub use workflow::{CaseRegistry, MaterialLedger, StatusEngine};

// UniFFI setup - using proc macros
uniffi::setup_scaffolding!();

use std::str::FromStr;
use std::sync::{Arc, Mutex};

use rust_decimal::Decimal;
use tracing_subscriber::EnvFilter;

/// Install the global `tracing` subscriber.
///
/// `RUST_LOG` wins over `filter`. Returns `false` if a subscriber was
/// already installed.
pub fn init_logging(filter: &str) -> bool {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .try_init()
        .is_ok()
}

// =========================================================================
// FFI Error Type
// =========================================================================

#[derive(Debug, thiserror::Error, uniffi::Error)]
pub enum LabFlowError {
    #[error("Invalid transition: {0}")]
    InvalidTransition(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Insufficient authorization: {0}")]
    InsufficientAuthorization(String),

    #[error("Constraint violation: {0}")]
    ConstraintViolation(String),

    #[error("Concurrency conflict: {0}")]
    ConcurrencyConflict(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl From<LabError> for LabFlowError {
    fn from(e: LabError) -> Self {
        match e {
            LabError::InvalidTransition(msg) => LabFlowError::InvalidTransition(msg),
            LabError::NotFound(msg) => LabFlowError::NotFound(msg),
            LabError::InsufficientAuthorization(msg) => LabFlowError::InsufficientAuthorization(msg),
            LabError::ConstraintViolation(msg) => LabFlowError::ConstraintViolation(msg),
            LabError::ConcurrencyConflict(msg) => LabFlowError::ConcurrencyConflict(msg),
            LabError::Validation(msg) => LabFlowError::InvalidInput(msg),
            LabError::Database(e) => LabFlowError::DatabaseError(e.to_string()),
        }
    }
}

impl From<db::DbError> for LabFlowError {
    fn from(e: db::DbError) -> Self {
        LabError::from(e).into()
    }
}

impl From<config::ConfigError> for LabFlowError {
    fn from(e: config::ConfigError) -> Self {
        LabFlowError::InvalidInput(e.to_string())
    }
}

impl From<serde_json::Error> for LabFlowError {
    fn from(e: serde_json::Error) -> Self {
        LabFlowError::SerializationError(e.to_string())
    }
}

impl<T> From<std::sync::PoisonError<T>> for LabFlowError {
    fn from(e: std::sync::PoisonError<T>) -> Self {
        LabFlowError::DatabaseError(format!("Lock poisoned: {}", e))
    }
}

// =========================================================================
// Factory Functions (exported to FFI)
// =========================================================================

/// Open or create a lab database at the given path with default settings.
#[uniffi::export]
pub fn open_lab(path: String) -> Result<Arc<LabFlowCore>, LabFlowError> {
    let config = LabConfig {
        database_path: path.into(),
        ..LabConfig::default()
    };
    LabFlowCore::from_config(config)
}

/// Open a lab from a JSON configuration document.
#[uniffi::export]
pub fn open_lab_with_config(config_json: String) -> Result<Arc<LabFlowCore>, LabFlowError> {
    let config = LabConfig::from_json_str(&config_json)?;
    init_logging(&config.log_filter);
    LabFlowCore::from_config(config)
}

/// Create an in-memory lab (for testing).
#[uniffi::export]
pub fn open_lab_in_memory() -> Result<Arc<LabFlowCore>, LabFlowError> {
    let db = Database::open_in_memory()?;
    Ok(Arc::new(LabFlowCore {
        db: Arc::new(Mutex::new(db)),
        stock_policy: StockPolicy::default(),
    }))
}

/// The restoration catalog, grouped for the intake form.
#[uniffi::export]
pub fn restoration_catalog() -> Vec<FfiRestorationGroup> {
    RestorationCatalog::default()
        .groups()
        .iter()
        .map(|group| FfiRestorationGroup {
            name: group.name.to_string(),
            types: group.types.iter().map(|t| t.to_string()).collect(),
        })
        .collect()
}

// =========================================================================
// Main API Object
// =========================================================================

/// Thread-safe lab handle for FFI.
///
/// Every method takes the caller's `user_id` and resolves the viewer from
/// the store before doing anything else.
#[derive(uniffi::Object)]
pub struct LabFlowCore {
    db: Arc<Mutex<Database>>,
    stock_policy: StockPolicy,
}

impl LabFlowCore {
    fn from_config(config: LabConfig) -> Result<Arc<Self>, LabFlowError> {
        let db = Database::open_with_config(&config)?;
        tracing::info!(path = %config.database_path.display(), "Lab database opened");
        Ok(Arc::new(Self {
            db: Arc::new(Mutex::new(db)),
            stock_policy: config.stock_policy,
        }))
    }
}

#[uniffi::export]
impl LabFlowCore {
    // =========================================================================
    // Identity
    // =========================================================================

    /// Resolve the role behind an identity.
    pub fn whoami(&self, user_id: String) -> Result<FfiViewer, LabFlowError> {
        let db = self.db.lock()?;
        Ok(resolve_viewer(&db, &user_id)?.into())
    }

    /// Add or update a lab staff member. Admin only, except that the first
    /// admin of an empty staff directory may be added by anyone.
    pub fn add_staff(
        &self,
        user_id: String,
        staff_user_id: String,
        display_name: String,
        role: String,
    ) -> Result<(), LabFlowError> {
        let db = self.db.lock()?;
        let role = parse_role(&role)?;
        if role == Role::Admin && db.bootstrap_admin(&staff_user_id, &display_name)? {
            tracing::info!(user_id = %staff_user_id, "First lab admin added");
            return Ok(());
        }

        let viewer = resolve_viewer(&db, &user_id)?;
        access::require_admin(&viewer, "manage staff")?;
        db.insert_staff(&staff_user_id, &display_name, role)?;
        Ok(())
    }

    /// Whether an email can be used to register a portal account.
    pub fn can_register(&self, email: String) -> Result<bool, LabFlowError> {
        let db = self.db.lock()?;
        Ok(access::can_register(&db, &email)?)
    }

    /// Link a portal identity to the doctor record with this email.
    pub fn claim_doctor_account(
        &self,
        email: String,
        auth_user_id: String,
    ) -> Result<FfiDoctor, LabFlowError> {
        let db = self.db.lock()?;
        Ok(access::claim_doctor_account(&db, &*db, &email, &auth_user_id)?.into())
    }

    // =========================================================================
    // Case Operations
    // =========================================================================

    pub fn create_case(&self, user_id: String, new_case: FfiNewCase) -> Result<FfiCase, LabFlowError> {
        let db = self.db.lock()?;
        let viewer = resolve_viewer(&db, &user_id)?;
        let new_case = NewCase::try_from(new_case)?;
        let case = CaseRegistry::new(&db).create_case(&viewer, &new_case)?;
        Ok(FfiCase::project(&case, viewer.role))
    }

    pub fn update_case(
        &self,
        user_id: String,
        case_id: String,
        edit: FfiCaseEdit,
    ) -> Result<FfiCase, LabFlowError> {
        let db = self.db.lock()?;
        let viewer = resolve_viewer(&db, &user_id)?;
        let edit = CaseEdit::try_from(edit)?;
        let case = CaseRegistry::new(&db).update_case(&viewer, &case_id, &edit)?;
        Ok(FfiCase::project(&case, viewer.role))
    }

    pub fn delete_case(&self, user_id: String, case_id: String) -> Result<(), LabFlowError> {
        let db = self.db.lock()?;
        let viewer = resolve_viewer(&db, &user_id)?;
        CaseRegistry::new(&db).delete_case(&viewer, &case_id)?;
        Ok(())
    }

    /// Read one case through the caller's scope.
    pub fn get_case(&self, user_id: String, case_id: String) -> Result<FfiCase, LabFlowError> {
        let db = self.db.lock()?;
        let viewer = resolve_viewer(&db, &user_id)?;
        Ok(get_case_for(&db, &viewer, &case_id)?.into())
    }

    /// List cases visible to the caller.
    pub fn list_cases(&self, user_id: String, query: FfiCaseQuery) -> Result<Vec<FfiCase>, LabFlowError> {
        let db = self.db.lock()?;
        let viewer = resolve_viewer(&db, &user_id)?;
        let query = CaseQuery::try_from(query)?;
        let cases = list_cases_for(&db, &viewer, &query)?;
        Ok(cases.into_iter().map(Into::into).collect())
    }

    /// Shipped cases, newest first.
    pub fn shipping_log(&self, user_id: String, within_days: Option<u32>) -> Result<Vec<FfiCase>, LabFlowError> {
        let db = self.db.lock()?;
        let viewer = resolve_viewer(&db, &user_id)?;
        let cases = access::shipping_log_for(&db, &viewer, within_days)?;
        Ok(cases.into_iter().map(Into::into).collect())
    }

    // =========================================================================
    // Status Operations
    // =========================================================================
    //
    // `expected_status` is the status the caller last saw; a mismatch with
    // the store is a concurrency conflict.

    pub fn advance_case(
        &self,
        user_id: String,
        case_id: String,
        expected_status: String,
        shipping: Option<FfiShippingInfo>,
    ) -> Result<FfiCase, LabFlowError> {
        let db = self.db.lock()?;
        let viewer = resolve_viewer(&db, &user_id)?;
        let case = load_expected(&db, &case_id, &expected_status)?;
        let moved = StatusEngine::new(&db).advance(&viewer, &case, shipping.map(Into::into))?;
        Ok(FfiCase::project(&moved, viewer.role))
    }

    pub fn retreat_case(
        &self,
        user_id: String,
        case_id: String,
        expected_status: String,
    ) -> Result<FfiCase, LabFlowError> {
        let db = self.db.lock()?;
        let viewer = resolve_viewer(&db, &user_id)?;
        let case = load_expected(&db, &case_id, &expected_status)?;
        let moved = StatusEngine::new(&db).retreat(&viewer, &case)?;
        Ok(FfiCase::project(&moved, viewer.role))
    }

    pub fn set_case_status(
        &self,
        user_id: String,
        case_id: String,
        expected_status: String,
        status: String,
        shipping: Option<FfiShippingInfo>,
    ) -> Result<FfiCase, LabFlowError> {
        let db = self.db.lock()?;
        let viewer = resolve_viewer(&db, &user_id)?;
        let case = load_expected(&db, &case_id, &expected_status)?;
        let status = parse_status(&status)?;
        let moved = StatusEngine::new(&db).set_status(&viewer, &case, status, shipping.map(Into::into))?;
        Ok(FfiCase::project(&moved, viewer.role))
    }

    // =========================================================================
    // Material Operations
    // =========================================================================

    pub fn attach_material(
        &self,
        user_id: String,
        case_id: String,
        material_id: String,
        quantity: String,
    ) -> Result<FfiCaseMaterial, LabFlowError> {
        let db = self.db.lock()?;
        let viewer = resolve_viewer(&db, &user_id)?;
        let quantity = parse_decimal("quantity", &quantity)?;
        let link = MaterialLedger::new(&db, self.stock_policy).attach(&viewer, &case_id, &material_id, quantity)?;
        Ok(link.into())
    }

    pub fn detach_material(&self, user_id: String, case_material_id: String) -> Result<(), LabFlowError> {
        let db = self.db.lock()?;
        let viewer = resolve_viewer(&db, &user_id)?;
        MaterialLedger::new(&db, self.stock_policy).detach(&viewer, &case_material_id)?;
        Ok(())
    }

    pub fn list_case_materials(&self, user_id: String, case_id: String) -> Result<Vec<FfiCaseMaterial>, LabFlowError> {
        let db = self.db.lock()?;
        let viewer = resolve_viewer(&db, &user_id)?;
        let links = MaterialLedger::new(&db, self.stock_policy).case_materials(&viewer, &case_id)?;
        Ok(links.into_iter().map(Into::into).collect())
    }

    pub fn create_material(&self, user_id: String, material: FfiMaterial) -> Result<FfiMaterial, LabFlowError> {
        let db = self.db.lock()?;
        let viewer = resolve_viewer(&db, &user_id)?;
        let mut created = Material::try_from(material)?;
        created.id = uuid::Uuid::new_v4().to_string();
        MaterialLedger::new(&db, self.stock_policy).create_material(&viewer, &created)?;
        Ok(created.into())
    }

    pub fn update_material(&self, user_id: String, material: FfiMaterial) -> Result<FfiMaterial, LabFlowError> {
        let db = self.db.lock()?;
        let viewer = resolve_viewer(&db, &user_id)?;
        let material = Material::try_from(material)?;
        Ok(MaterialLedger::new(&db, self.stock_policy)
            .update_material(&viewer, &material)?
            .into())
    }

    pub fn delete_material(&self, user_id: String, material_id: String) -> Result<(), LabFlowError> {
        let db = self.db.lock()?;
        let viewer = resolve_viewer(&db, &user_id)?;
        MaterialLedger::new(&db, self.stock_policy).delete_material(&viewer, &material_id)?;
        Ok(())
    }

    pub fn list_materials(&self, user_id: String) -> Result<Vec<FfiMaterial>, LabFlowError> {
        let db = self.db.lock()?;
        let viewer = resolve_viewer(&db, &user_id)?;
        let materials = MaterialLedger::new(&db, self.stock_policy).list_materials(&viewer)?;
        Ok(materials.into_iter().map(Into::into).collect())
    }

    pub fn low_stock_materials(&self, user_id: String) -> Result<Vec<FfiMaterial>, LabFlowError> {
        let db = self.db.lock()?;
        let viewer = resolve_viewer(&db, &user_id)?;
        let materials = MaterialLedger::new(&db, self.stock_policy).low_stock(&viewer)?;
        Ok(materials.into_iter().map(Into::into).collect())
    }

    /// Value of stock on hand, as a decimal string.
    pub fn inventory_value(&self, user_id: String) -> Result<String, LabFlowError> {
        let db = self.db.lock()?;
        let viewer = resolve_viewer(&db, &user_id)?;
        let value = MaterialLedger::new(&db, self.stock_policy).inventory_value(&viewer)?;
        Ok(value.round_dp(2).to_string())
    }

    // =========================================================================
    // Doctor Operations
    // =========================================================================

    pub fn create_doctor(
        &self,
        user_id: String,
        name: String,
        practice: String,
        email: Option<String>,
        phone: Option<String>,
    ) -> Result<FfiDoctor, LabFlowError> {
        let db = self.db.lock()?;
        let viewer = resolve_viewer(&db, &user_id)?;
        let mut doctor = Doctor::new(name, practice);
        doctor.email = email;
        doctor.phone = phone;
        CaseRegistry::new(&db).create_doctor(&viewer, &doctor)?;
        Ok(doctor.into())
    }

    pub fn update_doctor(&self, user_id: String, doctor: FfiDoctor) -> Result<FfiDoctor, LabFlowError> {
        let db = self.db.lock()?;
        let viewer = resolve_viewer(&db, &user_id)?;
        let registry = CaseRegistry::new(&db);
        let mut current = registry.get_doctor(&viewer, &doctor.id)?;
        current.name = doctor.name;
        current.practice = doctor.practice;
        current.email = doctor.email;
        current.phone = doctor.phone;
        Ok(registry.update_doctor(&viewer, &current)?.into())
    }

    pub fn delete_doctor(&self, user_id: String, doctor_id: String) -> Result<(), LabFlowError> {
        let db = self.db.lock()?;
        let viewer = resolve_viewer(&db, &user_id)?;
        CaseRegistry::new(&db).delete_doctor(&viewer, &doctor_id)?;
        Ok(())
    }

    pub fn list_doctors(&self, user_id: String) -> Result<Vec<FfiDoctor>, LabFlowError> {
        let db = self.db.lock()?;
        let viewer = resolve_viewer(&db, &user_id)?;
        let doctors = CaseRegistry::new(&db).list_doctors(&viewer)?;
        Ok(doctors.into_iter().map(Into::into).collect())
    }

    // =========================================================================
    // Invoice Operations
    // =========================================================================

    pub fn toggle_invoiced(&self, user_id: String, case_id: String) -> Result<FfiCase, LabFlowError> {
        let db = self.db.lock()?;
        let viewer = resolve_viewer(&db, &user_id)?;
        let case = InvoiceReconciler::new(&db).toggle_invoiced(&viewer, &case_id)?;
        Ok(FfiCase::project(&case, viewer.role))
    }

    /// Cases of one doctor awaiting an invoice.
    pub fn pending_invoice_cases(&self, user_id: String, doctor_id: String) -> Result<Vec<FfiCase>, LabFlowError> {
        let db = self.db.lock()?;
        let viewer = resolve_viewer(&db, &user_id)?;
        let cases = InvoiceReconciler::new(&db).pending_cases(&viewer, &doctor_id)?;
        Ok(cases.iter().map(|case| FfiCase::project(case, viewer.role)).collect())
    }

    pub fn doctors_with_pending_invoices(&self, user_id: String) -> Result<Vec<FfiPendingInvoice>, LabFlowError> {
        let db = self.db.lock()?;
        let viewer = resolve_viewer(&db, &user_id)?;
        let pending = InvoiceReconciler::new(&db).doctors_with_pending(&viewer)?;
        Ok(pending.into_iter().map(Into::into).collect())
    }

    /// Pending/invoiced totals by month and doctor as JSON.
    pub fn invoice_summary_json(&self, user_id: String) -> Result<String, LabFlowError> {
        let db = self.db.lock()?;
        let viewer = resolve_viewer(&db, &user_id)?;
        let summary = InvoiceReconciler::new(&db).summary(&viewer)?;
        Ok(serde_json::to_string(&summary)?)
    }

    // =========================================================================
    // Activity
    // =========================================================================

    pub fn activity_feed(
        &self,
        user_id: String,
        case_id: Option<String>,
        limit: u32,
    ) -> Result<Vec<FfiActivityEntry>, LabFlowError> {
        let db = self.db.lock()?;
        let viewer = resolve_viewer(&db, &user_id)?;
        let entries = access::activity_feed(&db, &viewer, case_id.as_deref(), limit as usize)?;
        Ok(entries.into_iter().map(Into::into).collect())
    }
}

fn load_expected(db: &Database, case_id: &str, expected_status: &str) -> Result<Case, LabFlowError> {
    let mut case = db
        .get_case(case_id)?
        .ok_or_else(|| LabFlowError::NotFound(format!("case {}", case_id)))?;
    case.status = parse_status(expected_status)?;
    Ok(case)
}

fn parse_status(raw: &str) -> Result<CaseStatus, LabFlowError> {
    CaseStatus::from_str(raw).ok_or_else(|| LabFlowError::InvalidInput(format!("Unknown status: {}", raw)))
}

fn parse_role(raw: &str) -> Result<Role, LabFlowError> {
    Role::from_str(raw).ok_or_else(|| LabFlowError::InvalidInput(format!("Unknown role: {}", raw)))
}

fn parse_decimal(field: &str, raw: &str) -> Result<Decimal, LabFlowError> {
    Decimal::from_str(raw.trim())
        .map_err(|e| LabFlowError::InvalidInput(format!("Invalid {}: {} ({})", field, raw, e)))
}

// =========================================================================
// FFI Types
// =========================================================================

/// FFI-safe viewer.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiViewer {
    pub user_id: String,
    pub display_name: String,
    pub role: String,
    pub doctor_id: Option<String>,
}

impl From<Viewer> for FfiViewer {
    fn from(viewer: Viewer) -> Self {
        Self {
            user_id: viewer.user_id,
            display_name: viewer.display_name,
            role: viewer.role.as_str().to_string(),
            doctor_id: viewer.doctor_id,
        }
    }
}

/// FFI-safe projected case. Decimals are strings; financial fields are
/// `None` for roles that may not see them.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiCase {
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
    pub status: String,
    pub status_label: String,
    pub overdue: bool,
    pub shipping_carrier: Option<String>,
    pub tracking_number: Option<String>,
    pub shipped_at: Option<String>,
    pub price: Option<String>,
    pub invoiced: Option<bool>,
    pub created_at: String,
    pub updated_at: String,
}

impl FfiCase {
    fn project(case: &Case, role: Role) -> Self {
        project_case(case, role).into()
    }
}

impl From<ProjectedCase> for FfiCase {
    fn from(case: ProjectedCase) -> Self {
        let today = chrono::Utc::now().date_naive();
        let overdue = case.status != CaseStatus::Shipped
            && chrono::NaiveDate::parse_from_str(&case.due, "%Y-%m-%d").is_ok_and(|due| due < today);
        Self {
            id: case.id,
            case_number: case.case_number,
            patient: case.patient,
            doctor_id: case.doctor_id,
            doctor_name: case.doctor_name,
            restoration_type: case.restoration_type,
            shade: case.shade,
            due: case.due,
            rush: case.rush,
            notes: case.notes,
            status: case.status.as_str().to_string(),
            status_label: case.status.label().to_string(),
            overdue,
            shipping_carrier: case.shipping_carrier,
            tracking_number: case.tracking_number,
            shipped_at: case.shipped_at,
            price: case.price.map(|p| format!("{:.2}", p)),
            invoiced: case.invoiced,
            created_at: case.created_at,
            updated_at: case.updated_at,
        }
    }
}

/// FFI-safe intake data.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiNewCase {
    pub patient: String,
    pub doctor_id: String,
    pub restoration_type: String,
    pub shade: Option<String>,
    pub due: String,
    pub rush: bool,
    pub notes: Option<String>,
    pub price: Option<String>,
}

impl TryFrom<FfiNewCase> for NewCase {
    type Error = LabFlowError;

    fn try_from(input: FfiNewCase) -> Result<Self, Self::Error> {
        let price = match input.price.as_deref() {
            Some(raw) if !raw.trim().is_empty() => parse_decimal("price", raw)?,
            _ => Decimal::ZERO,
        };
        Ok(NewCase {
            patient: input.patient,
            doctor_id: input.doctor_id,
            restoration_type: input.restoration_type,
            shade: input.shade,
            due: input.due,
            rush: input.rush,
            notes: input.notes,
            price,
        })
    }
}

/// FFI-safe case edit. `price` is left `None` by callers without financial
/// visibility.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiCaseEdit {
    pub patient: String,
    pub doctor_id: String,
    pub restoration_type: String,
    pub shade: String,
    pub due: String,
    pub rush: bool,
    pub notes: Option<String>,
    pub price: Option<String>,
}

impl TryFrom<FfiCaseEdit> for CaseEdit {
    type Error = LabFlowError;

    fn try_from(input: FfiCaseEdit) -> Result<Self, Self::Error> {
        Ok(CaseEdit {
            patient: input.patient,
            doctor_id: input.doctor_id,
            restoration_type: input.restoration_type,
            shade: input.shade,
            due: input.due,
            rush: input.rush,
            notes: input.notes,
            price: input.price.as_deref().map(|raw| parse_decimal("price", raw)).transpose()?,
        })
    }
}

/// FFI-safe list view options.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiCaseQuery {
    pub status: Option<String>,
    pub search: Option<String>,
    /// `case_number`, `patient`, `doctor`, `restoration_type`, `status`,
    /// `due` or `price`
    pub sort: Option<String>,
    pub descending: bool,
    pub overdue_only: bool,
}

impl TryFrom<FfiCaseQuery> for CaseQuery {
    type Error = LabFlowError;

    fn try_from(input: FfiCaseQuery) -> Result<Self, Self::Error> {
        let sort = match input.sort.as_deref() {
            None => SortColumn::default(),
            Some(raw) => serde_json::from_value(serde_json::Value::String(raw.to_string()))
                .map_err(|_| LabFlowError::InvalidInput(format!("Unknown sort column: {}", raw)))?,
        };
        Ok(CaseQuery {
            status: input.status.as_deref().map(parse_status).transpose()?,
            search: input.search,
            sort,
            direction: if input.descending {
                SortDirection::Desc
            } else {
                SortDirection::Asc
            },
            overdue_on: input.overdue_only.then(|| chrono::Utc::now().date_naive()),
        })
    }
}

/// FFI-safe shipment data.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiShippingInfo {
    pub carrier: String,
    pub tracking_number: String,
}

impl From<FfiShippingInfo> for ShippingInfo {
    fn from(info: FfiShippingInfo) -> Self {
        ShippingInfo::new(info.carrier, info.tracking_number)
    }
}

/// FFI-safe doctor.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiDoctor {
    pub id: String,
    pub name: String,
    pub practice: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub portal_linked: bool,
}

impl From<Doctor> for FfiDoctor {
    fn from(doctor: Doctor) -> Self {
        Self {
            portal_linked: doctor.is_linked(),
            id: doctor.id,
            name: doctor.name,
            practice: doctor.practice,
            email: doctor.email,
            phone: doctor.phone,
        }
    }
}

/// FFI-safe material. Decimals are strings.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiMaterial {
    pub id: String,
    pub name: String,
    pub sku: String,
    pub category: String,
    pub unit: String,
    pub quantity: String,
    pub reorder_level: String,
    pub unit_cost: String,
    pub supplier: String,
    pub low_stock: bool,
}

impl From<Material> for FfiMaterial {
    fn from(material: Material) -> Self {
        Self {
            low_stock: material.is_low_stock(),
            id: material.id,
            name: material.name,
            sku: material.sku,
            category: material.category,
            unit: material.unit,
            quantity: material.quantity.to_string(),
            reorder_level: material.reorder_level.to_string(),
            unit_cost: material.unit_cost.to_string(),
            supplier: material.supplier,
        }
    }
}

impl TryFrom<FfiMaterial> for Material {
    type Error = LabFlowError;

    fn try_from(input: FfiMaterial) -> Result<Self, Self::Error> {
        let mut material = Material::new(input.name, input.unit);
        material.id = input.id;
        material.sku = input.sku;
        material.category = input.category;
        material.quantity = parse_decimal("quantity", &input.quantity)?;
        material.reorder_level = parse_decimal("reorder level", &input.reorder_level)?;
        material.unit_cost = parse_decimal("unit cost", &input.unit_cost)?;
        material.supplier = input.supplier;
        Ok(material)
    }
}

/// FFI-safe case-material link.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiCaseMaterial {
    pub id: String,
    pub case_id: String,
    pub material_id: String,
    pub quantity_used: String,
    pub material_name: Option<String>,
    pub material_unit: Option<String>,
    pub created_at: String,
}

impl From<CaseMaterial> for FfiCaseMaterial {
    fn from(link: CaseMaterial) -> Self {
        Self {
            id: link.id,
            case_id: link.case_id,
            material_id: link.material_id,
            quantity_used: link.quantity_used.to_string(),
            material_name: link.material_name,
            material_unit: link.material_unit,
            created_at: link.created_at,
        }
    }
}

/// FFI-safe pending invoice row.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiPendingInvoice {
    pub doctor_id: String,
    pub doctor_name: String,
    pub case_count: u32,
    pub amount: String,
}

impl From<billing::PendingInvoice> for FfiPendingInvoice {
    fn from(pending: billing::PendingInvoice) -> Self {
        Self {
            doctor_id: pending.doctor_id,
            doctor_name: pending.doctor_name,
            case_count: pending.case_count as u32,
            amount: format!("{:.2}", pending.amount),
        }
    }
}

/// FFI-safe activity entry.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiActivityEntry {
    pub id: String,
    pub case_id: Option<String>,
    pub user_id: String,
    pub user_name: String,
    pub action: String,
    pub details_json: String,
    pub created_at: String,
}

impl From<ActivityLogEntry> for FfiActivityEntry {
    fn from(entry: ActivityLogEntry) -> Self {
        Self {
            details_json: entry.details.to_string(),
            id: entry.id,
            case_id: entry.case_id,
            user_id: entry.user_id,
            user_name: entry.user_name,
            action: entry.action,
            created_at: entry.created_at,
        }
    }
}

/// FFI-safe restoration catalog group.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiRestorationGroup {
    pub name: String,
    pub types: Vec<String>,
}
