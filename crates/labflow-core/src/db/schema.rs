//! SQLite schema definition.

/// Complete database schema for LabFlow.
pub const SCHEMA: &str = r#"
-- Enable foreign keys
PRAGMA foreign_keys = ON;

-- ============================================================================
-- Lab Staff
-- ============================================================================

CREATE TABLE IF NOT EXISTS lab_staff (
    user_id TEXT PRIMARY KEY,
    display_name TEXT NOT NULL,
    role TEXT NOT NULL CHECK (role IN ('admin', 'tech')),
    created_at TEXT NOT NULL DEFAULT (datetime('now'))
);

-- ============================================================================
-- Doctors
-- ============================================================================

CREATE TABLE IF NOT EXISTS doctors (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    practice TEXT NOT NULL DEFAULT '',
    email TEXT,
    phone TEXT,
    auth_user_id TEXT UNIQUE,                    -- NULL until the portal claim
    created_at TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE INDEX IF NOT EXISTS idx_doctors_email ON doctors(email);
CREATE INDEX IF NOT EXISTS idx_doctors_name ON doctors(name);

-- ============================================================================
-- Cases
-- ============================================================================

-- Lab-scoped case numbering (single row, bumped inside the insert transaction)
CREATE TABLE IF NOT EXISTS case_sequence (
    id INTEGER PRIMARY KEY CHECK (id = 1),
    last_value INTEGER NOT NULL DEFAULT 0
);

INSERT OR IGNORE INTO case_sequence (id, last_value) VALUES (1, 0);

CREATE TABLE IF NOT EXISTS cases (
    id TEXT PRIMARY KEY,
    case_number TEXT NOT NULL UNIQUE,
    patient TEXT NOT NULL,
    doctor_id TEXT NOT NULL REFERENCES doctors(id),
    restoration_type TEXT NOT NULL,
    shade TEXT NOT NULL DEFAULT 'A2',
    due TEXT NOT NULL,                           -- YYYY-MM-DD
    rush INTEGER NOT NULL DEFAULT 0,
    notes TEXT,
    price TEXT NOT NULL DEFAULT '0',             -- decimal text
    invoiced INTEGER NOT NULL DEFAULT 0,
    status TEXT NOT NULL DEFAULT 'received'
        CHECK (status IN ('received', 'in_progress', 'quality_check', 'ready', 'shipped')),
    shipping_carrier TEXT,
    tracking_number TEXT,
    shipped_at TEXT,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    -- Shipment fields exist iff the case is shipped
    CHECK ((status = 'shipped') = (shipped_at IS NOT NULL)),
    CHECK ((status = 'shipped') = (shipping_carrier IS NOT NULL)),
    CHECK (status = 'shipped' OR tracking_number IS NULL)
);

CREATE INDEX IF NOT EXISTS idx_cases_doctor ON cases(doctor_id);
CREATE INDEX IF NOT EXISTS idx_cases_status ON cases(status);
CREATE INDEX IF NOT EXISTS idx_cases_due ON cases(due);

-- ============================================================================
-- Materials & Ledger
-- ============================================================================

CREATE TABLE IF NOT EXISTS materials (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    sku TEXT NOT NULL DEFAULT '',
    category TEXT NOT NULL DEFAULT '',
    unit TEXT NOT NULL DEFAULT 'pcs',
    quantity TEXT NOT NULL DEFAULT '0',          -- decimal text
    reorder_level TEXT NOT NULL DEFAULT '0',
    unit_cost TEXT NOT NULL DEFAULT '0',
    supplier TEXT NOT NULL DEFAULT '',
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_materials_name ON materials(name);

-- Rows are only created by attach and removed by detach; never edited
CREATE TABLE IF NOT EXISTS case_materials (
    id TEXT PRIMARY KEY,
    case_id TEXT NOT NULL REFERENCES cases(id),
    material_id TEXT NOT NULL REFERENCES materials(id),
    quantity_used TEXT NOT NULL,                 -- decimal text, > 0
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_case_materials_case ON case_materials(case_id);
CREATE INDEX IF NOT EXISTS idx_case_materials_material ON case_materials(material_id);

-- ============================================================================
-- Activity Log (Append-Only)
-- ============================================================================

CREATE TABLE IF NOT EXISTS activity_log (
    id TEXT PRIMARY KEY,
    case_id TEXT REFERENCES cases(id) ON DELETE SET NULL,
    user_id TEXT NOT NULL,
    user_name TEXT NOT NULL,
    action TEXT NOT NULL,
    details TEXT NOT NULL DEFAULT '{}',          -- JSON object
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_activity_case ON activity_log(case_id);
CREATE INDEX IF NOT EXISTS idx_activity_created ON activity_log(created_at);

CREATE TRIGGER IF NOT EXISTS activity_log_no_update BEFORE UPDATE OF action, user_id, created_at ON activity_log
BEGIN
    SELECT RAISE(ABORT, 'Activity log entries are immutable');
END;
"#;
