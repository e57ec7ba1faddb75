//! SQLite schema definition.

/// Complete database schema for the clinic records core.
pub const SCHEMA: &str = r#"
-- Enable foreign keys
PRAGMA foreign_keys = ON;

-- ============================================================================
-- Owners (clients and attending veterinarians)
-- ============================================================================

CREATE TABLE IF NOT EXISTS owners (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    national_id TEXT NOT NULL UNIQUE,
    first_name TEXT NOT NULL,
    last_name TEXT NOT NULL,
    address TEXT NOT NULL,
    landline INTEGER NOT NULL,
    mobile INTEGER NOT NULL,
    email TEXT NOT NULL
);

-- ============================================================================
-- Patients
-- ============================================================================

CREATE TABLE IF NOT EXISTS patients (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    number INTEGER NOT NULL UNIQUE,
    name TEXT NOT NULL,
    species TEXT NOT NULL,
    birth_date TEXT NOT NULL,                     -- RFC 3339
    breed TEXT,
    sex TEXT NOT NULL CHECK (sex IN ('male', 'female')),
    color TEXT NOT NULL,
    category TEXT NOT NULL CHECK (category IN ('resident', 'outpatient')),
    owner_id INTEGER NOT NULL REFERENCES owners(id)
);

CREATE INDEX IF NOT EXISTS idx_patients_owner ON patients(owner_id);

-- ============================================================================
-- Visits and lab tests
-- ============================================================================

CREATE TABLE IF NOT EXISTS visits (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    visit_date TEXT NOT NULL,                     -- RFC 3339
    next_visit TEXT,                              -- RFC 3339
    temperature REAL NOT NULL,
    weight REAL NOT NULL,
    height REAL NOT NULL,
    diagnosis TEXT NOT NULL,
    veterinarian_id INTEGER NOT NULL REFERENCES owners(id),
    patient_id INTEGER NOT NULL REFERENCES patients(id)
);

CREATE INDEX IF NOT EXISTS idx_visits_patient ON visits(patient_id);

CREATE TABLE IF NOT EXISTS lab_tests (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL,
    test_date TEXT NOT NULL,                      -- RFC 3339
    visit_id INTEGER NOT NULL REFERENCES visits(id)
);

-- ============================================================================
-- Child collections (ordered by rowid = append order)
-- ============================================================================

CREATE TABLE IF NOT EXISTS patient_visits (
    patient_id INTEGER NOT NULL REFERENCES patients(id) ON DELETE CASCADE,
    visit_id INTEGER NOT NULL UNIQUE REFERENCES visits(id) ON DELETE CASCADE,
    PRIMARY KEY (patient_id, visit_id)
);

CREATE TABLE IF NOT EXISTS visit_lab_tests (
    visit_id INTEGER NOT NULL REFERENCES visits(id) ON DELETE CASCADE,
    lab_test_id INTEGER NOT NULL UNIQUE REFERENCES lab_tests(id) ON DELETE CASCADE,
    PRIMARY KEY (visit_id, lab_test_id)
);
"#;
