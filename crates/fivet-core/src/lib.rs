//! Fivet Core Library
//!
//! Records core for a veterinary clinic: owners, patients, visits and lab
//! tests, validated on construction and persisted to SQLite.
//!
//! # Architecture
//!
//! ```text
//!   Host app (Swift / Kotlin via UniFFI)
//!                 │
//!            FivetCore
//!                 │
//!          ClinicService ─────────── PatientSearch
//!                 │                        │
//!                 └──── Repository<T, K> ──┘
//!                             │
//!                      SqliteRepository
//!                             │
//!                          Database
//! ```
//!
//! # Modules
//!
//! - [`models`]: Owner, Patient, Visit and LabTest with validating constructors
//! - [`validation`]: National id check digit and contact format rules
//! - [`db`]: SQLite store and the generic repository
//! - [`search`]: Free-text patient search
//! - [`service`]: The clinic records service
//! - [`config`]: Service configuration

pub mod config;
pub mod db;
pub mod models;
pub mod search;
pub mod service;
pub mod validation;

// Re-export commonly used types
pub use config::{ConfigError, DatabaseConfig, ServiceConfig};
pub use db::{Database, DbError, QueryBuilder, Repository, SqliteRepository};
pub use models::{
    Category, Entity, LabTest, LabTestDraft, Owner, OwnerDraft, Patient, PatientDraft, Sex,
    ValidationError, Visit, VisitDraft,
};
pub use search::PatientSearch;
pub use service::{ClinicService, ServiceError};

// UniFFI setup - using proc macros
uniffi::setup_scaffolding!();

use chrono::{DateTime, FixedOffset, Local, Utc};
use std::sync::{Arc, Mutex};

// =========================================================================
// FFI Error Type
// =========================================================================

#[derive(Debug, thiserror::Error, uniffi::Error)]
pub enum FivetError {
    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Invalid format: {0}")]
    InvalidFormat(String),

    #[error("Out of range: {0}")]
    OutOfRange(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Duplicate key: {0}")]
    DuplicateKey(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Config error: {0}")]
    Config(String),
}

impl From<ValidationError> for FivetError {
    fn from(e: ValidationError) -> Self {
        match e {
            ValidationError::MissingField(field) => FivetError::MissingField(field.to_string()),
            ValidationError::InvalidFormat(field) => FivetError::InvalidFormat(field.to_string()),
            ValidationError::OutOfRange { .. } => FivetError::OutOfRange(e.to_string()),
        }
    }
}

impl From<DbError> for FivetError {
    fn from(e: DbError) -> Self {
        match e {
            DbError::DuplicateKey(msg) => FivetError::DuplicateKey(msg),
            DbError::InvalidArgument(msg) => FivetError::InvalidArgument(msg),
            DbError::NotFound(msg) => FivetError::NotFound(msg),
            DbError::Storage(_) => FivetError::Storage(e.to_string()),
        }
    }
}

impl From<ConfigError> for FivetError {
    fn from(e: ConfigError) -> Self {
        FivetError::Config(e.to_string())
    }
}

impl From<ServiceError> for FivetError {
    fn from(e: ServiceError) -> Self {
        match e {
            ServiceError::Validation(e) => e.into(),
            ServiceError::Db(e) => e.into(),
            ServiceError::Config(e) => e.into(),
        }
    }
}

impl<T> From<std::sync::PoisonError<T>> for FivetError {
    fn from(e: std::sync::PoisonError<T>) -> Self {
        FivetError::Storage(format!("Lock poisoned: {}", e))
    }
}

// =========================================================================
// Factory Functions (exported to FFI)
// =========================================================================

/// Open or create a database at the given path.
#[uniffi::export]
pub fn open_database(path: String) -> Result<Arc<FivetCore>, FivetError> {
    FivetCore::open(ServiceConfig::file(path))
}

/// Create an in-memory database (for testing).
#[uniffi::export]
pub fn open_database_in_memory() -> Result<Arc<FivetCore>, FivetError> {
    FivetCore::open(ServiceConfig::in_memory())
}

/// Open the store described by a JSON service config.
#[uniffi::export]
pub fn open_with_config_json(json: String) -> Result<Arc<FivetCore>, FivetError> {
    FivetCore::open(ServiceConfig::from_json_str(&json)?)
}

/// Open the store configured by `FIVET_DATABASE__*` variables, in memory when unset.
#[uniffi::export]
pub fn open_from_env() -> Result<Arc<FivetCore>, FivetError> {
    FivetCore::open(ServiceConfig::from_env()?)
}

/// Check a national id against its check digit.
#[uniffi::export]
pub fn is_valid_national_id(id: String) -> bool {
    validation::is_valid_id(&id)
}

// =========================================================================
// Main API Object
// =========================================================================

/// Thread-safe service wrapper for FFI.
#[derive(uniffi::Object)]
pub struct FivetCore {
    service: Arc<Mutex<ClinicService>>,
}

impl FivetCore {
    fn open(config: ServiceConfig) -> Result<Arc<Self>, FivetError> {
        let service = ClinicService::open(config)?;
        Ok(Arc::new(Self {
            service: Arc::new(Mutex::new(service)),
        }))
    }
}

#[uniffi::export]
impl FivetCore {
    // =========================================================================
    // Owner Operations
    // =========================================================================

    /// Validate and store a new owner.
    pub fn register_owner(&self, input: FfiOwnerInput) -> Result<FfiOwner, FivetError> {
        let service = self.service.lock()?;
        let owner = Owner::new(input.into())?;
        Ok(service.register_owner(owner)?.into())
    }

    pub fn lookup_owner(&self, id: i64) -> Result<Option<FfiOwner>, FivetError> {
        let service = self.service.lock()?;
        Ok(service.lookup_owner(id)?.map(|o| o.into()))
    }

    pub fn list_owners(&self) -> Result<Vec<FfiOwner>, FivetError> {
        let service = self.service.lock()?;
        let owners = service.list_owners()?;
        Ok(owners.into_iter().map(|o| o.into()).collect())
    }

    /// Owner of the patient carrying `patient_number`.
    pub fn owner_of_patient(&self, patient_number: i64) -> Result<Option<FfiOwner>, FivetError> {
        let service = self.service.lock()?;
        Ok(service.owner_of_patient(patient_number)?.map(|o| o.into()))
    }

    // =========================================================================
    // Patient Operations
    // =========================================================================

    /// Validate and store a new patient for an already registered owner.
    pub fn register_patient(&self, input: FfiPatientInput) -> Result<FfiPatient, FivetError> {
        let service = self.service.lock()?;
        let owner = match input.owner_id {
            Some(id) => Some(
                service
                    .lookup_owner(id)?
                    .ok_or_else(|| FivetError::NotFound(format!("owner {}", id)))?,
            ),
            None => None,
        };

        let patient = Patient::new(PatientDraft {
            number: input.number,
            name: input.name,
            species: input.species,
            birth_date: parse_timestamp("birth_date", input.birth_date)?,
            breed: input.breed,
            sex: input.sex.map(Into::into),
            color: input.color,
            category: input.category.map(Into::into),
            owner,
        })?;
        Ok(service.register_patient(patient)?.into())
    }

    pub fn list_patients(&self) -> Result<Vec<FfiPatient>, FivetError> {
        let service = self.service.lock()?;
        let patients = service.list_patients()?;
        Ok(patients.into_iter().map(|p| p.into()).collect())
    }

    pub fn patient_by_number(&self, number: i64) -> Result<Option<FfiPatient>, FivetError> {
        let service = self.service.lock()?;
        Ok(service.patient_by_number(number)?.map(|p| p.into()))
    }

    /// Free-text patient search. Matches may repeat across criteria.
    pub fn search_patients(&self, query: Option<String>) -> Result<Vec<FfiPatient>, FivetError> {
        let query = query
            .ok_or_else(|| FivetError::InvalidArgument("search query is required".to_string()))?;
        let service = self.service.lock()?;
        let patients = service.search_patients(&query)?;
        Ok(patients.into_iter().map(|p| p.into()).collect())
    }

    // =========================================================================
    // Visit Operations
    // =========================================================================

    /// Validate and store a visit, appending it to the patient's visits.
    pub fn register_visit(&self, input: FfiVisitInput) -> Result<FfiVisit, FivetError> {
        let service = self.service.lock()?;
        let veterinarian = match input.veterinarian_id {
            Some(id) => Some(
                service
                    .lookup_owner(id)?
                    .ok_or_else(|| FivetError::NotFound(format!("veterinarian {}", id)))?,
            ),
            None => None,
        };
        let patient = match input.patient_number {
            Some(number) => Some(service.patient_by_number(number)?.ok_or_else(|| {
                FivetError::NotFound(format!("patient number {}", number))
            })?),
            None => None,
        };

        let visit_date = parse_offset_timestamp("visit_date", input.visit_date)?;
        // The offset the caller wrote the visit date in is the clinic's calendar
        let now: DateTime<FixedOffset> = match &visit_date {
            Some(date) => Utc::now().with_timezone(date.offset()),
            None => Local::now().into(),
        };

        let visit = Visit::new_at(
            VisitDraft {
                visit_date: visit_date.map(|dt| dt.with_timezone(&Utc)),
                next_visit: parse_timestamp("next_visit", input.next_visit)?,
                temperature: input.temperature,
                weight: input.weight,
                height: input.height,
                diagnosis: input.diagnosis,
                veterinarian: veterinarian.as_ref(),
                patient: patient.as_ref(),
            },
            now,
        )?;
        Ok(service.register_visit(visit)?.into())
    }

    /// Visits of the patient carrying `patient_number`, oldest first.
    pub fn list_visits(&self, patient_number: i64) -> Result<Vec<FfiVisit>, FivetError> {
        let service = self.service.lock()?;
        let visits = service.list_visits(patient_number)?;
        Ok(visits.into_iter().map(|v| v.into()).collect())
    }

    // =========================================================================
    // Lab Test Operations
    // =========================================================================

    /// Validate and store a lab test, appending it to the visit's lab tests.
    pub fn register_lab_test(&self, input: FfiLabTestInput) -> Result<FfiLabTest, FivetError> {
        let service = self.service.lock()?;
        let visit = match input.visit_id {
            Some(id) => Some(
                service
                    .lookup_visit(id)?
                    .ok_or_else(|| FivetError::NotFound(format!("visit {}", id)))?,
            ),
            None => None,
        };

        let lab_test = LabTest::new(LabTestDraft {
            name: input.name,
            test_date: parse_timestamp("test_date", input.test_date)?,
            visit: visit.as_ref(),
        })?;
        Ok(service.register_lab_test(lab_test)?.into())
    }

    pub fn list_lab_tests(&self, visit_id: i64) -> Result<Vec<FfiLabTest>, FivetError> {
        let service = self.service.lock()?;
        let lab_tests = service.list_lab_tests(visit_id)?;
        Ok(lab_tests.into_iter().map(|t| t.into()).collect())
    }
}

fn parse_timestamp(
    field: &str,
    value: Option<String>,
) -> Result<Option<DateTime<Utc>>, FivetError> {
    Ok(parse_offset_timestamp(field, value)?.map(|dt| dt.with_timezone(&Utc)))
}

/// Parse an RFC 3339 timestamp keeping the offset it was written in.
fn parse_offset_timestamp(
    field: &str,
    value: Option<String>,
) -> Result<Option<DateTime<FixedOffset>>, FivetError> {
    value
        .map(|text| {
            DateTime::parse_from_rfc3339(&text)
                .map_err(|e| FivetError::InvalidFormat(format!("{}: {}", field, e)))
        })
        .transpose()
}

// =========================================================================
// FFI Types
// =========================================================================

/// FFI-safe patient sex.
#[derive(Debug, Clone, Copy, PartialEq, Eq, uniffi::Enum)]
pub enum FfiSex {
    Male,
    Female,
}

impl From<FfiSex> for Sex {
    fn from(sex: FfiSex) -> Self {
        match sex {
            FfiSex::Male => Sex::Male,
            FfiSex::Female => Sex::Female,
        }
    }
}

impl From<Sex> for FfiSex {
    fn from(sex: Sex) -> Self {
        match sex {
            Sex::Male => FfiSex::Male,
            Sex::Female => FfiSex::Female,
        }
    }
}

/// FFI-safe patient category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, uniffi::Enum)]
pub enum FfiCategory {
    Resident,
    Outpatient,
}

impl From<FfiCategory> for Category {
    fn from(category: FfiCategory) -> Self {
        match category {
            FfiCategory::Resident => Category::Resident,
            FfiCategory::Outpatient => Category::Outpatient,
        }
    }
}

impl From<Category> for FfiCategory {
    fn from(category: Category) -> Self {
        match category {
            Category::Resident => FfiCategory::Resident,
            Category::Outpatient => FfiCategory::Outpatient,
        }
    }
}

/// FFI-safe owner.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiOwner {
    pub id: Option<i64>,
    pub national_id: String,
    pub first_name: String,
    pub last_name: String,
    pub full_name: String,
    pub address: String,
    pub landline: u32,
    pub mobile: u32,
    pub email: String,
}

impl From<Owner> for FfiOwner {
    fn from(owner: Owner) -> Self {
        Self {
            id: owner.id(),
            full_name: owner.full_name(),
            national_id: owner.national_id,
            first_name: owner.first_name,
            last_name: owner.last_name,
            address: owner.address,
            landline: owner.landline,
            mobile: owner.mobile,
            email: owner.email,
        }
    }
}

/// Owner fields as entered; absent values are reported as missing.
#[derive(Debug, Clone, Default, uniffi::Record)]
pub struct FfiOwnerInput {
    pub national_id: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub address: Option<String>,
    pub landline: Option<u32>,
    pub mobile: Option<u32>,
    pub email: Option<String>,
}

impl From<FfiOwnerInput> for OwnerDraft {
    fn from(input: FfiOwnerInput) -> Self {
        OwnerDraft {
            national_id: input.national_id,
            first_name: input.first_name,
            last_name: input.last_name,
            address: input.address,
            landline: input.landline,
            mobile: input.mobile,
            email: input.email,
        }
    }
}

/// FFI-safe patient.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiPatient {
    pub id: Option<i64>,
    pub number: i64,
    pub name: String,
    pub species: String,
    /// RFC 3339
    pub birth_date: String,
    pub breed: Option<String>,
    pub sex: FfiSex,
    pub color: String,
    pub category: FfiCategory,
    pub owner: FfiOwner,
    pub visit_ids: Vec<i64>,
}

impl From<Patient> for FfiPatient {
    fn from(patient: Patient) -> Self {
        Self {
            id: patient.id(),
            number: patient.number,
            name: patient.name,
            species: patient.species,
            birth_date: patient.birth_date.to_rfc3339(),
            breed: patient.breed,
            sex: patient.sex.into(),
            color: patient.color,
            category: patient.category.into(),
            owner: patient.owner.into(),
            visit_ids: patient.visits,
        }
    }
}

#[derive(Debug, Clone, Default, uniffi::Record)]
pub struct FfiPatientInput {
    pub number: Option<i64>,
    pub name: Option<String>,
    pub species: Option<String>,
    pub birth_date: Option<String>,
    pub breed: Option<String>,
    pub sex: Option<FfiSex>,
    pub color: Option<String>,
    pub category: Option<FfiCategory>,
    /// Id of a registered owner.
    pub owner_id: Option<i64>,
}

/// FFI-safe visit.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiVisit {
    pub id: Option<i64>,
    pub visit_date: String,
    pub next_visit: Option<String>,
    pub temperature: f64,
    pub weight: f64,
    pub height: f64,
    pub diagnosis: String,
    pub veterinarian_id: i64,
    pub patient_id: i64,
    pub lab_test_ids: Vec<i64>,
    /// Vitals recorded outside their declared bounds.
    pub vitals_outside_bounds: Vec<String>,
}

impl From<Visit> for FfiVisit {
    fn from(visit: Visit) -> Self {
        let vitals_outside_bounds = visit
            .vitals_outside_bounds()
            .into_iter()
            .map(String::from)
            .collect();
        Self {
            id: visit.id(),
            visit_date: visit.visit_date.to_rfc3339(),
            next_visit: visit.next_visit.map(|dt| dt.to_rfc3339()),
            temperature: visit.temperature,
            weight: visit.weight,
            height: visit.height,
            diagnosis: visit.diagnosis,
            veterinarian_id: visit.veterinarian_id,
            patient_id: visit.patient_id,
            lab_test_ids: visit.lab_tests,
            vitals_outside_bounds,
        }
    }
}

#[derive(Debug, Clone, Default, uniffi::Record)]
pub struct FfiVisitInput {
    pub visit_date: Option<String>,
    pub next_visit: Option<String>,
    pub temperature: Option<f64>,
    pub weight: Option<f64>,
    pub height: Option<f64>,
    pub diagnosis: Option<String>,
    /// Id of the attending veterinarian's owner record.
    pub veterinarian_id: Option<i64>,
    pub patient_number: Option<i64>,
}

/// FFI-safe lab test.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiLabTest {
    pub id: Option<i64>,
    pub name: String,
    pub test_date: String,
    pub visit_id: i64,
}

impl From<LabTest> for FfiLabTest {
    fn from(lab_test: LabTest) -> Self {
        Self {
            id: lab_test.id(),
            name: lab_test.name,
            test_date: lab_test.test_date.to_rfc3339(),
            visit_id: lab_test.visit_id,
        }
    }
}

#[derive(Debug, Clone, Default, uniffi::Record)]
pub struct FfiLabTestInput {
    pub name: Option<String>,
    pub test_date: Option<String>,
    pub visit_id: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn owner_input(national_id: &str) -> FfiOwnerInput {
        FfiOwnerInput {
            national_id: Some(national_id.into()),
            first_name: Some("Brenda".into()),
            last_name: Some("Lopez".into()),
            address: Some("Fake 653".into()),
            landline: Some(55218877),
            mobile: Some(963293074),
            email: Some("blopez@hotmail.com".into()),
        }
    }

    fn patient_input(owner_id: i64) -> FfiPatientInput {
        FfiPatientInput {
            number: Some(23),
            name: Some("Harry".into()),
            species: Some("Canino".into()),
            birth_date: Some("2020-03-01T00:00:00Z".into()),
            breed: None,
            sex: Some(FfiSex::Male),
            color: Some("Negro".into()),
            category: Some(FfiCategory::Resident),
            owner_id: Some(owner_id),
        }
    }

    #[test]
    fn test_register_and_list() {
        let core = open_database_in_memory().unwrap();
        let owner = core.register_owner(owner_input("191468694")).unwrap();
        assert_eq!(owner.full_name, "Brenda Lopez");

        let patient = core.register_patient(patient_input(owner.id.unwrap())).unwrap();
        assert_eq!(patient.owner.national_id, "191468694");
        assert_eq!(patient.sex, FfiSex::Male);

        assert_eq!(core.list_patients().unwrap().len(), 1);
        assert_eq!(core.search_patients(Some("19".into())).unwrap().len(), 1);
    }

    #[test]
    fn test_error_mapping() {
        let core = open_database_in_memory().unwrap();

        let missing = core.register_owner(FfiOwnerInput {
            email: None,
            ..owner_input("191468694")
        });
        assert!(matches!(missing, Err(FivetError::MissingField(f)) if f == "email"));

        let bad_id = core.register_owner(owner_input("191468695"));
        assert!(matches!(bad_id, Err(FivetError::InvalidFormat(f)) if f == "national_id"));

        core.register_owner(owner_input("191468694")).unwrap();
        let duplicate = core.register_owner(owner_input("191468694"));
        assert!(matches!(duplicate, Err(FivetError::DuplicateKey(_))));

        let no_owner = core.register_patient(patient_input(42));
        assert!(matches!(no_owner, Err(FivetError::NotFound(_))));

        let no_query = core.search_patients(None);
        assert!(matches!(no_query, Err(FivetError::InvalidArgument(_))));
    }

    #[test]
    fn test_register_visit_and_lab_test() {
        let core = open_database_in_memory().unwrap();
        let owner = core.register_owner(owner_input("191468694")).unwrap();
        core.register_patient(patient_input(owner.id.unwrap())).unwrap();

        let visit = core
            .register_visit(FfiVisitInput {
                visit_date: Some(Utc::now().to_rfc3339()),
                next_visit: None,
                temperature: Some(39.0),
                weight: Some(1200.0),
                height: Some(50.0),
                diagnosis: Some("Sobrepeso".into()),
                veterinarian_id: owner.id,
                patient_number: Some(23),
            })
            .unwrap();
        assert_eq!(visit.vitals_outside_bounds, vec!["weight".to_string()]);
        assert_eq!(core.list_visits(23).unwrap().len(), 1);

        let lab_test = core
            .register_lab_test(FfiLabTestInput {
                name: Some("Perfil bioquimico".into()),
                test_date: Some("2026-05-14T10:00:00+00:00".into()),
                visit_id: visit.id,
            })
            .unwrap();
        let listed = core.list_lab_tests(visit.id.unwrap()).unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, lab_test.id);

        let bad_date = core.register_lab_test(FfiLabTestInput {
            name: Some("Orina".into()),
            test_date: Some("yesterday".into()),
            visit_id: visit.id,
        });
        assert!(matches!(bad_date, Err(FivetError::InvalidFormat(_))));
    }

    #[test]
    fn test_visit_day_uses_caller_offset() {
        let core = open_database_in_memory().unwrap();
        let owner = core.register_owner(owner_input("191468694")).unwrap();
        core.register_patient(patient_input(owner.id.unwrap())).unwrap();

        // First second of the current day at UTC-4, which is 04:00:01Z
        let santiago = FixedOffset::west_opt(4 * 3600).unwrap();
        let today = Utc::now().with_timezone(&santiago).date_naive();
        let day_start = santiago
            .from_local_datetime(&today.and_hms_opt(0, 0, 1).unwrap())
            .unwrap();

        let visit = core
            .register_visit(FfiVisitInput {
                visit_date: Some(day_start.to_rfc3339()),
                next_visit: None,
                temperature: Some(38.0),
                weight: Some(20.0),
                height: Some(50.0),
                diagnosis: Some("Vacuna".into()),
                veterinarian_id: owner.id,
                patient_number: Some(23),
            })
            .unwrap();

        let stored = DateTime::parse_from_rfc3339(&visit.visit_date).unwrap();
        assert_eq!(stored, day_start);
    }

    #[test]
    fn test_open_with_config_json() {
        let core = open_with_config_json(r#"{"database": {"kind": "in_memory"}}"#.into()).unwrap();
        assert!(core.list_owners().unwrap().is_empty());

        let bad = open_with_config_json("not json".into());
        assert!(matches!(bad, Err(FivetError::Config(_))));
    }
}
