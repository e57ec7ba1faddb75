//! Clinic records service.
//!
//! Thin composition of the repositories and the search aggregator, holding
//! the one connection for its whole lifetime.

use thiserror::Error;
use tracing::info;

use crate::config::{ConfigError, ServiceConfig};
use crate::db::{ChildRelation, Database, DbError, Repository, Table};
use crate::models::{Entity, LabTest, Owner, Patient, ValidationError, Visit};
use crate::search::PatientSearch;

/// Service errors.
#[derive(Error, Debug)]
pub enum ServiceError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Db(#[from] DbError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

pub type ServiceResult<T> = Result<T, ServiceError>;

pub struct ClinicService {
    db: Database,
    config: ServiceConfig,
}

impl ClinicService {
    /// Open the configured store, installing the schema if needed.
    pub fn open(config: ServiceConfig) -> ServiceResult<Self> {
        let db = Database::open_with(&config.database)?;
        info!(database = ?config.database, "Opened clinic records");
        Ok(Self { db, config })
    }

    /// Release the store connection.
    pub fn close(self) -> ServiceResult<()> {
        self.db.close()?;
        info!(database = ?self.config.database, "Closed clinic records");
        Ok(())
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    // =========================================================================
    // Registration
    // =========================================================================

    pub fn register_owner(&self, owner: Owner) -> ServiceResult<Owner> {
        let owner = create_and_reload(&self.db, owner)?;
        info!(id = owner.id(), "Registered owner");
        Ok(owner)
    }

    pub fn register_patient(&self, patient: Patient) -> ServiceResult<Patient> {
        let patient = create_and_reload(&self.db, patient)?;
        info!(id = patient.id(), number = patient.number(), "Registered patient");
        Ok(patient)
    }

    /// Store a visit and append it to its patient's visits.
    ///
    /// Both writes happen in one transaction.
    pub fn register_visit(&self, visit: Visit) -> ServiceResult<Visit> {
        let patient_id = visit.patient_id();
        let visit = self.register_child(visit, ChildRelation::PatientVisits, patient_id)?;
        info!(id = visit.id(), patient_id, "Registered visit");
        Ok(visit)
    }

    /// Store a lab test and append it to its visit's lab tests.
    ///
    /// Both writes happen in one transaction.
    pub fn register_lab_test(&self, lab_test: LabTest) -> ServiceResult<LabTest> {
        let visit_id = lab_test.visit_id();
        let lab_test = self.register_child(lab_test, ChildRelation::VisitLabTests, visit_id)?;
        info!(id = lab_test.id(), visit_id, "Registered lab test");
        Ok(lab_test)
    }

    fn register_child<T: Table>(
        &self,
        child: T,
        relation: ChildRelation,
        parent_id: i64,
    ) -> ServiceResult<T> {
        let tx = self.db.transaction()?;
        let child = create_and_reload(&self.db, child)?;
        if let Some(child_id) = child.id() {
            self.db.append_child(relation, parent_id, child_id)?;
        }
        tx.commit().map_err(DbError::from)?;
        Ok(child)
    }

    // =========================================================================
    // Search and listing
    // =========================================================================

    pub fn search_patients(&self, query: &str) -> ServiceResult<Vec<Patient>> {
        let patients = self.db.repository::<Patient>();
        Ok(PatientSearch::new(&patients).search(query)?)
    }

    pub fn list_patients(&self) -> ServiceResult<Vec<Patient>> {
        Ok(self.db.repository::<Patient>().find_all()?)
    }

    pub fn list_owners(&self) -> ServiceResult<Vec<Owner>> {
        Ok(self.db.repository::<Owner>().find_all()?)
    }

    pub fn lookup_owner(&self, id: i64) -> ServiceResult<Option<Owner>> {
        Ok(self.db.repository::<Owner>().find_by_id(id)?)
    }

    pub fn lookup_visit(&self, id: i64) -> ServiceResult<Option<Visit>> {
        Ok(self.db.repository::<Visit>().find_by_id(id)?)
    }

    /// First patient carrying `number`, if any.
    pub fn patient_by_number(&self, number: i64) -> ServiceResult<Option<Patient>> {
        let mut found = self
            .db
            .repository::<Patient>()
            .find_all_by_field("number", number)?;
        Ok(if found.is_empty() {
            None
        } else {
            Some(found.swap_remove(0))
        })
    }

    /// Visits registered for the patient carrying `number`, oldest first.
    pub fn list_visits(&self, patient_number: i64) -> ServiceResult<Vec<Visit>> {
        let patient = self.patient_by_number(patient_number)?.ok_or_else(|| {
            DbError::NotFound(format!("patient number {}", patient_number))
        })?;
        load_all(&self.db, patient.visits())
    }

    /// Lab tests registered under a visit, oldest first.
    pub fn list_lab_tests(&self, visit_id: i64) -> ServiceResult<Vec<LabTest>> {
        let visit = self
            .lookup_visit(visit_id)?
            .ok_or_else(|| DbError::NotFound(format!("visit {}", visit_id)))?;
        load_all(&self.db, visit.lab_tests())
    }

    pub fn owner_of_patient(&self, patient_number: i64) -> ServiceResult<Option<Owner>> {
        Ok(self
            .patient_by_number(patient_number)?
            .map(|patient| patient.owner().clone()))
    }
}

/// Persist `record` and read back the stored version.
fn create_and_reload<T: Table>(db: &Database, mut record: T) -> ServiceResult<T> {
    let repo = db.repository::<T>();
    repo.create(&mut record)?;
    let id = record
        .id()
        .ok_or_else(|| DbError::NotFound(format!("{} record was not written", T::NAME)))?;
    let stored = repo
        .find_by_id(id)?
        .ok_or_else(|| DbError::NotFound(format!("{} {}", T::NAME, id)))?;
    Ok(stored)
}

fn load_all<T: Table>(db: &Database, ids: &[i64]) -> ServiceResult<Vec<T>> {
    let repo = db.repository::<T>();
    let mut records = Vec::with_capacity(ids.len());
    for &id in ids {
        if let Some(record) = repo.find_by_id(id)? {
            records.push(record);
        }
    }
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};

    use crate::models::{Category, LabTestDraft, OwnerDraft, PatientDraft, Sex, VisitDraft};

    fn setup_service() -> ClinicService {
        ClinicService::open(ServiceConfig::in_memory()).unwrap()
    }

    fn owner_draft(first_name: &str, national_id: &str) -> OwnerDraft {
        OwnerDraft {
            first_name: Some(first_name.into()),
            last_name: Some("Lopez".into()),
            national_id: Some(national_id.into()),
            address: Some("Falsa 123".into()),
            landline: Some(55221234),
            mobile: Some(912345678),
            email: Some("contacto@fivet.cl".into()),
        }
    }

    fn register_patient(service: &ClinicService, number: i64, owner: &Owner) -> Patient {
        let patient = Patient::new(PatientDraft {
            number: Some(number),
            name: Some("Harry".into()),
            species: Some("Canino".into()),
            birth_date: Some(Utc.with_ymd_and_hms(2020, 3, 1, 0, 0, 0).unwrap()),
            breed: Some("Quiltro".into()),
            sex: Some(Sex::Male),
            color: Some("Negro".into()),
            category: Some(Category::Resident),
            owner: Some(owner.clone()),
        })
        .unwrap();
        service.register_patient(patient).unwrap()
    }

    fn visit(vet: &Owner, patient: &Patient) -> Visit {
        let now = Utc::now();
        Visit::new(VisitDraft {
            visit_date: Some(now),
            next_visit: Some(now + Duration::days(30)),
            temperature: Some(38.2),
            weight: Some(12.5),
            height: Some(40.0),
            diagnosis: Some("Sano".into()),
            veterinarian: Some(vet),
            patient: Some(patient),
        })
        .unwrap()
    }

    #[test]
    fn test_register_owner() {
        let service = setup_service();
        let owner = service
            .register_owner(Owner::new(owner_draft("Brenda", "191468694")).unwrap())
            .unwrap();

        assert!(owner.id().is_some());
        assert_eq!(service.lookup_owner(owner.id().unwrap()).unwrap(), Some(owner));
        assert_eq!(service.list_owners().unwrap().len(), 1);
    }

    #[test]
    fn test_register_duplicate_owner() {
        let service = setup_service();
        service
            .register_owner(Owner::new(owner_draft("Brenda", "191468694")).unwrap())
            .unwrap();

        let result = service.register_owner(Owner::new(owner_draft("Andrea", "191468694")).unwrap());
        assert!(matches!(result, Err(ServiceError::Db(DbError::DuplicateKey(_)))));
        assert_eq!(service.list_owners().unwrap().len(), 1);
    }

    #[test]
    fn test_patient_lookups_by_number() {
        let service = setup_service();
        let owner = service
            .register_owner(Owner::new(owner_draft("Brenda", "191468694")).unwrap())
            .unwrap();
        register_patient(&service, 23, &owner);

        assert_eq!(service.patient_by_number(23).unwrap().unwrap().number(), 23);
        assert!(service.patient_by_number(24).unwrap().is_none());
        assert_eq!(service.owner_of_patient(23).unwrap(), Some(owner));
        assert!(service.owner_of_patient(24).unwrap().is_none());
        assert!(matches!(
            service.list_visits(24),
            Err(ServiceError::Db(DbError::NotFound(_)))
        ));
    }

    #[test]
    fn test_register_visit_appends_to_patient() {
        let service = setup_service();
        let owner = service
            .register_owner(Owner::new(owner_draft("Brenda", "191468694")).unwrap())
            .unwrap();
        let patient = register_patient(&service, 23, &owner);
        assert!(service.list_visits(23).unwrap().is_empty());

        let first = service.register_visit(visit(&owner, &patient)).unwrap();
        let second = service.register_visit(visit(&owner, &patient)).unwrap();

        let visits = service.list_visits(23).unwrap();
        assert_eq!(visits, vec![first.clone(), second.clone()]);

        let reloaded = service.patient_by_number(23).unwrap().unwrap();
        assert_eq!(
            reloaded.visits(),
            &[first.id().unwrap(), second.id().unwrap()]
        );
    }

    #[test]
    fn test_register_lab_test_appends_to_visit() {
        let service = setup_service();
        let owner = service
            .register_owner(Owner::new(owner_draft("Brenda", "191468694")).unwrap())
            .unwrap();
        let patient = register_patient(&service, 23, &owner);
        let visit = service.register_visit(visit(&owner, &patient)).unwrap();

        let lab_test = LabTest::new(LabTestDraft {
            name: Some("Hemograma".into()),
            test_date: Some(Utc::now()),
            visit: Some(&visit),
        })
        .unwrap();
        let lab_test = service.register_lab_test(lab_test).unwrap();

        let visit_id = visit.id().unwrap();
        assert_eq!(service.list_lab_tests(visit_id).unwrap(), vec![lab_test.clone()]);
        assert_eq!(
            service.lookup_visit(visit_id).unwrap().unwrap().lab_tests(),
            &[lab_test.id().unwrap()]
        );
        assert!(matches!(
            service.list_lab_tests(visit_id + 1),
            Err(ServiceError::Db(DbError::NotFound(_)))
        ));
    }

    #[test]
    fn test_failed_visit_leaves_no_trace() {
        let service = setup_service();
        let owner = service
            .register_owner(Owner::new(owner_draft("Brenda", "191468694")).unwrap())
            .unwrap();
        let mut ghost = register_patient(&service, 23, &owner);
        ghost.assign_id(999);

        let result = service.register_visit(visit(&owner, &ghost));
        assert!(matches!(result, Err(ServiceError::Db(DbError::Storage(_)))));
        assert!(service
            .database()
            .repository::<Visit>()
            .find_all()
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_search_patients() {
        let service = setup_service();
        let owner = service
            .register_owner(Owner::new(owner_draft("Brenda", "191468694")).unwrap())
            .unwrap();
        register_patient(&service, 23, &owner);

        assert_eq!(service.search_patients("Harry").unwrap().len(), 1);
        assert_eq!(service.search_patients("Brenda").unwrap().len(), 1);
        assert!(service.search_patients("Askar").unwrap().is_empty());
    }

    #[test]
    fn test_close() {
        let service = setup_service();
        assert!(service.close().is_ok());
    }
}
