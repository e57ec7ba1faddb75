//! Free-text patient search.
//!
//! A query fans out into up to four sub-searches whose results are
//! concatenated in branch order:
//!
//! 1. numeric query: patient number equals the query
//! 2. numeric query: owner national id contains the query
//! 3. patient name contains the query
//! 4. owner first name contains the query
//!
//! Matching is case-sensitive and a patient matched by several branches
//! appears once per branch.

use tracing::debug;

use crate::db::{DbResult, QueryBuilder, Repository};
use crate::models::{Owner, Patient};

/// Search aggregator over a patient repository.
pub struct PatientSearch<'r, R> {
    patients: &'r R,
}

impl<'r, R: Repository<Patient, i64>> PatientSearch<'r, R> {
    pub fn new(patients: &'r R) -> Self {
        Self { patients }
    }

    /// Run every applicable branch and concatenate the matches.
    pub fn search(&self, query: &str) -> DbResult<Vec<Patient>> {
        let mut results = Vec::new();

        if is_numeric(query) {
            // Too large for a patient number means no patient carries it
            if let Ok(number) = query.parse::<i64>() {
                let by_number = self.patients.find_all_by_field("number", number)?;
                debug!(query, matches = by_number.len(), "Search by patient number");
                results.extend(by_number);
            }

            let by_national_id = self.patients.query(
                &self
                    .patients
                    .new_query()
                    .join("owner_id", QueryBuilder::<Owner>::new().contains("national_id", query)),
            )?;
            debug!(query, matches = by_national_id.len(), "Search by owner national id");
            results.extend(by_national_id);
        }

        let by_name = self
            .patients
            .query(&self.patients.new_query().contains("name", query))?;
        debug!(query, matches = by_name.len(), "Search by patient name");
        results.extend(by_name);

        let by_owner_name = self.patients.query(
            &self
                .patients
                .new_query()
                .join("owner_id", QueryBuilder::<Owner>::new().contains("first_name", query)),
        )?;
        debug!(query, matches = by_owner_name.len(), "Search by owner name");
        results.extend(by_owner_name);

        Ok(results)
    }
}

/// Non-empty and made only of ASCII digits.
pub fn is_numeric(query: &str) -> bool {
    !query.is_empty() && query.bytes().all(|b| b.is_ascii_digit())
}
