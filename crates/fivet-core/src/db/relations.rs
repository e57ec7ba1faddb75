//! Ordered parent-to-child collections.
//!
//! A patient's visits and a visit's lab tests live in relation tables keyed
//! by parent id. Appending a child is an explicit store operation; the parent
//! picks it up the next time it is read.

use rusqlite::Connection;

use super::{Database, DbResult};

/// A parent-to-children collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChildRelation {
    /// Visits of a patient.
    PatientVisits,
    /// Lab tests of a visit.
    VisitLabTests,
}

impl ChildRelation {
    fn table(&self) -> &'static str {
        match self {
            ChildRelation::PatientVisits => "patient_visits",
            ChildRelation::VisitLabTests => "visit_lab_tests",
        }
    }

    fn parent_column(&self) -> &'static str {
        match self {
            ChildRelation::PatientVisits => "patient_id",
            ChildRelation::VisitLabTests => "visit_id",
        }
    }

    fn child_column(&self) -> &'static str {
        match self {
            ChildRelation::PatientVisits => "visit_id",
            ChildRelation::VisitLabTests => "lab_test_id",
        }
    }
}

impl Database {
    /// Append a persisted child to a parent's collection.
    pub fn append_child(
        &self,
        relation: ChildRelation,
        parent_id: i64,
        child_id: i64,
    ) -> DbResult<()> {
        let sql = format!(
            "INSERT INTO {} ({}, {}) VALUES (?, ?)",
            relation.table(),
            relation.parent_column(),
            relation.child_column()
        );
        self.conn().execute(&sql, [parent_id, child_id])?;
        Ok(())
    }

    /// Child ids of a parent, in append order.
    pub fn children(&self, relation: ChildRelation, parent_id: i64) -> DbResult<Vec<i64>> {
        child_ids(self.conn(), relation, parent_id).map_err(Into::into)
    }
}

pub(crate) fn child_ids(
    conn: &Connection,
    relation: ChildRelation,
    parent_id: i64,
) -> rusqlite::Result<Vec<i64>> {
    let sql = format!(
        "SELECT {} FROM {} WHERE {} = ? ORDER BY rowid",
        relation.child_column(),
        relation.table(),
        relation.parent_column()
    );
    let mut stmt = conn.prepare_cached(&sql)?;
    let rows = stmt.query_map([parent_id], |row| row.get(0))?;
    rows.collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::DbError;

    fn setup_db() -> Database {
        let db = Database::open_in_memory().unwrap();
        db.conn()
            .execute_batch(
                r#"
                INSERT INTO owners (national_id, first_name, last_name, address, landline, mobile, email)
                VALUES ('152532873', 'Andrea', 'Contreras', 'Falsa 123', 55221234, 912345678, 'a@b.cl');
                INSERT INTO patients (number, name, species, birth_date, sex, color, category, owner_id)
                VALUES (1, 'Max', 'Canino', '2020-01-01T00:00:00+00:00', 'male', 'cafe', 'resident', 1);
                INSERT INTO visits (visit_date, temperature, weight, height, diagnosis, veterinarian_id, patient_id)
                VALUES ('2026-01-01T00:00:00+00:00', 38.0, 30.0, 60.0, 'Sano', 1, 1),
                       ('2026-02-01T00:00:00+00:00', 38.2, 31.0, 60.0, 'Sano', 1, 1);
                "#,
            )
            .unwrap();
        db
    }

    #[test]
    fn test_children_in_append_order() {
        let db = setup_db();

        assert!(db.children(ChildRelation::PatientVisits, 1).unwrap().is_empty());

        db.append_child(ChildRelation::PatientVisits, 1, 2).unwrap();
        db.append_child(ChildRelation::PatientVisits, 1, 1).unwrap();

        assert_eq!(
            db.children(ChildRelation::PatientVisits, 1).unwrap(),
            vec![2, 1]
        );
    }

    #[test]
    fn test_append_twice_is_duplicate() {
        let db = setup_db();
        db.append_child(ChildRelation::PatientVisits, 1, 1).unwrap();

        let result = db.append_child(ChildRelation::PatientVisits, 1, 1);
        assert!(matches!(result, Err(DbError::DuplicateKey(_))));
    }

    #[test]
    fn test_append_unknown_child_fails() {
        let db = setup_db();
        let result = db.append_child(ChildRelation::VisitLabTests, 1, 99);
        assert!(matches!(result, Err(DbError::Storage(_))));
    }
}
