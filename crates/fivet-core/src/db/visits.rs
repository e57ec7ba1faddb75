//! Visit row mapping.

use rusqlite::types::Value;
use rusqlite::{Connection, Row};

use super::{child_ids, read_optional_timestamp, read_timestamp, timestamp_value, ChildRelation, Table};
use crate::models::Visit;

impl Table for Visit {
    fn to_row(&self) -> Vec<Value> {
        vec![
            timestamp_value(&self.visit_date),
            self.next_visit
                .as_ref()
                .map_or(Value::Null, timestamp_value),
            Value::Real(self.temperature),
            Value::Real(self.weight),
            Value::Real(self.height),
            Value::Text(self.diagnosis.clone()),
            Value::Integer(self.veterinarian_id),
            Value::Integer(self.patient_id),
        ]
    }

    fn from_row(conn: &Connection, row: &Row<'_>) -> rusqlite::Result<Self> {
        let id: i64 = row.get(0)?;
        Ok(Visit {
            id: Some(id),
            visit_date: read_timestamp(row, 1)?,
            next_visit: read_optional_timestamp(row, 2)?,
            temperature: row.get(3)?,
            weight: row.get(4)?,
            height: row.get(5)?,
            diagnosis: row.get(6)?,
            veterinarian_id: row.get(7)?,
            patient_id: row.get(8)?,
            lab_tests: child_ids(conn, ChildRelation::VisitLabTests, id)?,
        })
    }
}
