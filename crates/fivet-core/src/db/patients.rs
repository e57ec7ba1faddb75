//! Patient row mapping.

use rusqlite::types::Value;
use rusqlite::{Connection, Row};

use super::{child_ids, fetch_related, read_parsed, read_timestamp, timestamp_value, ChildRelation, Table};
use crate::models::{Owner, Patient};

impl Table for Patient {
    fn to_row(&self) -> Vec<Value> {
        vec![
            Value::Integer(self.number),
            Value::Text(self.name.clone()),
            Value::Text(self.species.clone()),
            timestamp_value(&self.birth_date),
            self.breed.clone().map_or(Value::Null, Value::Text),
            Value::Text(self.sex.as_str().to_string()),
            Value::Text(self.color.clone()),
            Value::Text(self.category.as_str().to_string()),
            Value::Integer(self.owner.id.unwrap_or_default()),
        ]
    }

    fn from_row(conn: &Connection, row: &Row<'_>) -> rusqlite::Result<Self> {
        let id: i64 = row.get(0)?;
        let owner_id: i64 = row.get(9)?;
        Ok(Patient {
            id: Some(id),
            number: row.get(1)?,
            name: row.get(2)?,
            species: row.get(3)?,
            birth_date: read_timestamp(row, 4)?,
            breed: row.get(5)?,
            sex: read_parsed(row, 6)?,
            color: row.get(7)?,
            category: read_parsed(row, 8)?,
            owner: fetch_related::<Owner>(conn, owner_id)?,
            visits: child_ids(conn, ChildRelation::PatientVisits, id)?,
        })
    }
}
