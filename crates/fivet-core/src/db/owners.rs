//! Owner row mapping.

use rusqlite::types::Value;
use rusqlite::{Connection, Row};

use super::Table;
use crate::models::Owner;

impl Table for Owner {
    fn to_row(&self) -> Vec<Value> {
        vec![
            Value::Text(self.national_id.clone()),
            Value::Text(self.first_name.clone()),
            Value::Text(self.last_name.clone()),
            Value::Text(self.address.clone()),
            Value::Integer(self.landline.into()),
            Value::Integer(self.mobile.into()),
            Value::Text(self.email.clone()),
        ]
    }

    fn from_row(_conn: &Connection, row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Owner {
            id: Some(row.get(0)?),
            national_id: row.get(1)?,
            first_name: row.get(2)?,
            last_name: row.get(3)?,
            address: row.get(4)?,
            landline: row.get(5)?,
            mobile: row.get(6)?,
            email: row.get(7)?,
        })
    }
}
