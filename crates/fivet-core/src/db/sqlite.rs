//! SQLite implementation of [`Repository`].

use std::marker::PhantomData;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rusqlite::types::{Type, Value};
use rusqlite::{params_from_iter, Connection, Row};

use super::{Database, DbError, DbResult, FieldValue, Filter, QueryBuilder, Repository};
use crate::models::Entity;

/// Row mapping for an entity stored in the SQLite table named `Entity::NAME`.
///
/// Rows are laid out as `id` followed by `Entity::FIELDS` in order.
pub trait Table: Entity + Sized {
    /// Column values for `Entity::FIELDS`, in order.
    fn to_row(&self) -> Vec<Value>;

    /// Rebuild a stored record. `conn` is available to load related records.
    fn from_row(conn: &Connection, row: &Row<'_>) -> rusqlite::Result<Self>;
}

/// Generic repository bound to one database connection.
pub struct SqliteRepository<'a, T> {
    db: &'a Database,
    _entity: PhantomData<T>,
}

impl<'a, T: Table> SqliteRepository<'a, T> {
    pub fn new(db: &'a Database) -> Self {
        Self {
            db,
            _entity: PhantomData,
        }
    }

    fn fetch(&self, clause: &str, params: Vec<Value>) -> DbResult<Vec<T>> {
        let conn = self.db.conn();
        let sql = format!("{} {} ORDER BY t.id", select_sql::<T>(), clause);
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(params_from_iter(params), |row| T::from_row(conn, row))?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }
}

impl<T: Table> Repository<T, i64> for SqliteRepository<'_, T> {
    fn find_all(&self) -> DbResult<Vec<T>> {
        self.fetch("", Vec::new())
    }

    fn find_by_id(&self, id: i64) -> DbResult<Option<T>> {
        let mut found = self.fetch("WHERE t.id = ?", vec![Value::Integer(id)])?;
        Ok(if found.is_empty() {
            None
        } else {
            Some(found.swap_remove(0))
        })
    }

    fn query(&self, query: &QueryBuilder<T>) -> DbResult<Vec<T>> {
        query.validate()?;

        let mut params = Vec::new();
        let condition = render_filters(query.filters(), "t", 0, &mut params);
        if condition.is_empty() {
            self.fetch("", params)
        } else {
            self.fetch(&format!("WHERE {}", condition), params)
        }
    }

    fn create(&self, obj: &mut T) -> DbResult<bool> {
        let conn = self.db.conn();
        let placeholders = vec!["?"; T::FIELDS.len()].join(", ");
        let sql = format!(
            "INSERT INTO {} ({}) VALUES ({})",
            T::NAME,
            T::FIELDS.join(", "),
            placeholders
        );

        let written = conn.execute(&sql, params_from_iter(obj.to_row()))?;
        if written == 1 {
            let id = conn.last_insert_rowid();
            obj.assign_id(id);
            tracing::debug!(entity = T::NAME, id, "Created record");
        }
        Ok(written == 1)
    }

    fn update(&self, obj: &T) -> DbResult<bool> {
        let id = obj.id().ok_or_else(|| {
            DbError::InvalidArgument(format!("cannot update unsaved {} record", T::NAME))
        })?;

        let assignments = T::FIELDS
            .iter()
            .map(|field| format!("{} = ?", field))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!("UPDATE {} SET {} WHERE id = ?", T::NAME, assignments);

        let mut values = obj.to_row();
        values.push(Value::Integer(id));
        let written = self.db.conn().execute(&sql, params_from_iter(values))?;
        Ok(written == 1)
    }

    fn delete(&self, id: i64) -> DbResult<bool> {
        let sql = format!("DELETE FROM {} WHERE id = ?", T::NAME);
        let written = self.db.conn().execute(&sql, [id])?;
        Ok(written == 1)
    }
}

fn select_sql<T: Table>() -> String {
    let columns = T::FIELDS
        .iter()
        .map(|field| format!("t.{}", field))
        .collect::<Vec<_>>()
        .join(", ");
    format!("SELECT t.id, {} FROM {} t", columns, T::NAME)
}

/// Render validated filters as an SQL condition on `alias`, appending the
/// bound values to `params` in placeholder order.
fn render_filters(filters: &[Filter], alias: &str, depth: usize, params: &mut Vec<Value>) -> String {
    let mut conditions = Vec::with_capacity(filters.len());
    for filter in filters {
        let condition = match filter {
            Filter::Eq { field, value } => {
                params.push(to_value(value));
                format!("{}.{} = ?", alias, field)
            }
            Filter::Contains { field, needle } => {
                params.push(Value::Text(needle.clone()));
                // instr() is case-sensitive, unlike LIKE
                format!("instr({}.{}, ?) > 0", alias, field)
            }
            Filter::Join {
                field,
                entity,
                filters: nested,
                ..
            } => {
                let inner_alias = format!("j{}", depth);
                let inner = render_filters(nested, &inner_alias, depth + 1, params);
                let inner_where = if inner.is_empty() {
                    String::new()
                } else {
                    format!(" WHERE {}", inner)
                };
                format!(
                    "{}.{} IN (SELECT {ia}.id FROM {} {ia}{})",
                    alias,
                    field,
                    entity,
                    inner_where,
                    ia = inner_alias
                )
            }
        };
        conditions.push(condition);
    }
    conditions.join(" AND ")
}

fn to_value(value: &FieldValue) -> Value {
    match value {
        FieldValue::Integer(v) => Value::Integer(*v),
        FieldValue::Real(v) => Value::Real(*v),
        FieldValue::Text(v) => Value::Text(v.clone()),
    }
}

/// Load a related record while mapping another row.
pub(crate) fn fetch_related<T: Table>(conn: &Connection, id: i64) -> rusqlite::Result<T> {
    let sql = format!("{} WHERE t.id = ?", select_sql::<T>());
    let mut stmt = conn.prepare_cached(&sql)?;
    stmt.query_row([id], |row| T::from_row(conn, row))
}

pub(crate) fn timestamp_value(value: &DateTime<Utc>) -> Value {
    Value::Text(value.to_rfc3339())
}

pub(crate) fn read_timestamp(row: &Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let text: String = row.get(idx)?;
    parse_timestamp(idx, &text)
}

pub(crate) fn read_optional_timestamp(
    row: &Row<'_>,
    idx: usize,
) -> rusqlite::Result<Option<DateTime<Utc>>> {
    let text: Option<String> = row.get(idx)?;
    text.map(|t| parse_timestamp(idx, &t)).transpose()
}

fn parse_timestamp(idx: usize, text: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(text)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

/// Read a text column into a type with a `FromStr` form (enums).
pub(crate) fn read_parsed<P>(row: &Row<'_>, idx: usize) -> rusqlite::Result<P>
where
    P: FromStr,
    P::Err: std::error::Error + Send + Sync + 'static,
{
    let text: String = row.get(idx)?;
    text.parse()
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}
