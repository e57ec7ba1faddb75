//! Store-agnostic repository contract.
//!
//! [`Repository`] is implemented once per backing technology; callers build
//! filters with [`QueryBuilder`] and never see the store's query language.

use std::marker::PhantomData;

use super::{DbError, DbResult};
use crate::models::Entity;

/// A scalar compared against a persisted field.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Integer(i64),
    Real(f64),
    Text(String),
}

impl From<i64> for FieldValue {
    fn from(v: i64) -> Self {
        FieldValue::Integer(v)
    }
}

impl From<u32> for FieldValue {
    fn from(v: u32) -> Self {
        FieldValue::Integer(v.into())
    }
}

impl From<f64> for FieldValue {
    fn from(v: f64) -> Self {
        FieldValue::Real(v)
    }
}

impl From<&str> for FieldValue {
    fn from(v: &str) -> Self {
        FieldValue::Text(v.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(v: String) -> Self {
        FieldValue::Text(v)
    }
}

/// One condition of a composed query. Conditions of a query are combined
/// with AND.
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    /// Field equals value.
    Eq { field: String, value: FieldValue },
    /// Field contains `needle` as a case-sensitive substring.
    Contains { field: String, needle: String },
    /// Foreign key `field` references a record of `entity` matching `filters`.
    Join {
        field: String,
        entity: &'static str,
        fields: &'static [&'static str],
        filters: Vec<Filter>,
    },
}

/// Composed filter over records of `T`.
#[derive(Debug, Clone)]
pub struct QueryBuilder<T> {
    filters: Vec<Filter>,
    _entity: PhantomData<fn() -> T>,
}

impl<T: Entity> QueryBuilder<T> {
    pub fn new() -> Self {
        Self {
            filters: Vec::new(),
            _entity: PhantomData,
        }
    }

    pub fn eq(mut self, field: &str, value: impl Into<FieldValue>) -> Self {
        self.filters.push(Filter::Eq {
            field: field.to_string(),
            value: value.into(),
        });
        self
    }

    pub fn contains(mut self, field: &str, needle: &str) -> Self {
        self.filters.push(Filter::Contains {
            field: field.to_string(),
            needle: needle.to_string(),
        });
        self
    }

    /// Keep records whose foreign key `field` points at a `U` matched by
    /// `related`.
    pub fn join<U: Entity>(mut self, field: &str, related: QueryBuilder<U>) -> Self {
        self.filters.push(Filter::Join {
            field: field.to_string(),
            entity: U::NAME,
            fields: U::FIELDS,
            filters: related.filters,
        });
        self
    }

    pub fn filters(&self) -> &[Filter] {
        &self.filters
    }

    /// Reject references to fields `T` does not persist.
    pub fn validate(&self) -> DbResult<()> {
        validate_filters(T::NAME, T::FIELDS, &self.filters)
    }
}

impl<T: Entity> Default for QueryBuilder<T> {
    fn default() -> Self {
        Self::new()
    }
}

fn validate_filters(entity: &str, fields: &[&str], filters: &[Filter]) -> DbResult<()> {
    for filter in filters {
        let field = match filter {
            Filter::Eq { field, .. } | Filter::Contains { field, .. } => field,
            Filter::Join {
                field,
                entity: related,
                fields: related_fields,
                filters: nested,
            } => {
                validate_filters(related, related_fields, nested)?;
                field
            }
        };
        if field != "id" && !fields.contains(&field.as_str()) {
            return Err(DbError::InvalidArgument(format!(
                "unknown field '{}' for {}",
                field, entity
            )));
        }
    }
    Ok(())
}

/// CRUD and filtered queries over one entity type `T` keyed by `K`.
///
/// Store faults surface as [`DbError::DuplicateKey`] for uniqueness
/// violations and [`DbError::Storage`] otherwise; nothing is retried.
pub trait Repository<T: Entity, K> {
    /// All persisted records, in store order.
    fn find_all(&self) -> DbResult<Vec<T>>;

    /// The record with this id, if any.
    fn find_by_id(&self, id: K) -> DbResult<Option<T>>;

    /// Records whose `field` equals `value`.
    fn find_all_by_field<V: Into<FieldValue>>(&self, field: &str, value: V) -> DbResult<Vec<T>> {
        self.query(&self.new_query().eq(field, value))
    }

    /// Start a composed query, run it with [`Repository::query`].
    fn new_query(&self) -> QueryBuilder<T> {
        QueryBuilder::new()
    }

    fn query(&self, query: &QueryBuilder<T>) -> DbResult<Vec<T>>;

    /// Persist a new record and write the assigned id back into `obj`.
    ///
    /// Returns true only if exactly one row was written.
    fn create(&self, obj: &mut T) -> DbResult<bool>;

    /// Overwrite the stored record with `obj`'s fields.
    fn update(&self, obj: &T) -> DbResult<bool>;

    fn delete(&self, id: K) -> DbResult<bool>;
}
