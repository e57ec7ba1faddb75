//! Domain models for the clinic records core.
//!
//! Every record is built through a validating constructor that takes a draft
//! with optional fields, so an absent value is reported as a missing field
//! rather than being impossible to express.

mod owner;
mod patient;
mod visit;

pub use lab_test::*;
pub use owner::*;
pub use patient::*;
pub use visit::*;

use thiserror::Error;

/// Constructor validation errors.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    #[error("Invalid format: {0}")]
    InvalidFormat(&'static str),

    #[error("Out of range: {field} ({reason})")]
    OutOfRange { field: &'static str, reason: String },
}

pub type ValidationResult<T> = Result<T, ValidationError>;

/// A record persisted through a repository.
///
/// `NAME` doubles as the storage collection name and `FIELDS` lists the
/// persisted fields (excluding `id`) that filters may reference.
pub trait Entity: Clone {
    const NAME: &'static str;
    const FIELDS: &'static [&'static str];

    /// Store-assigned identity, `None` until persisted.
    fn id(&self) -> Option<i64>;

    /// Record the identity assigned by the store on creation.
    fn assign_id(&mut self, id: i64);
}

pub(crate) fn required<T>(value: Option<T>, field: &'static str) -> ValidationResult<T> {
    value.ok_or(ValidationError::MissingField(field))
}

pub(crate) fn min_length(value: &str, min: usize, field: &'static str) -> ValidationResult<()> {
    let len = value.chars().count();
    if len < min {
        return Err(ValidationError::OutOfRange {
            field,
            reason: format!("length {} is below minimum {}", len, min),
        });
    }
    Ok(())
}

/// Resolve a reference to a related record into its store id.
///
/// A record that was never persisted cannot be related to, so a missing id
/// counts as a missing field.
pub(crate) fn persisted_id<E: Entity>(
    related: Option<&E>,
    field: &'static str,
) -> ValidationResult<i64> {
    related
        .and_then(|record| record.id())
        .ok_or(ValidationError::MissingField(field))
}
