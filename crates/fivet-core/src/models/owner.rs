//! Owner (clinic client) model.

use serde::{Deserialize, Serialize};

use super::{min_length, required, Entity, ValidationError, ValidationResult};
use crate::validation;

/// Unvalidated owner input.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct OwnerDraft {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub national_id: Option<String>,
    pub address: Option<String>,
    pub landline: Option<u32>,
    pub mobile: Option<u32>,
    pub email: Option<String>,
}

/// A clinic client. Also used for the attending veterinarian of a visit.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Owner {
    pub(crate) id: Option<i64>,
    pub(crate) national_id: String,
    pub(crate) first_name: String,
    pub(crate) last_name: String,
    pub(crate) address: String,
    pub(crate) landline: u32,
    pub(crate) mobile: u32,
    pub(crate) email: String,
}

impl Owner {
    /// Validate a draft into an owner.
    ///
    /// Rules, in reporting order: every field present; first name at least 2
    /// characters; last name at least 3; national id passes its check digit;
    /// address at least 2 characters; 8-digit landline; 9-digit mobile starting
    /// with 9; lower-case e-mail.
    ///
    /// A `K` check digit is stored as `k`, so an id has one stored form.
    pub fn new(draft: OwnerDraft) -> ValidationResult<Self> {
        let first_name = required(draft.first_name, "first_name")?;
        let last_name = required(draft.last_name, "last_name")?;
        let national_id = required(draft.national_id, "national_id")?;
        let address = required(draft.address, "address")?;
        let landline = required(draft.landline, "landline")?;
        let mobile = required(draft.mobile, "mobile")?;
        let email = required(draft.email, "email")?;

        min_length(&first_name, 2, "first_name")?;
        min_length(&last_name, 3, "last_name")?;
        if !validation::is_valid_id(&national_id) {
            return Err(ValidationError::InvalidFormat("national_id"));
        }
        let national_id = national_id.to_ascii_lowercase();
        min_length(&address, 2, "address")?;
        if !validation::is_valid_landline(landline) {
            return Err(ValidationError::InvalidFormat("landline"));
        }
        if !validation::is_valid_mobile(mobile) {
            return Err(ValidationError::InvalidFormat("mobile"));
        }
        if !validation::is_valid_email(&email) {
            return Err(ValidationError::InvalidFormat("email"));
        }

        Ok(Self {
            id: None,
            national_id,
            first_name,
            last_name,
            address,
            landline,
            mobile,
            email,
        })
    }

    pub fn national_id(&self) -> &str {
        &self.national_id
    }

    pub fn first_name(&self) -> &str {
        &self.first_name
    }

    pub fn last_name(&self) -> &str {
        &self.last_name
    }

    /// First and last name separated by a space.
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn landline(&self) -> u32 {
        self.landline
    }

    pub fn mobile(&self) -> u32 {
        self.mobile
    }

    pub fn email(&self) -> &str {
        &self.email
    }
}

impl Entity for Owner {
    const NAME: &'static str = "owners";
    const FIELDS: &'static [&'static str] = &[
        "national_id",
        "first_name",
        "last_name",
        "address",
        "landline",
        "mobile",
        "email",
    ];

    fn id(&self) -> Option<i64> {
        self.id
    }

    fn assign_id(&mut self, id: i64) {
        self.id = Some(id);
    }
}
