//! Patient models.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{persisted_id, required, Entity, Owner, ValidationError, ValidationResult};

/// Patient sex.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Sex {
    Male,
    Female,
}

impl Sex {
    pub fn as_str(&self) -> &'static str {
        match self {
            Sex::Male => "male",
            Sex::Female => "female",
        }
    }
}

impl FromStr for Sex {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "male" => Ok(Sex::Male),
            "female" => Ok(Sex::Female),
            _ => Err(ValidationError::InvalidFormat("sex")),
        }
    }
}

impl fmt::Display for Sex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether the patient is kept at the clinic or treated as an outpatient.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Resident,
    Outpatient,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Resident => "resident",
            Category::Outpatient => "outpatient",
        }
    }
}

impl FromStr for Category {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "resident" => Ok(Category::Resident),
            "outpatient" => Ok(Category::Outpatient),
            _ => Err(ValidationError::InvalidFormat("category")),
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unvalidated patient input. Only `breed` is optional.
#[derive(Debug, Clone, Default)]
pub struct PatientDraft {
    pub number: Option<i64>,
    pub name: Option<String>,
    pub species: Option<String>,
    pub birth_date: Option<DateTime<Utc>>,
    pub breed: Option<String>,
    pub sex: Option<Sex>,
    pub color: Option<String>,
    pub category: Option<Category>,
    /// Must already be persisted.
    pub owner: Option<Owner>,
}

/// A patient record, uniquely identified by its patient number.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Patient {
    pub(crate) id: Option<i64>,
    pub(crate) number: i64,
    pub(crate) name: String,
    pub(crate) species: String,
    pub(crate) birth_date: DateTime<Utc>,
    pub(crate) breed: Option<String>,
    pub(crate) sex: Sex,
    pub(crate) color: String,
    pub(crate) category: Category,
    pub(crate) owner: Owner,
    /// Visit ids in registration order, loaded from the store.
    pub(crate) visits: Vec<i64>,
}

impl Patient {
    /// Validate a draft into a patient with no visits.
    pub fn new(draft: PatientDraft) -> ValidationResult<Self> {
        let number = required(draft.number, "number")?;
        let name = required(draft.name, "name")?;
        let species = required(draft.species, "species")?;
        let birth_date = required(draft.birth_date, "birth_date")?;
        let sex = required(draft.sex, "sex")?;
        let color = required(draft.color, "color")?;
        let category = required(draft.category, "category")?;
        persisted_id(draft.owner.as_ref(), "owner")?;
        let owner = required(draft.owner, "owner")?;

        Ok(Self {
            id: None,
            number,
            name,
            species,
            birth_date,
            breed: draft.breed,
            sex,
            color,
            category,
            owner,
            visits: Vec::new(),
        })
    }

    pub fn number(&self) -> i64 {
        self.number
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn species(&self) -> &str {
        &self.species
    }

    pub fn birth_date(&self) -> DateTime<Utc> {
        self.birth_date
    }

    pub fn breed(&self) -> Option<&str> {
        self.breed.as_deref()
    }

    pub fn sex(&self) -> Sex {
        self.sex
    }

    pub fn color(&self) -> &str {
        &self.color
    }

    pub fn category(&self) -> Category {
        self.category
    }

    pub fn owner(&self) -> &Owner {
        &self.owner
    }

    /// Ids of the visits registered for this patient, oldest first.
    pub fn visits(&self) -> &[i64] {
        &self.visits
    }
}

impl Entity for Patient {
    const NAME: &'static str = "patients";
    const FIELDS: &'static [&'static str] = &[
        "number",
        "name",
        "species",
        "birth_date",
        "breed",
        "sex",
        "color",
        "category",
        "owner_id",
    ];

    fn id(&self) -> Option<i64> {
        self.id
    }

    fn assign_id(&mut self, id: i64) {
        self.id = Some(id);
    }
}
