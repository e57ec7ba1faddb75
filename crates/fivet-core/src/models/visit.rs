//! Visit (clinical encounter) model.

use chrono::{DateTime, Local, TimeZone, Utc};
use serde::Serialize;

use super::{persisted_id, required, Entity, Owner, Patient, ValidationError, ValidationResult};

/// Declared valid range of a vital sign.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VitalBounds {
    pub field: &'static str,
    pub min: f64,
    pub max: f64,
}

impl VitalBounds {
    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }
}

/// Temperature in degrees Celsius.
pub const TEMPERATURE_BOUNDS: VitalBounds = VitalBounds {
    field: "temperature",
    min: 0.0,
    max: 50.0,
};

/// Weight in kilograms.
pub const WEIGHT_BOUNDS: VitalBounds = VitalBounds {
    field: "weight",
    min: 0.0,
    max: 1000.0,
};

/// Height in centimetres.
pub const HEIGHT_BOUNDS: VitalBounds = VitalBounds {
    field: "height",
    min: 0.0,
    max: 200.0,
};

/// Unvalidated visit input. Only `next_visit` is optional.
#[derive(Debug, Clone, Default)]
pub struct VisitDraft<'a> {
    pub visit_date: Option<DateTime<Utc>>,
    pub next_visit: Option<DateTime<Utc>>,
    pub temperature: Option<f64>,
    pub weight: Option<f64>,
    pub height: Option<f64>,
    pub diagnosis: Option<String>,
    /// Attending veterinarian, must already be persisted.
    pub veterinarian: Option<&'a Owner>,
    /// Must already be persisted.
    pub patient: Option<&'a Patient>,
}

/// A dated clinical encounter recording vitals and a diagnosis.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Visit {
    pub(crate) id: Option<i64>,
    pub(crate) visit_date: DateTime<Utc>,
    pub(crate) next_visit: Option<DateTime<Utc>>,
    pub(crate) temperature: f64,
    pub(crate) weight: f64,
    pub(crate) height: f64,
    pub(crate) diagnosis: String,
    pub(crate) veterinarian_id: i64,
    pub(crate) patient_id: i64,
    /// Lab test ids in registration order, loaded from the store.
    pub(crate) lab_tests: Vec<i64>,
}

impl Visit {
    /// Validate a draft against the current local time of the clinic.
    pub fn new(draft: VisitDraft<'_>) -> ValidationResult<Self> {
        Self::new_at(draft, Local::now())
    }

    /// Validate a draft against `now`.
    ///
    /// Visits are only recorded on the day they happen, judged on the
    /// calendar of `now`'s time zone, and a scheduled follow-up must lie
    /// strictly after `now`. Vitals must be finite numbers; values outside
    /// their declared bounds are accepted and logged, see
    /// [`Visit::vitals_outside_bounds`].
    pub fn new_at<Tz: TimeZone>(draft: VisitDraft<'_>, now: DateTime<Tz>) -> ValidationResult<Self> {
        let visit_date = required(draft.visit_date, "visit_date")?;
        let temperature = required(draft.temperature, "temperature")?;
        let weight = required(draft.weight, "weight")?;
        let height = required(draft.height, "height")?;
        let diagnosis = required(draft.diagnosis, "diagnosis")?;
        let veterinarian_id = persisted_id(draft.veterinarian, "veterinarian")?;
        let patient_id = persisted_id(draft.patient, "patient")?;

        let visit_day = visit_date.with_timezone(&now.timezone()).date_naive();
        if visit_day != now.date_naive() {
            return Err(ValidationError::OutOfRange {
                field: "visit_date",
                reason: format!("{} is not today", visit_day),
            });
        }

        if let Some(next) = draft.next_visit {
            if next <= now {
                return Err(ValidationError::OutOfRange {
                    field: "next_visit",
                    reason: format!("{} is not in the future", next.to_rfc3339()),
                });
            }
        }

        for (bounds, value) in [
            (TEMPERATURE_BOUNDS, temperature),
            (WEIGHT_BOUNDS, weight),
            (HEIGHT_BOUNDS, height),
        ] {
            if !value.is_finite() {
                return Err(ValidationError::InvalidFormat(bounds.field));
            }
        }

        let visit = Self {
            id: None,
            visit_date,
            next_visit: draft.next_visit,
            temperature,
            weight,
            height,
            diagnosis,
            veterinarian_id,
            patient_id,
            lab_tests: Vec::new(),
        };

        let outside = visit.vitals_outside_bounds();
        if !outside.is_empty() {
            tracing::warn!(
                patient_id,
                fields = ?outside,
                "Accepting visit with vitals outside declared bounds"
            );
        }

        Ok(visit)
    }

    pub fn visit_date(&self) -> DateTime<Utc> {
        self.visit_date
    }

    pub fn next_visit(&self) -> Option<DateTime<Utc>> {
        self.next_visit
    }

    pub fn temperature(&self) -> f64 {
        self.temperature
    }

    pub fn weight(&self) -> f64 {
        self.weight
    }

    pub fn height(&self) -> f64 {
        self.height
    }

    pub fn diagnosis(&self) -> &str {
        &self.diagnosis
    }

    pub fn veterinarian_id(&self) -> i64 {
        self.veterinarian_id
    }

    pub fn patient_id(&self) -> i64 {
        self.patient_id
    }

    /// Ids of the lab tests registered under this visit, oldest first.
    pub fn lab_tests(&self) -> &[i64] {
        &self.lab_tests
    }

    /// Names of the vitals lying outside their declared bounds.
    pub fn vitals_outside_bounds(&self) -> Vec<&'static str> {
        [
            (TEMPERATURE_BOUNDS, self.temperature),
            (WEIGHT_BOUNDS, self.weight),
            (HEIGHT_BOUNDS, self.height),
        ]
        .into_iter()
        .filter(|(bounds, value)| !bounds.contains(*value))
        .map(|(bounds, _)| bounds.field)
        .collect()
    }
}

impl Entity for Visit {
    const NAME: &'static str = "visits";
    const FIELDS: &'static [&'static str] = &[
        "visit_date",
        "next_visit",
        "temperature",
        "weight",
        "height",
        "diagnosis",
        "veterinarian_id",
        "patient_id",
    ];

    fn id(&self) -> Option<i64> {
        self.id
    }

    fn assign_id(&mut self, id: i64) {
        self.id = Some(id);
    }
}
