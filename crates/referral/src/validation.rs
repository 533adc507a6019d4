//! Referral record validation.
//!
//! [`validate`] checks every field-level and cross-field invariant of a wire
//! record and reports *all* violations, not just the first, each tagged with
//! the offending wire field key and a [`ReasonCode`]. On success it produces
//! the typed [`ReferralRecord`]. It is pure: no I/O, no mutation of the
//! input, safe to call concurrently.
//!
//! A field that is absent (or blank) yields exactly one `MISSING_FIELD` and
//! no further diagnostics for that field, so multiple omissions surface as
//! one error each.

use chrono::NaiveDate;
use nzis_types::{DigitCode, NonEmptyText, TypeError};
use serde::Serialize;

use crate::record::{ReferenceId, ReferralRecord};
use crate::registry::Registry;
use crate::wire::{field, ReferralWire};

/// Machine-readable reason for a validation failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReasonCode {
    /// A required field is absent or blank.
    MissingField,
    /// Wrong length, charset, or value shape for the field.
    BadFormat,
    /// A chronological invariant is violated.
    BadDateOrder,
    /// The reference type is not in the registry's valid set.
    UnknownReferenceType,
    /// A location code has no registry entry.
    UnknownLocationCode,
    /// Condition code and description disagree with the registry.
    InconsistentCondition,
}

impl ReasonCode {
    /// The canonical wire spelling of this reason code.
    pub fn as_str(&self) -> &'static str {
        match self {
            ReasonCode::MissingField => "MISSING_FIELD",
            ReasonCode::BadFormat => "BAD_FORMAT",
            ReasonCode::BadDateOrder => "BAD_DATE_ORDER",
            ReasonCode::UnknownReferenceType => "UNKNOWN_REFERENCE_TYPE",
            ReasonCode::UnknownLocationCode => "UNKNOWN_LOCATION_CODE",
            ReasonCode::InconsistentCondition => "INCONSISTENT_CONDITION",
        }
    }
}

impl std::fmt::Display for ReasonCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One violation found in a wire record.
///
/// Violations are data errors, always recoverable: the caller decides whether
/// to reject, quarantine, or request correction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationError {
    /// Wire field key the violation applies to.
    pub field: &'static str,
    /// Machine-readable reason.
    pub code: ReasonCode,
    /// Human-readable explanation.
    pub message: String,
}

impl ValidationError {
    fn new(field: &'static str, code: ReasonCode, message: impl Into<String>) -> Self {
        Self {
            field,
            code,
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}: {}", self.field, self.code, self.message)
    }
}

fn missing(field: &'static str) -> ValidationError {
    ValidationError::new(field, ReasonCode::MissingField, "required field is absent")
}

fn bad_format(field: &'static str, message: impl Into<String>) -> ValidationError {
    ValidationError::new(field, ReasonCode::BadFormat, message)
}

fn bad_date_order(field: &'static str, message: impl Into<String>) -> ValidationError {
    ValidationError::new(field, ReasonCode::BadDateOrder, message)
}

fn require_text(
    field: &'static str,
    value: &Option<String>,
    errors: &mut Vec<ValidationError>,
) -> Option<NonEmptyText> {
    let Some(value) = value else {
        errors.push(missing(field));
        return None;
    };
    match NonEmptyText::new(value) {
        Ok(text) => Some(text),
        Err(_) => {
            // Whitespace-only counts as absent, not malformed.
            errors.push(missing(field));
            None
        }
    }
}

fn require_digit_code<const W: usize>(
    field: &'static str,
    value: &Option<String>,
    errors: &mut Vec<ValidationError>,
) -> Option<DigitCode<W>> {
    let Some(value) = value else {
        errors.push(missing(field));
        return None;
    };
    match DigitCode::parse(value) {
        Ok(code) => Some(code),
        Err(TypeError::Empty) => {
            errors.push(missing(field));
            None
        }
        Err(TypeError::NotDigits(_)) => {
            errors.push(bad_format(field, "must contain only digits"));
            None
        }
        Err(TypeError::BadLength {
            expected, actual, ..
        }) => {
            errors.push(bad_format(
                field,
                format!("must be exactly {expected} digits, got {actual}"),
            ));
            None
        }
    }
}

fn require_date(
    field: &'static str,
    value: &Option<String>,
    errors: &mut Vec<ValidationError>,
) -> Option<NaiveDate> {
    let text = require_text(field, value, errors)?;
    match NaiveDate::parse_from_str(text.as_str(), "%Y-%m-%d") {
        Ok(date) => Some(date),
        Err(_) => {
            errors.push(bad_format(
                field,
                format!("'{text}' is not an ISO-8601 date (YYYY-MM-DD)"),
            ));
            None
        }
    }
}

fn optional_date(
    field: &'static str,
    value: &Option<String>,
    errors: &mut Vec<ValidationError>,
) -> Option<NaiveDate> {
    let text = value.as_deref().map(str::trim).filter(|s| !s.is_empty())?;
    match NaiveDate::parse_from_str(text, "%Y-%m-%d") {
        Ok(date) => Some(date),
        Err(_) => {
            errors.push(bad_format(
                field,
                format!("'{text}' is not an ISO-8601 date (YYYY-MM-DD)"),
            ));
            None
        }
    }
}

/// Accumulates typed fields until every check has run.
#[derive(Default)]
struct Draft {
    id: Option<u64>,
    health_provision_number: Option<DigitCode<12>>,
    patient_name: Option<NonEmptyText>,
    patient_pid: Option<DigitCode<10>>,
    issued_date: Option<NaiveDate>,
    reference_id: Option<ReferenceId>,
    reference_type: Option<u16>,
    primary_location: Option<NonEmptyText>,
    primary_location_code: Option<u32>,
    secondary_location: Option<NonEmptyText>,
    secondary_location_code: Option<u32>,
    patient_state_code: Option<NonEmptyText>,
    referring_doctor: Option<NonEmptyText>,
    doctor_id: Option<u64>,
    condition_code: Option<DigitCode<2>>,
    condition_description: Option<NonEmptyText>,
    regional_health_code: Option<NonEmptyText>,
    executor_name: Option<NonEmptyText>,
    material_collection_date: Option<NaiveDate>,
    result_date: Option<NaiveDate>,
}

impl Draft {
    /// Converts to a record, naming the field that is unexpectedly absent.
    ///
    /// When validation reported no errors every required field is present;
    /// this keeps that dependency explicit instead of unwrapping.
    fn finish(self) -> Result<ReferralRecord, &'static str> {
        Ok(ReferralRecord {
            id: self.id.ok_or(field::ID)?,
            health_provision_number: self.health_provision_number.ok_or(field::HPH)?,
            patient_name: self.patient_name.ok_or(field::PATIENT_NAME)?,
            patient_pid: self.patient_pid.ok_or(field::PATIENT_PID)?,
            issued_date: self.issued_date.ok_or(field::ISSUED_DATE)?,
            reference_id: self.reference_id.ok_or(field::REFERENCE_ID)?,
            reference_type: self.reference_type.ok_or(field::REFERENCE_TYPE)?,
            primary_location: self.primary_location.ok_or(field::PRIMARY_LOCATION)?,
            primary_location_code: self
                .primary_location_code
                .ok_or(field::PRIMARY_LOCATION_CODE)?,
            secondary_location: self.secondary_location.ok_or(field::SECONDARY_LOCATION)?,
            secondary_location_code: self
                .secondary_location_code
                .ok_or(field::SECONDARY_LOCATION_CODE)?,
            patient_state_code: self.patient_state_code.ok_or(field::PATIENT_STATE_CODE)?,
            referring_doctor: self.referring_doctor.ok_or(field::REFERRING_DOCTOR)?,
            doctor_id: self.doctor_id.ok_or(field::DOCTOR_ID)?,
            condition_code: self.condition_code.ok_or(field::CONDITION_CODE)?,
            condition_description: self
                .condition_description
                .ok_or(field::CONDITION_DESCRIPTION)?,
            regional_health_code: self
                .regional_health_code
                .ok_or(field::REGIONAL_HEALTH_CODE)?,
            executor_name: self.executor_name.ok_or(field::EXECUTOR_NAME)?,
            material_collection_date: self.material_collection_date,
            result_date: self.result_date,
        })
    }
}

/// Validates a wire record against the registry, with `today` as the upper
/// bound for `issuedDate`.
///
/// Returns the typed record, or every violation found. The input is not
/// mutated; run [`crate::normalize`] first if the feed needs canonical
/// formatting.
pub fn validate(
    wire: &ReferralWire,
    registry: &Registry,
    today: NaiveDate,
) -> Result<ReferralRecord, Vec<ValidationError>> {
    let mut errors = Vec::new();
    let mut draft = Draft::default();

    draft.id = match wire.id {
        None => {
            errors.push(missing(field::ID));
            None
        }
        Some(0) => {
            errors.push(bad_format(field::ID, "must be a positive integer"));
            None
        }
        Some(id) => Some(id),
    };

    draft.health_provision_number = require_digit_code(field::HPH, &wire.hph, &mut errors);
    draft.patient_name = require_text(field::PATIENT_NAME, &wire.patient_name, &mut errors);
    draft.patient_pid = require_digit_code(field::PATIENT_PID, &wire.patient_pid, &mut errors);

    draft.issued_date = require_date(field::ISSUED_DATE, &wire.issued_date, &mut errors);
    if let Some(issued) = draft.issued_date {
        if issued > today {
            errors.push(bad_date_order(
                field::ISSUED_DATE,
                format!("{issued} is in the future (today is {today})"),
            ));
        }
    }

    draft.reference_id = match &wire.reference_id {
        None => {
            errors.push(missing(field::REFERENCE_ID));
            None
        }
        Some(raw) if raw.trim().is_empty() => {
            errors.push(missing(field::REFERENCE_ID));
            None
        }
        Some(raw) => match ReferenceId::parse(raw) {
            Ok(reference_id) => Some(reference_id),
            Err(_) => {
                errors.push(bad_format(
                    field::REFERENCE_ID,
                    "must be ASCII alphanumeric",
                ));
                None
            }
        },
    };

    draft.reference_type = match wire.reference_type {
        None => {
            errors.push(missing(field::REFERENCE_TYPE));
            None
        }
        Some(reference_type) if !registry.has_reference_type(reference_type) => {
            errors.push(ValidationError::new(
                field::REFERENCE_TYPE,
                ReasonCode::UnknownReferenceType,
                format!("type {reference_type} is not in the registry"),
            ));
            None
        }
        Some(reference_type) => Some(reference_type),
    };

    draft.primary_location =
        require_text(field::PRIMARY_LOCATION, &wire.primary_location, &mut errors);
    draft.primary_location_code = check_location_code(
        field::PRIMARY_LOCATION_CODE,
        wire.primary_location_code,
        registry,
        &mut errors,
    );

    draft.secondary_location = require_text(
        field::SECONDARY_LOCATION,
        &wire.secondary_location,
        &mut errors,
    );
    draft.secondary_location_code = check_location_code(
        field::SECONDARY_LOCATION_CODE,
        wire.secondary_location_code,
        registry,
        &mut errors,
    );

    draft.patient_state_code = require_text(
        field::PATIENT_STATE_CODE,
        &wire.patient_state_code,
        &mut errors,
    );
    draft.referring_doctor =
        require_text(field::REFERRING_DOCTOR, &wire.referring_doctor, &mut errors);

    draft.doctor_id = match wire.doctor_id {
        None => {
            errors.push(missing(field::DOCTOR_ID));
            None
        }
        Some(0) => {
            errors.push(bad_format(field::DOCTOR_ID, "must be a positive integer"));
            None
        }
        Some(doctor_id) => Some(doctor_id),
    };

    draft.condition_code =
        require_digit_code(field::CONDITION_CODE, &wire.condition_code, &mut errors);
    draft.condition_description = require_text(
        field::CONDITION_DESCRIPTION,
        &wire.condition_description,
        &mut errors,
    );
    if let (Some(code), Some(description)) = (&draft.condition_code, &draft.condition_description)
    {
        match registry.condition_description(code.as_str()) {
            None => {
                errors.push(ValidationError::new(
                    field::CONDITION_CODE,
                    ReasonCode::InconsistentCondition,
                    format!("condition code '{code}' has no registry entry"),
                ));
            }
            Some(expected) if expected != description.as_str() => {
                errors.push(ValidationError::new(
                    field::CONDITION_CODE,
                    ReasonCode::InconsistentCondition,
                    format!(
                        "description '{description}' does not match registry entry '{expected}' for code '{code}'"
                    ),
                ));
            }
            Some(_) => {}
        }
    }

    draft.regional_health_code = require_text(
        field::REGIONAL_HEALTH_CODE,
        &wire.regional_health_code,
        &mut errors,
    )
    .and_then(|text| {
        if text.as_str().bytes().all(|b| b.is_ascii_digit()) {
            Some(text)
        } else {
            errors.push(bad_format(
                field::REGIONAL_HEALTH_CODE,
                "must be a numeric string",
            ));
            None
        }
    });

    draft.executor_name = require_text(field::EXECUTOR_NAME, &wire.executor_name, &mut errors);

    draft.material_collection_date = optional_date(
        field::MATERIAL_COLLECTION_DATE,
        &wire.material_collection_date,
        &mut errors,
    );
    draft.result_date = optional_date(field::RESULT_DATE, &wire.result_date, &mut errors);

    if let (Some(issued), Some(collected)) = (draft.issued_date, draft.material_collection_date) {
        if collected < issued {
            errors.push(bad_date_order(
                field::MATERIAL_COLLECTION_DATE,
                format!("{collected} is before issuedDate {issued}"),
            ));
        }
    }
    if let Some(result) = draft.result_date {
        if let Some(collected) = draft.material_collection_date {
            if result < collected {
                errors.push(bad_date_order(
                    field::RESULT_DATE,
                    format!("{result} is before materialCollectionDate {collected}"),
                ));
            }
        } else if let Some(issued) = draft.issued_date {
            if result < issued {
                errors.push(bad_date_order(
                    field::RESULT_DATE,
                    format!("{result} is before issuedDate {issued}"),
                ));
            }
        }
    }

    if !errors.is_empty() {
        return Err(errors);
    }
    draft.finish().map_err(|field| vec![missing(field)])
}

/// Validates with the current UTC date as the `issuedDate` upper bound.
pub fn validate_now(
    wire: &ReferralWire,
    registry: &Registry,
) -> Result<ReferralRecord, Vec<ValidationError>> {
    validate(wire, registry, chrono::Utc::now().date_naive())
}

fn check_location_code(
    field: &'static str,
    value: Option<u32>,
    registry: &Registry,
    errors: &mut Vec<ValidationError>,
) -> Option<u32> {
    match value {
        None => {
            errors.push(missing(field));
            None
        }
        Some(code) if !registry.has_location(code) => {
            errors.push(ValidationError::new(
                field,
                ReasonCode::UnknownLocationCode,
                format!("location code {code} has no registry entry"),
            ));
            None
        }
        Some(code) => Some(code),
    }
}
