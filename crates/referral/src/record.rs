//! Validated domain model of a referral record.
//!
//! [`ReferralRecord`] is the typed counterpart of [`crate::ReferralWire`]: a
//! record that has passed [`crate::validation::validate`] and whose fields
//! carry their invariants in the type (digit-string widths, non-empty text,
//! parsed dates). Construction goes through validation; there is no way to
//! obtain one from raw wire data without it.
//!
//! A record is immutable once issued. The workflow progresses by the later
//! addition of the material-collection and result dates only, and a record is
//! never deleted, only superseded by a new record with a new [`ReferenceId`].

use std::cmp::Ordering;
use std::fmt;

use chrono::NaiveDate;
use nzis_types::{DigitCode, NonEmptyText};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::wire::ReferralWire;
use crate::ReferralError;

/// 12-digit health provision number.
pub type ProvisionNumber = DigitCode<12>;

/// 10-digit national personal identification number.
pub type PersonalId = DigitCode<10>;

/// 2-digit condition/diagnosis registry code.
pub type ConditionCode = DigitCode<2>;

/// External referral document identifier assigned by the national system.
///
/// Canonical form is a non-empty ASCII alphanumeric code, e.g.
/// `25099A0000F6`. The national system guarantees system-wide uniqueness;
/// this type only enforces the shape.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ReferenceId(String);

impl ReferenceId {
    /// Parses and validates a referral document identifier.
    ///
    /// # Errors
    ///
    /// Returns [`ReferralError::InvalidReferenceId`] if the trimmed input is
    /// empty or contains anything other than ASCII letters and digits.
    pub fn parse(raw: &str) -> Result<Self, ReferralError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() || !trimmed.bytes().all(|b| b.is_ascii_alphanumeric()) {
            return Err(ReferralError::InvalidReferenceId(raw.to_string()));
        }
        Ok(Self(trimmed.to_string()))
    }

    /// Returns the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ReferenceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Serialize for ReferenceId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for ReferenceId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Self::parse(&s).map_err(serde::de::Error::custom)
    }
}

/// Workflow stage of a referral, derived from optional-field presence.
///
/// The wire format has no status field: a referral with neither trailing date
/// is merely issued, one with a material-collection date is in progress, one
/// with a result date is complete. This enum gives that progression a name
/// without changing the serialized shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkflowStage {
    /// Referral issued; no material collected yet.
    Issued,
    /// Material/sample collected; results pending.
    MaterialCollected,
    /// Results are available.
    ResultReady,
}

impl fmt::Display for WorkflowStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            WorkflowStage::Issued => "issued",
            WorkflowStage::MaterialCollected => "material collected",
            WorkflowStage::ResultReady => "result ready",
        };
        write!(f, "{label}")
    }
}

/// One validated referral record.
///
/// All chronological invariants hold: `issued_date` is not in the future,
/// `material_collection_date >= issued_date` when present, and `result_date`
/// is not earlier than the material-collection date (or the issue date when
/// no material has been collected).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferralRecord {
    /// Local record identifier, positive and unique within the dataset.
    pub id: u64,
    /// Health provision number.
    pub health_provision_number: ProvisionNumber,
    /// Patient full name.
    pub patient_name: NonEmptyText,
    /// National personal identification number of the patient.
    pub patient_pid: PersonalId,
    /// Date the referral was issued.
    pub issued_date: NaiveDate,
    /// External document identifier; unique across the national system.
    pub reference_id: ReferenceId,
    /// Referral category, a member of the registry's reference-type set.
    pub reference_type: u16,
    /// Issuing facility/region.
    pub primary_location: NonEmptyText,
    /// Registry code of the issuing facility/region.
    pub primary_location_code: u32,
    /// Destination facility/region.
    pub secondary_location: NonEmptyText,
    /// Registry code of the destination facility/region.
    pub secondary_location_code: u32,
    /// Patient status code at the issuing facility.
    pub patient_state_code: NonEmptyText,
    /// Referring physician.
    pub referring_doctor: NonEmptyText,
    /// Referring physician identifier, positive.
    pub doctor_id: u64,
    /// Condition/diagnosis code.
    pub condition_code: ConditionCode,
    /// Condition description, consistent with the registry entry for the code.
    pub condition_description: NonEmptyText,
    /// Regional health-authority code.
    pub regional_health_code: NonEmptyText,
    /// Entity that will execute the referral.
    pub executor_name: NonEmptyText,
    /// Date material was collected, when the workflow has reached that point.
    pub material_collection_date: Option<NaiveDate>,
    /// Date results became available.
    pub result_date: Option<NaiveDate>,
}

impl ReferralRecord {
    /// Returns the workflow stage derived from optional-field presence.
    pub fn stage(&self) -> WorkflowStage {
        if self.result_date.is_some() {
            WorkflowStage::ResultReady
        } else if self.material_collection_date.is_some() {
            WorkflowStage::MaterialCollected
        } else {
            WorkflowStage::Issued
        }
    }

    /// Converts back to the wire shape with canonical ISO-8601 dates.
    pub fn to_wire(&self) -> ReferralWire {
        ReferralWire {
            id: Some(self.id),
            hph: Some(self.health_provision_number.as_str().to_string()),
            patient_name: Some(self.patient_name.as_str().to_string()),
            patient_pid: Some(self.patient_pid.as_str().to_string()),
            issued_date: Some(self.issued_date.to_string()),
            reference_id: Some(self.reference_id.as_str().to_string()),
            reference_type: Some(self.reference_type),
            primary_location: Some(self.primary_location.as_str().to_string()),
            primary_location_code: Some(self.primary_location_code),
            secondary_location: Some(self.secondary_location.as_str().to_string()),
            secondary_location_code: Some(self.secondary_location_code),
            patient_state_code: Some(self.patient_state_code.as_str().to_string()),
            referring_doctor: Some(self.referring_doctor.as_str().to_string()),
            doctor_id: Some(self.doctor_id),
            condition_code: Some(self.condition_code.as_str().to_string()),
            condition_description: Some(self.condition_description.as_str().to_string()),
            regional_health_code: Some(self.regional_health_code.as_str().to_string()),
            executor_name: Some(self.executor_name.as_str().to_string()),
            material_collection_date: self.material_collection_date.map(|d| d.to_string()),
            result_date: self.result_date.map(|d| d.to_string()),
        }
    }
}

/// Total order for deterministic listing: `issued_date` ascending, ties
/// broken by `id` ascending.
///
/// Since `id` is unique within a dataset, this is antisymmetric over any
/// record set the store produces.
pub fn compare_issued_then_id(a: &ReferralRecord, b: &ReferralRecord) -> Ordering {
    a.issued_date
        .cmp(&b.issued_date)
        .then_with(|| a.id.cmp(&b.id))
}
