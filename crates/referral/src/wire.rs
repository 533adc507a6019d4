//! NZIS referral wire schema.
//!
//! [`ReferralWire`] is the exact JSON shape the national system feed delivers:
//! camelCase keys, digit-string identifiers, ISO date strings, and the two
//! trailing workflow dates simply absent until the workflow reaches them.
//! Every field is optional here so that an incomplete record still parses and
//! can be reported field by field; requiredness is enforced by
//! [`crate::validation::validate`], not by the deserializer.
//!
//! Unknown keys are rejected (`deny_unknown_fields`) so a misspelt field in a
//! feed surfaces as a parse error with its path rather than silently becoming
//! a missing-field rejection.

use serde::{Deserialize, Serialize};

use crate::{ReferralError, ReferralResult};

/// Wire field keys, as they appear in the NZIS feed.
///
/// Validation errors are tagged with these so that a rejection report can be
/// matched directly against the offending JSON document.
pub mod field {
    pub const ID: &str = "id";
    pub const HPH: &str = "hph";
    pub const PATIENT_NAME: &str = "patientName";
    pub const PATIENT_PID: &str = "patientPid";
    pub const ISSUED_DATE: &str = "issuedDate";
    pub const REFERENCE_ID: &str = "referenceId";
    pub const REFERENCE_TYPE: &str = "referenceType";
    pub const PRIMARY_LOCATION: &str = "primaryLocation";
    pub const PRIMARY_LOCATION_CODE: &str = "primaryLocationCode";
    pub const SECONDARY_LOCATION: &str = "secondaryLocation";
    pub const SECONDARY_LOCATION_CODE: &str = "secondaryLocationCode";
    pub const PATIENT_STATE_CODE: &str = "patientStateCode";
    pub const REFERRING_DOCTOR: &str = "referringDoctor";
    pub const DOCTOR_ID: &str = "doctorId";
    pub const CONDITION_CODE: &str = "conditionCode";
    pub const CONDITION_DESCRIPTION: &str = "conditionDescription";
    pub const REGIONAL_HEALTH_CODE: &str = "regionalHealthCode";
    pub const EXECUTOR_NAME: &str = "executorName";
    pub const MATERIAL_COLLECTION_DATE: &str = "materialCollectionDate";
    pub const RESULT_DATE: &str = "resultDate";
}

/// One referral record as carried on the wire.
///
/// Serialization always emits the short NZIS keys (`hph`, `patientPid`);
/// deserialization additionally accepts the spelt-out aliases some exports
/// use (`healthProvisionNumber`, `patientPersonalId`).
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ReferralWire {
    /// Local record identifier, unique within the dataset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,

    /// Health provision number: a 12-digit contract/provider identifier.
    #[serde(alias = "healthProvisionNumber", skip_serializing_if = "Option::is_none")]
    pub hph: Option<String>,

    /// Patient full name.
    #[serde(rename = "patientName", skip_serializing_if = "Option::is_none")]
    pub patient_name: Option<String>,

    /// National personal identification number: 10 digits.
    #[serde(
        rename = "patientPid",
        alias = "patientPersonalId",
        skip_serializing_if = "Option::is_none"
    )]
    pub patient_pid: Option<String>,

    /// Date the referral was issued (ISO 8601 date).
    #[serde(rename = "issuedDate", skip_serializing_if = "Option::is_none")]
    pub issued_date: Option<String>,

    /// External document identifier assigned by the national system.
    #[serde(rename = "referenceId", skip_serializing_if = "Option::is_none")]
    pub reference_id: Option<String>,

    /// Referral category code; the valid set is defined by the registry.
    #[serde(rename = "referenceType", skip_serializing_if = "Option::is_none")]
    pub reference_type: Option<u16>,

    /// Issuing facility/region name.
    #[serde(rename = "primaryLocation", skip_serializing_if = "Option::is_none")]
    pub primary_location: Option<String>,

    /// Issuing facility/region registry code.
    #[serde(rename = "primaryLocationCode", skip_serializing_if = "Option::is_none")]
    pub primary_location_code: Option<u32>,

    /// Destination facility/region name.
    #[serde(rename = "secondaryLocation", skip_serializing_if = "Option::is_none")]
    pub secondary_location: Option<String>,

    /// Destination facility/region registry code.
    #[serde(rename = "secondaryLocationCode", skip_serializing_if = "Option::is_none")]
    pub secondary_location_code: Option<u32>,

    /// Patient status code at the issuing facility.
    #[serde(rename = "patientStateCode", skip_serializing_if = "Option::is_none")]
    pub patient_state_code: Option<String>,

    /// Referring physician name.
    #[serde(rename = "referringDoctor", skip_serializing_if = "Option::is_none")]
    pub referring_doctor: Option<String>,

    /// Referring physician unique identifier.
    #[serde(rename = "doctorId", skip_serializing_if = "Option::is_none")]
    pub doctor_id: Option<u64>,

    /// Diagnosis/condition registry code.
    #[serde(rename = "conditionCode", skip_serializing_if = "Option::is_none")]
    pub condition_code: Option<String>,

    /// Human-readable condition description; must match the registry entry.
    #[serde(rename = "conditionDescription", skip_serializing_if = "Option::is_none")]
    pub condition_description: Option<String>,

    /// Regional health-authority code (numeric string).
    #[serde(rename = "regionalHealthCode", skip_serializing_if = "Option::is_none")]
    pub regional_health_code: Option<String>,

    /// Entity that will execute the referral.
    #[serde(rename = "executorName", skip_serializing_if = "Option::is_none")]
    pub executor_name: Option<String>,

    /// Date sample/material was collected; absent until that happens.
    #[serde(
        rename = "materialCollectionDate",
        skip_serializing_if = "Option::is_none"
    )]
    pub material_collection_date: Option<String>,

    /// Date results became available; absent until that happens.
    #[serde(rename = "resultDate", skip_serializing_if = "Option::is_none")]
    pub result_date: Option<String>,
}

fn schema_error(err: serde_path_to_error::Error<serde_json::Error>) -> ReferralError {
    let path = err.path().to_string();
    let path = if path.is_empty() {
        "<root>".to_string()
    } else {
        path
    };
    ReferralError::Schema {
        path,
        source: err.into_inner(),
    }
}

/// Parse a single referral record from JSON text.
///
/// This uses `serde_path_to_error` to surface the path to the failing field
/// (e.g. `referenceType`) when the JSON does not match the wire schema.
///
/// # Errors
///
/// Returns [`ReferralError::Schema`] if the JSON is malformed, a field has an
/// unexpected type, or an unknown key is present.
pub fn parse_json(input: &str) -> ReferralResult<ReferralWire> {
    let mut deserializer = serde_json::Deserializer::from_str(input);
    serde_path_to_error::deserialize(&mut deserializer).map_err(schema_error)
}

/// Parse a batch of referral records from a JSON array.
///
/// This is the shape of an NZIS export file: a top-level array of records.
///
/// # Errors
///
/// Returns [`ReferralError::Schema`] with an indexed path (e.g.
/// `[3].doctorId`) when any element does not match the wire schema.
pub fn parse_json_batch(input: &str) -> ReferralResult<Vec<ReferralWire>> {
    let mut deserializer = serde_json::Deserializer::from_str(input);
    serde_path_to_error::deserialize(&mut deserializer).map_err(schema_error)
}

/// Render a referral record as pretty-printed JSON with the NZIS keys.
///
/// Absent optional fields are omitted entirely, preserving the feed's
/// optional-field shape.
pub fn render_json(wire: &ReferralWire) -> ReferralResult<String> {
    Ok(serde_json::to_string_pretty(wire)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_complete_record() {
        let input = r#"{
            "id": 1,
            "hph": "123456789012",
            "patientName": "Иван Стойков Иванов",
            "patientPid": "1234567890",
            "issuedDate": "2025-04-09",
            "referenceId": "25099A0000F6",
            "referenceType": 1,
            "primaryLocation": "Пловдив",
            "primaryLocationCode": 16,
            "secondaryLocation": "Съединение",
            "secondaryLocationCode": 15,
            "patientStateCode": "ZOO",
            "referringDoctor": "Тодор Николов",
            "doctorId": 1700003565,
            "conditionCode": "06",
            "conditionDescription": "Вътрешни болести",
            "regionalHealthCode": "1622111277",
            "executorName": "Д-р Иванов",
            "materialCollectionDate": "2025-04-09",
            "resultDate": "2025-04-10"
        }"#;

        let wire = parse_json(input).expect("parse record");
        assert_eq!(wire.id, Some(1));
        assert_eq!(wire.hph.as_deref(), Some("123456789012"));
        assert_eq!(wire.reference_type, Some(1));
        assert_eq!(wire.result_date.as_deref(), Some("2025-04-10"));
    }

    #[test]
    fn parses_partial_record_with_absent_fields() {
        let wire = parse_json(r#"{"id": 7, "patientName": "Иван Иванов"}"#).expect("parse partial");
        assert_eq!(wire.id, Some(7));
        assert!(wire.hph.is_none());
        assert!(wire.material_collection_date.is_none());
    }

    #[test]
    fn accepts_spelt_out_aliases() {
        let wire = parse_json(
            r#"{"healthProvisionNumber": "123456789012", "patientPersonalId": "1234567890"}"#,
        )
        .expect("parse aliases");
        assert_eq!(wire.hph.as_deref(), Some("123456789012"));
        assert_eq!(wire.patient_pid.as_deref(), Some("1234567890"));
    }

    #[test]
    fn rejects_unknown_keys_with_path() {
        let err = parse_json(r#"{"id": 1, "unexpectedKey": true}"#).expect_err("unknown key");
        match err {
            ReferralError::Schema { .. } => {
                assert!(err.to_string().contains("unexpectedKey"));
            }
            other => panic!("expected Schema error, got {other:?}"),
        }
    }

    #[test]
    fn rejects_wrong_types_with_path() {
        let err = parse_json(r#"{"doctorId": "not-a-number"}"#).expect_err("wrong type");
        match err {
            ReferralError::Schema { path, .. } => assert_eq!(path, "doctorId"),
            other => panic!("expected Schema error, got {other:?}"),
        }
    }

    #[test]
    fn batch_errors_carry_element_index() {
        let err =
            parse_json_batch(r#"[{"id": 1}, {"id": "two"}]"#).expect_err("bad second element");
        match err {
            ReferralError::Schema { path, .. } => {
                assert!(path.contains('1') && path.contains("id"), "path was {path}");
            }
            other => panic!("expected Schema error, got {other:?}"),
        }
    }

    #[test]
    fn render_omits_absent_optional_fields() {
        let wire = ReferralWire {
            id: Some(1),
            issued_date: Some("2025-04-09".into()),
            ..ReferralWire::default()
        };

        let json = render_json(&wire).expect("render");
        assert!(json.contains("\"issuedDate\""));
        assert!(!json.contains("materialCollectionDate"));
        assert!(!json.contains("resultDate"));
    }
}
