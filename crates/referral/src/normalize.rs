//! Deterministic normalization of wire records.
//!
//! `normalize` applies formatting only; it never changes semantic content and
//! never rejects anything. Text is trimmed (whitespace-only values become
//! absent so they report as missing), short condition codes are zero-padded,
//! and dates are canonicalized to ISO-8601. Identifier digit strings (`hph`,
//! `patientPid`) are never padded: their digits are the identifier, and an
//! under-length one is data to reject, not formatting to repair. Anything
//! normalization cannot interpret is passed through untouched for validation
//! to flag. Applying it twice yields the same result as once.

use chrono::NaiveDate;
use nzis_types::DigitCode;

use crate::wire::ReferralWire;

/// Date shapes accepted on input; output is always `%Y-%m-%d`.
///
/// The second form appears in manually entered exports, the third in older
/// regional extracts.
const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%d.%m.%Y"];

fn clean(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn pad_digits<const W: usize>(value: Option<String>) -> Option<String> {
    value.map(|s| match DigitCode::<W>::padded(&s) {
        Ok(code) => code.as_str().to_string(),
        // Not a short digit string; leave it for validation to reject.
        Err(_) => s,
    })
}

fn canonical_date(value: Option<String>) -> Option<String> {
    value.map(|s| {
        for format in DATE_FORMATS {
            if let Ok(date) = NaiveDate::parse_from_str(&s, format) {
                return date.to_string();
            }
        }
        s
    })
}

/// Normalize a wire record into its canonical textual form.
///
/// Idempotent: `normalize(&normalize(w)) == normalize(w)`.
pub fn normalize(wire: &ReferralWire) -> ReferralWire {
    ReferralWire {
        id: wire.id,
        hph: clean(&wire.hph),
        patient_name: clean(&wire.patient_name),
        patient_pid: clean(&wire.patient_pid),
        issued_date: canonical_date(clean(&wire.issued_date)),
        reference_id: clean(&wire.reference_id),
        reference_type: wire.reference_type,
        primary_location: clean(&wire.primary_location),
        primary_location_code: wire.primary_location_code,
        secondary_location: clean(&wire.secondary_location),
        secondary_location_code: wire.secondary_location_code,
        patient_state_code: clean(&wire.patient_state_code),
        referring_doctor: clean(&wire.referring_doctor),
        doctor_id: wire.doctor_id,
        condition_code: pad_digits::<2>(clean(&wire.condition_code)),
        condition_description: clean(&wire.condition_description),
        regional_health_code: clean(&wire.regional_health_code),
        executor_name: clean(&wire.executor_name),
        material_collection_date: canonical_date(clean(&wire.material_collection_date)),
        result_date: canonical_date(clean(&wire.result_date)),
    }
}
