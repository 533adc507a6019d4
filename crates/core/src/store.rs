//! Append-only referral store.
//!
//! Referrals are stored one JSON file per record, named by the NZIS
//! `referenceId`, under `<data_dir>/referrals/`. A stored record is never
//! deleted or replaced: corrections arrive from the national system as new
//! records with new reference ids. The only permitted mutations are the
//! one-shot addition of the material-collection date and the result date as
//! the workflow progresses.

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use nzis_referral::{
    compare_issued_then_id, normalize, parse_json, parse_json_batch, render_json, validate,
    Registry, ReferralRecord, ReferralWire, ValidationError,
};
use serde::Serialize;

use crate::config::CoreConfig;
use crate::constants::REFERRAL_FILE_EXTENSION;
use crate::{StoreError, StoreResult};

/// Why an individual record in a batch was not stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum RejectReason {
    /// The record failed validation; every violation is listed.
    Validation(Vec<ValidationError>),
    /// A referral with this reference id is already stored or appears
    /// earlier in the batch.
    DuplicateReferenceId,
    /// A referral with this local id is already stored or appears earlier in
    /// the batch.
    DuplicateId,
}

impl std::fmt::Display for RejectReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RejectReason::Validation(errors) => {
                let details: Vec<String> = errors.iter().map(ToString::to_string).collect();
                write!(f, "{}", details.join("; "))
            }
            RejectReason::DuplicateReferenceId => write!(f, "duplicate referenceId"),
            RejectReason::DuplicateId => write!(f, "duplicate id"),
        }
    }
}

/// One record of a batch that was not stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RejectedReferral {
    /// Position of the record in the imported batch.
    pub index: usize,
    /// The record's reference id, when it carried one.
    pub reference_id: Option<String>,
    pub reason: RejectReason,
}

/// Outcome of importing a batch: which records were stored and which were
/// turned away, with their full violation lists.
///
/// An import never fails wholesale because of bad records; callers decide
/// what to do with the rejects.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportReport {
    /// Reference ids of stored records, in batch order.
    pub accepted: Vec<String>,
    pub rejected: Vec<RejectedReferral>,
}

impl ImportReport {
    pub fn is_clean(&self) -> bool {
        self.rejected.is_empty()
    }
}

/// Filesystem-backed referral store.
pub struct ReferralStore {
    config: CoreConfig,
    registry: Registry,
}

impl ReferralStore {
    /// Creates a store over an already-loaded registry.
    pub fn new(config: CoreConfig, registry: Registry) -> Self {
        Self { config, registry }
    }

    /// Creates a store, loading the registry the configuration points at.
    pub fn open(config: CoreConfig) -> StoreResult<Self> {
        let registry = config.load_registry()?;
        Ok(Self::new(config, registry))
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    fn referral_path(&self, reference_id: &str) -> PathBuf {
        self.config
            .referrals_dir()
            .join(format!("{reference_id}.{REFERRAL_FILE_EXTENSION}"))
    }

    /// Imports a JSON batch file (a top-level array of referral records).
    ///
    /// # Errors
    ///
    /// Fails only on I/O problems or a batch that is not valid JSON of the
    /// expected shape; per-record problems land in the report instead.
    pub fn import_file(&self, path: &Path) -> StoreResult<ImportReport> {
        let input = fs::read_to_string(path).map_err(StoreError::BatchRead)?;
        let batch = parse_json_batch(&input)?;
        self.import_batch(&batch)
    }

    /// Imports already-parsed wire records, validating against today's date.
    pub fn import_batch(&self, batch: &[ReferralWire]) -> StoreResult<ImportReport> {
        self.import_batch_at(batch, chrono::Utc::now().date_naive())
    }

    /// Imports wire records with an explicit `today` for the issue-date
    /// upper bound.
    pub fn import_batch_at(
        &self,
        batch: &[ReferralWire],
        today: NaiveDate,
    ) -> StoreResult<ImportReport> {
        let mut seen_ids = BTreeSet::new();
        let mut seen_references = BTreeSet::new();
        for record in self.load_all() {
            seen_ids.insert(record.id);
            seen_references.insert(record.reference_id.as_str().to_string());
        }

        let mut report = ImportReport::default();

        for (index, wire) in batch.iter().enumerate() {
            let normalized = normalize(wire);
            let record = match validate(&normalized, &self.registry, today) {
                Ok(record) => record,
                Err(errors) => {
                    report.rejected.push(RejectedReferral {
                        index,
                        reference_id: normalized.reference_id.clone(),
                        reason: RejectReason::Validation(errors),
                    });
                    continue;
                }
            };

            let reference_id = record.reference_id.as_str().to_string();
            if seen_references.contains(&reference_id) {
                report.rejected.push(RejectedReferral {
                    index,
                    reference_id: Some(reference_id),
                    reason: RejectReason::DuplicateReferenceId,
                });
                continue;
            }
            if seen_ids.contains(&record.id) {
                report.rejected.push(RejectedReferral {
                    index,
                    reference_id: Some(reference_id),
                    reason: RejectReason::DuplicateId,
                });
                continue;
            }

            self.write_record(&record)?;
            tracing::info!(reference_id = %record.reference_id, "stored referral");
            seen_ids.insert(record.id);
            seen_references.insert(reference_id.clone());
            report.accepted.push(reference_id);
        }

        Ok(report)
    }

    /// Lists all stored referrals, issue date ascending with id tie-break.
    ///
    /// Files that cannot be parsed or no longer validate are logged and
    /// skipped rather than failing the listing.
    pub fn list(&self) -> Vec<ReferralRecord> {
        let mut records = self.load_all();
        records.sort_by(compare_issued_then_id);
        records
    }

    /// Loads one stored referral by reference id.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Corrupt` if the stored file exists but no longer
    /// parses or validates.
    pub fn get(&self, reference_id: &str) -> StoreResult<Option<ReferralRecord>> {
        let path = self.referral_path(reference_id);
        if !path.is_file() {
            return Ok(None);
        }
        self.read_record(&path).map(Some)
    }

    /// Records the material collection date on a stored referral.
    ///
    /// Permitted once per referral; the date must not precede the issue date
    /// and must not follow an already-recorded result date.
    pub fn record_material_collection(
        &self,
        reference_id: &str,
        date: NaiveDate,
    ) -> StoreResult<ReferralRecord> {
        let mut record = self
            .get(reference_id)?
            .ok_or_else(|| StoreError::UnknownReference(reference_id.to_string()))?;

        if record.material_collection_date.is_some() {
            return Err(StoreError::AlreadyRecorded {
                reference_id: reference_id.to_string(),
                field: "materialCollectionDate",
            });
        }
        if date < record.issued_date {
            return Err(StoreError::DateOrder {
                reference_id: reference_id.to_string(),
                message: format!(
                    "materialCollectionDate {date} is before issuedDate {}",
                    record.issued_date
                ),
            });
        }
        if let Some(result) = record.result_date {
            if date > result {
                return Err(StoreError::DateOrder {
                    reference_id: reference_id.to_string(),
                    message: format!(
                        "materialCollectionDate {date} is after resultDate {result}"
                    ),
                });
            }
        }

        record.material_collection_date = Some(date);
        self.overwrite_record(&record)?;
        Ok(record)
    }

    /// Records the result date on a stored referral.
    ///
    /// Permitted once per referral; the date must not precede the
    /// material-collection date, or the issue date when no material has been
    /// collected.
    pub fn record_result(
        &self,
        reference_id: &str,
        date: NaiveDate,
    ) -> StoreResult<ReferralRecord> {
        let mut record = self
            .get(reference_id)?
            .ok_or_else(|| StoreError::UnknownReference(reference_id.to_string()))?;

        if record.result_date.is_some() {
            return Err(StoreError::AlreadyRecorded {
                reference_id: reference_id.to_string(),
                field: "resultDate",
            });
        }
        let (bound_name, bound) = match record.material_collection_date {
            Some(collected) => ("materialCollectionDate", collected),
            None => ("issuedDate", record.issued_date),
        };
        if date < bound {
            return Err(StoreError::DateOrder {
                reference_id: reference_id.to_string(),
                message: format!("resultDate {date} is before {bound_name} {bound}"),
            });
        }

        record.result_date = Some(date);
        self.overwrite_record(&record)?;
        Ok(record)
    }

    fn load_all(&self) -> Vec<ReferralRecord> {
        let referrals_dir = self.config.referrals_dir();
        let mut records = Vec::new();

        let entries = match fs::read_dir(&referrals_dir) {
            Ok(entries) => entries,
            // Nothing imported yet.
            Err(_) => return records,
        };

        for entry in entries.flatten() {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some(REFERRAL_FILE_EXTENSION) {
                continue;
            }
            match self.read_record(&path) {
                Ok(record) => records.push(record),
                Err(err) => {
                    tracing::warn!("skipping unreadable referral {}: {err}", path.display());
                }
            }
        }

        records
    }

    fn read_record(&self, path: &Path) -> StoreResult<ReferralRecord> {
        let reference_id = path
            .file_stem()
            .and_then(|stem| stem.to_str())
            .unwrap_or_default()
            .to_string();

        let contents = fs::read_to_string(path).map_err(StoreError::FileRead)?;
        let wire = parse_json(&contents).map_err(|err| StoreError::Corrupt {
            reference_id: reference_id.clone(),
            details: err.to_string(),
        })?;

        // Stored records were validated on import; re-check so corruption or
        // a registry change surfaces instead of leaking bad data.
        validate(&wire, &self.registry, chrono::Utc::now().date_naive()).map_err(|errors| {
            let details: Vec<String> = errors.iter().map(ToString::to_string).collect();
            StoreError::Corrupt {
                reference_id,
                details: details.join("; "),
            }
        })
    }

    fn write_record(&self, record: &ReferralRecord) -> StoreResult<()> {
        let referrals_dir = self.config.referrals_dir();
        fs::create_dir_all(&referrals_dir).map_err(StoreError::DataDirCreation)?;

        let path = self.referral_path(record.reference_id.as_str());
        if path.exists() {
            // Duplicate checks happen before this point; treat a collision
            // as input the caller must resolve, never overwrite history.
            return Err(StoreError::InvalidInput(format!(
                "referral '{}' is already stored",
                record.reference_id
            )));
        }
        self.write_wire(&path, record)
    }

    fn overwrite_record(&self, record: &ReferralRecord) -> StoreResult<()> {
        let path = self.referral_path(record.reference_id.as_str());
        self.write_wire(&path, record)
    }

    fn write_wire(&self, path: &Path, record: &ReferralRecord) -> StoreResult<()> {
        let json = render_json(&record.to_wire())?;
        fs::write(path, json).map_err(StoreError::FileWrite)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    const TODAY: &str = "2025-04-30";

    fn today() -> NaiveDate {
        TODAY.parse().expect("valid date")
    }

    fn store() -> (TempDir, ReferralStore) {
        let dir = tempfile::tempdir().expect("tempdir");
        let config =
            CoreConfig::new(dir.path().to_path_buf(), None).expect("valid config");
        let store = ReferralStore::open(config).expect("open store");
        (dir, store)
    }

    fn sample_wire(id: u64, issued: &str, reference_id: &str) -> ReferralWire {
        ReferralWire {
            id: Some(id),
            hph: Some("123456789012".into()),
            patient_name: Some("Иван Стойков Иванов".into()),
            patient_pid: Some("1234567890".into()),
            issued_date: Some(issued.into()),
            reference_id: Some(reference_id.into()),
            reference_type: Some(1),
            primary_location: Some("Пловдив".into()),
            primary_location_code: Some(16),
            secondary_location: Some("Съединение".into()),
            secondary_location_code: Some(15),
            patient_state_code: Some("ZOO".into()),
            referring_doctor: Some("Тодор Николов".into()),
            doctor_id: Some(1_700_003_565),
            condition_code: Some("06".into()),
            condition_description: Some("Вътрешни болести".into()),
            regional_health_code: Some("1622111277".into()),
            executor_name: Some("Д-р Иванов".into()),
            material_collection_date: None,
            result_date: None,
        }
    }

    #[test]
    fn import_stores_valid_and_reports_invalid_records() {
        let (_dir, store) = store();

        let mut bad = sample_wire(2, "2025-04-10", "35088B0000F7");
        bad.hph = Some("12345".into());
        bad.patient_name = None;

        let batch = vec![sample_wire(1, "2025-04-09", "25099A0000F6"), bad];
        let report = store.import_batch_at(&batch, today()).expect("import");

        assert_eq!(report.accepted, vec!["25099A0000F6"]);
        assert_eq!(report.rejected.len(), 1);
        assert_eq!(report.rejected[0].index, 1);
        match &report.rejected[0].reason {
            RejectReason::Validation(errors) => assert_eq!(errors.len(), 2),
            other => panic!("expected validation rejection, got {other:?}"),
        }
        assert!(!report.is_clean());
    }

    #[test]
    fn import_normalizes_before_validating() {
        let (_dir, store) = store();

        let mut wire = sample_wire(1, "09.04.2025", "25099A0000F6");
        wire.condition_code = Some("6".into());
        wire.patient_name = Some("  Иван Стойков Иванов  ".into());

        let report = store.import_batch_at(&[wire], today()).expect("import");
        assert!(report.is_clean());

        let record = store
            .get("25099A0000F6")
            .expect("get")
            .expect("record exists");
        assert_eq!(record.issued_date.to_string(), "2025-04-09");
        assert_eq!(record.condition_code.as_str(), "06");
        assert_eq!(record.patient_name.as_str(), "Иван Стойков Иванов");
    }

    #[test]
    fn reimporting_a_reference_id_is_rejected() {
        let (_dir, store) = store();

        let batch = vec![sample_wire(1, "2025-04-09", "25099A0000F6")];
        let report = store.import_batch_at(&batch, today()).expect("first import");
        assert!(report.is_clean());

        let again = vec![sample_wire(3, "2025-04-11", "25099A0000F6")];
        let report = store.import_batch_at(&again, today()).expect("second import");
        assert!(report.accepted.is_empty());
        assert_eq!(
            report.rejected[0].reason,
            RejectReason::DuplicateReferenceId
        );
    }

    #[test]
    fn duplicate_local_ids_are_rejected_within_and_across_batches() {
        let (_dir, store) = store();

        let batch = vec![
            sample_wire(1, "2025-04-09", "25099A0000F6"),
            sample_wire(1, "2025-04-10", "35088B0000F7"),
        ];
        let report = store.import_batch_at(&batch, today()).expect("import");
        assert_eq!(report.accepted, vec!["25099A0000F6"]);
        assert_eq!(report.rejected[0].reason, RejectReason::DuplicateId);

        let later = vec![sample_wire(1, "2025-04-12", "45077C0000F8")];
        let report = store.import_batch_at(&later, today()).expect("import");
        assert_eq!(report.rejected[0].reason, RejectReason::DuplicateId);
    }

    #[test]
    fn list_is_sorted_by_issue_date_then_id() {
        let (_dir, store) = store();

        let batch = vec![
            sample_wire(2, "2025-04-10", "35088B0000F7"),
            sample_wire(1, "2025-04-09", "25099A0000F6"),
            sample_wire(3, "2025-04-09", "45077C0000F8"),
        ];
        let report = store.import_batch_at(&batch, today()).expect("import");
        assert!(report.is_clean());

        let ids: Vec<u64> = store.list().iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![1, 3, 2]);
    }

    #[test]
    fn list_skips_unreadable_files() {
        let (_dir, store) = store();

        let batch = vec![sample_wire(1, "2025-04-09", "25099A0000F6")];
        store.import_batch_at(&batch, today()).expect("import");

        let junk = store.config.referrals_dir().join("JUNK0000.json");
        let mut file = std::fs::File::create(junk).expect("create junk");
        write!(file, "not json at all").expect("write junk");

        let records = store.list();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].id, 1);
    }

    #[test]
    fn get_returns_none_for_unknown_reference() {
        let (_dir, store) = store();
        assert!(store.get("NOPE123").expect("get").is_none());
    }

    #[test]
    fn workflow_dates_are_recorded_once_in_order() {
        let (_dir, store) = store();
        let batch = vec![sample_wire(1, "2025-04-09", "25099A0000F6")];
        store.import_batch_at(&batch, today()).expect("import");

        // Before the issue date: refused.
        let early = "2025-04-08".parse().expect("valid date");
        let err = store
            .record_material_collection("25099A0000F6", early)
            .expect_err("too early");
        assert!(matches!(err, StoreError::DateOrder { .. }));

        let collected = "2025-04-09".parse().expect("valid date");
        let record = store
            .record_material_collection("25099A0000F6", collected)
            .expect("record collection");
        assert_eq!(record.material_collection_date, Some(collected));

        // A second collection date is refused.
        let err = store
            .record_material_collection("25099A0000F6", collected)
            .expect_err("already recorded");
        assert!(matches!(err, StoreError::AlreadyRecorded { .. }));

        // Result before collection: refused.
        let err = store
            .record_result("25099A0000F6", early)
            .expect_err("before collection");
        assert!(matches!(err, StoreError::DateOrder { .. }));

        let result = "2025-04-10".parse().expect("valid date");
        let record = store
            .record_result("25099A0000F6", result)
            .expect("record result");
        assert_eq!(record.result_date, Some(result));

        let err = store
            .record_result("25099A0000F6", result)
            .expect_err("already recorded");
        assert!(matches!(err, StoreError::AlreadyRecorded { .. }));

        // The mutation persisted.
        let reread = store
            .get("25099A0000F6")
            .expect("get")
            .expect("record exists");
        assert_eq!(reread.material_collection_date, Some(collected));
        assert_eq!(reread.result_date, Some(result));
    }

    #[test]
    fn result_without_collection_is_bounded_by_issue_date() {
        let (_dir, store) = store();
        let batch = vec![sample_wire(1, "2025-04-09", "25099A0000F6")];
        store.import_batch_at(&batch, today()).expect("import");

        let early = "2025-04-08".parse().expect("valid date");
        let err = store
            .record_result("25099A0000F6", early)
            .expect_err("before issue");
        assert!(matches!(err, StoreError::DateOrder { .. }));

        let same_day = "2025-04-09".parse().expect("valid date");
        let record = store
            .record_result("25099A0000F6", same_day)
            .expect("same-day result");
        assert_eq!(record.result_date, Some(same_day));
    }

    #[test]
    fn record_mutations_on_unknown_reference_fail() {
        let (_dir, store) = store();
        let date = "2025-04-09".parse().expect("valid date");
        let err = store
            .record_result("NOPE123", date)
            .expect_err("unknown reference");
        assert!(matches!(err, StoreError::UnknownReference(_)));
    }

    #[test]
    fn import_file_reads_a_json_array() {
        let (dir, store) = store();
        let batch_path = dir.path().join("batch.json");
        let json = r#"[{
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
            "executorName": "Д-р Иванов"
        }]"#;
        std::fs::write(&batch_path, json).expect("write batch");

        let report = store.import_file(&batch_path).expect("import file");
        assert_eq!(report.accepted, vec!["25099A0000F6"]);
    }
}
