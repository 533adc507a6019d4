//! Registry of externally defined NZIS codes.
//!
//! The national system identifies locations, conditions, and referral
//! categories by codes whose meaning lives in external lookup tables. This
//! module makes those tables explicit: a [`Registry`] is loaded and checked
//! once at startup, and validation consults it instead of trusting inline
//! literals.
//!
//! The canonical tables belong to the national-system specification and
//! arrive as a YAML document via [`Registry::from_yaml`]. A bundled fallback
//! carries the handful of entries known from the NZIS sample dataset so the
//! tooling works out of the box.

use std::collections::{BTreeMap, BTreeSet};

use serde::Deserialize;

use crate::{ReferralError, ReferralResult};

const BUNDLED_LOCATIONS: &[(u32, &str)] = &[
    (15, "Съединение"),
    (16, "Пловдив"),
    (17, "Враждебна"),
    (18, "София"),
];

const BUNDLED_CONDITIONS: &[(&str, &str)] =
    &[("06", "Вътрешни болести"), ("07", "Неврология")];

const BUNDLED_REFERENCE_TYPES: &[u16] = &[1, 2, 3];

/// Lookup tables for location codes, condition codes, and reference types.
#[derive(Debug, Clone)]
pub struct Registry {
    locations: BTreeMap<u32, String>,
    conditions: BTreeMap<String, String>,
    reference_types: BTreeSet<u16>,
}

/// Wire shape of a registry YAML document.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RegistryWire {
    #[serde(default)]
    locations: Vec<LocationEntry>,
    #[serde(default)]
    conditions: Vec<ConditionEntry>,
    #[serde(rename = "referenceTypes", default)]
    reference_types: Vec<u16>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct LocationEntry {
    code: u32,
    name: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConditionEntry {
    code: String,
    description: String,
}

impl Registry {
    /// The registry entries known from the NZIS sample dataset.
    ///
    /// Used when no registry document is configured. The real national
    /// tables are a superset of this; load them with [`Registry::from_yaml`].
    pub fn bundled() -> Self {
        Self {
            locations: BUNDLED_LOCATIONS
                .iter()
                .map(|(code, name)| (*code, (*name).to_string()))
                .collect(),
            conditions: BUNDLED_CONDITIONS
                .iter()
                .map(|(code, description)| ((*code).to_string(), (*description).to_string()))
                .collect(),
            reference_types: BUNDLED_REFERENCE_TYPES.iter().copied().collect(),
        }
    }

    /// Loads a registry from a YAML document and validates it.
    ///
    /// Expected shape:
    ///
    /// ```yaml
    /// locations:
    ///   - code: 16
    ///     name: Пловдив
    /// conditions:
    ///   - code: "06"
    ///     description: Вътрешни болести
    /// referenceTypes: [1, 2, 3]
    /// ```
    ///
    /// # Errors
    ///
    /// Returns [`ReferralError::RegistrySchema`] with the path to the failing
    /// field when the YAML does not match this shape, and
    /// [`ReferralError::InvalidRegistry`] for semantic problems: duplicate or
    /// zero codes, blank names or descriptions, or an empty reference-type
    /// set.
    pub fn from_yaml(input: &str) -> ReferralResult<Self> {
        let deserializer = serde_yaml::Deserializer::from_str(input);
        let wire: RegistryWire =
            serde_path_to_error::deserialize(deserializer).map_err(|err| {
                let path = err.path().to_string();
                let path = if path.is_empty() {
                    "<root>".to_string()
                } else {
                    path
                };
                ReferralError::RegistrySchema {
                    path,
                    source: err.into_inner(),
                }
            })?;

        let mut locations = BTreeMap::new();
        for entry in wire.locations {
            if entry.code == 0 {
                return Err(ReferralError::InvalidRegistry(
                    "location code 0 is not a valid registry code".into(),
                ));
            }
            if entry.name.trim().is_empty() {
                return Err(ReferralError::InvalidRegistry(format!(
                    "location {} has a blank name",
                    entry.code
                )));
            }
            if locations
                .insert(entry.code, entry.name.trim().to_string())
                .is_some()
            {
                return Err(ReferralError::InvalidRegistry(format!(
                    "duplicate location code {}",
                    entry.code
                )));
            }
        }

        let mut conditions = BTreeMap::new();
        for entry in wire.conditions {
            let code = entry.code.trim().to_string();
            if code.is_empty() || !code.bytes().all(|b| b.is_ascii_digit()) {
                return Err(ReferralError::InvalidRegistry(format!(
                    "condition code '{}' must be a digit string",
                    entry.code
                )));
            }
            if entry.description.trim().is_empty() {
                return Err(ReferralError::InvalidRegistry(format!(
                    "condition {code} has a blank description"
                )));
            }
            if conditions
                .insert(code.clone(), entry.description.trim().to_string())
                .is_some()
            {
                return Err(ReferralError::InvalidRegistry(format!(
                    "duplicate condition code {code}"
                )));
            }
        }

        let mut reference_types = BTreeSet::new();
        for reference_type in wire.reference_types {
            if reference_type == 0 {
                return Err(ReferralError::InvalidRegistry(
                    "reference type 0 is not valid; types are positive".into(),
                ));
            }
            if !reference_types.insert(reference_type) {
                return Err(ReferralError::InvalidRegistry(format!(
                    "duplicate reference type {reference_type}"
                )));
            }
        }
        if reference_types.is_empty() {
            return Err(ReferralError::InvalidRegistry(
                "registry must define at least one reference type".into(),
            ));
        }

        Ok(Self {
            locations,
            conditions,
            reference_types,
        })
    }

    /// Returns `true` if the location code is known.
    pub fn has_location(&self, code: u32) -> bool {
        self.locations.contains_key(&code)
    }

    /// Returns the registered name for a location code.
    pub fn location_name(&self, code: u32) -> Option<&str> {
        self.locations.get(&code).map(String::as_str)
    }

    /// Returns the registered description for a condition code.
    pub fn condition_description(&self, code: &str) -> Option<&str> {
        self.conditions.get(code).map(String::as_str)
    }

    /// Returns `true` if the reference type belongs to the valid set.
    pub fn has_reference_type(&self, reference_type: u16) -> bool {
        self.reference_types.contains(&reference_type)
    }

    /// The set of valid reference types, ascending.
    pub fn reference_types(&self) -> impl Iterator<Item = u16> + '_ {
        self.reference_types.iter().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bundled_registry_resolves_sample_dataset_codes() {
        let registry = Registry::bundled();
        assert_eq!(registry.location_name(16), Some("Пловдив"));
        assert_eq!(registry.location_name(15), Some("Съединение"));
        assert_eq!(registry.location_name(18), Some("София"));
        assert_eq!(
            registry.condition_description("06"),
            Some("Вътрешни болести")
        );
        assert_eq!(registry.condition_description("07"), Some("Неврология"));
        assert!(registry.has_reference_type(1));
        assert!(registry.has_reference_type(2));
        assert!(!registry.has_reference_type(99));
    }

    #[test]
    fn loads_registry_from_yaml() {
        let yaml = r#"
locations:
  - code: 16
    name: Пловдив
  - code: 22
    name: Смолян
conditions:
  - code: "06"
    description: Вътрешни болести
referenceTypes: [1, 2, 3, 4]
"#;

        let registry = Registry::from_yaml(yaml).expect("valid registry");
        assert!(registry.has_location(22));
        assert_eq!(registry.location_name(16), Some("Пловдив"));
        assert!(registry.has_reference_type(4));
        assert_eq!(registry.reference_types().collect::<Vec<_>>(), [1, 2, 3, 4]);
    }

    #[test]
    fn rejects_duplicate_location_codes() {
        let yaml = r#"
locations:
  - code: 16
    name: Пловдив
  - code: 16
    name: София
referenceTypes: [1]
"#;

        let err = Registry::from_yaml(yaml).expect_err("duplicate code");
        assert!(matches!(err, ReferralError::InvalidRegistry(msg) if msg.contains("16")));
    }

    #[test]
    fn rejects_blank_names_and_zero_codes() {
        let err = Registry::from_yaml(
            "locations:\n  - code: 0\n    name: X\nreferenceTypes: [1]\n",
        )
        .expect_err("zero code");
        assert!(matches!(err, ReferralError::InvalidRegistry(_)));

        let err = Registry::from_yaml(
            "locations:\n  - code: 5\n    name: \"  \"\nreferenceTypes: [1]\n",
        )
        .expect_err("blank name");
        assert!(matches!(err, ReferralError::InvalidRegistry(_)));
    }

    #[test]
    fn rejects_empty_reference_type_set() {
        let err = Registry::from_yaml("locations: []\n").expect_err("no types");
        assert!(matches!(err, ReferralError::InvalidRegistry(_)));
    }

    #[test]
    fn rejects_non_digit_condition_codes() {
        let yaml = r#"
conditions:
  - code: "6A"
    description: Нещо
referenceTypes: [1]
"#;
        let err = Registry::from_yaml(yaml).expect_err("non-digit code");
        assert!(matches!(err, ReferralError::InvalidRegistry(msg) if msg.contains("6A")));
    }

    #[test]
    fn schema_errors_name_the_failing_path() {
        let yaml = "locations:\n  - code: sixteen\n    name: Пловдив\n";
        let err = Registry::from_yaml(yaml).expect_err("bad type");
        match err {
            ReferralError::RegistrySchema { path, .. } => {
                assert!(path.contains("locations"), "path was {path}");
            }
            other => panic!("expected RegistrySchema error, got {other:?}"),
        }
    }
}
