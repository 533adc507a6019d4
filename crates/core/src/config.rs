//! Core runtime configuration.
//!
//! Configuration is resolved once at process startup and then passed into the
//! store, rather than read from process-wide environment variables during
//! operations, which behaves inconsistently in multi-threaded runtimes and
//! test harnesses.

use std::path::{Path, PathBuf};

use nzis_referral::Registry;

use crate::constants::{DEFAULT_REFERRAL_DATA_DIR, REFERRALS_DIR_NAME};
use crate::{StoreError, StoreResult};

/// Core configuration resolved at startup.
#[derive(Clone, Debug)]
pub struct CoreConfig {
    referral_data_dir: PathBuf,
    registry_path: Option<PathBuf>,
}

impl CoreConfig {
    /// Create a new `CoreConfig`.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::InvalidInput` if the data directory path is empty.
    pub fn new(referral_data_dir: PathBuf, registry_path: Option<PathBuf>) -> StoreResult<Self> {
        if referral_data_dir.as_os_str().is_empty() {
            return Err(StoreError::InvalidInput(
                "referral data directory cannot be empty".into(),
            ));
        }

        Ok(Self {
            referral_data_dir,
            registry_path,
        })
    }

    pub fn referral_data_dir(&self) -> &Path {
        &self.referral_data_dir
    }

    /// Directory that holds one JSON file per stored referral.
    pub fn referrals_dir(&self) -> PathBuf {
        self.referral_data_dir.join(REFERRALS_DIR_NAME)
    }

    pub fn registry_path(&self) -> Option<&Path> {
        self.registry_path.as_deref()
    }

    /// Loads the code registry this configuration points at.
    ///
    /// Falls back to the bundled sample registry when no document is
    /// configured.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::RegistryRead` if the configured document cannot
    /// be read, or a `StoreError::Referral` if it fails registry validation.
    pub fn load_registry(&self) -> StoreResult<Registry> {
        match &self.registry_path {
            Some(path) => {
                let input = std::fs::read_to_string(path).map_err(StoreError::RegistryRead)?;
                Ok(Registry::from_yaml(&input)?)
            }
            None => Ok(Registry::bundled()),
        }
    }
}

/// Resolve the referral data directory from an optional override.
pub fn resolve_data_dir(override_dir: Option<PathBuf>) -> PathBuf {
    override_dir.unwrap_or_else(|| PathBuf::from(DEFAULT_REFERRAL_DATA_DIR))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn rejects_empty_data_dir() {
        let err = CoreConfig::new(PathBuf::new(), None).expect_err("empty dir");
        assert!(matches!(err, StoreError::InvalidInput(_)));
    }

    #[test]
    fn referrals_dir_is_under_data_dir() {
        let config = CoreConfig::new(PathBuf::from("referral_data"), None).expect("valid config");
        assert_eq!(
            config.referrals_dir(),
            PathBuf::from("referral_data/referrals")
        );
    }

    #[test]
    fn resolve_data_dir_prefers_override() {
        assert_eq!(
            resolve_data_dir(Some(PathBuf::from("/tmp/custom"))),
            PathBuf::from("/tmp/custom")
        );
        assert_eq!(
            resolve_data_dir(None),
            PathBuf::from(DEFAULT_REFERRAL_DATA_DIR)
        );
    }

    #[test]
    fn load_registry_falls_back_to_bundled() {
        let config = CoreConfig::new(PathBuf::from("referral_data"), None).expect("valid config");
        let registry = config.load_registry().expect("bundled registry");
        assert!(registry.has_location(16));
    }

    #[test]
    fn load_registry_reads_configured_document() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("registry.yaml");
        let mut file = std::fs::File::create(&path).expect("create registry");
        write!(
            file,
            "locations:\n  - code: 42\n    name: Бургас\nreferenceTypes: [1]\n"
        )
        .expect("write registry");

        let config =
            CoreConfig::new(dir.path().to_path_buf(), Some(path)).expect("valid config");
        let registry = config.load_registry().expect("load registry");
        assert!(registry.has_location(42));
        assert!(!registry.has_location(16));
    }
}
