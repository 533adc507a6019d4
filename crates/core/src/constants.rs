//! Constants used throughout the NZIS core crate.

/// Directory name for stored referral records, under the data directory.
pub const REFERRALS_DIR_NAME: &str = "referrals";

/// Default data directory when no explicit directory is configured.
pub const DEFAULT_REFERRAL_DATA_DIR: &str = "referral_data";

/// File extension for stored referral records.
pub const REFERRAL_FILE_EXTENSION: &str = "json";
