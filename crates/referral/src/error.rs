use thiserror::Error;

/// Errors returned by the referral boundary crate.
///
/// These cover parsing and registry loading. Semantic problems with a
/// referral's content are *not* errors of this type; they are reported as
/// [`crate::validation::ValidationError`] lists so a caller sees every
/// violation at once.
#[derive(Debug, Error)]
pub enum ReferralError {
    #[error("referral schema mismatch at {path}: {source}")]
    Schema {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("registry schema mismatch at {path}: {source}")]
    RegistrySchema {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("invalid registry: {0}")]
    InvalidRegistry(String),

    #[error("invalid reference id '{0}': must be non-empty ASCII alphanumeric")]
    InvalidReferenceId(String),

    #[error("failed to serialize referral: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type ReferralResult<T> = std::result::Result<T, ReferralError>;
