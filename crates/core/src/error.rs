#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("failed to create referral data directory: {0}")]
    DataDirCreation(std::io::Error),
    #[error("failed to read referral file: {0}")]
    FileRead(std::io::Error),
    #[error("failed to write referral file: {0}")]
    FileWrite(std::io::Error),
    #[error("failed to read import batch: {0}")]
    BatchRead(std::io::Error),
    #[error("failed to read registry document: {0}")]
    RegistryRead(std::io::Error),

    #[error("referral error: {0}")]
    Referral(#[from] nzis_referral::ReferralError),

    #[error("no stored referral with reference id '{0}'")]
    UnknownReference(String),
    #[error("referral '{reference_id}' already has a {field}")]
    AlreadyRecorded {
        reference_id: String,
        field: &'static str,
    },
    #[error("date order violation for referral '{reference_id}': {message}")]
    DateOrder {
        reference_id: String,
        message: String,
    },
    #[error("stored referral '{reference_id}' is invalid: {details}")]
    Corrupt {
        reference_id: String,
        details: String,
    },
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;
