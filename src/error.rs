use rust_decimal::Decimal;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid range set: {0}")]
    InvalidRangeSet(String),

    #[error("Invalid sharer set: {0}")]
    InvalidSharerSet(String),

    #[error("No applicable fee found for the given criteria")]
    NoApplicableFee,

    #[error("No applicable range found for amount: {0}")]
    NoApplicableTier(Decimal),

    #[error("Invalid fee definition: {0}")]
    InvalidDefinition(String),

    #[error("Invalid calculation request: {0}")]
    InvalidRequest(String),

    #[error("Transaction type not found or inactive: {0}")]
    TransactionTypeNotFound(String),

    #[error("Channel not found or inactive: {0}")]
    ChannelNotFound(String),

    #[error("Tenant not found: {0}")]
    TenantNotFound(String),

    #[error("Fee not found: {0}")]
    FeeNotFound(u64),

    #[error("Fee {0} is not shared")]
    FeeNotShared(u64),

    #[error("Catalog entry already exists: {0}")]
    CatalogEntryExists(String),

    #[error("Unknown field: {0}")]
    UnknownPatchField(String),

    #[error("Storage error: {0}")]
    StorageError(String),
}

pub type Result<T> = std::result::Result<T, Error>;
