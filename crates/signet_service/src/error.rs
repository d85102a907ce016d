use thiserror::Error;

use signet_core::stamp::StampError;
use signet_core::validation::DocumentError;
use signet_db::StoreError;

#[derive(Error, Debug)]
pub enum ServiceError {
    /// Uniform authorization failure for the signing link. Deliberately does
    /// not say whether the contract id, recipient id or token was wrong.
    #[error("invalid signing link")]
    InvalidSigningLink,

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("State error: {0}")]
    State(String),

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error(transparent)]
    Document(#[from] DocumentError),

    #[error(transparent)]
    Stamp(#[from] StampError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

pub type Result<T> = std::result::Result<T, ServiceError>;
