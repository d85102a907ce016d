use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Entity not found: {0}")]
    NotFound(String),

    #[error("Data integrity error: {0}")]
    Corrupt(String),
}

pub type Result<T> = std::result::Result<T, StoreError>;
