use thiserror::Error;

use crate::storage::StorageError;

/// Failures surfaced by the link service.
///
/// `NotFound` covers both a missing code and one the caller does not own, so
/// responses never reveal whether somebody else's code exists.
#[derive(Debug, Error)]
pub enum LinkError {
    #[error("link not found")]
    NotFound,
    #[error("alias already exists")]
    AliasTaken,
    #[error("{0}")]
    Validation(String),
    #[error("could not allocate a free short code after {attempts} attempts")]
    CodeSpaceExhausted { attempts: usize },
    #[error(transparent)]
    Transient(#[from] anyhow::Error),
}

pub type LinkResult<T> = Result<T, LinkError>;

impl From<StorageError> for LinkError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::Conflict => LinkError::AliasTaken,
            StorageError::Other(e) => LinkError::Transient(e),
        }
    }
}
