//! Service-level error model.

use thiserror::Error;

use paintstock_core::DomainError;

pub type ServiceResult<T> = Result<T, ServiceError>;

/// Error returned by the stock, production and document services.
///
/// Domain errors pass through unchanged; the unit of work that produced them
/// has already been rolled back when the caller sees one.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Domain(#[from] DomainError),

    /// The underlying store could not be used (e.g. a poisoned lock).
    #[error("storage failure: {0}")]
    Storage(String),
}

impl ServiceError {
    pub fn storage(msg: impl Into<String>) -> Self {
        Self::Storage(msg.into())
    }

    /// The domain error behind this failure, if any.
    pub fn as_domain(&self) -> Option<&DomainError> {
        match self {
            ServiceError::Domain(e) => Some(e),
            ServiceError::Storage(_) => None,
        }
    }
}
