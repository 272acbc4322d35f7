//! Domain error model.

use rust_decimal::Decimal;
use thiserror::Error;

use crate::document::DocumentStatus;

/// Result type used across the domain layer.
pub type DomainResult<T> = Result<T, DomainError>;

/// Domain-level error.
///
/// Every variant is deterministic: it is detected before or during a unit of
/// work and causes the whole unit to roll back. Infrastructure failures belong
/// elsewhere.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// A referenced item, production record or document does not exist.
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// A consumption or sale would drive an item's quantity negative.
    #[error("insufficient stock for '{item_name}': available {available}, requested {requested}")]
    InsufficientStock {
        item_name: String,
        available: Decimal,
        requested: Decimal,
    },

    /// The requested document status change is not allowed.
    #[error("invalid status transition from {from} to {to}")]
    InvalidTransition {
        from: DocumentStatus,
        to: DocumentStatus,
    },

    /// Lines or details of a non-draft document cannot be edited.
    #[error("document {document_id} is locked (status {status})")]
    DocumentLocked {
        document_id: String,
        status: DocumentStatus,
    },

    /// An external-facing number (purchase, sale or invoice number) is taken.
    #[error("duplicate reference: {0}")]
    DuplicateReference(String),

    /// A value failed validation (e.g. malformed input).
    #[error("validation failed: {0}")]
    Validation(String),

    /// A domain invariant was violated.
    #[error("invariant violated: {0}")]
    InvariantViolation(String),

    /// An identifier was invalid (e.g. parse failure).
    #[error("invalid identifier: {0}")]
    InvalidId(String),
}

impl DomainError {
    pub fn not_found(entity: &'static str, id: impl core::fmt::Display) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    pub fn insufficient_stock(
        item_name: impl Into<String>,
        available: Decimal,
        requested: Decimal,
    ) -> Self {
        Self::InsufficientStock {
            item_name: item_name.into(),
            available,
            requested,
        }
    }

    pub fn invalid_transition(from: DocumentStatus, to: DocumentStatus) -> Self {
        Self::InvalidTransition { from, to }
    }

    pub fn document_locked(document_id: impl core::fmt::Display, status: DocumentStatus) -> Self {
        Self::DocumentLocked {
            document_id: document_id.to_string(),
            status,
        }
    }

    pub fn duplicate_reference(msg: impl Into<String>) -> Self {
        Self::DuplicateReference(msg.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn invariant(msg: impl Into<String>) -> Self {
        Self::InvariantViolation(msg.into())
    }

    pub fn invalid_id(msg: impl Into<String>) -> Self {
        Self::InvalidId(msg.into())
    }
}
