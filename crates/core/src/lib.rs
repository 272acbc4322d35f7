//! `paintstock-core`: domain foundation building blocks.
//!
//! This crate contains **pure domain** primitives shared by the inventory,
//! ledger and document modules (no infrastructure concerns).

pub mod aggregate;
pub mod document;
pub mod entity;
pub mod error;
pub mod event;
pub mod id;
pub mod value_object;

pub use aggregate::{Aggregate, AggregateRoot};
pub use document::{Document, DocumentLine, DocumentStatus, NewLine, StatusChange};
pub use entity::Entity;
pub use error::{DomainError, DomainResult};
pub use event::Event;
pub use id::{DocumentId, ItemId, ItemKind, ItemRef, MovementId, SupplierId, UserId};
pub use value_object::{Quantity, ValueObject};
