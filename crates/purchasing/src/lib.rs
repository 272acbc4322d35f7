//! Purchasing domain module (purchase documents).
//!
//! Business rules for purchases, implemented purely as deterministic domain
//! logic (no IO, no storage). Receiving stock on `FINISHED` is carried out by
//! the infrastructure layer.

pub mod purchase;

pub use purchase::{
    AddLine, ChangeStatus, CreatePurchase, DetailsUpdated, LineAdded, LineRemoved, LineUpdated,
    Purchase, PurchaseCommand, PurchaseCreated, PurchaseEvent, RemoveLine, StatusChanged,
    UpdateDetails, UpdateLine,
};
