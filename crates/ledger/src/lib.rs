//! Stock ledger (append-only movement history).
//!
//! Pure domain types only: movements are validated here and stored by the
//! infrastructure layer inside the same unit of work as the quantity change.

pub mod movement;
pub mod summary;

pub use movement::{Direction, DocumentRef, MovementType, NewMovement, StockMovement};
pub use summary::{net_by_item, net_by_type, net_for_reference};
