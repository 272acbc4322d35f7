//! Sales domain module (sale documents and customer returns).
//!
//! Business rules for sales, implemented purely as deterministic domain logic
//! (no IO, no storage). Issuing stock on `FINISHED` and booking returns are
//! carried out by the infrastructure layer.

pub mod sale;

pub use sale::{
    AddLine, ChangeStatus, CreateSale, DetailsUpdated, LineAdded, LineRemoved, LineUpdated,
    RecordReturn, RemoveLine, ReturnRecorded, Sale, SaleCommand, SaleCreated, SaleEvent,
    StatusChanged, UpdateDetails, UpdateLine,
};
