//! Shared document model: status lifecycle and line items used by purchases and sales.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::aggregate::AggregateRoot;
use crate::error::{DomainError, DomainResult};
use crate::id::{DocumentId, ItemRef};
use crate::value_object::Quantity;

/// Document status lifecycle.
///
/// ```text
/// DRAFT    -> {DRAFT, ONGOING, CANCELED}
/// ONGOING  -> {ONGOING, FINISHED, CANCELED}
/// FINISHED -> {FINISHED}
/// CANCELED -> {CANCELED}
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DocumentStatus {
    Draft,
    Ongoing,
    Finished,
    Canceled,
}

impl DocumentStatus {
    pub const ALL: [DocumentStatus; 4] = [
        DocumentStatus::Draft,
        DocumentStatus::Ongoing,
        DocumentStatus::Finished,
        DocumentStatus::Canceled,
    ];

    /// Statuses reachable from `self`, including `self`.
    pub fn allowed_targets(self) -> &'static [DocumentStatus] {
        use DocumentStatus::*;
        match self {
            Draft => &[Draft, Ongoing, Canceled],
            Ongoing => &[Ongoing, Finished, Canceled],
            Finished => &[Finished],
            Canceled => &[Canceled],
        }
    }

    pub fn can_transition_to(self, to: DocumentStatus) -> bool {
        self.allowed_targets().contains(&to)
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, DocumentStatus::Finished | DocumentStatus::Canceled)
    }

    /// Lines and details may only change while the document is a draft.
    pub fn is_editable(self) -> bool {
        matches!(self, DocumentStatus::Draft)
    }

    /// Validate a transition request against the table.
    pub fn transition(self, to: DocumentStatus) -> DomainResult<StatusChange> {
        if !self.can_transition_to(to) {
            return Err(DomainError::invalid_transition(self, to));
        }
        if self == to {
            return Ok(StatusChange::Unchanged);
        }
        Ok(StatusChange::Changed { from: self, to })
    }

    pub fn as_str(self) -> &'static str {
        match self {
            DocumentStatus::Draft => "DRAFT",
            DocumentStatus::Ongoing => "ONGOING",
            DocumentStatus::Finished => "FINISHED",
            DocumentStatus::Canceled => "CANCELED",
        }
    }
}

impl core::fmt::Display for DocumentStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of a permitted transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusChange {
    /// Self-transition: nothing to do.
    Unchanged,
    Changed {
        from: DocumentStatus,
        to: DocumentStatus,
    },
}

impl StatusChange {
    /// A recorded `from -> to` step, as carried by status events.
    pub fn recorded(from: DocumentStatus, to: DocumentStatus) -> Self {
        if from == to {
            StatusChange::Unchanged
        } else {
            StatusChange::Changed { from, to }
        }
    }

    /// Reaching `FINISHED`: the step that moves stock.
    pub fn finalizes(self) -> bool {
        matches!(
            self,
            StatusChange::Changed {
                to: DocumentStatus::Finished,
                ..
            }
        )
    }
}

/// A document line: one item, a quantity and a unit price.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentLine {
    pub line_no: u32,
    pub item: ItemRef,
    pub quantity: Quantity,
    pub unit_price: Decimal,
}

impl DocumentLine {
    pub fn total(&self) -> Decimal {
        self.quantity.value() * self.unit_price
    }
}

/// Line payload supplied by the form layer (before a line number is assigned).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewLine {
    pub item: ItemRef,
    pub quantity: Decimal,
    pub unit_price: Decimal,
}

impl NewLine {
    pub fn new(item: ItemRef, quantity: Decimal, unit_price: Decimal) -> Self {
        Self {
            item,
            quantity,
            unit_price,
        }
    }

    /// Validate the payload and turn it into a numbered line.
    pub fn into_line(self, line_no: u32) -> DomainResult<DocumentLine> {
        let quantity = Quantity::positive(self.quantity)?;
        if self.unit_price < Decimal::ZERO {
            return Err(DomainError::validation("unit price cannot be negative"));
        }
        Ok(DocumentLine {
            line_no,
            item: self.item,
            quantity,
            unit_price: self.unit_price,
        })
    }
}

/// Common read interface of purchase and sale documents.
pub trait Document: AggregateRoot<Id = DocumentId> {
    /// Human-facing document number (unique per document type).
    fn number(&self) -> &str;

    fn status(&self) -> DocumentStatus;

    fn lines(&self) -> &[DocumentLine];

    /// Fail with `DocumentLocked` unless the document is still a draft.
    fn ensure_editable(&self) -> DomainResult<()> {
        if self.status().is_editable() {
            Ok(())
        } else {
            Err(DomainError::document_locked(self.id(), self.status()))
        }
    }

    /// Requested quantity per item, summing lines that share an item.
    fn quantities_by_item(&self) -> DomainResult<Vec<(ItemRef, Quantity)>> {
        let mut totals: Vec<(ItemRef, Quantity)> = Vec::new();
        for line in self.lines() {
            match totals.iter_mut().find(|(item, _)| *item == line.item) {
                Some((_, qty)) => {
                    *qty = qty
                        .checked_add(line.quantity)
                        .ok_or_else(|| DomainError::validation("quantity overflow"))?;
                }
                None => totals.push((line.item, line.quantity)),
            }
        }
        Ok(totals)
    }
}
