use std::collections::HashMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use paintstock_core::{
    Aggregate, AggregateRoot, Document, DocumentId, DocumentLine, DocumentStatus, DomainError,
    Entity, Event, ItemRef, NewLine, Quantity, StatusChange, UserId,
};

/// Aggregate root: Sale.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sale {
    id: DocumentId,
    number: String,
    invoice_number: Option<String>,
    customer: String,
    notes: Option<String>,
    status: DocumentStatus,
    lines: Vec<DocumentLine>,
    returned: HashMap<u32, Quantity>,
    created_by: Option<UserId>,
    version: u64,
    created: bool,
}

impl Sale {
    /// Create an empty, not-yet-created aggregate instance.
    pub fn empty(id: DocumentId) -> Self {
        Self {
            id,
            number: String::new(),
            invoice_number: None,
            customer: String::new(),
            notes: None,
            status: DocumentStatus::Draft,
            lines: Vec::new(),
            returned: HashMap::new(),
            created_by: None,
            version: 0,
            created: false,
        }
    }

    pub fn invoice_number(&self) -> Option<&str> {
        self.invoice_number.as_deref()
    }

    pub fn customer(&self) -> &str {
        &self.customer
    }

    pub fn notes(&self) -> Option<&str> {
        self.notes.as_deref()
    }

    pub fn created_by(&self) -> Option<UserId> {
        self.created_by
    }

    pub fn is_created(&self) -> bool {
        self.created
    }

    /// Sum of `quantity * unit_price` over all lines.
    pub fn total(&self) -> Decimal {
        self.lines.iter().map(DocumentLine::total).sum()
    }

    /// Quantity already returned for a line.
    pub fn returned_quantity(&self, line_no: u32) -> Quantity {
        self.returned.get(&line_no).copied().unwrap_or(Quantity::ZERO)
    }

    /// Quantity of a line that can still be returned.
    pub fn returnable_quantity(&self, line_no: u32) -> Option<Quantity> {
        let line = self.lines.iter().find(|l| l.line_no == line_no)?;
        line.quantity.checked_sub(self.returned_quantity(line_no))
    }

    fn next_line_no(&self) -> u32 {
        self.lines.iter().map(|l| l.line_no).max().unwrap_or(0) + 1
    }
}

impl Entity for Sale {
    type Id = DocumentId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

impl AggregateRoot for Sale {
    fn version(&self) -> u64 {
        self.version
    }
}

impl Document for Sale {
    fn number(&self) -> &str {
        &self.number
    }

    fn status(&self) -> DocumentStatus {
        self.status
    }

    fn lines(&self) -> &[DocumentLine] {
        &self.lines
    }
}

/// Command: CreateSale (always starts as `DRAFT`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateSale {
    pub sale_id: DocumentId,
    pub number: String,
    pub invoice_number: Option<String>,
    pub customer: String,
    pub notes: Option<String>,
    pub lines: Vec<NewLine>,
    pub created_by: UserId,
    pub occurred_at: DateTime<Utc>,
}

/// Command: AddLine (draft only).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddLine {
    pub sale_id: DocumentId,
    pub line: NewLine,
    pub occurred_at: DateTime<Utc>,
}

/// Command: UpdateLine (draft only).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateLine {
    pub sale_id: DocumentId,
    pub line_no: u32,
    pub line: NewLine,
    pub occurred_at: DateTime<Utc>,
}

/// Command: RemoveLine (draft only).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoveLine {
    pub sale_id: DocumentId,
    pub line_no: u32,
    pub occurred_at: DateTime<Utc>,
}

/// Command: UpdateDetails (draft only).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateDetails {
    pub sale_id: DocumentId,
    pub customer: String,
    pub invoice_number: Option<String>,
    pub notes: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

/// Command: ChangeStatus.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeStatus {
    pub sale_id: DocumentId,
    pub to: DocumentStatus,
    pub occurred_at: DateTime<Utc>,
}

/// Command: RecordReturn (finished sales only).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordReturn {
    pub sale_id: DocumentId,
    pub line_no: u32,
    pub quantity: Decimal,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SaleCommand {
    CreateSale(CreateSale),
    AddLine(AddLine),
    UpdateLine(UpdateLine),
    RemoveLine(RemoveLine),
    UpdateDetails(UpdateDetails),
    ChangeStatus(ChangeStatus),
    RecordReturn(RecordReturn),
}

/// Event: SaleCreated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaleCreated {
    pub sale_id: DocumentId,
    pub number: String,
    pub invoice_number: Option<String>,
    pub customer: String,
    pub notes: Option<String>,
    pub lines: Vec<DocumentLine>,
    pub created_by: UserId,
    pub occurred_at: DateTime<Utc>,
}

/// Event: LineAdded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineAdded {
    pub sale_id: DocumentId,
    pub line: DocumentLine,
    pub occurred_at: DateTime<Utc>,
}

/// Event: LineUpdated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineUpdated {
    pub sale_id: DocumentId,
    pub line: DocumentLine,
    pub occurred_at: DateTime<Utc>,
}

/// Event: LineRemoved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineRemoved {
    pub sale_id: DocumentId,
    pub line_no: u32,
    pub occurred_at: DateTime<Utc>,
}

/// Event: DetailsUpdated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetailsUpdated {
    pub sale_id: DocumentId,
    pub customer: String,
    pub invoice_number: Option<String>,
    pub notes: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

/// Event: StatusChanged.
///
/// When `to` is `FINISHED` the infrastructure layer issues every line from
/// stock within the same unit of work.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusChanged {
    pub sale_id: DocumentId,
    pub from: DocumentStatus,
    pub to: DocumentStatus,
    pub occurred_at: DateTime<Utc>,
}

impl StatusChanged {
    pub fn change(&self) -> StatusChange {
        StatusChange::recorded(self.from, self.to)
    }
}

/// Event: ReturnRecorded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReturnRecorded {
    pub sale_id: DocumentId,
    pub line_no: u32,
    pub item: ItemRef,
    pub quantity: Quantity,
    pub returned_after: Quantity,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SaleEvent {
    SaleCreated(SaleCreated),
    LineAdded(LineAdded),
    LineUpdated(LineUpdated),
    LineRemoved(LineRemoved),
    DetailsUpdated(DetailsUpdated),
    StatusChanged(StatusChanged),
    ReturnRecorded(ReturnRecorded),
}

impl Event for SaleEvent {
    fn event_type(&self) -> &'static str {
        match self {
            SaleEvent::SaleCreated(_) => "sales.sale.created",
            SaleEvent::LineAdded(_) => "sales.sale.line_added",
            SaleEvent::LineUpdated(_) => "sales.sale.line_updated",
            SaleEvent::LineRemoved(_) => "sales.sale.line_removed",
            SaleEvent::DetailsUpdated(_) => "sales.sale.details_updated",
            SaleEvent::StatusChanged(_) => "sales.sale.status_changed",
            SaleEvent::ReturnRecorded(_) => "sales.sale.return_recorded",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            SaleEvent::SaleCreated(e) => e.occurred_at,
            SaleEvent::LineAdded(e) => e.occurred_at,
            SaleEvent::LineUpdated(e) => e.occurred_at,
            SaleEvent::LineRemoved(e) => e.occurred_at,
            SaleEvent::DetailsUpdated(e) => e.occurred_at,
            SaleEvent::StatusChanged(e) => e.occurred_at,
            SaleEvent::ReturnRecorded(e) => e.occurred_at,
        }
    }
}

impl Aggregate for Sale {
    type Command = SaleCommand;
    type Event = SaleEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            SaleEvent::SaleCreated(e) => {
                self.id = e.sale_id;
                self.number = e.number.clone();
                self.invoice_number = e.invoice_number.clone();
                self.customer = e.customer.clone();
                self.notes = e.notes.clone();
                self.status = DocumentStatus::Draft;
                self.lines = e.lines.clone();
                self.returned.clear();
                self.created_by = Some(e.created_by);
                self.created = true;
            }
            SaleEvent::LineAdded(e) => {
                self.lines.push(e.line.clone());
            }
            SaleEvent::LineUpdated(e) => {
                if let Some(line) = self.lines.iter_mut().find(|l| l.line_no == e.line.line_no) {
                    *line = e.line.clone();
                }
            }
            SaleEvent::LineRemoved(e) => {
                self.lines.retain(|l| l.line_no != e.line_no);
            }
            SaleEvent::DetailsUpdated(e) => {
                self.customer = e.customer.clone();
                self.invoice_number = e.invoice_number.clone();
                self.notes = e.notes.clone();
            }
            SaleEvent::StatusChanged(e) => {
                self.status = e.to;
            }
            SaleEvent::ReturnRecorded(e) => {
                self.returned.insert(e.line_no, e.returned_after);
            }
        }

        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            SaleCommand::CreateSale(cmd) => self.handle_create(cmd),
            SaleCommand::AddLine(cmd) => self.handle_add_line(cmd),
            SaleCommand::UpdateLine(cmd) => self.handle_update_line(cmd),
            SaleCommand::RemoveLine(cmd) => self.handle_remove_line(cmd),
            SaleCommand::UpdateDetails(cmd) => self.handle_update_details(cmd),
            SaleCommand::ChangeStatus(cmd) => self.handle_change_status(cmd),
            SaleCommand::RecordReturn(cmd) => self.handle_record_return(cmd),
        }
    }
}

fn normalize_reference(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

impl Sale {
    fn ensure_existing(&self, sale_id: DocumentId) -> Result<(), DomainError> {
        if !self.created {
            return Err(DomainError::not_found("sale", sale_id));
        }
        if self.id != sale_id {
            return Err(DomainError::invariant("sale_id mismatch"));
        }
        Ok(())
    }

    fn ensure_line(&self, line_no: u32) -> Result<&DocumentLine, DomainError> {
        self.lines
            .iter()
            .find(|l| l.line_no == line_no)
            .ok_or_else(|| DomainError::not_found("sale line", line_no))
    }

    fn handle_create(&self, cmd: &CreateSale) -> Result<Vec<SaleEvent>, DomainError> {
        if self.created {
            return Err(DomainError::duplicate_reference(format!(
                "sale {} already exists",
                cmd.sale_id
            )));
        }
        if cmd.number.trim().is_empty() {
            return Err(DomainError::validation("sale number cannot be empty"));
        }
        if cmd.customer.trim().is_empty() {
            return Err(DomainError::validation("customer cannot be empty"));
        }

        let lines = cmd
            .lines
            .iter()
            .cloned()
            .zip(1u32..)
            .map(|(line, no)| line.into_line(no))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(vec![SaleEvent::SaleCreated(SaleCreated {
            sale_id: cmd.sale_id,
            number: cmd.number.trim().to_string(),
            invoice_number: normalize_reference(&cmd.invoice_number),
            customer: cmd.customer.trim().to_string(),
            notes: cmd.notes.clone(),
            lines,
            created_by: cmd.created_by,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_add_line(&self, cmd: &AddLine) -> Result<Vec<SaleEvent>, DomainError> {
        self.ensure_existing(cmd.sale_id)?;
        self.ensure_editable()?;

        let line = cmd.line.clone().into_line(self.next_line_no())?;
        Ok(vec![SaleEvent::LineAdded(LineAdded {
            sale_id: cmd.sale_id,
            line,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_update_line(&self, cmd: &UpdateLine) -> Result<Vec<SaleEvent>, DomainError> {
        self.ensure_existing(cmd.sale_id)?;
        self.ensure_editable()?;
        self.ensure_line(cmd.line_no)?;

        let line = cmd.line.clone().into_line(cmd.line_no)?;
        Ok(vec![SaleEvent::LineUpdated(LineUpdated {
            sale_id: cmd.sale_id,
            line,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_remove_line(&self, cmd: &RemoveLine) -> Result<Vec<SaleEvent>, DomainError> {
        self.ensure_existing(cmd.sale_id)?;
        self.ensure_editable()?;
        self.ensure_line(cmd.line_no)?;

        Ok(vec![SaleEvent::LineRemoved(LineRemoved {
            sale_id: cmd.sale_id,
            line_no: cmd.line_no,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_update_details(&self, cmd: &UpdateDetails) -> Result<Vec<SaleEvent>, DomainError> {
        self.ensure_existing(cmd.sale_id)?;
        self.ensure_editable()?;

        if cmd.customer.trim().is_empty() {
            return Err(DomainError::validation("customer cannot be empty"));
        }

        Ok(vec![SaleEvent::DetailsUpdated(DetailsUpdated {
            sale_id: cmd.sale_id,
            customer: cmd.customer.trim().to_string(),
            invoice_number: normalize_reference(&cmd.invoice_number),
            notes: cmd.notes.clone(),
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_change_status(&self, cmd: &ChangeStatus) -> Result<Vec<SaleEvent>, DomainError> {
        self.ensure_existing(cmd.sale_id)?;

        let StatusChange::Changed { from, to } = self.status.transition(cmd.to)? else {
            return Ok(vec![]);
        };

        if matches!(to, DocumentStatus::Ongoing | DocumentStatus::Finished)
            && self.lines.is_empty()
        {
            return Err(DomainError::validation(
                "sale without lines cannot be processed",
            ));
        }

        Ok(vec![SaleEvent::StatusChanged(StatusChanged {
            sale_id: cmd.sale_id,
            from,
            to,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_record_return(&self, cmd: &RecordReturn) -> Result<Vec<SaleEvent>, DomainError> {
        self.ensure_existing(cmd.sale_id)?;

        if self.status != DocumentStatus::Finished {
            return Err(DomainError::invariant(
                "only finished sales can take returns",
            ));
        }

        let line = self.ensure_line(cmd.line_no)?;
        let quantity = Quantity::positive(cmd.quantity)?;
        let returnable = self
            .returnable_quantity(cmd.line_no)
            .unwrap_or(Quantity::ZERO);
        if quantity > returnable {
            return Err(DomainError::validation(format!(
                "cannot return {quantity} on line {}: only {returnable} left to return",
                cmd.line_no
            )));
        }
        let returned_after = self
            .returned_quantity(cmd.line_no)
            .checked_add(quantity)
            .ok_or_else(|| DomainError::validation("quantity overflow"))?;

        Ok(vec![SaleEvent::ReturnRecorded(ReturnRecorded {
            sale_id: cmd.sale_id,
            line_no: cmd.line_no,
            item: line.item,
            quantity,
            returned_after,
            occurred_at: cmd.occurred_at,
        })])
    }
}
