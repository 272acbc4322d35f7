use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use paintstock_core::{
    Aggregate, AggregateRoot, Document, DocumentId, DocumentLine, DocumentStatus, DomainError,
    Entity, Event, NewLine, StatusChange, SupplierId, UserId,
};

/// Aggregate root: Purchase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Purchase {
    id: DocumentId,
    number: String,
    supplier_id: Option<SupplierId>,
    notes: Option<String>,
    status: DocumentStatus,
    lines: Vec<DocumentLine>,
    created_by: Option<UserId>,
    version: u64,
    created: bool,
}

impl Purchase {
    /// Create an empty, not-yet-created aggregate instance.
    pub fn empty(id: DocumentId) -> Self {
        Self {
            id,
            number: String::new(),
            supplier_id: None,
            notes: None,
            status: DocumentStatus::Draft,
            lines: Vec::new(),
            created_by: None,
            version: 0,
            created: false,
        }
    }

    pub fn supplier_id(&self) -> Option<SupplierId> {
        self.supplier_id
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

    fn next_line_no(&self) -> u32 {
        self.lines.iter().map(|l| l.line_no).max().unwrap_or(0) + 1
    }
}

impl Entity for Purchase {
    type Id = DocumentId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

impl AggregateRoot for Purchase {
    fn version(&self) -> u64 {
        self.version
    }
}

impl Document for Purchase {
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

/// Command: CreatePurchase (always starts as `DRAFT`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatePurchase {
    pub purchase_id: DocumentId,
    pub number: String,
    pub supplier_id: SupplierId,
    pub notes: Option<String>,
    pub lines: Vec<NewLine>,
    pub created_by: UserId,
    pub occurred_at: DateTime<Utc>,
}

/// Command: AddLine (draft only).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddLine {
    pub purchase_id: DocumentId,
    pub line: NewLine,
    pub occurred_at: DateTime<Utc>,
}

/// Command: UpdateLine (draft only).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateLine {
    pub purchase_id: DocumentId,
    pub line_no: u32,
    pub line: NewLine,
    pub occurred_at: DateTime<Utc>,
}

/// Command: RemoveLine (draft only).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoveLine {
    pub purchase_id: DocumentId,
    pub line_no: u32,
    pub occurred_at: DateTime<Utc>,
}

/// Command: UpdateDetails (draft only).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateDetails {
    pub purchase_id: DocumentId,
    pub supplier_id: SupplierId,
    pub notes: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

/// Command: ChangeStatus.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeStatus {
    pub purchase_id: DocumentId,
    pub to: DocumentStatus,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PurchaseCommand {
    CreatePurchase(CreatePurchase),
    AddLine(AddLine),
    UpdateLine(UpdateLine),
    RemoveLine(RemoveLine),
    UpdateDetails(UpdateDetails),
    ChangeStatus(ChangeStatus),
}

/// Event: PurchaseCreated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurchaseCreated {
    pub purchase_id: DocumentId,
    pub number: String,
    pub supplier_id: SupplierId,
    pub notes: Option<String>,
    pub lines: Vec<DocumentLine>,
    pub created_by: UserId,
    pub occurred_at: DateTime<Utc>,
}

/// Event: LineAdded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineAdded {
    pub purchase_id: DocumentId,
    pub line: DocumentLine,
    pub occurred_at: DateTime<Utc>,
}

/// Event: LineUpdated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineUpdated {
    pub purchase_id: DocumentId,
    pub line: DocumentLine,
    pub occurred_at: DateTime<Utc>,
}

/// Event: LineRemoved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineRemoved {
    pub purchase_id: DocumentId,
    pub line_no: u32,
    pub occurred_at: DateTime<Utc>,
}

/// Event: DetailsUpdated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetailsUpdated {
    pub purchase_id: DocumentId,
    pub supplier_id: SupplierId,
    pub notes: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

/// Event: StatusChanged.
///
/// When `to` is `FINISHED` the infrastructure layer receives every line into
/// stock within the same unit of work.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusChanged {
    pub purchase_id: DocumentId,
    pub from: DocumentStatus,
    pub to: DocumentStatus,
    pub occurred_at: DateTime<Utc>,
}

impl StatusChanged {
    pub fn change(&self) -> StatusChange {
        StatusChange::recorded(self.from, self.to)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PurchaseEvent {
    PurchaseCreated(PurchaseCreated),
    LineAdded(LineAdded),
    LineUpdated(LineUpdated),
    LineRemoved(LineRemoved),
    DetailsUpdated(DetailsUpdated),
    StatusChanged(StatusChanged),
}

impl Event for PurchaseEvent {
    fn event_type(&self) -> &'static str {
        match self {
            PurchaseEvent::PurchaseCreated(_) => "purchasing.purchase.created",
            PurchaseEvent::LineAdded(_) => "purchasing.purchase.line_added",
            PurchaseEvent::LineUpdated(_) => "purchasing.purchase.line_updated",
            PurchaseEvent::LineRemoved(_) => "purchasing.purchase.line_removed",
            PurchaseEvent::DetailsUpdated(_) => "purchasing.purchase.details_updated",
            PurchaseEvent::StatusChanged(_) => "purchasing.purchase.status_changed",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            PurchaseEvent::PurchaseCreated(e) => e.occurred_at,
            PurchaseEvent::LineAdded(e) => e.occurred_at,
            PurchaseEvent::LineUpdated(e) => e.occurred_at,
            PurchaseEvent::LineRemoved(e) => e.occurred_at,
            PurchaseEvent::DetailsUpdated(e) => e.occurred_at,
            PurchaseEvent::StatusChanged(e) => e.occurred_at,
        }
    }
}

impl Aggregate for Purchase {
    type Command = PurchaseCommand;
    type Event = PurchaseEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            PurchaseEvent::PurchaseCreated(e) => {
                self.id = e.purchase_id;
                self.number = e.number.clone();
                self.supplier_id = Some(e.supplier_id);
                self.notes = e.notes.clone();
                self.status = DocumentStatus::Draft;
                self.lines = e.lines.clone();
                self.created_by = Some(e.created_by);
                self.created = true;
            }
            PurchaseEvent::LineAdded(e) => {
                self.lines.push(e.line.clone());
            }
            PurchaseEvent::LineUpdated(e) => {
                if let Some(line) = self.lines.iter_mut().find(|l| l.line_no == e.line.line_no) {
                    *line = e.line.clone();
                }
            }
            PurchaseEvent::LineRemoved(e) => {
                self.lines.retain(|l| l.line_no != e.line_no);
            }
            PurchaseEvent::DetailsUpdated(e) => {
                self.supplier_id = Some(e.supplier_id);
                self.notes = e.notes.clone();
            }
            PurchaseEvent::StatusChanged(e) => {
                self.status = e.to;
            }
        }

        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            PurchaseCommand::CreatePurchase(cmd) => self.handle_create(cmd),
            PurchaseCommand::AddLine(cmd) => self.handle_add_line(cmd),
            PurchaseCommand::UpdateLine(cmd) => self.handle_update_line(cmd),
            PurchaseCommand::RemoveLine(cmd) => self.handle_remove_line(cmd),
            PurchaseCommand::UpdateDetails(cmd) => self.handle_update_details(cmd),
            PurchaseCommand::ChangeStatus(cmd) => self.handle_change_status(cmd),
        }
    }
}

impl Purchase {
    fn ensure_existing(&self, purchase_id: DocumentId) -> Result<(), DomainError> {
        if !self.created {
            return Err(DomainError::not_found("purchase", purchase_id));
        }
        if self.id != purchase_id {
            return Err(DomainError::invariant("purchase_id mismatch"));
        }
        Ok(())
    }

    fn ensure_line(&self, line_no: u32) -> Result<(), DomainError> {
        if !self.lines.iter().any(|l| l.line_no == line_no) {
            return Err(DomainError::not_found("purchase line", line_no));
        }
        Ok(())
    }

    fn handle_create(&self, cmd: &CreatePurchase) -> Result<Vec<PurchaseEvent>, DomainError> {
        if self.created {
            return Err(DomainError::duplicate_reference(format!(
                "purchase {} already exists",
                cmd.purchase_id
            )));
        }
        if cmd.number.trim().is_empty() {
            return Err(DomainError::validation("purchase number cannot be empty"));
        }

        let lines = cmd
            .lines
            .iter()
            .cloned()
            .zip(1u32..)
            .map(|(line, no)| line.into_line(no))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(vec![PurchaseEvent::PurchaseCreated(PurchaseCreated {
            purchase_id: cmd.purchase_id,
            number: cmd.number.trim().to_string(),
            supplier_id: cmd.supplier_id,
            notes: cmd.notes.clone(),
            lines,
            created_by: cmd.created_by,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_add_line(&self, cmd: &AddLine) -> Result<Vec<PurchaseEvent>, DomainError> {
        self.ensure_existing(cmd.purchase_id)?;
        self.ensure_editable()?;

        let line = cmd.line.clone().into_line(self.next_line_no())?;
        Ok(vec![PurchaseEvent::LineAdded(LineAdded {
            purchase_id: cmd.purchase_id,
            line,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_update_line(&self, cmd: &UpdateLine) -> Result<Vec<PurchaseEvent>, DomainError> {
        self.ensure_existing(cmd.purchase_id)?;
        self.ensure_editable()?;
        self.ensure_line(cmd.line_no)?;

        let line = cmd.line.clone().into_line(cmd.line_no)?;
        Ok(vec![PurchaseEvent::LineUpdated(LineUpdated {
            purchase_id: cmd.purchase_id,
            line,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_remove_line(&self, cmd: &RemoveLine) -> Result<Vec<PurchaseEvent>, DomainError> {
        self.ensure_existing(cmd.purchase_id)?;
        self.ensure_editable()?;
        self.ensure_line(cmd.line_no)?;

        Ok(vec![PurchaseEvent::LineRemoved(LineRemoved {
            purchase_id: cmd.purchase_id,
            line_no: cmd.line_no,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_update_details(
        &self,
        cmd: &UpdateDetails,
    ) -> Result<Vec<PurchaseEvent>, DomainError> {
        self.ensure_existing(cmd.purchase_id)?;
        self.ensure_editable()?;

        Ok(vec![PurchaseEvent::DetailsUpdated(DetailsUpdated {
            purchase_id: cmd.purchase_id,
            supplier_id: cmd.supplier_id,
            notes: cmd.notes.clone(),
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_change_status(
        &self,
        cmd: &ChangeStatus,
    ) -> Result<Vec<PurchaseEvent>, DomainError> {
        self.ensure_existing(cmd.purchase_id)?;

        let StatusChange::Changed { from, to } = self.status.transition(cmd.to)? else {
            return Ok(vec![]);
        };

        if matches!(to, DocumentStatus::Ongoing | DocumentStatus::Finished)
            && self.lines.is_empty()
        {
            return Err(DomainError::validation(
                "purchase without lines cannot be processed",
            ));
        }

        Ok(vec![PurchaseEvent::StatusChanged(StatusChanged {
            purchase_id: cmd.purchase_id,
            from,
            to,
            occurred_at: cmd.occurred_at,
        })])
    }
}
