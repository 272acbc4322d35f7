//! Purchase and sale command dispatch.
//!
//! Every command runs as one unit of work: load the document, decide and apply
//! events, carry out the stock effects of those events (receiving on purchase
//! `FINISHED`, issuing on sale `FINISHED`, customer returns), then persist.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use tracing::instrument;

use paintstock_core::aggregate::execute;
use paintstock_core::{
    Document, DocumentId, DocumentStatus, DomainError, Entity, NewLine, Quantity, UserId,
};
use paintstock_ledger::NewMovement;
use paintstock_purchasing::{CreatePurchase, Purchase, PurchaseCommand, PurchaseEvent};
use paintstock_sales::{CreateSale, RecordReturn, Sale, SaleCommand, SaleEvent};

use crate::config::InventoryConfig;
use crate::error::ServiceResult;
use crate::store::{InMemoryStockStore, StockTransaction};

#[derive(Debug, Clone)]
pub struct DocumentService {
    store: Arc<InMemoryStockStore>,
    config: InventoryConfig,
}

impl DocumentService {
    pub fn new(store: Arc<InMemoryStockStore>, config: InventoryConfig) -> Self {
        Self { store, config }
    }

    pub fn purchase(&self, id: DocumentId) -> ServiceResult<Purchase> {
        self.store
            .read(|state| state.purchase(id).cloned())?
            .ok_or_else(|| DomainError::not_found("purchase", id).into())
    }

    pub fn sale(&self, id: DocumentId) -> ServiceResult<Sale> {
        self.store
            .read(|state| state.sale(id).cloned())?
            .ok_or_else(|| DomainError::not_found("sale", id).into())
    }

    /// Execute any purchase command.
    #[instrument(skip(self, command), fields(purchase_id = %purchase_id(&command)), err)]
    pub fn dispatch_purchase(
        &self,
        command: PurchaseCommand,
        user_id: UserId,
    ) -> ServiceResult<Purchase> {
        let id = purchase_id(&command);
        let mut tx = self.store.begin()?;
        let mut purchase = tx
            .purchase(id)
            .cloned()
            .unwrap_or_else(|| Purchase::empty(id));

        match &command {
            PurchaseCommand::AddLine(_)
            | PurchaseCommand::UpdateLine(_)
            | PurchaseCommand::RemoveLine(_)
            | PurchaseCommand::UpdateDetails(_) => {
                ensure_draft(&purchase, purchase.is_created(), "purchase")?;
            }
            _ => {}
        }

        match &command {
            PurchaseCommand::CreatePurchase(cmd) => {
                let taken = tx
                    .purchases()
                    .values()
                    .any(|p| p.id() != &id && p.number() == cmd.number.trim());
                if taken {
                    return Err(DomainError::duplicate_reference(format!(
                        "purchase number '{}'",
                        cmd.number.trim()
                    ))
                    .into());
                }
                self.validate_lines(&tx, &cmd.lines)?;
            }
            PurchaseCommand::AddLine(cmd) => self.validate_lines(&tx, [&cmd.line])?,
            PurchaseCommand::UpdateLine(cmd) => self.validate_lines(&tx, [&cmd.line])?,
            _ => {}
        }

        let events = execute(&mut purchase, &command)?;

        for event in &events {
            match event {
                PurchaseEvent::StatusChanged(e) if e.change().finalizes() => {
                    receive(&mut tx, &purchase, user_id, e.occurred_at)?;
                }
                _ => {}
            }
        }

        if events.is_empty() {
            return Ok(purchase);
        }
        tx.put_purchase(purchase.clone());
        tx.commit();

        tracing::info!(
            number = purchase.number(),
            status = %purchase.status(),
            events = events.len(),
            "purchase updated"
        );
        Ok(purchase)
    }

    /// Execute any sale command.
    #[instrument(skip(self, command), fields(sale_id = %sale_id(&command)), err)]
    pub fn dispatch_sale(&self, command: SaleCommand, user_id: UserId) -> ServiceResult<Sale> {
        let id = sale_id(&command);
        let mut tx = self.store.begin()?;
        let mut sale = tx.sale(id).cloned().unwrap_or_else(|| Sale::empty(id));

        match &command {
            SaleCommand::AddLine(_)
            | SaleCommand::UpdateLine(_)
            | SaleCommand::RemoveLine(_)
            | SaleCommand::UpdateDetails(_) => {
                ensure_draft(&sale, sale.is_created(), "sale")?;
            }
            _ => {}
        }

        match &command {
            SaleCommand::CreateSale(cmd) => {
                ensure_unique_sale_refs(&tx, id, Some(&cmd.number), cmd.invoice_number.as_deref())?;
                self.validate_lines(&tx, &cmd.lines)?;
            }
            SaleCommand::UpdateDetails(cmd) => {
                ensure_unique_sale_refs(&tx, id, None, cmd.invoice_number.as_deref())?;
            }
            SaleCommand::AddLine(cmd) => self.validate_lines(&tx, [&cmd.line])?,
            SaleCommand::UpdateLine(cmd) => self.validate_lines(&tx, [&cmd.line])?,
            _ => {}
        }

        let events = execute(&mut sale, &command)?;

        for event in &events {
            match event {
                SaleEvent::StatusChanged(e) if e.change().finalizes() => {
                    issue(&mut tx, &sale, user_id, e.occurred_at)?;
                }
                SaleEvent::ReturnRecorded(e) => {
                    tx.move_stock(NewMovement::return_in(
                        e.item,
                        e.quantity,
                        user_id,
                        id,
                        e.occurred_at,
                    ))?;
                }
                _ => {}
            }
        }

        if events.is_empty() {
            return Ok(sale);
        }
        tx.put_sale(sale.clone());
        tx.commit();

        tracing::info!(
            number = sale.number(),
            status = %sale.status(),
            events = events.len(),
            "sale updated"
        );
        Ok(sale)
    }

    pub fn create_purchase(&self, command: CreatePurchase) -> ServiceResult<Purchase> {
        let user_id = command.created_by;
        self.dispatch_purchase(PurchaseCommand::CreatePurchase(command), user_id)
    }

    pub fn create_sale(&self, command: CreateSale) -> ServiceResult<Sale> {
        let user_id = command.created_by;
        self.dispatch_sale(SaleCommand::CreateSale(command), user_id)
    }

    /// Move a purchase to `to`; reaching `FINISHED` receives every line into stock.
    pub fn transition_purchase(
        &self,
        purchase_id: DocumentId,
        to: DocumentStatus,
        user_id: UserId,
        occurred_at: DateTime<Utc>,
    ) -> ServiceResult<Purchase> {
        self.dispatch_purchase(
            PurchaseCommand::ChangeStatus(paintstock_purchasing::ChangeStatus {
                purchase_id,
                to,
                occurred_at,
            }),
            user_id,
        )
    }

    /// Move a sale to `to`; reaching `FINISHED` issues every line from stock.
    pub fn transition_sale(
        &self,
        sale_id: DocumentId,
        to: DocumentStatus,
        user_id: UserId,
        occurred_at: DateTime<Utc>,
    ) -> ServiceResult<Sale> {
        self.dispatch_sale(
            SaleCommand::ChangeStatus(paintstock_sales::ChangeStatus {
                sale_id,
                to,
                occurred_at,
            }),
            user_id,
        )
    }

    /// Take back part of a finished sale line.
    pub fn record_sale_return(
        &self,
        sale_id: DocumentId,
        line_no: u32,
        quantity: Decimal,
        user_id: UserId,
        occurred_at: DateTime<Utc>,
    ) -> ServiceResult<Sale> {
        Quantity::positive(quantity)?.ensure_scale(self.config.quantity_scale)?;
        self.dispatch_sale(
            SaleCommand::RecordReturn(RecordReturn {
                sale_id,
                line_no,
                quantity,
                occurred_at,
            }),
            user_id,
        )
    }

    /// Referenced items must exist and quantities must fit the configured scale.
    fn validate_lines<'l>(
        &self,
        tx: &StockTransaction<'_>,
        lines: impl IntoIterator<Item = &'l NewLine>,
    ) -> ServiceResult<()> {
        for line in lines {
            if tx.item(line.item).is_none() {
                return Err(DomainError::not_found(line.item.kind.as_str(), line.item.id).into());
            }
            Quantity::positive(line.quantity)?.ensure_scale(self.config.quantity_scale)?;
        }
        Ok(())
    }
}

fn purchase_id(command: &PurchaseCommand) -> DocumentId {
    match command {
        PurchaseCommand::CreatePurchase(c) => c.purchase_id,
        PurchaseCommand::AddLine(c) => c.purchase_id,
        PurchaseCommand::UpdateLine(c) => c.purchase_id,
        PurchaseCommand::RemoveLine(c) => c.purchase_id,
        PurchaseCommand::UpdateDetails(c) => c.purchase_id,
        PurchaseCommand::ChangeStatus(c) => c.purchase_id,
    }
}

fn sale_id(command: &SaleCommand) -> DocumentId {
    match command {
        SaleCommand::CreateSale(c) => c.sale_id,
        SaleCommand::AddLine(c) => c.sale_id,
        SaleCommand::UpdateLine(c) => c.sale_id,
        SaleCommand::RemoveLine(c) => c.sale_id,
        SaleCommand::UpdateDetails(c) => c.sale_id,
        SaleCommand::ChangeStatus(c) => c.sale_id,
        SaleCommand::RecordReturn(c) => c.sale_id,
    }
}

/// Edits address an existing draft. A locked document is reported before its
/// payload is looked at.
fn ensure_draft<D: Document>(
    document: &D,
    created: bool,
    entity: &'static str,
) -> ServiceResult<()> {
    if !created {
        return Err(DomainError::not_found(entity, document.id()).into());
    }
    document.ensure_editable()?;
    Ok(())
}

/// Sale numbers and invoice numbers are unique across sales.
fn ensure_unique_sale_refs(
    tx: &StockTransaction<'_>,
    id: DocumentId,
    number: Option<&str>,
    invoice_number: Option<&str>,
) -> ServiceResult<()> {
    let number = number.map(str::trim);
    let invoice_number = invoice_number.map(str::trim).filter(|s| !s.is_empty());

    for other in tx.sales().values().filter(|s| s.id() != &id) {
        if number.is_some_and(|n| other.number() == n) {
            return Err(DomainError::duplicate_reference(format!(
                "sale number '{}'",
                other.number()
            ))
            .into());
        }
        if let Some(invoice) = invoice_number {
            if other.invoice_number() == Some(invoice) {
                return Err(
                    DomainError::duplicate_reference(format!("invoice number '{invoice}'")).into(),
                );
            }
        }
    }
    Ok(())
}

/// `PURCHASE_IN` for every line.
fn receive(
    tx: &mut StockTransaction<'_>,
    purchase: &Purchase,
    user_id: UserId,
    occurred_at: DateTime<Utc>,
) -> ServiceResult<()> {
    for line in purchase.lines() {
        tx.move_stock(NewMovement::purchase_in(
            line.item,
            line.quantity,
            user_id,
            *purchase.id(),
            occurred_at,
        ))?;
    }
    Ok(())
}

/// Check every item against the summed quantity of its lines, then `SALE_OUT`
/// for every line. Nothing is written unless all checks pass.
fn issue(
    tx: &mut StockTransaction<'_>,
    sale: &Sale,
    user_id: UserId,
    occurred_at: DateTime<Utc>,
) -> ServiceResult<()> {
    for (item, requested) in sale.quantities_by_item()? {
        let row = tx
            .item(item)
            .ok_or_else(|| DomainError::not_found(item.kind.as_str(), item.id))?;
        row.ensure_available(requested)?;
    }

    for line in sale.lines() {
        tx.move_stock(NewMovement::sale_out(
            line.item,
            line.quantity,
            user_id,
            *sale.id(),
            occurred_at,
        ))?;
    }
    Ok(())
}
