//! Bill-of-materials resolution.
//!
//! Turns a production source into:
//! - the flat, aggregated raw-material detail lines recorded on the produced good, and
//! - the list of items whose stock the production run actually decrements.
//!
//! All existence and sufficiency checks run here, before the caller writes anything.

use std::collections::HashMap;

use paintstock_core::{DomainError, DomainResult, ItemId, ItemRef, Quantity};

use crate::item::InventoryItem;
use crate::production::{BomLine, ProductionSource};

/// Read access to the state the resolver validates against.
pub trait BomSource {
    /// Current row for an item, if it exists.
    fn item(&self, item: ItemRef) -> Option<&InventoryItem>;

    /// Raw-material lines recorded when a semi-finished good was produced.
    ///
    /// `None` when the semi-finished good has no production record (e.g. it was
    /// registered with opening stock).
    fn recorded_bom(&self, semi_finished_id: ItemId) -> Option<&[BomLine]>;
}

/// Result of resolving a production source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedBom {
    /// Aggregated raw-material detail lines, in first-seen order.
    pub details: Vec<BomLine>,
    /// Items to decrement, with the quantity to take from each.
    pub consumption: Vec<(ItemRef, Quantity)>,
}

/// Ordered accumulator keyed by item id; repeated ids are summed.
#[derive(Debug, Default)]
struct Totals {
    order: Vec<ItemId>,
    amounts: HashMap<ItemId, Quantity>,
}

impl Totals {
    fn add(&mut self, id: ItemId, quantity: Quantity) -> DomainResult<()> {
        match self.amounts.get_mut(&id) {
            Some(total) => {
                *total = total
                    .checked_add(quantity)
                    .ok_or_else(|| DomainError::validation("quantity overflow"))?;
            }
            None => {
                self.order.push(id);
                self.amounts.insert(id, quantity);
            }
        }
        Ok(())
    }

    fn into_pairs(self) -> Vec<(ItemId, Quantity)> {
        let Totals { order, amounts } = self;
        order
            .into_iter()
            .filter_map(|id| amounts.get(&id).map(|q| (id, *q)))
            .collect()
    }
}

/// Resolve a production source against current stock.
///
/// Requested quantities for the same input are summed before the sufficiency
/// check. For semi-finished inputs, each recorded raw-material line is
/// multiplied by the requested semi-finished quantity and summed per raw
/// material; those lines are for traceability only and are not returned as
/// consumption.
pub fn resolve<S>(source: &S, input: &ProductionSource) -> DomainResult<ResolvedBom>
where
    S: BomSource + ?Sized,
{
    let kind = input.item_kind();

    let mut requested = Totals::default();
    for line in input.lines() {
        requested.add(line.item_id, Quantity::positive(line.quantity)?)?;
    }
    let requested = requested.into_pairs();
    if requested.is_empty() {
        return Err(DomainError::validation(
            "production source must list at least one input",
        ));
    }

    for (id, qty) in &requested {
        let item_ref = ItemRef::new(kind, *id);
        let item = source
            .item(item_ref)
            .ok_or_else(|| DomainError::not_found(kind.as_str(), id))?;
        item.ensure_available(*qty)?;
    }

    let consumption: Vec<(ItemRef, Quantity)> = requested
        .iter()
        .map(|(id, qty)| (ItemRef::new(kind, *id), *qty))
        .collect();

    let details = match input {
        ProductionSource::RawMaterials(_) => requested
            .iter()
            .map(|(id, qty)| BomLine {
                raw_material_id: *id,
                quantity: *qty,
            })
            .collect(),
        ProductionSource::SemiFinishedGoods(_) => {
            let mut raw = Totals::default();
            for (semi_id, semi_qty) in &requested {
                let Some(lines) = source.recorded_bom(*semi_id) else {
                    tracing::debug!(semi_finished_id = %semi_id, "no recorded bill of materials");
                    continue;
                };
                for line in lines {
                    let contribution = line
                        .quantity
                        .checked_mul(*semi_qty)
                        .ok_or_else(|| DomainError::validation("quantity overflow"))?;
                    raw.add(line.raw_material_id, contribution)?;
                }
            }
            raw.into_pairs()
                .into_iter()
                .map(|(raw_material_id, quantity)| BomLine {
                    raw_material_id,
                    quantity,
                })
                .collect()
        }
    };

    Ok(ResolvedBom {
        details,
        consumption,
    })
}
