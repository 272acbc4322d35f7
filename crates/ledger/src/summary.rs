//! Derived views over movement history.
//!
//! Balances are never stored in the ledger; they are folded from movements
//! when needed (reconciliation, reporting).

use std::collections::BTreeMap;

use rust_decimal::Decimal;

use paintstock_core::ItemRef;

use crate::movement::{DocumentRef, MovementType, StockMovement};

/// Signed net quantity per item.
pub fn net_by_item<'a>(
    movements: impl IntoIterator<Item = &'a StockMovement>,
) -> BTreeMap<ItemRef, Decimal> {
    let mut net = BTreeMap::new();
    for m in movements {
        *net.entry(m.item).or_insert(Decimal::ZERO) += m.signed_quantity();
    }
    net
}

/// Signed net quantity per item, restricted to movements referencing `reference`.
///
/// This answers "how much of X did document Y move".
pub fn net_for_reference<'a>(
    movements: impl IntoIterator<Item = &'a StockMovement>,
    reference: DocumentRef,
) -> BTreeMap<ItemRef, Decimal> {
    net_by_item(
        movements
            .into_iter()
            .filter(|m| m.reference == Some(reference)),
    )
}

/// Signed net quantity per movement type.
pub fn net_by_type<'a>(
    movements: impl IntoIterator<Item = &'a StockMovement>,
) -> BTreeMap<MovementType, Decimal> {
    let mut net = BTreeMap::new();
    for m in movements {
        *net.entry(m.movement_type).or_insert(Decimal::ZERO) += m.signed_quantity();
    }
    net
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use paintstock_core::{DocumentId, ItemId, MovementId, Quantity, UserId};
    use proptest::prelude::*;
    use rust_decimal_macros::dec;

    use crate::movement::{Direction, NewMovement};

    fn book(m: NewMovement) -> StockMovement {
        m.into_movement(MovementId::new()).unwrap()
    }

    fn q(v: i64) -> Quantity {
        Quantity::new(Decimal::from(v)).unwrap()
    }

    #[test]
    fn net_for_reference_only_counts_that_document() {
        let item = ItemRef::finished(ItemId::new());
        let user = UserId::new();
        let sale_a = DocumentId::new();
        let sale_b = DocumentId::new();

        let movements = vec![
            book(NewMovement::sale_out(item, q(3), user, sale_a, Utc::now())),
            book(NewMovement::sale_out(item, q(4), user, sale_b, Utc::now())),
            book(NewMovement::return_in(item, q(1), user, sale_a, Utc::now())),
        ];

        let net = net_for_reference(&movements, DocumentRef::Sale(sale_a));
        assert_eq!(net.get(&item), Some(&dec!(-2)));
        assert_eq!(net_by_item(&movements).get(&item), Some(&dec!(-6)));
    }

    #[test]
    fn net_by_type_separates_adjustments() {
        let item = ItemRef::raw_material(ItemId::new());
        let user = UserId::new();
        let movements = vec![
            book(NewMovement::adjustment(Direction::In, item, q(30), user, None, Utc::now())),
            book(NewMovement::adjustment(Direction::Out, item, q(30), user, None, Utc::now())),
            book(NewMovement::purchase_in(item, q(7), user, DocumentId::new(), Utc::now())),
        ];
        let net = net_by_type(&movements);
        assert_eq!(net.get(&MovementType::Adjustment), Some(&Decimal::ZERO));
        assert_eq!(net.get(&MovementType::PurchaseIn), Some(&dec!(7)));
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 256,
            ..ProptestConfig::default()
        })]

        /// Property: a reversal (opposite adjustment) for every movement nets every
        /// item back to zero.
        #[test]
        fn reversals_net_to_zero(amounts in prop::collection::vec((1i64..10_000i64, any::<bool>()), 1..30)) {
            let item = ItemRef::raw_material(ItemId::new());
            let user = UserId::new();
            let mut movements = Vec::new();
            for (amount, inbound) in amounts {
                let direction = if inbound { Direction::In } else { Direction::Out };
                movements.push(book(NewMovement::adjustment(direction, item, q(amount), user, None, Utc::now())));
                movements.push(book(NewMovement::adjustment(direction.opposite(), item, q(amount), user, None, Utc::now())));
            }
            let net = net_by_item(&movements);
            prop_assert_eq!(net.get(&item).copied(), Some(Decimal::ZERO));
        }
    }
}
