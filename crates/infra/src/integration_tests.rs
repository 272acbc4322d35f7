//! Integration tests for the full stock pipeline.
//!
//! Tests: service call → unit of work → inventory rows + ledger.
//!
//! Verifies:
//! - Production consumes the right items and records the right detail lines
//! - Edits and deletions reverse exactly what was consumed
//! - Document finalization moves stock, or nothing at all
//! - Every stored quantity is explained by the ledger

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use proptest::prelude::*;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    use paintstock_core::{
        Document, DocumentId, DocumentStatus, DomainError, ItemId, ItemKind, ItemRef, NewLine,
        SupplierId, UserId,
    };
    use paintstock_inventory::{BomLine, ProducedKind, ProductionSource, SourceLine, UnitPrices};
    use paintstock_ledger::{Direction, DocumentRef, MovementType};
    use paintstock_purchasing::{AddLine, CreatePurchase, PurchaseCommand};
    use paintstock_sales::{CreateSale, SaleCommand, UpdateDetails};

    use crate::{
        EditProduction, Inventory, InventoryConfig, ProduceGood, RegisterItem, ServiceError,
    };

    struct Fixture {
        inv: Inventory,
        user: UserId,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                inv: Inventory::in_memory(InventoryConfig::default()),
                user: UserId::new(),
            }
        }

        fn register(&self, kind: ItemKind, name: &str, opening: Decimal) -> ItemRef {
            let item = ItemRef::new(kind, ItemId::new());
            self.inv
                .stock
                .register_item(RegisterItem {
                    item,
                    name: name.to_string(),
                    supplier_id: kind.is_supplied().then(SupplierId::new),
                    prices: UnitPrices::default(),
                    opening_quantity: Some(opening),
                    user_id: self.user,
                    occurred_at: Utc::now(),
                })
                .unwrap();
            item
        }

        fn produce(
            &self,
            kind: ProducedKind,
            name: &str,
            declared: Decimal,
            source: ProductionSource,
        ) -> Result<ItemRef, ServiceError> {
            let id = ItemId::new();
            self.inv.production.create(ProduceGood {
                item_id: id,
                kind,
                name: name.to_string(),
                prices: UnitPrices::default(),
                declared_quantity: declared,
                source,
                user_id: self.user,
                occurred_at: Utc::now(),
            })?;
            Ok(kind.item_ref(id))
        }

        fn edit(
            &self,
            produced: ItemRef,
            declared: Decimal,
            source: ProductionSource,
        ) -> Result<(), ServiceError> {
            self.inv.production.edit(EditProduction {
                item_id: produced.id,
                declared_quantity: declared,
                source,
                user_id: self.user,
                occurred_at: Utc::now(),
            })?;
            Ok(())
        }

        fn qty(&self, item: ItemRef) -> Decimal {
            self.inv.stock.quantity(item).unwrap().value()
        }

        fn purchase(&self, number: &str, lines: Vec<NewLine>) -> DocumentId {
            let id = DocumentId::new();
            self.inv
                .documents
                .create_purchase(CreatePurchase {
                    purchase_id: id,
                    number: number.to_string(),
                    supplier_id: SupplierId::new(),
                    notes: None,
                    lines,
                    created_by: self.user,
                    occurred_at: Utc::now(),
                })
                .unwrap();
            id
        }

        fn sale(
            &self,
            number: &str,
            invoice: Option<&str>,
            lines: Vec<NewLine>,
        ) -> Result<DocumentId, ServiceError> {
            let id = DocumentId::new();
            self.inv.documents.create_sale(CreateSale {
                sale_id: id,
                number: number.to_string(),
                invoice_number: invoice.map(str::to_string),
                customer: "Harbor Coatings".to_string(),
                notes: None,
                lines,
                created_by: self.user,
                occurred_at: Utc::now(),
            })?;
            Ok(id)
        }

        fn move_purchase(&self, id: DocumentId, to: DocumentStatus) -> Result<(), ServiceError> {
            self.inv
                .documents
                .transition_purchase(id, to, self.user, Utc::now())
                .map(|_| ())
        }

        fn move_sale(&self, id: DocumentId, to: DocumentStatus) -> Result<(), ServiceError> {
            self.inv
                .documents
                .transition_sale(id, to, self.user, Utc::now())
                .map(|_| ())
        }

        fn assert_balanced(&self) {
            assert_eq!(self.inv.stock.reconcile().unwrap(), vec![]);
        }
    }

    fn raw(item: ItemRef, qty: Decimal) -> ProductionSource {
        ProductionSource::RawMaterials(vec![SourceLine::new(item.id, qty)])
    }

    fn semis(lines: &[(ItemRef, Decimal)]) -> ProductionSource {
        ProductionSource::SemiFinishedGoods(
            lines
                .iter()
                .map(|(item, qty)| SourceLine::new(item.id, *qty))
                .collect(),
        )
    }

    fn domain(err: ServiceError) -> DomainError {
        match err.as_domain() {
            Some(e) => e.clone(),
            None => panic!("expected a domain error, got {err:?}"),
        }
    }

    #[test]
    fn producing_from_raw_materials_consumes_them() {
        let fx = Fixture::new();
        let r = fx.register(ItemKind::RawMaterial, "Resin", dec!(100));

        let f = fx
            .produce(ProducedKind::FinishedGood, "Gloss white", dec!(12), raw(r, dec!(30)))
            .unwrap();

        assert_eq!(fx.qty(r), dec!(70));
        assert_eq!(fx.qty(f), dec!(12));

        let record = fx.inv.production.record(f.id).unwrap();
        assert_eq!(record.detail_quantity(r.id).value(), dec!(30));

        let moved = fx
            .inv
            .stock
            .movements_for_document(DocumentRef::FinishedGood(f.id))
            .unwrap();
        let kinds: Vec<_> = moved.iter().map(|m| (m.movement_type, m.item)).collect();
        assert_eq!(
            kinds,
            vec![(MovementType::ProductionOut, r), (MovementType::ProductionIn, f)]
        );
        fx.assert_balanced();
    }

    #[test]
    fn producing_from_semi_finished_goods_records_raw_lines_without_consuming_them() {
        let fx = Fixture::new();
        let r = fx.register(ItemKind::RawMaterial, "Resin", dec!(100));
        let s = fx
            .produce(ProducedKind::SemiFinishedGood, "Base white", dec!(5), raw(r, dec!(10)))
            .unwrap();
        assert_eq!(fx.qty(r), dec!(90));

        let f = fx
            .produce(ProducedKind::FinishedGood, "Eggshell white", dec!(8), semis(&[(s, dec!(2))]))
            .unwrap();

        let record = fx.inv.production.record(f.id).unwrap();
        assert_eq!(
            record.details,
            vec![BomLine {
                raw_material_id: r.id,
                quantity: paintstock_core::Quantity::new(dec!(20)).unwrap(),
            }]
        );
        assert_eq!(fx.qty(s), dec!(3));
        assert_eq!(fx.qty(r), dec!(90));
        fx.assert_balanced();
    }

    #[test]
    fn semi_finished_goods_sharing_a_raw_material_sum_into_one_detail_line() {
        let fx = Fixture::new();
        let r = fx.register(ItemKind::RawMaterial, "Solvent", dec!(100));
        let s1 = fx
            .produce(ProducedKind::SemiFinishedGood, "Base A", dec!(10), raw(r, dec!(3)))
            .unwrap();
        let s2 = fx
            .produce(ProducedKind::SemiFinishedGood, "Base B", dec!(10), raw(r, dec!(2)))
            .unwrap();

        let f = fx
            .produce(
                ProducedKind::FinishedGood,
                "Satin grey",
                dec!(1),
                semis(&[(s1, dec!(2)), (s2, dec!(4))]),
            )
            .unwrap();

        let record = fx.inv.production.record(f.id).unwrap();
        assert_eq!(record.details.len(), 1);
        assert_eq!(record.detail_quantity(r.id).value(), dec!(14));
    }

    #[test]
    fn editing_reverses_previous_consumption_before_reapplying() {
        let fx = Fixture::new();
        let r = fx.register(ItemKind::RawMaterial, "Resin", dec!(100));
        let f = fx
            .produce(ProducedKind::FinishedGood, "Gloss white", dec!(10), raw(r, dec!(30)))
            .unwrap();

        fx.edit(f, dec!(15), raw(r, dec!(50))).unwrap();

        assert_eq!(fx.qty(r), dec!(50));
        assert_eq!(fx.qty(f), dec!(15));

        let record = fx.inv.production.record(f.id).unwrap();
        assert_eq!(record.detail_quantity(r.id).value(), dec!(50));
        assert!(record.updated_at.is_some());

        let history: Vec<_> = fx
            .inv
            .stock
            .movements_for_document(DocumentRef::FinishedGood(f.id))
            .unwrap()
            .into_iter()
            .filter(|m| m.item == r)
            .map(|m| (m.movement_type, m.direction, m.quantity.value()))
            .collect();
        assert_eq!(
            history,
            vec![
                (MovementType::ProductionOut, Direction::Out, dec!(30)),
                (MovementType::Adjustment, Direction::In, dec!(30)),
                (MovementType::ProductionOut, Direction::Out, dec!(50)),
            ]
        );
        fx.assert_balanced();
    }

    #[test]
    fn editing_back_and_forth_nets_to_the_original_effect() {
        let fx = Fixture::new();
        let r = fx.register(ItemKind::RawMaterial, "Resin", dec!(100));
        let p = fx.register(ItemKind::RawMaterial, "Pigment", dec!(40));
        let f = fx
            .produce(ProducedKind::FinishedGood, "Gloss red", dec!(10), raw(r, dec!(30)))
            .unwrap();
        let after_create = (fx.qty(r), fx.qty(p), fx.qty(f));
        let net_after_create = fx
            .inv
            .stock
            .net_for_document(DocumentRef::FinishedGood(f.id))
            .unwrap();

        fx.edit(
            f,
            dec!(25),
            ProductionSource::RawMaterials(vec![
                SourceLine::new(r.id, dec!(10)),
                SourceLine::new(p.id, dec!(20)),
            ]),
        )
        .unwrap();
        fx.edit(f, dec!(10), raw(r, dec!(30))).unwrap();

        assert_eq!((fx.qty(r), fx.qty(p), fx.qty(f)), after_create);
        let net_after_edits = fx
            .inv
            .stock
            .net_for_document(DocumentRef::FinishedGood(f.id))
            .unwrap();
        assert_eq!(net_after_edits.get(&r), net_after_create.get(&r));
        assert_eq!(net_after_edits.get(&f), net_after_create.get(&f));
        assert_eq!(net_after_edits.get(&p).copied(), Some(Decimal::ZERO));
        fx.assert_balanced();
    }

    #[test]
    fn editing_a_semi_sourced_record_never_credits_raw_materials() {
        let fx = Fixture::new();
        let r = fx.register(ItemKind::RawMaterial, "Resin", dec!(100));
        let s = fx
            .produce(ProducedKind::SemiFinishedGood, "Base white", dec!(10), raw(r, dec!(10)))
            .unwrap();
        let f = fx
            .produce(ProducedKind::FinishedGood, "Matt white", dec!(4), semis(&[(s, dec!(4))]))
            .unwrap();
        assert_eq!((fx.qty(r), fx.qty(s)), (dec!(90), dec!(6)));

        fx.edit(f, dec!(4), semis(&[(s, dec!(1))])).unwrap();

        assert_eq!(fx.qty(r), dec!(90));
        assert_eq!(fx.qty(s), dec!(9));
        fx.assert_balanced();
    }

    #[test]
    fn failed_edit_leaves_the_record_and_stock_untouched() {
        let fx = Fixture::new();
        let r = fx.register(ItemKind::RawMaterial, "Resin", dec!(100));
        let f = fx
            .produce(ProducedKind::FinishedGood, "Gloss white", dec!(10), raw(r, dec!(30)))
            .unwrap();
        let movements_before = fx.inv.stock.movements_for_item(r).unwrap().len();

        let err = fx.edit(f, dec!(10), raw(r, dec!(130))).unwrap_err();

        assert_eq!(
            domain(err),
            DomainError::insufficient_stock("Resin", dec!(100), dec!(130))
        );
        assert_eq!(fx.qty(r), dec!(70));
        assert_eq!(fx.qty(f), dec!(10));
        assert_eq!(fx.inv.stock.movements_for_item(r).unwrap().len(), movements_before);
        assert_eq!(
            fx.inv.production.record(f.id).unwrap().detail_quantity(r.id).value(),
            dec!(30)
        );
    }

    #[test]
    fn insufficient_raw_material_aborts_production_entirely() {
        let fx = Fixture::new();
        let r = fx.register(ItemKind::RawMaterial, "Resin", dec!(20));
        let p = fx.register(ItemKind::RawMaterial, "Pigment", dec!(5));

        let err = fx
            .produce(
                ProducedKind::FinishedGood,
                "Gloss red",
                dec!(1),
                ProductionSource::RawMaterials(vec![
                    SourceLine::new(r.id, dec!(10)),
                    SourceLine::new(p.id, dec!(6)),
                ]),
            )
            .unwrap_err();

        assert!(matches!(domain(err), DomainError::InsufficientStock { .. }));
        assert_eq!(fx.qty(r), dec!(20));
        assert_eq!(fx.qty(p), dec!(5));
        assert_eq!(fx.inv.stock.movements_for_item(r).unwrap().len(), 1);
        fx.assert_balanced();
    }

    #[test]
    fn unknown_input_is_not_found() {
        let fx = Fixture::new();
        let missing = ItemId::new();
        let err = fx
            .produce(
                ProducedKind::FinishedGood,
                "Ghost",
                dec!(1),
                ProductionSource::RawMaterials(vec![SourceLine::new(missing, dec!(1))]),
            )
            .unwrap_err();
        assert_eq!(domain(err), DomainError::not_found("raw_material", missing));
    }

    #[test]
    fn too_many_decimal_places_are_rejected() {
        let fx = Fixture::new();
        let r = fx.register(ItemKind::RawMaterial, "Resin", dec!(100));
        let err = fx
            .produce(ProducedKind::FinishedGood, "Gloss", dec!(1), raw(r, dec!(0.00001)))
            .unwrap_err();
        assert!(matches!(domain(err), DomainError::Validation(_)));
    }

    #[test]
    fn a_record_cannot_consume_itself() {
        let fx = Fixture::new();
        let r = fx.register(ItemKind::RawMaterial, "Resin", dec!(100));
        let s = fx
            .produce(ProducedKind::SemiFinishedGood, "Base", dec!(5), raw(r, dec!(5)))
            .unwrap();
        let err = fx.edit(s, dec!(5), semis(&[(s, dec!(1))])).unwrap_err();
        assert!(matches!(domain(err), DomainError::Validation(_)));
    }

    #[test]
    fn deleting_a_record_restores_inputs_and_removes_the_good() {
        let fx = Fixture::new();
        let r = fx.register(ItemKind::RawMaterial, "Resin", dec!(100));
        let f = fx
            .produce(ProducedKind::FinishedGood, "Gloss white", dec!(10), raw(r, dec!(30)))
            .unwrap();

        fx.inv.production.delete(f.id, fx.user, Utc::now()).unwrap();

        assert_eq!(fx.qty(r), dec!(100));
        assert!(fx.inv.stock.item(f).is_err());
        assert!(fx.inv.production.record(f.id).is_err());
        fx.assert_balanced();
    }

    #[test]
    fn deleting_a_partly_sold_good_fails_without_side_effects() {
        let fx = Fixture::new();
        let r = fx.register(ItemKind::RawMaterial, "Resin", dec!(100));
        let f = fx
            .produce(ProducedKind::FinishedGood, "Gloss white", dec!(10), raw(r, dec!(30)))
            .unwrap();
        fx.inv
            .stock
            .adjust_stock(f, dec!(-3), "damaged cans", fx.user, Utc::now())
            .unwrap();

        let err = fx.inv.production.delete(f.id, fx.user, Utc::now()).unwrap_err();

        assert!(matches!(domain(err), DomainError::InsufficientStock { .. }));
        assert_eq!(fx.qty(r), dec!(70));
        assert_eq!(fx.qty(f), dec!(7));
        assert!(fx.inv.production.record(f.id).is_ok());
        fx.assert_balanced();
    }

    #[test]
    fn finishing_a_purchase_receives_every_line() {
        let fx = Fixture::new();
        let r = fx.register(ItemKind::RawMaterial, "Resin", dec!(0));
        let a = fx.register(ItemKind::Accessory, "Lid", dec!(10));
        let id = fx.purchase(
            "PO-1",
            vec![
                NewLine::new(r, dec!(25), dec!(3.5)),
                NewLine::new(a, dec!(100), dec!(0.1)),
                NewLine::new(r, dec!(5), dec!(3.5)),
            ],
        );

        fx.move_purchase(id, DocumentStatus::Ongoing).unwrap();
        assert_eq!(fx.qty(r), dec!(0), "no stock effect before FINISHED");
        fx.move_purchase(id, DocumentStatus::Finished).unwrap();

        assert_eq!(fx.qty(r), dec!(30));
        assert_eq!(fx.qty(a), dec!(110));
        let moved = fx
            .inv
            .stock
            .movements_for_document(DocumentRef::Purchase(id))
            .unwrap();
        assert_eq!(moved.len(), 3);
        assert!(moved.iter().all(|m| m.movement_type == MovementType::PurchaseIn));
        fx.assert_balanced();
    }

    #[test]
    fn canceling_a_draft_purchase_has_no_stock_effect() {
        let fx = Fixture::new();
        let r = fx.register(ItemKind::RawMaterial, "Resin", dec!(10));
        let id = fx.purchase("PO-2", vec![NewLine::new(r, dec!(25), dec!(3))]);

        fx.move_purchase(id, DocumentStatus::Canceled).unwrap();

        assert_eq!(fx.qty(r), dec!(10));
        assert!(
            fx.inv
                .stock
                .movements_for_document(DocumentRef::Purchase(id))
                .unwrap()
                .is_empty()
        );
        let err = fx.move_purchase(id, DocumentStatus::Ongoing).unwrap_err();
        assert_eq!(
            domain(err),
            DomainError::invalid_transition(DocumentStatus::Canceled, DocumentStatus::Ongoing)
        );
    }

    #[test]
    fn finished_documents_are_immutable() {
        let fx = Fixture::new();
        let r = fx.register(ItemKind::RawMaterial, "Resin", dec!(0));
        let id = fx.purchase("PO-3", vec![NewLine::new(r, dec!(1), dec!(1))]);
        fx.move_purchase(id, DocumentStatus::Ongoing).unwrap();
        fx.move_purchase(id, DocumentStatus::Finished).unwrap();

        let err = fx
            .inv
            .documents
            .dispatch_purchase(
                PurchaseCommand::AddLine(AddLine {
                    purchase_id: id,
                    line: NewLine::new(r, dec!(1), dec!(1)),
                    occurred_at: Utc::now(),
                }),
                fx.user,
            )
            .unwrap_err();
        assert!(matches!(domain(err), DomainError::DocumentLocked { .. }));

        for to in [DocumentStatus::Draft, DocumentStatus::Ongoing, DocumentStatus::Canceled] {
            assert!(fx.move_purchase(id, to).is_err());
        }

        fx.move_purchase(id, DocumentStatus::Finished).unwrap();
        assert_eq!(fx.qty(r), dec!(1), "self-transition books nothing");
    }

    #[test]
    fn edits_to_a_finished_purchase_report_the_lock_first() {
        let fx = Fixture::new();
        let r = fx.register(ItemKind::RawMaterial, "Resin", dec!(0));
        let id = fx.purchase("PO-4", vec![NewLine::new(r, dec!(2), dec!(1))]);
        fx.move_purchase(id, DocumentStatus::Ongoing).unwrap();
        fx.move_purchase(id, DocumentStatus::Finished).unwrap();

        let missing = ItemRef::raw_material(ItemId::new());
        let commands = [
            PurchaseCommand::AddLine(AddLine {
                purchase_id: id,
                line: NewLine::new(missing, dec!(1), dec!(1)),
                occurred_at: Utc::now(),
            }),
            PurchaseCommand::AddLine(AddLine {
                purchase_id: id,
                line: NewLine::new(r, dec!(1.123456), dec!(1)),
                occurred_at: Utc::now(),
            }),
            PurchaseCommand::UpdateLine(paintstock_purchasing::UpdateLine {
                purchase_id: id,
                line_no: 1,
                line: NewLine::new(missing, dec!(1), dec!(1)),
                occurred_at: Utc::now(),
            }),
            PurchaseCommand::RemoveLine(paintstock_purchasing::RemoveLine {
                purchase_id: id,
                line_no: 1,
                occurred_at: Utc::now(),
            }),
            PurchaseCommand::UpdateDetails(paintstock_purchasing::UpdateDetails {
                purchase_id: id,
                supplier_id: SupplierId::new(),
                notes: Some("late delivery".to_string()),
                occurred_at: Utc::now(),
            }),
        ];
        for command in commands {
            let err = fx.inv.documents.dispatch_purchase(command, fx.user).unwrap_err();
            assert!(matches!(domain(err), DomainError::DocumentLocked { .. }));
        }
        assert_eq!(fx.inv.documents.purchase(id).unwrap().lines().len(), 1);
        assert_eq!(fx.qty(r), dec!(2));
    }

    #[test]
    fn edits_to_a_finished_sale_report_the_lock_first() {
        let fx = Fixture::new();
        let f = fx.register(ItemKind::FinishedGood, "Gloss white", dec!(10));
        fx.sale("SO-20", Some("INV-20"), vec![]).unwrap();
        let id = fx
            .sale("SO-21", Some("INV-21"), vec![NewLine::new(f, dec!(3), dec!(20))])
            .unwrap();
        fx.move_sale(id, DocumentStatus::Ongoing).unwrap();
        fx.move_sale(id, DocumentStatus::Finished).unwrap();

        let missing = ItemRef::finished(ItemId::new());
        let commands = [
            SaleCommand::AddLine(paintstock_sales::AddLine {
                sale_id: id,
                line: NewLine::new(missing, dec!(1), dec!(1)),
                occurred_at: Utc::now(),
            }),
            SaleCommand::AddLine(paintstock_sales::AddLine {
                sale_id: id,
                line: NewLine::new(f, dec!(1.123456), dec!(1)),
                occurred_at: Utc::now(),
            }),
            SaleCommand::UpdateLine(paintstock_sales::UpdateLine {
                sale_id: id,
                line_no: 1,
                line: NewLine::new(missing, dec!(1), dec!(1)),
                occurred_at: Utc::now(),
            }),
            SaleCommand::RemoveLine(paintstock_sales::RemoveLine {
                sale_id: id,
                line_no: 1,
                occurred_at: Utc::now(),
            }),
            SaleCommand::UpdateDetails(UpdateDetails {
                sale_id: id,
                customer: "Dockside Paints".to_string(),
                invoice_number: Some("INV-20".to_string()),
                notes: None,
                occurred_at: Utc::now(),
            }),
        ];
        for command in commands {
            let err = fx.inv.documents.dispatch_sale(command, fx.user).unwrap_err();
            assert!(matches!(domain(err), DomainError::DocumentLocked { .. }));
        }
        let sale = fx.inv.documents.sale(id).unwrap();
        assert_eq!(sale.invoice_number(), Some("INV-21"));
        assert_eq!(sale.lines().len(), 1);
        assert_eq!(fx.qty(f), dec!(7));
    }

    #[test]
    fn editing_an_unknown_document_is_not_found() {
        let fx = Fixture::new();
        let f = fx.register(ItemKind::FinishedGood, "Gloss white", dec!(1));
        let id = DocumentId::new();
        let err = fx
            .inv
            .documents
            .dispatch_sale(
                SaleCommand::AddLine(paintstock_sales::AddLine {
                    sale_id: id,
                    line: NewLine::new(f, dec!(1), dec!(1)),
                    occurred_at: Utc::now(),
                }),
                fx.user,
            )
            .unwrap_err();
        assert_eq!(domain(err), DomainError::not_found("sale", id));
    }

    #[test]
    fn one_short_item_aborts_the_whole_sale() {
        let fx = Fixture::new();
        let f = fx.register(ItemKind::FinishedGood, "Gloss white", dec!(10));
        let g = fx.register(ItemKind::FinishedGood, "Matte grey", dec!(1));
        let id = fx
            .sale(
                "SO-30",
                None,
                vec![NewLine::new(f, dec!(3), dec!(20)), NewLine::new(g, dec!(4), dec!(18))],
            )
            .unwrap();
        fx.move_sale(id, DocumentStatus::Ongoing).unwrap();

        let err = fx.move_sale(id, DocumentStatus::Finished).unwrap_err();

        assert_eq!(
            domain(err),
            DomainError::insufficient_stock("Matte grey", dec!(1), dec!(4))
        );
        assert_eq!((fx.qty(f), fx.qty(g)), (dec!(10), dec!(1)));
        assert_eq!(fx.inv.documents.sale(id).unwrap().status(), DocumentStatus::Ongoing);
        assert!(
            fx.inv
                .stock
                .movements_for_document(DocumentRef::Sale(id))
                .unwrap()
                .is_empty()
        );
        fx.assert_balanced();
    }

    #[test]
    fn production_requests_and_records_travel_as_json() {
        let fx = Fixture::new();
        let r = fx.register(ItemKind::RawMaterial, "Titanium dioxide", dec!(50));
        let id = ItemId::new();
        let body = serde_json::json!({
            "item_id": id,
            "kind": "semi_finished_good",
            "name": "White base",
            "prices": { "purchase": null, "selling": "12.50" },
            "declared_quantity": "5",
            "source": { "kind": "raw_materials", "lines": [{ "item_id": r.id, "quantity": "20" }] },
            "user_id": fx.user,
            "occurred_at": Utc::now(),
        });

        let request: ProduceGood = serde_json::from_value(body).unwrap();
        let record = fx.inv.production.create(request).unwrap();
        assert_eq!(fx.qty(r), dec!(30));

        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["kind"], "semi_finished_good");
        assert_eq!(json["declared_quantity"], "5");
        assert_eq!(json["details"][0]["quantity"], "20");
        let back: paintstock_inventory::ProductionRecord = serde_json::from_value(json).unwrap();
        assert_eq!(back, record);
    }

    #[test]
    fn sale_lines_for_one_item_are_summed_before_checking_stock() {
        let fx = Fixture::new();
        let f = fx.register(ItemKind::FinishedGood, "Gloss white", dec!(5));
        let id = fx
            .sale(
                "SO-1",
                None,
                vec![
                    NewLine::new(f, dec!(3), dec!(20)),
                    NewLine::new(f, dec!(4), dec!(20)),
                ],
            )
            .unwrap();
        fx.move_sale(id, DocumentStatus::Ongoing).unwrap();

        let err = fx.move_sale(id, DocumentStatus::Finished).unwrap_err();

        assert_eq!(
            domain(err),
            DomainError::insufficient_stock("Gloss white", dec!(5), dec!(7))
        );
        assert_eq!(fx.qty(f), dec!(5));
        assert_eq!(fx.inv.documents.sale(id).unwrap().status(), DocumentStatus::Ongoing);
        assert!(
            fx.inv
                .stock
                .movements_for_document(DocumentRef::Sale(id))
                .unwrap()
                .is_empty()
        );
    }

    #[test]
    fn finishing_a_sale_issues_stock_and_returns_come_back() {
        let fx = Fixture::new();
        let f = fx.register(ItemKind::FinishedGood, "Gloss white", dec!(10));
        let a = fx.register(ItemKind::Accessory, "Brush", dec!(4));
        let id = fx
            .sale(
                "SO-2",
                Some("INV-2"),
                vec![NewLine::new(f, dec!(6), dec!(20)), NewLine::new(a, dec!(2), dec!(3))],
            )
            .unwrap();
        fx.move_sale(id, DocumentStatus::Ongoing).unwrap();
        fx.move_sale(id, DocumentStatus::Finished).unwrap();
        assert_eq!((fx.qty(f), fx.qty(a)), (dec!(4), dec!(2)));

        let sale = fx
            .inv
            .documents
            .record_sale_return(id, 1, dec!(2), fx.user, Utc::now())
            .unwrap();
        assert_eq!(sale.returned_quantity(1).value(), dec!(2));
        assert_eq!(fx.qty(f), dec!(6));

        let err = fx
            .inv
            .documents
            .record_sale_return(id, 1, dec!(5), fx.user, Utc::now())
            .unwrap_err();
        assert!(matches!(domain(err), DomainError::Validation(_)));
        assert_eq!(fx.qty(f), dec!(6));

        let net = fx.inv.stock.net_for_document(DocumentRef::Sale(id)).unwrap();
        assert_eq!(net.get(&f), Some(&dec!(-4)));
        assert_eq!(net.get(&a), Some(&dec!(-2)));
        fx.assert_balanced();
    }

    #[test]
    fn document_numbers_are_unique() {
        let fx = Fixture::new();
        let f = fx.register(ItemKind::FinishedGood, "Gloss white", dec!(10));
        fx.purchase("PO-9", vec![]);
        let err = fx
            .inv
            .documents
            .create_purchase(CreatePurchase {
                purchase_id: DocumentId::new(),
                number: " PO-9 ".to_string(),
                supplier_id: SupplierId::new(),
                notes: None,
                lines: vec![],
                created_by: fx.user,
                occurred_at: Utc::now(),
            })
            .unwrap_err();
        assert!(matches!(domain(err), DomainError::DuplicateReference(_)));

        fx.sale("SO-9", Some("INV-9"), vec![NewLine::new(f, dec!(1), dec!(1))])
            .unwrap();
        let err = fx.sale("SO-10", Some("INV-9"), vec![]).unwrap_err();
        assert!(matches!(domain(err), DomainError::DuplicateReference(_)));

        let other = fx.sale("SO-11", None, vec![]).unwrap();
        let err = fx
            .inv
            .documents
            .dispatch_sale(
                SaleCommand::UpdateDetails(UpdateDetails {
                    sale_id: other,
                    customer: "Dockside Paints".to_string(),
                    invoice_number: Some("INV-9".to_string()),
                    notes: None,
                    occurred_at: Utc::now(),
                }),
                fx.user,
            )
            .unwrap_err();
        assert!(matches!(domain(err), DomainError::DuplicateReference(_)));
    }

    #[test]
    fn document_lines_must_reference_existing_items() {
        let fx = Fixture::new();
        let missing = ItemRef::accessory(ItemId::new());
        let err = fx
            .sale("SO-12", None, vec![NewLine::new(missing, dec!(1), dec!(1))])
            .unwrap_err();
        assert_eq!(domain(err), DomainError::not_found("accessory", missing.id));
    }

    #[test]
    fn manual_adjustments_are_ledgered_and_cannot_go_negative() {
        let fx = Fixture::new();
        let a = fx.register(ItemKind::Accessory, "Lid", dec!(3));

        let movement = fx
            .inv
            .stock
            .adjust_stock(a, dec!(-2), "stock take", fx.user, Utc::now())
            .unwrap();
        assert_eq!(movement.direction, Direction::Out);
        assert_eq!(movement.note.as_deref(), Some("stock take"));

        let err = fx
            .inv
            .stock
            .adjust_stock(a, dec!(-2), "stock take", fx.user, Utc::now())
            .unwrap_err();
        assert!(matches!(domain(err), DomainError::InsufficientStock { .. }));
        assert_eq!(fx.qty(a), dec!(1));

        let totals = fx.inv.stock.totals_by_type().unwrap();
        assert_eq!(totals.get(&MovementType::Adjustment), Some(&dec!(1)));
        fx.assert_balanced();
    }

    #[test]
    fn produced_goods_cannot_have_a_supplier() {
        let fx = Fixture::new();
        let err = fx
            .inv
            .stock
            .register_item(RegisterItem {
                item: ItemRef::finished(ItemId::new()),
                name: "Gloss white".to_string(),
                supplier_id: Some(SupplierId::new()),
                prices: UnitPrices::default(),
                opening_quantity: None,
                user_id: fx.user,
                occurred_at: Utc::now(),
            })
            .unwrap_err();
        assert!(matches!(domain(err), DomainError::Validation(_)));
    }

    #[derive(Debug, Clone)]
    enum Op {
        Adjust(usize, i64),
        Produce(usize, i64),
        Sell(usize, i64),
    }

    fn op() -> impl Strategy<Value = Op> {
        prop_oneof![
            (0usize..3, -50i64..50).prop_map(|(i, d)| Op::Adjust(i, d)),
            (0usize..3, 1i64..40).prop_map(|(i, q)| Op::Produce(i, q)),
            (0usize..3, 1i64..20).prop_map(|(i, q)| Op::Sell(i, q)),
        ]
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 48,
            ..ProptestConfig::default()
        })]

        /// Property: whatever sequence of operations succeeds or fails, no
        /// quantity goes negative and the ledger explains every quantity.
        #[test]
        fn quantities_stay_non_negative_and_balanced(ops in prop::collection::vec(op(), 1..25)) {
            let fx = Fixture::new();
            let raws: Vec<ItemRef> = (0..3)
                .map(|i| fx.register(ItemKind::RawMaterial, &format!("Raw {i}"), dec!(30)))
                .collect();
            let mut produced: Vec<ItemRef> = Vec::new();

            for (n, op) in ops.into_iter().enumerate() {
                match op {
                    Op::Adjust(i, d) if d != 0 => {
                        let _ = fx.inv.stock.adjust_stock(raws[i], Decimal::from(d), "test", fx.user, Utc::now());
                    }
                    Op::Adjust(..) => {}
                    Op::Produce(i, q) => {
                        if let Ok(f) = fx.produce(ProducedKind::FinishedGood, "F", dec!(5), raw(raws[i], Decimal::from(q))) {
                            produced.push(f);
                        }
                    }
                    Op::Sell(i, q) => {
                        let Some(f) = produced.get(i % produced.len().max(1)).copied() else { continue };
                        if let Ok(id) = fx.sale(&format!("SO-{n}"), None, vec![NewLine::new(f, Decimal::from(q), dec!(1))]) {
                            let _ = fx.move_sale(id, DocumentStatus::Ongoing);
                            let _ = fx.move_sale(id, DocumentStatus::Finished);
                        }
                    }
                }
            }

            for item in raws.iter().chain(produced.iter()) {
                prop_assert!(fx.qty(*item) >= Decimal::ZERO);
            }
            prop_assert_eq!(fx.inv.stock.reconcile().unwrap(), vec![]);
        }
    }
}
