//! End-to-end tests for the transaction engine and session reconciler,
//! against an in-memory SQLite database.

use chrono::Utc;

use bodega_core::alerts::StockAlertKind;
use bodega_core::{
    AdjustmentItem, AdjustmentReason, Batch, Customer, PaymentMethod, Product, PurchaseItem,
    PurchasePaymentMethod, SaleItem, SalePayment, SellingMethod, Supplier, SupplierReturnItem,
    Unit,
};
use bodega_db::{repository, Database, DbConfig};
use bodega_engine::{
    AdjustmentDraft, EngineError, PurchaseDraft, SaleDraft, SessionReconciler, SupplierReturnDraft,
    TransactionEngine,
};
use bodega_sync::{ChangeBus, SyncMessage, Table};

// =============================================================================
// Fixture
// =============================================================================

struct Fixture {
    db: Database,
    bus: ChangeBus,
    engine: TransactionEngine,
    sessions: SessionReconciler,
}

impl Fixture {
    /// In-memory store, tax zeroed, with the walk-in customer, a
    /// balance-tracking customer and a supplier seeded.
    async fn new() -> Self {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let bus = ChangeBus::new();
        let engine = TransactionEngine::new(db.clone(), bus.clone());
        let sessions = SessionReconciler::new(db.clone(), bus.clone());

        let mut conn = db.acquire().await.unwrap();
        repository::settings::put(
            &mut conn,
            repository::settings::KEY_TAX_RATE_BPS,
            &serde_json::json!(0),
        )
        .await
        .unwrap();

        let now = Utc::now();
        repository::party::insert_customer(
            &mut conn,
            &Customer {
                id: "walkin".to_string(),
                name: "Walk-in".to_string(),
                phone: None,
                email: None,
                address: None,
                balance_cents: 0,
                tracks_balance: false,
                version: 0,
                created_at: now,
            },
        )
        .await
        .unwrap();
        repository::party::insert_customer(
            &mut conn,
            &Customer {
                id: "ahmed".to_string(),
                name: "Ahmed Mahmoud".to_string(),
                phone: Some("01001234567".to_string()),
                email: None,
                address: None,
                balance_cents: 0,
                tracks_balance: true,
                version: 0,
                created_at: now,
            },
        )
        .await
        .unwrap();
        repository::party::insert_supplier(
            &mut conn,
            &Supplier {
                id: "beans".to_string(),
                name: "Karim".to_string(),
                company: "Beans Co".to_string(),
                phone: None,
                email: None,
                balance_cents: 0,
                version: 0,
                created_at: now,
            },
        )
        .await
        .unwrap();
        drop(conn);

        Fixture { db, bus, engine, sessions }
    }

    /// Inserts a product with a single base unit priced `price_cents` and
    /// the given `(quantity, expiry, source)` batches.
    async fn add_product(
        &self,
        id: &str,
        price_cents: i64,
        cost_cents: i64,
        batches: &[(i64, Option<&str>, Option<&str>)],
    ) {
        let now = Utc::now();
        let batches: Vec<Batch> = batches
            .iter()
            .enumerate()
            .map(|(i, (quantity, expiry, source))| Batch {
                id: format!("{id}-b{i}"),
                quantity: *quantity,
                expiry_date: expiry.map(|d| d.parse().unwrap()),
                source_id: source.map(str::to_string),
            })
            .collect();
        let stock = batches.iter().map(|b| b.quantity).sum();

        let product = Product {
            id: id.to_string(),
            name: id.to_string(),
            sku: format!("sku-{id}"),
            category_id: None,
            description: None,
            units: vec![Unit {
                id: format!("{id}-base"),
                name: "Piece".to_string(),
                price_cents,
                cost_price_cents: cost_cents,
                factor: 1,
            }],
            batches,
            stock,
            selling_method: SellingMethod::Unit,
            version: 0,
            created_at: now,
            updated_at: now,
        };

        let mut conn = self.db.acquire().await.unwrap();
        repository::product::insert(&mut conn, &product).await.unwrap();
    }

    async fn product(&self, id: &str) -> Product {
        let mut conn = self.db.acquire().await.unwrap();
        repository::product::get(&mut conn, id).await.unwrap()
    }

    async fn customer_balance(&self, id: &str) -> i64 {
        let mut conn = self.db.acquire().await.unwrap();
        repository::party::get_customer(&mut conn, id).await.unwrap().balance_cents
    }

    async fn supplier_balance(&self, id: &str) -> i64 {
        let mut conn = self.db.acquire().await.unwrap();
        repository::party::get_supplier(&mut conn, id).await.unwrap().balance_cents
    }

    /// The seeded product's base-unit line.
    async fn line(&self, product_id: &str, quantity: i64) -> SaleItem {
        let product = self.product(product_id).await;
        SaleItem {
            product_id: product.id.clone(),
            product_name: product.name.clone(),
            unit: product.units[0].clone(),
            quantity,
        }
    }
}

fn cash(amount_cents: i64) -> SalePayment {
    SalePayment { method: PaymentMethod::Cash, amount_cents }
}

fn deferred(amount_cents: i64) -> SalePayment {
    SalePayment { method: PaymentMethod::Deferred, amount_cents }
}

fn purchase_item(product_id: &str, quantity: i64, cost: i64, expiry: Option<&str>) -> PurchaseItem {
    PurchaseItem {
        product_id: product_id.to_string(),
        product_name: product_id.to_string(),
        quantity,
        cost_price_cents: cost,
        unit_name: "Piece".to_string(),
        unit_factor: 1,
        expiry_date: expiry.map(|d| d.parse().unwrap()),
    }
}

// =============================================================================
// Sales
// =============================================================================

#[tokio::test]
async fn sale_consumes_fefo_and_keeps_invariant() {
    let fx = Fixture::new().await;
    // Dated batch first out, even though it was appended second.
    fx.add_product("espresso", 1200, 700, &[(10, None, None), (5, Some("2024-01-01"), None)])
        .await;

    let draft = SaleDraft {
        items: vec![fx.line("espresso", 7).await],
        payments: vec![cash(8400)],
        discount_cents: 0,
        customer_id: "walkin".to_string(),
    };
    let sale = fx.engine.complete_sale(draft).await.unwrap();

    assert_eq!(sale.subtotal_cents, 8400);
    assert_eq!(sale.total_cents, 8400);
    assert_eq!(sale.total_cost_cents, 4900);

    let product = fx.product("espresso").await;
    assert_eq!(product.stock, 8);
    assert_eq!(product.batches.len(), 1);
    assert!(product.batches[0].expiry_date.is_none());
    assert_eq!(product.stock, product.batch_total());
}

#[tokio::test]
async fn sale_with_insufficient_second_item_mutates_nothing() {
    let fx = Fixture::new().await;
    fx.add_product("espresso", 1200, 700, &[(10, None, None)]).await;
    fx.add_product("croissant", 800, 450, &[(2, None, None)]).await;

    let draft = SaleDraft {
        items: vec![fx.line("espresso", 3).await, fx.line("croissant", 5).await],
        payments: vec![cash(7600)],
        discount_cents: 0,
        customer_id: "walkin".to_string(),
    };
    let err = fx.engine.complete_sale(draft).await.unwrap_err();

    match err {
        EngineError::InsufficientStock { product, requested, available } => {
            assert_eq!(product, "croissant");
            assert_eq!(requested, 5);
            assert_eq!(available, 2);
        }
        other => panic!("unexpected error: {other}"),
    }

    // Zero stock change for the first item too, and no sale record.
    assert_eq!(fx.product("espresso").await.stock, 10);
    assert_eq!(fx.product("croissant").await.stock, 2);
    assert!(fx.engine.list_sales().await.unwrap().is_empty());
}

#[tokio::test]
async fn selling_exact_stock_succeeds_and_one_more_fails() {
    let fx = Fixture::new().await;
    fx.add_product("espresso", 1200, 700, &[(4, None, None), (4, None, None)]).await;

    let over = SaleDraft {
        items: vec![fx.line("espresso", 9).await],
        payments: vec![cash(10800)],
        discount_cents: 0,
        customer_id: "walkin".to_string(),
    };
    match fx.engine.complete_sale(over).await.unwrap_err() {
        EngineError::InsufficientStock { requested, available, .. } => {
            assert_eq!(requested, 9);
            assert_eq!(available, 8);
        }
        other => panic!("unexpected error: {other}"),
    }

    let exact = SaleDraft {
        items: vec![fx.line("espresso", 8).await],
        payments: vec![cash(9600)],
        discount_cents: 0,
        customer_id: "walkin".to_string(),
    };
    fx.engine.complete_sale(exact).await.unwrap();

    let product = fx.product("espresso").await;
    assert_eq!(product.stock, 0);
    assert!(product.batches.is_empty());
}

#[tokio::test]
async fn multi_unit_lines_validate_against_the_aggregate() {
    let fx = Fixture::new().await;
    fx.add_product("croissant", 800, 450, &[(14, None, None)]).await;

    // One box of 6 plus 3 singles on the same product: 15 base units, one
    // short of nothing — 14 available, so it fails as an aggregate.
    let product = fx.product("croissant").await;
    let box_unit = Unit {
        id: "croissant-box".to_string(),
        name: "Box of 6".to_string(),
        price_cents: 4500,
        cost_price_cents: 2500,
        factor: 6,
    };
    let draft = SaleDraft {
        items: vec![
            SaleItem {
                product_id: product.id.clone(),
                product_name: product.name.clone(),
                unit: box_unit,
                quantity: 2,
            },
            fx.line("croissant", 3).await,
        ],
        payments: vec![cash(11400)],
        discount_cents: 0,
        customer_id: "walkin".to_string(),
    };

    match fx.engine.complete_sale(draft).await.unwrap_err() {
        EngineError::InsufficientStock { requested, available, .. } => {
            assert_eq!(requested, 15);
            assert_eq!(available, 14);
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn sale_totals_apply_discount_then_tax() {
    let fx = Fixture::new().await;
    fx.add_product("espresso", 1200, 700, &[(10, None, None)]).await;

    let mut conn = fx.db.acquire().await.unwrap();
    repository::settings::put(
        &mut conn,
        repository::settings::KEY_TAX_RATE_BPS,
        &serde_json::json!(1400),
    )
    .await
    .unwrap();
    drop(conn);

    let draft = SaleDraft {
        items: vec![fx.line("espresso", 5).await], // 60.00
        payments: vec![cash(6156)],
        discount_cents: 600, // 6.00 off → 54.00 taxable
        customer_id: "walkin".to_string(),
    };
    let sale = fx.engine.complete_sale(draft).await.unwrap();

    assert_eq!(sale.subtotal_cents, 6000);
    assert_eq!(sale.discount_cents, 600);
    assert_eq!(sale.tax_cents, 756); // 14% of 54.00
    assert_eq!(sale.total_cents, 6156);
    assert_eq!(sale.tax_rate_bps, 1400);
}

#[tokio::test]
async fn deferred_sale_debits_then_edit_credits_the_customer() {
    let fx = Fixture::new().await;
    fx.add_product("sandwich", 1000, 600, &[(20, None, None)]).await;

    // Sale of 80.00 fully deferred.
    let draft = SaleDraft {
        items: vec![fx.line("sandwich", 8).await],
        payments: vec![deferred(8000)],
        discount_cents: 0,
        customer_id: "ahmed".to_string(),
    };
    let sale = fx.engine.complete_sale(draft).await.unwrap();
    assert_eq!(sale.total_cents, 8000);
    assert_eq!(fx.customer_balance("ahmed").await, 8000);
    assert_eq!(fx.product("sandwich").await.stock, 12);

    // Edit down to 60.00: the 20.00 difference is credited back.
    let mut edited = sale.items.clone();
    edited[0].quantity = 6;
    let updated = fx.engine.edit_sale(&sale.id, edited).await.unwrap();

    assert_eq!(updated.total_cents, 6000);
    assert_eq!(fx.customer_balance("ahmed").await, 6000);

    // The two returned units come back as a fresh batch.
    let product = fx.product("sandwich").await;
    assert_eq!(product.stock, 14);
    assert_eq!(product.batches.len(), 2);
    assert!(product.batches[1].source_id.is_none());
}

#[tokio::test]
async fn deferred_sale_to_walkin_skips_the_balance() {
    let fx = Fixture::new().await;
    fx.add_product("espresso", 1200, 700, &[(10, None, None)]).await;

    let draft = SaleDraft {
        items: vec![fx.line("espresso", 2).await],
        payments: vec![deferred(2400)],
        discount_cents: 0,
        customer_id: "walkin".to_string(),
    };
    fx.engine.complete_sale(draft).await.unwrap();

    assert_eq!(fx.customer_balance("walkin").await, 0);
}

#[tokio::test]
async fn sale_edit_that_grows_a_line_validates_stock() {
    let fx = Fixture::new().await;
    fx.add_product("espresso", 1200, 700, &[(10, None, None)]).await;

    let draft = SaleDraft {
        items: vec![fx.line("espresso", 8).await],
        payments: vec![cash(9600)],
        discount_cents: 0,
        customer_id: "walkin".to_string(),
    };
    let sale = fx.engine.complete_sale(draft).await.unwrap();
    assert_eq!(fx.product("espresso").await.stock, 2);

    // Growing 8 → 11 needs 3 more, only 2 remain.
    let mut edited = sale.items.clone();
    edited[0].quantity = 11;
    match fx.engine.edit_sale(&sale.id, edited).await.unwrap_err() {
        EngineError::InsufficientStock { requested, available, .. } => {
            assert_eq!(requested, 3);
            assert_eq!(available, 2);
        }
        other => panic!("unexpected error: {other}"),
    }

    // Nothing moved.
    assert_eq!(fx.product("espresso").await.stock, 2);
    let reloaded = fx.engine.list_sales().await.unwrap();
    assert_eq!(reloaded[0].total_cents, 9600);
}

#[tokio::test]
async fn editing_a_missing_sale_is_not_found() {
    let fx = Fixture::new().await;
    fx.add_product("espresso", 1200, 700, &[(10, None, None)]).await;

    let err = fx
        .engine
        .edit_sale("ghost", vec![fx.line("espresso", 1).await])
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::NotFound { .. }));
}

// =============================================================================
// Purchases
// =============================================================================

#[tokio::test]
async fn purchase_then_delete_round_trips_stock_and_balance() {
    let fx = Fixture::new().await;
    fx.add_product("espresso", 1200, 700, &[(5, None, None)]).await;

    let purchase = fx
        .engine
        .record_purchase(PurchaseDraft {
            supplier_id: "beans".to_string(),
            items: vec![purchase_item("espresso", 10, 500, Some("2026-06-01"))],
            total_cents: 5000,
            amount_paid_cents: 3000,
            payment_method: PurchasePaymentMethod::Deferred,
            reference: None,
            notes: None,
        })
        .await
        .unwrap();

    let product = fx.product("espresso").await;
    assert_eq!(product.stock, 15);
    assert_eq!(product.batches.len(), 2);
    assert_eq!(product.batches[1].source_id.as_deref(), Some(purchase.id.as_str()));
    assert_eq!(fx.supplier_balance("beans").await, 2000);

    fx.engine.delete_purchase(&purchase.id).await.unwrap();

    let product = fx.product("espresso").await;
    assert_eq!(product.stock, 5);
    assert_eq!(product.batches.len(), 1);
    assert_eq!(fx.supplier_balance("beans").await, 0);
    assert!(fx.engine.list_purchases().await.unwrap().is_empty());
}

#[tokio::test]
async fn deleting_a_partially_consumed_purchase_cannot_go_negative() {
    let fx = Fixture::new().await;
    fx.add_product("espresso", 1200, 700, &[(5, None, None)]).await;

    let purchase = fx
        .engine
        .record_purchase(PurchaseDraft {
            supplier_id: "beans".to_string(),
            items: vec![purchase_item("espresso", 10, 500, None)],
            total_cents: 5000,
            amount_paid_cents: 5000,
            payment_method: PurchasePaymentMethod::Cash,
            reference: None,
            notes: None,
        })
        .await
        .unwrap();

    // Sell 12: drains the original 5 and 7 of the purchase lot.
    let draft = SaleDraft {
        items: vec![fx.line("espresso", 12).await],
        payments: vec![cash(14400)],
        discount_cents: 0,
        customer_id: "walkin".to_string(),
    };
    fx.engine.complete_sale(draft).await.unwrap();
    assert_eq!(fx.product("espresso").await.stock, 3);

    fx.engine.delete_purchase(&purchase.id).await.unwrap();

    // Only the surviving 3 units of the lot are removed.
    let product = fx.product("espresso").await;
    assert_eq!(product.stock, 0);
    assert!(product.batches.is_empty());
    assert_eq!(product.stock, product.batch_total());
}

#[tokio::test]
async fn purchase_for_missing_supplier_is_not_found() {
    let fx = Fixture::new().await;
    fx.add_product("espresso", 1200, 700, &[(5, None, None)]).await;

    let err = fx
        .engine
        .record_purchase(PurchaseDraft {
            supplier_id: "ghost".to_string(),
            items: vec![purchase_item("espresso", 1, 500, None)],
            total_cents: 500,
            amount_paid_cents: 500,
            payment_method: PurchasePaymentMethod::Cash,
            reference: None,
            notes: None,
        })
        .await
        .unwrap_err();

    assert!(matches!(err, EngineError::NotFound { .. }));
    assert_eq!(fx.product("espresso").await.stock, 5);
}

// =============================================================================
// Adjustments
// =============================================================================

#[tokio::test]
async fn negative_adjustment_consumes_lifo() {
    let fx = Fixture::new().await;
    fx.add_product("espresso", 1200, 700, &[(4, None, None), (6, None, None)]).await;

    fx.engine
        .record_adjustment(AdjustmentDraft {
            items: vec![AdjustmentItem {
                product_id: "espresso".to_string(),
                product_name: "espresso".to_string(),
                quantity_change: -7,
                unit_name: "Piece".to_string(),
                unit_factor: 1,
            }],
            reason: AdjustmentReason::Damaged,
            notes: None,
        })
        .await
        .unwrap();

    // Newest batch drained first, one unit off the older one.
    let product = fx.product("espresso").await;
    assert_eq!(product.stock, 3);
    assert_eq!(product.batches.len(), 1);
    assert_eq!(product.batches[0].id, "espresso-b0");
    assert_eq!(product.batches[0].quantity, 3);
}

#[tokio::test]
async fn positive_adjustment_appends_a_batch() {
    let fx = Fixture::new().await;
    fx.add_product("espresso", 1200, 700, &[(4, None, None)]).await;

    fx.engine
        .record_adjustment(AdjustmentDraft {
            items: vec![AdjustmentItem {
                product_id: "espresso".to_string(),
                product_name: "espresso".to_string(),
                quantity_change: 6,
                unit_name: "Piece".to_string(),
                unit_factor: 1,
            }],
            reason: AdjustmentReason::InventoryCorrection,
            notes: Some("found a tray in the back".to_string()),
        })
        .await
        .unwrap();

    let product = fx.product("espresso").await;
    assert_eq!(product.stock, 10);
    assert_eq!(product.batches.len(), 2);
    assert_eq!(fx.engine.list_adjustments().await.unwrap().len(), 1);
}

#[tokio::test]
async fn over_removing_adjustment_fails_whole() {
    let fx = Fixture::new().await;
    fx.add_product("espresso", 1200, 700, &[(4, None, None)]).await;
    fx.add_product("croissant", 800, 450, &[(9, None, None)]).await;

    let err = fx
        .engine
        .record_adjustment(AdjustmentDraft {
            items: vec![
                AdjustmentItem {
                    product_id: "croissant".to_string(),
                    product_name: "croissant".to_string(),
                    quantity_change: -2,
                    unit_name: "Piece".to_string(),
                    unit_factor: 1,
                },
                AdjustmentItem {
                    product_id: "espresso".to_string(),
                    product_name: "espresso".to_string(),
                    quantity_change: -5,
                    unit_name: "Piece".to_string(),
                    unit_factor: 1,
                },
            ],
            reason: AdjustmentReason::Waste,
            notes: None,
        })
        .await
        .unwrap_err();

    assert!(matches!(err, EngineError::InsufficientStock { .. }));
    // The croissant line rolled back with the failing espresso line.
    assert_eq!(fx.product("croissant").await.stock, 9);
    assert_eq!(fx.product("espresso").await.stock, 4);
    assert!(fx.engine.list_adjustments().await.unwrap().is_empty());
}

// =============================================================================
// Supplier Returns
// =============================================================================

#[tokio::test]
async fn supplier_return_consumes_lifo_and_credits_the_supplier() {
    let fx = Fixture::new().await;
    fx.add_product("espresso", 1200, 700, &[(4, None, None), (6, None, None)]).await;

    // Store owes 50.00 from an earlier purchase.
    let mut conn = fx.db.acquire().await.unwrap();
    repository::party::adjust_supplier_balance(&mut conn, "beans", 5000).await.unwrap();
    drop(conn);

    let sreturn = fx
        .engine
        .record_supplier_return(SupplierReturnDraft {
            supplier_id: "beans".to_string(),
            items: vec![SupplierReturnItem {
                product_id: "espresso".to_string(),
                product_name: "espresso".to_string(),
                quantity: 7,
                cost_price_cents: 500,
                unit_name: "Piece".to_string(),
                unit_factor: 1,
            }],
            total_cents: 3500,
            purchase_id: None,
            notes: None,
        })
        .await
        .unwrap();

    let product = fx.product("espresso").await;
    assert_eq!(product.stock, 3);
    assert_eq!(product.batches.len(), 1);
    assert_eq!(product.batches[0].id, "espresso-b0");
    assert_eq!(fx.supplier_balance("beans").await, 1500);

    // Reversal: quantity comes back as a fresh batch, balance restored.
    fx.engine.delete_supplier_return(&sreturn.id).await.unwrap();

    let product = fx.product("espresso").await;
    assert_eq!(product.stock, 10);
    assert_eq!(product.batches.len(), 2);
    assert!(product.batches[1].expiry_date.is_none());
    assert_eq!(fx.supplier_balance("beans").await, 5000);
}

#[tokio::test]
async fn supplier_return_beyond_stock_fails() {
    let fx = Fixture::new().await;
    fx.add_product("espresso", 1200, 700, &[(4, None, None)]).await;

    let err = fx
        .engine
        .record_supplier_return(SupplierReturnDraft {
            supplier_id: "beans".to_string(),
            items: vec![SupplierReturnItem {
                product_id: "espresso".to_string(),
                product_name: "espresso".to_string(),
                quantity: 5,
                cost_price_cents: 500,
                unit_name: "Piece".to_string(),
                unit_factor: 1,
            }],
            total_cents: 2500,
            purchase_id: None,
            notes: None,
        })
        .await
        .unwrap_err();

    assert!(matches!(err, EngineError::InsufficientStock { .. }));
    assert_eq!(fx.product("espresso").await.stock, 4);
    assert_eq!(fx.supplier_balance("beans").await, 0);
}

// =============================================================================
// Settlement Payments
// =============================================================================

#[tokio::test]
async fn customer_payment_settles_the_balance() {
    let fx = Fixture::new().await;
    fx.add_product("sandwich", 1000, 600, &[(20, None, None)]).await;

    let draft = SaleDraft {
        items: vec![fx.line("sandwich", 8).await],
        payments: vec![deferred(8000)],
        discount_cents: 0,
        customer_id: "ahmed".to_string(),
    };
    fx.engine.complete_sale(draft).await.unwrap();
    assert_eq!(fx.customer_balance("ahmed").await, 8000);

    fx.engine
        .record_customer_payment("ahmed", 3000, Some("partial settlement".to_string()))
        .await
        .unwrap();

    assert_eq!(fx.customer_balance("ahmed").await, 5000);
    assert_eq!(fx.engine.list_customer_payments("ahmed").await.unwrap().len(), 1);
}

#[tokio::test]
async fn walkin_customer_cannot_receive_balance_payments() {
    let fx = Fixture::new().await;

    let err = fx
        .engine
        .record_customer_payment("walkin", 1000, None)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::State(_)));
}

#[tokio::test]
async fn supplier_payment_reduces_what_the_store_owes() {
    let fx = Fixture::new().await;
    fx.add_product("espresso", 1200, 700, &[(5, None, None)]).await;

    fx.engine
        .record_purchase(PurchaseDraft {
            supplier_id: "beans".to_string(),
            items: vec![purchase_item("espresso", 10, 500, None)],
            total_cents: 5000,
            amount_paid_cents: 0,
            payment_method: PurchasePaymentMethod::Deferred,
            reference: None,
            notes: None,
        })
        .await
        .unwrap();
    assert_eq!(fx.supplier_balance("beans").await, 5000);

    fx.engine.record_supplier_payment("beans", 5000, None).await.unwrap();
    assert_eq!(fx.supplier_balance("beans").await, 0);
}

// =============================================================================
// Sessions
// =============================================================================

#[tokio::test]
async fn reconciliation_scenario() {
    let fx = Fixture::new().await;
    fx.add_product("salad", 5000, 3000, &[(10, None, None)]).await;

    // start(100.00); one cash sale of 50.00; one expense of 20.00;
    // end(125.00) ⇒ expected 130.00, difference −5.00.
    fx.sessions.start_session("user1", "admin", 10000).await.unwrap();

    let draft = SaleDraft {
        items: vec![fx.line("salad", 1).await],
        payments: vec![cash(5000)],
        discount_cents: 0,
        customer_id: "walkin".to_string(),
    };
    fx.engine.complete_sale(draft).await.unwrap();

    fx.sessions.add_expense(2000, "cleaning supplies").await.unwrap();

    let closed = fx.sessions.end_session(12500).await.unwrap();

    assert_eq!(closed.total_cash_cents, Some(5000));
    assert_eq!(closed.total_card_cents, Some(0));
    assert_eq!(closed.total_deferred_cents, Some(0));
    assert_eq!(closed.total_expenses_cents, Some(2000));
    assert_eq!(closed.expected_cash_cents, Some(13000));
    assert_eq!(closed.difference_cents, Some(-500));
    assert!(closed.end_time.is_some());

    assert!(fx.sessions.active_session().await.unwrap().is_none());
}

#[tokio::test]
async fn session_guards() {
    let fx = Fixture::new().await;

    // Ending with no active session is rejected and mutates nothing.
    let err = fx.sessions.end_session(1000).await.unwrap_err();
    assert!(matches!(err, EngineError::State(_)));
    assert!(fx.sessions.list_sessions().await.unwrap().is_empty());

    // Expenses need an active session.
    let err = fx.sessions.add_expense(500, "coffee run").await.unwrap_err();
    assert!(matches!(err, EngineError::State(_)));

    // Only one active session at a time.
    fx.sessions.start_session("user1", "admin", 0).await.unwrap();
    let err = fx.sessions.start_session("user2", "cashier", 0).await.unwrap_err();
    assert!(matches!(err, EngineError::State(_)));

    // Close, then the drawer can open again.
    fx.sessions.end_session(0).await.unwrap();
    fx.sessions.start_session("user2", "cashier", 0).await.unwrap();
}

#[tokio::test]
async fn session_splits_payment_methods() {
    let fx = Fixture::new().await;
    fx.add_product("sandwich", 1000, 600, &[(30, None, None)]).await;

    fx.sessions.start_session("user1", "admin", 0).await.unwrap();

    // Split tender: 30.00 cash + 20.00 card; plus a 10.00 deferred sale.
    let split = SaleDraft {
        items: vec![fx.line("sandwich", 5).await],
        payments: vec![
            cash(3000),
            SalePayment { method: PaymentMethod::Card, amount_cents: 2000 },
        ],
        discount_cents: 0,
        customer_id: "walkin".to_string(),
    };
    fx.engine.complete_sale(split).await.unwrap();

    let deferred_sale = SaleDraft {
        items: vec![fx.line("sandwich", 1).await],
        payments: vec![deferred(1000)],
        discount_cents: 0,
        customer_id: "ahmed".to_string(),
    };
    fx.engine.complete_sale(deferred_sale).await.unwrap();

    let closed = fx.sessions.end_session(3000).await.unwrap();
    assert_eq!(closed.total_cash_cents, Some(3000));
    assert_eq!(closed.total_card_cents, Some(2000));
    assert_eq!(closed.total_deferred_cents, Some(1000));
    assert_eq!(closed.expected_cash_cents, Some(3000));
    assert_eq!(closed.difference_cents, Some(0));
}

// =============================================================================
// Parked Sales
// =============================================================================

#[tokio::test]
async fn park_retrieve_discard() {
    let fx = Fixture::new().await;
    fx.add_product("espresso", 1200, 700, &[(10, None, None)]).await;

    let items = vec![fx.line("espresso", 3).await];
    let parked = fx
        .engine
        .park_sale(items, "walkin", Some("table 4".to_string()))
        .await
        .unwrap();
    assert_eq!(parked.total_cents, 3600);

    // Parking touches no stock.
    assert_eq!(fx.product("espresso").await.stock, 10);

    let retrieved = fx.engine.retrieve_parked_sale(&parked.id).await.unwrap();
    assert_eq!(retrieved.items[0].quantity, 3);
    assert!(fx.engine.list_parked_sales().await.unwrap().is_empty());

    // Retrieval is one-shot.
    let err = fx.engine.retrieve_parked_sale(&parked.id).await.unwrap_err();
    assert!(matches!(err, EngineError::NotFound { .. }));
}

// =============================================================================
// Alerts & Notifications
// =============================================================================

#[tokio::test]
async fn stock_alerts_use_configured_thresholds() {
    let fx = Fixture::new().await;
    fx.add_product("espresso", 1200, 700, &[(3, None, None)]).await;
    fx.add_product("sandwich", 1000, 600, &[(100, None, None)]).await;

    let alerts = fx.engine.scan_stock_alerts().await.unwrap();
    assert_eq!(alerts.len(), 1);
    assert_eq!(alerts[0].product_id, "espresso");
    assert!(matches!(alerts[0].kind, StockAlertKind::LowStock { remaining: 3 }));

    // Tighten the threshold below the stock level: no more alert.
    let mut conn = fx.db.acquire().await.unwrap();
    repository::settings::put(
        &mut conn,
        repository::settings::KEY_LOW_STOCK_THRESHOLD,
        &serde_json::json!(2),
    )
    .await
    .unwrap();
    drop(conn);

    assert!(fx.engine.scan_stock_alerts().await.unwrap().is_empty());
}

#[tokio::test]
async fn committed_sale_notifies_touched_tables() {
    let fx = Fixture::new().await;
    fx.add_product("espresso", 1200, 700, &[(10, None, None)]).await;

    let mut rx = fx.bus.subscribe();

    let draft = SaleDraft {
        items: vec![fx.line("espresso", 1).await],
        payments: vec![cash(1200)],
        discount_cents: 0,
        customer_id: "walkin".to_string(),
    };
    fx.engine.complete_sale(draft).await.unwrap();

    let mut tables = Vec::new();
    while let Ok(SyncMessage::DataChanged { table }) = rx.try_recv() {
        tables.push(table);
    }
    assert_eq!(tables, vec![Table::Products, Table::Sales]);
}

#[tokio::test]
async fn failed_sale_notifies_nothing() {
    let fx = Fixture::new().await;
    fx.add_product("espresso", 1200, 700, &[(1, None, None)]).await;

    let mut rx = fx.bus.subscribe();

    let draft = SaleDraft {
        items: vec![fx.line("espresso", 5).await],
        payments: vec![cash(6000)],
        discount_cents: 0,
        customer_id: "walkin".to_string(),
    };
    fx.engine.complete_sale(draft).await.unwrap_err();

    assert!(rx.try_recv().is_err());
}

// =============================================================================
// Validation
// =============================================================================

#[tokio::test]
async fn empty_and_malformed_drafts_are_rejected() {
    let fx = Fixture::new().await;
    fx.add_product("espresso", 1200, 700, &[(10, None, None)]).await;

    // Empty cart.
    let err = fx
        .engine
        .complete_sale(SaleDraft {
            items: vec![],
            payments: vec![cash(100)],
            discount_cents: 0,
            customer_id: "walkin".to_string(),
        })
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Validation(_)));

    // Zero-amount payment.
    let err = fx
        .engine
        .complete_sale(SaleDraft {
            items: vec![fx.line("espresso", 1).await],
            payments: vec![cash(0)],
            discount_cents: 0,
            customer_id: "walkin".to_string(),
        })
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Validation(_)));

    // Discount above the subtotal.
    let err = fx
        .engine
        .complete_sale(SaleDraft {
            items: vec![fx.line("espresso", 1).await],
            payments: vec![cash(1200)],
            discount_cents: 1300,
            customer_id: "walkin".to_string(),
        })
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Validation(_)));

    // Unknown customer.
    let err = fx
        .engine
        .complete_sale(SaleDraft {
            items: vec![fx.line("espresso", 1).await],
            payments: vec![cash(1200)],
            discount_cents: 0,
            customer_id: "ghost".to_string(),
        })
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::NotFound { .. }));
}
