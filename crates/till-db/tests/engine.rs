//! End-to-end sale engine tests against real SQLite databases.

use std::path::PathBuf;

use serde_json::json;
use till_core::{
    AddOnRequest, Caller, CoreError, EditItemRequest, EditSaleRequest, SaleDetail, SaleFilter, SaleItemRequest,
    SaleRequest, StockLevel,
};
use till_db::{Database, DbConfig, EngineError, NewProduct};

/// A small catalog: a tracked burger with an eligible topping and an
/// ineligible one, plus an untracked variable-price buffet.
struct Fixture {
    db: Database,
    cash: i64,
    pix: i64,
    burger: i64,
    buffet: i64,
    cheese: i64,
    ice: i64,
}

async fn fixture_with(config: DbConfig) -> Fixture {
    let db = Database::new(config).await.unwrap();
    let catalog = db.catalog();

    let cash = catalog.insert_payment_method("Cash").await.unwrap().id;
    let pix = catalog.insert_payment_method("PIX").await.unwrap().id;

    let burger = catalog
        .insert_product(&NewProduct::fixed("Burger", 1000).stock(5))
        .await
        .unwrap()
        .id;
    let buffet = catalog
        .insert_product(&NewProduct::variable("Buffet"))
        .await
        .unwrap()
        .id;

    let toppings = catalog.insert_additional_category("Toppings").await.unwrap().id;
    let drinks = catalog.insert_additional_category("Drink extras").await.unwrap().id;
    let cheese = catalog.insert_additional("Extra cheese", 200, toppings).await.unwrap().id;
    let ice = catalog.insert_additional("Ice", 50, drinks).await.unwrap().id;
    catalog.allow_category(burger, toppings).await.unwrap();

    Fixture {
        db,
        cash,
        pix,
        burger,
        buffet,
        cheese,
        ice,
    }
}

async fn fixture() -> Fixture {
    fixture_with(DbConfig::in_memory()).await
}

impl Fixture {
    fn two_burgers_with_cheese(&self) -> SaleRequest {
        SaleRequest::new(self.cash)
            .item(SaleItemRequest::new(self.burger, 2).add_on(AddOnRequest::new(self.cheese, 2.0)))
    }

    async fn stock(&self, product_id: i64) -> StockLevel {
        self.db.catalog().product_stock(product_id).await.unwrap()
    }
}

fn core_error(err: EngineError) -> CoreError {
    match err {
        EngineError::Core(err) => err,
        other => panic!("expected a rule violation, got {other:?}"),
    }
}

#[tokio::test]
async fn test_post_fixed_price_with_add_on() {
    let fx = fixture().await;
    let cashier = Caller::cashier(7);

    let sale = fx.db.engine().post(&cashier, &fx.two_burgers_with_cheese()).await.unwrap();

    assert_eq!(sale.sale.total_cents, 2200);
    assert_eq!(sale.sale.total().to_string(), "22.00");
    assert_eq!(sale.sale.user_id, 7);
    assert_eq!(sale.items.len(), 1);
    assert_eq!(sale.items[0].item.unit_price_cents, 1000);
    assert_eq!(sale.items[0].additionals.len(), 1);
    assert_eq!(sale.items[0].additionals[0].unit_price_cents, 200);
    assert_eq!(fx.stock(fx.burger).await, StockLevel::Tracked(3));

    let stored = fx.db.sales().get(sale.sale.id).await.unwrap().unwrap();
    assert_eq!(stored, sale);
}

#[tokio::test]
async fn test_post_variable_price_leaves_untracked_stock() {
    let fx = fixture().await;

    let request = SaleRequest::new(fx.cash).item(SaleItemRequest::new(fx.buffet, 3).unit_price(15.5));
    let sale = fx.db.engine().post(&Caller::cashier(1), &request).await.unwrap();

    assert_eq!(sale.sale.total().to_string(), "46.50");
    assert_eq!(sale.items[0].item.unit_price_cents, 1550);
    assert_eq!(fx.stock(fx.buffet).await, StockLevel::Untracked);
}

#[tokio::test]
async fn test_post_accepts_loose_json_payload() {
    let fx = fixture().await;

    let request: SaleRequest = serde_json::from_value(json!({
        "paymentMethodId": fx.cash.to_string(),
        "items": [{
            "productId": fx.burger,
            "quantity": "1",
            "unitPrice": "not a price",
            "isDelivery": true,
            "additionals": [{ "additionalId": fx.cheese, "unitPrice": "2.00" }]
        }]
    }))
    .unwrap();

    let sale = fx.db.engine().post(&Caller::cashier(1), &request).await.unwrap();

    assert_eq!(sale.sale.total_cents, 1200);
    assert!(sale.items[0].item.is_delivery);
    assert_eq!(sale.items[0].additionals[0].quantity, 1);
}

#[tokio::test]
async fn test_ineligible_add_on_has_no_side_effects() {
    let fx = fixture().await;

    let request = SaleRequest::new(fx.cash)
        .item(SaleItemRequest::new(fx.burger, 1).add_on(AddOnRequest::new(fx.ice, 0.5)));
    let err = fx.db.engine().post(&Caller::cashier(1), &request).await.unwrap_err();

    match core_error(err) {
        CoreError::InvalidAddOn { product, .. } => assert_eq!(product, "Burger"),
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(fx.stock(fx.burger).await, StockLevel::Tracked(5));
    assert_eq!(fx.db.sales().count().await.unwrap(), 0);
}

#[tokio::test]
async fn test_post_rejects_more_than_stock() {
    let fx = fixture().await;

    let request = SaleRequest::new(fx.cash)
        .item(SaleItemRequest::new(fx.burger, 4))
        .item(SaleItemRequest::new(fx.burger, 2));
    let err = fx.db.engine().post(&Caller::cashier(1), &request).await.unwrap_err();

    assert!(matches!(
        core_error(err),
        CoreError::InsufficientStock { available: 5, requested: 6, .. }
    ));
    assert_eq!(fx.stock(fx.burger).await, StockLevel::Tracked(5));
}

#[tokio::test]
async fn test_edit_quantity_returns_stock_and_recomputes_total() {
    let fx = fixture().await;
    let cashier = Caller::cashier(7);
    let engine = fx.db.engine();

    let posted = engine.post(&cashier, &fx.two_burgers_with_cheese()).await.unwrap();
    let item_id = posted.items[0].item.id;

    let edit = EditSaleRequest::new().item(EditItemRequest::new(item_id, 1));
    let edited = engine.edit(&cashier, posted.sale.id, &edit).await.unwrap();

    assert_eq!(edited.items[0].item.quantity, 1);
    assert_eq!(edited.sale.total().to_string(), "12.00");
    assert_eq!(fx.stock(fx.burger).await, StockLevel::Tracked(4));

    let stored = fx.db.sales().get(posted.sale.id).await.unwrap().unwrap();
    assert_eq!(stored.sale.total_cents, 1200);
    assert_eq!(stored.items[0].item.quantity, 1);
    assert_eq!(stored.items[0].additionals.len(), 1);
}

#[tokio::test]
async fn test_edit_with_same_quantity_keeps_stock() {
    let fx = fixture().await;
    let cashier = Caller::cashier(7);
    let engine = fx.db.engine();

    let posted = engine.post(&cashier, &fx.two_burgers_with_cheese()).await.unwrap();
    let item_id = posted.items[0].item.id;

    let edit = EditSaleRequest::new().item(EditItemRequest::new(item_id, 2).delivery(true));
    let edited = engine.edit(&cashier, posted.sale.id, &edit).await.unwrap();

    assert!(edited.items[0].item.is_delivery);
    assert_eq!(edited.sale.total_cents, 2200);
    assert_eq!(fx.stock(fx.burger).await, StockLevel::Tracked(3));
}

#[tokio::test]
async fn test_edit_beyond_stock_changes_nothing() {
    let fx = fixture().await;
    let cashier = Caller::cashier(7);
    let engine = fx.db.engine();

    let posted = engine.post(&cashier, &fx.two_burgers_with_cheese()).await.unwrap();
    let item_id = posted.items[0].item.id;

    let edit = EditSaleRequest::new()
        .payment_method(fx.pix)
        .item(EditItemRequest::new(item_id, 6));
    let err = engine.edit(&cashier, posted.sale.id, &edit).await.unwrap_err();

    assert!(matches!(core_error(err), CoreError::InsufficientStock { .. }));
    assert_eq!(fx.stock(fx.burger).await, StockLevel::Tracked(3));

    let stored = fx.db.sales().get(posted.sale.id).await.unwrap().unwrap();
    assert_eq!(stored.sale.payment_method_id, fx.cash);
    assert_eq!(stored.items[0].item.quantity, 2);
}

#[tokio::test]
async fn test_edit_payment_method_only() {
    let fx = fixture().await;
    let cashier = Caller::cashier(7);
    let engine = fx.db.engine();

    let posted = engine.post(&cashier, &fx.two_burgers_with_cheese()).await.unwrap();
    let edited = engine
        .edit(&cashier, posted.sale.id, &EditSaleRequest::new().payment_method(fx.pix))
        .await
        .unwrap();

    assert_eq!(edited.sale.payment_method_id, fx.pix);
    assert_eq!(edited.sale.total_cents, 2200);
    assert_eq!(fx.stock(fx.burger).await, StockLevel::Tracked(3));
}

#[tokio::test]
async fn test_multi_line_edit_checks_net_stock_change() {
    let fx = fixture().await;
    let cashier = Caller::cashier(7);
    let engine = fx.db.engine();
    let fries = fx
        .db
        .catalog()
        .insert_product(&NewProduct::fixed("Fries", 500).stock(4))
        .await
        .unwrap()
        .id;

    let request = SaleRequest::new(fx.cash)
        .item(SaleItemRequest::new(fx.burger, 2))
        .item(SaleItemRequest::new(fx.burger, 1))
        .item(SaleItemRequest::new(fries, 1));
    let posted = engine.post(&cashier, &request).await.unwrap();
    let [first, second, third] = [0, 1, 2].map(|i| posted.items[i].item.id);
    assert_eq!(fx.stock(fx.burger).await, StockLevel::Tracked(2));
    assert_eq!(fx.stock(fries).await, StockLevel::Tracked(3));

    // Both burger lines grow: 1 + 2 more than the 2 left
    let too_many = EditSaleRequest::new()
        .payment_method(fx.pix)
        .item(EditItemRequest::new(first, 3))
        .item(EditItemRequest::new(second, 3))
        .item(EditItemRequest::new(third, 2));
    let err = engine.edit(&cashier, posted.sale.id, &too_many).await.unwrap_err();
    assert!(matches!(
        core_error(err),
        CoreError::InsufficientStock { available: 2, requested: 3, .. }
    ));
    assert_eq!(fx.stock(fx.burger).await, StockLevel::Tracked(2));
    assert_eq!(fx.stock(fries).await, StockLevel::Tracked(3));
    assert_eq!(fx.db.sales().get(posted.sale.id).await.unwrap().unwrap(), posted);

    // One line gives back a unit the other takes: net 2 is exactly covered
    let shifted = EditSaleRequest::new()
        .item(EditItemRequest::new(first, 1))
        .item(EditItemRequest::new(second, 4))
        .item(EditItemRequest::new(third, 4));
    let edited = engine.edit(&cashier, posted.sale.id, &shifted).await.unwrap();

    assert_eq!(edited.sale.total_cents, 1000 + 4000 + 2000);
    assert_eq!(fx.stock(fx.burger).await, StockLevel::Tracked(0));
    assert_eq!(fx.stock(fries).await, StockLevel::Tracked(0));
    assert_eq!(fx.db.sales().get(posted.sale.id).await.unwrap().unwrap(), edited);
}

#[tokio::test]
async fn test_edit_unknown_sale_is_not_found() {
    let fx = fixture().await;

    let edit = EditSaleRequest::new().payment_method(fx.pix);
    let err = fx.db.engine().edit(&Caller::admin(1), 404, &edit).await.unwrap_err();

    assert!(matches!(core_error(err), CoreError::NotFound { entity: "Sale", id: 404 }));
}

#[tokio::test]
async fn test_void_restores_stock_and_removes_rows() {
    let fx = fixture().await;
    let engine = fx.db.engine();

    let posted = engine
        .post(&Caller::cashier(7), &fx.two_burgers_with_cheese())
        .await
        .unwrap();
    assert_eq!(fx.stock(fx.burger).await, StockLevel::Tracked(3));

    engine.void(&Caller::admin(1), posted.sale.id).await.unwrap();

    assert_eq!(fx.stock(fx.burger).await, StockLevel::Tracked(5));
    assert!(fx.db.sales().get(posted.sale.id).await.unwrap().is_none());
    assert_eq!(fx.db.sales().count_rows(posted.sale.id).await.unwrap(), (0, 0));

    let err = engine.void(&Caller::admin(1), posted.sale.id).await.unwrap_err();
    assert!(matches!(core_error(err), CoreError::NotFound { entity: "Sale", .. }));
}

#[tokio::test]
async fn test_void_after_stock_count_goes_untracked() {
    let fx = fixture().await;
    let engine = fx.db.engine();

    let posted = engine
        .post(&Caller::cashier(7), &fx.two_burgers_with_cheese())
        .await
        .unwrap();
    fx.db.catalog().set_stock(fx.burger, StockLevel::Untracked).await.unwrap();

    engine.void(&Caller::admin(1), posted.sale.id).await.unwrap();

    assert_eq!(fx.stock(fx.burger).await, StockLevel::Untracked);
}

#[tokio::test]
async fn test_cashier_limited_to_own_sales() {
    let fx = fixture().await;
    let engine = fx.db.engine();
    let owner = Caller::cashier(7);
    let other = Caller::cashier(8);

    let posted = engine.post(&owner, &fx.two_burgers_with_cheese()).await.unwrap();
    let sale_id = posted.sale.id;

    let err = engine.get(&other, sale_id).await.unwrap_err();
    assert!(matches!(core_error(err), CoreError::Forbidden(_)));

    let edit = EditSaleRequest::new().item(EditItemRequest::new(posted.items[0].item.id, 1));
    let err = engine.edit(&other, sale_id, &edit).await.unwrap_err();
    assert!(matches!(core_error(err), CoreError::Forbidden(_)));

    let err = engine.void(&owner, sale_id).await.unwrap_err();
    assert!(matches!(core_error(err), CoreError::Forbidden(_)));

    // Rejections happen before any write
    assert_eq!(fx.stock(fx.burger).await, StockLevel::Tracked(3));
    assert_eq!(engine.get(&owner, sale_id).await.unwrap(), posted);
    assert!(engine.get(&Caller::admin(1), sale_id).await.is_ok());
}

#[tokio::test]
async fn test_list_filters_and_visibility() {
    let fx = fixture().await;
    let engine = fx.db.engine();
    let first = Caller::cashier(7);
    let second = Caller::cashier(8);

    let burgers = engine.post(&first, &fx.two_burgers_with_cheese()).await.unwrap();
    let buffet = engine
        .post(
            &second,
            &SaleRequest::new(fx.pix).item(SaleItemRequest::new(fx.buffet, 1).unit_price(20.0)),
        )
        .await
        .unwrap();

    let admin = Caller::admin(1);
    let all = engine.list(&admin, &SaleFilter::default()).await.unwrap();
    assert_eq!(all.len(), 2);
    assert_eq!(all[0].sale.id, buffet.sale.id, "newest first");

    let own = engine.list(&first, &SaleFilter::default()).await.unwrap();
    assert_eq!(own.len(), 1);
    assert_eq!(own[0], burgers);

    let by_product = SaleFilter {
        product_id: Some(fx.buffet),
        ..SaleFilter::default()
    };
    let found = engine.list(&admin, &by_product).await.unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].sale.id, buffet.sale.id);

    let by_payment = SaleFilter {
        payment_method_id: Some(fx.cash),
        ..SaleFilter::default()
    };
    assert_eq!(engine.list(&admin, &by_payment).await.unwrap().len(), 1);

    let future = SaleFilter {
        start: Some(chrono::Utc::now() + chrono::Duration::hours(1)),
        ..SaleFilter::default()
    };
    assert!(engine.list(&admin, &future).await.unwrap().is_empty());
}

// =============================================================================
// Rollback on persistence failure
// =============================================================================

/// Makes every `event` on `table` fail, the way a full disk would fail a
/// write halfway through a transaction.
async fn fail_writes(fx: &Fixture, table: &str, event: &str) {
    let sql = format!(
        "CREATE TRIGGER fail_{table}_{event} BEFORE {event} ON {table} \
         BEGIN SELECT RAISE(ABORT, 'simulated write failure'); END"
    );
    sqlx::query(&sql).execute(fx.db.pool()).await.unwrap();
}

async fn row_count(fx: &Fixture, table: &str) -> i64 {
    sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {table}"))
        .fetch_one(fx.db.pool())
        .await
        .unwrap()
}

#[tokio::test]
async fn test_post_failure_after_stock_update_rolls_back() {
    let fx = fixture().await;
    fail_writes(&fx, "sale_item_additionals", "INSERT").await;

    let err = fx
        .db
        .engine()
        .post(&Caller::cashier(7), &fx.two_burgers_with_cheese())
        .await
        .unwrap_err();

    assert!(matches!(err, EngineError::PersistenceFailure(_)));
    assert_eq!(fx.stock(fx.burger).await, StockLevel::Tracked(5));
    assert_eq!(row_count(&fx, "sales").await, 0);
    assert_eq!(row_count(&fx, "sale_items").await, 0);
    assert_eq!(row_count(&fx, "sale_item_additionals").await, 0);
}

#[tokio::test]
async fn test_edit_failure_after_stock_update_rolls_back() {
    let fx = fixture().await;
    let cashier = Caller::cashier(7);
    let engine = fx.db.engine();

    let posted = engine.post(&cashier, &fx.two_burgers_with_cheese()).await.unwrap();
    fail_writes(&fx, "sale_items", "UPDATE").await;

    let edit = EditSaleRequest::new()
        .payment_method(fx.pix)
        .item(EditItemRequest::new(posted.items[0].item.id, 1));
    let err = engine.edit(&cashier, posted.sale.id, &edit).await.unwrap_err();

    assert!(matches!(err, EngineError::PersistenceFailure(_)));
    assert_eq!(fx.stock(fx.burger).await, StockLevel::Tracked(3));
    assert_eq!(fx.db.sales().get(posted.sale.id).await.unwrap().unwrap(), posted);
}

#[tokio::test]
async fn test_void_failure_after_stock_restore_rolls_back() {
    let fx = fixture().await;
    let engine = fx.db.engine();

    let posted = engine
        .post(&Caller::cashier(7), &fx.two_burgers_with_cheese())
        .await
        .unwrap();
    fail_writes(&fx, "sales", "DELETE").await;

    let err = engine.void(&Caller::admin(1), posted.sale.id).await.unwrap_err();

    assert!(matches!(err, EngineError::PersistenceFailure(_)));
    assert_eq!(fx.stock(fx.burger).await, StockLevel::Tracked(3));
    assert_eq!(fx.db.sales().get(posted.sale.id).await.unwrap().unwrap(), posted);
    assert_eq!(fx.db.sales().count_rows(posted.sale.id).await.unwrap(), (1, 1));
}

// =============================================================================
// Concurrency (file-backed, multi-connection pool)
// =============================================================================

fn temp_db_path() -> PathBuf {
    std::env::temp_dir().join(format!("till-race-{}.db", uuid::Uuid::new_v4()))
}

fn remove_db_files(path: &PathBuf) {
    for suffix in ["", "-wal", "-shm"] {
        let mut file = path.clone().into_os_string();
        file.push(suffix);
        let _ = std::fs::remove_file(file);
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_posts_never_oversell() {
    let path = temp_db_path();
    let fx = fixture_with(DbConfig::new(&path).max_connections(4)).await;
    fx.db.catalog().set_stock(fx.burger, StockLevel::Tracked(2)).await.unwrap();

    let request = SaleRequest::new(fx.cash).item(SaleItemRequest::new(fx.burger, 2));
    let (first, second) = tokio::join!(
        {
            let engine = fx.db.engine();
            let request = request.clone();
            async move { engine.post(&Caller::cashier(1), &request).await }
        },
        {
            let engine = fx.db.engine();
            let request = request.clone();
            async move { engine.post(&Caller::cashier(2), &request).await }
        }
    );

    let results = [first, second];
    let successes = results.iter().filter(|result| result.is_ok()).count();
    assert_eq!(successes, 1);
    assert!(results.iter().any(|result| matches!(
        result,
        Err(EngineError::Core(CoreError::InsufficientStock { .. }))
    )));

    assert_eq!(fx.stock(fx.burger).await, StockLevel::Tracked(0));
    assert_eq!(fx.db.sales().count().await.unwrap(), 1);

    fx.db.close().await;
    remove_db_files(&path);
}

/// Units of `product_id` across every stored sale.
async fn units_sold(fx: &Fixture, product_id: i64) -> i64 {
    fx.db
        .engine()
        .list(&Caller::admin(1), &SaleFilter::default())
        .await
        .unwrap()
        .iter()
        .flat_map(|sale| sale.items.iter())
        .filter(|line| line.item.product_id == product_id)
        .map(|line| line.item.quantity)
        .sum()
}

fn assert_single_winner<T: std::fmt::Debug>(first: &Result<T, EngineError>, second: &Result<T, EngineError>) {
    assert!(first.is_ok() != second.is_ok(), "exactly one may win: {first:?} / {second:?}");
    for err in [first.as_ref().err(), second.as_ref().err()].into_iter().flatten() {
        assert!(
            matches!(err, EngineError::Core(CoreError::InsufficientStock { .. })),
            "loser must see the stock shortfall, got {err:?}"
        );
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_edit_and_post_never_oversell() {
    let path = temp_db_path();
    let fx = fixture_with(DbConfig::new(&path).max_connections(4)).await;
    let engine = fx.db.engine();
    let cashier = Caller::cashier(7);

    let posted = engine
        .post(&cashier, &SaleRequest::new(fx.cash).item(SaleItemRequest::new(fx.burger, 2)))
        .await
        .unwrap();
    assert_eq!(fx.stock(fx.burger).await, StockLevel::Tracked(3));

    // Both want the remaining 3
    let grow = EditSaleRequest::new().item(EditItemRequest::new(posted.items[0].item.id, 5));
    let sale = SaleRequest::new(fx.cash).item(SaleItemRequest::new(fx.burger, 3));
    let other_cashier = Caller::cashier(8);
    let (edited, second) = tokio::join!(
        engine.edit(&cashier, posted.sale.id, &grow),
        engine.post(&other_cashier, &sale)
    );

    assert_single_winner(&edited, &second);
    assert_eq!(fx.stock(fx.burger).await, StockLevel::Tracked(0));
    assert_eq!(units_sold(&fx, fx.burger).await, 5);

    fx.db.close().await;
    remove_db_files(&path);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_edits_never_oversell() {
    let path = temp_db_path();
    let fx = fixture_with(DbConfig::new(&path).max_connections(4)).await;
    let engine = fx.db.engine();
    let cashier = Caller::cashier(7);

    let request = SaleRequest::new(fx.cash).item(SaleItemRequest::new(fx.burger, 2));
    let first = engine.post(&cashier, &request).await.unwrap();
    let second = engine.post(&cashier, &request).await.unwrap();
    assert_eq!(fx.stock(fx.burger).await, StockLevel::Tracked(1));

    let grow = |sale: &SaleDetail| EditSaleRequest::new().item(EditItemRequest::new(sale.items[0].item.id, 3));
    let (grow_first, grow_second) = (grow(&first), grow(&second));
    let (a, b) = tokio::join!(
        engine.edit(&cashier, first.sale.id, &grow_first),
        engine.edit(&cashier, second.sale.id, &grow_second)
    );

    assert_single_winner(&a, &b);
    assert_eq!(fx.stock(fx.burger).await, StockLevel::Tracked(0));
    assert_eq!(units_sold(&fx, fx.burger).await, 5);

    fx.db.close().await;
    remove_db_files(&path);
}
