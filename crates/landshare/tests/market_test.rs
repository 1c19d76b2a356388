use landshare::holdings::owned_units;
use landshare::{
    Domain, LandshareError, MemoryMirror, Marketplace, PaperLedger, Persistence, RemoteMirror,
    Settlement, Store, TokenizeRequest,
};
use std::sync::Arc;
use storage::LocalStore;
use tempfile::TempDir;

const TREASURY: &str = "0xTreasury";
const ALICE: &str = "0xAlice";
const BOB: &str = "0xBob";

struct Fixture {
    _dir: TempDir,
    mirror: Arc<MemoryMirror>,
    ledger: Arc<PaperLedger>,
    market: Marketplace,
}

fn fixture() -> Fixture {
    let dir = TempDir::new().unwrap();
    let mirror = Arc::new(MemoryMirror::new());
    let store = Arc::new(Store::new(Persistence::new(
        LocalStore::open(dir.path()).unwrap(),
        Some(mirror.clone() as Arc<dyn RemoteMirror>),
    )));
    let ledger = Arc::new(PaperLedger::new());
    ledger.credit(ALICE, 1_000.0);
    ledger.credit(BOB, 1_000.0);

    let market = Marketplace::new(store, ledger.clone(), TREASURY, 2.0);
    Fixture {
        _dir: dir,
        mirror,
        ledger,
        market,
    }
}

fn request(location: &str, units: u64, price: Option<f64>) -> TokenizeRequest {
    TokenizeRequest {
        location: location.to_string(),
        acres: 5.0,
        units,
        price_per_unit: price,
    }
}

#[tokio::test]
async fn test_tokenize_buy_list_and_buy_from_listing() {
    let f = fixture();

    let parcel = f
        .market
        .tokenize_parcel(request("A", 100, Some(2.0)))
        .await
        .unwrap();
    assert_eq!(parcel.remaining_units, Some(100));
    assert!(parcel.metadata_uri.starts_with("memory://ipfs/"));
    assert!(!parcel.ipfs_hash.is_empty());

    // Primary purchase from the treasury
    let trade = f.market.buy_parcel(ALICE, &parcel.id, 30).await.unwrap();
    assert_eq!(trade.total, 60.0);
    assert_eq!(trade.price_per_unit, 2.0);
    assert_eq!(trade.seller, TREASURY);
    assert_eq!(trade.buyer(), Some(ALICE));
    assert!(trade.tx_hash().is_some_and(|hash| hash.starts_with("0x")));
    assert_eq!(f.ledger.balance(ALICE), 940.0);
    assert_eq!(f.ledger.balance(TREASURY), 60.0);

    let store = f.market.store();
    let stored = store.get_parcel(&parcel.id).await.unwrap();
    assert_eq!(stored.remaining_units, Some(70));

    // Alice lists part of her holding
    let listing = f
        .market
        .list_for_sale(ALICE, &parcel.id, 20, 3.0)
        .await
        .unwrap();
    assert!(listing.is_open_listing());
    assert_eq!(listing.total, 60.0);

    let visible_to_bob = f.market.available_sell_orders(BOB).await;
    assert_eq!(visible_to_bob.len(), 1);
    assert_eq!(visible_to_bob[0].location, "A");
    assert!(f.market.available_sell_orders(ALICE).await.is_empty());
    assert_eq!(f.market.user_sell_orders(ALICE).await.len(), 1);

    // Bob buys from the listing
    let bought = f.market.buy_from_order(BOB, &listing.id, 5).await.unwrap();
    assert_eq!(bought.seller, ALICE);
    assert_eq!(bought.buyer(), Some(BOB));
    assert_eq!(bought.price_per_unit, 3.0);
    assert_eq!(bought.total, 15.0);
    assert_eq!(f.ledger.balance(ALICE), 955.0);
    assert_eq!(f.ledger.balance(BOB), 985.0);

    let trades = store.get_trades().await;
    let remaining = trades.iter().find(|t| t.id == listing.id).unwrap();
    assert_eq!(remaining.units, 15);
    assert_eq!(trades[0].id, bought.id);

    // 30 bought, 15 still listed, 5 sold to Bob
    assert_eq!(owned_units(&trades, ALICE, &parcel.id), 10);
    assert_eq!(owned_units(&trades, BOB, &parcel.id), 5);

    // Everything reached the mirror once the publishes finished
    store.flush().await;
    let mirrored = f.mirror.latest(Domain::Trades).unwrap();
    assert_eq!(mirrored.as_array().unwrap().len(), 3);
    assert_eq!(mirrored[0]["buyer"], BOB);
}

#[tokio::test]
async fn test_buying_the_whole_listing_removes_it() {
    let f = fixture();
    let parcel = f
        .market
        .tokenize_parcel(request("Kisumu Block 4", 50, None))
        .await
        .unwrap();
    f.market.buy_parcel(ALICE, &parcel.id, 10).await.unwrap();
    let listing = f
        .market
        .list_for_sale(ALICE, &parcel.id, 10, 2.5)
        .await
        .unwrap();

    f.market.buy_from_order(BOB, &listing.id, 10).await.unwrap();

    assert!(f.market.user_sell_orders(ALICE).await.is_empty());
    let err = f
        .market
        .buy_from_order(BOB, &listing.id, 1)
        .await
        .unwrap_err();
    assert!(matches!(err, LandshareError::OrderNotFound(_)));
}

#[tokio::test]
async fn test_tokenize_uses_default_price_and_validates() {
    let f = fixture();
    let parcel = f
        .market
        .tokenize_parcel(request("Nakuru", 10, None))
        .await
        .unwrap();
    assert_eq!(
        f.market.store().price_or_default(&parcel.id, 99.0).await,
        2.0
    );

    for bad in [
        request("  ", 10, None),
        request("Nakuru", 0, None),
        request("Nakuru", 10, Some(0.0)),
        TokenizeRequest {
            acres: -1.0,
            ..request("Nakuru", 10, None)
        },
    ] {
        let err = f.market.tokenize_parcel(bad).await.unwrap_err();
        assert!(matches!(err, LandshareError::InvalidParameter { .. }));
    }
    assert_eq!(f.market.store().get_parcels().await.len(), 1);
}

#[tokio::test]
async fn test_failed_metadata_pin_aborts_tokenize() {
    let f = fixture();
    f.mirror.set_failing(true);

    let err = f
        .market
        .tokenize_parcel(request("Eldoret", 10, None))
        .await
        .unwrap_err();
    assert!(matches!(err, LandshareError::Storage(_)));
    assert!(f.market.store().get_parcels().await.is_empty());
}

#[tokio::test]
async fn test_tokenize_without_mirror_has_no_metadata() {
    let dir = TempDir::new().unwrap();
    let store = Arc::new(Store::new(Persistence::local_only(
        LocalStore::open(dir.path()).unwrap(),
    )));
    let market = Marketplace::new(store, Arc::new(PaperLedger::new()), TREASURY, 2.0);

    let parcel = market
        .tokenize_parcel(request("Thika", 10, Some(1.5)))
        .await
        .unwrap();
    assert!(parcel.metadata_uri.is_empty());
    assert!(parcel.ipfs_hash.is_empty());
    assert_eq!(market.available_parcels().await[0].price_per_unit, 1.5);
}

#[tokio::test]
async fn test_preconditions_fail_before_any_change() {
    let f = fixture();
    let parcel = f
        .market
        .tokenize_parcel(request("A", 100, Some(2.0)))
        .await
        .unwrap();

    let err = f.market.buy_parcel(ALICE, "missing", 1).await.unwrap_err();
    assert!(matches!(err, LandshareError::ParcelNotFound(_)));

    let err = f.market.buy_parcel(ALICE, &parcel.id, 101).await.unwrap_err();
    assert!(matches!(
        err,
        LandshareError::UnitsUnavailable {
            available: 100,
            requested: 101
        }
    ));

    let err = f.market.buy_parcel(ALICE, &parcel.id, 0).await.unwrap_err();
    assert!(err.is_precondition());

    let poor = "0xPoor";
    f.ledger.credit(poor, 1.0);
    let err = f.market.buy_parcel(poor, &parcel.id, 10).await.unwrap_err();
    assert!(matches!(err, LandshareError::InsufficientBalance { .. }));

    let err = f
        .market
        .list_for_sale(ALICE, &parcel.id, 1, 3.0)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        LandshareError::InsufficientUnits { owned: 0, .. }
    ));

    let err = f.market.buy_from_order(BOB, "missing", 1).await.unwrap_err();
    assert!(matches!(err, LandshareError::OrderNotFound(_)));

    // No tokens moved and nothing was recorded
    assert_eq!(f.ledger.balance(ALICE), 1_000.0);
    assert_eq!(f.ledger.balance(poor), 1.0);
    assert!(f.market.store().get_trades().await.is_empty());
    let stored = f.market.store().get_parcel(&parcel.id).await.unwrap();
    assert_eq!(stored.available_units(), 100);
}

#[tokio::test]
async fn test_listing_rules() {
    let f = fixture();
    let parcel = f
        .market
        .tokenize_parcel(request("A", 100, Some(2.0)))
        .await
        .unwrap();
    f.market.buy_parcel(ALICE, &parcel.id, 30).await.unwrap();
    let listing = f
        .market
        .list_for_sale(ALICE, &parcel.id, 20, 3.0)
        .await
        .unwrap();

    // Listed units count against the seller
    let err = f
        .market
        .list_for_sale(ALICE, &parcel.id, 11, 3.0)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        LandshareError::InsufficientUnits { owned: 10, .. }
    ));

    let err = f
        .market
        .buy_from_order(ALICE, &listing.id, 1)
        .await
        .unwrap_err();
    assert!(err.is_precondition());

    let err = f
        .market
        .buy_from_order(BOB, &listing.id, 21)
        .await
        .unwrap_err();
    assert!(matches!(err, LandshareError::UnitsUnavailable { .. }));

    let err = f.market.cancel_order(BOB, &listing.id).await.unwrap_err();
    assert!(err.is_precondition());

    f.market.cancel_order(ALICE, &listing.id).await.unwrap();
    assert!(f.market.user_sell_orders(ALICE).await.is_empty());
    assert_eq!(
        owned_units(&f.market.store().get_trades().await, ALICE, &parcel.id),
        30
    );
}

#[tokio::test]
async fn test_views_and_portfolio() {
    let f = fixture();
    let a = f
        .market
        .tokenize_parcel(request("A", 10, Some(2.0)))
        .await
        .unwrap();
    let b = f
        .market
        .tokenize_parcel(request("B", 10, Some(4.0)))
        .await
        .unwrap();

    f.market.buy_parcel(ALICE, &a.id, 10).await.unwrap();
    f.market.buy_parcel(ALICE, &b.id, 5).await.unwrap();

    // Sold-out parcels are not offered any more
    let available = f.market.available_parcels().await;
    assert_eq!(available.len(), 1);
    assert_eq!(available[0].parcel.id, b.id);
    assert_eq!(available[0].price_per_unit, 4.0);

    f.market.set_price(&a.id, 3.0).await.unwrap();
    let portfolio = f.market.portfolio(ALICE).await;
    assert_eq!(portfolio.summary.total_invested, 40.0);
    assert_eq!(portfolio.summary.portfolio_value, 50.0);
    assert_eq!(portfolio.summary.land_parcels, 2);
    assert_eq!(portfolio.summary.total_return_pct, 25.0);

    // Listings of removed parcels are hidden from buyers
    f.market.list_for_sale(ALICE, &a.id, 5, 3.0).await.unwrap();
    f.market.remove_parcel(&a.id).await.unwrap();
    assert!(f.market.available_sell_orders(BOB).await.is_empty());
    let own = f.market.user_sell_orders(ALICE).await;
    assert_eq!(own[0].location, "Unknown Location");

    let err = f.market.remove_parcel(&a.id).await.unwrap_err();
    assert!(matches!(err, LandshareError::ParcelNotFound(_)));
}

#[tokio::test]
async fn test_platform_fee() {
    let f = fixture();
    assert_eq!(f.market.store().platform_fee(), "");
    f.market.set_platform_fee(" 2.5 ").unwrap();
    assert_eq!(f.market.store().platform_fee(), "2.5");
    assert!(f.market.set_platform_fee("").is_err());
}

#[tokio::test]
async fn test_paper_ledger_is_a_settlement() {
    let ledger: Arc<dyn Settlement> = Arc::new(PaperLedger::new());
    assert_eq!(ledger.balance_of(ALICE).await.unwrap(), 0.0);
}
