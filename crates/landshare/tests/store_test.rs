use anyhow::Result as AnyResult;
use async_trait::async_trait;
use landshare::{
    CacheState, Domain, ListingState, MemoryMirror, Parcel, Persistence, PinnedDocument,
    RemoteMirror, Side, Store, Trade, TradeKind,
};
use serde_json::{Value, json};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use storage::{LocalStore, PinMetadata};
use tempfile::TempDir;

fn parcel(id: &str, units: u64) -> Parcel {
    Parcel {
        id: id.to_string(),
        location: format!("Plot {}", id),
        acres: 5.0,
        units,
        remaining_units: Some(units),
        metadata_uri: String::new(),
        ipfs_hash: String::new(),
        created_at: "2024-01-01T00:00:00.000Z".to_string(),
    }
}

fn listing(id: &str, seller: &str, units: u64) -> Trade {
    Trade {
        id: id.to_string(),
        parcel_id: "p1".to_string(),
        kind: TradeKind::Listing,
        seller: seller.to_string(),
        units,
        price_per_unit: 3.0,
        total: units as f64 * 3.0,
        side: Side::Sell,
        timestamp: "2024-01-01T00:00:00.000Z".to_string(),
    }
}

fn local_store(dir: &TempDir) -> Store {
    Store::new(Persistence::local_only(LocalStore::open(dir.path()).unwrap()))
}

fn mirrored_store(dir: &TempDir, mirror: Arc<MemoryMirror>) -> Store {
    Store::new(Persistence::new(
        LocalStore::open(dir.path()).unwrap(),
        Some(mirror as Arc<dyn RemoteMirror>),
    ))
}

#[tokio::test]
async fn test_add_parcel_is_newest_first() {
    let dir = TempDir::new().unwrap();
    let store = local_store(&dir);

    store.add_parcel(parcel("p1", 10)).await.unwrap();
    store.add_parcel(parcel("p2", 10)).await.unwrap();
    store.add_parcel(parcel("p3", 10)).await.unwrap();

    let ids: Vec<String> = store.get_parcels().await.iter().map(|p| p.id.clone()).collect();
    assert_eq!(ids, vec!["p3", "p2", "p1"]);

    // The local store holds the same order
    let local: Vec<Parcel> = store.local().load(Domain::Parcels.storage_key());
    assert_eq!(local.len(), 3);
    assert_eq!(local[0].id, "p3");
}

#[tokio::test]
async fn test_local_round_trip_across_instances() {
    let dir = TempDir::new().unwrap();
    {
        let store = local_store(&dir);
        store.add_parcel(parcel("p1", 100)).await.unwrap();
        store.add_trade(listing("t1", "0xSeller", 20)).await.unwrap();
        store.set_price("p1", 2.5).await.unwrap();
        store.set_platform_fee("2.5").unwrap();
    }

    let reopened = local_store(&dir);
    assert_eq!(reopened.get_parcels().await.as_slice(), &[parcel("p1", 100)]);
    assert_eq!(
        reopened.get_trades().await.as_slice(),
        &[listing("t1", "0xSeller", 20)]
    );
    assert_eq!(reopened.price_or_default("p1", 2.0).await, 2.5);
    assert_eq!(reopened.platform_fee(), "2.5");
}

#[tokio::test]
async fn test_decrement_clamps_at_zero() {
    let dir = TempDir::new().unwrap();
    let store = local_store(&dir);
    store.add_parcel(parcel("p1", 10)).await.unwrap();

    let updated = store.decrement_parcel_units("p1", 4).await.unwrap().unwrap();
    assert_eq!(updated.remaining_units, Some(6));

    let updated = store.decrement_parcel_units("p1", 15).await.unwrap().unwrap();
    assert_eq!(updated.remaining_units, Some(0));
    assert_eq!(store.get_parcels().await[0].available_units(), 0);
}

#[tokio::test]
async fn test_unknown_ids_change_nothing() {
    let dir = TempDir::new().unwrap();
    let store = local_store(&dir);
    store.add_parcel(parcel("p1", 10)).await.unwrap();
    store.add_trade(listing("t1", "0xSeller", 5)).await.unwrap();
    let parcels_before = store.get_parcels().await;
    let trades_before = store.get_trades().await;

    assert_eq!(store.decrement_parcel_units("missing", 3).await.unwrap(), None);
    assert!(!store.remove_parcel("missing").await.unwrap());
    assert_eq!(store.update_order_units("missing", 1).await.unwrap(), None);
    assert!(!store.remove_order("missing").await.unwrap());

    // Nothing was committed, so the cached snapshots are untouched
    assert!(Arc::ptr_eq(&parcels_before, &store.get_parcels().await));
    assert!(Arc::ptr_eq(&trades_before, &store.get_trades().await));
}

#[tokio::test]
async fn test_filled_order_is_removed() {
    let dir = TempDir::new().unwrap();
    let store = local_store(&dir);
    store.add_trade(listing("t1", "0xSeller", 20)).await.unwrap();
    store.add_trade(listing("t2", "0xSeller", 8)).await.unwrap();

    assert_eq!(
        store.update_order_units("t1", 5).await.unwrap(),
        Some(ListingState::Active)
    );
    let remaining = store.get_trades().await;
    let t1 = remaining.iter().find(|t| t.id == "t1").unwrap();
    assert_eq!(t1.units, 15);
    assert_eq!(t1.total, 60.0);

    assert_eq!(
        store.update_order_units("t1", 15).await.unwrap(),
        Some(ListingState::Filled)
    );
    let ids: Vec<String> = store.get_trades().await.iter().map(|t| t.id.clone()).collect();
    assert_eq!(ids, vec!["t2"]);
}

#[tokio::test]
async fn test_remove_parcel_and_order() {
    let dir = TempDir::new().unwrap();
    let store = local_store(&dir);
    store.add_parcel(parcel("p1", 10)).await.unwrap();
    store.add_parcel(parcel("p2", 10)).await.unwrap();
    store.add_trade(listing("t1", "0xSeller", 20)).await.unwrap();

    assert!(store.remove_parcel("p1").await.unwrap());
    assert!(store.remove_order("t1").await.unwrap());
    assert_eq!(store.get_parcels().await.len(), 1);
    assert!(store.get_trades().await.is_empty());
}

#[tokio::test]
async fn test_user_trades_match_either_side() {
    let dir = TempDir::new().unwrap();
    let store = local_store(&dir);
    store.add_trade(listing("t1", "0xAlice", 20)).await.unwrap();
    store
        .add_trade(Trade {
            kind: TradeKind::Executed {
                buyer: "0xBob".to_string(),
                tx_hash: "0x01".to_string(),
            },
            side: Side::Buy,
            ..listing("t2", "0xALICE", 5)
        })
        .await
        .unwrap();
    store.add_trade(listing("t3", "0xCarol", 1)).await.unwrap();

    assert_eq!(store.user_trades("0xalice").await.len(), 2);
    assert_eq!(store.user_trades("0xBOB").await.len(), 1);
    assert!(store.user_trades("0xDave").await.is_empty());
}

#[tokio::test]
async fn test_prices_and_defaults() {
    let dir = TempDir::new().unwrap();
    let store = local_store(&dir);

    assert_eq!(store.price_or_default("p1", 2.0).await, 2.0);
    store.set_price("p1", 3.25).await.unwrap();
    assert_eq!(store.price_or_default("p1", 2.0).await, 3.25);
    assert_eq!(store.price_or_default_snapshot("p2", 2.0), 2.0);

    let prices = store.get_prices().await;
    assert!(prices["p1"].last_updated.ends_with('Z'));
}

#[tokio::test(start_paused = true)]
async fn test_reads_within_ttl_share_one_snapshot() {
    let dir = TempDir::new().unwrap();
    let mirror = Arc::new(MemoryMirror::new());
    let store = mirrored_store(&dir, mirror.clone());

    store.add_parcel(parcel("p1", 10)).await.unwrap();
    store.flush().await;
    // The mutation read the empty collection once
    assert_eq!(mirror.resolutions(), 1);

    let first = store.get_parcels().await;
    tokio::time::advance(Duration::from_secs(29)).await;
    let second = store.get_parcels().await;
    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(mirror.resolutions(), 1);
    assert_eq!(store.cache_state(Domain::Parcels), CacheState::Fresh);

    tokio::time::advance(Duration::from_secs(1)).await;
    assert_eq!(store.cache_state(Domain::Parcels), CacheState::Stale);
    let third = store.get_parcels().await;
    assert_eq!(mirror.resolutions(), 2);
    assert_eq!(third.as_slice(), first.as_slice());

    let fourth = store.get_parcels().await;
    assert!(Arc::ptr_eq(&third, &fourth));
    assert_eq!(mirror.resolutions(), 2);
}

#[tokio::test]
async fn test_mutation_is_published_to_the_mirror() {
    let dir = TempDir::new().unwrap();
    let mirror = Arc::new(MemoryMirror::new());
    let store = mirrored_store(&dir, mirror.clone());

    store.add_parcel(parcel("p1", 10)).await.unwrap();
    store.add_parcel(parcel("p2", 10)).await.unwrap();
    store.flush().await;

    assert_eq!(mirror.pin_count(), 2);
    let latest = mirror.latest(Domain::Parcels).unwrap();
    assert_eq!(latest[0]["id"], "p2");
    assert_eq!(latest[1]["id"], "p1");
    assert_eq!(latest[1]["remainingUnits"], 10);
}

/// Mirror whose first pin is slow to complete
struct SlowFirstPin {
    inner: MemoryMirror,
    delayed: AtomicBool,
}

#[async_trait]
impl RemoteMirror for SlowFirstPin {
    async fn pin_document(&self, content: &Value, metadata: PinMetadata) -> AnyResult<PinnedDocument> {
        if !self.delayed.swap(true, Ordering::SeqCst) {
            tokio::time::sleep(Duration::from_millis(200)).await;
        }
        self.inner.pin_document(content, metadata).await
    }

    async fn resolve(&self, domain: Domain) -> AnyResult<Option<String>> {
        self.inner.resolve(domain).await
    }

    async fn fetch(&self, address: &str) -> AnyResult<Value> {
        self.inner.fetch(address).await
    }
}

#[tokio::test(start_paused = true)]
async fn test_slow_first_publish_does_not_shadow_newer_write() {
    let dir = TempDir::new().unwrap();
    let mirror = Arc::new(SlowFirstPin {
        inner: MemoryMirror::new(),
        delayed: AtomicBool::new(false),
    });
    let store = Store::with_ttl(
        Persistence::new(
            LocalStore::open(dir.path()).unwrap(),
            Some(mirror.clone() as Arc<dyn RemoteMirror>),
        ),
        Duration::from_millis(1),
    );

    store.add_parcel(parcel("p1", 10)).await.unwrap();
    store.add_parcel(parcel("p2", 10)).await.unwrap();
    store.flush().await;
    tokio::time::advance(Duration::from_millis(5)).await;

    // The cache has expired, so this read goes back to the mirror
    let parcels = store.get_parcels().await;
    assert_eq!(parcels.len(), 2);
    assert_eq!(parcels[0].id, "p2");

    let local = local_store(&dir).get_parcels().await;
    assert_eq!(local.len(), 2);
    assert_eq!(mirror.inner.latest(Domain::Parcels).unwrap()[0]["id"], "p2");
}

#[tokio::test]
async fn test_remote_copy_wins_and_is_copied_locally() {
    let dir = TempDir::new().unwrap();
    let mirror = Arc::new(MemoryMirror::new());
    mirror
        .publish(
            Domain::Parcels,
            &serde_json::to_value(vec![parcel("remote", 50)]).unwrap(),
        )
        .await
        .unwrap();

    let local = LocalStore::open(dir.path()).unwrap();
    local
        .save(Domain::Parcels.storage_key(), &vec![parcel("local", 10)])
        .unwrap();

    let store = mirrored_store(&dir, mirror);
    let parcels = store.get_parcels().await;
    assert_eq!(parcels[0].id, "remote");

    let copied: Vec<Parcel> = local.load(Domain::Parcels.storage_key());
    assert_eq!(copied[0].id, "remote");
}

#[tokio::test]
async fn test_unavailable_mirror_falls_back_to_local() {
    let dir = TempDir::new().unwrap();
    let mirror = Arc::new(MemoryMirror::new());
    mirror.set_failing(true);
    let store = mirrored_store(&dir, mirror.clone());

    // Writes still land locally
    store.add_parcel(parcel("p1", 10)).await.unwrap();
    store.flush().await;
    assert_eq!(mirror.pin_count(), 0);

    store.invalidate_all();
    let parcels = store.get_parcels().await;
    assert_eq!(parcels.as_slice(), &[parcel("p1", 10)]);
    // A local fallback is not fresh, the next read tries the mirror again
    assert_eq!(store.cache_state(Domain::Parcels), CacheState::Stale);

    let before = mirror.resolutions();
    store.get_parcels().await;
    assert_eq!(mirror.resolutions(), before + 1);
}

#[tokio::test]
async fn test_empty_remote_collection_falls_back_to_local() {
    let dir = TempDir::new().unwrap();
    let mirror = Arc::new(MemoryMirror::new());
    mirror.publish(Domain::Trades, &json!([])).await.unwrap();
    mirror.publish(Domain::Prices, &json!({})).await.unwrap();

    let local = LocalStore::open(dir.path()).unwrap();
    local
        .save(Domain::Trades.storage_key(), &vec![listing("t1", "0xSeller", 20)])
        .unwrap();
    local
        .save(
            Domain::Prices.storage_key(),
            &json!({"p1": {"currentPrice": 4.0, "lastUpdated": "2024-01-01T00:00:00.000Z"}}),
        )
        .unwrap();

    let store = mirrored_store(&dir, mirror);
    assert_eq!(store.get_trades().await.len(), 1);
    assert_eq!(store.price_or_default("p1", 2.0).await, 4.0);
}

#[tokio::test]
async fn test_malformed_local_data_reads_as_empty() {
    let dir = TempDir::new().unwrap();
    let local = LocalStore::open(dir.path()).unwrap();
    local
        .set_item(Domain::Parcels.storage_key(), "{not json")
        .unwrap();

    let store = local_store(&dir);
    assert!(store.get_parcels().await.is_empty());

    store.add_parcel(parcel("p1", 10)).await.unwrap();
    assert_eq!(store.get_parcels().await.len(), 1);
}

#[tokio::test]
async fn test_adopt_local_keeps_freshness() {
    let dir = TempDir::new().unwrap();
    let store = local_store(&dir);
    store.add_parcel(parcel("p1", 10)).await.unwrap();
    assert_eq!(store.cache_state(Domain::Parcels), CacheState::Fresh);

    let other = local_store(&dir);
    other.add_parcel(parcel("p2", 10)).await.unwrap();

    store.adopt_local(Domain::Parcels);
    assert_eq!(store.cache_state(Domain::Parcels), CacheState::Fresh);
    assert_eq!(store.parcels_snapshot().len(), 2);
}
