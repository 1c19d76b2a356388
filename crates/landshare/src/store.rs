//! Read-through, write-through store for parcels, trades and prices
//!
//! Each collection is cached independently. A read serves the cache while it
//! is fresh, otherwise tries the remote mirror and falls back to the local
//! store. A mutation reads the current collection, changes a copy, commits it
//! locally, caches it as fresh and republishes it to the mirror in the
//! background.
//!
//! There is no coordination between writers: two mutations racing on the same
//! collection can both start from the same snapshot and the later commit wins.

use parking_lot::Mutex;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;
use storage::LocalStore;
use tracing::{debug, info, warn};

use crate::cache::{CacheState, DomainCache};
use crate::config::LandshareConfig;
use crate::constants::{CACHE_TTL, PLATFORM_FEE_KEY};
use crate::error::{LandshareError, Result};
use crate::mirror::RemoteMirror;
use crate::persistence::Persistence;
use crate::types::{Domain, ListingState, Parcel, PriceBook, PriceEntry, Records, Trade, now_timestamp};

pub struct Store {
    persistence: Persistence,
    parcels: Mutex<DomainCache<Vec<Parcel>>>,
    trades: Mutex<DomainCache<Vec<Trade>>>,
    prices: Mutex<DomainCache<PriceBook>>,
}

impl Store {
    pub fn new(persistence: Persistence) -> Self {
        Self::with_ttl(persistence, CACHE_TTL)
    }

    pub fn with_ttl(persistence: Persistence, ttl: Duration) -> Self {
        Self {
            persistence,
            parcels: Mutex::new(DomainCache::new(ttl)),
            trades: Mutex::new(DomainCache::new(ttl)),
            prices: Mutex::new(DomainCache::new(ttl)),
        }
    }

    /// Open the local store under `config.data_dir` with an optional mirror
    pub fn open(config: &LandshareConfig, remote: Option<Arc<dyn RemoteMirror>>) -> Result<Self> {
        config.validate()?;
        let local = LocalStore::open(config.data_dir.clone()).map_err(|e| LandshareError::Storage(e.to_string()))?;
        info!("📂 Local store at {}", local.root().display());
        Ok(Self::with_ttl(Persistence::new(local, remote), config.cache_ttl()))
    }

    pub fn persistence(&self) -> &Persistence {
        &self.persistence
    }

    pub fn local(&self) -> &LocalStore {
        self.persistence.local()
    }

    /// Cache state of one collection
    pub fn cache_state(&self, domain: Domain) -> CacheState {
        match domain {
            Domain::Parcels => self.parcels.lock().state(),
            Domain::Trades => self.trades.lock().state(),
            Domain::Prices => self.prices.lock().state(),
        }
    }

    /// Wait for outstanding remote publishes
    pub async fn flush(&self) {
        self.persistence.flush_remote().await;
    }

    // =========================================================================
    // Generic read/commit path
    // =========================================================================

    async fn load<T>(&self, domain: Domain, cache: &Mutex<DomainCache<T>>) -> Arc<T>
    where
        T: Serialize + DeserializeOwned + Default + Records,
    {
        if let Some(value) = cache.lock().fresh() {
            debug!("Serving {} from cache", domain);
            return value;
        }

        match self.persistence.fetch_remote::<T>(domain).await {
            Ok(Some(value)) if !value.is_empty() => {
                if let Err(e) = self.persistence.commit_local(domain, &value) {
                    warn!("Failed to copy remote {} into the local store: {}", domain, e);
                }
                let value = Arc::new(value);
                cache.lock().store_fresh(value.clone());
                debug!("Loaded {} from remote mirror", domain);
                return value;
            }
            Ok(_) => debug!("No remote {} available, using local store", domain),
            Err(e) => warn!("Failed to load {} from remote mirror, using local store: {}", domain, e),
        }

        let value = Arc::new(self.persistence.load_local::<T>(domain));
        cache.lock().store_unverified(value.clone());
        value
    }

    fn snapshot<T>(&self, domain: Domain, cache: &Mutex<DomainCache<T>>) -> Arc<T>
    where
        T: DeserializeOwned + Default,
    {
        if let Some(value) = cache.lock().snapshot() {
            return value;
        }
        let value = Arc::new(self.persistence.load_local::<T>(domain));
        cache.lock().store_unverified(value.clone());
        value
    }

    fn commit<T>(&self, domain: Domain, cache: &Mutex<DomainCache<T>>, value: T) -> Result<Arc<T>>
    where
        T: Serialize,
    {
        self.persistence
            .commit_local(domain, &value)
            .map_err(|e| LandshareError::Storage(e.to_string()))?;
        let value = Arc::new(value);
        cache.lock().store_fresh(value.clone());
        self.persistence.mirror_remote(domain, &*value);
        Ok(value)
    }

    /// Apply `change` to a copy of the current collection. When it returns
    /// `None` nothing is written.
    async fn mutate<T, R, F>(&self, domain: Domain, cache: &Mutex<DomainCache<T>>, change: F) -> Result<Option<R>>
    where
        T: Serialize + DeserializeOwned + Default + Records + Clone,
        F: FnOnce(&mut T) -> Option<R>,
    {
        let current = self.load(domain, cache).await;
        let mut next = (*current).clone();
        let Some(outcome) = change(&mut next) else {
            return Ok(None);
        };
        self.commit(domain, cache, next)?;
        Ok(Some(outcome))
    }

    fn invalidate(&self, domain: Domain) {
        match domain {
            Domain::Parcels => self.parcels.lock().invalidate(),
            Domain::Trades => self.trades.lock().invalidate(),
            Domain::Prices => self.prices.lock().invalidate(),
        }
    }

    /// Mark every collection stale so the next read goes to the mirror
    pub fn invalidate_all(&self) {
        for domain in Domain::ALL {
            self.invalidate(domain);
        }
    }

    /// Take the local copy of `domain` into the cache without changing its
    /// freshness. Used when another process has written the local store.
    pub fn adopt_local(&self, domain: Domain) {
        match domain {
            Domain::Parcels => {
                let value = Arc::new(self.persistence.load_local::<Vec<Parcel>>(domain));
                self.parcels.lock().adopt(value);
            }
            Domain::Trades => {
                let value = Arc::new(self.persistence.load_local::<Vec<Trade>>(domain));
                self.trades.lock().adopt(value);
            }
            Domain::Prices => {
                let value = Arc::new(self.persistence.load_local::<PriceBook>(domain));
                self.prices.lock().adopt(value);
            }
        }
        debug!("Adopted local {} into cache", domain);
    }

    /// Bypass the caches and reload every collection
    pub async fn refresh_all(&self) -> (Arc<Vec<Parcel>>, Arc<Vec<Trade>>, Arc<PriceBook>) {
        let parcels = self.refresh_parcels().await;
        let trades = self.refresh_trades().await;
        let prices = self.refresh_prices().await;
        info!(
            "Refreshed {} parcels, {} trades, {} prices",
            parcels.len(),
            trades.len(),
            prices.len()
        );
        (parcels, trades, prices)
    }

    // =========================================================================
    // Parcels
    // =========================================================================

    pub async fn get_parcels(&self) -> Arc<Vec<Parcel>> {
        self.load(Domain::Parcels, &self.parcels).await
    }

    /// Parcels from the cache regardless of age, or the local store. No network.
    pub fn parcels_snapshot(&self) -> Arc<Vec<Parcel>> {
        self.snapshot(Domain::Parcels, &self.parcels)
    }

    pub async fn refresh_parcels(&self) -> Arc<Vec<Parcel>> {
        self.invalidate(Domain::Parcels);
        self.get_parcels().await
    }

    pub async fn get_parcel(&self, parcel_id: &str) -> Option<Parcel> {
        self.get_parcels()
            .await
            .iter()
            .find(|p| p.id == parcel_id)
            .cloned()
    }

    /// Add a parcel in front of the existing ones
    pub async fn add_parcel(&self, parcel: Parcel) -> Result<()> {
        let id = parcel.id.clone();
        self.mutate(Domain::Parcels, &self.parcels, move |list: &mut Vec<Parcel>| {
            list.insert(0, parcel);
            Some(())
        })
        .await?;
        info!("Added parcel {}", id);
        Ok(())
    }

    /// Returns whether a parcel was removed
    pub async fn remove_parcel(&self, parcel_id: &str) -> Result<bool> {
        let removed = self
            .mutate(Domain::Parcels, &self.parcels, |list: &mut Vec<Parcel>| {
                let before = list.len();
                list.retain(|p| p.id != parcel_id);
                (list.len() != before).then_some(())
            })
            .await?
            .is_some();
        if removed {
            info!("Removed parcel {}", parcel_id);
        }
        Ok(removed)
    }

    /// Reduce the units left for sale, never below zero.
    /// Returns the updated parcel, or `None` when the id is unknown.
    pub async fn decrement_parcel_units(&self, parcel_id: &str, units: u64) -> Result<Option<Parcel>> {
        let updated = self
            .mutate(Domain::Parcels, &self.parcels, |list: &mut Vec<Parcel>| {
                let parcel = list.iter_mut().find(|p| p.id == parcel_id)?;
                parcel.remaining_units = Some(parcel.available_units().saturating_sub(units));
                Some(parcel.clone())
            })
            .await?;

        match &updated {
            Some(parcel) => debug!(
                "Parcel {} now has {} units remaining",
                parcel_id,
                parcel.available_units()
            ),
            None => debug!("Parcel {} not found, nothing decremented", parcel_id),
        }
        Ok(updated)
    }

    // =========================================================================
    // Trades
    // =========================================================================

    pub async fn get_trades(&self) -> Arc<Vec<Trade>> {
        self.load(Domain::Trades, &self.trades).await
    }

    pub fn trades_snapshot(&self) -> Arc<Vec<Trade>> {
        self.snapshot(Domain::Trades, &self.trades)
    }

    pub async fn refresh_trades(&self) -> Arc<Vec<Trade>> {
        self.invalidate(Domain::Trades);
        self.get_trades().await
    }

    /// Trades where `address` is the buyer or the seller
    pub async fn user_trades(&self, address: &str) -> Vec<Trade> {
        self.get_trades()
            .await
            .iter()
            .filter(|t| t.involves(address))
            .cloned()
            .collect()
    }

    /// Add a trade or listing in front of the existing ones
    pub async fn add_trade(&self, trade: Trade) -> Result<()> {
        let id = trade.id.clone();
        self.mutate(Domain::Trades, &self.trades, move |list: &mut Vec<Trade>| {
            list.insert(0, trade);
            Some(())
        })
        .await?;
        debug!("Recorded trade {}", id);
        Ok(())
    }

    /// Take `units` out of an order. A filled order is removed.
    /// Returns `None` when the order is unknown.
    pub async fn update_order_units(&self, order_id: &str, units: u64) -> Result<Option<ListingState>> {
        let state = self
            .mutate(Domain::Trades, &self.trades, |list: &mut Vec<Trade>| {
                let index = list.iter().position(|t| t.id == order_id)?;
                let state = list[index].fill(units);
                if state == ListingState::Filled {
                    list.remove(index);
                }
                Some(state)
            })
            .await?;

        if state == Some(ListingState::Filled) {
            info!("Order {} filled and removed", order_id);
        }
        Ok(state)
    }

    /// Returns whether an order was removed
    pub async fn remove_order(&self, order_id: &str) -> Result<bool> {
        let removed = self
            .mutate(Domain::Trades, &self.trades, |list: &mut Vec<Trade>| {
                let index = list.iter().position(|t| t.id == order_id)?;
                list.remove(index);
                Some(())
            })
            .await?
            .is_some();
        if removed {
            info!("Removed order {}", order_id);
        }
        Ok(removed)
    }

    // =========================================================================
    // Prices
    // =========================================================================

    pub async fn get_prices(&self) -> Arc<PriceBook> {
        self.load(Domain::Prices, &self.prices).await
    }

    pub fn prices_snapshot(&self) -> Arc<PriceBook> {
        self.snapshot(Domain::Prices, &self.prices)
    }

    pub async fn refresh_prices(&self) -> Arc<PriceBook> {
        self.invalidate(Domain::Prices);
        self.get_prices().await
    }

    pub async fn set_price(&self, parcel_id: &str, price: f64) -> Result<()> {
        self.mutate(Domain::Prices, &self.prices, |book: &mut PriceBook| {
            book.insert(
                parcel_id.to_string(),
                PriceEntry {
                    current_price: price,
                    last_updated: now_timestamp(),
                },
            );
            Some(())
        })
        .await?;
        info!("Price of parcel {} set to {}", parcel_id, price);
        Ok(())
    }

    /// Current price of a parcel, or `fallback` when none was set
    pub async fn price_or_default(&self, parcel_id: &str, fallback: f64) -> f64 {
        self.get_prices()
            .await
            .get(parcel_id)
            .map(|entry| entry.current_price)
            .unwrap_or(fallback)
    }

    pub fn price_or_default_snapshot(&self, parcel_id: &str, fallback: f64) -> f64 {
        self.prices_snapshot()
            .get(parcel_id)
            .map(|entry| entry.current_price)
            .unwrap_or(fallback)
    }

    // =========================================================================
    // Platform fee (local store only)
    // =========================================================================

    pub fn platform_fee(&self) -> String {
        self.local().get_item(PLATFORM_FEE_KEY).unwrap_or_default()
    }

    pub fn set_platform_fee(&self, value: &str) -> Result<()> {
        self.local()
            .set_item(PLATFORM_FEE_KEY, value)
            .map_err(|e| LandshareError::Storage(e.to_string()))?;
        info!("Platform fee set to {}", value);
        Ok(())
    }
}
