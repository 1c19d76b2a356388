//! Marketplace flows on top of the store: tokenizing parcels, primary
//! purchases from the treasury, secondary listings and the read views
//! the dashboards show.
//!
//! Every precondition is checked before tokens move or anything is written.

use serde::Serialize;
use serde_json::json;
use std::sync::Arc;
use storage::PinMetadata;
use tracing::{info, warn};

use crate::constants::LAND_TOKEN_ADDRESS;
use crate::error::{LandshareError, Result};
use crate::holdings::{self, Portfolio};
use crate::id::IdGenerator;
use crate::settlement::Settlement;
use crate::store::Store;
use crate::types::{Parcel, Side, Trade, TradeKind, now_timestamp};

#[derive(Debug, Clone)]
pub struct TokenizeRequest {
    pub location: String,
    pub acres: f64,
    pub units: u64,
    /// Falls back to the marketplace default price
    pub price_per_unit: Option<f64>,
}

/// Parcel with units left and its current price
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AvailableParcel {
    #[serde(flatten)]
    pub parcel: Parcel,
    pub price_per_unit: f64,
}

/// Listing joined with the parcel it sells
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SellOrder {
    #[serde(flatten)]
    pub order: Trade,
    pub location: String,
    pub acres: Option<f64>,
}

pub struct Marketplace {
    store: Arc<Store>,
    settlement: Arc<dyn Settlement>,
    treasury: String,
    default_price: f64,
    ids: IdGenerator,
}

fn require_positive(parameter: &str, value: f64) -> Result<()> {
    if !(value.is_finite() && value > 0.0) {
        return Err(LandshareError::invalid(parameter, "must be a positive number"));
    }
    Ok(())
}

fn require_units(units: u64) -> Result<()> {
    if units == 0 {
        return Err(LandshareError::invalid("units", "must be at least 1"));
    }
    Ok(())
}

fn pin_name(location: &str) -> String {
    format!(
        "land-{}",
        location.split_whitespace().collect::<Vec<_>>().join("-").to_lowercase()
    )
}

impl Marketplace {
    pub fn new(
        store: Arc<Store>,
        settlement: Arc<dyn Settlement>,
        treasury: impl Into<String>,
        default_price: f64,
    ) -> Self {
        Self {
            store,
            settlement,
            treasury: treasury.into(),
            default_price,
            ids: IdGenerator::new(),
        }
    }

    pub fn store(&self) -> &Arc<Store> {
        &self.store
    }

    pub fn treasury(&self) -> &str {
        &self.treasury
    }

    pub fn default_price(&self) -> f64 {
        self.default_price
    }

    async fn check_balance(&self, address: &str, needed: f64) -> Result<()> {
        let available = self.settlement.balance_of(address).await?;
        if available < needed {
            return Err(LandshareError::InsufficientBalance { needed, available });
        }
        Ok(())
    }

    // =========================================================================
    // Admin
    // =========================================================================

    /// Pin the parcel's metadata, record the parcel and set its price
    pub async fn tokenize_parcel(&self, request: TokenizeRequest) -> Result<Parcel> {
        let location = request.location.trim();
        if location.is_empty() {
            return Err(LandshareError::invalid("location", "must not be empty"));
        }
        require_positive("acres", request.acres)?;
        require_units(request.units)?;
        let price = request.price_per_unit.unwrap_or(self.default_price);
        require_positive("price", price)?;

        let tokenized_at = now_timestamp();
        let (metadata_uri, ipfs_hash) = match self.store.persistence().remote() {
            Some(remote) => {
                let document = json!({
                    "name": format!("Land Parcel - {}", location),
                    "description": format!("{} acres of land in {}", request.acres, location),
                    "location": location,
                    "acres": request.acres,
                    "units": request.units,
                    "tokenized_at": tokenized_at,
                    "contract_address": LAND_TOKEN_ADDRESS,
                });
                let metadata = PinMetadata::named(pin_name(location))
                    .with_keyvalue("contractAddress", LAND_TOKEN_ADDRESS)
                    .with_keyvalue("location", location)
                    .with_keyvalue("acres", request.acres.to_string());

                let pinned = remote.pin_document(&document, metadata).await.map_err(|e| {
                    LandshareError::Storage(format!("Failed to pin metadata for {}: {}", location, e))
                })?;
                info!("📌 Pinned metadata for {} at {}", location, pinned.address);
                (pinned.url, pinned.address)
            }
            None => {
                warn!("No remote mirror configured, tokenizing {} without metadata", location);
                (String::new(), String::new())
            }
        };

        let parcel = Parcel {
            id: self.ids.next_id(),
            location: location.to_string(),
            acres: request.acres,
            units: request.units,
            remaining_units: Some(request.units),
            metadata_uri,
            ipfs_hash,
            created_at: tokenized_at,
        };

        self.store.add_parcel(parcel.clone()).await?;
        self.store.set_price(&parcel.id, price).await?;
        info!(
            "✅ Tokenized {} ({} acres) into {} units at {} per unit",
            parcel.location, parcel.acres, parcel.units, price
        );
        Ok(parcel)
    }

    pub async fn remove_parcel(&self, parcel_id: &str) -> Result<()> {
        if !self.store.remove_parcel(parcel_id).await? {
            return Err(LandshareError::ParcelNotFound(parcel_id.to_string()));
        }
        Ok(())
    }

    pub async fn set_price(&self, parcel_id: &str, price: f64) -> Result<()> {
        require_positive("price", price)?;
        self.store.set_price(parcel_id, price).await
    }

    pub fn set_platform_fee(&self, value: &str) -> Result<()> {
        let value = value.trim();
        if value.is_empty() {
            return Err(LandshareError::invalid("fee", "must not be empty"));
        }
        self.store.set_platform_fee(value)
    }

    // =========================================================================
    // Trading
    // =========================================================================

    /// Buy units of a parcel from the treasury at its current price
    pub async fn buy_parcel(&self, buyer: &str, parcel_id: &str, units: u64) -> Result<Trade> {
        require_units(units)?;
        let parcel = self
            .store
            .get_parcel(parcel_id)
            .await
            .ok_or_else(|| LandshareError::ParcelNotFound(parcel_id.to_string()))?;
        let available = parcel.available_units();
        if units > available {
            return Err(LandshareError::UnitsUnavailable {
                available,
                requested: units,
            });
        }

        let price = self.store.price_or_default(parcel_id, self.default_price).await;
        let total = units as f64 * price;
        self.check_balance(buyer, total).await?;

        let tx_hash = self.settlement.transfer(buyer, &self.treasury, total).await?;

        let trade = Trade {
            id: self.ids.next_id(),
            parcel_id: parcel_id.to_string(),
            kind: TradeKind::Executed {
                buyer: buyer.to_string(),
                tx_hash,
            },
            seller: self.treasury.clone(),
            units,
            price_per_unit: price,
            total,
            side: Side::Buy,
            timestamp: now_timestamp(),
        };
        self.store.add_trade(trade.clone()).await?;
        self.store.decrement_parcel_units(parcel_id, units).await?;

        info!(
            "💰 {} bought {} units of {} for {} LAND",
            buyer, units, parcel.location, total
        );
        Ok(trade)
    }

    /// Buy units from another user's listing at the listing price
    pub async fn buy_from_order(&self, buyer: &str, order_id: &str, units: u64) -> Result<Trade> {
        require_units(units)?;
        let order = self
            .store
            .get_trades()
            .await
            .iter()
            .find(|t| t.id == order_id && t.is_open_listing())
            .cloned()
            .ok_or_else(|| LandshareError::OrderNotFound(order_id.to_string()))?;
        if order.is_seller(buyer) {
            return Err(LandshareError::invalid("order", "cannot buy from your own listing"));
        }
        if units > order.units {
            return Err(LandshareError::UnitsUnavailable {
                available: order.units,
                requested: units,
            });
        }

        let total = units as f64 * order.price_per_unit;
        self.check_balance(buyer, total).await?;

        let tx_hash = self.settlement.transfer(buyer, &order.seller, total).await?;

        let trade = Trade {
            id: self.ids.next_id(),
            parcel_id: order.parcel_id.clone(),
            kind: TradeKind::Executed {
                buyer: buyer.to_string(),
                tx_hash,
            },
            seller: order.seller.clone(),
            units,
            price_per_unit: order.price_per_unit,
            total,
            side: Side::Buy,
            timestamp: now_timestamp(),
        };
        self.store.add_trade(trade.clone()).await?;
        self.store.update_order_units(order_id, units).await?;

        info!(
            "💰 {} bought {} units from order {} for {} LAND",
            buyer, units, order_id, total
        );
        Ok(trade)
    }

    /// List owned units for sale
    pub async fn list_for_sale(&self, seller: &str, parcel_id: &str, units: u64, price: f64) -> Result<Trade> {
        require_units(units)?;
        require_positive("price", price)?;

        let trades = self.store.get_trades().await;
        let owned = holdings::owned_units(&trades, seller, parcel_id);
        if owned < i64::try_from(units).unwrap_or(i64::MAX) {
            return Err(LandshareError::InsufficientUnits {
                parcel_id: parcel_id.to_string(),
                owned,
                requested: units,
            });
        }

        let listing = Trade {
            id: self.ids.next_id(),
            parcel_id: parcel_id.to_string(),
            kind: TradeKind::Listing,
            seller: seller.to_string(),
            units,
            price_per_unit: price,
            total: units as f64 * price,
            side: Side::Sell,
            timestamp: now_timestamp(),
        };
        self.store.add_trade(listing.clone()).await?;

        info!(
            "📋 {} listed {} units of {} at {} per unit",
            seller, units, parcel_id, price
        );
        Ok(listing)
    }

    pub async fn cancel_order(&self, owner: &str, order_id: &str) -> Result<()> {
        let trades = self.store.get_trades().await;
        let order = trades
            .iter()
            .find(|t| t.id == order_id && t.is_listing())
            .ok_or_else(|| LandshareError::OrderNotFound(order_id.to_string()))?;
        if !order.is_seller(owner) {
            return Err(LandshareError::invalid("order", "only the seller can cancel a listing"));
        }

        if !self.store.remove_order(order_id).await? {
            return Err(LandshareError::OrderNotFound(order_id.to_string()));
        }
        info!("🗑️ {} cancelled order {}", owner, order_id);
        Ok(())
    }

    // =========================================================================
    // Views
    // =========================================================================

    pub async fn available_parcels(&self) -> Vec<AvailableParcel> {
        let parcels = self.store.get_parcels().await;
        let prices = self.store.get_prices().await;
        parcels
            .iter()
            .filter(|p| p.available_units() > 0)
            .map(|p| AvailableParcel {
                parcel: p.clone(),
                price_per_unit: prices
                    .get(&p.id)
                    .map(|entry| entry.current_price)
                    .unwrap_or(self.default_price),
            })
            .collect()
    }

    /// Open listings by other addresses. Listings of removed parcels are skipped.
    pub async fn available_sell_orders(&self, address: &str) -> Vec<SellOrder> {
        let trades = self.store.get_trades().await;
        let parcels = self.store.get_parcels().await;
        trades
            .iter()
            .filter(|t| t.is_open_listing() && !t.is_seller(address))
            .filter_map(|t| {
                let parcel = parcels.iter().find(|p| p.id == t.parcel_id)?;
                Some(SellOrder {
                    order: t.clone(),
                    location: parcel.location.clone(),
                    acres: Some(parcel.acres),
                })
            })
            .collect()
    }

    pub async fn user_sell_orders(&self, address: &str) -> Vec<SellOrder> {
        let trades = self.store.get_trades().await;
        let parcels = self.store.get_parcels().await;
        trades
            .iter()
            .filter(|t| t.is_open_listing() && t.is_seller(address))
            .map(|t| {
                let parcel = parcels.iter().find(|p| p.id == t.parcel_id);
                SellOrder {
                    order: t.clone(),
                    location: parcel
                        .map(|p| p.location.clone())
                        .unwrap_or_else(|| "Unknown Location".to_string()),
                    acres: parcel.map(|p| p.acres),
                }
            })
            .collect()
    }

    pub async fn portfolio(&self, address: &str) -> Portfolio {
        let trades = self.store.get_trades().await;
        let parcels = self.store.get_parcels().await;
        let prices = self.store.get_prices().await;
        holdings::portfolio(&trades, &parcels, &prices, address, self.default_price)
    }
}
