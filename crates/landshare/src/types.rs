//! Parcels, trades and prices as stored in the local store and the remote mirror

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::constants::{
    LISTING_BUYER, PARCELS_INDEX_NAME, PARCELS_KEY, PRICES_INDEX_NAME, PRICES_KEY,
    TRADES_INDEX_NAME, TRADES_KEY,
};

/// The independently cached and mirrored collections
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Domain {
    Parcels,
    Trades,
    Prices,
}

impl Domain {
    pub const ALL: [Domain; 3] = [Domain::Parcels, Domain::Trades, Domain::Prices];

    /// Local store key holding the whole collection
    pub fn storage_key(&self) -> &'static str {
        match self {
            Self::Parcels => PARCELS_KEY,
            Self::Trades => TRADES_KEY,
            Self::Prices => PRICES_KEY,
        }
    }

    /// Pin name the remote copy is published and resolved under
    pub fn index_name(&self) -> &'static str {
        match self {
            Self::Parcels => PARCELS_INDEX_NAME,
            Self::Trades => TRADES_INDEX_NAME,
            Self::Prices => PRICES_INDEX_NAME,
        }
    }
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Parcels => write!(f, "parcels"),
            Self::Trades => write!(f, "trades"),
            Self::Prices => write!(f, "prices"),
        }
    }
}

/// A collection whose emptiness can be checked; remote copies that are empty
/// are treated as missing
pub trait Records {
    fn is_empty(&self) -> bool;
}

impl<T> Records for Vec<T> {
    fn is_empty(&self) -> bool {
        Vec::is_empty(self)
    }
}

impl<K, V> Records for BTreeMap<K, V> {
    fn is_empty(&self) -> bool {
        BTreeMap::is_empty(self)
    }
}

/// A tokenized land parcel split into fractional units
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Parcel {
    pub id: String,
    pub location: String,
    pub acres: f64,
    pub units: u64,
    /// Units not sold yet. Older records may lack it, which means nothing was sold.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remaining_units: Option<u64>,
    #[serde(rename = "metadataURI", default)]
    pub metadata_uri: String,
    #[serde(default)]
    pub ipfs_hash: String,
    pub created_at: String,
}

impl Parcel {
    pub fn available_units(&self) -> u64 {
        self.remaining_units.unwrap_or(self.units).min(self.units)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Buy,
    Sell,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Buy => write!(f, "buy"),
            Self::Sell => write!(f, "sell"),
        }
    }
}

/// Whether a trade record is a settled trade or a standing sell listing
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TradeKind {
    Executed { buyer: String, tx_hash: String },
    Listing,
}

/// Result of filling part of a listing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListingState {
    Active,
    Filled,
}

/// A settled trade or a sell listing
///
/// Listings keep their remaining units in `units`; `total` is fixed when the
/// record is created and never recomputed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "TradeRecord", into = "TradeRecord")]
pub struct Trade {
    pub id: String,
    pub parcel_id: String,
    pub kind: TradeKind,
    pub seller: String,
    pub units: u64,
    pub price_per_unit: f64,
    pub total: f64,
    pub side: Side,
    pub timestamp: String,
}

impl Trade {
    pub fn is_listing(&self) -> bool {
        matches!(self.kind, TradeKind::Listing)
    }

    /// Buyer address of an executed trade
    pub fn buyer(&self) -> Option<&str> {
        match &self.kind {
            TradeKind::Executed { buyer, .. } => Some(buyer),
            TradeKind::Listing => None,
        }
    }

    pub fn tx_hash(&self) -> Option<&str> {
        match &self.kind {
            TradeKind::Executed { tx_hash, .. } => Some(tx_hash),
            TradeKind::Listing => None,
        }
    }

    pub fn is_buyer(&self, address: &str) -> bool {
        self.buyer()
            .is_some_and(|buyer| buyer.eq_ignore_ascii_case(address))
    }

    pub fn is_seller(&self, address: &str) -> bool {
        self.seller.eq_ignore_ascii_case(address)
    }

    pub fn involves(&self, address: &str) -> bool {
        self.is_buyer(address) || self.is_seller(address)
    }

    /// Listing that can still be bought from
    pub fn is_open_listing(&self) -> bool {
        self.is_listing() && self.side == Side::Sell && self.units > 0
    }

    /// Change in `address`'s units of this parcel caused by the record
    pub fn holding_delta(&self, address: &str) -> i64 {
        let units = i64::try_from(self.units).unwrap_or(i64::MAX);
        let mut delta = 0;
        if self.is_buyer(address) {
            delta += units;
        }
        if self.is_seller(address) {
            delta -= units;
        }
        delta
    }

    /// Take `units` out of a listing
    pub fn fill(&mut self, units: u64) -> ListingState {
        self.units = self.units.saturating_sub(units);
        if self.units == 0 {
            ListingState::Filled
        } else {
            ListingState::Active
        }
    }
}

/// Stored shape of a trade, with `"listing"` as the buyer of sell listings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TradeRecord {
    pub id: String,
    pub parcel_id: String,
    pub buyer: String,
    pub seller: String,
    pub units: u64,
    pub price_per_unit: f64,
    pub total: f64,
    pub side: Side,
    #[serde(default)]
    pub tx_hash: String,
    pub timestamp: String,
}

impl From<TradeRecord> for Trade {
    fn from(record: TradeRecord) -> Self {
        let kind = if record.buyer == LISTING_BUYER {
            TradeKind::Listing
        } else {
            TradeKind::Executed {
                buyer: record.buyer,
                tx_hash: record.tx_hash,
            }
        };

        Self {
            id: record.id,
            parcel_id: record.parcel_id,
            kind,
            seller: record.seller,
            units: record.units,
            price_per_unit: record.price_per_unit,
            total: record.total,
            side: record.side,
            timestamp: record.timestamp,
        }
    }
}

impl From<Trade> for TradeRecord {
    fn from(trade: Trade) -> Self {
        let (buyer, tx_hash) = match trade.kind {
            TradeKind::Executed { buyer, tx_hash } => (buyer, tx_hash),
            TradeKind::Listing => (LISTING_BUYER.to_string(), String::new()),
        };

        Self {
            id: trade.id,
            parcel_id: trade.parcel_id,
            buyer,
            seller: trade.seller,
            units: trade.units,
            price_per_unit: trade.price_per_unit,
            total: trade.total,
            side: trade.side,
            tx_hash,
            timestamp: trade.timestamp,
        }
    }
}

/// Current quoted price for a parcel
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceEntry {
    pub current_price: f64,
    pub last_updated: String,
}

/// Prices keyed by parcel id
pub type PriceBook = BTreeMap<String, PriceEntry>;

/// Current time as an RFC 3339 UTC string with millisecond precision
pub fn now_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_listing_uses_sentinel_buyer_on_the_wire() {
        let listing = Trade {
            id: "1700000000000".to_string(),
            parcel_id: "p1".to_string(),
            kind: TradeKind::Listing,
            seller: "0xSeller".to_string(),
            units: 20,
            price_per_unit: 3.0,
            total: 60.0,
            side: Side::Sell,
            timestamp: "2024-01-01T00:00:00.000Z".to_string(),
        };

        let value = serde_json::to_value(&listing).unwrap();
        assert_eq!(value["buyer"], "listing");
        assert_eq!(value["txHash"], "");
        assert_eq!(value["side"], "sell");
        assert_eq!(value["parcelId"], "p1");
        assert_eq!(value["pricePerUnit"], 3.0);

        let decoded: Trade = serde_json::from_value(value).unwrap();
        assert_eq!(decoded, listing);
        assert!(decoded.is_open_listing());
    }

    #[test]
    fn test_executed_trade_from_stored_record() {
        let trade: Trade = serde_json::from_value(json!({
            "id": "1", "parcelId": "p1", "buyer": "0xAbC", "seller": "0xdef",
            "units": 30, "pricePerUnit": 2, "total": 60, "side": "buy",
            "txHash": "0xfeed", "timestamp": "2024-01-01T00:00:00.000Z"
        }))
        .unwrap();

        assert_eq!(trade.buyer(), Some("0xAbC"));
        assert_eq!(trade.tx_hash(), Some("0xfeed"));
        assert!(trade.is_buyer("0xabc"));
        assert!(trade.is_seller("0xDEF"));
        assert_eq!(trade.holding_delta("0xABC"), 30);
        assert_eq!(trade.holding_delta("0xdef"), -30);
        assert_eq!(trade.holding_delta("0x123"), 0);
    }

    #[test]
    fn test_parcel_wire_names_and_legacy_remaining_units() {
        let parcel: Parcel = serde_json::from_value(json!({
            "id": "1", "location": "A", "acres": 5.5, "units": 100,
            "metadataURI": "https://gateway.pinata.cloud/ipfs/Qm", "ipfsHash": "Qm",
            "createdAt": "2024-01-01T00:00:00.000Z"
        }))
        .unwrap();

        assert_eq!(parcel.remaining_units, None);
        assert_eq!(parcel.available_units(), 100);

        let value = serde_json::to_value(Parcel {
            remaining_units: Some(70),
            ..parcel
        })
        .unwrap();
        assert_eq!(value["remainingUnits"], 70);
        assert_eq!(value["metadataURI"], "https://gateway.pinata.cloud/ipfs/Qm");
        assert_eq!(value["ipfsHash"], "Qm");
    }

    #[test]
    fn test_fill_transitions_to_filled() {
        let mut trade: Trade = serde_json::from_value(json!({
            "id": "1", "parcelId": "p1", "buyer": "listing", "seller": "0xS",
            "units": 20, "pricePerUnit": 3, "total": 60, "side": "sell",
            "txHash": "", "timestamp": "2024-01-01T00:00:00.000Z"
        }))
        .unwrap();

        assert_eq!(trade.fill(5), ListingState::Active);
        assert_eq!(trade.units, 15);
        assert_eq!(trade.total, 60.0);
        assert_eq!(trade.fill(40), ListingState::Filled);
        assert_eq!(trade.units, 0);
    }

    #[test]
    fn test_domain_keys() {
        assert_eq!(Domain::Parcels.storage_key(), "landshare_tokenized_parcels_v1");
        assert_eq!(Domain::Trades.index_name(), "landshare_master_trades_index");
        assert_eq!(Domain::Prices.to_string(), "prices");
    }

    #[test]
    fn test_timestamp_format() {
        let ts = now_timestamp();
        assert!(ts.ends_with('Z'));
        assert_eq!(ts.len(), "2024-01-01T00:00:00.000Z".len());
    }
}
