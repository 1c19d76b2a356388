//! LandShare persistence and marketplace
//!
//! Tokenized land parcels, their trades and their prices are kept in three
//! collections. Each collection lives in two places:
//!
//! - a durable local store, which is authoritative and written synchronously
//! - a remote mirror on a content-addressed pinning service, republished in the
//!   background after every change and read through a short-lived cache
//!
//! Reads prefer a fresh cache, then the mirror, then the local store. Writes go
//! to the local store first and are never lost when the mirror is unavailable.
//!
//! ```no_run
//! use landshare::{LandshareConfig, Marketplace, PaperLedger, Store, TokenizeRequest};
//! use std::sync::Arc;
//!
//! # async fn run() -> landshare::Result<()> {
//! let config = LandshareConfig::from_env();
//! let store = Arc::new(Store::open(&config, None)?);
//! let ledger = Arc::new(PaperLedger::new());
//! let market = Marketplace::new(store, ledger, &config.treasury_address, config.default_price);
//!
//! let parcel = market
//!     .tokenize_parcel(TokenizeRequest {
//!         location: "Kisumu".to_string(),
//!         acres: 5.0,
//!         units: 100,
//!         price_per_unit: Some(2.0),
//!     })
//!     .await?;
//! println!("tokenized {}", parcel.id);
//! # Ok(())
//! # }
//! ```

pub mod cache;
pub mod config;
pub mod constants;
pub mod error;
pub mod holdings;
pub mod id;
pub mod market;
pub mod mirror;
pub mod persistence;
pub mod refresh;
pub mod settlement;
pub mod store;
pub mod types;

pub use cache::{CacheState, DomainCache};
pub use config::LandshareConfig;
pub use error::{LandshareError, Result};
pub use holdings::{Investment, Portfolio, PortfolioSummary};
pub use market::{AvailableParcel, Marketplace, SellOrder, TokenizeRequest};
pub use mirror::{MemoryMirror, PinataMirror, PinnedDocument, RemoteMirror};
pub use persistence::Persistence;
pub use refresh::{RefreshHandle, RefreshWorker};
pub use settlement::{PaperLedger, RecordedSettlement, Settlement};
pub use store::Store;
pub use types::{Domain, ListingState, Parcel, PriceBook, PriceEntry, Side, Trade, TradeKind};
