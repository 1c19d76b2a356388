//! Storage keys, mirror tags and marketplace defaults

use std::time::Duration;

// =============================================================================
// Local store keys
// =============================================================================

pub const PARCELS_KEY: &str = "landshare_tokenized_parcels_v1";
pub const TRADES_KEY: &str = "landshare_trades_v1";
pub const PRICES_KEY: &str = "landshare_prices_v1";
pub const PLATFORM_FEE_KEY: &str = "landshare_platform_fee_v1";

// =============================================================================
// Remote mirror tags
// =============================================================================

pub const PARCELS_INDEX_NAME: &str = "landshare_master_parcels_index";
pub const TRADES_INDEX_NAME: &str = "landshare_master_trades_index";
pub const PRICES_INDEX_NAME: &str = "landshare_master_prices_index";

// =============================================================================
// Cache and refresh
// =============================================================================

pub const CACHE_TTL_SECS: u64 = 30;
pub const CACHE_TTL: Duration = Duration::from_secs(CACHE_TTL_SECS);
pub const REFRESH_INTERVAL_SECS: u64 = 30;
pub const LOCAL_WATCH_INTERVAL_MS: u64 = 1000;

// =============================================================================
// Marketplace
// =============================================================================

/// Buyer value that marks a standing sell listing in the stored trade records
pub const LISTING_BUYER: &str = "listing";

/// Price per unit used when a parcel has no price entry
pub const DEFAULT_PRICE_PER_UNIT: f64 = 2.0;

/// Admin wallet receiving payment for primary parcel sales
pub const DEFAULT_TREASURY_ADDRESS: &str = "0xC87dAE04cC23b8C078acE5E30F5B2575535a50B0";

/// LAND token contract; tokenized parcel metadata is tagged with it
pub const LAND_TOKEN_ADDRESS: &str = "0x2089cb616333462e0987105f137DD8Af2C190957";

/// Fractionalization contract
pub const FRACTIONALIZATION_ADDRESS: &str = "0x7eFd92FAB22CAD2a2EBaF5795D43e9eE1367dbf6";
