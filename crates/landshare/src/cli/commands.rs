use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "landshare")]
#[command(about = "LandShare parcel, trade and price store", long_about = None)]
pub struct Cli {
    /// Directory of the local store
    #[arg(long, global = true, env = "LANDSHARE_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    /// Work from the local store only, without the Pinata mirror
    #[arg(long, global = true, default_value = "false")]
    pub offline: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List tokenized parcels
    Parcels {
        /// Bypass the cache and reload from the mirror
        #[arg(long, default_value = "false")]
        refresh: bool,
    },

    /// Tokenize a land parcel into fractional units
    Tokenize {
        #[arg(long)]
        location: String,

        #[arg(long)]
        acres: f64,

        #[arg(long)]
        units: u64,

        /// Price per unit in LAND tokens (defaults to LANDSHARE_DEFAULT_PRICE)
        #[arg(long)]
        price: Option<f64>,
    },

    /// Remove a tokenized parcel
    RemoveParcel {
        parcel_id: String,
    },

    /// Show or set parcel prices
    Price {
        #[command(subcommand)]
        command: PriceCommands,
    },

    /// Show the platform fee, or set it when a value is given
    Fee {
        value: Option<String>,
    },

    /// Buy units of a parcel from the treasury
    Buy {
        /// Buyer wallet address
        #[arg(long)]
        buyer: String,

        parcel_id: String,

        units: u64,

        /// LAND balance of the buyer before the purchase
        #[arg(long)]
        balance: f64,

        /// Hash of the token transfer made in the wallet
        #[arg(long)]
        tx_hash: String,
    },

    /// Buy units from another user's sell order
    BuyOrder {
        #[arg(long)]
        buyer: String,

        order_id: String,

        units: u64,

        #[arg(long)]
        balance: f64,

        #[arg(long)]
        tx_hash: String,
    },

    /// List owned units for sale
    List {
        /// Seller wallet address
        #[arg(long)]
        seller: String,

        parcel_id: String,

        units: u64,

        /// Asking price per unit in LAND tokens
        #[arg(long)]
        price: f64,
    },

    /// Cancel one of your sell orders
    Cancel {
        #[arg(long)]
        owner: String,

        order_id: String,
    },

    /// Show open sell orders
    Orders {
        /// Viewer address; their own orders are excluded unless --mine is set
        #[arg(long)]
        address: Option<String>,

        /// Show only the orders placed by --address
        #[arg(long, default_value = "false")]
        mine: bool,
    },

    /// Show recorded trades
    Trades {
        /// Only trades where this address is buyer or seller
        #[arg(long)]
        address: Option<String>,
    },

    /// Show holdings and returns of an address
    Portfolio {
        address: String,
    },

    /// Reload every collection from the mirror
    Refresh,

    /// Fetch pinned land metadata by IPFS hash or contract address
    Metadata {
        #[arg(long, conflicts_with = "contract")]
        hash: Option<String>,

        /// Contract address, or `land` / `fractionalization` (defaults to the LAND token)
        #[arg(long)]
        contract: Option<String>,
    },

    /// Keep the cache refreshed and follow local changes until interrupted
    Watch,
}

#[derive(Subcommand)]
pub enum PriceCommands {
    /// Show the current price of a parcel, or all prices
    Get {
        parcel_id: Option<String>,
    },

    /// Set the price per unit of a parcel
    Set {
        parcel_id: String,

        price: f64,
    },
}
