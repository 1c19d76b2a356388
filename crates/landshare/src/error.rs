//! Error types for marketplace and store operations

use thiserror::Error;

/// Result type for LandShare operations
pub type Result<T> = std::result::Result<T, LandshareError>;

#[derive(Error, Debug)]
pub enum LandshareError {
    #[error("Parcel not found: {0}")]
    ParcelNotFound(String),

    #[error("Order not found: {0}")]
    OrderNotFound(String),

    #[error("Insufficient balance: you need {needed} LAND tokens, but you have {available:.2}")]
    InsufficientBalance { needed: f64, available: f64 },

    #[error("Insufficient units: you only own {owned} units of parcel {parcel_id}")]
    InsufficientUnits {
        parcel_id: String,
        owned: i64,
        requested: u64,
    },

    #[error("Only {available} units available, {requested} requested")]
    UnitsUnavailable { available: u64, requested: u64 },

    #[error("Invalid {parameter}: {message}")]
    InvalidParameter { parameter: String, message: String },

    #[error("Settlement failed: {0}")]
    Settlement(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl LandshareError {
    pub fn invalid(parameter: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidParameter {
            parameter: parameter.into(),
            message: message.into(),
        }
    }

    /// True for failures the caller can fix by changing the request
    pub fn is_precondition(&self) -> bool {
        matches!(
            self,
            Self::ParcelNotFound(_)
                | Self::OrderNotFound(_)
                | Self::InsufficientBalance { .. }
                | Self::InsufficientUnits { .. }
                | Self::UnitsUnavailable { .. }
                | Self::InvalidParameter { .. }
        )
    }
}
