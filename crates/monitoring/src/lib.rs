//! # LandShare Monitoring
//!
//! Logging initialisation shared by the LandShare binaries.
//!
//! ```rust,no_run
//! use monitoring::init_logging;
//!
//! fn main() -> anyhow::Result<()> {
//!     // LOG_DESTINATION=console|file, LOG_DIR, LOG_FILE_PREFIX, RUST_LOG
//!     init_logging()?;
//!     Ok(())
//! }
//! ```

pub mod logging;

pub use logging::{LogConfig, LogDestination, init_logging, init_logging_with};
