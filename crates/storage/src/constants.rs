//! Centralized constants for the storage crate
//!
//! This module contains the defaults for the local key/value store and the
//! Pinata pinning service client.

// =============================================================================
// Pinata
// =============================================================================

/// Default Pinata API base URL.
pub const DEFAULT_PINATA_API_URL: &str = "https://api.pinata.cloud";

/// Default public IPFS gateway used to read pinned content.
pub const DEFAULT_PINATA_GATEWAY_URL: &str = "https://gateway.pinata.cloud";

/// Page size for pin listing. Pinata caps a single page at 1000 rows, so any
/// pin older than the newest 1000 cannot be found by a name scan.
pub const PIN_LIST_PAGE_LIMIT: u32 = 1000;

/// HTTP request timeout for Pinata and gateway calls.
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;

/// Number of attempts per Pinata call. One attempt means no retry.
pub const DEFAULT_PINATA_MAX_RETRIES: u32 = 1;

/// Upper bound on attempts per Pinata call, whatever the environment asks for.
pub const MAX_PINATA_RETRIES: u32 = 10;

/// Base delay for exponential backoff between attempts (in milliseconds).
pub const PINATA_RETRY_BASE_DELAY_MS: u64 = 500;

/// Longest wait between two attempts (in milliseconds).
pub const PINATA_RETRY_MAX_DELAY_MS: u64 = 30_000;

// =============================================================================
// Local store
// =============================================================================

/// Suffix of the scratch file written before a key file is replaced.
pub const LOCAL_STORE_TMP_SUFFIX: &str = ".tmp";
