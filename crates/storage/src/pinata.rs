use anyhow::{Result, anyhow};
use reqwest::{RequestBuilder, Response};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::env;
use std::time::Instant;
use tokio::time::{Duration, sleep};
use tracing::{debug, error, warn};

use crate::constants::{
    DEFAULT_HTTP_TIMEOUT_SECS, DEFAULT_PINATA_API_URL, DEFAULT_PINATA_GATEWAY_URL,
    DEFAULT_PINATA_MAX_RETRIES, MAX_PINATA_RETRIES, PIN_LIST_PAGE_LIMIT,
    PINATA_RETRY_BASE_DELAY_MS, PINATA_RETRY_MAX_DELAY_MS,
};

#[derive(Debug, Clone)]
pub struct PinataConfig {
    /// Bearer credential. Without it every call fails and callers stay local-only.
    pub jwt: Option<String>,
    pub api_url: String,
    pub gateway_url: String,
    pub http_timeout_secs: u64,
    pub max_retries: u32,
}

impl Default for PinataConfig {
    fn default() -> Self {
        Self {
            jwt: None,
            api_url: DEFAULT_PINATA_API_URL.to_string(),
            gateway_url: DEFAULT_PINATA_GATEWAY_URL.to_string(),
            http_timeout_secs: DEFAULT_HTTP_TIMEOUT_SECS,
            max_retries: DEFAULT_PINATA_MAX_RETRIES,
        }
    }
}

impl PinataConfig {
    /// Read `PINATA_JWT`, `PINATA_API_URL`, `PINATA_GATEWAY_URL`,
    /// `PINATA_HTTP_TIMEOUT_SECS` and `PINATA_MAX_RETRIES`
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            jwt: env::var("PINATA_JWT").ok().filter(|jwt| !jwt.trim().is_empty()),
            api_url: env::var("PINATA_API_URL").unwrap_or(defaults.api_url),
            gateway_url: env::var("PINATA_GATEWAY_URL").unwrap_or(defaults.gateway_url),
            http_timeout_secs: env::var("PINATA_HTTP_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.http_timeout_secs),
            max_retries: env::var("PINATA_MAX_RETRIES")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.max_retries)
                .clamp(1, MAX_PINATA_RETRIES),
        }
    }

    pub fn with_jwt(mut self, jwt: impl Into<String>) -> Self {
        self.jwt = Some(jwt.into());
        self
    }

    /// Attempts per call, between 1 and `MAX_PINATA_RETRIES`
    pub fn attempts(&self) -> u32 {
        self.max_retries.clamp(1, MAX_PINATA_RETRIES)
    }

    pub fn is_configured(&self) -> bool {
        self.jwt.is_some()
    }

    /// Public gateway URL for a content hash: `<gateway>/ipfs/<hash>`
    pub fn gateway_url(&self, ipfs_hash: &str) -> String {
        format!("{}/ipfs/{}", self.gateway_url.trim_end_matches('/'), ipfs_hash)
    }

    fn api(&self, path: &str) -> String {
        format!("{}{}", self.api_url.trim_end_matches('/'), path)
    }
}

/// Name and key/value tags attached to a pin
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PinMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub keyvalues: BTreeMap<String, String>,
}

impl PinMetadata {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            keyvalues: BTreeMap::new(),
        }
    }

    pub fn with_keyvalue(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.keyvalues.insert(key.into(), value.into());
        self
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct PinResponse {
    ipfs_hash: String,
    #[serde(default)]
    pin_size: u64,
    #[serde(default)]
    timestamp: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PinResult {
    pub ipfs_hash: String,
    pub ipfs_url: String,
    pub pin_size: u64,
    pub timestamp: String,
}

/// One row of the pin listing
#[derive(Debug, Clone, Deserialize)]
pub struct PinRow {
    pub ipfs_pin_hash: String,
    #[serde(default)]
    pub size: u64,
    #[serde(default)]
    pub date_pinned: Option<String>,
    #[serde(default)]
    pub metadata: PinRowMetadata,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PinRowMetadata {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub keyvalues: Option<BTreeMap<String, Value>>,
}

impl PinRow {
    fn keyvalue(&self, key: &str) -> Option<&str> {
        self.metadata.keyvalues.as_ref()?.get(key)?.as_str()
    }
}

#[derive(Debug, Deserialize)]
struct PinListResponse {
    #[serde(default)]
    rows: Vec<PinRow>,
}

/// First row whose metadata name equals `name`
pub fn match_by_name<'a>(rows: &'a [PinRow], name: &str) -> Option<&'a PinRow> {
    rows.iter()
        .find(|row| row.metadata.name.as_deref() == Some(name))
}

/// First row tagged with `contractAddress == address` or whose name mentions it
pub fn match_by_contract_address<'a>(rows: &'a [PinRow], address: &str) -> Option<&'a PinRow> {
    rows.iter().find(|row| {
        row.keyvalue("contractAddress") == Some(address)
            || row
                .metadata
                .name
                .as_deref()
                .is_some_and(|name| name.contains(address))
    })
}

/// HTTP client for the Pinata pinning API and its public gateway
pub struct PinataClient {
    config: PinataConfig,
    client: reqwest::Client,
}

impl PinataClient {
    pub fn new(config: PinataConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.http_timeout_secs))
            .build()
            .map_err(|e| anyhow!("Failed to create HTTP client: {}", e))?;
        Ok(Self { config, client })
    }

    pub fn from_env() -> Result<Self> {
        Self::new(PinataConfig::from_env())
    }

    pub fn config(&self) -> &PinataConfig {
        &self.config
    }

    pub fn is_configured(&self) -> bool {
        self.config.is_configured()
    }

    pub fn gateway_url(&self, ipfs_hash: &str) -> String {
        self.config.gateway_url(ipfs_hash)
    }

    fn jwt(&self) -> Result<&str> {
        self.config
            .jwt
            .as_deref()
            .ok_or_else(|| anyhow!("Missing PINATA_JWT; remote pinning is disabled"))
    }

    /// Pin a JSON document. Every call creates a new immutable pin.
    pub async fn pin_json(&self, content: &Value, metadata: &PinMetadata) -> Result<PinResult> {
        let jwt = self.jwt()?;
        let url = self.config.api("/pinning/pinJSONToIPFS");
        let body = serde_json::json!({
            "pinataContent": content,
            "pinataMetadata": metadata,
        });

        let response = self
            .send_with_retry("pinJSONToIPFS", || {
                self.client.post(&url).bearer_auth(jwt).json(&body)
            })
            .await?;

        let pinned: PinResponse = response
            .json()
            .await
            .map_err(|e| anyhow!("Failed to parse Pinata pin response: {}", e))?;

        debug!(
            "Pinned {:?} as {} ({} bytes)",
            metadata.name, pinned.ipfs_hash, pinned.pin_size
        );

        Ok(PinResult {
            ipfs_url: self.gateway_url(&pinned.ipfs_hash),
            ipfs_hash: pinned.ipfs_hash,
            pin_size: pinned.pin_size,
            timestamp: pinned.timestamp,
        })
    }

    /// List pinned content, newest first, capped at one page of 1000 rows
    pub async fn list_pins(&self) -> Result<Vec<PinRow>> {
        let jwt = self.jwt()?;
        let url = self.config.api(&format!(
            "/data/pinList?status=pinned&pageLimit={}",
            PIN_LIST_PAGE_LIMIT
        ));

        let response = self
            .send_with_retry("pinList", || self.client.get(&url).bearer_auth(jwt))
            .await?;

        let list: PinListResponse = response
            .json()
            .await
            .map_err(|e| anyhow!("Failed to parse Pinata list response: {}", e))?;

        debug!("Pinata listed {} pins", list.rows.len());
        Ok(list.rows)
    }

    /// Content hash of the newest pin named `name`
    pub async fn find_pin_by_name(&self, name: &str) -> Result<Option<String>> {
        let rows = self.list_pins().await?;
        Ok(match_by_name(&rows, name).map(|row| row.ipfs_pin_hash.clone()))
    }

    /// Content hash of the newest pin describing `contract_address`
    pub async fn find_pin_by_contract_address(
        &self,
        contract_address: &str,
    ) -> Result<Option<String>> {
        let rows = self.list_pins().await?;
        Ok(match_by_contract_address(&rows, contract_address).map(|row| row.ipfs_pin_hash.clone()))
    }

    /// Fetch a pinned JSON document through the public gateway
    pub async fn fetch_json(&self, ipfs_hash: &str) -> Result<Value> {
        if ipfs_hash.is_empty() {
            return Err(anyhow!("ipfs hash is not provided"));
        }

        let url = self.gateway_url(ipfs_hash);
        let response = self
            .send_with_retry("gateway fetch", || self.client.get(&url))
            .await?;

        response
            .json()
            .await
            .map_err(|e| anyhow!("Failed to parse content of {}: {}", ipfs_hash, e))
    }

    /// Send a request, retrying transport errors and 5xx responses with
    /// exponential backoff. Any other non-success status is returned as an error.
    async fn send_with_retry<F>(&self, operation: &str, build: F) -> Result<Response>
    where
        F: Fn() -> RequestBuilder,
    {
        let max_retries = self.config.attempts();

        for attempt in 1..=max_retries {
            debug!("Pinata {} (attempt {}/{})", operation, attempt, max_retries);
            let start = Instant::now();
            let retry_delay = retry_delay_ms(attempt);

            let response = match build().send().await {
                Ok(resp) => resp,
                Err(e) => {
                    if attempt < max_retries {
                        warn!(
                            "Pinata {} failed (attempt {}/{}): {}. Retrying in {} ms...",
                            operation, attempt, max_retries, e, retry_delay
                        );
                        sleep(Duration::from_millis(retry_delay)).await;
                        continue;
                    }
                    error!(
                        "Pinata {} failed after {} attempts: {}",
                        operation, max_retries, e
                    );
                    return Err(anyhow!("Pinata {} request failed: {}", operation, e));
                }
            };

            debug!("Pinata {} completed in {:?}", operation, start.elapsed());

            let status = response.status();
            if status.is_success() {
                return Ok(response);
            }

            if status.is_server_error() && attempt < max_retries {
                warn!(
                    "Pinata {} returned {} (attempt {}/{}). Retrying in {} ms...",
                    operation, status, attempt, max_retries, retry_delay
                );
                sleep(Duration::from_millis(retry_delay)).await;
                continue;
            }

            let text = response.text().await.unwrap_or_default();
            return Err(anyhow!("Pinata error {}: {}", status, text));
        }

        Err(anyhow!("Pinata {} failed after all retry attempts", operation))
    }
}

/// Backoff before the attempt after `attempt`: doubles each time, capped
fn retry_delay_ms(attempt: u32) -> u64 {
    2_u64
        .checked_pow(attempt.saturating_sub(1))
        .map_or(u64::MAX, |factor| PINATA_RETRY_BASE_DELAY_MS.saturating_mul(factor))
        .min(PINATA_RETRY_MAX_DELAY_MS)
}
