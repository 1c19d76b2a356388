//! Remote replica of the collections on a content-addressed pinning service
//!
//! The mirror has no authority of its own: every publish pins the whole
//! collection as a new immutable document, and resolution picks the newest pin
//! carrying the collection's index name. Old pins are never removed.

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use base64::{Engine as _, engine::general_purpose};
use parking_lot::Mutex;
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use storage::{PinMetadata, PinataClient, PinataConfig};
use tracing::debug;

use crate::types::Domain;

/// A document stored on the mirror
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PinnedDocument {
    /// Content address
    pub address: String,
    /// Public URL the document can be fetched from
    pub url: String,
}

#[async_trait]
pub trait RemoteMirror: Send + Sync {
    /// Pin an arbitrary JSON document
    async fn pin_document(&self, content: &Value, metadata: PinMetadata) -> Result<PinnedDocument>;

    /// Content address of the newest published copy of `domain`, if any
    async fn resolve(&self, domain: Domain) -> Result<Option<String>>;

    /// Fetch a document by content address
    async fn fetch(&self, address: &str) -> Result<Value>;

    /// Publish the full collection for `domain` under its index name
    async fn publish(&self, domain: Domain, payload: &Value) -> Result<String> {
        let pinned = self
            .pin_document(payload, PinMetadata::named(domain.index_name()))
            .await?;
        Ok(pinned.address)
    }
}

/// Mirror backed by the Pinata API
pub struct PinataMirror {
    client: PinataClient,
}

impl PinataMirror {
    pub fn new(client: PinataClient) -> Self {
        Self { client }
    }

    /// Mirror for `config`, or `None` when no JWT is configured
    pub fn from_config(config: PinataConfig) -> Result<Option<Arc<dyn RemoteMirror>>> {
        if !config.is_configured() {
            return Ok(None);
        }
        let client = PinataClient::new(config)?;
        Ok(Some(Arc::new(Self::new(client))))
    }

    pub fn client(&self) -> &PinataClient {
        &self.client
    }
}

#[async_trait]
impl RemoteMirror for PinataMirror {
    async fn pin_document(&self, content: &Value, metadata: PinMetadata) -> Result<PinnedDocument> {
        let pinned = self.client.pin_json(content, &metadata).await?;
        Ok(PinnedDocument {
            address: pinned.ipfs_hash,
            url: pinned.ipfs_url,
        })
    }

    async fn resolve(&self, domain: Domain) -> Result<Option<String>> {
        self.client.find_pin_by_name(domain.index_name()).await
    }

    async fn fetch(&self, address: &str) -> Result<Value> {
        self.client.fetch_json(address).await
    }
}

struct MemoryPin {
    address: String,
    metadata: PinMetadata,
    content: Value,
}

/// In-process mirror with the same content-addressed, append-only behaviour
///
/// Used for offline runs and tests. It can be switched into a failing mode to
/// exercise the local fallback.
#[derive(Default)]
pub struct MemoryMirror {
    pins: Mutex<Vec<MemoryPin>>,
    failing: AtomicBool,
    resolutions: AtomicUsize,
}

impl MemoryMirror {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every call fail (or succeed again)
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Number of `resolve` calls served so far
    pub fn resolutions(&self) -> usize {
        self.resolutions.load(Ordering::SeqCst)
    }

    /// Number of pins ever made
    pub fn pin_count(&self) -> usize {
        self.pins.lock().len()
    }

    /// Newest content published for `domain`
    pub fn latest(&self, domain: Domain) -> Option<Value> {
        self.pins
            .lock()
            .iter()
            .rev()
            .find(|pin| pin.metadata.name.as_deref() == Some(domain.index_name()))
            .map(|pin| pin.content.clone())
    }

    fn check(&self) -> Result<()> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(anyhow!("memory mirror is unavailable"));
        }
        Ok(())
    }

    fn address_of(content: &Value) -> String {
        let mut hasher = Sha256::new();
        hasher.update(content.to_string().as_bytes());
        general_purpose::URL_SAFE_NO_PAD.encode(hasher.finalize())
    }
}

#[async_trait]
impl RemoteMirror for MemoryMirror {
    async fn pin_document(&self, content: &Value, metadata: PinMetadata) -> Result<PinnedDocument> {
        self.check()?;
        let address = Self::address_of(content);
        debug!("Memory mirror pinned {:?} as {}", metadata.name, address);
        self.pins.lock().push(MemoryPin {
            address: address.clone(),
            metadata,
            content: content.clone(),
        });
        Ok(PinnedDocument {
            url: format!("memory://ipfs/{}", address),
            address,
        })
    }

    async fn resolve(&self, domain: Domain) -> Result<Option<String>> {
        self.resolutions.fetch_add(1, Ordering::SeqCst);
        self.check()?;
        Ok(self
            .pins
            .lock()
            .iter()
            .rev()
            .find(|pin| pin.metadata.name.as_deref() == Some(domain.index_name()))
            .map(|pin| pin.address.clone()))
    }

    async fn fetch(&self, address: &str) -> Result<Value> {
        self.check()?;
        self.pins
            .lock()
            .iter()
            .find(|pin| pin.address == address)
            .map(|pin| pin.content.clone())
            .ok_or_else(|| anyhow!("no content pinned at {}", address))
    }
}
