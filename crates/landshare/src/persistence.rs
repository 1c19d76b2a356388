//! Dual persistence: an authoritative local store and a best-effort remote mirror
//!
//! A mutation is committed locally before the call returns. The remote copy is
//! republished in the background; until that publish lands (or if it fails)
//! the remote copy lags the local one. Publishes of one domain land in commit
//! order. Concurrent writers on the remote side overwrite each other: the last
//! publish wins.

use anyhow::{Result, anyhow};
use parking_lot::Mutex;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::sync::Arc;
use storage::LocalStore;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::mirror::RemoteMirror;
use crate::types::Domain;

pub struct Persistence {
    local: LocalStore,
    remote: Option<Arc<dyn RemoteMirror>>,
    /// Newest publish task per domain; each task waits for the one before it
    tails: Mutex<HashMap<Domain, JoinHandle<()>>>,
}

impl Persistence {
    pub fn new(local: LocalStore, remote: Option<Arc<dyn RemoteMirror>>) -> Self {
        if remote.is_none() {
            info!("No remote mirror configured, persisting to the local store only");
        }
        Self {
            local,
            remote,
            tails: Mutex::new(HashMap::new()),
        }
    }

    pub fn local_only(local: LocalStore) -> Self {
        Self::new(local, None)
    }

    pub fn local(&self) -> &LocalStore {
        &self.local
    }

    pub fn remote(&self) -> Option<&Arc<dyn RemoteMirror>> {
        self.remote.as_ref()
    }

    /// Read the local copy of `domain`; missing or malformed data gives the default
    pub fn load_local<T>(&self, domain: Domain) -> T
    where
        T: DeserializeOwned + Default,
    {
        self.local.load(domain.storage_key())
    }

    /// Write the full collection to the local store
    pub fn commit_local<T>(&self, domain: Domain, value: &T) -> Result<()>
    where
        T: Serialize,
    {
        self.local.save(domain.storage_key(), value)
    }

    /// Republish the full collection in the background. Failures are logged only.
    pub fn mirror_remote<T>(&self, domain: Domain, value: &T)
    where
        T: Serialize,
    {
        let Some(remote) = self.remote.clone() else {
            return;
        };

        let payload = match serde_json::to_value(value) {
            Ok(payload) => payload,
            Err(e) => {
                error!("Failed to serialize {} for the remote mirror: {}", domain, e);
                return;
            }
        };

        // Hold the lock across spawn so the chain order matches commit order
        let mut tails = self.tails.lock();
        let previous = tails.remove(&domain);
        let handle = tokio::spawn(async move {
            if let Some(previous) = previous {
                if let Err(e) = previous.await {
                    warn!("Earlier {} publish ended abnormally: {}", domain, e);
                }
            }
            match remote.publish(domain, &payload).await {
                Ok(address) => debug!("Published {} to remote mirror as {}", domain, address),
                Err(e) => error!(
                    "Failed to publish {} to remote mirror, remote copy is now behind: {}",
                    domain, e
                ),
            }
        });
        tails.insert(domain, handle);
    }

    /// Wait for every background publish started so far
    pub async fn flush_remote(&self) {
        let tails: Vec<JoinHandle<()>> = self.tails.lock().drain().map(|(_, tail)| tail).collect();
        for tail in tails {
            if let Err(e) = tail.await {
                warn!("Remote publish task ended abnormally: {}", e);
            }
        }
    }

    /// Resolve, fetch and decode the remote copy of `domain`.
    ///
    /// `Ok(None)` means there is no mirror or nothing has been published yet.
    pub async fn fetch_remote<T>(&self, domain: Domain) -> Result<Option<T>>
    where
        T: DeserializeOwned,
    {
        let Some(remote) = &self.remote else {
            return Ok(None);
        };

        let Some(address) = remote.resolve(domain).await? else {
            debug!("No remote copy of {} has been published", domain);
            return Ok(None);
        };

        let content = remote.fetch(&address).await?;
        let value = serde_json::from_value(content)
            .map_err(|e| anyhow!("Remote copy of {} at {} is malformed: {}", domain, address, e))?;
        Ok(Some(value))
    }
}
