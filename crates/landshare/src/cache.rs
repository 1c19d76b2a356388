use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

/// Freshness of a cached collection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheState {
    /// Nothing cached
    Empty,
    /// Cached and younger than the TTL
    Fresh,
    /// Cached but expired, invalidated, or only known from the local store
    Stale,
}

/// Cache for one collection with a fixed time-to-live
///
/// - Values are shared as `Arc<T>`, so reads within the TTL hand out the same snapshot
/// - A value loaded from the local fallback is kept for snapshots but never
///   counts as fresh, so the next read retries the remote copy
#[derive(Debug)]
pub struct DomainCache<T> {
    value: Option<Arc<T>>,
    fetched_at: Option<Instant>,
    ttl: Duration,
}

impl<T> DomainCache<T> {
    pub fn new(ttl: Duration) -> Self {
        Self {
            value: None,
            fetched_at: None,
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn state(&self) -> CacheState {
        match (&self.value, self.fetched_at) {
            (None, _) => CacheState::Empty,
            (Some(_), Some(at)) if at.elapsed() < self.ttl => CacheState::Fresh,
            (Some(_), _) => CacheState::Stale,
        }
    }

    /// The cached value if it is still fresh
    pub fn fresh(&self) -> Option<Arc<T>> {
        match self.state() {
            CacheState::Fresh => self.value.clone(),
            _ => None,
        }
    }

    /// The cached value regardless of age
    pub fn snapshot(&self) -> Option<Arc<T>> {
        self.value.clone()
    }

    /// Time since the value was last confirmed fresh
    pub fn age(&self) -> Option<Duration> {
        self.fetched_at.map(|at| at.elapsed())
    }

    /// Store a value that is current: a remote hit or the result of a local mutation
    pub fn store_fresh(&mut self, value: Arc<T>) {
        self.value = Some(value);
        self.fetched_at = Some(Instant::now());
    }

    /// Store a value read from the local fallback without marking it fresh
    pub fn store_unverified(&mut self, value: Arc<T>) {
        self.value = Some(value);
        self.fetched_at = None;
    }

    /// Replace the value and keep the current freshness
    pub fn adopt(&mut self, value: Arc<T>) {
        self.value = Some(value);
    }

    /// Force the next read past the freshness check
    pub fn invalidate(&mut self) {
        self.fetched_at = None;
    }
}
