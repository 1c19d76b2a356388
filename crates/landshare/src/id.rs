use chrono::Utc;
use std::sync::atomic::{AtomicI64, Ordering};

/// Record ids are creation times in epoch milliseconds. Ids handed out by one
/// generator strictly increase, so records created within the same millisecond
/// still get distinct ids.
#[derive(Debug, Default)]
pub struct IdGenerator {
    last: AtomicI64,
}

impl IdGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next_id(&self) -> String {
        let now = Utc::now().timestamp_millis();
        let mut last = self.last.load(Ordering::Relaxed);
        loop {
            let candidate = now.max(last + 1);
            match self
                .last
                .compare_exchange_weak(last, candidate, Ordering::Relaxed, Ordering::Relaxed)
            {
                Ok(_) => return candidate.to_string(),
                Err(current) => last = current,
            }
        }
    }
}
