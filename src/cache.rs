// src/cache.rs

use crate::domain::Listing;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// Holds the combined listing set for a limited time so that every request
/// doesn't go back to SQLite. Analysis functions never see this; they get a
/// snapshot.
pub struct ListingCache {
    ttl: Duration,
    slot: Mutex<Option<CachedListings>>,
}

struct CachedListings {
    loaded_at: Instant,
    listings: Arc<Vec<Listing>>,
}

impl ListingCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            slot: Mutex::new(None),
        }
    }

    /// Returns the cached snapshot, or runs `load` when empty or expired.
    pub fn get_or_load<F, E>(&self, load: F) -> Result<Arc<Vec<Listing>>, E>
    where
        F: FnOnce() -> Result<Vec<Listing>, E>,
    {
        self.get_or_load_at(Instant::now(), load)
    }

    pub fn get_or_load_at<F, E>(&self, now: Instant, load: F) -> Result<Arc<Vec<Listing>>, E>
    where
        F: FnOnce() -> Result<Vec<Listing>, E>,
    {
        // A poisoned lock only means another worker panicked mid-load; the slot is still usable.
        let mut slot = self.slot.lock().unwrap_or_else(|e| e.into_inner());

        if let Some(cached) = slot.as_ref() {
            if now.saturating_duration_since(cached.loaded_at) < self.ttl {
                return Ok(Arc::clone(&cached.listings));
            }
            tracing::debug!("listing cache expired");
        }

        let listings = Arc::new(load()?);
        tracing::info!(count = listings.len(), "listing cache refreshed");

        *slot = Some(CachedListings {
            loaded_at: now,
            listings: Arc::clone(&listings),
        });
        Ok(listings)
    }

    pub fn invalidate(&self) {
        let mut slot = self.slot.lock().unwrap_or_else(|e| e.into_inner());
        *slot = None;
    }
}
