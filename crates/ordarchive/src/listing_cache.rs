//! Short-lived cache of archive listings.
//!
//! Entries are keyed by the filter and the cache generation. Every mutation
//! bumps the generation, so a listing read before a change can never be
//! served after it, even if it is inserted late.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use moka::sync::Cache;

use crate::record::{ArchiveRecord, OrderFilter};

pub type Listing = Arc<Vec<ArchiveRecord>>;

#[derive(Clone)]
pub struct ListingCache {
    inner: Option<Cache<(u64, OrderFilter), Listing>>,
    generation: Arc<AtomicU64>,
}

impl ListingCache {
    /// A zero `ttl` disables caching.
    pub fn new(capacity: u64, ttl: Duration) -> Self {
        let inner = (!ttl.is_zero()).then(|| {
            Cache::builder()
                .max_capacity(capacity)
                .time_to_live(ttl)
                .build()
        });
        Self {
            inner,
            generation: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn disabled() -> Self {
        Self::new(0, Duration::ZERO)
    }

    /// Current generation; pass it back to [`ListingCache::insert`].
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    pub fn get(&self, filter: &OrderFilter) -> Option<Listing> {
        let inner = self.inner.as_ref()?;
        inner.get(&(self.generation(), normalized(filter)))
    }

    /// Stores a listing that was read while `generation` was current.
    pub fn insert(&self, generation: u64, filter: &OrderFilter, listing: Listing) {
        if let Some(inner) = &self.inner {
            inner.insert((generation, normalized(filter)), listing);
        }
    }

    /// Drops every cached listing.
    pub fn invalidate(&self) {
        self.generation.fetch_add(1, Ordering::AcqRel);
        if let Some(inner) = &self.inner {
            inner.invalidate_all();
        }
    }
}

/// Filters with blank or padded queries share one entry.
fn normalized(filter: &OrderFilter) -> OrderFilter {
    OrderFilter {
        query: filter.term().map(str::to_string),
    }
}
