//! Response caching for the typeahead engine
//!
//! A bounded in-memory cache keyed by request fingerprints. Entries
//! expire after a TTL (checked and removed at read time) and the cache
//! evicts in strict insertion order once it reaches capacity. FIFO over
//! LRU is deliberate: the cache is small and TTL-bounded, so access-order
//! bookkeeping buys nothing on the hot set.

pub mod cache;
pub mod fingerprint;
pub mod metrics;

pub use cache::{CacheConfig, FifoCache};
pub use fingerprint::{canonical_json, fingerprint};
pub use metrics::{CacheMetrics, CacheStats};
