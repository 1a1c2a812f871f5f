//! Fingerprint response cache for Galley.
//!
//! In-memory cache keyed by a deterministic request fingerprint, with
//! per-entry TTL, lazy expiry on lookup, a periodic background sweep, and
//! an optional single-flight map for coalescing concurrent misses.

mod cache;
mod clock;
mod flight;
mod key;

pub use cache::{CacheConfig, CacheStats, FingerprintCache};
pub use clock::{Clock, ManualClock, SystemClock};
pub use flight::SingleFlight;
pub use key::make_key;
