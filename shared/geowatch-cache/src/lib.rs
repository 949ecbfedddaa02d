//! Geowatch Cache
//!
//! The resilient data-access layer shared by every proxy endpoint:
//! - a durable, shared tier (Upstash-compatible Redis REST, or local)
//! - a small bounded in-process tier with LRU eviction and a hard max age
//! - per-key request coalescing for cache misses
//! - stale-on-error fallback, all driven by [`ResilientCache`]

mod coalesce;
mod durable;
mod error;
mod memory;
mod payload;
mod resilient;

pub use coalesce::Coalescer;
pub use durable::{DurableStore, LocalStore, NullStore, UpstashStore};
pub use error::{CacheError, DecodeError, FetchError, Result};
pub use memory::{MemoryTier, MemoryTierConfig};
pub use payload::{decode_as, decode_object, require_array, require_object, Payload};
pub use resilient::{CacheFailure, CacheOutcome, CachePolicy, ResilientCache};

pub mod prelude {
    pub use super::{
        CacheFailure, CacheOutcome, CachePolicy, DecodeError, DurableStore, FetchError,
        MemoryTierConfig, Payload, ResilientCache,
    };
    pub use geowatch_core::{CacheKey, CacheStatus};
}
