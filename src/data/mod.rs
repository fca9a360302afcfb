//! Storage layer
//!
//! The backend contract, one driver per supported store, the decorator
//! pipeline that wraps whichever driver is configured, and the framing codec
//! for stored records.

pub mod aerospike;
pub mod backend;
pub mod cassandra;
pub mod composite;
pub mod decorator;
pub mod error;
pub mod ignite;
pub mod memcached;
pub mod memory;
pub mod rate_limiter;
pub mod record;
pub mod redis;

pub use backend::{Backend, BackendType, build_backend};
pub use error::CacheError;
pub use rate_limiter::RateLimiter;
pub use record::PayloadType;
