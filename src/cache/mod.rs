//! Cache module for keeping upstream responses in memory
//!
//! This module provides a TTL store with lazy expiry and a cache manager on top
//! of it that coalesces concurrent misses, so a cold key triggers exactly one
//! upstream fetch no matter how many callers ask for it at once.

mod manager;
mod store;

pub use manager::{CacheError, CacheManager};
pub use store::CacheStore;
