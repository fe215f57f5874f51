//! Client-side helpers for callers of the API.

pub mod cache;

pub use cache::{AuthCache, CacheError, CachedSession, CachedUser};
