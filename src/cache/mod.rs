//! Caching subsystem.
//!
//! [`ResponseCache`] holds backend answers keyed on the truncated prompt.
//! It is consulted by [`Gateway`](crate::Gateway) on both the synchronous
//! and the deferred path, so a prompt answered by a background job can be
//! served from cache to a later synchronous caller and vice versa.

pub mod response;

pub use response::{CacheConfig, ResponseCache};
