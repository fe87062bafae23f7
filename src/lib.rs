//! Tollgate - caching, rate-limiting gateway for slow text-generation backends
//!
//! A [`Gateway`] sits in front of a backend that is slow and expensive to
//! call. Each query is checked against a per-identity rate limit, its prompt
//! is truncated to the requested context size, and the answer is served from
//! a bounded TTL cache when possible. Queries can also be deferred: the
//! gateway registers a task, answers with a poll token right away, and a
//! background job fills in the result.
//!
//! # Synchronous Example
//!
//! ```rust,no_run
//! use tollgate::{Identity, QueryRequest, Tollgate};
//!
//! #[tokio::main]
//! async fn main() -> tollgate::Result<()> {
//!     let gateway = Tollgate::builder().build()?;
//!
//!     let request = QueryRequest::new("hello", Identity::user("alice"));
//!     let first = gateway.query(request.clone()).await?;
//!     let second = gateway.query(request).await?;
//!
//!     assert!(!first.is_cached());
//!     assert!(second.is_cached());
//!     Ok(())
//! }
//! ```
//!
//! # Deferred Example
//!
//! ```rust,no_run
//! use tollgate::{Identity, QueryRequest, TaskStatus, Tollgate};
//!
//! #[tokio::main]
//! async fn main() -> tollgate::Result<()> {
//!     let gateway = Tollgate::builder().build()?;
//!     let _maintenance = gateway.spawn_maintenance();
//!
//!     let request = QueryRequest::new("hello", Identity::user("alice")).use_async(true);
//!     let task_id = gateway.query(request).await?.task_id().expect("deferred");
//!
//!     loop {
//!         let task = gateway.poll(&task_id)?;
//!         if task.status != TaskStatus::Processing {
//!             println!("{}", serde_json::to_string(&task)?);
//!             break;
//!         }
//!         tokio::time::sleep(std::time::Duration::from_millis(250)).await;
//!     }
//!     Ok(())
//! }
//! ```

pub mod cache;
pub mod config;
pub mod error;
pub mod gateway;
pub mod limiter;
pub mod providers;
pub mod tasks;
pub mod telemetry;
pub mod types;
mod version;

// Re-export main types at crate root
pub use error::{GatewayError, Result, UpstreamError};
pub use gateway::{Gateway, GatewayBuilder, LatencyModel, Tollgate};
pub use version::{PKG_VERSION, version_string};

pub use cache::{CacheConfig, ResponseCache};
pub use limiter::{RateLimitConfig, RateLimiter};
pub use providers::{
    Backend, BackendChoice, ChatCompletionClient, ChatCompletionConfig, MockBackend,
};
pub use tasks::{SweepReport, Task, TaskConfig, TaskId, TaskRegistry, TaskStatus};
pub use types::{Identity, QueryRequest, QueryResponse};
