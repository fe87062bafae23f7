//! Telemetry metric name constants.
//!
//! Centralised metric names for tollgate operations. Consumers install
//! their own `metrics` recorder (e.g. prometheus, statsd); without a
//! recorder installed, all metric calls are no-ops.
//!
//! # Metric naming conventions
//!
//! All metrics are prefixed with `tollgate_`. Counters end in `_total`,
//! histograms use meaningful units (e.g. `_seconds`).
//!
//! # Common labels
//!
//! - `backend`: backend name ("mock", "chat_completion")
//! - `status`: outcome: "ok" or "error" for backend calls, "completed" or
//!   "failed" for tasks
//! - `mode`: query path: "sync" or "async"
//! - `reason`: why the sweep removed a task: "retention" or "max_age"

/// Total queries accepted by the orchestrator (after the rate-limit check).
///
/// Labels: `mode` ("sync" | "async").
pub const QUERIES_TOTAL: &str = "tollgate_queries_total";

/// Total queries rejected by the rate limiter.
pub const RATE_LIMITED_TOTAL: &str = "tollgate_rate_limited_total";

/// Total response cache hits.
pub const CACHE_HITS_TOTAL: &str = "tollgate_cache_hits_total";

/// Total response cache misses (absent or expired).
pub const CACHE_MISSES_TOTAL: &str = "tollgate_cache_misses_total";

/// Total backend invocations.
///
/// Labels: `backend`, `status` ("ok" | "error").
pub const BACKEND_REQUESTS_TOTAL: &str = "tollgate_backend_requests_total";

/// Backend invocation duration in seconds.
///
/// Labels: `backend`.
pub const BACKEND_DURATION_SECONDS: &str = "tollgate_backend_duration_seconds";

/// Total deferred tasks registered.
pub const TASKS_CREATED_TOTAL: &str = "tollgate_tasks_created_total";

/// Total deferred tasks that reached a terminal state.
///
/// Labels: `status` ("completed" | "failed").
pub const TASKS_FINISHED_TOTAL: &str = "tollgate_tasks_finished_total";

/// Total tasks removed by the sweep.
///
/// Labels: `reason` ("retention" | "max_age").
pub const TASKS_SWEPT_TOTAL: &str = "tollgate_tasks_swept_total";
