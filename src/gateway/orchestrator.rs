//! Query orchestration.
//!
//! # Request flow
//!
//! ```text
//! query(request)
//!     │
//!     ├─ truncate prompt to context_size
//!     ├─ rate limiter: allow(identity)? ── no ──► RateLimitExceeded
//!     │
//!     ├─ sync ──► cache hit? ── yes ──► Answer { cached: true }
//!     │               │ no
//!     │               ▼
//!     │           sleep(latency) ─► backend ─► cache put ─► Answer { cached: false }
//!     │
//!     └─ async ─► registry.create() ─► spawn job ─► Deferred { task_id }
//!                                          │
//!                         sleep(latency) ─► cache hit or backend
//!                                          │
//!                               complete(id) / fail(id)
//! ```
//!
//! # Locking
//!
//! Each store locks internally for one operation at a time. Nothing here
//! holds a store lock across the simulated latency or the backend call, so
//! a slow backend only delays the request that is waiting on it.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{Instrument, debug, info, info_span, warn};

use super::latency::LatencyModel;
use crate::cache::ResponseCache;
use crate::limiter::RateLimiter;
use crate::providers::{Backend, BackendChoice};
use crate::tasks::{Task, TaskId, TaskRegistry, spawn_sweeper_with};
use crate::telemetry;
use crate::types::{Identity, QueryRequest, QueryResponse};
use crate::{GatewayError, Result, UpstreamError};

/// The query orchestrator.
///
/// Cheap to clone; clones share the same cache, limiter and task registry.
/// Build one with [`Tollgate::builder()`](crate::Tollgate::builder).
#[derive(Clone)]
pub struct Gateway {
    inner: Arc<Inner>,
}

struct Inner {
    cache: ResponseCache,
    limiter: Arc<RateLimiter>,
    rate_limit_enabled: bool,
    tasks: Arc<TaskRegistry>,
    backends: HashMap<BackendChoice, Arc<dyn Backend>>,
    latency: LatencyModel,
    maintenance_started: AtomicBool,
}

impl Gateway {
    pub(crate) fn new(
        cache: ResponseCache,
        limiter: RateLimiter,
        rate_limit_enabled: bool,
        tasks: TaskRegistry,
        backends: HashMap<BackendChoice, Arc<dyn Backend>>,
        latency: LatencyModel,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                cache,
                limiter: Arc::new(limiter),
                rate_limit_enabled,
                tasks: Arc::new(tasks),
                backends,
                latency,
                maintenance_started: AtomicBool::new(false),
            }),
        }
    }

    /// Submit a query.
    ///
    /// Synchronous requests resolve to [`QueryResponse::Answer`]; requests
    /// with `use_async` return [`QueryResponse::Deferred`] as soon as the
    /// task is registered.
    ///
    /// # Errors
    ///
    /// - [`GatewayError::RateLimitExceeded`] when the identity is over quota
    /// - [`GatewayError::Configuration`] when the chosen backend is not configured
    /// - [`GatewayError::Upstream`] when a synchronous backend call fails
    ///
    /// # Panics
    ///
    /// Deferred requests spawn onto the tokio runtime and require a runtime
    /// context.
    pub async fn query(&self, request: QueryRequest) -> Result<QueryResponse> {
        let prompt = request.truncated_prompt().to_string();

        self.check_rate_limit(&request.identity)?;
        let backend = self.backend(request.backend)?;
        let delay = self.inner.latency.delay_for(request.context_size);

        if request.use_async {
            metrics::counter!(telemetry::QUERIES_TOTAL, "mode" => "async").increment(1);
            let task_id = self.spawn_deferred(backend, prompt, request.use_cache, delay);
            return Ok(QueryResponse::Deferred { task_id });
        }

        metrics::counter!(telemetry::QUERIES_TOTAL, "mode" => "sync").increment(1);
        if request.use_cache
            && let Some(answer) = self.inner.cache.get(&prompt)
        {
            debug!(identity = %request.identity, "served from cache");
            return Ok(QueryResponse::Answer {
                answer,
                cached: true,
            });
        }

        tokio::time::sleep(delay).await;
        let answer = self
            .inner
            .invoke_and_store(backend.as_ref(), &prompt, request.use_cache)
            .await?;

        Ok(QueryResponse::Answer {
            answer,
            cached: false,
        })
    }

    /// Current state of a deferred query.
    ///
    /// # Errors
    ///
    /// [`GatewayError::NotFound`] if the id was never issued or the task has
    /// been swept.
    pub fn poll(&self, task_id: &TaskId) -> Result<Task> {
        self.inner
            .tasks
            .get(task_id)
            .ok_or(GatewayError::NotFound(*task_id))
    }

    /// Start the periodic maintenance loop.
    ///
    /// Every sweep interval this retires stale tasks and drops idle
    /// rate-limit windows. The loop ends by itself once every clone of this
    /// gateway (and every in-flight deferred job) is gone.
    ///
    /// One loop serves all clones: only the first call spawns it, later
    /// calls return `None`.
    pub fn spawn_maintenance(&self) -> Option<JoinHandle<()>> {
        if self.inner.maintenance_started.swap(true, Ordering::AcqRel) {
            debug!("maintenance loop already running");
            return None;
        }
        let limiter = Arc::clone(&self.inner.limiter);
        Some(spawn_sweeper_with(&self.inner.tasks, move || {
            let pruned = limiter.prune();
            if pruned > 0 {
                debug!(pruned, "dropped idle rate-limit windows");
            }
        }))
    }

    /// The response cache.
    pub fn cache(&self) -> &ResponseCache {
        &self.inner.cache
    }

    /// The rate limiter.
    pub fn limiter(&self) -> &RateLimiter {
        &self.inner.limiter
    }

    /// The deferred task registry.
    pub fn tasks(&self) -> &TaskRegistry {
        &self.inner.tasks
    }

    /// Whether queries are rate limited.
    pub fn rate_limit_enabled(&self) -> bool {
        self.inner.rate_limit_enabled
    }

    /// Whether a backend is configured for `choice`.
    pub fn has_backend(&self, choice: BackendChoice) -> bool {
        self.inner.backends.contains_key(&choice)
    }

    fn check_rate_limit(&self, identity: &Identity) -> Result<()> {
        if !self.inner.rate_limit_enabled {
            return Ok(());
        }
        let key = identity.key();
        if self.inner.limiter.allow(&key) {
            return Ok(());
        }

        let retry_after = self.inner.limiter.retry_after(&key);
        info!(identity = %key, ?retry_after, "rate limit exceeded");
        Err(GatewayError::RateLimitExceeded {
            identity: key,
            retry_after,
        })
    }

    fn backend(&self, choice: BackendChoice) -> Result<Arc<dyn Backend>> {
        self.inner.backends.get(&choice).cloned().ok_or_else(|| {
            GatewayError::Configuration(format!("backend '{choice}' is not configured"))
        })
    }

    fn spawn_deferred(
        &self,
        backend: Arc<dyn Backend>,
        prompt: String,
        use_cache: bool,
        delay: Duration,
    ) -> TaskId {
        let task_id = self.inner.tasks.create();
        let inner = Arc::clone(&self.inner);
        let span = info_span!("deferred_query", %task_id, backend = backend.name());

        tokio::spawn(
            async move {
                tokio::time::sleep(delay).await;

                let cached = if use_cache {
                    inner.cache.get(&prompt)
                } else {
                    None
                };
                let outcome = match cached {
                    Some(answer) => Ok(answer),
                    None => {
                        inner
                            .invoke_and_store(backend.as_ref(), &prompt, use_cache)
                            .await
                    }
                };

                match outcome {
                    Ok(answer) => {
                        inner.tasks.complete(&task_id, answer);
                    }
                    Err(e) => {
                        inner.tasks.fail(&task_id, e.to_string());
                    }
                }
            }
            .instrument(span),
        );

        task_id
    }
}

impl Inner {
    /// Call the backend and, on success, cache the answer if asked to.
    async fn invoke_and_store(
        &self,
        backend: &dyn Backend,
        prompt: &str,
        use_cache: bool,
    ) -> std::result::Result<String, UpstreamError> {
        let name = backend.name().to_string();
        let start = std::time::Instant::now();
        let result = backend.invoke(prompt).await;
        let elapsed = start.elapsed().as_secs_f64();

        let status = if result.is_ok() { "ok" } else { "error" };
        metrics::counter!(
            telemetry::BACKEND_REQUESTS_TOTAL,
            "backend" => name.clone(),
            "status" => status
        )
        .increment(1);
        metrics::histogram!(telemetry::BACKEND_DURATION_SECONDS, "backend" => name.clone())
            .record(elapsed);

        match result {
            Ok(answer) => {
                if use_cache {
                    self.cache.put(prompt, answer.clone());
                }
                Ok(answer)
            }
            Err(e) => {
                warn!(backend = %name, error = %e, "backend call failed");
                Err(e)
            }
        }
    }
}
