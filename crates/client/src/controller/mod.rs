//! The data-fetching controller.
//!
//! ### Responsibilities
//! - Per-URL memoization of successful JSON responses (`CacheStore`).
//! - A finite state machine per observation (`FetchState`), published through
//!   a `tokio::sync::watch` channel.
//! - Manual `refetch` that bypasses the cache, re-surfaces the evicted entry
//!   while the new request is in flight, and re-issues the transfer.
//! - Suppression of stale results: a detached observation never mutates
//!   observable state, and when triggers overlap the last trigger wins.
//!
//! ### Cycle ordering
//! Cache hits resolve synchronously inside the trigger call; only cycles that
//! actually hit the network spawn a task. Every trigger bumps a generation
//! counter, and a cycle checks both the cancellation flag and its generation
//! at the single point where it would emit a terminal state. Triggers on a
//! detached observation are ignored outright. In-flight transfers are never
//! aborted at the transport level, only silenced.

pub mod cache;
pub mod state;

pub use cache::CacheStore;
pub use state::{FetchEvent, FetchState, Payload, RequestState};

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use refetch_core::Error;
use serde::{Deserialize, Serialize};
use tokio::sync::watch;

use crate::transport::{HttpTransport, Transport, TransferOptions, TransportConfig};

/// How the response body should be interpreted.
///
/// Binary payloads are handed to the caller opaquely and are never memoized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseKind {
    #[default]
    Json,
    Binary,
}

/// Everything that identifies one fetchable resource.
///
/// The URL string alone is the cache key; options and kind participate only
/// in change detection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRequest {
    pub url: String,
    pub options: TransferOptions,
    pub kind: ResponseKind,
}

impl FetchRequest {
    /// A JSON GET request for the given URL.
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into(), options: TransferOptions::default(), kind: ResponseKind::default() }
    }

    /// Set the transfer options.
    pub fn options(mut self, options: TransferOptions) -> Self {
        self.options = options;
        self
    }

    /// Set the response kind.
    pub fn kind(mut self, kind: ResponseKind) -> Self {
        self.kind = kind;
        self
    }
}

/// Owns the memoization table and the injected transport, and hands out
/// per-subscription [`Observation`]s.
pub struct FetchController {
    transport: Arc<dyn Transport>,
    cache: CacheStore,
}

impl FetchController {
    /// Create a controller over an injected transport.
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self { transport, cache: CacheStore::new() }
    }

    /// Create a controller over the reqwest-backed HTTP transport.
    pub fn over_http(config: TransportConfig) -> Result<Self, Error> {
        Ok(Self::new(Arc::new(HttpTransport::new(config)?)))
    }

    /// Start observing a resource.
    ///
    /// An empty URL disables the observation entirely: it stays `Idle` and
    /// no transfer is issued until `observe` is called with a real URL.
    pub fn observe(&self, request: FetchRequest) -> Observation {
        let (tx, rx) = watch::channel(RequestState::default());
        let shared = Arc::new(Shared {
            transport: Arc::clone(&self.transport),
            cache: self.cache.clone(),
            tx,
            state: Mutex::new(FetchState::Idle),
            cancelled: AtomicBool::new(false),
            generation: AtomicU64::new(0),
        });

        let observation = Observation { shared, rx, request };
        observation.start_cycle(false);
        observation
    }

    /// The shared memoization table.
    pub fn cache(&self) -> &CacheStore {
        &self.cache
    }
}

/// State shared between an observation handle and its spawned fetch cycles.
struct Shared {
    transport: Arc<dyn Transport>,
    cache: CacheStore,
    tx: watch::Sender<RequestState>,
    state: Mutex<FetchState>,
    cancelled: AtomicBool,
    generation: AtomicU64,
}

impl Shared {
    /// Step the machine and publish the new snapshot.
    fn apply(&self, event: FetchEvent) {
        let mut state = self.state.lock().expect("state lock poisoned");
        let next = state.step(event);
        *state = next;
        let _ = self.tx.send(state.snapshot());
    }

    /// Terminal emit, guarded by the cancellation flag and the cycle
    /// generation. This is the only place a stale cycle is silenced.
    fn finish(&self, generation: u64, event: FetchEvent) {
        if self.cancelled.load(Ordering::Acquire) {
            tracing::debug!("discarding cycle result: observation detached");
            return;
        }
        if self.generation.load(Ordering::Acquire) != generation {
            tracing::debug!("discarding cycle result: superseded by a later trigger");
            return;
        }
        self.apply(event);
    }
}

/// One logical subscription to a resource.
///
/// Exposes the `{ data, error, is_loading }` snapshot plus the refetch
/// capability; dropping the handle detaches it and silences any in-flight
/// cycle.
pub struct Observation {
    shared: Arc<Shared>,
    rx: watch::Receiver<RequestState>,
    request: FetchRequest,
}

impl Observation {
    /// Current snapshot.
    pub fn state(&self) -> RequestState {
        self.rx.borrow().clone()
    }

    /// Wait for the next emission and return the snapshot it carried.
    ///
    /// Intermediate emissions may be conflated; callers always see the most
    /// recent state.
    pub async fn next_state(&mut self) -> RequestState {
        let _ = self.rx.changed().await;
        self.rx.borrow_and_update().clone()
    }

    /// The request this observation currently tracks.
    pub fn request(&self) -> &FetchRequest {
        &self.request
    }

    /// Re-observe, re-running the fetch cycle only when the URL or options
    /// actually changed. An exact repeat is a no-op and issues no transfer.
    pub fn observe(&mut self, request: FetchRequest) {
        if request == self.request {
            return;
        }
        self.request = request;
        self.start_cycle(false);
    }

    /// Force a fresh transfer for the current URL.
    ///
    /// Evicts the memoized entry for the key unconditionally at cycle start,
    /// after transiently re-surfacing it so callers can render stale content
    /// while the request is in flight.
    pub fn refetch(&self) {
        self.start_cycle(true);
    }

    /// Detach: no further state emissions, even if an in-flight transfer
    /// later resolves, and subsequent `observe`/`refetch` triggers are
    /// ignored. The in-flight transfer itself is not aborted.
    pub fn detach(&self) {
        self.shared.cancelled.store(true, Ordering::Release);
    }

    fn start_cycle(&self, refetching: bool) {
        if self.request.url.is_empty() {
            return;
        }

        // A detached instance permits no further state mutation, so a late
        // trigger must not emit Loading or evict the shared cache entry.
        if self.shared.cancelled.load(Ordering::Acquire) {
            tracing::debug!(url = %self.request.url, "ignoring trigger: observation detached");
            return;
        }

        let shared = &self.shared;
        let generation = shared.generation.fetch_add(1, Ordering::AcqRel) + 1;

        shared.apply(FetchEvent::Begin);

        if refetching {
            if let Some(stale) = shared.cache.get(&self.request.url) {
                shared.apply(FetchEvent::Resurface(Payload::Json(stale)));
            }
            // Unconditional eviction: a refetch that later fails leaves the
            // key uncached until the next successful fetch.
            if shared.cache.remove(&self.request.url).is_some() {
                tracing::debug!(url = %self.request.url, "refetch evicted cache entry");
            }
        } else if let Some(hit) = shared.cache.get(&self.request.url) {
            tracing::debug!(url = %self.request.url, "cache hit");
            shared.apply(FetchEvent::Resolved(Payload::Json(hit)));
            return;
        }

        let shared = Arc::clone(shared);
        let request = self.request.clone();
        tokio::spawn(async move {
            let event = match run_transfer(&shared, &request).await {
                Ok(payload) => FetchEvent::Resolved(payload),
                Err(error) => FetchEvent::Failed(Arc::new(error)),
            };
            shared.finish(generation, event);
        });
    }
}

impl Drop for Observation {
    fn drop(&mut self) {
        self.detach();
    }
}

/// Resolve one request through the transport.
///
/// The cache insert for a successful JSON decode happens here, before the
/// guarded emit: a detached or superseded cycle still memoizes its result.
async fn run_transfer(shared: &Shared, request: &FetchRequest) -> Result<Payload, Error> {
    let reply = shared.transport.transfer(&request.url, &request.options).await?;

    if !reply.is_success() {
        return Err(Error::Status { code: reply.status, text: reply.status_text.clone() });
    }

    match request.kind {
        ResponseKind::Json => {
            let value = Arc::new(reply.json()?);
            shared.cache.insert(&request.url, Arc::clone(&value));
            Ok(Payload::Json(value))
        }
        ResponseKind::Binary => Ok(Payload::Binary(reply.into_bytes())),
    }
}
