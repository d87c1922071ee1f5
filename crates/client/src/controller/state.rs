//! The fetch cycle state machine.
//!
//! State transitions are a pure function over (state, event); the controller
//! applies events and publishes the projected snapshot, nothing else mutates
//! observable state.

use std::sync::Arc;

use bytes::Bytes;
use refetch_core::Error;
use serde::de::DeserializeOwned;

/// A resolved response body.
///
/// JSON payloads are shared behind an `Arc` so a cache hit hands back the
/// exact same allocation that was stored; `Bytes` is already cheap to clone.
#[derive(Debug, Clone)]
pub enum Payload {
    Json(Arc<serde_json::Value>),
    Binary(Bytes),
}

impl Payload {
    /// The parsed JSON value, if this is a JSON payload.
    pub fn as_json(&self) -> Option<&serde_json::Value> {
        match self {
            Payload::Json(value) => Some(value),
            Payload::Binary(_) => None,
        }
    }

    /// The shared JSON allocation, if this is a JSON payload.
    pub fn json(&self) -> Option<Arc<serde_json::Value>> {
        match self {
            Payload::Json(value) => Some(Arc::clone(value)),
            Payload::Binary(_) => None,
        }
    }

    /// The raw bytes, if this is a binary payload.
    pub fn as_bytes(&self) -> Option<&Bytes> {
        match self {
            Payload::Json(_) => None,
            Payload::Binary(bytes) => Some(bytes),
        }
    }

    /// Deserialize a JSON payload into a typed value.
    ///
    /// # Errors
    ///
    /// `Error::Decode` if the payload is binary or does not match `T`.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, Error> {
        match self {
            Payload::Json(value) => {
                serde_json::from_value(value.as_ref().clone()).map_err(|e| Error::Decode(e.to_string()))
            }
            Payload::Binary(_) => Err(Error::Decode("binary payload is not JSON".into())),
        }
    }
}

/// The snapshot a caller renders from.
///
/// At terminal states exactly one of `data`/`error` is populated;
/// `is_loading` is true only while a cycle is outstanding. During a refetch,
/// `data` transiently carries the evicted cache entry while `is_loading`
/// stays true.
#[derive(Debug, Clone, Default)]
pub struct RequestState {
    pub data: Option<Payload>,
    pub error: Option<Arc<Error>>,
    pub is_loading: bool,
}

/// Per-instance fetch state.
#[derive(Debug, Clone, Default)]
pub enum FetchState {
    /// No cycle has run yet (or the URL is empty and the instance is disabled).
    #[default]
    Idle,
    /// A cycle is outstanding. `stale` carries the evicted cache entry during
    /// a refetch, and is empty for a first fetch or a key change.
    Loading { stale: Option<Payload> },
    /// The last cycle resolved.
    Success(Payload),
    /// The last cycle failed.
    Error(Arc<Error>),
}

/// Events a fetch cycle feeds through the machine.
#[derive(Debug, Clone)]
pub enum FetchEvent {
    /// A cycle started; previous data and error are cleared.
    Begin,
    /// A refetch re-surfaces the cached value while the new request is in
    /// flight (the stale-while-revalidate emit).
    Resurface(Payload),
    /// The cycle resolved with a payload.
    Resolved(Payload),
    /// The cycle failed.
    Failed(Arc<Error>),
}

impl FetchState {
    /// Pure transition function.
    ///
    /// `Resurface` is only meaningful while loading; from any other state it
    /// leaves the machine unchanged.
    pub fn step(&self, event: FetchEvent) -> FetchState {
        match event {
            FetchEvent::Begin => FetchState::Loading { stale: None },
            FetchEvent::Resurface(payload) => match self {
                FetchState::Loading { .. } => FetchState::Loading { stale: Some(payload) },
                other => other.clone(),
            },
            FetchEvent::Resolved(payload) => FetchState::Success(payload),
            FetchEvent::Failed(error) => FetchState::Error(error),
        }
    }

    /// Project the machine state into the caller-facing snapshot.
    pub fn snapshot(&self) -> RequestState {
        match self {
            FetchState::Idle => RequestState::default(),
            FetchState::Loading { stale } => {
                RequestState { data: stale.clone(), error: None, is_loading: true }
            }
            FetchState::Success(payload) => {
                RequestState { data: Some(payload.clone()), error: None, is_loading: false }
            }
            FetchState::Error(error) => {
                RequestState { data: None, error: Some(Arc::clone(error)), is_loading: false }
            }
        }
    }

    /// Whether a cycle is outstanding.
    pub fn is_loading(&self) -> bool {
        matches!(self, FetchState::Loading { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn payload(value: serde_json::Value) -> Payload {
        Payload::Json(Arc::new(value))
    }

    #[test]
    fn test_begin_clears_previous_outcome() {
        let state = FetchState::Success(payload(json!([1, 2, 3])));
        let next = state.step(FetchEvent::Begin);
        let snap = next.snapshot();
        assert!(snap.is_loading);
        assert!(snap.data.is_none());
        assert!(snap.error.is_none());
    }

    #[test]
    fn test_begin_clears_previous_error() {
        let state = FetchState::Error(Arc::new(Error::Transport("down".into())));
        let snap = state.step(FetchEvent::Begin).snapshot();
        assert!(snap.is_loading);
        assert!(snap.error.is_none());
    }

    #[test]
    fn test_resurface_keeps_loading_with_stale_data() {
        let state = FetchState::Idle.step(FetchEvent::Begin);
        let next = state.step(FetchEvent::Resurface(payload(json!({"id": 1}))));
        let snap = next.snapshot();
        assert!(snap.is_loading);
        assert_eq!(snap.data.unwrap().as_json().unwrap()["id"], 1);
    }

    #[test]
    fn test_resurface_outside_loading_is_ignored() {
        let state = FetchState::Idle;
        let next = state.step(FetchEvent::Resurface(payload(json!(1))));
        assert!(matches!(next, FetchState::Idle));
    }

    #[test]
    fn test_resolved_populates_data_only() {
        let state = FetchState::Idle.step(FetchEvent::Begin);
        let snap = state.step(FetchEvent::Resolved(payload(json!([1])))).snapshot();
        assert!(!snap.is_loading);
        assert!(snap.data.is_some());
        assert!(snap.error.is_none());
    }

    #[test]
    fn test_failed_populates_error_only() {
        let err = Arc::new(Error::Status { code: 500, text: "Internal Server Error".into() });
        let state = FetchState::Idle.step(FetchEvent::Begin);
        let snap = state.step(FetchEvent::Failed(err)).snapshot();
        assert!(!snap.is_loading);
        assert!(snap.data.is_none());
        assert_eq!(snap.error.unwrap().to_string(), "Internal Server Error");
    }

    #[test]
    fn test_machine_is_reentrant_after_terminal_states() {
        let state = FetchState::Idle
            .step(FetchEvent::Begin)
            .step(FetchEvent::Failed(Arc::new(Error::Transport("down".into()))))
            .step(FetchEvent::Begin)
            .step(FetchEvent::Resolved(payload(json!(2))));
        assert!(matches!(state, FetchState::Success(_)));
    }

    #[test]
    fn test_payload_decode_typed() {
        let p = payload(json!([1, 2, 3]));
        let items: Vec<u32> = p.decode().unwrap();
        assert_eq!(items, vec![1, 2, 3]);
    }

    #[test]
    fn test_payload_decode_binary_fails() {
        let p = Payload::Binary(Bytes::from_static(b"\x89PNG"));
        assert!(matches!(p.decode::<Vec<u8>>(), Err(Error::Decode(_))));
    }
}
