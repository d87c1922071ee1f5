//! Client-side data-fetching controller.
//!
//! This crate provides a reusable controller that issues network requests
//! through an injected transport, tracks loading/error/success state per
//! observation, memoizes successful JSON responses per URL, and exposes a
//! manual refetch that bypasses and invalidates the memoized entry.

pub mod controller;
pub mod transport;

pub use controller::{
    CacheStore, FetchController, FetchEvent, FetchRequest, FetchState, Observation, Payload, RequestState,
    ResponseKind,
};

pub use transport::{HttpTransport, Transport, TransferOptions, TransferReply, TransportConfig};

pub use refetch_core::{AppConfig, Error};
