//! The transport seam the fetch controller talks through.
//!
//! ### Stable Abstraction
//! - The `Transport` trait decouples the controller from any particular HTTP
//!   stack, so tests can substitute deterministic fixtures.
//! - `transfer` returns `Err` only when no response was received at all
//!   (connectivity, DNS, timeout, bad URL). A response with a non-success
//!   status is still an `Ok(TransferReply)`; turning it into a failure is the
//!   controller's job.
//!
//! ### Body Access
//! - `TransferReply` holds the raw body and yields it either parsed as JSON
//!   or as opaque bytes, matching the two response kinds the controller
//!   supports.

pub mod http;
pub mod url;

use async_trait::async_trait;
use bytes::Bytes;
use refetch_core::Error;

pub use http::{HttpTransport, TransportConfig};
pub use url::{UrlError, request_url};

/// Options forwarded opaquely to the transport for a single transfer.
///
/// The controller compares these for equality to decide whether a repeated
/// `observe` call needs to re-run the fetch cycle.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TransferOptions {
    /// HTTP method (default: GET).
    pub method: reqwest::Method,
    /// Additional request headers.
    pub headers: Vec<(String, String)>,
    /// Request body, if any.
    pub body: Option<Bytes>,
}

impl TransferOptions {
    /// Options for a plain GET with no extra headers.
    pub fn get() -> Self {
        Self::default()
    }

    /// Set the HTTP method.
    pub fn method(mut self, method: reqwest::Method) -> Self {
        self.method = method;
        self
    }

    /// Append a request header.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Set the request body.
    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = Some(body.into());
        self
    }
}

/// Raw outcome of a completed transfer.
#[derive(Debug, Clone)]
pub struct TransferReply {
    /// HTTP status code.
    pub status: u16,
    /// Canonical status text ("OK", "Internal Server Error", ...).
    pub status_text: String,
    /// Response body bytes.
    pub body: Bytes,
}

impl TransferReply {
    /// Whether the status indicates success (2xx).
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Parse the body as JSON.
    pub fn json(&self) -> Result<serde_json::Value, Error> {
        serde_json::from_slice(&self.body).map_err(|e| Error::Decode(e.to_string()))
    }

    /// Take the body as opaque bytes.
    pub fn into_bytes(self) -> Bytes {
        self.body
    }
}

/// A capability that resolves a URL plus options to a raw transfer outcome.
///
/// Implementations must be cheap to share; the controller holds one behind an
/// `Arc` and clones it into spawned fetch cycles.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Perform one transfer.
    ///
    /// # Errors
    ///
    /// `Error::Transport` or `Error::InvalidUrl` when no response could be
    /// obtained. Non-success statuses are reported through the reply.
    async fn transfer(&self, url: &str, options: &TransferOptions) -> Result<TransferReply, Error>;
}
