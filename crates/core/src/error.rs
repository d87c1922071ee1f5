//! Unified error taxonomy for fetch cycles.
//!
//! Every failure a cycle can hit collapses into one of these variants and is
//! surfaced verbatim on the terminal state; the controller performs no retry
//! and no local recovery. The variants stay distinguishable so callers that
//! care can match on the category instead of parsing message strings.

/// Unified error type surfaced by the fetch controller.
#[derive(Debug, Clone, thiserror::Error)]
pub enum Error {
    /// The transfer could not be completed (connectivity, DNS, timeout).
    #[error("transport failure: {0}")]
    Transport(String),

    /// A response was received but its status indicates failure.
    ///
    /// Displays as the bare status text ("Internal Server Error"), which is
    /// what callers are expected to render.
    #[error("{text}")]
    Status { code: u16, text: String },

    /// The response body could not be decoded as the requested kind.
    #[error("decode failure: {0}")]
    Decode(String),

    /// The request URL could not be parsed.
    #[error("invalid url: {0}")]
    InvalidUrl(String),
}

impl Error {
    /// Whether retrying the same request could plausibly succeed.
    ///
    /// Transport failures and 5xx/429 statuses are transient; decode
    /// failures, URL errors, and other 4xx statuses are not.
    pub fn is_transient(&self) -> bool {
        match self {
            Error::Transport(_) => true,
            Error::Status { code, .. } => *code >= 500 || *code == 429,
            Error::Decode(_) | Error::InvalidUrl(_) => false,
        }
    }

    /// The status code, when the failure carries one.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Error::Status { code, .. } => Some(*code),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_displays_bare_text() {
        let err = Error::Status { code: 500, text: "Internal Server Error".into() };
        assert_eq!(err.to_string(), "Internal Server Error");
    }

    #[test]
    fn test_transport_display() {
        let err = Error::Transport("connection refused".into());
        assert!(err.to_string().contains("transport failure"));
        assert!(err.to_string().contains("connection refused"));
    }

    #[test]
    fn test_transient_classification() {
        assert!(Error::Transport("timeout".into()).is_transient());
        assert!(Error::Status { code: 503, text: "Service Unavailable".into() }.is_transient());
        assert!(Error::Status { code: 429, text: "Too Many Requests".into() }.is_transient());
        assert!(!Error::Status { code: 404, text: "Not Found".into() }.is_transient());
        assert!(!Error::Decode("expected value at line 1".into()).is_transient());
    }

    #[test]
    fn test_status_code_accessor() {
        let err = Error::Status { code: 404, text: "Not Found".into() };
        assert_eq!(err.status_code(), Some(404));
        assert_eq!(Error::Decode("bad".into()).status_code(), None);
    }
}
