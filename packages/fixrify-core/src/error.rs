//! Error taxonomy for the client core.
//!
//! Every failure the pipeline can surface falls into one of the `ApiError`
//! variants. `AuthExpired` is special: it only exists between the response
//! stage and the refresh coordinator, and a caller never sees it when the
//! renewal succeeds.

use thiserror::Error;

/// Generic fallback shown when the server body carries no usable message.
pub const GENERIC_ERROR_MESSAGE: &str = "An error occurred";

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ApiError {
    /// Transport failure (DNS, connect, timeout). Never retried here.
    #[error("network error: {0}")]
    Network(String),

    /// 401 with a refresh credential still available. Recovered inside the
    /// pipeline; surfaced only if recovery is impossible.
    #[error("session expired")]
    AuthExpired,

    /// 401 with no usable refresh credential, or the renewal itself failed.
    /// Terminal: the session has been cleared and a login redirect signaled.
    #[error("session invalid, please sign in again")]
    AuthInvalid,

    /// Any other 4xx. Carries the user-facing message extracted from the body.
    #[error("{message}")]
    Validation { status: u16, message: String },

    /// Unclassifiable failure (5xx, malformed body).
    #[error("{0}")]
    Unknown(String),
}

/// Sink for user-visible session events.
///
/// The web client showed these as toasts and a forced location change; a
/// headless shell logs them. The refresh coordinator guarantees
/// `redirect_to_login` fires at most once per failed renewal, no matter how
/// many concurrent calls observed the failure.
pub trait EventSink: Send + Sync {
    /// Surface a user-facing error message.
    fn error(&self, message: &str);

    /// The session is gone; the login view should be shown.
    fn redirect_to_login(&self);
}

/// Default sink that forwards events to `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn error(&self, message: &str) {
        tracing::warn!("{}", message);
    }

    fn redirect_to_login(&self) {
        tracing::info!("session invalidated, redirecting to /login");
    }
}
