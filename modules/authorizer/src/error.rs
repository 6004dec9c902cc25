//! Error types for the authorization pipeline.

use thiserror::Error;

/// Errors surfacing from policy checks, identity resolution, and challenge
/// delivery.
///
/// `ChallengeRequired` is not a true error: it signals that the caller is
/// unauthenticated and a challenge is being issued elsewhere. Denial itself
/// is expressed via `CheckResult::deny`, not as an error variant.
#[derive(Debug, Error)]
pub enum AuthzError {
    /// The caller is unauthenticated and a challenge must be issued.
    #[error("authentication challenge required")]
    ChallengeRequired,

    /// Authentication completes with a redirect to the given location.
    #[error("authentication redirect to {location}")]
    RedirectRequired {
        /// Redirect target.
        location: String,
    },

    /// The authenticated caller lacks the required permission.
    #[error("forbidden")]
    Forbidden,

    /// Transport-level I/O failure, e.g. the client disconnected while a
    /// challenge was being delivered. Expected race, never escalated.
    #[error("transport i/o failure: {0}")]
    TransportIo(String),

    /// Any other failure from a policy or identity resolution.
    #[error("policy failure: {0}")]
    PolicyFailure(String),
}

impl AuthzError {
    /// Whether this failure is an expected transport race rather than an
    /// actionable error.
    #[must_use]
    pub fn is_transport_io(&self) -> bool {
        matches!(self, Self::TransportIo(_))
    }
}
