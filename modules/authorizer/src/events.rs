//! Authorization observability events and the configuration-gated emitter.

use std::sync::Arc;

use authgate_security::SecurityIdentity;

use crate::error::AuthzError;
use crate::request::RequestContext;

/// Fired when a request passes the policy chain.
#[derive(Clone)]
pub struct AuthorizationSuccessEvent {
    /// Identity in effect at the end of the chain, if one was resolved.
    pub identity: Option<Arc<SecurityIdentity>>,
    /// The request the decision was made for.
    pub request: RequestContext,
}

/// Fired when a request is denied or authorization fails.
#[derive(Clone)]
pub struct AuthorizationFailureEvent {
    /// Identity in effect at the point of denial, if one was resolved.
    pub identity: Option<Arc<SecurityIdentity>>,
    /// The failure, absent for a plain challenge (a challenge is not an
    /// error).
    pub failure: Option<Arc<AuthzError>>,
    /// Name of the denying policy, if a policy drove the outcome.
    pub policy_context: Option<String>,
    /// The request the decision was made for.
    pub request: RequestContext,
}

/// Receiver for authorization events.
///
/// Emission is fire-and-forget: listener failures are not the pipeline's
/// concern, so the methods are infallible by construction.
pub trait SecurityEventListener: Send + Sync {
    fn on_success(&self, event: AuthorizationSuccessEvent);
    fn on_failure(&self, event: AuthorizationFailureEvent);
}

/// Listener that drops every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopListener;

impl SecurityEventListener for NoopListener {
    fn on_success(&self, _event: AuthorizationSuccessEvent) {}
    fn on_failure(&self, _event: AuthorizationFailureEvent) {}
}

/// Configuration-gated event emitter.
///
/// Success and failure emission are independently configured; both flags are
/// immutable after startup.
#[derive(Clone)]
pub struct SecurityEvents {
    fire_on_success: bool,
    fire_on_failure: bool,
    listener: Arc<dyn SecurityEventListener>,
}

impl SecurityEvents {
    #[must_use]
    pub fn new(
        fire_on_success: bool,
        fire_on_failure: bool,
        listener: Arc<dyn SecurityEventListener>,
    ) -> Self {
        Self {
            fire_on_success,
            fire_on_failure,
            listener,
        }
    }

    /// Emitter with both gates closed.
    #[must_use]
    pub fn disabled() -> Self {
        Self::new(false, false, Arc::new(NoopListener))
    }

    pub fn fire_success_event(&self, event: AuthorizationSuccessEvent) {
        if self.fire_on_success {
            self.listener.on_success(event);
        }
    }

    pub fn fire_failure_event(&self, event: AuthorizationFailureEvent) {
        if self.fire_on_failure {
            self.listener.on_failure(event);
        }
    }
}
