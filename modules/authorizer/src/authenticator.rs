//! External collaborator interfaces: the authenticator and the global
//! authorization enablement controller.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use authgate_security::SecurityIdentity;

use crate::error::AuthzError;
use crate::request::RequestContext;

/// The authentication subsystem, consumed only at its interface.
///
/// `authenticate` yields the caller identity for a request: anonymous when
/// no credentials are present, a failure only when credential processing
/// itself broke. `send_challenge` writes a wire-level challenge (401 header,
/// redirect, ...) into the request's response state.
#[async_trait]
pub trait Authenticator: Send + Sync {
    /// Resolve the caller identity for this request.
    ///
    /// # Errors
    ///
    /// Fails when credential processing fails; absence of credentials is an
    /// anonymous identity, not an error.
    async fn authenticate(&self, ctx: &RequestContext)
    -> Result<Arc<SecurityIdentity>, AuthzError>;

    /// Issue an authentication challenge for this request.
    ///
    /// Returns whether a challenge was actually written.
    ///
    /// # Errors
    ///
    /// Fails when challenge delivery fails, e.g. the client disconnected
    /// (`AuthzError::TransportIo`).
    async fn send_challenge(&self, ctx: &RequestContext) -> Result<bool, AuthzError>;
}

/// Global authorization enablement switch, checked once per request.
pub trait AuthorizationController: Send + Sync {
    fn is_authorization_enabled(&self) -> bool;
}

/// Controller backed by a single runtime-togglable flag.
#[derive(Debug)]
pub struct StaticAuthorizationController {
    enabled: AtomicBool,
}

impl StaticAuthorizationController {
    #[must_use]
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled: AtomicBool::new(enabled),
        }
    }

    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::Release);
    }
}

impl AuthorizationController for StaticAuthorizationController {
    fn is_authorization_enabled(&self) -> bool {
        self.enabled.load(Ordering::Acquire)
    }
}
