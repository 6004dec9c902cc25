//! Policy interface and check results.

pub mod builtin;
pub mod path;

use std::sync::Arc;

use async_trait::async_trait;
use authgate_security::SecurityIdentity;

use crate::deferred::DeferredIdentity;
use crate::error::AuthzError;
use crate::request::RequestContext;

pub use builtin::{AuthenticatedPolicy, DenyAllPolicy, PermitAllPolicy, RolesAllowedPolicy};
pub use path::{PathMatchingPolicy, PathMatchingPolicyBuilder};

/// Outcome of a single policy check.
///
/// A denying result never carries an augmented identity. `performed_check`
/// reports whether the evaluation counted as a real permission check; a
/// path-matching dispatcher that matched no rule abstains instead, so
/// success events stay silent when nothing was actually checked.
#[derive(Debug, Clone)]
pub struct CheckResult {
    permitted: bool,
    augmented_identity: Option<Arc<SecurityIdentity>>,
    performed_check: bool,
}

impl CheckResult {
    /// Permit the request.
    #[must_use]
    pub fn permit() -> Self {
        Self {
            permitted: true,
            augmented_identity: None,
            performed_check: true,
        }
    }

    /// Permit the request and replace the identity for the rest of the
    /// chain.
    #[must_use]
    pub fn permit_with(identity: Arc<SecurityIdentity>) -> Self {
        Self {
            permitted: true,
            augmented_identity: Some(identity),
            performed_check: true,
        }
    }

    /// Deny the request.
    #[must_use]
    pub fn deny() -> Self {
        Self {
            permitted: false,
            augmented_identity: None,
            performed_check: true,
        }
    }

    /// Permit without having performed a real check (dispatcher found no
    /// matching rule).
    #[must_use]
    pub fn abstain() -> Self {
        Self {
            permitted: true,
            augmented_identity: None,
            performed_check: false,
        }
    }

    #[must_use]
    pub fn is_permitted(&self) -> bool {
        self.permitted
    }

    #[must_use]
    pub fn performed_check(&self) -> bool {
        self.performed_check
    }

    #[must_use]
    pub fn augmented_identity(&self) -> Option<&Arc<SecurityIdentity>> {
        self.augmented_identity.as_ref()
    }

    /// Consume the result, taking the augmented identity if present.
    #[must_use]
    pub fn into_augmented_identity(self) -> Option<Arc<SecurityIdentity>> {
        self.augmented_identity
    }

    /// Mark the result as having performed a real check (a dispatcher
    /// applied a matching rule).
    #[must_use]
    pub(crate) fn as_check(mut self) -> Self {
        self.performed_check = true;
        self
    }
}

/// Shared context handed to every policy check.
///
/// Process-wide and immutable; currently carries the escape hatch for
/// policies that must run blocking work off the async executor.
#[derive(Debug, Default, Clone)]
pub struct AuthorizationRequestContext;

impl AuthorizationRequestContext {
    /// Run a blocking closure on the blocking thread pool.
    ///
    /// # Errors
    ///
    /// Fails with `AuthzError::PolicyFailure` when the blocking task
    /// panics or is cancelled.
    #[allow(clippy::unused_self)]
    pub async fn run_blocking<F, R>(&self, work: F) -> Result<R, Arc<AuthzError>>
    where
        F: FnOnce() -> R + Send + 'static,
        R: Send + 'static,
    {
        tokio::task::spawn_blocking(work)
            .await
            .map_err(|err| Arc::new(AuthzError::PolicyFailure(format!("blocking task failed: {err}"))))
    }
}

/// An opaque, ordered authorization policy.
///
/// Policies are evaluated strictly in sequence; evaluation stops at the
/// first denial or failure. Implementations are stateless from the
/// pipeline's perspective and safe for unsynchronized concurrent use.
#[async_trait]
pub trait HttpSecurityPolicy: Send + Sync {
    /// Identifier used as the event context tag when this policy denies.
    fn name(&self) -> &str;

    /// Evaluate the policy for the request.
    ///
    /// The identity is deferred: policies that do not need it must not
    /// force its resolution.
    ///
    /// # Errors
    ///
    /// Any failure other than an explicit deny: identity resolution
    /// failures pass through, everything else is a policy failure.
    async fn check(
        &self,
        ctx: &RequestContext,
        identity: DeferredIdentity,
        shared: &AuthorizationRequestContext,
    ) -> Result<CheckResult, Arc<AuthzError>>;
}
