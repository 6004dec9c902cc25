//! Deferred, single-resolution caller identity.

use std::future::Future;
use std::sync::Arc;

use authgate_security::SecurityIdentity;
use futures::FutureExt;
use futures::future::{BoxFuture, Shared};

use crate::error::AuthzError;

/// Result of resolving a deferred identity.
pub type IdentityResult = Result<Arc<SecurityIdentity>, Arc<AuthzError>>;

/// A deferred, single-resolution computation yielding a caller identity.
///
/// Both origin cases (identity already attached to the request vs. resolved
/// later by the authenticator) funnel through this one abstraction, so the
/// augmentation logic never branches on "is it already resolved". The handle
/// is cheap to clone; the underlying future runs at most once and the result
/// is memoized, so the chain and the denial path observe the same value.
#[derive(Clone)]
pub struct DeferredIdentity {
    inner: Shared<BoxFuture<'static, IdentityResult>>,
}

impl DeferredIdentity {
    /// Wrap a not-yet-resolved identity computation.
    #[must_use]
    pub fn new<F>(future: F) -> Self
    where
        F: Future<Output = IdentityResult> + Send + 'static,
    {
        Self {
            inner: future.boxed().shared(),
        }
    }

    /// Wrap an already-resolved identity.
    #[must_use]
    pub fn resolved(identity: Arc<SecurityIdentity>) -> Self {
        Self::new(std::future::ready(Ok(identity)))
    }

    /// Wrap an already-failed resolution.
    #[must_use]
    pub fn failed(failure: Arc<AuthzError>) -> Self {
        Self::new(std::future::ready(Err(failure)))
    }

    /// Compose a pure identity transform over this deferred value.
    ///
    /// The transform runs once, on first resolution; failures pass through
    /// untouched.
    #[must_use]
    pub fn map<F>(self, transform: F) -> Self
    where
        F: FnOnce(Arc<SecurityIdentity>) -> Arc<SecurityIdentity> + Send + 'static,
    {
        Self::new(async move { self.resolve().await.map(transform) })
    }

    /// Await the (memoized) resolution.
    ///
    /// # Errors
    ///
    /// Returns the resolution failure recorded by the underlying
    /// computation; every caller observes the same `Arc`.
    pub async fn resolve(&self) -> IdentityResult {
        self.inner.clone().await
    }
}
