//! Per-request context shared by the pipeline and its collaborators.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use arc_swap::ArcSwapOption;
use authgate_security::SecurityIdentity;
use http::{HeaderMap, HeaderName, HeaderValue, Method, StatusCode};
use parking_lot::Mutex;

use crate::error::AuthzError;

/// Mutable state of the response under construction.
#[derive(Debug, Default)]
struct ResponseState {
    ended: bool,
    status: Option<StatusCode>,
    headers: HeaderMap,
}

#[derive(Debug)]
struct Inner {
    method: Method,
    path: String,
    headers: HeaderMap,
    identity: ArcSwapOption<SecurityIdentity>,
    response: Mutex<ResponseState>,
    failure: Mutex<Option<Arc<AuthzError>>>,
    routed: AtomicBool,
}

/// Request context for one authorization decision.
///
/// Cheap to clone (shared inner state); never shared across requests. The
/// pipeline drives it strictly sequentially, so interior mutability here is
/// coordination, not concurrency: the identity slot is written on deferred
/// resolution, the response state by challenge delivery, and the failure
/// channel exactly once per propagated failure.
#[derive(Debug, Clone)]
pub struct RequestContext {
    inner: Arc<Inner>,
}

impl RequestContext {
    /// Create a context for the given request line.
    #[must_use]
    pub fn new(method: Method, path: &str) -> Self {
        Self::with_headers(method, path, HeaderMap::new())
    }

    /// Create a context carrying request headers (for authenticators that
    /// read credentials).
    #[must_use]
    pub fn with_headers(method: Method, path: &str, headers: HeaderMap) -> Self {
        Self {
            inner: Arc::new(Inner {
                method,
                path: path.to_owned(),
                headers,
                identity: ArcSwapOption::empty(),
                response: Mutex::new(ResponseState::default()),
                failure: Mutex::new(None),
                routed: AtomicBool::new(false),
            }),
        }
    }

    /// Build a context from an axum request, picking up an identity a
    /// previous middleware may have attached via request extensions.
    #[must_use]
    pub fn from_request(req: &axum::extract::Request) -> Self {
        let ctx = Self::with_headers(req.method().clone(), req.uri().path(), req.headers().clone());
        if let Some(identity) = req.extensions().get::<Arc<SecurityIdentity>>() {
            ctx.set_identity(Arc::clone(identity));
        }
        ctx
    }

    #[must_use]
    pub fn method(&self) -> &Method {
        &self.inner.method
    }

    #[must_use]
    pub fn path(&self) -> &str {
        &self.inner.path
    }

    #[must_use]
    pub fn headers(&self) -> &HeaderMap {
        &self.inner.headers
    }

    /// Identity currently attached to the request, if any.
    #[must_use]
    pub fn identity(&self) -> Option<Arc<SecurityIdentity>> {
        self.inner.identity.load_full()
    }

    /// Attach an identity so downstream readers observe it.
    pub fn set_identity(&self, identity: Arc<SecurityIdentity>) {
        self.inner.identity.store(Some(identity));
    }

    /// Mark the request as allowed to continue to its handler.
    pub fn next(&self) {
        self.inner.routed.store(true, Ordering::Release);
    }

    /// Whether routing was continued.
    #[must_use]
    pub fn routed(&self) -> bool {
        self.inner.routed.load(Ordering::Acquire)
    }

    /// Whether the response has been finalized; no terminal write may
    /// happen after this returns true.
    #[must_use]
    pub fn response_ended(&self) -> bool {
        self.inner.response.lock().ended
    }

    /// Finalize the response (empty-body close).
    pub fn end_response(&self) {
        self.inner.response.lock().ended = true;
    }

    /// Set the response status (challenge delivery).
    pub fn set_response_status(&self, status: StatusCode) {
        self.inner.response.lock().status = Some(status);
    }

    /// Add a response header (challenge delivery), replacing any previous
    /// values for the name.
    pub fn insert_response_header(&self, name: HeaderName, value: HeaderValue) {
        self.inner.response.lock().headers.insert(name, value);
    }

    /// Add a response header value without replacing previous ones, for
    /// multi-valued headers such as `WWW-Authenticate` with several schemes.
    pub fn append_response_header(&self, name: HeaderName, value: HeaderValue) {
        self.inner.response.lock().headers.append(name, value);
    }

    /// Snapshot of the response status and headers written so far.
    #[must_use]
    pub fn response_parts(&self) -> (Option<StatusCode>, HeaderMap) {
        let state = self.inner.response.lock();
        (state.status, state.headers.clone())
    }

    /// Report a failure to the transport layer.
    ///
    /// The failure is recorded only when the response has not ended and no
    /// identical failure (pointer equality, never message equality) is
    /// already recorded. Returns whether the failure was recorded.
    #[must_use]
    pub fn fail(&self, failure: Arc<AuthzError>) -> bool {
        if self.response_ended() {
            return false;
        }
        let mut slot = self.inner.failure.lock();
        if slot
            .as_ref()
            .is_some_and(|existing| Arc::ptr_eq(existing, &failure))
        {
            return false;
        }
        *slot = Some(failure);
        true
    }

    /// Failure recorded on the request, if any.
    #[must_use]
    pub fn failure(&self) -> Option<Arc<AuthzError>> {
        self.inner.failure.lock().clone()
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_fail_records_first_failure() {
        let ctx = RequestContext::new(Method::GET, "/demo");
        let failure = Arc::new(AuthzError::Forbidden);

        assert!(ctx.fail(Arc::clone(&failure)));
        assert!(Arc::ptr_eq(&ctx.failure().unwrap(), &failure));
    }

    #[test]
    fn test_fail_dedups_reference_equal_failures() {
        let ctx = RequestContext::new(Method::GET, "/demo");
        let failure = Arc::new(AuthzError::PolicyFailure("boom".to_owned()));

        assert!(ctx.fail(Arc::clone(&failure)));
        assert!(!ctx.fail(Arc::clone(&failure)));
    }

    #[test]
    fn test_fail_allows_distinct_instances_with_equal_message() {
        let ctx = RequestContext::new(Method::GET, "/demo");
        let first = Arc::new(AuthzError::PolicyFailure("boom".to_owned()));
        let second = Arc::new(AuthzError::PolicyFailure("boom".to_owned()));

        assert!(ctx.fail(first));
        // Dedup is identity-equality based, not message-based.
        assert!(ctx.fail(Arc::clone(&second)));
        assert!(Arc::ptr_eq(&ctx.failure().unwrap(), &second));
    }

    #[test]
    fn test_fail_after_response_ended_is_dropped() {
        let ctx = RequestContext::new(Method::GET, "/demo");
        ctx.end_response();

        assert!(!ctx.fail(Arc::new(AuthzError::Forbidden)));
        assert!(ctx.failure().is_none());
    }

    #[test]
    fn test_identity_slot_roundtrip() {
        let ctx = RequestContext::new(Method::GET, "/demo");
        assert!(ctx.identity().is_none());

        let identity = Arc::new(authgate_security::SecurityIdentity::anonymous());
        ctx.set_identity(Arc::clone(&identity));

        assert!(Arc::ptr_eq(&ctx.identity().unwrap(), &identity));
    }
}
