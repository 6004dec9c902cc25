#![allow(clippy::unwrap_used, clippy::expect_used)]

//! Integration tests for the axum authorization middleware.
//!
//! These tests verify that:
//! 1. Allowed requests reach their handler with the identity attached
//! 2. Anonymous denials turn into a 401 challenge response
//! 3. Authenticated denials turn into a 403 problem response
//! 4. Disabled authorization lets everything through

use std::sync::Arc;

use async_trait::async_trait;
use authgate_authorizer::{
    AuthenticatedPolicy, Authenticator, AuthorizerConfig, AuthzError, AuthzState, DenyAllPolicy,
    HttpAuthorizer, HttpSecurityPolicy, NoopListener, PermitAllPolicy, RequestContext,
    authorize_middleware,
};
use authgate_security::SecurityIdentity;
use axum::{
    Extension, Router,
    body::Body,
    http::{Request, StatusCode, header},
    routing::get,
};
use http::HeaderValue;
use tower::ServiceExt;

/// Mock authenticator yielding a fixed identity and a bearer challenge.
struct MockAuthenticator {
    identity: Arc<SecurityIdentity>,
}

#[async_trait]
impl Authenticator for MockAuthenticator {
    async fn authenticate(
        &self,
        _ctx: &RequestContext,
    ) -> Result<Arc<SecurityIdentity>, AuthzError> {
        Ok(Arc::clone(&self.identity))
    }

    async fn send_challenge(&self, ctx: &RequestContext) -> Result<bool, AuthzError> {
        ctx.set_response_status(StatusCode::UNAUTHORIZED);
        ctx.insert_response_header(header::WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
        Ok(true)
    }
}

/// Handler echoing the principal the middleware attached, if any.
async fn whoami(identity: Option<Extension<Arc<SecurityIdentity>>>) -> String {
    match identity {
        Some(Extension(identity)) => identity.principal().unwrap_or("anonymous").to_owned(),
        None => "anonymous".to_owned(),
    }
}

fn router(
    config: AuthorizerConfig,
    identity: Arc<SecurityIdentity>,
    policies: Vec<Arc<dyn HttpSecurityPolicy>>,
) -> Router {
    let authorizer = HttpAuthorizer::new(
        &config,
        Arc::new(MockAuthenticator { identity }),
        policies,
        Arc::new(NoopListener),
    );
    let state = AuthzState {
        authorizer: Arc::new(authorizer),
    };
    Router::new()
        .route("/demo", get(whoami))
        .layer(axum::middleware::from_fn_with_state(
            state,
            authorize_middleware,
        ))
}

fn alice() -> Arc<SecurityIdentity> {
    Arc::new(SecurityIdentity::builder().principal("alice").role("user").build())
}

#[tokio::test]
async fn test_allowed_request_reaches_handler_with_identity() {
    let router = router(
        AuthorizerConfig::default(),
        alice(),
        vec![Arc::new(AuthenticatedPolicy)],
    );

    let response = router
        .oneshot(Request::builder().uri("/demo").body(Body::empty()).unwrap())
        .await
        .expect("Request failed");

    assert_eq!(response.status(), StatusCode::OK);
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    assert_eq!(&body[..], b"alice");
}

#[tokio::test]
async fn test_permit_all_never_forces_identity_resolution() {
    let router = router(
        AuthorizerConfig::default(),
        alice(),
        vec![Arc::new(PermitAllPolicy)],
    );

    let response = router
        .oneshot(Request::builder().uri("/demo").body(Body::empty()).unwrap())
        .await
        .expect("Request failed");

    assert_eq!(response.status(), StatusCode::OK);
    // The policy never resolved the deferred identity, so nothing was
    // attached for the handler.
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    assert_eq!(&body[..], b"anonymous");
}

#[tokio::test]
async fn test_anonymous_denial_returns_challenge() {
    let router = router(
        AuthorizerConfig::default(),
        Arc::new(SecurityIdentity::anonymous()),
        vec![Arc::new(DenyAllPolicy)],
    );

    let response = router
        .oneshot(Request::builder().uri("/demo").body(Body::empty()).unwrap())
        .await
        .expect("Request failed");

    assert_eq!(
        response.status(),
        StatusCode::UNAUTHORIZED,
        "Anonymous denial should yield the written challenge"
    );
    assert_eq!(
        response.headers().get(header::WWW_AUTHENTICATE).unwrap(),
        "Bearer"
    );
}

#[tokio::test]
async fn test_authenticated_denial_returns_403_problem() {
    let router = router(
        AuthorizerConfig::default(),
        alice(),
        vec![Arc::new(DenyAllPolicy)],
    );

    let response = router
        .oneshot(Request::builder().uri("/demo").body(Body::empty()).unwrap())
        .await
        .expect("Request failed");

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(
        response.headers().get(header::CONTENT_TYPE).unwrap(),
        "application/problem+json"
    );
}

#[tokio::test]
async fn test_disabled_authorization_lets_requests_through() {
    let config = AuthorizerConfig {
        enabled: false,
        ..AuthorizerConfig::default()
    };
    let router = router(
        config,
        Arc::new(SecurityIdentity::anonymous()),
        vec![Arc::new(DenyAllPolicy)],
    );

    let response = router
        .oneshot(Request::builder().uri("/demo").body(Body::empty()).unwrap())
        .await
        .expect("Request failed");

    assert_eq!(
        response.status(),
        StatusCode::OK,
        "Denying policy must not run when authorization is disabled"
    );
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    assert_eq!(&body[..], b"anonymous");
}
