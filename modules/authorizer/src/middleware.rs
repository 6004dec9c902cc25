//! Axum middleware adapter for the authorization pipeline.

use std::sync::Arc;

use axum::response::{IntoResponse, Response};
use http::{HeaderValue, StatusCode, header};

use crate::authorizer::HttpAuthorizer;
use crate::error::AuthzError;
use crate::problem::Problem;
use crate::request::RequestContext;

/// Shared state for the authorization middleware.
#[derive(Clone)]
pub struct AuthzState {
    pub authorizer: Arc<HttpAuthorizer>,
}

/// Authorization middleware running the policy chain per request.
///
/// For each request:
/// 1. Builds a [`RequestContext`] from the request (picking up an identity
///    attached by an upstream authentication layer)
/// 2. Runs `check_permission`
/// 3. Routed: inserts the attached identity into request extensions and
///    continues downstream
/// 4. Otherwise: maps the recorded failure or the written challenge into a
///    wire-level response
pub async fn authorize_middleware(
    axum::extract::State(state): axum::extract::State<AuthzState>,
    req: axum::extract::Request,
    next: axum::middleware::Next,
) -> Response {
    let ctx = RequestContext::from_request(&req);
    state.authorizer.check_permission(&ctx).await;

    if ctx.routed() {
        let mut req = req;
        if let Some(identity) = ctx.identity() {
            req.extensions_mut().insert(identity);
        }
        return next.run(req).await;
    }

    if let Some(failure) = ctx.failure() {
        return failure_to_response(&failure);
    }
    challenge_response(&ctx)
}

/// Convert a recorded failure to an RFC-9457 Problem Details response.
fn failure_to_response(failure: &AuthzError) -> Response {
    match failure {
        AuthzError::Forbidden => Problem::new(
            StatusCode::FORBIDDEN,
            "Forbidden",
            "Not authorized to access this resource",
        )
        .into_response(),
        AuthzError::ChallengeRequired => Problem::new(
            StatusCode::UNAUTHORIZED,
            "Unauthorized",
            "Authentication required",
        )
        .into_response(),
        AuthzError::RedirectRequired { location } => redirect_response(location),
        AuthzError::TransportIo(_) | AuthzError::PolicyFailure(_) => Problem::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            "Internal Server Error",
            "Authorization failed",
        )
        .into_response(),
    }
}

fn redirect_response(location: &str) -> Response {
    match HeaderValue::from_str(location) {
        Ok(value) => {
            let mut response = StatusCode::FOUND.into_response();
            response.headers_mut().insert(header::LOCATION, value);
            response
        }
        Err(_) => Problem::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            "Internal Server Error",
            "Invalid redirect target",
        )
        .into_response(),
    }
}

/// Build the terminal response for a finalized challenge from the status
/// and headers the authenticator wrote into the context.
fn challenge_response(ctx: &RequestContext) -> Response {
    let (status, headers) = ctx.response_parts();
    let mut response = status.unwrap_or(StatusCode::UNAUTHORIZED).into_response();
    for (name, value) in &headers {
        // Iteration repeats the name for each value of a multi-valued
        // header; append keeps every value.
        response.headers_mut().append(name, value.clone());
    }
    response
}
