#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
//! Asynchronous, ordered HTTP authorization pipeline.
//!
//! The pipeline sits downstream of authentication and upstream of routing.
//! For every request it evaluates a configured, ordered list of
//! [`HttpSecurityPolicy`] checks; each policy may approve, deny, replace the
//! caller identity (augmentation), or fail. Denials resolve into a
//! wire-level challenge (anonymous caller) or a forbidden failure
//! (authenticated caller), and success/failure events fire at most once per
//! outcome.

pub mod authenticator;
pub mod authorizer;
pub mod config;
pub mod deferred;
pub mod error;
pub mod events;
pub mod middleware;
pub mod policy;
pub mod problem;
pub mod request;

pub use authenticator::{Authenticator, AuthorizationController, StaticAuthorizationController};
pub use authorizer::HttpAuthorizer;
pub use config::{AuthorizerConfig, EventsConfig};
pub use deferred::DeferredIdentity;
pub use error::AuthzError;
pub use events::{
    AuthorizationFailureEvent, AuthorizationSuccessEvent, NoopListener, SecurityEventListener,
    SecurityEvents,
};
pub use middleware::{AuthzState, authorize_middleware};
pub use policy::{
    AuthenticatedPolicy, AuthorizationRequestContext, CheckResult, DenyAllPolicy,
    HttpSecurityPolicy, PathMatchingPolicy, PathMatchingPolicyBuilder, PermitAllPolicy,
    RolesAllowedPolicy,
};
pub use problem::Problem;
pub use request::RequestContext;
