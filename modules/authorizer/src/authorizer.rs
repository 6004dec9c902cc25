//! The authorization pipeline orchestrator.
//!
//! Runs the configured policy chain for a request and turns the terminal
//! outcome into exactly one of: continue routing, send a challenge, fail
//! with forbidden, or fail with an error.

use std::sync::Arc;

use authgate_security::{RolesMapping, SecurityIdentity};

use crate::authenticator::{Authenticator, AuthorizationController, StaticAuthorizationController};
use crate::config::AuthorizerConfig;
use crate::deferred::DeferredIdentity;
use crate::error::AuthzError;
use crate::events::{
    AuthorizationFailureEvent, AuthorizationSuccessEvent, SecurityEventListener, SecurityEvents,
};
use crate::policy::{AuthorizationRequestContext, HttpSecurityPolicy};
use crate::request::RequestContext;

/// Runs the HTTP permission checks for every request.
///
/// All state here is immutable after construction and shared read-only
/// across arbitrarily many in-flight requests; per-request state lives in
/// the [`RequestContext`].
pub struct HttpAuthorizer {
    authenticator: Arc<dyn Authenticator>,
    controller: Arc<dyn AuthorizationController>,
    policies: Vec<Arc<dyn HttpSecurityPolicy>>,
    events: SecurityEvents,
    roles_mapping: Option<Arc<RolesMapping>>,
    shared: AuthorizationRequestContext,
}

impl HttpAuthorizer {
    #[must_use]
    pub fn new(
        config: &AuthorizerConfig,
        authenticator: Arc<dyn Authenticator>,
        policies: Vec<Arc<dyn HttpSecurityPolicy>>,
        listener: Arc<dyn SecurityEventListener>,
    ) -> Self {
        Self {
            authenticator,
            controller: Arc::new(StaticAuthorizationController::new(config.enabled)),
            policies,
            events: SecurityEvents::new(
                config.events.on_success,
                config.events.on_failure,
                listener,
            ),
            roles_mapping: RolesMapping::of(&config.roles_mapping),
            shared: AuthorizationRequestContext,
        }
    }

    /// Replace the enablement controller (the default is a static flag
    /// taken from configuration).
    #[must_use]
    pub fn with_controller(mut self, controller: Arc<dyn AuthorizationController>) -> Self {
        self.controller = controller;
        self
    }

    /// Check that the request is allowed to proceed.
    ///
    /// On return exactly one terminal action has happened: the context is
    /// marked routed, a challenge has been written and the response ended,
    /// or a failure has been recorded on the context.
    pub async fn check_permission(&self, ctx: &RequestContext) {
        if !self.controller.is_authorization_enabled() {
            ctx.next();
            return;
        }
        let (identity, augmented) = self.augment_and_get_identity(ctx);
        self.run_chain(ctx, identity, augmented).await;
    }

    /// Build the request's working identity.
    ///
    /// Returns the deferred identity for the chain plus the augmented
    /// identity when role mapping was applied eagerly and actually changed
    /// the identity.
    fn augment_and_get_identity(
        &self,
        ctx: &RequestContext,
    ) -> (DeferredIdentity, Option<Arc<SecurityIdentity>>) {
        if let Some(mapping) = &self.roles_mapping {
            if let Some(current) = ctx.identity() {
                // Augment right now: something downstream could read the
                // attached identity before the deferred chain resolves it.
                let augmented = mapping.apply(&current);
                let changed = (!Arc::ptr_eq(&current, &augmented)).then(|| Arc::clone(&augmented));
                return (DeferredIdentity::resolved(augmented), changed);
            }
            // Make sure the augmented identity is attached no matter when
            // authentication happens.
            let mapping = Arc::clone(mapping);
            let mapped = self
                .raw_identity(ctx)
                .map(move |identity| mapping.apply(&identity));
            return (Self::attach_on_resolve(ctx, mapped), None);
        }

        if let Some(current) = ctx.identity() {
            return (DeferredIdentity::resolved(current), None);
        }
        (Self::attach_on_resolve(ctx, self.raw_identity(ctx)), None)
    }

    /// Lazy authentication of the caller; runs at most once per request.
    fn raw_identity(&self, ctx: &RequestContext) -> DeferredIdentity {
        let authenticator = Arc::clone(&self.authenticator);
        let ctx = ctx.clone();
        DeferredIdentity::new(async move {
            authenticator.authenticate(&ctx).await.map_err(Arc::new)
        })
    }

    /// Attach the resolved identity to the request as a side effect of the
    /// first resolution.
    fn attach_on_resolve(ctx: &RequestContext, deferred: DeferredIdentity) -> DeferredIdentity {
        let ctx = ctx.clone();
        DeferredIdentity::new(async move {
            let identity = deferred.resolve().await?;
            ctx.set_identity(Arc::clone(&identity));
            Ok(identity)
        })
    }

    /// Sequential chain evaluation; stops at the first denial or failure.
    async fn run_chain(
        &self,
        ctx: &RequestContext,
        mut identity: DeferredIdentity,
        mut augmented: Option<Arc<SecurityIdentity>>,
    ) {
        let mut check_performed = false;

        for policy in &self.policies {
            match policy.check(ctx, identity.clone(), &self.shared).await {
                Ok(result) if !result.is_permitted() => {
                    self.resolve_denial(ctx, identity, policy.as_ref()).await;
                    return;
                }
                Ok(result) => {
                    check_performed |= result.performed_check();
                    if let Some(next_identity) = result.into_augmented_identity() {
                        // Thread the replaced identity by value: the next
                        // policy must see exactly this one.
                        identity = DeferredIdentity::resolved(Arc::clone(&next_identity));
                        augmented = Some(next_identity);
                    }
                }
                Err(failure) => {
                    Self::report_check_failure(ctx, failure);
                    return;
                }
            }
        }

        self.finish_chain(ctx, augmented, check_performed);
    }

    /// Chain exhausted with no denial: attach the augmented identity, fire
    /// the success event if eligible, continue routing.
    fn finish_chain(
        &self,
        ctx: &RequestContext,
        augmented: Option<Arc<SecurityIdentity>>,
        check_performed: bool,
    ) {
        if let Some(augmented) = augmented {
            let current = ctx.identity();
            if !augmented.is_anonymous()
                && !current.is_some_and(|current| Arc::ptr_eq(&current, &augmented))
            {
                ctx.set_identity(Arc::clone(&augmented));
            }
            self.events.fire_success_event(AuthorizationSuccessEvent {
                identity: Some(augmented),
                request: ctx.clone(),
            });
        } else if check_performed {
            self.events.fire_success_event(AuthorizationSuccessEvent {
                identity: ctx.identity(),
                request: ctx.clone(),
            });
        }
        ctx.next();
    }

    /// Classify a failed check: propagate it unless it is already being
    /// handled elsewhere, in which case only log it.
    fn report_check_failure(ctx: &RequestContext, failure: Arc<AuthzError>) {
        if ctx.fail(Arc::clone(&failure)) {
            return;
        }
        match &*failure {
            AuthzError::ChallengeRequired => {
                tracing::debug!("Authentication challenge is required");
            }
            AuthzError::RedirectRequired { location } => {
                tracing::debug!("Completing authentication with a redirect to {location}");
            }
            _ => tracing::error!("Exception occurred during authorization: {failure}"),
        }
    }

    /// Denied: send a challenge to an anonymous caller, fail an
    /// authenticated one with forbidden.
    async fn resolve_denial(
        &self,
        ctx: &RequestContext,
        identity: DeferredIdentity,
        policy: &dyn HttpSecurityPolicy,
    ) {
        let identity = match identity.resolve().await {
            Ok(identity) => identity,
            Err(failure) => {
                self.fire_failure_event(ctx, policy, Some(Arc::clone(&failure)), None);
                if !ctx.fail(failure) {
                    tracing::debug!("Identity resolution failure dropped: response already ended");
                }
                return;
            }
        };

        if identity.is_anonymous() {
            self.challenge(ctx, policy, identity).await;
        } else {
            let forbidden = Arc::new(AuthzError::Forbidden);
            self.fire_failure_event(ctx, policy, Some(forbidden), Some(identity));
            // Deliberately a fresh instance: the event-carried failure is
            // not the one the transport layer sees.
            if !ctx.fail(Arc::new(AuthzError::Forbidden)) {
                tracing::debug!("Forbidden outcome dropped: response already ended");
            }
        }
    }

    async fn challenge(
        &self,
        ctx: &RequestContext,
        policy: &dyn HttpSecurityPolicy,
        identity: Arc<SecurityIdentity>,
    ) {
        match self.authenticator.send_challenge(ctx).await {
            Ok(_sent) => {
                if !ctx.response_ended() {
                    ctx.end_response();
                }
                // A challenge is not an error, so the event carries none.
                self.fire_failure_event(ctx, policy, None, Some(identity));
            }
            Err(failure) => {
                let failure = Arc::new(failure);
                self.fire_failure_event(ctx, policy, Some(Arc::clone(&failure)), Some(identity));
                if !ctx.fail(Arc::clone(&failure)) {
                    if failure.is_transport_io() {
                        tracing::debug!("Failed to send challenge: {failure}");
                    } else {
                        tracing::error!("Failed to send challenge: {failure}");
                    }
                }
            }
        }
    }

    fn fire_failure_event(
        &self,
        ctx: &RequestContext,
        policy: &dyn HttpSecurityPolicy,
        failure: Option<Arc<AuthzError>>,
        identity: Option<Arc<SecurityIdentity>>,
    ) {
        self.events.fire_failure_event(AuthorizationFailureEvent {
            identity,
            failure,
            policy_context: Some(policy.name().to_owned()),
            request: ctx.clone(),
        });
    }
}
