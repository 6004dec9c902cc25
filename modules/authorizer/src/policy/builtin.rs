//! Built-in policies.

use std::sync::Arc;

use async_trait::async_trait;

use crate::deferred::DeferredIdentity;
use crate::error::AuthzError;
use crate::request::RequestContext;

use super::{AuthorizationRequestContext, CheckResult, HttpSecurityPolicy};

/// Permits every request without touching the identity.
#[derive(Debug, Default, Clone, Copy)]
pub struct PermitAllPolicy;

#[async_trait]
impl HttpSecurityPolicy for PermitAllPolicy {
    fn name(&self) -> &str {
        "permit-all"
    }

    async fn check(
        &self,
        _ctx: &RequestContext,
        _identity: DeferredIdentity,
        _shared: &AuthorizationRequestContext,
    ) -> Result<CheckResult, Arc<AuthzError>> {
        Ok(CheckResult::permit())
    }
}

/// Denies every request without touching the identity.
#[derive(Debug, Default, Clone, Copy)]
pub struct DenyAllPolicy;

#[async_trait]
impl HttpSecurityPolicy for DenyAllPolicy {
    fn name(&self) -> &str {
        "deny-all"
    }

    async fn check(
        &self,
        _ctx: &RequestContext,
        _identity: DeferredIdentity,
        _shared: &AuthorizationRequestContext,
    ) -> Result<CheckResult, Arc<AuthzError>> {
        Ok(CheckResult::deny())
    }
}

/// Permits any authenticated (non-anonymous) caller.
#[derive(Debug, Default, Clone, Copy)]
pub struct AuthenticatedPolicy;

#[async_trait]
impl HttpSecurityPolicy for AuthenticatedPolicy {
    fn name(&self) -> &str {
        "authenticated"
    }

    async fn check(
        &self,
        _ctx: &RequestContext,
        identity: DeferredIdentity,
        _shared: &AuthorizationRequestContext,
    ) -> Result<CheckResult, Arc<AuthzError>> {
        let identity = identity.resolve().await?;
        if identity.is_anonymous() {
            Ok(CheckResult::deny())
        } else {
            Ok(CheckResult::permit())
        }
    }
}

/// Permits callers holding at least one of the configured roles.
#[derive(Debug, Clone)]
pub struct RolesAllowedPolicy {
    roles: Vec<String>,
}

impl RolesAllowedPolicy {
    #[must_use]
    pub fn new<I>(roles: I) -> Self
    where
        I: IntoIterator<Item = String>,
    {
        Self {
            roles: roles.into_iter().collect(),
        }
    }
}

#[async_trait]
impl HttpSecurityPolicy for RolesAllowedPolicy {
    fn name(&self) -> &str {
        "roles-allowed"
    }

    async fn check(
        &self,
        _ctx: &RequestContext,
        identity: DeferredIdentity,
        _shared: &AuthorizationRequestContext,
    ) -> Result<CheckResult, Arc<AuthzError>> {
        let identity = identity.resolve().await?;
        if self.roles.iter().any(|role| identity.has_role(role)) {
            Ok(CheckResult::permit())
        } else {
            Ok(CheckResult::deny())
        }
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
#[allow(clippy::unwrap_used)]
mod tests {
    use authgate_security::SecurityIdentity;
    use http::Method;

    use super::*;

    fn ctx() -> RequestContext {
        RequestContext::new(Method::GET, "/demo")
    }

    fn identity_with_role(role: &str) -> DeferredIdentity {
        DeferredIdentity::resolved(Arc::new(
            SecurityIdentity::builder().principal("alice").role(role).build(),
        ))
    }

    #[tokio::test]
    async fn test_roles_allowed_permits_matching_role() {
        let policy = RolesAllowedPolicy::new(vec!["reader".to_owned()]);
        let result = policy
            .check(&ctx(), identity_with_role("reader"), &AuthorizationRequestContext)
            .await
            .unwrap();

        assert!(result.is_permitted());
    }

    #[tokio::test]
    async fn test_roles_allowed_denies_missing_role() {
        let policy = RolesAllowedPolicy::new(vec!["admin".to_owned()]);
        let result = policy
            .check(&ctx(), identity_with_role("reader"), &AuthorizationRequestContext)
            .await
            .unwrap();

        assert!(!result.is_permitted());
    }

    #[tokio::test]
    async fn test_authenticated_denies_anonymous() {
        let policy = AuthenticatedPolicy;
        let anonymous = DeferredIdentity::resolved(Arc::new(SecurityIdentity::anonymous()));
        let result = policy
            .check(&ctx(), anonymous, &AuthorizationRequestContext)
            .await
            .unwrap();

        assert!(!result.is_permitted());
    }

    #[tokio::test]
    async fn test_permit_and_deny_all_skip_identity_resolution() {
        // A failed deferred identity must not be forced by these policies.
        let failed =
            DeferredIdentity::failed(Arc::new(AuthzError::PolicyFailure("unused".to_owned())));

        let permitted = PermitAllPolicy
            .check(&ctx(), failed.clone(), &AuthorizationRequestContext)
            .await
            .unwrap();
        let denied = DenyAllPolicy
            .check(&ctx(), failed, &AuthorizationRequestContext)
            .await
            .unwrap();

        assert!(permitted.is_permitted());
        assert!(!denied.is_permitted());
    }
}
