//! Path-matching dispatcher policy.
//!
//! Selects which sub-policy applies based on the request method and path.
//! The dispatcher itself is not a permission decision: when no configured
//! rule matches it abstains, so completing the chain through it alone never
//! counts as "a check was performed".

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use http::Method;

use crate::deferred::DeferredIdentity;
use crate::error::AuthzError;
use crate::request::RequestContext;

use super::{AuthorizationRequestContext, CheckResult, HttpSecurityPolicy};

/// Convert Axum path syntax `:param` to matchit syntax `{param}`
///
/// Axum uses `:id` for path parameters, but matchit uses `{id}`.
fn convert_axum_path_to_matchit(path: &str) -> String {
    let mut result = String::with_capacity(path.len());
    let mut chars = path.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == ':' {
            result.push('{');
            while matches!(chars.peek(), Some(c) if c.is_alphanumeric() || *c == '_') {
                if let Some(c) = chars.next() {
                    result.push(c);
                }
            }
            result.push('}');
        } else {
            result.push(ch);
        }
    }

    result
}

/// Dispatcher mapping `(method, path pattern)` to sub-policies.
pub struct PathMatchingPolicy {
    routers: HashMap<Method, matchit::Router<Arc<dyn HttpSecurityPolicy>>>,
}

impl PathMatchingPolicy {
    #[must_use]
    pub fn builder() -> PathMatchingPolicyBuilder {
        PathMatchingPolicyBuilder::default()
    }

    fn find(&self, method: &Method, path: &str) -> Option<Arc<dyn HttpSecurityPolicy>> {
        self.routers
            .get(method)
            .and_then(|router| router.at(path).ok())
            .map(|matched| Arc::clone(matched.value))
    }
}

#[async_trait]
impl HttpSecurityPolicy for PathMatchingPolicy {
    fn name(&self) -> &str {
        "path-matching"
    }

    async fn check(
        &self,
        ctx: &RequestContext,
        identity: DeferredIdentity,
        shared: &AuthorizationRequestContext,
    ) -> Result<CheckResult, Arc<AuthzError>> {
        let Some(policy) = self.find(ctx.method(), ctx.path()) else {
            return Ok(CheckResult::abstain());
        };
        // A matching rule was applied, so the delegate's verdict counts as a
        // real check whatever its own flag says.
        policy
            .check(ctx, identity, shared)
            .await
            .map(CheckResult::as_check)
    }
}

/// Builder collecting `(method, path, policy)` rules.
#[derive(Default)]
pub struct PathMatchingPolicyBuilder {
    routes: Vec<(Method, String, Arc<dyn HttpSecurityPolicy>)>,
}

impl PathMatchingPolicyBuilder {
    /// Add a rule for the given method and path pattern (Axum `:param`
    /// syntax accepted).
    #[must_use]
    pub fn route(mut self, method: Method, path: &str, policy: Arc<dyn HttpSecurityPolicy>) -> Self {
        self.routes.push((method, path.to_owned(), policy));
        self
    }

    /// Build the dispatcher.
    ///
    /// # Errors
    ///
    /// Fails when a path pattern is invalid or conflicts with an already
    /// registered pattern for the same method.
    pub fn build(self) -> anyhow::Result<PathMatchingPolicy> {
        let mut routers: HashMap<Method, matchit::Router<Arc<dyn HttpSecurityPolicy>>> =
            HashMap::new();

        for (method, path, policy) in self.routes {
            let matchit_path = convert_axum_path_to_matchit(&path);
            routers
                .entry(method)
                .or_default()
                .insert(&matchit_path, policy)
                .map_err(|e| anyhow::anyhow!("Failed to insert route pattern '{path}': {e}"))?;
        }

        Ok(PathMatchingPolicy { routers })
    }
}
