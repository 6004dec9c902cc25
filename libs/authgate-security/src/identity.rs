use std::collections::{BTreeMap, BTreeSet};

/// `SecurityIdentity` is the immutable caller identity flowing through the
/// authorization pipeline.
///
/// Produced by the authenticator (or by policy augmentation) and never
/// mutated in place: augmentation builds a new identity. An identity with no
/// principal is anonymous.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct SecurityIdentity {
    /// Principal name of the authenticated caller; `None` means anonymous.
    principal: Option<String>,
    /// Granted role names.
    #[serde(default)]
    roles: BTreeSet<String>,
    /// Free-form attributes attached by the authenticator.
    #[serde(default)]
    attributes: BTreeMap<String, String>,
}

impl SecurityIdentity {
    /// Create a new `SecurityIdentity` builder
    #[must_use]
    pub fn builder() -> SecurityIdentityBuilder {
        SecurityIdentityBuilder::default()
    }

    /// Create an anonymous `SecurityIdentity` with no principal and no roles
    #[must_use]
    pub fn anonymous() -> Self {
        SecurityIdentityBuilder::default().build()
    }

    /// Whether this identity represents an unauthenticated caller.
    #[must_use]
    pub fn is_anonymous(&self) -> bool {
        self.principal.is_none()
    }

    /// Get the principal name, if the caller is authenticated.
    #[must_use]
    pub fn principal(&self) -> Option<&str> {
        self.principal.as_deref()
    }

    /// Get the granted roles.
    #[must_use]
    pub fn roles(&self) -> &BTreeSet<String> {
        &self.roles
    }

    /// Whether the identity holds the given role.
    #[must_use]
    pub fn has_role(&self, role: &str) -> bool {
        self.roles.contains(role)
    }

    /// Get an attribute value by key.
    #[must_use]
    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).map(String::as_str)
    }

    /// Build a new identity with the given roles added to the existing set.
    ///
    /// The receiver is left untouched; identities are values.
    #[must_use]
    pub fn with_additional_roles<I>(&self, roles: I) -> Self
    where
        I: IntoIterator<Item = String>,
    {
        let mut extended = self.roles.clone();
        extended.extend(roles);
        Self {
            principal: self.principal.clone(),
            roles: extended,
            attributes: self.attributes.clone(),
        }
    }
}

#[derive(Default)]
pub struct SecurityIdentityBuilder {
    principal: Option<String>,
    roles: BTreeSet<String>,
    attributes: BTreeMap<String, String>,
}

impl SecurityIdentityBuilder {
    #[must_use]
    pub fn principal(mut self, principal: &str) -> Self {
        self.principal = Some(principal.to_owned());
        self
    }

    #[must_use]
    pub fn role(mut self, role: &str) -> Self {
        self.roles.insert(role.to_owned());
        self
    }

    #[must_use]
    pub fn roles<I>(mut self, roles: I) -> Self
    where
        I: IntoIterator<Item = String>,
    {
        self.roles.extend(roles);
        self
    }

    #[must_use]
    pub fn attribute(mut self, key: &str, value: &str) -> Self {
        self.attributes.insert(key.to_owned(), value.to_owned());
        self
    }

    #[must_use]
    pub fn build(self) -> SecurityIdentity {
        SecurityIdentity {
            principal: self.principal,
            roles: self.roles,
            attributes: self.attributes,
        }
    }
}
