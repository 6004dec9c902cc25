use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use crate::identity::SecurityIdentity;

/// Static `role -> [role, ...]` expansion table.
///
/// Built once at startup from configuration and shared read-only across all
/// in-flight requests. Applying the mapping is a pure transform producing a
/// new identity; the input identity is never mutated.
#[derive(Debug, Clone)]
pub struct RolesMapping {
    mapping: BTreeMap<String, Vec<String>>,
}

impl RolesMapping {
    /// Build a shared mapping from configuration, or `None` when the table
    /// is empty (the augmentation step is skipped entirely in that case).
    #[must_use]
    pub fn of(mapping: &BTreeMap<String, Vec<String>>) -> Option<Arc<Self>> {
        if mapping.is_empty() {
            return None;
        }
        Some(Arc::new(Self {
            mapping: mapping.clone(),
        }))
    }

    /// Apply the mapping to an identity, unioning mapped roles into the
    /// existing set.
    ///
    /// Returns the same `Arc` when nothing changed (anonymous caller, or no
    /// configured role matched), so callers can rely on pointer identity to
    /// detect that augmentation actually happened.
    #[must_use]
    pub fn apply(&self, identity: &Arc<SecurityIdentity>) -> Arc<SecurityIdentity> {
        if identity.is_anonymous() {
            return Arc::clone(identity);
        }

        let mut added: BTreeSet<String> = BTreeSet::new();
        for role in identity.roles() {
            if let Some(mapped) = self.mapping.get(role) {
                for target in mapped {
                    if !identity.has_role(target) {
                        added.insert(target.clone());
                    }
                }
            }
        }

        if added.is_empty() {
            return Arc::clone(identity);
        }
        Arc::new(identity.with_additional_roles(added))
    }
}
