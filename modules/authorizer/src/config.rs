use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

fn default_enabled() -> bool {
    true
}

/// Authorization pipeline configuration.
///
/// Built once at startup and read-only thereafter; the policy list itself is
/// wired in code, not configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AuthorizerConfig {
    /// Disable authorization completely. When false, every request proceeds
    /// unmodified: no policy is evaluated and no event fires.
    /// Default: true (authorization enforced).
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// `role -> [role, ...]` expansion applied to the caller identity before
    /// the policy chain runs. Empty means no mapping is configured and the
    /// augmentation step is skipped entirely.
    #[serde(default)]
    pub roles_mapping: BTreeMap<String, Vec<String>>,

    /// Observability event gates.
    #[serde(default)]
    pub events: EventsConfig,
}

impl Default for AuthorizerConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            roles_mapping: BTreeMap::new(),
            events: EventsConfig::default(),
        }
    }
}

/// Independent gates for success/failure authorization events.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields, default)]
pub struct EventsConfig {
    /// Emit an event when a request passes the policy chain.
    pub on_success: bool,
    /// Emit an event when a request is denied or authorization fails.
    pub on_failure: bool,
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config: AuthorizerConfig = serde_json::from_str("{}").unwrap();

        assert!(config.enabled);
        assert!(config.roles_mapping.is_empty());
        assert!(!config.events.on_success);
        assert!(!config.events.on_failure);
    }

    #[test]
    fn test_full_config_parses() {
        let config: AuthorizerConfig = serde_json::from_value(serde_json::json!({
            "enabled": false,
            "roles_mapping": { "user": ["reader", "writer"] },
            "events": { "on_success": true, "on_failure": true },
        }))
        .unwrap();

        assert!(!config.enabled);
        assert_eq!(
            config.roles_mapping.get("user"),
            Some(&vec!["reader".to_owned(), "writer".to_owned()])
        );
        assert!(config.events.on_success);
        assert!(config.events.on_failure);
    }

    #[test]
    fn test_unknown_fields_rejected() {
        let result: Result<AuthorizerConfig, _> =
            serde_json::from_value(serde_json::json!({ "unknown": true }));

        assert!(result.is_err());
    }
}
