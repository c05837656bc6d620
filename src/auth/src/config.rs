//! Engine configuration

use serde::{Deserialize, Serialize};

/// How strictly extraction ties id headers to asserted roles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValidationMode {
    /// The id header matching the asserted role classification must be
    /// present (service account roles require the service account id,
    /// employee roles the employee id, everything else the party id)
    Strict,

    /// Any one of the three id headers suffices, regardless of roles
    Lenient,
}

/// Identity extraction configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Id/role correspondence enforcement
    #[serde(default = "default_mode")]
    pub mode: ValidationMode,

    /// Path prefixes exempt from identity extraction
    /// (documentation and health endpoints)
    #[serde(default = "default_excluded_paths")]
    pub excluded_paths: Vec<String>,
}

fn default_mode() -> ValidationMode {
    ValidationMode::Lenient
}

fn default_excluded_paths() -> Vec<String> {
    vec![
        "/docs".to_string(),
        "/openapi.json".to_string(),
        "/health".to_string(),
        "/metrics".to_string(),
    ]
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            mode: default_mode(),
            excluded_paths: default_excluded_paths(),
        }
    }
}
