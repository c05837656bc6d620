//! Identity extraction from gateway-injected headers
//!
//! An upstream gateway has already authenticated the caller and injects
//! verified identity headers at the trust boundary. This filter turns that
//! header bag into an [`AuthInfo`] and binds it to the request's identity
//! scope. Missing or inconsistent headers yield "no identity", never a
//! transport failure: the request continues unauthenticated and policy
//! guards deny on their own terms.

use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, warn};

use crate::config::{AuthConfig, ValidationMode};
use crate::context;
use crate::types::{AuthInfo, EMPLOYEE_ROLES, SERVICE_ACCOUNT_ROLE};

/// Party (customer) identifier header
pub const PARTY_ID_HEADER: &str = "X-Party-ID";
/// Employee identifier header
pub const EMPLOYEE_ID_HEADER: &str = "X-Employee-ID";
/// Service account identifier header
pub const SERVICE_ACCOUNT_ID_HEADER: &str = "X-Service-Account-ID";
/// Comma-separated roles header
pub const ROLES_HEADER: &str = "X-Auth-Roles";
/// Comma-separated scopes header
pub const SCOPES_HEADER: &str = "X-Auth-Scopes";
/// Correlation id header
pub const REQUEST_ID_HEADER: &str = "X-Request-ID";
/// Prefix for per-entry metadata headers; the remainder of the name
/// becomes the metadata key, case preserved
pub const METADATA_HEADER_PREFIX: &str = "X-Auth-Metadata-";

/// Transport-neutral header bag
///
/// Lookup is case-insensitive per header conventions, while iteration
/// yields names verbatim so metadata keys keep their spelling.
#[derive(Debug, Clone, Default)]
pub struct HeaderBag {
    entries: Vec<(String, String)>,
}

impl HeaderBag {
    /// Create an empty bag
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a header
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.entries.push((name.into(), value.into()));
    }

    /// Append a header, builder style
    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(name, value);
        self
    }

    /// First value for a name, compared case-insensitively
    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// All entries, names verbatim
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the bag is empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<'a> FromIterator<(&'a str, &'a str)> for HeaderBag {
    fn from_iter<I: IntoIterator<Item = (&'a str, &'a str)>>(iter: I) -> Self {
        let mut bag = HeaderBag::new();
        for (name, value) in iter {
            bag.insert(name, value);
        }
        bag
    }
}

/// Per-request identity extraction filter
///
/// Runs once per inbound request, ahead of any policy-marked operation.
#[derive(Debug, Clone, Default)]
pub struct AuthContextFilter {
    config: AuthConfig,
}

impl AuthContextFilter {
    /// Create a filter with the given configuration
    pub fn new(config: AuthConfig) -> Self {
        Self { config }
    }

    /// Create a filter with the default configuration
    /// (lenient mode, standard exempt paths)
    pub fn with_defaults() -> Self {
        Self::default()
    }

    /// Whether the path is exempt from identity extraction
    pub fn is_excluded(&self, path: &str) -> bool {
        self.config
            .excluded_paths
            .iter()
            .any(|prefix| path.starts_with(prefix.as_str()))
    }

    /// Derive an identity from the header bag
    ///
    /// Returns `None` when the required id headers are missing for the
    /// configured [`ValidationMode`]. Absence is not an error; callers
    /// continue the request unauthenticated.
    pub fn extract(&self, headers: &HeaderBag) -> Option<AuthInfo> {
        let party_id = headers.get(PARTY_ID_HEADER).unwrap_or("");
        let employee_id = headers.get(EMPLOYEE_ID_HEADER).unwrap_or("");
        let service_account_id = headers.get(SERVICE_ACCOUNT_ID_HEADER).unwrap_or("");
        let request_id = headers.get(REQUEST_ID_HEADER).unwrap_or("");

        let roles = parse_list(headers.get(ROLES_HEADER));
        let scopes = parse_list(headers.get(SCOPES_HEADER));

        debug!(
            "Extracting identity: roles={:?}, scopes={:?}, requestId={}",
            roles, scopes, request_id
        );

        // Classifications are independent predicates, not an enum; a header
        // set asserting both is accepted.
        let is_employee = roles.iter().any(|r| EMPLOYEE_ROLES.contains(&r.as_str()));
        let is_service_account = roles.contains(SERVICE_ACCOUNT_ROLE);

        let ids_valid = match self.config.mode {
            ValidationMode::Strict => {
                if is_service_account {
                    !service_account_id.is_empty()
                } else if is_employee {
                    !employee_id.is_empty()
                } else {
                    !party_id.is_empty()
                }
            }
            ValidationMode::Lenient => {
                !party_id.is_empty() || !employee_id.is_empty() || !service_account_id.is_empty()
            }
        };

        if !ids_valid {
            warn!(
                "Missing required id header; at least one of {}, {} or {} must be provided",
                PARTY_ID_HEADER, EMPLOYEE_ID_HEADER, SERVICE_ACCOUNT_ID_HEADER
            );
            return None;
        }

        Some(AuthInfo {
            party_id: party_id.to_string(),
            employee_id: employee_id.to_string(),
            service_account_id: service_account_id.to_string(),
            roles,
            scopes,
            request_id: request_id.to_string(),
            metadata: extract_metadata(headers),
        })
    }

    /// Run a request handler with extraction applied
    ///
    /// Exempt paths and failed extraction both run the handler inside an
    /// unauthenticated identity scope; a derived identity is bound for the
    /// handler's whole duration.
    pub async fn run<H, Fut, T>(&self, path: &str, headers: &HeaderBag, handler: H) -> T
    where
        H: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        if self.is_excluded(path) {
            debug!("Bypassing identity extraction for exempt path: {}", path);
            return context::with_identity(None, handler()).await;
        }

        let identity = self.extract(headers).map(Arc::new);
        if identity.is_none() {
            debug!("Request to {} proceeding unauthenticated", path);
        }
        context::with_identity(identity, handler()).await
    }
}

fn parse_list(raw: Option<&str>) -> HashSet<String> {
    match raw {
        Some(text) => text
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect(),
        None => HashSet::new(),
    }
}

fn extract_metadata(headers: &HeaderBag) -> HashMap<String, Value> {
    let prefix = METADATA_HEADER_PREFIX.as_bytes();
    let mut metadata = HashMap::new();

    for (name, value) in headers.iter() {
        let bytes = name.as_bytes();
        if bytes.len() <= prefix.len() || !bytes[..prefix.len()].eq_ignore_ascii_case(prefix) {
            continue;
        }
        let key = &name[prefix.len()..];
        metadata.insert(key.to_string(), coerce_metadata_value(value));
    }

    metadata
}

/// Coerce a raw metadata header value, fixed precedence: boolean literal,
/// integer literal, decimal literal, raw string. Whitespace is preserved,
/// unlike role and scope parsing.
fn coerce_metadata_value(raw: &str) -> Value {
    match raw {
        "true" => return Value::Bool(true),
        "false" => return Value::Bool(false),
        _ => {}
    }
    if let Ok(int) = raw.parse::<i64>() {
        return Value::from(int);
    }
    if let Ok(float) = raw.parse::<f64>() {
        if let Some(number) = serde_json::Number::from_f64(float) {
            return Value::Number(number);
        }
    }
    Value::String(raw.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strict_filter() -> AuthContextFilter {
        AuthContextFilter::new(AuthConfig {
            mode: ValidationMode::Strict,
            ..AuthConfig::default()
        })
    }

    #[test]
    fn test_header_bag_lookup_is_case_insensitive() {
        let bag = HeaderBag::new().with("X-Party-ID", "user123");

        assert_eq!(bag.get("x-party-id"), Some("user123"));
        assert_eq!(bag.get("X-PARTY-ID"), Some("user123"));
        assert_eq!(bag.get("X-Employee-ID"), None);
    }

    #[test]
    fn test_extract_customer_identity() {
        let filter = AuthContextFilter::with_defaults();
        let headers = HeaderBag::new()
            .with("X-Party-ID", "user123")
            .with("X-Auth-Roles", "CUSTOMER")
            .with("X-Auth-Scopes", "contracts.read, accounts.read")
            .with("X-Request-ID", "req-42");

        let auth = filter.extract(&headers).unwrap();
        assert_eq!(auth.party_id, "user123");
        assert_eq!(auth.subject_id(), "user123");
        assert!(auth.is_customer());
        assert!(auth.has_scope("contracts.read"));
        assert!(auth.has_scope("accounts.read"));
        assert_eq!(auth.request_id, "req-42");
    }

    #[test]
    fn test_extract_trims_and_dedupes_roles() {
        let filter = AuthContextFilter::with_defaults();
        let headers = HeaderBag::new()
            .with("X-Party-ID", "user123")
            .with("X-Auth-Roles", " CUSTOMER , CUSTOMER, ,ADMIN ");

        let auth = filter.extract(&headers).unwrap();
        assert_eq!(auth.roles.len(), 2);
        assert!(auth.has_role("CUSTOMER"));
        assert!(auth.has_role("ADMIN"));
    }

    #[test]
    fn test_extract_without_any_id_yields_none() {
        let headers = HeaderBag::new().with("X-Auth-Roles", "CUSTOMER");

        assert!(AuthContextFilter::with_defaults().extract(&headers).is_none());
        assert!(strict_filter().extract(&headers).is_none());
    }

    #[test]
    fn test_lenient_accepts_mismatched_id() {
        // Employee role asserted, but only a party id supplied
        let headers = HeaderBag::new()
            .with("X-Party-ID", "user123")
            .with("X-Auth-Roles", "ADMIN");

        let auth = AuthContextFilter::with_defaults().extract(&headers).unwrap();
        assert!(auth.is_employee());
        assert_eq!(auth.subject_id(), "user123");
    }

    #[test]
    fn test_strict_requires_matching_id() {
        let headers = HeaderBag::new()
            .with("X-Party-ID", "user123")
            .with("X-Auth-Roles", "ADMIN");

        assert!(strict_filter().extract(&headers).is_none());

        let headers = HeaderBag::new()
            .with("X-Employee-ID", "emp1")
            .with("X-Auth-Roles", "ADMIN");

        let auth = strict_filter().extract(&headers).unwrap();
        assert_eq!(auth.subject_id(), "emp1");
    }

    #[test]
    fn test_strict_service_account_takes_precedence_over_employee() {
        // Both classifications asserted; service account id is the one required
        let headers = HeaderBag::new()
            .with("X-Service-Account-ID", "svc1")
            .with("X-Auth-Roles", "SERVICE_ACCOUNT,ADMIN");

        let auth = strict_filter().extract(&headers).unwrap();
        assert_eq!(auth.subject_id(), "svc1");
        assert!(auth.is_employee());
        assert!(auth.is_service_account());
    }

    #[test]
    fn test_metadata_extraction_and_coercion() {
        let filter = AuthContextFilter::with_defaults();
        let headers = HeaderBag::new()
            .with("X-Party-ID", "user123")
            .with("X-Auth-Roles", "CUSTOMER")
            .with("X-Auth-Metadata-Department", "IT")
            .with("X-Auth-Metadata-Level", "5")
            .with("X-Auth-Metadata-Active", "true")
            .with("X-Auth-Metadata-Score", "95.5");

        let auth = filter.extract(&headers).unwrap();
        assert_eq!(auth.metadata_len(), 4);
        assert_eq!(auth.metadata_as_str("Department"), Some("IT"));
        assert_eq!(auth.metadata_as_i64("Level"), Some(5));
        assert_eq!(auth.metadata_as_bool("Active"), Some(true));
        assert_eq!(auth.metadata_as_f64("Score"), Some(95.5));

        // Metadata keys preserve the header spelling
        assert!(auth.has_metadata("Department"));
        assert!(!auth.has_metadata("department"));
    }

    #[test]
    fn test_metadata_lookup_is_case_insensitive_on_prefix_only() {
        let filter = AuthContextFilter::with_defaults();
        let headers = HeaderBag::new()
            .with("X-Party-ID", "user123")
            .with("x-auth-metadata-Branch", "Main");

        let auth = filter.extract(&headers).unwrap();
        assert_eq!(auth.metadata_as_str("Branch"), Some("Main"));
    }

    #[test]
    fn test_metadata_preserves_whitespace() {
        let filter = AuthContextFilter::with_defaults();
        let headers = HeaderBag::new()
            .with("X-Party-ID", "user123")
            .with("X-Auth-Metadata-Note", "  spaced  ")
            .with("X-Auth-Metadata-Padded", " 5 ");

        let auth = filter.extract(&headers).unwrap();
        assert_eq!(auth.metadata_as_str("Note"), Some("  spaced  "));
        // Whitespace keeps the value from parsing as an integer
        assert_eq!(auth.metadata_as_str("Padded"), Some(" 5 "));
        assert_eq!(auth.metadata_as_i64("Padded"), None);
    }

    #[test]
    fn test_metadata_boolean_literal_is_case_sensitive() {
        let filter = AuthContextFilter::with_defaults();
        let headers = HeaderBag::new()
            .with("X-Party-ID", "user123")
            .with("X-Auth-Metadata-Flag", "True");

        let auth = filter.extract(&headers).unwrap();
        assert_eq!(auth.metadata_as_bool("Flag"), None);
        assert_eq!(auth.metadata_as_str("Flag"), Some("True"));
    }

    #[test]
    fn test_non_finite_decimal_falls_back_to_string() {
        assert_eq!(coerce_metadata_value("NaN"), Value::String("NaN".into()));
        assert_eq!(coerce_metadata_value("inf"), Value::String("inf".into()));
    }

    #[test]
    fn test_excluded_paths() {
        let filter = AuthContextFilter::with_defaults();

        assert!(filter.is_excluded("/health"));
        assert!(filter.is_excluded("/docs/index.html"));
        assert!(!filter.is_excluded("/contracts/C-1001"));
    }

    #[tokio::test]
    async fn test_run_binds_identity_scope() {
        let filter = AuthContextFilter::with_defaults();
        let headers = HeaderBag::new()
            .with("X-Party-ID", "user123")
            .with("X-Auth-Roles", "CUSTOMER");

        let party_id = filter
            .run("/contracts/C-1001", &headers, || async {
                crate::context::current_identity().map(|a| a.party_id.clone())
            })
            .await;

        assert_eq!(party_id.as_deref(), Some("user123"));
    }

    #[tokio::test]
    async fn test_run_exempt_path_has_no_identity() {
        let filter = AuthContextFilter::with_defaults();
        let headers = HeaderBag::new()
            .with("X-Party-ID", "user123")
            .with("X-Auth-Roles", "CUSTOMER");

        let identity = filter
            .run("/health", &headers, || async {
                crate::context::current_identity()
            })
            .await;

        assert!(identity.is_none());
    }

    #[tokio::test]
    async fn test_run_continues_unauthenticated_on_extraction_failure() {
        let filter = AuthContextFilter::with_defaults();
        let headers = HeaderBag::new().with("X-Auth-Roles", "CUSTOMER");

        let outcome = filter
            .run("/contracts/C-1001", &headers, || async {
                crate::context::current_identity().is_none()
            })
            .await;

        assert!(outcome, "handler should still run, unauthenticated");
    }
}
