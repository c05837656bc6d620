//! Core identity types

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Roles that classify a subject as an employee
///
/// Any one of these grants the blanket ownership-check bypass unless a
/// marker disables it.
pub const EMPLOYEE_ROLES: [&str; 5] = [
    "ADMIN",
    "CUSTOMER_SUPPORT",
    "SUPERVISOR",
    "MANAGER",
    "BRANCH_STAFF",
];

/// Role asserted by machine-to-machine callers
pub const SERVICE_ACCOUNT_ROLE: &str = "SERVICE_ACCOUNT";

/// Authenticated subject derived from gateway-injected headers
///
/// Immutable after construction; shared across a request's continuations
/// behind an `Arc` via the request context (see [`crate::context`]).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthInfo {
    /// Party (customer) identifier, empty when absent
    pub party_id: String,

    /// Employee identifier, empty when absent
    pub employee_id: String,

    /// Service account identifier, empty when absent
    pub service_account_id: String,

    /// Granted roles (unordered, case-sensitive, deduplicated)
    #[serde(default)]
    pub roles: HashSet<String>,

    /// Granted scopes, e.g. `contracts.read`
    #[serde(default)]
    pub scopes: HashSet<String>,

    /// Correlation id, empty when absent
    #[serde(default)]
    pub request_id: String,

    /// Free-form context, values coerced at extraction time
    /// (bool, integer, float or string)
    #[serde(default)]
    pub metadata: HashMap<String, Value>,
}

impl AuthInfo {
    /// Create an identity with every field empty
    ///
    /// Guards evaluate against this when a request carries no identity, so
    /// role and scope checks deny naturally.
    pub fn anonymous() -> Self {
        Self {
            party_id: String::new(),
            employee_id: String::new(),
            service_account_id: String::new(),
            roles: HashSet::new(),
            scopes: HashSet::new(),
            request_id: String::new(),
            metadata: HashMap::new(),
        }
    }

    /// Create an identity for a party (customer) subject
    pub fn for_party(party_id: impl Into<String>) -> Self {
        Self {
            party_id: party_id.into(),
            ..Self::anonymous()
        }
    }

    /// Create an identity for an employee subject
    pub fn for_employee(employee_id: impl Into<String>) -> Self {
        Self {
            employee_id: employee_id.into(),
            ..Self::anonymous()
        }
    }

    /// Create an identity for a service account subject
    pub fn for_service_account(service_account_id: impl Into<String>) -> Self {
        Self {
            service_account_id: service_account_id.into(),
            ..Self::anonymous()
        }
    }

    /// Replace the role set
    pub fn with_roles<I, S>(mut self, roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.roles = roles.into_iter().map(Into::into).collect();
        self
    }

    /// Replace the scope set
    pub fn with_scopes<I, S>(mut self, scopes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.scopes = scopes.into_iter().map(Into::into).collect();
        self
    }

    /// Set the correlation id
    pub fn with_request_id(mut self, request_id: impl Into<String>) -> Self {
        self.request_id = request_id.into();
        self
    }

    /// Add a metadata entry
    pub fn with_metadata_entry(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Identity attached to the current request context, if any
    pub fn current() -> Option<Arc<AuthInfo>> {
        crate::context::current_identity()
    }

    /// The authoritative principal, chosen by priority
    /// service account > employee > party
    pub fn subject_id(&self) -> &str {
        if !self.service_account_id.is_empty() {
            &self.service_account_id
        } else if !self.employee_id.is_empty() {
            &self.employee_id
        } else {
            &self.party_id
        }
    }

    /// Whether the subject has the CUSTOMER role
    pub fn is_customer(&self) -> bool {
        self.roles.contains("CUSTOMER")
    }

    /// Whether the subject has any employee role
    pub fn is_employee(&self) -> bool {
        EMPLOYEE_ROLES.iter().any(|role| self.roles.contains(*role))
    }

    /// Whether the subject has the SERVICE_ACCOUNT role
    pub fn is_service_account(&self) -> bool {
        self.roles.contains(SERVICE_ACCOUNT_ROLE)
    }

    /// Whether the subject has the ADMIN role
    pub fn is_admin(&self) -> bool {
        self.roles.contains("ADMIN")
    }

    /// Whether the subject has the CUSTOMER_SUPPORT role
    pub fn is_customer_support(&self) -> bool {
        self.roles.contains("CUSTOMER_SUPPORT")
    }

    /// Whether the subject has the SUPERVISOR role
    pub fn is_supervisor(&self) -> bool {
        self.roles.contains("SUPERVISOR")
    }

    /// Whether the subject has the MANAGER role
    pub fn is_manager(&self) -> bool {
        self.roles.contains("MANAGER")
    }

    /// Whether the subject has the specified role
    pub fn has_role(&self, role: &str) -> bool {
        self.roles.contains(role)
    }

    /// Whether the subject has any of the specified roles
    pub fn has_any_role(&self, roles: &[&str]) -> bool {
        roles.iter().any(|role| self.roles.contains(*role))
    }

    /// Whether the subject has all of the specified roles
    pub fn has_all_roles(&self, roles: &[&str]) -> bool {
        roles.iter().all(|role| self.roles.contains(*role))
    }

    /// Whether the subject has the specified scope
    pub fn has_scope(&self, scope: &str) -> bool {
        self.scopes.contains(scope)
    }

    /// Whether the subject has any of the specified scopes
    pub fn has_any_scope(&self, scopes: &[&str]) -> bool {
        scopes.iter().any(|scope| self.scopes.contains(*scope))
    }

    /// Whether the subject has all of the specified scopes
    pub fn has_all_scopes(&self, scopes: &[&str]) -> bool {
        scopes.iter().all(|scope| self.scopes.contains(*scope))
    }

    /// Get a metadata value by key
    pub fn metadata_value(&self, key: &str) -> Option<&Value> {
        self.metadata.get(key)
    }

    /// Get a metadata value as a string; `None` on missing key or type mismatch
    pub fn metadata_as_str(&self, key: &str) -> Option<&str> {
        match self.metadata.get(key)? {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Get a metadata value as an integer; `None` on missing key or type mismatch
    pub fn metadata_as_i64(&self, key: &str) -> Option<i64> {
        match self.metadata.get(key)? {
            Value::Number(n) => n.as_i64(),
            _ => None,
        }
    }

    /// Get a metadata value as a boolean; `None` on missing key or type mismatch
    pub fn metadata_as_bool(&self, key: &str) -> Option<bool> {
        match self.metadata.get(key)? {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Get a metadata value as a float; `None` on missing key or type mismatch
    ///
    /// Integer-coerced values are not floats; use [`Self::metadata_as_i64`].
    pub fn metadata_as_f64(&self, key: &str) -> Option<f64> {
        match self.metadata.get(key)? {
            Value::Number(n) if !n.is_i64() => n.as_f64(),
            _ => None,
        }
    }

    /// Whether a metadata key exists
    pub fn has_metadata(&self, key: &str) -> bool {
        self.metadata.contains_key(key)
    }

    /// All metadata keys
    pub fn metadata_keys(&self) -> impl Iterator<Item = &str> {
        self.metadata.keys().map(String::as_str)
    }

    /// Whether metadata is empty
    pub fn metadata_is_empty(&self) -> bool {
        self.metadata.is_empty()
    }

    /// Number of metadata entries
    pub fn metadata_len(&self) -> usize {
        self.metadata.len()
    }
}
