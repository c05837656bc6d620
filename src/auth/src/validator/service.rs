//! Access validation by resource type

use std::sync::Arc;

use tracing::{debug, error};

use crate::error::{AuthError, Result};
use crate::types::AuthInfo;
use crate::validator::AccessValidatorRegistry;

/// Resolves a resource type to its validator and executes the ownership check
///
/// Employee identities short-circuit to a permit at this layer; the
/// per-marker bypass flag is handled by the interceptor before the service
/// is consulted at all.
pub struct AccessValidationService {
    registry: Arc<AccessValidatorRegistry>,
}

impl AccessValidationService {
    /// Create a service over a frozen registry
    pub fn new(registry: Arc<AccessValidatorRegistry>) -> Self {
        Self { registry }
    }

    /// Whether the identity may access the given resource instance
    ///
    /// # Errors
    /// Returns `AuthError::MissingValidator` when no validator is registered
    /// for the resource type: incomplete policy configuration denies, it
    /// never silently permits.
    pub async fn validate_access(
        &self,
        resource_type: &str,
        resource_id: &str,
        auth: &AuthInfo,
    ) -> Result<bool> {
        if auth.is_employee() {
            debug!(
                "Subject has an employee role, granting access to {}: {}",
                resource_type, resource_id
            );
            return Ok(true);
        }

        let Some(validator) = self.registry.validator(resource_type) else {
            error!("No validator found for resource type: {}", resource_type);
            return Err(AuthError::MissingValidator(resource_type.to_string()));
        };

        debug!(
            "Validating access to {}: {} for subject: {}",
            resource_type,
            resource_id,
            auth.subject_id()
        );
        validator.can_access(resource_id, auth).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validator::AccessValidator;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingValidator {
        calls: Arc<AtomicUsize>,
        allow: bool,
    }

    #[async_trait]
    impl AccessValidator for CountingValidator {
        fn resource_name(&self) -> &str {
            "contract"
        }

        async fn can_access(&self, _resource_id: &str, _auth: &AuthInfo) -> Result<bool> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.allow)
        }
    }

    fn service_with(validator: CountingValidator) -> AccessValidationService {
        let registry = AccessValidatorRegistry::builder()
            .register(Arc::new(validator))
            .build();
        AccessValidationService::new(Arc::new(registry))
    }

    #[tokio::test]
    async fn test_employee_bypasses_validator() {
        let calls = Arc::new(AtomicUsize::new(0));
        let service = service_with(CountingValidator {
            calls: calls.clone(),
            allow: false,
        });

        let auth = AuthInfo::for_employee("emp1").with_roles(["ADMIN"]);
        let allowed = service.validate_access("contract", "C-1", &auth).await.unwrap();

        assert!(allowed);
        assert_eq!(calls.load(Ordering::SeqCst), 0, "validator must not run");
    }

    #[tokio::test]
    async fn test_delegates_to_validator() {
        let calls = Arc::new(AtomicUsize::new(0));
        let service = service_with(CountingValidator {
            calls: calls.clone(),
            allow: true,
        });

        let auth = AuthInfo::for_party("user123").with_roles(["CUSTOMER"]);
        let allowed = service.validate_access("contract", "C-1", &auth).await.unwrap();

        assert!(allowed);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_validator_denial_passes_through() {
        let calls = Arc::new(AtomicUsize::new(0));
        let service = service_with(CountingValidator {
            calls,
            allow: false,
        });

        let auth = AuthInfo::for_party("user123").with_roles(["CUSTOMER"]);
        let allowed = service.validate_access("contract", "C-1", &auth).await.unwrap();

        assert!(!allowed);
    }

    #[tokio::test]
    async fn test_missing_validator_is_configuration_error() {
        let registry = AccessValidatorRegistry::builder().build();
        let service = AccessValidationService::new(Arc::new(registry));

        let auth = AuthInfo::for_party("user123").with_roles(["CUSTOMER"]);
        let result = service.validate_access("unregistered-type", "R-1", &auth).await;

        assert!(matches!(result, Err(AuthError::MissingValidator(t)) if t == "unregistered-type"));
    }

    #[tokio::test]
    async fn test_missing_validator_still_bypassed_for_employee() {
        // The employee shortcut runs before validator lookup
        let registry = AccessValidatorRegistry::builder().build();
        let service = AccessValidationService::new(Arc::new(registry));

        let auth = AuthInfo::for_employee("emp1").with_roles(["MANAGER"]);
        let allowed = service.validate_access("unregistered-type", "R-1", &auth).await.unwrap();

        assert!(allowed);
    }
}
