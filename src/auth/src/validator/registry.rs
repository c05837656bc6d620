//! Registry for access validators

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{info, warn};

use crate::validator::AccessValidator;

/// Build-time registration of access validators
///
/// The host application registers every validator during startup, before
/// any request is served; [`AccessValidatorRegistryBuilder::build`] freezes
/// the table.
#[derive(Default)]
pub struct AccessValidatorRegistryBuilder {
    validators: HashMap<String, Arc<dyn AccessValidator>>,
}

impl AccessValidatorRegistryBuilder {
    /// Create an empty builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a validator under its self-reported resource name
    pub fn register(self, validator: Arc<dyn AccessValidator>) -> Self {
        let resource_type = validator.resource_name().to_string();
        self.register_for(resource_type, validator)
    }

    /// Register a validator under an explicit resource type
    ///
    /// The explicit type overrides the validator's self-reported name.
    /// Re-registering a type replaces the earlier entry; the last
    /// registration wins.
    pub fn register_for(
        mut self,
        resource_type: impl Into<String>,
        validator: Arc<dyn AccessValidator>,
    ) -> Self {
        let resource_type = resource_type.into();
        if self
            .validators
            .insert(resource_type.clone(), validator)
            .is_some()
        {
            warn!(
                "Replacing previously registered validator for resource type: {}",
                resource_type
            );
        }
        self
    }

    /// Freeze the registration table
    pub fn build(self) -> AccessValidatorRegistry {
        let mut resource_types: Vec<&str> = self.validators.keys().map(String::as_str).collect();
        resource_types.sort_unstable();
        info!(
            "Registered {} access validators: {:?}",
            self.validators.len(),
            resource_types
        );

        AccessValidatorRegistry {
            validators: self.validators,
        }
    }
}

/// Immutable index of access validators by resource type
///
/// Built once at process start; safe for unsynchronized concurrent reads.
pub struct AccessValidatorRegistry {
    validators: HashMap<String, Arc<dyn AccessValidator>>,
}

impl AccessValidatorRegistry {
    /// Start building a registry
    pub fn builder() -> AccessValidatorRegistryBuilder {
        AccessValidatorRegistryBuilder::new()
    }

    /// Validator for the given resource type, if registered
    pub fn validator(&self, resource_type: &str) -> Option<Arc<dyn AccessValidator>> {
        self.validators.get(resource_type).cloned()
    }

    /// Whether a validator is registered for the resource type
    pub fn has_validator(&self, resource_type: &str) -> bool {
        self.validators.contains_key(resource_type)
    }

    /// Number of registered validators
    pub fn len(&self) -> usize {
        self.validators.len()
    }

    /// Whether the registry is empty
    pub fn is_empty(&self) -> bool {
        self.validators.is_empty()
    }

    /// Registered resource types, sorted
    pub fn resource_types(&self) -> Vec<&str> {
        let mut types: Vec<&str> = self.validators.keys().map(String::as_str).collect();
        types.sort_unstable();
        types
    }
}
