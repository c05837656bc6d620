//! Pluggable resource-access validation

mod registry;
mod service;

pub use registry::{AccessValidatorRegistry, AccessValidatorRegistryBuilder};
pub use service::AccessValidationService;

use async_trait::async_trait;

use crate::error::Result;
use crate::types::AuthInfo;

/// Contract answering "can this identity access this resource instance"
/// for one resource type
///
/// Implementations may perform I/O (database lookups, service calls) and
/// must not block; results are never cached by the engine since ownership
/// can change between calls.
#[async_trait]
pub trait AccessValidator: Send + Sync {
    /// Resource type this validator is responsible for
    ///
    /// Used as the registry key unless an explicit type is given at
    /// registration time.
    fn resource_name(&self) -> &str;

    /// Whether the identity may access the resource instance
    async fn can_access(&self, resource_id: &str, auth: &AuthInfo) -> Result<bool>;
}
