//! # Gateward Auth
//!
//! Declarative authorization engine for async request pipelines.
//!
//! An upstream gateway authenticates callers and injects verified identity
//! headers at the trust boundary; this crate turns those headers into an
//! [`AuthInfo`], carries it through the request's async call chain, and
//! enforces per-operation policy markers (role, scope, ownership,
//! expression, pluggable validator) before a marked operation runs.
//!
//! ## Features
//!
//! - **Header-derived identity** with strict or lenient id/role validation
//! - **Request-scoped propagation** over a task-local scope, safe under
//!   concurrent requests
//! - **Declarative policy markers** resolved at registration time, no
//!   reflection or proxying
//! - **Pluggable ownership validators** registered once at startup
//! - **Embedded boolean expressions** with compiled-program caching
//!
//! ## Example
//!
//! ```rust
//! use std::sync::Arc;
//! use gateward_auth::{
//!     AccessValidationService, AccessValidatorRegistry, AuthContextFilter, HeaderBag,
//!     MethodInvocation, OperationDescriptor, PolicyMarker, SecuredOperation,
//!     SecurityInterceptor,
//! };
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let registry = Arc::new(AccessValidatorRegistry::builder().build());
//! let interceptor =
//!     SecurityInterceptor::new(Arc::new(AccessValidationService::new(registry)));
//!
//! let descriptor = OperationDescriptor::new("ContractService", "get_contract");
//! let operation = SecuredOperation::new(descriptor.clone())
//!     .with_marker(PolicyMarker::requires_role("CUSTOMER"));
//! let invocation = MethodInvocation::new(descriptor).with_arg("contractId", "C-1001");
//!
//! let filter = AuthContextFilter::with_defaults();
//! let headers = HeaderBag::new()
//!     .with("X-Party-ID", "user123")
//!     .with("X-Auth-Roles", "CUSTOMER");
//!
//! let contract = filter
//!     .run("/contracts/C-1001", &headers, || async {
//!         interceptor
//!             .intercept(&operation, &invocation, || async { "contract body" })
//!             .await
//!     })
//!     .await?;
//!
//! assert_eq!(contract, "contract body");
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod context;
pub mod error;
pub mod expr;
pub mod filter;
pub mod interceptor;
pub mod types;
pub mod validator;

// Re-export commonly used types
pub use config::{AuthConfig, ValidationMode};
pub use error::{AuthError, Result};
pub use filter::{AuthContextFilter, HeaderBag};
pub use interceptor::{
    MarkerKind, MethodInvocation, OperationDescriptor, ParamSelector, PolicyMarker,
    SecuredOperation, SecurityInterceptor,
};
pub use types::{AuthInfo, EMPLOYEE_ROLES, SERVICE_ACCOUNT_ROLE};
pub use validator::{
    AccessValidationService, AccessValidator, AccessValidatorRegistry,
    AccessValidatorRegistryBuilder,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
