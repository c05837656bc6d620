//! Security interception for policy-marked operations
//!
//! The dispatch core: resolves an operation's effective markers, evaluates
//! each one's guard against the identity in the request context, and gates
//! the wrapped invocation. A denial short-circuits before the wrapped call;
//! a permit invokes it exactly once and forwards whatever it produces,
//! including its own failures, unchanged.

mod invocation;
mod markers;

pub use invocation::{Argument, MethodInvocation, OperationDescriptor};
pub use markers::{MarkerKind, ParamSelector, PolicyMarker, SecuredOperation};

use std::future::Future;
use std::sync::Arc;

use futures::Stream;
use serde_json::{json, Value};
use tracing::{debug, error, warn};

use crate::context;
use crate::error::{AuthError, Result};
use crate::expr::{self, EvalScope, ExprError};
use crate::types::AuthInfo;
use crate::validator::AccessValidationService;

/// Enforces policy markers around operation invocations
pub struct SecurityInterceptor {
    validation: Arc<AccessValidationService>,
    evaluator: Arc<expr::Engine>,
}

impl SecurityInterceptor {
    /// Create an interceptor with its own expression engine
    pub fn new(validation: Arc<AccessValidationService>) -> Self {
        Self {
            validation,
            evaluator: Arc::new(expr::Engine::new()),
        }
    }

    /// Create an interceptor sharing an existing expression engine
    ///
    /// Lets several interceptors share one compiled-expression cache.
    pub fn with_evaluator(
        validation: Arc<AccessValidationService>,
        evaluator: Arc<expr::Engine>,
    ) -> Self {
        Self {
            validation,
            evaluator,
        }
    }

    /// Evaluate every effective marker of the operation against the
    /// current identity
    ///
    /// Guards run in marker-kind order; the first failure denies. Absent
    /// identity evaluates against the anonymous identity, so markers
    /// typically deny unauthenticated requests.
    pub async fn authorize(
        &self,
        operation: &SecuredOperation,
        invocation: &MethodInvocation,
    ) -> Result<()> {
        let auth = context::current_identity()
            .unwrap_or_else(|| Arc::new(AuthInfo::anonymous()));

        let markers = operation.effective_markers();
        debug!(
            "Authorizing {} with {} markers",
            invocation.descriptor(),
            markers.len()
        );

        for marker in markers {
            self.check_marker(marker, invocation, &auth).await?;
        }
        Ok(())
    }

    /// Gate a deferred operation
    ///
    /// The closure is invoked exactly once on permit and never on denial.
    pub async fn intercept<F, Fut, T>(
        &self,
        operation: &SecuredOperation,
        invocation: &MethodInvocation,
        call: F,
    ) -> Result<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        self.authorize(operation, invocation).await?;
        Ok(call().await)
    }

    /// Gate a stream-producing operation
    ///
    /// On denial the stream is never constructed; on permit it is returned
    /// unchanged for the caller to consume.
    pub async fn intercept_stream<F, S>(
        &self,
        operation: &SecuredOperation,
        invocation: &MethodInvocation,
        call: F,
    ) -> Result<S>
    where
        F: FnOnce() -> S,
        S: Stream,
    {
        self.authorize(operation, invocation).await?;
        Ok(call())
    }

    /// Gate an operation producing an already-available value
    pub async fn intercept_value<F, T>(
        &self,
        operation: &SecuredOperation,
        invocation: &MethodInvocation,
        call: F,
    ) -> Result<T>
    where
        F: FnOnce() -> T,
    {
        self.authorize(operation, invocation).await?;
        Ok(call())
    }

    async fn check_marker(
        &self,
        marker: &PolicyMarker,
        invocation: &MethodInvocation,
        auth: &Arc<AuthInfo>,
    ) -> Result<()> {
        match marker {
            PolicyMarker::RequiresRole { role, any_of } => self.check_role(role, *any_of, auth),
            PolicyMarker::RequiresScope { scope, any_of } => {
                self.check_scope(scope, *any_of, auth)
            }
            PolicyMarker::RequiresOwnership {
                resource,
                selector,
                access_type,
                bypass_for_backoffice,
            } => {
                self.check_ownership(
                    resource,
                    selector,
                    access_type,
                    *bypass_for_backoffice,
                    invocation,
                    auth,
                )
                .await
            }
            PolicyMarker::RequiresExpression { expression } => {
                self.check_expression(expression, false, invocation, auth)
            }
            PolicyMarker::PreAuthorize { expression } => {
                self.check_expression(expression, true, invocation, auth)
            }
            PolicyMarker::CheckAccess { resource, id_param } => {
                self.check_access(resource, id_param, invocation, auth).await
            }
        }
    }

    fn check_role(&self, role: &str, any_of: bool, auth: &AuthInfo) -> Result<()> {
        let granted = if any_of {
            auth.has_role(role)
        } else {
            auth.roles.contains(role)
        };
        if granted {
            return Ok(());
        }
        warn!(
            "Access denied: subject with roles {:?} does not have required role: {}",
            auth.roles, role
        );
        Err(AuthError::AccessDenied(format!(
            "required role '{}' not found",
            role
        )))
    }

    fn check_scope(&self, scope: &str, any_of: bool, auth: &AuthInfo) -> Result<()> {
        let granted = if any_of {
            auth.has_scope(scope)
        } else {
            auth.scopes.contains(scope)
        };
        if granted {
            return Ok(());
        }
        warn!(
            "Access denied: subject with scopes {:?} does not have required scope: {}",
            auth.scopes, scope
        );
        Err(AuthError::AccessDenied(format!(
            "required scope '{}' not found",
            scope
        )))
    }

    async fn check_ownership(
        &self,
        resource: &str,
        selector: &ParamSelector,
        access_type: &str,
        bypass_for_backoffice: bool,
        invocation: &MethodInvocation,
        auth: &AuthInfo,
    ) -> Result<()> {
        let Some(value) = selector.resolve(invocation) else {
            error!(
                "Resource id parameter not found for operation: {}",
                invocation.descriptor()
            );
            return Err(AuthError::Configuration(format!(
                "resource id parameter not found for operation '{}'",
                invocation.descriptor()
            )));
        };
        let resource_id = value_to_id(value);

        if bypass_for_backoffice && auth.is_employee() {
            debug!(
                "Subject has an employee role, bypassing ownership check for {}: {}",
                resource, resource_id
            );
            return Ok(());
        }

        debug!(
            "Checking {} access to {}: {} for subject: {}",
            access_type,
            resource,
            resource_id,
            auth.subject_id()
        );
        if self
            .validation
            .validate_access(resource, &resource_id, auth)
            .await?
        {
            return Ok(());
        }
        warn!(
            "Access denied: subject {} is not the owner of resource: {} with id: {}",
            auth.subject_id(),
            resource,
            resource_id
        );
        Err(AuthError::AccessDenied(format!(
            "subject is not the owner of resource '{}' with id '{}'",
            resource, resource_id
        )))
    }

    fn check_expression(
        &self,
        expression: &str,
        with_predicates: bool,
        invocation: &MethodInvocation,
        auth: &Arc<AuthInfo>,
    ) -> Result<()> {
        let program = self.evaluator.compile(expression).map_err(|e| {
            error!("Invalid policy expression '{}': {}", expression, e);
            AuthError::from(e)
        })?;

        let mut scope = EvalScope::new()
            .with_variable("authInfo", identity_value(auth))
            .with_variable("args", invocation.args_object())
            .with_variable(
                "target",
                Value::String(invocation.descriptor().target.clone()),
            )
            .with_variable("method", Value::String(invocation.descriptor().name.clone()));
        if with_predicates {
            scope = scope.with_identity_predicates(auth.clone());
        }

        let result = self.evaluator.evaluate(&program, &scope).map_err(|e| {
            warn!("Expression evaluation failed for '{}': {}", expression, e);
            AuthError::from(e)
        })?;

        match result {
            Value::Bool(true) => Ok(()),
            Value::Bool(false) | Value::Null => {
                warn!(
                    "Access denied: expression '{}' evaluated to false for subject {}",
                    expression,
                    auth.subject_id()
                );
                Err(AuthError::AccessDenied(format!(
                    "expression '{}' evaluated to false",
                    expression
                )))
            }
            _ => Err(AuthError::Evaluation(ExprError::NonBooleanResult)),
        }
    }

    async fn check_access(
        &self,
        resource: &str,
        id_param: &str,
        invocation: &MethodInvocation,
        auth: &AuthInfo,
    ) -> Result<()> {
        let Some(value) = invocation.arg_by_name(id_param) else {
            error!(
                "Parameter '{}' not found on operation: {}",
                id_param,
                invocation.descriptor()
            );
            return Err(AuthError::Configuration(format!(
                "parameter '{}' not found on operation '{}'",
                id_param,
                invocation.descriptor()
            )));
        };
        let resource_id = value_to_id(value);

        debug!(
            "Checking access for resource type: {}, resource id: {}, subject: {}",
            resource,
            resource_id,
            auth.subject_id()
        );
        if self
            .validation
            .validate_access(resource, &resource_id, auth)
            .await?
        {
            return Ok(());
        }
        warn!(
            "Access denied for resource type: {}, resource id: {}, subject: {}",
            resource,
            resource_id,
            auth.subject_id()
        );
        Err(AuthError::AccessDenied(format!(
            "access denied to resource '{}' with id '{}'",
            resource, resource_id
        )))
    }
}

/// Identity as the expression-variable surface, camelCase with the
/// resolved subject id included
fn identity_value(auth: &AuthInfo) -> Value {
    json!({
        "partyId": auth.party_id,
        "employeeId": auth.employee_id,
        "serviceAccountId": auth.service_account_id,
        "subjectId": auth.subject_id(),
        "requestId": auth.request_id,
        "roles": auth.roles.iter().collect::<Vec<_>>(),
        "scopes": auth.scopes.iter().collect::<Vec<_>>(),
        "metadata": auth.metadata,
    })
}

fn value_to_id(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
