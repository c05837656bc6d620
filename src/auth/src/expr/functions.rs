//! Identity predicate functions exposed to policy expressions
//!
//! Bound by the interceptor for pre-authorize markers so that policy text
//! can read naturally, e.g. `hasRole('ADMIN') && hasScope('contracts.write')`.

use std::sync::Arc;

use serde_json::Value;

use crate::expr::error::{ExprError, Result};
use crate::expr::scope::EvalScope;
use crate::types::AuthInfo;

fn string_args<'a>(function: &str, args: &'a [Value]) -> Result<Vec<&'a str>> {
    if args.is_empty() {
        return Err(ExprError::Function(format!(
            "{} requires at least one argument",
            function
        )));
    }
    args.iter()
        .map(|value| {
            value.as_str().ok_or_else(|| {
                ExprError::Function(format!("{} arguments must be strings", function))
            })
        })
        .collect()
}

impl EvalScope {
    /// Bind `hasRole`, `hasAnyRole`, `hasScope` and `hasAnyScope` against
    /// the given identity
    pub fn with_identity_predicates(self, auth: Arc<AuthInfo>) -> Self {
        let has_role = auth.clone();
        let has_any_role = auth.clone();
        let has_scope = auth.clone();
        let has_any_scope = auth;

        self.with_fn("hasRole", move |args| {
            let roles = string_args("hasRole", args)?;
            Ok(Value::Bool(has_role.has_role(roles[0])))
        })
        .with_fn("hasAnyRole", move |args| {
            let roles = string_args("hasAnyRole", args)?;
            Ok(Value::Bool(has_any_role.has_any_role(&roles)))
        })
        .with_fn("hasScope", move |args| {
            let scopes = string_args("hasScope", args)?;
            Ok(Value::Bool(has_scope.has_scope(scopes[0])))
        })
        .with_fn("hasAnyScope", move |args| {
            let scopes = string_args("hasAnyScope", args)?;
            Ok(Value::Bool(has_any_scope.has_any_scope(&scopes)))
        })
    }
}
