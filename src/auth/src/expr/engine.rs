//! Expression engine with compiled program caching

use std::sync::Arc;

use dashmap::DashMap;
use serde_json::Value;

use crate::expr::error::{ExprError, Result};
use crate::expr::parser::{self, Expr};
use crate::expr::scope::EvalScope;

/// Engine for compiling and evaluating policy expressions
///
/// Marker expression text is fixed at declaration time, so compiled trees
/// are cached by source text. Evaluation never mutates engine state; each
/// call binds a fresh scope.
#[derive(Default)]
pub struct Engine {
    /// Compiled program cache (thread-safe)
    program_cache: DashMap<String, Arc<Expr>>,
}

impl Engine {
    /// Create a new expression engine
    pub fn new() -> Self {
        Self {
            program_cache: DashMap::new(),
        }
    }

    /// Compile an expression and cache the result
    ///
    /// # Errors
    /// Returns `ExprError::Parse` if the expression cannot be compiled.
    pub fn compile(&self, expression: &str) -> Result<Arc<Expr>> {
        if let Some(program) = self.program_cache.get(expression) {
            return Ok(program.clone());
        }

        let program = Arc::new(parser::parse(expression)?);
        self.program_cache
            .insert(expression.to_string(), program.clone());

        Ok(program)
    }

    /// Evaluate a compiled program against the given scope
    pub fn evaluate(&self, program: &Expr, scope: &EvalScope) -> Result<Value> {
        eval(program, scope)
    }

    /// Compile and evaluate an expression in one call
    pub fn evaluate_expression(&self, expression: &str, scope: &EvalScope) -> Result<Value> {
        let program = self.compile(expression)?;
        self.evaluate(&program, scope)
    }

    /// Clear the compiled program cache
    pub fn clear_cache(&self) {
        self.program_cache.clear();
    }

    /// Get cache statistics
    pub fn cache_stats(&self) -> CacheStats {
        CacheStats {
            size: self.program_cache.len(),
        }
    }
}

/// Cache statistics
#[derive(Debug, Clone)]
pub struct CacheStats {
    /// Number of cached programs
    pub size: usize,
}

fn bool_operand(value: &Value) -> Result<bool> {
    match value {
        Value::Bool(b) => Ok(*b),
        // Null is falsy so that absent context denies instead of erroring
        Value::Null => Ok(false),
        other => Err(ExprError::Type(format!(
            "expected boolean operand, got {}",
            other
        ))),
    }
}

fn eval(expr: &Expr, scope: &EvalScope) -> Result<Value> {
    match expr {
        Expr::Literal(value) => Ok(value.clone()),
        Expr::Path(segments) => Ok(scope.lookup(segments)),
        Expr::Call { name, args } => {
            let function = scope
                .function(name)
                .ok_or_else(|| ExprError::UnknownFunction(name.clone()))?;
            let mut values = Vec::with_capacity(args.len());
            for arg in args {
                values.push(eval(arg, scope)?);
            }
            function(&values)
        }
        Expr::Not(inner) => {
            let value = eval(inner, scope)?;
            Ok(Value::Bool(!bool_operand(&value)?))
        }
        Expr::And(left, right) => {
            if !bool_operand(&eval(left, scope)?)? {
                return Ok(Value::Bool(false));
            }
            let value = eval(right, scope)?;
            Ok(Value::Bool(bool_operand(&value)?))
        }
        Expr::Or(left, right) => {
            if bool_operand(&eval(left, scope)?)? {
                return Ok(Value::Bool(true));
            }
            let value = eval(right, scope)?;
            Ok(Value::Bool(bool_operand(&value)?))
        }
        Expr::Eq(left, right) => Ok(Value::Bool(eval(left, scope)? == eval(right, scope)?)),
        Expr::Ne(left, right) => Ok(Value::Bool(eval(left, scope)? != eval(right, scope)?)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn test_scope() -> EvalScope {
        EvalScope::new()
            .with_variable(
                "authInfo",
                json!({
                    "partyId": "user123",
                    "roles": ["CUSTOMER"],
                    "metadata": { "Level": 5 }
                }),
            )
            .with_variable("method", json!("get_contract"))
    }

    #[test]
    fn test_literal_evaluation() {
        let engine = Engine::new();
        let scope = test_scope();

        assert_eq!(
            engine.evaluate_expression("true", &scope).unwrap(),
            json!(true)
        );
        assert_eq!(
            engine.evaluate_expression("false", &scope).unwrap(),
            json!(false)
        );
    }

    #[test]
    fn test_path_comparison() {
        let engine = Engine::new();
        let scope = test_scope();

        assert_eq!(
            engine
                .evaluate_expression("authInfo.partyId == 'user123'", &scope)
                .unwrap(),
            json!(true)
        );
        assert_eq!(
            engine
                .evaluate_expression("authInfo.partyId != 'user123'", &scope)
                .unwrap(),
            json!(false)
        );
        assert_eq!(
            engine
                .evaluate_expression("authInfo.metadata.Level == 5", &scope)
                .unwrap(),
            json!(true)
        );
    }

    #[test]
    fn test_boolean_operators() {
        let engine = Engine::new();
        let scope = test_scope();

        assert_eq!(
            engine
                .evaluate_expression("method == 'get_contract' && !false", &scope)
                .unwrap(),
            json!(true)
        );
        assert_eq!(
            engine
                .evaluate_expression("false || method == 'get_contract'", &scope)
                .unwrap(),
            json!(true)
        );
    }

    #[test]
    fn test_null_is_falsy() {
        let engine = Engine::new();
        let scope = test_scope();

        // Unknown path resolves to null, which is falsy in boolean position
        assert_eq!(
            engine
                .evaluate_expression("authInfo.missing || true", &scope)
                .unwrap(),
            json!(true)
        );
        assert_eq!(
            engine
                .evaluate_expression("!authInfo.missing", &scope)
                .unwrap(),
            json!(true)
        );
    }

    #[test]
    fn test_short_circuit_skips_unknown_function() {
        let engine = Engine::new();
        let scope = test_scope();

        // The right-hand side is never evaluated
        assert_eq!(
            engine
                .evaluate_expression("false && unknownFn('x')", &scope)
                .unwrap(),
            json!(false)
        );
    }

    #[test]
    fn test_unknown_function_error() {
        let engine = Engine::new();
        let scope = test_scope();

        let result = engine.evaluate_expression("unknownFn('x')", &scope);
        assert!(matches!(result, Err(ExprError::UnknownFunction(_))));
    }

    #[test]
    fn test_type_error_on_non_boolean_operand() {
        let engine = Engine::new();
        let scope = test_scope();

        let result = engine.evaluate_expression("'hello' && true", &scope);
        assert!(matches!(result, Err(ExprError::Type(_))));
    }

    #[test]
    fn test_function_call() {
        let engine = Engine::new();
        let scope = test_scope().with_fn("isOwner", |args| {
            Ok(Value::Bool(args[0] == json!("user123")))
        });

        assert_eq!(
            engine
                .evaluate_expression("isOwner(authInfo.partyId)", &scope)
                .unwrap(),
            json!(true)
        );
    }

    #[test]
    fn test_program_caching() {
        let engine = Engine::new();
        let scope = test_scope();

        let _ = engine.evaluate_expression("true", &scope).unwrap();
        assert_eq!(engine.cache_stats().size, 1);

        let _ = engine.evaluate_expression("true", &scope).unwrap();
        assert_eq!(engine.cache_stats().size, 1);

        let _ = engine.evaluate_expression("false", &scope).unwrap();
        assert_eq!(engine.cache_stats().size, 2);
    }

    #[test]
    fn test_cache_clear() {
        let engine = Engine::new();
        let scope = test_scope();

        let _ = engine.evaluate_expression("true", &scope).unwrap();
        assert_eq!(engine.cache_stats().size, 1);

        engine.clear_cache();
        assert_eq!(engine.cache_stats().size, 0);
    }

    #[test]
    fn test_compilation_error_not_cached() {
        let engine = Engine::new();

        assert!(engine.compile("a &&").is_err());
        assert_eq!(engine.cache_stats().size, 0);
    }
}
