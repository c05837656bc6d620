//! Evaluation scope for policy expressions

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;

use crate::expr::error::Result;

/// Named function callable from an expression
pub type ExprFunction = Arc<dyn Fn(&[Value]) -> Result<Value> + Send + Sync>;

/// Variable and function bindings for a single evaluation
///
/// A scope is built fresh per evaluation; nothing in it survives the call.
#[derive(Clone, Default)]
pub struct EvalScope {
    variables: HashMap<String, Value>,
    functions: HashMap<String, ExprFunction>,
}

impl EvalScope {
    /// Create an empty scope
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind a variable
    pub fn with_variable(mut self, name: impl Into<String>, value: Value) -> Self {
        self.variables.insert(name.into(), value);
        self
    }

    /// Bind a function
    pub fn with_function(mut self, name: impl Into<String>, function: ExprFunction) -> Self {
        self.functions.insert(name.into(), function);
        self
    }

    /// Bind a function from a closure
    pub fn with_fn<F>(self, name: impl Into<String>, function: F) -> Self
    where
        F: Fn(&[Value]) -> Result<Value> + Send + Sync + 'static,
    {
        self.with_function(name, Arc::new(function))
    }

    /// Resolve a dotted path against the bound variables
    ///
    /// Unknown roots and unknown object members resolve to `Null` so that
    /// policies written against optional context deny instead of erroring.
    pub fn lookup(&self, path: &[String]) -> Value {
        let Some(first) = path.first() else {
            return Value::Null;
        };
        let mut current = match self.variables.get(first) {
            Some(value) => value.clone(),
            None => return Value::Null,
        };
        for segment in &path[1..] {
            current = match current {
                Value::Object(map) => map.get(segment).cloned().unwrap_or(Value::Null),
                _ => Value::Null,
            };
        }
        current
    }

    /// Look up a bound function by name
    pub fn function(&self, name: &str) -> Option<&ExprFunction> {
        self.functions.get(name)
    }
}

impl std::fmt::Debug for EvalScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EvalScope")
            .field("variables", &self.variables)
            .field("functions", &self.functions.keys().collect::<Vec<_>>())
            .finish()
    }
}
