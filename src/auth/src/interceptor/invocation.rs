//! Intercepted operation call descriptions

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Identifies one operation on a target
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationDescriptor {
    /// Target (service/group) name
    pub target: String,

    /// Operation (method) name
    pub name: String,
}

impl OperationDescriptor {
    /// Create a descriptor
    pub fn new(target: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for OperationDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}::{}", self.target, self.name)
    }
}

/// One named argument of an intercepted call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Argument {
    /// Parameter name as declared on the operation
    pub name: String,

    /// Argument value
    pub value: Value,
}

/// A single intercepted call: the operation plus its arguments in
/// declaration order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MethodInvocation {
    descriptor: OperationDescriptor,
    args: Vec<Argument>,
}

impl MethodInvocation {
    /// Create an invocation with no arguments
    pub fn new(descriptor: OperationDescriptor) -> Self {
        Self {
            descriptor,
            args: Vec::new(),
        }
    }

    /// Append an argument, preserving declaration order
    pub fn with_arg(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.args.push(Argument {
            name: name.into(),
            value: value.into(),
        });
        self
    }

    /// The invoked operation
    pub fn descriptor(&self) -> &OperationDescriptor {
        &self.descriptor
    }

    /// All arguments in declaration order
    pub fn args(&self) -> &[Argument] {
        &self.args
    }

    /// Argument value by parameter name
    pub fn arg_by_name(&self, name: &str) -> Option<&Value> {
        self.args
            .iter()
            .find(|arg| arg.name == name)
            .map(|arg| &arg.value)
    }

    /// Argument value by position
    pub fn arg_at(&self, index: usize) -> Option<&Value> {
        self.args.get(index).map(|arg| &arg.value)
    }

    /// Arguments as an object keyed by parameter name, for expression
    /// evaluation
    pub fn args_object(&self) -> Value {
        let mut map = serde_json::Map::new();
        for arg in &self.args {
            map.insert(arg.name.clone(), arg.value.clone());
        }
        Value::Object(map)
    }
}
