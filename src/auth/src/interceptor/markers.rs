//! Policy markers and their attachment to operations
//!
//! Markers are plain data resolved once at registration time; the
//! interceptor maps each variant to its guard. No reflection, no proxies.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::interceptor::invocation::MethodInvocation;

/// Locates the resource id among an invocation's arguments
///
/// A configured name takes precedence over the positional index.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParamSelector {
    /// Parameter name to look up, if any
    #[serde(default)]
    pub name: Option<String>,

    /// Positional fallback, used only when no name is configured
    #[serde(default)]
    pub index: usize,
}

impl ParamSelector {
    /// Select by parameter name
    pub fn by_name(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            index: 0,
        }
    }

    /// Select by position
    pub fn by_index(index: usize) -> Self {
        Self { name: None, index }
    }

    /// Resolve the selected argument on an invocation
    pub fn resolve<'a>(&self, invocation: &'a MethodInvocation) -> Option<&'a Value> {
        match &self.name {
            Some(name) => invocation.arg_by_name(name),
            None => invocation.arg_at(self.index),
        }
    }
}

/// Marker kind, in guard evaluation order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum MarkerKind {
    Role,
    Scope,
    Ownership,
    Expression,
    PreAuthorize,
    CheckAccess,
}

/// One declarative access-control requirement attached to an operation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "marker", rename_all = "kebab-case")]
pub enum PolicyMarker {
    /// Subject must hold the role
    RequiresRole { role: String, any_of: bool },

    /// Subject must hold the scope
    RequiresScope { scope: String, any_of: bool },

    /// Subject must own the resource instance selected from the arguments
    RequiresOwnership {
        resource: String,
        selector: ParamSelector,
        access_type: String,
        bypass_for_backoffice: bool,
    },

    /// The expression must evaluate to true
    RequiresExpression { expression: String },

    /// Like `RequiresExpression`, with identity predicate functions bound
    PreAuthorize { expression: String },

    /// Simplified ownership check resolving the id strictly by name
    CheckAccess { resource: String, id_param: String },
}

impl PolicyMarker {
    /// Role requirement with the default `any_of` semantics
    pub fn requires_role(role: impl Into<String>) -> Self {
        Self::RequiresRole {
            role: role.into(),
            any_of: true,
        }
    }

    /// Scope requirement with the default `any_of` semantics
    pub fn requires_scope(scope: impl Into<String>) -> Self {
        Self::RequiresScope {
            scope: scope.into(),
            any_of: true,
        }
    }

    /// Ownership requirement with the defaults: read access, backoffice
    /// bypass enabled
    pub fn requires_ownership(resource: impl Into<String>, selector: ParamSelector) -> Self {
        Self::RequiresOwnership {
            resource: resource.into(),
            selector,
            access_type: "read".to_string(),
            bypass_for_backoffice: true,
        }
    }

    /// Expression requirement
    pub fn requires_expression(expression: impl Into<String>) -> Self {
        Self::RequiresExpression {
            expression: expression.into(),
        }
    }

    /// Pre-authorize expression requirement
    pub fn pre_authorize(expression: impl Into<String>) -> Self {
        Self::PreAuthorize {
            expression: expression.into(),
        }
    }

    /// Named-parameter ownership check
    pub fn check_access(resource: impl Into<String>, id_param: impl Into<String>) -> Self {
        Self::CheckAccess {
            resource: resource.into(),
            id_param: id_param.into(),
        }
    }

    /// Set `any_of` on a role or scope marker; no effect on other kinds
    pub fn any_of(mut self, value: bool) -> Self {
        match &mut self {
            Self::RequiresRole { any_of, .. } | Self::RequiresScope { any_of, .. } => {
                *any_of = value;
            }
            _ => {}
        }
        self
    }

    /// Set the access type on an ownership marker; no effect on other kinds
    pub fn with_access_type(mut self, value: impl Into<String>) -> Self {
        if let Self::RequiresOwnership { access_type, .. } = &mut self {
            *access_type = value.into();
        }
        self
    }

    /// Set the backoffice bypass on an ownership marker; no effect on
    /// other kinds
    pub fn with_backoffice_bypass(mut self, value: bool) -> Self {
        if let Self::RequiresOwnership {
            bypass_for_backoffice,
            ..
        } = &mut self
        {
            *bypass_for_backoffice = value;
        }
        self
    }

    /// The marker's kind
    pub fn kind(&self) -> MarkerKind {
        match self {
            Self::RequiresRole { .. } => MarkerKind::Role,
            Self::RequiresScope { .. } => MarkerKind::Scope,
            Self::RequiresOwnership { .. } => MarkerKind::Ownership,
            Self::RequiresExpression { .. } => MarkerKind::Expression,
            Self::PreAuthorize { .. } => MarkerKind::PreAuthorize,
            Self::CheckAccess { .. } => MarkerKind::CheckAccess,
        }
    }
}

/// An operation together with its declared policy markers
///
/// Markers declared on the operation itself take precedence, per kind,
/// over markers declared on its containing group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SecuredOperation {
    descriptor: super::OperationDescriptor,
    method_markers: Vec<PolicyMarker>,
    group_markers: Vec<PolicyMarker>,
}

impl SecuredOperation {
    /// Create an operation with no markers
    pub fn new(descriptor: super::OperationDescriptor) -> Self {
        Self {
            descriptor,
            method_markers: Vec::new(),
            group_markers: Vec::new(),
        }
    }

    /// Declare a marker at the operation (method) level
    pub fn with_marker(mut self, marker: PolicyMarker) -> Self {
        self.method_markers.push(marker);
        self
    }

    /// Declare a marker at the group (class) level
    pub fn with_group_marker(mut self, marker: PolicyMarker) -> Self {
        self.group_markers.push(marker);
        self
    }

    /// The described operation
    pub fn descriptor(&self) -> &super::OperationDescriptor {
        &self.descriptor
    }

    /// Markers to enforce, in guard evaluation order
    ///
    /// A kind declared at method level shadows every group-level marker of
    /// the same kind; different kinds combine, each enforced by its own
    /// guard.
    pub fn effective_markers(&self) -> Vec<&PolicyMarker> {
        let method_kinds: HashSet<MarkerKind> =
            self.method_markers.iter().map(PolicyMarker::kind).collect();

        let mut markers: Vec<&PolicyMarker> = self.method_markers.iter().collect();
        markers.extend(
            self.group_markers
                .iter()
                .filter(|marker| !method_kinds.contains(&marker.kind())),
        );
        markers.sort_by_key(|marker| marker.kind());
        markers
    }
}
