//! Access policies - declarative role requirements for operations.
//!
//! A `Policy` is an immutable value attached to an operation when the
//! route table is assembled. One parameterized type replaces a checker per
//! role combination; the engine reads policies, it never mutates them.

use std::collections::HashSet;

use thiserror::Error;

/// Errors raised when building a policy.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PolicyError {
    /// A policy with no required roles can never be satisfied. Rejected
    /// when the policy is built, not discovered as a permanent deny at
    /// request time.
    #[error("policy requires at least one role")]
    EmptyRequiredRoles,
}

/// Immutable access rule: the roles an operation demands, whether the
/// caller needs all of them or any one, and whether the admin role
/// bypasses the match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Policy {
    required_roles: Vec<String>,
    require_all: bool,
    allow_admin_override: bool,
}

impl Policy {
    /// Build a policy. Duplicate role names collapse; an empty set is
    /// rejected. The admin override starts enabled; see
    /// [`Policy::without_admin_override`].
    pub fn new<I, S>(required_roles: I, require_all: bool) -> Result<Self, PolicyError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut roles: Vec<String> = Vec::new();
        for role in required_roles {
            let role = role.into();
            if !roles.contains(&role) {
                roles.push(role);
            }
        }

        if roles.is_empty() {
            return Err(PolicyError::EmptyRequiredRoles);
        }

        Ok(Self {
            required_roles: roles,
            require_all,
            allow_admin_override: true,
        })
    }

    /// Policy satisfied by holding at least one of `roles`.
    pub fn any<I, S>(roles: I) -> Result<Self, PolicyError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(roles, false)
    }

    /// Policy satisfied only by holding every one of `roles`.
    pub fn all<I, S>(roles: I) -> Result<Self, PolicyError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(roles, true)
    }

    /// Disable the admin bypass for this policy.
    pub fn without_admin_override(mut self) -> Self {
        self.allow_admin_override = false;
        self
    }

    pub fn required_roles(&self) -> &[String] {
        &self.required_roles
    }

    pub fn require_all(&self) -> bool {
        self.require_all
    }

    pub fn allow_admin_override(&self) -> bool {
        self.allow_admin_override
    }

    /// Evaluate this policy against a resolved role set.
    ///
    /// The admin override is checked before the role match so that a
    /// bypass short-circuits whatever additional checks callers layer
    /// behind the verdict.
    pub fn evaluate(&self, roles: &HashSet<String>, admin_role: &str) -> bool {
        if self.allow_admin_override && roles.contains(admin_role) {
            return true;
        }

        if self.require_all {
            self.required_roles.iter().all(|role| roles.contains(role))
        } else {
            self.required_roles.iter().any(|role| roles.contains(role))
        }
    }
}
