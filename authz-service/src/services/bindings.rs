//! Policy bindings - the side table mapping operations to policies.
//!
//! Routes declare their policy where they are registered; at dispatch the
//! middleware looks the matched route template up here. An operation-level
//! binding shadows a prefix (group) binding. Lookup cost does not grow
//! with the number of bound operations.

use std::collections::HashMap;

use axum::http::Method;

use super::policy::Policy;

/// Immutable operation-to-policy table, built once at router assembly.
///
/// An operation with no binding is unrestricted: the engine still
/// establishes identity, but evaluates no policy.
#[derive(Debug, Clone, Default)]
pub struct PolicyBindings {
    routes: HashMap<String, HashMap<Method, Policy>>,
    prefixes: HashMap<String, Policy>,
}

impl PolicyBindings {
    pub fn builder() -> PolicyBindingsBuilder {
        PolicyBindingsBuilder::default()
    }

    /// Policy bound to an operation, if any.
    ///
    /// `route` is the matched route template (for example
    /// `/authz/principals/:principal_id/roles`), not the concrete request
    /// path. An exact `(route, method)` binding wins; otherwise the
    /// longest bound path prefix applies.
    pub fn lookup(&self, method: &Method, route: &str) -> Option<&Policy> {
        if let Some(policy) = self.routes.get(route).and_then(|by_method| by_method.get(method)) {
            return Some(policy);
        }

        let mut candidate = route;
        loop {
            if let Some(policy) = self.prefixes.get(candidate) {
                return Some(policy);
            }
            match candidate.rfind('/') {
                Some(0) | None => break,
                Some(idx) => candidate = &candidate[..idx],
            }
        }

        self.prefixes.get("/")
    }
}

/// Builder for [`PolicyBindings`]. Later bindings for the same key replace
/// earlier ones.
#[derive(Debug, Default)]
pub struct PolicyBindingsBuilder {
    routes: HashMap<String, HashMap<Method, Policy>>,
    prefixes: HashMap<String, Policy>,
}

impl PolicyBindingsBuilder {
    /// Bind a policy to one operation.
    pub fn bind(mut self, method: Method, route: impl Into<String>, policy: Policy) -> Self {
        self.routes
            .entry(route.into())
            .or_default()
            .insert(method, policy);
        self
    }

    /// Bind a policy to every operation under a path prefix.
    pub fn bind_prefix(mut self, prefix: impl Into<String>, policy: Policy) -> Self {
        let prefix = prefix.into();
        let prefix = if prefix.len() > 1 {
            prefix.trim_end_matches('/').to_string()
        } else {
            prefix
        };
        self.prefixes.insert(prefix, policy);
        self
    }

    pub fn build(self) -> PolicyBindings {
        PolicyBindings {
            routes: self.routes,
            prefixes: self.prefixes,
        }
    }
}
