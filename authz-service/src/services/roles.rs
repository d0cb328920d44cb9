//! Effective role resolution.
//!
//! A principal carries roles in two representations: the legacy
//! single-role attribute and the multi-valued assignment ledger. Both are
//! live during the migration, so a request's usable roles are the union of
//! the two.

use std::collections::HashSet;

use crate::models::{Principal, RoleAssignment};

/// Resolve the deduplicated set of roles usable for one request's decision.
///
/// Starts from the legacy attribute, then folds in every active
/// assignment. Inactive assignments never contribute; nothing resurrects a
/// disabled grant. Names compare case-sensitively - roles are opaque
/// tokens, not display strings.
///
/// Operates purely on the snapshot handed in and never re-queries, so the
/// whole decision for a request sees one consistent read.
pub fn resolve_effective_roles(
    principal: &Principal,
    assignments: &[RoleAssignment],
) -> HashSet<String> {
    let mut roles = HashSet::new();

    if let Some(legacy) = &principal.legacy_role {
        roles.insert(legacy.clone());
    }

    for assignment in assignments {
        if assignment.active {
            roles.insert(assignment.role_name.clone());
        }
    }

    roles
}

#[cfg(test)]
mod tests {
    use super::*;

    fn principal_with_legacy(legacy: Option<&str>) -> Principal {
        Principal::new(
            "caller@example.com".to_string(),
            legacy.map(str::to_string),
        )
    }

    fn assignment(principal: &Principal, role: &str) -> RoleAssignment {
        RoleAssignment::new(principal.principal_id, role.to_string())
    }

    #[test]
    fn unions_legacy_attribute_with_active_assignments() {
        let principal = principal_with_legacy(Some("instructor"));
        let assignments = vec![
            assignment(&principal, "secretary"),
            assignment(&principal, "evaluator"),
        ];

        let roles = resolve_effective_roles(&principal, &assignments);
        assert_eq!(roles.len(), 3);
        assert!(roles.contains("instructor"));
        assert!(roles.contains("secretary"));
        assert!(roles.contains("evaluator"));
    }

    #[test]
    fn deduplicates_legacy_role_against_assignment() {
        let principal = principal_with_legacy(Some("instructor"));
        let assignments = vec![assignment(&principal, "instructor")];

        let roles = resolve_effective_roles(&principal, &assignments);
        assert_eq!(roles.len(), 1);
    }

    #[test]
    fn excludes_inactive_assignments() {
        let principal = principal_with_legacy(None);
        let mut revoked = assignment(&principal, "admin");
        revoked.disable();

        let roles = resolve_effective_roles(&principal, &[revoked]);
        assert!(roles.is_empty());
    }

    #[test]
    fn disabling_sole_source_removes_role_on_next_resolution() {
        let principal = principal_with_legacy(Some("instructor"));
        let mut grant = assignment(&principal, "admin");

        let before = resolve_effective_roles(&principal, std::slice::from_ref(&grant));
        assert!(before.contains("admin"));

        grant.disable();
        let after = resolve_effective_roles(&principal, &[grant]);
        assert!(!after.contains("admin"));
        assert!(after.contains("instructor"));
    }

    #[test]
    fn role_names_compare_case_sensitively() {
        let principal = principal_with_legacy(Some("Admin"));
        let assignments = vec![assignment(&principal, "admin")];

        let roles = resolve_effective_roles(&principal, &assignments);
        assert_eq!(roles.len(), 2);
    }

    #[test]
    fn resolution_is_deterministic() {
        let principal = principal_with_legacy(Some("instructor"));
        let assignments = vec![
            assignment(&principal, "secretary"),
            assignment(&principal, "admin"),
        ];

        assert_eq!(
            resolve_effective_roles(&principal, &assignments),
            resolve_effective_roles(&principal, &assignments)
        );
    }

    #[test]
    fn empty_sources_resolve_to_empty_set() {
        let principal = principal_with_legacy(None);
        assert!(resolve_effective_roles(&principal, &[]).is_empty());
    }
}
