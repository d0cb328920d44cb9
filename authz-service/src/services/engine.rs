//! The authorization engine: from bearer credential to verdict.
//!
//! Stateless per request. Everything shared across requests is read-only
//! configuration fixed at construction, so concurrent requests need no
//! locking here.

use std::sync::Arc;

use axum::http::HeaderMap;
use serde::Serialize;
use uuid::Uuid;

use super::database::PrincipalStore;
use super::error::AuthzError;
use super::policy::Policy;
use super::roles::resolve_effective_roles;
use super::token::{TokenError, TokenVerifier};

/// Read-only knobs the engine is constructed with.
#[derive(Debug, Clone)]
pub struct EngineSettings {
    /// Request header carrying the credential (lowercase).
    pub header_name: String,
    /// Scheme token expected before the opaque credential value.
    pub scheme: String,
    /// Role name that satisfies any policy whose admin override is on.
    pub admin_role: String,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            header_name: "authorization".to_string(),
            scheme: "Bearer".to_string(),
            admin_role: "admin".to_string(),
        }
    }
}

/// Identity and roles attached to the request after a successful decision.
/// Read-only for downstream handlers; discarded when the request ends.
#[derive(Debug, Clone, Serialize)]
pub struct AuthContext {
    pub subject_id: Uuid,
    /// Sorted for stable serialization and log output.
    pub effective_roles: Vec<String>,
}

impl AuthContext {
    pub fn has_role(&self, role: &str) -> bool {
        self.effective_roles.iter().any(|r| r == role)
    }
}

/// Per-request authorization: verify the credential, load the principal
/// snapshot, resolve roles, evaluate the bound policy.
#[derive(Clone)]
pub struct AuthzEngine {
    verifier: TokenVerifier,
    store: Arc<dyn PrincipalStore>,
    settings: EngineSettings,
    scheme_prefix: String,
}

impl AuthzEngine {
    pub fn new(
        verifier: TokenVerifier,
        store: Arc<dyn PrincipalStore>,
        settings: EngineSettings,
    ) -> Self {
        let scheme_prefix = format!("{} ", settings.scheme);
        Self {
            verifier,
            store,
            settings,
            scheme_prefix,
        }
    }

    pub fn admin_role(&self) -> &str {
        &self.settings.admin_role
    }

    /// Decide one request. Fail-closed: the first failing step settles the
    /// verdict and nothing is retried.
    ///
    /// `policy` is whatever the binder returned for the operation; `None`
    /// means unrestricted, which still requires a verified identity.
    pub async fn authorize(
        &self,
        headers: &HeaderMap,
        policy: Option<&Policy>,
    ) -> Result<AuthContext, AuthzError> {
        let token = self.extract_credential(headers)?;

        let claims = self.verifier.verify(token)?;
        let subject_id = claims.subject_id().ok_or(TokenError::MissingSubject)?;

        let principal = self
            .store
            .find_principal(subject_id)
            .await
            .map_err(AuthzError::Store)?
            .ok_or(AuthzError::PrincipalNotFound { subject_id })?;

        // One snapshot per request: the role match and the admin override
        // both see this read. An assignment revoked while the request is
        // in flight may still count for this decision; the staleness
        // window ends at the next request's read and is not closed with
        // locking here.
        let assignments = self
            .store
            .find_active_role_assignments(subject_id)
            .await
            .map_err(AuthzError::Store)?;

        let roles = resolve_effective_roles(&principal, &assignments);

        if let Some(policy) = policy {
            if !policy.evaluate(&roles, &self.settings.admin_role) {
                let mut actual: Vec<String> = roles.into_iter().collect();
                actual.sort();
                return Err(AuthzError::InsufficientRoles {
                    required: policy.required_roles().to_vec(),
                    require_all: policy.require_all(),
                    actual,
                });
            }
        }

        let mut effective_roles: Vec<String> = roles.into_iter().collect();
        effective_roles.sort();

        Ok(AuthContext {
            subject_id,
            effective_roles,
        })
    }

    /// Pull the opaque credential out of the configured header. The
    /// verifier is never invoked for a request that fails here.
    fn extract_credential<'a>(&self, headers: &'a HeaderMap) -> Result<&'a str, AuthzError> {
        headers
            .get(self.settings.header_name.as_str())
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix(self.scheme_prefix.as_str()))
            .ok_or(AuthzError::MissingCredential)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Principal, RoleAssignment};
    use crate::services::database::MockPrincipalStore;
    use chrono::Utc;
    use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};

    const TEST_SECRET: &str = "engine-test-secret";

    fn engine(store: MockPrincipalStore) -> AuthzEngine {
        AuthzEngine::new(
            TokenVerifier::from_hmac_secret(TEST_SECRET),
            Arc::new(store),
            EngineSettings::default(),
        )
    }

    fn token_for(subject_id: Uuid) -> String {
        let now = Utc::now().timestamp();
        let claims = crate::services::AccessTokenClaims {
            sub: subject_id.to_string(),
            exp: now + 600,
            iat: now,
        };
        encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(TEST_SECRET.as_bytes()),
        )
        .unwrap()
    }

    fn bearer_headers(token: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert("authorization", format!("Bearer {}", token).parse().unwrap());
        headers
    }

    async fn seed_principal(
        store: &MockPrincipalStore,
        legacy_role: Option<&str>,
        assignments: &[(&str, bool)],
    ) -> Principal {
        let principal =
            Principal::new("caller@example.com".to_string(), legacy_role.map(String::from));
        store.insert_principal(principal.clone()).await;
        for (role, active) in assignments {
            let mut assignment =
                RoleAssignment::new(principal.principal_id, role.to_string());
            if !active {
                assignment.disable();
            }
            store.insert_assignment(assignment).await;
        }
        principal
    }

    #[tokio::test]
    async fn denies_request_without_credential_header() {
        let engine = engine(MockPrincipalStore::new());

        let result = engine.authorize(&HeaderMap::new(), None).await;
        assert!(matches!(result, Err(AuthzError::MissingCredential)));
    }

    #[tokio::test]
    async fn denies_header_without_scheme_prefix_before_verification() {
        let store = MockPrincipalStore::new();
        let principal = seed_principal(&store, Some("instructor"), &[]).await;
        let engine = engine(store);

        // A perfectly good token, presented without the scheme token.
        let mut headers = HeaderMap::new();
        headers.insert(
            "authorization",
            token_for(principal.principal_id).parse().unwrap(),
        );

        let result = engine.authorize(&headers, None).await;
        assert!(matches!(result, Err(AuthzError::MissingCredential)));
    }

    #[tokio::test]
    async fn denies_invalid_token_with_classification() {
        let engine = engine(MockPrincipalStore::new());
        let headers = bearer_headers("junk");

        let result = engine.authorize(&headers, None).await;
        assert!(matches!(
            result,
            Err(AuthzError::TokenInvalid(TokenError::Malformed))
        ));
    }

    #[tokio::test]
    async fn denies_valid_token_for_unknown_principal() {
        let engine = engine(MockPrincipalStore::new());
        let orphan = Uuid::new_v4();
        let headers = bearer_headers(&token_for(orphan));

        match engine.authorize(&headers, None).await {
            Err(AuthzError::PrincipalNotFound { subject_id }) => assert_eq!(subject_id, orphan),
            other => panic!("expected PrincipalNotFound, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn denies_suspended_principal_as_not_found() {
        let store = MockPrincipalStore::new();
        let mut principal = Principal::new("caller@example.com".to_string(), None);
        principal.principal_state_code = "suspended".to_string();
        store.insert_principal(principal.clone()).await;
        let engine = engine(store);

        let headers = bearer_headers(&token_for(principal.principal_id));
        assert!(matches!(
            engine.authorize(&headers, None).await,
            Err(AuthzError::PrincipalNotFound { .. })
        ));
    }

    #[tokio::test]
    async fn unbound_operation_allows_any_verified_principal() {
        let store = MockPrincipalStore::new();
        let principal = seed_principal(&store, None, &[]).await;
        let engine = engine(store);

        let headers = bearer_headers(&token_for(principal.principal_id));
        let context = engine.authorize(&headers, None).await.unwrap();
        assert_eq!(context.subject_id, principal.principal_id);
        assert!(context.effective_roles.is_empty());
    }

    #[tokio::test]
    async fn inactive_assignment_does_not_satisfy_policy() {
        // Legacy "instructor", inactive "admin" grant; policy wants admin.
        let store = MockPrincipalStore::new();
        let principal =
            seed_principal(&store, Some("instructor"), &[("admin", false)]).await;
        let engine = engine(store);

        let policy = Policy::any(["admin"]).unwrap().without_admin_override();
        let headers = bearer_headers(&token_for(principal.principal_id));

        match engine.authorize(&headers, Some(&policy)).await {
            Err(AuthzError::InsufficientRoles {
                required, actual, ..
            }) => {
                assert_eq!(required, vec!["admin".to_string()]);
                assert_eq!(actual, vec!["instructor".to_string()]);
            }
            other => panic!("expected InsufficientRoles, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn reactivated_assignment_satisfies_policy() {
        let store = MockPrincipalStore::new();
        let principal = seed_principal(&store, Some("instructor"), &[]).await;

        let mut grant = RoleAssignment::new(principal.principal_id, "admin".to_string());
        grant.disable();
        let assignment_id = grant.assignment_id;
        store.insert_assignment(grant).await;
        store.set_assignment_active(assignment_id, true).await;
        let engine = engine(store);

        let policy = Policy::any(["admin"]).unwrap().without_admin_override();
        let headers = bearer_headers(&token_for(principal.principal_id));

        let context = engine.authorize(&headers, Some(&policy)).await.unwrap();
        assert!(context.has_role("admin"));
        assert!(context.has_role("instructor"));
    }

    #[tokio::test]
    async fn all_policy_denies_partial_holder() {
        let store = MockPrincipalStore::new();
        let principal = seed_principal(&store, Some("instructor"), &[]).await;
        let engine = engine(store);

        let policy = Policy::all(["secretary", "instructor"]).unwrap();
        let headers = bearer_headers(&token_for(principal.principal_id));

        assert!(matches!(
            engine.authorize(&headers, Some(&policy)).await,
            Err(AuthzError::InsufficientRoles { .. })
        ));
    }

    #[tokio::test]
    async fn admin_override_bypasses_failed_all_policy() {
        let store = MockPrincipalStore::new();
        let principal =
            seed_principal(&store, Some("instructor"), &[("admin", true)]).await;
        let engine = engine(store);

        let policy = Policy::all(["secretary", "instructor"]).unwrap();
        let headers = bearer_headers(&token_for(principal.principal_id));

        let context = engine.authorize(&headers, Some(&policy)).await.unwrap();
        assert!(context.has_role("admin"));
    }

    #[tokio::test]
    async fn context_roles_are_sorted_and_deduplicated() {
        let store = MockPrincipalStore::new();
        let principal = seed_principal(
            &store,
            Some("instructor"),
            &[("secretary", true), ("instructor", true)],
        )
        .await;
        let engine = engine(store);

        let headers = bearer_headers(&token_for(principal.principal_id));
        let context = engine.authorize(&headers, None).await.unwrap();
        assert_eq!(context.effective_roles, vec!["instructor", "secretary"]);
    }

    #[tokio::test]
    async fn custom_scheme_and_header_are_honored() {
        let store = MockPrincipalStore::new();
        let principal = seed_principal(&store, None, &[]).await;
        let engine = AuthzEngine::new(
            TokenVerifier::from_hmac_secret(TEST_SECRET),
            Arc::new(store),
            EngineSettings {
                header_name: "x-access-token".to_string(),
                scheme: "Token".to_string(),
                admin_role: "admin".to_string(),
            },
        );

        let mut headers = HeaderMap::new();
        headers.insert(
            "x-access-token",
            format!("Token {}", token_for(principal.principal_id))
                .parse()
                .unwrap(),
        );

        assert!(engine.authorize(&headers, None).await.is_ok());

        // The default header no longer works.
        let headers = bearer_headers(&token_for(principal.principal_id));
        assert!(matches!(
            engine.authorize(&headers, None).await,
            Err(AuthzError::MissingCredential)
        ));
    }
}
