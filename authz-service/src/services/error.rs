//! Classified authorization failures.
//!
//! Externally every deny collapses to one opaque unauthorized response, so
//! a probing caller cannot tell which stage failed. Internally the
//! classification survives: `class()` keys the structured deny events and
//! the variants carry what an audit record needs.

use platform_core::error::AppError;
use thiserror::Error;
use uuid::Uuid;

use super::token::TokenError;

/// Why a request was denied, or why no verdict could be reached.
#[derive(Debug, Error)]
pub enum AuthzError {
    /// No credential header, or one without the expected scheme prefix.
    #[error("missing or malformed credential header")]
    MissingCredential,

    /// Verification-stage failure, classified by [`TokenError`].
    #[error("token invalid: {0}")]
    TokenInvalid(#[from] TokenError),

    /// Token verified, but no active principal matches its subject - for
    /// example a deleted account holding a still-valid token.
    #[error("no active principal matches subject {subject_id}")]
    PrincipalNotFound { subject_id: Uuid },

    /// Identity established, policy evaluation failed. Carries required
    /// versus held so the audit log can show exactly what was missing.
    #[error("caller roles do not satisfy the operation's policy")]
    InsufficientRoles {
        required: Vec<String>,
        require_all: bool,
        actual: Vec<String>,
    },

    /// The principal store failed; no verdict was reached. Surfaces as a
    /// server error, not a deny class.
    #[error("authorization aborted: {0}")]
    Store(#[source] AppError),
}

impl AuthzError {
    /// Stable key for structured log events.
    pub fn class(&self) -> &'static str {
        match self {
            AuthzError::MissingCredential => "missing_credential",
            AuthzError::TokenInvalid(TokenError::Expired { .. }) => "token_expired",
            AuthzError::TokenInvalid(TokenError::Malformed) => "token_malformed",
            AuthzError::TokenInvalid(TokenError::MissingSubject) => "token_missing_subject",
            AuthzError::TokenInvalid(TokenError::Unknown(_)) => "token_unknown",
            AuthzError::PrincipalNotFound { .. } => "principal_not_found",
            AuthzError::InsufficientRoles { .. } => "insufficient_roles",
            AuthzError::Store(_) => "store_failure",
        }
    }
}

impl From<AuthzError> for AppError {
    /// Transport-boundary collapse: every deny class becomes the same
    /// opaque 401. Store failures keep their server-error shape.
    fn from(err: AuthzError) -> Self {
        match err {
            AuthzError::Store(inner) => inner,
            _ => AppError::Unauthorized(anyhow::anyhow!("unauthorized")),
        }
    }
}
