//! Principal role inspection for administrators.

use axum::extract::{Json, Path, State};
use serde::Serialize;
use uuid::Uuid;

use platform_core::error::AppError;

use crate::models::AssignmentResponse;
use crate::services::resolve_effective_roles;
use crate::AppState;

/// A principal's role sources and their resolved union.
#[derive(Debug, Serialize)]
pub struct PrincipalRolesResponse {
    pub principal_id: Uuid,
    pub legacy_role: Option<String>,
    pub assignments: Vec<AssignmentResponse>,
    pub effective_roles: Vec<String>,
}

/// Both role sources and the effective set for any principal. Bound to an
/// admin-only policy in the route table.
///
/// GET /authz/principals/:principal_id/roles
pub async fn get_principal_roles(
    State(state): State<AppState>,
    Path(principal_id): Path<Uuid>,
) -> Result<Json<PrincipalRolesResponse>, AppError> {
    let principal = state
        .store
        .find_principal(principal_id)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Principal not found")))?;

    let assignments = state
        .store
        .find_active_role_assignments(principal_id)
        .await?;

    let mut effective_roles: Vec<String> =
        resolve_effective_roles(&principal, &assignments).into_iter().collect();
    effective_roles.sort();

    Ok(Json(PrincipalRolesResponse {
        principal_id,
        legacy_role: principal.legacy_role,
        assignments: assignments.into_iter().map(AssignmentResponse::from).collect(),
        effective_roles,
    }))
}
