//! PostgreSQL read-side of the principal directory.
//!
//! User management and role administration own these tables; this service
//! only reads them, one snapshot per request.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use platform_core::error::AppError;
use sqlx::postgres::PgPool;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::models::{Principal, RoleAssignment};

/// Lookup capability the authorization engine depends on. Production uses
/// [`Database`]; tests substitute [`MockPrincipalStore`].
#[async_trait]
pub trait PrincipalStore: Send + Sync {
    /// Find an active principal by ID. Suspended and deactivated
    /// principals are reported as absent: a removed account holding a
    /// still-valid token must not authorize.
    async fn find_principal(&self, principal_id: Uuid) -> Result<Option<Principal>, AppError>;

    /// Active role assignments for a principal. Soft-disabled rows are
    /// filtered at the source.
    async fn find_active_role_assignments(
        &self,
        principal_id: Uuid,
    ) -> Result<Vec<RoleAssignment>, AppError>;

    /// Liveness probe for the backing store.
    async fn health_check(&self) -> Result<(), AppError>;
}

/// PostgreSQL database wrapper.
#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    /// Create a new database wrapper from a connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Get the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl PrincipalStore for Database {
    async fn find_principal(&self, principal_id: Uuid) -> Result<Option<Principal>, AppError> {
        sqlx::query_as::<_, Principal>(
            "SELECT * FROM principals WHERE principal_id = $1 AND principal_state_code = 'active'",
        )
        .bind(principal_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!(e)))
    }

    async fn find_active_role_assignments(
        &self,
        principal_id: Uuid,
    ) -> Result<Vec<RoleAssignment>, AppError> {
        sqlx::query_as::<_, RoleAssignment>(
            "SELECT * FROM role_assignments WHERE principal_id = $1 AND active = TRUE",
        )
        .bind(principal_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!(e)))
    }

    async fn health_check(&self) -> Result<(), AppError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "Database health check failed");
                AppError::DatabaseError(anyhow::anyhow!("Database health check failed: {}", e))
            })?;
        Ok(())
    }
}

/// In-memory store for tests and local development.
#[derive(Clone, Default)]
pub struct MockPrincipalStore {
    principals: Arc<RwLock<HashMap<Uuid, Principal>>>,
    assignments: Arc<RwLock<Vec<RoleAssignment>>>,
}

impl MockPrincipalStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert_principal(&self, principal: Principal) {
        self.principals
            .write()
            .await
            .insert(principal.principal_id, principal);
    }

    pub async fn insert_assignment(&self, assignment: RoleAssignment) {
        self.assignments.write().await.push(assignment);
    }

    pub async fn set_assignment_active(&self, assignment_id: Uuid, active: bool) {
        let mut assignments = self.assignments.write().await;
        if let Some(assignment) = assignments
            .iter_mut()
            .find(|a| a.assignment_id == assignment_id)
        {
            if active {
                assignment.active = true;
            } else {
                assignment.disable();
            }
        }
    }
}

#[async_trait]
impl PrincipalStore for MockPrincipalStore {
    async fn find_principal(&self, principal_id: Uuid) -> Result<Option<Principal>, AppError> {
        Ok(self
            .principals
            .read()
            .await
            .get(&principal_id)
            .filter(|p| p.is_active())
            .cloned())
    }

    async fn find_active_role_assignments(
        &self,
        principal_id: Uuid,
    ) -> Result<Vec<RoleAssignment>, AppError> {
        Ok(self
            .assignments
            .read()
            .await
            .iter()
            .filter(|a| a.principal_id == principal_id && a.active)
            .cloned()
            .collect())
    }

    async fn health_check(&self) -> Result<(), AppError> {
        Ok(())
    }
}
