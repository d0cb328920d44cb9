//! Role assignment model - the multi-valued role ledger.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// One role grant for a principal.
///
/// Assignments are created active and later soft-disabled by flipping
/// `active` rather than deleted; a disabled row never contributes to the
/// effective role set. Role administration owns these rows.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct RoleAssignment {
    pub assignment_id: Uuid,
    pub principal_id: Uuid,
    pub role_name: String,
    pub active: bool,
    pub created_utc: DateTime<Utc>,
    pub updated_utc: DateTime<Utc>,
}

impl RoleAssignment {
    /// Create a new active assignment.
    pub fn new(principal_id: Uuid, role_name: String) -> Self {
        let now = Utc::now();
        Self {
            assignment_id: Uuid::new_v4(),
            principal_id,
            role_name,
            active: true,
            created_utc: now,
            updated_utc: now,
        }
    }

    /// Soft-disable this assignment.
    pub fn disable(&mut self) {
        self.active = false;
        self.updated_utc = Utc::now();
    }
}

/// Assignment response for API.
#[derive(Debug, Serialize)]
pub struct AssignmentResponse {
    pub assignment_id: Uuid,
    pub role_name: String,
    pub active: bool,
    pub created_utc: DateTime<Utc>,
}

impl From<RoleAssignment> for AssignmentResponse {
    fn from(a: RoleAssignment) -> Self {
        Self {
            assignment_id: a.assignment_id,
            role_name: a.role_name,
            active: a.active,
            created_utc: a.created_utc,
        }
    }
}
