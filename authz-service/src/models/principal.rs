//! Principal model - the authenticated actors known to the platform.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Principal state codes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PrincipalState {
    Active,
    Suspended,
    Deactivated,
}

impl PrincipalState {
    pub fn as_str(&self) -> &'static str {
        match self {
            PrincipalState::Active => "active",
            PrincipalState::Suspended => "suspended",
            PrincipalState::Deactivated => "deactivated",
        }
    }
}

/// Principal entity. User management owns the lifecycle of these rows;
/// this service only reads them.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Principal {
    pub principal_id: Uuid,
    pub email: String,
    pub display_name: Option<String>,
    /// Single-role attribute kept from before the assignment ledger
    /// existed. Unioned with active assignments during role resolution;
    /// not authoritative once both sources are populated.
    pub legacy_role: Option<String>,
    pub principal_state_code: String,
    pub created_utc: DateTime<Utc>,
}

impl Principal {
    /// Create a new active principal.
    pub fn new(email: String, legacy_role: Option<String>) -> Self {
        Self {
            principal_id: Uuid::new_v4(),
            email,
            display_name: None,
            legacy_role,
            principal_state_code: PrincipalState::Active.as_str().to_string(),
            created_utc: Utc::now(),
        }
    }

    /// Check if the principal is active.
    pub fn is_active(&self) -> bool {
        self.principal_state_code == PrincipalState::Active.as_str()
    }
}
