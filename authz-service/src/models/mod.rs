//! Data models for the authorization engine.
pub mod principal;
pub mod role_assignment;

pub use principal::{Principal, PrincipalState};
pub use role_assignment::{AssignmentResponse, RoleAssignment};
