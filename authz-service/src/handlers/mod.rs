//! HTTP handlers for the authorization service.
pub mod context;
pub mod principal;
