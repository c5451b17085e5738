//! Role-based authorization layer for an API gateway.
//!
//! Required roles are harvested from the OpenAPI documents of downstream
//! services (`x-required-roles` on each operation) and checked against the
//! roles carried by the caller's verified access token.
pub mod api;
pub mod app;
pub mod config;
pub mod error;
pub mod middleware;
pub mod services;
pub mod state;
