/*
 * Responsibility
 * - Routes the gateway answers itself (public, never gated)
 * - Fallback for requests no upstream route claims
 */
pub mod dto;
pub mod handlers;
mod routes;

pub use routes::public_routes;
