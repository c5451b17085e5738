/*
 * Responsibility
 * - Request pipeline layers, outermost first:
 *   http → auth::access → identity_headers → auth::authz → upstream
 */
pub mod auth;
pub mod http;
pub mod identity_headers;
