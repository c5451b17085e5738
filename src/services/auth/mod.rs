/*
 * Responsibility
 * - bearer token → VerifiedClaims (access_jwt)
 * - VerifiedClaims → Identity (identity)
 * - required roles × Identity → allow/deny (decision)
 */
pub mod access_jwt;
pub mod decision;
pub mod identity;

pub use access_jwt::{AccessJwtError, TokenAlgorithm, TokenVerifier, VerifiedClaims};
pub use decision::{AuthzOutcome, decide};
pub use identity::{DEFAULT_ROLES_CLAIM, Identity, IdentityExtractor};
