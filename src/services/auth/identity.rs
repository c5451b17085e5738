/*
 * Responsibility
 * - VerifiedClaims → Identity (subject, email, roles)
 * - Unwrap the role claim from wherever the identity provider nests it
 *   (Keycloak: realm_access.roles)
 *
 * Notes
 * - Roles are returned exactly as the token carries them. No case folding and
 *   no "ROLE_" prefix here: the comparison against required roles is
 *   case-sensitive, and prefixes are a header-rendering concern.
 */
use std::collections::BTreeSet;

use serde_json::Value;

use super::access_jwt::VerifiedClaims;

pub const DEFAULT_ROLES_CLAIM: &str = "realm_access.roles";

/// The caller as seen by the gateway, for the lifetime of one request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Identity {
    pub subject_id: Option<String>,
    pub email: Option<String>,
    pub roles: BTreeSet<String>,
}

#[derive(Debug, Clone)]
pub struct IdentityExtractor {
    roles_claim: String,
}

impl Default for IdentityExtractor {
    fn default() -> Self {
        Self::new(DEFAULT_ROLES_CLAIM)
    }
}

impl IdentityExtractor {
    /// `roles_claim` is either a literal top-level claim name
    /// (`https://example.com/roles`) or a dot-separated path through nested
    /// objects (`realm_access.roles`, `resource_access.gateway.roles`).
    pub fn new(roles_claim: impl Into<String>) -> Self {
        Self {
            roles_claim: roles_claim.into(),
        }
    }

    pub fn roles_claim(&self) -> &str {
        &self.roles_claim
    }

    pub fn extract(&self, claims: &VerifiedClaims) -> Identity {
        let roles = match self.role_claim_value(claims) {
            Some(Value::Array(items)) => items
                .iter()
                .filter_map(Value::as_str)
                .filter(|r| !r.is_empty())
                .map(str::to_string)
                .collect(),
            _ => BTreeSet::new(),
        };

        Identity {
            subject_id: claims.subject().map(str::to_string),
            email: claims.string("email").map(str::to_string),
            roles,
        }
    }

    fn role_claim_value<'a>(&self, claims: &'a VerifiedClaims) -> Option<&'a Value> {
        if let Some(value) = claims.get(&self.roles_claim) {
            return Some(value);
        }

        let mut segments = self.roles_claim.split('.');
        let mut value = claims.get(segments.next()?)?;
        for segment in segments {
            value = value.as_object()?.get(segment)?;
        }
        Some(value)
    }
}
