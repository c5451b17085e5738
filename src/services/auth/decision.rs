use std::collections::BTreeSet;

/// Result of checking one request's roles against a route's requirement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthzOutcome {
    pub allowed: bool,
    pub required_roles: Vec<String>,
    pub user_roles: BTreeSet<String>,
}

/// Allowed iff nothing is required or the caller holds at least one of the
/// required roles (any one suffices). Total and side-effect free.
pub fn decide(required: &[String], actual: &BTreeSet<String>) -> AuthzOutcome {
    let allowed = required.is_empty() || required.iter().any(|role| actual.contains(role));

    AuthzOutcome {
        allowed,
        required_roles: required.to_vec(),
        user_roles: actual.clone(),
    }
}
