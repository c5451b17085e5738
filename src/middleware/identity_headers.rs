//! Forward the caller's identity to downstream services as plain headers.
//!
//! - `X-User-Id`    ← `sub`
//! - `X-User-Email` ← `email`
//! - `X-User-Roles` ← roles, prefixed (`ROLE_` by default) and comma-joined
//!
//! Runs on every authenticated request, restricted or not. Never rejects.

use axum::{
    Router,
    body::Body,
    extract::State,
    http::{HeaderMap, HeaderName, HeaderValue, Request},
    middleware::{self, Next},
    response::Response,
};

use crate::services::auth::{Identity, VerifiedClaims};
use crate::state::AppState;

pub const X_USER_ID: HeaderName = HeaderName::from_static("x-user-id");
pub const X_USER_EMAIL: HeaderName = HeaderName::from_static("x-user-email");
pub const X_USER_ROLES: HeaderName = HeaderName::from_static("x-user-roles");

pub fn apply(router: Router<AppState>, state: AppState) -> Router<AppState> {
    router.layer(middleware::from_fn_with_state(state, identity_headers_middleware))
}

async fn identity_headers_middleware(
    State(state): State<AppState>,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    let identity = req
        .extensions()
        .get::<VerifiedClaims>()
        .map(|claims| state.identity.extract(claims));

    if let Some(identity) = identity {
        write_identity(req.headers_mut(), &identity, &state.role_prefix);
    }

    next.run(req).await
}

/// Replace any client-supplied identity headers with the gateway's own.
pub fn write_identity(headers: &mut HeaderMap, identity: &Identity, role_prefix: &str) {
    headers.remove(X_USER_ID);
    headers.remove(X_USER_EMAIL);
    headers.remove(X_USER_ROLES);

    let roles = identity
        .roles
        .iter()
        .map(|role| format!("{role_prefix}{role}"))
        .collect::<Vec<_>>()
        .join(",");

    let fields = [
        (X_USER_ID, identity.subject_id.clone()),
        (X_USER_EMAIL, identity.email.clone()),
        (X_USER_ROLES, Some(roles).filter(|r| !r.is_empty())),
    ];

    for (name, value) in fields {
        let Some(value) = value else { continue };
        match HeaderValue::from_str(&value) {
            Ok(value) => {
                headers.insert(name, value);
            }
            Err(_) => {
                tracing::warn!(header = %name, "identity value is not a valid header value; omitted");
            }
        }
    }
}
