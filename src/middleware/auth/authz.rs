//! Role check against the rules harvested from downstream service descriptions.
//!
//! Per request:
//! - no rule for (method, path) → forward
//! - rule, but no `VerifiedClaims` → 401
//! - rule + claims → `decide` → forward or 403 (with the required roles)

use axum::{
    Router,
    body::Body,
    extract::{OriginalUri, State},
    http::Request,
    middleware::{self, Next},
    response::Response,
};

use crate::error::AppError;
use crate::services::auth::{VerifiedClaims, decide};
use crate::state::AppState;

pub fn apply(router: Router<AppState>, state: AppState) -> Router<AppState> {
    router.layer(middleware::from_fn_with_state(state, authz_middleware))
}

async fn authz_middleware(
    State(state): State<AppState>,
    OriginalUri(original_uri): OriginalUri,
    req: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let path = original_uri.path();

    // One snapshot for the whole decision.
    let snapshot = state.registry.snapshot();
    let Some(rule) = snapshot.find(req.method(), path) else {
        tracing::debug!(method = %req.method(), path, "no role rule; forwarding");
        return Ok(next.run(req).await);
    };

    let Some(claims) = req.extensions().get::<VerifiedClaims>() else {
        tracing::warn!(
            method = %req.method(),
            path,
            template = rule.template(),
            service = rule.service(),
            "protected route reached without a verified identity"
        );
        return Err(AppError::Unauthorized);
    };

    let identity = state.identity.extract(claims);
    let outcome = decide(rule.required_roles(), &identity.roles);

    if !outcome.allowed {
        tracing::warn!(
            method = %req.method(),
            path,
            template = rule.template(),
            service = rule.service(),
            user = identity.subject_id.as_deref().unwrap_or("-"),
            required_roles = ?outcome.required_roles,
            user_roles = ?outcome.user_roles,
            "access denied"
        );
        return Err(AppError::forbidden(outcome.required_roles));
    }

    tracing::debug!(
        method = %req.method(),
        path,
        template = rule.template(),
        user = identity.subject_id.as_deref().unwrap_or("-"),
        "access granted"
    );

    Ok(next.run(req).await)
}
