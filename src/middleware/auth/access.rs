//! Bearer access token verification → `VerifiedClaims` in request extensions.
//!
//! - Every route this layer wraps requires `Authorization: Bearer <jwt>`.
//! - Signature / `exp` / `iss` / `aud` checks live in `TokenVerifier`.
//! - Downstream layers (identity headers, authz) read the claims from extensions.

use axum::{
    Router,
    body::Body,
    extract::State,
    http::{Request, header},
    middleware::{self, Next},
    response::Response,
};

use crate::error::AppError;
use crate::state::AppState;

/// Require a verified bearer token on every route of `router`.
pub fn apply(router: Router<AppState>, state: AppState) -> Router<AppState> {
    router.layer(middleware::from_fn_with_state(state, access_middleware))
}

async fn access_middleware(
    State(state): State<AppState>,
    mut req: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let Some(token) = bearer_token(&req) else {
        tracing::warn!(
            method = %req.method(),
            path = %req.uri().path(),
            "missing bearer token"
        );
        return Err(AppError::Unauthorized);
    };

    let claims = match state.verifier.verify(token) {
        Ok(claims) => claims,
        Err(err) => {
            tracing::warn!(
                error = %err,
                method = %req.method(),
                path = %req.uri().path(),
                "access token verification failed"
            );
            return Err(AppError::Unauthorized);
        }
    };

    // middleware → identity / authz layers
    req.extensions_mut().insert(claims);

    Ok(next.run(req).await)
}

fn bearer_token(req: &Request<Body>) -> Option<&str> {
    let value = req.headers().get(header::AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}
