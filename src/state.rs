/*
 * Responsibility
 * - Shared context attached to the Router (AppState)
 *   - registry: current role rules, verifier: bearer token check,
 *     identity: claims → Identity, role_prefix: X-User-Roles rendering
 * - Cheap to Clone (everything behind Arc)
 */
use std::sync::Arc;

use crate::services::{
    auth::{IdentityExtractor, TokenVerifier},
    specs::SpecRegistry,
};

#[derive(Clone, Debug)]
pub struct AppState {
    pub registry: Arc<SpecRegistry>,
    pub verifier: Arc<TokenVerifier>,
    pub identity: Arc<IdentityExtractor>,
    pub role_prefix: Arc<str>,
}

impl AppState {
    pub fn new(
        registry: Arc<SpecRegistry>,
        verifier: Arc<TokenVerifier>,
        identity: Arc<IdentityExtractor>,
        role_prefix: impl Into<Arc<str>>,
    ) -> Self {
        Self {
            registry,
            verifier,
            identity,
            role_prefix: role_prefix.into(),
        }
    }
}
