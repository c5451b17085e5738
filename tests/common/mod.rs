#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use authz_gateway::app::build_router;
use authz_gateway::middleware::http::HttpLimits;
use authz_gateway::services::auth::{IdentityExtractor, TokenAlgorithm, TokenVerifier};
use authz_gateway::services::specs::{
    FetchError, ServiceSource, SpecFetcher, SpecParser, SpecRegistry,
};
use authz_gateway::state::AppState;
use axum::{
    Json, Router,
    body::{Body, to_bytes},
    http::{HeaderMap, Method, Request, Response, Uri, header},
};
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use serde_json::{Value, json};

pub const SECRET: &str = "integration-test-secret-0123456789";
pub const ISSUER: &str = "http://keycloak.test/realms/gateway";

/// Serves in-memory documents; services without one fail with 503.
#[derive(Default)]
pub struct StaticFetcher {
    docs: Mutex<HashMap<String, Value>>,
}

impl StaticFetcher {
    pub fn set(&self, service: &str, doc: Value) {
        self.docs.lock().unwrap().insert(service.to_string(), doc);
    }

    pub fn remove(&self, service: &str) {
        self.docs.lock().unwrap().remove(service);
    }
}

#[async_trait]
impl SpecFetcher for StaticFetcher {
    async fn fetch(&self, source: &ServiceSource) -> Result<Vec<u8>, FetchError> {
        let docs = self.docs.lock().unwrap();
        match docs.get(source.name()) {
            Some(doc) => Ok(doc.to_string().into_bytes()),
            None => Err(FetchError::Status(503)),
        }
    }
}

/// An OpenAPI-ish document from `(method, path, "ROLE_A,ROLE_B")`.
/// An empty role list leaves the operation without the extension.
pub fn openapi(operations: &[(&str, &str, &str)]) -> Value {
    let mut paths = serde_json::Map::new();
    for (method, path, roles) in operations {
        let item = paths
            .entry(path.to_string())
            .or_insert_with(|| json!({}));
        let roles: Vec<&str> = roles.split(',').filter(|r| !r.is_empty()).collect();
        let operation = if roles.is_empty() {
            json!({ "summary": "open" })
        } else {
            json!({ "x-required-roles": roles })
        };
        item[method.to_ascii_lowercase()] = operation;
    }
    json!({ "openapi": "3.0.1", "paths": paths })
}

pub struct TestGateway {
    pub router: Router,
    pub state: AppState,
    pub fetcher: Arc<StaticFetcher>,
}

impl TestGateway {
    /// Registry over `services` (in precedence order), refreshed once, in front of `upstream`.
    pub async fn start(services: &[(&str, Value)], upstream: Router<AppState>) -> Self {
        let fetcher = Arc::new(StaticFetcher::default());
        let mut sources = Vec::new();
        for (name, doc) in services {
            fetcher.set(name, doc.clone());
            sources.push(
                ServiceSource::new(name, &format!("http://{name}.internal/v3/api-docs")).unwrap(),
            );
        }

        let registry = Arc::new(SpecRegistry::new(
            sources,
            Arc::clone(&fetcher) as Arc<dyn SpecFetcher>,
            SpecParser::default(),
            Duration::from_secs(1),
        ));
        registry.refresh().await;

        let verifier = TokenVerifier::new(TokenAlgorithm::Hs256, SECRET, ISSUER, None, 0).unwrap();
        let state = AppState::new(
            registry,
            Arc::new(verifier),
            Arc::new(IdentityExtractor::default()),
            "ROLE_",
        );

        let router = build_router(state.clone(), upstream, HttpLimits::default());
        Self {
            router,
            state,
            fetcher,
        }
    }
}

/// Upstream that answers 200 with what it received.
pub fn echo_upstream() -> Router<AppState> {
    async fn echo(method: Method, uri: Uri, headers: HeaderMap) -> Json<Value> {
        let header = |name: &str| {
            let values: Vec<&str> = headers
                .get_all(name)
                .iter()
                .filter_map(|v| v.to_str().ok())
                .collect();
            match values.as_slice() {
                [] => Value::Null,
                [one] => Value::String(one.to_string()),
                many => json!(many),
            }
        };

        Json(json!({
            "method": method.as_str(),
            "path": uri.path(),
            "x-user-id": header("x-user-id"),
            "x-user-email": header("x-user-email"),
            "x-user-roles": header("x-user-roles"),
        }))
    }

    Router::new().fallback(echo)
}

pub fn token(sub: &str, roles: &[&str]) -> String {
    token_with(json!({
        "sub": sub,
        "email": format!("{sub}@example.com"),
        "realm_access": { "roles": roles },
    }))
}

/// Signs `claims` after adding a valid `iss` and `exp` (unless already present).
pub fn token_with(mut claims: Value) -> String {
    let object = claims.as_object_mut().unwrap();
    object.entry("iss").or_insert_with(|| json!(ISSUER));
    object
        .entry("exp")
        .or_insert_with(|| json!(chrono::Utc::now().timestamp() + 300));

    jsonwebtoken::encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(SECRET.as_bytes()),
    )
    .unwrap()
}

pub fn request(method: Method, path: &str, bearer: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(path);
    if let Some(token) = bearer {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    builder.body(Body::empty()).unwrap()
}

pub async fn json_body(response: Response<Body>) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}
