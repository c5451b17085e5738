use axum::http::Method;

use super::error::RuleCompileError;
use super::matcher::PathMatcher;

/// (method, path template, required roles) harvested from one operation.
///
/// Never mutated after creation. A refresh either reuses the `Arc` from the
/// previous snapshot (stale source) or replaces it outright.
#[derive(Debug, Clone)]
pub struct RoleRule {
    service: String,
    method: Method,
    required_roles: Vec<String>,
    matcher: PathMatcher,
}

impl RoleRule {
    pub fn new(
        service: impl Into<String>,
        method: Method,
        template: &str,
        required_roles: Vec<String>,
    ) -> Result<Self, RuleCompileError> {
        let matcher = PathMatcher::compile(template).map_err(|source| RuleCompileError {
            method: method.to_string(),
            template: template.to_string(),
            source,
        })?;

        Ok(Self {
            service: service.into(),
            method,
            required_roles,
            matcher,
        })
    }

    pub fn service(&self) -> &str {
        &self.service
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn template(&self) -> &str {
        self.matcher.template()
    }

    pub fn required_roles(&self) -> &[String] {
        &self.required_roles
    }

    pub fn is_exact(&self) -> bool {
        self.matcher.is_literal()
    }

    pub fn wildcard_count(&self) -> usize {
        self.matcher.wildcard_count()
    }

    pub fn matches(&self, method: &Method, path: &str) -> bool {
        self.method == *method && self.matcher.matches(path)
    }

    /// `GET:/api/metadata/{id}`, the key format used in logs.
    pub fn key(&self) -> String {
        format!("{}:{}", self.method, self.template())
    }
}
