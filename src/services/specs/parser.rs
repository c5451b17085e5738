//! Service description → role rules.
//!
//! Walks `paths.<template>.<method>` and reads the role extension field of
//! each operation. Operations without the field (or with a non-array or empty
//! value) carry no restriction and produce no rule.

use axum::http::Method;
use serde_json::{Map, Value};

use super::error::{ParseError, RuleCompileError};
use super::rule::RoleRule;

pub const DEFAULT_ROLES_EXTENSION: &str = "x-required-roles";

const HTTP_METHODS: [&str; 7] = ["get", "post", "put", "delete", "patch", "head", "options"];

/// Rules harvested from one document, plus the operations dropped because
/// their template did not compile.
#[derive(Debug, Default)]
pub struct ParsedSpec {
    pub rules: Vec<RoleRule>,
    pub dropped: Vec<RuleCompileError>,
}

#[derive(Debug, Clone)]
pub struct SpecParser {
    extension_key: String,
}

impl Default for SpecParser {
    fn default() -> Self {
        Self::new(DEFAULT_ROLES_EXTENSION)
    }
}

impl SpecParser {
    pub fn new(extension_key: impl Into<String>) -> Self {
        Self {
            extension_key: extension_key.into(),
        }
    }

    pub fn extension_key(&self) -> &str {
        &self.extension_key
    }

    /// Parse a JSON service description published by `service`.
    pub fn parse(&self, service: &str, document: &[u8]) -> Result<ParsedSpec, ParseError> {
        let root: Value = serde_json::from_slice(document)?;
        let root = root
            .as_object()
            .ok_or_else(|| ParseError::Shape("document root is not an object".into()))?;

        let mut parsed = ParsedSpec::default();

        let paths = match root.get("paths") {
            None | Some(Value::Null) => return Ok(parsed),
            Some(Value::Object(paths)) => paths,
            Some(_) => return Err(ParseError::Shape("'paths' is not an object".into())),
        };

        for (template, path_item) in paths {
            let path_item = path_item.as_object().ok_or_else(|| {
                ParseError::Shape(format!("path item '{template}' is not an object"))
            })?;

            for (method_name, operation) in path_item {
                let Some(method) = standard_method(method_name) else {
                    // parameters, summary, servers, x-* ...
                    continue;
                };

                let operation = operation.as_object().ok_or_else(|| {
                    ParseError::Shape(format!(
                        "operation {method_name} '{template}' is not an object"
                    ))
                })?;

                let roles = self.required_roles(service, &method, template, operation);
                if roles.is_empty() {
                    continue;
                }

                match RoleRule::new(service, method, template, roles) {
                    Ok(rule) => {
                        tracing::debug!(
                            service,
                            rule = %rule.key(),
                            roles = ?rule.required_roles(),
                            "registered role rule"
                        );
                        parsed.rules.push(rule);
                    }
                    Err(err) => {
                        tracing::warn!(service, error = %err, "dropping role rule with malformed path template");
                        parsed.dropped.push(err);
                    }
                }
            }
        }

        Ok(parsed)
    }

    fn required_roles(
        &self,
        service: &str,
        method: &Method,
        template: &str,
        operation: &Map<String, Value>,
    ) -> Vec<String> {
        let Some(value) = operation.get(&self.extension_key) else {
            return Vec::new();
        };

        let Some(items) = value.as_array() else {
            // Non-array value: no restriction.
            tracing::warn!(
                service,
                %method,
                template,
                extension = %self.extension_key,
                "role extension is not an array; treating operation as unrestricted"
            );
            return Vec::new();
        };

        let mut roles: Vec<String> = Vec::with_capacity(items.len());
        for item in items {
            match item.as_str() {
                Some(role) if !role.is_empty() => {
                    if !roles.iter().any(|r| r == role) {
                        roles.push(role.to_string());
                    }
                }
                Some(_) => {}
                None => tracing::warn!(
                    service,
                    %method,
                    template,
                    value = %item,
                    "ignoring non-string role entry"
                ),
            }
        }
        roles
    }
}

fn standard_method(name: &str) -> Option<Method> {
    let lower = name.to_ascii_lowercase();
    if !HTTP_METHODS.contains(&lower.as_str()) {
        return None;
    }
    Method::from_bytes(lower.to_ascii_uppercase().as_bytes()).ok()
}
