//! Path template → request-path predicate.
//!
//! `/api/metadata/{id}` compiles to `^/api/metadata/[^/]+$`. A variable never
//! matches across a `/` boundary and never matches an empty segment.
//! Templates without variables skip the regex entirely and compare by equality.

use regex::Regex;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MatcherError {
    #[error("path template must start with '/': {template}")]
    MissingLeadingSlash { template: String },
    #[error("unbalanced '{{' or '}}' at byte {position} in {template}")]
    UnbalancedBrace { template: String, position: usize },
    #[error("empty variable name at byte {position} in {template}")]
    EmptyVariable { template: String, position: usize },
    #[error("variable '{name}' appears more than once in {template}")]
    DuplicateVariable { template: String, name: String },
    #[error("invalid pattern for {template}: {reason}")]
    Pattern { template: String, reason: String },
}

#[derive(Debug, Clone)]
pub struct PathMatcher {
    template: String,
    // None for literal templates
    regex: Option<Regex>,
    variables: Vec<String>,
}

impl PathMatcher {
    /// Compile a path template into a matcher.
    ///
    /// Literal text is regex-escaped, so `.` or `+` in a template only match
    /// themselves. Variables may fill a whole segment or part of one
    /// (`/files/{name}.json`).
    pub fn compile(template: &str) -> Result<Self, MatcherError> {
        if !template.starts_with('/') {
            return Err(MatcherError::MissingLeadingSlash {
                template: template.to_string(),
            });
        }

        let mut pattern = String::with_capacity(template.len() + 8);
        pattern.push('^');
        let mut literal = String::new();
        let mut variables: Vec<String> = Vec::new();

        let mut chars = template.char_indices();
        while let Some((position, c)) = chars.next() {
            match c {
                '{' => {
                    let mut name = String::new();
                    let mut closed = false;
                    for (inner_position, inner) in chars.by_ref() {
                        match inner {
                            '}' => {
                                closed = true;
                                break;
                            }
                            '{' | '/' => {
                                return Err(MatcherError::UnbalancedBrace {
                                    template: template.to_string(),
                                    position: inner_position,
                                });
                            }
                            other => name.push(other),
                        }
                    }
                    if !closed {
                        return Err(MatcherError::UnbalancedBrace {
                            template: template.to_string(),
                            position,
                        });
                    }
                    let name = name.trim().to_string();
                    if name.is_empty() {
                        return Err(MatcherError::EmptyVariable {
                            template: template.to_string(),
                            position,
                        });
                    }
                    if variables.contains(&name) {
                        return Err(MatcherError::DuplicateVariable {
                            template: template.to_string(),
                            name,
                        });
                    }

                    pattern.push_str(&regex::escape(&literal));
                    literal.clear();
                    pattern.push_str("[^/]+");
                    variables.push(name);
                }
                '}' => {
                    return Err(MatcherError::UnbalancedBrace {
                        template: template.to_string(),
                        position,
                    });
                }
                other => literal.push(other),
            }
        }

        if variables.is_empty() {
            return Ok(Self {
                template: template.to_string(),
                regex: None,
                variables,
            });
        }

        pattern.push_str(&regex::escape(&literal));
        pattern.push('$');

        let regex = Regex::new(&pattern).map_err(|e| MatcherError::Pattern {
            template: template.to_string(),
            reason: e.to_string(),
        })?;

        Ok(Self {
            template: template.to_string(),
            regex: Some(regex),
            variables,
        })
    }

    pub fn matches(&self, path: &str) -> bool {
        match &self.regex {
            Some(regex) => regex.is_match(path),
            None => self.template == path,
        }
    }

    pub fn template(&self) -> &str {
        &self.template
    }

    /// True when the template has no `{variable}` parts.
    pub fn is_literal(&self) -> bool {
        self.variables.is_empty()
    }

    /// Number of variable parts; fewer wins when two templates match the same path.
    pub fn wildcard_count(&self) -> usize {
        self.variables.len()
    }

    pub fn variables(&self) -> &[String] {
        &self.variables
    }
}
