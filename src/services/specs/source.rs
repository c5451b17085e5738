use std::fmt;

use thiserror::Error;
use url::Url;

/// One configured downstream service: where its description document lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceSource {
    name: String,
    spec_url: Url,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SourceError {
    #[error("service name is empty")]
    EmptyName,
    #[error("spec url for '{service}' is invalid: {reason}")]
    InvalidUrl { service: String, reason: String },
}

impl ServiceSource {
    pub fn new(name: &str, spec_url: &str) -> Result<Self, SourceError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(SourceError::EmptyName);
        }

        let spec_url = Url::parse(spec_url.trim()).map_err(|e| SourceError::InvalidUrl {
            service: name.to_string(),
            reason: e.to_string(),
        })?;

        if !matches!(spec_url.scheme(), "http" | "https") {
            return Err(SourceError::InvalidUrl {
                service: name.to_string(),
                reason: format!("unsupported scheme '{}'", spec_url.scheme()),
            });
        }

        Ok(Self {
            name: name.to_string(),
            spec_url,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn spec_url(&self) -> &Url {
        &self.spec_url
    }
}

impl fmt::Display for ServiceSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.spec_url)
    }
}
