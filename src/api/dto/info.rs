use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::services::specs::{Freshness, RegistrySnapshot, ServiceSource};

#[derive(Debug, Serialize)]
pub struct InfoResponse {
    pub name: &'static str,
    pub version: &'static str,
    pub generation: u64,
    pub refreshed_at: Option<DateTime<Utc>>,
    pub rules_loaded: bool,
    pub rule_count: usize,
    pub services: Vec<ServiceInfo>,
}

#[derive(Debug, Serialize)]
pub struct ServiceInfo {
    pub service: String,
    pub spec_url: String,
    pub rules: usize,
    pub freshness: Freshness,
    pub loaded_at: Option<DateTime<Utc>>,
}

impl InfoResponse {
    /// Configured sources in order, joined with their entry in `snapshot`
    /// (sources the snapshot has never seen are reported as missing).
    pub fn new(sources: &[ServiceSource], snapshot: &RegistrySnapshot) -> Self {
        let services = sources
            .iter()
            .map(|source| {
                let rules = snapshot.service(source.name());
                ServiceInfo {
                    service: source.name().to_string(),
                    spec_url: source.spec_url().to_string(),
                    rules: rules.map_or(0, |r| r.rules().len()),
                    freshness: rules.map_or(Freshness::Missing, |r| r.freshness()),
                    loaded_at: rules.and_then(|r| r.loaded_at()),
                }
            })
            .collect();

        Self {
            name: env!("CARGO_PKG_NAME"),
            version: env!("CARGO_PKG_VERSION"),
            generation: snapshot.generation(),
            refreshed_at: snapshot.refreshed_at(),
            rules_loaded: !snapshot.is_empty(),
            rule_count: snapshot.rule_count(),
            services,
        }
    }
}
