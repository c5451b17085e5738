//! Harvested role rules, published as immutable snapshots.
//!
//! A refresh fetches every configured source concurrently, parses each one
//! independently and assembles a complete new [`RegistrySnapshot`] off to the
//! side. The snapshot is then published with a single `ArcSwap::store`, so a
//! lookup sees either the previous generation or the new one, never a mix.
//!
//! A source that fails in a cycle (fetch error, timeout, parse error) keeps the
//! rules it had in the previous snapshot.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwap;
use axum::http::Method;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::Mutex;
use tokio::task::JoinSet;

use super::error::FetchError;
use super::fetcher::SpecFetcher;
use super::parser::SpecParser;
use super::rule::RoleRule;
use super::source::ServiceSource;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Freshness {
    /// Loaded in the cycle that produced this snapshot.
    Fresh,
    /// Failed this cycle; rules carried over from an earlier one.
    Stale,
    /// Never loaded successfully.
    Missing,
}

/// Rules contributed by one service to a snapshot.
#[derive(Debug, Clone)]
pub struct ServiceRules {
    service: String,
    rules: Vec<Arc<RoleRule>>,
    freshness: Freshness,
    loaded_at: Option<DateTime<Utc>>,
}

impl ServiceRules {
    pub fn service(&self) -> &str {
        &self.service
    }

    pub fn rules(&self) -> &[Arc<RoleRule>] {
        &self.rules
    }

    pub fn freshness(&self) -> Freshness {
        self.freshness
    }

    pub fn loaded_at(&self) -> Option<DateTime<Utc>> {
        self.loaded_at
    }

    fn missing(service: &str) -> Self {
        Self {
            service: service.to_string(),
            rules: Vec::new(),
            freshness: Freshness::Missing,
            loaded_at: None,
        }
    }

    fn carried_over(&self) -> Self {
        Self {
            freshness: if self.loaded_at.is_some() {
                Freshness::Stale
            } else {
                Freshness::Missing
            },
            ..self.clone()
        }
    }
}

/// One complete, immutable generation of the rule table.
#[derive(Debug, Default)]
pub struct RegistrySnapshot {
    generation: u64,
    refreshed_at: Option<DateTime<Utc>>,
    services: Vec<ServiceRules>,
    exact: HashMap<Method, HashMap<String, Arc<RoleRule>>>,
    // Ordered by precedence: fewest wildcards, then service order, then rule order.
    templated: Vec<Arc<RoleRule>>,
}

impl RegistrySnapshot {
    pub fn empty() -> Self {
        Self::default()
    }

    fn build(generation: u64, refreshed_at: DateTime<Utc>, services: Vec<ServiceRules>) -> Self {
        let mut exact: HashMap<Method, HashMap<String, Arc<RoleRule>>> = HashMap::new();
        let mut templated: Vec<Arc<RoleRule>> = Vec::new();

        for service in &services {
            for rule in &service.rules {
                if rule.is_exact() {
                    // First service in configuration order owns a literal route.
                    exact
                        .entry(rule.method().clone())
                        .or_default()
                        .entry(rule.template().to_string())
                        .or_insert_with(|| Arc::clone(rule));
                } else {
                    templated.push(Arc::clone(rule));
                }
            }
        }

        // Stable sort keeps configuration order within the same wildcard count.
        templated.sort_by_key(|rule| rule.wildcard_count());

        Self {
            generation,
            refreshed_at: Some(refreshed_at),
            services,
            exact,
            templated,
        }
    }

    /// The rule that governs `method path`, if any.
    pub fn find(&self, method: &Method, path: &str) -> Option<&RoleRule> {
        if let Some(rule) = self
            .exact
            .get(method)
            .and_then(|by_path| by_path.get(path))
        {
            return Some(rule.as_ref());
        }

        self.templated
            .iter()
            .find(|rule| rule.matches(method, path))
            .map(|rule| rule.as_ref())
    }

    /// Required roles for `method path`; empty means unrestricted.
    pub fn required_roles(&self, method: &Method, path: &str) -> &[String] {
        self.find(method, path)
            .map(RoleRule::required_roles)
            .unwrap_or(&[])
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn refreshed_at(&self) -> Option<DateTime<Utc>> {
        self.refreshed_at
    }

    pub fn services(&self) -> &[ServiceRules] {
        &self.services
    }

    pub fn service(&self, name: &str) -> Option<&ServiceRules> {
        self.services.iter().find(|s| s.service == name)
    }

    pub fn rule_count(&self) -> usize {
        self.services.iter().map(|s| s.rules.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.rule_count() == 0
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceOutcome {
    Loaded { rules: usize, dropped: usize },
    FetchFailed { error: String, retained: usize },
    ParseFailed { error: String, retained: usize },
}

#[derive(Debug, Clone)]
pub struct SourceReport {
    pub service: String,
    pub outcome: SourceOutcome,
}

impl SourceReport {
    pub fn is_failure(&self) -> bool {
        !matches!(self.outcome, SourceOutcome::Loaded { .. })
    }
}

/// What one call to [`SpecRegistry::refresh`] did.
#[derive(Debug, Clone)]
pub struct RefreshReport {
    /// Another refresh was already running; nothing was attempted.
    pub skipped: bool,
    /// A new snapshot was published.
    pub published: bool,
    /// Generation current after this call.
    pub generation: u64,
    pub sources: Vec<SourceReport>,
}

impl RefreshReport {
    fn skipped(generation: u64) -> Self {
        Self {
            skipped: true,
            published: false,
            generation,
            sources: Vec::new(),
        }
    }

    pub fn failures(&self) -> impl Iterator<Item = &SourceReport> {
        self.sources.iter().filter(|s| s.is_failure())
    }

    pub fn is_complete(&self) -> bool {
        !self.skipped && self.failures().next().is_none()
    }
}

pub struct SpecRegistry {
    sources: Vec<ServiceSource>,
    fetcher: Arc<dyn SpecFetcher>,
    parser: SpecParser,
    fetch_timeout: Duration,
    current: ArcSwap<RegistrySnapshot>,
    refresh_lock: Mutex<()>,
}

impl fmt::Debug for SpecRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let current = self.current.load();
        f.debug_struct("SpecRegistry")
            .field("sources", &self.sources)
            .field("parser", &self.parser)
            .field("fetch_timeout", &self.fetch_timeout)
            .field("generation", &current.generation())
            .field("rules", &current.rule_count())
            .finish()
    }
}

impl SpecRegistry {
    /// Starts with an empty snapshot: every route is unrestricted until the
    /// first refresh publishes something.
    pub fn new(
        sources: Vec<ServiceSource>,
        fetcher: Arc<dyn SpecFetcher>,
        parser: SpecParser,
        fetch_timeout: Duration,
    ) -> Self {
        Self {
            sources,
            fetcher,
            parser,
            fetch_timeout,
            current: ArcSwap::from_pointee(RegistrySnapshot::empty()),
            refresh_lock: Mutex::new(()),
        }
    }

    pub fn sources(&self) -> &[ServiceSource] {
        &self.sources
    }

    /// The currently published snapshot.
    pub fn snapshot(&self) -> Arc<RegistrySnapshot> {
        self.current.load_full()
    }

    /// Required roles for `method path` against the current snapshot.
    /// Empty means "no restriction".
    pub fn lookup(&self, method: &Method, path: &str) -> Vec<String> {
        self.current.load().required_roles(method, path).to_vec()
    }

    pub fn has_rules(&self) -> bool {
        !self.current.load().is_empty()
    }

    /// Run one fetch+parse pass over every source and publish the result.
    ///
    /// Never fails: per-source problems are logged and reported, and the
    /// source falls back to the rules it had before. If a refresh is already
    /// in flight this returns immediately with `skipped` set.
    pub async fn refresh(&self) -> RefreshReport {
        let Ok(_guard) = self.refresh_lock.try_lock() else {
            tracing::debug!("spec refresh already in progress; skipping");
            return RefreshReport::skipped(self.current.load().generation());
        };

        let previous = self.current.load_full();
        let fetched = self.fetch_all().await;
        let now = Utc::now();

        let mut services = Vec::with_capacity(self.sources.len());
        let mut reports = Vec::with_capacity(self.sources.len());

        for (source, fetched) in self.sources.iter().zip(fetched) {
            let service = source.name();

            let carried_over = || {
                previous
                    .service(service)
                    .map(ServiceRules::carried_over)
                    .unwrap_or_else(|| ServiceRules::missing(service))
            };

            let outcome = match fetched {
                Err(err) => {
                    let kept = carried_over();
                    tracing::warn!(
                        service,
                        url = %source.spec_url(),
                        error = %err,
                        retained = kept.rules.len(),
                        "failed to fetch service description; keeping previous rules"
                    );
                    let outcome = SourceOutcome::FetchFailed {
                        error: err.to_string(),
                        retained: kept.rules.len(),
                    };
                    services.push(kept);
                    outcome
                }
                Ok(body) => match self.parser.parse(service, &body) {
                    Err(err) => {
                        let kept = carried_over();
                        tracing::warn!(
                            service,
                            url = %source.spec_url(),
                            error = %err,
                            retained = kept.rules.len(),
                            "failed to parse service description; keeping previous rules"
                        );
                        let outcome = SourceOutcome::ParseFailed {
                            error: err.to_string(),
                            retained: kept.rules.len(),
                        };
                        services.push(kept);
                        outcome
                    }
                    Ok(parsed) => {
                        tracing::info!(
                            service,
                            rules = parsed.rules.len(),
                            dropped = parsed.dropped.len(),
                            "loaded service description"
                        );
                        let outcome = SourceOutcome::Loaded {
                            rules: parsed.rules.len(),
                            dropped: parsed.dropped.len(),
                        };
                        services.push(ServiceRules {
                            service: service.to_string(),
                            rules: parsed.rules.into_iter().map(Arc::new).collect(),
                            freshness: Freshness::Fresh,
                            loaded_at: Some(now),
                        });
                        outcome
                    }
                },
            };

            reports.push(SourceReport {
                service: service.to_string(),
                outcome,
            });
        }

        let any_loaded = reports.iter().any(|r| !r.is_failure());
        if !any_loaded && !self.sources.is_empty() {
            tracing::warn!(
                generation = previous.generation(),
                "no service description could be refreshed; keeping current snapshot"
            );
            return RefreshReport {
                skipped: false,
                published: false,
                generation: previous.generation(),
                sources: reports,
            };
        }

        let generation = previous.generation() + 1;
        let snapshot = RegistrySnapshot::build(generation, now, services);
        tracing::info!(
            generation,
            rules = snapshot.rule_count(),
            failed = reports.iter().filter(|r| r.is_failure()).count(),
            "published role rule snapshot"
        );
        self.current.store(Arc::new(snapshot));

        RefreshReport {
            skipped: false,
            published: true,
            generation,
            sources: reports,
        }
    }

    // Results are indexed in configuration order regardless of completion order.
    async fn fetch_all(&self) -> Vec<Result<Vec<u8>, FetchError>> {
        let mut tasks = JoinSet::new();

        for (index, source) in self.sources.iter().enumerate() {
            let fetcher = Arc::clone(&self.fetcher);
            let source = source.clone();
            let timeout = self.fetch_timeout;

            tasks.spawn(async move {
                tracing::debug!(service = source.name(), url = %source.spec_url(), "fetching service description");
                let result = match tokio::time::timeout(timeout, fetcher.fetch(&source)).await {
                    Ok(result) => result,
                    Err(_) => Err(FetchError::Timeout(timeout)),
                };
                (index, result)
            });
        }

        let mut results: Vec<Result<Vec<u8>, FetchError>> = self
            .sources
            .iter()
            .map(|_| Err(FetchError::Aborted))
            .collect();

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((index, result)) => results[index] = result,
                Err(err) => tracing::error!(error = %err, "spec fetch task failed"),
            }
        }

        results
    }
}
