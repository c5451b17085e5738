/*
 * Responsibility
 * - Harvest role requirements from downstream service descriptions
 * - fetch → parse → compile matchers → publish an immutable snapshot
 * - Request handling only ever reads the published snapshot
 */
pub mod error;
pub mod fetcher;
pub mod matcher;
pub mod parser;
pub mod refresher;
pub mod registry;
pub mod rule;
pub mod source;

pub use error::{FetchError, ParseError, RuleCompileError};
pub use fetcher::{HttpSpecFetcher, SpecFetcher};
pub use matcher::{MatcherError, PathMatcher};
pub use parser::{DEFAULT_ROLES_EXTENSION, ParsedSpec, SpecParser};
pub use refresher::RefreshTask;
pub use registry::{
    Freshness, RefreshReport, RegistrySnapshot, ServiceRules, SourceOutcome, SourceReport,
    SpecRegistry,
};
pub use rule::RoleRule;
pub use source::{ServiceSource, SourceError};
