/*
 * Responsibility
 * - Config → services → AppState
 * - Eager rule refresh before accepting traffic, then the periodic refresher
 * - Router assembly (public routes + gated upstream + HTTP layers)
 * - axum::serve() with graceful shutdown
 */
use std::{panic, process, sync::Arc};

use anyhow::{Context, Result};
use axum::Router;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::api::{self, handlers::fallback::no_route};
use crate::config::Config;
use crate::middleware::{self, auth, http::HttpLimits, identity_headers};
use crate::services::auth::{IdentityExtractor, TokenVerifier};
use crate::services::specs::{HttpSpecFetcher, RefreshTask, SpecParser, SpecRegistry};
use crate::state::AppState;

fn init_tracing() {
    // Prefer RUST_LOG if set; otherwise use a sensible default.
    // Ex:
    // RUST_LOG=info,authz_gateway=debug,tower_http=debug cargo run
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info,tower_http=info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

fn init_panic_hook(abort_on_panic: bool) {
    // Keep the default hook as a fallback (prints to stderr with location/payload).
    let default_hook = panic::take_hook();

    panic::set_hook(Box::new(move |info| {
        tracing::error!(?info, "panic");

        // Development: crash the whole process so it gets noticed.
        if abort_on_panic {
            process::abort();
        } else {
            default_hook(info);
        }
    }))
}

pub async fn run() -> Result<()> {
    init_tracing();
    let config = Config::from_env()?;
    init_panic_hook(!config.app_env.is_production());

    tracing::info!(
        "starting gateway in {:?} mode on {} ({} spec sources)",
        config.app_env,
        config.addr,
        config.spec_sources.len()
    );

    let state = build_state(&config)?;

    // Gate traffic on the first harvest; a failed one leaves every route unrestricted.
    let report = state.registry.refresh().await;
    if report.is_complete() {
        tracing::info!(generation = report.generation, "initial role rules loaded");
    } else {
        tracing::warn!(
            generation = report.generation,
            failed = report.failures().count(),
            "initial role rule refresh incomplete; continuing"
        );
    }
    let refresher = RefreshTask::spawn(Arc::clone(&state.registry), config.refresh_interval);

    // Proxying is not done here; unclaimed requests get a JSON 404 after authz.
    let upstream = Router::new().fallback(no_route);
    let app = build_router(state, upstream, HttpLimits::from(&config));

    let listener = tokio::net::TcpListener::bind(config.addr)
        .await
        .with_context(|| format!("failed to bind {}", config.addr))?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    refresher.stop();
    tracing::info!("gateway stopped");
    Ok(())
}

pub fn build_state(config: &Config) -> Result<AppState> {
    let verifier = TokenVerifier::new(
        config.access_jwt_algorithm,
        &config.access_jwt_key,
        &config.auth_issuer,
        config.auth_audience.as_deref(),
        config.access_token_leeway_seconds,
    )
    .context("failed to build access token verifier")?;

    let fetcher = HttpSpecFetcher::new(config.fetch_timeout, config.spec_max_bytes)
        .context("failed to build spec fetcher")?;

    let registry = SpecRegistry::new(
        config.spec_sources.clone(),
        Arc::new(fetcher),
        SpecParser::new(config.roles_extension.clone()),
        config.fetch_timeout,
    );

    Ok(AppState::new(
        Arc::new(registry),
        Arc::new(verifier),
        Arc::new(IdentityExtractor::new(config.roles_claim.clone())),
        config.identity_role_prefix.as_str(),
    ))
}

/// Compose the gateway around `upstream`.
///
/// `/health` and `/info` are answered directly. Everything else goes through
/// authentication → identity headers → authz before reaching `upstream`.
pub fn build_router(state: AppState, upstream: Router<AppState>, limits: HttpLimits) -> Router {
    // Router::layer wraps what is already there: innermost first.
    let gated = auth::authz::apply(upstream, state.clone());
    let gated = identity_headers::apply(gated, state.clone());
    let gated = auth::access::apply(gated, state.clone());

    let router = Router::new()
        .merge(api::public_routes())
        .merge(gated)
        .with_state(state);

    middleware::http::apply(router, limits)
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown signal received");
}
