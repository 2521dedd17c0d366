/*
 * Responsibility
 * - tracing setup
 * - Config -> custom grant registry -> token services -> AppState
 */
use std::sync::Arc;

use grants::CustomGrantRegistry;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::Config;
use crate::error::AppError;
use crate::services::auth::build_token_service;
use crate::state::AppState;

pub fn init_tracing() {
    // Prefer RUST_LOG if set; otherwise use a sensible default.
    // Ex:
    // RUST_LOG=info,grants=debug,simpleauth=debug authctl issue ...
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .try_init()
        .ok();
}

/// Build process-level services and inject them into the shared state.
///
/// The custom grant list is applied once here; exceeding the maximum is fatal.
pub fn build_state(config: &Config) -> Result<AppState, AppError> {
    let registry = CustomGrantRegistry::with_custom_grants(&config.custom_grants).map_err(|e| {
        tracing::error!(error = %e, "invalid CUSTOM_GRANTS");
        AppError::from(e)
    })?;
    let registry = Arc::new(registry);

    let tokens = build_token_service(config, Arc::clone(&registry))?;

    tracing::info!(
        env = ?config.app_env,
        issuer = %config.auth_issuer,
        custom_grants = config.custom_grants.len(),
        "token services ready"
    );

    Ok(AppState::new(registry, tokens))
}
