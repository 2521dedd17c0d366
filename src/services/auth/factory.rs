/// Factory: build `TokenService` from application `Config`.
use std::sync::Arc;

use grants::CustomGrantRegistry;

use crate::config::Config;
use crate::error::AppError;
use crate::services::auth::{JwtSigner, JwtVerifier, TokenIssuer, TokenService};

pub fn build_token_service(
    config: &Config,
    registry: Arc<CustomGrantRegistry>,
) -> Result<Arc<TokenService>, AppError> {
    let signer = JwtSigner::new(
        &config.access_jwt_private_key_pem,
        &config.access_jwt_public_key_pem,
        config.auth_issuer.clone(),
        config.auth_audience.clone(),
    )?;

    let verifier = JwtVerifier::new(
        &[config.access_jwt_public_key_pem.as_str()],
        &config.auth_issuer,
        &config.auth_audience,
        config.access_token_leeway_seconds,
    )?;

    let issuer = TokenIssuer::new(signer, registry)
        .with_default_ttls(config.access_token_ttl, config.refresh_token_ttl);

    let service = TokenService::new(issuer, verifier).with_transaction_ttl(config.transaction_token_ttl);

    Ok(Arc::new(service))
}
