use std::time::Duration;

use grants::Grant;
use serde::Serialize;
use tracing::{debug, warn};

use crate::error::AppError;
use crate::models::{Principal, UserDirectory};
use crate::services::auth::jwt::{JwtVerifier, VerifiedToken};
use crate::services::auth::token_issuer::{
    IssuedTokens, TRANSACTION_TOKEN_TTL, TokenIssuer, TokenOptions,
};

/// Service that decides, per operation, which grant and lifetime an issued
/// token gets, and gates protected operations on the grant a token carries.
///
/// Password, TOTP code and user-store checks happen before these calls.
#[derive(Clone, Debug)]
pub struct TokenService {
    issuer: TokenIssuer,
    verifier: JwtVerifier,
    transaction_ttl: Duration,
}

/// Token pair handed back to the client.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct AccessToken {
    pub token: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    pub token_type: &'static str,
    pub expires_in: u64,
    pub otp_required: bool,
    #[serde(skip)]
    pub grant: Grant,
}

impl AccessToken {
    fn from_issued(issued: IssuedTokens, otp_required: bool) -> Self {
        Self {
            token: issued.access_token,
            refresh_token: issued.refresh_token,
            token_type: issued.token_type,
            expires_in: issued.expires_in,
            otp_required,
            grant: issued.grant,
        }
    }
}

impl TokenService {
    pub fn new(issuer: TokenIssuer, verifier: JwtVerifier) -> Self {
        Self {
            issuer,
            verifier,
            transaction_ttl: TRANSACTION_TOKEN_TTL,
        }
    }

    pub fn with_transaction_ttl(mut self, ttl: Duration) -> Self {
        if !ttl.is_zero() {
            self.transaction_ttl = ttl;
        }
        self
    }

    /// Tokens after a successful password check.
    ///
    /// With two-factor enabled only a short-lived `otp-validate` token is
    /// issued and no refresh token, until the OTP is confirmed.
    pub fn login(&self, principal: &Principal) -> Result<AccessToken, AppError> {
        let options = principal
            .totp_enabled
            .then(|| TokenOptions::transactional(self.transaction_ttl));

        let issued = self.issuer.issue_tokens(principal, options.as_ref())?;
        Ok(AccessToken::from_issued(issued, principal.totp_enabled))
    }

    pub fn signup(&self, principal: &Principal) -> Result<AccessToken, AppError> {
        let issued = self.issuer.issue_tokens(principal, None)?;
        Ok(AccessToken::from_issued(issued, principal.totp_enabled))
    }

    /// Tokens after the OTP for `principal` has been validated.
    pub fn validate_otp(&self, principal: &Principal) -> Result<AccessToken, AppError> {
        let issued = self.issuer.issue_tokens(principal, None)?;
        Ok(AccessToken::from_issued(issued, principal.totp_enabled))
    }

    /// Exchange a refresh token for a fresh token pair.
    ///
    /// The grant is resolved again, so custom grants reconfigured since the
    /// previous issuance take effect.
    pub async fn refresh(
        &self,
        refresh_token: &str,
        users: &dyn UserDirectory,
    ) -> Result<AccessToken, AppError> {
        let verified = self.authorize(refresh_token, Grant::USERS_REFRESH)?;

        let principal = users
            .find_by_id(verified.user_id)
            .await?
            .ok_or_else(|| {
                debug!(user_id = %verified.user_id, "refresh for unknown principal");
                AppError::NotFound
            })?;

        let issued = self.issuer.issue_tokens(&principal, None)?;
        Ok(AccessToken::from_issued(issued, principal.totp_enabled))
    }

    /// Verify `token` and require that its grant claim contains `required`.
    pub fn authorize(&self, token: &str, required: Grant) -> Result<VerifiedToken, AppError> {
        let verified = self.verifier.verify(token).map_err(|err| {
            warn!(error = %err, "token verification failed");
            AppError::from(err)
        })?;

        let table = self.issuer.registry().snapshot();
        grants::contains_grant(&table, required, &verified).map_err(|err| {
            warn!(
                user_id = %verified.user_id,
                required = %table.to_long_string(required),
                error = %err,
                "grant check failed"
            );
            AppError::from(err)
        })?;

        Ok(verified)
    }
}
