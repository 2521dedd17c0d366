use std::sync::Arc;
use std::time::Duration;

use grants::{CustomGrantRegistry, Grant, GrantTable};
use serde::Serialize;
use tracing::debug;
use uuid::Uuid;

use crate::models::Principal;
use crate::services::auth::jwt::{JwtSigner, TokenError};

pub const ACCESS_TOKEN_TTL: Duration = Duration::from_secs(60 * 60);
pub const REFRESH_TOKEN_TTL: Duration = Duration::from_secs(24 * 60 * 60);
pub const TRANSACTION_TOKEN_TTL: Duration = Duration::from_secs(5 * 60);

/// Per-call issuance options. Zero values mean "use the default".
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TokenOptions {
    /// Grant to embed; `Grant::UNKNOWN` selects the authenticated default.
    pub grant: Grant,
    pub ttl: Duration,
    pub refresh_ttl: Duration,
    pub skip_refresh: bool,
}

impl TokenOptions {
    /// Short-lived, non-refreshable token that can only validate an OTP.
    pub fn transactional(ttl: Duration) -> Self {
        Self {
            grant: Grant::OTP_VALIDATE,
            ttl,
            skip_refresh: true,
            ..Self::default()
        }
    }
}

#[derive(Debug, Serialize)]
struct AccessTokenClaims<'a> {
    iss: &'a str,
    aud: &'a str,
    sub: String,
    email: &'a str,
    username: &'a str,
    user_type: &'a str,
    iat: i64,
    exp: i64,
    jti: String,
    grant: String,
}

#[derive(Debug, Serialize)]
struct RefreshTokenClaims<'a> {
    iss: &'a str,
    aud: &'a str,
    sub: String,
    iat: i64,
    exp: i64,
    jti: String,
    grant: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IssuedTokens {
    pub access_token: String,
    /// `None` when refresh was skipped.
    pub refresh_token: Option<String>,
    pub token_type: &'static str,
    /// Effective (cleaned) grant embedded in the access token.
    pub grant: Grant,
    pub expires_in: u64,
}

#[derive(Clone, Debug)]
pub struct TokenIssuer {
    signer: JwtSigner,
    registry: Arc<CustomGrantRegistry>,
    access_ttl: Duration,
    refresh_ttl: Duration,
}

impl TokenIssuer {
    pub fn new(signer: JwtSigner, registry: Arc<CustomGrantRegistry>) -> Self {
        Self {
            signer,
            registry,
            access_ttl: ACCESS_TOKEN_TTL,
            refresh_ttl: REFRESH_TOKEN_TTL,
        }
    }

    /// Override the defaults used when options leave a TTL unset.
    pub fn with_default_ttls(mut self, access_ttl: Duration, refresh_ttl: Duration) -> Self {
        if !access_ttl.is_zero() {
            self.access_ttl = access_ttl;
        }
        if !refresh_ttl.is_zero() {
            self.refresh_ttl = refresh_ttl;
        }
        self
    }

    pub fn registry(&self) -> &Arc<CustomGrantRegistry> {
        &self.registry
    }

    /// Effective grant for `options` against `table`, already cleaned.
    pub fn resolve_grant(table: &GrantTable, options: Option<&TokenOptions>) -> Grant {
        let grant = match options {
            Some(o) if !o.grant.is_unknown() => o.grant,
            _ if table.has_custom() => Grant::AUTHENTICATED | table.custom_grant::<&str>(&[]),
            _ => Grant::AUTHENTICATED,
        };
        table.clean(grant)
    }

    /// Issue an access token for `principal` and, unless skipped, a refresh
    /// token that only ever carries `users-refresh`.
    pub fn issue_tokens(
        &self,
        principal: &Principal,
        options: Option<&TokenOptions>,
    ) -> Result<IssuedTokens, TokenError> {
        // One snapshot for the whole call so grant resolution and encoding agree.
        let table = self.registry.snapshot();
        let grant = Self::resolve_grant(&table, options);

        let ttl = options
            .map(|o| o.ttl)
            .filter(|ttl| !ttl.is_zero())
            .unwrap_or(self.access_ttl);
        let refresh_ttl = options
            .map(|o| o.refresh_ttl)
            .filter(|ttl| !ttl.is_zero())
            .unwrap_or(self.refresh_ttl);
        let skip_refresh = options.is_some_and(|o| o.skip_refresh);

        let now = chrono::Utc::now().timestamp();
        let sub = principal.user_id.to_string();

        let claims = AccessTokenClaims {
            iss: self.signer.issuer(),
            aud: self.signer.audience(),
            sub: sub.clone(),
            email: &principal.email,
            username: &principal.username,
            user_type: &principal.user_type,
            iat: now,
            exp: expires_at(now, ttl),
            jti: Uuid::new_v4().to_string(),
            grant: table.to_short_string(grant),
        };
        let access_token = self.signer.sign(&claims)?;

        let refresh_token = if skip_refresh {
            None
        } else {
            let claims = RefreshTokenClaims {
                iss: self.signer.issuer(),
                aud: self.signer.audience(),
                sub,
                iat: now,
                exp: expires_at(now, refresh_ttl),
                jti: Uuid::new_v4().to_string(),
                grant: table.to_long_string(Grant::USERS_REFRESH),
            };
            Some(self.signer.sign(&claims)?)
        };

        debug!(
            user_id = %principal.user_id,
            grant = %claims.grant,
            ttl_seconds = ttl.as_secs(),
            refresh = refresh_token.is_some(),
            "Issued tokens"
        );

        Ok(IssuedTokens {
            access_token,
            refresh_token,
            token_type: "Bearer",
            grant,
            expires_in: ttl.as_secs(),
        })
    }
}

fn expires_at(now: i64, ttl: Duration) -> i64 {
    now.saturating_add(i64::try_from(ttl.as_secs()).unwrap_or(i64::MAX))
}
