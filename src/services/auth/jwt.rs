use base64::Engine;
use base64::engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD};
use grants::GrantClaim;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Deserializer, Serialize};
use sha2::{Digest, Sha256};
use std::{error::Error as StdError, fmt};
use tracing::{debug, error, warn};
use uuid::Uuid;

// Errors returned by signing and verification.
#[derive(Debug)]
pub enum TokenError {
    InvalidKey(String),
    Signing(jsonwebtoken::errors::Error),
    Verification(jsonwebtoken::errors::Error),
    InvalidSubject,
}

impl fmt::Display for TokenError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidKey(reason) => write!(f, "invalid key: {}", reason),
            Self::Signing(e) => write!(f, "failed to sign token: {}", e),
            Self::Verification(e) => write!(f, "token verification failed: {}", e),
            Self::InvalidSubject => write!(f, "invalid 'sub' (expected UUID)"),
        }
    }
}

impl StdError for TokenError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            Self::Signing(e) | Self::Verification(e) => Some(e),
            _ => None,
        }
    }
}

/// Key identifier for a PEM-encoded public key:
/// base64url (no padding) of the SHA-256 of its DER body.
pub fn key_id(public_key_pem: &str) -> Result<String, TokenError> {
    let body: String = public_key_pem
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !l.starts_with("-----"))
        .collect();
    if body.is_empty() {
        return Err(TokenError::InvalidKey("empty PEM body".to_string()));
    }

    let der = STANDARD
        .decode(body.as_bytes())
        .map_err(|e| TokenError::InvalidKey(format!("PEM body is not base64: {}", e)))?;

    let mut hasher = Sha256::new();
    hasher.update(&der);
    Ok(URL_SAFE_NO_PAD.encode(hasher.finalize()))
}

/// Signs token claims with the service's Ed25519 private key.
#[derive(Clone)]
pub struct JwtSigner {
    issuer: String,
    audience: String,
    key_id: String,
    encoding_key: EncodingKey,
}

impl std::fmt::Debug for JwtSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Do not print key material
        f.debug_struct("JwtSigner")
            .field("issuer", &self.issuer)
            .field("audience", &self.audience)
            .field("key_id", &self.key_id)
            .finish()
    }
}

impl JwtSigner {
    /// `private_key_pem` must be an Ed25519 private key in PKCS#8 PEM format;
    /// `public_key_pem` is its SPKI counterpart, used only for the `kid`.
    pub fn new(
        private_key_pem: &str,
        public_key_pem: &str,
        issuer: String,
        audience: String,
    ) -> Result<Self, TokenError> {
        let encoding_key = EncodingKey::from_ed_pem(private_key_pem.as_bytes()).map_err(|e| {
            warn!(error = %e, "failed to parse JWT private key PEM (expected Ed25519 PKCS#8 PEM)");
            TokenError::InvalidKey(e.to_string())
        })?;
        let key_id = key_id(public_key_pem)?;

        Ok(Self {
            issuer,
            audience,
            key_id,
            encoding_key,
        })
    }

    pub fn issuer(&self) -> &str {
        &self.issuer
    }

    pub fn audience(&self) -> &str {
        &self.audience
    }

    pub fn key_id(&self) -> &str {
        &self.key_id
    }

    pub fn sign<T: Serialize>(&self, claims: &T) -> Result<String, TokenError> {
        let mut header = Header::new(Algorithm::EdDSA);
        header.typ = Some("JWT".to_string());
        header.kid = Some(self.key_id.clone());
        jsonwebtoken::encode(&header, claims, &self.encoding_key).map_err(|e| {
            error!(error = %e, "failed to sign JWT");
            TokenError::Signing(e)
        })
    }
}

#[derive(Debug, Deserialize)]
struct TokenClaims {
    sub: String,
    exp: i64,
    #[serde(default)]
    iat: Option<i64>,
    #[serde(default)]
    jti: Option<String>,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    username: Option<String>,
    #[serde(default)]
    user_type: Option<String>,
    #[serde(default, deserialize_with = "string_claim")]
    grant: Option<String>,
}

// Non-string values are treated as absent rather than failing the decode.
fn string_claim<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::String(s) => Some(s),
        _ => None,
    })
}

/// Verified token payload handed to the authorization check.
///
/// Signature, `exp`, `iss` and `aud` have already been checked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedToken {
    pub user_id: Uuid,
    pub grant: Option<String>,
    pub jti: Option<String>,
    pub issued_at: Option<i64>,
    pub expires_at: i64,
    pub email: Option<String>,
    pub username: Option<String>,
    pub user_type: Option<String>,
}

impl GrantClaim for VerifiedToken {
    fn grant_claim(&self) -> Option<&str> {
        self.grant.as_deref()
    }
}

/// EdDSA token verifier.
///
/// Holds one or more public keys addressed by `kid`, so tokens signed before
/// a key rotation keep verifying while the old key is still configured.
#[derive(Clone)]
pub struct JwtVerifier {
    keys: Vec<(String, DecodingKey)>,
    validation: Validation,
}

impl std::fmt::Debug for JwtVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtVerifier")
            .field("key_ids", &self.keys.iter().map(|(kid, _)| kid).collect::<Vec<_>>())
            .field("validation", &self.validation)
            .finish()
    }
}

impl JwtVerifier {
    pub fn new(
        public_key_pems: &[&str],
        issuer: &str,
        audience: &str,
        leeway_seconds: u64,
    ) -> Result<Self, TokenError> {
        let keys = public_key_pems
            .iter()
            .map(|pem| {
                let decoding_key = DecodingKey::from_ed_pem(pem.as_bytes())
                    .map_err(|e| TokenError::InvalidKey(e.to_string()))?;
                Ok((key_id(pem)?, decoding_key))
            })
            .collect::<Result<Vec<_>, TokenError>>()?;
        if keys.is_empty() {
            return Err(TokenError::InvalidKey("no public key configured".to_string()));
        }

        let mut validation = Validation::new(Algorithm::EdDSA);
        validation.set_issuer(&[issuer]);
        validation.set_audience(&[audience]);
        validation.leeway = leeway_seconds;

        Ok(Self { keys, validation })
    }

    pub fn verify(&self, token: &str) -> Result<VerifiedToken, TokenError> {
        let header = jsonwebtoken::decode_header(token).map_err(TokenError::Verification)?;
        let key = self.select_key(header.kid.as_deref()).ok_or_else(|| {
            debug!(kid = ?header.kid, "no verification key for token");
            TokenError::Verification(jsonwebtoken::errors::ErrorKind::InvalidKeyFormat.into())
        })?;

        let data = jsonwebtoken::decode::<TokenClaims>(token, key, &self.validation)
            .map_err(TokenError::Verification)?;
        let claims = data.claims;

        let user_id = Uuid::parse_str(&claims.sub).map_err(|_| TokenError::InvalidSubject)?;

        Ok(VerifiedToken {
            user_id,
            grant: claims.grant,
            jti: claims.jti,
            issued_at: claims.iat,
            expires_at: claims.exp,
            email: claims.email,
            username: claims.username,
            user_type: claims.user_type,
        })
    }

    fn select_key(&self, kid: Option<&str>) -> Option<&DecodingKey> {
        match kid {
            Some(kid) => self.keys.iter().find(|(id, _)| id == kid).map(|(_, k)| k),
            None if self.keys.len() == 1 => self.keys.first().map(|(_, k)| k),
            None => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const PRIVATE_PEM: &str = include_str!("../../../tests/fixtures/ed25519_private.pem");
    const PUBLIC_PEM: &str = include_str!("../../../tests/fixtures/ed25519_public.pem");
    const OTHER_PUBLIC_PEM: &str = include_str!("../../../tests/fixtures/ed25519_other_public.pem");

    fn signer() -> JwtSigner {
        JwtSigner::new(PRIVATE_PEM, PUBLIC_PEM, "simpleauth".into(), "api".into()).unwrap()
    }

    fn exp_in(seconds: i64) -> i64 {
        chrono::Utc::now().timestamp() + seconds
    }

    #[test]
    fn key_id_is_stable_and_distinct() {
        let a = key_id(PUBLIC_PEM).unwrap();
        assert_eq!(a, key_id(PUBLIC_PEM).unwrap());
        assert_ne!(a, key_id(OTHER_PUBLIC_PEM).unwrap());
        // 32 bytes, base64url without padding
        assert_eq!(a.len(), 43);
        assert!(key_id("-----BEGIN PUBLIC KEY-----\n-----END PUBLIC KEY-----").is_err());
        assert!(key_id("not base64 !!").is_err());
    }

    #[test]
    fn signed_token_carries_kid_and_verifies() {
        let signer = signer();
        let sub = Uuid::new_v4();
        let token = signer
            .sign(&json!({
                "iss": "simpleauth",
                "aud": "api",
                "sub": sub.to_string(),
                "exp": exp_in(60),
                "grant": "authenticated",
            }))
            .unwrap();

        let header = jsonwebtoken::decode_header(&token).unwrap();
        assert_eq!(header.kid.as_deref(), Some(signer.key_id()));
        assert_eq!(header.alg, Algorithm::EdDSA);

        let verifier = JwtVerifier::new(&[OTHER_PUBLIC_PEM, PUBLIC_PEM], "simpleauth", "api", 0).unwrap();
        let verified = verifier.verify(&token).unwrap();
        assert_eq!(verified.user_id, sub);
        assert_eq!(verified.grant_claim(), Some("authenticated"));
    }

    #[test]
    fn non_string_grant_claim_is_absent() {
        let token = signer()
            .sign(&json!({
                "iss": "simpleauth",
                "aud": "api",
                "sub": Uuid::new_v4().to_string(),
                "exp": exp_in(60),
                "grant": 270,
            }))
            .unwrap();
        let verifier = JwtVerifier::new(&[PUBLIC_PEM], "simpleauth", "api", 0).unwrap();
        assert_eq!(verifier.verify(&token).unwrap().grant, None);
    }

    #[test]
    fn rejects_wrong_key_audience_expiry_and_subject() {
        let signer = signer();
        let claims = |aud: &str, exp: i64, sub: String| {
            json!({ "iss": "simpleauth", "aud": aud, "sub": sub, "exp": exp })
        };

        let token = signer.sign(&claims("api", exp_in(60), Uuid::new_v4().to_string())).unwrap();
        let other = JwtVerifier::new(&[OTHER_PUBLIC_PEM], "simpleauth", "api", 0).unwrap();
        assert!(matches!(other.verify(&token), Err(TokenError::Verification(_))));

        let verifier = JwtVerifier::new(&[PUBLIC_PEM], "simpleauth", "api", 0).unwrap();

        let wrong_aud = signer.sign(&claims("other", exp_in(60), Uuid::new_v4().to_string())).unwrap();
        assert!(matches!(verifier.verify(&wrong_aud), Err(TokenError::Verification(_))));

        let expired = signer.sign(&claims("api", exp_in(-600), Uuid::new_v4().to_string())).unwrap();
        assert!(matches!(verifier.verify(&expired), Err(TokenError::Verification(_))));

        let bad_sub = signer.sign(&claims("api", exp_in(60), "alice".to_string())).unwrap();
        assert!(matches!(verifier.verify(&bad_sub), Err(TokenError::InvalidSubject)));

        assert!(matches!(verifier.verify("garbage"), Err(TokenError::Verification(_))));
    }

    #[test]
    fn rejects_invalid_keys() {
        assert!(matches!(
            JwtSigner::new("nope", PUBLIC_PEM, "i".into(), "a".into()),
            Err(TokenError::InvalidKey(_))
        ));
        assert!(matches!(
            JwtVerifier::new(&[], "i", "a", 0),
            Err(TokenError::InvalidKey(_))
        ));
    }
}
