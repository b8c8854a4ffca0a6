//! Signed token verification against the provider's rotating public keys

use std::time::Duration;

use chrono::Utc;
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, decode_header, Algorithm, DecodingKey, Validation};
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;
use tracing::instrument;
use warden_types::{Claims, Session};

use crate::config::AuthConfig;
use crate::error::VerificationError;
use crate::keys::{KeyCacheConfig, SigningKeyCache};
use crate::metrics;

/// The only signature algorithm tokens may carry
pub const TOKEN_ALGORITHM: Algorithm = Algorithm::RS256;

/// Header fields needed to pick a verification key
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenHeader {
    pub kid: String,
    pub alg: Algorithm,
}

/// Decode a token header and check it names a usable key.
///
/// Never touches the network. Fails with `MalformedToken` on anything that is
/// not a compact JWS with an RS256 header and a key-id.
pub fn decode_token_header(token: &str) -> Result<TokenHeader, VerificationError> {
    let header = decode_header(token).map_err(|e| {
        tracing::debug!("Failed to decode token header: {}", e);
        VerificationError::MalformedToken(format!("undecodable header: {e}"))
    })?;

    if header.alg != TOKEN_ALGORITHM {
        tracing::debug!("Token uses unsupported algorithm {:?}", header.alg);
        return Err(VerificationError::MalformedToken(format!(
            "unsupported algorithm {:?}",
            header.alg
        )));
    }

    let kid = header
        .kid
        .filter(|kid| !kid.is_empty())
        .ok_or_else(|| {
            tracing::debug!("Token missing kid");
            VerificationError::MalformedToken("missing kid".to_string())
        })?;

    Ok(TokenHeader {
        kid,
        alg: header.alg,
    })
}

/// Short, non-reversible token identifier for logs
pub fn token_fingerprint(token: &str) -> String {
    let digest = Sha256::digest(token.as_bytes());
    hex::encode(&digest[..6])
}

/// Verifies provider-issued tokens without consulting the provider SDK.
///
/// Checks, in order: header, signing key, expiry and maximum age, signature,
/// issuer. Expiry is read before the signature is checked, so an expired
/// token is reported as expired whatever its signature.
#[derive(Clone)]
pub struct TokenVerifier {
    keys: SigningKeyCache,
    expected_issuer: String,
    max_age: Duration,
    leeway: Duration,
}

impl TokenVerifier {
    /// Create a verifier with its own signing key cache
    pub fn new(config: &AuthConfig) -> Self {
        Self::with_key_cache(config, SigningKeyCache::new(KeyCacheConfig::from(config)))
    }

    /// Create a verifier sharing an existing signing key cache
    pub fn with_key_cache(config: &AuthConfig, keys: SigningKeyCache) -> Self {
        Self {
            keys,
            expected_issuer: config.expected_issuer(),
            max_age: config.token_max_age,
            leeway: config.leeway,
        }
    }

    /// Verify a token and return its normalized session
    #[instrument(skip_all, fields(token = %token_fingerprint(token)), level = "debug")]
    pub async fn verify(&self, token: &str) -> Result<Session, VerificationError> {
        let result = self.verify_inner(token).await;

        match &result {
            Ok(_) => metrics::record_verification("ok"),
            Err(e) => {
                tracing::debug!(kind = e.kind(), "Token rejected: {}", e);
                metrics::record_verification(e.kind());
            }
        }

        result
    }

    async fn verify_inner(&self, token: &str) -> Result<Session, VerificationError> {
        let header = decode_token_header(token)?;

        let signing_key = self
            .keys
            .get_key(&header.kid)
            .await
            .map_err(VerificationError::KeyUnavailable)?;

        let unverified = peek_claims(token)?;
        self.check_lifetime(&unverified)?;

        let claims = verify_signature(token, signing_key.decoding_key())?;
        self.check_issuer(&claims)?;

        Ok(Session::new(token, claims))
    }

    /// Claims are unverified here, so timestamps may be anything an `i64` holds
    fn check_lifetime(&self, claims: &Claims) -> Result<(), VerificationError> {
        let now = Utc::now().timestamp();
        let leeway = duration_secs(self.leeway);

        let exp = claims
            .exp()
            .ok_or_else(|| VerificationError::MalformedToken("missing exp".to_string()))?;
        if now > exp.saturating_add(leeway) {
            return Err(VerificationError::TokenExpired);
        }

        if let Some(iat) = claims.iat() {
            // Only an issue time before the representable past fails to subtract
            let age = now
                .checked_sub(iat)
                .ok_or(VerificationError::TokenExpired)?;
            if age > duration_secs(self.max_age).saturating_add(leeway) {
                tracing::debug!("Token issued {}s ago exceeds maximum age", age);
                return Err(VerificationError::TokenExpired);
            }
        }

        Ok(())
    }

    fn check_issuer(&self, claims: &Claims) -> Result<(), VerificationError> {
        let actual = claims.iss();
        let matches = actual.is_some_and(|iss| {
            iss.as_bytes()
                .ct_eq(self.expected_issuer.as_bytes())
                .into()
        });

        if matches {
            Ok(())
        } else {
            Err(VerificationError::IssuerMismatch {
                expected: self.expected_issuer.clone(),
                actual: actual.map(str::to_string),
            })
        }
    }

    /// Signing key cache backing this verifier
    pub fn key_cache(&self) -> &SigningKeyCache {
        &self.keys
    }

    pub fn expected_issuer(&self) -> &str {
        &self.expected_issuer
    }
}

impl std::fmt::Debug for TokenVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenVerifier")
            .field("expected_issuer", &self.expected_issuer)
            .field("max_age", &self.max_age)
            .field("leeway", &self.leeway)
            .finish_non_exhaustive()
    }
}

fn duration_secs(duration: Duration) -> i64 {
    i64::try_from(duration.as_secs()).unwrap_or(i64::MAX)
}

/// Decode the payload without trusting it; only used for lifetime checks
fn peek_claims(token: &str) -> Result<Claims, VerificationError> {
    let mut validation = Validation::new(TOKEN_ALGORITHM);
    validation.insecure_disable_signature_validation();
    validation.validate_exp = false;
    validation.validate_aud = false;
    validation.required_spec_claims.clear();

    decode::<Claims>(token, &DecodingKey::from_secret(&[]), &validation)
        .map(|data| data.claims)
        .map_err(|e| {
            tracing::debug!("Failed to decode token payload: {}", e);
            VerificationError::MalformedToken(format!("undecodable payload: {e}"))
        })
}

fn verify_signature(token: &str, key: &DecodingKey) -> Result<Claims, VerificationError> {
    // Lifetime and issuer are checked separately so each gets its own error
    let mut validation = Validation::new(TOKEN_ALGORITHM);
    validation.validate_exp = false;
    validation.validate_aud = false;
    validation.required_spec_claims.clear();

    decode::<Claims>(token, key, &validation)
        .map(|data| data.claims)
        .map_err(|e| match e.kind() {
            ErrorKind::InvalidSignature | ErrorKind::InvalidRsaKey(_) | ErrorKind::Crypto(_) => {
                VerificationError::InvalidSignature
            }
            _ => VerificationError::MalformedToken(e.to_string()),
        })
}
