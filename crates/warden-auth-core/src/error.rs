//! Auth errors

use thiserror::Error;
use warden_types::TypesError;

/// Failure to obtain a signing key from the key-distribution endpoint.
///
/// `Clone` so every caller waiting on one shared fetch gets the same error.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum KeyFetchError {
    /// The request never produced a response
    #[error("network error: {0}")]
    Network(String),

    /// The endpoint answered with a non-success status
    #[error("HTTP error: status {0}")]
    HttpStatus(u16),

    /// The body was not a key-id to public key mapping
    #[error("failed to parse public keys: {0}")]
    Parse(String),

    /// The response did not contain the requested key-id
    #[error("key not found: {0}")]
    KeyNotFound(String),

    /// The key material could not be turned into a verification key
    #[error("invalid key {kid}: {reason}")]
    InvalidKey { kid: String, reason: String },
}

/// Token verification failures
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VerificationError {
    /// Token could not be decoded, or its header is unusable
    #[error("malformed token: {0}")]
    MalformedToken(String),

    /// No signing key could be resolved for the token's key-id
    #[error("signing key unavailable: {0}")]
    KeyUnavailable(#[source] KeyFetchError),

    /// Signature does not verify against the resolved key
    #[error("invalid signature")]
    InvalidSignature,

    /// Issuer claim is not the configured issuer
    #[error("issuer mismatch: expected {expected}, got {actual:?}")]
    IssuerMismatch {
        expected: String,
        actual: Option<String>,
    },

    /// Token is past its expiry (or older than the maximum token age)
    #[error("token expired")]
    TokenExpired,
}

impl VerificationError {
    /// Stable failure kind for logs and metrics labels
    pub fn kind(&self) -> &'static str {
        match self {
            Self::MalformedToken(_) => "malformed_token",
            Self::KeyUnavailable(_) => "key_unavailable",
            Self::InvalidSignature => "invalid_signature",
            Self::IssuerMismatch { .. } => "issuer_mismatch",
            Self::TokenExpired => "token_expired",
        }
    }
}

/// Failure reported by the identity provider SDK
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{code}: {message}")]
pub struct ProviderError {
    /// Provider error code (e.g. `auth/wrong-password`)
    pub code: String,
    pub message: String,
}

impl ProviderError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }
}

/// Navigation could not be performed
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("navigation to {uri} failed: {reason}")]
pub struct NavigationError {
    pub uri: String,
    pub reason: String,
}

/// Session lifecycle errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// The identity provider rejected sign-in, sign-out, or a token request
    #[error("authentication failed: {0}")]
    Authentication(#[from] ProviderError),

    /// The auth-state subscription closed without a single notification
    #[error("auth state subscription closed before resolving")]
    SubscriptionResolution,

    /// A token failed verification
    #[error(transparent)]
    Verification(#[from] VerificationError),

    /// Login input could not be turned into a sign-in call
    #[error("invalid login: {0}")]
    InvalidLogin(#[from] TypesError),

    /// Configuration error
    #[error("configuration error: {0}")]
    Configuration(String),
}

impl AuthError {
    /// Get error code for API responses
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Authentication(_) => "AUTHENTICATION_ERROR",
            Self::SubscriptionResolution => "SUBSCRIPTION_RESOLUTION_FAILURE",
            Self::Verification(e) => match e {
                VerificationError::MalformedToken(_) => "MALFORMED_TOKEN",
                VerificationError::KeyUnavailable(_) => "KEY_UNAVAILABLE",
                VerificationError::InvalidSignature => "INVALID_SIGNATURE",
                VerificationError::IssuerMismatch { .. } => "ISSUER_MISMATCH",
                VerificationError::TokenExpired => "TOKEN_EXPIRED",
            },
            Self::InvalidLogin(_) => "INVALID_LOGIN",
            Self::Configuration(_) => "CONFIGURATION_ERROR",
        }
    }
}

impl From<crate::config::ConfigError> for AuthError {
    fn from(err: crate::config::ConfigError) -> Self {
        tracing::error!("Configuration error: {}", err);
        Self::Configuration(err.to_string())
    }
}
