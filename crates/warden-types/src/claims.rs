//! Claims and the normalized session record

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Reserved session field carrying the raw token string
pub const ID_TOKEN_FIELD: &str = "id_token";

/// Claim set extracted from a token (provider-defined key/value pairs)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Claims(Map<String, Value>);

impl Claims {
    /// Create an empty claim set
    pub fn new() -> Self {
        Self::default()
    }

    /// Get a claim by name
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }

    /// Set a claim, returning the previous value
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.0.insert(name.into(), value.into())
    }

    /// Remove a claim
    pub fn remove(&mut self, name: &str) -> Option<Value> {
        self.0.remove(name)
    }

    /// Whether a claim is present
    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    /// Claim names in order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Subject (provider user id)
    pub fn sub(&self) -> Option<&str> {
        self.get_str("sub")
    }

    /// Email address, if the provider asserts one
    pub fn email(&self) -> Option<&str> {
        self.get_str("email")
    }

    /// Issuer
    pub fn iss(&self) -> Option<&str> {
        self.get_str("iss")
    }

    /// Expiration timestamp (seconds since epoch)
    pub fn exp(&self) -> Option<i64> {
        self.get_i64("exp")
    }

    /// Issued-at timestamp (seconds since epoch)
    pub fn iat(&self) -> Option<i64> {
        self.get_i64("iat")
    }

    /// Expiration as a UTC datetime
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.exp().and_then(|exp| Utc.timestamp_opt(exp, 0).single())
    }

    /// Read a string claim
    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.0.get(name).and_then(Value::as_str)
    }

    /// Read an integer claim; providers sometimes emit float timestamps
    pub fn get_i64(&self, name: &str) -> Option<i64> {
        self.0
            .get(name)
            .and_then(|v| v.as_i64().or_else(|| v.as_f64().map(|f| f as i64)))
    }

    /// Unwrap into the underlying JSON object
    pub fn into_inner(self) -> Map<String, Value> {
        self.0
    }
}

impl From<Map<String, Value>> for Claims {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

impl FromIterator<(String, Value)> for Claims {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Normalized session: the identity's claims plus the raw token they came from.
///
/// Serializes to one flat JSON object, with the token under [`ID_TOKEN_FIELD`].
/// Both verification paths produce this shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    #[serde(flatten)]
    pub claims: Claims,
    pub id_token: String,
}

impl Session {
    /// Build a session from a token and its claims.
    ///
    /// A provider claim named `id_token` is dropped; the raw token always wins.
    pub fn new(id_token: impl Into<String>, mut claims: Claims) -> Self {
        claims.remove(ID_TOKEN_FIELD);
        Self {
            claims,
            id_token: id_token.into(),
        }
    }

    /// Subject of the session's identity
    pub fn uid(&self) -> Option<&str> {
        self.claims.sub()
    }

    pub fn email(&self) -> Option<&str> {
        self.claims.email()
    }

    /// Check if the underlying token has expired
    pub fn is_expired(&self) -> bool {
        self.claims
            .exp()
            .is_some_and(|exp| Utc::now().timestamp() > exp)
    }
}

/// Token assertion returned by an identity handle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IdTokenResult {
    /// Raw signed token
    pub token: String,
    /// Claim payload of the token as reported by the provider
    pub claims: Claims,
}

impl IdTokenResult {
    pub fn new(token: impl Into<String>, claims: Claims) -> Self {
        Self {
            token: token.into(),
            claims,
        }
    }

    /// Normalize into a session
    pub fn into_session(self) -> Session {
        Session::new(self.token, self.claims)
    }
}
