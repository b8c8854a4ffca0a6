//! Session and token status

use serde::{Deserialize, Serialize};

/// Where the local session stands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    /// No local token
    Unauthenticated,
    /// A local token is present and not known to be expired
    Authenticated,
    /// A local token is present but the token store reports it expired
    Expired,
}

impl SessionStatus {
    /// Get the status as a string for logs and metrics labels
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unauthenticated => "unauthenticated",
            Self::Authenticated => "authenticated",
            Self::Expired => "expired",
        }
    }
}

impl std::fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Expiry status of the locally stored token, as computed by the token store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenStatus {
    /// Token present and within its lifetime
    Valid,
    /// Token present but past its lifetime
    Expired,
    /// No token, or the store cannot tell
    Unknown,
}

impl TokenStatus {
    /// Whether the stored token has expired
    pub fn expired(&self) -> bool {
        matches!(self, Self::Expired)
    }

    /// Whether the stored token is usable
    pub fn valid(&self) -> bool {
        matches!(self, Self::Valid)
    }
}
