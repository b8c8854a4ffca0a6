//! Identity provider kinds and login input

use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::TypesError;

/// Sign-in method offered by the identity provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    /// Email and password
    Password,
    Google,
    GitHub,
    Microsoft,
    Apple,
    Facebook,
    Twitter,
}

impl ProviderKind {
    /// All supported kinds
    pub const ALL: [ProviderKind; 7] = [
        Self::Password,
        Self::Google,
        Self::GitHub,
        Self::Microsoft,
        Self::Apple,
        Self::Facebook,
        Self::Twitter,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Password => "password",
            Self::Google => "google",
            Self::GitHub => "github",
            Self::Microsoft => "microsoft",
            Self::Apple => "apple",
            Self::Facebook => "facebook",
            Self::Twitter => "twitter",
        }
    }

    /// Whether sign-in goes through a provider popup
    pub fn is_popup(&self) -> bool {
        !matches!(self, Self::Password)
    }
}

impl std::fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderKind {
    type Err = TypesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == normalized)
            .ok_or_else(|| TypesError::UnknownProvider(s.to_string()))
    }
}

/// Options accepted by a login call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoginOptions {
    pub email: String,
    pub password: String,
    /// Reset prior session state before signing in
    pub reset: bool,
}

impl Default for LoginOptions {
    fn default() -> Self {
        Self {
            email: String::new(),
            password: String::new(),
            reset: true,
        }
    }
}

impl LoginOptions {
    /// Options for password sign-in
    pub fn password(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
            ..Self::default()
        }
    }

    /// Keep prior session state instead of resetting it first
    pub fn without_reset(mut self) -> Self {
        self.reset = false;
        self
    }
}

/// Resolved sign-in call for the identity provider
#[derive(Clone, PartialEq, Eq)]
pub enum SignInMethod {
    Password { email: String, password: String },
    Popup(ProviderKind),
}

impl SignInMethod {
    /// Pick the sign-in call for a provider kind
    pub fn resolve(kind: ProviderKind, options: &LoginOptions) -> Result<Self, TypesError> {
        match kind {
            ProviderKind::Password => {
                if options.email.trim().is_empty() {
                    return Err(TypesError::MissingCredentials("email"));
                }
                Ok(Self::Password {
                    email: options.email.clone(),
                    password: options.password.clone(),
                })
            }
            popup => Ok(Self::Popup(popup)),
        }
    }

    pub fn kind(&self) -> ProviderKind {
        match self {
            Self::Password { .. } => ProviderKind::Password,
            Self::Popup(kind) => *kind,
        }
    }
}

impl std::fmt::Debug for SignInMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Password { email, .. } => f
                .debug_struct("Password")
                .field("email", email)
                .finish_non_exhaustive(),
            Self::Popup(kind) => f.debug_tuple("Popup").field(kind).finish(),
        }
    }
}
