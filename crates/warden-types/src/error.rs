//! Common error types

use thiserror::Error;

/// Errors raised while building domain values from caller input
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TypesError {
    /// Provider name is not one we can sign in with
    #[error("unknown identity provider: {0}")]
    UnknownProvider(String),

    /// Password sign-in without an email address
    #[error("missing credentials: {0}")]
    MissingCredentials(&'static str),
}
