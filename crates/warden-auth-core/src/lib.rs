//! Warden Auth Core - Session reconciliation and token verification
//!
//! Keeps a locally cached token in line with an external identity provider.
//! Network-facing callers verify tokens against the provider's rotating
//! public keys; client-facing callers read the SDK's live auth state. Both
//! converge on the same `Session`.

pub mod config;
pub mod error;
pub mod keys;
pub mod metrics;
pub mod provider;
pub mod session;
pub mod token;
pub mod watcher;

pub use config::*;
pub use error::*;
pub use keys::{KeyCacheConfig, SigningKey, SigningKeyCache};
pub use provider::*;
pub use session::{SessionManager, UserSource};
pub use token::{decode_token_header, token_fingerprint, TokenHeader, TokenVerifier};
pub use watcher::{session_from_identity, ClientSessionWatcher};
