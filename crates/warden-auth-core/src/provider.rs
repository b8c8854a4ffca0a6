//! Interfaces to the collaborators the session manager drives
//!
//! The identity provider SDK, the token and user stores, and page navigation
//! all live outside this crate. Implementations are injected already
//! constructed; this crate never initializes them.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::mpsc;
use warden_types::{IdTokenResult, ProviderKind, Session, TokenStatus};

use crate::error::{NavigationError, ProviderError};

/// A signed-in identity held by the provider SDK
#[async_trait]
pub trait IdentityHandle: Send + Sync {
    /// Provider user id
    fn uid(&self) -> &str;

    /// Request a fresh token assertion (`id token`) for this identity
    async fn id_token_result(&self) -> Result<IdTokenResult, ProviderError>;
}

/// One auth-state notification: the current identity, or none
pub type AuthStateChange = Option<Arc<dyn IdentityHandle>>;

/// Identity provider SDK handle
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Email and password sign-in
    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Arc<dyn IdentityHandle>, ProviderError>;

    /// Sign-in through the provider's popup flow
    async fn sign_in_with_popup(
        &self,
        provider: ProviderKind,
    ) -> Result<Arc<dyn IdentityHandle>, ProviderError>;

    async fn sign_out(&self) -> Result<(), ProviderError>;

    /// Subscribe to auth-state changes.
    ///
    /// The provider delivers the current state as soon as it is known, then
    /// every change. Dropping or closing the receiver unsubscribes.
    fn subscribe_auth_state(&self) -> mpsc::UnboundedReceiver<AuthStateChange>;
}

/// Local token record (cookie or local storage), owned by the surrounding framework
pub trait TokenStore: Send + Sync {
    fn get(&self) -> Option<String>;

    fn set(&self, token: &str);

    fn reset(&self);

    /// Re-read the token from its backing storage
    fn sync(&self);

    /// Expiry status as computed by the store
    fn status(&self) -> TokenStatus;
}

/// Published user state, owned by the surrounding framework
pub trait UserStore: Send + Sync {
    /// Publish a session, or `None` for "no user"
    fn set_user(&self, user: Option<Session>);

    /// Currently published session
    fn user(&self) -> Option<Session>;
}

/// Page navigation
#[async_trait]
pub trait Navigator: Send + Sync {
    /// Replace the current location with `uri`
    async fn replace(&self, uri: &str) -> Result<(), NavigationError>;
}

impl<T: TokenStore + ?Sized> TokenStore for Arc<T> {
    fn get(&self) -> Option<String> {
        (**self).get()
    }

    fn set(&self, token: &str) {
        (**self).set(token)
    }

    fn reset(&self) {
        (**self).reset()
    }

    fn sync(&self) {
        (**self).sync()
    }

    fn status(&self) -> TokenStatus {
        (**self).status()
    }
}

impl<T: UserStore + ?Sized> UserStore for Arc<T> {
    fn set_user(&self, user: Option<Session>) {
        (**self).set_user(user)
    }

    fn user(&self) -> Option<Session> {
        (**self).user()
    }
}
