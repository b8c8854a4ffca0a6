//! One-shot resolution of the current identity from SDK auth-state events

use std::sync::Arc;

use tracing::instrument;
use warden_types::Session;

use crate::error::AuthError;
use crate::provider::{IdentityHandle, IdentityProvider};

/// Resolves the identity the provider SDK currently holds.
///
/// Each call subscribes, takes the first notification, and unsubscribes.
#[derive(Clone)]
pub struct ClientSessionWatcher {
    provider: Arc<dyn IdentityProvider>,
}

impl ClientSessionWatcher {
    pub fn new(provider: Arc<dyn IdentityProvider>) -> Self {
        Self { provider }
    }

    /// Wait for the first auth-state notification and normalize it.
    ///
    /// `Ok(None)` means no identity is signed in. A subscription that closes
    /// without delivering anything is `SubscriptionResolution`.
    #[instrument(skip(self), level = "debug")]
    pub async fn await_current_user(&self) -> Result<Option<Session>, AuthError> {
        let mut events = self.provider.subscribe_auth_state();
        let first = events.recv().await;

        // Not a standing subscription
        events.close();
        drop(events);

        match first {
            None => {
                tracing::warn!("Auth state subscription closed without a notification");
                Err(AuthError::SubscriptionResolution)
            }
            Some(None) => {
                tracing::debug!("No signed-in identity");
                Ok(None)
            }
            Some(Some(identity)) => session_from_identity(identity.as_ref()).await.map(Some),
        }
    }
}

impl std::fmt::Debug for ClientSessionWatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientSessionWatcher").finish_non_exhaustive()
    }
}

/// Turn an SDK identity into a session by requesting a fresh token assertion
pub async fn session_from_identity(identity: &dyn IdentityHandle) -> Result<Session, AuthError> {
    let result = identity.id_token_result().await.map_err(|e| {
        tracing::warn!(uid = identity.uid(), "Failed to get id token: {}", e);
        AuthError::Authentication(e)
    })?;

    Ok(result.into_session())
}
