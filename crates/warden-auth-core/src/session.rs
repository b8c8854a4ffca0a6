//! Session lifecycle: login, logout, status checks, and user fetching
//!
//! The manager owns the choice of verification path. In the network-facing
//! environment the locally held token is verified against the provider's
//! public keys; in the client-facing environment the SDK's auth state is
//! asked once. Both paths publish the same `Session` shape and share the same
//! reset semantics.

use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::instrument;
use warden_types::{LoginOptions, ProviderKind, Session, SessionStatus, SignInMethod};

use crate::config::{AuthConfig, Environment, RedirectConfig};
use crate::error::AuthError;
use crate::metrics::{self, ResetReason};
use crate::provider::{IdentityHandle, IdentityProvider, Navigator, TokenStore, UserStore};
use crate::token::{token_fingerprint, TokenVerifier};
use crate::watcher::{session_from_identity, ClientSessionWatcher};

/// Where `fetch_user` gets its answer
#[derive(Debug, Clone)]
pub enum UserSource {
    /// Verify the stored token cryptographically
    Server(TokenVerifier),
    /// Ask the SDK for its current identity
    Client(ClientSessionWatcher),
}

impl UserSource {
    pub fn environment(&self) -> Environment {
        match self {
            Self::Server(_) => Environment::Server,
            Self::Client(_) => Environment::Client,
        }
    }
}

/// Session manager
///
/// Generic over the external token and user stores; the identity provider
/// and navigator are injected as trait objects.
pub struct SessionManager<T: TokenStore, U: UserStore> {
    provider: Arc<dyn IdentityProvider>,
    navigator: Arc<dyn Navigator>,
    tokens: T,
    users: U,
    source: UserSource,
    redirect: RedirectConfig,
    /// Serializes fetch-user-once callers
    fetch_lock: Mutex<()>,
}

impl<T: TokenStore, U: UserStore> SessionManager<T, U> {
    /// Create a session manager for the environment declared in `config`
    pub fn new(
        config: &AuthConfig,
        provider: Arc<dyn IdentityProvider>,
        navigator: Arc<dyn Navigator>,
        tokens: T,
        users: U,
    ) -> Self {
        let source = match config.environment {
            Environment::Server => UserSource::Server(TokenVerifier::new(config)),
            Environment::Client => {
                UserSource::Client(ClientSessionWatcher::new(Arc::clone(&provider)))
            }
        };

        Self {
            provider,
            navigator,
            tokens,
            users,
            source,
            redirect: config.redirect.clone(),
            fetch_lock: Mutex::new(()),
        }
    }

    /// Replace the user source (e.g. to share one verifier across managers)
    pub fn with_user_source(mut self, source: UserSource) -> Self {
        self.source = source;
        self
    }

    /// Current status, read from the token store without side effects
    pub fn status(&self) -> SessionStatus {
        match self.tokens.get() {
            Some(token) if !token.is_empty() => {
                if self.tokens.status().expired() {
                    SessionStatus::Expired
                } else {
                    SessionStatus::Authenticated
                }
            }
            _ => SessionStatus::Unauthenticated,
        }
    }

    /// Sync the local token record; an expired record is reset.
    pub fn check_status(&self) -> SessionStatus {
        self.tokens.sync();

        if self.tokens.status().expired() {
            tracing::debug!("Local token expired, resetting session");
            self.reset_with(ResetReason::Expired);
            return SessionStatus::Unauthenticated;
        }

        self.status()
    }

    /// Initial load: check status, then populate the user once
    pub async fn mounted(&self) -> Result<Option<Session>, AuthError> {
        self.check_status();
        self.fetch_user_once().await
    }

    /// Fetch the user unless one is already published.
    ///
    /// Concurrent callers queue; the first one fetches and the rest see its
    /// published result.
    pub async fn fetch_user_once(&self) -> Result<Option<Session>, AuthError> {
        let _guard = self.fetch_lock.lock().await;

        if let Some(user) = self.users.user() {
            return Ok(Some(user));
        }

        self.fetch_user().await
    }

    /// Cheap presence check; does not verify anything
    pub fn is_logged_in(&self) -> bool {
        self.tokens.get().is_some_and(|token| !token.is_empty())
    }

    /// Sign in and publish the resulting session.
    ///
    /// Prior session state is reset first unless `options.reset` is false,
    /// even when the login input is then rejected. On success navigates to
    /// the home URI.
    #[instrument(skip(self, options), fields(provider = %kind), level = "debug")]
    pub async fn login(
        &self,
        kind: ProviderKind,
        options: LoginOptions,
    ) -> Result<Session, AuthError> {
        if options.reset {
            self.reset_with(ResetReason::Login);
        }

        let method = SignInMethod::resolve(kind, &options)?;

        let identity = match &method {
            SignInMethod::Password { email, password } => {
                self.provider.sign_in_with_password(email, password).await
            }
            SignInMethod::Popup(provider) => self.provider.sign_in_with_popup(*provider).await,
        }
        .map_err(|e| {
            tracing::debug!("Sign-in rejected: {}", e);
            AuthError::Authentication(e)
        })?;

        let session = self.update_user(identity.as_ref()).await?;
        tracing::info!(uid = identity.uid(), "Signed in");

        self.navigate(&self.redirect.home).await;

        Ok(session)
    }

    /// Resolve the current user through the configured path.
    ///
    /// Network-facing verification failures resolve to `Ok(None)`; the
    /// failure kind is logged. Either path resets the session when no
    /// identity results.
    #[instrument(skip(self), fields(environment = self.source.environment().as_str()), level = "debug")]
    pub async fn fetch_user(&self) -> Result<Option<Session>, AuthError> {
        match &self.source {
            UserSource::Server(verifier) => {
                let Some(token) = self.tokens.get().filter(|token| !token.is_empty()) else {
                    self.reset_with(ResetReason::NoIdentity);
                    return Ok(None);
                };

                match verifier.verify(&token).await {
                    Ok(session) => {
                        self.publish(&session);
                        Ok(Some(session))
                    }
                    Err(e) => {
                        tracing::warn!(
                            kind = e.kind(),
                            token = %token_fingerprint(&token),
                            "Stored token failed verification: {}",
                            e
                        );
                        self.reset_with(ResetReason::NoIdentity);
                        Ok(None)
                    }
                }
            }
            UserSource::Client(watcher) => match watcher.await_current_user().await {
                Ok(Some(session)) => {
                    self.publish(&session);
                    Ok(Some(session))
                }
                Ok(None) => {
                    self.reset_with(ResetReason::NoIdentity);
                    Ok(None)
                }
                Err(e) => {
                    self.reset_with(ResetReason::NoIdentity);
                    Err(e)
                }
            },
        }
    }

    /// Sign out, navigate to the logout URI, and reset.
    ///
    /// The reset always happens. A sign-out failure skips navigation and is
    /// returned after the reset.
    #[instrument(skip(self), level = "debug")]
    pub async fn logout(&self) -> Result<(), AuthError> {
        let signed_out = self.provider.sign_out().await;

        match &signed_out {
            Ok(()) => self.navigate(&self.redirect.logout).await,
            Err(e) => tracing::warn!("Sign-out failed: {}", e),
        }

        self.reset_with(ResetReason::Logout);

        signed_out.map_err(AuthError::Authentication)
    }

    /// Clear the published user and the local token. Idempotent.
    pub fn reset(&self) {
        self.reset_with(ResetReason::Requested);
    }

    fn reset_with(&self, reason: ResetReason) {
        self.users.set_user(None);
        self.tokens.reset();
        metrics::record_reset(reason);
    }

    async fn update_user(&self, identity: &dyn IdentityHandle) -> Result<Session, AuthError> {
        let session = session_from_identity(identity).await?;
        self.publish(&session);
        Ok(session)
    }

    fn publish(&self, session: &Session) {
        self.users.set_user(Some(session.clone()));
        self.tokens.set(&session.id_token);
    }

    async fn navigate(&self, uri: &str) {
        if let Err(e) = self.navigator.replace(uri).await {
            tracing::warn!("Redirect failed: {}", e);
        }
    }

    pub fn environment(&self) -> Environment {
        self.source.environment()
    }

    pub fn user_source(&self) -> &UserSource {
        &self.source
    }

    pub fn token_store(&self) -> &T {
        &self.tokens
    }

    pub fn user_store(&self) -> &U {
        &self.users
    }
}

impl<T: TokenStore, U: UserStore> std::fmt::Debug for SessionManager<T, U> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionManager")
            .field("source", &self.source)
            .field("redirect", &self.redirect)
            .finish_non_exhaustive()
    }
}
