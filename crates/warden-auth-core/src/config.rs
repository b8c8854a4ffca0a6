//! Configuration types for the session manager and token verifier

use std::str::FromStr;
use std::time::Duration;

/// Default key-distribution endpoint (JWK set of the secure token service)
pub const DEFAULT_PUBLIC_KEYS_URL: &str =
    "https://www.googleapis.com/service_accounts/v1/jwk/securetoken@system.gserviceaccount.com";

/// Default issuer prefix; the project id is appended
pub const DEFAULT_ISSUER_PREFIX: &str = "https://securetoken.google.com/";

/// Identity provider project configuration
#[derive(Clone, Default, PartialEq, Eq)]
pub struct ProjectConfig {
    pub api_key: String,
    pub auth_domain: String,
    pub project_id: String,
}

impl ProjectConfig {
    pub fn new(
        api_key: impl Into<String>,
        auth_domain: impl Into<String>,
        project_id: impl Into<String>,
    ) -> Self {
        Self {
            api_key: api_key.into(),
            auth_domain: auth_domain.into(),
            project_id: project_id.into(),
        }
    }
}

impl std::fmt::Debug for ProjectConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProjectConfig")
            .field("auth_domain", &self.auth_domain)
            .field("project_id", &self.project_id)
            .finish_non_exhaustive()
    }
}

/// Navigation targets after login and logout
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedirectConfig {
    pub home: String,
    pub logout: String,
}

impl Default for RedirectConfig {
    fn default() -> Self {
        Self {
            home: "/".to_string(),
            logout: "/login".to_string(),
        }
    }
}

/// Execution environment the caller declares
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Environment {
    /// Network-facing: no live SDK state, tokens are verified cryptographically
    #[default]
    Server,
    /// Client-facing: live SDK state via auth-state notifications
    Client,
}

impl Environment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Server => "server",
            Self::Client => "client",
        }
    }
}

impl FromStr for Environment {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "server" => Ok(Self::Server),
            "client" => Ok(Self::Client),
            _ => Err(ConfigError::Invalid("WARDEN_ENVIRONMENT")),
        }
    }
}

/// Auth configuration
#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// Identity provider project
    pub project: ProjectConfig,
    /// Key-distribution endpoint
    pub public_keys_url: String,
    /// Issuer prefix; expected issuer is this plus the project id
    pub issuer_prefix: String,
    /// Maximum age of a token since issue
    pub token_max_age: Duration,
    /// How long a fetched signing key stays usable
    pub key_cache_ttl: Duration,
    /// Maximum number of cached signing keys
    pub key_cache_capacity: u64,
    /// Clock skew tolerated on expiry checks
    pub leeway: Duration,
    /// Key fetch HTTP timeout
    pub request_timeout: Duration,
    pub redirect: RedirectConfig,
    pub environment: Environment,
}

impl AuthConfig {
    /// Create a new auth config with defaults for everything but the project
    pub fn new(project: ProjectConfig) -> Self {
        Self {
            project,
            public_keys_url: DEFAULT_PUBLIC_KEYS_URL.to_string(),
            issuer_prefix: DEFAULT_ISSUER_PREFIX.to_string(),
            token_max_age: Duration::from_secs(30 * 60),
            key_cache_ttl: Duration::from_secs(10 * 60),
            key_cache_capacity: 5,
            leeway: Duration::ZERO,
            request_timeout: Duration::from_secs(10),
            redirect: RedirectConfig::default(),
            environment: Environment::default(),
        }
    }

    /// Create a config, rejecting an empty project id
    pub fn try_new(project: ProjectConfig) -> Result<Self, ConfigError> {
        if project.project_id.trim().is_empty() {
            return Err(ConfigError::Missing("WARDEN_PROJECT_ID"));
        }
        Ok(Self::new(project))
    }

    /// Load configuration from environment variables (and a `.env` file if present)
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let project = ProjectConfig::new(
            required("WARDEN_API_KEY")?,
            required("WARDEN_AUTH_DOMAIN")?,
            required("WARDEN_PROJECT_ID")?,
        );

        let mut config = Self::try_new(project)?;

        if let Ok(url) = std::env::var("WARDEN_PUBLIC_KEYS_URL") {
            config.public_keys_url = url;
        }
        if let Ok(prefix) = std::env::var("WARDEN_ISSUER_PREFIX") {
            config.issuer_prefix = prefix;
        }

        config.token_max_age = Duration::from_secs(parsed(
            "WARDEN_TOKEN_MAX_AGE_SECS",
            config.token_max_age.as_secs(),
        )?);
        config.key_cache_ttl = Duration::from_secs(parsed(
            "WARDEN_KEY_CACHE_TTL_SECS",
            config.key_cache_ttl.as_secs(),
        )?);
        config.key_cache_capacity =
            parsed("WARDEN_KEY_CACHE_CAPACITY", config.key_cache_capacity)?;
        if config.key_cache_capacity == 0 {
            return Err(ConfigError::Invalid("WARDEN_KEY_CACHE_CAPACITY"));
        }
        config.leeway = Duration::from_secs(parsed("WARDEN_CLOCK_LEEWAY_SECS", 0)?);

        if let Ok(home) = std::env::var("WARDEN_REDIRECT_HOME") {
            config.redirect.home = home;
        }
        if let Ok(logout) = std::env::var("WARDEN_REDIRECT_LOGOUT") {
            config.redirect.logout = logout;
        }
        if let Ok(environment) = std::env::var("WARDEN_ENVIRONMENT") {
            config.environment = environment.parse()?;
        }

        Ok(config)
    }

    /// Get the issuer every accepted token must carry
    pub fn expected_issuer(&self) -> String {
        format!("{}{}", self.issuer_prefix, self.project.project_id)
    }

    /// Set the key-distribution endpoint
    pub fn with_public_keys_url(mut self, url: impl Into<String>) -> Self {
        self.public_keys_url = url.into();
        self
    }

    /// Set the issuer prefix
    pub fn with_issuer_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.issuer_prefix = prefix.into();
        self
    }

    /// Set the maximum token age
    pub fn with_token_max_age(mut self, max_age: Duration) -> Self {
        self.token_max_age = max_age;
        self
    }

    /// Set the signing key TTL
    pub fn with_key_cache_ttl(mut self, ttl: Duration) -> Self {
        self.key_cache_ttl = ttl;
        self
    }

    /// Set the signing key cache capacity
    pub fn with_key_cache_capacity(mut self, capacity: u64) -> Self {
        self.key_cache_capacity = capacity;
        self
    }

    /// Set the clock leeway
    pub fn with_leeway(mut self, leeway: Duration) -> Self {
        self.leeway = leeway;
        self
    }

    /// Set the redirect targets
    pub fn with_redirect(mut self, redirect: RedirectConfig) -> Self {
        self.redirect = redirect;
        self
    }

    /// Declare the execution environment
    pub fn with_environment(mut self, environment: Environment) -> Self {
        self.environment = environment;
        self
    }
}

fn required(name: &'static str) -> Result<String, ConfigError> {
    std::env::var(name).map_err(|_| ConfigError::Missing(name))
}

fn parsed<T: FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match std::env::var(name) {
        Ok(raw) => raw.trim().parse().map_err(|_| ConfigError::Invalid(name)),
        Err(_) => Ok(default),
    }
}

/// Configuration error
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid value for environment variable: {0}")]
    Invalid(&'static str),
}
