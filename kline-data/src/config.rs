use crate::rest::retry::RetryPolicy;
use std::{fmt, num::NonZeroU32};

/// Environment variable holding the exchange API key.
pub const ENV_API_KEY: &str = "BINANCE_API_KEY";

/// Environment variable holding the exchange secret key.
pub const ENV_SECRET_KEY: &str = "BINANCE_SECRET_KEY";

/// Placeholder used for any credential that is not configured.
pub const PLACEHOLDER_CREDENTIAL: &str = "test";

/// Default REST request quota: 6000 weight per minute at ~5 weight per klines request.
pub const DEFAULT_REQUESTS_PER_MINUTE: NonZeroU32 = NonZeroU32::new(1200).unwrap();

/// Exchange API credentials.
///
/// Missing credentials are not an error: the kline endpoints are public, so a client built with
/// [`Credentials::placeholder`] still works, and any real misconfiguration surfaces on the first
/// network call.
#[derive(Clone, Eq, PartialEq)]
pub struct Credentials {
    pub api_key: String,
    pub secret_key: String,
}

impl Credentials {
    pub fn new<K, S>(api_key: K, secret_key: S) -> Self
    where
        K: Into<String>,
        S: Into<String>,
    {
        Self {
            api_key: api_key.into(),
            secret_key: secret_key.into(),
        }
    }

    /// Non-functional credentials.
    pub fn placeholder() -> Self {
        Self::new(PLACEHOLDER_CREDENTIAL, PLACEHOLDER_CREDENTIAL)
    }

    /// Read [`ENV_API_KEY`] and [`ENV_SECRET_KEY`] once, falling back to the placeholder for any
    /// variable that is unset or not valid unicode.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build [`Credentials`] from an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |key| lookup(key).unwrap_or_else(|| PLACEHOLDER_CREDENTIAL.to_string());
        Self::new(read(ENV_API_KEY), read(ENV_SECRET_KEY))
    }

    /// Determines if the API key is the non-functional placeholder.
    pub fn is_placeholder(&self) -> bool {
        self.api_key == PLACEHOLDER_CREDENTIAL
    }
}

impl Default for Credentials {
    fn default() -> Self {
        Self::placeholder()
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("api_key", &self.api_key)
            .field("secret_key", &"<redacted>")
            .finish()
    }
}

/// Configuration injected into a REST kline collaborator at construction.
#[derive(Debug, Clone, PartialEq)]
pub struct RestConfig {
    /// Override of the exchange server base URL. `None` uses the server default.
    pub base_url: Option<String>,
    pub credentials: Credentials,
    pub requests_per_minute: NonZeroU32,
    pub retry: RetryPolicy,
}

impl Default for RestConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            credentials: Credentials::default(),
            requests_per_minute: DEFAULT_REQUESTS_PER_MINUTE,
            retry: RetryPolicy::default(),
        }
    }
}

impl RestConfig {
    /// Default [`RestConfig`] with the provided [`Credentials`].
    pub fn with_credentials(credentials: Credentials) -> Self {
        Self {
            credentials,
            ..Self::default()
        }
    }

    /// Return a copy of this [`RestConfig`] targeting the provided base URL.
    pub fn base_url<S: Into<String>>(self, base_url: S) -> Self {
        Self {
            base_url: Some(base_url.into()),
            ..self
        }
    }

    /// Return a copy of this [`RestConfig`] using the provided [`RetryPolicy`].
    pub fn retry(self, retry: RetryPolicy) -> Self {
        Self { retry, ..self }
    }
}
