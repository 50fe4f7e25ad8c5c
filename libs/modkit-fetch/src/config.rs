use crate::headers::HeaderMap;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Default per-call timeout
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(5000);

/// Default User-Agent string for HTTP requests
pub const DEFAULT_USER_AGENT: &str = concat!("modkit-fetch/", env!("CARGO_PKG_VERSION"));

/// Default limit on a decoded response body (10 MB)
pub const DEFAULT_MAX_BODY_SIZE: usize = 10 * 1024 * 1024;

/// Default number of redirects followed per call
pub const DEFAULT_MAX_REDIRECTS: usize = 20;

/// Transport knobs that may be set per client and overridden per call.
///
/// Each field is merged independently: a call that only sets
/// `max_body_size` keeps the client's `user_agent`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TransportOptions {
    /// User-Agent sent when the caller did not set one (default: `modkit-fetch/<version>`)
    pub user_agent: Option<String>,

    /// Maximum decoded response body size in bytes (default: 10 MB)
    pub max_body_size: Option<usize>,

    /// Maximum redirects followed; `0` returns 3xx responses as-is (default: 20)
    pub max_redirects: Option<usize>,
}

impl TransportOptions {
    /// Overlay `overrides` onto `self`, field by field.
    #[must_use]
    pub fn merge(&self, overrides: &TransportOptions) -> TransportOptions {
        TransportOptions {
            user_agent: overrides
                .user_agent
                .clone()
                .or_else(|| self.user_agent.clone()),
            max_body_size: overrides.max_body_size.or(self.max_body_size),
            max_redirects: overrides.max_redirects.or(self.max_redirects),
        }
    }

    #[must_use]
    pub fn user_agent(&self) -> &str {
        self.user_agent.as_deref().unwrap_or(DEFAULT_USER_AGENT)
    }

    #[must_use]
    pub fn max_body_size(&self) -> usize {
        self.max_body_size.unwrap_or(DEFAULT_MAX_BODY_SIZE)
    }

    #[must_use]
    pub fn max_redirects(&self) -> usize {
        self.max_redirects.unwrap_or(DEFAULT_MAX_REDIRECTS)
    }
}

/// Client-level defaults, immutable once the client is built.
///
/// Deserializable so it can be loaded from configuration files:
///
/// ```yaml
/// base_url: https://jsonplaceholder.typicode.com
/// timeout: 5s
/// headers:
///   Accept: application/json
/// transport:
///   max_redirects: 5
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ClientConfig {
    /// Base address relative paths are resolved against (default: empty)
    pub base_url: String,

    /// Per-call deadline in humantime form (`250ms`, `5s`); `0s` disables it
    /// (default: 5 seconds)
    #[serde(with = "humantime_serde")]
    pub timeout: Duration,

    /// Headers sent with every call
    pub headers: HeaderMap,

    /// Transport knobs
    pub transport: TransportOptions,

    /// Default the outgoing content type to `application/json` for every
    /// payload kind (default: true).
    ///
    /// When `false`, only structured payloads default to JSON; text defaults
    /// to `text/plain; charset=utf-8` and bytes to `application/octet-stream`.
    pub json_by_default: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            timeout: DEFAULT_TIMEOUT,
            headers: HeaderMap::new(),
            transport: TransportOptions::default(),
            json_by_default: true,
        }
    }
}

impl ClientConfig {
    /// Combine these defaults with per-call overrides.
    ///
    /// Present override fields win; headers and transport options are merged
    /// key by key so a per-call addition never erases unrelated defaults.
    #[must_use]
    pub fn merge(&self, overrides: &CallOptions) -> EffectiveConfig {
        let mut headers = self.headers.clone();
        headers.merge_from(&overrides.headers);

        EffectiveConfig {
            base_url: overrides
                .base_url
                .clone()
                .unwrap_or_else(|| self.base_url.clone()),
            timeout: overrides.timeout.unwrap_or(self.timeout),
            headers,
            transport: self.transport.merge(&overrides.transport),
        }
    }
}

/// Per-call overrides plus an optional cancellation token.
///
/// ```ignore
/// let cancel = CancellationToken::new();
/// let options = CallOptions::new()
///     .timeout(Duration::from_secs(2))
///     .header("X-Request-Id", "42")
///     .cancel_on(cancel.clone());
/// ```
#[derive(Debug, Clone, Default)]
pub struct CallOptions {
    pub base_url: Option<String>,
    pub timeout: Option<Duration>,
    /// Headers merged over the client defaults (empty means "no override")
    pub headers: HeaderMap,
    pub transport: TransportOptions,
    /// Caller-owned cancellation handle; the client only observes it
    pub cancel: Option<CancellationToken>,
}

impl CallOptions {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name, value);
        self
    }

    #[must_use]
    pub fn headers(mut self, headers: impl Into<HeaderMap>) -> Self {
        self.headers.merge_from(&headers.into());
        self
    }

    #[must_use]
    pub fn transport(mut self, transport: TransportOptions) -> Self {
        self.transport = transport;
        self
    }

    /// Abort the call when `token` is cancelled
    #[must_use]
    pub fn cancel_on(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }
}

/// The fully merged settings governing one call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EffectiveConfig {
    pub base_url: String,
    pub timeout: Duration,
    pub headers: HeaderMap,
    pub transport: TransportOptions,
}
