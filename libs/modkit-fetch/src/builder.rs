use crate::client::FetchClient;
use crate::config::ClientConfig;
use crate::error::{BoxError, BuildError};
use crate::headers::{HeaderMap, USER_AGENT};
use crate::transport::{self, TransportService};
use bytes::Bytes;
use http::{Request, Response};
use http_body_util::Full;
use std::sync::Arc;
use std::time::Duration;

/// Builder for a [`FetchClient`].
///
/// ```ignore
/// let client = FetchClient::builder()
///     .base_url("https://jsonplaceholder.typicode.com")
///     .timeout(Duration::from_secs(2))
///     .header("Accept", "application/json")
///     .build()?;
/// ```
pub struct FetchClientBuilder {
    config: ClientConfig,
    transport: Option<TransportService>,
}

impl FetchClientBuilder {
    /// Create a new builder with default configuration
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(ClientConfig::default())
    }

    /// Create a builder with a specific configuration
    #[must_use]
    pub fn with_config(config: ClientConfig) -> Self {
        Self {
            config,
            transport: None,
        }
    }

    /// Base address relative paths are resolved against
    #[must_use]
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.config.base_url = base_url.into();
        self
    }

    /// Per-call deadline; `Duration::ZERO` disables it
    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = timeout;
        self
    }

    /// Add a default header, replacing any case variant of the same name
    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.config.headers.insert(name, value);
        self
    }

    /// Merge several default headers
    #[must_use]
    pub fn headers(mut self, headers: impl Into<HeaderMap>) -> Self {
        self.config.headers.merge_from(&headers.into());
        self
    }

    /// User agent sent when a call does not set its own
    #[must_use]
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.config.transport.user_agent = Some(user_agent.into());
        self
    }

    /// Maximum decoded response body size in bytes
    #[must_use]
    pub fn max_body_size(mut self, size: usize) -> Self {
        self.config.transport.max_body_size = Some(size);
        self
    }

    /// Maximum redirects followed per call; `0` disables following
    #[must_use]
    pub fn max_redirects(mut self, max: usize) -> Self {
        self.config.transport.max_redirects = Some(max);
        self
    }

    /// Whether text and byte payloads default to `application/json` too
    #[must_use]
    pub fn json_by_default(mut self, enabled: bool) -> Self {
        self.config.json_by_default = enabled;
        self
    }

    /// Replace the default hyper stack with another service.
    ///
    /// The service receives fully prepared requests (resolved URL, merged
    /// headers, encoded body, [`AbortSignal`](crate::AbortSignal) and
    /// [`RedirectLimit`](crate::RedirectLimit) extensions) and must return
    /// the response with its body still unread.
    #[must_use]
    pub fn transport<S, B>(mut self, service: S) -> Self
    where
        S: tower::Service<Request<Full<Bytes>>, Response = Response<B>>
            + Clone
            + Send
            + Sync
            + 'static,
        S::Future: Send + 'static,
        S::Error: Into<BoxError>,
        B: http_body::Body<Data = Bytes> + Send + Sync + 'static,
        B::Error: Into<BoxError>,
    {
        self.transport = Some(transport::boxed(service));
        self
    }

    /// Build the client.
    ///
    /// # Errors
    /// - [`BuildError::InvalidHeader`] if a default header or the user agent
    ///   cannot be sent over HTTP
    /// - [`BuildError::Tls`] if the default transport cannot initialise TLS
    pub fn build(self) -> Result<FetchClient, BuildError> {
        let mut wire_headers = self.config.headers.clone();
        if !wire_headers.contains(USER_AGENT) {
            wire_headers.insert(USER_AGENT, self.config.transport.user_agent());
        }
        wire_headers
            .to_http()
            .map_err(|e| BuildError::InvalidHeader {
                name: e.name,
                reason: e.reason,
            })?;

        let transport = match self.transport {
            Some(transport) => transport,
            None => transport::default_transport()?,
        };

        tracing::debug!(
            base_url = %self.config.base_url,
            timeout = ?self.config.timeout,
            headers = self.config.headers.len(),
            "fetch client built"
        );

        Ok(FetchClient {
            config: Arc::new(self.config),
            transport,
        })
    }
}

impl Default for FetchClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}
