use crate::body::{self, RequestBody};
use crate::builder::FetchClientBuilder;
use crate::cancel::{AbortSignal, with_cancellation};
use crate::classify;
use crate::config::{CallOptions, ClientConfig, EffectiveConfig};
use crate::error::{BuildError, FetchError};
use crate::request::EffectiveRequest;
use crate::resolve::resolve;
use crate::response::{self, Content};
use crate::transport::TransportService;
use http::Method;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Instant;
use tower::ServiceExt;
use tracing::Instrument;

/// Fetch-style HTTP client.
///
/// Holds read-only defaults ([`ClientConfig`]) and a transport. Every call
/// merges the defaults with its own [`CallOptions`], resolves the URL,
/// encodes the payload and runs the exchange under a combined timeout and
/// cancellation signal. Calls resolve to the decoded body (`None` for
/// 204/205) or exactly one [`FetchError`].
///
/// `FetchClient` is `Clone + Send + Sync`; clones share the configuration
/// and the connection pool, and concurrent calls never affect each other.
///
/// ```ignore
/// let client = FetchClient::builder()
///     .base_url("https://jsonplaceholder.typicode.com")
///     .build()?;
///
/// let post = client.get("/posts/1", CallOptions::default()).await?;
/// let created = client
///     .post("/posts", Some(json!({"title": "hi"}).into()), CallOptions::default())
///     .await?;
/// ```
#[derive(Clone)]
#[non_exhaustive]
pub struct FetchClient {
    /// Client-level defaults, shared by clones
    pub config: Arc<ClientConfig>,
    /// Service every call is dispatched through. Calling it directly skips
    /// URL resolution, the timeout and error classification.
    pub transport: TransportService,
}

impl std::fmt::Debug for FetchClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FetchClient")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl FetchClient {
    /// Create a client with the given defaults and the default transport
    ///
    /// # Errors
    /// See [`FetchClientBuilder::build`].
    pub fn new(config: ClientConfig) -> Result<Self, BuildError> {
        FetchClientBuilder::with_config(config).build()
    }

    /// Create a builder for configuring the client
    #[must_use]
    pub fn builder() -> FetchClientBuilder {
        FetchClientBuilder::new()
    }

    /// The client-level defaults
    #[must_use]
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// GET `path`; no payload is sent.
    ///
    /// # Errors
    /// Any [`FetchError`] kind except `Encoding`.
    pub async fn get(
        &self,
        path: &str,
        options: CallOptions,
    ) -> Result<Option<Content>, FetchError> {
        self.request(Method::GET, path, None, options).await
    }

    /// POST `path` with an optional payload.
    ///
    /// # Errors
    /// Any [`FetchError`] kind.
    pub async fn post(
        &self,
        path: &str,
        data: Option<RequestBody>,
        options: CallOptions,
    ) -> Result<Option<Content>, FetchError> {
        self.request(Method::POST, path, data, options).await
    }

    /// PUT `path` with an optional payload.
    ///
    /// # Errors
    /// Any [`FetchError`] kind.
    pub async fn put(
        &self,
        path: &str,
        data: Option<RequestBody>,
        options: CallOptions,
    ) -> Result<Option<Content>, FetchError> {
        self.request(Method::PUT, path, data, options).await
    }

    /// PATCH `path` with an optional payload.
    ///
    /// # Errors
    /// Any [`FetchError`] kind.
    pub async fn patch(
        &self,
        path: &str,
        data: Option<RequestBody>,
        options: CallOptions,
    ) -> Result<Option<Content>, FetchError> {
        self.request(Method::PATCH, path, data, options).await
    }

    /// DELETE `path`; no payload is sent.
    ///
    /// # Errors
    /// Any [`FetchError`] kind except `Encoding`.
    pub async fn delete(
        &self,
        path: &str,
        options: CallOptions,
    ) -> Result<Option<Content>, FetchError> {
        self.request(Method::DELETE, path, None, options).await
    }

    /// GET `path` and deserialize the JSON body into `T`.
    ///
    /// # Errors
    /// Everything [`get`](Self::get) returns, plus [`FetchError::Decoding`]
    /// when the body is absent, not JSON, or does not match `T`.
    pub async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        options: CallOptions,
    ) -> Result<T, FetchError> {
        let url = resolve(
            options.base_url.as_deref().unwrap_or(&self.config.base_url),
            path,
        );
        let decoding = |message: String| FetchError::Decoding {
            url: url.clone(),
            message,
        };

        match self.get(path, options).await? {
            Some(Content::Json(value)) => {
                serde_json::from_value(value).map_err(|e| decoding(e.to_string()))
            }
            Some(Content::Text(_)) => Err(decoding("response is not JSON".to_owned())),
            None => Err(decoding("response has no body".to_owned())),
        }
    }

    /// Issue a call with any method.
    ///
    /// Payloads are ignored for GET and HEAD.
    ///
    /// # Errors
    /// Exactly one [`FetchError`] per failed call.
    pub async fn request(
        &self,
        method: Method,
        path: &str,
        data: Option<RequestBody>,
        options: CallOptions,
    ) -> Result<Option<Content>, FetchError> {
        let effective = self.config.merge(&options);
        let request = self.prepare(method, path, data, &effective)?;
        self.dispatch(request, &effective, &options).await
    }

    /// Resolve the URL and encode the payload. Nothing is sent yet.
    fn prepare(
        &self,
        method: Method,
        path: &str,
        data: Option<RequestBody>,
        effective: &EffectiveConfig,
    ) -> Result<EffectiveRequest, FetchError> {
        let url = resolve(&effective.base_url, path);
        let mut headers = effective.headers.clone();
        let body = body::encode(&method, data, &mut headers, self.config.json_by_default)?;

        Ok(EffectiveRequest {
            method,
            url,
            headers,
            body,
        })
    }

    async fn dispatch(
        &self,
        request: EffectiveRequest,
        effective: &EffectiveConfig,
        options: &CallOptions,
    ) -> Result<Option<Content>, FetchError> {
        let method = request.method.clone();
        let url = request.url.clone();
        let span = tracing::debug_span!("fetch", %method, %url);

        async {
            let started = Instant::now();
            let outcome = with_cancellation(effective.timeout, options.cancel.as_ref(), |signal| {
                self.exchange(request, effective, signal)
            })
            .await;

            let result = match outcome {
                Ok(result) => result,
                Err(reason) => Err(classify::aborted(reason, method, url)),
            };

            let elapsed = started.elapsed();
            match &result {
                Ok(_) => tracing::debug!(?elapsed, "fetch completed"),
                Err(e) => tracing::debug!(kind = %e.kind(), error = %e, ?elapsed, "fetch failed"),
            }
            result
        }
        .instrument(span)
        .await
    }

    /// One exchange: send, read the body, interpret.
    async fn exchange(
        &self,
        request: EffectiveRequest,
        effective: &EffectiveConfig,
        signal: AbortSignal,
    ) -> Result<Option<Content>, FetchError> {
        let url = request.url.clone();
        let is_head = request.method == Method::HEAD;
        let mut http_request = request.into_http(&effective.transport)?;
        http_request.extensions_mut().insert(signal);

        let response = self
            .transport
            .clone()
            .oneshot(http_request)
            .await
            .map_err(classify::transport_error)?;

        tracing::trace!(status = %response.status(), "response headers received");

        let raw = response::read_response(response, effective.transport.max_body_size()).await?;
        if is_head && raw.status.is_success() {
            return Ok(None);
        }
        response::interpret(&raw, &url)
    }
}
