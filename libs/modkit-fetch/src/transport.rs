//! The tower service that performs the actual exchange.
//!
//! Any `Service<Request<Full<Bytes>>>` can stand in for the default hyper
//! stack (see [`FetchClientBuilder::transport`](crate::FetchClientBuilder::transport)),
//! which is how tests run the client without a network.

use crate::error::{BoxError, BuildError};
use crate::redirect::RedirectPolicy;
use bytes::Bytes;
use http::{Request, Response};
use http_body_util::{BodyExt, Full};
use hyper_rustls::HttpsConnector;
use hyper_util::client::legacy::Client;
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::rt::{TokioExecutor, TokioTimer};
use std::sync::Arc;
use std::time::Duration;
use tower::util::BoxCloneSyncService;
use tower::{ServiceBuilder, ServiceExt};
use tower_http::decompression::DecompressionLayer;
use tower_http::follow_redirect::FollowRedirectLayer;

/// Response body after decompression, type-erased
pub type ResponseBody = http_body_util::combinators::BoxBody<Bytes, BoxError>;

/// Type-erased transport service
pub type TransportService =
    BoxCloneSyncService<Request<Full<Bytes>>, Response<ResponseBody>, BoxError>;

/// How long idle pooled connections are kept
const POOL_IDLE_TIMEOUT: Duration = Duration::from_secs(90);

/// Wrap any compatible service as a [`TransportService`].
pub fn boxed<S, B>(service: S) -> TransportService
where
    S: tower::Service<Request<Full<Bytes>>, Response = Response<B>> + Clone + Send + Sync + 'static,
    S::Future: Send + 'static,
    S::Error: Into<BoxError>,
    B: http_body::Body<Data = Bytes> + Send + Sync + 'static,
    B::Error: Into<BoxError>,
{
    let service = service.map_response(box_response).map_err(Into::into);
    BoxCloneSyncService::new(service)
}

fn box_response<B>(response: Response<B>) -> Response<ResponseBody>
where
    B: http_body::Body<Data = Bytes> + Send + Sync + 'static,
    B::Error: Into<BoxError>,
{
    let (parts, body) = response.into_parts();
    Response::from_parts(parts, body.map_err(Into::into).boxed())
}

/// Build the default stack, outer to inner:
/// `Decompression → FollowRedirect → hyper legacy client`.
///
/// Plain `http` and `https` (HTTP/1.1 or HTTP/2 via ALPN) are both allowed;
/// TLS uses the webpki root set.
///
/// # Errors
/// Returns [`BuildError::Tls`] if the TLS connector cannot be initialised.
pub fn default_transport() -> Result<TransportService, BuildError> {
    let https = build_https_connector()?;

    let mut client_builder = Client::builder(TokioExecutor::new());
    // pool_idle_timeout needs a timer
    client_builder
        .pool_timer(TokioTimer::new())
        .pool_idle_timeout(POOL_IDLE_TIMEOUT);
    let hyper_client = client_builder.build::<_, Full<Bytes>>(https);

    let service = ServiceBuilder::new()
        .layer(DecompressionLayer::new())
        .layer(FollowRedirectLayer::with_policy(RedirectPolicy::new()))
        .service(hyper_client);

    Ok(boxed(service))
}

/// The installed default crypto provider, or aws-lc-rs without installing it.
fn crypto_provider() -> Arc<rustls::crypto::CryptoProvider> {
    rustls::crypto::CryptoProvider::get_default()
        .cloned()
        .unwrap_or_else(|| Arc::new(rustls::crypto::aws_lc_rs::default_provider()))
}

fn build_https_connector() -> Result<HttpsConnector<HttpConnector>, BuildError> {
    let connector = hyper_rustls::HttpsConnectorBuilder::new()
        .with_provider_and_webpki_roots(crypto_provider())
        .map_err(|e| BuildError::Tls(Box::new(e)))?
        .https_or_http()
        .enable_all_versions()
        .build();
    Ok(connector)
}
