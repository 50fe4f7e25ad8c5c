use crate::config::TransportOptions;
use crate::error::FetchError;
use crate::headers::{HeaderMap, USER_AGENT};
use crate::redirect::RedirectLimit;
use bytes::Bytes;
use http::{Method, Request, Uri};
use http_body_util::Full;

/// Everything the transport needs for one call, fully resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EffectiveRequest {
    pub method: Method,
    pub url: String,
    pub headers: HeaderMap,
    pub body: Option<Bytes>,
}

impl EffectiveRequest {
    /// Build the wire request.
    ///
    /// Sets `User-Agent` unless the caller did, and carries the redirect
    /// budget as a request extension.
    ///
    /// # Errors
    /// Returns [`FetchError::Network`] for a URL the transport cannot reach
    /// (unparsable, no host, scheme other than http/https) or a header HTTP
    /// cannot carry.
    pub fn into_http(
        self,
        transport: &TransportOptions,
    ) -> Result<Request<Full<Bytes>>, FetchError> {
        let uri = parse_url(&self.url)?;

        let mut headers = self.headers;
        if !headers.contains(USER_AGENT) {
            headers.insert(USER_AGENT, transport.user_agent());
        }
        let headers = headers
            .to_http()
            .map_err(|e| FetchError::network(e.to_string()))?;

        let mut request = Request::new(Full::new(self.body.unwrap_or_default()));
        *request.method_mut() = self.method;
        *request.uri_mut() = uri;
        *request.headers_mut() = headers;
        request
            .extensions_mut()
            .insert(RedirectLimit(transport.max_redirects()));
        Ok(request)
    }
}

fn parse_url(url: &str) -> Result<Uri, FetchError> {
    let uri: Uri = url
        .parse()
        .map_err(|e: http::uri::InvalidUri| {
            FetchError::network(format!("invalid URL '{url}': {e}"))
        })?;

    if uri.authority().is_none() {
        return Err(FetchError::network(format!(
            "invalid URL '{url}': missing host"
        )));
    }

    match uri.scheme_str() {
        Some("http" | "https") => Ok(uri),
        Some(scheme) => Err(FetchError::network(format!(
            "invalid URL '{url}': unsupported scheme '{scheme}'"
        ))),
        None => Err(FetchError::network(format!(
            "invalid URL '{url}': missing scheme"
        ))),
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use crate::config::DEFAULT_USER_AGENT;
    use crate::error::ErrorKind;
    use crate::headers::normalize;
    use http_body_util::BodyExt;

    fn request(url: &str, headers: HeaderMap) -> EffectiveRequest {
        EffectiveRequest {
            method: Method::POST,
            url: url.to_owned(),
            headers,
            body: Some(Bytes::from_static(b"{}")),
        }
    }

    #[tokio::test]
    async fn test_into_http_carries_everything() {
        let req = request(
            "https://api.example.com/posts?x=1",
            normalize([("Content-Type", "application/json")]),
        )
        .into_http(&TransportOptions::default())
        .unwrap();

        assert_eq!(req.method(), Method::POST);
        assert_eq!(req.uri().path(), "/posts");
        assert_eq!(req.uri().query(), Some("x=1"));
        assert_eq!(req.headers()["content-type"], "application/json");
        assert_eq!(req.headers()["user-agent"], DEFAULT_USER_AGENT);
        assert_eq!(req.extensions().get::<RedirectLimit>(), Some(&RedirectLimit(20)));

        let body = req.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&body[..], b"{}");
    }

    #[test]
    fn test_caller_user_agent_wins() {
        let transport = TransportOptions {
            user_agent: Some("configured/1.0".to_owned()),
            ..Default::default()
        };

        let req = request("http://localhost/", normalize([("user-agent", "mine/2.0")]))
            .into_http(&transport)
            .unwrap();
        assert_eq!(req.headers()["user-agent"], "mine/2.0");

        let req = request("http://localhost/", HeaderMap::new())
            .into_http(&transport)
            .unwrap();
        assert_eq!(req.headers()["user-agent"], "configured/1.0");
    }

    #[test]
    fn test_unreachable_urls_are_network_errors() {
        for url in ["/posts", "not a url", "ftp://files.example.com/a", "localhost:8080"] {
            let err = request(url, HeaderMap::new())
                .into_http(&TransportOptions::default())
                .unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Network, "{url}");
        }
    }

    #[test]
    fn test_invalid_header_value_is_network_error() {
        let err = request("https://api.example.com", normalize([("X-Bad", "line\nbreak")]))
            .into_http(&TransportOptions::default())
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Network);
        assert!(err.to_string().contains("x-bad") || err.to_string().contains("X-Bad"));
    }
}
