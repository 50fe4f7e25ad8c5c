//! Redirect policy for the default transport.
//!
//! - Follows up to the per-call [`RedirectLimit`] (default 20); `0` hands
//!   3xx responses back to the caller unchanged
//! - Strips `Authorization`, `Cookie` and `Proxy-Authorization` once the
//!   chain leaves the original origin
//! - Refuses HTTPS → HTTP downgrades

use crate::config::DEFAULT_MAX_REDIRECTS;
use http::{Request, Uri, header};
use tower_http::follow_redirect::policy::{Action, Attempt, Policy};

/// Headers dropped when a redirect crosses origins
const SENSITIVE_HEADERS: &[header::HeaderName] = &[
    header::AUTHORIZATION,
    header::COOKIE,
    header::PROXY_AUTHORIZATION,
];

/// Per-call redirect budget, carried as a request extension
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RedirectLimit(pub usize);

/// Redirect policy shared by every call of a client.
///
/// `FollowRedirect` clones the policy for each request, so the counters
/// below are per call.
#[derive(Debug, Clone, Default)]
pub struct RedirectPolicy {
    /// Limit picked up from the first request of the chain
    limit: Option<usize>,
    followed: usize,
    cross_origin: bool,
}

impl RedirectPolicy {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn limit(&self) -> usize {
        self.limit.unwrap_or(DEFAULT_MAX_REDIRECTS)
    }

    /// Same scheme, host and port. A missing scheme counts as https.
    fn is_same_origin(previous: &Uri, target: &Uri) -> bool {
        let previous_scheme = previous.scheme_str().unwrap_or("https");
        let target_scheme = target.scheme_str().unwrap_or("https");

        let previous_port = previous
            .port_u16()
            .unwrap_or_else(|| default_port(previous_scheme));
        let target_port = target
            .port_u16()
            .unwrap_or_else(|| default_port(target_scheme));

        previous_scheme == target_scheme
            && previous.host().unwrap_or("") == target.host().unwrap_or("")
            && previous_port == target_port
    }

    fn is_https_downgrade(previous: &Uri, target: &Uri) -> bool {
        previous.scheme_str().unwrap_or("https") == "https"
            && target.scheme_str().unwrap_or("https") == "http"
    }
}

fn default_port(scheme: &str) -> u16 {
    match scheme {
        "http" => 80,
        "https" => 443,
        _ => 0,
    }
}

impl<B: Clone, E> Policy<B, E> for RedirectPolicy {
    fn redirect(&mut self, attempt: &Attempt<'_>) -> Result<Action, E> {
        self.followed += 1;
        if self.followed > self.limit() {
            tracing::debug!(
                count = self.followed,
                max = self.limit(),
                "redirect limit reached"
            );
            return Ok(Action::Stop);
        }

        let previous = attempt.previous();
        let target = attempt.location();

        if Self::is_https_downgrade(previous, target) {
            tracing::warn!(%previous, %target, "refusing HTTPS to HTTP redirect");
            return Ok(Action::Stop);
        }

        if !Self::is_same_origin(previous, target) {
            self.cross_origin = true;
            tracing::debug!(%previous, %target, "cross-origin redirect");
        }

        Ok(Action::Follow)
    }

    fn on_request(&mut self, request: &mut Request<B>) {
        if self.limit.is_none() {
            self.limit = request
                .extensions()
                .get::<RedirectLimit>()
                .map(|limit| limit.0);
        }

        if self.cross_origin {
            let headers = request.headers_mut();
            for name in SENSITIVE_HEADERS {
                if headers.remove(name).is_some() {
                    tracing::debug!(header = %name, "stripped header on cross-origin redirect");
                }
            }
        }
    }

    fn clone_body(&self, body: &B) -> Option<B> {
        // 307/308 replay the original body
        Some(body.clone())
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    fn uri(s: &str) -> Uri {
        s.parse().unwrap()
    }

    #[test]
    fn test_same_origin_ignores_path_and_default_port() {
        assert!(RedirectPolicy::is_same_origin(
            &uri("https://example.com/a"),
            &uri("https://example.com:443/b")
        ));
        assert!(!RedirectPolicy::is_same_origin(
            &uri("https://example.com/a"),
            &uri("https://other.com/a")
        ));
        assert!(!RedirectPolicy::is_same_origin(
            &uri("http://example.com/a"),
            &uri("http://example.com:8080/a")
        ));
    }

    #[test]
    fn test_https_downgrade_detection() {
        assert!(RedirectPolicy::is_https_downgrade(
            &uri("https://example.com/a"),
            &uri("http://example.com/a")
        ));
        assert!(!RedirectPolicy::is_https_downgrade(
            &uri("http://example.com/a"),
            &uri("https://example.com/a")
        ));
    }

    #[test]
    fn test_limit_read_from_first_request_only() {
        let mut policy = RedirectPolicy::new();
        assert_eq!(policy.limit(), DEFAULT_MAX_REDIRECTS);

        let mut first = Request::new(());
        first.extensions_mut().insert(RedirectLimit(3));
        Policy::<(), ()>::on_request(&mut policy, &mut first);
        assert_eq!(policy.limit(), 3);

        let mut hop = Request::new(());
        hop.extensions_mut().insert(RedirectLimit(50));
        Policy::<(), ()>::on_request(&mut policy, &mut hop);
        assert_eq!(policy.limit(), 3);
    }

    #[test]
    fn test_sensitive_headers_stripped_after_cross_origin_hop() {
        let mut policy = RedirectPolicy::new();

        let mut request = Request::new(());
        request
            .headers_mut()
            .insert(header::AUTHORIZATION, "Bearer t".parse().unwrap());
        Policy::<(), ()>::on_request(&mut policy, &mut request);
        assert!(request.headers().contains_key(header::AUTHORIZATION));

        policy.cross_origin = true;
        request
            .headers_mut()
            .insert(header::COOKIE, "a=b".parse().unwrap());
        request
            .headers_mut()
            .insert(header::ACCEPT, "application/json".parse().unwrap());
        Policy::<(), ()>::on_request(&mut policy, &mut request);

        assert!(!request.headers().contains_key(header::AUTHORIZATION));
        assert!(!request.headers().contains_key(header::COOKIE));
        assert!(request.headers().contains_key(header::ACCEPT));
    }
}
