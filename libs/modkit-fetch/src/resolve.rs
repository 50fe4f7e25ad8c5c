use url::Url;

/// Combine a base address with a request target.
///
/// - An absolute `http`/`https` target is returned unchanged.
/// - An empty base returns the target unchanged.
/// - Otherwise base and target are joined with exactly one `/` between them.
///
/// No other normalization happens: query strings, dot segments and
/// percent-encoding are passed through as written.
#[must_use]
pub fn resolve(base: &str, target: &str) -> String {
    if base.is_empty() || is_absolute_http(target) {
        return target.to_owned();
    }

    match (base.ends_with('/'), target.strip_prefix('/')) {
        (true, Some(rest)) => format!("{base}{rest}"),
        (false, None) => format!("{base}/{target}"),
        _ => format!("{base}{target}"),
    }
}

fn is_absolute_http(target: &str) -> bool {
    Url::parse(target).is_ok_and(|url| matches!(url.scheme(), "http" | "https"))
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_drops_duplicate_slash() {
        assert_eq!(resolve("https://api/x/", "/y"), "https://api/x/y");
    }

    #[test]
    fn test_resolve_inserts_missing_slash() {
        assert_eq!(resolve("https://api/x", "y"), "https://api/x/y");
    }

    #[test]
    fn test_resolve_single_slash_kept() {
        assert_eq!(resolve("https://api/x/", "y"), "https://api/x/y");
        assert_eq!(resolve("https://api/x", "/y"), "https://api/x/y");
    }

    #[test]
    fn test_resolve_absolute_target_wins() {
        assert_eq!(resolve("https://api", "https://other/z"), "https://other/z");
        assert_eq!(
            resolve("https://api", "http://localhost:8080/health"),
            "http://localhost:8080/health"
        );
    }

    #[test]
    fn test_resolve_non_http_scheme_is_relative() {
        assert_eq!(resolve("https://api", "mailto:me"), "https://api/mailto:me");
    }

    #[test]
    fn test_resolve_empty_base() {
        assert_eq!(resolve("", "/posts"), "/posts");
        assert_eq!(resolve("", "posts?page=2"), "posts?page=2");
    }

    #[test]
    fn test_resolve_keeps_query() {
        assert_eq!(
            resolve("https://api.example.com", "/posts?userId=1"),
            "https://api.example.com/posts?userId=1"
        );
    }
}
