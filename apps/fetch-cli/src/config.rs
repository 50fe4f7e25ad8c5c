//! Layered client configuration: defaults, then YAML, then `FETCH_*` env.

use anyhow::Context;
use figment::Figment;
use figment::providers::{Env, Format, Serialized, Yaml};
use modkit_fetch::ClientConfig;
use std::path::Path;

/// Environment prefix; nested keys use `__` (`FETCH_TRANSPORT__MAX_REDIRECTS`)
pub const ENV_PREFIX: &str = "FETCH_";

/// Keys read from the environment, after the prefix is stripped. Headers are
/// not among them since env names cannot carry a header's spelling.
const ENV_KEYS: &[&str] = &[
    "base_url",
    "timeout",
    "json_by_default",
    "transport__user_agent",
    "transport__max_body_size",
    "transport__max_redirects",
];

/// Load the client configuration.
///
/// # Errors
/// Returns an error if the config file does not exist or a layer does not
/// match the [`ClientConfig`] shape.
pub fn load(path: Option<&Path>) -> anyhow::Result<ClientConfig> {
    if let Some(path) = path
        && !path.is_file()
    {
        anyhow::bail!("config file does not exist: {}", path.display());
    }

    figment(path)
        .extract()
        .context("invalid client configuration")
}

fn figment(path: Option<&Path>) -> Figment {
    let mut figment = Figment::from(Serialized::defaults(ClientConfig::default()));
    if let Some(path) = path {
        figment = figment.merge(Yaml::file(path));
    }
    figment.merge(env())
}

fn env() -> Env {
    Env::prefixed(ENV_PREFIX)
        .filter(|key| {
            ENV_KEYS
                .iter()
                .any(|known| key.as_str().eq_ignore_ascii_case(known))
        })
        .split("__")
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use modkit_fetch::DEFAULT_TIMEOUT;
    use std::time::Duration;

    #[test]
    fn test_defaults_without_file_or_env() {
        figment::Jail::expect_with(|_jail| {
            let config = load(None).map_err(|e| e.to_string())?;
            assert_eq!(config, ClientConfig::default());
            assert_eq!(config.timeout, DEFAULT_TIMEOUT);
            Ok(())
        });
    }

    #[test]
    fn test_yaml_then_env_layering() {
        figment::Jail::expect_with(|jail| {
            jail.create_file(
                "fetch.yaml",
                concat!(
                    "base_url: https://jsonplaceholder.typicode.com\n",
                    "timeout: 2s\n",
                    "headers:\n",
                    "  Accept: application/json\n",
                    "transport:\n",
                    "  max_redirects: 3\n",
                ),
            )?;
            jail.set_env("FETCH_TIMEOUT", "250ms");
            jail.set_env("FETCH_TRANSPORT__MAX_REDIRECTS", "0");

            let config = load(Some(Path::new("fetch.yaml"))).map_err(|e| e.to_string())?;
            assert_eq!(config.base_url, "https://jsonplaceholder.typicode.com");
            assert_eq!(config.timeout, Duration::from_millis(250));
            assert_eq!(config.headers.get("accept"), Some("application/json"));
            assert_eq!(config.transport.max_redirects, Some(0));
            assert!(config.json_by_default);
            Ok(())
        });
    }

    #[test]
    fn test_unrelated_env_is_ignored() {
        figment::Jail::expect_with(|jail| {
            jail.set_env("FETCH_UNRELATED", "1");
            jail.set_env("FETCH_HEADERS__X_API_KEY", "secret");
            jail.set_env("FETCH_TRANSPORT__USER_AGENT", "fetch-test/1.0");

            let config = load(None).map_err(|e| e.to_string())?;
            assert!(config.headers.is_empty());
            assert_eq!(
                config.transport.user_agent.as_deref(),
                Some("fetch-test/1.0")
            );
            assert_eq!(config.timeout, DEFAULT_TIMEOUT);
            Ok(())
        });
    }

    #[test]
    fn test_unknown_key_is_rejected() {
        figment::Jail::expect_with(|jail| {
            jail.create_file("fetch.yaml", "retries: 3")?;
            let err = load(Some(Path::new("fetch.yaml"))).unwrap_err();
            assert!(format!("{err:#}").contains("retries"), "{err:#}");
            Ok(())
        });
    }

    #[test]
    fn test_missing_file_is_an_error() {
        figment::Jail::expect_with(|_jail| {
            let err = load(Some(Path::new("absent.yaml"))).unwrap_err();
            assert!(err.to_string().contains("does not exist"));
            Ok(())
        });
    }
}
