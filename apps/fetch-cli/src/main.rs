mod config;

use clap::{Args, Parser, Subcommand};
use http::Method;
use modkit_fetch::{CallOptions, Content, ErrorKind, FetchClient, FetchError, RequestBody};
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

/// Issue HTTP requests through the `ModKit` fetch client
#[derive(Parser)]
#[command(name = "fetch")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Path to a YAML client configuration
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Log verbosity level (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(flatten)]
    overrides: Overrides,

    #[command(subcommand)]
    command: Commands,
}

/// Per-call overrides layered over the loaded configuration
#[derive(Args)]
struct Overrides {
    /// Base address for this call
    #[arg(long, global = true)]
    base_url: Option<String>,

    /// Deadline for this call, e.g. `250ms` or `5s`; `0s` disables it
    #[arg(long, global = true, value_parser = humantime::parse_duration)]
    timeout: Option<Duration>,

    /// Extra header as `Name: value` (repeatable)
    #[arg(short = 'H', long = "header", global = true, value_parser = parse_header)]
    headers: Vec<(String, String)>,
}

#[derive(Subcommand)]
enum Commands {
    /// Send a GET request
    Get(Target),
    /// Send a DELETE request
    Delete(Target),
    /// Send a POST request
    Post(WithPayload),
    /// Send a PUT request
    Put(WithPayload),
    /// Send a PATCH request
    Patch(WithPayload),
    /// Print the effective client configuration and exit
    Config,
}

#[derive(Args)]
struct Target {
    /// Absolute URL or path relative to the base address
    path: String,
}

#[derive(Args)]
struct WithPayload {
    /// Absolute URL or path relative to the base address
    path: String,

    /// Request payload; sent as text when `--text` is given or it is not JSON
    #[arg(short, long)]
    data: Option<String>,

    /// Send the payload verbatim as text
    #[arg(long, requires = "data")]
    text: bool,
}

impl WithPayload {
    fn payload(&self) -> Option<RequestBody> {
        let data = self.data.as_deref()?;
        if self.text {
            return Some(RequestBody::text(data));
        }
        Some(
            serde_json::from_str::<serde_json::Value>(data)
                .map_or_else(|_| RequestBody::text(data), RequestBody::from),
        )
    }
}

fn parse_header(raw: &str) -> Result<(String, String), String> {
    let (name, value) = raw
        .split_once(':')
        .ok_or_else(|| format!("expected `Name: value`, got `{raw}`"))?;
    let name = name.trim();
    if name.is_empty() {
        return Err(format!("empty header name in `{raw}`"));
    }
    Ok((name.to_owned(), value.trim().to_owned()))
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Cancel `token` on the first Ctrl-C.
fn cancel_on_interrupt(token: CancellationToken) {
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %e, "cannot listen for interrupt");
            return;
        }
        tracing::info!("interrupt received, cancelling request");
        token.cancel();
    });
}

fn call_options(overrides: Overrides, cancel: CancellationToken) -> CallOptions {
    let mut options = CallOptions::new()
        .headers(overrides.headers)
        .cancel_on(cancel);
    if let Some(base_url) = overrides.base_url {
        options = options.base_url(base_url);
    }
    if let Some(timeout) = overrides.timeout {
        options = options.timeout(timeout);
    }
    options
}

fn render(content: Option<Content>) -> anyhow::Result<Option<String>> {
    Ok(match content {
        Some(Content::Json(value)) => Some(serde_json::to_string_pretty(&value)?),
        Some(Content::Text(text)) => Some(text),
        None => None,
    })
}

/// Process exit status for a failed call
fn exit_code(kind: ErrorKind) -> u8 {
    match kind {
        ErrorKind::Network => 2,
        ErrorKind::Timeout => 3,
        ErrorKind::HttpStatus => 4,
        ErrorKind::Encoding => 5,
        ErrorKind::Decoding => 6,
        ErrorKind::Cancelled => 130,
        _ => 1,
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = config::load(cli.config.as_deref())?;

    let (method, target) = match cli.command {
        Commands::Config => {
            println!("{}", serde_json::to_string_pretty(&config)?);
            return Ok(());
        }
        Commands::Get(target) => (Method::GET, target.path),
        Commands::Delete(target) => (Method::DELETE, target.path),
        Commands::Post(with) => return send(config, Method::POST, &with, cli.overrides).await,
        Commands::Put(with) => return send(config, Method::PUT, &with, cli.overrides).await,
        Commands::Patch(with) => return send(config, Method::PATCH, &with, cli.overrides).await,
    };
    execute(config, method, &target, None, cli.overrides).await
}

async fn send(
    config: modkit_fetch::ClientConfig,
    method: Method,
    with: &WithPayload,
    overrides: Overrides,
) -> anyhow::Result<()> {
    let payload = with.payload();
    execute(config, method, &with.path, payload, overrides).await
}

async fn execute(
    config: modkit_fetch::ClientConfig,
    method: Method,
    target: &str,
    payload: Option<RequestBody>,
    overrides: Overrides,
) -> anyhow::Result<()> {
    let client = FetchClient::new(config)?;

    let cancel = CancellationToken::new();
    cancel_on_interrupt(cancel.clone());

    let content = client
        .request(method, target, payload, call_options(overrides, cancel))
        .await?;
    if let Some(out) = render(content)? {
        println!("{out}");
    }
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            if let Some(fetch) = err.downcast_ref::<FetchError>() {
                eprintln!("error [{}]: {fetch}", fetch.kind());
                return ExitCode::from(exit_code(fetch.kind()));
            }
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use serde_json::json;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_header() {
        assert_eq!(
            parse_header("Authorization: Bearer a:b").unwrap(),
            ("Authorization".to_owned(), "Bearer a:b".to_owned())
        );
        assert_eq!(
            parse_header("X-Empty:").unwrap(),
            ("X-Empty".to_owned(), String::new())
        );
        assert!(parse_header("no-colon").is_err());
        assert!(parse_header(": value").is_err());
    }

    #[test]
    fn test_global_overrides_after_subcommand() {
        let cli = Cli::try_parse_from([
            "fetch",
            "get",
            "/posts/1",
            "-H",
            "Accept: text/plain",
            "--timeout",
            "250ms",
            "--base-url",
            "https://example.com",
        ])
        .unwrap();

        assert!(matches!(&cli.command, Commands::Get(t) if t.path == "/posts/1"));
        let options = call_options(cli.overrides, CancellationToken::new());
        assert_eq!(options.timeout, Some(Duration::from_millis(250)));
        assert_eq!(options.base_url.as_deref(), Some("https://example.com"));
        assert_eq!(options.headers.get("accept"), Some("text/plain"));
        assert!(options.cancel.is_some());
    }

    #[test]
    fn test_text_requires_data() {
        assert!(Cli::try_parse_from(["fetch", "post", "/notes", "--text"]).is_err());
    }

    fn encoded(with: &WithPayload) -> String {
        let mut headers = modkit_fetch::HeaderMap::new();
        let body = modkit_fetch::encode(&Method::POST, with.payload(), &mut headers, true)
            .unwrap()
            .unwrap();
        String::from_utf8(body.to_vec()).unwrap()
    }

    #[test]
    fn test_payload_json_or_text() {
        let json = WithPayload {
            path: "/posts".to_owned(),
            data: Some(r#"{ "title": "foo" }"#.to_owned()),
            text: false,
        };
        assert_eq!(encoded(&json), r#"{"title":"foo"}"#);

        let forced_text = WithPayload { text: true, ..json };
        assert_eq!(encoded(&forced_text), r#""{ \"title\": \"foo\" }""#);

        let not_json = WithPayload {
            data: Some("hello".to_owned()),
            text: false,
            ..forced_text
        };
        assert_eq!(encoded(&not_json), r#""hello""#);

        let empty = WithPayload {
            data: None,
            ..not_json
        };
        assert!(empty.payload().is_none());
    }

    #[test]
    fn test_render() {
        assert_eq!(
            render(Some(Content::Json(json!({"id": 1})))).unwrap(),
            Some("{\n  \"id\": 1\n}".to_owned())
        );
        assert_eq!(
            render(Some(Content::Text("ok".to_owned()))).unwrap(),
            Some("ok".to_owned())
        );
        assert_eq!(render(None).unwrap(), None);
    }

    #[test]
    fn test_exit_codes_are_distinct_per_kind() {
        let kinds = [
            ErrorKind::Network,
            ErrorKind::Timeout,
            ErrorKind::Cancelled,
            ErrorKind::HttpStatus,
            ErrorKind::Encoding,
            ErrorKind::Decoding,
        ];
        let mut codes: Vec<u8> = kinds.into_iter().map(exit_code).collect();
        codes.sort_unstable();
        codes.dedup();
        assert_eq!(codes.len(), kinds.len());
        assert!(!codes.contains(&0));
        assert!(!codes.contains(&1));
    }
}
