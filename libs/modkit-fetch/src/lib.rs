#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
#![warn(warnings)]

//! Fetch-style HTTP request client for `ModKit`
//!
//! A thin, configurable layer over a hyper/tower transport:
//! - Client-level defaults (base address, timeout, headers) merged with
//!   per-call overrides, key by key
//! - Case-insensitive header handling
//! - Content-type driven payload encoding and response decoding
//! - A per-call deadline combined with a caller-owned
//!   [`CancellationToken`](tokio_util::sync::CancellationToken)
//! - Every failure classified into one [`ErrorKind`]
//! - Transparent response decompression and redirect following
//!
//! Nothing is retried; retry policy is a caller concern.
//!
//! # Example
//!
//! ```ignore
//! use modkit_fetch::{CallOptions, FetchClient};
//! use serde_json::json;
//! use std::time::Duration;
//!
//! let client = FetchClient::builder()
//!     .base_url("https://jsonplaceholder.typicode.com")
//!     .timeout(Duration::from_secs(5))
//!     .build()?;
//!
//! let post = client.get("/posts/1", CallOptions::default()).await?;
//!
//! let cancel = CancellationToken::new();
//! let created = client
//!     .post(
//!         "/posts",
//!         Some(json!({"title": "foo", "body": "bar", "userId": 1}).into()),
//!         CallOptions::new().cancel_on(cancel.clone()),
//!     )
//!     .await?;
//! ```

mod body;
mod builder;
mod cancel;
mod classify;
mod client;
mod config;
mod error;
mod headers;
mod redirect;
mod request;
mod resolve;
mod response;
mod transport;

pub use body::{RequestBody, encode};
pub use builder::FetchClientBuilder;
pub use cancel::{AbortReason, AbortSignal, with_cancellation};
pub use client::FetchClient;
pub use config::{
    CallOptions, ClientConfig, DEFAULT_MAX_BODY_SIZE, DEFAULT_MAX_REDIRECTS, DEFAULT_TIMEOUT,
    DEFAULT_USER_AGENT, EffectiveConfig, TransportOptions,
};
pub use error::{BoxError, BuildError, ErrorKind, FetchError};
pub use headers::{APPLICATION_JSON, HeaderMap, InvalidHeader, find_header, normalize};
pub use redirect::{RedirectLimit, RedirectPolicy};
pub use request::EffectiveRequest;
pub use resolve::resolve;
pub use response::{Content, ERROR_BODY_PREVIEW_LIMIT, RawResponse, interpret};
pub use transport::{ResponseBody, TransportService, default_transport};
