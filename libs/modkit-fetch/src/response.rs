use crate::classify;
use crate::error::{BoxError, FetchError};
use crate::headers::{CONTENT_TYPE, HeaderMap, is_json_content_type};
use crate::transport::ResponseBody;
use bytes::Bytes;
use http::{Response, StatusCode};
use http_body_util::BodyExt;
use serde_json::Value;
use thiserror::Error;

/// Maximum bytes of an error body kept in `raw_body` and in the status message
pub const ERROR_BODY_PREVIEW_LIMIT: usize = 8 * 1024;

/// Decoded body of a successful call.
#[derive(Debug, Clone, PartialEq)]
pub enum Content {
    /// The response declared a JSON content type
    Json(Value),
    /// Any other content type, decoded as (lossy) UTF-8
    Text(String),
}

impl Content {
    #[must_use]
    pub fn as_json(&self) -> Option<&Value> {
        match self {
            Self::Json(value) => Some(value),
            Self::Text(_) => None,
        }
    }

    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            Self::Json(_) => None,
        }
    }

    /// Textual form: the text itself, or serialized JSON
    #[must_use]
    pub fn into_text(self) -> String {
        match self {
            Self::Text(text) => text,
            Self::Json(value) => value.to_string(),
        }
    }
}

/// A fully read response, before interpretation.
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub status: StatusCode,
    /// Reason phrase as sent by the server, or the canonical one
    pub status_text: String,
    pub headers: HeaderMap,
    /// `None` when an error body could not be read
    pub body: Option<Bytes>,
}

#[derive(Error, Debug)]
pub enum BodyReadError {
    #[error("response body too large: {actual} bytes exceeds limit of {limit} bytes")]
    TooLarge { limit: usize, actual: usize },

    #[error(transparent)]
    Transport(BoxError),
}

/// Read a transport response into a [`RawResponse`].
///
/// Bodies are read up to `max_body_size`. Failing to read a success body is a
/// [`FetchError::Network`]; failing to read an error body only leaves `body`
/// empty, so the status is never masked. Error bodies are kept whole here so
/// the detail can be found past [`ERROR_BODY_PREVIEW_LIMIT`].
pub async fn read_response(
    response: Response<ResponseBody>,
    max_body_size: usize,
) -> Result<RawResponse, FetchError> {
    let (parts, body) = response.into_parts();
    let status = parts.status;
    let status_text = parts
        .extensions
        .get::<hyper::ext::ReasonPhrase>()
        .map(|reason| String::from_utf8_lossy(reason.as_bytes()).into_owned())
        .or_else(|| status.canonical_reason().map(str::to_owned))
        .unwrap_or_default();
    let headers = HeaderMap::from(&parts.headers);

    let body = if status.is_success() {
        Some(
            read_body_limited(body, max_body_size)
                .await
                .map_err(classify::body_error)?,
        )
    } else {
        match read_body_limited(body, max_body_size).await {
            Ok(bytes) => Some(bytes),
            Err(e) => {
                tracing::debug!(error = %e, %status, "error body not readable");
                None
            }
        }
    };

    Ok(RawResponse {
        status,
        status_text,
        headers,
        body,
    })
}

/// Collect `body`, failing once more than `limit` decoded bytes arrive.
pub async fn read_body_limited(
    body: ResponseBody,
    limit: usize,
) -> Result<Bytes, BodyReadError> {
    let mut collected = Vec::new();
    let mut body = std::pin::pin!(body);

    while let Some(frame) = body.frame().await {
        let frame = frame.map_err(BodyReadError::Transport)?;
        if let Some(chunk) = frame.data_ref() {
            if collected.len() + chunk.len() > limit {
                return Err(BodyReadError::TooLarge {
                    limit,
                    actual: collected.len() + chunk.len(),
                });
            }
            collected.extend_from_slice(chunk);
        }
    }

    Ok(Bytes::from(collected))
}

/// Turn a raw response into the call's result.
///
/// - non-success status → [`FetchError::HttpStatus`]
/// - 204 / 205 → `None`, whatever the content type
/// - JSON content type → [`Content::Json`], or [`FetchError::Decoding`]
/// - anything else → [`Content::Text`]
///
/// # Errors
/// See above.
pub fn interpret(raw: &RawResponse, url: &str) -> Result<Option<Content>, FetchError> {
    if !raw.status.is_success() {
        return Err(classify::status_error(raw));
    }

    if matches!(raw.status, StatusCode::NO_CONTENT | StatusCode::RESET_CONTENT) {
        return Ok(None);
    }

    let body = raw.body.as_deref().unwrap_or_default();
    let is_json = raw
        .headers
        .get(CONTENT_TYPE)
        .is_some_and(is_json_content_type);

    if is_json {
        let value = serde_json::from_slice(body).map_err(|e| FetchError::Decoding {
            url: url.to_owned(),
            message: e.to_string(),
        })?;
        Ok(Some(Content::Json(value)))
    } else {
        Ok(Some(Content::Text(String::from_utf8_lossy(body).into_owned())))
    }
}
