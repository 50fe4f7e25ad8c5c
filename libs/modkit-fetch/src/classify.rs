//! Re-expression of every failure as a [`FetchError`].

use crate::cancel::AbortReason;
use crate::error::{BoxError, FetchError};
use crate::headers::{CONTENT_TYPE, is_json_content_type};
use crate::response::{BodyReadError, ERROR_BODY_PREVIEW_LIMIT, RawResponse};
use serde_json::Value;

/// Classify a non-success response.
///
/// The message is `"<status> <reason>"`, with `" - <detail>"` appended when
/// the body yields one: the `message` or `error` field of a JSON body, else
/// the whole JSON body, else the raw text. An unreadable or unparsable body
/// never hides the status. The detail is taken from the whole body; the
/// detail and `raw_body` are then cut to [`ERROR_BODY_PREVIEW_LIMIT`] bytes.
pub fn status_error(raw: &RawResponse) -> FetchError {
    let mut message = format!("{} {}", raw.status.as_u16(), raw.status_text);
    let text = raw.body.as_ref().map(|body| String::from_utf8_lossy(body));

    if let Some(detail) = text.as_deref().and_then(|text| detail(raw, text)) {
        message.push_str(" - ");
        message.push_str(preview(&detail));
    }

    FetchError::HttpStatus {
        status: raw.status,
        message,
        raw_body: text.as_deref().map(|text| preview(text).to_owned()),
    }
}

/// At most [`ERROR_BODY_PREVIEW_LIMIT`] bytes of `text`, cut on a char boundary
fn preview(text: &str) -> &str {
    &text[..text.floor_char_boundary(ERROR_BODY_PREVIEW_LIMIT)]
}

fn detail(raw: &RawResponse, text: &str) -> Option<String> {
    let is_json = raw
        .headers
        .get(CONTENT_TYPE)
        .is_some_and(is_json_content_type);

    if is_json && let Ok(value) = serde_json::from_str::<Value>(text) {
        let field = ["message", "error"]
            .into_iter()
            .filter_map(|key| value.get(key))
            .find(|field| is_truthy(field));
        return Some(match field {
            Some(Value::String(s)) => s.clone(),
            Some(other) => other.to_string(),
            None => value.to_string(),
        });
    }

    (!text.is_empty()).then(|| text.to_owned())
}

/// JSON values that count as "present" for detail extraction
fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f.abs() > 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// Join an error and its sources: `"outer: inner: root"`
fn error_chain(err: &(dyn std::error::Error + 'static)) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        let text = cause.to_string();
        if !message.contains(&text) {
            message.push_str(": ");
            message.push_str(&text);
        }
        source = cause.source();
    }
    message
}

/// A transport failure not caused by the abort signal
pub fn transport_error(err: BoxError) -> FetchError {
    FetchError::Network {
        message: error_chain(err.as_ref()),
        source: Some(err),
    }
}

/// A failure while reading a success body
pub fn body_error(err: BodyReadError) -> FetchError {
    match err {
        BodyReadError::TooLarge { limit, actual } => FetchError::network(format!(
            "response body too large: {actual} bytes exceeds limit of {limit} bytes"
        )),
        BodyReadError::Transport(err) => transport_error(err),
    }
}

/// An exchange cut short by the call's abort signal
pub fn aborted(reason: AbortReason, method: http::Method, url: String) -> FetchError {
    match reason {
        AbortReason::Timeout(timeout) => FetchError::Timeout {
            method,
            url,
            timeout,
        },
        AbortReason::Cancelled => FetchError::Cancelled { method, url },
    }
}
