//! Outgoing payloads and their content-type driven encoding.

use crate::error::FetchError;
use crate::headers::{APPLICATION_JSON, CONTENT_TYPE, HeaderMap, is_json_content_type};
use bytes::Bytes;
use serde::Serialize;

const TEXT_PLAIN: &str = "text/plain; charset=utf-8";
const OCTET_STREAM: &str = "application/octet-stream";

#[derive(Debug, Clone)]
enum Repr {
    /// Structured data, or the serializer's error message
    Structured(Result<serde_json::Value, String>),
    /// Text, JSON-encoded as a string literal under a JSON content type
    Text(String),
    /// Pre-encoded bytes, always sent as-is
    Bytes(Bytes),
}

/// Payload of a POST/PUT/PATCH call.
///
/// Structured payloads are serialized according to the effective content
/// type at call time. A serialization failure is captured here and reported
/// as [`FetchError::Encoding`] by the call, before anything is sent.
///
/// ```ignore
/// #[derive(Serialize)]
/// struct NewPost<'a> { title: &'a str, body: &'a str, user_id: u32 }
///
/// let data = RequestBody::json(&NewPost { title: "t", body: "b", user_id: 1 });
/// client.post("/posts", Some(data), CallOptions::default()).await?;
/// ```
#[derive(Debug, Clone)]
pub struct RequestBody(Repr);

impl RequestBody {
    /// Structured payload from any serializable value
    #[must_use]
    pub fn json<T: Serialize + ?Sized>(value: &T) -> Self {
        Self(Repr::Structured(
            serde_json::to_value(value).map_err(|e| e.to_string()),
        ))
    }

    /// Text payload
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self(Repr::Text(text.into()))
    }

    /// Pre-encoded payload
    #[must_use]
    pub fn bytes(bytes: impl Into<Bytes>) -> Self {
        Self(Repr::Bytes(bytes.into()))
    }

    fn default_content_type(&self, json_by_default: bool) -> &'static str {
        match (&self.0, json_by_default) {
            (_, true) | (Repr::Structured(_), false) => APPLICATION_JSON,
            (Repr::Text(_), false) => TEXT_PLAIN,
            (Repr::Bytes(_), false) => OCTET_STREAM,
        }
    }

    fn into_json(self) -> Result<Bytes, FetchError> {
        match self.0 {
            Repr::Structured(Ok(value)) => serde_json::to_vec(&value)
                .map(Bytes::from)
                .map_err(|e| FetchError::encoding(e.to_string())),
            Repr::Structured(Err(message)) => Err(FetchError::encoding(message)),
            Repr::Text(text) => serde_json::to_vec(&text)
                .map(Bytes::from)
                .map_err(|e| FetchError::encoding(e.to_string())),
            Repr::Bytes(bytes) => Ok(bytes),
        }
    }

    fn into_raw(self, content_type: &str) -> Result<Bytes, FetchError> {
        match self.0 {
            Repr::Structured(Ok(serde_json::Value::String(text))) | Repr::Text(text) => {
                Ok(Bytes::from(text))
            }
            Repr::Structured(Ok(_)) => Err(FetchError::encoding(format!(
                "structured payload cannot be sent as '{content_type}' without pre-encoding"
            ))),
            Repr::Structured(Err(message)) => Err(FetchError::encoding(message)),
            Repr::Bytes(bytes) => Ok(bytes),
        }
    }
}

impl From<serde_json::Value> for RequestBody {
    fn from(value: serde_json::Value) -> Self {
        Self(Repr::Structured(Ok(value)))
    }
}

impl From<String> for RequestBody {
    fn from(text: String) -> Self {
        Self::text(text)
    }
}

impl From<&str> for RequestBody {
    fn from(text: &str) -> Self {
        Self::text(text)
    }
}

impl From<Bytes> for RequestBody {
    fn from(bytes: Bytes) -> Self {
        Self::bytes(bytes)
    }
}

impl From<Vec<u8>> for RequestBody {
    fn from(bytes: Vec<u8>) -> Self {
        Self::bytes(bytes)
    }
}

/// Whether requests with this method may carry a payload
fn carries_body(method: &http::Method) -> bool {
    !matches!(*method, http::Method::GET | http::Method::HEAD)
}

/// Encode `data` for the wire according to the content type in `headers`.
///
/// When no content type is set one is defaulted (normally
/// `application/json`) and written into `headers`. Methods without a body
/// and absent data leave `headers` untouched and produce no body.
///
/// # Errors
/// Returns [`FetchError::Encoding`] when the payload cannot be represented
/// in the effective content type.
pub fn encode(
    method: &http::Method,
    data: Option<RequestBody>,
    headers: &mut HeaderMap,
    json_by_default: bool,
) -> Result<Option<Bytes>, FetchError> {
    let Some(data) = data else {
        return Ok(None);
    };
    if !carries_body(method) {
        return Ok(None);
    }

    let content_type = if let Some(content_type) = headers.get(CONTENT_TYPE) {
        content_type.to_owned()
    } else {
        let content_type = data.default_content_type(json_by_default);
        headers.insert(CONTENT_TYPE, content_type);
        content_type.to_owned()
    };

    let body = if is_json_content_type(&content_type) {
        data.into_json()?
    } else {
        data.into_raw(&content_type)?
    };
    tracing::trace!(bytes = body.len(), content_type = %content_type, "encoded request body");
    Ok(Some(body))
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::headers::normalize;
    use http::Method;
    use serde_json::json;

    struct Unserializable;

    impl Serialize for Unserializable {
        fn serialize<S: serde::Serializer>(&self, _: S) -> Result<S::Ok, S::Error> {
            Err(serde::ser::Error::custom("cannot serialize this value"))
        }
    }

    #[test]
    fn test_post_without_content_type_defaults_to_json() {
        let mut headers = HeaderMap::new();
        let body = encode(
            &Method::POST,
            Some(json!({"a": 1}).into()),
            &mut headers,
            true,
        )
        .unwrap()
        .unwrap();

        assert_eq!(&body[..], br#"{"a":1}"#);
        assert_eq!(headers.get("content-type"), Some("application/json"));
    }

    #[test]
    fn test_text_plain_passes_payload_through() {
        let mut headers = normalize([("Content-Type", "text/plain")]);
        let body = encode(&Method::POST, Some("a=1 & b".into()), &mut headers, true)
            .unwrap()
            .unwrap();

        assert_eq!(&body[..], b"a=1 & b");
        assert_eq!(headers.get("content-type"), Some("text/plain"));
        assert_eq!(headers.len(), 1);
    }

    #[test]
    fn test_get_and_head_never_carry_a_body() {
        for method in [Method::GET, Method::HEAD] {
            let mut headers = HeaderMap::new();
            let body = encode(&method, Some(json!({"a": 1}).into()), &mut headers, true).unwrap();
            assert!(body.is_none());
            assert!(headers.is_empty(), "{method} must not get a content type");
        }
    }

    #[test]
    fn test_absent_data_sends_nothing() {
        let mut headers = HeaderMap::new();
        assert!(encode(&Method::PUT, None, &mut headers, true).unwrap().is_none());
        assert!(headers.is_empty());
    }

    #[test]
    fn test_serialization_failure_is_encoding_error() {
        let mut headers = HeaderMap::new();
        let err = encode(
            &Method::POST,
            Some(RequestBody::json(&Unserializable)),
            &mut headers,
            true,
        )
        .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Encoding);
        assert!(err.to_string().contains("cannot serialize this value"));
    }

    #[test]
    fn test_text_under_json_is_a_json_string() {
        let mut headers = HeaderMap::new();
        let body = encode(&Method::POST, Some("hello".into()), &mut headers, true)
            .unwrap()
            .unwrap();
        assert_eq!(&body[..], br#""hello""#);
    }

    #[test]
    fn test_bytes_are_never_reencoded() {
        let mut headers = normalize([("content-type", "application/json; charset=utf-8")]);
        let body = encode(
            &Method::PATCH,
            Some(Bytes::from_static(br#"{"raw":true}"#).into()),
            &mut headers,
            true,
        )
        .unwrap()
        .unwrap();
        assert_eq!(&body[..], br#"{"raw":true}"#);
    }

    #[test]
    fn test_structured_payload_rejected_for_non_json_type() {
        let mut headers = normalize([("Content-Type", "application/x-www-form-urlencoded")]);
        let err = encode(&Method::POST, Some(json!({"a": 1}).into()), &mut headers, true)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Encoding);

        let body = encode(&Method::POST, Some(json!("a=1").into()), &mut headers, true)
            .unwrap()
            .unwrap();
        assert_eq!(&body[..], b"a=1");
    }

    #[test]
    fn test_json_default_can_be_turned_off() {
        let mut headers = HeaderMap::new();
        let body = encode(&Method::POST, Some("plain".into()), &mut headers, false)
            .unwrap()
            .unwrap();
        assert_eq!(&body[..], b"plain");
        assert_eq!(headers.get("content-type"), Some(TEXT_PLAIN));

        let mut headers = HeaderMap::new();
        encode(&Method::POST, Some(vec![1_u8, 2].into()), &mut headers, false).unwrap();
        assert_eq!(headers.get("content-type"), Some(OCTET_STREAM));

        let mut headers = HeaderMap::new();
        encode(&Method::POST, Some(json!([1]).into()), &mut headers, false).unwrap();
        assert_eq!(headers.get("content-type"), Some(APPLICATION_JSON));
    }
}
