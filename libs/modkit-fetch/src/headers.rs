//! Case-insensitive header collection.
//!
//! Every header representation the client accepts (plain maps, ordered
//! name/value lists, `http::HeaderMap`) is folded into [`HeaderMap`], which
//! keeps exactly one entry per case-insensitive name. Later writes win.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use thiserror::Error;

/// Name of the content type header, as written when the client defaults it
pub const CONTENT_TYPE: &str = "Content-Type";

/// Name of the user agent header
pub const USER_AGENT: &str = "User-Agent";

/// Media type used for JSON payloads
pub const APPLICATION_JSON: &str = "application/json";

/// A header that cannot be expressed on the wire
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid header '{name}': {reason}")]
pub struct InvalidHeader {
    pub name: String,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Entry {
    name: String,
    value: String,
}

/// Header mapping with case-insensitive names.
///
/// Keys are folded to ASCII lowercase for comparison; the most recently
/// written spelling of the name is kept for display and for the wire.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(
    from = "BTreeMap<String, String>",
    into = "BTreeMap<String, String>"
)]
pub struct HeaderMap {
    entries: BTreeMap<String, Entry>,
}

fn fold(name: &str) -> String {
    name.to_ascii_lowercase()
}

impl HeaderMap {
    /// Create an empty header map
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a header, replacing any entry whose name differs only in case.
    ///
    /// Returns the previous value, if any.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) -> Option<String> {
        let name = name.into();
        let entry = Entry {
            value: value.into(),
            name: name.clone(),
        };
        self.entries.insert(fold(&name), entry).map(|old| old.value)
    }

    /// Case-insensitive lookup
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries.get(&fold(name)).map(|e| e.value.as_str())
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(&fold(name))
    }

    /// Remove a header regardless of the case it was written in
    pub fn remove(&mut self, name: &str) -> Option<String> {
        self.entries.remove(&fold(name)).map(|e| e.value)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate over `(name, value)` pairs, ordered by folded name
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries
            .values()
            .map(|e| (e.name.as_str(), e.value.as_str()))
    }

    /// Overlay `other` onto `self` key by key; entries of `other` win.
    pub fn merge_from(&mut self, other: &HeaderMap) {
        for (key, entry) in &other.entries {
            self.entries.insert(key.clone(), entry.clone());
        }
    }

    /// Convert to the wire representation.
    ///
    /// # Errors
    /// Returns [`InvalidHeader`] for names or values that HTTP cannot carry.
    pub fn to_http(&self) -> Result<http::HeaderMap, InvalidHeader> {
        let mut out = http::HeaderMap::with_capacity(self.len());
        for (name, value) in self.iter() {
            let header_name =
                http::header::HeaderName::from_bytes(name.as_bytes()).map_err(|e| {
                    InvalidHeader {
                        name: name.to_owned(),
                        reason: e.to_string(),
                    }
                })?;
            let header_value =
                http::header::HeaderValue::from_str(value).map_err(|e| InvalidHeader {
                    name: name.to_owned(),
                    reason: e.to_string(),
                })?;
            out.insert(header_name, header_value);
        }
        Ok(out)
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for HeaderMap {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = Self::new();
        map.extend(iter);
        map
    }
}

impl<K: Into<String>, V: Into<String>> Extend<(K, V)> for HeaderMap {
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        for (name, value) in iter {
            self.insert(name, value);
        }
    }
}

impl<K: Into<String>, V: Into<String>> From<Vec<(K, V)>> for HeaderMap {
    fn from(pairs: Vec<(K, V)>) -> Self {
        pairs.into_iter().collect()
    }
}

impl<K: Into<String>, V: Into<String>, const N: usize> From<[(K, V); N]> for HeaderMap {
    fn from(pairs: [(K, V); N]) -> Self {
        pairs.into_iter().collect()
    }
}

impl<K: Into<String>, V: Into<String>, S> From<HashMap<K, V, S>> for HeaderMap {
    fn from(map: HashMap<K, V, S>) -> Self {
        map.into_iter().collect()
    }
}

impl<K: Into<String>, V: Into<String>> From<BTreeMap<K, V>> for HeaderMap {
    fn from(map: BTreeMap<K, V>) -> Self {
        map.into_iter().collect()
    }
}

impl From<&http::HeaderMap> for HeaderMap {
    fn from(headers: &http::HeaderMap) -> Self {
        headers
            .iter()
            .map(|(name, value)| {
                (
                    name.as_str().to_owned(),
                    String::from_utf8_lossy(value.as_bytes()).into_owned(),
                )
            })
            .collect()
    }
}

impl From<HeaderMap> for BTreeMap<String, String> {
    fn from(map: HeaderMap) -> Self {
        map.entries
            .into_values()
            .map(|e| (e.name, e.value))
            .collect()
    }
}

/// Reduce any supported header representation to a [`HeaderMap`].
#[must_use]
pub fn normalize(input: impl Into<HeaderMap>) -> HeaderMap {
    input.into()
}

/// Case-insensitive header lookup.
#[must_use]
pub fn find_header<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name)
}

/// Whether a content type value denotes JSON
#[must_use]
pub fn is_json_content_type(content_type: &str) -> bool {
    content_type
        .to_ascii_lowercase()
        .contains(APPLICATION_JSON)
}
