//! Blob metadata
//!
//! An ordered string map. Three well-known entries (`Content-Type`,
//! `Last-Modified`, `ETag`) live in the map like any other entry and are also
//! exposed through typed accessors. Everything else is "custom" metadata that
//! backends persist as user-defined object headers.

use chrono::{DateTime, SecondsFormat, Utc};

pub const CONTENT_TYPE: &str = "Content-Type";
pub const LAST_MODIFIED: &str = "Last-Modified";
pub const ETAG: &str = "ETag";

const RESERVED_KEYS: [&str; 3] = [CONTENT_TYPE, LAST_MODIFIED, ETAG];

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Metadata {
    entries: Vec<(String, String)>,
}

impl Metadata {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether `key` is one of the entries surfaced through typed accessors.
    pub fn is_reserved(key: &str) -> bool {
        RESERVED_KEYS.contains(&key)
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Insert or overwrite an entry, returning the previous value.
    ///
    /// Overwriting keeps the entry at its original position.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) -> Option<String> {
        let key = key.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => Some(std::mem::replace(&mut entry.1, value)),
            None => {
                self.entries.push((key, value));
                None
            }
        }
    }

    pub fn remove(&mut self, key: &str) -> Option<String> {
        let index = self.entries.iter().position(|(k, _)| k == key)?;
        Some(self.entries.remove(index).1)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// All entries in insertion order, reserved ones included.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Entries that are not reserved.
    pub fn custom(&self) -> impl Iterator<Item = (&str, &str)> {
        self.iter().filter(|(k, _)| !Self::is_reserved(k))
    }

    pub fn content_type(&self) -> Option<&str> {
        self.get(CONTENT_TYPE)
    }

    pub fn set_content_type(&mut self, content_type: impl Into<String>) {
        self.insert(CONTENT_TYPE, content_type);
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.set_content_type(content_type);
        self
    }

    /// Last modification time; `None` when absent or not an RFC 3339 timestamp.
    pub fn last_modified(&self) -> Option<DateTime<Utc>> {
        self.get(LAST_MODIFIED)
            .and_then(|v| DateTime::parse_from_rfc3339(v).ok())
            .map(|dt| dt.with_timezone(&Utc))
    }

    pub fn set_last_modified(&mut self, last_modified: DateTime<Utc>) {
        self.insert(
            LAST_MODIFIED,
            last_modified.to_rfc3339_opts(SecondsFormat::Secs, true),
        );
    }

    pub fn etag(&self) -> Option<&str> {
        self.get(ETAG)
    }

    pub fn set_etag(&mut self, etag: impl Into<String>) {
        self.insert(ETAG, etag);
    }

    pub fn with_entry(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(key, value);
        self
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Metadata {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut metadata = Metadata::new();
        for (k, v) in iter {
            metadata.insert(k, v);
        }
        metadata
    }
}

impl<K: Into<String>, V: Into<String>> Extend<(K, V)> for Metadata {
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        for (k, v) in iter {
            self.insert(k, v);
        }
    }
}
