//! Configuration module
//!
//! Storage and encoder settings are supplied as connection strings: semicolon
//! separated `Key=Value` pairs such as `Bucket=media;Path=uploads/;Region=us-east-1`.
//!
//! Only the shape of the string is validated at parse time. Individual values
//! (a region name, the reduced-redundancy flag) are checked when they are first
//! used, and no cross-field validation is performed.

use std::env;
use std::iter::Peekable;
use std::str::{Chars, FromStr};

use crate::error::ConfigError;

const KEY_BUCKET: &str = "Bucket";
const KEY_PATH: &str = "Path";
const KEY_REGION: &str = "Region";
const KEY_REDUCED_REDUNDANCY: &str = "ReducedRedundancy";
const KEY_PUBLIC_URL: &str = "PublicUrl";
const KEY_HOST: &str = "Host";
const KEY_ENDPOINT: &str = "Endpoint";
const KEY_PIPELINE_ID: &str = "PipelineId";
const KEY_PRESET_ID: &str = "PresetId";

/// Tokenized connection string.
///
/// Keys are matched case-insensitively; when a key is repeated the last value wins.
/// Values may be wrapped in single or double quotes, in which case they can contain
/// `;` and a doubled quote stands for a literal quote.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConnectionString {
    pairs: Vec<(String, String)>,
}

impl ConnectionString {
    pub fn parse(input: &str) -> Result<Self, ConfigError> {
        let mut parsed = ConnectionString::default();
        let mut chars = input.chars().peekable();

        while chars.peek().is_some() {
            let mut raw_key = String::new();
            let mut terminator = None;
            for c in chars.by_ref() {
                if c == '=' || c == ';' {
                    terminator = Some(c);
                    break;
                }
                raw_key.push(c);
            }
            let key = raw_key.trim();

            if terminator != Some('=') {
                if key.is_empty() {
                    continue;
                }
                return Err(ConfigError::Malformed(format!(
                    "segment `{}` is not a key=value pair",
                    key
                )));
            }
            if key.is_empty() {
                return Err(ConfigError::Malformed("empty key".to_string()));
            }

            skip_whitespace(&mut chars);
            let value = match chars.peek().copied() {
                Some(quote @ ('"' | '\'')) => {
                    chars.next();
                    let value = read_quoted(&mut chars, quote).ok_or_else(|| {
                        ConfigError::Malformed(format!("unterminated quote in value of `{}`", key))
                    })?;
                    skip_whitespace(&mut chars);
                    match chars.next() {
                        None | Some(';') => {}
                        Some(c) => {
                            return Err(ConfigError::Malformed(format!(
                                "unexpected `{}` after quoted value of `{}`",
                                c, key
                            )))
                        }
                    }
                    value
                }
                _ => {
                    let mut value = String::new();
                    for c in chars.by_ref() {
                        if c == ';' {
                            break;
                        }
                        value.push(c);
                    }
                    value.trim().to_string()
                }
            };

            parsed.insert(key, value);
        }

        Ok(parsed)
    }

    /// Value for `key`, compared case-insensitively.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v.as_str())
    }

    /// Like [`get`](Self::get), treating an empty value as absent.
    pub fn get_non_empty(&self, key: &str) -> Option<&str> {
        self.get(key).filter(|v| !v.is_empty())
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.pairs.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    fn insert(&mut self, key: &str, value: String) {
        match self
            .pairs
            .iter_mut()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
        {
            Some(pair) => pair.1 = value,
            None => self.pairs.push((key.to_string(), value)),
        }
    }
}

impl FromStr for ConnectionString {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

fn skip_whitespace(chars: &mut Peekable<Chars<'_>>) {
    while chars.next_if(|c| c.is_whitespace()).is_some() {}
}

fn read_quoted(chars: &mut Peekable<Chars<'_>>, quote: char) -> Option<String> {
    let mut value = String::new();
    while let Some(c) = chars.next() {
        if c == quote {
            if chars.next_if_eq(&quote).is_some() {
                value.push(quote);
                continue;
            }
            return Some(value);
        }
        value.push(c);
    }
    None
}

/// Read a connection string from the environment, loading `.env` first.
fn read_env(var: &str) -> Result<String, ConfigError> {
    dotenvy::dotenv().ok();
    env::var(var).map_err(|_| ConfigError::missing(format!("environment variable {}", var)))
}

/// Object-store connection settings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StorageConnection {
    bucket: String,
    path: String,
    region: Option<String>,
    reduced_redundancy: Option<String>,
    public_url: Option<String>,
    host: Option<String>,
    endpoint: Option<String>,
}

impl StorageConnection {
    pub fn parse(input: &str) -> Result<Self, ConfigError> {
        let cs = ConnectionString::parse(input)?;
        let path = cs.get(KEY_PATH).unwrap_or_default().to_string();
        let host = cs.get_non_empty(KEY_HOST).map(String::from);

        // An explicit PublicUrl wins over one derived from Host.
        let public_url = cs
            .get_non_empty(KEY_PUBLIC_URL)
            .map(String::from)
            .or_else(|| host.as_ref().map(|h| format!("//{}/{}", h, path)));

        Ok(Self {
            bucket: cs.get(KEY_BUCKET).unwrap_or_default().to_string(),
            path,
            region: cs.get_non_empty(KEY_REGION).map(String::from),
            reduced_redundancy: cs.get_non_empty(KEY_REDUCED_REDUNDANCY).map(String::from),
            public_url,
            host,
            endpoint: cs.get_non_empty(KEY_ENDPOINT).map(String::from),
        })
    }

    /// Parse the connection string held in environment variable `var`.
    pub fn from_env(var: &str) -> Result<Self, ConfigError> {
        Self::parse(&read_env(var)?)
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    /// Prefix prepended verbatim to every blob token.
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn region(&self) -> Option<&str> {
        self.region.as_deref()
    }

    /// Whether objects are written with the reduced-redundancy storage class.
    ///
    /// Absent means `false`; anything other than `true`/`false` is an error.
    pub fn reduced_redundancy(&self) -> Result<bool, ConfigError> {
        match self.reduced_redundancy.as_deref() {
            None => Ok(false),
            Some(v) if v.eq_ignore_ascii_case("true") => Ok(true),
            Some(v) if v.eq_ignore_ascii_case("false") => Ok(false),
            Some(v) => Err(ConfigError::invalid_value(KEY_REDUCED_REDUNDANCY, v)),
        }
    }

    /// Base URL that public blob links are built from.
    pub fn public_url(&self) -> Option<&str> {
        self.public_url.as_deref()
    }

    pub fn host(&self) -> Option<&str> {
        self.host.as_deref()
    }

    /// Custom endpoint for S3-compatible providers.
    pub fn endpoint(&self) -> Option<&str> {
        self.endpoint.as_deref()
    }

    /// Full backend key for `token`.
    pub fn key_for(&self, token: &str) -> String {
        format!("{}{}", self.path, token)
    }

    pub fn with_bucket(mut self, bucket: impl Into<String>) -> Self {
        self.bucket = bucket.into();
        self
    }

    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = path.into();
        self
    }

    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }

    pub fn with_reduced_redundancy(mut self, enabled: bool) -> Self {
        self.reduced_redundancy = Some(enabled.to_string());
        self
    }

    pub fn with_public_url(mut self, url: impl Into<String>) -> Self {
        self.public_url = Some(url.into());
        self
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }
}

impl FromStr for StorageConnection {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Transcoding service connection settings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EncoderConnection {
    path: String,
    region: Option<String>,
    pipeline_id: Option<String>,
    preset_id: Option<String>,
}

impl EncoderConnection {
    pub fn parse(input: &str) -> Result<Self, ConfigError> {
        let cs = ConnectionString::parse(input)?;

        Ok(Self {
            path: cs.get(KEY_PATH).unwrap_or_default().to_string(),
            region: cs.get_non_empty(KEY_REGION).map(String::from),
            pipeline_id: cs.get_non_empty(KEY_PIPELINE_ID).map(String::from),
            preset_id: cs.get_non_empty(KEY_PRESET_ID).map(String::from),
        })
    }

    pub fn from_env(var: &str) -> Result<Self, ConfigError> {
        Self::parse(&read_env(var)?)
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn region(&self) -> Option<&str> {
        self.region.as_deref()
    }

    pub fn pipeline_id(&self) -> Option<&str> {
        self.pipeline_id.as_deref()
    }

    pub fn preset_id(&self) -> Option<&str> {
        self.preset_id.as_deref()
    }

    pub fn key_for(&self, name: &str) -> String {
        format!("{}{}", self.path, name)
    }

    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = path.into();
        self
    }

    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }

    pub fn with_pipeline_id(mut self, id: impl Into<String>) -> Self {
        self.pipeline_id = Some(id.into());
        self
    }

    pub fn with_preset_id(mut self, id: impl Into<String>) -> Self {
        self.preset_id = Some(id.into());
        self
    }
}

impl FromStr for EncoderConnection {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_pairs_case_insensitive() {
        let cs = ConnectionString::parse("Bucket=media; path = uploads/ ;REGION=us-east-1").unwrap();
        assert_eq!(cs.get("bucket"), Some("media"));
        assert_eq!(cs.get("Path"), Some("uploads/"));
        assert_eq!(cs.get("Region"), Some("us-east-1"));
        assert_eq!(cs.get("Host"), None);
    }

    #[test]
    fn test_parse_ignores_empty_segments_and_last_key_wins() {
        let cs = ConnectionString::parse(";;Bucket=a;;bucket=b;").unwrap();
        assert_eq!(cs.get("Bucket"), Some("b"));
        assert_eq!(cs.iter().count(), 1);
    }

    #[test]
    fn test_parse_quoted_values() {
        let cs = ConnectionString::parse(r#"PublicUrl="https://cdn.example.com/a;b/";Name='it''s'"#)
            .unwrap();
        assert_eq!(cs.get("PublicUrl"), Some("https://cdn.example.com/a;b/"));
        assert_eq!(cs.get("Name"), Some("it's"));
    }

    #[test]
    fn test_parse_rejects_malformed() {
        assert!(matches!(
            ConnectionString::parse("Bucket"),
            Err(ConfigError::Malformed(_))
        ));
        assert!(matches!(
            ConnectionString::parse("Bucket=media;oops;Path=x"),
            Err(ConfigError::Malformed(_))
        ));
        assert!(matches!(
            ConnectionString::parse("=value"),
            Err(ConfigError::Malformed(_))
        ));
        assert!(matches!(
            ConnectionString::parse("Bucket=\"media"),
            Err(ConfigError::Malformed(_))
        ));
        assert!(matches!(
            ConnectionString::parse("Bucket=\"media\"x"),
            Err(ConfigError::Malformed(_))
        ));
    }

    #[test]
    fn test_parse_empty_string() {
        let conn = StorageConnection::parse("").unwrap();
        assert_eq!(conn, StorageConnection::default());
    }

    #[test]
    fn test_storage_connection_defaults() {
        let conn = StorageConnection::parse("Bucket=media").unwrap();
        assert_eq!(conn.bucket(), "media");
        assert_eq!(conn.path(), "");
        assert_eq!(conn.region(), None);
        assert_eq!(conn.reduced_redundancy(), Ok(false));
        assert_eq!(conn.public_url(), None);
        assert_eq!(conn.endpoint(), None);
    }

    #[test]
    fn test_storage_connection_key_for() {
        let conn: StorageConnection = "Bucket=media;Path=uploads/;Region=us-east-1".parse().unwrap();
        assert_eq!(conn.key_for("a.jpg"), "uploads/a.jpg");
        assert_eq!(conn.region(), Some("us-east-1"));
    }

    #[test]
    fn test_path_is_not_normalized() {
        let conn = StorageConnection::parse("Path=uploads").unwrap();
        assert_eq!(conn.key_for("a.jpg"), "uploadsa.jpg");
    }

    #[test]
    fn test_reduced_redundancy_deferred_validation() {
        let conn = StorageConnection::parse("ReducedRedundancy=True").unwrap();
        assert_eq!(conn.reduced_redundancy(), Ok(true));

        let conn = StorageConnection::parse("ReducedRedundancy=maybe").unwrap();
        assert!(matches!(
            conn.reduced_redundancy(),
            Err(ConfigError::InvalidValue { .. })
        ));
    }

    #[test]
    fn test_public_url_explicit_and_from_host() {
        let conn = StorageConnection::parse("PublicUrl=https://cdn.example.com/").unwrap();
        assert_eq!(conn.public_url(), Some("https://cdn.example.com/"));

        let conn = StorageConnection::parse("Host=cdn.example.com;Path=media/").unwrap();
        assert_eq!(conn.public_url(), Some("//cdn.example.com/media/"));

        let conn =
            StorageConnection::parse("Host=cdn.example.com;PublicUrl=https://other/").unwrap();
        assert_eq!(conn.public_url(), Some("https://other/"));

        let conn = StorageConnection::parse("PublicUrl=").unwrap();
        assert_eq!(conn.public_url(), None);
    }

    #[test]
    fn test_encoder_connection() {
        let conn = EncoderConnection::parse("PipelineId=p1;PresetId=pr1;Path=jobs/").unwrap();
        assert_eq!(conn.pipeline_id(), Some("p1"));
        assert_eq!(conn.preset_id(), Some("pr1"));
        assert_eq!(conn.key_for("in.mp4"), "jobs/in.mp4");
        assert_eq!(conn.region(), None);

        let conn = EncoderConnection::parse("Region=eu-west-1").unwrap();
        assert_eq!(conn.path(), "");
        assert_eq!(conn.pipeline_id(), None);
        assert_eq!(conn.preset_id(), None);
    }

    #[test]
    fn test_from_env_missing_variable() {
        let result = StorageConnection::from_env("COFFER_TEST_UNSET_CONNECTION_VARIABLE");
        assert!(matches!(result, Err(ConfigError::Missing(_))));
    }
}
