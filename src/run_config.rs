use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::LazyLock;
use std::time::Duration;

use crate::config::{MAX_TEST_DURATION_SECS, MAX_VIRTUAL_USERS};
use crate::error::PanelError;
use crate::script::strip_comments;

static DURATION_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d+)([smh])$").unwrap());

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Delete => "DELETE",
        }
    }

    /// Only these methods carry a request body into the generated script.
    pub fn allows_body(&self) -> bool {
        matches!(self, HttpMethod::Post | HttpMethod::Put | HttpMethod::Patch)
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One load-test submission as sent by the browser form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunConfig {
    #[serde(rename = "url")]
    pub target_url: String,
    pub method: HttpMethod,
    #[serde(rename = "vus")]
    pub virtual_users: u32,
    pub duration: String,
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    #[serde(default)]
    pub query_params: BTreeMap<String, String>,
    #[serde(default, rename = "body")]
    pub request_body: Option<String>,
}

impl RunConfig {
    /// Parse a raw request body, mapping any decode failure to `InvalidConfig`.
    pub fn from_json(raw: &[u8]) -> Result<Self, PanelError> {
        serde_json::from_slice(raw).map_err(|e| PanelError::InvalidConfig(e.to_string()))
    }

    pub fn validate(&self) -> Result<(), PanelError> {
        let parsed = url::Url::parse(&self.target_url).map_err(|e| {
            PanelError::InvalidConfig(format!("url {:?} is not valid: {}", self.target_url, e))
        })?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(PanelError::InvalidConfig(format!(
                "url scheme must be http or https, got {:?}",
                parsed.scheme()
            )));
        }

        if self.virtual_users == 0 || self.virtual_users > MAX_VIRTUAL_USERS {
            return Err(PanelError::InvalidConfig(format!(
                "vus must be between 1 and {}, got {}",
                MAX_VIRTUAL_USERS, self.virtual_users
            )));
        }

        self.test_duration()?;

        for name in self.headers.keys() {
            if name.trim().is_empty() {
                return Err(PanelError::InvalidConfig("header name must not be empty".into()));
            }
        }

        self.payload()?;
        Ok(())
    }

    /// The configured test duration, e.g. `"90s"` or `"2m"`. Capped at
    /// `MAX_TEST_DURATION_SECS`.
    pub fn test_duration(&self) -> Result<Duration, PanelError> {
        let invalid = || {
            PanelError::InvalidConfig(format!(
                "duration must look like 30s, 5m or 1h, got {:?}",
                self.duration
            ))
        };

        let caps = DURATION_PATTERN.captures(&self.duration).ok_or_else(invalid)?;
        let amount: u64 = caps[1].parse().map_err(|_| invalid())?;
        let secs = match &caps[2] {
            "s" => Some(amount),
            "m" => amount.checked_mul(60),
            _ => amount.checked_mul(3600),
        }
        .ok_or_else(invalid)?;

        if secs > MAX_TEST_DURATION_SECS {
            return Err(PanelError::InvalidConfig(format!(
                "duration {:?} exceeds the maximum of {}h",
                self.duration,
                MAX_TEST_DURATION_SECS / 3600
            )));
        }

        Ok(Duration::from_secs(secs))
    }

    /// Target URL with the query parameters appended.
    pub fn effective_url(&self) -> String {
        if self.query_params.is_empty() {
            return self.target_url.clone();
        }

        let query = url::form_urlencoded::Serializer::new(String::new())
            .extend_pairs(self.query_params.iter())
            .finish();

        let separator = if self.target_url.ends_with('?') || self.target_url.ends_with('&') {
            ""
        } else if self.target_url.contains('?') {
            "&"
        } else {
            "?"
        };

        format!("{}{}{}", self.target_url, separator, query)
    }

    /// Request body with comments stripped and parsed as JSON.
    ///
    /// Returns `None` for body-less methods and for blank bodies.
    pub fn payload(&self) -> Result<Option<serde_json::Value>, PanelError> {
        if !self.method.allows_body() {
            return Ok(None);
        }
        let Some(raw) = self.request_body.as_deref() else {
            return Ok(None);
        };

        let cleaned = strip_comments(raw);
        if cleaned.trim().is_empty() {
            return Ok(None);
        }

        serde_json::from_str(&cleaned)
            .map(Some)
            .map_err(|e| PanelError::InvalidConfig(format!("request body is not valid JSON: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(url: &str) -> RunConfig {
        RunConfig {
            target_url: url.to_string(),
            method: HttpMethod::Get,
            virtual_users: 5,
            duration: "10s".to_string(),
            headers: BTreeMap::new(),
            query_params: BTreeMap::new(),
            request_body: None,
        }
    }

    #[test]
    fn test_deserialize_form_field_names() {
        let raw = br#"{
            "url": "https://example.test/ping",
            "method": "POST",
            "vus": 3,
            "duration": "1m",
            "headers": {"X-Token": "abc"},
            "queryParams": {"page": "2"},
            "body": "{\"a\": 1}"
        }"#;
        let cfg = RunConfig::from_json(raw).unwrap();
        assert_eq!(cfg.target_url, "https://example.test/ping");
        assert_eq!(cfg.method, HttpMethod::Post);
        assert_eq!(cfg.virtual_users, 3);
        assert_eq!(cfg.headers.get("X-Token").map(String::as_str), Some("abc"));
        assert_eq!(cfg.query_params.len(), 1);
        assert!(cfg.request_body.is_some());
    }

    #[test]
    fn test_missing_optional_maps_default_to_empty() {
        let raw = br#"{"url": "https://example.test", "method": "GET", "vus": 1, "duration": "5s"}"#;
        let cfg = RunConfig::from_json(raw).unwrap();
        assert!(cfg.headers.is_empty());
        assert!(cfg.query_params.is_empty());
        assert!(cfg.request_body.is_none());
    }

    #[test]
    fn test_unknown_method_rejected() {
        let raw = br#"{"url": "https://example.test", "method": "TRACE", "vus": 1, "duration": "5s"}"#;
        let err = RunConfig::from_json(raw).unwrap_err();
        assert!(matches!(err, PanelError::InvalidConfig(_)));
    }

    #[test]
    fn test_validate_accepts_example() {
        assert!(config("https://example.test/ping").validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_url() {
        assert!(config("not a url").validate().is_err());
        assert!(config("ftp://example.test/file").validate().is_err());
    }

    #[test]
    fn test_validate_vus_bounds() {
        let mut cfg = config("https://example.test");
        cfg.virtual_users = 0;
        assert!(cfg.validate().is_err());
        cfg.virtual_users = MAX_VIRTUAL_USERS + 1;
        assert!(cfg.validate().is_err());
        cfg.virtual_users = MAX_VIRTUAL_USERS;
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn test_duration_grammar() {
        let mut cfg = config("https://example.test");
        for ok in ["1s", "30s", "5m", "2h"] {
            cfg.duration = ok.to_string();
            assert!(cfg.validate().is_ok(), "{} should be accepted", ok);
        }
        for bad in ["", "10", "s", "1.5m", "10d", " 10s", "10s ", "-1s"] {
            cfg.duration = bad.to_string();
            assert!(cfg.validate().is_err(), "{:?} should be rejected", bad);
        }
    }

    #[test]
    fn test_duration_conversion() {
        let mut cfg = config("https://example.test");
        cfg.duration = "2m".to_string();
        assert_eq!(cfg.test_duration().unwrap(), Duration::from_secs(120));
        cfg.duration = "1h".to_string();
        assert_eq!(cfg.test_duration().unwrap(), Duration::from_secs(3600));
    }

    #[test]
    fn test_duration_upper_bound() {
        let mut cfg = config("https://example.test");
        cfg.duration = "168h".to_string();
        assert!(cfg.validate().is_ok());
        for bad in ["169h", "18446744073709551615s", "307445734561825860m", "99999999999999999999s"] {
            cfg.duration = bad.to_string();
            assert!(
                matches!(cfg.validate(), Err(PanelError::InvalidConfig(_))),
                "{:?} should be rejected",
                bad
            );
        }
    }

    #[test]
    fn test_effective_url_trailing_separator() {
        let mut cfg = config("https://example.test/a?");
        cfg.query_params.insert("page".into(), "2".into());
        assert_eq!(cfg.effective_url(), "https://example.test/a?page=2");

        cfg.target_url = "https://example.test/a?q=x&".into();
        assert_eq!(cfg.effective_url(), "https://example.test/a?q=x&page=2");
    }

    #[test]
    fn test_effective_url_without_params() {
        let cfg = config("https://example.test/ping");
        assert_eq!(cfg.effective_url(), "https://example.test/ping");
    }

    #[test]
    fn test_effective_url_starts_query() {
        let mut cfg = config("https://example.test/items");
        cfg.query_params.insert("page".into(), "2".into());
        assert_eq!(cfg.effective_url(), "https://example.test/items?page=2");
    }

    #[test]
    fn test_effective_url_extends_query() {
        let mut cfg = config("https://example.test/items?q=x");
        cfg.query_params.insert("sort".into(), "asc".into());
        assert_eq!(cfg.effective_url(), "https://example.test/items?q=x&sort=asc");
    }

    #[test]
    fn test_effective_url_encodes_values() {
        let mut cfg = config("https://example.test/search");
        cfg.query_params.insert("q".into(), "a b&c".into());
        assert_eq!(cfg.effective_url(), "https://example.test/search?q=a+b%26c");
    }

    #[test]
    fn test_payload_ignored_for_get() {
        let mut cfg = config("https://example.test");
        cfg.request_body = Some("not json".into());
        assert_eq!(cfg.payload().unwrap(), None);
    }

    #[test]
    fn test_payload_strips_comments() {
        let mut cfg = config("https://example.test");
        cfg.method = HttpMethod::Post;
        cfg.request_body = Some("{\n  // user id\n  \"id\": 7 /* fixed */\n}".into());
        assert_eq!(cfg.payload().unwrap(), Some(serde_json::json!({"id": 7})));
    }

    #[test]
    fn test_payload_blank_is_none() {
        let mut cfg = config("https://example.test");
        cfg.method = HttpMethod::Put;
        cfg.request_body = Some("  // nothing here\n".into());
        assert_eq!(cfg.payload().unwrap(), None);
    }

    #[test]
    fn test_invalid_body_rejected() {
        let mut cfg = config("https://example.test");
        cfg.method = HttpMethod::Patch;
        cfg.request_body = Some("{\"id\": }".into());
        let err = cfg.validate().unwrap_err();
        assert!(err.to_string().contains("request body"));
    }
}
