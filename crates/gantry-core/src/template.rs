//! Request templates and parameter substitution
//!
//! A `RequestTemplate` is the reusable shape of an API call: base URL, HTTP
//! method, and ordered default path/query parameters. Substituting caller
//! overrides derives a single-use `ConcreteRequest`; the template itself is
//! never mutated.

use crate::error::{Error, Result};
use serde_json::Value;
use url::Url;

/// HTTP method for a request
///
/// Methods are a closed set mapped to transport calls through a fixed table,
/// never resolved by name at runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
    Patch,
}

impl HttpMethod {
    /// Canonical wire spelling
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Delete => "DELETE",
            HttpMethod::Patch => "PATCH",
        }
    }
}

/// Ordered parameter list; `None` values mark bare path segments or dropped
/// query entries
pub type Params = Vec<(String, Option<String>)>;

/// Reusable request shape with default path/query parameters
#[derive(Debug, Clone)]
pub struct RequestTemplate {
    base_url: String,
    method: HttpMethod,
    path_defaults: Params,
    query_defaults: Params,
    custom_headers: Vec<(String, String)>,
}

impl RequestTemplate {
    /// Create a template for `base_url`, normalizing it to end with `/`
    pub fn new(base_url: &str, method: HttpMethod) -> Result<Self> {
        Url::parse(base_url).map_err(|e| Error::HttpRequest {
            message: format!("invalid base URL {base_url}: {e}"),
            source: Some(Box::new(e)),
        })?;
        let base_url = if base_url.ends_with('/') {
            base_url.to_string()
        } else {
            format!("{base_url}/")
        };
        Ok(Self {
            base_url,
            method,
            path_defaults: Vec::new(),
            query_defaults: Vec::new(),
            custom_headers: Vec::new(),
        })
    }

    /// Append a default path entry; `None` renders the bare name segment
    pub fn with_path_default(mut self, name: &str, value: Option<&str>) -> Self {
        self.path_defaults
            .push((name.to_string(), value.map(String::from)));
        self
    }

    /// Append a default query entry; `None` values are dropped at render time
    pub fn with_query_default(mut self, name: &str, value: Option<&str>) -> Self {
        self.query_defaults
            .push((name.to_string(), value.map(String::from)));
        self
    }

    /// Attach a custom header sent with every call built from this template
    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.custom_headers
            .push((name.to_string(), value.to_string()));
        self
    }

    pub fn method(&self) -> HttpMethod {
        self.method
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Merge caller overrides into the defaults and build a concrete request
    ///
    /// Overrides replace matching defaults by name; unmatched defaults keep
    /// their value and override-only entries append. Single pass, idempotent,
    /// and non-mutating.
    pub fn substitute(
        &self,
        path_overrides: &Params,
        query_overrides: &Params,
        body: Option<Value>,
    ) -> ConcreteRequest {
        let path = render_path(&merge_params(&self.path_defaults, path_overrides));
        let query = render_query(&merge_params(&self.query_defaults, query_overrides));
        ConcreteRequest {
            url: format!("{}{}{}", self.base_url, path, query),
            method: self.method,
            body,
            headers: self.custom_headers.clone(),
        }
    }
}

/// Fully resolved, single-use request ready for dispatch
#[derive(Debug, Clone)]
pub struct ConcreteRequest {
    pub url: String,
    pub method: HttpMethod,
    pub body: Option<Value>,
    pub headers: Vec<(String, String)>,
}

fn merge_params(defaults: &Params, overrides: &Params) -> Params {
    let mut merged = defaults.clone();
    for (name, value) in overrides {
        match merged.iter_mut().find(|(n, _)| n == name) {
            Some(entry) => entry.1 = value.clone(),
            None => merged.push((name.clone(), value.clone())),
        }
    }
    merged
}

/// Render path entries in order as `name/value` segments
///
/// A `None` value omits the value segment entirely, leaving the bare name; an
/// empty string keeps a zero-length value segment.
fn render_path(entries: &Params) -> String {
    let mut segments: Vec<&str> = Vec::new();
    for (name, value) in entries {
        segments.push(name);
        if let Some(value) = value {
            segments.push(value);
        }
    }
    segments.join("/")
}

/// Render query entries as `name=value` pairs, `?`-prefixed only if non-empty
fn render_query(entries: &Params) -> String {
    let pairs: Vec<String> = entries
        .iter()
        .filter_map(|(name, value)| value.as_ref().map(|v| format!("{name}={v}")))
        .collect();
    if pairs.is_empty() {
        String::new()
    } else {
        format!("?{}", pairs.join("&"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn template() -> RequestTemplate {
        RequestTemplate::new("https://api.example.com/v1", HttpMethod::Get).unwrap()
    }

    #[test]
    fn test_base_url_normalized() {
        assert_eq!(template().base_url(), "https://api.example.com/v1/");
        let already = RequestTemplate::new("https://api.example.com/v1/", HttpMethod::Get).unwrap();
        assert_eq!(already.base_url(), "https://api.example.com/v1/");
    }

    #[test]
    fn test_invalid_base_url() {
        assert!(RequestTemplate::new("not a url", HttpMethod::Get).is_err());
    }

    #[test]
    fn test_query_override_replaces_default() {
        let template = template().with_query_default("key", Some("abc"));
        let request = template.substitute(
            &vec![],
            &vec![("key".to_string(), Some("xyz".to_string()))],
            None,
        );
        assert_eq!(request.url, "https://api.example.com/v1/?key=xyz");
    }

    #[test]
    fn test_null_path_value_leaves_bare_name() {
        let template = template()
            .with_path_default("reports", None)
            .with_path_default("activity", Some("daily"));
        let request = template.substitute(&vec![], &vec![], None);
        assert_eq!(
            request.url,
            "https://api.example.com/v1/reports/activity/daily"
        );
    }

    #[test]
    fn test_empty_path_value_keeps_zero_length_segment() {
        let template = template()
            .with_path_default("reports", Some(""))
            .with_path_default("activity", Some("daily"));
        let request = template.substitute(&vec![], &vec![], None);
        assert_eq!(
            request.url,
            "https://api.example.com/v1/reports//activity/daily"
        );
    }

    #[test]
    fn test_none_query_values_dropped() {
        let template = template()
            .with_query_default("key", Some("abc"))
            .with_query_default("fields", None);
        let request = template.substitute(&vec![], &vec![], None);
        assert_eq!(request.url, "https://api.example.com/v1/?key=abc");
    }

    #[test]
    fn test_no_query_prefix_when_empty() {
        let request = template().substitute(&vec![], &vec![], None);
        assert_eq!(request.url, "https://api.example.com/v1/");
    }

    #[test]
    fn test_override_only_entries_append() {
        let template = template().with_query_default("key", Some("abc"));
        let request = template.substitute(
            &vec![],
            &vec![("page".to_string(), Some("2".to_string()))],
            None,
        );
        assert_eq!(request.url, "https://api.example.com/v1/?key=abc&page=2");
    }

    #[test]
    fn test_substitution_is_idempotent_and_non_mutating() {
        let template = template()
            .with_path_default("users", Some("me"))
            .with_query_default("key", Some("abc"));
        let overrides = vec![("key".to_string(), Some("xyz".to_string()))];
        let first = template.substitute(&vec![], &overrides, None);
        let second = template.substitute(&vec![], &overrides, None);
        assert_eq!(first.url, second.url);
        // Defaults are untouched by substitution.
        let untouched = template.substitute(&vec![], &vec![], None);
        assert_eq!(untouched.url, "https://api.example.com/v1/users/me?key=abc");
    }

    #[test]
    fn test_method_strings() {
        assert_eq!(HttpMethod::Get.as_str(), "GET");
        assert_eq!(HttpMethod::Patch.as_str(), "PATCH");
    }
}
