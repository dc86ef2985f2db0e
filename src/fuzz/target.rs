//! Target specification
//!
//! A `TargetSpec` is the immutable request template every probe in a
//! session is built from: base URL, method, headers, cookies, the
//! accepted-status set, and the per-request timeout. All validation
//! happens in the builder so the engine never sees a half-formed
//! target.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use reqwest::header::{HeaderName, HeaderValue};
use url::Url;

use crate::error::ConfigError;
use crate::fuzz::words::Candidate;

/// HTTP methods supported for probing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Head,
    Put,
    Delete,
    Patch,
    Options,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Head => "HEAD",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
            Method::Patch => "PATCH",
            Method::Options => "OPTIONS",
        }
    }

    pub(crate) fn to_reqwest(self) -> reqwest::Method {
        match self {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
            Method::Head => reqwest::Method::HEAD,
            Method::Put => reqwest::Method::PUT,
            Method::Delete => reqwest::Method::DELETE,
            Method::Patch => reqwest::Method::PATCH,
            Method::Options => reqwest::Method::OPTIONS,
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Method {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "GET" => Ok(Method::Get),
            "POST" => Ok(Method::Post),
            "HEAD" => Ok(Method::Head),
            "PUT" => Ok(Method::Put),
            "DELETE" => Ok(Method::Delete),
            "PATCH" => Ok(Method::Patch),
            "OPTIONS" => Ok(Method::Options),
            other => Err(ConfigError::UnsupportedMethod(other.to_string())),
        }
    }
}

/// Set of response status codes that count as a discovered endpoint.
///
/// Built from entries like `"200"` or `"200-299"`; membership is an
/// inclusive-range check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusSet {
    // singles are stored as degenerate (n, n) ranges
    ranges: Vec<(u16, u16)>,
}

impl StatusSet {
    /// Parses a list of status entries, each a single code or an
    /// inclusive `lo-hi` range.
    pub fn parse<S: AsRef<str>>(specs: &[S]) -> Result<Self, ConfigError> {
        if specs.is_empty() {
            return Err(ConfigError::InvalidStatusSpec {
                spec: String::new(),
                reason: "at least one status code is required".to_string(),
            });
        }
        let mut ranges = Vec::with_capacity(specs.len());
        for spec in specs {
            let spec = spec.as_ref().trim();
            let (lo, hi) = match spec.split_once('-') {
                Some((lo, hi)) => (parse_code(spec, lo)?, parse_code(spec, hi)?),
                None => {
                    let code = parse_code(spec, spec)?;
                    (code, code)
                }
            };
            if lo > hi {
                return Err(ConfigError::InvalidStatusSpec {
                    spec: spec.to_string(),
                    reason: "range is inverted".to_string(),
                });
            }
            ranges.push((lo, hi));
        }
        Ok(Self { ranges })
    }

    /// Parses a comma-separated spec like `"200,204,300-302"`.
    pub fn parse_list(spec: &str) -> Result<Self, ConfigError> {
        let entries: Vec<&str> = spec.split(',').collect();
        Self::parse(&entries)
    }

    pub fn contains(&self, code: u16) -> bool {
        self.ranges.iter().any(|&(lo, hi)| lo <= code && code <= hi)
    }
}

fn parse_code(spec: &str, part: &str) -> Result<u16, ConfigError> {
    let part = part.trim();
    let code: u16 = part.parse().map_err(|_| ConfigError::InvalidStatusSpec {
        spec: spec.to_string(),
        reason: format!("'{}' is not a status code", part),
    })?;
    if !(100..=599).contains(&code) {
        return Err(ConfigError::InvalidStatusSpec {
            spec: spec.to_string(),
            reason: format!("{} is outside 100-599", code),
        });
    }
    Ok(code)
}

impl Default for StatusSet {
    /// The default discovery set: 200, 204, the common redirects and 403
    fn default() -> Self {
        Self {
            ranges: [200u16, 204, 301, 302, 403]
                .iter()
                .map(|&c| (c, c))
                .collect(),
        }
    }
}

/// Immutable description of the target a session probes
#[derive(Debug, Clone)]
pub struct TargetSpec {
    base: Url,
    // base URL rendered without a trailing slash, so candidate paths
    // append cleanly
    base_str: String,
    method: Method,
    headers: Vec<(String, String)>,
    cookie_header: Option<String>,
    accepted: StatusSet,
    timeout: Duration,
}

impl TargetSpec {
    pub fn builder(base_url: &str) -> TargetSpecBuilder {
        TargetSpecBuilder::new(base_url)
    }

    /// Full URL for one candidate path
    pub fn url_for(&self, candidate: &Candidate) -> String {
        format!("{}{}", self.base_str, candidate.path())
    }

    pub fn host(&self) -> &str {
        // builder rejects host-less URLs
        self.base.host_str().unwrap_or_default()
    }

    pub fn method(&self) -> Method {
        self.method
    }

    /// Validated extra headers, lowercased names, one entry per name
    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    /// Pre-joined `Cookie` header value, if any cookies were set
    pub fn cookie_header(&self) -> Option<&str> {
        self.cookie_header.as_deref()
    }

    pub fn accepted(&self) -> &StatusSet {
        &self.accepted
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

/// Builder for [`TargetSpec`] with validation at `build()`
#[derive(Debug, Clone)]
pub struct TargetSpecBuilder {
    base_url: String,
    method: Method,
    headers: Vec<(String, String)>,
    cookies: Vec<(String, String)>,
    accepted: StatusSet,
    timeout: Duration,
}

impl TargetSpecBuilder {
    fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.to_string(),
            method: Method::Head,
            headers: Vec::new(),
            cookies: Vec::new(),
            accepted: StatusSet::default(),
            timeout: Duration::from_secs(10),
        }
    }

    pub fn method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }

    pub fn header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }

    pub fn cookie(mut self, name: &str, value: &str) -> Self {
        self.cookies.push((name.to_string(), value.to_string()));
        self
    }

    pub fn accepted(mut self, accepted: StatusSet) -> Self {
        self.accepted = accepted;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn build(self) -> Result<TargetSpec, ConfigError> {
        let base = Url::parse(&self.base_url).map_err(|e| ConfigError::InvalidBaseUrl {
            url: self.base_url.clone(),
            reason: e.to_string(),
        })?;
        if !matches!(base.scheme(), "http" | "https") {
            return Err(ConfigError::InvalidBaseUrl {
                url: self.base_url.clone(),
                reason: "scheme must be http or https".to_string(),
            });
        }
        if base.host_str().is_none() {
            return Err(ConfigError::InvalidBaseUrl {
                url: self.base_url.clone(),
                reason: "missing host".to_string(),
            });
        }
        if base.query().is_some() || base.fragment().is_some() {
            return Err(ConfigError::InvalidBaseUrl {
                url: self.base_url.clone(),
                reason: "query and fragment are not allowed in a base URL".to_string(),
            });
        }
        if self.timeout.is_zero() {
            return Err(ConfigError::InvalidTimeout);
        }

        let mut base_str = base.to_string();
        while base_str.ends_with('/') {
            base_str.pop();
        }

        // fold duplicate names case-insensitively, last value wins,
        // first-seen position kept
        let mut headers: Vec<(String, String)> = Vec::with_capacity(self.headers.len());
        for (name, value) in &self.headers {
            let folded = name.trim().to_ascii_lowercase();
            HeaderName::from_bytes(folded.as_bytes()).map_err(|e| ConfigError::InvalidHeader {
                name: name.clone(),
                reason: e.to_string(),
            })?;
            HeaderValue::from_str(value).map_err(|e| ConfigError::InvalidHeader {
                name: name.clone(),
                reason: e.to_string(),
            })?;
            match headers.iter_mut().find(|(existing, _)| *existing == folded) {
                Some(entry) => entry.1 = value.clone(),
                None => headers.push((folded, value.clone())),
            }
        }

        let cookie_header = if self.cookies.is_empty() {
            None
        } else {
            let joined = self
                .cookies
                .iter()
                .map(|(name, value)| format!("{}={}", name.trim(), value))
                .collect::<Vec<_>>()
                .join("; ");
            HeaderValue::from_str(&joined).map_err(|e| ConfigError::InvalidHeader {
                name: "Cookie".to_string(),
                reason: e.to_string(),
            })?;
            Some(joined)
        };

        Ok(TargetSpec {
            base,
            base_str,
            method: self.method,
            headers,
            cookie_header,
            accepted: self.accepted,
            timeout: self.timeout,
        })
    }
}
