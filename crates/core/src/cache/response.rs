//! Request and response shapes stored in a cache bucket.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::Error;

/// How a response relates to the origin of the proxied application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum ResponseType {
    /// Same-origin response. The only kind the fetch handler stores.
    Basic,
    /// Cross-origin response readable by the application.
    Cors,
    /// Cross-origin `no-cors` response. Status, headers and body are hidden.
    Opaque,
}

impl ResponseType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResponseType::Basic => "basic",
            ResponseType::Cors => "cors",
            ResponseType::Opaque => "opaque",
        }
    }
}

impl fmt::Display for ResponseType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResponseType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "basic" => Ok(ResponseType::Basic),
            "cors" => Ok(ResponseType::Cors),
            "opaque" => Ok(ResponseType::Opaque),
            other => Err(Error::CorruptEntry(format!("unknown response type: {other}"))),
        }
    }
}

/// Immutable snapshot of a network response.
///
/// Once written to a bucket it is only ever replaced as a whole.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredResponse {
    /// Final URL after redirects.
    pub url: String,
    pub status: u16,
    pub status_text: String,
    pub response_type: ResponseType,
    /// Header pairs in the order the server sent them.
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl StoredResponse {
    /// First value of a header, matched case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Whether the status is in the 2xx range.
    pub fn is_ok(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Whether the fetch handler may store this response.
    ///
    /// Only a plain 200 from the application's own origin qualifies.
    pub fn is_cacheable(&self) -> bool {
        self.status == 200 && self.response_type == ResponseType::Basic
    }

    /// Lowercased header names listed in `Vary`.
    pub fn vary_fields(&self) -> Vec<String> {
        self.headers
            .iter()
            .filter(|(k, _)| k.eq_ignore_ascii_case("vary"))
            .flat_map(|(_, v)| v.split(','))
            .map(|field| field.trim().to_ascii_lowercase())
            .filter(|field| !field.is_empty())
            .collect()
    }

    /// `Vary: *`, which no later request can match.
    pub fn varies_on_everything(&self) -> bool {
        self.vary_fields().iter().any(|field| field == "*")
    }

    /// Body decoded as UTF-8, replacing invalid sequences.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).to_string()
    }
}

/// The key side of a cache entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheRequest {
    pub method: String,
    /// Canonical URL: fragment removed, query preserved.
    pub url: String,
    pub headers: Vec<(String, String)>,
}

impl CacheRequest {
    /// A header-less GET for `url`.
    pub fn get(url: impl Into<String>) -> Self {
        Self { method: "GET".to_string(), url: url.into(), headers: Vec::new() }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// First value of a header, matched case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Request header values selected by the response's `Vary` fields.
    ///
    /// Stored alongside the entry so later lookups can be compared against
    /// the request that produced it.
    pub fn vary_snapshot(&self, response: &StoredResponse) -> Vec<(String, Option<String>)> {
        response
            .vary_fields()
            .into_iter()
            .filter(|field| field != "*")
            .map(|field| {
                let value = self.header(&field).map(str::to_string);
                (field, value)
            })
            .collect()
    }

    /// Whether this request selects a stored entry under `Vary` rules.
    ///
    /// `Vary: *` never matches.
    pub fn matches_vary(&self, response: &StoredResponse, stored: &[(String, Option<String>)]) -> bool {
        let fields = response.vary_fields();
        if fields.iter().any(|field| field == "*") {
            return false;
        }

        fields.iter().all(|field| {
            let stored_value = stored
                .iter()
                .find(|(name, _)| name == field)
                .and_then(|(_, value)| value.as_deref());
            self.header(field) == stored_value
        })
    }
}
