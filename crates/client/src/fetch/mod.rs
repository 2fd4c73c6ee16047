//! Network capability the proxy fetches through.
//!
//! ### Requests
//! - [`ProxyRequest`] carries method, canonical URL, headers, body and the
//!   request mode (`navigate`, `same-origin`, `no-cors`, `cors`).
//!
//! ### Responses
//! - Any HTTP status is a successful fetch; only transport failures, timeouts
//!   and oversized bodies are errors.
//! - The response type is `basic` when the final URL shares the app origin,
//!   `opaque` for cross-origin `no-cors` requests, and `cors` otherwise.
//!   Opaque responses hide status, headers and body.
//!
//! ### Limits
//! - Max redirects: 20 (configurable)
//! - Max body bytes: 10MB (configurable)
//! - Request timeout: 20s (configurable)

pub mod url;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::header::{self, HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client, Method};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::{Duration, Instant};

pub use self::url::{UrlError, canonicalize, resolve, same_origin};

use ::url::Url;
use portal_core::{AppConfig, CacheRequest, Error, ResponseType, StoredResponse};

/// How the request was initiated, mirroring the fetch `mode` attribute.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "kebab-case")]
pub enum RequestMode {
    /// Top-level page navigation. Falls back to the offline page.
    Navigate,
    /// Fails outright when the URL is cross-origin.
    SameOrigin,
    /// Cross-origin responses come back opaque.
    NoCors,
    #[default]
    Cors,
}

impl RequestMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestMode::Navigate => "navigate",
            RequestMode::SameOrigin => "same-origin",
            RequestMode::NoCors => "no-cors",
            RequestMode::Cors => "cors",
        }
    }
}

impl fmt::Display for RequestMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RequestMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "navigate" => Ok(RequestMode::Navigate),
            "same-origin" => Ok(RequestMode::SameOrigin),
            "no-cors" => Ok(RequestMode::NoCors),
            "cors" => Ok(RequestMode::Cors),
            other => Err(Error::InvalidInput(format!("unknown request mode: {other}"))),
        }
    }
}

/// A request intercepted by the proxy.
#[derive(Debug, Clone)]
pub struct ProxyRequest {
    pub method: Method,
    pub url: Url,
    pub headers: HeaderMap,
    pub mode: RequestMode,
    pub body: Option<Bytes>,
}

impl ProxyRequest {
    pub fn new(method: Method, mut url: Url) -> Self {
        url.set_fragment(None);
        Self { method, url, headers: HeaderMap::new(), mode: RequestMode::default(), body: None }
    }

    /// A `cors`-mode GET, the shape used for manifest assets.
    pub fn get(url: Url) -> Self {
        Self::new(Method::GET, url)
    }

    /// A top-level page navigation.
    pub fn navigate(url: Url) -> Self {
        let mut request = Self::new(Method::GET, url).with_mode(RequestMode::Navigate);
        request
            .headers
            .insert(header::ACCEPT, HeaderValue::from_static("text/html,application/xhtml+xml,*/*;q=0.8"));
        request
    }

    pub fn with_mode(mut self, mode: RequestMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Append a header, rejecting names or values HTTP cannot carry.
    pub fn with_header(mut self, name: &str, value: &str) -> Result<Self, Error> {
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|e| Error::InvalidInput(format!("invalid header name {name:?}: {e}")))?;
        let value =
            HeaderValue::from_str(value).map_err(|e| Error::InvalidInput(format!("invalid header value: {e}")))?;
        self.headers.append(name, value);
        Ok(self)
    }

    pub fn is_navigation(&self) -> bool {
        self.mode == RequestMode::Navigate
    }

    /// The cache key side of this request.
    pub fn to_cache_request(&self) -> CacheRequest {
        let headers = self
            .headers
            .iter()
            .filter_map(|(name, value)| value.to_str().ok().map(|v| (name.as_str().to_string(), v.to_string())))
            .collect();

        CacheRequest { method: self.method.as_str().to_string(), url: self.url.to_string(), headers }
    }
}

/// Fetch capability.
///
/// Returns `Err` only when no response was produced.
#[async_trait]
pub trait Network: Send + Sync {
    async fn fetch(&self, request: &ProxyRequest) -> Result<StoredResponse, Error>;
}

/// Configuration for the fetch client.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// App origin and base path; decides `basic` vs cross-origin.
    pub scope: Url,

    /// User agent string (default: "portal-proxy/0.1")
    pub user_agent: String,

    /// Maximum response body size in bytes (default: 10MB)
    pub max_bytes: usize,

    /// Request timeout (default: 20s)
    pub timeout: Duration,

    /// Maximum number of redirects to follow (default: 20)
    pub max_redirects: usize,
}

impl FetchConfig {
    /// Defaults for everything but the scope.
    pub fn for_scope(scope: Url) -> Self {
        Self {
            scope,
            user_agent: "portal-proxy/0.1".to_string(),
            max_bytes: 10 * 1024 * 1024,
            timeout: Duration::from_millis(20_000),
            max_redirects: 20,
        }
    }

    /// Build from the loaded application configuration.
    pub fn from_app_config(config: &AppConfig) -> Result<Self, Error> {
        let scope = config.scope().map_err(|e| Error::InvalidUrl(e.to_string()))?;
        Ok(Self {
            scope,
            user_agent: config.user_agent.clone(),
            max_bytes: config.max_bytes,
            timeout: config.timeout(),
            max_redirects: config.max_redirects,
        })
    }
}

/// HTTP fetch client backed by reqwest.
pub struct FetchClient {
    http: Client,
    config: FetchConfig,
}

impl FetchClient {
    /// Create a new fetch client with the given configuration.
    pub fn new(config: FetchConfig) -> Result<Self, Error> {
        let http = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(config.timeout)
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .use_rustls_tls()
            .gzip(true)
            .brotli(true)
            .deflate(true)
            .build()
            .map_err(|e| Error::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { http, config })
    }

    /// Get reference to the configuration.
    pub fn config(&self) -> &FetchConfig {
        &self.config
    }

    fn too_large(&self, len: usize) -> Error {
        Error::FetchTooLarge(format!("{} bytes exceeds {}", len, self.config.max_bytes))
    }
}

fn transport_error(url: &Url, err: reqwest::Error) -> Error {
    if err.is_timeout() {
        Error::FetchTimeout(format!("{url}: {err}"))
    } else {
        Error::Network(format!("{url}: {err}"))
    }
}

#[async_trait]
impl Network for FetchClient {
    async fn fetch(&self, request: &ProxyRequest) -> Result<StoredResponse, Error> {
        let start = Instant::now();
        let scope = &self.config.scope;

        if request.mode == RequestMode::SameOrigin && !same_origin(scope, &request.url) {
            return Err(Error::Network(format!("{} is cross-origin for a same-origin request", request.url)));
        }

        let mut builder = self
            .http
            .request(request.method.clone(), request.url.clone())
            .headers(request.headers.clone());
        if let Some(body) = &request.body {
            builder = builder.body(body.clone());
        }

        let response = builder
            .send()
            .await
            .map_err(|e| transport_error(&request.url, e))?;

        if let Some(len) = response.content_length()
            && len as usize > self.config.max_bytes
        {
            return Err(self.too_large(len as usize));
        }

        let status = response.status();
        let final_url = response.url().clone();
        let headers: Vec<(String, String)> = response
            .headers()
            .iter()
            .filter_map(|(name, value)| value.to_str().ok().map(|v| (name.as_str().to_string(), v.to_string())))
            .collect();

        let body = response
            .bytes()
            .await
            .map_err(|e| transport_error(&request.url, e))?;

        if body.len() > self.config.max_bytes {
            return Err(self.too_large(body.len()));
        }

        let response_type = if same_origin(scope, &final_url) {
            ResponseType::Basic
        } else if request.mode == RequestMode::NoCors {
            ResponseType::Opaque
        } else {
            ResponseType::Cors
        };

        tracing::debug!(
            method = %request.method,
            url = %request.url,
            final_url = %final_url,
            status = status.as_u16(),
            response_type = %response_type,
            bytes = body.len(),
            fetch_ms = start.elapsed().as_millis() as u64,
            "network fetch complete"
        );

        if response_type == ResponseType::Opaque {
            return Ok(StoredResponse {
                url: final_url.to_string(),
                status: 0,
                status_text: String::new(),
                response_type,
                headers: Vec::new(),
                body: Vec::new(),
            });
        }

        Ok(StoredResponse {
            url: final_url.to_string(),
            status: status.as_u16(),
            status_text: status.canonical_reason().unwrap_or_default().to_string(),
            response_type,
            headers,
            body: body.to_vec(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header as header_matcher, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn scope_of(server: &MockServer) -> Url {
        Url::parse(&format!("{}/", server.uri())).unwrap()
    }

    fn client_for(scope: Url) -> FetchClient {
        FetchClient::new(FetchConfig::for_scope(scope)).unwrap()
    }

    #[test]
    fn test_fetch_config_defaults() {
        let config = FetchConfig::for_scope(Url::parse("https://portal.test/").unwrap());
        assert_eq!(config.user_agent, "portal-proxy/0.1");
        assert_eq!(config.max_bytes, 10 * 1024 * 1024);
        assert_eq!(config.timeout, Duration::from_millis(20_000));
        assert_eq!(config.max_redirects, 20);
    }

    #[test]
    fn test_fetch_config_from_app_config() {
        let app = AppConfig { scope_url: "https://portal.test/app/".into(), timeout_ms: 1500, ..Default::default() };
        let config = FetchConfig::from_app_config(&app).unwrap();
        assert_eq!(config.scope.as_str(), "https://portal.test/app/");
        assert_eq!(config.timeout, Duration::from_millis(1500));
    }

    #[test]
    fn test_request_mode_parse() {
        assert_eq!("navigate".parse::<RequestMode>().unwrap(), RequestMode::Navigate);
        assert_eq!("no-cors".parse::<RequestMode>().unwrap(), RequestMode::NoCors);
        assert!(matches!("websocket".parse::<RequestMode>(), Err(Error::InvalidInput(_))));
    }

    #[test]
    fn test_to_cache_request_drops_fragment() {
        let request = ProxyRequest::navigate(Url::parse("https://portal.test/app/#/settings").unwrap());
        let key = request.to_cache_request();
        assert_eq!(key.method, "GET");
        assert_eq!(key.url, "https://portal.test/app/");
        assert!(key.header("accept").is_some());
    }

    #[test]
    fn test_with_header_rejects_invalid_name() {
        let request = ProxyRequest::get(Url::parse("https://portal.test/").unwrap());
        assert!(request.with_header("bad header", "x").is_err());
    }

    #[tokio::test]
    async fn test_fetch_same_origin_is_basic() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/index.html"))
            .respond_with(ResponseTemplate::new(200).set_body_raw("<h1>portal</h1>", "text/html"))
            .mount(&server)
            .await;

        let scope = scope_of(&server);
        let client = client_for(scope.clone());
        let request = ProxyRequest::get(scope.join("index.html").unwrap());

        let response = client.fetch(&request).await.unwrap();
        assert_eq!(response.status, 200);
        assert_eq!(response.status_text, "OK");
        assert_eq!(response.response_type, ResponseType::Basic);
        assert_eq!(response.header("content-type"), Some("text/html"));
        assert_eq!(response.text(), "<h1>portal</h1>");
        assert!(response.is_cacheable());
    }

    #[tokio::test]
    async fn test_fetch_forwards_headers() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/profile"))
            .and(header_matcher("x-portal-client", "tab-1"))
            .respond_with(ResponseTemplate::new(200).set_body_string("{}"))
            .mount(&server)
            .await;

        let scope = scope_of(&server);
        let request = ProxyRequest::get(scope.join("api/profile").unwrap())
            .with_header("x-portal-client", "tab-1")
            .unwrap();

        let response = client_for(scope).fetch(&request).await.unwrap();
        assert_eq!(response.status, 200);
    }

    #[tokio::test]
    async fn test_fetch_error_status_is_not_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/missing.js"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let scope = scope_of(&server);
        let request = ProxyRequest::get(scope.join("missing.js").unwrap());

        let response = client_for(scope).fetch(&request).await.unwrap();
        assert_eq!(response.status, 404);
        assert!(!response.is_cacheable());
    }

    #[tokio::test]
    async fn test_fetch_cross_origin_is_cors() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/react@19.2.3"))
            .respond_with(ResponseTemplate::new(200).set_body_string("export default {}"))
            .mount(&server)
            .await;

        let client = client_for(Url::parse("https://portal.test/").unwrap());
        let request = ProxyRequest::get(Url::parse(&format!("{}/react@19.2.3", server.uri())).unwrap());

        let response = client.fetch(&request).await.unwrap();
        assert_eq!(response.response_type, ResponseType::Cors);
        assert_eq!(response.status, 200);
        assert!(!response.is_cacheable());
    }

    #[tokio::test]
    async fn test_fetch_no_cors_cross_origin_is_opaque() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/logo.png"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![0x89, 0x50, 0x4e, 0x47]))
            .mount(&server)
            .await;

        let client = client_for(Url::parse("https://portal.test/").unwrap());
        let request = ProxyRequest::get(Url::parse(&format!("{}/logo.png", server.uri())).unwrap())
            .with_mode(RequestMode::NoCors);

        let response = client.fetch(&request).await.unwrap();
        assert_eq!(response.response_type, ResponseType::Opaque);
        assert_eq!(response.status, 0);
        assert!(response.body.is_empty());
        assert!(response.headers.is_empty());
    }

    #[tokio::test]
    async fn test_fetch_same_origin_mode_blocks_cross_origin() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let client = client_for(Url::parse("https://portal.test/").unwrap());
        let request = ProxyRequest::get(Url::parse(&format!("{}/data.json", server.uri())).unwrap())
            .with_mode(RequestMode::SameOrigin);

        let result = client.fetch(&request).await;
        assert!(matches!(result, Err(Error::Network(_))));
    }

    #[tokio::test]
    async fn test_fetch_timeout() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/slow"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_millis(500)))
            .mount(&server)
            .await;

        let scope = scope_of(&server);
        let config = FetchConfig { timeout: Duration::from_millis(100), ..FetchConfig::for_scope(scope.clone()) };
        let client = FetchClient::new(config).unwrap();

        let result = client.fetch(&ProxyRequest::get(scope.join("slow").unwrap())).await;
        assert!(matches!(result, Err(Error::FetchTimeout(_))));
    }

    #[tokio::test]
    async fn test_fetch_too_large() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/bundle.js"))
            .respond_with(ResponseTemplate::new(200).set_body_string("0123456789"))
            .mount(&server)
            .await;

        let scope = scope_of(&server);
        let config = FetchConfig { max_bytes: 4, ..FetchConfig::for_scope(scope.clone()) };
        let client = FetchClient::new(config).unwrap();

        let result = client.fetch(&ProxyRequest::get(scope.join("bundle.js").unwrap())).await;
        assert!(matches!(result, Err(Error::FetchTooLarge(_))));
    }

    #[tokio::test]
    async fn test_fetch_connection_refused() {
        let scope = Url::parse("http://127.0.0.1:1/").unwrap();
        let client = client_for(scope.clone());

        let result = client.fetch(&ProxyRequest::get(scope)).await;
        assert!(result.as_ref().is_err_and(Error::is_network_failure), "unexpected: {result:?}");
    }
}
