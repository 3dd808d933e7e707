//! Authenticated HTTP session against the Checkmk REST API

use std::path::Path;

use reqwest::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue};
use reqwest::{Certificate, Client, Method};
use serde::Serialize;
use tracing::debug;
use url::Url;

use crate::config::Settings;
use crate::error::{ClientError, Result};
use crate::result::ApiResult;

/// Connection context shared by every request of one invocation
///
/// Holds the default headers (bearer credentials, JSON content type) and a
/// `reqwest::Client` that verifies TLS against the configured CA bundle.
#[derive(Debug, Clone)]
pub struct Session {
    client: Option<Client>,
    base_url: String,
    site: String,
    default_headers: HeaderMap,
}

impl Session {
    /// Open a session
    ///
    /// # Errors
    /// Returns a configuration error if the CA bundle cannot be loaded or the
    /// credentials cannot be used as a header value.
    ///
    /// # Example
    /// ```no_run
    /// use cmkctl_client::Session;
    ///
    /// let session = Session::open(
    ///     "https://cmk.example.com/prod/check_mk/api/1.0",
    ///     None,
    ///     "automation",
    ///     "secret",
    ///     "prod",
    /// )?;
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn open(
        base_url: impl Into<String>,
        ca_cert_path: Option<&Path>,
        username: &str,
        secret: &str,
        site: impl Into<String>,
    ) -> Result<Self> {
        let client = build_client(ca_cert_path)?;
        Ok(Self {
            client: Some(client),
            base_url: base_url.into(),
            site: site.into(),
            default_headers: default_headers(username, secret)?,
        })
    }

    /// Open a session from loaded settings, reading the secret file
    ///
    /// # Errors
    /// Returns a configuration error if a setting is missing or the secret
    /// cannot be read.
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let secret = settings.read_secret()?;
        Self::open(
            settings.url()?,
            settings.ca_file.as_deref(),
            settings.user()?,
            &secret,
            settings.site()?,
        )
    }

    /// A session that has not been opened
    ///
    /// Dry runs still work on it; every request that would be sent fails.
    pub fn unopened(base_url: impl Into<String>, site: impl Into<String>) -> Self {
        Self {
            client: None,
            base_url: base_url.into(),
            site: site.into(),
            default_headers: HeaderMap::new(),
        }
    }

    /// Whether the session has a live connection context
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.client.is_some()
    }

    /// Target Checkmk site
    #[must_use]
    pub fn site(&self) -> &str {
        &self.site
    }

    /// REST base URL
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Build a full URL from a path by plain concatenation
    ///
    /// The base URL usually carries a path prefix
    /// (`/<site>/check_mk/api/1.0`), so `Url::join` would drop it.
    fn url(&self, path: &str) -> Result<Url> {
        let base = self.base_url.trim_end_matches('/');
        Ok(Url::parse(&format!("{base}{path}"))?)
    }

    /// Default headers first, then the request's own
    fn headers(&self, request: &RestRequest) -> HeaderMap {
        let mut headers = self.default_headers.clone();
        for (name, value) in &request.headers {
            headers.insert(name.clone(), value.clone());
        }
        headers
    }

    fn prepare(&self, request: &RestRequest) -> Result<(&Client, reqwest::Request)> {
        let client = self.client.as_ref().ok_or(ClientError::SessionNotOpen)?;

        let mut builder = client
            .request(request.method.clone(), self.url(&request.path)?)
            .headers(self.headers(request));
        if let Some(body) = &request.body {
            builder = builder.body(body.clone());
        }

        Ok((client, builder.build()?))
    }

    /// Execute one request
    ///
    /// Returns `None` for a dry run: the request is logged but not sent, and
    /// no connection context is needed, so an unopened session can preview
    /// requests. Otherwise exactly one round trip is made; there is no retry.
    ///
    /// # Errors
    /// Returns [`ClientError::SessionNotOpen`] when sending on an unopened
    /// session and [`ClientError::Transport`] on network or TLS failures. A
    /// non-200 status is not an error.
    pub async fn execute(&self, request: RestRequest) -> Result<Option<ApiResult>> {
        if request.dry_run {
            debug!(
                method = %request.method,
                url = %format!("{}{}", self.base_url.trim_end_matches('/'), request.path),
                body = request.body.as_deref().unwrap_or_default(),
                headers = ?self.headers(&request),
                "dry run, request not sent"
            );
            return Ok(None);
        }

        let (client, prepared) = self.prepare(&request)?;

        debug!(
            method = %prepared.method(),
            url = %prepared.url(),
            body = request.body.as_deref().unwrap_or_default(),
            headers = ?prepared.headers(),
            "prepared request"
        );

        let response = client.execute(prepared).await?;
        let status = response.status();
        let headers = response.headers().clone();
        let body = response.text().await?;

        debug!(%status, headers = ?headers, body = %body, "received response");

        Ok(Some(ApiResult::new(status, headers, body)))
    }
}

/// A request to be executed on a [`Session`]
#[derive(Debug, Clone)]
pub struct RestRequest {
    method: Method,
    path: String,
    body: Option<String>,
    headers: HeaderMap,
    dry_run: bool,
}

impl RestRequest {
    /// Request for `path`, relative to the session base URL
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            body: None,
            headers: HeaderMap::new(),
            dry_run: false,
        }
    }

    /// GET request
    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    /// POST request
    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    /// PUT request
    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::PUT, path)
    }

    /// DELETE request
    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    /// Set a JSON body
    ///
    /// # Errors
    /// Returns an error if the body cannot be serialized
    pub fn json(mut self, body: &impl Serialize) -> Result<Self> {
        self.body = Some(serde_json::to_string(body)?);
        Ok(self)
    }

    /// Add a header; it overrides a session default of the same name
    ///
    /// # Errors
    /// Returns an error if the value is not a valid header value
    pub fn header(mut self, name: HeaderName, value: &str) -> Result<Self> {
        self.headers.insert(name, HeaderValue::from_str(value)?);
        Ok(self)
    }

    /// Build and log the request without sending it
    #[must_use]
    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Request path
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Serialized body, if any
    #[must_use]
    pub fn body(&self) -> Option<&str> {
        self.body.as_deref()
    }
}

fn default_headers(username: &str, secret: &str) -> Result<HeaderMap> {
    let mut auth = HeaderValue::from_str(&format!("Bearer {username} {secret}"))?;
    auth.set_sensitive(true);

    let mut headers = HeaderMap::new();
    headers.insert(AUTHORIZATION, auth);
    headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    Ok(headers)
}

fn build_client(ca_cert_path: Option<&Path>) -> Result<Client> {
    let mut builder = Client::builder();

    if let Some(path) = ca_cert_path {
        let pem = std::fs::read(path).map_err(|e| {
            ClientError::Configuration(format!("cannot read CA bundle {}: {e}", path.display()))
        })?;
        let certs = Certificate::from_pem_bundle(&pem).map_err(|e| {
            ClientError::Configuration(format!("invalid CA bundle {}: {e}", path.display()))
        })?;
        for cert in certs {
            builder = builder.add_root_certificate(cert);
        }
    }

    builder
        .build()
        .map_err(|e| ClientError::Configuration(format!("cannot build HTTP client: {e}")))
}

#[cfg(test)]
mod tests {
    use reqwest::header::IF_MATCH;
    use wiremock::matchers::{body_string, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    fn session(base_url: &str) -> Session {
        Session::open(base_url, None, "automation", "s3cr3t", "prod").unwrap()
    }

    #[test]
    fn test_url_concatenation_keeps_prefix() {
        let session = session("https://cmk.example.com/prod/check_mk/api/1.0/");
        let url = session.url("/objects/host_config/web01").unwrap();
        assert_eq!(
            url.as_str(),
            "https://cmk.example.com/prod/check_mk/api/1.0/objects/host_config/web01"
        );
    }

    #[test]
    fn test_default_headers_applied() {
        let session = session("https://cmk.example.com/api");
        let (_, prepared) = session.prepare(&RestRequest::get("/version")).unwrap();

        let headers = prepared.headers();
        assert_eq!(headers[AUTHORIZATION], "Bearer automation s3cr3t");
        assert!(headers[AUTHORIZATION].is_sensitive());
        assert_eq!(headers[ACCEPT], "application/json");
        assert_eq!(headers[CONTENT_TYPE], "application/json");
    }

    #[test]
    fn test_extra_headers_override_defaults() {
        let session = session("https://cmk.example.com/api");
        let request = RestRequest::put("/objects/host_config/web01")
            .header(ACCEPT, "text/plain")
            .unwrap()
            .header(IF_MATCH, "\"v1\"")
            .unwrap();

        let (_, prepared) = session.prepare(&request).unwrap();
        let headers = prepared.headers();
        assert_eq!(headers.get_all(ACCEPT).iter().count(), 1);
        assert_eq!(headers[ACCEPT], "text/plain");
        assert_eq!(headers[IF_MATCH], "\"v1\"");
        assert_eq!(headers[CONTENT_TYPE], "application/json");
    }

    #[test]
    fn test_sensitive_authorization_not_logged_in_clear() {
        let session = session("https://cmk.example.com/api");
        let (_, prepared) = session.prepare(&RestRequest::get("/version")).unwrap();
        let rendered = format!("{:?}", prepared.headers());
        assert!(!rendered.contains("s3cr3t"));
    }

    #[test]
    fn test_missing_ca_bundle_is_configuration_error() {
        let err = Session::open(
            "https://cmk.example.com/api",
            Some(Path::new("/nonexistent/ca.pem")),
            "automation",
            "s3cr3t",
            "prod",
        )
        .unwrap_err();
        assert!(matches!(err, ClientError::Configuration(_)));
    }

    #[tokio::test]
    async fn test_unopened_session_rejects_requests() {
        let session = Session::unopened("https://cmk.example.com/api", "prod");
        assert!(!session.is_open());

        let result = session.execute(RestRequest::get("/version")).await;
        assert!(matches!(result, Err(ClientError::SessionNotOpen)));
    }

    #[tokio::test]
    async fn test_unopened_session_allows_dry_run() {
        let session = Session::unopened("", "");
        let request = RestRequest::delete("/objects/host_config/web01").dry_run(true);
        assert!(session.execute(request).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_execute_sends_json_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/domain-types/host_config/collections/all"))
            .and(header("authorization", "Bearer automation s3cr3t"))
            .and(body_string(r#"{"mode":"refresh"}"#))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("etag", "\"abc\"")
                    .set_body_string(r#"{"id":"web01"}"#),
            )
            .expect(1)
            .mount(&server)
            .await;

        let request = RestRequest::post("/domain-types/host_config/collections/all")
            .json(&serde_json::json!({"mode": "refresh"}))
            .unwrap();
        let result = session(&server.uri())
            .execute(request)
            .await
            .unwrap()
            .expect("sent request");

        assert!(result.ok());
        assert_eq!(result.etag(), Some("\"abc\""));
        assert_eq!(result.json_value().unwrap()["id"], "web01");
    }

    #[tokio::test]
    async fn test_dry_run_sends_nothing() {
        let server = MockServer::start().await;

        let request = RestRequest::delete("/objects/host_config/web01").dry_run(true);
        let result = session(&server.uri()).execute(request).await.unwrap();

        assert!(result.is_none());
        let requests = server.received_requests().await.unwrap();
        assert!(requests.is_empty());
    }

    #[tokio::test]
    async fn test_remote_rejection_is_not_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .respond_with(ResponseTemplate::new(404).set_body_string(r#"{"title":"Not Found"}"#))
            .expect(1)
            .mount(&server)
            .await;

        let result = session(&server.uri())
            .execute(RestRequest::delete("/objects/host_config/ghost"))
            .await
            .unwrap()
            .unwrap();

        assert!(!result.ok());
        assert_eq!(result.status.as_u16(), 404);
    }

    #[tokio::test]
    async fn test_network_failure_is_transport_error() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let result = session(&format!("http://{addr}"))
            .execute(RestRequest::get("/version"))
            .await;
        assert!(matches!(result, Err(ClientError::Transport(_))));
    }
}
