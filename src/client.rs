use std::time::Duration;

use serde::Deserialize;
use serde::de::DeserializeOwned;
use url::Url;

use crate::error::Error;
use crate::identity::{Credentials, IdentityApi, LoginGrant, ProviderAuthRequest, TokenGrant};
use crate::types::Provider;

const DEFAULT_LOGIN_ENDPOINT: &str = "user/login";
const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Playlog backend configuration.
///
/// The base URL is the only required field, so it is the constructor parameter.
///
/// ```rust,ignore
/// use playlog_auth::IdentityConfig;
///
/// let config = IdentityConfig::new("https://api.playlog.gg/".parse()?)
///     .with_request_timeout(std::time::Duration::from_secs(5));
/// ```
#[derive(Debug, Clone)]
#[non_exhaustive]
pub struct IdentityConfig {
    pub(crate) base_url: Url,
    pub(crate) login_endpoint: String,
    pub(crate) request_timeout: Duration,
}

impl IdentityConfig {
    /// Create a configuration rooted at `base_url`.
    ///
    /// Endpoints are resolved relative to the base, so a base path such as
    /// `/api` is kept even without a trailing slash.
    #[must_use]
    pub fn new(base_url: Url) -> Self {
        Self {
            base_url: with_trailing_slash(base_url),
            login_endpoint: DEFAULT_LOGIN_ENDPOINT.into(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    /// Create configuration from environment variables.
    ///
    /// # Required env vars
    /// - `PLAYLOG_API_URL`: backend base URL
    ///
    /// # Optional env vars
    /// - `PLAYLOG_LOGIN_ENDPOINT`: direct login path (default `user/login`)
    /// - `PLAYLOG_REQUEST_TIMEOUT_SECS`: per-request deadline (default 10)
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the base URL is missing or a value is malformed.
    pub fn from_env() -> Result<Self, Error> {
        let base_url: Url = std::env::var("PLAYLOG_API_URL")
            .map_err(|_| Error::Config("PLAYLOG_API_URL is required".into()))?
            .parse()
            .map_err(|e| Error::Config(format!("PLAYLOG_API_URL: {e}")))?;

        let mut config = Self::new(base_url);

        if let Ok(endpoint) = std::env::var("PLAYLOG_LOGIN_ENDPOINT") {
            config = config.with_login_endpoint(endpoint);
        }
        if let Ok(secs) = std::env::var("PLAYLOG_REQUEST_TIMEOUT_SECS") {
            let secs: u64 = secs
                .trim()
                .parse()
                .map_err(|e| Error::Config(format!("PLAYLOG_REQUEST_TIMEOUT_SECS: {e}")))?;
            config = config.with_request_timeout(Duration::from_secs(secs));
        }

        Ok(config)
    }

    /// Override the direct login endpoint (relative to the base URL).
    #[must_use]
    pub fn with_login_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.login_endpoint = endpoint.into();
        self
    }

    /// Override the deadline applied to every request.
    #[must_use]
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        self.request_timeout
    }

    /// Endpoint returning the provider's authorization URL.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the endpoint cannot be joined onto the base URL.
    pub fn authorization_endpoint(&self, provider: Provider) -> Result<Url, Error> {
        self.endpoint(&format!("oauth/{provider}/login"))
    }

    /// Endpoint exchanging the provider's authorization code.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the endpoint cannot be joined onto the base URL.
    pub fn exchange_endpoint(&self, provider: Provider) -> Result<Url, Error> {
        self.endpoint(&format!("oauth/{provider}/callback"))
    }

    /// Direct login endpoint.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the endpoint cannot be joined onto the base URL.
    pub fn login_url(&self) -> Result<Url, Error> {
        self.endpoint(&self.login_endpoint)
    }

    /// Resolve any backend path against the base URL.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if `path` does not form a valid URL.
    pub fn endpoint(&self, path: &str) -> Result<Url, Error> {
        self.base_url
            .join(path.trim_start_matches('/'))
            .map_err(|e| Error::Config(format!("{path}: {e}")))
    }
}

fn with_trailing_slash(mut url: Url) -> Url {
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    url
}

/// HTTP client for the Playlog identity endpoints.
pub struct IdentityClient {
    config: IdentityConfig,
    http: reqwest::Client,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: String,
}

impl IdentityClient {
    #[must_use]
    pub fn new(config: IdentityConfig) -> Self {
        Self {
            config,
            http: reqwest::Client::new(),
        }
    }

    /// Use a custom HTTP client (for connection pool reuse or testing).
    #[must_use]
    pub fn with_http_client(mut self, client: reqwest::Client) -> Self {
        self.http = client;
        self
    }

    #[must_use]
    pub fn config(&self) -> &IdentityConfig {
        &self.config
    }

    /// Fetch a protected resource with the session's bearer token.
    ///
    /// Used by access-gated views for their one-time entry fetch.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Http`] on network failure or timeout, or
    /// [`Error::Backend`] if the endpoint answers with an error status.
    pub async fn fetch_resource<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
        access_token: &str,
    ) -> Result<T, Error> {
        let response = self
            .http
            .get(self.config.endpoint(path)?)
            .timeout(self.config.request_timeout)
            .query(query)
            .bearer_auth(access_token)
            .send()
            .await?;

        let response = Self::ensure_success(response, "resource request").await?;
        response.json::<T>().await.map_err(Into::into)
    }

    /// Checks HTTP response status; returns the response on success or an error
    /// carrying the backend's `message` (or the raw body).
    async fn ensure_success(
        response: reqwest::Response,
        operation: &'static str,
    ) -> Result<reqwest::Response, Error> {
        if response.status().is_success() {
            return Ok(response);
        }
        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        let detail = serde_json::from_str::<ErrorBody>(&body)
            .map(|b| b.message)
            .unwrap_or(body);
        Err(Error::Backend {
            operation,
            status: Some(status),
            detail,
        })
    }
}

impl IdentityApi for IdentityClient {
    async fn authorization_url(&self, provider: Provider) -> Result<ProviderAuthRequest, Error> {
        let response = self
            .http
            .get(self.config.authorization_endpoint(provider)?)
            .timeout(self.config.request_timeout)
            .send()
            .await?;

        let response = Self::ensure_success(response, "authorization URL request").await?;
        let body = response.text().await?;

        // The backend answers with either a bare string or a JSON string.
        let url = serde_json::from_str::<String>(&body).unwrap_or_else(|_| body.trim().to_owned());
        if url.is_empty() {
            return Err(Error::Backend {
                operation: "authorization URL request",
                status: None,
                detail: format!("empty authorization URL for {provider}"),
            });
        }

        Ok(ProviderAuthRequest::new(provider, url))
    }

    async fn exchange_code(
        &self,
        provider: Provider,
        code: &str,
        state: Option<&str>,
    ) -> Result<TokenGrant, Error> {
        let mut request = self
            .http
            .get(self.config.exchange_endpoint(provider)?)
            .timeout(self.config.request_timeout)
            .query(&[("code", code)]);

        if let Some(state) = state.filter(|_| provider.forwards_state()) {
            request = request.query(&[("state", state)]);
        }

        let response = Self::ensure_success(request.send().await?, "code exchange").await?;
        let grant = response.json::<TokenGrant>().await?;

        if grant.access_token.is_empty() {
            return Err(Error::Backend {
                operation: "code exchange",
                status: None,
                detail: "response carried no access token".into(),
            });
        }
        Ok(grant)
    }

    async fn login(&self, credentials: &Credentials) -> Result<LoginGrant, Error> {
        credentials.validate()?;

        let response = self
            .http
            .post(self.config.login_url()?)
            .timeout(self.config.request_timeout)
            .json(credentials)
            .send()
            .await?;

        let response = Self::ensure_success(response, "login").await?;
        let grant = response.json::<LoginGrant>().await?;

        if grant.access_token.is_empty() || grant.refresh_token.is_empty() {
            return Err(Error::Backend {
                operation: "login",
                status: None,
                detail: "response carried no valid tokens".into(),
            });
        }
        Ok(grant)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> IdentityConfig {
        IdentityConfig::new("https://api.example.com/api".parse().unwrap())
    }

    #[test]
    fn test_config_defaults() {
        let config = test_config();

        assert_eq!(config.base_url().as_str(), "https://api.example.com/api/");
        assert_eq!(config.request_timeout(), Duration::from_secs(10));
        assert_eq!(
            config.login_url().unwrap().as_str(),
            "https://api.example.com/api/user/login"
        );
    }

    #[test]
    fn test_provider_endpoints() {
        let config = test_config();

        assert_eq!(
            config.authorization_endpoint(Provider::Google).unwrap().as_str(),
            "https://api.example.com/api/oauth/google/login"
        );
        assert_eq!(
            config.exchange_endpoint(Provider::Naver).unwrap().as_str(),
            "https://api.example.com/api/oauth/naver/callback"
        );
    }

    #[test]
    fn test_config_with_overrides() {
        let config = test_config()
            .with_login_endpoint("/auth/signin")
            .with_request_timeout(Duration::from_secs(3));

        assert_eq!(
            config.login_url().unwrap().as_str(),
            "https://api.example.com/api/auth/signin"
        );
        assert_eq!(config.request_timeout(), Duration::from_secs(3));
    }

    #[test]
    fn test_root_base_url_kept() {
        let config = IdentityConfig::new("https://api.example.com".parse().unwrap());
        assert_eq!(
            config.endpoint("steam/profile").unwrap().as_str(),
            "https://api.example.com/steam/profile"
        );
    }

    #[tokio::test]
    async fn test_login_rejects_blank_credentials_before_network() {
        // Unroutable base URL: reaching the network would surface as Http, not MissingCredential.
        let client = IdentityClient::new(IdentityConfig::new("http://127.0.0.1:9/".parse().unwrap()));
        let result = client.login(&Credentials::new("", "secret")).await;
        assert!(matches!(result, Err(Error::MissingCredential("username"))));
    }

    // One-shot HTTP stub: answers a single request and yields its request line.
    async fn serve_once(
        status: &'static str,
        content_type: &'static str,
        body: &'static str,
    ) -> (IdentityClient, tokio::task::JoinHandle<String>) {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let server = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = Vec::new();
            let mut chunk = [0_u8; 1024];
            while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                let n = socket.read(&mut chunk).await.unwrap();
                if n == 0 {
                    break;
                }
                request.extend_from_slice(&chunk[..n]);
            }

            let response = format!(
                "HTTP/1.1 {status}\r\nContent-Type: {content_type}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len()
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.ok();

            String::from_utf8_lossy(&request)
                .lines()
                .next()
                .unwrap_or_default()
                .to_owned()
        });

        let base = format!("http://{addr}/").parse().unwrap();
        let http = reqwest::Client::builder().no_proxy().build().unwrap();
        let client = IdentityClient::new(IdentityConfig::new(base)).with_http_client(http);
        (client, server)
    }

    #[tokio::test]
    async fn test_naver_exchange_forwards_state() {
        let (client, server) =
            serve_once("200 OK", "application/json", r#"{"accessToken":"nv1"}"#).await;

        let grant = client
            .exchange_code(Provider::Naver, "XYZ", Some("S1"))
            .await
            .unwrap();

        assert_eq!(grant.access_token, "nv1");
        assert!(grant.refresh_token.is_none());
        assert_eq!(
            server.await.unwrap(),
            "GET /oauth/naver/callback?code=XYZ&state=S1 HTTP/1.1"
        );
    }

    #[tokio::test]
    async fn test_google_exchange_drops_state() {
        let (client, server) = serve_once(
            "200 OK",
            "application/json",
            r#"{"accessToken":"g1","refreshToken":"g-refresh"}"#,
        )
        .await;

        let grant = client
            .exchange_code(Provider::Google, "XYZ", Some("S1"))
            .await
            .unwrap();

        assert_eq!(grant.refresh_token.as_deref(), Some("g-refresh"));
        assert_eq!(
            server.await.unwrap(),
            "GET /oauth/google/callback?code=XYZ HTTP/1.1"
        );
    }

    #[tokio::test]
    async fn test_exchange_without_access_token_is_rejected() {
        let (client, _server) = serve_once("200 OK", "application/json", "{}").await;

        let result = client.exchange_code(Provider::Google, "XYZ", None).await;
        assert!(matches!(
            result,
            Err(Error::Backend { operation: "code exchange", status: None, .. })
        ));
    }

    #[tokio::test]
    async fn test_authorization_url_plain_text() {
        let (client, server) = serve_once(
            "200 OK",
            "text/plain",
            "https://accounts.google.com/o/oauth2/v2/auth?client_id=playlog\n",
        )
        .await;

        let request = client.authorization_url(Provider::Google).await.unwrap();

        assert_eq!(request.provider, Provider::Google);
        assert_eq!(
            request.authorization_url,
            "https://accounts.google.com/o/oauth2/v2/auth?client_id=playlog"
        );
        assert_eq!(server.await.unwrap(), "GET /oauth/google/login HTTP/1.1");
    }

    #[tokio::test]
    async fn test_authorization_url_json_string() {
        let (client, _server) = serve_once(
            "200 OK",
            "application/json",
            r#""https://nid.naver.com/oauth2.0/authorize?state=naver%3An0nce""#,
        )
        .await;

        let request = client.authorization_url(Provider::Naver).await.unwrap();
        assert_eq!(
            request.authorization_url,
            "https://nid.naver.com/oauth2.0/authorize?state=naver%3An0nce"
        );
    }

    #[tokio::test]
    async fn test_error_message_extracted() {
        let (client, _server) = serve_once(
            "400 Bad Request",
            "application/json",
            r#"{"status":400,"message":"Naver login is disabled"}"#,
        )
        .await;

        let result = client.authorization_url(Provider::Naver).await;
        assert!(matches!(
            result,
            Err(Error::Backend { status: Some(400), ref detail, .. }) if detail == "Naver login is disabled"
        ));
    }

    #[tokio::test]
    async fn test_error_without_message_keeps_body() {
        let (client, _server) = serve_once("502 Bad Gateway", "text/plain", "upstream down").await;

        let result = client.exchange_code(Provider::Google, "XYZ", None).await;
        assert!(matches!(
            result,
            Err(Error::Backend { status: Some(502), ref detail, .. }) if detail == "upstream down"
        ));
    }
}
