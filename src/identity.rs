use std::future::Future;

use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::types::Provider;

/// Authorization URL issued by the backend for one provider.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub struct ProviderAuthRequest {
    pub provider: Provider,
    pub authorization_url: String,
}

impl ProviderAuthRequest {
    #[must_use]
    pub fn new(provider: Provider, authorization_url: impl Into<String>) -> Self {
        Self {
            provider,
            authorization_url: authorization_url.into(),
        }
    }
}

/// Tokens returned by a provider code exchange.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
#[non_exhaustive]
pub struct TokenGrant {
    #[serde(default)]
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
}

impl TokenGrant {
    #[must_use]
    pub fn new(access_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token: None,
        }
    }

    #[must_use]
    pub fn with_refresh_token(mut self, refresh_token: impl Into<String>) -> Self {
        self.refresh_token = Some(refresh_token.into());
        self
    }
}

/// Tokens returned by the direct username/password login.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
#[non_exhaustive]
pub struct LoginGrant {
    #[serde(default)]
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: String,
    /// Where the backend suggests landing after login (`redirectUrl` on the wire).
    #[serde(default, rename = "redirectUrl")]
    pub redirect_hint: Option<String>,
}

impl LoginGrant {
    #[must_use]
    pub fn new(access_token: impl Into<String>, refresh_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token: refresh_token.into(),
            redirect_hint: None,
        }
    }

    #[must_use]
    pub fn with_redirect_hint(mut self, hint: impl Into<String>) -> Self {
        self.redirect_hint = Some(hint.into());
        self
    }
}

/// Username/password pair for the direct login form.
#[derive(Clone, Serialize)]
pub struct Credentials {
    username: String,
    password: String,
}

impl Credentials {
    #[must_use]
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    #[must_use]
    pub fn username(&self) -> &str {
        &self.username
    }

    /// Rejects blank fields before anything reaches the network.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingCredential`] naming the first blank field.
    pub fn validate(&self) -> Result<(), Error> {
        if self.username.trim().is_empty() {
            return Err(Error::MissingCredential("username"));
        }
        if self.password.is_empty() {
            return Err(Error::MissingCredential("password"));
        }
        Ok(())
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Network boundary to the identity backend.
///
/// Implementations perform the call and nothing else: persistence and
/// navigation belong to the caller.
pub trait IdentityApi: Send + Sync + 'static {
    /// Fetch the provider's authorization URL.
    fn authorization_url(
        &self,
        provider: Provider,
    ) -> impl Future<Output = Result<ProviderAuthRequest, Error>> + Send;

    /// Exchange an authorization code. `state` is forwarded only for providers
    /// that use it ([`Provider::forwards_state`]); it is never validated here.
    fn exchange_code(
        &self,
        provider: Provider,
        code: &str,
        state: Option<&str>,
    ) -> impl Future<Output = Result<TokenGrant, Error>> + Send;

    /// Direct username/password login.
    fn login(
        &self,
        credentials: &Credentials,
    ) -> impl Future<Output = Result<LoginGrant, Error>> + Send;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn credentials_validation() {
        assert!(Credentials::new("gordon", "crowbar").validate().is_ok());
        assert!(matches!(
            Credentials::new("  ", "crowbar").validate(),
            Err(Error::MissingCredential("username"))
        ));
        assert!(matches!(
            Credentials::new("gordon", "").validate(),
            Err(Error::MissingCredential("password"))
        ));
    }

    #[test]
    fn credentials_debug_redacts_password() {
        let debug = format!("{:?}", Credentials::new("gordon", "crowbar"));
        assert!(debug.contains("gordon"));
        assert!(!debug.contains("crowbar"));
    }

    #[test]
    fn token_grant_from_camel_case() {
        let grant: TokenGrant =
            serde_json::from_str(r#"{"accessToken":"a","refreshToken":"r"}"#).unwrap();
        assert_eq!(grant.access_token, "a");
        assert_eq!(grant.refresh_token.as_deref(), Some("r"));

        let bare: TokenGrant = serde_json::from_str("{}").unwrap();
        assert!(bare.access_token.is_empty());
    }

    #[test]
    fn login_grant_reads_redirect_url() {
        let grant: LoginGrant = serde_json::from_str(
            r#"{"accessToken":"a","refreshToken":"r","redirectUrl":"/games"}"#,
        )
        .unwrap();
        assert_eq!(grant.redirect_hint.as_deref(), Some("/games"));
    }
}
