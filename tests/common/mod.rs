#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::Notify;
use playlog_auth::claims::{self, Claims};
use playlog_auth::flow::{CallbackRouter, FlowConfig, Navigator, Notice};
use playlog_auth::{
    Credentials, Error, IdentityApi, LoginGrant, MemoryTokenStore, Provider, ProviderAuthRequest,
    SessionState, TokenGrant,
};
use url::Url;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    AuthorizationUrl(Provider),
    Exchange {
        provider: Provider,
        code: String,
        state: Option<String>,
    },
    Login(String),
}

/// Scripted identity backend that records every call.
#[derive(Default)]
pub struct FakeIdentity {
    calls: Mutex<Vec<Call>>,
    grants: HashMap<Provider, TokenGrant>,
    auth_urls: HashMap<Provider, String>,
    login: Option<Result<LoginGrant, String>>,
    exchange_hold: Option<Arc<Notify>>,
}

impl FakeIdentity {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_grant(mut self, provider: Provider, grant: TokenGrant) -> Self {
        self.grants.insert(provider, grant);
        self
    }

    pub fn with_auth_url(mut self, provider: Provider, url: &str) -> Self {
        self.auth_urls.insert(provider, url.to_owned());
        self
    }

    pub fn with_login(mut self, result: Result<LoginGrant, String>) -> Self {
        self.login = Some(result);
        self
    }

    /// Keep every code exchange pending until `release` is notified.
    pub fn with_exchange_hold(mut self, release: Arc<Notify>) -> Self {
        self.exchange_hold = Some(release);
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().clone()
    }

    pub fn exchanges(&self) -> Vec<Call> {
        self.calls()
            .into_iter()
            .filter(|c| matches!(c, Call::Exchange { .. }))
            .collect()
    }

    fn unavailable(operation: &'static str, detail: &str) -> Error {
        Error::Backend {
            operation,
            status: Some(503),
            detail: detail.to_owned(),
        }
    }
}

impl IdentityApi for FakeIdentity {
    async fn authorization_url(&self, provider: Provider) -> Result<ProviderAuthRequest, Error> {
        self.calls.lock().push(Call::AuthorizationUrl(provider));
        self.auth_urls
            .get(&provider)
            .map(|url| ProviderAuthRequest::new(provider, url.clone()))
            .ok_or_else(|| Self::unavailable("authorization URL request", "unavailable"))
    }

    async fn exchange_code(
        &self,
        provider: Provider,
        code: &str,
        state: Option<&str>,
    ) -> Result<TokenGrant, Error> {
        self.calls.lock().push(Call::Exchange {
            provider,
            code: code.to_owned(),
            state: state.map(str::to_owned),
        });
        if let Some(release) = &self.exchange_hold {
            release.notified().await;
        }
        self.grants
            .get(&provider)
            .cloned()
            .ok_or_else(|| Self::unavailable("code exchange", "invalid_grant"))
    }

    async fn login(&self, credentials: &Credentials) -> Result<LoginGrant, Error> {
        self.calls
            .lock()
            .push(Call::Login(credentials.username().to_owned()));
        match &self.login {
            Some(Ok(grant)) => Ok(grant.clone()),
            Some(Err(message)) => Err(Error::Backend {
                operation: "login",
                status: Some(401),
                detail: message.clone(),
            }),
            None => Err(Self::unavailable("login", "")),
        }
    }
}

/// Navigator that records what the flow asked the host to do.
#[derive(Default)]
pub struct RecordingNavigator {
    replaced: Mutex<Vec<String>>,
    navigations: Mutex<Vec<String>>,
    notices: Mutex<Vec<Notice>>,
}

impl RecordingNavigator {
    pub fn replaced(&self) -> Vec<String> {
        self.replaced.lock().clone()
    }

    pub fn navigations(&self) -> Vec<String> {
        self.navigations.lock().clone()
    }

    pub fn notices(&self) -> Vec<Notice> {
        self.notices.lock().clone()
    }
}

impl Navigator for RecordingNavigator {
    fn replace_url(&self, url: &Url) {
        self.replaced.lock().push(url.to_string());
    }

    fn navigate(&self, path: &str) {
        self.navigations.lock().push(path.to_owned());
    }

    fn notify(&self, notice: Notice) {
        self.notices.lock().push(notice);
    }
}

pub type TestRouter = CallbackRouter<FakeIdentity, MemoryTokenStore, RecordingNavigator>;

pub fn token_for(claims: &Claims) -> String {
    claims::encode_unsigned(claims).unwrap()
}

pub fn router(api: FakeIdentity) -> (TestRouter, Arc<RecordingNavigator>) {
    router_with(FlowConfig::new(), api, MemoryTokenStore::new())
}

pub fn router_with(
    config: FlowConfig,
    api: FakeIdentity,
    store: MemoryTokenStore,
) -> (TestRouter, Arc<RecordingNavigator>) {
    let navigator = Arc::new(RecordingNavigator::default());
    let session = Arc::new(SessionState::new(store));
    let router = CallbackRouter::new(config, api, session, Arc::clone(&navigator));
    (router, navigator)
}

pub fn location(s: &str) -> Url {
    s.parse().unwrap()
}
