use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;
use url::Url;

use super::config::{FlowConfig, FlowSettings};
use super::context::{AccountLinkContext, CallbackContext, safe_redirect, select_provider};
use super::error::FlowError;
use super::gate::{AccessGate, Requirement};
use super::traits::Navigator;
use super::types::{CallbackOutcome, CallbackPhase, Notice, ProviderLinks};
use crate::error::Error;
use crate::identity::{Credentials, IdentityApi, ProviderAuthRequest};
use crate::session::{Session, SessionState};
use crate::store::TokenStore;
use crate::types::Provider;

/// Drives the session from the routes a browser lands on after leaving for an
/// external sign-in page.
///
/// One entry function per route:
/// - [`handle_login_route`](Self::handle_login_route) for the login page
///   (direct token, code exchange, or plain landing);
/// - [`handle_account_link`](Self::handle_account_link) for the game-account
///   link callback.
///
/// Only one entry resolves at a time. A second entry while one is in flight
/// returns [`CallbackOutcome::Busy`] without touching the session.
pub struct CallbackRouter<A, T, N> {
    api: A,
    session: Arc<SessionState<T>>,
    navigator: Arc<N>,
    settings: FlowSettings,
    phase: Mutex<CallbackPhase>,
    resolving: AtomicBool,
}

impl<A, T, N> CallbackRouter<A, T, N>
where
    A: IdentityApi,
    T: TokenStore,
    N: Navigator,
{
    #[must_use]
    pub fn new(
        config: FlowConfig,
        api: A,
        session: Arc<SessionState<T>>,
        navigator: Arc<N>,
    ) -> Self {
        Self {
            api,
            session,
            navigator,
            settings: config.settings,
            phase: Mutex::new(CallbackPhase::Landing),
            resolving: AtomicBool::new(false),
        }
    }

    #[must_use]
    pub fn session(&self) -> &Arc<SessionState<T>> {
        &self.session
    }

    #[must_use]
    pub fn api(&self) -> &A {
        &self.api
    }

    /// Phase reached by the most recent entry.
    #[must_use]
    pub fn phase(&self) -> CallbackPhase {
        *self.phase.lock()
    }

    /// Access gate for a protected view, sharing this router's session and navigator.
    #[must_use]
    pub fn gate(&self, requirement: Requirement) -> AccessGate<T, N> {
        AccessGate::new(
            Arc::clone(&self.session),
            Arc::clone(&self.navigator),
            self.settings.login_path.clone(),
            requirement,
        )
    }

    // ── Login route ────────────────────────────────────────────────────

    /// Entry point for the login route, given the full current location.
    pub async fn handle_login_route(&self, location: &Url) -> CallbackOutcome {
        let Some(_guard) = ResolveGuard::acquire(&self.resolving) else {
            tracing::debug!("Callback already resolving; ignoring re-entry");
            return CallbackOutcome::Busy;
        };

        self.transition(CallbackPhase::Landing);
        let context = CallbackContext::parse(location.query());
        self.transition(CallbackPhase::Resolving);

        let outcome = match context {
            CallbackContext::DirectToken { token } => self.ingest_direct_token(location, &token),
            CallbackContext::CodeExchange { code, state } => {
                let provider = select_provider(&self.settings, location.path(), state.as_deref());
                self.exchange(location, provider, &code, state.as_deref())
                    .await
            }
            CallbackContext::Landing { error } => self.land(error).await,
        };

        self.transition(outcome.phase());
        outcome
    }

    fn ingest_direct_token(&self, location: &Url, token: &str) -> CallbackOutcome {
        let session = self.session.set_direct_token(token);
        self.strip_query(location);

        if !session.is_logged_in {
            return self.fail(FlowError::DecodeFailure);
        }

        self.complete(session, None, &self.settings.default_view, "Signed in")
    }

    async fn exchange(
        &self,
        location: &Url,
        provider: Provider,
        code: &str,
        state: Option<&str>,
    ) -> CallbackOutcome {
        tracing::debug!(provider = %provider, "Exchanging authorization code");

        let result = self.api.exchange_code(provider, code, state).await;
        // The code is single-use either way; keep it out of history.
        self.strip_query(location);

        let grant = match result {
            Ok(grant) if !grant.access_token.is_empty() => grant,
            Ok(_) => {
                tracing::error!(provider = %provider, "Code exchange returned no access token");
                return self.fail(FlowError::DecodeFailure);
            }
            Err(e) => {
                tracing::error!(provider = %provider, error = %e, "Code exchange failed");
                return self.fail(e.into());
            }
        };

        let session = self
            .session
            .set_tokens(&grant.access_token, grant.refresh_token.as_deref());
        if !session.is_logged_in {
            return self.fail(FlowError::DecodeFailure);
        }

        let message = format!("Signed in with {}", provider.label());
        self.complete(session, Some(provider), &self.settings.default_view, &message)
    }

    async fn land(&self, error: Option<String>) -> CallbackOutcome {
        if let Some(error) = error {
            tracing::warn!(error = %error, "Provider reported a sign-in error");
            self.navigator
                .notify(Notice::error(format!("Sign-in was not completed: {error}")));
        }

        let session = self.session.reload();
        if session.is_logged_in {
            return CallbackOutcome::Authenticated {
                session,
                provider: None,
            };
        }

        CallbackOutcome::AwaitingLogin {
            links: self.provider_links().await,
        }
    }

    /// Fetch both providers' authorization URLs concurrently.
    ///
    /// A provider whose request fails is reported through a notice and left out.
    pub async fn provider_links(&self) -> ProviderLinks {
        let (google, naver) = futures::future::join(
            self.api.authorization_url(Provider::Google),
            self.api.authorization_url(Provider::Naver),
        )
        .await;

        ProviderLinks {
            google: self.link_or_notice(Provider::Google, google),
            naver: self.link_or_notice(Provider::Naver, naver),
        }
    }

    fn link_or_notice(
        &self,
        provider: Provider,
        result: Result<ProviderAuthRequest, Error>,
    ) -> Option<String> {
        match result {
            Ok(request) => Some(request.authorization_url),
            Err(e) => {
                tracing::error!(provider = %provider, error = %e, "Authorization URL request failed");
                self.navigator.notify(Notice::error(format!(
                    "Could not load the {} sign-in link",
                    provider.label()
                )));
                None
            }
        }
    }

    // ── Account link ───────────────────────────────────────────────────

    /// Entry point for the game-account link callback.
    pub async fn handle_account_link(&self, location: &Url) -> CallbackOutcome {
        let Some(_guard) = ResolveGuard::acquire(&self.resolving) else {
            tracing::debug!("Callback already resolving; ignoring re-entry");
            return CallbackOutcome::Busy;
        };

        self.transition(CallbackPhase::Landing);
        let context = AccountLinkContext::parse(location.query());
        self.transition(CallbackPhase::Resolving);

        let outcome = match context {
            Some(link) => self.ingest_linked_token(location, &link),
            None => {
                tracing::error!("Account link callback carried no access token");
                self.fail(FlowError::MissingParameter("accessToken"))
            }
        };

        self.transition(outcome.phase());
        outcome
    }

    fn ingest_linked_token(&self, location: &Url, link: &AccountLinkContext) -> CallbackOutcome {
        let session = self
            .session
            .set_linked_token(&link.access_token, link.display_name.as_deref());
        self.strip_query(location);

        if !session.is_logged_in {
            return self.fail(FlowError::DecodeFailure);
        }

        let target =
            safe_redirect(link.redirect_url.as_deref()).unwrap_or(self.settings.default_view.as_str());
        self.complete(session, None, target, "Game account linked")
    }

    // ── Direct login ───────────────────────────────────────────────────

    /// Username/password sign-in.
    ///
    /// Blank fields are rejected before any request. On success the session is
    /// stored and the browser is sent to the backend's suggested page (if it is
    /// a local path) or the default view.
    ///
    /// # Errors
    ///
    /// [`FlowError::MissingCredential`] for blank fields (render inline),
    /// [`FlowError::NetworkFailure`] if the backend refused or could not be
    /// reached, [`FlowError::DecodeFailure`] if its token is unreadable.
    pub async fn sign_in(&self, credentials: &Credentials) -> Result<Session, FlowError> {
        credentials.validate()?;

        let grant = match self.api.login(credentials).await {
            Ok(grant) if !grant.access_token.is_empty() && !grant.refresh_token.is_empty() => grant,
            Ok(_) => {
                return Err(self.report(FlowError::NetworkFailure(
                    "Sign-in failed: the server did not return a valid token".into(),
                )));
            }
            Err(e) => {
                tracing::error!(error = %e, "Login failed");
                return Err(self.report(e.into()));
            }
        };

        let session = self
            .session
            .set_tokens(&grant.access_token, Some(grant.refresh_token.as_str()));
        if !session.is_logged_in {
            return Err(self.report(FlowError::DecodeFailure));
        }

        let target =
            safe_redirect(grant.redirect_hint.as_deref()).unwrap_or(self.settings.default_view.as_str());
        tracing::info!(user = %credentials.username(), "Password login successful");
        self.navigator.notify(Notice::success("Signed in"));
        self.navigator.navigate(target);
        Ok(session)
    }

    /// Drop the session and return to the login entry point.
    pub fn sign_out(&self) -> Session {
        let session = self.session.clear();
        tracing::info!("Signed out");
        self.navigator.navigate(&self.settings.login_path);
        session
    }

    // ── Helpers ────────────────────────────────────────────────────────

    fn complete(
        &self,
        session: Session,
        provider: Option<Provider>,
        target: &str,
        message: &str,
    ) -> CallbackOutcome {
        tracing::info!(provider = ?provider, target = %target, "Session established");
        self.navigator.notify(Notice::success(message));
        self.navigator.navigate(target);
        CallbackOutcome::Authenticated { session, provider }
    }

    fn fail(&self, error: FlowError) -> CallbackOutcome {
        tracing::warn!(error = %error, "Callback failed");
        CallbackOutcome::Failed {
            error: self.report(error),
        }
    }

    fn report(&self, error: FlowError) -> FlowError {
        if let Some(notice) = error.notice() {
            self.navigator.notify(notice);
        }
        error
    }

    fn strip_query(&self, location: &Url) {
        if location.query().is_none() {
            return;
        }
        let mut clean = location.clone();
        clean.set_query(None);
        self.navigator.replace_url(&clean);
    }

    fn transition(&self, next: CallbackPhase) {
        let mut phase = self.phase.lock();
        tracing::debug!(from = ?*phase, to = ?next, "Callback phase");
        *phase = next;
    }
}

/// Marks the router as resolving until dropped.
struct ResolveGuard<'a>(&'a AtomicBool);

impl<'a> ResolveGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for ResolveGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}
