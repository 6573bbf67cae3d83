use std::future::Future;
use std::sync::Arc;

use super::error::FlowError;
use super::traits::Navigator;
use super::types::Notice;
use crate::claims::Claims;
use crate::error::Error;
use crate::session::SessionState;
use crate::store::TokenStore;

/// What a protected view needs before it shows content.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Requirement {
    /// Any decodable session.
    SignedIn,
    /// A session whose claims carry a linked game account id.
    LinkedAccount,
}

/// How a protected view renders after entering its gate.
#[derive(Debug)]
pub enum GateView<R> {
    /// No usable session; navigation to the login entry point has been issued.
    Redirect { to: String },
    /// Signed in but no linked account: render the view with a link prompt.
    /// A warning notice asking the user to link the account has been shown.
    LinkPrompt { claims: Claims },
    /// Entry fetch succeeded.
    Ready { claims: Claims, data: R },
    /// Entry fetch failed; a notice has been shown and the view stays up.
    Unavailable { claims: Claims, error: FlowError },
}

/// Guard for one render of a protected view.
///
/// [`enter`](AccessGate::enter) consumes the gate, so the entry fetch runs at
/// most once per gate.
///
/// # Example
///
/// ```rust,ignore
/// let view = router
///     .gate(Requirement::LinkedAccount)
///     .enter(|claims| async move {
///         let steam_id = claims.linked_account_id.map(|id| id.0).unwrap_or_default();
///         client.fetch_resource::<Profile>("steam/profile", &[("steamId", &steam_id)], &token).await
///     })
///     .await;
/// ```
pub struct AccessGate<T, N> {
    session: Arc<SessionState<T>>,
    navigator: Arc<N>,
    login_path: String,
    requirement: Requirement,
}

impl<T: TokenStore, N: Navigator> AccessGate<T, N> {
    #[must_use]
    pub fn new(
        session: Arc<SessionState<T>>,
        navigator: Arc<N>,
        login_path: impl Into<String>,
        requirement: Requirement,
    ) -> Self {
        Self {
            session,
            navigator,
            login_path: login_path.into(),
            requirement,
        }
    }

    #[must_use]
    pub fn requirement(&self) -> Requirement {
        self.requirement
    }

    /// Evaluate the session and, when the view may show content, run `fetch`.
    ///
    /// The session is re-read from the store first, so a token written or
    /// corrupted elsewhere is seen here. An undecodable token is discarded and
    /// treated as no token. A missing linked account degrades the view instead
    /// of redirecting.
    pub async fn enter<F, Fut, R>(self, fetch: F) -> GateView<R>
    where
        F: FnOnce(Claims) -> Fut,
        Fut: Future<Output = Result<R, Error>>,
    {
        let session = self.session.reload();
        if !session.is_logged_in {
            return self.redirect();
        }

        let Some(claims) = self.session.claims() else {
            self.session.clear();
            return self.redirect();
        };

        if self.requirement == Requirement::LinkedAccount && claims.linked_account_id.is_none() {
            tracing::debug!(subject = %claims.subject_id, "No linked game account; rendering link prompt");
            self.navigator
                .notify(Notice::warning("Link your Steam account to see your game data"));
            return GateView::LinkPrompt { claims };
        }

        match fetch(claims.clone()).await {
            Ok(data) => GateView::Ready { claims, data },
            Err(e) => {
                tracing::error!(error = %e, "Protected view fetch failed");
                let error = FlowError::from(e);
                if let Some(notice) = error.notice() {
                    self.navigator.notify(notice);
                }
                GateView::Unavailable { claims, error }
            }
        }
    }

    fn redirect<R>(self) -> GateView<R> {
        tracing::debug!(to = %self.login_path, "No session; redirecting to login");
        self.navigator.navigate(&self.login_path);
        GateView::Redirect {
            to: self.login_path,
        }
    }
}
