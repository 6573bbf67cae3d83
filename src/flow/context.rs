use std::collections::HashMap;

use url::form_urlencoded;

use super::config::FlowSettings;
use crate::types::Provider;

/// What a login-route query string asks for. Exactly one branch applies,
/// checked in declaration order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallbackContext {
    /// `?token=…`: the backend handed the access token over directly.
    DirectToken { token: String },
    /// `?code=…[&state=…]` without `token`: an authorization code to exchange.
    CodeExchange { code: String, state: Option<String> },
    /// Neither: show the login view. `error` carries a provider-reported failure.
    Landing { error: Option<String> },
}

impl CallbackContext {
    #[must_use]
    pub fn parse(query: Option<&str>) -> Self {
        let mut params = query_params(query);

        if let Some(token) = params.remove("token") {
            return Self::DirectToken { token };
        }
        if let Some(code) = params.remove("code") {
            return Self::CodeExchange {
                code,
                state: params.remove("state"),
            };
        }
        Self::Landing {
            error: params
                .remove("error_description")
                .or_else(|| params.remove("error")),
        }
    }
}

/// Query of the game-account link callback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountLinkContext {
    pub access_token: String,
    pub redirect_url: Option<String>,
    pub display_name: Option<String>,
}

impl AccountLinkContext {
    /// `None` when the callback carries no `accessToken`.
    #[must_use]
    pub fn parse(query: Option<&str>) -> Option<Self> {
        let mut params = query_params(query);
        Some(Self {
            access_token: params.remove("accessToken")?,
            redirect_url: params.remove("redirectUrl"),
            display_name: params.remove("steamNickname"),
        })
    }
}

/// Picks the single provider an authorization code belongs to.
///
/// A provider-specific callback path wins, then a `<provider>:` tag on
/// `state`. Otherwise a bare `state` means Naver (the only provider that sends
/// one) and its absence means Google.
pub(crate) fn select_provider(settings: &FlowSettings, path: &str, state: Option<&str>) -> Provider {
    if let Some(provider) = settings.provider_for_path(path) {
        return provider;
    }
    if let Some(provider) = state
        .and_then(|s| s.split_once(':'))
        .and_then(|(tag, _)| tag.parse().ok())
    {
        return provider;
    }
    if state.is_some() {
        Provider::Naver
    } else {
        Provider::Google
    }
}

/// Accepts only same-origin absolute paths as post-login destinations.
pub(crate) fn safe_redirect(target: Option<&str>) -> Option<&str> {
    target.filter(|t| t.starts_with('/') && !t.starts_with("//") && !t.contains('\\'))
}

// First occurrence wins and empty values count as absent.
fn query_params(query: Option<&str>) -> HashMap<String, String> {
    let mut params = HashMap::new();
    for (key, value) in form_urlencoded::parse(query.unwrap_or_default().as_bytes()) {
        if value.is_empty() {
            continue;
        }
        params
            .entry(key.into_owned())
            .or_insert_with(|| value.into_owned());
    }
    params
}
