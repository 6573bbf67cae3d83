use super::error::FlowError;
use crate::session::Session;
use crate::types::Provider;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Success,
    Warning,
    Error,
}

/// Transient, user-facing message (toast).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    #[must_use]
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Success,
            message: message.into(),
        }
    }

    #[must_use]
    pub fn warning(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Warning,
            message: message.into(),
        }
    }

    #[must_use]
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Error,
            message: message.into(),
        }
    }
}

/// States of a callback route. `Authenticated`, `AwaitingLogin` and `Error`
/// are terminal for one entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallbackPhase {
    Landing,
    Resolving,
    Authenticated,
    AwaitingLogin,
    Error,
}

impl CallbackPhase {
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Authenticated | Self::AwaitingLogin | Self::Error)
    }
}

/// Authorization URLs to present on the login view. A provider whose URL could
/// not be fetched is `None`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProviderLinks {
    pub google: Option<String>,
    pub naver: Option<String>,
}

impl ProviderLinks {
    #[must_use]
    pub fn get(&self, provider: Provider) -> Option<&str> {
        match provider {
            Provider::Google => self.google.as_deref(),
            Provider::Naver => self.naver.as_deref(),
        }
    }
}

/// Result of one callback route entry.
#[derive(Debug)]
pub enum CallbackOutcome {
    /// Tokens were ingested. `provider` is set for code exchanges.
    Authenticated {
        session: Session,
        provider: Option<Provider>,
    },
    /// Plain landing: show the login form with these links.
    AwaitingLogin { links: ProviderLinks },
    Failed { error: FlowError },
    /// Another entry is still resolving; nothing was done.
    Busy,
}

impl CallbackOutcome {
    #[must_use]
    pub fn phase(&self) -> CallbackPhase {
        match self {
            Self::Authenticated { .. } => CallbackPhase::Authenticated,
            Self::AwaitingLogin { .. } => CallbackPhase::AwaitingLogin,
            Self::Failed { .. } => CallbackPhase::Error,
            Self::Busy => CallbackPhase::Resolving,
        }
    }
}
