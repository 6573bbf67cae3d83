use super::types::Notice;
use crate::error::Error;

/// Failures of the sign-in flow, grouped by how they reach the user.
#[derive(Debug, thiserror::Error)]
pub enum FlowError {
    /// An identity-endpoint call failed. Shown as a transient notice; never retried.
    #[error("Network failure: {0}")]
    NetworkFailure(String),

    /// The token did not decode into claims. The stored token has been discarded.
    #[error("Token could not be decoded")]
    DecodeFailure,

    /// A required login field was blank. Surfaced inline, nothing was sent.
    #[error("Missing credential: {0}")]
    MissingCredential(&'static str),

    /// A protected view was entered without a session. Handled as a redirect.
    #[error("Not authenticated")]
    UnauthenticatedAccess,

    /// A callback arrived without the parameter it depends on.
    #[error("Missing callback parameter: {0}")]
    MissingParameter(&'static str),

    /// Missing or invalid configuration.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl FlowError {
    /// The transient notice for this error, if it is surfaced as one.
    ///
    /// Inline and redirect-style errors return `None`.
    #[must_use]
    pub fn notice(&self) -> Option<Notice> {
        match self {
            Self::NetworkFailure(msg) => Some(Notice::error(msg.clone())),
            Self::DecodeFailure => Some(Notice::error(
                "Sign-in failed: the server did not return a valid token",
            )),
            Self::MissingParameter(param) => Some(Notice::error(format!(
                "Sign-in could not be completed: callback carried no {param}"
            ))),
            Self::Config(_) => {
                tracing::error!(error = %self, "Sign-in flow misconfigured");
                Some(Notice::error("Sign-in is currently unavailable"))
            }
            Self::MissingCredential(_) | Self::UnauthenticatedAccess => None,
        }
    }
}

impl From<Error> for FlowError {
    fn from(e: Error) -> Self {
        match e {
            Error::Decode(_) => Self::DecodeFailure,
            Error::MissingCredential(field) => Self::MissingCredential(field),
            Error::Config(msg) => Self::Config(msg),
            Error::Backend { detail, .. } if !detail.is_empty() => Self::NetworkFailure(detail),
            other => Self::NetworkFailure(other.to_string()),
        }
    }
}
