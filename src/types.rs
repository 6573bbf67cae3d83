use derive_more::{Display, From, Into};
use serde::{Deserialize, Serialize};

use crate::error::Error;

/// External identity provider brokered by the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    Google,
    Naver,
}

impl Provider {
    pub const ALL: [Provider; 2] = [Provider::Google, Provider::Naver];

    /// Lowercase identifier used in endpoint paths and `state` tags.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Google => "google",
            Self::Naver => "naver",
        }
    }

    /// Whether the provider's code exchange carries the anti-forgery `state`.
    #[must_use]
    pub fn forwards_state(&self) -> bool {
        matches!(self, Self::Naver)
    }

    /// Human-readable provider name for notices.
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Self::Google => "Google",
            Self::Naver => "Naver",
        }
    }
}

impl std::fmt::Display for Provider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Provider {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "google" => Ok(Self::Google),
            "naver" => Ok(Self::Naver),
            other => Err(Error::UnknownProvider(other.to_owned())),
        }
    }
}

/// Token subject (`sub` claim) as asserted by the issuing backend.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Display, From, Into)]
#[serde(transparent)]
pub struct SubjectId(pub String);

/// Identifier of the third-party game account linked to the user.
///
/// Views that show game data are gated on its presence.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Display, From, Into)]
#[serde(transparent)]
pub struct LinkedAccountId(pub String);

impl LinkedAccountId {
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}
