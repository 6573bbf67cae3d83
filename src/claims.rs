use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use serde::{Deserialize, Deserializer, Serialize};
use time::OffsetDateTime;

use crate::error::Error;
use crate::types::{LinkedAccountId, SubjectId};

/// Identity attributes read from a bearer token's payload.
///
/// These are *claims*, not verified identity: the signature is never checked.
/// Treat them as what the backend asserted when it issued the token, nothing more.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "WireClaims")]
#[non_exhaustive]
pub struct Claims {
    #[serde(rename = "sub")]
    pub subject_id: SubjectId,
    #[serde(rename = "steamId", skip_serializing_if = "Option::is_none")]
    pub linked_account_id: Option<LinkedAccountId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(
        rename = "exp",
        with = "time::serde::timestamp::option",
        skip_serializing_if = "Option::is_none"
    )]
    pub expiry: Option<OffsetDateTime>,
}

/// Payload as issued. Ids may be strings or bare numbers, and the linked
/// account may appear under either key.
#[derive(Deserialize)]
struct WireClaims {
    #[serde(default, deserialize_with = "string_or_number")]
    sub: Option<String>,
    #[serde(rename = "steamId", default, deserialize_with = "string_or_number")]
    steam_id: Option<String>,
    #[serde(rename = "linkedAccountId", default, deserialize_with = "string_or_number")]
    linked_account_id: Option<String>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default, with = "time::serde::timestamp::option")]
    exp: Option<OffsetDateTime>,
}

impl From<WireClaims> for Claims {
    fn from(wire: WireClaims) -> Self {
        Self {
            subject_id: SubjectId(wire.sub.unwrap_or_default()),
            linked_account_id: wire
                .steam_id
                .or(wire.linked_account_id)
                .map(LinkedAccountId),
            name: wire.name,
            expiry: wire.exp,
        }
    }
}

impl Claims {
    /// Create claims with only the required subject.
    #[must_use]
    pub fn new(subject_id: impl Into<String>) -> Self {
        Self {
            subject_id: SubjectId(subject_id.into()),
            linked_account_id: None,
            name: None,
            expiry: None,
        }
    }

    /// Set the linked game account id.
    #[must_use]
    pub fn with_linked_account(mut self, id: impl Into<String>) -> Self {
        self.linked_account_id = Some(LinkedAccountId(id.into()));
        self
    }

    /// Set the display name.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Set the expiry (second precision on the wire).
    #[must_use]
    pub fn with_expiry(mut self, expiry: OffsetDateTime) -> Self {
        self.expiry = Some(expiry);
        self
    }

    /// Whether `exp` lies at or before `now`. Tokens without `exp` never expire.
    #[must_use]
    pub fn is_expired_at(&self, now: OffsetDateTime) -> bool {
        self.expiry.is_some_and(|exp| exp <= now)
    }

    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(OffsetDateTime::now_utc())
    }
}

/// Decodes the payload segment of a three-segment bearer token into [`Claims`].
///
/// Performs no signature verification. Any structural problem (segment count,
/// base64, JSON, missing or empty `sub`) yields [`Error::Decode`]; callers treat
/// that exactly like having no token at all.
///
/// # Errors
///
/// Returns [`Error::Decode`] if the token cannot be read as claims.
pub fn decode(token: &str) -> Result<Claims, Error> {
    let mut segments = token.split('.');
    let (Some(header), Some(payload), Some(_signature), None) = (
        segments.next(),
        segments.next(),
        segments.next(),
        segments.next(),
    ) else {
        return Err(Error::Decode("token must have 3 segments".into()));
    };
    if header.is_empty() || payload.is_empty() {
        return Err(Error::Decode("empty token segment".into()));
    }

    let bytes = URL_SAFE_NO_PAD
        .decode(payload.trim_end_matches('='))
        .map_err(|e| Error::Decode(format!("base64 decode failed: {e}")))?;

    let claims: Claims = serde_json::from_slice(&bytes)
        .map_err(|e| Error::Decode(format!("JSON parse failed: {e}")))?;

    if claims.subject_id.0.is_empty() {
        return Err(Error::Decode("empty claim: sub".into()));
    }

    Ok(claims)
}

/// Encodes claims as an unsigned (`alg: none`) token.
///
/// For development issuers and fixtures only; nothing here is trustworthy.
///
/// # Errors
///
/// Returns [`Error::Decode`] if the claims cannot be serialized.
pub fn encode_unsigned(claims: &Claims) -> Result<String, Error> {
    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"none","typ":"JWT"}"#);
    let payload = serde_json::to_vec(claims)
        .map_err(|e| Error::Decode(format!("claims serialization failed: {e}")))?;
    let payload = URL_SAFE_NO_PAD.encode(payload);
    Ok(format!("{header}.{payload}.unsigned"))
}

// Ids show up both as JSON strings and as bare numbers. Empty means absent.
fn string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Unsigned(u64),
        Signed(i64),
    }

    let raw = Option::<Raw>::deserialize(deserializer)?;
    Ok(raw
        .map(|raw| match raw {
            Raw::Text(text) => text,
            Raw::Unsigned(n) => n.to_string(),
            Raw::Signed(n) => n.to_string(),
        })
        .filter(|id| !id.is_empty()))
}
