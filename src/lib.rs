#![doc = include_str!("../README.md")]

pub mod claims;
#[cfg(feature = "http")]
pub mod client;
pub mod error;
pub mod flow;
pub mod identity;
pub mod session;
pub mod store;
pub mod types;

// Re-exports for convenient access
pub use claims::Claims;
#[cfg(feature = "http")]
pub use client::{IdentityClient, IdentityConfig};
pub use error::Error;
pub use identity::{Credentials, IdentityApi, LoginGrant, ProviderAuthRequest, TokenGrant};
pub use session::{Session, SessionState, SessionUpdate, SubscriptionId};
pub use store::{FileTokenStore, MemoryTokenStore, TokenStore};
pub use types::{LinkedAccountId, Provider, SubjectId};
