//! Sign-in orchestration: callback routes, password login and access gates.
//!
//! The flow is framework-agnostic. The host supplies an [`IdentityApi`]
//! (usually [`IdentityClient`](crate::IdentityClient)), a shared
//! [`SessionState`](crate::SessionState) and a [`Navigator`], then calls one
//! entry function per route.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use playlog_auth::flow::{CallbackRouter, FlowConfig, Requirement};
//! use playlog_auth::{FileTokenStore, IdentityClient, IdentityConfig, SessionState};
//!
//! // 1. Restore the session from durable storage
//! let store = FileTokenStore::open(FileTokenStore::default_path().unwrap())?;
//! let session = Arc::new(SessionState::new(store));
//!
//! // 2. Wire the router
//! let client = IdentityClient::new(IdentityConfig::from_env()?);
//! let router = CallbackRouter::new(FlowConfig::from_env()?, client, session, navigator);
//!
//! // 3. On the login route
//! let outcome = router.handle_login_route(&current_location).await;
//!
//! // 4. On a protected view
//! let view = router.gate(Requirement::LinkedAccount).enter(fetch_profile).await;
//! ```
//!
//! [`IdentityApi`]: crate::IdentityApi

mod callback;
mod config;
mod context;
mod error;
mod gate;
mod traits;
mod types;

pub use callback::CallbackRouter;
pub use config::FlowConfig;
pub use context::{AccountLinkContext, CallbackContext};
pub use error::FlowError;
pub use gate::{AccessGate, GateView, Requirement};
pub use traits::Navigator;
pub use types::{CallbackOutcome, CallbackPhase, Notice, NoticeLevel, ProviderLinks};
