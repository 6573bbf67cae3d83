use super::error::FlowError;
use crate::types::Provider;

/// Shared flow settings used by both config and the runtime router.
#[derive(Debug, Clone)]
pub(crate) struct FlowSettings {
    pub(crate) default_view: String,
    pub(crate) login_path: String,
    pub(crate) google_callback_path: Option<String>,
    pub(crate) naver_callback_path: Option<String>,
}

impl FlowSettings {
    fn defaults() -> Self {
        Self {
            default_view: "/".into(),
            login_path: "/login".into(),
            google_callback_path: None,
            naver_callback_path: None,
        }
    }

    /// Provider owning a dedicated callback path, if `path` is one.
    pub(crate) fn provider_for_path(&self, path: &str) -> Option<Provider> {
        let path = path.trim_end_matches('/');
        Provider::ALL.into_iter().find(|provider| {
            self.callback_path(*provider)
                .is_some_and(|p| p.trim_end_matches('/') == path)
        })
    }

    fn callback_path(&self, provider: Provider) -> Option<&str> {
        match provider {
            Provider::Google => self.google_callback_path.as_deref(),
            Provider::Naver => self.naver_callback_path.as_deref(),
        }
    }
}

/// Client-side routing configuration for the sign-in flow.
///
/// Every field has a default; override with `with_*` methods or load from the
/// environment with [`from_env()`](FlowConfig::from_env).
#[derive(Debug, Clone)]
pub struct FlowConfig {
    pub(super) settings: FlowSettings,
}

impl Default for FlowConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl FlowConfig {
    #[must_use]
    pub fn new() -> Self {
        Self {
            settings: FlowSettings::defaults(),
        }
    }

    /// Create config from environment variables.
    ///
    /// # Optional env vars
    /// - `PLAYLOG_DEFAULT_VIEW`: where successful sign-ins land (default `/`)
    /// - `PLAYLOG_LOGIN_PATH`: login entry point (default `/login`)
    /// - `PLAYLOG_GOOGLE_CALLBACK_PATH`: Google-only callback route
    /// - `PLAYLOG_NAVER_CALLBACK_PATH`: Naver-only callback route
    ///
    /// # Errors
    ///
    /// Returns [`FlowError::Config`] if a path is not absolute.
    pub fn from_env() -> Result<Self, FlowError> {
        let mut config = Self::new();

        if let Ok(path) = std::env::var("PLAYLOG_DEFAULT_VIEW") {
            config = config.with_default_view(absolute("PLAYLOG_DEFAULT_VIEW", path)?);
        }
        if let Ok(path) = std::env::var("PLAYLOG_LOGIN_PATH") {
            config = config.with_login_path(absolute("PLAYLOG_LOGIN_PATH", path)?);
        }
        if let Ok(path) = std::env::var("PLAYLOG_GOOGLE_CALLBACK_PATH") {
            let path = absolute("PLAYLOG_GOOGLE_CALLBACK_PATH", path)?;
            config = config.with_provider_callback_path(Provider::Google, path);
        }
        if let Ok(path) = std::env::var("PLAYLOG_NAVER_CALLBACK_PATH") {
            let path = absolute("PLAYLOG_NAVER_CALLBACK_PATH", path)?;
            config = config.with_provider_callback_path(Provider::Naver, path);
        }

        Ok(config)
    }

    #[must_use]
    pub fn with_default_view(mut self, path: impl Into<String>) -> Self {
        self.settings.default_view = path.into();
        self
    }

    #[must_use]
    pub fn with_login_path(mut self, path: impl Into<String>) -> Self {
        self.settings.login_path = path.into();
        self
    }

    /// Register a callback route used only by `provider`.
    ///
    /// A code arriving on that route is exchanged with that provider alone.
    #[must_use]
    pub fn with_provider_callback_path(mut self, provider: Provider, path: impl Into<String>) -> Self {
        let path = Some(path.into());
        match provider {
            Provider::Google => self.settings.google_callback_path = path,
            Provider::Naver => self.settings.naver_callback_path = path,
        }
        self
    }

    #[must_use]
    pub fn default_view(&self) -> &str {
        &self.settings.default_view
    }

    #[must_use]
    pub fn login_path(&self) -> &str {
        &self.settings.login_path
    }
}

fn absolute(var: &str, path: String) -> Result<String, FlowError> {
    if path.starts_with('/') {
        Ok(path)
    } else {
        Err(FlowError::Config(format!("{var} must start with '/': {path}")))
    }
}
