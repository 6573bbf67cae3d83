#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    #[error("{operation} failed: {detail}")]
    Backend {
        operation: &'static str,
        status: Option<u16>,
        detail: String,
    },
    #[cfg(feature = "http")]
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Token decode error: {0}")]
    Decode(String),
    #[error("Missing credential: {0}")]
    MissingCredential(&'static str),
    #[error("Unknown identity provider: {0}")]
    UnknownProvider(String),
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("Storage error: {0}")]
    Io(#[from] std::io::Error),
}
