use crate::models::RequestId;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SignerError {
    #[cfg(feature = "native")]
    #[error("Configuration error: {0}")]
    Config(String),

    #[cfg(feature = "native")]
    #[error("I/O error: {0}")]
    Io(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML serialization error: {0}")]
    TomlSerialization(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Failed to parse deploy: {0}")]
    ParseFailure(String),

    #[error("Could not find deploy with id: {0}")]
    NotFound(RequestId),

    #[error("Deploy {0} has already been settled")]
    AlreadySettled(RequestId),

    #[error("A completion listener is already registered for deploy {0}")]
    AlreadyRegistered(RequestId),

    #[error("No Active Account!")]
    NoActiveAccount,

    #[error("Please create an account first.")]
    NoAccount,

    #[error("Please connect to the Signer first.")]
    NotConnected,

    #[error("Active key changed during signing")]
    KeyChangedDuringSigning,

    #[error("Cannot sign null deploy!")]
    NullPayload,

    #[error("Deploy undefined!")]
    MissingPayload,

    #[error("Key was not of expected format! (algorithm tag {0:#04x})")]
    UnsupportedKeyAlgorithm(u8),

    #[error("Invalid key: {0}")]
    InvalidKey(String),

    #[error("Signing failed: {0}")]
    SigningFailed(String),

    #[error("User Cancelled Signing")]
    Cancelled,

    #[error("Signer: Unknown error occurred. {0}")]
    Internal(String),
}

// Alias kept so the outer crates read like the rest of the workspace
pub type CoreError = SignerError;

pub type SignerResult<T> = Result<T, SignerError>;

#[cfg(feature = "native")]
impl From<std::io::Error> for SignerError {
    fn from(err: std::io::Error) -> Self {
        SignerError::Io(err.to_string())
    }
}

#[cfg(feature = "native")]
impl From<config::ConfigError> for SignerError {
    fn from(err: config::ConfigError) -> Self {
        SignerError::Config(err.to_string())
    }
}

impl From<toml::ser::Error> for SignerError {
    fn from(err: toml::ser::Error) -> Self {
        SignerError::TomlSerialization(err.to_string())
    }
}
