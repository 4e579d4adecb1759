//! Error types for ut-core
//!
//! Every transfer failure is one of these variants. Callers match on them
//! directly instead of comparing messages, and the CLI maps each one to an
//! exit code.

use thiserror::Error;

/// Result type alias for ut-core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for ut-core operations
#[derive(Error, Debug)]
pub enum Error {
    /// No usable credential on disk
    #[error("API key is not configured: {0}")]
    ConfigurationMissing(String),

    /// The server rejected the credential (HTTP 401)
    #[error("Invalid API key")]
    CredentialInvalid,

    /// The remote service answered with a non-success status
    #[error("API request failed: status {status}, response: {body}")]
    RemoteApi { status: u16, body: String },

    /// The response decoded but lacks what the protocol requires
    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    /// The user declined to continue (e.g. overwrite prompt)
    #[error("Transfer aborted: {0}")]
    TransferAborted(String),

    /// Connection, timeout or body stream failure
    #[error("Network error: {0}")]
    Network(String),

    /// Invalid argument supplied by the caller
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Configuration file error
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// TOML parsing error
    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    /// TOML serialization error
    #[error("TOML serialization error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// URL parsing error
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

impl Error {
    /// Get the appropriate exit code for this error
    pub const fn exit_code(&self) -> i32 {
        match self {
            Error::InvalidInput(_) | Error::InvalidUrl(_) => 2, // UsageError
            Error::Config(_) | Error::TomlParse(_) | Error::TomlSerialize(_) => 2,
            Error::Network(_) => 3,                     // NetworkError
            Error::CredentialInvalid => 4,              // AuthError
            Error::RemoteApi { status: 404, .. } => 5,  // NotFound
            Error::RemoteApi { status: 403, .. } => 4,  // AuthError
            Error::RemoteApi { status: 409, .. } => 6,  // Conflict
            Error::ConfigurationMissing(_) => 7,        // ConfigurationMissing
            Error::TransferAborted(_) => 130,           // Interrupted
            Error::RemoteApi { .. }
            | Error::MalformedResponse(_)
            | Error::Io(_)
            | Error::Json(_) => 1, // GeneralError
        }
    }

    /// Whether the user should be pointed at `ut config set-secret`
    pub const fn needs_credential_setup(&self) -> bool {
        matches!(self, Error::ConfigurationMissing(_) | Error::CredentialInvalid)
    }

    /// Build a `RemoteApi` error, promoting 401 to `CredentialInvalid`
    pub fn from_status(status: u16, body: impl Into<String>) -> Self {
        if status == 401 {
            Error::CredentialInvalid
        } else {
            Error::RemoteApi {
                status,
                body: body.into(),
            }
        }
    }
}
