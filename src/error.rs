/// Error handling module for Game Runner.
///
/// This module defines the error types used throughout the library.
/// Every fallible operation in the crate returns [`Result`], and the HTTP
/// layer maps each variant onto a status code through [`Error::status_code`].
///
/// # Example
///
/// ```
/// use game_runner::error::{Error, Result};
///
/// fn handle_error(result: Result<()>) {
///     match result {
///         Ok(_) => println!("Operation succeeded"),
///         Err(Error::ServerNotFound(name)) => println!("No server named '{}'", name),
///         Err(Error::Conflict(msg)) => println!("Not allowed right now: {}", msg),
///         Err(e) => println!("Other error: {}", e),
///     }
/// }
/// ```
use actix_web::http::StatusCode;
use thiserror::Error;

/// Errors that can occur in the game-runner library.
#[derive(Error, Debug)]
pub enum Error {
    /// A create request or request body failed validation.
    ///
    /// This error occurs when:
    /// - The server name is missing, blank or has no alphanumeric character
    /// - `maxRamMB` is missing or zero
    /// - A port is zero or an unknown template type is requested
    #[error("Validation error: {0}")]
    Validation(String),

    /// No managed server matches the given name (compared case-insensitively).
    #[error("Server not found: {0}")]
    ServerNotFound(String),

    /// The operation is not allowed in the server's current status.
    ///
    /// This error occurs when:
    /// - Start, stop or uninstall is requested while the server is installing
    /// - Start is requested while the server is in the error state
    /// - A create request reuses an existing name or instance directory
    #[error("Conflict: {0}")]
    Conflict(String),

    /// The record's template type is not known to this build.
    #[error("Unsupported template: {0}")]
    UnsupportedTemplate(String),

    /// Installing server files failed.
    ///
    /// Never returned to the caller that issued create; the worker records it
    /// as the `error` status instead.
    #[error("Install error: {0}")]
    Install(String),

    /// Removing an instance directory failed.
    ///
    /// The record is kept so uninstall can be retried.
    #[error("Uninstall error: {0}")]
    Uninstall(String),

    /// Spawning, signalling or killing a child process failed.
    #[error("Process control error: {0}")]
    ProcessControl(String),

    /// Reading, writing or parsing the registry snapshot failed.
    #[error("Persistence error: {0}")]
    Persistence(String),

    /// Failed to parse configuration from a file or string.
    #[error("Failed to parse configuration: {0}")]
    ConfigParse(String),

    /// Configuration parsed but contains invalid values.
    #[error("Invalid configuration: {0}")]
    ConfigInvalid(String),

    /// Missing or invalid bearer token.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Any other error not covered by the above categories.
    #[error("Other error: {0}")]
    Other(String),
}

impl Error {
    /// HTTP status code reported for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Error::Validation(_) => StatusCode::BAD_REQUEST,
            Error::ServerNotFound(_) => StatusCode::NOT_FOUND,
            Error::Conflict(_) => StatusCode::CONFLICT,
            Error::UnsupportedTemplate(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Error::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Result type for game-runner operations.
pub type Result<T> = std::result::Result<T, Error>;
