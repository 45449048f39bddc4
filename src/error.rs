//! Error types for the tape bulk eject tool
//!
//! Provides structured error types for configuration, status page parsing,
//! the paced HTTP transport and the eject workflow.

use thiserror::Error;

/// Unified error type for the tool
#[derive(Error, Debug)]
pub enum Error {
    // =========================================================================
    // Internal Errors
    // =========================================================================
    #[error("Internal error: {0}")]
    Internal(String),

    // =========================================================================
    // Configuration Errors
    // =========================================================================
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("JSON parse error: {0}")]
    JsonParse(#[from] serde_json::Error),

    // =========================================================================
    // Status Page Errors
    // =========================================================================
    #[error("Invalid status page: {0}")]
    InvalidStatusPage(String),

    #[error("Attribute \"onclick\" in img tag is invalid: {value}")]
    MalformedAction { value: String },

    #[error("Attribute \"{attribute}\" missing from img tag: {tag}")]
    MissingAttribute { attribute: String, tag: String },

    #[error("Unknown slot: {slot}")]
    UnknownSlot { slot: String },

    // =========================================================================
    // Transport Errors
    // =========================================================================
    #[error("404 Not Found on: {url}")]
    NotFound { url: String },

    /// The autoloader answers 401 for bad credentials, rate limiting,
    /// rejected moves and a locked drive alike.
    #[error("401 Unauthorized on: {url}")]
    Unauthorized { url: String },

    #[error("{url} returned HTTP {status} instead of 200")]
    HttpStatus { url: String, status: u16 },

    #[error("URL \"{url}\" is invalid: {reason}")]
    Network { url: String, reason: String },

    // =========================================================================
    // Workflow Errors
    // =========================================================================
    #[error("401 Unauthorized on: {url}. Possibly rate limiting or invalid credentials.")]
    CredentialsRejected { url: String },

    #[error("Tape {tape} is not in the autoloader inventory")]
    TapeNotInInventory { tape: String },

    #[error("Gave up ejecting {tape} after {attempts} attempts")]
    EjectAttemptsExhausted { tape: String, attempts: u32 },
}

/// Action to take on an error raised while talking to the autoloader
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorAction {
    /// Sleep for the busy backoff and resend the same request
    RetryAfterBackoff,
    /// Stop the run
    Abort,
}

impl Error {
    /// Determine what action to take for this error
    pub fn action(&self) -> ErrorAction {
        match self {
            // The device's catch-all rejection; only worth retrying mid-move
            Error::Unauthorized { .. } => ErrorAction::RetryAfterBackoff,

            // Misconfiguration, unreachable device, broken page - never retry
            _ => ErrorAction::Abort,
        }
    }

    /// Check if this error is the device's overloaded 401
    pub fn is_transient(&self) -> bool {
        matches!(self, Error::Unauthorized { .. })
    }
}

/// Result type alias for the tool
pub type Result<T> = std::result::Result<T, Error>;
