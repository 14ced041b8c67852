use std::fmt;
use std::io;
use thiserror::Error;

use crate::credential::{Capability, StrategyKind};

/// Main error type for yt-session operations
#[derive(Error, Debug)]
pub enum Error {
    /// A required file or parameter for a strategy is absent. At the
    /// resolver level this skips the strategy rather than failing it.
    #[error("configuration missing: {0}")]
    ConfigurationMissing(String),

    /// The refresh token was rejected (revoked or expired). The caller
    /// falls through to full acquisition.
    #[error("refresh denied: {0}")]
    RefreshDenied(String),

    /// Credential acquisition failed: aborted interactive flow, network
    /// failure, or a malformed token response.
    #[error("acquisition failed: {0}")]
    AcquisitionFailed(String),

    /// Every configured strategy was skipped or failed.
    #[error("no authentication strategy succeeded after {} attempt(s)", .0.len())]
    NoStrategySucceeded(Vec<StrategyFailure>),

    /// An operation requires a capability the active credential does not
    /// grant. Raised before any network call.
    #[error("operation '{operation}' requires the {capability} capability")]
    CapabilityDenied {
        operation: String,
        capability: Capability,
    },

    /// The identity probe failed at session build time and an operation
    /// that needs the channel identity was attempted.
    #[error("channel identity unavailable (identity probe failed at session build)")]
    IdentityUnavailable,

    /// Credential store read/write failure.
    #[error("credential store error: {0}")]
    Store(String),

    /// Remote API returned something the adapter could not interpret.
    #[error("malformed platform response: {0}")]
    Malformed(String),

    /// Remote API rejected a request.
    #[error("platform call failed ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

/// One strategy's recorded failure inside [`Error::NoStrategySucceeded`].
#[derive(Debug)]
pub struct StrategyFailure {
    pub strategy: StrategyKind,
    pub error: Error,
}

impl fmt::Display for StrategyFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.strategy, self.error)
    }
}

impl Error {
    /// True for failures that mean "this strategy cannot be attempted"
    /// rather than "this strategy was attempted and broke".
    pub fn is_configuration_missing(&self) -> bool {
        matches!(self, Error::ConfigurationMissing(_))
    }
}

/// Result type alias for yt-session operations
pub type Result<T> = std::result::Result<T, Error>;
