use std::fmt;
use thiserror::Error;

/// Everything that can stop an update before or during the HTTP exchange.
#[derive(Debug, Error)]
pub enum UpdateError {
    /// A configured value does not match its grammar
    #[error("given {field} \"{value}\" is incorrect: {reason}")]
    Validation {
        field: &'static str,
        value: String,
        reason: String,
    },

    #[error("missing required setting \"{0}\"")]
    MissingSetting(&'static str),

    #[error("unmanaged url protocol \"{0}\"")]
    Protocol(String),

    /// Resolution, connection, TLS or framing failure
    #[error("could not reach server ({kind})")]
    Network {
        kind: NetworkErrorKind,
        detail: String,
    },

    /// The local HTTP client could not be built
    #[error("could not set up the HTTP client: {0}")]
    ClientSetup(String),

    #[error("the server may require an authentication")]
    AuthRequired,

    #[error("server answered with HTTP status {0}")]
    Failure(u16),

    #[error("configuration file error: {0}")]
    ConfigFile(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl UpdateError {
    pub fn validation(field: &'static str, value: &str, reason: impl Into<String>) -> Self {
        UpdateError::Validation {
            field,
            value: value.to_string(),
            reason: reason.into(),
        }
    }

    /// Collapse the error into the outcome kind the reporter works with.
    pub fn outcome(&self) -> Outcome {
        match self {
            UpdateError::Validation { .. } | UpdateError::ConfigFile(_) | UpdateError::Io(_) => {
                Outcome::ValidationError
            }
            UpdateError::MissingSetting(_) => Outcome::ConfigurationError,
            UpdateError::Protocol(_) => Outcome::ProtocolError,
            UpdateError::Network { .. } => Outcome::NetworkError,
            UpdateError::AuthRequired => Outcome::AuthRequired,
            UpdateError::ClientSetup(_) | UpdateError::Failure(_) => Outcome::Failure,
        }
    }
}

/// Transport failures, kept apart for logging only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetworkErrorKind {
    Resolve,
    Connect,
    Timeout,
    Tls,
    MalformedResponse,
}

impl fmt::Display for NetworkErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            NetworkErrorKind::Resolve => "unable to resolve hostname",
            NetworkErrorKind::Connect => "unable to connect to host",
            NetworkErrorKind::Timeout => "timed out",
            NetworkErrorKind::Tls => "TLS handshake failed",
            NetworkErrorKind::MalformedResponse => "malformed HTTP response",
        };
        f.write_str(text)
    }
}

/// Final classification of one invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Success,
    AuthRequired,
    ValidationError,
    ConfigurationError,
    ProtocolError,
    NetworkError,
    Failure,
}

impl Outcome {
    /// Process exit code for this outcome.
    ///
    /// 0 success, 1 other errors, 2 bad argument, 3 missing required setting,
    /// 10 error during the HTTP query, 11 authentication needed.
    pub fn exit_code(self) -> i32 {
        match self {
            Outcome::Success => 0,
            Outcome::ProtocolError => 1,
            Outcome::ValidationError => 2,
            Outcome::ConfigurationError => 3,
            Outcome::NetworkError | Outcome::Failure => 10,
            Outcome::AuthRequired => 11,
        }
    }
}

impl<T> From<&Result<T, UpdateError>> for Outcome {
    fn from(result: &Result<T, UpdateError>) -> Self {
        match result {
            Ok(_) => Outcome::Success,
            Err(e) => e.outcome(),
        }
    }
}
