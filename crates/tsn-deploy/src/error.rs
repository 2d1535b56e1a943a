//! Error types for deployment table synthesis.
//!
//! Every check in the generators fails fast: the first error aborts
//! [`DeployPathData::generate_data`](crate::DeployPathData::generate_data).

use std::fmt;
use std::io;
use std::str::FromStr;
use thiserror::Error;

/// Result type alias for deployment operations.
pub type DeployResult<T> = Result<T, DeployError>;

/// Errors that can occur while loading inputs or generating tables.
#[derive(Debug, Error)]
pub enum DeployError {
    /// An object referenced by the plan is missing from the snapshot.
    #[error("{object} '{id}' not found")]
    NotFound {
        /// Kind of object ("device", "link", "stream setting", ...).
        object: String,
        /// Identifier that failed to resolve.
        id: String,
    },

    /// A structural invariant was violated.
    #[error("Internal error: {message}")]
    Internal {
        /// Error message.
        message: String,
    },

    /// The request shape is not supported.
    #[error("Bad request: {message}")]
    BadRequest {
        /// Error message.
        message: String,
    },

    /// Configuration validation error.
    #[error("Invalid configuration for {field}: {message}")]
    InvalidConfig {
        /// The field that failed validation.
        field: String,
        /// Error message.
        message: String,
    },

    /// Failed to read an input file.
    #[error("Failed to read '{path}': {source}")]
    Io {
        /// File path.
        path: String,
        /// The underlying IO error.
        #[source]
        source: io::Error,
    },

    /// Failed to decode an input document.
    #[error("Failed to parse {what}: {message}")]
    Parse {
        /// What was being parsed (file path or document kind).
        what: String,
        /// Decoder message.
        message: String,
    },
}

impl DeployError {
    /// Creates a not found error.
    pub fn not_found(object: impl Into<String>, id: impl ToString) -> Self {
        Self::NotFound {
            object: object.into(),
            id: id.to_string(),
        }
    }

    /// Creates an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Creates a bad request error.
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest {
            message: message.into(),
        }
    }

    /// Creates an invalid configuration error.
    pub fn invalid_config(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Creates a parse error.
    pub fn parse(what: impl Into<String>, message: impl ToString) -> Self {
        Self::Parse {
            what: what.into(),
            message: message.to_string(),
        }
    }

    /// Returns the taxonomy class of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            DeployError::NotFound { .. } => ErrorKind::NotFound,
            DeployError::Internal { .. } => ErrorKind::InternalError,
            DeployError::BadRequest { .. } => ErrorKind::BadRequest,
            DeployError::InvalidConfig { .. }
            | DeployError::Io { .. }
            | DeployError::Parse { .. } => ErrorKind::Config,
        }
    }
}

impl From<tsn_types::ParseError> for DeployError {
    fn from(err: tsn_types::ParseError) -> Self {
        DeployError::internal(err.to_string())
    }
}

/// Error taxonomy reported to the commissioning layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    NotFound,
    InternalError,
    BadRequest,
    Config,
}

impl ErrorKind {
    pub const fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::NotFound => "NotFound",
            ErrorKind::InternalError => "InternalError",
            ErrorKind::BadRequest => "BadRequest",
            ErrorKind::Config => "Config",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ErrorKind {
    type Err = DeployError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "NotFound" => Ok(ErrorKind::NotFound),
            "InternalError" => Ok(ErrorKind::InternalError),
            "BadRequest" => Ok(ErrorKind::BadRequest),
            "Config" => Ok(ErrorKind::Config),
            _ => Err(DeployError::parse("error kind", format!("unknown kind '{s}'"))),
        }
    }
}
