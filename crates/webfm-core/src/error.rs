//! Unified application error types for webfm.
//!
//! Every crate maps its failures into [`AppError`] so they propagate through
//! the `?` operator and reach the HTTP layer with a stable [`ErrorKind`].

use std::fmt;
use thiserror::Error;

/// Error kind categorization used across the entire application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum ErrorKind {
    /// The resolved path leaves the root directory.
    PathEscape,
    /// The requested entry does not exist.
    NotFound,
    /// The entry to be created already exists.
    AlreadyExists,
    /// A rename or move destination is already occupied.
    NameInUse,
    /// A name is empty or contains a path separator.
    InvalidName,
    /// The parent directory of a new entry does not exist.
    ParentMissing,
    /// The file extension is not on the allow list.
    UnsupportedType,
    /// The payload exceeds a configured size limit.
    TooLarge,
    /// The OS refused write access.
    NotWritable,
    /// The OS refused read access.
    NotReadable,
    /// Source and destination of a move are identical.
    SelfMove,
    /// A folder would be moved into its own descendant.
    RecursiveMove,
    /// No free name could be synthesized within the attempt budget.
    CannotDisambiguate,
    /// A staged chunk is missing or unreadable during assembly.
    ChunkMissing,
    /// An underlying filesystem call failed.
    Io,
    /// Request input failed validation.
    Validation,
    /// A configuration error occurred.
    Configuration,
    /// A serialization/deserialization error occurred.
    Serialization,
    /// An internal error occurred.
    Internal,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PathEscape => write!(f, "PATH_ESCAPE"),
            Self::NotFound => write!(f, "NOT_FOUND"),
            Self::AlreadyExists => write!(f, "ALREADY_EXISTS"),
            Self::NameInUse => write!(f, "NAME_IN_USE"),
            Self::InvalidName => write!(f, "INVALID_NAME"),
            Self::ParentMissing => write!(f, "PARENT_MISSING"),
            Self::UnsupportedType => write!(f, "UNSUPPORTED_TYPE"),
            Self::TooLarge => write!(f, "TOO_LARGE"),
            Self::NotWritable => write!(f, "NOT_WRITABLE"),
            Self::NotReadable => write!(f, "NOT_READABLE"),
            Self::SelfMove => write!(f, "SELF_MOVE"),
            Self::RecursiveMove => write!(f, "RECURSIVE_MOVE"),
            Self::CannotDisambiguate => write!(f, "CANNOT_DISAMBIGUATE"),
            Self::ChunkMissing => write!(f, "CHUNK_MISSING"),
            Self::Io => write!(f, "IO_FAILURE"),
            Self::Validation => write!(f, "VALIDATION"),
            Self::Configuration => write!(f, "CONFIGURATION"),
            Self::Serialization => write!(f, "SERIALIZATION"),
            Self::Internal => write!(f, "INTERNAL"),
        }
    }
}

/// The unified application error used throughout webfm.
///
/// The message is always short and human-readable; the optional source keeps
/// the underlying OS error for logs.
#[derive(Debug, Error)]
#[error("{kind}: {message}")]
pub struct AppError {
    /// The category of error.
    pub kind: ErrorKind,
    /// A human-readable error message.
    pub message: String,
    /// Optional underlying cause.
    #[source]
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl AppError {
    /// Create a new application error.
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            source: None,
        }
    }

    /// Create a new application error with an underlying cause.
    pub fn with_source(
        kind: ErrorKind,
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self {
            kind,
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Map an I/O failure on `path` into the closest error kind.
    ///
    /// `NotFound` and `PermissionDenied` keep their meaning; everything else
    /// becomes [`ErrorKind::Io`] carrying the OS message.
    pub fn from_io(err: std::io::Error, action: &str, path: &str) -> Self {
        let kind = match err.kind() {
            std::io::ErrorKind::NotFound => ErrorKind::NotFound,
            std::io::ErrorKind::AlreadyExists => ErrorKind::AlreadyExists,
            std::io::ErrorKind::PermissionDenied => match action {
                "read" | "open" | "list" => ErrorKind::NotReadable,
                _ => ErrorKind::NotWritable,
            },
            _ => ErrorKind::Io,
        };
        let message = format!("Failed to {action} '{path}': {err}");
        Self::with_source(kind, message, err)
    }

    /// Create a path-escape error.
    pub fn path_escape(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::PathEscape, message)
    }

    /// Create a not-found error.
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotFound, message)
    }

    /// Create an already-exists error.
    pub fn already_exists(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::AlreadyExists, message)
    }

    /// Create a name-in-use error.
    pub fn name_in_use(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::NameInUse, message)
    }

    /// Create an invalid-name error.
    pub fn invalid_name(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidName, message)
    }

    /// Create a parent-missing error.
    pub fn parent_missing(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ParentMissing, message)
    }

    /// Create an unsupported-type error.
    pub fn unsupported_type(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::UnsupportedType, message)
    }

    /// Create a too-large error.
    pub fn too_large(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::TooLarge, message)
    }

    /// Create a self-move error.
    pub fn self_move(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::SelfMove, message)
    }

    /// Create a recursive-move error.
    pub fn recursive_move(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::RecursiveMove, message)
    }

    /// Create a cannot-disambiguate error.
    pub fn cannot_disambiguate(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::CannotDisambiguate, message)
    }

    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Validation, message)
    }

    /// Create a configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Configuration, message)
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Internal, message)
    }
}

impl Clone for AppError {
    fn clone(&self) -> Self {
        Self {
            kind: self.kind,
            message: self.message.clone(),
            source: None,
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        Self::with_source(
            ErrorKind::Serialization,
            format!("JSON serialization error: {err}"),
            err,
        )
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        Self::with_source(ErrorKind::Io, format!("I/O error: {err}"), err)
    }
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        Self::with_source(
            ErrorKind::Configuration,
            format!("Configuration error: {err}"),
            err,
        )
    }
}
