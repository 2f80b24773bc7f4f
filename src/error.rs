//! Errors of this crate.

/// Errors generated by this crate.
///
/// The variants mirror where in a query's life the failure originates:
/// [`Error::Spec`] and [`Error::Schema`] surface synchronously while the
/// query is being constructed; [`Error::Reader`] propagates from the
/// underlying reader and terminates the stream; [`Error::Invariant`]
/// signals an internal contract violation and is fatal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// The filter or field specification is malformed.
    Spec(String),
    /// A referenced column path does not exist in a row group.
    Schema(String),
    /// The underlying reader failed; carries the original cause.
    Reader(String),
    /// An internal invariant was violated.
    Invariant(String),
}

impl std::error::Error for Error {}

impl std::fmt::Display for Error {
    fn fmt(&self, fmt: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Error::Spec(message) => {
                write!(fmt, "invalid query specification: {}", message)
            }
            Error::Schema(message) => {
                write!(fmt, "unknown column: {}", message)
            }
            Error::Reader(message) => {
                write!(fmt, "reader error: {}", message)
            }
            Error::Invariant(message) => {
                write!(fmt, "internal invariant violated: {}", message)
            }
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Error {
        Error::Reader(format!("underlying IO error: {}", e))
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Error {
        Error::Reader(format!("underlying JSON error: {}", e))
    }
}

/// A specialized `Result` for this crate's errors.
pub type Result<T> = std::result::Result<T, Error>;
