//! Unified error type.

use std::fmt;

/// The error type returned by weft's fallible operations.
///
/// Application-level failures (404, 422, etc.) are expressed as data through
/// [`Outcome`](crate::Outcome), not as `Error`s. This type surfaces faults:
/// infrastructure failures, misuse of the response state, and errors a
/// middleware chooses to propagate with `?`.
#[derive(Debug)]
pub enum Error {
    /// Binding to a port or accepting a connection failed.
    Io(std::io::Error),
    /// The server was given an address that is not `host:port`.
    Addr(String),
    /// The context already holds a finalized response.
    AlreadySent,
    /// The request body could not be read or decoded.
    Body(String),
    /// A fault raised by application code.
    Handler(Box<dyn std::error::Error + Send + Sync>),
}

impl Error {
    /// Wraps any application error.
    pub fn handler(e: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        Self::Handler(e.into())
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(e)      => write!(f, "io: {e}"),
            Self::Addr(addr) => write!(f, "invalid socket address `{addr}`"),
            Self::AlreadySent => f.write_str("response already sent"),
            Self::Body(msg)  => write!(f, "body: {msg}"),
            Self::Handler(e) => write!(f, "handler: {e}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            Self::Handler(e) => Some(e.as_ref()),
            _ => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Self::Body(e.to_string())
    }
}
