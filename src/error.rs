//! Unified error type.

use std::fmt;

/// Boxed error carried by request bodies.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// The error type returned by trailmark's fallible operations.
///
/// Application-level errors (404, 422, etc.) are expressed as HTTP
/// [`Response`](crate::Response) values, not as `Error`s. This type surfaces
/// infrastructure failures: binding the listening socket, or a request
/// body stream that broke mid-read.
#[derive(Debug)]
pub enum Error {
    Io(std::io::Error),
    Body(BoxError),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(e)   => write!(f, "io: {e}"),
            Self::Body(e) => write!(f, "body: {e}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e)   => Some(e),
            Self::Body(e) => Some(e.as_ref()),
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}
