use crate::http::types::StatusCode;
use std::io;
use thiserror::Error;

/// Everything that can end the parsing of a request.
///
/// All variants except [`ErrorKind::Io`] are protocol errors: they are
/// terminal for the request and are answered with [`ErrorKind::status`], the
/// `Display` text becoming the response body. [`ErrorKind::Io`] is a
/// transport failure, after which no response is attempted.
#[derive(Debug, Error, PartialEq)]
pub enum ErrorKind {
    #[error("malformed request line")]
    MalformedRequestLine,
    #[error("unsupported HTTP version: {0}")]
    UnsupportedVersion(String),

    #[error("malformed field line")]
    MalformedFieldLine,
    #[error("malformed field name")]
    MalformedFieldName,
    #[error("line exceeds the {0} byte request buffer")]
    LineTooLong(usize),

    #[error("more than {0} header fields")]
    TooManyHeaders(usize),
    #[error("header field value exceeds {0} bytes")]
    HeaderTooLarge(usize),

    #[error("body length mismatch: expected {expected} bytes, got {available}")]
    BodyLengthMismatch { expected: usize, available: usize },
    #[error("body of {length} bytes exceeds the {limit} byte limit")]
    BodyTooLarge { length: usize, limit: usize },

    #[error("request in error state")]
    RequestInErrorState,

    #[error("i/o error: {0}")]
    Io(IoError),
}

impl ErrorKind {
    /// `true` for transport failures, where no response can be written.
    #[inline]
    pub const fn is_transport(&self) -> bool {
        matches!(self, ErrorKind::Io(_))
    }

    /// Status of the response sent for a protocol error.
    pub const fn status(&self) -> StatusCode {
        match self {
            ErrorKind::TooManyHeaders(_) | ErrorKind::HeaderTooLarge(_) => {
                StatusCode::REQUEST_HEADER_FIELDS_TOO_LARGE
            }
            ErrorKind::BodyTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            _ => StatusCode::BAD_REQUEST,
        }
    }
}

impl From<io::Error> for ErrorKind {
    fn from(err: io::Error) -> Self {
        ErrorKind::Io(IoError(err))
    }
}

/// An [`io::Error`] that compares by [`io::ErrorKind`].
#[derive(Debug, Error)]
#[error(transparent)]
pub struct IoError(pub io::Error);

impl IoError {
    #[inline]
    pub fn kind(&self) -> io::ErrorKind {
        self.0.kind()
    }
}

impl PartialEq for IoError {
    fn eq(&self, other: &Self) -> bool {
        self.0.kind() == other.0.kind()
    }
}
