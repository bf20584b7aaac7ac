//! `vertiq` error types.
use std::{backtrace::Backtrace, fmt, io, str::Utf8Error};

use crate::{
    connection::ConfigError,
    row::DecodeError,
    startup::UnsupportedAuth,
    transaction::{NotFoundError, StateError},
    vertica::{ErrorResponse, ProtocolError},
};

/// A specialized [`Result`] type for `vertiq` operation.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// All possible error from `vertiq` library.
pub struct Error {
    context: String,
    backtrace: Backtrace,
    kind: ErrorKind,
}

impl Error {
    pub fn kind(&self) -> &ErrorKind {
        &self.kind
    }

    pub fn backtrace(&self) -> &Backtrace {
        &self.backtrace
    }

    pub(crate) fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = context.into();
        self
    }
}

/// All possible error kind from `vertiq` library.
pub enum ErrorKind {
    /// Invalid or incomplete connection parameters, raised before any
    /// network activity.
    Config(ConfigError),
    /// Malformed or unexpected backend message.
    Protocol(ProtocolError),
    /// Network failure.
    Io(io::Error),
    /// An error reported by the server, message carried verbatim.
    Database(ErrorResponse),
    /// The server requested an authentication method this client does not
    /// implement.
    Auth(UnsupportedAuth),
    /// Transaction or savepoint misuse, raised locally.
    State(StateError),
    /// A savepoint name that is not on the stack.
    NotFound(NotFoundError),
    /// Failed to decode a row value.
    Decode(DecodeError),
    /// The server returned a non utf8 string.
    Utf8(Utf8Error),
}

macro_rules! from {
    (<$ty:ty>$pat:pat => $body:expr) => {
        impl From<$ty> for Error {
            fn from($pat: $ty) -> Self {
                let backtrace = std::backtrace::Backtrace::capture();
                Self { context: String::new(), backtrace, kind: $body }
            }
        }
    };
}

from!(<ErrorKind>e => e);
from!(<ConfigError>e => ErrorKind::Config(e));
from!(<ProtocolError>e => ErrorKind::Protocol(e));
from!(<io::Error>e => ErrorKind::Io(e));
from!(<ErrorResponse>e => ErrorKind::Database(e));
from!(<UnsupportedAuth>e => ErrorKind::Auth(e));
from!(<StateError>e => ErrorKind::State(e));
from!(<NotFoundError>e => ErrorKind::NotFound(e));
from!(<DecodeError>e => ErrorKind::Decode(e));
from!(<Utf8Error>e => ErrorKind::Utf8(e));

impl std::error::Error for Error { }

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.context.is_empty() {
            write!(f, "{}: ", self.context)?;
        }

        fmt::Display::fmt(&self.kind, f)?;

        if let std::backtrace::BacktraceStatus::Captured = self.backtrace.status() {
            let mut backtrace = self.backtrace.to_string();
            write!(f, "\n\n")?;
            writeln!(f, "Stack backtrace:")?;
            backtrace.truncate(backtrace.trim_end().len());
            write!(f, "{}", backtrace)?;
        }

        Ok(())
    }
}

impl fmt::Debug for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "\"{self}\"")
    }
}

impl std::error::Error for ErrorKind { }

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config(e) => e.fmt(f),
            Self::Protocol(e) => e.fmt(f),
            Self::Io(e) => e.fmt(f),
            Self::Database(e) => e.fmt(f),
            Self::Auth(e) => e.fmt(f),
            Self::State(e) => e.fmt(f),
            Self::NotFound(e) => e.fmt(f),
            Self::Decode(e) => e.fmt(f),
            Self::Utf8(e) => e.fmt(f),
        }
    }
}

impl fmt::Debug for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "\"{self}\"")
    }
}
