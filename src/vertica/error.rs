//! Protocol error
use std::fmt;

use super::BackendMessage;

/// An error when translating the byte stream from the server.
pub enum ProtocolError {
    Unexpected {
        expect: Option<u8>,
        found: u8,
        phase: Option<&'static str>,
    },
    UnknownAuth {
        auth: i32,
    },
    NonUtf8(std::str::Utf8Error),
}

impl std::error::Error for ProtocolError { }

impl fmt::Display for ProtocolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            ProtocolError::Unexpected { expect, found, phase } => {
                let found = BackendMessage::message_name(found);
                match expect {
                    Some(m) => write!(
                        f,
                        "expected message `{}` found `{found}`",
                        BackendMessage::message_name(m),
                    )?,
                    None => write!(f, "unexpected message `{found}`")?,
                }
                if let Some(phase) = phase {
                    write!(f, " in `{phase}`")?
                }
                Ok(())
            },
            ProtocolError::UnknownAuth { auth } => {
                write!(f, "unknown authentication request ({auth})")
            },
            ProtocolError::NonUtf8(e) => write!(f, "non utf8 message: {e}"),
        }
    }
}

impl fmt::Debug for ProtocolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

impl ProtocolError {
    pub(crate) fn unknown(found: u8) -> ProtocolError {
        Self::Unexpected { expect: None, found, phase: None }
    }

    pub(crate) fn unexpected(expect: u8, found: u8) -> ProtocolError {
        Self::Unexpected { expect: Some(expect), found, phase: None }
    }

    pub(crate) fn unexpected_phase(found: u8, phase: &'static str) -> ProtocolError {
        Self::Unexpected { expect: None, found, phase: Some(phase) }
    }

    pub(crate) fn unknown_auth(auth: i32) -> ProtocolError {
        Self::UnknownAuth { auth }
    }

    pub(crate) fn non_utf8(err: std::str::Utf8Error) -> ProtocolError {
        Self::NonUtf8(err)
    }
}
