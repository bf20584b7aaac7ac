//! Vertica Backend Messages
use bytes::{Buf, Bytes};

use super::error::ProtocolError;
use crate::ext::{BytesExt, FmtExt};

/// A type that can be decoded from a backend message.
pub trait BackendProtocol: Sized {
    fn decode(msgtype: u8, body: Bytes) -> Result<Self, ProtocolError>;
}

/// Any backend message.
#[derive(Debug)]
pub enum BackendMessage {
    Authentication(Authentication),
    BackendKeyData(BackendKeyData),
    CommandComplete(CommandComplete),
    DataRow(DataRow),
    EmptyQueryResponse(EmptyQueryResponse),
    ErrorResponse(ErrorResponse),
    NoticeResponse(NoticeResponse),
    ParameterStatus(ParameterStatus),
    ReadyForQuery(ReadyForQuery),
    RowDescription(RowDescription),
}

macro_rules! match_backend {
    ($($name:ident,)*) => {
        impl BackendMessage {
            /// The message type byte of the contained message.
            pub fn msgtype(&self) -> u8 {
                match self {
                    $(Self::$name(_) => $name::MSGTYPE,)*
                }
            }

            /// Best effort name for a message type byte, for diagnostics.
            pub fn message_name(msgtype: u8) -> &'static str {
                match msgtype {
                    $($name::MSGTYPE => stringify!($name),)*
                    _ => "Unknown",
                }
            }
        }

        impl BackendProtocol for BackendMessage {
            fn decode(msgtype: u8, body: Bytes) -> Result<Self, ProtocolError> {
                let message = match msgtype {
                    $($name::MSGTYPE => Self::$name(<$name as BackendProtocol>::decode(msgtype, body)?),)*
                    _ => return Err(ProtocolError::unknown(msgtype)),
                };
                Ok(message)
            }
        }
    };
}

match_backend! {
    Authentication,
    BackendKeyData,
    CommandComplete,
    DataRow,
    EmptyQueryResponse,
    ErrorResponse,
    NoticeResponse,
    ParameterStatus,
    ReadyForQuery,
    RowDescription,
}

impl BackendMessage {
    /// Build a [`ProtocolError`] for a message that has no place in `phase`.
    pub fn unexpected(&self, phase: &'static str) -> ProtocolError {
        ProtocolError::unexpected_phase(self.msgtype(), phase)
    }
}

macro_rules! assert_msgtype {
    ($self:ident,$typ:ident) => {
        if $self::MSGTYPE != $typ {
            return Err(ProtocolError::unexpected($self::MSGTYPE, $typ));
        }
    };
}

/// Identifies the message as an authentication request.
///
/// Vertica shares the Postgres numbering for the methods below; only
/// cleartext password authentication is answered by this client.
#[derive(Debug)]
pub enum Authentication {
    /// Int32(0) Specifies that the authentication was successful.
    Ok,
    /// Int32(2) Specifies that Kerberos V5 authentication is required.
    KerberosV5,
    /// Int32(3) Specifies that a clear-text password is required.
    CleartextPassword,
    /// Int32(5) Specifies that an MD5-encrypted password is required.
    MD5Password {
        /// The salt to use when encrypting the password.
        salt: u32,
    },
}

impl Authentication {
    pub const MSGTYPE: u8 = b'R';
}

impl BackendProtocol for Authentication {
    fn decode(msgtype: u8, mut body: Bytes) -> Result<Self, ProtocolError> {
        assert_msgtype!(Authentication, msgtype);
        let auth = match body.get_i32() {
            0 => Authentication::Ok,
            2 => Authentication::KerberosV5,
            3 => Authentication::CleartextPassword,
            5 => Authentication::MD5Password { salt: body.get_u32() },
            auth => return Err(ProtocolError::unknown_auth(auth)),
        };
        Ok(auth)
    }
}

/// Identifies the message as cancellation key data.
///
/// The frontend must save these values if it wishes to be able to issue
/// CancelRequest messages later.
#[derive(Debug)]
pub struct BackendKeyData {
    /// The process ID of this backend.
    pub process_id: i32,
    /// The secret key of this backend.
    pub secret_key: i32,
}

impl BackendKeyData {
    pub const MSGTYPE: u8 = b'K';
}

impl BackendProtocol for BackendKeyData {
    fn decode(msgtype: u8, mut body: Bytes) -> Result<Self, ProtocolError> {
        assert_msgtype!(BackendKeyData, msgtype);
        Ok(Self {
            process_id: body.get_i32(),
            secret_key: body.get_i32(),
        })
    }
}

/// Identifies the message as a run-time parameter status report.
#[derive(Debug)]
pub struct ParameterStatus {
    /// The name of the run-time parameter being reported.
    pub name: String,
    /// The current value of the parameter.
    pub value: String,
}

impl ParameterStatus {
    pub const MSGTYPE: u8 = b'S';
}

impl BackendProtocol for ParameterStatus {
    fn decode(msgtype: u8, mut body: Bytes) -> Result<Self, ProtocolError> {
        assert_msgtype!(ParameterStatus, msgtype);
        Ok(Self {
            name: body.get_nul_bytestr().map_err(ProtocolError::non_utf8)?.as_str().into(),
            value: body.get_nul_bytestr().map_err(ProtocolError::non_utf8)?.as_str().into(),
        })
    }
}

/// ReadyForQuery is sent whenever the backend is ready for a new query cycle.
#[derive(Debug)]
pub struct ReadyForQuery {
    /// Current backend transaction status indicator.
    ///
    /// `b'I'` if idle (not in a transaction block); `b'T'` if in a
    /// transaction block; or `b'E'` if in a failed transaction block.
    pub tx_status: u8,
}

impl ReadyForQuery {
    pub const MSGTYPE: u8 = b'Z';
}

impl BackendProtocol for ReadyForQuery {
    fn decode(msgtype: u8, mut body: Bytes) -> Result<Self, ProtocolError> {
        assert_msgtype!(ReadyForQuery, msgtype);
        Ok(Self { tx_status: body.get_u8() })
    }
}

/// Identifies the message as a row description.
///
/// The contents describe the column layout of the rows that follow as
/// `DataRow` messages. The body is kept raw and walked by
/// [`Field::parse_all`][crate::row::Field::parse_all].
#[derive(Debug)]
pub struct RowDescription {
    /// Field count followed by per-field descriptions.
    pub body: Bytes,
}

impl RowDescription {
    pub const MSGTYPE: u8 = b'T';
}

impl BackendProtocol for RowDescription {
    fn decode(msgtype: u8, body: Bytes) -> Result<Self, ProtocolError> {
        assert_msgtype!(RowDescription, msgtype);
        Ok(Self { body })
    }
}

/// Identifies the message as a data row.
#[derive(Debug)]
pub struct DataRow {
    /// Value count followed by length-prefixed values.
    pub body: Bytes,
}

impl DataRow {
    pub const MSGTYPE: u8 = b'D';
}

impl BackendProtocol for DataRow {
    fn decode(msgtype: u8, body: Bytes) -> Result<Self, ProtocolError> {
        assert_msgtype!(DataRow, msgtype);
        Ok(Self { body })
    }
}

/// Identifies the message as a command-completed response.
#[derive(Debug)]
pub struct CommandComplete {
    /// The command tag, e.g. `INSERT 0 1` or `SELECT`.
    pub tag: String,
}

impl CommandComplete {
    pub const MSGTYPE: u8 = b'C';
}

impl BackendProtocol for CommandComplete {
    fn decode(msgtype: u8, mut body: Bytes) -> Result<Self, ProtocolError> {
        assert_msgtype!(CommandComplete, msgtype);
        Ok(Self {
            tag: body.get_nul_bytestr().map_err(ProtocolError::non_utf8)?.as_str().into(),
        })
    }
}

/// Identifies the message as an error.
///
/// The message body consists of one or more identified fields, followed by
/// a zero byte as a terminator. For each field there is a `Byte1` code
/// identifying the field type and a nul terminated string value.
///
/// The server supplied texts are carried verbatim.
pub struct ErrorResponse {
    pub body: Bytes,
}

impl ErrorResponse {
    pub const MSGTYPE: u8 = b'E';

    /// Value of the field identified by `code`, if present.
    fn field(&self, code: u8) -> Option<&str> {
        let mut body = &self.body[..];
        while body.has_remaining() {
            let ty = body.get_u8();
            if ty == 0 {
                break;
            }
            let end = body.iter().position(|e| matches!(e, b'\0'))?;
            let value = &body[..end];
            body.advance(end + 1);
            if ty == code {
                return std::str::from_utf8(value).ok();
            }
        }
        None
    }

    /// The severity field, e.g. `ERROR`, `FATAL`.
    pub fn severity(&self) -> Option<&str> {
        self.field(b'S')
    }

    /// The SQLSTATE code for the error.
    pub fn code(&self) -> Option<&str> {
        self.field(b'C')
    }

    /// The primary human-readable error message, exactly as the server
    /// reported it.
    pub fn message(&self) -> Option<&str> {
        self.field(b'M')
    }
}

impl std::error::Error for ErrorResponse { }

impl std::fmt::Display for ErrorResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.message() {
            Some(msg) => f.write_str(msg),
            None => write!(f, "{}", self.body.lossy()),
        }
    }
}

impl std::fmt::Debug for ErrorResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ErrorResponse")
            .field("severity", &self.severity())
            .field("code", &self.code())
            .field("message", &self.message())
            .finish()
    }
}

impl BackendProtocol for ErrorResponse {
    fn decode(msgtype: u8, body: Bytes) -> Result<Self, ProtocolError> {
        assert_msgtype!(ErrorResponse, msgtype);
        Ok(Self { body })
    }
}

/// A warning message, same body form as [`ErrorResponse`].
pub struct NoticeResponse {
    pub body: Bytes,
}

impl NoticeResponse {
    pub const MSGTYPE: u8 = b'N';
}

impl std::fmt::Display for NoticeResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.body.lossy())
    }
}

impl std::fmt::Debug for NoticeResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "\"{self}\"")
    }
}

impl BackendProtocol for NoticeResponse {
    fn decode(msgtype: u8, body: Bytes) -> Result<Self, ProtocolError> {
        assert_msgtype!(NoticeResponse, msgtype);
        Ok(Self { body })
    }
}

/// Identifies the message as a response to an empty query string.
///
/// This substitutes for CommandComplete.
#[derive(Debug)]
pub struct EmptyQueryResponse;

impl EmptyQueryResponse {
    pub const MSGTYPE: u8 = b'I';
}

impl BackendProtocol for EmptyQueryResponse {
    fn decode(msgtype: u8, _: Bytes) -> Result<Self, ProtocolError> {
        assert_msgtype!(EmptyQueryResponse, msgtype);
        Ok(Self)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn error_body() -> Bytes {
        let mut buf = Vec::new();
        for (code, value) in [(b'S', "ERROR"), (b'C', "42601"), (b'M', "Syntax error at or near \"FORM\"")] {
            buf.push(code);
            buf.extend_from_slice(value.as_bytes());
            buf.push(0);
        }
        buf.push(0);
        buf.into()
    }

    #[test]
    fn error_response_fields() {
        let err = ErrorResponse { body: error_body() };
        assert_eq!(err.severity(), Some("ERROR"));
        assert_eq!(err.code(), Some("42601"));
        assert_eq!(err.message(), Some("Syntax error at or near \"FORM\""));
        // callers see the server message verbatim
        assert_eq!(err.to_string(), "Syntax error at or near \"FORM\"");
    }

    #[test]
    fn decode_dispatch() {
        let msg = BackendMessage::decode(b'Z', Bytes::from_static(b"I")).unwrap();
        match msg {
            BackendMessage::ReadyForQuery(r) => assert_eq!(r.tx_status, b'I'),
            f => panic!("wrong message: {f:?}"),
        }

        let err = BackendMessage::decode(b'@', Bytes::new()).unwrap_err();
        let _ = format!("{err}");
    }

    #[test]
    fn msgtype_mismatch() {
        let err = ReadyForQuery::decode(b'C', Bytes::from_static(b"\0")).unwrap_err();
        let _ = format!("{err}");
    }
}
