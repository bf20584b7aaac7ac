//! Vertica Frontend Messages
use bytes::{BufMut, BytesMut};

use crate::ext::{BufMutExt, StrExt, UsizeExt};

/// Write a frontend message to `buf`.
pub fn write<F: FrontendProtocol>(msg: F, buf: &mut BytesMut) {
    // msgtype + length
    const PREFIX: usize = 1 + 4;

    let size_hint = msg.size_hint();
    buf.reserve(PREFIX + size_hint as usize);

    let offset = buf.len();
    buf.put_u8(F::MSGTYPE);
    buf.put_u32(4 + size_hint);

    msg.encode(&mut *buf);

    assert_eq!(
        buf.len() - offset,
        PREFIX + size_hint as usize,
        "frontend message body size not equal to size hint"
    );
}

/// A type which can be encoded into a frontend message.
pub trait FrontendProtocol {
    /// Message type.
    const MSGTYPE: u8;

    /// Size of the main body.
    ///
    /// Note that this is **only** the size of the main body as oppose of the
    /// actual wire message which include the length itself.
    fn size_hint(&self) -> u32;

    /// Write the main body of the message.
    ///
    /// The length of body written must be equal to the length returned by
    /// [`size_hint`][FrontendProtocol::size_hint].
    fn encode(self, buf: impl BufMut);
}

/// The startup frontend message.
///
/// For historical reasons, the very first message sent by the client (the
/// [`Startup`] message) has no initial message-type byte, thus [`Startup`]
/// does not implement [`FrontendProtocol`].
///
/// To write the startup message, use [`Startup::write`].
#[derive(Debug)]
pub struct Startup<'a> {
    /// The database user name to connect as. Required; there is no default.
    pub user: &'a str,
    /// The database to connect to.
    pub database: Option<&'a str>,
}

impl Startup<'_> {
    /// The v3 protocol version number: major 3, minor 0.
    const PROTOCOL_VERSION: u32 = 196_608;

    pub fn write(self, buf: &mut BytesMut) {
        let offset = buf.len();

        // Length of message contents in bytes, including self.
        // reserve 4 bytes for the length
        buf.put_u32(0);

        buf.put_u32(Self::PROTOCOL_VERSION);

        // The protocol version number is followed by pairs of parameter
        // name and value strings.

        buf.put_nul_string("user");
        buf.put_nul_string(self.user);

        if let Some(db) = self.database {
            buf.put_nul_string("database");
            buf.put_nul_string(db);
        }

        // A zero byte is required as a terminator after the last pair.
        buf.put_u8(b'\0');

        // write the length
        let mut written_buf = &mut buf[offset..];
        written_buf.put_u32(written_buf.len().to_u32());
    }
}

/// Identifies the message as a password response.
#[derive(Debug)]
pub struct PasswordMessage<'a> {
    /// The password (encrypted, if requested).
    pub password: &'a str,
}

impl FrontendProtocol for PasswordMessage<'_> {
    const MSGTYPE: u8 = b'p';

    fn size_hint(&self) -> u32 {
        self.password.nul_string_len()
    }

    fn encode(self, mut buf: impl BufMut) {
        buf.put_nul_string(self.password);
    }
}

/// Identifies the message as a simple query.
pub struct Query<'a> {
    /// The query string itself.
    pub sql: &'a str,
}

impl FrontendProtocol for Query<'_> {
    const MSGTYPE: u8 = b'Q';

    fn size_hint(&self) -> u32 {
        self.sql.nul_string_len()
    }

    fn encode(self, mut buf: impl BufMut) {
        buf.put_nul_string(self.sql);
    }
}

/// Identifies the message as a termination.
///
/// The frontend sends it before closing the connection, the server then
/// closes its side immediately.
pub struct Terminate;

impl FrontendProtocol for Terminate {
    const MSGTYPE: u8 = b'X';

    fn size_hint(&self) -> u32 { 0 }

    fn encode(self, _: impl BufMut) { }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn write_matches_size_hint() {
        let mut buf = BytesMut::new();
        write(Query { sql: "SELECT 1" }, &mut buf);
        // 'Q' + len + "SELECT 1\0"
        assert_eq!(buf.len(), 1 + 4 + 8 + 1);
        assert_eq!(buf[0], b'Q');
        assert_eq!(&buf[5..13], b"SELECT 1");
        assert_eq!(buf[13], 0);

        let mut buf = BytesMut::new();
        write(Terminate, &mut buf);
        assert_eq!(&buf[..], &[b'X', 0, 0, 0, 4]);
    }

    #[test]
    fn startup_writes_own_length() {
        let mut buf = BytesMut::new();
        Startup { user: "dbadmin", database: Some("warehouse") }.write(&mut buf);
        let len = u32::from_be_bytes(buf[..4].try_into().unwrap());
        assert_eq!(len as usize, buf.len());
        assert_eq!(buf.last(), Some(&0));
    }
}
