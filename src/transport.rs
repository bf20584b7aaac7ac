//! The [`Transport`] trait.
use std::{
    io,
    task::{Context, Poll},
};

use crate::{
    Result,
    vertica::{BackendProtocol, FrontendProtocol, frontend},
};

/// A buffered stream which can send and receive protocol messages.
pub trait Transport: Unpin {
    /// Poll to flush the underlying io.
    fn poll_flush(&mut self, cx: &mut Context) -> Poll<io::Result<()>>;

    /// Poll to shut down the underlying io.
    fn poll_shutdown(&mut self, cx: &mut Context) -> Poll<io::Result<()>>;

    /// Poll to receive a message.
    ///
    /// Calling `poll_recv` will also try to [`poll_flush`][1] if there is
    /// buffered message.
    ///
    /// Implementor should handle `NoticeResponse` and should not return it.
    ///
    /// Implementor also should handle `ErrorResponse` and return it as
    /// [`Err`].
    ///
    /// [1]: Transport::poll_flush
    fn poll_recv<B: BackendProtocol>(&mut self, cx: &mut Context) -> Poll<Result<B>>;

    /// Request implementor to ignore all backend messages until
    /// `ReadyForQuery` is received.
    ///
    /// This keeps the connection usable after a result set is abandoned
    /// midway.
    fn ready_request(&mut self);

    /// Send message to the backend.
    ///
    /// Note that this send is buffered, caller must also call
    /// [`poll_flush`][1] or [`flush`][2] afterwards.
    ///
    /// [1]: Transport::poll_flush
    /// [2]: TransportExt::flush
    fn send<F: FrontendProtocol>(&mut self, message: F);

    /// Send [`Startup`][1] message to the backend.
    ///
    /// For historical reasons, the very first message sent by the client
    /// (the startup message) has no initial message-type byte, thus
    /// [`Startup`][1] does not implement [`FrontendProtocol`].
    ///
    /// [1]: frontend::Startup
    fn send_startup(&mut self, startup: frontend::Startup);
}

impl<P> Transport for &mut P where P: Transport {
    fn poll_flush(&mut self, cx: &mut Context) -> Poll<io::Result<()>> {
        P::poll_flush(self, cx)
    }

    fn poll_shutdown(&mut self, cx: &mut Context) -> Poll<io::Result<()>> {
        P::poll_shutdown(self, cx)
    }

    fn poll_recv<B: BackendProtocol>(&mut self, cx: &mut Context) -> Poll<Result<B>> {
        P::poll_recv(self, cx)
    }

    fn ready_request(&mut self) {
        P::ready_request(self);
    }

    fn send<F: FrontendProtocol>(&mut self, message: F) {
        P::send(self, message);
    }

    fn send_startup(&mut self, startup: frontend::Startup) {
        P::send_startup(self, startup);
    }
}

/// An extension trait to provide `Future` API for [`Transport`].
pub trait TransportExt: Transport {
    /// Flush the underlying io.
    fn flush(&mut self) -> impl Future<Output = io::Result<()>> {
        std::future::poll_fn(|cx| self.poll_flush(cx))
    }

    /// Shut down the underlying io.
    fn shutdown(&mut self) -> impl Future<Output = io::Result<()>> {
        std::future::poll_fn(|cx| self.poll_shutdown(cx))
    }

    /// Receive a backend message.
    fn recv<B: BackendProtocol>(&mut self) -> impl Future<Output = Result<B>> {
        std::future::poll_fn(|cx| self.poll_recv(cx))
    }
}

impl<T> TransportExt for T where T: Transport { }

#[cfg(test)]
pub(crate) mod mock {
    //! A scripted [`Transport`] double.
    //!
    //! Backend frames are queued up front and handed out one `poll_recv` at
    //! a time, which also makes row streaming observable: frames left in the
    //! queue are frames the client has not pulled yet.
    use bytes::{BufMut, Bytes, BytesMut};
    use std::collections::VecDeque;

    use super::*;
    use crate::ext::BufMutExt;
    use crate::vertica::backend;

    #[derive(Default)]
    pub(crate) struct MockTransport {
        /// Frontend messages captured as (msgtype, body).
        pub sent: Vec<(u8, Bytes)>,
        frames: VecDeque<(u8, Bytes)>,
        discard: bool,
        pub flushes: usize,
    }

    impl MockTransport {
        pub fn new() -> Self {
            Self::default()
        }

        /// Sql strings of every `Query` message sent so far.
        pub fn sent_sql(&self) -> Vec<String> {
            self.sent
                .iter()
                .filter(|(ty, _)| *ty == b'Q')
                .map(|(_, body)| {
                    String::from_utf8(body[..body.len() - 1].to_vec()).unwrap()
                })
                .collect()
        }

        pub fn remaining(&self) -> usize {
            self.frames.len()
        }

        fn push(&mut self, msgtype: u8, body: Bytes) {
            self.frames.push_back((msgtype, body));
        }

        /// Script the server dropping the connection; the next receive
        /// fails with an io error.
        pub fn push_disconnect(&mut self) {
            self.push(0, Bytes::new());
        }

        pub fn push_authentication(&mut self, code: i32) {
            let mut buf = BytesMut::new();
            buf.put_i32(code);
            if code == 5 {
                buf.put_u32(0); // salt
            }
            self.push(b'R', buf.freeze());
        }

        pub fn push_parameter_status(&mut self, name: &str, value: &str) {
            let mut buf = BytesMut::new();
            buf.put_nul_string(name);
            buf.put_nul_string(value);
            self.push(b'S', buf.freeze());
        }

        pub fn push_backend_key_data(&mut self, process_id: i32, secret_key: i32) {
            let mut buf = BytesMut::new();
            buf.put_i32(process_id);
            buf.put_i32(secret_key);
            self.push(b'K', buf.freeze());
        }

        pub fn push_ready(&mut self, tx_status: u8) {
            self.push(b'Z', Bytes::copy_from_slice(&[tx_status]));
        }

        pub fn push_command_complete(&mut self, tag: &str) {
            let mut buf = BytesMut::new();
            buf.put_nul_string(tag);
            self.push(b'C', buf.freeze());
        }

        pub fn push_row_description(&mut self, names: &[&str]) {
            let mut buf = BytesMut::new();
            buf.put_i16(names.len() as i16);
            for name in names {
                buf.put_nul_string(name);
                buf.put_i32(0); // table oid
                buf.put_i16(0); // attribute number
                buf.put_u32(9); // type oid
                buf.put_i16(-1); // type size
                buf.put_i32(-1); // type modifier
                buf.put_i16(0); // format code: text
            }
            self.push(b'T', buf.freeze());
        }

        pub fn push_data_row(&mut self, values: &[Option<&str>]) {
            let mut buf = BytesMut::new();
            buf.put_i16(values.len() as i16);
            for value in values {
                match value {
                    Some(v) => {
                        buf.put_i32(v.len() as i32);
                        buf.put(v.as_bytes());
                    },
                    None => buf.put_i32(-1),
                }
            }
            self.push(b'D', buf.freeze());
        }

        pub fn push_empty_query(&mut self) {
            self.push(b'I', Bytes::new());
        }

        pub fn push_error(&mut self, message: &str) {
            let mut buf = BytesMut::new();
            buf.put_u8(b'S');
            buf.put_nul_string("ERROR");
            buf.put_u8(b'M');
            buf.put_nul_string(message);
            buf.put_u8(0);
            self.push(b'E', buf.freeze());
        }

        /// Script a full statement exchange with no result rows.
        pub fn script_command(&mut self, tag: &str, tx_status: u8) {
            self.push_command_complete(tag);
            self.push_ready(tx_status);
        }
    }

    impl Transport for MockTransport {
        fn poll_flush(&mut self, _: &mut Context) -> Poll<io::Result<()>> {
            self.flushes += 1;
            Poll::Ready(Ok(()))
        }

        fn poll_shutdown(&mut self, _: &mut Context) -> Poll<io::Result<()>> {
            Poll::Ready(Ok(()))
        }

        fn poll_recv<B: BackendProtocol>(&mut self, _: &mut Context) -> Poll<Result<B>> {
            loop {
                let (msgtype, body) = self
                    .frames
                    .pop_front()
                    .expect("mock transport frame queue exhausted");

                if msgtype == 0 {
                    return Poll::Ready(Err(io::Error::from(io::ErrorKind::UnexpectedEof).into()));
                }

                if self.discard {
                    if msgtype == backend::ReadyForQuery::MSGTYPE {
                        self.discard = false;
                    }
                    continue;
                }

                if msgtype == backend::NoticeResponse::MSGTYPE {
                    continue;
                }

                if msgtype == backend::ErrorResponse::MSGTYPE {
                    let err = backend::ErrorResponse::decode(msgtype, body).unwrap();
                    return Poll::Ready(Err(err.into()));
                }

                return Poll::Ready(B::decode(msgtype, body).map_err(Into::into));
            }
        }

        fn ready_request(&mut self) {
            self.discard = true;
        }

        fn send<F: FrontendProtocol>(&mut self, message: F) {
            let mut buf = BytesMut::new();
            frontend::write(message, &mut buf);
            let body = buf.split_off(5).freeze();
            self.sent.push((F::MSGTYPE, body));
        }

        fn send_startup(&mut self, startup: frontend::Startup) {
            let mut buf = BytesMut::new();
            startup.write(&mut buf);
            self.sent.push((0, buf.freeze()));
        }
    }
}
