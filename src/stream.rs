//! Buffered connection to the server.
use bytes::{Buf, BytesMut};
use std::{
    io,
    task::{Context, Poll},
};

use crate::{
    Result,
    common::verbose,
    connection::Config,
    net::Socket,
    transport::Transport,
    vertica::{BackendProtocol, FrontendProtocol, backend, frontend},
};

const DEFAULT_BUF_CAPACITY: usize = 1024;

/// Buffered stream which frames outgoing frontend messages and reassembles
/// incoming backend messages.
#[derive(Debug)]
pub struct WireStream {
    socket: Socket,
    read_buf: BytesMut,
    write_buf: BytesMut,
    /// Skip every message until `ReadyForQuery` on the next receive.
    ready_request: bool,
}

impl WireStream {
    pub(crate) async fn connect(config: &Config) -> Result<Self> {
        let socket = Socket::connect_tcp(&config.host, config.port).await?;

        Ok(Self {
            socket,
            read_buf: BytesMut::with_capacity(DEFAULT_BUF_CAPACITY),
            write_buf: BytesMut::with_capacity(DEFAULT_BUF_CAPACITY),
            ready_request: false,
        })
    }

    /// Take one complete message frame out of the read buffer.
    fn frame(&mut self) -> Option<(u8, bytes::Bytes)> {
        let mut header = self.read_buf.get(..5)?;
        let msgtype = header.get_u8();
        let len = header.get_i32() as usize;

        if self.read_buf.len() - 1/*msgtype*/ < len {
            self.read_buf.reserve(1 + len);
            return None;
        }

        self.read_buf.advance(5);
        let body = self.read_buf.split_to(len - 4).freeze();
        Some((msgtype, body))
    }

    #[cfg(feature = "tokio")]
    fn poll_read_socket(&mut self, cx: &mut Context) -> Poll<io::Result<()>> {
        use bytes::BufMut;
        use std::pin::Pin;
        use std::task::ready;
        use tokio::io::{AsyncRead, ReadBuf};

        if self.read_buf.capacity() == self.read_buf.len() {
            self.read_buf.reserve(DEFAULT_BUF_CAPACITY);
        }

        let n = {
            let dst = self.read_buf.chunk_mut();
            let dst = unsafe { dst.as_uninit_slice_mut() };
            let mut buf = ReadBuf::uninit(dst);
            let ptr = buf.filled().as_ptr();
            ready!(Pin::new(&mut self.socket).poll_read(cx, &mut buf)?);

            // Ensure the pointer does not change from under us
            assert_eq!(ptr, buf.filled().as_ptr());
            buf.filled().len()
        };

        if n == 0 {
            return Poll::Ready(Err(io::ErrorKind::UnexpectedEof.into()));
        }

        // Safety: This is guaranteed to be the number of initialized (and
        // read) bytes due to the invariants provided by `ReadBuf::filled`.
        unsafe {
            self.read_buf.advance_mut(n);
        }

        Poll::Ready(Ok(()))
    }

    #[cfg(not(feature = "tokio"))]
    fn poll_read_socket(&mut self, _: &mut Context) -> Poll<io::Result<()>> {
        panic!("runtime disabled")
    }

}

impl Transport for WireStream {
    #[cfg(feature = "tokio")]
    fn poll_flush(&mut self, cx: &mut Context) -> Poll<io::Result<()>> {
        use std::{io::IoSlice, pin::Pin, task::ready};
        use tokio::io::AsyncWrite;

        const MAX_VECTOR_ELEMENTS: usize = 64;

        let Self { socket, write_buf, .. } = self;

        while write_buf.has_remaining() {
            let n = if socket.is_write_vectored() {
                let mut slices = [IoSlice::new(&[]); MAX_VECTOR_ELEMENTS];
                let cnt = write_buf.chunks_vectored(&mut slices);
                ready!(Pin::new(&mut *socket).poll_write_vectored(cx, &slices[..cnt]))?
            } else {
                ready!(Pin::new(&mut *socket).poll_write(cx, write_buf.chunk())?)
            };
            write_buf.advance(n);
            if n == 0 {
                return Poll::Ready(Err(io::ErrorKind::WriteZero.into()));
            }
        }

        Poll::Ready(Ok(()))
    }

    #[cfg(not(feature = "tokio"))]
    fn poll_flush(&mut self, _: &mut Context) -> Poll<io::Result<()>> {
        panic!("runtime disabled")
    }

    #[cfg(feature = "tokio")]
    fn poll_shutdown(&mut self, cx: &mut Context) -> Poll<io::Result<()>> {
        use tokio::io::AsyncWrite;
        std::pin::Pin::new(&mut self.socket).poll_shutdown(cx)
    }

    #[cfg(not(feature = "tokio"))]
    fn poll_shutdown(&mut self, _: &mut Context) -> Poll<io::Result<()>> {
        panic!("runtime disabled")
    }

    fn poll_recv<B: BackendProtocol>(&mut self, cx: &mut Context) -> Poll<Result<B>> {
        use std::task::ready;

        // flush buffered messages first
        if !self.write_buf.is_empty() {
            ready!(self.poll_flush(cx))?;
        }

        loop {
            let Some((msgtype, body)) = self.frame() else {
                ready!(self.poll_read_socket(cx))?;
                continue;
            };

            if self.ready_request {
                if msgtype == backend::ReadyForQuery::MSGTYPE {
                    self.ready_request = false;
                }
                continue;
            }

            if msgtype == backend::NoticeResponse::MSGTYPE {
                let notice = backend::NoticeResponse { body };
                #[cfg(feature = "log")]
                log::info!("{notice}");
                let _ = notice;
                continue;
            }

            if msgtype == backend::ErrorResponse::MSGTYPE {
                let err = backend::ErrorResponse::decode(msgtype, body)?;
                return Poll::Ready(Err(err.into()));
            }

            verbose!("recv {}", backend::BackendMessage::message_name(msgtype));
            return Poll::Ready(B::decode(msgtype, body).map_err(Into::into));
        }
    }

    fn ready_request(&mut self) {
        self.ready_request = true;
    }

    fn send<F: FrontendProtocol>(&mut self, message: F) {
        frontend::write(message, &mut self.write_buf);
    }

    fn send_startup(&mut self, startup: frontend::Startup) {
        startup.write(&mut self.write_buf);
    }
}
