//! Session establishment.
//!
//! <https://www.postgresql.org/docs/current/protocol-flow.html#PROTOCOL-FLOW-START-UP>
use crate::{
    Result,
    common::unit_error,
    connection::Config,
    transport::{Transport, TransportExt},
    vertica::{BackendMessage, ProtocolError, backend, frontend},
};

unit_error! {
    /// The server requested an authentication method this client does not
    /// implement.
    pub struct UnsupportedAuth("unsupported authentication method, only cleartext password is supported");
}

/// Startup phase successful response.
#[derive(Debug)]
pub struct StartupResponse {
    /// Cancellation key data, when the server sends it.
    pub backend_key_data: Option<backend::BackendKeyData>,
    /// Session defaults reported by the server.
    pub param_status: Vec<backend::ParameterStatus>,
}

/// Perform the startup handshake.
///
/// Sends the startup message, answers a cleartext password request if the
/// server issues one, then drains the parameter reports until the server is
/// ready for queries.
pub(crate) async fn startup<IO: Transport>(config: &Config, io: &mut IO) -> Result<StartupResponse> {
    io.send_startup(frontend::Startup {
        user: config.user.as_ref(),
        database: Some(config.dbname.as_ref()),
    });
    io.flush().await?;

    loop {
        use backend::Authentication::*;
        match io.recv().await? {
            Ok => break,
            CleartextPassword => {
                io.send(frontend::PasswordMessage { password: config.pass.as_ref() });
                io.flush().await?;
            }
            _ => Err(UnsupportedAuth)?,
        }
    }

    // After AuthenticationOk the backend process is being started, and the
    // frontend is just an interested bystander until ReadyForQuery.
    let mut param_status = vec![];
    let mut key_data = None;

    loop {
        use BackendMessage::*;
        match io.recv().await? {
            ReadyForQuery(_) => break,
            BackendKeyData(new_key_data) => key_data = Some(new_key_data),
            ParameterStatus(param) => param_status.push(param),
            f => Err(ProtocolError::unexpected_phase(f.msgtype(), "startup phase"))?,
        }
    }

    Ok(StartupResponse { param_status, backend_key_data: key_data })
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::transport::mock::MockTransport;

    fn config() -> Config {
        Config::new()
            .user("dbadmin")
            .password("swordfish")
            .database("warehouse")
            .schema("public")
    }

    #[tokio::test]
    async fn cleartext_handshake() {
        let mut io = MockTransport::new();
        io.push_authentication(3);
        io.push_authentication(0);
        io.push_parameter_status("server_version", "12.0.4");
        io.push_backend_key_data(42, 117);
        io.push_ready(b'I');

        let resp = startup(&config(), &mut io).await.unwrap();
        assert_eq!(resp.param_status.len(), 1);
        assert_eq!(resp.backend_key_data.unwrap().process_id, 42);

        // startup message, then the password answer
        assert_eq!(io.sent.len(), 2);
        assert_eq!(io.sent[1].0, b'p');
        assert!(io.sent[1].1.starts_with(b"swordfish"));
    }

    #[tokio::test]
    async fn md5_is_refused() {
        let mut io = MockTransport::new();
        io.push_authentication(5);

        let err = startup(&config(), &mut io).await.unwrap_err();
        assert!(matches!(err.kind(), crate::ErrorKind::Auth(_)));
    }
}
