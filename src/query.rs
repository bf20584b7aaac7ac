//! Simple query execution.
//!
//! One `Query` message per statement; the server answers with an optional
//! `RowDescription` + `DataRow` sequence, a `CommandComplete`, and a final
//! `ReadyForQuery`. Rows are yielded as they arrive off the socket.
use futures_core::Stream;
use std::{
    pin::Pin,
    sync::Arc,
    task::{Context, Poll, ready},
};

use crate::{
    Result, Row,
    row::Field,
    transport::Transport,
    vertica::{backend, frontend},
};

/// Statement result summary.
#[derive(Debug)]
pub struct ExecResult {
    /// Number of rows the statement affected, parsed from the command tag.
    pub rows_affected: u64,
}

/// Decode the rows affected count from a `CommandComplete` tag.
pub(crate) fn rows_affected(tag: &str) -> u64 {
    let mut whs = tag.split_whitespace();
    let Some(tag) = whs.next() else {
        return 0;
    };
    let Some(rows) = whs.next() else {
        return 0;
    };
    match tag {
        // INSERT tag is `INSERT oid rows`
        "INSERT" => whs.next().unwrap_or_default(),
        "SELECT" => rows,
        "UPDATE" => rows,
        "DELETE" => rows,
        "MERGE" => rows,
        "COPY" => rows,
        _ => return 0,
    }
    .parse()
    .unwrap_or_default()
}

/// A lazy, forward-only stream of query result [`Row`]s.
///
/// The stream should be polled until completion, otherwise the rest of the
/// result set is discarded on drop so the connection stays usable for the
/// next statement. Re-issuing requires a new
/// [`query`][crate::Connection::query] call.
#[derive(Debug)]
#[must_use = "streams do nothing unless polled"]
pub struct QueryStream<'c, IO: Transport> {
    io: &'c mut IO,
    phase: Phase,
    cmd: Option<backend::CommandComplete>,
}

#[derive(Debug)]
enum Phase {
    Flush,
    Description,
    DataRow(Arc<[Field]>),
    ReadyForQuery,
    Complete,
    Failed,
}

impl<'c, IO: Transport> QueryStream<'c, IO> {
    /// Buffer the `Query` message; nothing hits the socket until the first
    /// poll.
    pub(crate) fn new(io: &'c mut IO, sql: &str) -> Self {
        io.send(frontend::Query { sql });
        Self { io, phase: Phase::Flush, cmd: None }
    }

    /// Receive the next row, [`None`] when the result set is finished.
    pub async fn try_next(&mut self) -> Result<Option<Row>> {
        std::future::poll_fn(|cx| Pin::new(&mut *self).poll_next(cx)).await.transpose()
    }

    /// The statement summary, available once the stream is exhausted.
    pub(crate) fn into_result(mut self) -> ExecResult {
        ExecResult {
            rows_affected: self.cmd.take().map(|cmd| rows_affected(&cmd.tag)).unwrap_or(0),
        }
    }
}

impl<IO: Transport> Stream for QueryStream<'_, IO> {
    type Item = Result<Row>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let me = self.get_mut();

        macro_rules! fail {
            ($err:expr) => {{
                me.phase = Phase::Failed;
                return Poll::Ready(Some(Err($err.into())));
            }};
        }

        loop {
            match &mut me.phase {
                Phase::Flush => {
                    match ready!(me.io.poll_flush(cx)) {
                        Ok(()) => me.phase = Phase::Description,
                        Err(err) => fail!(err),
                    }
                },
                Phase::Description => {
                    use backend::BackendMessage::*;
                    match ready!(me.io.poll_recv(cx)) {
                        Ok(RowDescription(rd)) => {
                            let fields = match Field::parse_all(rd.body) {
                                Ok(ok) => ok,
                                Err(err) => fail!(err),
                            };
                            me.phase = Phase::DataRow(fields);
                        },
                        Ok(CommandComplete(cmd)) => {
                            me.cmd = Some(cmd);
                            me.phase = Phase::ReadyForQuery;
                        },
                        // substitutes for CommandComplete on an empty
                        // query string
                        Ok(EmptyQueryResponse(_)) => {
                            me.phase = Phase::ReadyForQuery;
                        },
                        Ok(f) => fail!(f.unexpected("query description")),
                        Err(err) => fail!(err),
                    }
                },
                Phase::DataRow(fields) => {
                    use backend::BackendMessage::*;
                    match ready!(me.io.poll_recv(cx)) {
                        Ok(DataRow(dr)) => {
                            let row = Row::new(Arc::clone(fields), dr.body);
                            return Poll::Ready(Some(Ok(row)));
                        },
                        Ok(CommandComplete(cmd)) => {
                            me.cmd = Some(cmd);
                            me.phase = Phase::ReadyForQuery;
                        },
                        Ok(f) => fail!(f.unexpected("query rows")),
                        Err(err) => fail!(err),
                    }
                },
                Phase::ReadyForQuery => {
                    match ready!(me.io.poll_recv::<backend::ReadyForQuery>(cx)) {
                        Ok(_) => me.phase = Phase::Complete,
                        Err(err) => fail!(err),
                    }
                },
                Phase::Complete => return Poll::Ready(None),
                Phase::Failed => return Poll::Ready(None),
            }
        }
    }
}

impl<IO: Transport> Drop for QueryStream<'_, IO> {
    fn drop(&mut self) {
        // an abandoned result set desynchronizes the message cycle,
        // have the transport skip to the next ReadyForQuery
        if !matches!(self.phase, Phase::Complete) {
            self.io.ready_request();
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::transport::mock::MockTransport;

    #[test]
    fn command_tags() {
        assert_eq!(rows_affected("INSERT 0 1"), 1);
        assert_eq!(rows_affected("SELECT 420"), 420);
        assert_eq!(rows_affected("UPDATE 7"), 7);
        assert_eq!(rows_affected("DELETE 0"), 0);
        assert_eq!(rows_affected("CREATE TABLE"), 0);
        assert_eq!(rows_affected("BEGIN"), 0);
        assert_eq!(rows_affected(""), 0);
    }

    #[tokio::test]
    async fn streams_rows_lazily() {
        let mut io = MockTransport::new();
        io.push_row_description(&["id"]);
        for i in 0..100 {
            io.push_data_row(&[Some(&i.to_string())]);
        }
        io.push_command_complete("SELECT 100");
        io.push_ready(b'I');

        let mut stream = QueryStream::new(&mut io, "SELECT id FROM big");

        for i in 0..3 {
            let row = stream.try_next().await.unwrap().unwrap();
            assert_eq!(row.try_get::<_, i32>("id").unwrap(), i);
        }

        // only the consumed rows were pulled off the transport
        drop(stream);
        assert!(io.remaining() > 90);
        assert_eq!(io.sent_sql(), ["SELECT id FROM big"]);
    }

    #[tokio::test]
    async fn dropped_stream_leaves_transport_usable() {
        let mut io = MockTransport::new();
        io.push_row_description(&["n"]);
        io.push_data_row(&[Some("1")]);
        io.push_data_row(&[Some("2")]);
        io.push_command_complete("SELECT 2");
        io.push_ready(b'I');
        // next statement exchange
        io.script_command("CREATE TABLE", b'I');

        let mut stream = QueryStream::new(&mut io, "SELECT n FROM t");
        let _ = stream.try_next().await.unwrap().unwrap();
        drop(stream);

        // the leftover frames of the first result set are discarded
        let mut stream = QueryStream::new(&mut io, "CREATE TABLE t2(n int)");
        assert!(stream.try_next().await.unwrap().is_none());
        assert_eq!(stream.into_result().rows_affected, 0);
    }

    #[tokio::test]
    async fn server_error_surfaces_verbatim() {
        let mut io = MockTransport::new();
        io.push_error("Syntax error at or near \"FORM\"");
        io.push_ready(b'I');

        let mut stream = QueryStream::new(&mut io, "SELECT * FORM t");
        let err = stream.try_next().await.unwrap_err();
        assert!(err.to_string().contains("Syntax error at or near \"FORM\""));
    }

    #[tokio::test]
    async fn empty_query_is_empty_result() {
        let mut io = MockTransport::new();
        io.push_empty_query();
        io.push_ready(b'I');

        let mut stream = QueryStream::new(&mut io, "");
        assert!(stream.try_next().await.unwrap().is_none());
        assert_eq!(stream.into_result().rows_affected, 0);
    }
}
