//! One bridge session: a WebSocket client paired with its own TCP connection
//! from upgrade through teardown.
//!
//! Two pumps run concurrently and share the session's cancellation token.
//! Whichever finishes first cancels the token, which stops the other; the
//! session then shuts down the TCP stream and sends a close frame.

use std::fmt::Display;
use std::time::Duration;

use axum::extract::ws::{CloseFrame, Message, WebSocket, close_code};
use futures::{Sink, SinkExt, Stream, StreamExt};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument};

use crate::error::{BridgeError, Result};
use crate::registry::SessionGuard;

/// How a pump stopped without error.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PumpEnd {
    /// Its source closed (WebSocket close frame or TCP EOF).
    Closed,
    /// The session token was cancelled first.
    Cancelled,
}

/// Summary of a completed pump.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PumpReport {
    /// Why the pump stopped.
    pub end: PumpEnd,
    /// Messages forwarded.
    pub messages: u64,
    /// Payload bytes forwarded.
    pub bytes: u64,
}

impl PumpReport {
    fn new() -> Self {
        Self {
            end: PumpEnd::Closed,
            messages: 0,
            bytes: 0,
        }
    }

    fn finish(mut self, end: PumpEnd) -> Self {
        self.end = end;
        self
    }
}

/// Where and how to reach the backend.
#[derive(Clone, Debug)]
pub struct TcpTarget {
    /// `host:port` of the backend.
    pub addr: String,
    /// Connect timeout.
    pub connect_timeout: Duration,
}

impl TcpTarget {
    /// Open a fresh connection to the backend.
    pub async fn connect(&self) -> Result<TcpStream> {
        match tokio::time::timeout(self.connect_timeout, TcpStream::connect(&self.addr)).await {
            Ok(Ok(stream)) => Ok(stream),
            Ok(Err(source)) => Err(BridgeError::Connect {
                addr: self.addr.clone(),
                source,
            }),
            Err(_) => Err(BridgeError::ConnectTimeout {
                addr: self.addr.clone(),
                timeout: self.connect_timeout,
            }),
        }
    }
}

enum Step {
    Forwarded(usize),
    Skipped,
    Closed,
}

/// Forward WebSocket messages to the TCP writer until either side closes
/// or `token` is cancelled.
///
/// Text is written as UTF-8, binary as-is, each followed by a flush.
/// Nothing is appended. Ping and pong frames are not forwarded.
pub async fn pump_ws_to_tcp<S, E, W>(
    mut ws: S,
    mut tcp: W,
    token: &CancellationToken,
) -> Result<PumpReport>
where
    S: Stream<Item = std::result::Result<Message, E>> + Unpin,
    E: Display,
    W: AsyncWrite + Unpin,
{
    let mut report = PumpReport::new();
    loop {
        let step = tokio::select! {
            biased;
            () = token.cancelled() => return Ok(report.finish(PumpEnd::Cancelled)),
            step = forward_ws_message(&mut ws, &mut tcp) => step?,
        };
        match step {
            Step::Forwarded(len) => {
                report.messages += 1;
                report.bytes += len as u64;
            }
            Step::Skipped => {}
            Step::Closed => return Ok(report.finish(PumpEnd::Closed)),
        }
    }
}

async fn forward_ws_message<S, E, W>(ws: &mut S, tcp: &mut W) -> Result<Step>
where
    S: Stream<Item = std::result::Result<Message, E>> + Unpin,
    E: Display,
    W: AsyncWrite + Unpin,
{
    let len = match ws.next().await {
        None | Some(Ok(Message::Close(_))) => return Ok(Step::Closed),
        Some(Err(err)) => return Err(BridgeError::WebSocket(err.to_string())),
        Some(Ok(Message::Ping(_) | Message::Pong(_))) => return Ok(Step::Skipped),
        Some(Ok(Message::Text(text))) => {
            tcp.write_all(text.as_str().as_bytes()).await?;
            text.len()
        }
        Some(Ok(Message::Binary(data))) => {
            tcp.write_all(&data).await?;
            data.len()
        }
    };
    tcp.flush().await?;
    Ok(Step::Forwarded(len))
}

/// Forward newline-terminated lines from the TCP reader to the WebSocket
/// sink as text messages until either side closes or `token` is cancelled.
///
/// Each message carries its trailing `\n`. Bytes after the last newline at
/// EOF are discarded. A line that is not UTF-8 ends the pump with
/// [`BridgeError::Decode`].
pub async fn pump_tcp_to_ws<R, S>(
    mut tcp: R,
    mut ws: S,
    token: &CancellationToken,
) -> Result<PumpReport>
where
    R: AsyncBufRead + Unpin,
    S: Sink<Message> + Unpin,
    S::Error: Display,
{
    let mut report = PumpReport::new();
    let mut line = Vec::new();
    loop {
        let read = tokio::select! {
            biased;
            () = token.cancelled() => return Ok(report.finish(PumpEnd::Cancelled)),
            read = tcp.read_until(b'\n', &mut line) => read?,
        };
        if read == 0 {
            return Ok(report.finish(PumpEnd::Closed));
        }
        if line.last() != Some(&b'\n') {
            debug!(dropped_bytes = line.len(), "tcp closed mid-line, discarding partial line");
            return Ok(report.finish(PumpEnd::Closed));
        }

        let text = String::from_utf8(std::mem::take(&mut line))?;
        let len = text.len();
        tokio::select! {
            biased;
            () = token.cancelled() => return Ok(report.finish(PumpEnd::Cancelled)),
            sent = ws.send(Message::Text(text.into())) => {
                sent.map_err(|err| BridgeError::WebSocket(err.to_string()))?;
            }
        }
        report.messages += 1;
        report.bytes += len as u64;
    }
}

/// Run a bridge session for an upgraded WebSocket.
///
/// Opens the backend connection, runs both pumps until one side ends,
/// then closes both. A failed connect closes the WebSocket with code 1011.
#[instrument(
    name = "bridge_session",
    skip_all,
    fields(session_id = %guard.id(), peer = ?guard.peer())
)]
pub async fn run_session(socket: WebSocket, guard: SessionGuard, target: TcpTarget) {
    info!("websocket client connected");
    let (mut ws_tx, ws_rx) = socket.split();

    let tcp = match target.connect().await {
        Ok(tcp) => tcp,
        Err(err) => {
            error!(kind = err.error_kind(), error = %err, "bridge error");
            send_close(&mut ws_tx, close_code::ERROR, "tcp server unavailable").await;
            info!("connection closed");
            return;
        }
    };
    info!(tcp_addr = %target.addr, "connected to tcp server");

    let token = guard.token().clone();
    let (tcp_rx, mut tcp_tx) = tcp.into_split();

    let upstream = async {
        let result = pump_ws_to_tcp(ws_rx, &mut tcp_tx, &token).await;
        token.cancel();
        result
    };
    let downstream = async {
        let result = pump_tcp_to_ws(BufReader::new(tcp_rx), &mut ws_tx, &token).await;
        token.cancel();
        result
    };
    let (up, down) = tokio::join!(upstream, downstream);
    log_pump("ws_to_tcp", &up);
    log_pump("tcp_to_ws", &down);

    if let Err(err) = tcp_tx.shutdown().await {
        debug!(error = %err, "tcp shutdown failed");
    }
    drop(tcp_tx);

    let (code, reason) = if guard.server_shutting_down() {
        (close_code::AWAY, "server shutting down")
    } else {
        (close_code::NORMAL, "")
    };
    send_close(&mut ws_tx, code, reason).await;
    info!("connection closed");
}

fn log_pump(direction: &'static str, result: &Result<PumpReport>) {
    match result {
        Ok(report) => debug!(
            direction,
            end = ?report.end,
            messages = report.messages,
            bytes = report.bytes,
            "pump finished"
        ),
        Err(err) => error!(direction, kind = err.error_kind(), error = %err, "bridge error"),
    }
}

async fn send_close<S>(ws: &mut S, code: u16, reason: &'static str)
where
    S: Sink<Message> + Unpin,
    S::Error: Display,
{
    let frame = CloseFrame {
        code,
        reason: reason.into(),
    };
    // The peer may already be gone.
    if let Err(err) = ws.send(Message::Close(Some(frame))).await {
        debug!(error = %err, "close frame not delivered");
    }
    if let Err(err) = ws.close().await {
        debug!(error = %err, "websocket close failed");
    }
}

#[cfg(test)]
mod tests {
    use futures::channel::mpsc;
    use futures::stream;

    use super::*;

    fn ok(msg: Message) -> std::result::Result<Message, axum::Error> {
        Ok(msg)
    }

    fn texts(messages: Vec<Message>) -> Vec<String> {
        messages
            .into_iter()
            .map(|m| match m {
                Message::Text(t) => t.as_str().to_owned(),
                other => panic!("expected text, got {other:?}"),
            })
            .collect()
    }

    #[tokio::test]
    async fn ws_to_tcp_forwards_text_and_binary_verbatim() {
        let ws = stream::iter(vec![
            ok(Message::Text("héllo".into())),
            ok(Message::Ping(vec![9].into())),
            ok(Message::Binary(vec![1, 2, 3].into())),
        ]);
        let mut out = Vec::new();
        let token = CancellationToken::new();

        let report = pump_ws_to_tcp(ws, &mut out, &token).await.unwrap();

        let mut expected = "héllo".as_bytes().to_vec();
        expected.extend_from_slice(&[1, 2, 3]);
        assert_eq!(out, expected);
        assert_eq!(report.end, PumpEnd::Closed);
        assert_eq!(report.messages, 2);
        assert_eq!(report.bytes, expected.len() as u64);
    }

    #[tokio::test]
    async fn ws_to_tcp_does_not_append_newline() {
        let ws = stream::iter(vec![ok(Message::Text("a".into())), ok(Message::Text("b".into()))]);
        let mut out = Vec::new();
        let _ = pump_ws_to_tcp(ws, &mut out, &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(out, b"ab");
    }

    #[tokio::test]
    async fn ws_to_tcp_stops_at_close_frame() {
        let ws = stream::iter(vec![
            ok(Message::Text("before".into())),
            ok(Message::Close(None)),
            ok(Message::Text("after".into())),
        ]);
        let mut out = Vec::new();
        let report = pump_ws_to_tcp(ws, &mut out, &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(out, b"before");
        assert_eq!(report.end, PumpEnd::Closed);
    }

    #[tokio::test]
    async fn ws_to_tcp_surfaces_stream_errors() {
        let ws = stream::iter(vec![Err::<Message, _>("connection reset")]);
        let err = pump_ws_to_tcp(ws, Vec::new(), &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, BridgeError::WebSocket(ref m) if m == "connection reset"));
    }

    #[tokio::test]
    async fn ws_to_tcp_stops_on_cancel() {
        let token = CancellationToken::new();
        token.cancel();
        let ws = stream::pending::<std::result::Result<Message, axum::Error>>();
        let report = pump_ws_to_tcp(ws, Vec::new(), &token).await.unwrap();
        assert_eq!(report.end, PumpEnd::Cancelled);
    }

    #[tokio::test]
    async fn ws_to_tcp_write_failure_is_tcp_error() {
        let (client, server) = tokio::io::duplex(64);
        drop(server);
        let ws = stream::iter(vec![ok(Message::Text("lost".into()))]);
        let err = pump_ws_to_tcp(ws, client, &CancellationToken::new())
            .await
            .unwrap_err();
        assert_eq!(err.error_kind(), "tcp_io");
    }

    #[tokio::test]
    async fn tcp_to_ws_sends_lines_with_newline_in_order() {
        let (tx, rx) = mpsc::unbounded();
        let input: &[u8] = b"first\nsecond\n\nthird\n";

        let report = pump_tcp_to_ws(input, tx, &CancellationToken::new())
            .await
            .unwrap();

        let sent: Vec<Message> = rx.collect().await;
        assert_eq!(texts(sent), vec!["first\n", "second\n", "\n", "third\n"]);
        assert_eq!(report.end, PumpEnd::Closed);
        assert_eq!(report.messages, 4);
    }

    #[tokio::test]
    async fn tcp_to_ws_drops_partial_trailing_line() {
        let (tx, rx) = mpsc::unbounded();
        let input: &[u8] = b"complete\npartial";

        let report = pump_tcp_to_ws(input, tx, &CancellationToken::new())
            .await
            .unwrap();

        let sent: Vec<Message> = rx.collect().await;
        assert_eq!(texts(sent), vec!["complete\n"]);
        assert_eq!(report.end, PumpEnd::Closed);
    }

    #[tokio::test]
    async fn tcp_to_ws_preserves_crlf() {
        let (tx, rx) = mpsc::unbounded();
        let input: &[u8] = b"dos line\r\n";
        let _ = pump_tcp_to_ws(input, tx, &CancellationToken::new())
            .await
            .unwrap();
        let sent: Vec<Message> = rx.collect().await;
        assert_eq!(texts(sent), vec!["dos line\r\n"]);
    }

    #[tokio::test]
    async fn tcp_to_ws_rejects_invalid_utf8() {
        let (tx, rx) = mpsc::unbounded();
        let input: &[u8] = b"ok\n\xff\xfe\nnever\n";

        let err = pump_tcp_to_ws(input, tx, &CancellationToken::new())
            .await
            .unwrap_err();

        assert!(matches!(err, BridgeError::Decode(_)));
        let sent: Vec<Message> = rx.collect().await;
        assert_eq!(texts(sent), vec!["ok\n"]);
    }

    #[tokio::test]
    async fn tcp_to_ws_stops_on_cancel() {
        let (reader, _writer) = tokio::io::duplex(64);
        let (tx, _rx) = mpsc::unbounded();
        let token = CancellationToken::new();

        let cancel = token.clone();
        let task = tokio::spawn(async move {
            pump_tcp_to_ws(BufReader::new(reader), tx, &token).await
        });
        cancel.cancel();

        let report = task.await.unwrap().unwrap();
        assert_eq!(report.end, PumpEnd::Cancelled);
        assert_eq!(report.messages, 0);
    }

    #[tokio::test]
    async fn tcp_to_ws_closed_sink_is_websocket_error() {
        let (tx, rx) = mpsc::unbounded();
        drop(rx);
        let input: &[u8] = b"nobody listening\n";
        let err = pump_tcp_to_ws(input, tx, &CancellationToken::new())
            .await
            .unwrap_err();
        assert_eq!(err.error_kind(), "websocket");
    }

    #[tokio::test]
    async fn connect_refused_is_connect_error() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let target = TcpTarget {
            addr: addr.to_string(),
            connect_timeout: Duration::from_secs(5),
        };
        let err = target.connect().await.unwrap_err();
        assert!(matches!(err, BridgeError::Connect { .. }));
        assert!(err.to_string().contains(&addr.to_string()));
    }

    #[tokio::test]
    async fn send_close_tolerates_closed_peer() {
        let (tx, rx) = mpsc::unbounded::<Message>();
        drop(rx);
        let mut tx = tx;
        send_close(&mut tx, close_code::NORMAL, "").await;
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        fn block_on<F: std::future::Future>(fut: F) -> F::Output {
            tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .unwrap()
                .block_on(fut)
        }

        proptest! {
            #[test]
            fn ws_to_tcp_output_is_concatenation(
                messages in proptest::collection::vec(any::<String>(), 0..16)
            ) {
                let ws = stream::iter(messages.iter().map(|m| ok(Message::Text(m.as_str().into()))).collect::<Vec<_>>());
                let mut out = Vec::new();
                let report = block_on(pump_ws_to_tcp(ws, &mut out, &CancellationToken::new())).unwrap();

                let expected = messages.concat();
                prop_assert_eq!(out, expected.as_bytes().to_vec());
                prop_assert_eq!(report.messages, messages.len() as u64);
                prop_assert_eq!(report.bytes, expected.len() as u64);
            }

            #[test]
            fn tcp_to_ws_emits_complete_lines_only(text in "[a-zé \r\n]{0,64}") {
                let (tx, rx) = mpsc::unbounded();
                let report = block_on(pump_tcp_to_ws(text.as_bytes(), tx, &CancellationToken::new())).unwrap();
                let sent = texts(block_on(rx.collect::<Vec<Message>>()));

                let expected: Vec<String> = text
                    .split_inclusive('\n')
                    .filter(|line| line.ends_with('\n'))
                    .map(str::to_owned)
                    .collect();
                prop_assert_eq!(report.messages, expected.len() as u64);
                prop_assert_eq!(sent, expected);
            }
        }
    }
}
