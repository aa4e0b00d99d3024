//! Background STOMP-over-WebSocket connection loop with fixed-delay reconnect.

use std::sync::Arc;
use std::time::Duration;

use discuss_common::TransportError;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, watch, Mutex};
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::handler::{handle_ws_message, message_text, Flow};
use super::types::{ConnectionState, Credential, TransportCommand, TransportConfig, TransportEvent};
use crate::stomp::{negotiate, Command, Frame, HeartBeat, Negotiated, HEARTBEAT_EOL};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
type WsWriter = SplitSink<WsStream, WsMessage>;
type WsReader = SplitStream<WsStream>;

const ACCEPT_VERSION: &str = "1.2,1.1,1.0";

/// Why a live connection ended.
enum Exit {
    Cancelled,
    Lost,
}

// ---------------------------------------------------------------------------
// Connection Loop
// ---------------------------------------------------------------------------

/// Background task managing the broker connection with auto-reconnect.
/// Runs until `cancel` fires.
pub(crate) async fn connection_loop(
    config: TransportConfig,
    credential: Credential,
    state_tx: watch::Sender<ConnectionState>,
    event_tx: mpsc::Sender<TransportEvent>,
    command_rx: mpsc::Receiver<TransportCommand>,
    cancel: CancellationToken,
) {
    let command_rx = Arc::new(Mutex::new(command_rx));

    while !cancel.is_cancelled() {
        info!(endpoint = %config.endpoint, "Connecting to discuss broker");
        state_tx.send_replace(ConnectionState::Connecting);

        let attempt = tokio::select! {
            _ = cancel.cancelled() => break,
            attempt = tokio::time::timeout(
                config.connect_timeout,
                open(&config, &credential, &event_tx),
            ) => attempt,
        };

        match attempt {
            Ok(Ok((ws_write, ws_read, negotiated))) => {
                // Anything queued while offline targets a dead session.
                {
                    let mut rx = command_rx.lock().await;
                    let mut dropped = 0usize;
                    while rx.try_recv().is_ok() {
                        dropped += 1;
                    }
                    if dropped > 0 {
                        debug!(dropped, "Discarded commands queued while offline");
                    }
                }

                let ws_write = Arc::new(Mutex::new(ws_write));

                let heartbeat_handle = negotiated.send_every.map(|every| {
                    tokio::spawn(heartbeat_task(Arc::clone(&ws_write), every))
                });
                let cmd_handle = tokio::spawn(command_forwarder(
                    Arc::clone(&command_rx),
                    Arc::clone(&ws_write),
                ));

                info!(
                    send_every = ?negotiated.send_every,
                    expect_every = ?negotiated.expect_every,
                    "Connected to discuss broker"
                );
                state_tx.send_replace(ConnectionState::Connected);
                let _ = event_tx.send(TransportEvent::Connected).await;

                let exit = read_loop(ws_read, &negotiated, &event_tx, &cancel).await;

                // Cleanup.
                if let Some(handle) = heartbeat_handle {
                    handle.abort();
                }
                cmd_handle.abort();
                if matches!(exit, Exit::Cancelled) {
                    let mut writer = ws_write.lock().await;
                    let _ = writer
                        .send(WsMessage::Text(Frame::new(Command::Disconnect).encode().into()))
                        .await;
                    let _ = writer.send(WsMessage::Close(None)).await;
                }
                state_tx.send_replace(ConnectionState::Disconnected);
                let _ = event_tx.send(TransportEvent::Disconnected).await;
                if matches!(exit, Exit::Cancelled) {
                    info!("Disconnected from discuss broker");
                    return;
                }
            }
            Ok(Err(e)) => {
                error!(error = %e, "Failed to connect to discuss broker");
                state_tx.send_replace(ConnectionState::Errored);
                let _ = event_tx.send(TransportEvent::Error(e.to_string())).await;
            }
            Err(_elapsed) => {
                let err = TransportError::Timeout(config.connect_timeout.as_secs());
                error!(error = %err, "Discuss broker connection timed out");
                state_tx.send_replace(ConnectionState::Errored);
                let _ = event_tx.send(TransportEvent::Error(err.to_string())).await;
            }
        }

        info!(
            delay_ms = config.reconnect_delay.as_millis() as u64,
            "Reconnecting after delay"
        );
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = tokio::time::sleep(config.reconnect_delay) => {}
        }
    }

    state_tx.send_replace(ConnectionState::Disconnected);
}

// ---------------------------------------------------------------------------
// Handshake
// ---------------------------------------------------------------------------

/// Open the socket and complete the STOMP CONNECT/CONNECTED exchange.
async fn open(
    config: &TransportConfig,
    credential: &Credential,
    event_tx: &mpsc::Sender<TransportEvent>,
) -> Result<(WsWriter, WsReader, Negotiated), TransportError> {
    let (ws_stream, _) = tokio_tungstenite::connect_async(config.endpoint.as_str())
        .await
        .map_err(|e| TransportError::Connect(e.to_string()))?;
    let (mut ws_write, mut ws_read) = ws_stream.split();

    let connect = connect_frame(config, credential);
    ws_write
        .send(WsMessage::Text(connect.encode().into()))
        .await
        .map_err(|e| TransportError::Connect(e.to_string()))?;

    while let Some(msg) = ws_read.next().await {
        let msg = msg.map_err(|e| TransportError::Connect(e.to_string()))?;
        if matches!(msg, WsMessage::Close(_)) {
            return Err(TransportError::Closed);
        }
        let Some(text) = message_text(&msg) else {
            continue;
        };
        let Some(frame) = Frame::decode(&text)? else {
            continue;
        };
        match frame.command {
            Command::Connected => {
                let server = frame.header("heart-beat").and_then(HeartBeat::parse);
                debug!(version = ?frame.header("version"), "CONNECTED received");
                return Ok((ws_write, ws_read, negotiate(config.heartbeat, server)));
            }
            Command::Error => {
                let message = frame
                    .header("message")
                    .unwrap_or("connection rejected")
                    .to_string();
                let _ = event_tx
                    .send(TransportEvent::ProtocolError {
                        message: message.clone(),
                        body: frame.body,
                    })
                    .await;
                return Err(TransportError::Rejected(message));
            }
            other => debug!(command = %other, "Ignoring frame before CONNECTED"),
        }
    }
    Err(TransportError::Closed)
}

pub(crate) fn connect_frame(config: &TransportConfig, credential: &Credential) -> Frame {
    Frame::new(Command::Connect)
        .with_header("accept-version", ACCEPT_VERSION)
        .with_header("host", config.host())
        .with_header("heart-beat", config.heartbeat.header_value())
        .with_header("Authorization", credential.bearer())
}

// ---------------------------------------------------------------------------
// Reader
// ---------------------------------------------------------------------------

async fn read_loop(
    mut ws_read: WsReader,
    negotiated: &Negotiated,
    event_tx: &mpsc::Sender<TransportEvent>,
    cancel: &CancellationToken,
) -> Exit {
    let deadline = negotiated.read_deadline();
    loop {
        let next = tokio::select! {
            _ = cancel.cancelled() => return Exit::Cancelled,
            next = next_with_deadline(&mut ws_read, deadline) => next,
        };
        match next {
            Ok(Some(msg)) => {
                if handle_ws_message(msg, event_tx).await == Flow::Stop {
                    return Exit::Lost;
                }
            }
            Ok(None) => {
                info!("Broker stream ended");
                return Exit::Lost;
            }
            Err(_elapsed) => {
                warn!(deadline = ?deadline, "No data from broker within heart-beat deadline");
                let _ = event_tx
                    .send(TransportEvent::Error("heart-beat deadline missed".into()))
                    .await;
                return Exit::Lost;
            }
        }
    }
}

async fn next_with_deadline(
    ws_read: &mut WsReader,
    deadline: Option<Duration>,
) -> Result<Option<Result<WsMessage, tokio_tungstenite::tungstenite::Error>>, tokio::time::error::Elapsed>
{
    match deadline {
        Some(deadline) => tokio::time::timeout(deadline, ws_read.next()).await,
        None => Ok(ws_read.next().await),
    }
}

// ---------------------------------------------------------------------------
// Heartbeat
// ---------------------------------------------------------------------------

async fn heartbeat_task<S>(ws_write: Arc<Mutex<S>>, every: Duration)
where
    S: futures_util::Sink<WsMessage> + Unpin,
{
    let start = tokio::time::Instant::now() + every;
    let mut interval = tokio::time::interval_at(start, every);
    loop {
        interval.tick().await;
        let mut writer = ws_write.lock().await;
        if writer.send(WsMessage::Text(HEARTBEAT_EOL.into())).await.is_err() {
            break;
        }
    }
}

// ---------------------------------------------------------------------------
// Command Forwarder
// ---------------------------------------------------------------------------

pub(crate) fn command_frame(cmd: TransportCommand) -> Frame {
    match cmd {
        TransportCommand::Subscribe { id, destination } => Frame::new(Command::Subscribe)
            .with_header("id", id.as_str())
            .with_header("destination", destination)
            .with_header("ack", "auto"),
        TransportCommand::Unsubscribe { id } => {
            Frame::new(Command::Unsubscribe).with_header("id", id.as_str())
        }
        TransportCommand::Send { destination, body } => Frame::new(Command::Send)
            .with_header("destination", destination)
            .with_header("content-type", "application/json")
            .with_body(body),
    }
}

async fn command_forwarder<S>(
    cmd_rx: Arc<Mutex<mpsc::Receiver<TransportCommand>>>,
    cmd_write: Arc<Mutex<S>>,
) where
    S: futures_util::Sink<WsMessage> + Unpin,
{
    let mut rx = cmd_rx.lock().await;
    while let Some(cmd) = rx.recv().await {
        let frame = command_frame(cmd);
        debug!(command = %frame.command, destination = ?frame.header("destination"), "Sending frame");
        let mut writer = cmd_write.lock().await;
        if writer.send(WsMessage::Text(frame.encode().into())).await.is_err() {
            warn!("Failed to write frame, stopping command forwarder");
            break;
        }
    }
}
