//! Incoming WebSocket message handler.

use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::{Error as WsError, Message as WsMessage};
use tracing::{debug, info, warn};

use super::types::{SubscriptionId, TransportEvent};
use crate::stomp::{Command, Frame};

/// Whether the read loop should keep going after a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Flow {
    Continue,
    Stop,
}

/// Text payload of a data message; `None` for control messages.
pub(crate) fn message_text(msg: &WsMessage) -> Option<String> {
    match msg {
        WsMessage::Text(text) => Some(text.as_str().to_string()),
        WsMessage::Binary(bytes) => Some(String::from_utf8_lossy(bytes).into_owned()),
        _ => None,
    }
}

/// Handle one message read from an established connection.
pub(crate) async fn handle_ws_message(
    msg: Result<WsMessage, WsError>,
    event_tx: &mpsc::Sender<TransportEvent>,
) -> Flow {
    let msg = match msg {
        Ok(msg) => msg,
        Err(e) => {
            warn!(error = %e, "WebSocket error");
            let _ = event_tx.send(TransportEvent::Error(e.to_string())).await;
            return Flow::Stop;
        }
    };
    if let WsMessage::Close(frame) = &msg {
        info!(reason = ?frame, "Broker closed connection");
        return Flow::Stop;
    }
    let Some(text) = message_text(&msg) else {
        return Flow::Continue;
    };
    match Frame::decode(&text) {
        Ok(Some(frame)) => handle_frame(frame, event_tx).await,
        Ok(None) => Flow::Continue,
        Err(e) => {
            warn!(error = %e, "Dropping malformed STOMP frame");
            Flow::Continue
        }
    }
}

async fn handle_frame(frame: Frame, event_tx: &mpsc::Sender<TransportEvent>) -> Flow {
    match frame.command {
        Command::Message => {
            let destination = frame.header("destination").unwrap_or_default().to_string();
            let subscription = frame.header("subscription").map(SubscriptionId::from);
            debug!(destination = %destination, bytes = frame.body.len(), "MESSAGE received");
            let _ = event_tx
                .send(TransportEvent::Message {
                    subscription,
                    destination,
                    body: frame.body,
                })
                .await;
            Flow::Continue
        }
        Command::Error => {
            let message = frame
                .header("message")
                .unwrap_or("broker error")
                .to_string();
            warn!(message = %message, "Broker sent ERROR frame");
            let _ = event_tx
                .send(TransportEvent::ProtocolError {
                    message,
                    body: frame.body,
                })
                .await;
            // The broker closes the socket after ERROR.
            Flow::Stop
        }
        Command::Receipt => {
            debug!(receipt = ?frame.header("receipt-id"), "RECEIPT received");
            Flow::Continue
        }
        other => {
            debug!(command = %other, "Unhandled STOMP frame");
            Flow::Continue
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn run(msg: WsMessage) -> (Flow, Vec<TransportEvent>) {
        let (tx, mut rx) = mpsc::channel(8);
        let flow = handle_ws_message(Ok(msg), &tx).await;
        drop(tx);
        let mut events = Vec::new();
        while let Some(e) = rx.recv().await {
            events.push(e);
        }
        (flow, events)
    }

    #[tokio::test]
    async fn message_frame_becomes_event() {
        let raw = "MESSAGE\ndestination:/topic/channels/42\nsubscription:sub-3\n\n{\"type\":\"X\"}\0";
        let (flow, events) = run(WsMessage::Text(raw.into())).await;
        assert_eq!(flow, Flow::Continue);
        assert_eq!(
            events,
            vec![TransportEvent::Message {
                subscription: Some(SubscriptionId::from("sub-3")),
                destination: "/topic/channels/42".into(),
                body: "{\"type\":\"X\"}".into(),
            }]
        );
    }

    #[tokio::test]
    async fn binary_frames_are_read_as_text() {
        let raw = b"MESSAGE\ndestination:/user/queue/errors\n\n{}\0".to_vec();
        let (_, events) = run(WsMessage::Binary(raw.into())).await;
        assert!(matches!(
            &events[..],
            [TransportEvent::Message { destination, .. }] if destination == "/user/queue/errors"
        ));
    }

    #[tokio::test]
    async fn error_frame_stops_the_loop() {
        let raw = "ERROR\nmessage:Access denied\n\ndetails\0";
        let (flow, events) = run(WsMessage::Text(raw.into())).await;
        assert_eq!(flow, Flow::Stop);
        assert_eq!(
            events,
            vec![TransportEvent::ProtocolError {
                message: "Access denied".into(),
                body: "details".into(),
            }]
        );
    }

    #[tokio::test]
    async fn heartbeats_and_garbage_are_skipped() {
        let (flow, events) = run(WsMessage::Text("\n".into())).await;
        assert_eq!(flow, Flow::Continue);
        assert!(events.is_empty());

        let (flow, events) = run(WsMessage::Text("NONSENSE\n\n\0".into())).await;
        assert_eq!(flow, Flow::Continue);
        assert!(events.is_empty());
    }

    #[tokio::test]
    async fn close_stops_without_event() {
        let (flow, events) = run(WsMessage::Close(None)).await;
        assert_eq!(flow, Flow::Stop);
        assert!(events.is_empty());
    }
}
