//! Public handle for the broker connection.

use async_trait::async_trait;
use discuss_common::TransportError;
use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::connection::connection_loop;
use super::types::{
    ConnectionState, Credential, SubscriptionId, TransportCommand, TransportConfig,
    TransportEvent,
};
use super::Transport;

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// Handle for the STOMP connection.
///
/// All methods are non-blocking and send commands to the background
/// connection task. Dropping the handle stops the connection.
pub struct StompClient {
    command_tx: mpsc::Sender<TransportCommand>,
    state_rx: watch::Receiver<ConnectionState>,
    cancel: CancellationToken,
}

impl StompClient {
    /// Create a client and start the background connection.
    /// Returns `(client, event_receiver)`.
    ///
    /// Without a usable credential no connection is attempted: the client
    /// stays `Disconnected` and the event receiver is closed immediately.
    pub fn connect(
        config: TransportConfig,
        token: Option<&str>,
    ) -> (Self, mpsc::Receiver<TransportEvent>) {
        let (event_tx, event_rx) = mpsc::channel(256);
        let (command_tx, command_rx) = mpsc::channel(64);
        let (state_tx, state_rx) = watch::channel(ConnectionState::Disconnected);
        let cancel = CancellationToken::new();

        match Credential::from_token(token) {
            Some(credential) => {
                tokio::spawn(connection_loop(
                    config,
                    credential,
                    state_tx,
                    event_tx,
                    command_rx,
                    cancel.clone(),
                ));
            }
            None => {
                warn!(
                    error = %TransportError::MissingCredential,
                    "Not connecting to discuss broker"
                );
            }
        }

        let client = Self {
            command_tx,
            state_rx,
            cancel,
        };
        (client, event_rx)
    }

    /// Receiver that observes every state transition.
    pub fn watch_state(&self) -> watch::Receiver<ConnectionState> {
        self.state_rx.clone()
    }

    /// Stop the connection loop. Sends DISCONNECT if a socket is open.
    pub fn disconnect(&self) {
        debug!("Disconnect requested");
        self.cancel.cancel();
    }

    async fn command(&self, cmd: TransportCommand) {
        let _ = self.command_tx.send(cmd).await;
    }
}

impl Drop for StompClient {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

#[async_trait]
impl Transport for StompClient {
    fn state(&self) -> ConnectionState {
        *self.state_rx.borrow()
    }

    async fn subscribe(&self, destination: &str) -> SubscriptionId {
        let id = SubscriptionId::next();
        self.command(TransportCommand::Subscribe {
            id: id.clone(),
            destination: destination.to_string(),
        })
        .await;
        id
    }

    async fn unsubscribe(&self, id: &SubscriptionId) {
        self.command(TransportCommand::Unsubscribe { id: id.clone() })
            .await;
    }

    async fn publish(&self, destination: &str, body: String) {
        self.command(TransportCommand::Send {
            destination: destination.to_string(),
            body,
        })
        .await;
    }
}
