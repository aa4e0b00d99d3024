//! The single consumer of transport events.

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, info};

use super::sync_core::{EventOutcome, SyncCore};
use crate::transport::{Transport, TransportEvent};

/// Apply transport events strictly in delivery order until the transport
/// closes its event channel.
pub(crate) async fn run<T: Transport>(
    core: Arc<SyncCore<T>>,
    mut events: mpsc::Receiver<TransportEvent>,
) {
    while let Some(event) = events.recv().await {
        match core.handle_transport_event(event).await {
            EventOutcome::ConnectionChanged { connected } => {
                info!(connected, "Connection state changed");
            }
            outcome => debug!(?outcome, "Transport event handled"),
        }
    }
    debug!("Transport event stream ended");
}
