//! Heart-beat negotiation (STOMP 1.2 §"Heart-beating").

use std::time::Duration;

/// A `heart-beat` header value: `outgoing,incoming` in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct HeartBeat {
    pub outgoing_ms: u64,
    pub incoming_ms: u64,
}

impl HeartBeat {
    pub fn new(outgoing_ms: u64, incoming_ms: u64) -> Self {
        Self {
            outgoing_ms,
            incoming_ms,
        }
    }

    pub fn header_value(&self) -> String {
        format!("{},{}", self.outgoing_ms, self.incoming_ms)
    }

    pub fn parse(raw: &str) -> Option<Self> {
        let (out, inc) = raw.split_once(',')?;
        Some(Self {
            outgoing_ms: out.trim().parse().ok()?,
            incoming_ms: inc.trim().parse().ok()?,
        })
    }
}

/// Effective intervals after the CONNECTED handshake.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Negotiated {
    /// How often we must send something.
    pub send_every: Option<Duration>,
    /// How often the server promised to send something.
    pub expect_every: Option<Duration>,
}

impl Negotiated {
    /// Silence longer than this means the connection is dead.
    pub fn read_deadline(&self) -> Option<Duration> {
        self.expect_every.map(|d| d * 2)
    }
}

/// Combine our CONNECT header with the server's CONNECTED header. A missing
/// server header means the server does no heart-beating at all.
pub fn negotiate(client: HeartBeat, server: Option<HeartBeat>) -> Negotiated {
    let server = server.unwrap_or_default();
    let pick = |ours: u64, theirs: u64| {
        (ours != 0 && theirs != 0).then(|| Duration::from_millis(ours.max(theirs)))
    };
    Negotiated {
        send_every: pick(client.outgoing_ms, server.incoming_ms),
        expect_every: pick(client.incoming_ms, server.outgoing_ms),
    }
}
