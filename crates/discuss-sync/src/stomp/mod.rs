//! Minimal STOMP 1.2 codec used by the transport.

mod frame;
mod heartbeat;

#[cfg(test)]
mod tests;

pub use frame::{Command, Frame};
pub use heartbeat::{negotiate, HeartBeat, Negotiated};

/// The bare end-of-line sent as a client heart-beat.
pub const HEARTBEAT_EOL: &str = "\n";
