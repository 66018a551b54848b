//! Tunable knobs for batched ACKs, close timeout, and reconnection
//! (spec §6 "Configuration"). No CLI, no environment variables, no
//! persisted state -- the engine's entire configuration surface is this
//! struct.

use std::time::Duration;

use crate::transport::Transport;

/// A factory the engine can call to construct a fresh transport itself
/// after the installed one reports a close event (spec §6
/// `transport_factory`, optional).
pub type TransportFactory = Box<dyn FnMut() -> Box<dyn Transport> + Send>;

pub struct RetransmitterConfig {
    /// ACK when cumulative inbound bytes since the last ACK exceed this.
    pub max_unack_bytes: usize,
    /// ACK when inbound message count since the last ACK exceeds this.
    pub max_unack_messages: usize,
    /// ACK at latest this long after the first unacked inbound message.
    pub max_unack_time: Duration,
    /// Bound for the reconnect-or-close-ack wait.
    pub close_timeout: Duration,
    /// Delay between reconnect attempts when `transport_factory` is set.
    pub reconnect_interval: Duration,
    /// Optional: if set, the engine constructs and installs a new
    /// transport itself on close events rather than waiting for the host
    /// to call `use_transport` again.
    pub transport_factory: Option<TransportFactory>,
}

impl std::fmt::Debug for RetransmitterConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RetransmitterConfig")
            .field("max_unack_bytes", &self.max_unack_bytes)
            .field("max_unack_messages", &self.max_unack_messages)
            .field("max_unack_time", &self.max_unack_time)
            .field("close_timeout", &self.close_timeout)
            .field("reconnect_interval", &self.reconnect_interval)
            .field("transport_factory", &self.transport_factory.is_some())
            .finish()
    }
}

impl Default for RetransmitterConfig {
    fn default() -> Self {
        Self {
            max_unack_bytes: 100_000,
            max_unack_messages: 100,
            max_unack_time: Duration::from_millis(10_000),
            close_timeout: Duration::from_millis(60_000),
            reconnect_interval: Duration::from_millis(250),
            transport_factory: None,
        }
    }
}
