//! The abstract transport capability (spec §6) and the single-slot holder
//! for the one live connection at a time (spec §4.6, "Transport slot").
//!
//! Generalizes a per-mode sender/receiver trait pair into one capability
//! trait, since the engine only ever needs a single concrete transport
//! implementation installed at a time rather than per-stream-mode
//! specializations.

use crate::error::{RetransmitterError, Result};
use crate::frame::RawMessage;

/// The transport's own connection-state observable (spec §6). Distinct
/// from the engine's `ReadyState` in `close.rs`: a transport can cycle
/// through these states many times while the engine stays `OPEN`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportReadyState {
    Connecting,
    Open,
    Closing,
    Closed,
}

/// Events a transport reports to its owner. `Message` carries one already
/// framed transport message (binary or textual), `Close` carries the
/// close code/reason/clean-flag the underlying connection reported.
#[derive(Debug, Clone)]
pub enum TransportEvent {
    Open,
    Message(RawMessage),
    Error(String),
    Close { code: u16, reason: String, clean: bool },
}

/// The capability an external transport must provide (spec §6).
///
/// Implementations are expected to be event-driven on their own terms; the
/// engine interacts with them only through this trait and a queue of
/// `TransportEvent`s the implementation pushes as they occur (see
/// `demos/tokio_ws_transport.rs` for a worked example over a `tokio`
/// channel pair).
pub trait Transport: Send {
    fn ready_state(&self) -> TransportReadyState;
    fn buffered_amount(&self) -> usize;
    fn url(&self) -> &str;
    fn extensions(&self) -> &str;
    fn protocol(&self) -> &str;

    /// Send one already-framed message. Implementations should preserve the
    /// binary/text distinction of `RawMessage` rather than coercing to
    /// bytes.
    fn send(&mut self, msg: RawMessage) -> Result<()>;

    /// Request the underlying connection close with the given code/reason.
    fn close(&mut self, code: u16, reason: &str);

    /// Set the transport's preferred delivery mode for outbound frames the
    /// engine didn't explicitly tag (spec §4.6 step 2, §6 "Mode setter").
    /// The engine calls this once, right after installing the transport.
    fn set_binary_mode(&mut self, binary: bool);

    /// Drain transport events that have occurred since the last poll. The
    /// façade calls this once per `step` (spec §9: "a single step(event)
    /// entry point internally").
    fn poll_events(&mut self) -> Vec<TransportEvent>;
}

/// Holds at most one live transport (spec §4.6). Detaching/attaching is
/// always explicit -- there is no weak-reference magic, matching spec §9's
/// "cyclic references are absent."
#[derive(Default)]
pub struct TransportSlot {
    transport: Option<Box<dyn Transport>>,
}

impl TransportSlot {
    pub fn new() -> Self {
        Self { transport: None }
    }

    pub fn is_attached(&self) -> bool {
        self.transport.is_some()
    }

    pub fn ready_state(&self) -> Option<TransportReadyState> {
        self.transport.as_ref().map(|t| t.ready_state())
    }

    /// Install a new transport (spec §4.6 `use_transport`). Rejects a
    /// transport that is already `CLOSED`/`CLOSING` -- that is a programmer
    /// error, not a recoverable condition.
    pub fn install(&mut self, mut transport: Box<dyn Transport>) -> Result<()> {
        match transport.ready_state() {
            TransportReadyState::Closed | TransportReadyState::Closing => {
                Err(RetransmitterError::TransportNotUsable)
            }
            _ => {
                transport.set_binary_mode(true);
                self.transport = Some(transport);
                Ok(())
            }
        }
    }

    pub fn detach(&mut self) -> Option<Box<dyn Transport>> {
        self.transport.take()
    }

    pub fn is_open(&self) -> bool {
        matches!(self.ready_state(), Some(TransportReadyState::Open))
    }

    pub fn send(&mut self, msg: RawMessage) -> Result<()> {
        match &mut self.transport {
            Some(t) if t.ready_state() == TransportReadyState::Open => t.send(msg),
            _ => Ok(()), // enqueued-for-later semantics live in the outbound buffer
        }
    }

    pub fn close(&mut self, code: u16, reason: &str) {
        if let Some(t) = &mut self.transport {
            t.close(code, reason);
        }
    }

    pub fn buffered_amount(&self) -> usize {
        self.transport.as_ref().map(|t| t.buffered_amount()).unwrap_or(0)
    }

    pub fn url(&self) -> &str {
        self.transport.as_ref().map(|t| t.url()).unwrap_or("")
    }

    pub fn extensions(&self) -> &str {
        self.transport.as_ref().map(|t| t.extensions()).unwrap_or("")
    }

    pub fn protocol(&self) -> &str {
        self.transport.as_ref().map(|t| t.protocol()).unwrap_or("")
    }

    pub fn poll_events(&mut self) -> Vec<TransportEvent> {
        match &mut self.transport {
            Some(t) => t.poll_events(),
            None => Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;

    struct FakeTransport {
        state: TransportReadyState,
        sent: Vec<RawMessage>,
        events: VecDeque<TransportEvent>,
    }

    impl Transport for FakeTransport {
        fn ready_state(&self) -> TransportReadyState {
            self.state
        }
        fn buffered_amount(&self) -> usize {
            0
        }
        fn url(&self) -> &str {
            "fake://"
        }
        fn extensions(&self) -> &str {
            ""
        }
        fn protocol(&self) -> &str {
            ""
        }
        fn send(&mut self, msg: RawMessage) -> Result<()> {
            self.sent.push(msg);
            Ok(())
        }
        fn close(&mut self, _code: u16, _reason: &str) {
            self.state = TransportReadyState::Closed;
        }
        fn set_binary_mode(&mut self, _binary: bool) {}
        fn poll_events(&mut self) -> Vec<TransportEvent> {
            self.events.drain(..).collect()
        }
    }

    #[test]
    fn installing_a_closed_transport_fails() {
        let mut slot = TransportSlot::new();
        let t = FakeTransport {
            state: TransportReadyState::Closed,
            sent: vec![],
            events: VecDeque::new(),
        };
        let err = slot.install(Box::new(t)).unwrap_err();
        assert!(matches!(err, RetransmitterError::TransportNotUsable));
    }

    #[test]
    fn send_while_not_open_is_silently_dropped() {
        let mut slot = TransportSlot::new();
        let t = FakeTransport {
            state: TransportReadyState::Connecting,
            sent: vec![],
            events: VecDeque::new(),
        };
        slot.install(Box::new(t)).unwrap();
        assert!(!slot.is_open());
        slot.send(RawMessage::Binary(bytes::Bytes::from_static(b"x")))
            .unwrap();
    }
}
