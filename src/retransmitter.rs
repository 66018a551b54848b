//! The public façade (spec §4.7, §6 "Application interface"). Composes the
//! framing codec, outbound buffer, inbound dedup, ACK scheduler, close FSM,
//! and transport slot behind the operations an application actually calls:
//! `send`, `close`, `use_transport`, and the listener setters, plus the two
//! methods a host dispatcher drives the engine with: `pump` (transport
//! events) and `poll_timers` (the unack/close deadlines).
//!
//! Every public entry point is a single, non-yielding step, per spec §5 --
//! none of them call back into the engine or block.

use std::time::Instant;

use tracing::{debug, warn};

use crate::ack::{AckDecision, AckScheduler};
use crate::close::{CloseState, ReadyState};
use crate::config::RetransmitterConfig;
use crate::error::{RetransmitterError, Result};
use crate::event::{AppEvent, Listeners};
use crate::frame::{Decoded, Frame, FrameDecoder, OutFrame, Payload, RawMessage};
use crate::inbound::InboundDedup;
use crate::outbound::OutboundBuffer;
use crate::transport::{Transport, TransportEvent, TransportReadyState, TransportSlot};

pub struct Retransmitter {
    config: RetransmitterConfig,
    slot: TransportSlot,
    outbound: OutboundBuffer,
    inbound: InboundDedup,
    ack: AckScheduler,
    close: CloseState,
    codec: FrameDecoder,
    listeners: Listeners,
    pending_error: Option<String>,
    reconnect_deadline: Option<Instant>,
}

impl Retransmitter {
    pub fn new(config: RetransmitterConfig) -> Self {
        let ack = AckScheduler::new(
            config.max_unack_bytes,
            config.max_unack_messages,
            config.max_unack_time,
        );
        let close = CloseState::new(config.close_timeout);
        Self {
            config,
            slot: TransportSlot::new(),
            outbound: OutboundBuffer::new(),
            inbound: InboundDedup::new(),
            ack,
            close,
            codec: FrameDecoder::new(),
            listeners: Listeners::new(),
            pending_error: None,
            reconnect_deadline: None,
        }
    }

    // -- read-only observables (spec §6) ------------------------------

    pub fn ready_state(&self) -> ReadyState {
        self.close.ready_state()
    }

    pub fn url(&self) -> &str {
        self.slot.url()
    }

    pub fn extensions(&self) -> &str {
        self.slot.extensions()
    }

    pub fn protocol(&self) -> &str {
        self.slot.protocol()
    }

    /// Sum of pending frame sizes plus the current transport's own buffer.
    pub fn buffered_amount(&self) -> usize {
        let pending: usize = self
            .outbound
            .replay()
            .map(|f| match f.to_wire() {
                RawMessage::Binary(b) => b.len(),
                RawMessage::Text(s) => s.len(),
            })
            .sum();
        pending + self.slot.buffered_amount()
    }

    // -- listener registry ---------------------------------------------

    pub fn on_open(&mut self, f: impl FnMut() + Send + 'static) {
        self.listeners.set_on_open(f);
    }

    pub fn on_message(&mut self, f: impl FnMut(&Payload) + Send + 'static) {
        self.listeners.set_on_message(f);
    }

    pub fn on_error(&mut self, f: impl FnMut(&str) + Send + 'static) {
        self.listeners.set_on_error(f);
    }

    pub fn on_close(&mut self, f: impl FnMut(&crate::close::CloseDescriptor) + Send + 'static) {
        self.listeners.set_on_close(f);
    }

    // -- application interface ------------------------------------------

    /// Enqueue an application payload (spec §4.2 `send`).
    pub fn send(&mut self, payload: Payload) -> Result<()> {
        if self.ready_state() == ReadyState::Closed {
            return Err(RetransmitterError::EngineClosed);
        }
        self.outbound.push(OutFrame::DataHeader);
        self.outbound.push(OutFrame::DataBody(payload.clone()));
        if self.slot.is_open() {
            self.slot.send(OutFrame::DataHeader.to_wire())?;
            self.slot.send(OutFrame::DataBody(payload).to_wire())?;
        }
        Ok(())
    }

    /// Initiate orderly shutdown (spec §4.5). A no-op, with a warning, if
    /// the engine is already `CLOSING`/`CLOSED`.
    pub fn close(&mut self, code: u16, reason: &str, now: Instant) {
        if !self.close.begin_local_close(code, reason.to_string(), now) {
            warn!(?code, reason, "close() called while already closing or closed");
            return;
        }
        debug!(?code, reason, "initiating local close");
        self.outbound.push(OutFrame::Close);
        if self.slot.is_open() {
            let _ = self.slot.send(OutFrame::Close.to_wire());
        }
    }

    /// Install or replace the transport (spec §4.6).
    pub fn use_transport(&mut self, transport: Box<dyn Transport>, now: Instant) -> Result<()> {
        if self.close.ready_state() == ReadyState::Closed {
            return Err(RetransmitterError::EngineClosed);
        }
        let already_open = transport.ready_state() == TransportReadyState::Open;
        if self.slot.is_attached() {
            self.slot.detach();
        }
        self.slot.install(transport)?;
        if already_open
            && matches!(
                self.close.ready_state(),
                ReadyState::Connecting | ReadyState::Open | ReadyState::Closing
            )
        {
            self.handle_transport_open(now);
        }
        Ok(())
    }

    // -- host-driven pump -------------------------------------------------

    /// Drain and process any transport events observed since the last call,
    /// then check the unack/close deadlines against `now`. The host calls
    /// this whenever the transport may have produced events, or at the
    /// deadline implied by `next_deadline()`.
    pub fn pump(&mut self, now: Instant) -> Result<()> {
        // Spec §3: "After CLOSED the object is inert." A close-timeout or a
        // terminal CLOSE/CLOSE_ACK may have already fired a close event on
        // a prior pump while the transport was still attached (e.g. a
        // delayed CLOSE_ACK drained only after the timeout forced CLOSED);
        // don't process anything further once closed.
        if self.ready_state() == ReadyState::Closed {
            return Ok(());
        }
        let events = self.slot.poll_events();
        for event in events {
            // A close-family frame earlier in this same batch (e.g. a
            // replayed CLOSE alongside a CLOSE_ACK) may have already
            // finalized the engine; stop draining rather than finalizing
            // twice.
            if self.ready_state() == ReadyState::Closed {
                break;
            }
            self.handle_transport_event(event, now)?;
        }
        self.poll_timers(now);
        Ok(())
    }

    /// Check the unack-timer and close-timer against `now` without
    /// touching the transport. Exposed separately so a host can schedule a
    /// wakeup purely from `next_deadline()` without polling the transport.
    pub fn poll_timers(&mut self, now: Instant) {
        if self.ready_state() == ReadyState::Closed {
            return;
        }
        if self.ack.poll(now) == AckDecision::SendAck {
            self.send_data_ack();
        }
        if self.close.poll_close_timer(now) {
            let desc = self.close.force_closed_on_timeout();
            self.finalize_close(desc);
        }
        self.maybe_reconnect(now);
    }

    /// The earliest instant a host should next call `poll_timers`, if any
    /// timer is armed.
    pub fn next_deadline(&self) -> Option<Instant> {
        [
            self.ack.deadline(),
            self.close.close_timer_deadline(),
            self.reconnect_deadline,
        ]
        .into_iter()
        .flatten()
        .min()
    }

    // -- internals --------------------------------------------------------

    fn handle_transport_event(&mut self, event: TransportEvent, now: Instant) -> Result<()> {
        match event {
            TransportEvent::Open => {
                self.handle_transport_open(now);
                Ok(())
            }
            TransportEvent::Message(raw) => {
                match self.codec.decode(raw)? {
                    Decoded::AwaitingBody => {
                        // The DATA header occupies its own slot in the
                        // peer's buffer numbering even though it isn't
                        // deliverable on its own (spec §9 Open Question 2).
                        self.inbound.advance_slot();
                    }
                    Decoded::Frame(frame) | Decoded::Data(frame) => {
                        self.handle_frame(frame, now)?;
                    }
                }
                Ok(())
            }
            TransportEvent::Error(msg) => {
                warn!(error = %msg, "transport error");
                self.pending_error = Some(msg);
                Ok(())
            }
            TransportEvent::Close { .. } => {
                self.slot.detach();
                if matches!(
                    self.close.ready_state(),
                    ReadyState::Connecting | ReadyState::Open
                ) {
                    self.close.arm_close_timer(now);
                }
                if self.close.ready_state() != ReadyState::Closed
                    && self.config.transport_factory.is_some()
                {
                    self.reconnect_deadline = Some(now + self.config.reconnect_interval);
                }
                Ok(())
            }
        }
    }

    fn handle_transport_open(&mut self, now: Instant) {
        let was_connecting = self.close.ready_state() == ReadyState::Connecting;
        self.close.on_transport_open();
        if was_connecting {
            self.listeners.dispatch(&AppEvent::Open);
        }

        debug!(lowest = self.outbound.lowest_serial(), "transport open, replaying pending frames");
        let _ = self
            .slot
            .send(OutFrame::InitialSerial(self.outbound.lowest_serial()).to_wire());
        let frames: Vec<OutFrame> = self.outbound.replay().cloned().collect();
        for frame in frames {
            let _ = self.slot.send(frame.to_wire());
        }
    }

    fn handle_frame(&mut self, frame: Frame, now: Instant) -> Result<()> {
        match frame {
            Frame::InitialSerial { lowest_unacked } => {
                self.inbound.realign(lowest_unacked);
                Ok(())
            }
            Frame::Data { body } => {
                let is_new = self.inbound.complete();
                if is_new && self.ready_state() == ReadyState::Open {
                    self.listeners.dispatch(&AppEvent::Message(body.clone()));
                }
                if self.ready_state() == ReadyState::Open {
                    if self.ack.record(body.logical_len(), now) == AckDecision::SendAck {
                        self.send_data_ack();
                    }
                }
                Ok(())
            }
            Frame::DataAck { cumulative } => self.outbound.ack(cumulative),
            Frame::Close => {
                // CLOSE occupies one slot in the peer's buffer numbering,
                // same as any other header-only frame pushed to an
                // outbound buffer (spec §9 Open Question 2's slot
                // counting applies uniformly, not just to DATA).
                self.inbound.complete();
                self.close.on_peer_close();
                if self.slot.is_open() {
                    let _ = self.slot.send(OutFrame::CloseAck.to_wire());
                }
                self.close.finish_closed();
                if let Some(desc) = self.close.pending_close().cloned() {
                    self.finalize_close(desc);
                }
                Ok(())
            }
            Frame::CloseAck => {
                if self.close.pending_close().is_none() {
                    return Err(RetransmitterError::UnsolicitedCloseAck);
                }
                self.close.on_close_ack();
                let desc = self.close.pending_close().cloned().unwrap();
                self.finalize_close(desc);
                Ok(())
            }
        }
    }

    fn send_data_ack(&mut self) {
        let cumulative = self.inbound.processed_serial();
        let _ = self.slot.send(OutFrame::DataAck(cumulative).to_wire());
    }

    /// Shared terminal step for every path that reaches `CLOSED` (spec §7:
    /// a deferred transport error is "delivered to the application only at
    /// final close", immediately before the close event itself).
    ///
    /// Detaches the transport so a later `pump()` never re-processes a
    /// frame (e.g. a delayed `CLOSE_ACK` drained after a close-timeout
    /// already finalized) through a still-attached slot -- combined with
    /// `pump`'s own `ReadyState::Closed` guard, this makes the object
    /// inert after `CLOSED` (spec §3).
    fn finalize_close(&mut self, desc: crate::close::CloseDescriptor) {
        if let Some(err) = self.pending_error.take() {
            self.listeners.dispatch(&AppEvent::Error(err));
        }
        self.slot.close(desc.code, &desc.reason);
        self.slot.detach();
        self.listeners.dispatch(&AppEvent::Close(desc));
    }

    /// If the installed transport reported `Close` and a `transport_factory`
    /// is configured, build and install a fresh transport once
    /// `reconnect_interval` has elapsed (spec §6 `transport_factory`).
    fn maybe_reconnect(&mut self, now: Instant) {
        if self.slot.is_attached() {
            self.reconnect_deadline = None;
            return;
        }
        let Some(deadline) = self.reconnect_deadline else {
            return;
        };
        if now < deadline {
            return;
        }
        self.reconnect_deadline = None;
        if !matches!(
            self.close.ready_state(),
            ReadyState::Connecting | ReadyState::Open | ReadyState::Closing
        ) {
            return;
        }
        let Some(mut factory) = self.config.transport_factory.take() else {
            return;
        };
        let transport = factory();
        self.config.transport_factory = Some(factory);

        match self.slot.install(transport) {
            Ok(()) => {
                if self.slot.is_open() {
                    self.handle_transport_open(now);
                }
            }
            Err(err) => {
                warn!(error = %err, "transport_factory produced an unusable transport");
            }
        }
    }
}
