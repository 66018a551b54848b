//! Ready-state and close handshake (spec §4.5, §3 invariant 6).
//!
//! Modeled on a connection lifecycle state machine: a `Display` enum of
//! states plus a struct that rejects invalid transitions with a structured
//! error, generalized from that 5-state lifecycle to this protocol's
//! `CONNECTING -> OPEN -> CLOSING -> CLOSED` path (monotone, no reverse
//! transitions).

use std::fmt;
use std::time::{Duration, Instant};

/// The engine's externally observable readiness (spec §3).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadyState {
    Connecting,
    Open,
    Closing,
    Closed,
}

impl fmt::Display for ReadyState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReadyState::Connecting => write!(f, "CONNECTING"),
            ReadyState::Open => write!(f, "OPEN"),
            ReadyState::Closing => write!(f, "CLOSING"),
            ReadyState::Closed => write!(f, "CLOSED"),
        }
    }
}

/// The close descriptor carried to the application's `close` callback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CloseDescriptor {
    pub code: u16,
    pub reason: String,
    pub clean: bool,
}

impl Default for CloseDescriptor {
    fn default() -> Self {
        Self {
            code: 1000,
            reason: String::new(),
            clean: true,
        }
    }
}

/// Tri-state distinguishing "no close in flight" from "closing, awaiting
/// the peer's CLOSE_ACK" from "peer has acknowledged" (spec §3
/// `close_acknowledged`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseAckState {
    Unset,
    Pending,
    Acknowledged,
}

/// Owns `ready_state`, the pending close descriptor, and the close-timer
/// deadline.
#[derive(Debug)]
pub struct CloseState {
    ready_state: ReadyState,
    pending_close: Option<CloseDescriptor>,
    close_acknowledged: CloseAckState,
    close_timeout: Duration,
    deadline: Option<Instant>,
}

impl CloseState {
    pub fn new(close_timeout: Duration) -> Self {
        Self {
            ready_state: ReadyState::Connecting,
            pending_close: None,
            close_acknowledged: CloseAckState::Unset,
            close_timeout,
            deadline: None,
        }
    }

    pub fn ready_state(&self) -> ReadyState {
        self.ready_state
    }

    pub fn pending_close(&self) -> Option<&CloseDescriptor> {
        self.pending_close.as_ref()
    }

    pub fn is_close_timer_armed(&self) -> bool {
        self.deadline.is_some()
    }

    pub fn close_timer_deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn close_acknowledged(&self) -> CloseAckState {
        self.close_acknowledged
    }

    /// `CONNECTING -> OPEN`, once per lifetime of the underlying session
    /// unless a close is already underway -- a reconnect while `OPEN` stays
    /// `OPEN` (spec §2 lifecycle, §4.5 table row "transport failure without
    /// local close").
    pub fn on_transport_open(&mut self) {
        if self.ready_state == ReadyState::Connecting {
            self.ready_state = ReadyState::Open;
        }
        if self.ready_state != ReadyState::Closing {
            self.cancel_close_timer();
        }
    }

    /// Local `close(code, reason)`. A no-op (with a caller-visible `false`)
    /// if already `CLOSING`/`CLOSED` (spec §4.5: "a local close() while
    /// already CLOSING or CLOSED is a no-op, with a warning").
    pub fn begin_local_close(&mut self, code: u16, reason: String, now: Instant) -> bool {
        if self.ready_state == ReadyState::Closing || self.ready_state == ReadyState::Closed {
            return false;
        }
        self.ready_state = ReadyState::Closing;
        // `clean` is not yet known -- it's only true once the peer actually
        // acknowledges (`on_close_ack`); a close-timeout delivers this
        // descriptor with `clean` still false.
        self.pending_close = Some(CloseDescriptor {
            code,
            reason,
            clean: false,
        });
        self.close_acknowledged = CloseAckState::Pending;
        self.arm_close_timer(now);
        true
    }

    /// Peer sent `CLOSE`: synthesize a close descriptor, move to `CLOSING`.
    /// The caller (the façade) sends `CLOSE_ACK` and then calls
    /// `finish_closed` once that's done -- there's nothing further to wait
    /// for, so the engine doesn't linger in `CLOSING`.
    pub fn on_peer_close(&mut self) {
        if self.ready_state == ReadyState::Closed {
            return;
        }
        self.ready_state = ReadyState::Closing;
        self.pending_close = Some(CloseDescriptor {
            code: 1000,
            reason: String::new(),
            clean: true,
        });
        self.cancel_close_timer();
    }

    /// Peer sent `CLOSE_ACK` in response to our locally-initiated close.
    /// This is the only path that marks the pending close descriptor clean
    /// (spec §3 `close_acknowledged`: "distinguish orderly shutdown from
    /// transport failure on close").
    pub fn on_close_ack(&mut self) {
        self.close_acknowledged = CloseAckState::Acknowledged;
        if let Some(desc) = &mut self.pending_close {
            desc.clean = true;
        }
        self.finish_closed();
    }

    /// Shared terminal step for both close paths: cancel the close-timer
    /// and move to `CLOSED`.
    pub fn finish_closed(&mut self) {
        self.cancel_close_timer();
        self.ready_state = ReadyState::Closed;
    }

    /// Force a transition to `CLOSED` because the close-timer fired,
    /// whatever state we were waiting in (spec §4.5 table rows "close-timer
    /// fires"). The close-timer firing means the peer never sent
    /// `CLOSE_ACK`, so the delivered descriptor is never clean here --
    /// `pending_close.clean` was left `false` by `begin_local_close` and
    /// only `on_close_ack` would have flipped it.
    pub fn force_closed_on_timeout(&mut self) -> CloseDescriptor {
        self.deadline = None;
        self.ready_state = ReadyState::Closed;
        self.pending_close.clone().unwrap_or_else(|| CloseDescriptor {
            code: 1000,
            reason: "close timeout".to_string(),
            clean: false,
        })
    }

    /// Arm the close-timer if one isn't already running (spec §3 invariant
    /// 5: at most one close_timer at any time).
    pub fn arm_close_timer(&mut self, now: Instant) {
        if self.deadline.is_none() {
            self.deadline = Some(now + self.close_timeout);
        }
    }

    pub fn cancel_close_timer(&mut self) {
        self.deadline = None;
    }

    pub fn poll_close_timer(&self, now: Instant) -> bool {
        matches!(self.deadline, Some(d) if now >= d)
    }
}
