//! `retransmitter` -- exactly-once, order-preserving message delivery over
//! an unreliable, reconnecting bidirectional byte-stream transport.
//!
//! Two peers each wrap a local transport endpoint in a [`Retransmitter`].
//! Payloads handed to `send` on one side are delivered to the other side's
//! `on_message` callback exactly once and in order, even as the underlying
//! transport drops, reconnects, or is swapped for a fresh connection
//! mid-session.
//!
//! The engine is the only non-trivial piece here: framing, sequence and
//! acknowledgement bookkeeping, retransmit-on-reconnect, batched ACKs, and
//! the two-phase close handshake. Everything else -- the concrete
//! transport, application payload semantics, the host's event-dispatch
//! idiom -- is an external collaborator behind the [`transport::Transport`]
//! trait.

pub mod ack;
pub mod close;
pub mod config;
pub mod error;
pub mod event;
pub mod frame;
pub mod inbound;
pub mod outbound;
pub mod retransmitter;
pub mod transport;

pub mod handle;

pub use close::{CloseDescriptor, ReadyState};
pub use config::RetransmitterConfig;
pub use error::{RetransmitterError, Result};
pub use frame::Payload;
pub use handle::SharedRetransmitter;
pub use retransmitter::Retransmitter;
pub use transport::{Transport, TransportEvent, TransportReadyState};
