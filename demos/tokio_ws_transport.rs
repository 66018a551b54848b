//! Demo: a `Transport` implementation over a `tokio`-driven in-memory
//! channel pair, standing in for a real WebSocket (spec §1 explicitly
//! keeps "the concrete transport implementation" out of scope). Shows how
//! a host dispatcher drains transport events with `Retransmitter::pump`
//! and schedules its next wakeup from `Retransmitter::next_deadline`.
//!
//! This is glue, not core engine logic -- see `src/` for the protocol
//! itself. Run with `cargo run --example tokio_ws_transport`.

use std::time::{Duration, Instant};

use retransmitter::frame::RawMessage;
use retransmitter::{Payload, Retransmitter, RetransmitterConfig, Transport, TransportEvent, TransportReadyState};
use tokio::sync::mpsc;

/// One end of an in-memory channel pair. `inbound` carries events this
/// transport reports to its engine; `outbound` carries messages the engine
/// asked this transport to send, destined for the peer's `inbound`.
struct ChannelTransport {
    state: TransportReadyState,
    inbound: mpsc::UnboundedReceiver<TransportEvent>,
    outbound: mpsc::UnboundedSender<RawMessage>,
}

impl ChannelTransport {
    fn pair() -> (ChannelTransport, ChannelTransport) {
        let (a_tx, a_rx) = mpsc::unbounded_channel::<RawMessage>();
        let (b_tx, b_rx) = mpsc::unbounded_channel::<RawMessage>();
        let (a_events_tx, a_events_rx) = mpsc::unbounded_channel::<TransportEvent>();
        let (b_events_tx, b_events_rx) = mpsc::unbounded_channel::<TransportEvent>();

        // Forward every message sent on one side to the other side's event
        // queue, simulating the network hop a real socket would perform.
        tokio::spawn(async move {
            let mut rx = a_rx;
            while let Some(msg) = rx.recv().await {
                if b_events_tx.send(TransportEvent::Message(msg)).is_err() {
                    break;
                }
            }
        });
        tokio::spawn(async move {
            let mut rx = b_rx;
            while let Some(msg) = rx.recv().await {
                if a_events_tx.send(TransportEvent::Message(msg)).is_err() {
                    break;
                }
            }
        });

        let a = ChannelTransport {
            state: TransportReadyState::Open,
            inbound: a_events_rx,
            outbound: a_tx,
        };
        let b = ChannelTransport {
            state: TransportReadyState::Open,
            inbound: b_events_rx,
            outbound: b_tx,
        };
        (a, b)
    }
}

impl Transport for ChannelTransport {
    fn ready_state(&self) -> TransportReadyState {
        self.state
    }

    fn buffered_amount(&self) -> usize {
        0
    }

    fn url(&self) -> &str {
        "tokio-channel://"
    }

    fn extensions(&self) -> &str {
        ""
    }

    fn protocol(&self) -> &str {
        ""
    }

    fn send(&mut self, msg: RawMessage) -> retransmitter::Result<()> {
        // A send error here would mean the peer's task has gone away; the
        // engine treats that the same as any other transport error.
        let _ = self.outbound.send(msg);
        Ok(())
    }

    fn close(&mut self, _code: u16, _reason: &str) {
        self.state = TransportReadyState::Closed;
    }

    fn set_binary_mode(&mut self, _binary: bool) {}

    fn poll_events(&mut self) -> Vec<TransportEvent> {
        let mut events = Vec::new();
        while let Ok(event) = self.inbound.try_recv() {
            events.push(event);
        }
        events
    }
}

/// Pumps both engines on a fixed tick, sleeping no longer than whichever
/// engine's own timer deadline comes soonest (spec §5: "the host dispatcher
/// is responsible for calling poll periodically or scheduling a wakeup at
/// the returned deadline"), until both reach `CLOSED`.
async fn drive_until_closed(mut a: Retransmitter, mut b: Retransmitter) {
    let tick = Duration::from_millis(20);
    loop {
        let now = Instant::now();
        a.pump(now).expect("engine A protocol error");
        b.pump(now).expect("engine B protocol error");

        let a_closed = a.ready_state() == retransmitter::ReadyState::Closed;
        let b_closed = b.ready_state() == retransmitter::ReadyState::Closed;
        if a_closed && b_closed {
            return;
        }

        let deadline = [a.next_deadline(), b.next_deadline()]
            .into_iter()
            .flatten()
            .min();
        let sleep_for = match deadline {
            Some(d) => d.saturating_duration_since(now).min(tick),
            None => tick,
        };
        tokio::time::sleep(sleep_for).await;
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let (transport_a, transport_b) = ChannelTransport::pair();
    let now = Instant::now();

    let mut engine_a = Retransmitter::new(RetransmitterConfig::default());
    engine_a.on_message(|p| println!("A received: {p:?}"));
    engine_a.on_close(|desc| println!("A closed: {desc:?}"));
    engine_a.use_transport(Box::new(transport_a), now).unwrap();

    let mut engine_b = Retransmitter::new(RetransmitterConfig::default());
    engine_b.on_message(|p| println!("B received: {p:?}"));
    engine_b.on_close(|desc| println!("B closed: {desc:?}"));
    engine_b.use_transport(Box::new(transport_b), now).unwrap();

    engine_a
        .send(Payload::Text("hello from A".to_string()))
        .unwrap();
    engine_b
        .send(Payload::Bytes(bytes::Bytes::from_static(b"hello from B")))
        .unwrap();

    // Let the exchange settle, then close orderly from A's side.
    tokio::time::sleep(Duration::from_millis(100)).await;
    engine_a.close(1000, "demo complete", Instant::now());

    drive_until_closed(engine_a, engine_b).await;
}
