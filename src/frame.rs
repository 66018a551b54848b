//! Wire framing: the five frame types and the header/body reassembly codec.
//!
//! Every frame starts with a 4-byte little-endian `u32` tag. `INITIAL_SERIAL`
//! and `DATA_ACK` carry one more little-endian `u32` in the same header
//! message (8 bytes total); `DATA`, `CLOSE`, and `CLOSE_ACK` headers are bare
//! 4-byte tags. `DATA` is always two transport messages: a 4-byte header
//! followed by an opaque payload frame.

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::error::{RetransmitterError, Result};

const TAG_INITIAL_SERIAL: u32 = 1;
const TAG_DATA: u32 = 2;
const TAG_DATA_ACK: u32 = 3;
const TAG_CLOSE: u32 = 4;
const TAG_CLOSE_ACK: u32 = 5;

/// An application payload, tagged by the transport framing it arrived/leaves
/// with. The transport distinguishes binary and textual messages; this
/// distinction is preserved end to end rather than collapsed to bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    Bytes(Bytes),
    Text(String),
}

impl Payload {
    /// Logical size used for the ACK byte-threshold: byte length for binary,
    /// character length for text (spec §4.3 step 3).
    pub fn logical_len(&self) -> usize {
        match self {
            Payload::Bytes(b) => b.len(),
            Payload::Text(s) => s.chars().count(),
        }
    }

    pub fn as_bytes_for_wire(&self) -> Bytes {
        match self {
            Payload::Bytes(b) => b.clone(),
            Payload::Text(s) => Bytes::copy_from_slice(s.as_bytes()),
        }
    }
}

/// Header-level frame. `Data` is a header frame; its body is carried
/// alongside as a `Payload` once both have been observed by the codec.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    InitialSerial { lowest_unacked: u32 },
    Data { body: Payload },
    DataAck { cumulative: u32 },
    Close,
    CloseAck,
}

impl Frame {
    /// Encode this frame's header message. `Data` encodes only its 4-byte
    /// header here -- the caller is responsible for sending the body as a
    /// second, separate transport message.
    pub fn encode_header(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(8);
        match self {
            Frame::InitialSerial { lowest_unacked } => {
                buf.put_u32_le(TAG_INITIAL_SERIAL);
                buf.put_u32_le(*lowest_unacked);
            }
            Frame::Data { .. } => {
                buf.put_u32_le(TAG_DATA);
            }
            Frame::DataAck { cumulative } => {
                buf.put_u32_le(TAG_DATA_ACK);
                buf.put_u32_le(*cumulative);
            }
            Frame::Close => {
                buf.put_u32_le(TAG_CLOSE);
            }
            Frame::CloseAck => {
                buf.put_u32_le(TAG_CLOSE_ACK);
            }
        }
        buf.freeze()
    }
}

/// A single entry as kept in the outbound pending-ACK buffer. Unlike
/// `Frame`, a `DATA` message is split into its two wire-level slots here --
/// spec §3/§9: "a DATA header+body pair ... occupies two slots in the
/// concrete pending buffer", which is what makes `DATA_ACK`'s cumulative
/// counter advance by 2 per delivered `DATA`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutFrame {
    InitialSerial(u32),
    DataHeader,
    DataBody(Payload),
    DataAck(u32),
    Close,
    CloseAck,
}

impl OutFrame {
    /// Render this pending-buffer slot as the transport message it sends.
    pub fn to_wire(&self) -> RawMessage {
        match self {
            OutFrame::InitialSerial(lowest_unacked) => RawMessage::Binary(
                Frame::InitialSerial {
                    lowest_unacked: *lowest_unacked,
                }
                .encode_header(),
            ),
            OutFrame::DataHeader => RawMessage::Binary(
                Frame::Data {
                    body: Payload::Bytes(Bytes::new()),
                }
                .encode_header(),
            ),
            OutFrame::DataBody(payload) => match payload {
                Payload::Bytes(b) => RawMessage::Binary(b.clone()),
                Payload::Text(s) => RawMessage::Text(s.clone()),
            },
            OutFrame::DataAck(cumulative) => RawMessage::Binary(
                Frame::DataAck {
                    cumulative: *cumulative,
                }
                .encode_header(),
            ),
            OutFrame::Close => RawMessage::Binary(Frame::Close.encode_header()),
            OutFrame::CloseAck => RawMessage::Binary(Frame::CloseAck.encode_header()),
        }
    }
}

/// One raw transport message as seen by the codec: the engine doesn't care
/// whether it arrived as a binary or textual frame until it knows whether
/// it's a header or a `DATA` body.
#[derive(Debug, Clone)]
pub enum RawMessage {
    Binary(Bytes),
    Text(String),
}

/// Result of feeding one transport message into the codec.
pub enum Decoded {
    /// A complete, header-only frame.
    Frame(Frame),
    /// A `DATA` header arrived; the codec is now waiting for its body.
    AwaitingBody,
    /// A `DATA` body arrived, completing the pending header.
    Data(Frame),
}

/// Holds the at-most-one pending `DATA` header across transport messages
/// (spec §4.1: "the codec holds a single optional pending_header").
#[derive(Debug, Default)]
pub struct FrameDecoder {
    pending_header: bool,
}

impl FrameDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn has_pending_header(&self) -> bool {
        self.pending_header
    }

    /// Feed one raw transport message into the codec.
    pub fn decode(&mut self, msg: RawMessage) -> Result<Decoded> {
        if self.pending_header {
            self.pending_header = false;
            let body = match msg {
                RawMessage::Binary(b) => Payload::Bytes(b),
                RawMessage::Text(s) => Payload::Text(s),
            };
            return Ok(Decoded::Data(Frame::Data { body }));
        }

        let bytes = match &msg {
            RawMessage::Binary(b) => b.clone(),
            RawMessage::Text(_) => {
                return Err(RetransmitterError::UnexpectedBody);
            }
        };

        if bytes.len() < 4 {
            return Err(RetransmitterError::FrameTooShort {
                expected: 4,
                actual: bytes.len(),
            });
        }
        let mut cur = bytes.clone();
        let tag = cur.get_u32_le();

        match tag {
            TAG_INITIAL_SERIAL => {
                if cur.remaining() < 4 {
                    return Err(RetransmitterError::FrameTooShort {
                        expected: 8,
                        actual: bytes.len(),
                    });
                }
                let lowest_unacked = cur.get_u32_le();
                Ok(Decoded::Frame(Frame::InitialSerial { lowest_unacked }))
            }
            TAG_DATA => {
                self.pending_header = true;
                Ok(Decoded::AwaitingBody)
            }
            TAG_DATA_ACK => {
                if cur.remaining() < 4 {
                    return Err(RetransmitterError::FrameTooShort {
                        expected: 8,
                        actual: bytes.len(),
                    });
                }
                let cumulative = cur.get_u32_le();
                Ok(Decoded::Frame(Frame::DataAck { cumulative }))
            }
            TAG_CLOSE => Ok(Decoded::Frame(Frame::Close)),
            TAG_CLOSE_ACK => Ok(Decoded::Frame(Frame::CloseAck)),
            other => Err(RetransmitterError::UnknownFrameTag(other)),
        }
    }
}
