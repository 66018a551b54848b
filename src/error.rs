use thiserror::Error;

/// Fatal errors produced by the retransmitter engine.
///
/// These are the BUG-class and protocol-desync cases from the engine's
/// error taxonomy: programmer misuse and an impossible peer frame both fail
/// loudly rather than degrading silently. Transport failures and
/// close-timeout are not represented here -- they are not call-site
/// failures, they surface through the application's `close`/`error`
/// callbacks once the engine reaches `CLOSED`.
#[derive(Debug, Error)]
pub enum RetransmitterError {
    #[error("cannot install a transport that is already closed or closing")]
    TransportNotUsable,

    #[error("received CLOSE_ACK with no pending close")]
    UnsolicitedCloseAck,

    #[error("unknown frame tag: {0}")]
    UnknownFrameTag(u32),

    #[error("received a body frame with no pending header")]
    UnexpectedBody,

    #[error("DATA_ACK cumulative {cumulative} is below buffer_lowest_serial {lowest}")]
    StaleAck { cumulative: u32, lowest: u32 },

    #[error("frame too short: expected at least {expected} bytes, got {actual}")]
    FrameTooShort { expected: usize, actual: usize },

    #[error("send() called after the engine reached CLOSED")]
    EngineClosed,
}

pub type Result<T> = std::result::Result<T, RetransmitterError>;
