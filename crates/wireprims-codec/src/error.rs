use std::fmt;

/// Boxed error returned by interceptors.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Sticky failure recorded by a primitive [`Reader`](crate::Reader) or
/// [`Writer`](crate::Writer).
///
/// Once recorded, the first error is kept for the lifetime of the object and
/// every later primitive call short-circuits.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WireError {
    /// Fewer bytes were left than the read required.
    #[error("unexpected end of data ({requested} bytes requested, {remaining} remaining)")]
    UnexpectedEof { requested: usize, remaining: usize },

    /// The backing buffer accepted fewer bytes than were written.
    #[error("short write ({appended} of {requested} bytes appended)")]
    ShortWrite { requested: usize, appended: usize },

    /// The write would grow the payload past the configured maximum.
    #[error("payload limit exceeded ({attempted} bytes, max {limit})")]
    LimitExceeded { attempted: usize, limit: usize },

    /// A decode or encode callback rejected the message.
    #[error("malformed message: {0}")]
    Malformed(String),
}

/// Transport stage a [`CodecError::Io`] happened in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    LengthRead,
    PayloadRead,
    StreamRead,
    FrameWrite,
    Flush,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let stage = match self {
            Stage::LengthRead => "during length read",
            Stage::PayloadRead => "during payload read",
            Stage::StreamRead => "during stream read",
            Stage::FrameWrite => "during frame write",
            Stage::Flush => "during flush",
        };
        f.write_str(stage)
    }
}

/// Which interceptor pipeline a failure came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Send,
    Recv,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Send => f.write_str("send"),
            Direction::Recv => f.write_str("recv"),
        }
    }
}

/// Terminal failure of a read or write transaction.
///
/// Any error means the state passed to the transaction must be discarded:
/// the decode callback may have partially populated it.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// The transport failed.
    #[error("transport I/O error {stage}: {source}")]
    Io {
        stage: Stage,
        source: std::io::Error,
    },

    /// The stream ended cleanly before a length prefix started.
    #[error("connection closed (no frame pending)")]
    ConnectionClosed,

    /// The stream ended before the declared payload length was read.
    #[error("truncated frame (expected {expected} bytes, read {actual})")]
    Truncated { expected: u64, actual: u64 },

    /// A declared or serialized payload exceeds the configured maximum.
    #[error("payload too large ({size} bytes, max {max})")]
    PayloadTooLarge { size: u64, max: u64 },

    /// The transport accepted fewer bytes than the assembled frame.
    #[error("short write to transport ({written} of {expected} bytes)")]
    ShortWrite { written: usize, expected: usize },

    /// An interceptor rejected its input.
    #[error("{direction} interceptor #{index} failed: {source}")]
    Interceptor {
        direction: Direction,
        index: usize,
        source: BoxError,
    },

    /// A primitive read or write recorded a sticky error.
    #[error(transparent)]
    Wire(#[from] WireError),
}

impl CodecError {
    pub(crate) fn io(stage: Stage, source: std::io::Error) -> Self {
        Self::Io { stage, source }
    }
}

pub type Result<T> = std::result::Result<T, CodecError>;
