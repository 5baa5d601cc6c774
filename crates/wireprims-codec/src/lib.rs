//! Binary wire codec core.
//!
//! Turns an opaque message state into bytes and back, one message per
//! transaction:
//! - Length-prefixed (8-byte big-endian) or whole-stream framing
//! - Ordered send/recv interceptor pipelines, registrable at runtime
//! - Sticky-error primitive [`Reader`]/[`Writer`] handed to schema callbacks
//! - Pooled readers, writers and buffers, reset on every acquisition
//!
//! The message schema lives outside this crate as a decode/encode callback
//! pair; the codec only sees bytes and lengths.

pub mod codec;
pub mod error;
pub mod interceptor;
pub mod order;
pub mod pool;
pub mod reader;
pub mod writer;

pub use codec::{
    Codec, CodecConfig, DecodeFn, EncodeFn, DEFAULT_MAX_PAYLOAD, LENGTH_PREFIX_SIZE,
};
pub use error::{BoxError, CodecError, Direction, Result, Stage, WireError};
pub use interceptor::{xor_mask, Chain, Interceptor, Pipeline};
pub use order::ByteOrder;
pub use pool::{PooledBuf, PooledReader, PooledWriter, WirePool};
pub use reader::Reader;
pub use writer::Writer;
