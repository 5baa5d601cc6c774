use std::io::{ErrorKind, Read, Write};
use std::sync::Arc;

use bytes::BufMut;
use tracing::{debug, trace};

use crate::error::{BoxError, CodecError, Direction, Result, Stage};
use crate::interceptor::Pipeline;
use crate::pool::WirePool;
use crate::reader::Reader;
use crate::writer::Writer;

/// Size of the length prefix: an unsigned 64-bit big-endian integer.
pub const LENGTH_PREFIX_SIZE: usize = 8;

/// Default maximum payload size: 16 MiB.
pub const DEFAULT_MAX_PAYLOAD: usize = 16 * 1024 * 1024;

/// Upper bound on the up-front reservation for a declared payload length.
/// Larger payloads grow the buffer as bytes actually arrive.
const MAX_PREALLOC: u64 = 64 * 1024;

/// Decode callback: populates the message state from primitive reads.
pub type DecodeFn<S> = Arc<dyn Fn(&mut Reader, &mut S) + Send + Sync>;

/// Encode callback: serializes the message state with primitive writes.
pub type EncodeFn<S> = Arc<dyn Fn(&mut Writer, &S) + Send + Sync>;

/// Framing and size limits of a [`Codec`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CodecConfig {
    /// Length-prefixed framing when true; whole-stream framing otherwise.
    pub prefix_size: bool,
    /// Maximum payload size in bytes, before and after interceptors.
    pub max_payload_size: usize,
}

impl Default for CodecConfig {
    fn default() -> Self {
        Self {
            prefix_size: true,
            max_payload_size: DEFAULT_MAX_PAYLOAD,
        }
    }
}

/// Reads and writes one message per transaction.
///
/// Wire format with `prefix_size` enabled:
/// ```text
/// ┌────────────────────┬──────────────────────────────────┐
/// │ Length L (8B BE)   │ Payload (L bytes, post-intercept) │
/// └────────────────────┴──────────────────────────────────┘
/// ```
/// `L == 0` is an empty message: nothing follows and decoding is skipped.
/// With `prefix_size` disabled the payload runs to end of stream, one
/// message per stream leg.
///
/// A codec is shared by reference across threads. Transactions only take an
/// interceptor snapshot at start; registration never blocks them and they
/// never block each other.
pub struct Codec<S> {
    config: CodecConfig,
    decode: DecodeFn<S>,
    encode: EncodeFn<S>,
    recv: Pipeline,
    send: Pipeline,
    pool: WirePool,
}

impl<S> Codec<S> {
    /// Create a codec from a decode/encode callback pair, with default
    /// configuration and the process-wide pool.
    pub fn new<D, E>(decode: D, encode: E) -> Self
    where
        D: Fn(&mut Reader, &mut S) + Send + Sync + 'static,
        E: Fn(&mut Writer, &S) + Send + Sync + 'static,
    {
        Self {
            config: CodecConfig::default(),
            decode: Arc::new(decode),
            encode: Arc::new(encode),
            recv: Pipeline::new(Direction::Recv),
            send: Pipeline::new(Direction::Send),
            pool: WirePool::global(),
        }
    }

    /// Replace the configuration.
    pub fn with_config(mut self, config: CodecConfig) -> Self {
        self.config = config;
        self
    }

    /// Select length-prefixed (`true`) or whole-stream (`false`) framing.
    pub fn with_prefix_size(mut self, prefix_size: bool) -> Self {
        self.config.prefix_size = prefix_size;
        self
    }

    /// Use a dedicated object pool instead of the process-wide one.
    pub fn with_pool(mut self, pool: WirePool) -> Self {
        self.pool = pool;
        self
    }

    pub fn config(&self) -> &CodecConfig {
        &self.config
    }

    pub fn prefix_size(&self) -> bool {
        self.config.prefix_size
    }

    pub fn pool(&self) -> &WirePool {
        &self.pool
    }

    /// Append an interceptor to the receive pipeline.
    pub fn intercept_recv<F>(&self, interceptor: F)
    where
        F: Fn(Vec<u8>) -> std::result::Result<Vec<u8>, BoxError> + Send + Sync + 'static,
    {
        self.recv.register(interceptor);
    }

    /// Append an interceptor to the send pipeline.
    pub fn intercept_send<F>(&self, interceptor: F)
    where
        F: Fn(Vec<u8>) -> std::result::Result<Vec<u8>, BoxError> + Send + Sync + 'static,
    {
        self.send.register(interceptor);
    }

    /// Number of registered receive interceptors.
    pub fn recv_interceptors(&self) -> usize {
        self.recv.len()
    }

    /// Number of registered send interceptors.
    pub fn send_interceptors(&self) -> usize {
        self.send.len()
    }

    /// Read one frame from `source` and decode it into `state`.
    ///
    /// On error `state` may be partially populated and must be discarded.
    pub fn read_message<R: Read>(&self, source: &mut R, state: &mut S) -> Result<()> {
        let recv = self.recv.snapshot();
        let max = self.config.max_payload_size;
        let mut frame = self.pool.acquire_buffer();

        if self.config.prefix_size {
            let length = read_length_prefix(source)?;
            if length == 0 {
                trace!("empty frame, decode skipped");
                return Ok(());
            }
            if length > max as u64 {
                debug!(length, max, "declared payload exceeds limit");
                return Err(CodecError::PayloadTooLarge {
                    size: length,
                    max: max as u64,
                });
            }
            read_payload(source, length, &mut frame)?;
        } else {
            read_stream(source, max, &mut frame)?;
        }

        let payload = recv.apply(std::mem::take(&mut *frame))?;
        let payload_len = payload.len();

        let mut reader = self.pool.acquire_reader(payload);
        (self.decode)(&mut *reader, state);
        let outcome = reader.flush();
        *frame = reader.into_data();

        if let Err(err) = outcome {
            debug!(error = %err, payload_len, "decode failed");
            return Err(err.into());
        }

        trace!(
            payload_len,
            prefixed = self.config.prefix_size,
            interceptors = recv.len(),
            "read message"
        );
        Ok(())
    }

    /// Encode `state` and write it to `sink` as one frame.
    ///
    /// No transport I/O happens unless encoding and every send interceptor
    /// succeed.
    pub fn write_message<W: Write>(&self, sink: &mut W, state: &S) -> Result<()> {
        let send = self.send.snapshot();
        let max = self.config.max_payload_size;

        let mut writer = self.pool.acquire_writer(max);
        (self.encode)(&mut *writer, state);
        if let Err(err) = writer.flush() {
            debug!(error = %err, "encode failed");
            return Err(err.into());
        }

        let payload = send.apply(writer.take_buffer())?;
        if payload.len() > max {
            debug!(payload_len = payload.len(), max, "intercepted payload exceeds limit");
            return Err(CodecError::PayloadTooLarge {
                size: payload.len() as u64,
                max: max as u64,
            });
        }

        // The prefix is computed over the post-interceptor bytes.
        let mut frame = self.pool.acquire_buffer();
        frame.reserve(LENGTH_PREFIX_SIZE + payload.len());
        if self.config.prefix_size {
            frame.put_u64(payload.len() as u64);
        }
        frame.put_slice(&payload);
        let payload_len = payload.len();
        writer.restore_buffer(payload);

        write_frame(sink, &frame)?;

        trace!(
            payload_len,
            frame_len = frame.len(),
            prefixed = self.config.prefix_size,
            interceptors = send.len(),
            "wrote message"
        );
        Ok(())
    }
}

impl<S> Clone for Codec<S> {
    /// Shares configuration, callbacks, pool and the current interceptors.
    /// Each clone registers into its own copy-on-write chains.
    fn clone(&self) -> Self {
        Self {
            config: self.config,
            decode: Arc::clone(&self.decode),
            encode: Arc::clone(&self.encode),
            recv: self.recv.clone(),
            send: self.send.clone(),
            pool: self.pool.clone(),
        }
    }
}

impl<S> std::fmt::Debug for Codec<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Codec")
            .field("config", &self.config)
            .field("recv", &self.recv)
            .field("send", &self.send)
            .finish()
    }
}

fn read_length_prefix<R: Read>(source: &mut R) -> Result<u64> {
    let mut prefix = [0u8; LENGTH_PREFIX_SIZE];
    let mut filled = 0usize;

    while filled < prefix.len() {
        match source.read(&mut prefix[filled..]) {
            Ok(0) if filled == 0 => return Err(CodecError::ConnectionClosed),
            Ok(0) => {
                return Err(CodecError::io(
                    Stage::LengthRead,
                    std::io::Error::from(ErrorKind::UnexpectedEof),
                ))
            }
            Ok(n) => filled += n,
            Err(err) if err.kind() == ErrorKind::Interrupted => continue,
            Err(err) => return Err(CodecError::io(Stage::LengthRead, err)),
        }
    }

    Ok(u64::from_be_bytes(prefix))
}

fn read_payload<R: Read>(source: &mut R, length: u64, buf: &mut Vec<u8>) -> Result<()> {
    buf.reserve(length.min(MAX_PREALLOC) as usize);
    source
        .by_ref()
        .take(length)
        .read_to_end(buf)
        .map_err(|err| CodecError::io(Stage::PayloadRead, err))?;

    let actual = buf.len() as u64;
    if actual < length {
        debug!(expected = length, actual, "truncated frame");
        return Err(CodecError::Truncated {
            expected: length,
            actual,
        });
    }
    Ok(())
}

fn read_stream<R: Read>(source: &mut R, max: usize, buf: &mut Vec<u8>) -> Result<()> {
    // One byte past the limit is enough to tell an oversized stream apart.
    let limit = (max as u64).saturating_add(1);
    source
        .by_ref()
        .take(limit)
        .read_to_end(buf)
        .map_err(|err| CodecError::io(Stage::StreamRead, err))?;

    if buf.len() > max {
        debug!(max, "stream payload exceeds limit");
        return Err(CodecError::PayloadTooLarge {
            size: buf.len() as u64,
            max: max as u64,
        });
    }
    Ok(())
}

fn write_frame<W: Write>(sink: &mut W, frame: &[u8]) -> Result<()> {
    let mut written = 0usize;
    while written < frame.len() {
        match sink.write(&frame[written..]) {
            Ok(0) => {
                debug!(written, expected = frame.len(), "transport accepted no more bytes");
                return Err(CodecError::ShortWrite {
                    written,
                    expected: frame.len(),
                });
            }
            Ok(n) => written += n,
            Err(err) if err.kind() == ErrorKind::Interrupted => continue,
            Err(err) => return Err(CodecError::io(Stage::FrameWrite, err)),
        }
    }

    loop {
        match sink.flush() {
            Ok(()) => return Ok(()),
            Err(err) if err.kind() == ErrorKind::Interrupted => continue,
            Err(err) => return Err(CodecError::io(Stage::Flush, err)),
        }
    }
}
