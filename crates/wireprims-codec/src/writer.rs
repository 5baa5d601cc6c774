use bytes::BufMut;

use crate::error::WireError;
use crate::order::ByteOrder;

/// Sticky-error byte builder.
///
/// Mirror of [`Reader`](crate::Reader): the first failure is recorded and
/// every later write is skipped. Payloads are bounded by a byte limit so a
/// runaway encode callback cannot grow the buffer without bound.
#[derive(Debug)]
pub struct Writer {
    buf: Vec<u8>,
    limit: usize,
    err: Option<WireError>,
}

impl Default for Writer {
    fn default() -> Self {
        Self::new()
    }
}

impl Writer {
    /// Create an unbounded writer.
    pub fn new() -> Self {
        Self::with_limit(usize::MAX)
    }

    /// Create a writer that refuses to grow past `limit` bytes.
    pub fn with_limit(limit: usize) -> Self {
        Self {
            buf: Vec::new(),
            limit,
            err: None,
        }
    }

    pub(crate) fn from_buffer(mut buf: Vec<u8>) -> Self {
        buf.clear();
        Self {
            buf,
            limit: usize::MAX,
            err: None,
        }
    }

    /// Clear contents and error, keeping the allocation.
    pub(crate) fn reset(&mut self, limit: usize) {
        self.buf.clear();
        self.limit = limit;
        self.err = None;
    }

    /// Move the serialized bytes out, leaving an empty buffer behind.
    pub(crate) fn take_buffer(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.buf)
    }

    /// Hand an allocation back for reuse; its contents are discarded.
    pub(crate) fn restore_buffer(&mut self, mut buf: Vec<u8>) {
        buf.clear();
        self.buf = buf;
    }

    /// Number of bytes written so far.
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Bytes written so far.
    pub fn as_slice(&self) -> &[u8] {
        &self.buf
    }

    /// Maximum payload size this writer accepts.
    pub fn limit(&self) -> usize {
        self.limit
    }

    /// The sticky error, if one has been recorded.
    pub fn error(&self) -> Option<&WireError> {
        self.err.as_ref()
    }

    /// Returns true once a sticky error has been recorded.
    pub fn is_failed(&self) -> bool {
        self.err.is_some()
    }

    /// Record `err` unless an earlier error is already set.
    pub fn fail(&mut self, err: WireError) {
        if self.err.is_none() {
            self.err = Some(err);
        }
    }

    /// Report the sticky error, if any.
    pub fn flush(&self) -> Result<(), WireError> {
        match &self.err {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }

    pub fn write_u8(&mut self, value: u8) {
        self.append(1, |buf| buf.put_u8(value));
    }

    pub fn write_i8(&mut self, value: i8) {
        self.append(1, |buf| buf.put_i8(value));
    }

    pub fn write_u16(&mut self, order: ByteOrder, value: u16) {
        self.append(2, |buf| match order {
            ByteOrder::Big => buf.put_u16(value),
            ByteOrder::Little => buf.put_u16_le(value),
        });
    }

    pub fn write_i16(&mut self, order: ByteOrder, value: i16) {
        self.append(2, |buf| match order {
            ByteOrder::Big => buf.put_i16(value),
            ByteOrder::Little => buf.put_i16_le(value),
        });
    }

    pub fn write_u32(&mut self, order: ByteOrder, value: u32) {
        self.append(4, |buf| match order {
            ByteOrder::Big => buf.put_u32(value),
            ByteOrder::Little => buf.put_u32_le(value),
        });
    }

    pub fn write_i32(&mut self, order: ByteOrder, value: i32) {
        self.append(4, |buf| match order {
            ByteOrder::Big => buf.put_i32(value),
            ByteOrder::Little => buf.put_i32_le(value),
        });
    }

    pub fn write_u64(&mut self, order: ByteOrder, value: u64) {
        self.append(8, |buf| match order {
            ByteOrder::Big => buf.put_u64(value),
            ByteOrder::Little => buf.put_u64_le(value),
        });
    }

    pub fn write_i64(&mut self, order: ByteOrder, value: i64) {
        self.append(8, |buf| match order {
            ByteOrder::Big => buf.put_i64(value),
            ByteOrder::Little => buf.put_i64_le(value),
        });
    }

    pub fn write_f32(&mut self, order: ByteOrder, value: f32) {
        self.append(4, |buf| match order {
            ByteOrder::Big => buf.put_f32(value),
            ByteOrder::Little => buf.put_f32_le(value),
        });
    }

    pub fn write_f64(&mut self, order: ByteOrder, value: f64) {
        self.append(8, |buf| match order {
            ByteOrder::Big => buf.put_f64(value),
            ByteOrder::Little => buf.put_f64_le(value),
        });
    }

    /// Append `bytes` verbatim. An empty slice is a no-op.
    pub fn write_bytes(&mut self, bytes: &[u8]) {
        self.append(bytes.len(), |buf| buf.put_slice(bytes));
    }

    fn append(&mut self, requested: usize, put: impl FnOnce(&mut Vec<u8>)) {
        if self.err.is_some() || requested == 0 {
            return;
        }

        let before = self.buf.len();
        let attempted = before.saturating_add(requested);
        if attempted > self.limit {
            self.fail(WireError::LimitExceeded {
                attempted,
                limit: self.limit,
            });
            return;
        }

        put(&mut self.buf);

        let appended = self.buf.len() - before;
        if appended != requested {
            self.fail(WireError::ShortWrite {
                requested,
                appended,
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reader::Reader;

    #[test]
    fn writes_fixed_width_in_both_orders() {
        let mut writer = Writer::new();
        writer.write_u16(ByteOrder::Big, 42);
        writer.write_u16(ByteOrder::Little, 42);
        writer.write_u64(ByteOrder::Big, 42);

        assert_eq!(writer.as_slice(), &[0, 42, 42, 0, 0, 0, 0, 0, 0, 0, 0, 42]);
        assert!(writer.flush().is_ok());
    }

    #[test]
    fn mirrors_reader() {
        let mut writer = Writer::new();
        writer.write_u8(7);
        writer.write_i8(-7);
        writer.write_i16(ByteOrder::Little, -300);
        writer.write_u32(ByteOrder::Big, 0xDEAD_BEEF);
        writer.write_i64(ByteOrder::Little, i64::MIN);
        writer.write_f64(ByteOrder::Big, 6.5);
        writer.write_bytes(b"tail");

        let mut reader = Reader::new(writer.as_slice().to_vec());
        assert_eq!(reader.read_u8(), 7);
        assert_eq!(reader.read_i8(), -7);
        assert_eq!(reader.read_i16(ByteOrder::Little), -300);
        assert_eq!(reader.read_u32(ByteOrder::Big), 0xDEAD_BEEF);
        assert_eq!(reader.read_i64(ByteOrder::Little), i64::MIN);
        assert_eq!(reader.read_f64(ByteOrder::Big), 6.5);
        assert_eq!(reader.read_bytes(4), b"tail");
        assert!(reader.flush().is_ok());
        assert_eq!(reader.remaining(), 0);
    }

    #[test]
    fn every_width_round_trips_in_both_orders() {
        for order in [ByteOrder::Big, ByteOrder::Little] {
            let mut writer = Writer::new();
            writer.write_i8(i8::MIN);
            writer.write_u16(order, 0xBEEF);
            writer.write_i16(order, i16::MIN + 1);
            writer.write_u32(order, 0x0102_0304);
            writer.write_i32(order, -123_456);
            writer.write_u64(order, 0x0102_0304_0506_0708);
            writer.write_i64(order, -1);
            writer.write_f32(order, -1.5);
            writer.write_f64(order, f64::MAX);
            assert_eq!(writer.len(), 1 + 2 + 2 + 4 + 4 + 8 + 8 + 4 + 8);

            let mut reader = Reader::new(writer.as_slice().to_vec());
            assert_eq!(reader.read_i8(), i8::MIN);
            assert_eq!(reader.read_u16(order), 0xBEEF);
            assert_eq!(reader.read_i16(order), i16::MIN + 1);
            assert_eq!(reader.read_u32(order), 0x0102_0304);
            assert_eq!(reader.read_i32(order), -123_456);
            assert_eq!(reader.read_u64(order), 0x0102_0304_0506_0708);
            assert_eq!(reader.read_i64(order), -1);
            assert_eq!(reader.read_f32(order), -1.5);
            assert_eq!(reader.read_f64(order), f64::MAX);
            assert!(reader.flush().is_ok());
            assert_eq!(reader.remaining(), 0);
        }
    }

    #[test]
    fn byte_order_selects_layout() {
        let mut writer = Writer::new();
        writer.write_u32(ByteOrder::Big, 0x0102_0304);
        writer.write_u32(ByteOrder::Little, 0x0102_0304);
        assert_eq!(writer.as_slice(), &[1, 2, 3, 4, 4, 3, 2, 1]);
    }

    #[test]
    fn empty_write_bytes_is_noop() {
        let mut writer = Writer::with_limit(0);
        writer.write_bytes(&[]);
        assert!(writer.is_empty());
        assert!(writer.flush().is_ok());
    }

    #[test]
    fn limit_sets_sticky_error() {
        let mut writer = Writer::with_limit(4);
        writer.write_u32(ByteOrder::Big, 1);
        writer.write_u8(2);

        assert_eq!(writer.len(), 4);
        assert_eq!(
            writer.flush(),
            Err(WireError::LimitExceeded {
                attempted: 5,
                limit: 4
            })
        );
    }

    #[test]
    fn sticky_error_skips_later_writes() {
        let mut writer = Writer::new();
        writer.write_u8(1);
        writer.fail(WireError::Malformed("negative length".into()));
        writer.write_u64(ByteOrder::Big, 99);
        writer.write_bytes(b"ignored");
        writer.fail(WireError::Malformed("second".into()));

        assert_eq!(writer.as_slice(), &[1]);
        assert_eq!(writer.flush(), Err(WireError::Malformed("negative length".into())));
    }

    #[test]
    fn reset_clears_contents_and_error() {
        let mut writer = Writer::with_limit(1);
        writer.write_u16(ByteOrder::Big, 1);
        assert!(writer.is_failed());

        writer.reset(16);
        assert!(writer.is_empty());
        assert!(writer.error().is_none());
        assert_eq!(writer.limit(), 16);
        writer.write_u16(ByteOrder::Big, 1);
        assert!(writer.flush().is_ok());
    }
}
