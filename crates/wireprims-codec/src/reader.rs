use bytes::Buf;

use crate::error::WireError;
use crate::order::ByteOrder;

/// Sticky-error cursor over a fully received payload.
///
/// Primitive reads never fail loudly. A short read records
/// [`WireError::UnexpectedEof`] and every later read returns a zero value
/// without touching the cursor. The recorded error is surfaced once, through
/// [`Reader::flush`].
#[derive(Debug, Default)]
pub struct Reader {
    data: Vec<u8>,
    pos: usize,
    err: Option<WireError>,
}

impl Reader {
    /// Create a reader over `data`.
    pub fn new(data: impl Into<Vec<u8>>) -> Self {
        Self {
            data: data.into(),
            pos: 0,
            err: None,
        }
    }

    /// Replace the backing payload and return to a pristine state.
    pub(crate) fn reset(&mut self, data: Vec<u8>) {
        self.data = data;
        self.pos = 0;
        self.err = None;
    }

    /// Detach the backing payload, leaving the reader pristine and empty.
    pub(crate) fn take_data(&mut self) -> Vec<u8> {
        self.pos = 0;
        self.err = None;
        std::mem::take(&mut self.data)
    }

    /// Number of unread bytes.
    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    /// Number of bytes consumed by successful reads so far.
    pub fn consumed(&self) -> usize {
        self.pos
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

    pub fn read_u8(&mut self) -> u8 {
        match self.take(1) {
            Some(mut raw) => raw.get_u8(),
            None => 0,
        }
    }

    pub fn read_i8(&mut self) -> i8 {
        match self.take(1) {
            Some(mut raw) => raw.get_i8(),
            None => 0,
        }
    }

    pub fn read_u16(&mut self, order: ByteOrder) -> u16 {
        match self.take(2) {
            Some(mut raw) => match order {
                ByteOrder::Big => raw.get_u16(),
                ByteOrder::Little => raw.get_u16_le(),
            },
            None => 0,
        }
    }

    pub fn read_i16(&mut self, order: ByteOrder) -> i16 {
        match self.take(2) {
            Some(mut raw) => match order {
                ByteOrder::Big => raw.get_i16(),
                ByteOrder::Little => raw.get_i16_le(),
            },
            None => 0,
        }
    }

    pub fn read_u32(&mut self, order: ByteOrder) -> u32 {
        match self.take(4) {
            Some(mut raw) => match order {
                ByteOrder::Big => raw.get_u32(),
                ByteOrder::Little => raw.get_u32_le(),
            },
            None => 0,
        }
    }

    pub fn read_i32(&mut self, order: ByteOrder) -> i32 {
        match self.take(4) {
            Some(mut raw) => match order {
                ByteOrder::Big => raw.get_i32(),
                ByteOrder::Little => raw.get_i32_le(),
            },
            None => 0,
        }
    }

    pub fn read_u64(&mut self, order: ByteOrder) -> u64 {
        match self.take(8) {
            Some(mut raw) => match order {
                ByteOrder::Big => raw.get_u64(),
                ByteOrder::Little => raw.get_u64_le(),
            },
            None => 0,
        }
    }

    pub fn read_i64(&mut self, order: ByteOrder) -> i64 {
        match self.take(8) {
            Some(mut raw) => match order {
                ByteOrder::Big => raw.get_i64(),
                ByteOrder::Little => raw.get_i64_le(),
            },
            None => 0,
        }
    }

    pub fn read_f32(&mut self, order: ByteOrder) -> f32 {
        match self.take(4) {
            Some(mut raw) => match order {
                ByteOrder::Big => raw.get_f32(),
                ByteOrder::Little => raw.get_f32_le(),
            },
            None => 0.0,
        }
    }

    pub fn read_f64(&mut self, order: ByteOrder) -> f64 {
        match self.take(8) {
            Some(mut raw) => match order {
                ByteOrder::Big => raw.get_f64(),
                ByteOrder::Little => raw.get_f64_le(),
            },
            None => 0.0,
        }
    }

    /// Read exactly `amount` bytes.
    ///
    /// `amount == 0` returns an empty slice and is never an error.
    pub fn read_bytes(&mut self, amount: usize) -> &[u8] {
        self.take(amount).unwrap_or(&[][..])
    }

    /// Read every unread byte.
    pub fn read_remaining(&mut self) -> &[u8] {
        let amount = self.remaining();
        self.read_bytes(amount)
    }

    // Checks the sticky slot first, then bounds. Only a fully satisfied read
    // advances the cursor.
    fn take(&mut self, amount: usize) -> Option<&[u8]> {
        if self.err.is_some() {
            return None;
        }
        if amount == 0 {
            return Some(&[][..]);
        }

        let remaining = self.remaining();
        if remaining < amount {
            self.fail(WireError::UnexpectedEof {
                requested: amount,
                remaining,
            });
            return None;
        }

        let start = self.pos;
        self.pos += amount;
        Some(&self.data[start..self.pos])
    }
}
