//! Fixed-capacity byte buffer.
//!
//! [`FixedBuffer`] is allocated once with a bounded capacity and never grows.
//! The first write that does not fit puts the buffer into an *overflowed*
//! state: nothing from that write is stored, and every later write fails too,
//! so a truncated document can never be mistaken for a complete one.
//! [`FixedBuffer::reset`] clears both the position and the overflow flag.

use std::io;

use crate::error::{Result, WriteError};

/// A byte buffer of bounded capacity that signals overflow rather than growing.
///
/// # Example
///
/// ```rust
/// use jsonlayout_writer::{FixedBuffer, WriteError};
///
/// let mut buffer = FixedBuffer::new(4);
/// buffer.write_bytes(b"abc").unwrap();
/// assert_eq!(
///     buffer.write_bytes(b"de"),
///     Err(WriteError::Overflow { capacity: 4 })
/// );
/// assert!(buffer.is_overflowed());
///
/// buffer.reset();
/// assert!(buffer.is_empty());
/// ```
#[derive(Debug)]
pub struct FixedBuffer {
    bytes: Box<[u8]>,
    position: usize,
    overflowed: bool,
}

impl FixedBuffer {
    /// Allocates a buffer holding at most `capacity` bytes.
    pub fn new(capacity: usize) -> Self {
        Self {
            bytes: vec![0u8; capacity].into_boxed_slice(),
            position: 0,
            overflowed: false,
        }
    }

    /// Appends `data`, or fails without writing anything if it does not fit.
    pub fn write_bytes(&mut self, data: &[u8]) -> Result<()> {
        if self.overflowed {
            return Err(self.overflow());
        }
        let end = match self.position.checked_add(data.len()) {
            Some(end) if end <= self.bytes.len() => end,
            _ => {
                self.overflowed = true;
                return Err(self.overflow());
            }
        };
        self.bytes[self.position..end].copy_from_slice(data);
        self.position = end;
        Ok(())
    }

    /// The bytes written since the last reset.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes[..self.position]
    }

    /// Number of bytes written since the last reset.
    pub fn len(&self) -> usize {
        self.position
    }

    pub fn is_empty(&self) -> bool {
        self.position == 0
    }

    pub fn capacity(&self) -> usize {
        self.bytes.len()
    }

    /// Free space left before the buffer overflows.
    pub fn remaining(&self) -> usize {
        self.bytes.len() - self.position
    }

    /// Whether a write has exceeded the capacity since the last reset.
    pub fn is_overflowed(&self) -> bool {
        self.overflowed
    }

    /// Returns the buffer to the empty state. Can be called any number of times.
    pub fn reset(&mut self) {
        self.position = 0;
        self.overflowed = false;
    }

    fn overflow(&self) -> WriteError {
        WriteError::Overflow {
            capacity: self.bytes.len(),
        }
    }
}

impl io::Write for FixedBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.write_bytes(buf)
            .map(|()| buf.len())
            .map_err(|err| io::Error::new(io::ErrorKind::WriteZero, err))
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_write_within_capacity() {
        let mut buffer = FixedBuffer::new(8);
        buffer.write_bytes(b"{}").unwrap();
        buffer.write_bytes(b"[]").unwrap();
        assert_eq!(buffer.as_bytes(), b"{}[]");
        assert_eq!(buffer.len(), 4);
        assert_eq!(buffer.remaining(), 4);
    }

    #[test]
    fn test_exact_fit_is_not_overflow() {
        let mut buffer = FixedBuffer::new(3);
        buffer.write_bytes(b"abc").unwrap();
        assert!(!buffer.is_overflowed());
        assert_eq!(buffer.remaining(), 0);
    }

    #[test]
    fn test_overflow_is_terminal_until_reset() {
        let mut buffer = FixedBuffer::new(3);
        buffer.write_bytes(b"ab").unwrap();
        assert!(buffer.write_bytes(b"cd").is_err());
        // nothing from the failed write is kept
        assert_eq!(buffer.as_bytes(), b"ab");
        // even a write that would fit is refused now
        assert!(buffer.write_bytes(b"c").is_err());

        buffer.reset();
        assert!(!buffer.is_overflowed());
        buffer.write_bytes(b"xyz").unwrap();
        assert_eq!(buffer.as_bytes(), b"xyz");
    }

    #[test]
    fn test_reset_is_repeatable() {
        let mut buffer = FixedBuffer::new(2);
        for _ in 0..1000 {
            buffer.write_bytes(b"ab").unwrap();
            buffer.reset();
        }
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_io_write_reports_overflow() {
        let mut buffer = FixedBuffer::new(2);
        let err = buffer.write_all(b"abc").unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::WriteZero);
        assert!(buffer.is_overflowed());
    }
}
