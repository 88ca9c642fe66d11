//! Fixed-size byte destinations that rendered documents are encoded into.
//!
//! [`JsonLayout::encode`](crate::JsonLayout::encode) copies a rendered
//! document into a [`ByteDestination`], draining the destination whenever it
//! runs out of free space, so documents larger than the destination still
//! pass through it whole.

use std::io::{self, Write};

/// A fixed-capacity sink with an explicit drain step.
pub trait ByteDestination {
    /// Free bytes before the next [`drain`](Self::drain) is needed.
    fn remaining(&self) -> usize;

    /// Appends `bytes`; callers never pass more than [`remaining`](Self::remaining).
    fn put(&mut self, bytes: &[u8]);

    /// Moves buffered bytes onward, freeing space.
    fn drain(&mut self) -> io::Result<()>;
}

/// Copies `bytes` into `destination`, draining as often as needed.
pub fn write_through<D>(destination: &mut D, mut bytes: &[u8]) -> io::Result<()>
where
    D: ByteDestination + ?Sized,
{
    while !bytes.is_empty() {
        if destination.remaining() == 0 {
            destination.drain()?;
            if destination.remaining() == 0 {
                return Err(io::Error::new(
                    io::ErrorKind::WriteZero,
                    "destination has no free space after draining",
                ));
            }
        }
        let chunk = destination.remaining().min(bytes.len());
        destination.put(&bytes[..chunk]);
        bytes = &bytes[chunk..];
    }
    Ok(())
}

/// A fixed-size buffer in front of an [`io::Write`].
///
/// Nothing reaches the inner writer until the buffer fills up or
/// [`drain`](ByteDestination::drain) is called.
#[derive(Debug)]
pub struct BufferedDestination<W: Write> {
    inner: W,
    buffer: Vec<u8>,
    capacity: usize,
}

impl<W: Write> BufferedDestination<W> {
    pub fn new(inner: W, capacity: usize) -> Self {
        Self {
            inner,
            buffer: Vec::with_capacity(capacity),
            capacity,
        }
    }

    pub fn get_ref(&self) -> &W {
        &self.inner
    }

    /// Bytes buffered but not yet drained.
    pub fn buffered(&self) -> &[u8] {
        &self.buffer
    }

    /// Drains what is left and returns the inner writer.
    pub fn into_inner(mut self) -> io::Result<W> {
        self.drain()?;
        Ok(self.inner)
    }
}

impl<W: Write> ByteDestination for BufferedDestination<W> {
    fn remaining(&self) -> usize {
        self.capacity - self.buffer.len()
    }

    fn put(&mut self, bytes: &[u8]) {
        debug_assert!(bytes.len() <= self.remaining());
        self.buffer.extend_from_slice(bytes);
    }

    fn drain(&mut self) -> io::Result<()> {
        self.inner.write_all(&self.buffer)?;
        self.buffer.clear();
        self.inner.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_small_writes_stay_buffered() {
        let mut destination = BufferedDestination::new(Vec::new(), 16);
        write_through(&mut destination, b"hello").unwrap();
        assert_eq!(destination.buffered(), b"hello");
        assert!(destination.get_ref().is_empty());
        assert_eq!(destination.remaining(), 11);
    }

    #[test]
    fn test_large_writes_drain_through() {
        let mut destination = BufferedDestination::new(Vec::new(), 4);
        write_through(&mut destination, b"0123456789").unwrap();
        assert_eq!(destination.get_ref().as_slice(), b"01234567");
        assert_eq!(destination.buffered(), b"89");
        assert_eq!(destination.into_inner().unwrap(), b"0123456789");
    }

    #[test]
    fn test_zero_capacity_is_an_error() {
        let mut destination = BufferedDestination::new(Vec::new(), 0);
        let err = write_through(&mut destination, b"x").unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::WriteZero);
        assert!(write_through(&mut destination, b"").is_ok());
    }

    struct FailingWriter;

    impl Write for FailingWriter {
        fn write(&mut self, _: &[u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "closed"))
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_drain_errors_propagate() {
        let mut destination = BufferedDestination::new(FailingWriter, 2);
        let err = write_through(&mut destination, b"abc").unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::BrokenPipe);
    }
}
