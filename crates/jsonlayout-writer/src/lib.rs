//! # jsonlayout-writer - Fixed-Capacity Streaming JSON
//!
//! The output layer of `jsonlayout`: a byte buffer that never grows and a
//! JSON token writer bound to it.
//!
//! - [`FixedBuffer`]: bounded byte buffer; the first write that does not fit
//!   fails with [`WriteError::Overflow`] and the buffer stays overflowed until
//!   [`FixedBuffer::reset`].
//! - [`JsonWriter`]: start/end object and array, field names, strings,
//!   numbers, booleans, null, raw fragments. Tracks structural depth, supports
//!   compact and pretty output, optional null filtering and string
//!   truncation.
//!
//! Both types are designed for reuse: allocate once, then `reset()` between
//! documents.

mod buffer;
mod error;
mod writer;

pub use buffer::FixedBuffer;
pub use error::{Result, WriteError};
pub use writer::{JsonWriter, WriterOptions};
