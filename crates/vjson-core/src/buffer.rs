//! The append-only input buffer.

use vjson_classify::{ErrorKind, ParseError};
use vjson_scan::PAD_SIZE;

/// Default per-parser buffer ceiling: 128 MiB.
pub const DEFAULT_BUFFER_LIMIT: usize = 128 * 1024 * 1024;

/// Accumulates the stream's bytes, always followed by a zeroed pad of
/// [`PAD_SIZE`] bytes so the scanner's final partial window can be loaded
/// whole without reading unowned memory.
///
/// ```text
///   ┌──────────────────────────────┬────────────────┐
///   │ logical bytes (len)          │ zero pad (64)  │
///   └──────────────────────────────┴────────────────┘
/// ```
///
/// Growth is geometric (inherited from `Vec`); a configurable ceiling
/// bounds the worst case and surfaces `capacity-exceeded` instead of
/// unbounded allocation.
#[derive(Clone, Debug)]
pub struct InputBuffer {
  bytes: Vec<u8>,
  len: usize,
  limit: usize,
}

impl Default for InputBuffer {
  fn default() -> Self {
    Self::with_limit(DEFAULT_BUFFER_LIMIT)
  }
}

impl InputBuffer {
  #[must_use]
  pub fn new() -> Self {
    Self::default()
  }

  #[must_use]
  pub fn with_limit(limit: usize) -> Self {
    Self {
      bytes: vec![0; PAD_SIZE],
      len: 0,
      limit,
    }
  }

  /// Logical length (excluding the pad).
  #[must_use]
  pub fn len(&self) -> usize {
    self.len
  }

  #[must_use]
  pub fn is_empty(&self) -> bool {
    self.len == 0
  }

  /// The padded byte view: `len() + PAD_SIZE` bytes, pad zeroed.
  #[must_use]
  pub fn padded(&self) -> &[u8] {
    &self.bytes
  }

  /// The logical bytes only.
  #[must_use]
  pub fn logical(&self) -> &[u8] {
    &self.bytes[..self.len]
  }

  /// Append a chunk, maintaining the pad invariant.
  ///
  /// # Errors
  ///
  /// `capacity-exceeded` (offset = the limit) when the logical length
  /// would pass the configured ceiling. The buffer is left unchanged.
  pub fn append(&mut self, chunk: &[u8]) -> Result<(), ParseError> {
    let new_len = self.len + chunk.len();
    if new_len > self.limit {
      return Err(ParseError::new(ErrorKind::CapacityExceeded, self.limit));
    }
    self.bytes.truncate(self.len);
    self.bytes.extend_from_slice(chunk);
    self.len = new_len;
    self.bytes.resize(new_len + PAD_SIZE, 0);
    Ok(())
  }

  /// Drop everything; offsets restart at zero.
  pub fn reset(&mut self) {
    self.bytes.clear();
    self.bytes.resize(PAD_SIZE, 0);
    self.len = 0;
  }

  /// Release the backing allocation (destroy support).
  pub fn release(&mut self) {
    self.bytes = Vec::new();
    self.len = 0;
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn pad_follows_logical_bytes() {
    let mut buf = InputBuffer::new();
    buf.append(b"{\"a\":1").unwrap();
    assert_eq!(buf.len(), 6);
    assert_eq!(buf.logical(), b"{\"a\":1");
    assert_eq!(buf.padded().len(), 6 + PAD_SIZE);
    assert!(buf.padded()[6..].iter().all(|&b| b == 0));
  }

  #[test]
  fn append_accumulates() {
    let mut buf = InputBuffer::new();
    buf.append(b"abc").unwrap();
    buf.append(b"def").unwrap();
    assert_eq!(buf.logical(), b"abcdef");
    assert!(buf.padded()[6..].iter().all(|&b| b == 0));
  }

  #[test]
  fn limit_is_enforced() {
    let mut buf = InputBuffer::with_limit(4);
    buf.append(b"abcd").unwrap();
    let err = buf.append(b"e").unwrap_err();
    assert_eq!(err.kind, ErrorKind::CapacityExceeded);
    // Unchanged after the failed append.
    assert_eq!(buf.logical(), b"abcd");
  }

  #[test]
  fn reset_restores_empty_state() {
    let mut buf = InputBuffer::new();
    buf.append(b"xyz").unwrap();
    buf.reset();
    assert!(buf.is_empty());
    assert_eq!(buf.padded().len(), PAD_SIZE);
  }
}
