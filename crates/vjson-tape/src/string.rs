//! String decoding: the zero-copy fast path, full escape expansion, and
//! the incremental decoder for a string still open across feeds.

use vjson_classify::{ErrorKind, ParseError};

use crate::arena::StringArena;
use crate::token::StrRef;

/// Whether a string interior needs decoding at all.
#[must_use]
pub fn has_escape(interior: &[u8]) -> bool {
  interior.contains(&b'\\')
}

/// Decode a closed string interior (the bytes between the quotes).
///
/// Escape-free interiors return a zero-copy [`StrRef::Source`]; anything
/// with a backslash is expanded into the arena.
///
/// # Errors
///
/// Invalid escapes, bad `\uXXXX` hex, mispaired surrogates, raw control
/// characters.
pub fn decode_interior(
  source: &[u8],
  start: usize,
  end: usize,
  arena: &mut StringArena,
) -> Result<StrRef, ParseError> {
  let interior = &source[start..end];
  if !has_escape(interior) {
    return Ok(StrRef::Source {
      start: start as u32,
      len: (end - start) as u32,
    });
  }
  let arena_start = arena.len();
  decode_region(interior, start, arena)?;
  Ok(StrRef::Arena {
    start: arena_start,
    len: arena.len() - arena_start,
  })
}

/// Expand one region of string content into the arena.
///
/// The region must not end inside an escape sequence (the classifier's
/// `clean_end` guarantees this for in-flight strings; closed strings end
/// at their quote).
fn decode_region(region: &[u8], abs: usize, arena: &mut StringArena) -> Result<(), ParseError> {
  let mut i = 0;
  while i < region.len() {
    let b = region[i];
    if b == b'\\' {
      i += decode_escape(&region[i..], abs + i, arena)?;
    } else if b < 0x20 {
      return Err(ParseError::new(
        ErrorKind::UnescapedControlCharacter,
        abs + i,
      ));
    } else {
      // Plain run (including UTF-8 continuation bytes) — copy through
      // to the next backslash or control byte.
      let run_end = region[i..]
        .iter()
        .position(|&b| b == b'\\' || b < 0x20)
        .map_or(region.len(), |p| i + p);
      arena.extend(&region[i..run_end]);
      i = run_end;
    }
  }
  Ok(())
}

/// Decode one escape sequence starting at a backslash; returns the
/// number of source bytes consumed.
fn decode_escape(bytes: &[u8], abs: usize, arena: &mut StringArena) -> Result<usize, ParseError> {
  let Some(&selector) = bytes.get(1) else {
    return Err(ParseError::new(ErrorKind::InvalidEscape, abs));
  };
  match selector {
    b'"' => arena.push(b'"'),
    b'\\' => arena.push(b'\\'),
    b'/' => arena.push(b'/'),
    b'b' => arena.push(0x08),
    b'f' => arena.push(0x0C),
    b'n' => arena.push(b'\n'),
    b'r' => arena.push(b'\r'),
    b't' => arena.push(b'\t'),
    b'u' => {
      let high = parse_hex4(bytes.get(2..6), abs)?;
      if (0xDC00..=0xDFFF).contains(&high) {
        return Err(ParseError::new(ErrorKind::InvalidUnicodeCodePoint, abs));
      }
      if (0xD800..=0xDBFF).contains(&high) {
        // Surrogate pair: the low half must follow immediately.
        if bytes.get(6..8) != Some(b"\\u".as_slice()) {
          return Err(ParseError::new(ErrorKind::InvalidUnicodeCodePoint, abs));
        }
        let low = parse_hex4(bytes.get(8..12), abs + 6)?;
        if !(0xDC00..=0xDFFF).contains(&low) {
          return Err(ParseError::new(ErrorKind::InvalidUnicodeCodePoint, abs + 6));
        }
        let cp = 0x10000 + ((u32::from(high) - 0xD800) << 10) + (u32::from(low) - 0xDC00);
        let c = char::from_u32(cp)
          .ok_or(ParseError::new(ErrorKind::InvalidUnicodeCodePoint, abs))?;
        arena.push_char(c);
        return Ok(12);
      }
      let c = char::from_u32(u32::from(high))
        .ok_or(ParseError::new(ErrorKind::InvalidUnicodeCodePoint, abs))?;
      arena.push_char(c);
      return Ok(6);
    }
    _ => return Err(ParseError::new(ErrorKind::InvalidEscape, abs)),
  }
  Ok(2)
}

fn parse_hex4(bytes: Option<&[u8]>, abs: usize) -> Result<u16, ParseError> {
  let bytes = bytes.ok_or(ParseError::new(ErrorKind::InvalidUnicodeCodePoint, abs))?;
  let mut acc: u16 = 0;
  for &b in bytes {
    let v = match b {
      b'0'..=b'9' => b - b'0',
      b'a'..=b'f' => b - b'a' + 10,
      b'A'..=b'F' => b - b'A' + 10,
      _ => return Err(ParseError::new(ErrorKind::InvalidUnicodeCodePoint, abs)),
    };
    acc = (acc << 4) | u16::from(v);
  }
  Ok(acc)
}

/// Incremental decoder for the one string that can be open at the buffer
/// tail.
///
/// Every source byte is decoded exactly once, no matter how many feeds
/// the string spans. As long as no escape has been seen the decoder
/// stays zero-copy (the decoded content *is* the source slice); the
/// first backslash copies the plain prefix into the arena and switches
/// to append mode.
#[derive(Clone, Copy, Debug)]
pub struct OpenString {
  /// Absolute offset of the opening quote.
  pub start: usize,
  /// Next source byte not yet decoded.
  src_next: usize,
  /// Set once escapes forced a copy into the arena.
  arena_start: Option<u32>,
}

impl OpenString {
  #[must_use]
  pub fn new(open_quote: usize) -> Self {
    Self {
      start: open_quote,
      src_next: open_quote + 1,
      arena_start: None,
    }
  }

  /// Decode through `clean_end` (exclusive). The region
  /// `src_next..clean_end` never ends inside an escape sequence.
  ///
  /// # Errors
  ///
  /// Propagates decode failures; the classifier normally rejects these
  /// first.
  pub fn advance(
    &mut self,
    source: &[u8],
    clean_end: usize,
    arena: &mut StringArena,
  ) -> Result<(), ParseError> {
    if clean_end <= self.src_next {
      return Ok(());
    }
    let region = &source[self.src_next..clean_end];

    if self.arena_start.is_none() {
      match region.iter().position(|&b| b == b'\\') {
        None => {
          // Still escape-free: the source slice is the content.
          self.src_next = clean_end;
          return Ok(());
        }
        Some(first_escape) => {
          // Copy everything plain so far, then fall into append mode.
          let arena_start = arena.len();
          arena.extend(&source[self.start + 1..self.src_next + first_escape]);
          self.arena_start = Some(arena_start);
          self.src_next += first_escape;
        }
      }
    }

    decode_region(&source[self.src_next..clean_end], self.src_next, arena)?;
    self.src_next = clean_end;
    Ok(())
  }

  /// Decoded content so far, for the synthetic token of a still-open
  /// string.
  #[must_use]
  pub fn current_ref(&self, arena: &StringArena) -> StrRef {
    match self.arena_start {
      Some(start) => StrRef::Arena {
        start,
        len: arena.len() - start,
      },
      None => StrRef::Source {
        start: (self.start + 1) as u32,
        len: (self.src_next - self.start - 1) as u32,
      },
    }
  }

  /// Source offset the next delta batch starts from (everything before
  /// it has been decoded in an earlier feed).
  #[must_use]
  pub fn decoded_upto(&self) -> usize {
    self.src_next
  }

  /// Close the string at its final quote and produce the permanent
  /// reference.
  ///
  /// # Errors
  ///
  /// Propagates decode failures from the last region.
  pub fn finish(
    mut self,
    source: &[u8],
    close_quote: usize,
    arena: &mut StringArena,
  ) -> Result<StrRef, ParseError> {
    self.advance(source, close_quote, arena)?;
    Ok(self.current_ref(arena))
  }
}
