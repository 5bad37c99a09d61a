//! Snapshot transfer: a self-contained blob that reconstructs the tape
//! (and optionally the source buffer) in another thread or process.
//!
//! ```text
//! ┌────────┬─────────┬──────────────────────────────────────────┐
//! │ Offset │ Size    │ Description                              │
//! ├────────┼─────────┼──────────────────────────────────────────┤
//! │ 0x00   │ 4 bytes │ Magic: "VJT\0"                           │
//! │ 0x04   │ 2 bytes │ Version (LE), currently 1                │
//! │ 0x06   │ 2 bytes │ Flags (LE)                               │
//! │ 0x08   │ 4 bytes │ tape_len — tape section bytes (LE)       │
//! │ 0x0C   │ 4 bytes │ arena_len — arena section bytes (LE)     │
//! │ 0x10   │ 4 bytes │ buffer_len — buffer section bytes (LE)   │
//! │ 0x14   │ ...     │ tape ⧺ arena ⧺ buffer sections           │
//! └────────┴─────────┴──────────────────────────────────────────┘
//! ```
//!
//! Flag bits: 0 = strings were escape-decoded into the arena, 1-2 =
//! input format (plain / ndjson-head / json5), 3 = buffer section
//! present, 4-15 = reserved (MUST be 0).
//!
//! Each tape token is a fixed 18-byte record:
//! `tag u8 │ tflags u8 │ span_start u32 │ span_end u32 │ payload u64`.

use bytes::Bytes;
use vjson_tape::{Span, StrRef, StringArena, Tape, TapeValue, Token, TokenKind};

/// Magic bytes: "VJT\0", written raw so byte order never matters.
pub const SNAPSHOT_MAGIC: [u8; 4] = [0x56, 0x4A, 0x54, 0x00];

/// Fixed header size in bytes.
pub const HEADER_SIZE: usize = 20;

/// Current snapshot version.
pub const SNAPSHOT_VERSION: u16 = 1;

const TOKEN_RECORD_SIZE: usize = 18;

const FLAG_ESCAPE_DECODED: u16 = 0b0000_0001;
const FLAG_FORMAT_MASK: u16 = 0b0000_0110;
const FLAG_HAS_BUFFER: u16 = 0b0000_1000;

/// Input format recorded in the snapshot flags.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SnapshotFormat {
  #[default]
  Plain,
  /// The head value of a newline-delimited multi-root stream.
  NdjsonHead,
  /// Preprocessed liberal ("JSON5") input.
  Json5,
}

impl SnapshotFormat {
  fn to_bits(self) -> u16 {
    match self {
      Self::Plain => 0,
      Self::NdjsonHead => 1,
      Self::Json5 => 2,
    }
  }

  fn from_bits(bits: u16) -> Option<Self> {
    match bits {
      0 => Some(Self::Plain),
      1 => Some(Self::NdjsonHead),
      2 => Some(Self::Json5),
      _ => None,
    }
  }
}

/// Snapshot decode failures.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum SnapshotError {
  #[error("invalid magic: expected \"VJT\\0\", got {found:02X?}")]
  InvalidMagic { found: [u8; 4] },

  #[error("unsupported snapshot version {found}")]
  UnsupportedVersion { found: u16 },

  #[error("reserved flag bits set: {value:#06X}")]
  ReservedFlags { value: u16 },

  #[error("snapshot truncated at byte {offset}")]
  Truncated { offset: usize },

  #[error("tape section length {len} is not a whole number of token records")]
  MisalignedTape { len: usize },

  #[error("malformed token record at index {index}")]
  BadToken { index: usize },
}

/// A decoded snapshot: the tape, and the source buffer when it was
/// included.
#[derive(Debug, PartialEq)]
pub struct Snapshot {
  pub tape: Tape,
  pub buffer: Option<Vec<u8>>,
  pub format: SnapshotFormat,
}

impl Snapshot {
  /// Lazy accessor over the carried tape. Requires the buffer section
  /// (zero-copy string references point into it).
  #[must_use]
  pub fn value(&self) -> Option<TapeValue<'_>> {
    let source = self.buffer.as_deref()?;
    TapeValue::root(&self.tape, source)
  }
}

/// Serialize a tape (and optionally its source) into a transfer blob.
#[must_use]
pub fn encode(tape: &Tape, source: Option<&[u8]>, format: SnapshotFormat) -> Bytes {
  let tape_len = tape.len() * TOKEN_RECORD_SIZE;
  let arena = tape.arena().as_bytes();
  let buffer_len = source.map_or(0, <[u8]>::len);

  let mut out = Vec::with_capacity(HEADER_SIZE + tape_len + arena.len() + buffer_len);
  out.extend_from_slice(&SNAPSHOT_MAGIC);
  out.extend_from_slice(&SNAPSHOT_VERSION.to_le_bytes());

  let mut flags = format.to_bits() << 1;
  if !arena.is_empty() {
    flags |= FLAG_ESCAPE_DECODED;
  }
  if source.is_some() {
    flags |= FLAG_HAS_BUFFER;
  }
  out.extend_from_slice(&flags.to_le_bytes());
  out.extend_from_slice(&(tape_len as u32).to_le_bytes());
  out.extend_from_slice(&(arena.len() as u32).to_le_bytes());
  out.extend_from_slice(&(buffer_len as u32).to_le_bytes());

  for token in tape.tokens() {
    write_token(&mut out, token);
  }
  out.extend_from_slice(arena);
  if let Some(source) = source {
    out.extend_from_slice(source);
  }
  Bytes::from(out)
}

/// Parse a transfer blob back into a tape.
///
/// # Errors
///
/// [`SnapshotError`] on bad magic, unknown version, reserved flags,
/// truncation, or malformed token records.
pub fn decode(blob: &[u8]) -> Result<Snapshot, SnapshotError> {
  if blob.len() < HEADER_SIZE {
    return Err(SnapshotError::Truncated { offset: blob.len() });
  }
  if blob[0..4] != SNAPSHOT_MAGIC {
    return Err(SnapshotError::InvalidMagic {
      found: [blob[0], blob[1], blob[2], blob[3]],
    });
  }
  let version = u16::from_le_bytes([blob[4], blob[5]]);
  if version != SNAPSHOT_VERSION {
    return Err(SnapshotError::UnsupportedVersion { found: version });
  }
  let flags = u16::from_le_bytes([blob[6], blob[7]]);
  if flags & !(FLAG_ESCAPE_DECODED | FLAG_FORMAT_MASK | FLAG_HAS_BUFFER) != 0 {
    return Err(SnapshotError::ReservedFlags { value: flags });
  }
  let format = SnapshotFormat::from_bits((flags & FLAG_FORMAT_MASK) >> 1)
    .ok_or(SnapshotError::ReservedFlags { value: flags })?;

  let tape_len = u32::from_le_bytes(blob[8..12].try_into().expect("4 bytes")) as usize;
  let arena_len = u32::from_le_bytes(blob[12..16].try_into().expect("4 bytes")) as usize;
  let buffer_len = u32::from_le_bytes(blob[16..20].try_into().expect("4 bytes")) as usize;

  let expected = HEADER_SIZE + tape_len + arena_len + buffer_len;
  if blob.len() < expected {
    return Err(SnapshotError::Truncated { offset: blob.len() });
  }
  if tape_len % TOKEN_RECORD_SIZE != 0 {
    return Err(SnapshotError::MisalignedTape { len: tape_len });
  }

  let mut tokens = Vec::with_capacity(tape_len / TOKEN_RECORD_SIZE);
  let tape_bytes = &blob[HEADER_SIZE..HEADER_SIZE + tape_len];
  for (index, record) in tape_bytes.chunks_exact(TOKEN_RECORD_SIZE).enumerate() {
    tokens.push(read_token(record, index)?);
  }

  let arena_start = HEADER_SIZE + tape_len;
  let arena = StringArena::from_bytes(blob[arena_start..arena_start + arena_len].to_vec());

  let buffer = (flags & FLAG_HAS_BUFFER != 0).then(|| {
    let buffer_start = arena_start + arena_len;
    blob[buffer_start..buffer_start + buffer_len].to_vec()
  });

  Ok(Snapshot {
    tape: Tape::from_parts(tokens, arena),
    buffer,
    format,
  })
}

fn write_token(out: &mut Vec<u8>, token: &Token) {
  let (tag, sref, payload): (u8, Option<StrRef>, u64) = match token.kind {
    TokenKind::Null => (0, None, 0),
    TokenKind::True => (1, None, 0),
    TokenKind::False => (2, None, 0),
    TokenKind::Int(v) => (3, None, v as u64),
    TokenKind::Uint(v) => (4, None, v),
    TokenKind::Double(v) => (5, None, v.to_bits()),
    TokenKind::Str(sref) => (6, Some(sref), pack_ref(sref)),
    TokenKind::Key(sref) => (7, Some(sref), pack_ref(sref)),
    TokenKind::ObjectOpen { close, count } => {
      (8, None, (u64::from(close) << 32) | u64::from(count))
    }
    TokenKind::ObjectClose { open } => (9, None, u64::from(open)),
    TokenKind::ArrayOpen { close, count } => {
      (10, None, (u64::from(close) << 32) | u64::from(count))
    }
    TokenKind::ArrayClose { open } => (11, None, u64::from(open)),
  };

  let mut tflags = u8::from(token.synthetic);
  if let Some(sref) = sref {
    let kind = match sref {
      StrRef::Source { .. } => 0u8,
      StrRef::Arena { .. } => 1,
      StrRef::Raw { .. } => 2,
    };
    tflags |= kind << 1;
  }

  out.push(tag);
  out.push(tflags);
  out.extend_from_slice(&token.span.start.to_le_bytes());
  out.extend_from_slice(&token.span.end.to_le_bytes());
  out.extend_from_slice(&payload.to_le_bytes());
}

fn pack_ref(sref: StrRef) -> u64 {
  let (start, len) = match sref {
    StrRef::Source { start, len } | StrRef::Arena { start, len } | StrRef::Raw { start, len } => {
      (start, len)
    }
  };
  (u64::from(start) << 32) | u64::from(len)
}

fn read_token(record: &[u8], index: usize) -> Result<Token, SnapshotError> {
  let tag = record[0];
  let tflags = record[1];
  let span = Span {
    start: u32::from_le_bytes(record[2..6].try_into().expect("4 bytes")),
    end: u32::from_le_bytes(record[6..10].try_into().expect("4 bytes")),
  };
  let payload = u64::from_le_bytes(record[10..18].try_into().expect("8 bytes"));

  let unpack_ref = || -> Result<StrRef, SnapshotError> {
    let start = (payload >> 32) as u32;
    let len = payload as u32;
    match (tflags >> 1) & 0b11 {
      0 => Ok(StrRef::Source { start, len }),
      1 => Ok(StrRef::Arena { start, len }),
      2 => Ok(StrRef::Raw { start, len }),
      _ => Err(SnapshotError::BadToken { index }),
    }
  };

  let kind = match tag {
    0 => TokenKind::Null,
    1 => TokenKind::True,
    2 => TokenKind::False,
    3 => TokenKind::Int(payload as i64),
    4 => TokenKind::Uint(payload),
    5 => TokenKind::Double(f64::from_bits(payload)),
    6 => TokenKind::Str(unpack_ref()?),
    7 => TokenKind::Key(unpack_ref()?),
    8 => TokenKind::ObjectOpen {
      close: (payload >> 32) as u32,
      count: payload as u32,
    },
    9 => TokenKind::ObjectClose {
      open: payload as u32,
    },
    10 => TokenKind::ArrayOpen {
      close: (payload >> 32) as u32,
      count: payload as u32,
    },
    11 => TokenKind::ArrayClose {
      open: payload as u32,
    },
    _ => return Err(SnapshotError::BadToken { index }),
  };

  Ok(Token {
    kind,
    span,
    synthetic: tflags & 1 != 0,
  })
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::parser::StreamParser;

  fn snapshot_of(input: &[u8], include_buffer: bool) -> Bytes {
    let mut p = StreamParser::new();
    p.feed(input);
    p.snapshot(include_buffer, SnapshotFormat::Plain)
  }

  #[test]
  fn roundtrip_with_buffer() {
    let input = "{\"name\":\"Ali\u{2603}\",\"n\":[1,2.5,true]}".as_bytes();
    let blob = snapshot_of(input, true);
    let snap = decode(&blob).unwrap();

    assert_eq!(snap.format, SnapshotFormat::Plain);
    assert_eq!(snap.buffer.as_deref(), Some(&input[..]));
    let value = snap.value().unwrap();
    assert_eq!(
      value.materialize().to_json_string(),
      "{\"name\":\"Ali\u{2603}\",\"n\":[1,2.5,true]}"
    );
  }

  #[test]
  fn roundtrip_preserves_synthetic_flags() {
    let blob = snapshot_of(br#"{"partial":"va"#, true);
    let snap = decode(&blob).unwrap();
    let value = snap.value().unwrap();
    assert!(!value.is_complete());
    assert_eq!(
      value.get("partial").unwrap().as_str().unwrap(),
      "va"
    );
  }

  #[test]
  fn buffer_can_be_omitted() {
    let blob = snapshot_of(br#"[1,2,3]"#, false);
    let snap = decode(&blob).unwrap();
    assert!(snap.buffer.is_none());
    assert!(snap.value().is_none());
    assert_eq!(snap.tape.len(), 5);
  }

  #[test]
  fn reject_bad_magic() {
    let mut blob = snapshot_of(b"[]", true).to_vec();
    blob[0..4].copy_from_slice(b"NOPE");
    assert!(matches!(
      decode(&blob),
      Err(SnapshotError::InvalidMagic { .. })
    ));
  }

  #[test]
  fn reject_unsupported_version() {
    let mut blob = snapshot_of(b"[]", true).to_vec();
    blob[4] = 9;
    assert_eq!(
      decode(&blob),
      Err(SnapshotError::UnsupportedVersion { found: 9 })
    );
  }

  #[test]
  fn reject_reserved_flags() {
    let mut blob = snapshot_of(b"[]", true).to_vec();
    blob[7] = 0x80;
    assert!(matches!(
      decode(&blob),
      Err(SnapshotError::ReservedFlags { .. })
    ));
  }

  #[test]
  fn reject_truncation() {
    let blob = snapshot_of(br#"{"a":1}"#, true);
    for cut in [3, HEADER_SIZE - 1, blob.len() - 1] {
      assert!(
        matches!(decode(&blob[..cut]), Err(SnapshotError::Truncated { .. })),
        "cut at {cut}"
      );
    }
  }

  #[test]
  fn escape_flag_reflects_arena_use() {
    let plain = snapshot_of(br#"{"a":"x"}"#, true);
    let escaped = snapshot_of(br#"{"a":"x\ny"}"#, true);
    assert_eq!(plain[6] & 1, 0);
    assert_eq!(escaped[6] & 1, 1);
  }
}
