//! Tape token representation.

/// Sentinel for a container-open token whose matching close has not been
/// seen yet. Patched in place when the close (real or synthetic) arrives.
pub const UNRESOLVED: u32 = u32::MAX;

/// Where a string's decoded bytes live.
///
/// ```text
/// ┌────────┬──────────────────────────────────────────────────────────┐
/// │ Source │ escape-free: the decoded text IS the source slice        │
/// │        │ (zero-copy fast path)                                    │
/// │ Arena  │ contained escapes: decoded bytes were appended to the    │
/// │        │ string arena                                             │
/// │ Raw    │ contained escapes but sits under a skip path: the source │
/// │        │ slice still holds the escape sequences, never decoded    │
/// └────────┴──────────────────────────────────────────────────────────┘
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StrRef {
  Source { start: u32, len: u32 },
  Arena { start: u32, len: u32 },
  Raw { start: u32, len: u32 },
}

impl StrRef {
  /// Decoded length in bytes. Meaningless for `Raw`, which is never
  /// surfaced to accessors.
  #[must_use]
  pub fn len(self) -> u32 {
    match self {
      Self::Source { len, .. } | Self::Arena { len, .. } | Self::Raw { len, .. } => len,
    }
  }

  #[must_use]
  pub fn is_empty(self) -> bool {
    self.len() == 0
  }
}

/// The byte range of source input a token was produced from.
///
/// For synthetic tokens the span covers the real bytes the token derives
/// from (a truncated number literal, a partial string interior), or is
/// empty at the buffer end for pure fill-ins (`null`, closers).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Span {
  pub start: u32,
  pub end: u32,
}

impl Span {
  #[must_use]
  pub fn new(start: usize, end: usize) -> Self {
    Self {
      start: start as u32,
      end: end as u32,
    }
  }
}

/// A tape token tag plus its payload.
///
/// Container-open tokens carry the index of their matching close and the
/// element count (pairs for objects, values for arrays); closes point
/// back at their open. Both sides are patched in place as closes arrive,
/// so a walker can jump over any subtree in O(1).
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum TokenKind {
  Null,
  True,
  False,
  /// Signed 64-bit integer (preferred tag for any integer that fits).
  Int(i64),
  /// Unsigned 64-bit integer too large for `i64`.
  Uint(u64),
  Double(f64),
  Str(StrRef),
  Key(StrRef),
  ObjectOpen { close: u32, count: u32 },
  ObjectClose { open: u32 },
  ArrayOpen { close: u32, count: u32 },
  ArrayClose { open: u32 },
}

impl TokenKind {
  /// True for tokens that begin a value (everything except keys and
  /// container closes).
  #[must_use]
  pub fn starts_value(&self) -> bool {
    !matches!(
      self,
      Self::Key(_) | Self::ObjectClose { .. } | Self::ArrayClose { .. }
    )
  }
}

/// One tape entry.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Token {
  pub kind: TokenKind,
  pub span: Span,
  /// Produced by the autocompleter rather than real input. Synthetic
  /// tokens form a rebuilt tail after every feed; committed tokens are
  /// never synthetic.
  pub synthetic: bool,
}

impl Token {
  #[must_use]
  pub fn real(kind: TokenKind, span: Span) -> Self {
    Self {
      kind,
      span,
      synthetic: false,
    }
  }

  #[must_use]
  pub fn synthetic(kind: TokenKind, span: Span) -> Self {
    Self {
      kind,
      span,
      synthetic: true,
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn starts_value_classification() {
    assert!(TokenKind::Null.starts_value());
    assert!(TokenKind::Int(3).starts_value());
    assert!(
      TokenKind::ObjectOpen {
        close: UNRESOLVED,
        count: 0
      }
      .starts_value()
    );
    assert!(!TokenKind::Key(StrRef::Source { start: 0, len: 1 }).starts_value());
    assert!(!TokenKind::ArrayClose { open: 0 }.starts_value());
  }
}
