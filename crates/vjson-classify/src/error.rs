use std::fmt;

/// The closed set of parse failure kinds, shared by the classifier, the
/// tape builder and the streaming parser.
///
/// Kinds map one-to-one onto the surface error taxonomy:
///
/// ```text
/// ┌───────────────────────────────┬─────────────────────────────────────┐
/// │ Kind                          │ Produced when                       │
/// ├───────────────────────────────┼─────────────────────────────────────┤
/// │ InvalidNumberLiteral          │ number grammar violated (0 then     │
/// │                               │ digit, bare minus at end, …)        │
/// │ InvalidEscape                 │ backslash followed by a byte        │
/// │                               │ outside " \ / b f n r t u          │
/// │ InvalidUnicodeCodePoint       │ bad \uXXXX hex, lone or mispaired   │
/// │                               │ surrogate                           │
/// │ InvalidLiteral                │ malformed true/false/null, or       │
/// │                               │ garbage where a value must start    │
/// │ UnescapedControlCharacter     │ raw byte < 0x20 inside a string     │
/// │ UnmatchedDelimiter            │ closing delimiter with no open, or  │
/// │                               │ a closer where a value must start   │
/// │ ExpectedColon                 │ object key not followed by `:`      │
/// │ ExpectedKey                   │ object member not starting with `"` │
/// │ ExpectedArrayCommaOrEnd       │ array element not followed by `,]`  │
/// │ ExpectedObjectCommaOrEnd      │ object value not followed by `,}`   │
/// │ IncompleteArray               │ single-value parse of an unclosed   │
/// │                               │ array                               │
/// │ IncompleteObject              │ single-value parse of an unclosed   │
/// │                               │ object                              │
/// │ TrailingContent               │ single-value parse with bytes after │
/// │                               │ the first value                     │
/// │ DepthExceeded                 │ container nesting past the ceiling  │
/// │ CapacityExceeded              │ buffer growth past the per-parser   │
/// │                               │ cap                                 │
/// └───────────────────────────────┴─────────────────────────────────────┘
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
  InvalidNumberLiteral,
  InvalidEscape,
  InvalidUnicodeCodePoint,
  InvalidLiteral,
  UnescapedControlCharacter,
  UnmatchedDelimiter,
  ExpectedColon,
  ExpectedKey,
  ExpectedArrayCommaOrEnd,
  ExpectedObjectCommaOrEnd,
  IncompleteArray,
  IncompleteObject,
  TrailingContent,
  DepthExceeded,
  CapacityExceeded,
}

impl ErrorKind {
  /// Stable kebab-case name, used by the CLI and in error messages.
  #[must_use]
  pub fn as_str(self) -> &'static str {
    match self {
      Self::InvalidNumberLiteral => "invalid-number-literal",
      Self::InvalidEscape => "invalid-escape",
      Self::InvalidUnicodeCodePoint => "invalid-unicode-code-point",
      Self::InvalidLiteral => "invalid-literal",
      Self::UnescapedControlCharacter => "unescaped-control-character",
      Self::UnmatchedDelimiter => "unmatched-delimiter",
      Self::ExpectedColon => "expected-colon",
      Self::ExpectedKey => "expected-key",
      Self::ExpectedArrayCommaOrEnd => "expected-array-comma-or-end",
      Self::ExpectedObjectCommaOrEnd => "expected-object-comma-or-end",
      Self::IncompleteArray => "incomplete-array",
      Self::IncompleteObject => "incomplete-object",
      Self::TrailingContent => "trailing-content",
      Self::DepthExceeded => "depth-exceeded",
      Self::CapacityExceeded => "capacity-exceeded",
    }
  }
}

impl fmt::Display for ErrorKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

/// A parse failure: the kind plus the byte offset at which the input
/// stopped being a prefix of any legal JSON document.
#[derive(Clone, Copy, Debug, thiserror::Error, PartialEq, Eq)]
#[error("{kind} at byte {offset}")]
pub struct ParseError {
  pub kind: ErrorKind,
  pub offset: usize,
}

impl ParseError {
  #[must_use]
  pub fn new(kind: ErrorKind, offset: usize) -> Self {
    Self { kind, offset }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn display_is_kebab_case_with_offset() {
    let err = ParseError::new(ErrorKind::ExpectedColon, 12);
    assert_eq!(err.to_string(), "expected-colon at byte 12");
  }

  #[test]
  fn kind_names_are_stable() {
    assert_eq!(ErrorKind::InvalidNumberLiteral.as_str(), "invalid-number-literal");
    assert_eq!(ErrorKind::DepthExceeded.as_str(), "depth-exceeded");
  }
}
