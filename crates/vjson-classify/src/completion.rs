//! Autocomplete: the minimal suffix that turns an incomplete prefix into
//! a legal JSON document.

use crate::classifier::{Classifier, Container, Expect, Status, Tail};

/// The classifier's full verdict over the bytes consumed so far.
///
/// For an incomplete prefix, `buffer[..len - trim] ⧺ suffix` is a legal
/// JSON document:
///
/// ```text
///   {"items":[1,2,        →  trim 0, suffix `null]}`
///   [1, 2.5e-             →  trim 2, suffix `]`       ([1, 2.5])
///   {"a":1,               →  trim 1, suffix `}`
///   "esc\                 →  trim 1, suffix `"`
/// ```
///
/// `trim` drops trailing real bytes that cannot survive on their own: a
/// pending backslash, a partial or unpaired `\uXXXX` escape, the dangling
/// `.`/`e`/`e±` of a number, or an object's trailing comma.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Completion {
  pub status: Status,
  pub suffix: Vec<u8>,
  pub trim: usize,
}

impl Completion {
  /// Apply this completion to the bytes it was computed from.
  #[must_use]
  pub fn apply(&self, bytes: &[u8]) -> Vec<u8> {
    let keep = bytes.len().saturating_sub(self.trim);
    let mut out = Vec::with_capacity(keep + self.suffix.len());
    out.extend_from_slice(&bytes[..keep]);
    out.extend_from_slice(&self.suffix);
    out
  }
}

impl Classifier {
  /// Compute status, suffix and trim for the current state.
  ///
  /// The suffix is empty unless the status is [`Status::Incomplete`].
  /// Autocomplete is idempotent: applying the completion and
  /// re-classifying yields `Complete` with an empty suffix.
  #[must_use]
  pub fn completion(&self) -> Completion {
    let status = self.status();
    if status != Status::Incomplete {
      return Completion {
        status,
        suffix: Vec::new(),
        trim: 0,
      };
    }

    let mut suffix = Vec::new();
    let mut trim = 0;

    match self.tail() {
      Tail::String {
        is_key, clean_end, ..
      } => {
        trim = self.pos() - clean_end;
        suffix.push(b'"');
        if is_key {
          // A key alone is not legal; give it a null value.
          suffix.extend_from_slice(b":null");
        }
      }
      Tail::Number { trunc, .. } => {
        // Drop the dangling `.` / `e` / `e±` so the digits stand alone.
        trim = self.pos() - trunc;
      }
      Tail::Atom { start, atom } => {
        let consumed = self.pos() - start;
        suffix.extend_from_slice(&atom.literal()[consumed..]);
      }
      Tail::None => match self.expect() {
        Expect::Value => suffix.extend_from_slice(b"null"),
        Expect::Colon => suffix.extend_from_slice(b":null"),
        Expect::Key => {
          // `{"a":1,` — drop the comma (and any whitespace after it)
          // rather than invent a key.
          trim = self.pos() - self.last_comma;
        }
        Expect::ValueOrEnd | Expect::KeyOrEnd | Expect::CommaOrEnd => {}
        Expect::Done => unreachable!("Done classifies as complete"),
      },
    }

    for frame in self.stack.iter().rev() {
      suffix.push(match frame {
        Container::Object => b'}',
        Container::Array => b']',
      });
    }

    Completion {
      status,
      suffix,
      trim,
    }
  }

  /// One-shot: classify a whole buffer and compute its completion.
  #[must_use]
  pub fn complete_input(bytes: &[u8]) -> Completion {
    let mut c = Self::new();
    c.advance(bytes);
    c.completion()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn completed(input: &[u8]) -> Vec<u8> {
    Classifier::complete_input(input).apply(input)
  }

  fn classify_eof(bytes: &[u8]) -> Status {
    let mut c = Classifier::new();
    c.advance(bytes);
    c.status_at_eof()
  }

  #[track_caller]
  fn assert_completes_to(input: &[u8], expected: &[u8]) {
    let out = completed(input);
    assert_eq!(
      out,
      expected,
      "completion of {:?} produced {:?}",
      String::from_utf8_lossy(input),
      String::from_utf8_lossy(&out)
    );
    // The completed document must parse as a complete value.
    assert_eq!(classify_eof(&out), Status::Complete);
  }

  #[test]
  fn partial_string_value() {
    assert_completes_to(b"{\"name\":\"Ali", b"{\"name\":\"Ali\"}");
  }

  #[test]
  fn partial_key() {
    assert_completes_to(b"{\"na", b"{\"na\":null}");
  }

  #[test]
  fn key_without_colon() {
    assert_completes_to(b"{\"a\"", b"{\"a\":null}");
  }

  #[test]
  fn colon_without_value() {
    assert_completes_to(b"{\"a\":", b"{\"a\":null}");
  }

  #[test]
  fn array_comma_fills_null() {
    assert_completes_to(b"{\"items\":[1,2,", b"{\"items\":[1,2,null]}");
  }

  #[test]
  fn object_trailing_comma_dropped() {
    assert_completes_to(b"{\"a\":1,", b"{\"a\":1}");
    assert_completes_to(b"{\"a\":1,  ", b"{\"a\":1}");
  }

  #[test]
  fn dangling_number_tail_truncated() {
    assert_completes_to(b"[1, 2.5e-", b"[1, 2.5]");
    assert_completes_to(b"[1, 2.", b"[1, 2]");
    assert_completes_to(b"[3e", b"[3]");
    assert_completes_to(b"12.", b"12");
  }

  #[test]
  fn partial_atoms() {
    assert_completes_to(b"tru", b"true");
    assert_completes_to(b"fals", b"false");
    assert_completes_to(b"n", b"null");
    assert_completes_to(b"{\"flag\":tru", b"{\"flag\":true}");
  }

  #[test]
  fn pending_escape_dropped() {
    assert_completes_to(b"\"esc\\", b"\"esc\"");
  }

  #[test]
  fn partial_unicode_escape_dropped() {
    assert_completes_to(b"\"\\uD8", b"\"\"");
    assert_completes_to(b"\"ab\\u00", b"\"ab\"");
  }

  #[test]
  fn unpaired_high_surrogate_dropped() {
    // A complete \uD83D with no low half yet cannot be closed as-is;
    // the whole escape is trimmed so the completion stays legal.
    assert_completes_to(b"\"\\uD83D", b"\"\"");
    assert_completes_to(b"\"hi\\uD83D\\uDE", b"\"hi\"");
  }

  #[test]
  fn nested_containers_closed_in_order() {
    assert_completes_to(b"{\"a\":[{\"b\":", b"{\"a\":[{\"b\":null}]}");
    assert_completes_to(b"[[[", b"[[[]]]");
    assert_completes_to(b"{", b"{}");
    assert_completes_to(b"[", b"[]");
  }

  #[test]
  fn root_before_value() {
    assert_completes_to(b"", b"null");
    assert_completes_to(b"  ", b"  null");
  }

  #[test]
  fn trailing_number_is_kept_whole() {
    assert_completes_to(b"12", b"12");
    assert_completes_to(b"[1, 2", b"[1, 2]");
  }

  #[test]
  fn complete_input_has_empty_suffix() {
    let c = Classifier::complete_input(b"{\"a\":1}");
    assert_eq!(c.status, Status::Complete);
    assert!(c.suffix.is_empty());
    assert_eq!(c.trim, 0);
  }

  #[test]
  fn autocomplete_is_idempotent() {
    let inputs: &[&[u8]] = &[
      b"{\"name\":\"Ali",
      b"{\"items\":[1,2,",
      b"[1, 2.5e-",
      b"{\"a\":1,",
      b"tru",
      b"",
    ];
    for input in inputs {
      let once = completed(input);
      let twice = completed(&once);
      assert_eq!(once, twice, "input {input:?}");
    }
  }

  #[test]
  fn invalid_input_gets_no_suffix() {
    let c = Classifier::complete_input(b"[}");
    assert!(c.status.is_invalid());
    assert!(c.suffix.is_empty());
  }
}
