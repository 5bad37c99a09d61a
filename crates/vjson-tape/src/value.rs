//! The lazy accessor: a view over one tape value that materializes
//! nothing until asked.

use std::borrow::Cow;

use crate::arena::StringArena;
use crate::owned::OwnedValue;
use crate::string::decode_interior;
use crate::tape::Tape;
use crate::token::{StrRef, Token, TokenKind};

/// A cursor over one value on the tape.
///
/// Cheap to copy — it is three words. Field reads walk the tape (linear
/// scan for small objects, cached hash probe for large ones); nothing is
/// allocated until [`materialize`](Self::materialize).
#[derive(Clone, Copy)]
pub struct TapeValue<'a> {
  tape: &'a Tape,
  source: &'a [u8],
  idx: usize,
}

impl<'a> TapeValue<'a> {
  /// The root value of a tape, if any tokens exist.
  #[must_use]
  pub fn root(tape: &'a Tape, source: &'a [u8]) -> Option<Self> {
    if tape.is_empty() {
      None
    } else {
      Some(Self {
        tape,
        source,
        idx: 0,
      })
    }
  }

  /// View an arbitrary token index as a value.
  ///
  /// # Panics
  ///
  /// Panics if `idx` does not start a value.
  #[must_use]
  pub fn at_index(tape: &'a Tape, source: &'a [u8], idx: usize) -> Self {
    assert!(
      tape.get(idx).is_some_and(|t| t.kind.starts_value()),
      "token {idx} does not start a value"
    );
    Self { tape, source, idx }
  }

  #[must_use]
  pub fn token(&self) -> &'a Token {
    &self.tape.tokens()[self.idx]
  }

  #[must_use]
  pub fn token_index(&self) -> usize {
    self.idx
  }

  /// Whether every byte contributing to this node came from real input
  /// rather than autocomplete. For containers this is decided by the
  /// closing delimiter; for scalars by the token itself.
  #[must_use]
  pub fn is_complete(&self) -> bool {
    match self.token().kind {
      TokenKind::ObjectOpen { close, .. } | TokenKind::ArrayOpen { close, .. } => {
        !self.token().synthetic && !self.tape.tokens()[close as usize].synthetic
      }
      _ => !self.token().synthetic,
    }
  }

  #[must_use]
  pub fn is_null(&self) -> bool {
    matches!(self.token().kind, TokenKind::Null)
  }

  #[must_use]
  pub fn is_object(&self) -> bool {
    matches!(self.token().kind, TokenKind::ObjectOpen { .. })
  }

  #[must_use]
  pub fn is_array(&self) -> bool {
    matches!(self.token().kind, TokenKind::ArrayOpen { .. })
  }

  #[must_use]
  pub fn as_bool(&self) -> Option<bool> {
    match self.token().kind {
      TokenKind::True => Some(true),
      TokenKind::False => Some(false),
      _ => None,
    }
  }

  #[must_use]
  pub fn as_i64(&self) -> Option<i64> {
    match self.token().kind {
      TokenKind::Int(v) => Some(v),
      TokenKind::Uint(v) => i64::try_from(v).ok(),
      _ => None,
    }
  }

  #[must_use]
  pub fn as_u64(&self) -> Option<u64> {
    match self.token().kind {
      TokenKind::Uint(v) => Some(v),
      TokenKind::Int(v) => u64::try_from(v).ok(),
      _ => None,
    }
  }

  /// Any numeric token, widened to a double.
  #[must_use]
  pub fn as_f64(&self) -> Option<f64> {
    match self.token().kind {
      TokenKind::Double(v) => Some(v),
      TokenKind::Int(v) => Some(v as f64),
      TokenKind::Uint(v) => Some(v as f64),
      _ => None,
    }
  }

  /// Decoded string bytes. `Raw` references (skipped subtrees) decode
  /// into an owned buffer on the spot — the caller explicitly asked.
  #[must_use]
  pub fn as_str_bytes(&self) -> Option<Cow<'a, [u8]>> {
    match self.token().kind {
      TokenKind::Str(sref) => Some(resolve_ref(self.tape, self.source, sref)),
      _ => None,
    }
  }

  #[must_use]
  pub fn as_str(&self) -> Option<Cow<'a, str>> {
    self.as_str_bytes().map(|bytes| match bytes {
      Cow::Borrowed(b) => String::from_utf8_lossy(b),
      Cow::Owned(v) => Cow::Owned(String::from_utf8_lossy(&v).into_owned()),
    })
  }

  /// Element count: pairs for an object, values for an array.
  #[must_use]
  pub fn len(&self) -> Option<usize> {
    match self.token().kind {
      TokenKind::ObjectOpen { count, .. } | TokenKind::ArrayOpen { count, .. } => {
        Some(count as usize)
      }
      _ => None,
    }
  }

  #[must_use]
  pub fn is_empty(&self) -> Option<bool> {
    self.len().map(|n| n == 0)
  }

  /// Object field lookup by key.
  #[must_use]
  pub fn get(&self, key: &str) -> Option<Self> {
    let value_idx = self.tape.find_key(self.idx, key.as_bytes(), self.source)?;
    Some(Self {
      tape: self.tape,
      source: self.source,
      idx: value_idx,
    })
  }

  /// Array element lookup by index, bounds-checked against the element
  /// count.
  #[must_use]
  pub fn index(&self, i: usize) -> Option<Self> {
    let TokenKind::ArrayOpen { close, count } = self.token().kind else {
      return None;
    };
    if i >= count as usize {
      return None;
    }
    let mut idx = self.idx + 1;
    for _ in 0..i {
      idx = self.tape.skip_value(idx);
    }
    debug_assert!(idx < close as usize);
    Some(Self {
      tape: self.tape,
      source: self.source,
      idx,
    })
  }

  /// Iterate object members in source order. Restartable from the
  /// container token at O(1).
  #[must_use]
  pub fn iter_object(&self) -> ObjectIter<'a> {
    match self.token().kind {
      TokenKind::ObjectOpen { close, .. } => ObjectIter {
        tape: self.tape,
        source: self.source,
        cursor: self.idx + 1,
        end: close as usize,
      },
      _ => ObjectIter {
        tape: self.tape,
        source: self.source,
        cursor: 0,
        end: 0,
      },
    }
  }

  /// Iterate array elements in index order.
  #[must_use]
  pub fn iter_array(&self) -> ArrayIter<'a> {
    match self.token().kind {
      TokenKind::ArrayOpen { close, .. } => ArrayIter {
        tape: self.tape,
        source: self.source,
        cursor: self.idx + 1,
        end: close as usize,
      },
      _ => ArrayIter {
        tape: self.tape,
        source: self.source,
        cursor: 0,
        end: 0,
      },
    }
  }

  /// Produce a plain owned tree for this subtree.
  #[must_use]
  pub fn materialize(&self) -> OwnedValue {
    match self.token().kind {
      TokenKind::Null => OwnedValue::Null,
      TokenKind::True => OwnedValue::Bool(true),
      TokenKind::False => OwnedValue::Bool(false),
      TokenKind::Int(v) => OwnedValue::Int(v),
      TokenKind::Uint(v) => OwnedValue::Uint(v),
      TokenKind::Double(v) => OwnedValue::Double(v),
      TokenKind::Str(_) => {
        let text = self.as_str().expect("token is a string");
        OwnedValue::String(text.into_owned())
      }
      TokenKind::ObjectOpen { .. } => OwnedValue::Object(
        self
          .iter_object()
          .map(|(k, v)| (k.into_owned(), v.materialize()))
          .collect(),
      ),
      TokenKind::ArrayOpen { .. } => {
        OwnedValue::Array(self.iter_array().map(|v| v.materialize()).collect())
      }
      TokenKind::Key(_) | TokenKind::ObjectClose { .. } | TokenKind::ArrayClose { .. } => {
        unreachable!("accessor never points at a non-value token")
      }
    }
  }
}

impl std::fmt::Debug for TapeValue<'_> {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("TapeValue")
      .field("idx", &self.idx)
      .field("kind", &self.token().kind)
      .field("synthetic", &self.token().synthetic)
      .finish()
  }
}

/// Resolve a string reference; `Raw` decodes into an owned buffer.
fn resolve_ref<'a>(tape: &'a Tape, source: &'a [u8], sref: StrRef) -> Cow<'a, [u8]> {
  match sref {
    StrRef::Source { .. } | StrRef::Arena { .. } => {
      Cow::Borrowed(tape.str_bytes(sref, source))
    }
    StrRef::Raw { start, len } => {
      let mut scratch = StringArena::new();
      let end = (start + len) as usize;
      match decode_interior(source, start as usize, end, &mut scratch) {
        Ok(StrRef::Source { .. }) => Cow::Borrowed(&source[start as usize..end]),
        Ok(StrRef::Arena { .. }) => Cow::Owned(scratch.as_bytes().to_vec()),
        _ => Cow::Borrowed(&source[start as usize..end]),
      }
    }
  }
}

/// Object member iterator: `(key, value)` pairs in source order.
pub struct ObjectIter<'a> {
  tape: &'a Tape,
  source: &'a [u8],
  cursor: usize,
  end: usize,
}

impl<'a> Iterator for ObjectIter<'a> {
  type Item = (Cow<'a, str>, TapeValue<'a>);

  fn next(&mut self) -> Option<Self::Item> {
    if self.cursor >= self.end {
      return None;
    }
    let TokenKind::Key(kref) = self.tape.tokens()[self.cursor].kind else {
      return None;
    };
    let key = match resolve_ref(self.tape, self.source, kref) {
      Cow::Borrowed(b) => String::from_utf8_lossy(b),
      Cow::Owned(v) => Cow::Owned(String::from_utf8_lossy(&v).into_owned()),
    };
    let value = TapeValue {
      tape: self.tape,
      source: self.source,
      idx: self.cursor + 1,
    };
    self.cursor = self.tape.skip_value(self.cursor + 1);
    Some((key, value))
  }
}

/// Array element iterator in index order.
pub struct ArrayIter<'a> {
  tape: &'a Tape,
  source: &'a [u8],
  cursor: usize,
  end: usize,
}

impl<'a> Iterator for ArrayIter<'a> {
  type Item = TapeValue<'a>;

  fn next(&mut self) -> Option<Self::Item> {
    if self.cursor >= self.end {
      return None;
    }
    let value = TapeValue {
      tape: self.tape,
      source: self.source,
      idx: self.cursor,
    };
    self.cursor = self.tape.skip_value(self.cursor);
    Some(value)
  }
}
