//! Structural deep compare, straight over tape and arena bytes.
//!
//! When both sides are tape-backed nothing is materialized: numbers
//! compare under one numeric order, strings compare byte-wise on decoded
//! content, containers walk element by element. A tape side can also be
//! compared against a plain [`OwnedValue`] tree.

use crate::owned::OwnedValue;
use crate::token::TokenKind;
use crate::value::TapeValue;

/// Object key-order policy.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum CompareMode {
  /// Objects are equal when their key sets and per-key values agree; a
  /// same-source-order fast path is attempted first.
  #[default]
  IgnoreKeyOrder,
  /// Objects must agree slot by slot.
  StrictKeyOrder,
}

/// Numeric value used for cross-kind comparison.
#[derive(Clone, Copy, Debug)]
enum Num {
  I(i64),
  U(u64),
  D(f64),
}

fn num_of(kind: &TokenKind) -> Option<Num> {
  match kind {
    TokenKind::Int(v) => Some(Num::I(*v)),
    TokenKind::Uint(v) => Some(Num::U(*v)),
    TokenKind::Double(v) => Some(Num::D(*v)),
    _ => None,
  }
}

fn num_of_owned(value: &OwnedValue) -> Option<Num> {
  match value {
    OwnedValue::Int(v) => Some(Num::I(*v)),
    OwnedValue::Uint(v) => Some(Num::U(*v)),
    OwnedValue::Double(v) => Some(Num::D(*v)),
    _ => None,
  }
}

/// Cross-kind numeric equality: integer pairs compare exactly, any
/// double widens the other side (`-0.0 == 0.0` holds; NaN never appears
/// in JSON).
fn num_eq(a: Num, b: Num) -> bool {
  match (a, b) {
    (Num::I(x), Num::I(y)) => x == y,
    (Num::U(x), Num::U(y)) => x == y,
    (Num::I(x), Num::U(y)) | (Num::U(y), Num::I(x)) => {
      u64::try_from(x).is_ok_and(|x| x == y)
    }
    (Num::D(x), Num::D(y)) => x == y,
    (Num::I(x), Num::D(y)) | (Num::D(y), Num::I(x)) => (x as f64) == y,
    (Num::U(x), Num::D(y)) | (Num::D(y), Num::U(x)) => (x as f64) == y,
  }
}

/// Deep compare of two tape-backed values.
#[must_use]
pub fn tape_eq(a: &TapeValue<'_>, b: &TapeValue<'_>, mode: CompareMode) -> bool {
  let (ka, kb) = (&a.token().kind, &b.token().kind);

  if let (Some(x), Some(y)) = (num_of(ka), num_of(kb)) {
    return num_eq(x, y);
  }

  match (ka, kb) {
    (TokenKind::Null, TokenKind::Null)
    | (TokenKind::True, TokenKind::True)
    | (TokenKind::False, TokenKind::False) => true,
    (TokenKind::Str(_), TokenKind::Str(_)) => a.as_str_bytes() == b.as_str_bytes(),
    (TokenKind::ArrayOpen { .. }, TokenKind::ArrayOpen { .. }) => {
      a.len() == b.len()
        && a
          .iter_array()
          .zip(b.iter_array())
          .all(|(x, y)| tape_eq(&x, &y, mode))
    }
    (TokenKind::ObjectOpen { .. }, TokenKind::ObjectOpen { .. }) => object_eq(a, b, mode),
    _ => false,
  }
}

fn object_eq(a: &TapeValue<'_>, b: &TapeValue<'_>, mode: CompareMode) -> bool {
  if a.len() != b.len() {
    return false;
  }

  // Fast path: both sides in the same source order. Under strict mode
  // this IS the definition; under ignore-order it usually short-circuits
  // the keyed lookups.
  let aligned = a
    .iter_object()
    .zip(b.iter_object())
    .all(|((ka, va), (kb, vb))| ka == kb && tape_eq(&va, &vb, mode));
  if aligned || mode == CompareMode::StrictKeyOrder {
    return aligned;
  }

  // Keyed fallback: every key of `a` must exist in `b` with an equal
  // value. Counts already match, so a bijection follows (absent
  // duplicate keys, which JSON leaves undefined anyway).
  a.iter_object().all(|(key, va)| {
    b.get(&key)
      .is_some_and(|vb| tape_eq(&va, &vb, mode))
  })
}

/// Compare a tape-backed value against a plain owned tree.
#[must_use]
pub fn tape_eq_owned(a: &TapeValue<'_>, b: &OwnedValue, mode: CompareMode) -> bool {
  if let (Some(x), Some(y)) = (num_of(&a.token().kind), num_of_owned(b)) {
    return num_eq(x, y);
  }

  match (&a.token().kind, b) {
    (TokenKind::Null, OwnedValue::Null) => true,
    (TokenKind::True, OwnedValue::Bool(true)) | (TokenKind::False, OwnedValue::Bool(false)) => {
      true
    }
    (TokenKind::Str(_), OwnedValue::String(s)) => {
      a.as_str_bytes().is_some_and(|bytes| bytes.as_ref() == s.as_bytes())
    }
    (TokenKind::ArrayOpen { .. }, OwnedValue::Array(items)) => {
      a.len() == Some(items.len())
        && a
          .iter_array()
          .zip(items)
          .all(|(x, y)| tape_eq_owned(&x, y, mode))
    }
    (TokenKind::ObjectOpen { .. }, OwnedValue::Object(members)) => {
      if a.len() != Some(members.len()) {
        return false;
      }
      match mode {
        CompareMode::StrictKeyOrder => a
          .iter_object()
          .zip(members)
          .all(|((ka, va), (kb, vb))| ka.as_ref() == kb && tape_eq_owned(&va, vb, mode)),
        CompareMode::IgnoreKeyOrder => members.iter().all(|(key, vb)| {
          a.get(key)
            .is_some_and(|va| tape_eq_owned(&va, vb, mode))
        }),
      }
    }
    _ => false,
  }
}

/// Compare two plain owned trees under the same rules.
#[must_use]
pub fn owned_eq(a: &OwnedValue, b: &OwnedValue, mode: CompareMode) -> bool {
  if let (Some(x), Some(y)) = (num_of_owned(a), num_of_owned(b)) {
    return num_eq(x, y);
  }

  match (a, b) {
    (OwnedValue::Null, OwnedValue::Null) => true,
    (OwnedValue::Bool(x), OwnedValue::Bool(y)) => x == y,
    (OwnedValue::String(x), OwnedValue::String(y)) => x == y,
    (OwnedValue::Array(xs), OwnedValue::Array(ys)) => {
      xs.len() == ys.len() && xs.iter().zip(ys).all(|(x, y)| owned_eq(x, y, mode))
    }
    (OwnedValue::Object(xs), OwnedValue::Object(ys)) => {
      if xs.len() != ys.len() {
        return false;
      }
      match mode {
        CompareMode::StrictKeyOrder => xs
          .iter()
          .zip(ys)
          .all(|((kx, vx), (ky, vy))| kx == ky && owned_eq(vx, vy, mode)),
        CompareMode::IgnoreKeyOrder => xs.iter().all(|(key, vx)| {
          b.get(key).is_some_and(|vy| owned_eq(vx, vy, mode))
        }),
      }
    }
    _ => false,
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn obj(members: &[(&str, OwnedValue)]) -> OwnedValue {
    OwnedValue::Object(
      members
        .iter()
        .map(|(k, v)| ((*k).to_string(), v.clone()))
        .collect(),
    )
  }

  #[test]
  fn numeric_cross_kind() {
    assert!(owned_eq(
      &OwnedValue::Int(1),
      &OwnedValue::Double(1.0),
      CompareMode::IgnoreKeyOrder
    ));
    assert!(owned_eq(
      &OwnedValue::Uint(5),
      &OwnedValue::Int(5),
      CompareMode::IgnoreKeyOrder
    ));
    assert!(!owned_eq(
      &OwnedValue::Int(-1),
      &OwnedValue::Uint(u64::MAX),
      CompareMode::IgnoreKeyOrder
    ));
    // -0.0 == 0.0
    assert!(owned_eq(
      &OwnedValue::Double(-0.0),
      &OwnedValue::Double(0.0),
      CompareMode::IgnoreKeyOrder
    ));
  }

  #[test]
  fn key_order_modes() {
    let ab = obj(&[("a", OwnedValue::Int(1)), ("b", OwnedValue::Int(2))]);
    let ba = obj(&[("b", OwnedValue::Int(2)), ("a", OwnedValue::Int(1))]);
    assert!(owned_eq(&ab, &ba, CompareMode::IgnoreKeyOrder));
    assert!(!owned_eq(&ab, &ba, CompareMode::StrictKeyOrder));
    assert!(owned_eq(&ab, &ab, CompareMode::StrictKeyOrder));
  }

  #[test]
  fn shape_mismatches() {
    assert!(!owned_eq(
      &OwnedValue::Null,
      &OwnedValue::Bool(false),
      CompareMode::IgnoreKeyOrder
    ));
    let short = OwnedValue::Array(vec![OwnedValue::Int(1)]);
    let long = OwnedValue::Array(vec![OwnedValue::Int(1), OwnedValue::Int(2)]);
    assert!(!owned_eq(&short, &long, CompareMode::IgnoreKeyOrder));
  }
}
