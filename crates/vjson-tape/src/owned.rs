//! Plain owned JSON trees — the output of `materialize` — and the
//! canonical writer used for round-trip checks and CLI output.

use std::fmt;

/// A fully materialized JSON value.
///
/// Object members keep source (insertion) order; the numeric tags mirror
/// the tape's (`Int` preferred, `Uint` for the high u64 range, `Double`
/// for everything else).
#[derive(Clone, Debug, PartialEq)]
pub enum OwnedValue {
  Null,
  Bool(bool),
  Int(i64),
  Uint(u64),
  Double(f64),
  String(String),
  Array(Vec<OwnedValue>),
  Object(Vec<(String, OwnedValue)>),
}

impl OwnedValue {
  /// Object field lookup (first match in source order).
  #[must_use]
  pub fn get(&self, key: &str) -> Option<&OwnedValue> {
    match self {
      Self::Object(members) => members.iter().find(|(k, _)| k == key).map(|(_, v)| v),
      _ => None,
    }
  }

  #[must_use]
  pub fn index(&self, i: usize) -> Option<&OwnedValue> {
    match self {
      Self::Array(items) => items.get(i),
      _ => None,
    }
  }

  #[must_use]
  pub fn as_str(&self) -> Option<&str> {
    match self {
      Self::String(s) => Some(s),
      _ => None,
    }
  }

  #[must_use]
  pub fn as_bool(&self) -> Option<bool> {
    match self {
      Self::Bool(b) => Some(*b),
      _ => None,
    }
  }

  #[must_use]
  pub fn as_i64(&self) -> Option<i64> {
    match self {
      Self::Int(v) => Some(*v),
      Self::Uint(v) => i64::try_from(*v).ok(),
      _ => None,
    }
  }

  #[must_use]
  pub fn as_f64(&self) -> Option<f64> {
    match self {
      Self::Double(v) => Some(*v),
      Self::Int(v) => Some(*v as f64),
      Self::Uint(v) => Some(*v as f64),
      _ => None,
    }
  }

  /// Serialize to the canonical compact form: no whitespace, members in
  /// stored order, shortest round-tripping number representation.
  #[must_use]
  pub fn to_json_string(&self) -> String {
    let mut out = String::new();
    write_value(&mut out, self);
    out
  }
}

impl fmt::Display for OwnedValue {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.to_json_string())
  }
}

fn write_value(out: &mut String, value: &OwnedValue) {
  match value {
    OwnedValue::Null => out.push_str("null"),
    OwnedValue::Bool(true) => out.push_str("true"),
    OwnedValue::Bool(false) => out.push_str("false"),
    OwnedValue::Int(v) => out.push_str(&v.to_string()),
    OwnedValue::Uint(v) => out.push_str(&v.to_string()),
    OwnedValue::Double(v) => write_double(out, *v),
    OwnedValue::String(s) => write_string(out, s),
    OwnedValue::Array(items) => {
      out.push('[');
      for (i, item) in items.iter().enumerate() {
        if i > 0 {
          out.push(',');
        }
        write_value(out, item);
      }
      out.push(']');
    }
    OwnedValue::Object(members) => {
      out.push('{');
      for (i, (key, val)) in members.iter().enumerate() {
        if i > 0 {
          out.push(',');
        }
        write_string(out, key);
        out.push(':');
        write_value(out, val);
      }
      out.push('}');
    }
  }
}

fn write_double(out: &mut String, v: f64) {
  if v.is_finite() {
    // Shortest round-tripping representation. Integral doubles keep a
    // fractional marker so they re-parse as doubles.
    if v == v.trunc() && v.abs() < 1e16 {
      out.push_str(&format!("{v:.1}"));
    } else {
      out.push_str(&v.to_string());
    }
  } else {
    // JSON has no non-finite literals.
    out.push_str("null");
  }
}

fn write_string(out: &mut String, s: &str) {
  out.push('"');
  for c in s.chars() {
    match c {
      '"' => out.push_str("\\\""),
      '\\' => out.push_str("\\\\"),
      '\n' => out.push_str("\\n"),
      '\r' => out.push_str("\\r"),
      '\t' => out.push_str("\\t"),
      '\u{8}' => out.push_str("\\b"),
      '\u{c}' => out.push_str("\\f"),
      c if (c as u32) < 0x20 => {
        out.push_str(&format!("\\u{:04x}", c as u32));
      }
      c => out.push(c),
    }
  }
  out.push('"');
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn canonical_scalars() {
    assert_eq!(OwnedValue::Null.to_json_string(), "null");
    assert_eq!(OwnedValue::Bool(true).to_json_string(), "true");
    assert_eq!(OwnedValue::Int(-42).to_json_string(), "-42");
    assert_eq!(OwnedValue::Uint(u64::MAX).to_json_string(), "18446744073709551615");
    assert_eq!(OwnedValue::Double(2.5).to_json_string(), "2.5");
    assert_eq!(OwnedValue::Double(1000.0).to_json_string(), "1000.0");
  }

  #[test]
  fn canonical_string_escapes() {
    let v = OwnedValue::String("a\"b\\c\n\u{1}".to_string());
    assert_eq!(v.to_json_string(), r#""a\"b\\c\n\u0001""#);
  }

  #[test]
  fn nested_structure() {
    let v = OwnedValue::Object(vec![
      ("tool".to_string(), OwnedValue::String("search".to_string())),
      (
        "args".to_string(),
        OwnedValue::Array(vec![OwnedValue::Int(1), OwnedValue::Null]),
      ),
    ]);
    assert_eq!(v.to_json_string(), r#"{"tool":"search","args":[1,null]}"#);
  }

  #[test]
  fn non_finite_doubles_become_null() {
    assert_eq!(OwnedValue::Double(f64::INFINITY).to_json_string(), "null");
  }

  #[test]
  fn member_order_is_preserved() {
    let v = OwnedValue::Object(vec![
      ("z".to_string(), OwnedValue::Int(1)),
      ("a".to_string(), OwnedValue::Int(2)),
    ]);
    assert_eq!(v.to_json_string(), r#"{"z":1,"a":2}"#);
    assert_eq!(v.get("a"), Some(&OwnedValue::Int(2)));
  }
}
