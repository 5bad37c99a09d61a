//! Shared helpers for the integration test and benchmark suites.

#![warn(clippy::pedantic)]

use vjson_core::{ParserStatus, StreamParser};
use vjson_tape::{OwnedValue, Tape, TokenKind};

/// Feed an input through a fresh parser in fixed-size chunks.
#[must_use]
pub fn feed_chunked(input: &[u8], chunk: usize) -> StreamParser {
  let mut parser = StreamParser::new();
  for piece in input.chunks(chunk.max(1)) {
    parser.feed(piece);
  }
  parser
}

/// Canonical string of a parser's current live value.
///
/// # Panics
///
/// Panics when the parser is errored or empty.
#[must_use]
pub fn live_canonical(parser: &StreamParser) -> String {
  parser
    .value()
    .expect("parser not errored")
    .expect("parser has a root")
    .materialize()
    .to_json_string()
}

/// Canonical string of a one-shot parse.
///
/// # Panics
///
/// Panics on error or empty input.
#[must_use]
pub fn oneshot_canonical(input: &[u8]) -> String {
  vjson_core::parse(input)
    .materialize()
    .expect("parse produced a value")
    .to_json_string()
}

/// Statuses a well-behaved chunked feed may pass through.
#[must_use]
pub fn is_terminal(status: ParserStatus) -> bool {
  matches!(status, ParserStatus::Complete | ParserStatus::CompleteEarly)
}

/// Bridge an [`OwnedValue`] into `serde_json` for differential checks.
#[must_use]
pub fn to_serde(value: &OwnedValue) -> serde_json::Value {
  match value {
    OwnedValue::Null => serde_json::Value::Null,
    OwnedValue::Bool(b) => serde_json::Value::Bool(*b),
    OwnedValue::Int(v) => serde_json::Value::from(*v),
    OwnedValue::Uint(v) => serde_json::Value::from(*v),
    OwnedValue::Double(v) => serde_json::Number::from_f64(*v)
      .map_or(serde_json::Value::Null, serde_json::Value::Number),
    OwnedValue::String(s) => serde_json::Value::String(s.clone()),
    OwnedValue::Array(items) => serde_json::Value::Array(items.iter().map(to_serde).collect()),
    OwnedValue::Object(members) => serde_json::Value::Object(
      members
        .iter()
        .map(|(k, v)| (k.clone(), to_serde(v)))
        .collect(),
    ),
  }
}

/// Render every tape token on its own line, synthetic markers included
/// (conformance snapshot format).
#[must_use]
pub fn dump_tape(tape: &Tape, source: &[u8]) -> String {
  use std::fmt::Write;

  let mut out = String::new();
  for (idx, token) in tape.tokens().iter().enumerate() {
    let synth = if token.synthetic { " (synthetic)" } else { "" };
    let span = format!("{}..{}", token.span.start, token.span.end);
    let desc = match token.kind {
      TokenKind::Null => "null".to_string(),
      TokenKind::True => "true".to_string(),
      TokenKind::False => "false".to_string(),
      TokenKind::Int(v) => format!("int {v}"),
      TokenKind::Uint(v) => format!("uint {v}"),
      TokenKind::Double(v) => format!("double {v}"),
      TokenKind::Str(sref) => format!(
        "string {:?}",
        String::from_utf8_lossy(tape.str_bytes(sref, source))
      ),
      TokenKind::Key(sref) => format!(
        "key {:?}",
        String::from_utf8_lossy(tape.str_bytes(sref, source))
      ),
      TokenKind::ObjectOpen { close, count } => {
        format!("object-open close={close} count={count}")
      }
      TokenKind::ObjectClose { open } => format!("object-close open={open}"),
      TokenKind::ArrayOpen { close, count } => {
        format!("array-open close={close} count={count}")
      }
      TokenKind::ArrayClose { open } => format!("array-close open={open}"),
    };
    writeln!(out, "{idx:<4}  {desc:<40} {span}{synth}").expect("writing to a String");
  }
  out
}
