//! One-shot parsing: classify, parse and autocomplete a whole buffer in
//! a single call.

use vjson_classify::ParseError;
use vjson_tape::{OwnedValue, TapeValue};

use crate::parser::{ParserOptions, ParserStatus, StreamParser};

/// The result of a one-shot parse. Owns the parser (buffer, tape,
/// arena); values are lazy accessors over the tape and materialize only
/// on demand.
#[derive(Debug)]
pub struct Parsed {
  parser: StreamParser,
}

impl Parsed {
  #[must_use]
  pub fn status(&self) -> ParserStatus {
    self.parser.status()
  }

  /// Lazy accessor over the parsed value. For an incomplete input this
  /// is the autocompleted view (check
  /// [`is_complete`](TapeValue::is_complete) per node); `None` on error
  /// or empty input.
  #[must_use]
  pub fn value(&self) -> Option<TapeValue<'_>> {
    self.parser.tape_value()
  }

  /// Bytes past the first value when the status is complete-early.
  #[must_use]
  pub fn remaining(&self) -> Option<&[u8]> {
    self.parser.remaining()
  }

  #[must_use]
  pub fn error(&self) -> Option<ParseError> {
    self.parser.error()
  }

  /// Materialize the whole value as a plain tree.
  #[must_use]
  pub fn materialize(&self) -> Option<OwnedValue> {
    self.value().map(|v| v.materialize())
  }

  /// The underlying tape (inspection, snapshots).
  #[must_use]
  pub fn tape(&self) -> &vjson_tape::Tape {
    self.parser.tape()
  }

  /// The source bytes the tape's spans index into.
  #[must_use]
  pub fn source(&self) -> &[u8] {
    self.parser.source_padded()
  }
}

/// Parse a complete buffer. Trailing content after the first value
/// reports [`ParserStatus::CompleteEarly`] with the tail available via
/// [`Parsed::remaining`].
#[must_use]
pub fn parse(bytes: &[u8]) -> Parsed {
  parse_with_options(bytes, ParserOptions::default())
}

/// Parse demanding a single value: trailing content is a
/// `trailing-content` error instead of complete-early.
#[must_use]
pub fn parse_single(bytes: &[u8]) -> Parsed {
  parse_with_options(
    bytes,
    ParserOptions {
      single_value: true,
      ..ParserOptions::default()
    },
  )
}

/// Parse demanding one whole value: both trailing content and an
/// incomplete prefix are errors (`trailing-content`, or
/// `incomplete-object` / `incomplete-array` by the innermost open
/// container).
#[must_use]
pub fn parse_complete(bytes: &[u8]) -> Parsed {
  let mut parsed = parse_with_options(
    bytes,
    ParserOptions {
      single_value: true,
      ..ParserOptions::default()
    },
  );
  parsed.parser.demand_complete();
  parsed
}

/// Parse a complete buffer with explicit options.
#[must_use]
pub fn parse_with_options(bytes: &[u8], options: ParserOptions) -> Parsed {
  let mut parser = StreamParser::with_options(options);
  parser.feed(bytes);
  parser.end();
  Parsed { parser }
}
