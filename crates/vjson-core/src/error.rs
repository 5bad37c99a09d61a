use vjson_classify::ParseError;

/// Failures surfaced by parser operations.
///
/// `feed` itself never returns an error — it latches the parser into the
/// error status and records the underlying [`ParseError`]; accessors
/// surface it from there.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
  /// The recorded syntax failure of an errored parse.
  #[error(transparent)]
  Parse(#[from] ParseError),

  /// The parser was destroyed; it is inert and every operation on it
  /// reports this.
  #[error("parser has been destroyed")]
  Destroyed,
}
