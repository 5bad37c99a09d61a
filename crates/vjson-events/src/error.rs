use vjson_tape::path::PathError;

/// Failures from event-parser configuration.
#[derive(Debug, thiserror::Error)]
pub enum EventError {
  /// A subscription or skip path failed to compile.
  #[error(transparent)]
  Path(#[from] PathError),

  /// The requested input format has no preprocessor built.
  #[error("unsupported input format: {0}")]
  UnsupportedFormat(&'static str),

  /// Skip paths must be registered before the first feed — the tape
  /// builder honours them from byte zero.
  #[error("skip paths cannot change after feeding has started")]
  SkipAfterFeed,
}
