//! The streaming parser: one `feed` runs the scanner, classifier, tape
//! builder and live-document patcher over the new bytes only.

use bytes::Bytes;
use vjson_classify::{Classifier, ErrorKind, ParseError, Status};
use vjson_scan::Scanner;
use vjson_tape::{PathSet, Tape, TapeBuilder, TapeValue};

use crate::buffer::{DEFAULT_BUFFER_LIMIT, InputBuffer};
use crate::doc::{DocNode, LiveDoc};
use crate::error::CoreError;
use crate::snapshot::{self, SnapshotFormat};

/// Parser construction options.
#[derive(Clone, Debug)]
pub struct ParserOptions {
  /// Container nesting ceiling.
  pub depth_limit: usize,
  /// Input buffer ceiling in bytes.
  pub buffer_limit: usize,
  /// Subtrees to discard rather than materialize.
  pub skip: PathSet,
  /// Treat trailing content after the first value as an error
  /// (`trailing-content`) instead of reporting complete-early.
  pub single_value: bool,
}

impl Default for ParserOptions {
  fn default() -> Self {
    Self {
      depth_limit: vjson_classify::classifier::DEFAULT_DEPTH_LIMIT,
      buffer_limit: DEFAULT_BUFFER_LIMIT,
      skip: PathSet::new(),
      single_value: false,
    }
  }
}

/// Parser-level status, reported by every `feed`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ParserStatus {
  /// Legal prefix; the live document reflects the autocompleted view.
  Incomplete,
  /// Exactly one value (plus at most trailing whitespace).
  Complete,
  /// One value followed by more content; see
  /// [`remaining`](StreamParser::remaining).
  CompleteEarly,
  /// Invalid input, capacity overflow, or trailing content in
  /// single-value mode. Latched; see [`error`](StreamParser::error).
  Error,
}

/// The incremental parser instance.
///
/// Owns the buffer, tape, arena, live document and all scanning state.
/// Single-threaded by contract: `feed` takes `&mut self`, so re-entrant
/// feeding from a callback is unrepresentable, and an instance never
/// migrates mid-parse (hand a [`snapshot`](Self::snapshot) to another
/// worker instead).
#[derive(Debug)]
pub struct StreamParser {
  buffer: InputBuffer,
  scanner: Scanner,
  classifier: Classifier,
  builder: TapeBuilder,
  tape: Tape,
  structurals: Vec<u32>,
  doc: LiveDoc,
  status: ParserStatus,
  error: Option<ParseError>,
  remainder: Option<usize>,
  destroyed: bool,
  /// Token range of the last feed's changes: (replay start, committed
  /// end). The synthetic tail runs from committed end to the tape end.
  replay: (usize, usize),
  single_value: bool,
}

impl Default for StreamParser {
  fn default() -> Self {
    Self::new()
  }
}

impl StreamParser {
  #[must_use]
  pub fn new() -> Self {
    Self::with_options(ParserOptions::default())
  }

  #[must_use]
  pub fn with_options(options: ParserOptions) -> Self {
    let mut builder = TapeBuilder::with_skip_set(options.skip.clone());
    builder.set_depth_limit(options.depth_limit);
    Self {
      buffer: InputBuffer::with_limit(options.buffer_limit),
      scanner: Scanner::new(),
      classifier: Classifier::with_depth_limit(options.depth_limit),
      builder,
      tape: Tape::new(),
      structurals: Vec::new(),
      doc: LiveDoc::with_skip_set(options.skip),
      status: ParserStatus::Incomplete,
      error: None,
      remainder: None,
      destroyed: false,
      replay: (0, 0),
      single_value: options.single_value,
    }
  }

  /// Consume one chunk. Never panics and never raises: on bad input the
  /// parser latches [`ParserStatus::Error`] and records the failure.
  pub fn feed(&mut self, chunk: &[u8]) -> ParserStatus {
    if self.destroyed || self.status == ParserStatus::Error {
      return self.status();
    }

    if let Err(err) = self.buffer.append(chunk) {
      self.fail(err);
      return self.status;
    }
    self
      .scanner
      .scan(self.buffer.padded(), self.buffer.len(), &mut self.structurals);

    match self.classifier.advance(chunk) {
      Status::Invalid(err) => self.fail(err),
      status => self.build(status),
    }
    self.status
  }

  fn build(&mut self, status: Status) {
    let built = self.builder.feed(
      &mut self.tape,
      self.buffer.padded(),
      self.buffer.len(),
      &self.structurals,
      &self.classifier,
    );
    match built {
      Ok(replay_from) => {
        let committed = self.builder.committed_tokens();
        self.replay = (replay_from, committed);
        self
          .doc
          .patch(&self.tape, self.buffer.padded(), replay_from, committed);
        self.status = match status {
          Status::Complete => ParserStatus::Complete,
          Status::CompleteEarly { remainder } => {
            self.remainder = Some(remainder);
            if self.single_value {
              self.fail(ParseError::new(ErrorKind::TrailingContent, remainder));
              return;
            }
            ParserStatus::CompleteEarly
          }
          Status::Incomplete => ParserStatus::Incomplete,
          Status::Invalid(_) => unreachable!("invalid handled by the caller"),
        };
      }
      Err(err) => self.fail(err),
    }
  }

  /// Signal end-of-input. A root-level number that was merely waiting
  /// for a terminator commits and the parse completes; anything else
  /// keeps its current status.
  pub fn end(&mut self) -> ParserStatus {
    if self.destroyed || self.status != ParserStatus::Incomplete {
      return self.status();
    }
    if self.classifier.status_at_eof() == Status::Complete {
      let replay_from = self.builder.committed_tokens();
      let finished = self.builder.commit_eof(
        &mut self.tape,
        self.buffer.padded(),
        self.buffer.len(),
        &self.classifier,
      );
      match finished {
        Ok(()) => {
          let committed = self.builder.committed_tokens();
          self.replay = (replay_from, committed);
          self
            .doc
            .patch(&self.tape, self.buffer.padded(), replay_from, committed);
          self.status = ParserStatus::Complete;
        }
        Err(err) => self.fail(err),
      }
    }
    self.status
  }

  fn fail(&mut self, err: ParseError) {
    self.status = ParserStatus::Error;
    if self.error.is_none() {
      self.error = Some(err);
    }
  }

  /// Convert a still-incomplete parse into its strict-mode error
  /// (`incomplete-object` / `incomplete-array` by the innermost open
  /// container). Used by consumers that demand a whole value.
  pub fn demand_complete(&mut self) {
    if self.status == ParserStatus::Incomplete
      && let Some(err) = self.classifier.incomplete_error()
    {
      self.fail(err);
    }
  }

  #[must_use]
  pub fn status(&self) -> ParserStatus {
    if self.destroyed {
      ParserStatus::Error
    } else {
      self.status
    }
  }

  /// The recorded failure after an error status.
  #[must_use]
  pub fn error(&self) -> Option<ParseError> {
    self.error
  }

  /// The live document root: the in-flight (autocomplete-aware) value
  /// while incomplete, the final value when complete.
  ///
  /// # Errors
  ///
  /// The recorded [`ParseError`] when the parser is in the error
  /// status; [`CoreError::Destroyed`] after `destroy`.
  pub fn value(&self) -> Result<Option<DocNode<'_>>, CoreError> {
    if self.destroyed {
      return Err(CoreError::Destroyed);
    }
    if let Some(err) = self.error {
      return Err(CoreError::Parse(err));
    }
    Ok(self.doc.root())
  }

  /// Lazy accessor over the tape (`None` before any tokens, after
  /// destroy, or on error).
  #[must_use]
  pub fn tape_value(&self) -> Option<TapeValue<'_>> {
    if self.destroyed || self.error.is_some() {
      return None;
    }
    TapeValue::root(&self.tape, self.buffer.padded())
  }

  /// Bytes past the first root value when status is complete-early.
  #[must_use]
  pub fn remaining(&self) -> Option<&[u8]> {
    if self.destroyed {
      return None;
    }
    self.remainder.map(|off| &self.buffer.logical()[off..])
  }

  /// The classifier's current (status, suffix, trim) verdict.
  #[must_use]
  pub fn completion(&self) -> vjson_classify::Completion {
    self.classifier.completion()
  }

  /// Transferable snapshot of the tape (and optionally the source
  /// buffer) for cross-worker handoff.
  #[must_use]
  pub fn snapshot(&self, include_buffer: bool, format: SnapshotFormat) -> Bytes {
    let source = include_buffer.then(|| self.buffer.logical());
    snapshot::encode(&self.tape, source, format)
  }

  /// Release all owned resources. Idempotent; the parser becomes inert
  /// and every subsequent operation reports destruction.
  pub fn destroy(&mut self) {
    if self.destroyed {
      return;
    }
    self.destroyed = true;
    self.buffer.release();
    self.tape = Tape::new();
    self.doc = LiveDoc::new();
    self.structurals = Vec::new();
  }

  #[must_use]
  pub fn is_destroyed(&self) -> bool {
    self.destroyed
  }

  /// Restart for the next root (multi-root streams). Subscriptions and
  /// options survive; buffer offsets restart at zero.
  pub fn reset(&mut self) {
    if self.destroyed {
      return;
    }
    self.buffer.reset();
    self.scanner.reset();
    self.classifier.reset();
    self.builder.reset();
    self.tape = Tape::new();
    self.structurals.clear();
    self.doc.reset();
    self.status = ParserStatus::Incomplete;
    self.error = None;
    self.remainder = None;
    self.replay = (0, 0);
  }

  // ── Walker access (event dispatch, inspection) ──────────────────────

  #[must_use]
  pub fn tape(&self) -> &Tape {
    &self.tape
  }

  /// The source bytes (logical length, no pad).
  #[must_use]
  pub fn source(&self) -> &[u8] {
    self.buffer.logical()
  }

  /// Padded source view, valid to index with any token span.
  #[must_use]
  pub fn source_padded(&self) -> &[u8] {
    self.buffer.padded()
  }

  /// Token range of the last feed: (replay start, committed end).
  #[must_use]
  pub fn last_replay(&self) -> (usize, usize) {
    self.replay
  }

  #[must_use]
  pub fn committed_tokens(&self) -> usize {
    self.builder.committed_tokens()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::doc::NodeId;
  use vjson_tape::Path;

  fn canonical(parser: &StreamParser) -> String {
    parser
      .value()
      .unwrap()
      .expect("has root")
      .materialize()
      .to_json_string()
  }

  #[test]
  fn partial_string_scenario() {
    let mut p = StreamParser::new();
    assert_eq!(p.feed(br#"{"name":"Ali"#), ParserStatus::Incomplete);
    let root = p.value().unwrap().unwrap();
    assert!(!root.is_complete());
    assert!(root.is_open());
    let name = root.get("name").unwrap();
    assert_eq!(name.as_str(), Some("Ali"));
    assert!(!name.is_complete());
  }

  #[test]
  fn multi_feed_array_scenario() {
    let mut p = StreamParser::new();
    p.feed(br#"{"items":[1,2,"#);
    assert_eq!(canonical(&p), r#"{"items":[1,2,null]}"#);
    p.feed(br#"3,4]}"#);
    assert_eq!(p.status(), ParserStatus::Complete);
    assert_eq!(canonical(&p), r#"{"items":[1,2,3,4]}"#);
  }

  #[test]
  fn complete_early_with_remaining() {
    let mut p = StreamParser::new();
    assert_eq!(p.feed(b"{\"a\":1}\n{\"b\":2}"), ParserStatus::CompleteEarly);
    assert_eq!(canonical(&p), r#"{"a":1}"#);
    assert_eq!(p.remaining(), Some(&b"{\"b\":2}"[..]));
  }

  #[test]
  fn atom_root_remainder_keeps_terminator() {
    let mut p = StreamParser::new();
    assert_eq!(p.feed(b"true false"), ParserStatus::CompleteEarly);
    assert_eq!(canonical(&p), "true");
    assert_eq!(p.remaining(), Some(&b" false"[..]));
  }

  #[test]
  fn number_tail_scenario() {
    let mut p = StreamParser::new();
    assert_eq!(p.feed(b"[1, 2.5e-"), ParserStatus::Incomplete);
    assert_eq!(canonical(&p), "[1,2.5]");
  }

  #[test]
  fn single_value_mode_rejects_trailing() {
    let mut p = StreamParser::with_options(ParserOptions {
      single_value: true,
      ..ParserOptions::default()
    });
    assert_eq!(p.feed(b"{\"x\":1}{\"x\":2}"), ParserStatus::Error);
    let err = p.error().unwrap();
    assert_eq!(err.kind, ErrorKind::TrailingContent);
    assert_eq!(err.offset, 7);
  }

  #[test]
  fn error_latches_and_value_raises() {
    let mut p = StreamParser::new();
    assert_eq!(p.feed(b"[1}"), ParserStatus::Error);
    assert!(matches!(p.value(), Err(CoreError::Parse(_))));
    // Feeding more cannot resurrect the parse.
    assert_eq!(p.feed(b"]"), ParserStatus::Error);
  }

  #[test]
  fn node_identity_is_stable_across_feeds() {
    let mut p = StreamParser::new();
    p.feed(br#"{"items":["#);
    let items_id: NodeId = p
      .value()
      .unwrap()
      .unwrap()
      .get("items")
      .expect("items exists")
      .id();

    p.feed(br#"1,"#);
    p.feed(br#"2]}"#);
    // The same node id still addresses the (now complete) array.
    let root = p.value().unwrap().unwrap();
    assert_eq!(root.get("items").unwrap().id(), items_id);
    let items = root.get("items").unwrap();
    assert_eq!(items.len(), Some(2));
    assert!(items.is_complete());
  }

  #[test]
  fn growing_string_keeps_node_identity() {
    let mut p = StreamParser::new();
    p.feed(br#"{"msg":"Hel"#);
    let msg_id = p.value().unwrap().unwrap().get("msg").unwrap().id();
    p.feed(br#"lo"}"#);
    let root = p.value().unwrap().unwrap();
    let msg = root.get("msg").unwrap();
    assert_eq!(msg.id(), msg_id);
    assert_eq!(msg.as_str(), Some("Hello"));
    assert!(msg.is_complete());
  }

  #[test]
  fn is_complete_transitions_monotonically() {
    let input = br#"{"a":[1,{"b":"xy"}],"c":true}"#;
    let mut p = StreamParser::new();
    let mut was_complete = false;
    for chunk in input.chunks(3) {
      p.feed(chunk);
      let complete = p.value().unwrap().unwrap().is_complete();
      assert!(!was_complete || complete, "completeness regressed");
      was_complete = complete;
    }
    assert!(was_complete);
  }

  #[test]
  fn chunking_invariance_for_live_doc() {
    let input = br#"{"tool":"search","args":{"q":"rust simd","limit":20},"flags":[true,false,null]}"#;
    let mut whole = StreamParser::new();
    whole.feed(input);
    let expected = canonical(&whole);

    for chunk in [1, 2, 3, 5, 8, 13] {
      let mut p = StreamParser::new();
      for piece in input.chunks(chunk) {
        p.feed(piece);
      }
      assert_eq!(p.status(), ParserStatus::Complete, "chunk {chunk}");
      assert_eq!(canonical(&p), expected, "chunk {chunk}");
    }
  }

  #[test]
  fn skip_path_prunes_live_doc() {
    let mut skip = PathSet::new();
    skip.insert(Path::parse("explanation").unwrap());
    let mut p = StreamParser::with_options(ParserOptions {
      skip,
      ..ParserOptions::default()
    });
    p.feed(br#"{"tool":"x","explanation":"very long...","n":1}"#);
    let root = p.value().unwrap().unwrap();
    assert_eq!(root.get("tool").unwrap().as_str(), Some("x"));
    assert_eq!(root.get("n").unwrap().as_i64(), Some(1));
    // The skipped member was never materialized.
    assert!(root.get("explanation").is_none());
    assert_eq!(root.len(), Some(2));
  }

  #[test]
  fn pending_key_shows_null_child() {
    let mut p = StreamParser::new();
    p.feed(br#"{"answer":"#);
    let root = p.value().unwrap().unwrap();
    let answer = root.get("answer").unwrap();
    assert!(answer.is_null());
    assert!(!answer.is_complete());
  }

  #[test]
  fn destroy_is_idempotent_and_inert() {
    let mut p = StreamParser::new();
    p.feed(b"{\"a\":1}");
    p.destroy();
    p.destroy();
    assert!(p.is_destroyed());
    assert_eq!(p.status(), ParserStatus::Error);
    assert!(matches!(p.value(), Err(CoreError::Destroyed)));
    assert_eq!(p.feed(b"more"), ParserStatus::Error);
  }

  #[test]
  fn capacity_ceiling_surfaces_error() {
    let mut p = StreamParser::with_options(ParserOptions {
      buffer_limit: 8,
      ..ParserOptions::default()
    });
    assert_eq!(p.feed(b"[1,2,3,4,5]"), ParserStatus::Error);
    assert_eq!(p.error().unwrap().kind, ErrorKind::CapacityExceeded);
  }

  #[test]
  fn depth_ceiling_surfaces_error() {
    let mut p = StreamParser::with_options(ParserOptions {
      depth_limit: 3,
      ..ParserOptions::default()
    });
    assert_eq!(p.feed(b"[[["), ParserStatus::Incomplete);
    assert_eq!(p.feed(b"["), ParserStatus::Error);
    assert_eq!(p.error().unwrap().kind, ErrorKind::DepthExceeded);
  }

  #[test]
  fn end_completes_root_number() {
    let mut p = StreamParser::new();
    assert_eq!(p.feed(b"42"), ParserStatus::Incomplete);
    assert_eq!(p.end(), ParserStatus::Complete);
    assert_eq!(canonical(&p), "42");
    assert!(p.value().unwrap().unwrap().is_complete());
  }

  #[test]
  fn end_keeps_structural_incompleteness() {
    let mut p = StreamParser::new();
    p.feed(b"{\"a\":1");
    assert_eq!(p.end(), ParserStatus::Incomplete);
    assert_eq!(canonical(&p), r#"{"a":1}"#);
  }

  #[test]
  fn reset_supports_multi_root() {
    let mut p = StreamParser::new();
    assert_eq!(p.feed(b"{\"a\":1}{\"b\":2}"), ParserStatus::CompleteEarly);
    let tail = p.remaining().unwrap().to_vec();
    p.reset();
    assert_eq!(p.feed(&tail), ParserStatus::Complete);
    assert_eq!(canonical(&p), r#"{"b":2}"#);
  }
}
