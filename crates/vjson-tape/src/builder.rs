//! The incremental tape builder.
//!
//! Consumes the scanner's structural offsets and the classifier's view of
//! the buffer tail, and maintains the tape across feeds:
//!
//! ```text
//!   feed N:   [ committed tokens ...............][ synthetic tail ]
//!   feed N+1: [ committed tokens ......................][ tail' ]
//!                                 ▲ new real tokens ▲
//! ```
//!
//! Committed tokens are append-only. The synthetic tail — the tokens the
//! autocompleter's suffix would produce — is truncated and rebuilt on
//! every feed, so each intermediate tape still encodes a legal value.

use vjson_classify::{Atom, Classifier, ErrorKind, Expect, ParseError, Tail};

use crate::number::parse_number;
use crate::path::{PathAtom, PathSet};
use crate::string::{OpenString, decode_interior};
use crate::tape::Tape;
use crate::token::{Span, StrRef, Token, TokenKind, UNRESOLVED};

/// Default container nesting ceiling (mirrors the classifier's).
pub const DEFAULT_DEPTH_LIMIT: usize = 256;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum FrameKind {
  Object,
  Array,
}

#[derive(Clone, Debug)]
struct Frame {
  kind: FrameKind,
  /// Tape index of the open token, patched when the close arrives.
  token_idx: usize,
  /// Committed element count (pairs for objects, values for arrays).
  count: u32,
  /// Object only: the next committed string is a key.
  next_is_key: bool,
  /// Decoded text of the current key, kept only while a skip set is
  /// active (it feeds the path tracker).
  current_key: Option<String>,
}

/// Incremental tape builder state, persisted across feeds.
#[derive(Debug)]
pub struct TapeBuilder {
  frames: Vec<Frame>,
  /// Tape length of the committed prefix.
  committed_tokens: usize,
  /// Next source byte not yet consumed into a committed token.
  scan_pos: usize,
  /// Structural offsets already consumed.
  struct_cursor: usize,
  /// Decoder state for the one string that can be open at the tail.
  open_string: Option<OpenString>,
  /// Subtrees to discard rather than materialize.
  skip: PathSet,
  /// Current position, tracked only while the skip set is non-empty.
  path: Vec<PathAtom>,
  /// Frame depth at which a skipped subtree was entered.
  skip_from: Option<usize>,
  depth_limit: usize,
}

impl Default for TapeBuilder {
  fn default() -> Self {
    Self::new()
  }
}

impl TapeBuilder {
  #[must_use]
  pub fn new() -> Self {
    Self::with_skip_set(PathSet::new())
  }

  #[must_use]
  pub fn with_skip_set(skip: PathSet) -> Self {
    Self {
      frames: Vec::new(),
      committed_tokens: 0,
      scan_pos: 0,
      struct_cursor: 0,
      open_string: None,
      skip,
      path: Vec::new(),
      skip_from: None,
      depth_limit: DEFAULT_DEPTH_LIMIT,
    }
  }

  pub fn set_depth_limit(&mut self, limit: usize) {
    self.depth_limit = limit;
  }

  /// Tape length of the committed prefix; tokens at or beyond this index
  /// are synthetic.
  #[must_use]
  pub fn committed_tokens(&self) -> usize {
    self.committed_tokens
  }

  /// Forget all progress (the tape must be reset alongside).
  pub fn reset(&mut self) {
    let skip = std::mem::take(&mut self.skip);
    let limit = self.depth_limit;
    *self = Self::with_skip_set(skip);
    self.depth_limit = limit;
  }

  /// Process one feed's worth of new input.
  ///
  /// `structurals` is the full accumulated offset list from the scanner;
  /// the builder remembers how far it has consumed. Returns the token
  /// index at which this feed's changes begin (the start of the previous
  /// synthetic tail) — walkers replay from there.
  ///
  /// # Errors
  ///
  /// Structural or literal errors, with byte offsets. The classifier
  /// normally rejects these first; the builder re-checks what it touches.
  pub fn feed(
    &mut self,
    tape: &mut Tape,
    source: &[u8],
    len: usize,
    structurals: &[u32],
    classifier: &Classifier,
  ) -> Result<usize, ParseError> {
    let replay_from = self.committed_tokens;
    tape.truncate(self.committed_tokens);

    // Bytes at or past this offset stay uncommitted: the in-flight
    // scalar tail, and anything after the first root value.
    let mut commit_end = match classifier.tail() {
      Tail::None => len,
      Tail::String { start, .. } | Tail::Number { start, .. } | Tail::Atom { start, .. } => start,
    };
    if let Some(value_end) = classifier.value_end() {
      commit_end = commit_end.min(value_end);
    }

    while self.struct_cursor < structurals.len() {
      let s = structurals[self.struct_cursor] as usize;
      if s >= commit_end {
        break;
      }
      self.flush_gap(tape, source, s)?;
      match source[s] {
        b'{' => self.open_container(tape, FrameKind::Object, s)?,
        b'[' => self.open_container(tape, FrameKind::Array, s)?,
        b'}' => self.close_container(tape, FrameKind::Object, s)?,
        b']' => self.close_container(tape, FrameKind::Array, s)?,
        b':' => {}
        b',' => {
          if let Some(f) = self.frames.last_mut()
            && f.kind == FrameKind::Object
          {
            f.next_is_key = true;
          }
        }
        b'"' => {
          // String interiors are elided by the scanner, so the closing
          // quote is always the very next structural.
          let close = structurals
            .get(self.struct_cursor + 1)
            .copied()
            .expect("committed string is closed") as usize;
          self.emit_string(tape, source, s, close)?;
          self.struct_cursor += 1;
          self.scan_pos = close + 1;
          self.struct_cursor += 1;
          continue;
        }
        other => unreachable!("scanner emitted non-structural byte {other:#04X}"),
      }
      self.scan_pos = s + 1;
      self.struct_cursor += 1;
    }

    // A root scalar (or the last scalar before the commit boundary) may
    // sit after the final structural.
    self.flush_gap(tape, source, commit_end)?;
    self.scan_pos = self.scan_pos.max(commit_end);

    self.committed_tokens = tape.len();
    self.synthesize(tape, source, len, classifier)?;
    Ok(replay_from)
  }

  /// One-shot finalization: end-of-input terminates a root-level number,
  /// committing it as a real token.
  ///
  /// # Errors
  ///
  /// Propagates number parse failures.
  pub fn commit_eof(
    &mut self,
    tape: &mut Tape,
    source: &[u8],
    len: usize,
    classifier: &Classifier,
  ) -> Result<(), ParseError> {
    if let Tail::Number { start, trunc } = classifier.tail()
      && self.frames.is_empty()
      && trunc == len
    {
      tape.truncate(self.committed_tokens);
      let kind = parse_number(&source[start..len], start)?;
      tape.push(Token::real(kind, Span::new(start, len)));
      self.committed_tokens = tape.len();
      self.scan_pos = len;
    }
    Ok(())
  }

  // ── Committed emission ──────────────────────────────────────────────

  /// Parse and emit the scalar (if any) between `scan_pos` and `end`.
  fn flush_gap(&mut self, tape: &mut Tape, source: &[u8], end: usize) -> Result<(), ParseError> {
    if end <= self.scan_pos {
      return Ok(());
    }
    let gap = &source[self.scan_pos..end];
    let Some(first) = gap.iter().position(|&b| !is_ws(b)) else {
      self.scan_pos = end;
      return Ok(());
    };
    let last = gap.iter().rposition(|&b| !is_ws(b)).expect("non-ws exists");
    let start = self.scan_pos + first;
    let stop = self.scan_pos + last + 1;
    let literal = &source[start..stop];

    let kind = match literal[0] {
      b't' | b'f' | b'n' => atom_kind(literal).ok_or(ParseError::new(
        ErrorKind::InvalidLiteral,
        start,
      ))?,
      _ => parse_number(literal, start)?,
    };
    self.emit_value(tape, Token::real(kind, Span::new(start, stop)));
    self.scan_pos = end;
    Ok(())
  }

  fn emit_string(
    &mut self,
    tape: &mut Tape,
    source: &[u8],
    open: usize,
    close: usize,
  ) -> Result<(), ParseError> {
    let is_key = self
      .frames
      .last()
      .is_some_and(|f| f.kind == FrameKind::Object && f.next_is_key);

    // This string may have been the buffer tail in earlier feeds; if so,
    // its incremental decoder holds the already-decoded prefix and must
    // be consumed here (whether or not this path keeps its output).
    let resumed = self.open_string.take_if(|o| o.start == open);

    if is_key {
      let sref = if self.in_skip() {
        raw_ref(open + 1, close)
      } else if let Some(open_str) = resumed {
        open_str.finish(source, close, tape.arena_mut())?
      } else {
        decode_interior(source, open + 1, close, tape.arena_mut())?
      };
      if self.tracking_paths() && !self.in_skip() {
        let text = String::from_utf8_lossy(tape.str_bytes(sref, source)).into_owned();
        let frame = self.frames.last_mut().expect("object frame");
        frame.current_key = Some(text);
      }
      let frame = self.frames.last_mut().expect("object frame");
      frame.next_is_key = false;
      tape.push(Token::real(TokenKind::Key(sref), Span::new(open, close + 1)));
      return Ok(());
    }

    let sref = if self.value_is_skipped() {
      raw_ref(open + 1, close)
    } else if let Some(open_str) = resumed {
      open_str.finish(source, close, tape.arena_mut())?
    } else {
      decode_interior(source, open + 1, close, tape.arena_mut())?
    };
    self.emit_value(tape, Token::real(TokenKind::Str(sref), Span::new(open, close + 1)));
    Ok(())
  }

  fn open_container(
    &mut self,
    tape: &mut Tape,
    kind: FrameKind,
    at: usize,
  ) -> Result<(), ParseError> {
    if self.frames.len() >= self.depth_limit {
      return Err(ParseError::new(ErrorKind::DepthExceeded, at));
    }
    let token = match kind {
      FrameKind::Object => TokenKind::ObjectOpen {
        close: UNRESOLVED,
        count: 0,
      },
      FrameKind::Array => TokenKind::ArrayOpen {
        close: UNRESOLVED,
        count: 0,
      },
    };
    let atom = self.slot_atom();
    self.bump_parent_count();
    self.enter_skip_scope(atom.as_ref());
    if let Some(atom) = atom {
      self.path.push(atom);
    }
    let token_idx = tape.push(Token::real(token, Span::new(at, at + 1)));
    self.frames.push(Frame {
      kind,
      token_idx,
      count: 0,
      next_is_key: kind == FrameKind::Object,
      current_key: None,
    });
    Ok(())
  }

  fn close_container(
    &mut self,
    tape: &mut Tape,
    kind: FrameKind,
    at: usize,
  ) -> Result<(), ParseError> {
    let Some(frame) = self.frames.pop() else {
      return Err(ParseError::new(ErrorKind::UnmatchedDelimiter, at));
    };
    if frame.kind != kind {
      return Err(ParseError::new(ErrorKind::UnmatchedDelimiter, at));
    }
    let close_idx = tape.len() as u32;
    let close_token = match kind {
      FrameKind::Object => TokenKind::ObjectClose {
        open: frame.token_idx as u32,
      },
      FrameKind::Array => TokenKind::ArrayClose {
        open: frame.token_idx as u32,
      },
    };
    tape.push(Token::real(close_token, Span::new(at, at + 1)));
    tape.patch_open(frame.token_idx, close_idx, frame.count);
    if self.tracking_paths() {
      self.path.pop();
    }
    self.exit_skip_scope();
    Ok(())
  }

  /// Append a committed value token, updating the enclosing frame's
  /// element count.
  fn emit_value(&mut self, tape: &mut Tape, token: Token) {
    self.bump_parent_count();
    tape.push(token);
  }

  fn bump_parent_count(&mut self) {
    if let Some(f) = self.frames.last_mut() {
      f.count += 1;
    }
  }

  // ── Synthetic tail ──────────────────────────────────────────────────

  /// Append the tokens the autocompleter's suffix would produce, so the
  /// tape always encodes a legal value. Everything appended here is
  /// flagged synthetic and rebuilt on the next feed; the only persistent
  /// effect is the open-string decoder's watermark (decoding is done
  /// once per byte, ever).
  fn synthesize(
    &mut self,
    tape: &mut Tape,
    source: &[u8],
    len: usize,
    classifier: &Classifier,
  ) -> Result<(), ParseError> {
    // Element counts including synthetic additions, per open frame.
    let mut counts: Vec<u32> = self.frames.iter().map(|f| f.count).collect();

    match classifier.tail() {
      Tail::String {
        start,
        is_key,
        clean_end,
      } => {
        if self.tail_string_skipped(is_key) {
          let sref = raw_ref(start + 1, clean_end);
          self.push_tail_tokens(tape, is_key, sref, start, clean_end, &mut counts);
        } else {
          if self.open_string.is_none_or(|o| o.start != start) {
            self.open_string = Some(OpenString::new(start));
          }
          let open = self.open_string.as_mut().expect("just ensured");
          open.advance(source, clean_end, tape.arena_mut())?;
          let sref = open.current_ref(tape.arena());
          self.push_tail_tokens(tape, is_key, sref, start, clean_end, &mut counts);
        }
      }
      Tail::Number { start, trunc } => {
        if trunc > start {
          let kind = parse_number(&source[start..trunc], start)?;
          if let Some(c) = counts.last_mut() {
            *c += 1;
          }
          tape.push(Token::synthetic(kind, Span::new(start, trunc)));
        }
      }
      Tail::Atom { start, atom } => {
        let kind = match atom {
          Atom::True => TokenKind::True,
          Atom::False => TokenKind::False,
          Atom::Null => TokenKind::Null,
        };
        if let Some(c) = counts.last_mut() {
          *c += 1;
        }
        tape.push(Token::synthetic(kind, Span::new(start, len)));
      }
      Tail::None => {
        if matches!(classifier.expect(), Expect::Value | Expect::Colon) {
          if let Some(c) = counts.last_mut() {
            *c += 1;
          }
          tape.push(Token::synthetic(TokenKind::Null, Span::new(len, len)));
        }
      }
    }

    // Close every open frame, innermost first.
    for (frame, &count) in self.frames.iter().rev().zip(counts.iter().rev()) {
      let close_idx = tape.len() as u32;
      let close_token = match frame.kind {
        FrameKind::Object => TokenKind::ObjectClose {
          open: frame.token_idx as u32,
        },
        FrameKind::Array => TokenKind::ArrayClose {
          open: frame.token_idx as u32,
        },
      };
      tape.push(Token::synthetic(close_token, Span::new(len, len)));
      tape.patch_open(frame.token_idx, close_idx, count);
    }
    Ok(())
  }

  /// Synthetic tokens for an in-flight string: a growing value, or a
  /// partial key with a null placeholder.
  fn push_tail_tokens(
    &mut self,
    tape: &mut Tape,
    is_key: bool,
    sref: StrRef,
    start: usize,
    clean_end: usize,
    counts: &mut [u32],
  ) {
    if let Some(c) = counts.last_mut() {
      *c += 1;
    }
    if is_key {
      tape.push(Token::synthetic(
        TokenKind::Key(sref),
        Span::new(start, clean_end),
      ));
      tape.push(Token::synthetic(
        TokenKind::Null,
        Span::new(clean_end, clean_end),
      ));
    } else {
      tape.push(Token::synthetic(
        TokenKind::Str(sref),
        Span::new(start, clean_end),
      ));
    }
  }

  // ── Skip paths ──────────────────────────────────────────────────────

  fn tracking_paths(&self) -> bool {
    !self.skip.is_empty()
  }

  fn in_skip(&self) -> bool {
    self.skip_from.is_some()
  }

  /// The path atom of the value slot about to be filled.
  fn slot_atom(&self) -> Option<PathAtom> {
    if !self.tracking_paths() {
      return None;
    }
    let frame = self.frames.last()?;
    Some(match frame.kind {
      FrameKind::Object => PathAtom::Key(frame.current_key.clone().unwrap_or_default()),
      FrameKind::Array => PathAtom::Index(frame.count),
    })
  }

  /// Whether the value about to be emitted (at the current slot) falls
  /// under a skip path.
  fn value_is_skipped(&self) -> bool {
    if self.in_skip() {
      return true;
    }
    if !self.tracking_paths() {
      return false;
    }
    let Some(atom) = self.slot_atom() else {
      return false;
    };
    let mut candidate = self.path.clone();
    candidate.push(atom);
    self.skip.prunes(&candidate)
  }

  fn tail_string_skipped(&self, is_key: bool) -> bool {
    if is_key {
      // A key is only skipped when its whole object is.
      self.in_skip()
    } else {
      self.value_is_skipped()
    }
  }

  /// Container open: if the container itself matches a skip path, mark
  /// the depth so the entire subtree is treated as skipped.
  fn enter_skip_scope(&mut self, atom: Option<&PathAtom>) {
    if self.in_skip() || !self.tracking_paths() {
      return;
    }
    if let Some(atom) = atom {
      let mut candidate = self.path.clone();
      candidate.push(atom.clone());
      if self.skip.prunes(&candidate) {
        self.skip_from = Some(self.frames.len());
      }
    }
  }

  fn exit_skip_scope(&mut self) {
    if self.skip_from == Some(self.frames.len()) {
      self.skip_from = None;
    }
  }
}

fn is_ws(b: u8) -> bool {
  matches!(b, b' ' | b'\t' | b'\n' | b'\r')
}

fn atom_kind(literal: &[u8]) -> Option<TokenKind> {
  match literal {
    b"true" => Some(TokenKind::True),
    b"false" => Some(TokenKind::False),
    b"null" => Some(TokenKind::Null),
    _ => None,
  }
}

fn raw_ref(start: usize, end: usize) -> StrRef {
  StrRef::Raw {
    start: start as u32,
    len: (end - start) as u32,
  }
}
