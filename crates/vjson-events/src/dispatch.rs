//! The per-feed token-walk dispatcher.
//!
//! After each feed the dispatcher replays the tape's new tokens — the
//! committed range against its persistent path cursor, the synthetic
//! tail against a scratch copy — and fires matching subscriptions in
//! tape-token order:
//!
//! - value (and schema-gated) events on *real* completion of the value
//!   at a subscribed path;
//! - delta events whenever a subscribed string has new decoded bytes,
//!   including its final batch when the closing quote arrives;
//! - nothing at all inside skipped subtrees.

use vjson_core::StreamParser;
use vjson_tape::{PathAtom, PathSet, Tape, TapeValue, TokenKind};

use crate::subscribe::{Callback, Registry, StringDelta};

#[derive(Clone, Debug)]
struct WalkFrame {
  /// This container's position in its parent (`None` for the root).
  atom: Option<PathAtom>,
  is_object: bool,
  pending_key: Option<String>,
  /// Source element index (skipped siblings included).
  src_index: u32,
}

/// Persistent walk state across feeds.
#[derive(Default)]
pub(crate) struct Dispatcher {
  stack: Vec<WalkFrame>,
}

impl Dispatcher {
  pub(crate) fn new() -> Self {
    Self::default()
  }

  pub(crate) fn reset(&mut self) {
    self.stack.clear();
  }

  /// Replay the last feed's token changes and fire events.
  pub(crate) fn dispatch(
    &mut self,
    parser: &StreamParser,
    skip: &PathSet,
    registry: &mut Registry,
  ) {
    let (replay_from, committed_now) = parser.last_replay();
    let tape = parser.tape();
    let source = parser.source_padded();

    let mut committed_stack = std::mem::take(&mut self.stack);
    for idx in replay_from..committed_now {
      apply(tape, source, idx, &mut committed_stack, skip, registry);
    }
    self.stack = committed_stack;

    let mut scratch = self.stack.clone();
    for idx in committed_now..tape.len() {
      apply(tape, source, idx, &mut scratch, skip, registry);
    }
  }
}

fn apply(
  tape: &Tape,
  source: &[u8],
  idx: usize,
  stack: &mut Vec<WalkFrame>,
  skip: &PathSet,
  registry: &mut Registry,
) {
  let token = tape.tokens()[idx];
  match token.kind {
    TokenKind::Key(kref) => {
      let text = String::from_utf8_lossy(tape.str_bytes(kref, source)).into_owned();
      if let Some(frame) = stack.last_mut() {
        frame.pending_key = Some(text);
      }
    }

    TokenKind::ObjectOpen { .. } | TokenKind::ArrayOpen { .. } => {
      let atom = slot_atom(stack);
      bump_slot(stack);
      stack.push(WalkFrame {
        atom,
        is_object: matches!(token.kind, TokenKind::ObjectOpen { .. }),
        pending_key: None,
        src_index: 0,
      });
    }

    TokenKind::ObjectClose { open } | TokenKind::ArrayClose { open } => {
      let frame = stack.pop();
      if token.synthetic {
        return;
      }
      // The container just completed for real: fire value events at its
      // path.
      let Some(frame) = frame else { return };
      let path = path_of(stack, frame.atom.as_ref());
      if path.is_empty() || skip.prunes(&path) {
        return;
      }
      fire_value_events(tape, source, open as usize, &path, registry);
    }

    _ => {
      let atom = slot_atom(stack);
      bump_slot(stack);
      let path = path_of(stack, atom.as_ref());
      // Prefix pruning covers both the value itself and any skipped
      // ancestor.
      if !path.is_empty() && skip.prunes(&path) {
        return;
      }

      if let TokenKind::Str(sref) = token.kind {
        fire_delta_events(tape, source, &token, sref, &path, registry);
      }
      if !token.synthetic && !path.is_empty() {
        fire_value_events(tape, source, idx, &path, registry);
      }
    }
  }
}

/// The path atom of the value slot about to be consumed.
fn slot_atom(stack: &[WalkFrame]) -> Option<PathAtom> {
  let frame = stack.last()?;
  if frame.is_object {
    frame.pending_key.clone().map(PathAtom::Key)
  } else {
    Some(PathAtom::Index(frame.src_index))
  }
}

fn bump_slot(stack: &mut Vec<WalkFrame>) {
  if let Some(frame) = stack.last_mut() {
    frame.src_index += 1;
    frame.pending_key = None;
  }
}

/// Absolute path of a value: enclosing frames plus its own slot atom.
fn path_of(stack: &[WalkFrame], atom: Option<&PathAtom>) -> Vec<PathAtom> {
  let mut path: Vec<PathAtom> = stack.iter().filter_map(|f| f.atom.clone()).collect();
  if let Some(atom) = atom {
    path.push(atom.clone());
  }
  path
}

fn fire_value_events(
  tape: &Tape,
  source: &[u8],
  value_idx: usize,
  path: &[PathAtom],
  registry: &mut Registry,
) {
  // Materialize lazily: only if some subscription actually matches.
  let mut materialized: Option<vjson_tape::OwnedValue> = None;
  for sub in &mut registry.subs {
    let Some(sub_path) = &sub.path else { continue };
    if !sub_path.matches(path) {
      continue;
    }
    match &mut sub.callback {
      Callback::Value(handler) => {
        let value = materialized
          .get_or_insert_with(|| TapeValue::at_index(tape, source, value_idx).materialize());
        handler(value);
      }
      Callback::Gated { schema, handler } => {
        let value = materialized
          .get_or_insert_with(|| TapeValue::at_index(tape, source, value_idx).materialize());
        if let Some(transformed) = schema.safe_parse(value) {
          handler(&transformed);
        }
      }
      _ => {}
    }
  }
}

fn fire_delta_events(
  tape: &Tape,
  source: &[u8],
  token: &vjson_tape::Token,
  sref: vjson_tape::StrRef,
  path: &[PathAtom],
  registry: &mut Registry,
) {
  let span_start = token.span.start as usize;
  // Decoded content end in source bytes: the closing quote for a real
  // token, the clean decode watermark for a synthetic one.
  let content_src_end = if token.synthetic {
    token.span.end as usize
  } else {
    token.span.end as usize - 1
  };

  for sub in &mut registry.subs {
    let Some(sub_path) = &sub.path else { continue };
    if !matches!(sub.callback, Callback::Delta(_)) || !sub_path.matches(path) {
      continue;
    }

    if sub.cur_string != Some(span_start) {
      // A different string instance at this path: start fresh.
      sub.cur_string = Some(span_start);
      sub.delivered = 0;
      sub.src_end = span_start + 1;
    }

    let decoded = tape.str_bytes(sref, source);
    if decoded.len() > sub.delivered {
      let text = String::from_utf8_lossy(&decoded[sub.delivered..]).into_owned();
      let delta = StringDelta {
        chars: &text,
        offset: sub.src_end,
        len: content_src_end - sub.src_end,
      };
      let Callback::Delta(handler) = &mut sub.callback else {
        unreachable!()
      };
      handler(&delta);
      sub.delivered = decoded.len();
      sub.src_end = content_src_end;
    }

    if !token.synthetic {
      // String finished; the next one at this path starts over.
      sub.cur_string = None;
      sub.delivered = 0;
      sub.src_end = 0;
    }
  }
}
