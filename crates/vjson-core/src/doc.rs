//! The live document: an incrementally patched tree mirroring the tape.
//!
//! Nodes live in an arena and are addressed by [`NodeId`]; a node is
//! created the first time its position appears and is *never replaced*
//! for the same position — real bytes overwrite a synthetic placeholder
//! in place, a growing string appends to the same node. A consumer
//! holding a node id across feeds keeps watching the same value fill in.
//!
//! The patcher keeps a cursor chain for the committed open containers;
//! each feed replays the new committed tokens against it, then replays
//! the synthetic tail against a scratch copy so nothing synthetic leaks
//! into committed cursor state.

use vjson_tape::{OwnedValue, PathAtom, PathSet, Tape, TokenKind};

/// Arena index of a live-document node. Stable across feeds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct NodeId(u32);

#[derive(Debug)]
pub(crate) struct LiveNode {
  value: LiveValue,
  /// Derived from autocomplete rather than real input. Clears (once,
  /// monotonically) when real bytes land on this position.
  synthetic: bool,
  /// Container still awaiting its real closing delimiter.
  open: bool,
}

#[derive(Debug)]
pub(crate) enum LiveValue {
  Null,
  Bool(bool),
  Int(i64),
  Uint(u64),
  Double(f64),
  String(String),
  Array(Vec<NodeId>),
  Object {
    entries: Vec<(String, NodeId)>,
    /// Key seen, value not yet started.
    pending_key: Option<String>,
  },
}

/// One open container on the patch cursor.
#[derive(Clone, Debug)]
struct CursorFrame {
  /// `None` while inside a skipped subtree (frames are still pushed to
  /// keep delimiters balanced; no nodes are touched).
  node: Option<NodeId>,
  /// Next tree slot to fill (materialized children only).
  slot: usize,
  /// Next source element index — differs from `slot` when earlier
  /// siblings were skipped; paths address source positions.
  src_index: usize,
  pending_key: Option<String>,
  /// The upcoming object value matched a skip path at its key.
  skip_next_value: bool,
  /// This container's position in its parent, for skip-path candidates.
  atom: Option<PathAtom>,
}

/// The incrementally patched tree.
#[derive(Debug, Default)]
pub struct LiveDoc {
  nodes: Vec<LiveNode>,
  root: Option<NodeId>,
  stack: Vec<CursorFrame>,
  skip: PathSet,
}

impl LiveDoc {
  #[must_use]
  pub fn new() -> Self {
    Self::default()
  }

  #[must_use]
  pub fn with_skip_set(skip: PathSet) -> Self {
    Self {
      skip,
      ..Self::default()
    }
  }

  /// The root node, once anything has been parsed.
  #[must_use]
  pub fn root(&self) -> Option<DocNode<'_>> {
    self.root.map(|id| DocNode { doc: self, id })
  }

  #[must_use]
  pub fn node(&self, id: NodeId) -> DocNode<'_> {
    DocNode { doc: self, id }
  }

  /// Forget everything (multi-root reset). Node ids from before the
  /// reset are invalid.
  pub fn reset(&mut self) {
    self.nodes.clear();
    self.root = None;
    self.stack.clear();
  }

  /// Replay one feed's token changes.
  ///
  /// `replay_from..committed_now` are this feed's new committed tokens;
  /// everything at and past `committed_now` is the rebuilt synthetic
  /// tail.
  pub fn patch(&mut self, tape: &Tape, source: &[u8], replay_from: usize, committed_now: usize) {
    let mut committed_stack = std::mem::take(&mut self.stack);
    for idx in replay_from..committed_now {
      self.apply(tape, source, idx, &mut committed_stack);
    }
    self.stack = committed_stack;

    let mut scratch = self.stack.clone();
    for idx in committed_now..tape.len() {
      self.apply(tape, source, idx, &mut scratch);
    }
  }

  fn apply(&mut self, tape: &Tape, source: &[u8], idx: usize, stack: &mut Vec<CursorFrame>) {
    let token = tape.tokens()[idx];
    match token.kind {
      TokenKind::Key(kref) => {
        let Some(frame) = stack.last() else {
          unreachable!("key token outside an object");
        };
        if frame.node.is_none() {
          return;
        }
        let text = lossy(tape.str_bytes(kref, source));
        if self.skip_hit(stack, &PathAtom::Key(text.clone())) {
          stack.last_mut().expect("frame exists").skip_next_value = true;
          return;
        }
        let frame = stack.last_mut().expect("frame exists");
        frame.pending_key = Some(text.clone());
        if let Some(node) = frame.node
          && let LiveValue::Object { pending_key, .. } = &mut self.nodes[node.0 as usize].value
        {
          *pending_key = Some(text);
        }
      }

      TokenKind::ObjectOpen { .. } => {
        self.apply_container(stack, token.synthetic, true);
      }
      TokenKind::ArrayOpen { .. } => {
        self.apply_container(stack, token.synthetic, false);
      }

      TokenKind::ObjectClose { .. } | TokenKind::ArrayClose { .. } => {
        if let Some(frame) = stack.pop()
          && let Some(id) = frame.node
          && !token.synthetic
        {
          let node = &mut self.nodes[id.0 as usize];
          node.open = false;
          node.synthetic = false;
        }
      }

      _ => {
        if self.pre_value(stack) == ValueFate::Skip {
          return;
        }
        let value = match token.kind {
          TokenKind::Null => LiveValue::Null,
          TokenKind::True => LiveValue::Bool(true),
          TokenKind::False => LiveValue::Bool(false),
          TokenKind::Int(v) => LiveValue::Int(v),
          TokenKind::Uint(v) => LiveValue::Uint(v),
          TokenKind::Double(v) => LiveValue::Double(v),
          TokenKind::Str(sref) => LiveValue::String(lossy(tape.str_bytes(sref, source))),
          _ => unreachable!(),
        };
        self.fill_slot(stack, value, token.synthetic);
      }
    }
  }

  fn apply_container(&mut self, stack: &mut Vec<CursorFrame>, synthetic: bool, is_object: bool) {
    let atom = self.value_atom(stack);
    if self.pre_value(stack) == ValueFate::Skip {
      // Keep delimiters balanced without touching the tree.
      stack.push(CursorFrame {
        node: None,
        slot: 0,
        src_index: 0,
        pending_key: None,
        skip_next_value: false,
        atom: None,
      });
      return;
    }
    let value = if is_object {
      LiveValue::Object {
        entries: Vec::new(),
        pending_key: None,
      }
    } else {
      LiveValue::Array(Vec::new())
    };
    // A container is synthetic until its real close arrives, whatever
    // produced the open.
    let _ = synthetic;
    let id = self.fill_slot(stack, value, true);
    self.nodes[id.0 as usize].open = true;
    stack.push(CursorFrame {
      node: Some(id),
      slot: 0,
      src_index: 0,
      pending_key: None,
      skip_next_value: false,
      atom,
    });
  }

  /// Decide whether the value about to be applied is materialized or
  /// discarded, consuming skip bookkeeping either way.
  fn pre_value(&self, stack: &mut Vec<CursorFrame>) -> ValueFate {
    let Some(frame) = stack.last() else {
      return ValueFate::Fill; // root values cannot be skipped
    };
    if frame.node.is_none() {
      return ValueFate::Skip; // whole enclosing subtree is skipped
    }
    if frame.skip_next_value {
      stack.last_mut().expect("frame exists").skip_next_value = false;
      return ValueFate::Skip;
    }
    if self.frame_is_array(frame) {
      let atom = PathAtom::Index(frame.src_index as u32);
      if self.skip_hit(stack, &atom) {
        stack.last_mut().expect("frame exists").src_index += 1;
        return ValueFate::Skip;
      }
    }
    ValueFate::Fill
  }

  /// The path atom the next value occupies in the top frame.
  fn value_atom(&self, stack: &[CursorFrame]) -> Option<PathAtom> {
    if self.skip.is_empty() {
      return None;
    }
    let frame = stack.last()?;
    if self.frame_is_array(frame) {
      Some(PathAtom::Index(frame.src_index as u32))
    } else {
      frame.pending_key.clone().map(PathAtom::Key)
    }
  }

  fn frame_is_array(&self, frame: &CursorFrame) -> bool {
    frame
      .node
      .is_some_and(|id| matches!(self.nodes[id.0 as usize].value, LiveValue::Array(_)))
  }

  fn skip_hit(&self, stack: &[CursorFrame], atom: &PathAtom) -> bool {
    if self.skip.is_empty() {
      return false;
    }
    let mut candidate: Vec<PathAtom> = stack.iter().filter_map(|f| f.atom.clone()).collect();
    candidate.push(atom.clone());
    self.skip.prunes(&candidate)
  }

  /// Place a value at the top frame's next slot (or the root), reusing
  /// the node already there when one exists.
  fn fill_slot(&mut self, stack: &mut Vec<CursorFrame>, value: LiveValue, synthetic: bool) -> NodeId {
    let Some(frame) = stack.last_mut() else {
      return match self.root {
        Some(id) => {
          self.set_value(id, value, synthetic);
          id
        }
        None => {
          let id = self.alloc(value, synthetic);
          self.root = Some(id);
          id
        }
      };
    };

    let slot = frame.slot;
    frame.slot += 1;
    frame.src_index += 1;
    let key = frame.pending_key.take();
    let parent = frame.node.expect("checked by pre_value");

    let existing = match &self.nodes[parent.0 as usize].value {
      LiveValue::Object { entries, .. } => entries.get(slot).map(|(_, id)| *id),
      LiveValue::Array(children) => children.get(slot).copied(),
      _ => unreachable!("cursor frame on a scalar node"),
    };
    let id = match existing {
      Some(id) => {
        self.set_value(id, value, synthetic);
        id
      }
      None => self.alloc(value, synthetic),
    };

    match &mut self.nodes[parent.0 as usize].value {
      LiveValue::Object {
        entries,
        pending_key,
      } => {
        *pending_key = None;
        if slot < entries.len() {
          if let Some(key) = key {
            entries[slot].0 = key;
          }
        } else {
          entries.push((key.unwrap_or_default(), id));
        }
      }
      LiveValue::Array(children) => {
        if slot >= children.len() {
          children.push(id);
        }
      }
      _ => unreachable!(),
    }
    id
  }

  /// Overwrite a node's value in place, preserving its identity. A
  /// string growing over a string appends rather than reallocating the
  /// unchanged prefix.
  fn set_value(&mut self, id: NodeId, value: LiveValue, synthetic: bool) {
    let node = &mut self.nodes[id.0 as usize];
    match (&mut node.value, value) {
      (LiveValue::String(existing), LiveValue::String(new)) => {
        if new.len() >= existing.len() && new.as_bytes()[..existing.len()] == *existing.as_bytes()
        {
          existing.push_str(&new[existing.len()..]);
        } else {
          *existing = new;
        }
      }
      (slot, new) => *slot = new,
    }
    node.synthetic = synthetic;
  }

  fn alloc(&mut self, value: LiveValue, synthetic: bool) -> NodeId {
    self.nodes.push(LiveNode {
      value,
      synthetic,
      open: false,
    });
    NodeId((self.nodes.len() - 1) as u32)
  }
}

#[derive(PartialEq, Eq)]
enum ValueFate {
  Fill,
  Skip,
}

fn lossy(bytes: &[u8]) -> String {
  String::from_utf8_lossy(bytes).into_owned()
}

/// A borrowed view of one live-document node.
#[derive(Clone, Copy)]
pub struct DocNode<'a> {
  doc: &'a LiveDoc,
  id: NodeId,
}

impl<'a> DocNode<'a> {
  #[must_use]
  pub fn id(&self) -> NodeId {
    self.id
  }

  fn node(&self) -> &'a LiveNode {
    &self.doc.nodes[self.id.0 as usize]
  }

  /// True iff every byte contributing to this node came from real input.
  /// Transitions monotonically from false to true.
  #[must_use]
  pub fn is_complete(&self) -> bool {
    !self.node().synthetic
  }

  /// Container still waiting for more content.
  #[must_use]
  pub fn is_open(&self) -> bool {
    self.node().open
  }

  #[must_use]
  pub fn is_null(&self) -> bool {
    matches!(self.node().value, LiveValue::Null)
  }

  #[must_use]
  pub fn as_bool(&self) -> Option<bool> {
    match self.node().value {
      LiveValue::Bool(b) => Some(b),
      _ => None,
    }
  }

  #[must_use]
  pub fn as_i64(&self) -> Option<i64> {
    match self.node().value {
      LiveValue::Int(v) => Some(v),
      LiveValue::Uint(v) => i64::try_from(v).ok(),
      _ => None,
    }
  }

  #[must_use]
  pub fn as_f64(&self) -> Option<f64> {
    match self.node().value {
      LiveValue::Double(v) => Some(v),
      LiveValue::Int(v) => Some(v as f64),
      LiveValue::Uint(v) => Some(v as f64),
      _ => None,
    }
  }

  #[must_use]
  pub fn as_str(&self) -> Option<&'a str> {
    match &self.node().value {
      LiveValue::String(s) => Some(s),
      _ => None,
    }
  }

  /// Object member lookup in insertion order.
  #[must_use]
  pub fn get(&self, key: &str) -> Option<DocNode<'a>> {
    match &self.node().value {
      LiveValue::Object { entries, .. } => entries
        .iter()
        .find(|(k, _)| k == key)
        .map(|(_, id)| self.doc.node(*id)),
      _ => None,
    }
  }

  #[must_use]
  pub fn index(&self, i: usize) -> Option<DocNode<'a>> {
    match &self.node().value {
      LiveValue::Array(children) => children.get(i).map(|id| self.doc.node(*id)),
      _ => None,
    }
  }

  /// Children count for containers.
  #[must_use]
  pub fn len(&self) -> Option<usize> {
    match &self.node().value {
      LiveValue::Object { entries, .. } => Some(entries.len()),
      LiveValue::Array(children) => Some(children.len()),
      _ => None,
    }
  }

  #[must_use]
  pub fn is_empty(&self) -> Option<bool> {
    self.len().map(|n| n == 0)
  }

  /// Key seen whose value has not started yet.
  #[must_use]
  pub fn pending_key(&self) -> Option<&'a str> {
    match &self.node().value {
      LiveValue::Object { pending_key, .. } => pending_key.as_deref(),
      _ => None,
    }
  }

  /// Object members in insertion order.
  pub fn iter_object(&self) -> impl Iterator<Item = (&'a str, DocNode<'a>)> + use<'a> {
    let doc = self.doc;
    let entries: &'a [(String, NodeId)] = match &self.node().value {
      LiveValue::Object { entries, .. } => entries,
      _ => &[],
    };
    entries.iter().map(move |(k, id)| (k.as_str(), doc.node(*id)))
  }

  /// Array elements in index order.
  pub fn iter_array(&self) -> impl Iterator<Item = DocNode<'a>> + use<'a> {
    let doc = self.doc;
    let children: &'a [NodeId] = match &self.node().value {
      LiveValue::Array(children) => children,
      _ => &[],
    };
    children.iter().map(move |id| doc.node(*id))
  }

  /// Produce a plain owned tree of this subtree's current state.
  #[must_use]
  pub fn materialize(&self) -> OwnedValue {
    match &self.node().value {
      LiveValue::Null => OwnedValue::Null,
      LiveValue::Bool(b) => OwnedValue::Bool(*b),
      LiveValue::Int(v) => OwnedValue::Int(*v),
      LiveValue::Uint(v) => OwnedValue::Uint(*v),
      LiveValue::Double(v) => OwnedValue::Double(*v),
      LiveValue::String(s) => OwnedValue::String(s.clone()),
      LiveValue::Array(_) => OwnedValue::Array(self.iter_array().map(|n| n.materialize()).collect()),
      LiveValue::Object { .. } => OwnedValue::Object(
        self
          .iter_object()
          .map(|(k, v)| (k.to_string(), v.materialize()))
          .collect(),
      ),
    }
  }
}

impl std::fmt::Debug for DocNode<'_> {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("DocNode")
      .field("id", &self.id.0)
      .field("complete", &self.is_complete())
      .finish()
  }
}
