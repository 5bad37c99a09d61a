//! The tape itself: token storage, span navigation and key lookup.

use std::cell::RefCell;
use std::collections::HashMap;

use crate::arena::StringArena;
use crate::token::{StrRef, Token, TokenKind, UNRESOLVED};

/// Objects at or below this member count are searched linearly; larger
/// ones get an open-addressed key probe built on first access.
const LINEAR_KEY_THRESHOLD: u32 = 8;

/// A flat, append-only sequence of tokens encoding one JSON value.
///
/// The committed prefix never changes; the synthetic tail (tokens
/// produced by autocomplete) is truncated and rebuilt on every feed.
/// Container-open tokens are patched in place when their close arrives,
/// so navigation is O(1) per subtree jump.
#[derive(Debug, Default, PartialEq)]
pub struct Tape {
  tokens: Vec<Token>,
  arena: StringArena,
  /// Key probes for large, fully committed objects, built lazily on
  /// first keyed access. Keyed by the container-open token index.
  /// Interior mutability is safe here: a parser instance is
  /// single-threaded by contract.
  key_probes: RefCell<HashMap<u32, KeyProbe>>,
}

impl Tape {
  #[must_use]
  pub fn new() -> Self {
    Self::default()
  }

  #[must_use]
  pub fn len(&self) -> usize {
    self.tokens.len()
  }

  #[must_use]
  pub fn is_empty(&self) -> bool {
    self.tokens.is_empty()
  }

  #[must_use]
  pub fn tokens(&self) -> &[Token] {
    &self.tokens
  }

  #[must_use]
  pub fn get(&self, idx: usize) -> Option<&Token> {
    self.tokens.get(idx)
  }

  #[must_use]
  pub fn arena(&self) -> &StringArena {
    &self.arena
  }

  pub fn arena_mut(&mut self) -> &mut StringArena {
    &mut self.arena
  }

  pub fn push(&mut self, token: Token) -> usize {
    self.tokens.push(token);
    self.tokens.len() - 1
  }

  /// Drop the synthetic tail (and any probes that could reference it).
  pub fn truncate(&mut self, len: usize) {
    if len < self.tokens.len() {
      self.tokens.truncate(len);
      self
        .key_probes
        .borrow_mut()
        .retain(|&idx, _| (idx as usize) < len);
    }
  }

  /// Rebuild from snapshot sections.
  #[must_use]
  pub fn from_parts(tokens: Vec<Token>, arena: StringArena) -> Self {
    Self {
      tokens,
      arena,
      key_probes: RefCell::new(HashMap::new()),
    }
  }

  /// Patch a container-open token with its resolved close index and
  /// element count. Called when the matching close (real or synthetic)
  /// is appended; synthetic closes re-patch on every feed.
  pub fn patch_open(&mut self, idx: usize, close: u32, count: u32) {
    match &mut self.tokens[idx].kind {
      TokenKind::ObjectOpen {
        close: c,
        count: n,
      }
      | TokenKind::ArrayOpen {
        close: c,
        count: n,
      } => {
        *c = close;
        *n = count;
      }
      other => unreachable!("patch_open on non-open token {other:?}"),
    }
  }

  /// Resolve a string reference to its decoded bytes (`Raw` refs return
  /// the undecoded source slice; they are only reachable under skip
  /// paths, which accessors never surface).
  #[must_use]
  pub fn str_bytes<'a>(&'a self, sref: StrRef, source: &'a [u8]) -> &'a [u8] {
    match sref {
      StrRef::Source { start, len } | StrRef::Raw { start, len } => {
        &source[start as usize..(start + len) as usize]
      }
      StrRef::Arena { start, len } => self.arena.slice(start, len),
    }
  }

  /// Token index immediately after the value starting at `idx`.
  ///
  /// # Panics
  ///
  /// Panics if `idx` does not start a value.
  #[must_use]
  pub fn skip_value(&self, idx: usize) -> usize {
    match self.tokens[idx].kind {
      TokenKind::ObjectOpen { close, .. } | TokenKind::ArrayOpen { close, .. } => {
        assert_ne!(close, UNRESOLVED, "skip over an unresolved container");
        close as usize + 1
      }
      TokenKind::Key(_) | TokenKind::ObjectClose { .. } | TokenKind::ArrayClose { .. } => {
        unreachable!("token at {idx} does not start a value")
      }
      _ => idx + 1,
    }
  }

  /// Find the value token index for `key` inside the object opening at
  /// `obj_idx`.
  ///
  /// Small objects scan linearly in source order. Large committed
  /// objects build an FNV-1a open-addressed probe on first access and
  /// reuse it for the rest of the parse.
  #[must_use]
  pub fn find_key(&self, obj_idx: usize, key: &[u8], source: &[u8]) -> Option<usize> {
    let TokenKind::ObjectOpen { close, count } = self.tokens[obj_idx].kind else {
      return None;
    };
    if close == UNRESOLVED {
      return None;
    }

    let probe_worthy = count > LINEAR_KEY_THRESHOLD
      && !self.tokens[obj_idx].synthetic
      && !self.tokens[close as usize].synthetic;

    if probe_worthy {
      self.ensure_probe(obj_idx as u32, close, source);
      let probes = self.key_probes.borrow();
      let probe = probes.get(&(obj_idx as u32)).expect("probe just built");
      return probe
        .lookup(key, |key_idx| self.str_bytes(self.key_at(key_idx), source))
        .map(|key_idx| key_idx as usize + 1);
    }

    let mut idx = obj_idx + 1;
    while idx < close as usize {
      let TokenKind::Key(kref) = self.tokens[idx].kind else {
        unreachable!("object member without key token at {idx}");
      };
      let value_idx = idx + 1;
      if self.str_bytes(kref, source) == key {
        return Some(value_idx);
      }
      idx = self.skip_value(value_idx);
    }
    None
  }

  fn key_at(&self, key_idx: u32) -> StrRef {
    match self.tokens[key_idx as usize].kind {
      TokenKind::Key(kref) => kref,
      other => unreachable!("expected key token, found {other:?}"),
    }
  }

  fn ensure_probe(&self, obj_idx: u32, close: u32, source: &[u8]) {
    if self.key_probes.borrow().contains_key(&obj_idx) {
      return;
    }

    let mut key_indices = Vec::new();
    let mut idx = obj_idx as usize + 1;
    while idx < close as usize {
      key_indices.push(idx as u32);
      idx = self.skip_value(idx + 1);
    }

    let mut probe = KeyProbe::with_capacity(key_indices.len());
    for &key_idx in &key_indices {
      let bytes = self.str_bytes(self.key_at(key_idx), source);
      probe.insert(key_idx, bytes);
    }
    self.key_probes.borrow_mut().insert(obj_idx, probe);
  }
}

/// Open-addressed key lookup table for a large object.
///
/// Slots hold key-token indices; hashing is FNV-1a over the decoded key
/// bytes. The table is sized to at least twice the member count rounded
/// up to a power of two, keeping the load factor at or below 0.5.
#[derive(Debug, PartialEq)]
struct KeyProbe {
  slots: Vec<u32>,
  mask: usize,
}

const EMPTY_SLOT: u32 = u32::MAX;

impl KeyProbe {
  fn with_capacity(count: usize) -> Self {
    let capacity = (count.max(1) * 2).next_power_of_two();
    Self {
      slots: vec![EMPTY_SLOT; capacity],
      mask: capacity - 1,
    }
  }

  fn insert(&mut self, key_idx: u32, key_bytes: &[u8]) {
    let mut slot = fnv1a(key_bytes) as usize & self.mask;
    while self.slots[slot] != EMPTY_SLOT {
      slot = (slot + 1) & self.mask;
    }
    self.slots[slot] = key_idx;
  }

  /// Returns the key-token index whose decoded bytes equal `key`.
  fn lookup<'a>(&self, key: &[u8], bytes_of: impl Fn(u32) -> &'a [u8]) -> Option<u32> {
    let mut slot = fnv1a(key) as usize & self.mask;
    loop {
      let key_idx = self.slots[slot];
      if key_idx == EMPTY_SLOT {
        return None;
      }
      if bytes_of(key_idx) == key {
        return Some(key_idx);
      }
      slot = (slot + 1) & self.mask;
    }
  }
}

fn fnv1a(bytes: &[u8]) -> u64 {
  let mut hash = 0xcbf2_9ce4_8422_2325u64;
  for &b in bytes {
    hash ^= u64::from(b);
    hash = hash.wrapping_mul(0x0000_0100_0000_01b3);
  }
  hash
}
