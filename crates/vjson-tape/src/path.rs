//! Compiled document paths.
//!
//! Paths select values inside a document for subscriptions and skips:
//! dot-separated keys, bracketed numeric indices, and wildcards.
//!
//! ```text
//!   tool                  exact key at the root object
//!   items[0].name         key → index → key
//!   items[*].name         any index in `items`
//!   *.status              any single key or index, then `status`
//! ```
//!
//! Keys containing dots or brackets are not representable (documented
//! restriction of the path syntax).

use std::fmt;

/// One compiled path segment.
///
/// `AnyKey` (a wildcard limited to object keys) has no surface syntax;
/// it is reachable through [`Path::from_segments`] for callers that need
/// to exclude array positions from a wildcard.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Segment {
  /// Exact object key.
  Key(String),
  /// Exact array index.
  Index(u32),
  /// Any single key or index (`*`).
  Any,
  /// Any array index (`[*]`).
  AnyIndex,
  /// Any object key (no surface syntax).
  AnyKey,
}

/// A concrete position inside a document, as tracked by tape walkers.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PathAtom {
  Key(String),
  Index(u32),
}

impl Segment {
  fn matches(&self, atom: &PathAtom) -> bool {
    match (self, atom) {
      (Self::Key(k), PathAtom::Key(a)) => k == a,
      (Self::Index(i), PathAtom::Index(a)) => i == a,
      (Self::Any, _) => true,
      (Self::AnyIndex, PathAtom::Index(_)) => true,
      (Self::AnyKey, PathAtom::Key(_)) => true,
      _ => false,
    }
  }
}

/// Path syntax failure.
#[derive(Clone, Debug, thiserror::Error, PartialEq, Eq)]
pub enum PathError {
  #[error("empty path")]
  Empty,
  #[error("empty segment at byte {0}")]
  EmptySegment(usize),
  #[error("malformed bracket segment at byte {0}")]
  BadBracket(usize),
}

/// An ordered list of segments, compiled once per subscription.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Path {
  segments: Vec<Segment>,
}

impl Path {
  /// Compile a path from its textual form.
  ///
  /// # Errors
  ///
  /// [`PathError`] on empty input, empty segments (`a..b`), or
  /// malformed brackets (`a[x]`, unterminated `[`).
  pub fn parse(text: &str) -> Result<Self, PathError> {
    if text.is_empty() {
      return Err(PathError::Empty);
    }

    let bytes = text.as_bytes();
    let mut segments = Vec::new();
    let mut i = 0;
    let mut expect_key = true;

    while i < bytes.len() {
      match bytes[i] {
        b'[' => {
          let close = bytes[i..]
            .iter()
            .position(|&b| b == b']')
            .ok_or(PathError::BadBracket(i))?
            + i;
          let inner = &text[i + 1..close];
          if inner == "*" {
            segments.push(Segment::AnyIndex);
          } else {
            let index: u32 = inner.parse().map_err(|_| PathError::BadBracket(i))?;
            segments.push(Segment::Index(index));
          }
          i = close + 1;
          // After `]`, either end, a dot, or another bracket.
          if i < bytes.len() && bytes[i] == b'.' {
            i += 1;
            expect_key = true;
          } else {
            expect_key = false;
          }
        }
        b'.' => return Err(PathError::EmptySegment(i)),
        _ => {
          if !expect_key && !segments.is_empty() {
            return Err(PathError::BadBracket(i));
          }
          let end = bytes[i..]
            .iter()
            .position(|&b| b == b'.' || b == b'[')
            .map_or(bytes.len(), |p| i + p);
          let seg = &text[i..end];
          if seg.is_empty() {
            return Err(PathError::EmptySegment(i));
          }
          if seg == "*" {
            segments.push(Segment::Any);
          } else {
            segments.push(Segment::Key(seg.to_string()));
          }
          i = end;
          if i < bytes.len() && bytes[i] == b'.' {
            i += 1;
            expect_key = true;
            if i == bytes.len() {
              return Err(PathError::EmptySegment(i));
            }
          } else {
            expect_key = false;
          }
        }
      }
    }

    if segments.is_empty() {
      return Err(PathError::Empty);
    }
    Ok(Self { segments })
  }

  /// Build from pre-compiled segments.
  #[must_use]
  pub fn from_segments(segments: Vec<Segment>) -> Self {
    Self { segments }
  }

  #[must_use]
  pub fn segments(&self) -> &[Segment] {
    &self.segments
  }

  /// Exact match: the position is precisely this path.
  #[must_use]
  pub fn matches(&self, atoms: &[PathAtom]) -> bool {
    self.segments.len() == atoms.len() && self.matches_prefix(atoms)
  }

  /// Prefix match: the position is at or below this path.
  #[must_use]
  pub fn matches_prefix(&self, atoms: &[PathAtom]) -> bool {
    self.segments.len() <= atoms.len()
      && self
        .segments
        .iter()
        .zip(atoms)
        .all(|(seg, atom)| seg.matches(atom))
  }
}

impl fmt::Display for Path {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    for (i, seg) in self.segments.iter().enumerate() {
      match seg {
        Segment::Key(k) => {
          if i > 0 {
            f.write_str(".")?;
          }
          f.write_str(k)?;
        }
        Segment::Index(n) => write!(f, "[{n}]")?,
        Segment::Any => {
          if i > 0 {
            f.write_str(".")?;
          }
          f.write_str("*")?;
        }
        Segment::AnyIndex => f.write_str("[*]")?,
        Segment::AnyKey => {
          if i > 0 {
            f.write_str(".")?;
          }
          f.write_str("*:key")?;
        }
      }
    }
    Ok(())
  }
}

/// A set of paths checked together — the skip list.
#[derive(Clone, Debug, Default)]
pub struct PathSet {
  paths: Vec<Path>,
}

impl PathSet {
  #[must_use]
  pub fn new() -> Self {
    Self::default()
  }

  pub fn insert(&mut self, path: Path) {
    if !self.paths.contains(&path) {
      self.paths.push(path);
    }
  }

  #[must_use]
  pub fn is_empty(&self) -> bool {
    self.paths.is_empty()
  }

  /// True when the position sits exactly at one of the set's paths.
  #[must_use]
  pub fn matches(&self, atoms: &[PathAtom]) -> bool {
    self.paths.iter().any(|p| p.matches(atoms))
  }

  /// True when the position is at or below any path in the set — the
  /// whole subtree is pruned.
  #[must_use]
  pub fn prunes(&self, atoms: &[PathAtom]) -> bool {
    self.paths.iter().any(|p| p.matches_prefix(atoms))
  }
}
