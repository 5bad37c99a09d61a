//! The prose seeker: strips LLM scaffolding ahead of the first JSON
//! byte.
//!
//! Models wrap tool-call JSON in preambles, `<think>…</think>` blocks
//! and fenced code blocks. The seeker consumes the stream until the
//! document starts, handing the stripped prose to `on_text` and
//! everything from the first JSON byte onward to the parser:
//!
//! ```text
//!   <think>pick the search tool</think>   →  text: "pick the search tool"
//!   Here is the call:                     →  text: "Here is the call:"
//!   ```json                               →  (fence header dropped)
//!   {"tool":"search", ...                 →  fed to the parser
//! ```
//!
//! A stream whose very first non-whitespace bytes already start a JSON
//! value skips seeking entirely; a closing fence after the document is
//! ordinary trailing content and surfaces as complete-early.

/// Output of one seeker push: prose segments to deliver, and the bytes
/// that belong to the JSON document.
#[derive(Debug, Default, PartialEq, Eq)]
pub(crate) struct Seeked {
  pub(crate) text: Vec<String>,
  pub(crate) json: Vec<u8>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum State {
  /// Nothing but whitespace so far: an immediate JSON value start is
  /// accepted without seeking.
  StreamStart,
  /// A leading `t`/`f`/`n` that may still be a bare atom root; resolved
  /// once it diverges from or completes a literal.
  AtomCandidate,
  /// Accumulating prose, watching for scaffolding markers and `{`/`[`.
  Prose,
  /// Inside `<think>…</think>`.
  Think,
  /// After ```` ``` ````, discarding the fence info string.
  FenceHeader,
  /// After a fence header: the document body starts at the next
  /// non-whitespace byte.
  FenceBody,
  /// Document found; everything passes through.
  Json,
}

/// Incremental scaffolding stripper.
#[derive(Debug)]
pub(crate) struct Seeker {
  state: State,
  /// Bytes held back: prose not yet flushed, or a possible partial
  /// marker / atom prefix.
  pending: Vec<u8>,
  enabled: bool,
}

const THINK_OPEN: &[u8] = b"<think>";
const THINK_CLOSE: &[u8] = b"</think>";
const FENCE: &[u8] = b"```";

impl Seeker {
  pub(crate) fn new(enabled: bool) -> Self {
    Self {
      state: if enabled { State::StreamStart } else { State::Json },
      pending: Vec::new(),
      enabled,
    }
  }

  pub(crate) fn reset(&mut self) {
    *self = Self::new(self.enabled);
  }

  /// True once the JSON document has started (or seeking is disabled).
  pub(crate) fn in_json(&self) -> bool {
    self.state == State::Json
  }

  /// Consume one chunk.
  pub(crate) fn push(&mut self, chunk: &[u8]) -> Seeked {
    let mut out = Seeked::default();
    if self.state == State::Json {
      out.json.extend_from_slice(chunk);
      return out;
    }

    self.pending.extend_from_slice(chunk);
    loop {
      if !self.step(&mut out) {
        break;
      }
    }
    out
  }

  /// One state transition over `pending`; returns false when no further
  /// progress is possible without more input.
  fn step(&mut self, out: &mut Seeked) -> bool {
    match self.state {
      State::Json => {
        if !self.pending.is_empty() {
          out.json.append(&mut self.pending);
        }
        false
      }

      State::StreamStart => {
        let Some(first) = self.pending.iter().position(|&b| !is_ws(b)) else {
          return false;
        };
        match self.pending[first] {
          b'{' | b'[' | b'"' | b'-' | b'0'..=b'9' => {
            self.enter_json(first, out);
            true
          }
          b't' | b'f' | b'n' => {
            self.state = State::AtomCandidate;
            true
          }
          _ => {
            self.state = State::Prose;
            true
          }
        }
      }

      State::AtomCandidate => {
        let first = self
          .pending
          .iter()
          .position(|&b| !is_ws(b))
          .expect("candidate implies a non-ws byte");
        let candidate = &self.pending[first..];
        let literal: &[u8] = match candidate[0] {
          b't' => b"true",
          b'f' => b"false",
          _ => b"null",
        };
        let matched = candidate.iter().zip(literal).take_while(|(a, b)| a == b).count();
        if matched == literal.len() {
          // A bare atom root: it is the document.
          self.enter_json(first, out);
          true
        } else if matched == candidate.len() {
          // Still a strict prefix — wait for more bytes.
          false
        } else {
          // Diverged (e.g. "the answer"): it was prose all along.
          self.state = State::Prose;
          true
        }
      }

      State::Prose => self.scan_prose(out),

      State::Think => {
        if let Some(pos) = find(&self.pending, THINK_CLOSE) {
          let content = self.pending[..pos].to_vec();
          emit_text(out, &content);
          self.pending.drain(..pos + THINK_CLOSE.len());
          self.state = State::Prose;
          true
        } else {
          // Hold back a possible partial close tag, flush the rest.
          let hold = partial_suffix(&self.pending, THINK_CLOSE);
          let flush: Vec<u8> = self.pending.drain(..self.pending.len() - hold).collect();
          emit_text(out, &flush);
          false
        }
      }

      State::FenceHeader => {
        if let Some(pos) = self.pending.iter().position(|&b| b == b'\n') {
          self.pending.drain(..=pos);
          self.state = State::FenceBody;
          true
        } else {
          false
        }
      }

      State::FenceBody => {
        let Some(first) = self.pending.iter().position(|&b| !is_ws(b)) else {
          return false;
        };
        self.enter_json(first, out);
        true
      }
    }
  }

  /// In prose: emit text until a marker or a document opener.
  fn scan_prose(&mut self, out: &mut Seeked) -> bool {
    for i in 0..self.pending.len() {
      match self.pending[i] {
        b'{' | b'[' => {
          let prose = self.pending[..i].to_vec();
          emit_text(out, &prose);
          self.pending.drain(..i);
          self.enter_json(0, out);
          return true;
        }
        b'<' if self.pending[i..].starts_with(THINK_OPEN) => {
          let prose = self.pending[..i].to_vec();
          emit_text(out, &prose);
          self.pending.drain(..i + THINK_OPEN.len());
          self.state = State::Think;
          return true;
        }
        b'`' if self.pending[i..].starts_with(FENCE) => {
          let prose = self.pending[..i].to_vec();
          emit_text(out, &prose);
          self.pending.drain(..i + FENCE.len());
          self.state = State::FenceHeader;
          return true;
        }
        b'<' | b'`' => {
          // Possible partial marker at the tail: hold it and whatever
          // follows; flush the prose before it.
          let marker = if self.pending[i] == b'<' {
            THINK_OPEN
          } else {
            FENCE
          };
          if self.pending.len() - i < marker.len()
            && marker.starts_with(&self.pending[i..])
          {
            let prose = self.pending[..i].to_vec();
            emit_text(out, &prose);
            self.pending.drain(..i);
            return false;
          }
          // A lone `<` or backtick inside prose: keep scanning.
        }
        _ => {}
      }
    }
    // No markers: everything so far is prose.
    let prose = std::mem::take(&mut self.pending);
    emit_text(out, &prose);
    false
  }

  fn enter_json(&mut self, offset: usize, out: &mut Seeked) {
    out.json.extend_from_slice(&self.pending[offset..]);
    self.pending.clear();
    self.state = State::Json;
  }
}

fn is_ws(b: u8) -> bool {
  matches!(b, b' ' | b'\t' | b'\n' | b'\r')
}

fn emit_text(out: &mut Seeked, bytes: &[u8]) {
  if bytes.iter().any(|&b| !is_ws(b)) {
    out
      .text
      .push(String::from_utf8_lossy(bytes).into_owned());
  }
}

/// First occurrence of `needle` in `haystack`.
fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
  haystack.windows(needle.len()).position(|w| w == needle)
}

/// Length of the longest suffix of `bytes` that is a proper prefix of
/// `marker`.
fn partial_suffix(bytes: &[u8], marker: &[u8]) -> usize {
  let max = (marker.len() - 1).min(bytes.len());
  (1..=max)
    .rev()
    .find(|&n| marker.starts_with(&bytes[bytes.len() - n..]))
    .unwrap_or(0)
}
