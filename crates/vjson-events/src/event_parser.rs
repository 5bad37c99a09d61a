//! The event parser: the consumer-facing streaming surface.

use vjson_core::{CoreError, DocNode, ParserOptions, ParserStatus, StreamParser};
use vjson_tape::{OwnedValue, Path, PathSet};

use crate::dispatch::Dispatcher;
use crate::error::EventError;
use crate::schema::Schema;
use crate::seeker::Seeker;
use crate::subscribe::{Callback, Registry, StringDelta, SubscriptionId};

/// Input framing accepted at the event-parser boundary. The core always
/// parses canonical JSON; formats other than [`Format::Json`] are
/// handled by pre/post-processing around it.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Format {
  #[default]
  Json,
  /// Newline-delimited multi-root: each complete value fires `on_root`
  /// and resets the parser for the next.
  NdJson,
  /// Liberal JSON (comments, trailing commas, unquoted keys, …). No
  /// preprocessor is built; constructing with this format is refused.
  Json5,
}

/// Event parser construction options.
#[derive(Clone, Debug, Default)]
pub struct EventParserOptions {
  pub format: Format,
  /// Strip LLM scaffolding (prose, `<think>` blocks, code fences)
  /// before the first JSON byte, delivering it via `on_text`.
  pub seek: bool,
  /// Options forwarded to the underlying parser. The skip set is
  /// extended by [`skip`](EventParser::skip) calls.
  pub parser: ParserOptions,
}

/// A streaming parser with path subscriptions.
///
/// All callbacks fire synchronously inside [`feed`](Self::feed), on the
/// caller's stack, in tape-token order. Re-entrant feeding from a
/// callback is unrepresentable (`feed` holds `&mut self`); a panicking
/// callback propagates out of `feed` and later tokens of that feed are
/// not delivered.
pub struct EventParser {
  parser: StreamParser,
  dispatcher: Dispatcher,
  registry: Registry,
  seeker: Seeker,
  format: Format,
  options: EventParserOptions,
  skip: PathSet,
  started: bool,
  ended: bool,
}

impl std::fmt::Debug for EventParser {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("EventParser")
      .field("parser", &self.parser)
      .field("format", &self.format)
      .field("options", &self.options)
      .field("started", &self.started)
      .field("ended", &self.ended)
      .finish_non_exhaustive()
  }
}

impl EventParser {
  /// # Errors
  ///
  /// [`EventError::UnsupportedFormat`] for [`Format::Json5`].
  pub fn new() -> Self {
    Self::with_options(EventParserOptions {
      seek: true,
      ..EventParserOptions::default()
    })
    .expect("default options are supported")
  }

  /// # Errors
  ///
  /// [`EventError::UnsupportedFormat`] for [`Format::Json5`].
  pub fn with_options(options: EventParserOptions) -> Result<Self, EventError> {
    if options.format == Format::Json5 {
      return Err(EventError::UnsupportedFormat("json5"));
    }
    let skip = options.parser.skip.clone();
    Ok(Self {
      parser: StreamParser::with_options(options.parser.clone()),
      dispatcher: Dispatcher::new(),
      registry: Registry::default(),
      seeker: Seeker::new(options.seek),
      format: options.format,
      options,
      skip,
      started: false,
      ended: false,
    })
  }

  // ── Subscriptions ───────────────────────────────────────────────────

  /// Value event: fires once per value completing at the path.
  ///
  /// # Errors
  ///
  /// Path syntax errors.
  pub fn on(
    &mut self,
    path: &str,
    callback: impl FnMut(&OwnedValue) + 'static,
  ) -> Result<SubscriptionId, EventError> {
    let path = Path::parse(path)?;
    Ok(self.registry.add(Some(path), Callback::Value(Box::new(callback))))
  }

  /// Schema-gated value event: fires only when `schema.safe_parse`
  /// succeeds; the callback receives the transformed value.
  ///
  /// # Errors
  ///
  /// Path syntax errors.
  pub fn on_schema(
    &mut self,
    path: &str,
    schema: impl Schema + 'static,
    callback: impl FnMut(&OwnedValue) + 'static,
  ) -> Result<SubscriptionId, EventError> {
    let path = Path::parse(path)?;
    Ok(self.registry.add(
      Some(path),
      Callback::Gated {
        schema: Box::new(schema),
        handler: Box::new(callback),
      },
    ))
  }

  /// String delta event: fires per batch of decoded characters
  /// committed at the path, in commit order.
  ///
  /// # Errors
  ///
  /// Path syntax errors.
  pub fn on_delta(
    &mut self,
    path: &str,
    callback: impl FnMut(&StringDelta<'_>) + 'static,
  ) -> Result<SubscriptionId, EventError> {
    let path = Path::parse(path)?;
    Ok(self.registry.add(Some(path), Callback::Delta(Box::new(callback))))
  }

  /// Pre-document prose from the seeker.
  pub fn on_text(&mut self, callback: impl FnMut(&str) + 'static) -> SubscriptionId {
    self.registry.add(None, Callback::Text(Box::new(callback)))
  }

  /// Completed roots in [`Format::NdJson`] mode.
  pub fn on_root(&mut self, callback: impl FnMut(&OwnedValue) + 'static) -> SubscriptionId {
    self.registry.add(None, Callback::Root(Box::new(callback)))
  }

  /// Never materialize these subtrees: no tree nodes, no arena decode,
  /// no events. Takes precedence over other subscriptions.
  ///
  /// # Errors
  ///
  /// Path syntax errors, or [`EventError::SkipAfterFeed`] once feeding
  /// has begun (the builder honours skips from byte zero).
  pub fn skip(&mut self, paths: &[&str]) -> Result<(), EventError> {
    if self.started {
      return Err(EventError::SkipAfterFeed);
    }
    for text in paths {
      self.skip.insert(Path::parse(text)?);
    }
    let mut parser_options = self.options.parser.clone();
    parser_options.skip = self.skip.clone();
    self.parser = StreamParser::with_options(parser_options);
    Ok(())
  }

  /// Remove all subscriptions on a path; returns how many were removed.
  ///
  /// # Errors
  ///
  /// Path syntax errors.
  pub fn off(&mut self, path: &str) -> Result<usize, EventError> {
    let path = Path::parse(path)?;
    Ok(self.registry.remove_path(&path))
  }

  /// Remove one subscription by its id.
  pub fn off_id(&mut self, id: SubscriptionId) -> bool {
    self.registry.remove_id(id)
  }

  // ── Streaming ───────────────────────────────────────────────────────

  /// Feed one chunk; fires matching callbacks before returning.
  pub fn feed(&mut self, chunk: &[u8]) -> ParserStatus {
    self.started = true;

    let json = if self.seeker.in_json() {
      chunk.to_vec()
    } else {
      let seeked = self.seeker.push(chunk);
      for text in &seeked.text {
        self.fire_text(text);
      }
      seeked.json
    };

    self.feed_json(&json)
  }

  fn feed_json(&mut self, bytes: &[u8]) -> ParserStatus {
    let status = self.parser.feed(bytes);
    if status == ParserStatus::Error {
      return status;
    }
    self
      .dispatcher
      .dispatch(&self.parser, &self.skip, &mut self.registry);

    if self.format == Format::NdJson && status == ParserStatus::CompleteEarly {
      // Root boundary: deliver it, reset, continue with the tail.
      self.fire_root();
      let tail = self
        .parser
        .remaining()
        .map(<[u8]>::to_vec)
        .unwrap_or_default();
      self.reset_for_next_root();
      if tail.is_empty() {
        return self.parser.status();
      }
      // Recurse once per extra root in this chunk.
      return self.feed_json(&tail);
    }
    status
  }

  /// Signal end-of-input. In multi-root mode the final complete root is
  /// delivered via `on_root`. Idempotent.
  pub fn end(&mut self) -> ParserStatus {
    if self.ended {
      return self.parser.status();
    }
    self.ended = true;

    let before = self.parser.status();
    let status = self.parser.end();
    if before == ParserStatus::Incomplete && status == ParserStatus::Complete {
      // End-of-input terminated a root scalar: its tokens changed.
      self
        .dispatcher
        .dispatch(&self.parser, &self.skip, &mut self.registry);
    }
    if self.format == Format::NdJson && status == ParserStatus::Complete {
      self.fire_root();
    }
    status
  }

  fn fire_text(&mut self, text: &str) {
    for sub in &mut self.registry.subs {
      if let Callback::Text(handler) = &mut sub.callback {
        handler(text);
      }
    }
  }

  fn fire_root(&mut self) {
    let Ok(Some(root)) = self.parser.value() else {
      return;
    };
    let value = root.materialize();
    for sub in &mut self.registry.subs {
      if let Callback::Root(handler) = &mut sub.callback {
        handler(&value);
      }
    }
  }

  fn reset_for_next_root(&mut self) {
    self.parser.reset();
    self.dispatcher.reset();
    self.registry.reset_stream_state();
  }

  // ── Accessors (mirror the core parser) ──────────────────────────────

  #[must_use]
  pub fn status(&self) -> ParserStatus {
    self.parser.status()
  }

  /// # Errors
  ///
  /// See [`StreamParser::value`].
  pub fn value(&self) -> Result<Option<DocNode<'_>>, CoreError> {
    self.parser.value()
  }

  #[must_use]
  pub fn remaining(&self) -> Option<&[u8]> {
    self.parser.remaining()
  }

  #[must_use]
  pub fn error(&self) -> Option<vjson_classify::ParseError> {
    self.parser.error()
  }

  pub fn destroy(&mut self) {
    self.parser.destroy();
  }

  #[must_use]
  pub fn parser(&self) -> &StreamParser {
    &self.parser
  }
}

impl Default for EventParser {
  fn default() -> Self {
    Self::new()
  }
}
