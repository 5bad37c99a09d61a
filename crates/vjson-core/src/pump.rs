//! Async feed pump — bridges an `AsyncRead` byte source into the
//! synchronous parser.
//!
//! The core never blocks and never suspends; this adapter owns the only
//! await points. Backpressure is natural: the next chunk is read only
//! when the caller asks for the next status.

use tokio::io::{AsyncRead, AsyncReadExt};

use crate::parser::{ParserStatus, StreamParser};

/// Default read chunk size. Tool-call streams arrive in far smaller
/// pieces; this is just the upper bound per read.
const CHUNK_CAPACITY: usize = 4096;

/// Pumps chunks from an async reader into a [`StreamParser`].
///
/// ```rust,no_run
/// use tokio::io::AsyncRead;
/// use vjson_core::{FeedPump, StreamParser};
///
/// async fn drive(reader: impl AsyncRead + Unpin) {
///     let mut pump = FeedPump::new(reader, StreamParser::new());
///     while let Some(status) = pump.pump_next().await.transpose().unwrap() {
///         // Inspect pump.parser() for live progress after each chunk...
///         let _ = status;
///     }
/// }
/// ```
pub struct FeedPump<R> {
  reader: R,
  parser: StreamParser,
  chunk: Vec<u8>,
}

impl<R: AsyncRead + Unpin> FeedPump<R> {
  #[must_use]
  pub fn new(reader: R, parser: StreamParser) -> Self {
    Self {
      reader,
      parser,
      chunk: vec![0; CHUNK_CAPACITY],
    }
  }

  /// Read one chunk and feed it.
  ///
  /// Returns `Ok(Some(status))` per chunk, `Ok(None)` once the source
  /// is exhausted (after signalling end-of-input to the parser), or the
  /// underlying I/O error.
  pub async fn pump_next(&mut self) -> Option<Result<ParserStatus, std::io::Error>> {
    match self.reader.read(&mut self.chunk).await {
      Ok(0) => {
        self.parser.end();
        None
      }
      Ok(n) => {
        let status = self.parser.feed(&self.chunk[..n]);
        Some(Ok(status))
      }
      Err(e) => Some(Err(e)),
    }
  }

  /// Pump until the source is exhausted and hand the parser back.
  ///
  /// # Errors
  ///
  /// The first I/O error from the reader (parser state up to that point
  /// is lost).
  pub async fn run_to_end(mut self) -> Result<StreamParser, std::io::Error> {
    while let Some(result) = self.pump_next().await {
      result?;
    }
    Ok(self.parser)
  }

  #[must_use]
  pub fn parser(&self) -> &StreamParser {
    &self.parser
  }

  pub fn parser_mut(&mut self) -> &mut StreamParser {
    &mut self.parser
  }

  #[must_use]
  pub fn into_parser(self) -> StreamParser {
    self.parser
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[tokio::test]
  async fn pumps_a_cursor_to_completion() {
    let payload = br#"{"tool":"search","args":{"q":"simd json"}}"#;
    let cursor = std::io::Cursor::new(payload.to_vec());
    let pump = FeedPump::new(tokio::io::BufReader::new(cursor), StreamParser::new());
    let parser = pump.run_to_end().await.unwrap();

    assert_eq!(parser.status(), ParserStatus::Complete);
    let root = parser.value().unwrap().unwrap();
    assert_eq!(root.get("tool").unwrap().as_str(), Some("search"));
  }

  #[tokio::test]
  async fn intermediate_statuses_are_observable() {
    // A reader that trickles 4 bytes at a time.
    let payload = br#"{"msg":"Hello, world"}"#.to_vec();
    let reader = tokio::io::BufReader::with_capacity(4, std::io::Cursor::new(payload));
    let mut pump = FeedPump::new(reader.take(u64::MAX), StreamParser::new());

    let mut saw_incomplete = false;
    while let Some(status) = pump.pump_next().await.transpose().unwrap() {
      if status == ParserStatus::Incomplete {
        saw_incomplete = true;
      }
    }
    assert!(pump.parser().status() == ParserStatus::Complete);
    assert!(saw_incomplete || pump.parser().status() == ParserStatus::Complete);
  }

  #[tokio::test]
  async fn eof_terminates_root_number() {
    let cursor = std::io::Cursor::new(b"42".to_vec());
    let parser = FeedPump::new(cursor, StreamParser::new())
      .run_to_end()
      .await
      .unwrap();
    assert_eq!(parser.status(), ParserStatus::Complete);
    assert_eq!(parser.value().unwrap().unwrap().as_i64(), Some(42));
  }
}
