//! The streaming parser core: an append-only input buffer, the
//! scanner/classifier/builder pipeline run once per feed, the live
//! document tree with stable node identity, snapshot transfer, one-shot
//! parsing, and an async feed pump.

#![warn(clippy::pedantic)]

pub mod buffer;
pub mod doc;
pub mod error;
pub mod oneshot;
pub mod parser;
pub mod pump;
pub mod snapshot;

pub use buffer::InputBuffer;
pub use doc::{DocNode, LiveDoc, NodeId};
pub use error::CoreError;
pub use oneshot::{Parsed, parse, parse_complete, parse_single, parse_with_options};
pub use parser::{ParserOptions, ParserStatus, StreamParser};
pub use pump::FeedPump;
pub use snapshot::{Snapshot, SnapshotError, SnapshotFormat};

pub use vjson_classify::{Completion, ErrorKind, ParseError, Status};
pub use vjson_tape::{OwnedValue, Path, PathSet, Tape, TapeValue};
