//! Path subscriptions and event dispatch over the streaming parser:
//! value events as fields complete, string deltas while they grow, skip
//! paths that are never materialized, prose pre-filtering, and
//! newline-delimited multi-root streams.

#![warn(clippy::pedantic)]

mod dispatch;
pub mod error;
pub mod event_parser;
pub mod schema;
mod seeker;
pub mod subscribe;

pub use error::EventError;
pub use event_parser::{EventParser, EventParserOptions, Format};
pub use schema::Schema;
pub use subscribe::{StringDelta, SubscriptionId};

pub use vjson_core::{ParserStatus, StreamParser};
pub use vjson_tape::{OwnedValue, Path, PathSet};
