//! The token tape: a flat, append-only encoding of a parsed JSON value,
//! plus everything that reads it — the incremental tape builder, the lazy
//! accessor, structural deep compare and owned-tree materialization.

#![warn(clippy::pedantic)]

pub mod arena;
pub mod builder;
pub mod compare;
pub mod number;
pub mod owned;
pub mod path;
pub mod string;
pub mod tape;
pub mod token;
pub mod value;

pub use arena::StringArena;
pub use builder::TapeBuilder;
pub use compare::{CompareMode, owned_eq, tape_eq, tape_eq_owned};
pub use owned::OwnedValue;
pub use path::{Path, PathAtom, PathSet, Segment};
pub use tape::Tape;
pub use token::{Span, StrRef, Token, TokenKind, UNRESOLVED};
pub use value::TapeValue;

pub use vjson_classify::{ErrorKind, ParseError};
