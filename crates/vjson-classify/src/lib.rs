//! Input classifier and autocompleter.
//!
//! A byte-level state machine that, for any prefix of a JSON document,
//! produces a structural classification (complete / complete-early /
//! incomplete / invalid) and — for the incomplete case — the minimal
//! suffix that turns the prefix into a legal document. The machine is
//! maintained across feeds and only ever consumes new bytes.

#![warn(clippy::pedantic)]

pub mod classifier;
pub mod completion;
pub mod error;

pub use classifier::{Atom, Classifier, Expect, Status, Tail};
pub use completion::Completion;
pub use error::{ErrorKind, ParseError};
