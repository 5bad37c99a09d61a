//! The subscription registry: tagged callback records keyed by path.

use vjson_tape::{OwnedValue, Path};

use crate::schema::Schema;

/// Handle returned by every subscription, usable with `off_id`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SubscriptionId(pub(crate) u64);

/// One batch of newly decoded characters of a growing string.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StringDelta<'a> {
  /// The decoded new characters.
  pub chars: &'a str,
  /// Source-byte offset of the new bytes.
  pub offset: usize,
  /// Source-byte length of the new bytes (differs from `chars.len()`
  /// when escapes were decoded).
  pub len: usize,
}

/// The tagged callback of a subscription.
pub(crate) enum Callback {
  /// Fires once per completed value at the path.
  Value(Box<dyn FnMut(&OwnedValue)>),
  /// Fires only when the schema accepts; receives the transformed value.
  Gated {
    schema: Box<dyn Schema>,
    handler: Box<dyn FnMut(&OwnedValue)>,
  },
  /// Fires per decoded batch of a string growing at the path.
  Delta(Box<dyn FnMut(&StringDelta<'_>)>),
  /// Fires with pre-document prose from the seeker.
  Text(Box<dyn FnMut(&str)>),
  /// Fires per completed root in multi-root mode.
  Root(Box<dyn FnMut(&OwnedValue)>),
}

pub(crate) struct Subscription {
  pub(crate) id: SubscriptionId,
  /// `None` for text and root callbacks, which are not path-scoped.
  pub(crate) path: Option<Path>,
  pub(crate) callback: Callback,
  /// Delta bookkeeping: identity (source start offset) of the string
  /// currently streaming through this subscription.
  pub(crate) cur_string: Option<usize>,
  /// Decoded bytes already delivered for the current string.
  pub(crate) delivered: usize,
  /// Source offset one past the last delivered batch.
  pub(crate) src_end: usize,
}

/// Flat subscription store. Subscriptions are few (human-written); scans
/// are linear and ordering is registration order.
#[derive(Default)]
pub(crate) struct Registry {
  pub(crate) subs: Vec<Subscription>,
  next_id: u64,
}

impl Registry {
  pub(crate) fn add(&mut self, path: Option<Path>, callback: Callback) -> SubscriptionId {
    self.next_id += 1;
    let id = SubscriptionId(self.next_id);
    self.subs.push(Subscription {
      id,
      path,
      callback,
      cur_string: None,
      delivered: 0,
      src_end: 0,
    });
    id
  }

  /// Remove every subscription on a path; returns how many went away.
  pub(crate) fn remove_path(&mut self, path: &Path) -> usize {
    let before = self.subs.len();
    self.subs.retain(|s| s.path.as_ref() != Some(path));
    before - self.subs.len()
  }

  pub(crate) fn remove_id(&mut self, id: SubscriptionId) -> bool {
    let before = self.subs.len();
    self.subs.retain(|s| s.id != id);
    before != self.subs.len()
  }

  /// Multi-root reset: delta bookkeeping restarts, subscriptions stay.
  pub(crate) fn reset_stream_state(&mut self) {
    for sub in &mut self.subs {
      sub.cur_string = None;
      sub.delivered = 0;
      sub.src_end = 0;
    }
  }
}
