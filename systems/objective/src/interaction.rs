use std::collections::BTreeMap;

use horde_defense_core::ObjectId;

/// Registry mapping interaction points to the payload their owner bound to them.
#[derive(Clone, Debug)]
pub struct InteractionTable<P> {
    entries: BTreeMap<ObjectId, P>,
}

impl<P> Default for InteractionTable<P> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P> InteractionTable<P> {
    /// Creates an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }

    /// Binds `payload` to `point`, replacing any previous registration.
    pub fn register(&mut self, point: ObjectId, payload: P) {
        let _ = self.entries.insert(point, payload);
    }

    /// Removes the registration of `point`.
    pub fn unregister(&mut self, point: ObjectId) -> Option<P> {
        self.entries.remove(&point)
    }

    /// Payload bound to `point`; unregistered points resolve to nothing.
    #[must_use]
    pub fn resolve(&self, point: ObjectId) -> Option<&P> {
        self.entries.get(&point)
    }

    /// Number of registered points.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Reports whether no point is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
