use rand::Rng;
use rand::seq::IndexedRandom as _;

use super::id::TransactionId;

/// Identifiers created by one session and believed to still exist on the server.
///
/// Ordered by creation; never holds duplicates.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KnownIds {
    ids: Vec<TransactionId>,
}

impl KnownIds {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `false` if the id was already known.
    pub fn insert(&mut self, id: TransactionId) -> bool {
        if self.ids.contains(&id) {
            return false;
        }
        self.ids.push(id);
        true
    }

    pub fn remove(&mut self, id: &TransactionId) -> bool {
        match self.ids.iter().position(|known| known == id) {
            Some(idx) => {
                self.ids.remove(idx);
                true
            }
            None => false,
        }
    }

    /// Uniformly random known id.
    pub fn choose<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<&TransactionId> {
        self.ids.choose(rng)
    }

    pub fn contains(&self, id: &TransactionId) -> bool {
        self.ids.contains(id)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &TransactionId> {
        self.ids.iter()
    }
}
