//! Insertion-ordered, thread-safe registry of identified entities.
//!
//! Backs both the live connection set and every handler set. Mutation takes
//! the write lock; reads (including handler dispatch) take the read lock.

use std::fmt;
use std::sync::{Arc, RwLock, RwLockReadGuard};

/// An entity with a stable identifier.
pub trait Identified {
    /// Identifier type.
    type Id: Copy + Eq + fmt::Debug;

    /// Returns the entity's identifier.
    fn id(&self) -> Self::Id;
}

impl<T: Identified + ?Sized> Identified for Arc<T> {
    type Id = T::Id;

    fn id(&self) -> Self::Id {
        (**self).id()
    }
}

/// Ordered collection of entities keyed by id.
///
/// Entities are never mutated in place; replacing one means `remove` then
/// `add`.
pub struct Registry<E> {
    entries: RwLock<Vec<E>>,
}

impl<E: Identified + Clone> Registry<E> {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(Vec::new()),
        }
    }

    /// Appends an entity and returns it.
    ///
    /// Ids are not checked for collisions; generated ids are assumed unique.
    pub fn add(&self, entity: E) -> E {
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        entries.push(entity.clone());
        entity
    }

    /// Removes the entity with the same id as `entity`.
    pub fn remove(&self, entity: &E) -> bool {
        self.remove_id(&entity.id())
    }

    /// Removes the first entity with the given id. Survivors keep their order.
    pub fn remove_id(&self, id: &E::Id) -> bool {
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        match entries.iter().position(|entry| entry.id() == *id) {
            Some(index) => {
                entries.remove(index);
                true
            }
            None => false,
        }
    }

    /// Returns the number of held entities.
    pub fn count(&self) -> usize {
        self.read().len()
    }

    /// Returns `true` if the registry holds nothing.
    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    /// Looks up an entity by id.
    pub fn get(&self, id: &E::Id) -> Option<E> {
        self.read().iter().find(|entry| entry.id() == *id).cloned()
    }

    /// Returns a copy of the current contents in insertion order.
    pub fn snapshot(&self) -> Vec<E> {
        self.read().clone()
    }

    /// Shared access to the entries. The guard blocks `add`/`remove` until
    /// dropped.
    pub(crate) fn read(&self) -> RwLockReadGuard<'_, Vec<E>> {
        self.entries.read().unwrap_or_else(|e| e.into_inner())
    }
}

impl<E: Identified + Clone> Default for Registry<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: Identified + Clone> fmt::Debug for Registry<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("count", &self.count())
            .finish()
    }
}
