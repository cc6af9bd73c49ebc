//! The data bus.
//!
//! [`DataBus`] is the only mutable state shared between nodes of a run. It is
//! a plain keyed map behind a reader-writer lock.
//!
//! # Ownership
//!
//! The bus does not arbitrate same-key races. A run must ensure at most one
//! writer per key, which the raster pipeline does by suffixing every templated
//! key with the instance index of the node that owns it.

use crate::error::DataError;
use crate::instruction::{CompositeInstruction, MoveInstruction};
use crate::value::{Data, DataKind};
use hashbrown::HashMap;
use parking_lot::RwLock;

/// Thread-safe keyed store of [`Data`] values.
#[derive(Default)]
pub struct DataBus {
    entries: RwLock<HashMap<String, Data>>,
}

impl core::fmt::Debug for DataBus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("DataBus")
            .field("keys", &self.keys())
            .finish()
    }
}

impl DataBus {
    /// Creates an empty bus.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `value` under `key`, overwriting any previous value.
    pub fn set(&self, key: impl Into<String>, value: impl Into<Data>) {
        self.entries.write().insert(key.into(), value.into());
    }

    /// Returns a copy of the value under `key`, or `None` if absent.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<Data> {
        self.entries.read().get(key).cloned()
    }

    /// Returns the tag of the value under `key` without copying it.
    #[must_use]
    pub fn kind_of(&self, key: &str) -> Option<DataKind> {
        self.entries.read().get(key).map(Data::kind)
    }

    /// Removes and returns the value under `key`.
    pub fn remove(&self, key: &str) -> Option<Data> {
        self.entries.write().remove(key)
    }

    /// Returns `true` if a value is stored under `key`.
    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.entries.read().contains_key(key)
    }

    /// Returns all keys, sorted.
    #[must_use]
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.entries.read().keys().cloned().collect();
        keys.sort_unstable();
        keys
    }

    /// Number of stored values.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Returns `true` if nothing is stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Returns the composite under `key`.
    ///
    /// # Errors
    ///
    /// [`DataError::Missing`] if nothing is stored, [`DataError::TypeMismatch`]
    /// if the stored value is not a composite.
    pub fn get_composite(&self, key: &str) -> Result<CompositeInstruction, DataError> {
        let entries = self.entries.read();
        match entries.get(key) {
            Some(Data::Composite(composite)) => Ok(composite.clone()),
            Some(other) => Err(DataError::type_mismatch(
                key,
                DataKind::Composite,
                other.kind(),
            )),
            None => Err(DataError::missing(key)),
        }
    }

    /// Returns the move under `key`.
    ///
    /// # Errors
    ///
    /// [`DataError::Missing`] if nothing is stored, [`DataError::TypeMismatch`]
    /// if the stored value is not a move.
    pub fn get_move(&self, key: &str) -> Result<MoveInstruction, DataError> {
        let entries = self.entries.read();
        match entries.get(key) {
            Some(Data::Move(mv)) => Ok(mv.clone()),
            Some(other) => Err(DataError::type_mismatch(key, DataKind::Move, other.kind())),
            None => Err(DataError::missing(key)),
        }
    }
}
