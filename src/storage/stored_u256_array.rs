use super::ledger::Changeset;
use super::StoragePointer;
use crate::constants::EMPTY_SLOT;
use alloy_primitives::U256;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Persisted form of a [`StoredU256Array`].
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArraySnapshot {
    pub values: BTreeMap<u32, U256>,
    pub starting_index: u32,
    pub length: u32,
}

/// Append-only array of 256-bit values addressed by physical slot.
///
/// Deleting a slot zeroes it in place, later slots never shift. `len` is the number of slots
/// ever pushed and is the scan bound for the queues built on top of it. The starting index is
/// the compaction watermark: every slot before it is known to be empty.
#[derive(Debug)]
pub struct StoredU256Array {
    pointer: StoragePointer,
    values: BTreeMap<u32, U256>,
    starting_index: u32,
    length: u32,
    max_length: u32,
    dirty: bool,
}

impl StoredU256Array {
    pub fn new(pointer: StoragePointer, max_length: u32) -> Self {
        Self { pointer, values: BTreeMap::new(), starting_index: 0, length: 0, max_length, dirty: false }
    }

    /// Build a working copy from what the ledger holds for `pointer`.
    pub fn load(pointer: StoragePointer, snapshot: Option<&ArraySnapshot>, max_length: u32) -> Self {
        match snapshot {
            Some(snapshot) => Self {
                pointer,
                values: snapshot.values.clone(),
                starting_index: snapshot.starting_index,
                length: snapshot.length,
                max_length,
                dirty: false,
            },
            None => Self::new(pointer, max_length),
        }
    }

    pub fn pointer(&self) -> StoragePointer {
        self.pointer
    }

    /// Append a value. Returns `None` once the array holds `max_length` slots.
    pub fn push(&mut self, value: U256) -> Option<u32> {
        if self.length >= self.max_length {
            return None;
        }
        let index = self.length;
        if !value.is_zero() {
            self.values.insert(index, value);
        }
        self.length += 1;
        self.dirty = true;
        Some(index)
    }

    pub fn get_physical(&self, index: u32) -> U256 {
        self.values.get(&index).copied().unwrap_or(EMPTY_SLOT)
    }

    /// Zero a slot. Returns true if it held a value.
    pub fn delete_physical(&mut self, index: u32) -> bool {
        let removed = self.values.remove(&index).is_some();
        self.dirty |= removed;
        removed
    }

    pub fn starting_index(&self) -> u32 {
        self.starting_index
    }

    pub fn set_starting_index(&mut self, index: u32) {
        if self.starting_index != index {
            self.starting_index = index;
            self.dirty = true;
        }
    }

    pub fn len(&self) -> u32 {
        self.length
    }

    pub fn is_empty(&self) -> bool {
        self.length == 0
    }

    /// Number of slots that still hold a value.
    pub fn live_len(&self) -> u32 {
        self.values.len() as u32
    }

    pub fn max_length(&self) -> u32 {
        self.max_length
    }

    pub fn snapshot(&self) -> ArraySnapshot {
        ArraySnapshot { values: self.values.clone(), starting_index: self.starting_index, length: self.length }
    }

    /// Stage the array for commit if it changed since it was loaded or last saved.
    pub fn save(&mut self, changes: &mut Changeset) {
        if self.dirty {
            changes.put_array(self.pointer, self.snapshot());
            self.dirty = false;
        }
    }
}
