use super::ledger::Changeset;
use super::StoragePointer;
use crate::error::QueueError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Persisted form of a [`StoredU32Queue`].
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueSnapshot {
    pub values: BTreeMap<u32, u32>,
    pub starting_index: u32,
    pub length: u32,
}

/// One entry handed out by [`StoredU32Queue::next`] or [`StoredU32Queue::front`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct QueueEntry {
    /// `None` when the position was tombstoned with [`StoredU32Queue::delete_at`].
    pub value: Option<u32>,
    /// Position the entry was read from.
    pub previous_offset: u32,
    /// Position the entry lives at now. Equal to `previous_offset` for `front`.
    pub offset: u32,
}

/// Circular FIFO of `u32` values over a fixed number of positions.
///
/// Used two ways: as a flat FIFO (`push`, `front`, `pop_front`) and as a round-robin retry
/// buffer where `next` moves the front entry to the back. A round is bounded to the length the
/// queue had on the first `next` of the invocation, so every entry is visited at most once.
#[derive(Debug)]
pub struct StoredU32Queue {
    pointer: StoragePointer,
    values: BTreeMap<u32, u32>,
    starting_index: u32,
    length: u32,
    capacity: u32,
    round_remaining: Option<u32>,
    last_requeued: Option<u32>,
    dirty: bool,
}

impl StoredU32Queue {
    pub fn new(pointer: StoragePointer, capacity: u32) -> Self {
        Self {
            pointer,
            values: BTreeMap::new(),
            starting_index: 0,
            length: 0,
            capacity: capacity.max(1),
            round_remaining: None,
            last_requeued: None,
            dirty: false,
        }
    }

    pub fn load(pointer: StoragePointer, snapshot: Option<&QueueSnapshot>, capacity: u32) -> Self {
        let mut queue = Self::new(pointer, capacity);
        if let Some(snapshot) = snapshot {
            queue.values = snapshot.values.clone();
            queue.starting_index = snapshot.starting_index;
            queue.length = snapshot.length;
        }
        queue
    }

    fn position(&self, n: u32) -> u32 {
        ((self.starting_index as u64 + n as u64) % self.capacity as u64) as u32
    }

    /// Store a value, filling the oldest tombstoned position before growing the queue.
    /// Returns the position the value was stored at.
    pub fn push(&mut self, value: u32) -> Result<u32, QueueError> {
        let offset = match self.first_hole() {
            Some(offset) => offset,
            None if self.length < self.capacity => {
                let offset = self.position(self.length);
                self.length += 1;
                offset
            }
            None => return Err(QueueError::CircularQueueFull(self.capacity)),
        };
        self.values.insert(offset, value);
        self.dirty = true;
        Ok(offset)
    }

    fn first_hole(&self) -> Option<u32> {
        if self.values.len() >= self.length as usize {
            return None;
        }
        (0..self.length).map(|n| self.position(n)).find(|offset| !self.values.contains_key(offset))
    }

    pub fn front(&self) -> Option<QueueEntry> {
        if self.length == 0 {
            return None;
        }
        let offset = self.starting_index;
        Some(QueueEntry { value: self.values.get(&offset).copied(), previous_offset: offset, offset })
    }

    /// Drop the front entry. Returns false on an empty queue.
    pub fn pop_front(&mut self) -> bool {
        if self.length == 0 {
            return false;
        }
        self.values.remove(&self.starting_index);
        self.starting_index = self.position(1);
        self.length -= 1;
        self.dirty = true;
        true
    }

    /// Dequeue the front entry and requeue it at the back.
    ///
    /// Returns `None` once the queue is empty or the current round is used up.
    pub fn next(&mut self) -> Option<QueueEntry> {
        if self.length == 0 {
            return None;
        }
        let length = self.length;
        let remaining = self.round_remaining.get_or_insert(length);
        *remaining = (*remaining).min(length);
        if *remaining == 0 {
            return None;
        }
        *remaining -= 1;

        let previous_offset = self.starting_index;
        let value = self.values.remove(&previous_offset);
        self.starting_index = self.position(1);
        let offset = self.position(self.length - 1);
        if let Some(value) = value {
            self.values.insert(offset, value);
        }
        self.last_requeued = Some(offset);
        self.dirty = true;

        Some(QueueEntry { value, previous_offset, offset })
    }

    /// Drop the entry the last `next` requeued, shrinking the queue by one.
    pub fn remove_item_from_length(&mut self) -> Result<(), QueueError> {
        let back = self.position(self.length.saturating_sub(1));
        match self.last_requeued.take() {
            Some(offset) if self.length > 0 && offset == back => {
                self.values.remove(&offset);
                self.length -= 1;
                self.dirty = true;
                Ok(())
            }
            _ => Err(QueueError::ImpossibleState("no requeued entry to remove".to_string())),
        }
    }

    /// Tombstone a position. Tombstones at the back are trimmed off right away; the others keep
    /// their place until a round drops them or a `push` reuses them.
    pub fn delete_at(&mut self, offset: u32) -> bool {
        let removed = self.values.remove(&offset).is_some();
        if removed {
            while self.length > 0 && !self.values.contains_key(&self.position(self.length - 1)) {
                self.length -= 1;
            }
            self.dirty = true;
        }
        removed
    }

    pub fn get_at(&self, offset: u32) -> Option<u32> {
        self.values.get(&offset).copied()
    }

    pub fn len(&self) -> u32 {
        self.length
    }

    pub fn is_empty(&self) -> bool {
        self.length == 0
    }

    pub fn starting_index(&self) -> u32 {
        self.starting_index
    }

    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    pub fn snapshot(&self) -> QueueSnapshot {
        QueueSnapshot { values: self.values.clone(), starting_index: self.starting_index, length: self.length }
    }

    pub fn save(&mut self, changes: &mut Changeset) {
        if self.dirty {
            changes.put_queue(self.pointer, self.snapshot());
            self.dirty = false;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn queue_with(values: &[u32], capacity: u32) -> StoredU32Queue {
        let mut queue = StoredU32Queue::new(StoragePointer::NormalPurgedQueue, capacity);
        for value in values {
            queue.push(*value).unwrap();
        }
        queue
    }

    #[test]
    fn test_flat_fifo_order() {
        let mut queue = queue_with(&[4, 9, 2], 8);
        assert_eq!(queue.front().map(|e| e.value), Some(Some(4)));
        assert!(queue.pop_front());
        assert_eq!(queue.front().map(|e| e.value), Some(Some(9)));
        assert!(queue.pop_front());
        assert!(queue.pop_front());
        assert!(!queue.pop_front());
        assert!(queue.is_empty());
    }

    #[test]
    fn test_next_round_robin_visits_each_entry_once() {
        let mut queue = queue_with(&[10, 11, 12], 8);

        let first = queue.next().unwrap();
        assert_eq!(first.value, Some(10));
        assert_eq!(first.previous_offset, 0);
        assert_eq!(first.offset, 3);

        assert_eq!(queue.next().unwrap().value, Some(11));
        assert_eq!(queue.next().unwrap().value, Some(12));
        assert!(queue.next().is_none());

        // Order is preserved after a full rotation
        assert_eq!(queue.len(), 3);
        assert_eq!(queue.front().unwrap().value, Some(10));
    }

    #[test]
    fn test_next_wraps_around_capacity() {
        let mut queue = queue_with(&[1, 2, 3], 3);
        let entry = queue.next().unwrap();
        assert_eq!(entry.previous_offset, 0);
        assert_eq!(entry.offset, 0);
        assert_eq!(queue.get_at(0), Some(1));
        assert_eq!(queue.starting_index(), 1);
    }

    #[test]
    fn test_remove_item_from_length_drops_requeued_entry() {
        let mut queue = queue_with(&[5, 6, 7], 8);
        queue.next().unwrap();
        queue.remove_item_from_length().unwrap();
        assert_eq!(queue.len(), 2);
        assert_eq!(queue.next().unwrap().value, Some(6));
        assert_eq!(queue.next().unwrap().value, Some(7));
        assert!(queue.next().is_none());

        // Only valid right after next
        assert!(queue.remove_item_from_length().is_ok());
        assert!(queue.remove_item_from_length().is_err());
    }

    #[test]
    fn test_tombstone_surfaces_as_missing_value() {
        let mut queue = queue_with(&[5, 6, 7], 8);
        assert!(queue.delete_at(1));
        assert_eq!(queue.len(), 3);
        assert_eq!(queue.next().unwrap().value, Some(5));
        assert_eq!(queue.next().unwrap().value, None);
        assert_eq!(queue.next().unwrap().value, Some(7));
    }

    #[test]
    fn test_tombstones_at_back_are_trimmed() {
        let mut queue = queue_with(&[5, 6, 7], 8);
        assert!(queue.delete_at(1));
        assert!(queue.delete_at(2));
        assert_eq!(queue.len(), 1);
        assert!(!queue.delete_at(2));
        assert_eq!(queue.push(8), Ok(1));
    }

    #[test]
    fn test_push_reuses_tombstoned_position_when_full() {
        let mut queue = queue_with(&[1, 2, 3], 3);
        assert!(queue.delete_at(1));
        assert_eq!(queue.push(9), Ok(1));
        assert_eq!(queue.len(), 3);
        assert_eq!(queue.get_at(1), Some(9));
        assert_eq!(queue.push(4), Err(QueueError::CircularQueueFull(3)));
    }

    #[test]
    fn test_push_fails_when_full() {
        let mut queue = queue_with(&[1, 2], 2);
        assert_eq!(queue.push(3), Err(QueueError::CircularQueueFull(2)));
    }
}
