use super::StoragePointer;
use super::stored_u256_array::ArraySnapshot;
use super::stored_u32_queue::QueueSnapshot;
use crate::provider::Provider;
use alloy_primitives::U256;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Persisted state of one pool, carried from one invocation to the next.
///
/// Only [`Ledger::commit`] mutates it, with the [`Changeset`] of an invocation that ran to completion.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ledger {
    arrays: BTreeMap<StoragePointer, ArraySnapshot>,
    queues: BTreeMap<StoragePointer, QueueSnapshot>,
    boundaries: BTreeMap<StoragePointer, u32>,
    #[serde(with = "provider_records")]
    providers: BTreeMap<U256, Provider>,
    initial_liquidity_provider: Option<U256>,
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn array(&self, pointer: StoragePointer) -> Option<&ArraySnapshot> {
        self.arrays.get(&pointer)
    }

    pub fn queue(&self, pointer: StoragePointer) -> Option<&QueueSnapshot> {
        self.queues.get(&pointer)
    }

    /// Persisted scan boundary, 0 when never saved.
    pub fn boundary(&self, pointer: StoragePointer) -> u32 {
        self.boundaries.get(&pointer).copied().unwrap_or_default()
    }

    pub fn provider(&self, id: &U256) -> Option<&Provider> {
        self.providers.get(id)
    }

    pub fn providers_len(&self) -> usize {
        self.providers.len()
    }

    pub fn initial_liquidity_provider(&self) -> Option<U256> {
        self.initial_liquidity_provider
    }

    pub fn commit(&mut self, changes: Changeset) {
        self.arrays.extend(changes.arrays);
        self.queues.extend(changes.queues);
        self.boundaries.extend(changes.boundaries);
        for provider in changes.providers {
            self.providers.insert(provider.get_id(), provider);
        }
        if let Some(initial) = changes.initial_liquidity_provider {
            self.initial_liquidity_provider = initial;
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

/// Everything one successful invocation writes back to the [`Ledger`].
#[derive(Clone, Debug, Default)]
pub struct Changeset {
    arrays: BTreeMap<StoragePointer, ArraySnapshot>,
    queues: BTreeMap<StoragePointer, QueueSnapshot>,
    boundaries: BTreeMap<StoragePointer, u32>,
    providers: Vec<Provider>,
    initial_liquidity_provider: Option<Option<U256>>,
}

impl Changeset {
    pub fn put_array(&mut self, pointer: StoragePointer, snapshot: ArraySnapshot) {
        self.arrays.insert(pointer, snapshot);
    }

    pub fn put_queue(&mut self, pointer: StoragePointer, snapshot: QueueSnapshot) {
        self.queues.insert(pointer, snapshot);
    }

    pub fn put_boundary(&mut self, pointer: StoragePointer, boundary: u32) {
        self.boundaries.insert(pointer, boundary);
    }

    pub fn put_providers<I: IntoIterator<Item = Provider>>(&mut self, providers: I) {
        self.providers.extend(providers);
    }

    pub fn put_initial_liquidity_provider(&mut self, id: Option<U256>) {
        self.initial_liquidity_provider = Some(id);
    }

    pub fn array(&self, pointer: StoragePointer) -> Option<&ArraySnapshot> {
        self.arrays.get(&pointer)
    }

    pub fn boundary(&self, pointer: StoragePointer) -> Option<u32> {
        self.boundaries.get(&pointer).copied()
    }

    pub fn is_empty(&self) -> bool {
        self.arrays.is_empty()
            && self.queues.is_empty()
            && self.boundaries.is_empty()
            && self.providers.is_empty()
            && self.initial_liquidity_provider.is_none()
    }
}

// JSON object keys must be strings, so records are stored as a list keyed by their own id.
mod provider_records {
    use crate::provider::Provider;
    use alloy_primitives::U256;
    use serde::{Deserialize, Deserializer, Serializer};
    use std::collections::BTreeMap;

    pub fn serialize<S>(providers: &BTreeMap<U256, Provider>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_seq(providers.values())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<BTreeMap<U256, Provider>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let records = Vec::<Provider>::deserialize(deserializer)?;
        Ok(records.into_iter().map(|provider| (provider.get_id(), provider)).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_commit_overwrites_touched_entries_only() {
        let mut ledger = Ledger::new();
        let mut changes = Changeset::default();
        changes.put_boundary(StoragePointer::NormalQueue, 4);
        changes.put_boundary(StoragePointer::PriorityQueue, 1);
        changes.put_providers([Provider::new(U256::from(1))]);
        ledger.commit(changes);

        let mut changes = Changeset::default();
        changes.put_boundary(StoragePointer::NormalQueue, 6);
        ledger.commit(changes);

        assert_eq!(ledger.boundary(StoragePointer::NormalQueue), 6);
        assert_eq!(ledger.boundary(StoragePointer::PriorityQueue), 1);
        assert_eq!(ledger.boundary(StoragePointer::RemovalQueue), 0);
        assert!(ledger.provider(&U256::from(1)).is_some());
    }

    #[test]
    fn test_json_round_trip() -> eyre::Result<()> {
        let mut ledger = Ledger::new();
        let mut changes = Changeset::default();
        let mut provider = Provider::new(U256::from(77));
        provider.activate();
        provider.add_liquidity(1_000)?;
        changes.put_providers([provider.clone()]);
        changes.put_boundary(StoragePointer::RemovalQueue, 3);
        changes.put_initial_liquidity_provider(Some(U256::from(77)));
        ledger.commit(changes);

        let restored = Ledger::from_json(&ledger.to_json()?)?;
        assert_eq!(restored, ledger);
        assert_eq!(restored.provider(&U256::from(77)), Some(&provider));
        Ok(())
    }
}
