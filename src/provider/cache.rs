use super::Provider;
use crate::storage::Ledger;
use ahash::HashMap;
use alloy_primitives::U256;

/// Per-invocation provider records.
///
/// Reads through to the ledger on first reference, creating a fresh record for ids the ledger
/// has never seen. Every record handed out is kept until the invocation ends so that queue
/// operations see each other's mutations.
#[derive(Debug)]
pub struct ProviderCache<'l> {
    ledger: &'l Ledger,
    providers: HashMap<U256, Provider>,
    pub stats: CacheStats,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
}

impl CacheStats {
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 { 0.0 } else { self.hits as f64 / total as f64 }
    }
}

impl<'l> ProviderCache<'l> {
    pub fn new(ledger: &'l Ledger) -> Self {
        Self { ledger, providers: HashMap::default(), stats: CacheStats::default() }
    }

    /// Load (or create) the record for `id`.
    pub fn get(&mut self, id: U256) -> &mut Provider {
        if self.providers.contains_key(&id) {
            self.stats.hits += 1;
        } else {
            self.stats.misses += 1;
            let provider = self.ledger.provider(&id).cloned().unwrap_or_else(|| Provider::new(id));
            self.providers.insert(id, provider);
        }
        self.providers.entry(id).or_insert_with(|| Provider::new(id))
    }

    /// Read without loading into the cache.
    pub fn peek(&self, id: &U256) -> Option<&Provider> {
        self.providers.get(id).or_else(|| self.ledger.provider(id))
    }

    pub fn is_cached(&self, id: &U256) -> bool {
        self.providers.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    /// All records touched during the invocation, ready to be committed.
    pub fn into_records(self) -> Vec<Provider> {
        self.providers.into_values().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::Changeset;

    #[test]
    fn test_creates_on_first_reference() {
        let ledger = Ledger::new();
        let mut cache = ProviderCache::new(&ledger);

        let provider = cache.get(U256::from(5));
        assert_eq!(provider.get_id(), U256::from(5));
        assert!(!provider.is_active());
        provider.activate();

        assert!(cache.get(U256::from(5)).is_active());
        assert_eq!(cache.stats, CacheStats { hits: 1, misses: 1 });
        assert_eq!(cache.stats.hit_rate(), 0.5);
    }

    #[test]
    fn test_reads_through_to_ledger_without_mutating_it() {
        let mut ledger = Ledger::new();
        let mut stored = Provider::new(U256::from(8));
        stored.add_liquidity(300).unwrap();
        let mut changes = Changeset::default();
        changes.put_providers([stored]);
        ledger.commit(changes);

        let mut cache = ProviderCache::new(&ledger);
        assert_eq!(cache.peek(&U256::from(8)).map(|p| p.get_liquidity_amount()), Some(300));
        assert!(!cache.is_cached(&U256::from(8)));

        cache.get(U256::from(8)).add_liquidity(200).unwrap();
        assert_eq!(cache.peek(&U256::from(8)).map(|p| p.get_liquidity_amount()), Some(500));
        assert_eq!(ledger.provider(&U256::from(8)).map(|p| p.get_liquidity_amount()), Some(300));

        let records = cache.into_records();
        assert_eq!(records.len(), 1);
    }
}
