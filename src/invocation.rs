use crate::error::QueueError;
use crate::host::{EffectJournal, Host};
use crate::manager::{ProviderManager, ProviderQueueConfigSection};
use crate::provider::{Provider, ProviderCache};
use crate::storage::{Changeset, Ledger};
use alloy_primitives::{Address, U256};
use tracing::{debug, warn};

/// Context of one invocation: the provider cache, the pending host writes, and read access to
/// the host. Created at the start of an invocation and consumed by [`Invocation::finish`].
pub struct Invocation<'a> {
    pub providers: ProviderCache<'a>,
    pub journal: EffectJournal,
    host: &'a dyn Host,
}

impl<'a> Invocation<'a> {
    pub fn new(ledger: &'a Ledger, host: &'a dyn Host) -> Self {
        Self { providers: ProviderCache::new(ledger), journal: EffectJournal::new(), host }
    }

    pub fn provider(&mut self, id: U256) -> &mut Provider {
        self.providers.get(id)
    }

    pub fn satoshis_owed(&self, id: &U256) -> u64 {
        self.host.satoshis_owed(id)
    }

    pub fn satoshis_owed_reserved(&self, id: &U256) -> u64 {
        self.host.satoshis_owed_reserved(id)
    }

    /// Stage the touched provider records and hand back the journal for replay.
    pub fn finish(self, changes: &mut Changeset) -> EffectJournal {
        changes.put_providers(self.providers.into_records());
        self.journal
    }
}

/// Run one all-or-nothing invocation against `ledger` and `host`.
///
/// Loads the manager for `token`, runs `f`, then saves the manager, replays host writes and
/// commits the ledger. When `f` (or saving) fails, neither the ledger nor the host see any of
/// the invocation's writes.
pub fn execute<T, F>(
    ledger: &mut Ledger,
    host: &mut dyn Host,
    token: Address,
    config: &ProviderQueueConfigSection,
    f: F,
) -> Result<T, QueueError>
where
    F: FnOnce(&mut ProviderManager, &mut Invocation<'_>) -> Result<T, QueueError>,
{
    let (result, changes, journal) = {
        let mut manager = ProviderManager::load(ledger, token, config.clone());
        let mut invocation = Invocation::new(ledger, &*host);

        let result = match f(&mut manager, &mut invocation) {
            Ok(result) => result,
            Err(error) => {
                warn!(%error, "invocation aborted, discarding all changes");
                return Err(error);
            }
        };

        let mut changes = Changeset::default();
        manager.save(&mut changes);
        let journal = invocation.finish(&mut changes);
        (result, changes, journal)
    };

    journal.replay(host)?;
    ledger.commit(changes);
    debug!("invocation committed");

    Ok(result)
}
