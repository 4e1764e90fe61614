use super::kind::QueueKind;
use super::provider_queue::ProviderQueue;
use super::queue_config::ProviderQueueConfigSection;
use crate::error::QueueError;
use crate::host::ProviderEvent;
use crate::invocation::Invocation;
use crate::storage::{Changeset, Ledger, QueueEntry, StoredU32Queue};
use crate::utils::amounts::LiquidityThresholds;
use alloy_primitives::U256;
use tracing::{debug, info, warn};

/// Outcome of resolving one retry entry.
enum Resolved {
    Stale(&'static str),
    Live { id: U256, slot: u32 },
}

/// Retry buffer of primary-queue slots for providers that failed the minimum-liquidity test.
///
/// Entries are slot positions, not ids. Each `get` rotates the buffer, so a provider that still
/// cannot serve a quote moves to the back and the others get their turn. Entries whose slot,
/// purged flag or offset no longer line up are dropped as they surface.
#[derive(Debug)]
pub struct PurgedProviderQueue {
    kind: QueueKind,
    queue: StoredU32Queue,
    thresholds: LiquidityThresholds,
    verify_indexes: bool,
}

impl PurgedProviderQueue {
    pub fn new(kind: QueueKind, queue: StoredU32Queue, thresholds: LiquidityThresholds, verify_indexes: bool) -> Self {
        Self { kind, queue, thresholds, verify_indexes }
    }

    pub fn load(ledger: &Ledger, kind: QueueKind, config: &ProviderQueueConfigSection) -> Self {
        let pointer = kind.purged_pointer();
        let queue = StoredU32Queue::load(pointer, ledger.queue(pointer), config.cap_for(kind));
        Self::new(kind, queue, config.thresholds(), config.verify_indexes)
    }

    pub fn kind(&self) -> QueueKind {
        self.kind
    }

    pub fn len(&self) -> u32 {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Queue a provider's primary slot for retry. Returns the retry position, or `None` for the
    /// initial provider, which is never purged.
    pub fn add(&mut self, ctx: &mut Invocation<'_>, id: U256) -> Result<Option<u32>, QueueError> {
        let provider = ctx.providers.get(id);
        if provider.is_initial_liquidity_provider() {
            return Ok(None);
        }
        if provider.is_purged() {
            return Err(QueueError::InvalidProviderState { provider: id, action: "purged twice" });
        }
        match self.kind {
            QueueKind::Removal => {
                if !provider.is_pending_removal() {
                    return Err(QueueError::InvalidProviderState {
                        provider: id,
                        action: "purged from the removal queue without a pending removal",
                    });
                }
            }
            _ => {
                if provider.is_pending_removal() {
                    return Err(QueueError::InvalidProviderState { provider: id, action: "purged while pending removal" });
                }
                self.kind.check_priority_flag(provider)?;
            }
        }
        let slot = self.kind.index_of(provider).ok_or(QueueError::IndexNotSet { provider: id, what: "queue" })?;

        let offset = self.queue.push(slot)?;
        provider.mark_purged(offset);
        ctx.journal.emit(ProviderEvent::Purged { provider_id: id, slot });
        debug!(kind = %self.kind, %id, slot, offset, "provider purged");

        Ok(Some(offset))
    }

    /// Drop a provider's retry entry and clear its purged flag.
    ///
    /// The position is freed for the next `add`; the buffer shrinks at once when it was the
    /// last entry, otherwise when a round reaches the tombstone.
    pub fn remove(&mut self, ctx: &mut Invocation<'_>, id: U256) -> Result<(), QueueError> {
        let provider = ctx.providers.get(id);
        let offset = provider.get_purged_index().ok_or(QueueError::IndexNotSet { provider: id, what: "purged" })?;
        self.queue.delete_at(offset);
        provider.clear_purged();
        debug!(kind = %self.kind, %id, offset, "provider unpurged");
        Ok(())
    }

    /// Next retry candidate able to serve `quote`, resolved against `primary`.
    ///
    /// The returned provider stays purged. The normal and priority buffers keep rotating past
    /// stale and evicted entries; the removal buffer looks at a single entry per call.
    pub fn get(
        &mut self,
        primary: &mut ProviderQueue,
        ctx: &mut Invocation<'_>,
        quote: U256,
    ) -> Result<Option<U256>, QueueError> {
        if primary.kind() != self.kind {
            return Err(QueueError::ImpossibleState(format!(
                "{} purge queue resolved against the {} queue",
                self.kind,
                primary.kind()
            )));
        }

        match self.kind {
            QueueKind::Removal => self.get_removal(primary, ctx),
            _ => self.get_listing(primary, ctx, quote),
        }
    }

    fn get_listing(
        &mut self,
        primary: &mut ProviderQueue,
        ctx: &mut Invocation<'_>,
        quote: U256,
    ) -> Result<Option<U256>, QueueError> {
        while let Some(entry) = self.queue.next() {
            let (id, slot) = match self.resolve(primary, ctx, entry)? {
                Resolved::Stale(reason) => {
                    self.drop_stale(entry, reason)?;
                    continue;
                }
                Resolved::Live { id, slot } => (id, slot),
            };

            let provider = ctx.providers.get(id);
            if provider.is_initial_liquidity_provider() {
                return Err(QueueError::InitialProviderForbidden("returned from a purge queue"));
            }
            self.kind.check_priority_flag(provider)?;
            if self.verify_indexes && provider.get_queue_index() != Some(slot) {
                return Err(QueueError::IndexMismatch { provider: id, stored: provider.get_queue_index(), slot });
            }
            if !provider.is_active() {
                provider.clear_purged();
                self.drop_stale(entry, "inactive provider")?;
                continue;
            }
            if provider.is_to_reset() {
                debug!(kind = %self.kind, %id, slot, "skipping fulfilled provider");
                continue;
            }

            let available = provider.available_liquidity()?;
            if self.thresholds.meets_minimum(available, quote) {
                provider.set_from_removal_queue(false);
                debug!(kind = %self.kind, %id, slot, "purged provider selected");
                return Ok(Some(id));
            }
            if provider.has_reserved_amount() {
                return Ok(None);
            }

            provider.reset_listing_values();
            self.queue.remove_item_from_length()?;
            primary.remove_at(slot);

            info!(kind = %self.kind, %id, slot, residual = available, "evicting purged provider below minimum liquidity");
            ctx.journal.sub_from_total_reserve(available);
            ctx.journal.add_amount_to_staking_contract(available);
            ctx.journal.emit(ProviderEvent::Fulfilled { provider_id: id, canceled: false, removal_completed: false });
        }

        Ok(None)
    }

    fn get_removal(&mut self, primary: &mut ProviderQueue, ctx: &mut Invocation<'_>) -> Result<Option<U256>, QueueError> {
        let Some(entry) = self.queue.next() else {
            return Ok(None);
        };

        let (id, slot) = match self.resolve(primary, ctx, entry)? {
            Resolved::Stale(reason) => {
                self.drop_stale(entry, reason)?;
                return Ok(None);
            }
            Resolved::Live { id, slot } => (id, slot),
        };

        let provider = ctx.providers.get(id);
        if provider.is_initial_liquidity_provider() {
            return Err(QueueError::InitialProviderForbidden("returned from the removal purge queue"));
        }
        if self.verify_indexes && provider.get_removal_queue_index() != Some(slot) {
            return Err(QueueError::IndexMismatch { provider: id, stored: provider.get_removal_queue_index(), slot });
        }
        if !provider.is_pending_removal() {
            provider.clear_purged();
            self.drop_stale(entry, "provider no longer pending removal")?;
            return Ok(None);
        }

        provider.set_from_removal_queue(true);
        debug!(%id, slot, "purged removal provider selected");
        Ok(Some(id))
    }

    /// Map a rotated entry back to a provider, moving its purge bookkeeping to the new offset.
    fn resolve(&self, primary: &ProviderQueue, ctx: &mut Invocation<'_>, entry: QueueEntry) -> Result<Resolved, QueueError> {
        let Some(slot) = entry.value else {
            return Ok(Resolved::Stale("tombstoned entry"));
        };
        let id = primary.get_at(slot);
        if id.is_zero() {
            return Ok(Resolved::Stale("empty primary slot"));
        }

        let provider = ctx.providers.get(id);
        if !provider.is_purged() {
            return Ok(Resolved::Stale("provider no longer purged"));
        }
        if provider.get_purged_index() != Some(entry.previous_offset) {
            return Ok(Resolved::Stale("purge offset mismatch"));
        }
        provider.set_purged_index(entry.offset);

        Ok(Resolved::Live { id, slot })
    }

    fn drop_stale(&mut self, entry: QueueEntry, reason: &'static str) -> Result<(), QueueError> {
        warn!(kind = %self.kind, slot = ?entry.value, offset = entry.previous_offset, reason, "dropping stale purge entry");
        self.queue.remove_item_from_length()
    }

    pub fn save(&mut self, changes: &mut Changeset) {
        self.queue.save(changes);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::QUOTE_SCALE;
    use crate::host::{Effect, MemoryHost};
    use crate::storage::{StoragePointer, StoredU256Array};
    use alloy_primitives::Address;

    const QUOTE: U256 = U256::from_limbs([QUOTE_SCALE, 0, 0, 0]);

    fn queues(kind: QueueKind) -> (ProviderQueue, PurgedProviderQueue) {
        let thresholds = LiquidityThresholds::default();
        let primary = ProviderQueue::new(
            kind,
            Address::ZERO,
            StoredU256Array::new(kind.storage_pointer(), 32),
            thresholds,
            true,
        );
        let purged = PurgedProviderQueue::new(kind, StoredU32Queue::new(kind.purged_pointer(), 32), thresholds, true);
        (primary, purged)
    }

    fn purged_listing(
        ctx: &mut Invocation<'_>,
        primary: &mut ProviderQueue,
        purged: &mut PurgedProviderQueue,
        id: u64,
        liquidity: u128,
        reserved: u128,
    ) -> U256 {
        let id = U256::from(id);
        let provider = ctx.provider(id);
        provider.activate();
        provider.add_liquidity(liquidity).unwrap();
        provider.add_reserved(reserved).unwrap();
        primary.add(ctx, id).unwrap();
        purged.add(ctx, id).unwrap();
        id
    }

    #[test]
    fn test_add_marks_provider_purged() -> eyre::Result<()> {
        let ledger = Ledger::new();
        let host = MemoryHost::new();
        let mut ctx = Invocation::new(&ledger, &host);
        let (mut primary, mut purged) = queues(QueueKind::Normal);

        let id = purged_listing(&mut ctx, &mut primary, &mut purged, 1, 5_000, 0);
        let provider = ctx.provider(id);
        assert!(provider.is_purged());
        assert_eq!(provider.get_purged_index(), Some(0));
        assert_eq!(purged.len(), 1);
        assert_eq!(ctx.journal.events().count(), 1);

        assert!(matches!(purged.add(&mut ctx, id), Err(QueueError::InvalidProviderState { .. })));
        Ok(())
    }

    #[test]
    fn test_add_requires_queue_index() {
        let ledger = Ledger::new();
        let host = MemoryHost::new();
        let mut ctx = Invocation::new(&ledger, &host);
        let (_, mut purged) = queues(QueueKind::Normal);

        assert_eq!(
            purged.add(&mut ctx, U256::from(3)),
            Err(QueueError::IndexNotSet { provider: U256::from(3), what: "queue" })
        );
    }

    #[test]
    fn test_add_is_noop_for_initial_provider() -> eyre::Result<()> {
        let ledger = Ledger::new();
        let host = MemoryHost::new();
        let mut ctx = Invocation::new(&ledger, &host);
        let (_, mut purged) = queues(QueueKind::Normal);

        ctx.provider(U256::from(9)).mark_initial_liquidity_provider();
        assert_eq!(purged.add(&mut ctx, U256::from(9))?, None);
        assert!(purged.is_empty());
        Ok(())
    }

    #[test]
    fn test_stale_entry_is_dropped_without_affecting_result() -> eyre::Result<()> {
        let ledger = Ledger::new();
        let host = MemoryHost::new();
        let mut ctx = Invocation::new(&ledger, &host);
        let (mut primary, mut purged) = queues(QueueKind::Normal);

        // Two providers still covered by a reservation, then eight with enough liquidity
        for id in 1..=2 {
            purged_listing(&mut ctx, &mut primary, &mut purged, id, 900, 100);
        }
        for id in 3..=10 {
            purged_listing(&mut ctx, &mut primary, &mut purged, id, 5_000, 0);
        }
        assert_eq!(purged.len(), 10);

        // The third primary slot is cleared behind the purge queue's back
        primary.remove_at(2);

        assert_eq!(purged.get(&mut primary, &mut ctx, QUOTE)?, None);
        assert_eq!(purged.get(&mut primary, &mut ctx, QUOTE)?, None);
        assert_eq!(purged.get(&mut primary, &mut ctx, QUOTE)?, Some(U256::from(4)));
        assert_eq!(purged.len(), 9);

        // The returned provider stays purged, with its entry moved to the back
        let provider = ctx.provider(U256::from(4));
        assert!(provider.is_purged());
        assert_eq!(provider.get_purged_index(), Some(12));
        Ok(())
    }

    #[test]
    fn test_removed_entry_is_dropped_lazily() -> eyre::Result<()> {
        let ledger = Ledger::new();
        let host = MemoryHost::new();
        let mut ctx = Invocation::new(&ledger, &host);
        let (mut primary, mut purged) = queues(QueueKind::Normal);

        let first = purged_listing(&mut ctx, &mut primary, &mut purged, 1, 5_000, 0);
        let second = purged_listing(&mut ctx, &mut primary, &mut purged, 2, 5_000, 0);

        purged.remove(&mut ctx, first)?;
        assert!(!ctx.provider(first).is_purged());
        assert_eq!(purged.len(), 2);

        assert_eq!(purged.get(&mut primary, &mut ctx, QUOTE)?, Some(second));
        assert_eq!(purged.len(), 1);

        assert!(matches!(purged.remove(&mut ctx, first), Err(QueueError::IndexNotSet { .. })));
        Ok(())
    }

    #[test]
    fn test_purge_cycles_do_not_fill_the_buffer() -> eyre::Result<()> {
        let ledger = Ledger::new();
        let host = MemoryHost::new();
        let mut ctx = Invocation::new(&ledger, &host);
        let kind = QueueKind::Normal;
        let (mut primary, _) = queues(kind);
        let mut purged =
            PurgedProviderQueue::new(kind, StoredU32Queue::new(kind.purged_pointer(), 2), LiquidityThresholds::default(), true);

        let kept = purged_listing(&mut ctx, &mut primary, &mut purged, 1, 5_000, 0);
        let cycled = U256::from(2);
        let provider = ctx.provider(cycled);
        provider.activate();
        provider.add_liquidity(5_000)?;
        primary.add(&mut ctx, cycled)?;

        for _ in 0..5 {
            assert_eq!(purged.add(&mut ctx, cycled)?, Some(1));
            purged.remove(&mut ctx, cycled)?;
            assert_eq!(purged.len(), 1);
        }

        // A tombstone in front of a live entry is reused rather than appended after
        purged.add(&mut ctx, cycled)?;
        purged.remove(&mut ctx, kept)?;
        assert_eq!(purged.len(), 2);
        assert_eq!(purged.add(&mut ctx, kept)?, Some(0));
        Ok(())
    }

    #[test]
    fn test_dust_provider_is_evicted_from_both_queues() -> eyre::Result<()> {
        let ledger = Ledger::new();
        let host = MemoryHost::new();
        let mut ctx = Invocation::new(&ledger, &host);
        let (mut primary, mut purged) = queues(QueueKind::Normal);

        let dust = purged_listing(&mut ctx, &mut primary, &mut purged, 1, 400, 0);

        assert_eq!(purged.get(&mut primary, &mut ctx, QUOTE)?, None);
        assert!(purged.is_empty());
        assert_eq!(primary.get_at(0), U256::ZERO);
        assert!(!ctx.provider(dust).is_purged());
        assert!(ctx.journal.effects().contains(&Effect::AddAmountToStakingContract(400)));
        assert!(ctx.journal.effects().contains(&Effect::Event(ProviderEvent::Fulfilled {
            provider_id: dust,
            canceled: false,
            removal_completed: false,
        })));
        Ok(())
    }

    #[test]
    fn test_wrong_primary_queue_is_fatal() {
        let ledger = Ledger::new();
        let host = MemoryHost::new();
        let mut ctx = Invocation::new(&ledger, &host);
        let (mut primary, _) = queues(QueueKind::Normal);
        let mut purged = PurgedProviderQueue::new(
            QueueKind::Removal,
            StoredU32Queue::new(StoragePointer::RemovalPurgedQueue, 4),
            LiquidityThresholds::default(),
            true,
        );

        assert!(matches!(purged.get(&mut primary, &mut ctx, QUOTE), Err(QueueError::ImpossibleState(_))));
    }

    #[test]
    fn test_removal_variant_returns_single_entry() -> eyre::Result<()> {
        let ledger = Ledger::new();
        let host = MemoryHost::new();
        let mut ctx = Invocation::new(&ledger, &host);
        let (mut primary, mut purged) = queues(QueueKind::Removal);

        let id = U256::from(5);
        let provider = ctx.provider(id);
        provider.mark_liquidity_provider();
        provider.mark_pending_removal();
        primary.add(&mut ctx, id)?;
        purged.add(&mut ctx, id)?;

        assert_eq!(purged.get(&mut primary, &mut ctx, QUOTE)?, Some(id));
        assert!(ctx.provider(id).is_from_removal_queue());
        assert_eq!(purged.len(), 1);
        Ok(())
    }
}
