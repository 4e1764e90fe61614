use super::kind::{QueueKind, Verdict};
use super::queue_config::ProviderQueueConfigSection;
use crate::constants::BURN_ADDRESS;
use crate::error::QueueError;
use crate::host::{EffectJournal, ProviderEvent};
use crate::invocation::Invocation;
use crate::storage::{Changeset, Ledger, StoredU256Array};
use crate::utils::amounts::LiquidityThresholds;
use alloy_primitives::{Address, U256};
use tracing::{debug, info};

/// Indexed, append-only collection of provider ids with compaction and a resumable
/// "next eligible provider" scan.
///
/// The persisted starting index is the compaction watermark. The current index is the
/// per-invocation scan cursor: it starts at the persisted boundary the first time the queue is
/// scanned and only reaches storage through the manager's save.
#[derive(Debug)]
pub struct ProviderQueue {
    kind: QueueKind,
    token: Address,
    array: StoredU256Array,
    current_index: Option<u32>,
    overflowed: bool,
    thresholds: LiquidityThresholds,
    verify_indexes: bool,
}

impl ProviderQueue {
    pub fn new(
        kind: QueueKind,
        token: Address,
        array: StoredU256Array,
        thresholds: LiquidityThresholds,
        verify_indexes: bool,
    ) -> Self {
        Self { kind, token, array, current_index: None, overflowed: false, thresholds, verify_indexes }
    }

    pub fn load(ledger: &Ledger, kind: QueueKind, token: Address, config: &ProviderQueueConfigSection) -> Self {
        let pointer = kind.storage_pointer();
        let array = StoredU256Array::load(pointer, ledger.array(pointer), config.cap_for(kind));
        Self::new(kind, token, array, config.thresholds(), config.verify_indexes)
    }

    pub fn kind(&self) -> QueueKind {
        self.kind
    }

    /// Slot count, the bound of every scan.
    pub fn len(&self) -> u32 {
        self.array.len()
    }

    pub fn is_empty(&self) -> bool {
        self.array.is_empty()
    }

    pub fn live_len(&self) -> u32 {
        self.array.live_len()
    }

    pub fn starting_index(&self) -> u32 {
        self.array.starting_index()
    }

    pub fn current_index(&self) -> Option<u32> {
        self.current_index
    }

    /// Append a provider and record the slot as its index for this queue kind.
    pub fn add(&mut self, ctx: &mut Invocation<'_>, id: U256) -> Result<u32, QueueError> {
        if id.is_zero() {
            return Err(QueueError::ImpossibleState("cannot queue the empty provider id".to_string()));
        }
        let provider = ctx.providers.get(id);
        self.kind.check_insert(provider)?;

        let index = self.array.push(id).ok_or(QueueError::QueueFull { kind: self.kind, cap: self.array.max_length() })?;
        self.kind.set_index(provider, index);
        debug!(kind = %self.kind, %id, index, "provider queued");

        Ok(index)
    }

    pub fn get_at(&self, index: u32) -> U256 {
        self.array.get_physical(index)
    }

    pub fn remove_at(&mut self, index: u32) -> bool {
        self.array.delete_physical(index)
    }

    /// Sweep forward from `previous_boundary`, deleting dead slots until the first live provider.
    ///
    /// Returns the new boundary: the slot of that live provider, or the queue length when none is
    /// left. The boundary never moves backward.
    pub fn clean_up(&mut self, ctx: &mut Invocation<'_>, previous_boundary: u32) -> Result<u32, QueueError> {
        let length = self.array.len();
        let mut index = previous_boundary.max(self.array.starting_index());
        let mut deleted = 0u32;

        while index < length {
            let id = self.array.get_physical(index);
            if !id.is_zero() {
                let provider = ctx.providers.get(id);
                if self.kind.is_live_for_cleanup(provider)? {
                    break;
                }
                if self.kind.index_of(provider) == Some(index) {
                    self.kind.clear_index(provider);
                }
                self.array.delete_physical(index);
                deleted += 1;
            }
            index += 1;
        }

        self.array.set_starting_index(index);
        if let Some(current) = self.current_index {
            self.current_index = Some(current.max(index));
        }
        if deleted > 0 {
            info!(kind = %self.kind, previous_boundary, boundary = index, deleted, "queue compacted");
        }

        Ok(index)
    }

    /// Scan from the cursor for the first provider able to serve `quote`.
    ///
    /// Empty slots, inactive providers, purged providers and providers whose shortfall is
    /// covered by an outstanding reservation are skipped. Providers below the minimum with
    /// nothing reserved are evicted on the way.
    pub fn get_next_with_liquidity(&mut self, ctx: &mut Invocation<'_>, quote: U256) -> Result<Option<U256>, QueueError> {
        if self.overflowed {
            return Err(QueueError::CursorOverflow(self.kind));
        }

        let length = self.array.len();
        let mut cursor = *self.current_index.get_or_insert(self.array.starting_index());

        while cursor < length {
            let slot = cursor;
            cursor = self.advance_cursor(cursor)?;

            let id = self.array.get_physical(slot);
            if id.is_zero() {
                continue;
            }

            match self.evaluate(ctx, id, slot, quote)? {
                Verdict::Accept => {
                    debug!(kind = %self.kind, %id, slot, "provider selected");
                    return Ok(Some(id));
                }
                Verdict::Skip => {}
                Verdict::Evict => self.evict(ctx, id, slot)?,
            }
        }

        Ok(None)
    }

    fn advance_cursor(&mut self, cursor: u32) -> Result<u32, QueueError> {
        match cursor.checked_add(1) {
            Some(next) => {
                self.current_index = Some(next);
                Ok(next)
            }
            None => {
                self.overflowed = true;
                Err(QueueError::CursorOverflow(self.kind))
            }
        }
    }

    fn verify_index(&self, id: U256, stored: Option<u32>, slot: u32) -> Result<(), QueueError> {
        if self.verify_indexes && stored != Some(slot) {
            return Err(QueueError::IndexMismatch { provider: id, stored, slot });
        }
        Ok(())
    }

    fn evaluate(&self, ctx: &mut Invocation<'_>, id: U256, slot: u32, quote: U256) -> Result<Verdict, QueueError> {
        match self.kind {
            QueueKind::Removal => self.evaluate_removal(ctx, id, slot),
            _ => self.evaluate_listing(ctx, id, slot, quote),
        }
    }

    fn evaluate_listing(&self, ctx: &mut Invocation<'_>, id: U256, slot: u32, quote: U256) -> Result<Verdict, QueueError> {
        let provider = ctx.providers.get(id);
        // purged providers are retried through their purge queue, fulfilled ones wait for a batch reset
        if provider.is_purged() || provider.is_to_reset() || !provider.is_active() {
            return Ok(Verdict::Skip);
        }
        self.kind.check_priority_flag(provider)?;
        if provider.is_initial_liquidity_provider() {
            return Err(QueueError::InitialProviderForbidden("returned from a queue scan"));
        }
        self.verify_index(id, provider.get_queue_index(), slot)?;

        let available = provider.available_liquidity()?;
        if self.thresholds.meets_minimum(available, quote) {
            provider.set_from_removal_queue(false);
            Ok(Verdict::Accept)
        } else if provider.has_reserved_amount() {
            Ok(Verdict::Skip)
        } else {
            Ok(Verdict::Evict)
        }
    }

    fn evaluate_removal(&self, ctx: &mut Invocation<'_>, id: U256, slot: u32) -> Result<Verdict, QueueError> {
        let provider = ctx.providers.get(id);
        if !provider.is_pending_removal() || !provider.is_liquidity_provider() {
            return Ok(Verdict::Evict);
        }
        if provider.is_purged() {
            return Ok(Verdict::Skip);
        }
        if provider.is_initial_liquidity_provider() {
            return Err(QueueError::InitialProviderForbidden("returned from the removal queue"));
        }
        self.verify_index(id, provider.get_removal_queue_index(), slot)?;

        let owed = ctx.satoshis_owed(&id);
        let reserved = ctx.satoshis_owed_reserved(&id);
        let left = owed.checked_sub(reserved).ok_or(QueueError::OwedUnderflow { provider: id, owed, reserved })?;

        if self.thresholds.meets_strict_minimum(left) {
            ctx.providers.get(id).set_from_removal_queue(true);
            Ok(Verdict::Accept)
        } else if left == 0 && reserved == 0 {
            Err(QueueError::ImpossibleState(format!("provider {id} owes nothing but is still in the removal queue")))
        } else {
            Ok(Verdict::Skip)
        }
    }

    /// Drop a provider the scan found unusable.
    fn evict(&mut self, ctx: &mut Invocation<'_>, id: U256, slot: u32) -> Result<(), QueueError> {
        if self.kind == QueueKind::Removal {
            info!(%id, slot, "evicting provider no longer pending removal");
            self.array.delete_physical(slot);
            let provider = ctx.providers.get(id);
            // its removal purge entry goes stale with the slot
            provider.clear_purged();
            provider.reset_liquidity_provider_values();
            ctx.journal.emit(ProviderEvent::Fulfilled { provider_id: id, canceled: false, removal_completed: true });
            return Ok(());
        }

        let provider = ctx.providers.get(id);
        let residual = provider.available_liquidity()?;
        provider.reset_listing_values();
        self.array.delete_physical(slot);

        info!(kind = %self.kind, %id, slot, residual, "evicting provider below minimum liquidity");
        ctx.journal.sub_from_total_reserve(residual);
        ctx.journal.add_amount_to_staking_contract(residual);
        ctx.journal.emit(ProviderEvent::Fulfilled { provider_id: id, canceled: false, removal_completed: false });

        Ok(())
    }

    /// Take a provider out of this queue for good.
    ///
    /// Listing queues optionally burn what is left of the provider's liquidity and zero its
    /// listing fields. The removal queue zeroes the liquidity-provider side instead.
    pub fn reset_provider(
        &mut self,
        ctx: &mut Invocation<'_>,
        id: U256,
        burn_remaining_funds: bool,
        canceled: bool,
    ) -> Result<(), QueueError> {
        let provider = ctx.providers.get(id);
        if provider.is_initial_liquidity_provider() {
            return Err(QueueError::InitialProviderForbidden("reset through a queue"));
        }

        let burned = if burn_remaining_funds { provider.get_liquidity_amount() } else { 0 };
        if let Some(index) = self.kind.index_of(provider) {
            if self.array.get_physical(index) == id {
                self.array.delete_physical(index);
            }
        }

        let removal_completed = self.kind == QueueKind::Removal;
        if removal_completed {
            provider.reset_liquidity_provider_values();
        } else {
            provider.reset_listing_values();
        }

        record_burn(&mut ctx.journal, self.token, burned);
        ctx.journal.emit(ProviderEvent::Fulfilled { provider_id: id, canceled, removal_completed });
        debug!(kind = %self.kind, %id, burned, canceled, "provider reset");

        Ok(())
    }

    /// Reload the session cursor. It never starts before the compaction watermark.
    pub fn restore_current_index(&mut self, value: u32) {
        self.current_index = Some(value.max(self.array.starting_index()));
    }

    pub fn save(&mut self, changes: &mut Changeset) {
        self.array.save(changes);
    }
}

/// Send `amount` of `token` to the burn address and take it out of both reserves.
pub(crate) fn record_burn(journal: &mut EffectJournal, token: Address, amount: u128) {
    if amount == 0 {
        return;
    }
    journal.safe_transfer(token, BURN_ADDRESS, amount);
    journal.sub_from_total_reserve(amount);
    journal.sub_from_virtual_token_reserve(amount);
}
