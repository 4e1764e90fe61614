use crate::constants::INITIAL_LIQUIDITY_PROVIDER_INDEX;
use crate::error::QueueError;
use crate::host::ProviderEvent;
use crate::invocation::Invocation;
use crate::queues::provider_queue::record_burn;
use crate::queues::{FulfilledProviderQueue, ProviderQueue, ProviderQueueConfigSection, PurgedProviderQueue, QueueKind};
use crate::storage::{Changeset, Ledger};
use crate::utils::amounts::LiquidityThresholds;
use alloy_primitives::{Address, U256};
use tracing::{debug, info};

/// One primary queue with its side buffers and its persisted scan boundary.
#[derive(Debug)]
pub struct QueueLane {
    pub primary: ProviderQueue,
    pub purged: PurgedProviderQueue,
    pub fulfilled: Option<FulfilledProviderQueue>,
    previous_boundary: u32,
}

impl QueueLane {
    fn load(ledger: &Ledger, kind: QueueKind, token: Address, config: &ProviderQueueConfigSection) -> Self {
        let mut primary = ProviderQueue::load(ledger, kind, token, config);
        let previous_boundary = ledger.boundary(kind.storage_pointer());
        primary.restore_current_index(previous_boundary);

        Self {
            primary,
            purged: PurgedProviderQueue::load(ledger, kind, config),
            fulfilled: FulfilledProviderQueue::load(ledger, kind, config),
            previous_boundary,
        }
    }

    pub fn previous_boundary(&self) -> u32 {
        self.previous_boundary
    }

    /// Retry buffer first, then the linear scan.
    fn next_with_liquidity(&mut self, ctx: &mut Invocation<'_>, quote: U256) -> Result<Option<U256>, QueueError> {
        if let Some(id) = self.purged.get(&mut self.primary, ctx, quote)? {
            return Ok(Some(id));
        }
        self.primary.get_next_with_liquidity(ctx, quote)
    }

    /// The boundary the next invocation resumes from: the last slot this one consumed, never
    /// behind the previous boundary.
    fn boundary_to_persist(&self) -> u32 {
        match self.primary.current_index() {
            Some(cursor) => self.previous_boundary.max(cursor.saturating_sub(1)),
            None => self.previous_boundary,
        }
    }

    fn save(&mut self, changes: &mut Changeset) {
        changes.put_boundary(self.primary.kind().storage_pointer(), self.boundary_to_persist());
        self.primary.save(changes);
        self.purged.save(changes);
        if let Some(fulfilled) = self.fulfilled.as_mut() {
            fulfilled.save(changes);
        }
    }
}

/// Entry point of the engine for one pool.
///
/// Owns the normal, priority and removal lanes and the singleton initial liquidity provider.
/// Loaded from a [`Ledger`] at the start of an invocation and written back with
/// [`ProviderManager::save`] once the invocation succeeded.
#[derive(Debug)]
pub struct ProviderManager {
    token: Address,
    config: ProviderQueueConfigSection,
    thresholds: LiquidityThresholds,
    normal: QueueLane,
    priority: QueueLane,
    removal: QueueLane,
    initial_liquidity_provider: Option<U256>,
    initial_dirty: bool,
}

impl ProviderManager {
    pub fn load(ledger: &Ledger, token: Address, config: ProviderQueueConfigSection) -> Self {
        Self {
            token,
            thresholds: config.thresholds(),
            normal: QueueLane::load(ledger, QueueKind::Normal, token, &config),
            priority: QueueLane::load(ledger, QueueKind::Priority, token, &config),
            removal: QueueLane::load(ledger, QueueKind::Removal, token, &config),
            initial_liquidity_provider: ledger.initial_liquidity_provider(),
            initial_dirty: false,
            config,
        }
    }

    pub fn token(&self) -> Address {
        self.token
    }

    pub fn config(&self) -> &ProviderQueueConfigSection {
        &self.config
    }

    pub fn lane(&self, kind: QueueKind) -> &QueueLane {
        match kind {
            QueueKind::Normal => &self.normal,
            QueueKind::Priority => &self.priority,
            QueueKind::Removal => &self.removal,
        }
    }

    fn lane_mut(&mut self, kind: QueueKind) -> &mut QueueLane {
        match kind {
            QueueKind::Normal => &mut self.normal,
            QueueKind::Priority => &mut self.priority,
            QueueKind::Removal => &mut self.removal,
        }
    }

    fn fulfilled_mut(&mut self, kind: QueueKind) -> Result<&mut FulfilledProviderQueue, QueueError> {
        self.lane_mut(kind)
            .fulfilled
            .as_mut()
            .ok_or_else(|| QueueError::ImpossibleState(format!("the {kind} queue has no fulfilled queue")))
    }

    /// Listing lane a provider belongs to.
    fn listing_kind(ctx: &mut Invocation<'_>, id: U256) -> QueueKind {
        if ctx.providers.get(id).is_priority() { QueueKind::Priority } else { QueueKind::Normal }
    }

    pub fn initial_liquidity_provider(&self) -> Option<U256> {
        self.initial_liquidity_provider
    }

    /// Designate the bootstrap provider. It lives outside every queue at a reserved index.
    pub fn set_initial_liquidity_provider(&mut self, ctx: &mut Invocation<'_>, id: U256) -> Result<(), QueueError> {
        if id.is_zero() {
            return Err(QueueError::ImpossibleState("initial liquidity provider cannot be the empty id".to_string()));
        }
        let provider = ctx.providers.get(id);
        match provider.get_queue_index() {
            None | Some(INITIAL_LIQUIDITY_PROVIDER_INDEX) => {}
            Some(_) => {
                return Err(QueueError::InvalidProviderState {
                    provider: id,
                    action: "made initial liquidity provider while queued",
                });
            }
        }
        provider.mark_initial_liquidity_provider();
        provider.set_queue_index(INITIAL_LIQUIDITY_PROVIDER_INDEX);

        self.initial_liquidity_provider = Some(id);
        self.initial_dirty = true;
        info!(%id, "initial liquidity provider set");
        Ok(())
    }

    /// Pick the provider that serves the next reservation at `quote`.
    ///
    /// A zero quote only ever consults the initial provider. Otherwise the removal, priority and
    /// normal lanes are tried in that order, and the initial provider is the last resort.
    pub fn get_next_provider_with_liquidity(
        &mut self,
        ctx: &mut Invocation<'_>,
        quote: U256,
    ) -> Result<Option<U256>, QueueError> {
        if quote.is_zero() {
            return self.initial_provider_candidate(ctx, quote);
        }

        for kind in [QueueKind::Removal, QueueKind::Priority, QueueKind::Normal] {
            if let Some(id) = self.lane_mut(kind).next_with_liquidity(ctx, quote)? {
                debug!(%kind, %id, %quote, "next provider");
                return Ok(Some(id));
            }
        }

        self.initial_provider_candidate(ctx, quote)
    }

    fn initial_provider_candidate(&mut self, ctx: &mut Invocation<'_>, quote: U256) -> Result<Option<U256>, QueueError> {
        let Some(id) = self.initial_liquidity_provider else {
            return Ok(None);
        };

        let provider = ctx.providers.get(id);
        if !provider.is_active() {
            return Ok(None);
        }
        let available = provider.available_liquidity()?;
        if self.thresholds.meets_minimum(available, quote) {
            provider.set_from_removal_queue(false);
            return Ok(Some(id));
        }
        if !provider.has_reserved_amount() {
            info!(%id, available, "initial liquidity provider below minimum, resetting");
            self.reset_provider(ctx, id, false, false)?;
        }

        Ok(None)
    }

    /// Compact every lane from its persisted boundary and keep the new boundaries.
    pub fn clean_up_queues(&mut self, ctx: &mut Invocation<'_>) -> Result<(), QueueError> {
        for lane in [&mut self.normal, &mut self.priority, &mut self.removal] {
            let boundary = lane.primary.clean_up(ctx, lane.previous_boundary)?;
            lane.previous_boundary = boundary;
        }
        Ok(())
    }

    /// Take a listed provider out of its queue.
    ///
    /// Providers pending removal must leave through
    /// [`ProviderManager::remove_pending_liquidity_provider`]. The initial provider has no slot
    /// and only gets its listing reset.
    pub fn reset_provider(
        &mut self,
        ctx: &mut Invocation<'_>,
        id: U256,
        burn_remaining_funds: bool,
        canceled: bool,
    ) -> Result<(), QueueError> {
        let provider = ctx.providers.get(id);
        if provider.is_pending_removal() {
            return Err(QueueError::InvalidProviderState { provider: id, action: "reset while pending removal" });
        }

        if provider.is_initial_liquidity_provider() {
            let burned = if burn_remaining_funds { provider.get_liquidity_amount() } else { 0 };
            provider.reset_listing_values();
            provider.set_queue_index(INITIAL_LIQUIDITY_PROVIDER_INDEX);

            record_burn(&mut ctx.journal, self.token, burned);
            ctx.journal.emit(ProviderEvent::Fulfilled { provider_id: id, canceled, removal_completed: false });
            return Ok(());
        }

        let kind = Self::listing_kind(ctx, id);
        self.lane_mut(kind).primary.reset_provider(ctx, id, burn_remaining_funds, canceled)
    }

    pub fn add_to_normal_queue(&mut self, ctx: &mut Invocation<'_>, id: U256) -> Result<u32, QueueError> {
        self.normal.primary.add(ctx, id)
    }

    pub fn add_to_priority_queue(&mut self, ctx: &mut Invocation<'_>, id: U256) -> Result<u32, QueueError> {
        ctx.providers.get(id).mark_priority();
        self.priority.primary.add(ctx, id)
    }

    /// Queue a liquidity provider's withdrawal.
    pub fn add_to_removal_queue(&mut self, ctx: &mut Invocation<'_>, id: U256) -> Result<u32, QueueError> {
        let provider = ctx.providers.get(id);
        if provider.is_pending_removal() {
            return Err(QueueError::InvalidProviderState { provider: id, action: "queued for removal twice" });
        }
        provider.mark_pending_removal();
        self.removal.primary.add(ctx, id)
    }

    /// Move a provider to the retry buffer of the lane it is listed in.
    pub fn add_to_purged_queue(&mut self, ctx: &mut Invocation<'_>, id: U256) -> Result<Option<u32>, QueueError> {
        let kind = Self::purge_kind(ctx, id);
        self.lane_mut(kind).purged.add(ctx, id)
    }

    pub fn remove_from_purged_queue(&mut self, ctx: &mut Invocation<'_>, id: U256) -> Result<(), QueueError> {
        let kind = Self::purge_kind(ctx, id);
        self.lane_mut(kind).purged.remove(ctx, id)
    }

    fn purge_kind(ctx: &mut Invocation<'_>, id: U256) -> QueueKind {
        if ctx.providers.get(id).is_pending_removal() { QueueKind::Removal } else { Self::listing_kind(ctx, id) }
    }

    /// Mark a drained listing provider for the next batch reset.
    pub fn add_to_fulfilled_queue(&mut self, ctx: &mut Invocation<'_>, id: U256) -> Result<u32, QueueError> {
        let provider = ctx.providers.get(id);
        if provider.is_pending_removal() {
            return Err(QueueError::InvalidProviderState { provider: id, action: "fulfilled while pending removal" });
        }
        if provider.is_to_reset() {
            return Err(QueueError::InvalidProviderState { provider: id, action: "fulfilled twice" });
        }
        let index = provider.get_queue_index().ok_or(QueueError::IndexNotSet { provider: id, what: "queue" })?;
        provider.mark_to_reset();

        let kind = Self::listing_kind(ctx, id);
        let position = self.fulfilled_mut(kind)?.add(index)?;
        debug!(%kind, %id, index, position, "provider fulfilled");
        Ok(position)
    }

    /// Reset up to `count` fulfilled providers, priority lane first. Returns how many were reset.
    pub fn reset_fulfilled_providers(&mut self, ctx: &mut Invocation<'_>, count: u32) -> Result<u32, QueueError> {
        let initial = self.initial_liquidity_provider;
        let mut processed = 0;

        for lane in [&mut self.priority, &mut self.normal] {
            let remaining = count - processed;
            if remaining == 0 {
                break;
            }
            if let Some(fulfilled) = lane.fulfilled.as_mut() {
                processed += fulfilled.reset(ctx, remaining, &mut lane.primary, initial)?;
            }
        }

        Ok(processed)
    }

    /// Close a withdrawal once the provider's owed BTC is settled.
    pub fn remove_pending_liquidity_provider(&mut self, ctx: &mut Invocation<'_>, id: U256) -> Result<(), QueueError> {
        let provider = ctx.providers.get(id);
        if !provider.is_pending_removal() {
            return Err(QueueError::InvalidProviderState { provider: id, action: "removed without a pending removal" });
        }
        if provider.get_removal_queue_index().is_none() {
            return Err(QueueError::IndexNotSet { provider: id, what: "removal queue" });
        }
        if provider.is_purged() {
            provider.clear_purged();
        }
        self.removal.primary.reset_provider(ctx, id, false, false)
    }

    pub fn get_id_from_queue(&self, kind: QueueKind, index: u32) -> U256 {
        self.lane(kind).primary.get_at(index)
    }

    pub fn queue_length(&self, kind: QueueKind) -> u32 {
        self.lane(kind).primary.len()
    }

    pub fn purged_queue_length(&self, kind: QueueKind) -> u32 {
        self.lane(kind).purged.len()
    }

    pub fn fulfilled_queue_length(&self, kind: QueueKind) -> u32 {
        self.lane(kind).fulfilled.as_ref().map_or(0, |fulfilled| fulfilled.len())
    }

    pub fn restore_current_index(&mut self, kind: QueueKind, value: u32) {
        self.lane_mut(kind).primary.restore_current_index(value);
    }

    /// Stage boundaries, queue contents and the initial provider for commit.
    pub fn save(&mut self, changes: &mut Changeset) {
        for lane in [&mut self.normal, &mut self.priority, &mut self.removal] {
            lane.save(changes);
        }
        if self.initial_dirty {
            changes.put_initial_liquidity_provider(self.initial_liquidity_provider);
            self.initial_dirty = false;
        }
    }
}
