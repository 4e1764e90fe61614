use super::kind::QueueKind;
use super::provider_queue::ProviderQueue;
use super::queue_config::ProviderQueueConfigSection;
use crate::constants::INITIAL_LIQUIDITY_PROVIDER_INDEX;
use crate::error::QueueError;
use crate::host::ProviderEvent;
use crate::invocation::Invocation;
use crate::storage::{Changeset, Ledger, StoredU32Queue};
use alloy_primitives::U256;
use tracing::info;

/// FIFO of primary-queue slots whose providers were fully drained and wait for a batch reset.
#[derive(Debug)]
pub struct FulfilledProviderQueue {
    kind: QueueKind,
    queue: StoredU32Queue,
}

impl FulfilledProviderQueue {
    pub fn new(kind: QueueKind, queue: StoredU32Queue) -> Self {
        Self { kind, queue }
    }

    /// `None` for the removal queue, which has no fulfilled queue.
    pub fn load(ledger: &Ledger, kind: QueueKind, config: &ProviderQueueConfigSection) -> Option<Self> {
        let pointer = kind.fulfilled_pointer()?;
        let queue = StoredU32Queue::load(pointer, ledger.queue(pointer), config.cap_for(kind));
        Some(Self::new(kind, queue))
    }

    pub fn len(&self) -> u32 {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn add(&mut self, index: u32) -> Result<u32, QueueError> {
        self.queue.push(index)
    }

    /// Finalize up to `count` drained providers, oldest first. Returns how many were reset.
    ///
    /// `initial` resolves the reserved initial-provider index, which has no primary slot.
    pub fn reset(
        &mut self,
        ctx: &mut Invocation<'_>,
        count: u32,
        primary: &mut ProviderQueue,
        initial: Option<U256>,
    ) -> Result<u32, QueueError> {
        if primary.kind() != self.kind {
            return Err(QueueError::ImpossibleState(format!(
                "{} fulfilled queue reset against the {} queue",
                self.kind,
                primary.kind()
            )));
        }

        let mut processed = 0u32;
        while processed < count {
            let Some(entry) = self.queue.front() else { break };
            let Some(slot) = entry.value else {
                self.queue.pop_front();
                continue;
            };

            let is_initial = slot == INITIAL_LIQUIDITY_PROVIDER_INDEX;
            let id = if is_initial {
                initial.ok_or(QueueError::ImpossibleState("initial liquidity provider is not set".to_string()))?
            } else {
                primary.get_at(slot)
            };
            if id.is_zero() {
                return Err(QueueError::EmptySlot { kind: self.kind, index: slot });
            }

            let provider = ctx.providers.get(id);
            if !provider.is_to_reset() {
                return Err(QueueError::ImpossibleState(format!("provider {id} is not fulfilled")));
            }
            if !is_initial {
                primary.remove_at(slot);
            }
            provider.clear_liquidity_provided();
            self.queue.pop_front();
            provider.reset_listing_values();
            if is_initial {
                provider.set_queue_index(INITIAL_LIQUIDITY_PROVIDER_INDEX);
            }
            ctx.journal.emit(ProviderEvent::Fulfilled { provider_id: id, canceled: false, removal_completed: false });

            processed += 1;
        }

        if processed > 0 {
            info!(kind = %self.kind, processed, remaining = self.queue.len(), "fulfilled providers reset");
        }
        Ok(processed)
    }

    pub fn save(&mut self, changes: &mut Changeset) {
        self.queue.save(changes);
    }
}
