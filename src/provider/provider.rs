use crate::error::QueueError;
use alloy_primitives::U256;
use serde::{Deserialize, Serialize};

/// One liquidity contributor for a single (owner, token) pair.
///
/// Records are never deallocated. Resetting zeroes the fields and leaves the record inert at
/// its id until it is listed again.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Provider {
    id: U256,
    active: bool,
    priority: bool,
    pending_removal: bool,
    liquidity_provider: bool,
    initial_liquidity_provider: bool,
    purged: bool,
    #[serde(with = "index_sentinel")]
    purged_index: Option<u32>,
    to_reset: bool,
    #[serde(with = "index_sentinel")]
    queue_index: Option<u32>,
    #[serde(with = "index_sentinel")]
    removal_queue_index: Option<u32>,
    liquidity_amount: u128,
    reserved_amount: u128,
    liquidity_provided: u128,
    #[serde(skip)]
    from_removal_queue: bool,
}

impl Provider {
    pub fn new(id: U256) -> Self {
        Self { id, ..Self::default() }
    }

    pub fn get_id(&self) -> U256 {
        self.id
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn activate(&mut self) {
        self.active = true;
    }

    pub fn deactivate(&mut self) {
        self.active = false;
    }

    pub fn is_priority(&self) -> bool {
        self.priority
    }

    pub fn mark_priority(&mut self) {
        self.priority = true;
    }

    pub fn clear_priority(&mut self) {
        self.priority = false;
    }

    pub fn is_pending_removal(&self) -> bool {
        self.pending_removal
    }

    pub fn mark_pending_removal(&mut self) {
        self.pending_removal = true;
    }

    pub fn clear_pending_removal(&mut self) {
        self.pending_removal = false;
    }

    pub fn is_liquidity_provider(&self) -> bool {
        self.liquidity_provider
    }

    pub fn mark_liquidity_provider(&mut self) {
        self.liquidity_provider = true;
    }

    pub fn clear_liquidity_provider(&mut self) {
        self.liquidity_provider = false;
    }

    pub fn is_initial_liquidity_provider(&self) -> bool {
        self.initial_liquidity_provider
    }

    pub fn mark_initial_liquidity_provider(&mut self) {
        self.initial_liquidity_provider = true;
    }

    pub fn is_purged(&self) -> bool {
        self.purged
    }

    pub fn get_purged_index(&self) -> Option<u32> {
        self.purged_index
    }

    /// Purged and purged index always move together.
    pub fn mark_purged(&mut self, purged_index: u32) {
        self.purged = true;
        self.purged_index = Some(purged_index);
    }

    pub fn set_purged_index(&mut self, purged_index: u32) {
        if self.purged {
            self.purged_index = Some(purged_index);
        }
    }

    pub fn clear_purged(&mut self) {
        self.purged = false;
        self.purged_index = None;
    }

    pub fn is_to_reset(&self) -> bool {
        self.to_reset
    }

    pub fn mark_to_reset(&mut self) {
        self.to_reset = true;
    }

    pub fn get_queue_index(&self) -> Option<u32> {
        self.queue_index
    }

    pub fn set_queue_index(&mut self, index: u32) {
        self.queue_index = Some(index);
    }

    pub fn clear_queue_index(&mut self) {
        self.queue_index = None;
    }

    pub fn get_removal_queue_index(&self) -> Option<u32> {
        self.removal_queue_index
    }

    pub fn set_removal_queue_index(&mut self, index: u32) {
        self.removal_queue_index = Some(index);
    }

    pub fn clear_removal_queue_index(&mut self) {
        self.removal_queue_index = None;
    }

    pub fn is_from_removal_queue(&self) -> bool {
        self.from_removal_queue
    }

    pub fn set_from_removal_queue(&mut self, value: bool) {
        self.from_removal_queue = value;
    }

    pub fn get_liquidity_amount(&self) -> u128 {
        self.liquidity_amount
    }

    pub fn get_reserved_amount(&self) -> u128 {
        self.reserved_amount
    }

    pub fn get_liquidity_provided(&self) -> u128 {
        self.liquidity_provided
    }

    pub fn has_reserved_amount(&self) -> bool {
        self.reserved_amount != 0
    }

    /// Liquidity not yet claimed by a reservation.
    pub fn available_liquidity(&self) -> Result<u128, QueueError> {
        self.liquidity_amount.checked_sub(self.reserved_amount).ok_or(QueueError::ReservedExceedsLiquidity {
            provider: self.id,
            reserved: self.reserved_amount,
            liquidity: self.liquidity_amount,
        })
    }

    pub fn add_liquidity(&mut self, amount: u128) -> Result<(), QueueError> {
        self.liquidity_amount = self.liquidity_amount.checked_add(amount).ok_or(QueueError::Overflow("add_liquidity"))?;
        Ok(())
    }

    pub fn sub_liquidity(&mut self, amount: u128) -> Result<(), QueueError> {
        let liquidity = self.liquidity_amount.checked_sub(amount).ok_or(QueueError::Underflow("sub_liquidity"))?;
        if liquidity < self.reserved_amount {
            return Err(QueueError::ReservedExceedsLiquidity {
                provider: self.id,
                reserved: self.reserved_amount,
                liquidity,
            });
        }
        self.liquidity_amount = liquidity;
        Ok(())
    }

    pub fn add_reserved(&mut self, amount: u128) -> Result<(), QueueError> {
        let reserved = self.reserved_amount.checked_add(amount).ok_or(QueueError::Overflow("add_reserved"))?;
        if reserved > self.liquidity_amount {
            return Err(QueueError::ReservedExceedsLiquidity {
                provider: self.id,
                reserved,
                liquidity: self.liquidity_amount,
            });
        }
        self.reserved_amount = reserved;
        Ok(())
    }

    pub fn sub_reserved(&mut self, amount: u128) -> Result<(), QueueError> {
        self.reserved_amount = self.reserved_amount.checked_sub(amount).ok_or(QueueError::Underflow("sub_reserved"))?;
        Ok(())
    }

    pub fn add_liquidity_provided(&mut self, amount: u128) -> Result<(), QueueError> {
        self.liquidity_provided =
            self.liquidity_provided.checked_add(amount).ok_or(QueueError::Overflow("add_liquidity_provided"))?;
        Ok(())
    }

    pub fn clear_liquidity_provided(&mut self) {
        self.liquidity_provided = 0;
    }

    /// Zero every listing field: flags, amounts, queue and purge bookkeeping.
    pub fn reset_listing_values(&mut self) {
        self.active = false;
        self.priority = false;
        self.liquidity_amount = 0;
        self.reserved_amount = 0;
        self.queue_index = None;
        self.to_reset = false;
        self.from_removal_queue = false;
        self.clear_purged();
    }

    /// Zero the liquidity-provider side: pending removal and contribution accounting.
    pub fn reset_liquidity_provider_values(&mut self) {
        self.pending_removal = false;
        self.liquidity_provider = false;
        self.liquidity_provided = 0;
        self.removal_queue_index = None;
        self.from_removal_queue = false;
    }
}

// Unset indexes persist as INDEX_NOT_SET_VALUE.
mod index_sentinel {
    use crate::constants::INDEX_NOT_SET_VALUE;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(index: &Option<u32>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u32(index.unwrap_or(INDEX_NOT_SET_VALUE))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let index = u32::deserialize(deserializer)?;
        Ok((index != INDEX_NOT_SET_VALUE).then_some(index))
    }
}
