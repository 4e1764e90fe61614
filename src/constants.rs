use alloy_primitives::{Address, U256, address};

/// Storage sentinel for an index that was never assigned.
pub const INDEX_NOT_SET_VALUE: u32 = u32::MAX;

/// Reserved index of the bootstrap provider. It never lives in a queue array.
pub const INITIAL_LIQUIDITY_PROVIDER_INDEX: u32 = u32::MAX - 1;

/// Highest slot count any queue can reach without colliding with the sentinels.
pub const MAXIMUM_QUEUE_SLOTS: u32 = INITIAL_LIQUIDITY_PROVIDER_INDEX;

/// Empty slot marker in the provider id arrays.
pub const EMPTY_SLOT: U256 = U256::ZERO;

// Quotes are tokens per satoshi scaled by this factor
pub const QUOTE_SCALE: u64 = 100_000_000;

/// Smallest reservation (in satoshis) a normal or priority provider must still be able to cover.
pub const MINIMUM_PROVIDER_RESERVATION_AMOUNT: u64 = 1_000;

/// Smallest owed amount (in satoshis) that keeps a removal-queue provider selectable.
pub const STRICT_MINIMUM_PROVIDER_RESERVATION_AMOUNT: u64 = 600;

pub const BURN_ADDRESS: Address = address!("0x000000000000000000000000000000000000dEaD");

#[non_exhaustive]
pub struct DefaultQueueCaps;

impl DefaultQueueCaps {
    pub const NORMAL: u32 = 1_000_000;
    pub const PRIORITY: u32 = 100_000;
    pub const REMOVAL: u32 = 100_000;
}
