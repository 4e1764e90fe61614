/// Host Layer
///
/// Contracts for everything the queue engine consumes but does not own: owed-BTC accounting,
/// the liquidity reserve and staking books, token transfers and event emission.
pub mod events;
pub mod journal;
pub mod memory_host;

pub use events::ProviderEvent;
pub use journal::{Effect, EffectJournal};
pub use memory_host::{MemoryHost, TransferRecord};

use crate::error::QueueError;
use alloy_primitives::{Address, U256};

pub trait OwedBtc {
    fn satoshis_owed(&self, provider: &U256) -> u64;

    fn satoshis_owed_reserved(&self, provider: &U256) -> u64;
}

/// Reserve and staking bookkeeping. Implementations should reject a write before applying any
/// part of it.
pub trait LiquidityReserve {
    fn sub_from_total_reserve(&mut self, amount: u128) -> Result<(), QueueError>;

    fn sub_from_virtual_token_reserve(&mut self, amount: u128) -> Result<(), QueueError>;

    fn add_amount_to_staking_contract(&mut self, amount: u128) -> Result<(), QueueError>;
}

pub trait TokenTransfer {
    fn safe_transfer(&mut self, token: Address, to: Address, amount: u128) -> Result<(), QueueError>;
}

pub trait EventSink {
    fn emit(&mut self, event: ProviderEvent);
}

/// Everything the engine needs from its surroundings.
pub trait Host: OwedBtc + LiquidityReserve + TokenTransfer + EventSink {}

impl<T: OwedBtc + LiquidityReserve + TokenTransfer + EventSink> Host for T {}
