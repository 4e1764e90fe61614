use super::{EventSink, LiquidityReserve, OwedBtc, ProviderEvent, TokenTransfer};
use crate::error::QueueError;
use ahash::HashMap;
use alloy_primitives::{Address, U256};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransferRecord {
    pub token: Address,
    pub to: Address,
    pub amount: u128,
}

/// In-memory host: owed-BTC books, reserve counters and logs of transfers and events.
#[derive(Clone, Debug, Default)]
pub struct MemoryHost {
    owed: HashMap<U256, u64>,
    owed_reserved: HashMap<U256, u64>,
    pub total_reserve: u128,
    pub virtual_token_reserve: u128,
    pub staking_contract: u128,
    pub transfers: Vec<TransferRecord>,
    pub events: Vec<ProviderEvent>,
}

impl MemoryHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_reserves(total_reserve: u128, virtual_token_reserve: u128) -> Self {
        Self { total_reserve, virtual_token_reserve, ..Self::default() }
    }

    pub fn set_owed(&mut self, provider: U256, owed: u64, reserved: u64) {
        self.owed.insert(provider, owed);
        self.owed_reserved.insert(provider, reserved);
    }
}

impl OwedBtc for MemoryHost {
    fn satoshis_owed(&self, provider: &U256) -> u64 {
        self.owed.get(provider).copied().unwrap_or_default()
    }

    fn satoshis_owed_reserved(&self, provider: &U256) -> u64 {
        self.owed_reserved.get(provider).copied().unwrap_or_default()
    }
}

impl LiquidityReserve for MemoryHost {
    fn sub_from_total_reserve(&mut self, amount: u128) -> Result<(), QueueError> {
        self.total_reserve =
            self.total_reserve.checked_sub(amount).ok_or_else(|| QueueError::Host("total reserve underflow".to_string()))?;
        Ok(())
    }

    fn sub_from_virtual_token_reserve(&mut self, amount: u128) -> Result<(), QueueError> {
        self.virtual_token_reserve = self
            .virtual_token_reserve
            .checked_sub(amount)
            .ok_or_else(|| QueueError::Host("virtual token reserve underflow".to_string()))?;
        Ok(())
    }

    fn add_amount_to_staking_contract(&mut self, amount: u128) -> Result<(), QueueError> {
        self.staking_contract =
            self.staking_contract.checked_add(amount).ok_or_else(|| QueueError::Host("staking balance overflow".to_string()))?;
        Ok(())
    }
}

impl TokenTransfer for MemoryHost {
    fn safe_transfer(&mut self, token: Address, to: Address, amount: u128) -> Result<(), QueueError> {
        self.transfers.push(TransferRecord { token, to, amount });
        Ok(())
    }
}

impl EventSink for MemoryHost {
    fn emit(&mut self, event: ProviderEvent) {
        self.events.push(event);
    }
}
