use super::{Host, ProviderEvent};
use crate::error::QueueError;
use alloy_primitives::Address;
use tracing::debug;

/// A write against the host, held back until the invocation commits.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Effect {
    SubFromTotalReserve(u128),
    SubFromVirtualTokenReserve(u128),
    AddAmountToStakingContract(u128),
    Transfer { token: Address, to: Address, amount: u128 },
    Event(ProviderEvent),
}

/// Ordered log of host writes made during one invocation.
///
/// Queue code records here instead of calling the host, so an aborted invocation leaves the
/// host exactly as it found it.
#[derive(Clone, Debug, Default)]
pub struct EffectJournal {
    effects: Vec<Effect>,
}

impl EffectJournal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sub_from_total_reserve(&mut self, amount: u128) {
        if amount != 0 {
            self.effects.push(Effect::SubFromTotalReserve(amount));
        }
    }

    pub fn sub_from_virtual_token_reserve(&mut self, amount: u128) {
        if amount != 0 {
            self.effects.push(Effect::SubFromVirtualTokenReserve(amount));
        }
    }

    pub fn add_amount_to_staking_contract(&mut self, amount: u128) {
        if amount != 0 {
            self.effects.push(Effect::AddAmountToStakingContract(amount));
        }
    }

    pub fn safe_transfer(&mut self, token: Address, to: Address, amount: u128) {
        if amount != 0 {
            self.effects.push(Effect::Transfer { token, to, amount });
        }
    }

    pub fn emit(&mut self, event: ProviderEvent) {
        self.effects.push(Effect::Event(event));
    }

    pub fn effects(&self) -> &[Effect] {
        &self.effects
    }

    pub fn events(&self) -> impl Iterator<Item = &ProviderEvent> {
        self.effects.iter().filter_map(|effect| match effect {
            Effect::Event(event) => Some(event),
            _ => None,
        })
    }

    pub fn len(&self) -> usize {
        self.effects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.effects.is_empty()
    }

    /// Apply every recorded write to the host, in order.
    pub fn replay(self, host: &mut dyn Host) -> Result<(), QueueError> {
        debug!(effects = self.effects.len(), "replaying effect journal");
        for effect in self.effects {
            match effect {
                Effect::SubFromTotalReserve(amount) => host.sub_from_total_reserve(amount)?,
                Effect::SubFromVirtualTokenReserve(amount) => host.sub_from_virtual_token_reserve(amount)?,
                Effect::AddAmountToStakingContract(amount) => host.add_amount_to_staking_contract(amount)?,
                Effect::Transfer { token, to, amount } => host.safe_transfer(token, to, amount)?,
                Effect::Event(event) => host.emit(event),
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::MemoryHost;
    use alloy_primitives::U256;

    #[test]
    fn test_zero_amounts_are_not_recorded() {
        let mut journal = EffectJournal::new();
        journal.sub_from_total_reserve(0);
        journal.add_amount_to_staking_contract(0);
        journal.safe_transfer(Address::ZERO, Address::ZERO, 0);
        assert!(journal.is_empty());
    }

    #[test]
    fn test_replay_applies_in_order() -> eyre::Result<()> {
        let mut host = MemoryHost::with_reserves(1_000, 1_000);
        let mut journal = EffectJournal::new();
        journal.sub_from_total_reserve(400);
        journal.add_amount_to_staking_contract(400);
        journal.emit(ProviderEvent::Fulfilled { provider_id: U256::from(1), canceled: false, removal_completed: false });
        assert_eq!(journal.events().count(), 1);

        journal.replay(&mut host)?;
        assert_eq!(host.total_reserve, 600);
        assert_eq!(host.staking_contract, 400);
        assert_eq!(host.events.len(), 1);
        Ok(())
    }
}
